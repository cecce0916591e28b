use super::space::{Space, current_space};

/// What changed between two consecutive reconciliation results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpaceChanges {
    pub active_changed: bool,
    pub count_changed: bool,
}

impl SpaceChanges {
    /// Either change warrants showing the overlay.
    pub fn is_meaningful(&self) -> bool {
        self.active_changed || self.count_changed
    }
}

/// Remembers the previous result so consumers can classify the next one.
/// The first result establishes the baseline and never reports a change.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    last: Option<Baseline>,
}

#[derive(Debug)]
struct Baseline {
    active_id: Option<String>,
    count: usize,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, spaces: &[Space]) -> SpaceChanges {
        let next = Baseline {
            active_id: current_space(spaces).map(|s| s.space_id.clone()),
            count: spaces.len(),
        };
        let changes = match &self.last {
            None => SpaceChanges::default(),
            Some(prev) => SpaceChanges {
                active_changed: prev.active_id != next.active_id,
                count_changed: prev.count != next.count,
            },
        };
        self.last = Some(next);
        changes
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn spaces(ids: &[&str], current: &str) -> Vec<Space> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| Space {
                display_id: "Main".into(),
                space_id: id.to_string(),
                space_name: "N/A".into(),
                space_number: i as u32 + 1,
                desktop_number: Some(i as u32 + 1),
                is_current_space: *id == current,
                is_full_screen: false,
            })
            .collect()
    }

    #[test]
    fn first_result_is_only_a_baseline() {
        let mut tracker = ChangeTracker::new();
        assert_eq!(tracker.observe(&spaces(&["1", "2"], "1")), SpaceChanges::default());
    }

    #[test]
    fn detects_active_space_switch() {
        let mut tracker = ChangeTracker::new();
        tracker.observe(&spaces(&["1", "2"], "1"));

        let changes = tracker.observe(&spaces(&["1", "2"], "2"));
        assert!(changes.active_changed);
        assert!(!changes.count_changed);
        assert!(changes.is_meaningful());

        assert!(!tracker.observe(&spaces(&["1", "2"], "2")).is_meaningful());
    }

    #[test]
    fn detects_space_count_change() {
        let mut tracker = ChangeTracker::new();
        tracker.observe(&spaces(&["1", "2"], "1"));

        let changes = tracker.observe(&spaces(&["1", "2", "3"], "1"));
        assert_eq!(
            changes,
            SpaceChanges {
                active_changed: false,
                count_changed: true
            }
        );
    }

    #[test]
    fn renaming_alone_is_not_meaningful() {
        let mut tracker = ChangeTracker::new();
        let mut before = spaces(&["1", "2"], "1");
        tracker.observe(&before);
        before[0].space_name = "Work".into();
        assert!(!tracker.observe(&before).is_meaningful());
    }
}
