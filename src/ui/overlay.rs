use std::time::Duration;

use crate::model::space::Space;

/// How long the overlay stays up before fading out, unless the pointer is
/// over it.
pub const DISMISS_AFTER: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chip {
    pub name: String,
    pub is_current: bool,
}

/// What the switch overlay shows: the current space's name flanked by its
/// neighbours in list order, over a strip with one chip per space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayContent {
    pub previous: Option<String>,
    pub current: String,
    pub next: Option<String>,
    pub chips: Vec<Chip>,
}

impl OverlayContent {
    /// Returns `None` when no space is current, since there is nothing to
    /// center the overlay on.
    pub fn from_spaces(spaces: &[Space]) -> Option<Self> {
        let idx = spaces.iter().position(|s| s.is_current_space)?;
        let name_at = |i: usize| spaces.get(i).map(|s| s.space_name.clone());

        Some(Self {
            previous: idx.checked_sub(1).and_then(name_at),
            current: spaces[idx].space_name.clone(),
            next: name_at(idx + 1),
            chips: spaces
                .iter()
                .map(|s| Chip {
                    name: s.space_name.clone(),
                    is_current: s.is_current_space,
                })
                .collect(),
        })
    }
}
