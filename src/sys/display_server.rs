//! Access to the window server's table of managed displays and their spaces.
//!
//! The table is an undocumented property-list structure. We only pull out the
//! handful of keys we need and treat everything else as noise, so that a
//! malformed display entry costs us that display and nothing more.

use std::fmt;

use nix::libc::pid_t;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(i64);

impl SpaceId {
    /// Reported as the current space while the window server has none,
    /// typically in the middle of a space transition.
    pub const INVALID: SpaceId = SpaceId(-1);

    pub fn new(id: i64) -> SpaceId {
        SpaceId(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<SpaceId> for i64 {
    fn from(val: SpaceId) -> Self {
        val.get()
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRecord {
    pub display_id: String,
    pub active_space_id: SpaceId,
    pub spaces: Vec<SpaceRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceRecord {
    pub managed_space_id: SpaceId,
    pub is_full_screen_tile: bool,
    pub owner_pid: Option<pid_t>,
}

/// The boundary to the window server.
///
/// Implementations must not panic or block for long; a failed query is
/// reported as `None` and retried by the caller on its next trigger.
pub trait DisplayServer {
    /// The raw managed display spaces table, converted to JSON values.
    fn managed_display_spaces(&self) -> Option<Value>;

    /// The localized name of the application owning `pid`.
    fn app_name(&self, pid: pid_t) -> Option<String>;

    fn snapshot(&self) -> Option<Vec<DisplayRecord>> {
        self.managed_display_spaces().and_then(parse_snapshot)
    }
}

impl<D: DisplayServer + ?Sized> DisplayServer for &D {
    fn managed_display_spaces(&self) -> Option<Value> {
        (**self).managed_display_spaces()
    }

    fn app_name(&self, pid: pid_t) -> Option<String> {
        (**self).app_name(pid)
    }
}

#[derive(Deserialize)]
struct RawDisplay {
    #[serde(rename = "Display Identifier")]
    display_id: Option<String>,
    #[serde(rename = "Current Space")]
    current_space: Option<RawCurrentSpace>,
    #[serde(rename = "Spaces")]
    spaces: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct RawCurrentSpace {
    #[serde(rename = "ManagedSpaceID")]
    managed_space_id: Option<i64>,
}

#[derive(Deserialize)]
struct RawSpace {
    #[serde(rename = "ManagedSpaceID")]
    managed_space_id: Option<i64>,
    #[serde(rename = "TileLayoutManager")]
    tile_layout_manager: Option<Value>,
    pid: Option<i64>,
}

/// Parses the top-level table. Returns `None` if it is not an array at all;
/// individual displays that fail to parse are dropped.
pub fn parse_snapshot(value: Value) -> Option<Vec<DisplayRecord>> {
    let Value::Array(displays) = value else {
        debug!("managed display spaces is not an array");
        return None;
    };
    Some(displays.into_iter().filter_map(parse_display).collect())
}

fn parse_display(value: Value) -> Option<DisplayRecord> {
    let raw: RawDisplay = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("skipping malformed display: {e}");
            return None;
        }
    };

    let (Some(display_id), Some(active), Some(spaces)) = (
        raw.display_id,
        raw.current_space.and_then(|c| c.managed_space_id),
        raw.spaces,
    ) else {
        debug!("skipping display without identifier, current space or space list");
        return None;
    };

    let spaces = spaces.into_iter().filter_map(parse_space).collect();

    Some(DisplayRecord {
        display_id,
        active_space_id: SpaceId::new(active),
        spaces,
    })
}

fn parse_space(value: Value) -> Option<SpaceRecord> {
    let raw: RawSpace = serde_json::from_value(value).ok()?;
    let Some(id) = raw.managed_space_id else {
        trace!("skipping space without ManagedSpaceID");
        return None;
    };
    Some(SpaceRecord {
        managed_space_id: SpaceId::new(id),
        is_full_screen_tile: matches!(raw.tile_layout_manager, Some(Value::Object(_))),
        owner_pid: raw.pid.and_then(|pid| pid_t::try_from(pid).ok()),
    })
}

#[cfg(target_os = "macos")]
pub use self::actual::Actual;

#[cfg(target_os = "macos")]
mod actual {
    use nix::libc::pid_t;
    use objc2::rc::Retained;
    use objc2::runtime::AnyObject;
    use objc2_app_kit::NSRunningApplication;
    use objc2_foundation::{NSArray, NSJSONSerialization, NSJSONWritingOptions};
    use serde_json::Value;
    use tracing::debug;

    use super::DisplayServer;
    use crate::sys::skylight::{CGSCopyManagedDisplaySpaces, G_CONNECTION};

    /// The live window server.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct Actual;

    impl DisplayServer for Actual {
        fn managed_display_spaces(&self) -> Option<Value> {
            let displays: Retained<NSArray> =
                unsafe { Retained::from_raw(CGSCopyManagedDisplaySpaces(*G_CONNECTION)) }?;
            let object: &AnyObject = &displays;

            // The validity check covers the whole table, so one value JSON
            // cannot hold (a date, say) costs the snapshot rather than the
            // display it sits in. The window server has not been seen to put
            // one there.
            if !unsafe { NSJSONSerialization::isValidJSONObject(object) } {
                debug!("managed display spaces cannot be represented as JSON");
                return None;
            }
            let data = match unsafe {
                NSJSONSerialization::dataWithJSONObject_options_error(
                    object,
                    NSJSONWritingOptions(0),
                )
            } {
                Ok(data) => data,
                Err(e) => {
                    debug!("failed to serialize managed display spaces: {e:?}");
                    return None;
                }
            };

            serde_json::from_slice(&data.to_vec()).ok()
        }

        fn app_name(&self, pid: pid_t) -> Option<String> {
            let app = NSRunningApplication::runningApplicationWithProcessIdentifier(pid)?;
            app.localizedName().map(|name| name.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_log::test;

    use super::*;

    #[test]
    fn parses_displays_and_spaces() {
        let displays = parse_snapshot(json!([
            {
                "Display Identifier": "Main",
                "Current Space": { "ManagedSpaceID": 4, "type": 0 },
                "Spaces": [
                    { "ManagedSpaceID": 4, "type": 0 },
                    { "ManagedSpaceID": 9, "TileLayoutManager": { "Age": 1 }, "pid": 512 },
                ],
            },
        ]))
        .unwrap();

        assert_eq!(
            displays,
            vec![DisplayRecord {
                display_id: "Main".into(),
                active_space_id: SpaceId::new(4),
                spaces: vec![
                    SpaceRecord {
                        managed_space_id: SpaceId::new(4),
                        is_full_screen_tile: false,
                        owner_pid: None,
                    },
                    SpaceRecord {
                        managed_space_id: SpaceId::new(9),
                        is_full_screen_tile: true,
                        owner_pid: Some(512),
                    },
                ],
            }]
        );
    }

    #[test]
    fn drops_displays_missing_required_keys() {
        let displays = parse_snapshot(json!([
            { "Display Identifier": "A", "Spaces": [] },
            { "Display Identifier": "B", "Current Space": {}, "Spaces": [] },
            { "Current Space": { "ManagedSpaceID": 1 }, "Spaces": [] },
            { "Display Identifier": "C", "Current Space": { "ManagedSpaceID": 1 } },
            { "Display Identifier": "D", "Current Space": { "ManagedSpaceID": 1 }, "Spaces": 5 },
            "not a display",
            { "Display Identifier": "E", "Current Space": { "ManagedSpaceID": 1 }, "Spaces": [] },
        ]))
        .unwrap();

        let ids: Vec<_> = displays.iter().map(|d| d.display_id.as_str()).collect();
        assert_eq!(ids, vec!["E"]);
    }

    #[test]
    fn tile_layout_marker_must_be_a_dictionary() {
        let displays = parse_snapshot(json!([{
            "Display Identifier": "Main",
            "Current Space": { "ManagedSpaceID": 1 },
            "Spaces": [
                { "ManagedSpaceID": 1, "TileLayoutManager": "nope" },
                { "ManagedSpaceID": 2, "TileLayoutManager": null },
                { "type": 0 },
            ],
        }]))
        .unwrap();

        let spaces = &displays[0].spaces;
        assert_eq!(spaces.len(), 2);
        assert!(spaces.iter().all(|s| !s.is_full_screen_tile));
    }

    #[test]
    fn rejects_non_array_snapshot() {
        assert_eq!(parse_snapshot(json!({ "Spaces": [] })), None);
        assert_eq!(parse_snapshot(Value::Null), None);
    }

    #[test]
    fn keeps_invalid_sentinel_for_the_caller() {
        let displays = parse_snapshot(json!([{
            "Display Identifier": "Main",
            "Current Space": { "ManagedSpaceID": -1 },
            "Spaces": [{ "ManagedSpaceID": 3 }],
        }]))
        .unwrap();
        assert_eq!(displays[0].active_space_id, SpaceId::INVALID);
    }
}
