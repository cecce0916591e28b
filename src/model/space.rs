use serde::{Deserialize, Serialize};

/// Name given to a desktop space that was never renamed.
pub const DEFAULT_DESKTOP_NAME: &str = "N/A";

/// Name given to a fullscreen space whose owning app cannot be resolved.
pub const DEFAULT_FULLSCREEN_NAME: &str = "FUL";

const FULLSCREEN_NAME_LEN: usize = 5;

/// One space as presented to the user, produced fresh by every
/// reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub display_id: String,
    pub space_id: String,
    pub space_name: String,
    /// Position across all displays, starting at 1.
    pub space_number: u32,
    /// Position among the non-fullscreen spaces of this display, starting
    /// at 1. Fullscreen spaces have none.
    pub desktop_number: Option<u32>,
    pub is_current_space: bool,
    pub is_full_screen: bool,
}

/// Default name for a fullscreen space: the first few characters of the
/// owning application's name, upper-cased.
///
/// Characters are counted as `char`s, so a letter written with a combining
/// mark takes two of the five.
pub fn fullscreen_default_name(app_name: Option<&str>) -> String {
    match app_name {
        Some(name) if !name.is_empty() => {
            name.chars().take(FULLSCREEN_NAME_LEN).collect::<String>().to_uppercase()
        }
        _ => DEFAULT_FULLSCREEN_NAME.to_string(),
    }
}

/// The space flagged current that comes first in list order. With several
/// displays this is the one on the first display.
pub fn current_space(spaces: &[Space]) -> Option<&Space> {
    spaces.iter().find(|s| s.is_current_space)
}
