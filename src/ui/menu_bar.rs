use crate::model::space::Space;

const FULLSCREEN_MARK: &str = "F";
const DISPLAY_SEPARATOR: &str = " | ";

/// Text form of the status item: one cell per space, grouped by display.
/// Desktops show their desktop number, fullscreen spaces an `F`, and the
/// current space of each display is bracketed.
///
/// ```text
/// [1] 2 F | [1]
/// ```
pub fn status_label(spaces: &[Space]) -> String {
    let mut out = String::new();
    let mut display: Option<&str> = None;

    for space in spaces {
        match display {
            Some(d) if d == space.display_id => out.push(' '),
            Some(_) => out.push_str(DISPLAY_SEPARATOR),
            None => {}
        }
        display = Some(space.display_id.as_str());

        let cell = match space.desktop_number {
            Some(n) if !space.is_full_screen => n.to_string(),
            _ => FULLSCREEN_MARK.to_string(),
        };
        if space.is_current_space {
            out.push('[');
            out.push_str(&cell);
            out.push(']');
        } else {
            out.push_str(&cell);
        }
    }

    out
}
