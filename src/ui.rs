//! Presentation surfaces. They only ever see finished `Space` lists.

use tracing::info;

use crate::model::space::Space;

pub mod menu_bar;
pub mod overlay;

use overlay::OverlayContent;

/// Something that can show space state to the user. Implementations run on
/// whatever thread the menu actor runs on, so anything tied to the main
/// thread has to hop there itself.
pub trait Presenter {
    /// Called on every update with the status item text.
    fn update_status(&mut self, label: &str);

    /// Called only when the active space or the number of spaces changed.
    fn show_overlay(&mut self, content: &OverlayContent);

    /// Mirrors the full list into the floating panel, when one is open.
    fn update_panel(&mut self, _spaces: &[Space]) {}
}

/// Reports through `tracing` instead of drawing anything.
#[derive(Debug, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn update_status(&mut self, label: &str) {
        info!(%label, "status");
    }

    fn show_overlay(&mut self, content: &OverlayContent) {
        info!(
            previous = content.previous.as_deref().unwrap_or("-"),
            current = %content.current,
            next = content.next.as_deref().unwrap_or("-"),
            "space switched"
        );
    }
}
