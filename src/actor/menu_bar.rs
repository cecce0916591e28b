use tracing::{debug, trace};

use crate::actor;
use crate::common::config::Settings;
use crate::model::changes::ChangeTracker;
use crate::model::space::Space;
use crate::ui::Presenter;
use crate::ui::menu_bar::status_label;
use crate::ui::overlay::OverlayContent;

#[derive(Debug)]
pub enum Event {
    SpacesUpdated(Vec<Space>),
}

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

/// Feeds every reconciliation result to the presentation surfaces. The
/// status item and panel see every update; the overlay only pops up when the
/// active space or the number of spaces changed.
pub struct Menu<P> {
    rx: Receiver,
    presenter: P,
    tracker: ChangeTracker,
    overlay_enabled: bool,
    last_label: Option<String>,
}

impl<P: Presenter> Menu<P> {
    pub fn new(settings: &Settings, rx: Receiver, presenter: P) -> Self {
        Self {
            rx,
            presenter,
            tracker: ChangeTracker::new(),
            overlay_enabled: settings.ui.overlay.enabled,
            last_label: None,
        }
    }

    pub async fn run(mut self) {
        while let Some((span, event)) = self.rx.recv().await {
            let _enter = span.enter();
            self.handle_event(event);
        }
        debug!("menu stopped");
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::SpacesUpdated(spaces) => self.handle_update(&spaces),
        }
    }

    fn handle_update(&mut self, spaces: &[Space]) {
        let changes = self.tracker.observe(spaces);

        let label = status_label(spaces);
        if self.last_label.as_deref() != Some(label.as_str()) {
            self.presenter.update_status(&label);
            self.last_label = Some(label);
        }
        self.presenter.update_panel(spaces);

        if !changes.is_meaningful() {
            return;
        }
        trace!(?changes, "space configuration changed");
        if self.overlay_enabled
            && let Some(content) = OverlayContent::from_spaces(spaces)
        {
            self.presenter.show_overlay(&content);
        }
    }
}
