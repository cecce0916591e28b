//! Decides when to reconcile space state.
//!
//! Explicit refreshes run at once. Window server notifications are debounced
//! and followed by one delayed re-check, because the notification can arrive
//! before the window server has updated its own tables. A slow poll catches
//! spaces being added or removed, which produce no notification at all.

use std::future;
use std::time::Duration;

use strum_macros::Display;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, trace, warn};

use super::menu_bar;
use crate::common::config::Settings;
use crate::common::timer::OneShot;
use crate::model::name_store::NameStore;
use crate::model::reconciler::{ReconcileError, SpaceStateReconciler};
use crate::model::space::{Space, current_space};
use crate::sys::display_server::DisplayServer;

#[derive(Debug)]
pub enum Event {
    /// Reconcile immediately, dropping any pending debounced work.
    Refresh,
    /// The active space changed, or the system woke.
    SpaceChanged,
    /// A space name was saved by this process.
    NameSaved,
    /// The names file changed on disk. Ignored when the change is our own
    /// last write.
    NamesFileChanged,
    RenameCurrentSpace(String),
    Stop,
}

pub type Sender = crate::actor::Sender<Event>;
pub type Receiver = crate::actor::Receiver<Event>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
enum Pass {
    Immediate,
    Debounced,
    Recheck,
    Poll,
}

pub struct SpaceObserver<D, N> {
    reconciler: SpaceStateReconciler<D, N>,
    menu_tx: menu_bar::Sender,
    debounce: OneShot,
    recheck: OneShot,
    poll_interval: Duration,
    last_spaces: Option<Vec<Space>>,
}

impl<D: DisplayServer, N: NameStore> SpaceObserver<D, N> {
    pub fn new(
        reconciler: SpaceStateReconciler<D, N>,
        settings: &Settings,
        menu_tx: menu_bar::Sender,
    ) -> Self {
        Self {
            reconciler,
            menu_tx,
            debounce: OneShot::new(settings.debounce()),
            recheck: OneShot::new(settings.recheck_delay()),
            poll_interval: settings.poll_interval(),
            last_spaces: None,
        }
    }

    /// The result of the most recent successful pass.
    pub fn last_spaces(&self) -> Option<&[Space]> {
        self.last_spaces.as_deref()
    }

    #[instrument(name = "space_observer::run", skip_all)]
    pub async fn run(mut self, mut rx: Receiver) {
        info!("starting space observer");
        self.refresh_now();

        let mut poll = tokio::time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                maybe = rx.recv() => {
                    let Some((span, event)) = maybe else { break };
                    let _enter = span.enter();
                    if matches!(event, Event::Stop) {
                        break;
                    }
                    self.handle_event(event, Instant::now());
                }
                _ = sleep_until(deadline) => self.fire_due_timers(Instant::now()),
                _ = poll.tick() => self.poll(),
            }
        }

        debug!("space observer stopped");
    }

    pub fn handle_event(&mut self, event: Event, now: Instant) {
        trace!(?event, "space observer event");
        match event {
            Event::Refresh => self.refresh_now(),
            Event::SpaceChanged | Event::NameSaved => self.debounce.schedule(now),
            Event::NamesFileChanged => {
                if self.reconciler.names().changed_since_last_save() {
                    self.debounce.schedule(now);
                } else {
                    trace!("names file holds our own last write");
                }
            }
            Event::RenameCurrentSpace(name) => self.rename_current_space(&name, now),
            Event::Stop => {}
        }
    }

    /// Earliest pending timer deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.debounce.deadline(), self.recheck.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn fire_due_timers(&mut self, now: Instant) {
        if self.debounce.fire_if_due(now) {
            self.reconcile(Pass::Debounced);
            self.recheck.schedule(now);
        }
        if self.recheck.fire_if_due(now) {
            self.reconcile(Pass::Recheck);
        }
    }

    /// Compares the cheap digest against the last pass and reconciles only if
    /// spaces were added, removed or switched behind our back.
    pub fn poll(&mut self) {
        let Some(digest) = self.reconciler.sample_digest() else {
            trace!("poll: snapshot unavailable");
            return;
        };
        if self.reconciler.has_changed(&digest) {
            debug!("poll: space configuration changed");
            self.reconcile(Pass::Poll);
        }
    }

    fn refresh_now(&mut self) {
        self.debounce.cancel();
        self.recheck.cancel();
        self.reconcile(Pass::Immediate);
    }

    fn rename_current_space(&mut self, name: &str, now: Instant) {
        let Some((space_id, space_number)) = self
            .last_spaces
            .as_deref()
            .and_then(current_space)
            .map(|s| (s.space_id.clone(), s.space_number))
        else {
            warn!("no current space known yet; ignoring rename");
            return;
        };
        match self.reconciler.names().rename(&space_id, space_number, name) {
            Ok(_) => self.handle_event(Event::NameSaved, now),
            Err(e) => warn!("failed to rename space {space_id}: {e}"),
        }
    }

    fn reconcile(&mut self, pass: Pass) {
        match self.reconciler.reconcile() {
            Ok(spaces) => {
                debug!(%pass, count = spaces.len(), "spaces updated");
                self.last_spaces = Some(spaces.clone());
                self.menu_tx.send(menu_bar::Event::SpacesUpdated(spaces));
            }
            Err(ReconcileError::Unavailable) => {
                debug!(%pass, "snapshot unavailable; keeping previous spaces");
            }
            Err(e @ ReconcileError::NoActiveSpace) => {
                debug!(%pass, "{e}; keeping previous spaces");
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => future::pending().await,
    }
}
