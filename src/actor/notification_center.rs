//! Forwards workspace notifications that may mean the active space changed
//! to the space observer.

use objc2::rc::Retained;
use objc2::runtime::NSObject;
use objc2::{AnyThread, DefinedClass, define_class, msg_send, sel};
use objc2_app_kit::{
    NSWorkspace, NSWorkspaceActiveSpaceDidChangeNotification, NSWorkspaceDidWakeNotification,
};
use objc2_foundation::{NSNotification, NSString};
use tracing::{info_span, trace};

use super::space_observer::{self, Event};

struct Instance {
    events_tx: space_observer::Sender,
}

define_class! {
    // SAFETY:
    // - The superclass NSObject does not have any subclassing requirements.
    // - `NotificationCenterInner` does not implement `Drop`.
    #[unsafe(super(NSObject))]
    #[ivars = Instance]
    struct NotificationCenterInner;

    // SAFETY: Each of these method signatures must match their invocations.
    impl NotificationCenterInner {
        #[unsafe(method(recvSpaceChangedEvent:))]
        fn recv_space_changed_event(&self, notif: &NSNotification) {
            trace!("{notif:#?}");
            let _s = info_span!("notification_center::space_changed").entered();
            self.ivars().events_tx.send(Event::SpaceChanged);
        }

        #[unsafe(method(recvWakeEvent:))]
        fn recv_wake_event(&self, notif: &NSNotification) {
            trace!("{notif:#?}");
            // Spaces may have been rearranged while asleep.
            let _s = info_span!("notification_center::wake").entered();
            self.ivars().events_tx.send(Event::SpaceChanged);
        }
    }
}

impl NotificationCenterInner {
    fn new(events_tx: space_observer::Sender) -> Retained<Self> {
        let this = Self::alloc().set_ivars(Instance { events_tx });
        unsafe { msg_send![super(this), init] }
    }
}

/// Keeps the observer registered for as long as it is alive. Notifications
/// are delivered on the main thread, so the AppKit run loop must be running.
pub struct NotificationCenter {
    _inner: Retained<NotificationCenterInner>,
}

impl NotificationCenter {
    pub fn new(events_tx: space_observer::Sender) -> Self {
        let handler = NotificationCenterInner::new(events_tx);

        let workspace = &NSWorkspace::sharedWorkspace();
        let center = &workspace.notificationCenter();
        // SAFETY: Selectors must have signature fn(&self, &NSNotification).
        unsafe {
            center.addObserver_selector_name_object(
                &handler,
                sel!(recvSpaceChangedEvent:),
                Some(NSWorkspaceActiveSpaceDidChangeNotification),
                Some(workspace),
            );
            center.addObserver_selector_name_object(
                &handler,
                sel!(recvSpaceChangedEvent:),
                Some(&NSString::from_str("NSWorkspaceActiveDisplayDidChangeNotification")),
                Some(workspace),
            );
            center.addObserver_selector_name_object(
                &handler,
                sel!(recvWakeEvent:),
                Some(NSWorkspaceDidWakeNotification),
                Some(workspace),
            );
        }

        Self { _inner: handler }
    }
}
