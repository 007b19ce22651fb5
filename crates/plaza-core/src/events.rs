//! Client events for the attached front end.
//!
//! The library never prints or navigates by itself. It emits events
//! (notices, forced logouts, login redirects) and the front end decides how
//! to present them. Events sent after the receiver is gone are dropped.

use tokio::sync::mpsc;

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Events emitted by the client library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A user-visible notification.
    Notice { level: NoticeLevel, message: String },
    /// The session could not be refreshed and was terminated.
    SessionExpired,
    /// The front end should show the login entry point.
    NavigateToLogin {
        /// Where to return after a successful login, if known.
        return_to: Option<String>,
    },
}

pub type EventReceiver = mpsc::UnboundedReceiver<ClientEvent>;

/// Cheap, cloneable sending side of the event channel.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<ClientEvent>>,
}

impl EventSink {
    /// Creates a connected sink and its receiver.
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink with no listener; every event is discarded.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ClientEvent) {
        if let Some(tx) = &self.tx {
            // No listener left is not an error.
            let _ = tx.send(event);
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notice(NoticeLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notice(NoticeLevel::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notice(NoticeLevel::Error, message);
    }

    fn notice(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(ClientEvent::Notice {
            level,
            message: message.into(),
        });
    }
}

/// Drains every event currently queued, without waiting.
pub fn drain(rx: &mut EventReceiver) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
