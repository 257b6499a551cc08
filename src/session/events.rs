//! Session notifications

use super::actions::RecordedAction;
use super::error::ErrorCode;
use crate::writer::AnnotationId;
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::trace;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    CaptureStarted,
    CaptureStopped,
    CapturePaused,
    CaptureResumed,
    /// Frame number within the session, starting at 1
    FrameCaptured(u64),
    AnnotationAdded(AnnotationId),
    AnnotationRemoved(AnnotationId),
    DrawingStarted,
    DrawingFinished,
    /// A recorded action came due during playback
    ActionReplayed(RecordedAction),
    PlaybackFinished,
    ErrorOccurred { code: ErrorCode, message: String },
}

pub type EventCallback = Box<dyn FnMut(&SessionEvent) + Send>;

/// Channel subscribers plus an optional direct callback
#[derive(Default)]
pub(crate) struct EventBus {
    senders: Vec<Sender<SessionEvent>>,
    callback: Option<EventCallback>,
}

impl EventBus {
    pub(crate) fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = unbounded();
        self.senders.push(tx);
        rx
    }

    pub(crate) fn set_callback(&mut self, callback: EventCallback) {
        self.callback = Some(callback);
    }

    pub(crate) fn clear_callback(&mut self) {
        self.callback = None;
    }

    pub(crate) fn emit(&mut self, event: SessionEvent) {
        trace!("Session event {:?}", event);
        if let Some(callback) = self.callback.as_mut() {
            callback(&event);
        }
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn emits_to_callback_and_live_subscribers() {
        let mut bus = EventBus::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.set_callback(Box::new(move |e| sink.lock().push(e.clone())));

        let rx = bus.subscribe();
        let dropped = bus.subscribe();
        drop(dropped);

        bus.emit(SessionEvent::CaptureStarted);
        bus.emit(SessionEvent::FrameCaptured(1));

        assert_eq!(rx.try_iter().count(), 2);
        assert_eq!(seen.lock().len(), 2);
        assert_eq!(bus.senders.len(), 1);
    }
}
