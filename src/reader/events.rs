//! Reader change events and subscription fan-out

use crate::display::{CursorInfo, DisplayInfo, WindowInfo};
use crate::input::{KeyboardState, MouseState};
use crossbeam::channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowChange {
    Opened,
    Closed,
    Focused,
    Moved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayChange {
    Added,
    Removed,
    Changed,
}

/// One change observed during a reader tick, in sampling order
#[derive(Debug, Clone)]
pub enum ReaderEvent {
    Mouse(MouseState),
    Keyboard(KeyboardState),
    Window { window: WindowInfo, change: WindowChange },
    Display { display: DisplayInfo, change: DisplayChange },
    Cursor(CursorInfo),
}

impl ReaderEvent {
    pub fn category(&self) -> &'static str {
        match self {
            ReaderEvent::Mouse(_) => "mouse",
            ReaderEvent::Keyboard(_) => "keyboard",
            ReaderEvent::Window { .. } => "window",
            ReaderEvent::Display { .. } => "display",
            ReaderEvent::Cursor(_) => "cursor",
        }
    }
}

/// Fan-out to subscriber channels; disconnected receivers are dropped on
/// the next publish
#[derive(Debug, Default)]
pub(crate) struct EventFanout {
    senders: Vec<Sender<ReaderEvent>>,
}

impl EventFanout {
    pub(crate) fn subscribe(&mut self) -> Receiver<ReaderEvent> {
        let (tx, rx) = unbounded();
        self.senders.push(tx);
        rx
    }

    pub(crate) fn publish(&mut self, event: &ReaderEvent) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.senders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut fanout = EventFanout::default();
        let kept = fanout.subscribe();
        let dropped = fanout.subscribe();
        drop(dropped);

        fanout.publish(&ReaderEvent::Cursor(CursorInfo::default()));
        assert_eq!(fanout.subscriber_count(), 1);
        assert_eq!(kept.try_recv().map(|e| e.category()).ok(), Some("cursor"));
    }
}
