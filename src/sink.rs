// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::sync::{Arc, Weak};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::warn;

/// A consumer of samples. The player only holds sinks weakly; a sink that has been
/// dropped is treated as if none was registered.
pub trait Sink<S>: Send + Sync {
    /// Takes ownership of a sample. Must not block. Returns false if the sample was
    /// dropped instead of queued.
    fn enqueue(&self, sample: S) -> bool;
}

/// A sink that forwards samples onto a crossbeam channel.
pub struct ChannelSink<S> {
    name: &'static str,
    sender: Sender<S>,
}

impl<S: Send> ChannelSink<S> {
    /// Creates a sink backed by a bounded channel. Samples arriving while the channel is
    /// full are dropped, which releases their frames.
    pub fn bounded(name: &'static str, capacity: usize) -> (Arc<ChannelSink<S>>, Receiver<S>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        (Arc::new(ChannelSink { name, sender }), receiver)
    }

    /// Creates a sink backed by an unbounded channel.
    pub fn unbounded(name: &'static str) -> (Arc<ChannelSink<S>>, Receiver<S>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Arc::new(ChannelSink { name, sender }), receiver)
    }
}

impl<S: Send> Sink<S> for ChannelSink<S> {
    fn enqueue(&self, sample: S) -> bool {
        match self.sender.try_send(sample) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(sink = self.name, "Sink is full, dropping sample");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!(sink = self.name, "Sink has no reader, dropping sample");
                false
            }
        }
    }
}

/// A registration slot for one sample kind.
pub(crate) struct SinkSlot<S> {
    sink: Mutex<Option<Weak<dyn Sink<S>>>>,
}

impl<S> SinkSlot<S> {
    pub fn new() -> SinkSlot<S> {
        SinkSlot {
            sink: Mutex::new(None),
        }
    }

    pub fn set(&self, sink: Option<Weak<dyn Sink<S>>>) {
        *self.sink.lock() = sink;
    }

    /// Pins the registered sink for one dispatch, or returns None if there is no live
    /// sink.
    pub fn get(&self) -> Option<Arc<dyn Sink<S>>> {
        self.sink.lock().as_ref().and_then(Weak::upgrade)
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Weak};

    use super::*;

    #[test]
    fn test_channel_sink() {
        let (sink, receiver) = ChannelSink::bounded("test", 1);
        assert!(sink.enqueue(1));
        assert!(!sink.enqueue(2));
        assert_eq!(Ok(1), receiver.try_recv());
        assert!(receiver.try_recv().is_err());

        drop(receiver);
        assert!(!sink.enqueue(3));
    }

    #[test]
    fn test_slot_holds_sink_weakly() {
        let slot: SinkSlot<u32> = SinkSlot::new();
        assert!(slot.get().is_none());

        let (sink, receiver) = ChannelSink::unbounded("test");
        let dyn_sink: Arc<dyn Sink<u32>> = sink;
        slot.set(Some(Arc::downgrade(&dyn_sink)));

        match slot.get() {
            Some(pinned) => assert!(pinned.enqueue(5)),
            None => panic!("sink should be live"),
        }
        assert_eq!(Ok(5), receiver.try_recv());

        drop(dyn_sink);
        assert!(slot.get().is_none());

        slot.set(None::<Weak<dyn Sink<u32>>>);
        assert!(slot.get().is_none());
    }
}
