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

//! A dedicated thread that drives the audio cycle of every registered player at a
//! fixed interval, independent of the host's frame rate.

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, span, Level};

mod priority;

/// Something the audio ticker drives.
pub trait AudioTickable: Send + Sync {
    fn tick_audio(&self);
}

struct Shared {
    tickables: Mutex<Vec<Weak<dyn AudioTickable>>>,
    wakeup: Condvar,
    running: AtomicBool,
}

/// Owns the ticker thread. Tickables are held weakly and forgotten once dropped.
pub struct AudioTicker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl AudioTicker {
    /// Starts the ticker thread.
    pub fn start(interval: Duration) -> io::Result<AudioTicker> {
        let shared = Arc::new(Shared {
            tickables: Mutex::new(Vec::new()),
            wakeup: Condvar::new(),
            running: AtomicBool::new(true),
        });

        let thread_shared = shared.clone();
        let handle = thread::Builder::new()
            .name("ndimedia-audio".to_string())
            .spawn(move || run(thread_shared, interval))?;

        info!(interval = format!("{:?}", interval), "Started audio ticker");
        Ok(AudioTicker {
            shared,
            handle: Some(handle),
        })
    }

    /// Adds a tickable. The ticker does not keep it alive.
    pub fn register<T: AudioTickable + 'static>(&self, tickable: &Arc<T>) {
        let weak: Weak<T> = Arc::downgrade(tickable);
        let weak: Weak<dyn AudioTickable> = weak;
        self.shared.tickables.lock().push(weak);
        self.shared.wakeup.notify_all();
    }

    /// The number of registered tickables, including dropped ones the ticker hasn't
    /// noticed yet.
    pub fn num_tickables(&self) -> usize {
        self.shared.tickables.lock().len()
    }

    /// Stops and joins the ticker thread.
    pub fn stop(&mut self) {
        {
            let _tickables = self.shared.tickables.lock();
            self.shared.running.store(false, Ordering::SeqCst);
        }
        self.shared.wakeup.notify_all();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Audio ticker thread panicked");
            }
            info!("Stopped audio ticker");
        }
    }
}

impl Drop for AudioTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(shared: Arc<Shared>, interval: Duration) {
    let span = span!(Level::INFO, "audio ticker");
    let _enter = span.enter();

    priority::configure_ticker_thread_priority(
        priority::ticker_thread_priority(),
        priority::rt_audio_enabled(),
    );

    loop {
        let live = {
            let mut tickables = shared.tickables.lock();
            while tickables.is_empty() && shared.running.load(Ordering::SeqCst) {
                shared.wakeup.wait(&mut tickables);
            }
            if !shared.running.load(Ordering::SeqCst) {
                return;
            }

            let mut live = Vec::with_capacity(tickables.len());
            for i in (0..tickables.len()).rev() {
                match tickables[i].upgrade() {
                    Some(tickable) => live.push(tickable),
                    None => {
                        debug!("Dropping expired tickable");
                        tickables.swap_remove(i);
                    }
                }
            }
            live
        };

        // The lock is released so a tick may register new tickables or drop players.
        for tickable in live.iter() {
            tickable.tick_audio();
        }
        drop(live);

        spin_sleep::sleep(interval);
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use std::time::Duration;

    use crate::testutil::eventually;

    use super::{AudioTickable, AudioTicker};

    #[derive(Default)]
    struct Counter {
        ticks: AtomicUsize,
    }

    impl AudioTickable for Counter {
        fn tick_audio(&self) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_ticks_registered_tickables() {
        let mut ticker = AudioTicker::start(Duration::from_millis(1)).expect("ticker");
        let first = Arc::new(Counter::default());
        let second = Arc::new(Counter::default());
        ticker.register(&first);
        ticker.register(&second);
        assert_eq!(2, ticker.num_tickables());

        eventually(
            || first.ticks.load(Ordering::SeqCst) >= 3 && second.ticks.load(Ordering::SeqCst) >= 3,
            "Tickables were never ticked",
        );

        ticker.stop();
        let ticks = first.ticks.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(ticks, first.ticks.load(Ordering::SeqCst));
    }

    #[test]
    fn test_dropped_tickables_are_forgotten() {
        let ticker = AudioTicker::start(Duration::from_millis(1)).expect("ticker");
        let kept = Arc::new(Counter::default());
        let dropped = Arc::new(Counter::default());
        ticker.register(&kept);
        ticker.register(&dropped);

        drop(dropped);
        eventually(|| ticker.num_tickables() == 1, "Dropped tickable was kept");
        eventually(
            || kept.ticks.load(Ordering::SeqCst) > 0,
            "Remaining tickable was never ticked",
        );
    }

    #[test]
    fn test_stop_without_tickables() {
        let mut ticker = AudioTicker::start(Duration::from_millis(5)).expect("ticker");
        ticker.stop();
        ticker.stop();
        assert_eq!(0, ticker.num_tickables());
    }
}
