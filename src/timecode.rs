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
use std::{
    fmt,
    sync::atomic::{AtomicBool, AtomicI64, Ordering},
};

/// Number of timecode ticks in one second. A tick is 100ns.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// A point in time or a length of time, in 100ns ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timespan(i64);

impl Timespan {
    pub const ZERO: Timespan = Timespan(0);

    pub fn from_ticks(ticks: i64) -> Timespan {
        Timespan(ticks)
    }

    pub fn from_secs_f64(secs: f64) -> Timespan {
        Timespan((secs * TICKS_PER_SECOND as f64).round() as i64)
    }

    /// The span covered by `count` items at `rate` items per second. Zero when the rate is
    /// not positive.
    pub fn from_rate(count: i64, rate: i64) -> Timespan {
        if rate <= 0 {
            return Timespan::ZERO;
        }
        Timespan(TICKS_PER_SECOND * count / rate)
    }

    pub fn ticks(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / TICKS_PER_SECOND as f64
    }
}

impl fmt::Display for Timespan {
    /// Formats as `[-]hh:mm:ss.fff`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let ticks = self.0.unsigned_abs();
        let millis = ticks / 10_000;
        let secs = millis / 1000;
        write!(
            f,
            "{}{:02}:{:02}:{:02}.{:03}",
            sign,
            secs / 3600,
            (secs / 60) % 60,
            secs % 60,
            millis % 1000
        )
    }
}

/// The player's notion of the current time.
///
/// In embedded mode every arriving frame moves the clock to the frame's own timecode. In
/// host mode the clock only follows the timecode the host reports on its input tick, and
/// frames are stamped with that.
#[derive(Default)]
pub(crate) struct Clock {
    embedded: AtomicBool,
    current: AtomicI64,
}

impl Clock {
    /// Selects the clock source. Fixed for the lifetime of a connection.
    pub fn set_embedded(&self, embedded: bool) {
        self.embedded.store(embedded, Ordering::Relaxed);
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded.load(Ordering::Relaxed)
    }

    /// Records the host's timecode. Ignored in embedded mode.
    pub fn host_tick(&self, timecode: Timespan) {
        if !self.is_embedded() {
            self.current.store(timecode.ticks(), Ordering::Relaxed);
        }
    }

    /// Returns the time a frame with the given embedded timecode should be stamped with.
    pub fn frame_arrived(&self, frame_timecode: i64) -> Timespan {
        if self.is_embedded() {
            self.current.store(frame_timecode, Ordering::Relaxed);
            return Timespan(frame_timecode);
        }
        self.current()
    }

    pub fn current(&self) -> Timespan {
        Timespan(self.current.load(Ordering::Relaxed))
    }

    pub fn reset(&self) {
        self.embedded.store(false, Ordering::Relaxed);
        self.current.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_timespan_display() {
        assert_eq!("00:00:00.000", Timespan::ZERO.to_string());
        assert_eq!(
            "01:02:03.500",
            Timespan::from_secs_f64(3723.5).to_string()
        );
        assert_eq!("-00:00:01.000", Timespan::from_ticks(-TICKS_PER_SECOND).to_string());
    }

    #[test]
    fn test_from_rate() {
        assert_eq!(Timespan::from_ticks(100_000), Timespan::from_rate(480, 48000));
        assert_eq!(Timespan::ZERO, Timespan::from_rate(480, 0));
    }

    #[test]
    fn test_host_clock() {
        let clock = Clock::default();
        clock.host_tick(Timespan::from_ticks(500));
        assert_eq!(Timespan::from_ticks(500), clock.frame_arrived(123_456));
        assert_eq!(Timespan::from_ticks(500), clock.current());
    }

    #[test]
    fn test_embedded_clock() {
        let clock = Clock::default();
        clock.set_embedded(true);
        clock.host_tick(Timespan::from_ticks(500));
        assert_eq!(Timespan::from_ticks(123_456), clock.frame_arrived(123_456));
        assert_eq!(Timespan::from_ticks(123_456), clock.current());

        clock.reset();
        assert!(!clock.is_embedded());
        assert_eq!(Timespan::ZERO, clock.current());
    }
}
