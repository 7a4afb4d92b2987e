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
    thread,
    time::{Duration, Instant},
};

/// How long a condition gets before the test fails.
const DEADLINE: Duration = Duration::from_secs(10);

/// How often the condition is checked.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Waits until a condition driven by another thread holds, such as the audio ticker
/// delivering samples or forgetting a dropped player. Panics with `what` otherwise.
#[track_caller]
pub fn eventually<F>(condition: F, what: &str)
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + DEADLINE;
    while !condition() {
        if Instant::now() >= deadline {
            panic!("{} (gave up after {:?})", what, DEADLINE);
        }
        thread::sleep(POLL_INTERVAL);
    }
}
