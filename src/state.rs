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
use std::fmt;

use parking_lot::Mutex;

use crate::player::MediaEvent;

/// The playback state of a player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayerState {
    #[default]
    Closed,
    /// Open, but the source has no live connection yet.
    Preparing,
    Playing,
    Paused,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerState::Closed => "closed",
            PlayerState::Preparing => "preparing",
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
        };
        write!(f, "{}", name)
    }
}

/// State and rate control.
pub trait StateMachine {
    fn state(&self) -> PlayerState;

    /// 1.0 while playing, 0.0 otherwise.
    fn rate(&self) -> f32;

    /// Sets the playback rate. Only 0.0 (pause) and 1.0 (play) are supported.
    fn set_rate(&self, rate: f32) -> bool;

    fn supports_rate(&self, rate: f32) -> bool {
        rate == 0.0 || rate == 1.0
    }
}

#[derive(Default)]
struct Flags {
    open: bool,
    connected: bool,
    paused: bool,
}

/// The state of a player, derived from whether it is open, whether the source is
/// connected and whether playback was paused.
#[derive(Default)]
pub(crate) struct Playback {
    flags: Mutex<Flags>,
}

impl Playback {
    pub fn new() -> Playback {
        Playback::default()
    }

    /// Enters Preparing. A pause requested earlier is kept.
    pub fn opened(&self) {
        let mut flags = self.flags.lock();
        flags.open = true;
        flags.connected = false;
    }

    pub fn closed(&self) {
        *self.flags.lock() = Flags::default();
    }

    /// Applies a liveness poll. Returns the event to announce if the source connected or
    /// disconnected.
    pub fn update_connections(&self, connections: i32) -> Option<MediaEvent> {
        let mut flags = self.flags.lock();
        if !flags.open {
            return None;
        }

        let connected = connections > 0;
        if connected == flags.connected {
            return None;
        }
        flags.connected = connected;
        Some(if connected {
            MediaEvent::PlaybackResumed
        } else {
            MediaEvent::PlaybackSuspended
        })
    }

    /// Pauses on 0.0 and resumes on 1.0. Rejected while closed. While preparing the
    /// request is remembered until the source connects.
    pub fn set_rate(&self, rate: f32) -> bool {
        let mut flags = self.flags.lock();
        if !flags.open {
            return false;
        }
        if rate == 0.0 {
            flags.paused = true;
        } else if rate == 1.0 {
            flags.paused = false;
        } else {
            return false;
        }
        true
    }

    pub fn state(&self) -> PlayerState {
        let flags = self.flags.lock();
        match (flags.open, flags.connected, flags.paused) {
            (false, _, _) => PlayerState::Closed,
            (true, false, _) => PlayerState::Preparing,
            (true, true, true) => PlayerState::Paused,
            (true, true, false) => PlayerState::Playing,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlayerState::Playing
    }
}
