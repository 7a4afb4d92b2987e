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

//! A media player core for NDI sources.
//!
//! The vendor SDK is reached only through the traits in [`ndi`]. The [`player::Player`]
//! owns one receiver at a time, drains its frames on two tick cadences and hands the
//! resulting samples to whatever sinks are registered.

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod finder;
pub mod metadata;
pub mod ndi;
pub mod options;
pub mod player;
pub mod samples;
pub mod sink;
pub mod state;
pub mod ticker;
pub mod timecode;
pub mod tracks;
pub mod url;

#[cfg(test)]
mod testutil;

pub use error::PlayerError;
pub use player::{MediaEvent, Player};
pub use state::PlayerState;
