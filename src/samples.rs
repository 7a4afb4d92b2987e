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

//! Samples handed to sinks.
//!
//! This module provides:
//! - Audio samples with lazy conversion to interleaved 16 bit PCM
//! - Video samples exposing the raw frame buffer
//! - Binary samples carrying metadata XML
//! - A pool that recycles audio sample storage
//!
//! Every sample owns the frame it wraps together with the receiver that produced it,
//! and releases the frame through that receiver exactly once.

mod audio;
mod binary;
mod error;
mod pool;
mod video;

pub use audio::AudioSample;
pub use binary::BinarySample;
pub use error::SampleError;
pub use pool::{PooledAudioSample, SamplePool};
pub use video::{PixelFormat, VideoSample};

use crate::timecode::Timespan;

/// Timing shared by every sample kind.
pub trait MediaSample {
    /// The time the sample should be presented at.
    fn time(&self) -> Timespan;

    /// How long the sample lasts.
    fn duration(&self) -> Timespan;
}
