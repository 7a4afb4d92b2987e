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

/// Reasons a frame could not be wrapped in a sample.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SampleError {
    #[error("invalid audio format: {channels} channels, {samples} samples at {sample_rate}Hz, stride {stride}")]
    InvalidAudioFormat {
        channels: i32,
        samples: i32,
        sample_rate: i32,
        stride: i32,
    },

    #[error("invalid video format: {width}x{height}, stride {stride}")]
    InvalidVideoFormat { width: i32, height: i32, stride: i32 },

    #[error("invalid frame rate {numerator}/{denominator}")]
    InvalidFrameRate { numerator: i32, denominator: i32 },

    #[error("the frame's pixel format has no sample format")]
    UndefinedPixelFormat,

    #[error("the frame carries no data")]
    EmptyData,

    #[error("the frame carries {available} values, {required} required")]
    ShortData { required: usize, available: usize },
}
