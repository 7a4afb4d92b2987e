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

//! The capability interface of the NDI runtime.
//!
//! Everything the player needs from the vendor library is expressed here: creating a
//! receiver, capturing frames from it with a timeout, releasing those frames, attaching
//! connection metadata and querying liveness and performance. A receiver is destroyed
//! when its last reference is dropped.

use std::{fmt, sync::Arc, time::Duration};

use serde::Deserialize;

pub mod mock;

/// Builds a FourCC code the same way the vendor headers do.
const fn fourcc(code: &[u8; 4]) -> u32 {
    (code[0] as u32) | (code[1] as u32) << 8 | (code[2] as u32) << 16 | (code[3] as u32) << 24
}

/// The bandwidth tier requested from a source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bandwidth {
    /// Receive metadata only.
    MetadataOnly,
    /// Receive metadata and audio.
    AudioOnly,
    /// Receive everything at a reduced resolution and bitrate.
    Lowest,
    /// Receive everything at full resolution.
    #[default]
    Highest,
}

impl Bandwidth {
    /// Maps a vendor bandwidth value to a tier.
    pub fn from_value(value: i64) -> Option<Bandwidth> {
        match value {
            -10 => Some(Bandwidth::MetadataOnly),
            10 => Some(Bandwidth::AudioOnly),
            0 => Some(Bandwidth::Lowest),
            100 => Some(Bandwidth::Highest),
            _ => None,
        }
    }

    /// Returns the vendor value of this tier.
    pub fn value(self) -> i64 {
        match self {
            Bandwidth::MetadataOnly => -10,
            Bandwidth::AudioOnly => 10,
            Bandwidth::Lowest => 0,
            Bandwidth::Highest => 100,
        }
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Bandwidth::MetadataOnly => "metadata only",
            Bandwidth::AudioOnly => "audio only",
            Bandwidth::Lowest => "lowest",
            Bandwidth::Highest => "highest",
        };
        write!(f, "{}", name)
    }
}

/// The color format preference of a receiver. The first half of each name applies to
/// video without alpha, the second half to video with alpha.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorFormat {
    BgrxBgra,
    #[default]
    UyvyBgra,
    RgbxRgba,
    UyvyRgba,
}

impl ColorFormat {
    /// Maps a vendor color format value to a format.
    pub fn from_value(value: i64) -> Option<ColorFormat> {
        match value {
            0 => Some(ColorFormat::BgrxBgra),
            1 => Some(ColorFormat::UyvyBgra),
            2 => Some(ColorFormat::RgbxRgba),
            3 => Some(ColorFormat::UyvyRgba),
            _ => None,
        }
    }

    /// Returns the vendor value of this format.
    pub fn value(self) -> i64 {
        match self {
            ColorFormat::BgrxBgra => 0,
            ColorFormat::UyvyBgra => 1,
            ColorFormat::RgbxRgba => 2,
            ColorFormat::UyvyRgba => 3,
        }
    }
}

impl fmt::Display for ColorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorFormat::BgrxBgra => "BGRX/BGRA",
            ColorFormat::UyvyBgra => "UYVY/BGRA",
            ColorFormat::RgbxRgba => "RGBX/RGBA",
            ColorFormat::UyvyRgba => "UYVY/RGBA",
        };
        write!(f, "{}", name)
    }
}

/// The pixel layouts a video frame can arrive in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FourCC {
    Uyvy,
    Uyva,
    Bgra,
    Bgrx,
    Rgba,
    Rgbx,
}

impl FourCC {
    pub const UYVY: u32 = fourcc(b"UYVY");
    pub const UYVA: u32 = fourcc(b"UYVA");
    pub const BGRA: u32 = fourcc(b"BGRA");
    pub const BGRX: u32 = fourcc(b"BGRX");
    pub const RGBA: u32 = fourcc(b"RGBA");
    pub const RGBX: u32 = fourcc(b"RGBX");

    /// Maps a raw FourCC code to a known layout.
    pub fn from_code(code: u32) -> Option<FourCC> {
        match code {
            FourCC::UYVY => Some(FourCC::Uyvy),
            FourCC::UYVA => Some(FourCC::Uyva),
            FourCC::BGRA => Some(FourCC::Bgra),
            FourCC::BGRX => Some(FourCC::Bgrx),
            FourCC::RGBA => Some(FourCC::Rgba),
            FourCC::RGBX => Some(FourCC::Rgbx),
            _ => None,
        }
    }

    /// Returns the raw code of this layout.
    pub fn code(self) -> u32 {
        match self {
            FourCC::Uyvy => FourCC::UYVY,
            FourCC::Uyva => FourCC::UYVA,
            FourCC::Bgra => FourCC::BGRA,
            FourCC::Bgrx => FourCC::BGRX,
            FourCC::Rgba => FourCC::RGBA,
            FourCC::Rgbx => FourCC::RGBX,
        }
    }
}

/// How the lines of a video frame are organized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameFormat {
    #[default]
    Progressive,
    /// Both fields, field 0 on the even lines.
    Interleaved,
    Field0,
    Field1,
}

/// Identifies a source on the network, either by name, by address, or both.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Source {
    /// A name of the form `MACHINE (SOURCE)`.
    pub name: Option<String>,
    /// An `ip:port` endpoint.
    pub address: Option<String>,
}

impl Source {
    /// Creates a source identified by name.
    pub fn from_name(name: &str) -> Source {
        Source {
            name: Some(name.to_string()),
            address: None,
        }
    }

    /// Creates a source identified by endpoint.
    pub fn from_address(address: &str) -> Source {
        Source {
            name: None,
            address: Some(address.to_string()),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.address) {
            (Some(name), Some(address)) => write!(f, "{} [{}]", name, address),
            (Some(name), None) => write!(f, "{}", name),
            (None, Some(address)) => write!(f, "{}", address),
            (None, None) => write!(f, "<unknown>"),
        }
    }
}

/// The creation descriptor of a receiver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiverSettings {
    pub source: Source,
    pub color_format: ColorFormat,
    pub bandwidth: Bandwidth,
    /// When false, fielded sources are de-interlaced by the runtime.
    pub allow_video_fields: bool,
    /// The name this receiver announces to the source.
    pub name: String,
}

/// The creation descriptor of a source finder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinderSettings {
    pub show_local_sources: bool,
    pub groups: Vec<String>,
    pub extra_addresses: Vec<String>,
}

impl Default for FinderSettings {
    fn default() -> Self {
        FinderSettings {
            show_local_sources: true,
            groups: Vec::new(),
            extra_addresses: Vec::new(),
        }
    }
}

/// A video frame owned by the receiver that captured it.
pub struct VideoFrame {
    pub width: i32,
    pub height: i32,
    pub line_stride: i32,
    /// Raw FourCC code, see [`FourCC`].
    pub fourcc: u32,
    pub frame_rate_n: i32,
    pub frame_rate_d: i32,
    pub aspect_ratio: f32,
    pub format: FrameFormat,
    /// Embedded timecode in 100ns ticks.
    pub timecode: i64,
    pub data: Vec<u8>,
}

impl fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("line_stride", &self.line_stride)
            .field("fourcc", &FourCC::from_code(self.fourcc))
            .field("frame_rate", &(self.frame_rate_n, self.frame_rate_d))
            .field("timecode", &self.timecode)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// A planar floating point audio frame owned by the receiver that captured it.
pub struct AudioFrame {
    pub sample_rate: i32,
    pub channels: i32,
    /// Samples per channel.
    pub samples: i32,
    /// Distance between the starts of two channels, in bytes.
    pub channel_stride: i32,
    /// Embedded timecode in 100ns ticks.
    pub timecode: i64,
    pub data: Vec<f32>,
}

impl fmt::Debug for AudioFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioFrame")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("samples", &self.samples)
            .field("channel_stride", &self.channel_stride)
            .field("timecode", &self.timecode)
            .finish()
    }
}

/// An XML metadata frame.
#[derive(Debug)]
pub struct MetadataFrame {
    /// Embedded timecode in 100ns ticks.
    pub timecode: i64,
    pub data: String,
}

impl MetadataFrame {
    /// Creates a metadata frame from XML text.
    pub fn new(data: &str, timecode: i64) -> MetadataFrame {
        MetadataFrame {
            timecode,
            data: data.to_string(),
        }
    }

    /// The length the runtime reports, which counts the terminating NUL.
    pub fn length(&self) -> usize {
        self.data.len() + 1
    }
}

/// The kinds of frames a capture call should consider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameKinds {
    pub video: bool,
    pub audio: bool,
    pub metadata: bool,
}

impl FrameKinds {
    pub const AUDIO: FrameKinds = FrameKinds {
        video: false,
        audio: true,
        metadata: false,
    };

    pub const VIDEO_AND_METADATA: FrameKinds = FrameKinds {
        video: true,
        audio: false,
        metadata: true,
    };
}

/// The result of one capture call.
#[derive(Debug)]
pub enum Captured {
    /// Nothing was pending within the timeout.
    None,
    Video(VideoFrame),
    Audio(AudioFrame),
    Metadata(MetadataFrame),
    /// The receive failed. This is usually transient.
    Error,
}

/// Frame counters per kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameCounts {
    pub video: i64,
    pub audio: i64,
    pub metadata: i64,
}

/// Receive performance as reported by the runtime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Performance {
    pub total: FrameCounts,
    pub dropped: FrameCounts,
}

/// A live connection to one source.
pub trait Receiver: Send + Sync {
    /// Captures the next pending frame of one of the given kinds. Never blocks for longer
    /// than the timeout.
    fn capture(&self, kinds: FrameKinds, timeout: Duration) -> Captured;

    /// Releases a video frame captured from this receiver.
    fn free_video(&self, frame: VideoFrame);

    /// Releases an audio frame captured from this receiver.
    fn free_audio(&self, frame: AudioFrame);

    /// Releases a metadata frame captured from this receiver.
    fn free_metadata(&self, frame: MetadataFrame);

    /// Attaches metadata to the connection. Sources see it on every new connection.
    fn add_connection_metadata(&self, frame: &MetadataFrame);

    /// Returns the number of live connections to the source.
    fn connections(&self) -> i32;

    /// Returns the total and dropped frame counts.
    fn performance(&self) -> Performance;

    /// Returns the number of frames waiting to be captured.
    fn queue(&self) -> FrameCounts;
}

/// Lists sources discovered on the network.
pub trait Finder: Send + Sync {
    fn sources(&self) -> Vec<Source>;
}

/// The entry point of the runtime.
pub trait Library: Send + Sync {
    /// Creates a receiver, or returns None if the runtime refused.
    fn create_receiver(&self, settings: &ReceiverSettings) -> Option<Arc<dyn Receiver>>;

    /// Creates a source finder, or returns None if the runtime refused.
    fn create_finder(&self, settings: &FinderSettings) -> Option<Box<dyn Finder>>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bandwidth_values() {
        for bandwidth in [
            Bandwidth::MetadataOnly,
            Bandwidth::AudioOnly,
            Bandwidth::Lowest,
            Bandwidth::Highest,
        ] {
            assert_eq!(Some(bandwidth), Bandwidth::from_value(bandwidth.value()));
        }
        assert_eq!(None, Bandwidth::from_value(42));
    }

    #[test]
    fn test_color_format_values() {
        assert_eq!(Some(ColorFormat::BgrxBgra), ColorFormat::from_value(0));
        assert_eq!(Some(ColorFormat::UyvyRgba), ColorFormat::from_value(3));
        assert_eq!(None, ColorFormat::from_value(4));
        assert_eq!(None, ColorFormat::from_value(-1));
    }

    #[test]
    fn test_fourcc_codes() {
        assert_eq!(0x5956_5955, FourCC::UYVY);
        assert_eq!(Some(FourCC::Bgra), FourCC::from_code(FourCC::Bgra.code()));
        assert_eq!(None, FourCC::from_code(fourcc(b"NV12")));
    }

    #[test]
    fn test_source_display() {
        assert_eq!("HOST (Cam)", Source::from_name("HOST (Cam)").to_string());
        assert_eq!("1.2.3.4:5961", Source::from_address("1.2.3.4:5961").to_string());
        assert_eq!("<unknown>", Source::default().to_string());
    }

    #[test]
    fn test_metadata_length_counts_terminator() {
        assert_eq!(7, MetadataFrame::new("<a b/>", 0).length());
    }
}
