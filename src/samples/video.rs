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
use std::{fmt, sync::Arc};

use super::{error::SampleError, MediaSample};
use crate::{
    ndi::{FourCC, FrameFormat, Receiver, VideoFrame},
    timecode::Timespan,
};

/// The sample formats video frames are exposed as.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PixelFormat {
    #[default]
    Undefined,
    /// Packed 4:2:2, two bytes per pixel. Alpha planes are not exposed.
    Uyvy,
    Bgra,
    Rgba,
}

impl PixelFormat {
    /// Maps a raw FourCC code to the format its samples are exposed as.
    pub fn from_fourcc(code: u32) -> PixelFormat {
        match FourCC::from_code(code) {
            Some(FourCC::Uyvy) | Some(FourCC::Uyva) => PixelFormat::Uyvy,
            Some(FourCC::Bgra) | Some(FourCC::Bgrx) => PixelFormat::Bgra,
            Some(FourCC::Rgba) | Some(FourCC::Rgbx) => PixelFormat::Rgba,
            None => PixelFormat::Undefined,
        }
    }

    /// Bytes per pixel in the buffer, 0 if undefined.
    pub fn bytes_per_pixel(self) -> i32 {
        match self {
            PixelFormat::Undefined => 0,
            PixelFormat::Uyvy => 2,
            PixelFormat::Bgra | PixelFormat::Rgba => 4,
        }
    }
}

/// A video sample wrapping one captured frame.
pub struct VideoSample {
    receiver: Arc<dyn Receiver>,
    // Always Some until dropped.
    frame: Option<VideoFrame>,
    format: PixelFormat,
    time: Timespan,
    duration: Timespan,
}

impl VideoSample {
    /// Wraps a frame. On failure the frame is handed back so the caller can release it.
    pub fn initialize(
        receiver: Arc<dyn Receiver>,
        frame: VideoFrame,
        format: PixelFormat,
        time: Timespan,
    ) -> Result<VideoSample, (SampleError, VideoFrame)> {
        if let Err(e) = validate(&frame, format) {
            return Err((e, frame));
        }

        let duration = Timespan::from_rate(frame.frame_rate_d as i64, frame.frame_rate_n as i64);
        Ok(VideoSample {
            receiver,
            frame: Some(frame),
            format,
            time,
            duration,
        })
    }

    /// The raw frame buffer, `stride() * height` bytes.
    pub fn buffer(&self) -> &[u8] {
        match &self.frame {
            Some(frame) => &frame.data,
            None => &[],
        }
    }

    /// The buffer dimensions in pixels of the sample format. For UYVY a buffer pixel
    /// covers one luma sample.
    pub fn dim(&self) -> (u32, u32) {
        self.frame.as_ref().map_or((0, 0), |frame| {
            (
                (frame.line_stride / self.format.bytes_per_pixel()) as u32,
                frame.height as u32,
            )
        })
    }

    /// The picture dimensions.
    pub fn output_dim(&self) -> (u32, u32) {
        self.frame
            .as_ref()
            .map_or((0, 0), |frame| (frame.width as u32, frame.height as u32))
    }

    /// Bytes per line.
    pub fn stride(&self) -> u32 {
        self.frame
            .as_ref()
            .map_or(0, |frame| frame.line_stride as u32)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn frame_format(&self) -> FrameFormat {
        self.frame
            .as_ref()
            .map_or(FrameFormat::default(), |frame| frame.format)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.frame.as_ref().map_or(0.0, |frame| frame.aspect_ratio)
    }

    /// The timecode the source embedded in the frame.
    pub fn timecode(&self) -> Timespan {
        self.frame
            .as_ref()
            .map_or(Timespan::ZERO, |frame| Timespan::from_ticks(frame.timecode))
    }
}

impl MediaSample for VideoSample {
    fn time(&self) -> Timespan {
        self.time
    }

    fn duration(&self) -> Timespan {
        self.duration
    }
}

impl Drop for VideoSample {
    fn drop(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.receiver.free_video(frame);
        }
    }
}

impl fmt::Debug for VideoSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoSample")
            .field("format", &self.format)
            .field("dim", &self.dim())
            .field("output_dim", &self.output_dim())
            .field("time", &self.time)
            .field("duration", &self.duration)
            .finish()
    }
}

fn validate(frame: &VideoFrame, format: PixelFormat) -> Result<(), SampleError> {
    if format == PixelFormat::Undefined {
        return Err(SampleError::UndefinedPixelFormat);
    }
    if frame.data.is_empty() {
        return Err(SampleError::EmptyData);
    }
    if frame.width <= 0 || frame.height <= 0 || frame.line_stride <= 0 {
        return Err(SampleError::InvalidVideoFormat {
            width: frame.width,
            height: frame.height,
            stride: frame.line_stride,
        });
    }
    if frame.frame_rate_n <= 0 || frame.frame_rate_d <= 0 {
        return Err(SampleError::InvalidFrameRate {
            numerator: frame.frame_rate_n,
            denominator: frame.frame_rate_d,
        });
    }

    let required = frame.line_stride as usize * frame.height as usize;
    if frame.data.len() < required {
        return Err(SampleError::ShortData {
            required,
            available: frame.data.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::{
        ndi::{mock, Bandwidth, ColorFormat, FourCC, Library, ReceiverSettings, Source},
        samples::{MediaSample, SampleError},
        timecode::Timespan,
    };

    use super::*;

    fn receiver(library: &mock::Library) -> Arc<dyn crate::ndi::Receiver> {
        library
            .create_receiver(&ReceiverSettings {
                source: Source::from_name("HOST (Video)"),
                color_format: ColorFormat::BgrxBgra,
                bandwidth: Bandwidth::Highest,
                allow_video_fields: true,
                name: "test".to_string(),
            })
            .expect("receiver")
    }

    #[test]
    fn test_pixel_format_mapping() {
        assert_eq!(PixelFormat::Uyvy, PixelFormat::from_fourcc(FourCC::UYVA));
        assert_eq!(PixelFormat::Bgra, PixelFormat::from_fourcc(FourCC::BGRX));
        assert_eq!(PixelFormat::Rgba, PixelFormat::from_fourcc(FourCC::RGBX));
        assert_eq!(PixelFormat::Undefined, PixelFormat::from_fourcc(0));
    }

    #[test]
    fn test_bgra_sample() {
        let library = mock::Library::new();
        let frame = mock::video_frame(16, 4, 30000, 1001, 99);
        let format = PixelFormat::from_fourcc(frame.fourcc);
        let sample = VideoSample::initialize(
            receiver(&library),
            frame,
            format,
            Timespan::from_ticks(7),
        )
        .expect("initialize");

        assert_eq!(PixelFormat::Bgra, sample.format());
        assert_eq!((16, 4), sample.dim());
        assert_eq!((16, 4), sample.output_dim());
        assert_eq!(64, sample.stride());
        assert_eq!(256, sample.buffer().len());
        assert_eq!(Timespan::from_ticks(7), sample.time());
        assert_eq!(Timespan::from_ticks(99), sample.timecode());
        assert_eq!(Timespan::from_ticks(333_666), sample.duration());
    }

    #[test]
    fn test_uyvy_dimensions() {
        let library = mock::Library::new();
        let mut frame = mock::video_frame(8, 2, 25, 1, 0);
        frame.fourcc = FourCC::UYVY;
        frame.line_stride = 16;
        frame.data.truncate(32);

        let sample = VideoSample::initialize(
            receiver(&library),
            frame,
            PixelFormat::Uyvy,
            Timespan::ZERO,
        )
        .expect("initialize");
        assert_eq!((8, 2), sample.dim());
        assert_eq!(Timespan::from_ticks(400_000), sample.duration());
    }

    #[test]
    fn test_invalid_frames_are_handed_back() {
        let library = mock::Library::new();
        let receiver = receiver(&library);

        let (e, frame) = VideoSample::initialize(
            receiver.clone(),
            mock::video_frame(4, 4, 30, 1, 0),
            PixelFormat::Undefined,
            Timespan::ZERO,
        )
        .expect_err("undefined format");
        assert_eq!(SampleError::UndefinedPixelFormat, e);

        let mut empty = frame;
        empty.data.clear();
        let (e, _) = VideoSample::initialize(
            receiver.clone(),
            empty,
            PixelFormat::Bgra,
            Timespan::ZERO,
        )
        .expect_err("empty");
        assert_eq!(SampleError::EmptyData, e);

        let (e, _) = VideoSample::initialize(
            receiver.clone(),
            mock::video_frame(4, 4, 30, 0, 0),
            PixelFormat::Bgra,
            Timespan::ZERO,
        )
        .expect_err("no frame rate");
        assert!(matches!(e, SampleError::InvalidFrameRate { .. }));

        let mut short = mock::video_frame(4, 4, 30, 1, 0);
        short.data.truncate(10);
        let (e, _) = VideoSample::initialize(receiver, short, PixelFormat::Bgra, Timespan::ZERO)
            .expect_err("short");
        assert!(matches!(e, SampleError::ShortData { .. }));
    }

    #[test]
    fn test_drop_frees_frame() {
        let library = mock::Library::new();
        let receiver = receiver(&library);
        let mock = library.last_receiver().expect("mock receiver");

        let sample = VideoSample::initialize(
            receiver,
            mock::video_frame(4, 4, 30, 1, 0),
            PixelFormat::Bgra,
            Timespan::ZERO,
        )
        .expect("initialize");
        assert_eq!(0, mock.freed().video);
        drop(sample);
        assert_eq!(1, mock.freed().video);
    }
}
