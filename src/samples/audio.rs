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
use std::{fmt, mem, sync::Arc};

use super::{error::SampleError, MediaSample};
use crate::{
    ndi::{AudioFrame, Receiver},
    timecode::Timespan,
};

/// An audio frame and the receiver it has to be released through.
struct Held {
    receiver: Arc<dyn Receiver>,
    frame: AudioFrame,
}

/// An audio sample. The frame arrives as planar 32 bit float and is converted to
/// interleaved 16 bit PCM the first time the buffer is requested.
///
/// Samples are meant to be reused: initializing a sample releases whatever frame it held
/// before, and the conversion buffer is only ever grown.
#[derive(Default)]
pub struct AudioSample {
    held: Option<Held>,
    reference_level: i32,
    time: Timespan,
    duration: Timespan,
    buffer: Vec<i16>,
    converted: bool,
}

impl AudioSample {
    pub fn new() -> AudioSample {
        AudioSample::default()
    }

    /// Wraps a frame. On failure the frame is handed back so the caller can release it.
    pub fn initialize(
        &mut self,
        receiver: Arc<dyn Receiver>,
        frame: AudioFrame,
        reference_level: i32,
        time: Timespan,
    ) -> Result<(), (SampleError, AudioFrame)> {
        self.release();

        if let Err(e) = validate(&frame) {
            return Err((e, frame));
        }

        self.reference_level = reference_level;
        self.time = time;
        self.duration = Timespan::from_rate(frame.samples as i64, frame.sample_rate as i64);
        self.held = Some(Held { receiver, frame });
        Ok(())
    }

    /// Returns true if the sample holds a frame.
    pub fn is_initialized(&self) -> bool {
        self.held.is_some()
    }

    /// Returns the interleaved 16 bit samples, converting them on the first call.
    pub fn buffer(&mut self) -> &[i16] {
        let held = match &self.held {
            Some(held) => held,
            None => return &[],
        };

        if !self.converted {
            convert(&held.frame, self.reference_level, &mut self.buffer);
            self.converted = true;
        }
        &self.buffer
    }

    /// The capacity of the conversion buffer, in samples.
    pub fn buffer_capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn channels(&self) -> u32 {
        self.held
            .as_ref()
            .map_or(0, |held| held.frame.channels as u32)
    }

    /// Samples per channel.
    pub fn frames(&self) -> u32 {
        self.held
            .as_ref()
            .map_or(0, |held| held.frame.samples as u32)
    }

    pub fn sample_rate(&self) -> u32 {
        self.held
            .as_ref()
            .map_or(0, |held| held.frame.sample_rate as u32)
    }

    /// The timecode the source embedded in the frame.
    pub fn timecode(&self) -> Timespan {
        self.held
            .as_ref()
            .map_or(Timespan::ZERO, |held| Timespan::from_ticks(held.frame.timecode))
    }

    /// Releases the held frame, if any. The conversion buffer is kept for reuse.
    pub fn release(&mut self) {
        if let Some(held) = self.held.take() {
            held.receiver.free_audio(held.frame);
        }
        self.converted = false;
        self.time = Timespan::ZERO;
        self.duration = Timespan::ZERO;
    }

    /// Moves the conversion buffer out so pooled storage can survive this sample.
    pub(super) fn take_storage(&mut self) -> Vec<i16> {
        self.release();
        mem::take(&mut self.buffer)
    }

    pub(super) fn with_storage(buffer: Vec<i16>) -> AudioSample {
        let mut sample = AudioSample::default();
        sample.buffer = buffer;
        sample
    }
}

impl MediaSample for AudioSample {
    fn time(&self) -> Timespan {
        self.time
    }

    fn duration(&self) -> Timespan {
        self.duration
    }
}

impl Drop for AudioSample {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for AudioSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSample")
            .field("channels", &self.channels())
            .field("frames", &self.frames())
            .field("sample_rate", &self.sample_rate())
            .field("time", &self.time)
            .field("duration", &self.duration)
            .finish()
    }
}

fn validate(frame: &AudioFrame) -> Result<(), SampleError> {
    let stride = frame.channel_stride / mem::size_of::<f32>() as i32;
    if frame.channels <= 0
        || frame.samples <= 0
        || frame.sample_rate <= 0
        || (frame.channels > 1 && stride < frame.samples)
    {
        return Err(SampleError::InvalidAudioFormat {
            channels: frame.channels,
            samples: frame.samples,
            sample_rate: frame.sample_rate,
            stride: frame.channel_stride,
        });
    }

    let required = (frame.channels as usize - 1) * stride.max(0) as usize + frame.samples as usize;
    if frame.data.len() < required {
        return Err(SampleError::ShortData {
            required,
            available: frame.data.len(),
        });
    }
    Ok(())
}

/// Converts planar float audio to interleaved 16 bit. Full scale 16 bit audio sits
/// `reference_level` dB above the float reference.
fn convert(frame: &AudioFrame, reference_level: i32, buffer: &mut Vec<i16>) {
    let channels = frame.channels as usize;
    let samples = frame.samples as usize;
    let stride = frame.channel_stride as usize / mem::size_of::<f32>();
    let scale = i16::MAX as f32 * 10f32.powf(-(reference_level as f32) / 20.0);

    buffer.clear();
    buffer.resize(channels * samples, 0);
    for channel in 0..channels {
        let plane = &frame.data[channel * stride..channel * stride + samples];
        for (i, value) in plane.iter().enumerate() {
            let scaled = (value * scale).round();
            buffer[i * channels + channel] = scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::{
        ndi::{mock, AudioFrame, Bandwidth, ColorFormat, Library, ReceiverSettings, Source},
        samples::{MediaSample, SampleError},
        timecode::Timespan,
    };

    use super::AudioSample;

    fn receiver(library: &mock::Library) -> Arc<dyn crate::ndi::Receiver> {
        library
            .create_receiver(&ReceiverSettings {
                source: Source::from_name("HOST (Audio)"),
                color_format: ColorFormat::UyvyBgra,
                bandwidth: Bandwidth::Highest,
                allow_video_fields: true,
                name: "test".to_string(),
            })
            .expect("receiver")
    }

    fn frame(channels: i32, samples: i32, data: Vec<f32>) -> AudioFrame {
        AudioFrame {
            sample_rate: 48000,
            channels,
            samples,
            channel_stride: samples * 4,
            timecode: 0,
            data,
        }
    }

    #[test]
    fn test_initialize_and_convert() {
        let library = mock::Library::new();
        let receiver = receiver(&library);

        let mut sample = AudioSample::new();
        sample
            .initialize(
                receiver,
                frame(2, 3, vec![1.0, -1.0, 0.5, 0.25, 0.0, 2.0]),
                0,
                Timespan::from_ticks(42),
            )
            .expect("initialize");

        assert_eq!(2, sample.channels());
        assert_eq!(3, sample.frames());
        assert_eq!(48000, sample.sample_rate());
        assert_eq!(Timespan::from_ticks(42), sample.time());
        assert_eq!(Timespan::from_ticks(625), sample.duration());

        // Interleaved, unattenuated, clamped.
        assert_eq!(
            &[32767, 8192, -32767, 0, 16384, 32767],
            sample.buffer()
        );
    }

    #[test]
    fn test_reference_level_headroom() {
        let library = mock::Library::new();
        let mut sample = AudioSample::new();
        sample
            .initialize(receiver(&library), frame(1, 1, vec![1.0]), 20, Timespan::ZERO)
            .expect("initialize");
        assert_eq!(&[3277], sample.buffer());
    }

    #[test]
    fn test_conversion_is_idempotent() {
        let library = mock::Library::new();
        let mut sample = AudioSample::new();
        sample
            .initialize(
                receiver(&library),
                mock::audio_frame(2, 480, 48000, 0),
                20,
                Timespan::ZERO,
            )
            .expect("initialize");

        let first = sample.buffer().to_vec();
        let second = sample.buffer().to_vec();
        assert_eq!(960, first.len());
        assert_eq!(first, second);
    }

    #[test]
    fn test_buffer_only_grows() {
        let library = mock::Library::new();
        let receiver = receiver(&library);
        let mut sample = AudioSample::new();

        sample
            .initialize(
                receiver.clone(),
                mock::audio_frame(2, 1024, 48000, 0),
                20,
                Timespan::ZERO,
            )
            .expect("initialize");
        assert_eq!(2048, sample.buffer().len());
        let capacity = sample.buffer_capacity();

        sample
            .initialize(receiver, mock::audio_frame(1, 16, 48000, 0), 20, Timespan::ZERO)
            .expect("initialize");
        assert_eq!(16, sample.buffer().len());
        assert_eq!(capacity, sample.buffer_capacity());
    }

    #[test]
    fn test_invalid_frames_are_handed_back() {
        let library = mock::Library::new();
        let receiver = receiver(&library);
        let mut sample = AudioSample::new();

        let (e, returned) = sample
            .initialize(receiver.clone(), frame(0, 3, vec![0.0; 3]), 20, Timespan::ZERO)
            .expect_err("no channels");
        assert!(matches!(e, SampleError::InvalidAudioFormat { .. }));
        assert_eq!(0, returned.channels);

        let mut short = frame_with_rate(2, 4, 0);
        let (e, _) = sample
            .initialize(receiver.clone(), short, 20, Timespan::ZERO)
            .expect_err("no sample rate");
        assert!(matches!(e, SampleError::InvalidAudioFormat { .. }));

        short = frame(2, 4, vec![0.0; 5]);
        let (e, _) = sample
            .initialize(receiver, short, 20, Timespan::ZERO)
            .expect_err("short data");
        assert_eq!(
            SampleError::ShortData {
                required: 8,
                available: 5
            },
            e
        );
        assert!(!sample.is_initialized());
    }

    fn frame_with_rate(channels: i32, samples: i32, sample_rate: i32) -> AudioFrame {
        AudioFrame {
            sample_rate,
            ..frame(channels, samples, vec![0.0; (channels * samples) as usize])
        }
    }

    #[test]
    fn test_release_frees_once() {
        let library = mock::Library::new();
        let receiver = receiver(&library);
        let mock = library.last_receiver().expect("mock receiver");

        let mut sample = AudioSample::new();
        sample
            .initialize(
                receiver.clone(),
                mock::audio_frame(2, 16, 48000, 0),
                20,
                Timespan::ZERO,
            )
            .expect("initialize");
        sample
            .initialize(receiver, mock::audio_frame(2, 16, 48000, 0), 20, Timespan::ZERO)
            .expect("initialize");
        assert_eq!(1, mock.freed().audio);

        sample.release();
        sample.release();
        assert_eq!(2, mock.freed().audio);
        assert!(sample.buffer().is_empty());

        drop(sample);
        assert_eq!(2, mock.freed().audio);
    }

    #[test]
    fn test_drop_frees_frame() {
        let library = mock::Library::new();
        let receiver = receiver(&library);
        let mock = library.last_receiver().expect("mock receiver");

        let mut sample = AudioSample::new();
        sample
            .initialize(receiver, mock::audio_frame(1, 8, 48000, 0), 20, Timespan::ZERO)
            .expect("initialize");
        drop(sample);
        assert_eq!(1, mock.freed().audio);
    }
}
