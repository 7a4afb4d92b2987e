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
    ndi::{MetadataFrame, Receiver},
    timecode::Timespan,
};

/// A metadata sample. The payload is the XML text the source sent.
pub struct BinarySample {
    receiver: Arc<dyn Receiver>,
    frame: Option<MetadataFrame>,
    time: Timespan,
}

impl BinarySample {
    /// Wraps a frame. On failure the frame is handed back so the caller can release it.
    pub fn initialize(
        receiver: Arc<dyn Receiver>,
        frame: MetadataFrame,
        time: Timespan,
    ) -> Result<BinarySample, (SampleError, MetadataFrame)> {
        if frame.data.is_empty() {
            return Err((SampleError::EmptyData, frame));
        }

        Ok(BinarySample {
            receiver,
            frame: Some(frame),
            time,
        })
    }

    pub fn data(&self) -> &str {
        self.frame.as_ref().map_or("", |frame| frame.data.as_str())
    }

    /// The payload size as the runtime reports it, including the terminating NUL.
    pub fn size(&self) -> usize {
        self.frame.as_ref().map_or(0, |frame| frame.length())
    }
}

impl MediaSample for BinarySample {
    fn time(&self) -> Timespan {
        self.time
    }

    fn duration(&self) -> Timespan {
        Timespan::ZERO
    }
}

impl Drop for BinarySample {
    fn drop(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.receiver.free_metadata(frame);
        }
    }
}

impl fmt::Debug for BinarySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinarySample")
            .field("data", &self.data())
            .field("time", &self.time)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use crate::{
        ndi::{mock, Bandwidth, ColorFormat, Library, ReceiverSettings, Source},
        samples::{MediaSample, SampleError},
        timecode::Timespan,
    };

    use super::BinarySample;

    #[test]
    fn test_binary_sample() {
        let library = mock::Library::new();
        let receiver = library
            .create_receiver(&ReceiverSettings {
                source: Source::from_address("10.0.0.2:5961"),
                color_format: ColorFormat::UyvyBgra,
                bandwidth: Bandwidth::MetadataOnly,
                allow_video_fields: true,
                name: "test".to_string(),
            })
            .expect("receiver");
        let mock = library.last_receiver().expect("mock receiver");

        let (e, _) = BinarySample::initialize(
            receiver.clone(),
            mock::metadata_frame("", 0),
            Timespan::ZERO,
        )
        .expect_err("empty");
        assert_eq!(SampleError::EmptyData, e);

        let sample = BinarySample::initialize(
            receiver,
            mock::metadata_frame("<tally on_program=\"true\"/>", 5),
            Timespan::from_ticks(11),
        )
        .expect("initialize");
        assert_eq!("<tally on_program=\"true\"/>", sample.data());
        assert_eq!(27, sample.size());
        assert_eq!(Timespan::from_ticks(11), sample.time());
        assert_eq!(Timespan::ZERO, sample.duration());

        drop(sample);
        assert_eq!(1, mock.freed().metadata);
    }
}
