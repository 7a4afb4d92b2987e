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

//! The capture loops.
//!
//! Each cycle drains everything the receiver has queued for its frame kinds and never
//! waits for more. Every captured frame is either wrapped in a sample and handed to a
//! sink or released on the spot. Nothing is forwarded unless the player is playing, the
//! track is selected and a live sink is registered.

use std::{sync::Arc, time::Duration};

use tracing::{debug, trace};

use crate::{
    connection::{Connection, Snapshot},
    ndi::{AudioFrame, Captured, FrameKinds, MetadataFrame, VideoFrame},
    player::MediaEvent,
    samples::{BinarySample, PixelFormat, PooledAudioSample, SamplePool, VideoSample},
    sink::{Sink, SinkSlot},
    state::Playback,
    timecode::{Clock, Timespan},
    tracks::TrackType,
};

/// The two tick cadences of a player.
pub trait FrameDispatcher {
    /// Drains pending audio. Meant to run more often than the video tick so the
    /// receiver's audio queue never overruns.
    fn tick_audio(&self);

    /// Polls liveness, then drains pending video and metadata.
    fn tick_video(&self);
}

/// What one cycle did with the frames it captured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Samples a sink accepted.
    pub forwarded: usize,
    /// Frames released without reaching a sink, including samples a sink refused.
    pub freed: usize,
}

impl CycleStats {
    pub fn captured(&self) -> usize {
        self.forwarded + self.freed
    }

    /// A sample a sink refused was dropped on the spot, which freed its frame.
    fn record(&mut self, accepted: bool) {
        if accepted {
            self.forwarded += 1;
        } else {
            self.freed += 1;
        }
    }
}

/// The registered sinks of a player, one per sample kind.
pub(crate) struct Sinks {
    pub audio: SinkSlot<PooledAudioSample>,
    pub video: SinkSlot<VideoSample>,
    pub metadata: SinkSlot<BinarySample>,
}

impl Default for Sinks {
    fn default() -> Self {
        Sinks {
            audio: SinkSlot::new(),
            video: SinkSlot::new(),
            metadata: SinkSlot::new(),
        }
    }
}

/// Runs capture cycles against one player's state.
pub(crate) struct Dispatcher<'a> {
    pub connection: &'a Connection,
    pub playback: &'a Playback,
    pub sinks: &'a Sinks,
    pub pool: &'a SamplePool,
    pub clock: &'a Clock,
}

impl Dispatcher<'_> {
    /// Queries the connection count and applies it to the playback state.
    pub fn poll_liveness(&self) -> Option<MediaEvent> {
        let receiver = self.connection.receiver()?;
        self.playback.update_connections(receiver.connections())
    }

    pub fn audio_cycle(&self) -> CycleStats {
        let mut stats = CycleStats::default();
        let snapshot = match self.connection.snapshot() {
            Some(snapshot) => snapshot,
            None => return stats,
        };
        let receiver = &snapshot.receiver;

        loop {
            match receiver.capture(FrameKinds::AUDIO, Duration::ZERO) {
                Captured::None => break,
                Captured::Error => {
                    debug!("Receive error while capturing audio");
                    break;
                }
                Captured::Audio(frame) => {
                    self.connection.update_formats(receiver, |formats| {
                        formats.audio_channels = frame.channels.max(0) as u32;
                        formats.audio_sample_rate = frame.sample_rate.max(0) as u32;
                    });
                    let time = self.clock.frame_arrived(frame.timecode);
                    self.forward_audio(&snapshot, frame, time, &mut stats);
                }
                Captured::Video(frame) => {
                    receiver.free_video(frame);
                    stats.freed += 1;
                }
                Captured::Metadata(frame) => {
                    receiver.free_metadata(frame);
                    stats.freed += 1;
                }
            }
        }

        if stats.captured() > 0 {
            trace!(
                forwarded = stats.forwarded,
                freed = stats.freed,
                "Audio cycle complete"
            );
        }
        stats
    }

    pub fn video_cycle(&self) -> CycleStats {
        let mut stats = CycleStats::default();
        let snapshot = match self.connection.snapshot() {
            Some(snapshot) => snapshot,
            None => return stats,
        };
        let receiver = &snapshot.receiver;

        loop {
            match receiver.capture(FrameKinds::VIDEO_AND_METADATA, Duration::ZERO) {
                Captured::None => break,
                Captured::Error => {
                    debug!("Receive error while capturing video");
                    break;
                }
                Captured::Video(frame) => {
                    let frame_rate = frame_rate(&frame);
                    self.connection.update_formats(receiver, |formats| {
                        formats.video_dimensions =
                            (frame.width.max(0) as u32, frame.height.max(0) as u32);
                        formats.video_frame_rate = frame_rate;
                        formats.video_bitrate = bitrate(&frame, frame_rate);
                    });
                    let time = self.clock.frame_arrived(frame.timecode);
                    self.forward_video(&snapshot, frame, time, &mut stats);
                }
                Captured::Metadata(frame) => {
                    let time = self.clock.frame_arrived(frame.timecode);
                    self.forward_metadata(&snapshot, frame, time, &mut stats);
                }
                Captured::Audio(frame) => {
                    receiver.free_audio(frame);
                    stats.freed += 1;
                }
            }
        }

        if stats.captured() > 0 {
            trace!(
                forwarded = stats.forwarded,
                freed = stats.freed,
                "Video cycle complete"
            );
        }
        stats
    }

    /// Returns the sink a frame of this kind should go to, if any.
    fn target<S>(
        &self,
        snapshot: &Snapshot,
        kind: TrackType,
        slot: &SinkSlot<S>,
    ) -> Option<Arc<dyn Sink<S>>> {
        if !snapshot.selection.is_selected(kind) || !self.playback.is_playing() {
            return None;
        }
        slot.get()
    }

    fn forward_audio(
        &self,
        snapshot: &Snapshot,
        frame: AudioFrame,
        time: Timespan,
        stats: &mut CycleStats,
    ) {
        let receiver = &snapshot.receiver;
        let sink = match self.target(snapshot, TrackType::Audio, &self.sinks.audio) {
            Some(sink) => sink,
            None => {
                receiver.free_audio(frame);
                stats.freed += 1;
                return;
            }
        };

        let mut sample = self.pool.acquire();
        match sample.initialize(
            receiver.clone(),
            frame,
            snapshot.audio_reference_level,
            time,
        ) {
            Ok(()) => {
                stats.record(sink.enqueue(sample));
            }
            Err((e, frame)) => {
                debug!(err = e.to_string(), "Dropping audio frame");
                receiver.free_audio(frame);
                stats.freed += 1;
            }
        }
    }

    fn forward_video(
        &self,
        snapshot: &Snapshot,
        frame: VideoFrame,
        time: Timespan,
        stats: &mut CycleStats,
    ) {
        let receiver = &snapshot.receiver;
        let sink = match self.target(snapshot, TrackType::Video, &self.sinks.video) {
            Some(sink) => sink,
            None => {
                receiver.free_video(frame);
                stats.freed += 1;
                return;
            }
        };

        let format = PixelFormat::from_fourcc(frame.fourcc);
        match VideoSample::initialize(receiver.clone(), frame, format, time) {
            Ok(sample) => {
                stats.record(sink.enqueue(sample));
            }
            Err((e, frame)) => {
                debug!(err = e.to_string(), "Dropping video frame");
                receiver.free_video(frame);
                stats.freed += 1;
            }
        }
    }

    fn forward_metadata(
        &self,
        snapshot: &Snapshot,
        frame: MetadataFrame,
        time: Timespan,
        stats: &mut CycleStats,
    ) {
        let receiver = &snapshot.receiver;
        let sink = match self.target(snapshot, TrackType::Metadata, &self.sinks.metadata) {
            Some(sink) => sink,
            None => {
                receiver.free_metadata(frame);
                stats.freed += 1;
                return;
            }
        };

        match BinarySample::initialize(receiver.clone(), frame, time) {
            Ok(sample) => {
                stats.record(sink.enqueue(sample));
            }
            Err((e, frame)) => {
                debug!(err = e.to_string(), "Dropping metadata frame");
                receiver.free_metadata(frame);
                stats.freed += 1;
            }
        }
    }
}

/// Frames per second, 0 if the frame doesn't say.
fn frame_rate(frame: &VideoFrame) -> f32 {
    if frame.frame_rate_n <= 0 || frame.frame_rate_d <= 0 {
        return 0.0;
    }
    frame.frame_rate_n as f32 / frame.frame_rate_d as f32
}

/// Bytes per second at this frame's size and rate.
fn bitrate(frame: &VideoFrame, frame_rate: f32) -> u64 {
    let bytes = frame.line_stride.max(0) as f64 * frame.height.max(0) as f64;
    (bytes * frame_rate as f64) as u64
}
