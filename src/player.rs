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
    fmt::Write,
    sync::{Arc, Weak},
};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, error, info, span, Level, Span};

use crate::{
    config::Settings,
    connection::Connection,
    dispatch::{Dispatcher, FrameDispatcher, Sinks},
    error::PlayerError,
    metadata,
    ndi::{FrameCounts, Library},
    options::{MediaOptions, ReceiveOptions},
    samples::{BinarySample, PooledAudioSample, SamplePool, VideoSample},
    sink::Sink,
    state::{Playback, PlayerState, StateMachine},
    ticker::AudioTickable,
    timecode::{Clock, Timespan},
    tracks::{TrackCatalog, TrackType},
};

/// How many unread events are kept before new ones are dropped.
const EVENT_CAPACITY: usize = 256;

/// Events a player announces to whoever listens on [`Player::events`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaEvent {
    MediaOpened,
    MediaOpenFailed,
    MediaClosed,
    /// The source lost its last connection. Sinks should expect a gap.
    PlaybackSuspended,
    /// The source is connected again.
    PlaybackResumed,
    TracksChanged,
}

/// Plays one NDI source at a time.
///
/// The host drives a player through two tick cadences: [`FrameDispatcher::tick_audio`],
/// normally from an [`crate::ticker::AudioTicker`], and [`FrameDispatcher::tick_video`]
/// once per host frame together with [`Player::tick_input`].
pub struct Player {
    /// The receiver and everything known about the source.
    connection: Connection,
    /// Open, connected and paused flags.
    playback: Playback,
    /// Where samples go.
    sinks: Sinks,
    /// Audio sample storage.
    pool: SamplePool,
    /// The time samples are stamped with.
    clock: Clock,
    /// Held for the whole of an open or close so the two never interleave.
    lifecycle: Mutex<()>,
    events_tx: Sender<MediaEvent>,
    events_rx: Receiver<MediaEvent>,
    /// The logging span.
    span: Span,
}

impl Player {
    /// Creates a closed player.
    pub fn new(library: Arc<dyn Library>) -> Player {
        let (events_tx, events_rx) = crossbeam_channel::bounded(EVENT_CAPACITY);
        Player {
            connection: Connection::new(library),
            playback: Playback::new(),
            sinks: Sinks::default(),
            pool: SamplePool::new(),
            clock: Clock::default(),
            lifecycle: Mutex::new(()),
            events_tx,
            events_rx,
            span: span!(Level::INFO, "player"),
        }
    }

    /// Opens the source a URL names. Whatever was open before is closed first. The
    /// player enters Preparing and starts playing once the source reports a connection.
    pub fn open(
        &self,
        url: &str,
        options: &dyn MediaOptions,
        settings: &Settings,
    ) -> Result<(), PlayerError> {
        let _enter = self.span.enter();
        let _lifecycle = self.lifecycle.lock();
        self.close_locked();

        let resolved = ReceiveOptions::resolve(options, settings);
        let source = match self.connection.open(url, &resolved) {
            Ok(source) => source,
            Err(e) => {
                error!(url, err = e.to_string(), "Unable to open media");
                self.emit(MediaEvent::MediaOpenFailed);
                return Err(e);
            }
        };

        self.clock.reset();
        self.clock.set_embedded(resolved.use_timecode);

        self.connection
            .send_metadata(&metadata::product_xml(&settings.product()), 0);
        if let Some(format) = metadata::format_xml(&resolved) {
            self.connection.send_metadata(&format, 0);
        }
        if let Some(custom) = metadata::custom_xml(settings.custom_metadata()) {
            self.connection.send_metadata(custom, 0);
        }

        self.playback.opened();
        info!(
            url,
            source = source.to_string(),
            use_timecode = resolved.use_timecode,
            "Opened media"
        );
        self.emit(MediaEvent::TracksChanged);
        self.emit(MediaEvent::MediaOpened);
        Ok(())
    }

    /// Closes the source. Safe to call in any state.
    pub fn close(&self) {
        let _enter = self.span.enter();
        let _lifecycle = self.lifecycle.lock();
        self.close_locked();
    }

    /// Requires the lifecycle lock.
    fn close_locked(&self) {
        self.playback.closed();
        let closed = self.connection.close();
        self.pool.reset();
        self.clock.reset();

        if closed {
            info!("Closed media");
            self.emit(MediaEvent::TracksChanged);
            self.emit(MediaEvent::MediaClosed);
        }
    }

    /// The URL of the open source, empty when closed.
    pub fn url(&self) -> String {
        self.connection.url()
    }

    /// A receiver for the player's events.
    pub fn events(&self) -> Receiver<MediaEvent> {
        self.events_rx.clone()
    }

    /// Registers the audio sink, or clears it with None. The player only holds it weakly.
    pub fn set_audio_sink(&self, sink: Option<Weak<dyn Sink<PooledAudioSample>>>) {
        self.sinks.audio.set(sink);
    }

    pub fn set_video_sink(&self, sink: Option<Weak<dyn Sink<VideoSample>>>) {
        self.sinks.video.set(sink);
    }

    pub fn set_metadata_sink(&self, sink: Option<Weak<dyn Sink<BinarySample>>>) {
        self.sinks.metadata.set(sink);
    }

    /// Reports the host's timecode. Only used when the source's own timecodes aren't.
    pub fn tick_input(&self, timecode: Timespan) {
        self.clock.host_tick(timecode);
    }

    /// The current playback time.
    pub fn time(&self) -> Timespan {
        self.clock.current()
    }

    /// Live sources have no duration.
    pub fn duration(&self) -> Timespan {
        Timespan::ZERO
    }

    pub fn is_looping(&self) -> bool {
        false
    }

    /// Looping is not supported.
    pub fn set_looping(&self, _looping: bool) -> bool {
        false
    }

    pub fn can_seek(&self) -> bool {
        false
    }

    /// Seeking is not supported.
    pub fn seek(&self, _time: Timespan) -> bool {
        false
    }

    pub fn can_scrub(&self) -> bool {
        false
    }

    /// Describes the open connection.
    pub fn info(&self) -> String {
        let (source, options) = match (self.connection.source(), self.connection.options()) {
            (Some(source), Some(options)) => (source, options),
            _ => return "Not connected".to_string(),
        };

        let mut info = String::new();
        let _ = writeln!(info, "URL: {}", self.connection.url());
        let _ = writeln!(info, "Source: {}", source);
        let _ = writeln!(info, "Receiver name: {}", options.receiver_name);
        let _ = writeln!(info, "Bandwidth: {}", options.bandwidth);
        let _ = writeln!(info, "Color format: {}", options.color_format);
        let _ = writeln!(
            info,
            "Timecode: {}",
            if self.clock.is_embedded() {
                "embedded"
            } else {
                "host"
            }
        );
        let _ = write!(info, "State: {}", self.playback.state());
        info
    }

    /// Reports frame counts and queue depths.
    pub fn stats(&self) -> String {
        let receiver = match self.connection.receiver() {
            Some(receiver) => receiver,
            None => return "Not connected".to_string(),
        };
        let performance = receiver.performance();
        let queue = receiver.queue();

        let mut stats = String::new();
        write_counts(&mut stats, "Total frames", &performance.total);
        write_counts(&mut stats, "Dropped frames", &performance.dropped);
        write_counts(&mut stats, "Queue depths", &queue);
        stats.truncate(stats.trim_end().len());
        stats
    }

    fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher {
            connection: &self.connection,
            playback: &self.playback,
            sinks: &self.sinks,
            pool: &self.pool,
            clock: &self.clock,
        }
    }

    fn emit(&self, event: MediaEvent) {
        match self.events_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                debug!(event = ?event, "Event queue full, dropping event")
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

fn write_counts(out: &mut String, title: &str, counts: &FrameCounts) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "  Video: {}", counts.video);
    let _ = writeln!(out, "  Audio: {}", counts.audio);
    let _ = writeln!(out, "  Metadata: {}", counts.metadata);
}

impl StateMachine for Player {
    fn state(&self) -> PlayerState {
        self.playback.state()
    }

    fn rate(&self) -> f32 {
        if self.playback.is_playing() {
            1.0
        } else {
            0.0
        }
    }

    fn set_rate(&self, rate: f32) -> bool {
        let _enter = self.span.enter();
        let accepted = self.playback.set_rate(rate);
        if accepted {
            info!(rate, state = self.playback.state().to_string(), "Rate changed");
        } else {
            debug!(rate, "Rejected rate");
        }
        accepted
    }
}

impl FrameDispatcher for Player {
    fn tick_audio(&self) {
        self.dispatcher().audio_cycle();
    }

    fn tick_video(&self) {
        let dispatcher = self.dispatcher();
        if let Some(event) = dispatcher.poll_liveness() {
            let _enter = self.span.enter();
            info!(
                state = self.playback.state().to_string(),
                "Source connection changed"
            );
            self.emit(event);
        }
        dispatcher.video_cycle();
    }
}

impl AudioTickable for Player {
    fn tick_audio(&self) {
        FrameDispatcher::tick_audio(self);
    }
}

impl TrackCatalog for Player {
    fn num_tracks(&self, kind: TrackType) -> i32 {
        self.connection.num_tracks(kind)
    }

    fn selected_track(&self, kind: TrackType) -> i32 {
        self.connection.selected_track(kind)
    }

    fn select_track(&self, kind: TrackType, index: i32) -> bool {
        self.connection.select_track(kind, index)
    }

    fn track_display_name(&self, kind: TrackType, index: i32) -> String {
        self.connection.track_display_name(kind, index)
    }

    fn track_language(&self, kind: TrackType, index: i32) -> String {
        self.connection.track_language(kind, index)
    }

    fn audio_track_channels(&self, index: i32) -> u32 {
        self.connection.audio_track_channels(index)
    }

    fn audio_track_sample_rate(&self, index: i32) -> u32 {
        self.connection.audio_track_sample_rate(index)
    }

    fn video_track_dimensions(&self, index: i32) -> (u32, u32) {
        self.connection.video_track_dimensions(index)
    }

    fn video_track_frame_rate(&self, index: i32) -> f32 {
        self.connection.video_track_frame_rate(index)
    }

    fn video_track_bitrate(&self, index: i32) -> u64 {
        self.connection.video_track_bitrate(index)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.close();
    }
}
