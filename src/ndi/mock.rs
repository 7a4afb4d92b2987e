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
    collections::VecDeque,
    f32::consts::PI,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicUsize, Ordering},
        Arc, Weak,
    },
    time::Duration,
};

use parking_lot::Mutex;
use tracing::debug;

use super::{
    AudioFrame, Captured, FinderSettings, FourCC, FrameCounts, FrameFormat, FrameKinds,
    MetadataFrame, Performance, ReceiverSettings, Source, VideoFrame,
};

/// A mock runtime. Receivers it creates never touch the network; frames are pushed into
/// them by hand and every capture and release is counted.
#[derive(Clone)]
pub struct Library {
    state: Arc<LibraryState>,
}

struct LibraryState {
    receivers: Mutex<Vec<Weak<Receiver>>>,
    refuse_receivers: AtomicBool,
    initial_connections: AtomicI32,
    live_receivers: Arc<AtomicUsize>,
    totals: Arc<Totals>,
    sources: Mutex<Vec<MockSource>>,
    finders_created: AtomicUsize,
}

/// Capture and free counts across every receiver a library ever created.
#[derive(Default)]
struct Totals {
    captured: Counters,
    freed: Counters,
}

/// A source the mock finder can discover.
#[derive(Clone)]
struct MockSource {
    source: Source,
    group: String,
    local: bool,
}

impl Library {
    /// Creates a new mock runtime.
    pub fn new() -> Library {
        Library {
            state: Arc::new(LibraryState {
                receivers: Mutex::new(Vec::new()),
                refuse_receivers: AtomicBool::new(false),
                initial_connections: AtomicI32::new(1),
                live_receivers: Arc::new(AtomicUsize::new(0)),
                totals: Arc::new(Totals::default()),
                sources: Mutex::new(Vec::new()),
                finders_created: AtomicUsize::new(0),
            }),
        }
    }

    /// Makes subsequent receiver creation fail, as the runtime does when it runs out of
    /// resources.
    pub fn refuse_receivers(&self, refuse: bool) {
        self.state.refuse_receivers.store(refuse, Ordering::Relaxed);
    }

    /// Sets the connection count new receivers start with.
    pub fn set_initial_connections(&self, connections: i32) {
        self.state
            .initial_connections
            .store(connections, Ordering::Relaxed);
    }

    /// Returns the most recently created receiver if it is still alive.
    pub fn last_receiver(&self) -> Option<Arc<Receiver>> {
        self.state
            .receivers
            .lock()
            .last()
            .and_then(|receiver| receiver.upgrade())
    }

    /// Returns the number of receivers created so far.
    pub fn receivers_created(&self) -> usize {
        self.state.receivers.lock().len()
    }

    /// Returns the number of receivers that have not been destroyed.
    pub fn live_receivers(&self) -> usize {
        self.state.live_receivers.load(Ordering::SeqCst)
    }

    /// Returns the frames captured from all receivers, including destroyed ones.
    pub fn total_captured(&self) -> FrameCounts {
        self.state.totals.captured.snapshot()
    }

    /// Returns the frames freed through all receivers, including destroyed ones.
    pub fn total_freed(&self) -> FrameCounts {
        self.state.totals.freed.snapshot()
    }

    /// Adds a source the finder will report.
    pub fn add_source(&self, name: &str, address: &str, group: &str, local: bool) {
        self.state.sources.lock().push(MockSource {
            source: Source {
                name: Some(name.to_string()),
                address: Some(address.to_string()),
            },
            group: group.to_string(),
            local,
        });
    }

    /// Returns the number of finders created so far.
    pub fn finders_created(&self) -> usize {
        self.state.finders_created.load(Ordering::Relaxed)
    }
}

impl Default for Library {
    fn default() -> Self {
        Library::new()
    }
}

impl super::Library for Library {
    fn create_receiver(&self, settings: &ReceiverSettings) -> Option<Arc<dyn super::Receiver>> {
        if self.state.refuse_receivers.load(Ordering::Relaxed) {
            debug!(source = settings.source.to_string(), "Refusing mock receiver");
            return None;
        }

        let receiver = Arc::new(Receiver::new(
            settings.clone(),
            self.state.initial_connections.load(Ordering::Relaxed),
            self.state.live_receivers.clone(),
            self.state.totals.clone(),
        ));
        self.state.receivers.lock().push(Arc::downgrade(&receiver));
        Some(receiver)
    }

    fn create_finder(&self, settings: &FinderSettings) -> Option<Box<dyn super::Finder>> {
        self.state.finders_created.fetch_add(1, Ordering::Relaxed);
        let sources = self.state.sources.lock().clone();
        Some(Box::new(Finder {
            settings: settings.clone(),
            sources,
        }))
    }
}

/// A mock finder. Applies the group and local filters to the library's sources and
/// reports every extra address as an unnamed source.
struct Finder {
    settings: FinderSettings,
    sources: Vec<MockSource>,
}

impl super::Finder for Finder {
    fn sources(&self) -> Vec<Source> {
        let mut sources: Vec<Source> = self
            .sources
            .iter()
            .filter(|mock| self.settings.show_local_sources || !mock.local)
            .filter(|mock| {
                self.settings.groups.is_empty() || self.settings.groups.contains(&mock.group)
            })
            .map(|mock| mock.source.clone())
            .collect();

        sources.extend(
            self.settings
                .extra_addresses
                .iter()
                .map(|address| Source::from_address(address)),
        );
        sources
    }
}

/// A mock receiver.
pub struct Receiver {
    settings: ReceiverSettings,
    pending: Mutex<VecDeque<Captured>>,
    connections: AtomicI32,
    connection_metadata: Mutex<Vec<String>>,
    captured: Counters,
    freed: Counters,
    dropped: Mutex<FrameCounts>,
    live_receivers: Arc<AtomicUsize>,
    totals: Arc<Totals>,
}

#[derive(Default)]
struct Counters {
    video: AtomicI64,
    audio: AtomicI64,
    metadata: AtomicI64,
}

impl Counters {
    fn count(&self, captured: &Captured) {
        match captured {
            Captured::Video(_) => self.video.fetch_add(1, Ordering::SeqCst),
            Captured::Audio(_) => self.audio.fetch_add(1, Ordering::SeqCst),
            Captured::Metadata(_) => self.metadata.fetch_add(1, Ordering::SeqCst),
            Captured::Error | Captured::None => 0,
        };
    }

    fn snapshot(&self) -> FrameCounts {
        FrameCounts {
            video: self.video.load(Ordering::SeqCst),
            audio: self.audio.load(Ordering::SeqCst),
            metadata: self.metadata.load(Ordering::SeqCst),
        }
    }
}

impl Receiver {
    fn new(
        settings: ReceiverSettings,
        connections: i32,
        live_receivers: Arc<AtomicUsize>,
        totals: Arc<Totals>,
    ) -> Receiver {
        live_receivers.fetch_add(1, Ordering::SeqCst);
        Receiver {
            settings,
            pending: Mutex::new(VecDeque::new()),
            connections: AtomicI32::new(connections),
            connection_metadata: Mutex::new(Vec::new()),
            captured: Counters::default(),
            freed: Counters::default(),
            dropped: Mutex::new(FrameCounts::default()),
            live_receivers,
            totals,
        }
    }

    /// Returns the settings this receiver was created with.
    pub fn settings(&self) -> &ReceiverSettings {
        &self.settings
    }

    /// Queues a video frame.
    pub fn push_video(&self, frame: VideoFrame) {
        self.pending.lock().push_back(Captured::Video(frame));
    }

    /// Queues an audio frame.
    pub fn push_audio(&self, frame: AudioFrame) {
        self.pending.lock().push_back(Captured::Audio(frame));
    }

    /// Queues a metadata frame.
    pub fn push_metadata(&self, frame: MetadataFrame) {
        self.pending.lock().push_back(Captured::Metadata(frame));
    }

    /// Queues a receive error. The next capture of any kind reports it.
    pub fn push_error(&self) {
        self.pending.lock().push_back(Captured::Error);
    }

    /// Sets the number of live connections.
    pub fn set_connections(&self, connections: i32) {
        self.connections.store(connections, Ordering::Relaxed);
    }

    /// Sets the dropped frame counts reported by the performance query.
    pub fn set_dropped(&self, dropped: FrameCounts) {
        *self.dropped.lock() = dropped;
    }

    /// Returns all connection metadata attached so far.
    pub fn connection_metadata(&self) -> Vec<String> {
        self.connection_metadata.lock().clone()
    }

    /// Returns the number of frames handed out by capture calls.
    pub fn captured(&self) -> FrameCounts {
        self.captured.snapshot()
    }

    /// Returns the number of frames released.
    pub fn freed(&self) -> FrameCounts {
        self.freed.snapshot()
    }

    /// Returns the number of frames still queued.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

impl super::Receiver for Receiver {
    fn capture(&self, kinds: FrameKinds, _timeout: Duration) -> Captured {
        let mut pending = self.pending.lock();
        let position = pending.iter().position(|captured| match captured {
            Captured::Video(_) => kinds.video,
            Captured::Audio(_) => kinds.audio,
            Captured::Metadata(_) => kinds.metadata,
            Captured::Error => true,
            Captured::None => false,
        });

        let captured = match position.and_then(|position| pending.remove(position)) {
            Some(captured) => captured,
            None => return Captured::None,
        };

        self.captured.count(&captured);
        self.totals.captured.count(&captured);
        captured
    }

    fn free_video(&self, _frame: VideoFrame) {
        self.freed.video.fetch_add(1, Ordering::SeqCst);
        self.totals.freed.video.fetch_add(1, Ordering::SeqCst);
    }

    fn free_audio(&self, _frame: AudioFrame) {
        self.freed.audio.fetch_add(1, Ordering::SeqCst);
        self.totals.freed.audio.fetch_add(1, Ordering::SeqCst);
    }

    fn free_metadata(&self, _frame: MetadataFrame) {
        self.freed.metadata.fetch_add(1, Ordering::SeqCst);
        self.totals.freed.metadata.fetch_add(1, Ordering::SeqCst);
    }

    fn add_connection_metadata(&self, frame: &MetadataFrame) {
        self.connection_metadata.lock().push(frame.data.clone());
    }

    fn connections(&self) -> i32 {
        self.connections.load(Ordering::Relaxed)
    }

    fn performance(&self) -> Performance {
        Performance {
            total: self.captured.snapshot(),
            dropped: *self.dropped.lock(),
        }
    }

    fn queue(&self) -> FrameCounts {
        let pending = self.pending.lock();
        let mut queue = FrameCounts::default();
        for captured in pending.iter() {
            match captured {
                Captured::Video(_) => queue.video += 1,
                Captured::Audio(_) => queue.audio += 1,
                Captured::Metadata(_) => queue.metadata += 1,
                Captured::Error | Captured::None => {}
            }
        }
        queue
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.live_receivers.fetch_sub(1, Ordering::SeqCst);
    }
}

impl fmt::Display for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.settings.source)
    }
}

/// Builds a BGRA test frame with vertical color bars.
pub fn video_frame(
    width: i32,
    height: i32,
    frame_rate_n: i32,
    frame_rate_d: i32,
    timecode: i64,
) -> VideoFrame {
    const BARS: [[u8; 4]; 4] = [
        [255, 255, 255, 255],
        [0, 255, 255, 255],
        [255, 255, 0, 255],
        [0, 0, 255, 255],
    ];

    let line_stride = width * 4;
    let mut data = Vec::with_capacity((line_stride * height).max(0) as usize);
    for _ in 0..height {
        for x in 0..width {
            let bar = (x * BARS.len() as i32 / width.max(1)) as usize;
            data.extend_from_slice(&BARS[bar.min(BARS.len() - 1)]);
        }
    }

    VideoFrame {
        width,
        height,
        line_stride,
        fourcc: FourCC::BGRA,
        frame_rate_n,
        frame_rate_d,
        aspect_ratio: if height > 0 {
            width as f32 / height as f32
        } else {
            0.0
        },
        format: FrameFormat::Progressive,
        timecode,
        data,
    }
}

/// Builds a planar audio frame carrying a 440Hz tone at half scale on every channel.
pub fn audio_frame(channels: i32, samples: i32, sample_rate: i32, timecode: i64) -> AudioFrame {
    let per_channel: Vec<f32> = (0..samples.max(0))
        .map(|i| 0.5 * (2.0 * PI * 440.0 * i as f32 / sample_rate.max(1) as f32).sin())
        .collect();

    let mut data = Vec::with_capacity(per_channel.len() * channels.max(0) as usize);
    for _ in 0..channels.max(0) {
        data.extend_from_slice(&per_channel);
    }

    AudioFrame {
        sample_rate,
        channels,
        samples,
        channel_stride: samples * std::mem::size_of::<f32>() as i32,
        timecode,
        data,
    }
}

/// Builds a metadata frame.
pub fn metadata_frame(xml: &str, timecode: i64) -> MetadataFrame {
    MetadataFrame::new(xml, timecode)
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use crate::ndi::{
        Bandwidth, Captured, ColorFormat, FinderSettings, FrameKinds, Library as _,
        Receiver as _, ReceiverSettings, Source,
    };

    use super::*;

    fn settings() -> ReceiverSettings {
        ReceiverSettings {
            source: Source::from_name("HOST (Test)"),
            color_format: ColorFormat::UyvyBgra,
            bandwidth: Bandwidth::Highest,
            allow_video_fields: true,
            name: "test".to_string(),
        }
    }

    #[test]
    fn test_capture_respects_kinds() {
        let library = Library::new();
        let receiver = library.create_receiver(&settings()).expect("receiver");
        let mock = library.last_receiver().expect("mock receiver");

        mock.push_video(video_frame(4, 2, 30, 1, 0));
        mock.push_audio(audio_frame(2, 8, 48000, 0));

        match receiver.capture(FrameKinds::AUDIO, Duration::ZERO) {
            Captured::Audio(frame) => receiver.free_audio(frame),
            other => panic!("expected audio, got {:?}", other),
        }
        assert!(matches!(
            receiver.capture(FrameKinds::AUDIO, Duration::ZERO),
            Captured::None
        ));
        match receiver.capture(FrameKinds::VIDEO_AND_METADATA, Duration::ZERO) {
            Captured::Video(frame) => receiver.free_video(frame),
            other => panic!("expected video, got {:?}", other),
        }

        assert_eq!(1, mock.captured().audio);
        assert_eq!(1, mock.captured().video);
        assert_eq!(mock.captured(), mock.freed());
    }

    #[test]
    fn test_receiver_lifetime_is_tracked() {
        let library = Library::new();
        let receiver = library.create_receiver(&settings()).expect("receiver");
        assert_eq!(1, library.live_receivers());
        drop(receiver);
        assert_eq!(0, library.live_receivers());
        assert!(library.last_receiver().is_none());
    }

    #[test]
    fn test_totals_outlive_receivers() {
        let library = Library::new();
        for _ in 0..2 {
            let receiver = library.create_receiver(&settings()).expect("receiver");
            let mock = library.last_receiver().expect("mock receiver");
            mock.push_audio(audio_frame(2, 8, 48000, 0));
            mock.push_metadata(metadata_frame("<a/>", 0));
            if let Captured::Audio(frame) = receiver.capture(FrameKinds::AUDIO, Duration::ZERO) {
                receiver.free_audio(frame);
            }
        }

        assert_eq!(0, library.live_receivers());
        assert_eq!(
            FrameCounts {
                video: 0,
                audio: 2,
                metadata: 0
            },
            library.total_captured()
        );
        assert_eq!(library.total_captured(), library.total_freed());
    }

    #[test]
    fn test_refused_receiver() {
        let library = Library::new();
        library.refuse_receivers(true);
        assert!(library.create_receiver(&settings()).is_none());
        assert_eq!(0, library.receivers_created());
    }

    #[test]
    fn test_finder_filters() {
        let library = Library::new();
        library.add_source("HOST (Local)", "127.0.0.1:5961", "public", true);
        library.add_source("STUDIO (Cam 1)", "10.0.0.2:5961", "studio", false);

        let finder = library
            .create_finder(&FinderSettings {
                show_local_sources: false,
                groups: vec!["studio".to_string()],
                extra_addresses: vec!["10.0.0.9:5961".to_string()],
            })
            .expect("finder");

        let sources = finder.sources();
        assert_eq!(2, sources.len());
        assert_eq!(Some("STUDIO (Cam 1)".to_string()), sources[0].name);
        assert_eq!(Some("10.0.0.9:5961".to_string()), sources[1].address);
    }

    #[test]
    fn test_generated_frames() {
        let video = video_frame(8, 2, 60000, 1001, 5);
        assert_eq!(8 * 4 * 2, video.data.len());
        assert_eq!(32, video.line_stride);

        let audio = audio_frame(2, 480, 48000, 0);
        assert_eq!(960, audio.data.len());
        assert_eq!(480 * 4, audio.channel_stride);
        assert!(audio.data.iter().all(|sample| sample.abs() <= 0.5));
    }
}
