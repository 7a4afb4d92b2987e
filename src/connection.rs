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

//! Ownership of the receiver handle.
//!
//! A connection holds at most one receiver. Everything that reads the receiver takes a
//! clone of the handle under the lock and lets go of the lock before using it, so a
//! close never waits on a capture and a capture never sees a half torn down handle.
//! Frames captured before a close are still released through the receiver that
//! produced them, since the clone keeps it alive.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    error::PlayerError,
    ndi::{Library, MetadataFrame, Receiver, ReceiverSettings, Source},
    options::ReceiveOptions,
    tracks::{self, FormatCache, TrackCatalog, TrackSelection, TrackType},
    url,
};

/// The state guarded by the connection lock.
#[derive(Default)]
struct ConnectionState {
    receiver: Option<Arc<dyn Receiver>>,
    url: String,
    source: Option<Source>,
    options: Option<ReceiveOptions>,
    formats: FormatCache,
    selection: TrackSelection,
}

impl ConnectionState {
    fn tracks(&self) -> i32 {
        if self.receiver.is_some() {
            1
        } else {
            0
        }
    }
}

/// What a dispatch cycle needs, read under the lock in one go.
#[derive(Clone)]
pub(crate) struct Snapshot {
    pub receiver: Arc<dyn Receiver>,
    pub selection: TrackSelection,
    pub audio_reference_level: i32,
}

/// A connection to one source.
pub struct Connection {
    library: Arc<dyn Library>,
    state: Mutex<ConnectionState>,
}

impl Connection {
    pub fn new(library: Arc<dyn Library>) -> Connection {
        Connection {
            library,
            state: Mutex::new(ConnectionState::default()),
        }
    }

    /// Connects to the source a URL names. Any previous receiver is released before the
    /// new one is created. On failure the connection is left closed.
    pub fn open(&self, media_url: &str, options: &ReceiveOptions) -> Result<Source, PlayerError> {
        let source = url::parse(media_url)?;

        let mut state = self.state.lock();
        if let Some(previous) = state.receiver.take() {
            debug!(url = state.url, "Releasing previous receiver");
            drop(previous);
        }
        *state = ConnectionState::default();

        let settings = ReceiverSettings {
            source: source.clone(),
            color_format: options.color_format,
            bandwidth: options.bandwidth,
            allow_video_fields: options.allow_video_fields(),
            name: options.receiver_name.clone(),
        };
        let receiver = match self.library.create_receiver(&settings) {
            Some(receiver) => receiver,
            None => return Err(PlayerError::ReceiverCreation(source.to_string())),
        };

        debug!(
            source = source.to_string(),
            bandwidth = options.bandwidth.to_string(),
            color_format = options.color_format.to_string(),
            allow_video_fields = settings.allow_video_fields,
            "Created receiver"
        );

        state.receiver = Some(receiver);
        state.url = media_url.to_string();
        state.source = Some(source.clone());
        state.options = Some(options.clone());
        Ok(source)
    }

    /// Releases the receiver and forgets everything known about the source. Returns
    /// true if a receiver was actually released.
    pub fn close(&self) -> bool {
        let receiver = {
            let mut state = self.state.lock();
            let receiver = state.receiver.take();
            *state = ConnectionState::default();
            receiver
        };

        // Out of the slot, so no new cycle can pick it up. Cycles already holding a
        // clone keep the receiver alive until they finish.
        receiver.is_some()
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().receiver.is_some()
    }

    /// Returns a handle to the receiver, if open.
    pub fn receiver(&self) -> Option<Arc<dyn Receiver>> {
        self.state.lock().receiver.clone()
    }

    pub(crate) fn snapshot(&self) -> Option<Snapshot> {
        let state = self.state.lock();
        let receiver = state.receiver.clone()?;
        Some(Snapshot {
            receiver,
            selection: state.selection,
            audio_reference_level: state
                .options
                .as_ref()
                .map_or(0, |options| options.audio_reference_level),
        })
    }

    /// The URL of the open connection, empty when closed.
    pub fn url(&self) -> String {
        self.state.lock().url.clone()
    }

    pub fn source(&self) -> Option<Source> {
        self.state.lock().source.clone()
    }

    pub fn options(&self) -> Option<ReceiveOptions> {
        self.state.lock().options.clone()
    }

    /// Attaches XML to the connection. Sources receive it on every new connection.
    ///
    /// Sending while closed is a bug in the caller.
    pub fn send_metadata(&self, xml: &str, timecode: i64) {
        match self.receiver() {
            Some(receiver) => {
                debug!(xml, "Sending connection metadata");
                receiver.add_connection_metadata(&MetadataFrame::new(xml, timecode));
            }
            None => {
                debug_assert!(false, "connection metadata sent while closed");
                warn!(xml, "Dropping connection metadata, the connection is closed");
            }
        }
    }

    /// Updates the format cache, but only while `receiver` is still the open receiver.
    /// A cycle that outlived a close must not resurrect stale formats.
    pub(crate) fn update_formats<F>(&self, receiver: &Arc<dyn Receiver>, update: F)
    where
        F: FnOnce(&mut FormatCache),
    {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        match &state.receiver {
            Some(current) if Arc::ptr_eq(current, receiver) => update(&mut state.formats),
            _ => {}
        }
    }

    fn formats(&self, index: i32) -> Option<FormatCache> {
        let state = self.state.lock();
        if tracks::valid_index(index, state.tracks()) {
            Some(state.formats)
        } else {
            None
        }
    }
}

impl TrackCatalog for Connection {
    fn num_tracks(&self, _kind: TrackType) -> i32 {
        self.state.lock().tracks()
    }

    fn selected_track(&self, kind: TrackType) -> i32 {
        self.state.lock().selection.get(kind)
    }

    fn select_track(&self, kind: TrackType, index: i32) -> bool {
        let mut state = self.state.lock();
        let tracks = state.tracks();
        let selected = state.selection.select(kind, index, tracks);
        if selected {
            debug!(kind = kind.to_string(), index, "Selected track");
        }
        selected
    }

    fn track_display_name(&self, kind: TrackType, index: i32) -> String {
        tracks::display_name(kind, index, self.state.lock().tracks())
    }

    fn track_language(&self, _kind: TrackType, index: i32) -> String {
        tracks::language(index, self.state.lock().tracks())
    }

    fn audio_track_channels(&self, index: i32) -> u32 {
        self.formats(index)
            .map_or(0, |formats| formats.audio_channels)
    }

    fn audio_track_sample_rate(&self, index: i32) -> u32 {
        self.formats(index)
            .map_or(0, |formats| formats.audio_sample_rate)
    }

    fn video_track_dimensions(&self, index: i32) -> (u32, u32) {
        self.formats(index)
            .map_or((0, 0), |formats| formats.video_dimensions)
    }

    fn video_track_frame_rate(&self, index: i32) -> f32 {
        self.formats(index)
            .map_or(0.0, |formats| formats.video_frame_rate)
    }

    fn video_track_bitrate(&self, index: i32) -> u64 {
        self.formats(index)
            .map_or(0, |formats| formats.video_bitrate)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::{
        config::Settings,
        error::PlayerError,
        ndi::{mock, Bandwidth, ColorFormat, Source},
        options::{keys, OptionMap, ReceiveOptions},
        tracks::{TrackCatalog, TrackType, INDEX_NONE},
    };

    use super::Connection;

    fn options(map: OptionMap) -> ReceiveOptions {
        ReceiveOptions::resolve(&map, &Settings::default())
    }

    fn connection() -> (mock::Library, Connection) {
        let library = mock::Library::new();
        let connection = Connection::new(Arc::new(library.clone()));
        (library, connection)
    }

    #[test]
    fn test_open_builds_receiver_settings() {
        let (library, connection) = connection();
        let source = connection
            .open(
                "ndi://10.0.0.5:5961",
                &options(
                    OptionMap::new()
                        .with_int(keys::BANDWIDTH, Bandwidth::Lowest.value())
                        .with_int(keys::COLOR_FORMAT, 42)
                        .with_string(keys::PROGRESSIVE, "true")
                        .with_string(keys::RECEIVER_NAME, "Monitor"),
                ),
            )
            .expect("open");
        assert_eq!(Source::from_address("10.0.0.5:5961"), source);

        let mock = library.last_receiver().expect("mock receiver");
        let settings = mock.settings();
        assert_eq!(Source::from_address("10.0.0.5:5961"), settings.source);
        assert_eq!(Bandwidth::Lowest, settings.bandwidth);
        assert_eq!(ColorFormat::UyvyBgra, settings.color_format);
        assert!(!settings.allow_video_fields);
        assert_eq!("Monitor", settings.name);

        assert!(connection.is_open());
        assert_eq!("ndi://10.0.0.5:5961", connection.url());
        assert_eq!(1, connection.num_tracks(TrackType::Video));
        assert_eq!(INDEX_NONE, connection.selected_track(TrackType::Video));
    }

    #[test]
    fn test_open_failures_leave_connection_closed() {
        let (library, connection) = connection();
        let resolved = options(OptionMap::new());

        assert_eq!(Err(PlayerError::EmptyUrl), connection.open("", &resolved));
        assert!(matches!(
            connection.open("ndi:/bad", &resolved),
            Err(PlayerError::InvalidScheme(_))
        ));

        library.refuse_receivers(true);
        assert!(matches!(
            connection.open("ndi://HOST (Cam)", &resolved),
            Err(PlayerError::ReceiverCreation(_))
        ));
        assert!(!connection.is_open());
        assert_eq!("", connection.url());
        assert_eq!(0, connection.num_tracks(TrackType::Audio));
    }

    #[test]
    fn test_reopen_releases_previous_receiver() {
        let (library, connection) = connection();
        let resolved = options(OptionMap::new());

        connection.open("ndi://HOST (A)", &resolved).expect("open");
        connection.open("ndi://HOST (B)", &resolved).expect("open");
        assert_eq!(2, library.receivers_created());
        assert_eq!(1, library.live_receivers());

        // A failed reopen still releases the old receiver.
        library.refuse_receivers(true);
        assert!(connection.open("ndi://HOST (C)", &resolved).is_err());
        assert_eq!(0, library.live_receivers());
    }

    #[test]
    fn test_close_resets_state() {
        let (library, connection) = connection();
        connection
            .open("ndi://HOST (A)", &options(OptionMap::new()))
            .expect("open");
        assert!(connection.select_track(TrackType::Audio, 0));

        let receiver = connection.receiver().expect("receiver");
        connection.update_formats(&receiver, |formats| {
            formats.audio_channels = 2;
            formats.audio_sample_rate = 48000;
        });
        assert_eq!(2, connection.audio_track_channels(0));

        assert!(connection.close());
        assert!(!connection.close());
        assert_eq!(0, connection.audio_track_channels(0));
        assert_eq!(0, connection.audio_track_sample_rate(0));
        assert_eq!(INDEX_NONE, connection.selected_track(TrackType::Audio));
        assert_eq!("", connection.url());
        assert!(connection.source().is_none());

        // An in flight handle keeps the receiver alive but can't update the cache.
        assert_eq!(1, library.live_receivers());
        connection.update_formats(&receiver, |formats| formats.audio_channels = 8);
        assert_eq!(0, connection.audio_track_channels(0));
        drop(receiver);
        assert_eq!(0, library.live_receivers());
    }

    #[test]
    fn test_track_queries() {
        let (_library, connection) = connection();
        assert!(!connection.select_track(TrackType::Video, 0));
        assert_eq!("", connection.track_display_name(TrackType::Video, 0));

        connection
            .open("ndi://HOST (A)", &options(OptionMap::new()))
            .expect("open");
        assert!(!connection.select_track(TrackType::Video, 1));
        assert!(connection.select_track(TrackType::Video, 0));
        assert_eq!(0, connection.selected_track(TrackType::Video));
        assert_eq!("Video Track", connection.track_display_name(TrackType::Video, 0));
        assert_eq!("und", connection.track_language(TrackType::Video, 0));
        assert_eq!((0, 0), connection.video_track_dimensions(1));
    }

    #[test]
    fn test_send_metadata() {
        let (library, connection) = connection();
        connection
            .open("ndi://HOST (A)", &options(OptionMap::new()))
            .expect("open");
        connection.send_metadata("<hello/>", 0);

        let mock = library.last_receiver().expect("mock receiver");
        assert_eq!(vec!["<hello/>".to_string()], mock.connection_metadata());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "connection metadata sent while closed")]
    fn test_send_metadata_while_closed() {
        let (_library, connection) = connection();
        connection.send_metadata("<hello/>", 0);
    }
}
