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
use std::fmt;

/// The selection index meaning no track is selected.
pub const INDEX_NONE: i32 = -1;

/// Undetermined, per ISO 639-2.
const LANGUAGE_UNDETERMINED: &str = "und";

/// The kinds of tracks a connection exposes. An open connection has exactly one track
/// of each kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackType {
    Audio,
    Video,
    Metadata,
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackType::Audio => "audio",
            TrackType::Video => "video",
            TrackType::Metadata => "metadata",
        };
        write!(f, "{}", name)
    }
}

/// Track enumeration, selection and format queries.
pub trait TrackCatalog {
    /// One track per kind while open, zero while closed.
    fn num_tracks(&self, kind: TrackType) -> i32;

    /// The selected track, or [`INDEX_NONE`].
    fn selected_track(&self, kind: TrackType) -> i32;

    /// Selects a track. Only 0 and [`INDEX_NONE`] are valid, and only while tracks exist.
    fn select_track(&self, kind: TrackType, index: i32) -> bool;

    fn track_display_name(&self, kind: TrackType, index: i32) -> String;

    fn track_language(&self, kind: TrackType, index: i32) -> String;

    fn audio_track_channels(&self, index: i32) -> u32;

    fn audio_track_sample_rate(&self, index: i32) -> u32;

    fn video_track_dimensions(&self, index: i32) -> (u32, u32);

    fn video_track_frame_rate(&self, index: i32) -> f32;

    /// Estimated bitrate of the video track in bytes per second.
    fn video_track_bitrate(&self, index: i32) -> u64;
}

/// The display name of the track at `index`, or an empty string if there is none.
pub(crate) fn display_name(kind: TrackType, index: i32, tracks: i32) -> String {
    if !valid_index(index, tracks) {
        return String::new();
    }
    match kind {
        TrackType::Audio => "Audio Track",
        TrackType::Video => "Video Track",
        TrackType::Metadata => "Metadata Track",
    }
    .to_string()
}

pub(crate) fn language(index: i32, tracks: i32) -> String {
    if valid_index(index, tracks) {
        LANGUAGE_UNDETERMINED.to_string()
    } else {
        String::new()
    }
}

pub(crate) fn valid_index(index: i32, tracks: i32) -> bool {
    index >= 0 && index < tracks
}

/// The selected track per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TrackSelection {
    audio: i32,
    video: i32,
    metadata: i32,
}

impl Default for TrackSelection {
    fn default() -> Self {
        TrackSelection {
            audio: INDEX_NONE,
            video: INDEX_NONE,
            metadata: INDEX_NONE,
        }
    }
}

impl TrackSelection {
    pub fn get(&self, kind: TrackType) -> i32 {
        match kind {
            TrackType::Audio => self.audio,
            TrackType::Video => self.video,
            TrackType::Metadata => self.metadata,
        }
    }

    pub fn is_selected(&self, kind: TrackType) -> bool {
        self.get(kind) != INDEX_NONE
    }

    /// Changes the selection, rejecting anything but 0 and [`INDEX_NONE`] or any change
    /// while there are no tracks.
    pub fn select(&mut self, kind: TrackType, index: i32, tracks: i32) -> bool {
        if tracks <= 0 || (index != INDEX_NONE && !valid_index(index, tracks)) {
            return false;
        }
        match kind {
            TrackType::Audio => self.audio = index,
            TrackType::Video => self.video = index,
            TrackType::Metadata => self.metadata = index,
        }
        true
    }
}

/// The last known formats seen on a connection.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct FormatCache {
    pub audio_channels: u32,
    pub audio_sample_rate: u32,
    pub video_dimensions: (u32, u32),
    pub video_frame_rate: f32,
    pub video_bitrate: u64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_selection_defaults_to_none() {
        let selection = TrackSelection::default();
        for kind in [TrackType::Audio, TrackType::Video, TrackType::Metadata] {
            assert_eq!(INDEX_NONE, selection.get(kind));
            assert!(!selection.is_selected(kind));
        }
    }

    #[test]
    fn test_selection_bounds() {
        let mut selection = TrackSelection::default();
        assert!(!selection.select(TrackType::Video, 1, 1));
        assert!(!selection.select(TrackType::Video, -2, 1));
        assert!(selection.select(TrackType::Video, 0, 1));
        assert_eq!(0, selection.get(TrackType::Video));
        assert!(selection.select(TrackType::Video, INDEX_NONE, 1));
        assert_eq!(INDEX_NONE, selection.get(TrackType::Video));

        // Nothing can be selected or deselected without tracks.
        assert!(!selection.select(TrackType::Audio, 0, 0));
        assert!(!selection.select(TrackType::Audio, INDEX_NONE, 0));
    }

    #[test]
    fn test_track_info() {
        assert_eq!("Audio Track", display_name(TrackType::Audio, 0, 1));
        assert_eq!("Metadata Track", display_name(TrackType::Metadata, 0, 1));
        assert_eq!("", display_name(TrackType::Video, 0, 0));
        assert_eq!("", display_name(TrackType::Video, 1, 1));
        assert_eq!("und", language(0, 1));
        assert_eq!("", language(INDEX_NONE, 1));
    }
}
