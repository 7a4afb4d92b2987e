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
use std::collections::HashMap;

use tracing::warn;

use crate::{
    config::Settings,
    ndi::{Bandwidth, ColorFormat},
};

/// The option keys a player understands.
pub mod keys {
    pub const BANDWIDTH: &str = "Bandwidth";
    pub const COLOR_FORMAT: &str = "ColorFormat";
    pub const AUDIO_CHANNELS: &str = "AudioChannels";
    pub const AUDIO_SAMPLE_RATE: &str = "AudioSampleRate";
    pub const FRAME_RATE_N: &str = "FrameRateN";
    pub const FRAME_RATE_D: &str = "FrameRateD";
    pub const PROGRESSIVE: &str = "Progressive";
    pub const VIDEO_WIDTH: &str = "VideoWidth";
    pub const VIDEO_HEIGHT: &str = "VideoHeight";
    pub const USE_TIMECODE: &str = "UseTimecode";
    pub const AUDIO_REFERENCE_LEVEL: &str = "AudioReferenceLevel";
    pub const RECEIVER_NAME: &str = "ReceiverName";
}

/// A read-only, typed view of media options. Every lookup takes a default that is
/// returned for unknown keys.
pub trait MediaOptions {
    fn get_int(&self, key: &str, default: i64) -> i64;

    fn get_string(&self, key: &str, default: &str) -> String;

    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get_int(key, default as i64) != 0
    }
}

#[derive(Clone, Debug, PartialEq)]
enum OptionValue {
    Int(i64),
    String(String),
    Bool(bool),
}

/// Media options backed by a map.
#[derive(Clone, Debug, Default)]
pub struct OptionMap {
    values: HashMap<String, OptionValue>,
}

impl OptionMap {
    pub fn new() -> OptionMap {
        OptionMap::default()
    }

    pub fn with_int(mut self, key: &str, value: i64) -> OptionMap {
        self.set_int(key, value);
        self
    }

    pub fn with_string(mut self, key: &str, value: &str) -> OptionMap {
        self.set_string(key, value);
        self
    }

    pub fn with_bool(mut self, key: &str, value: bool) -> OptionMap {
        self.set_bool(key, value);
        self
    }

    pub fn set_int(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), OptionValue::Int(value));
    }

    pub fn set_string(&mut self, key: &str, value: &str) {
        self.values
            .insert(key.to_string(), OptionValue::String(value.to_string()));
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.values.insert(key.to_string(), OptionValue::Bool(value));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl MediaOptions for OptionMap {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.values.get(key) {
            Some(OptionValue::Int(value)) => *value,
            Some(OptionValue::Bool(value)) => *value as i64,
            Some(OptionValue::String(value)) => value.trim().parse().unwrap_or(default),
            None => default,
        }
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        match self.values.get(key) {
            Some(OptionValue::String(value)) => value.clone(),
            Some(OptionValue::Int(value)) => value.to_string(),
            Some(OptionValue::Bool(value)) => value.to_string(),
            None => default.to_string(),
        }
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            Some(OptionValue::Bool(value)) => *value,
            Some(OptionValue::Int(value)) => *value != 0,
            Some(OptionValue::String(value)) => parse_bool(value).unwrap_or(default),
            None => default,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// A two-level lookup: the caller's options first, then the settings' defaults.
struct Layered<'a> {
    options: &'a dyn MediaOptions,
    defaults: &'a dyn MediaOptions,
}

impl MediaOptions for Layered<'_> {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.options
            .get_int(key, self.defaults.get_int(key, default))
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        self.options
            .get_string(key, &self.defaults.get_string(key, default))
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.options
            .get_bool(key, self.defaults.get_bool(key, default))
    }
}

/// The options a connection is opened with, resolved once at open time.
#[derive(Clone, Debug, PartialEq)]
pub struct ReceiveOptions {
    pub bandwidth: Bandwidth,
    pub color_format: ColorFormat,
    /// Preferred channel count, 0 for no preference.
    pub audio_channels: i64,
    /// Preferred sample rate, 0 for no preference.
    pub audio_sample_rate: i64,
    pub frame_rate_n: i64,
    pub frame_rate_d: i64,
    /// Some(true) requests progressive video, Some(false) fielded, None no preference.
    pub progressive: Option<bool>,
    pub video_width: i64,
    pub video_height: i64,
    pub use_timecode: bool,
    /// Headroom in dB applied when converting audio to 16 bit.
    pub audio_reference_level: i32,
    pub receiver_name: String,
}

impl ReceiveOptions {
    /// Resolves the receive options from the caller's options, falling back to the
    /// defaults in the settings.
    pub fn resolve(options: &dyn MediaOptions, settings: &Settings) -> ReceiveOptions {
        let defaults = settings.media_options();
        let options = Layered {
            options,
            defaults: &defaults,
        };

        let bandwidth_value = options.get_int(keys::BANDWIDTH, Bandwidth::Highest.value());
        let bandwidth = Bandwidth::from_value(bandwidth_value).unwrap_or_else(|| {
            warn!(
                bandwidth = bandwidth_value,
                "Unsupported bandwidth requested, using highest"
            );
            Bandwidth::Highest
        });

        let color_value = options.get_int(keys::COLOR_FORMAT, ColorFormat::UyvyBgra.value());
        let color_format = ColorFormat::from_value(color_value).unwrap_or_else(|| {
            warn!(
                color_format = color_value,
                "Unsupported color format requested, using UYVY/BGRA"
            );
            ColorFormat::UyvyBgra
        });

        let progressive = parse_bool(&options.get_string(keys::PROGRESSIVE, ""));

        ReceiveOptions {
            bandwidth,
            color_format,
            audio_channels: options.get_int(keys::AUDIO_CHANNELS, 0).max(0),
            audio_sample_rate: options.get_int(keys::AUDIO_SAMPLE_RATE, 0).max(0),
            frame_rate_n: options.get_int(keys::FRAME_RATE_N, 0).max(0),
            frame_rate_d: options.get_int(keys::FRAME_RATE_D, 0).max(0),
            progressive,
            video_width: options.get_int(keys::VIDEO_WIDTH, 0).max(0),
            video_height: options.get_int(keys::VIDEO_HEIGHT, 0).max(0),
            use_timecode: options.get_bool(keys::USE_TIMECODE, false),
            audio_reference_level: options.get_int(keys::AUDIO_REFERENCE_LEVEL, 20) as i32,
            receiver_name: options.get_string(keys::RECEIVER_NAME, ""),
        }
    }

    /// Fielded video is allowed unless progressive video was requested.
    pub fn allow_video_fields(&self) -> bool {
        self.progressive != Some(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_unknown_keys_return_default() {
        let options = OptionMap::new();
        assert_eq!(7, options.get_int("Nope", 7));
        assert_eq!("x", options.get_string("Nope", "x"));
        assert!(options.get_bool("Nope", true));
    }

    #[test]
    fn test_value_conversions() {
        let options = OptionMap::new()
            .with_string("Number", " 42 ")
            .with_string("Flag", "TRUE")
            .with_string("Junk", "maybe")
            .with_bool("Bool", true)
            .with_int("Int", 0);

        assert_eq!(42, options.get_int("Number", 0));
        assert!(options.get_bool("Flag", false));
        assert!(!options.get_bool("Junk", false));
        assert_eq!(5, options.get_int("Junk", 5));
        assert_eq!(1, options.get_int("Bool", 0));
        assert!(!options.get_bool("Int", true));
        assert_eq!("0", options.get_string("Int", ""));
    }

    #[test]
    fn test_resolve_defaults() {
        let resolved = ReceiveOptions::resolve(&OptionMap::new(), &Settings::default());
        assert_eq!(Bandwidth::Highest, resolved.bandwidth);
        assert_eq!(ColorFormat::UyvyBgra, resolved.color_format);
        assert_eq!(None, resolved.progressive);
        assert!(resolved.allow_video_fields());
        assert!(!resolved.use_timecode);
        assert_eq!(20, resolved.audio_reference_level);
        assert_eq!(Settings::default().receiver_name(), resolved.receiver_name);
    }

    #[test]
    fn test_resolve_options() {
        let options = OptionMap::new()
            .with_int(keys::BANDWIDTH, Bandwidth::AudioOnly.value())
            .with_int(keys::COLOR_FORMAT, ColorFormat::BgrxBgra.value())
            .with_int(keys::AUDIO_CHANNELS, 2)
            .with_int(keys::AUDIO_SAMPLE_RATE, 48000)
            .with_string(keys::PROGRESSIVE, "true")
            .with_bool(keys::USE_TIMECODE, true)
            .with_int(keys::AUDIO_REFERENCE_LEVEL, 0)
            .with_string(keys::RECEIVER_NAME, "Wall");

        let resolved = ReceiveOptions::resolve(&options, &Settings::default());
        assert_eq!(Bandwidth::AudioOnly, resolved.bandwidth);
        assert_eq!(ColorFormat::BgrxBgra, resolved.color_format);
        assert_eq!(2, resolved.audio_channels);
        assert_eq!(48000, resolved.audio_sample_rate);
        assert_eq!(Some(true), resolved.progressive);
        assert!(!resolved.allow_video_fields());
        assert!(resolved.use_timecode);
        assert_eq!(0, resolved.audio_reference_level);
        assert_eq!("Wall", resolved.receiver_name);
    }

    #[test]
    fn test_unsupported_color_format_falls_back() {
        let options = OptionMap::new().with_int(keys::COLOR_FORMAT, 99);
        let resolved = ReceiveOptions::resolve(&options, &Settings::default());
        assert_eq!(ColorFormat::UyvyBgra, resolved.color_format);
    }

    #[test]
    fn test_unsupported_bandwidth_falls_back() {
        let options = OptionMap::new().with_int(keys::BANDWIDTH, 55);
        let resolved = ReceiveOptions::resolve(&options, &Settings::default());
        assert_eq!(Bandwidth::Highest, resolved.bandwidth);
    }
}
