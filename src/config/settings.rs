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
use std::{path::Path, time::Duration};

use config::{Config, File, FileFormat};
use duration_string::DurationString;
use serde::Deserialize;

use super::{error::ConfigError, finder::Finder, product::Product};
use crate::{
    ndi::{Bandwidth, ColorFormat},
    options::{keys, OptionMap},
};

const DEFAULT_RECEIVER_NAME: &str = "ndimedia";
const DEFAULT_AUDIO_REFERENCE_LEVEL: i32 = 20;
const DEFAULT_AUDIO_TICK_INTERVAL: Duration = Duration::from_millis(5);

/// Player settings, assembled by the caller and handed to every open.
#[derive(Deserialize, Clone, Default)]
pub struct Settings {
    /// The product identity sent to sources.
    product: Option<Product>,

    /// The name receivers announce to sources (default: "ndimedia").
    receiver_name: Option<String>,

    /// Free-form XML sent to every source after connecting.
    custom_metadata: Option<String>,

    /// Headroom in dB for 16 bit audio conversion (default: 20).
    audio_reference_level: Option<i32>,

    /// Stamp samples with the timecodes embedded in frames instead of the host's clock.
    use_timecode: Option<bool>,

    /// How often the audio ticker drains receivers (default: 5ms).
    audio_tick_interval: Option<String>,

    /// Source discovery settings.
    finder: Option<Finder>,

    /// Format preferences used when the caller's options don't specify them.
    defaults: Option<Defaults>,
}

/// Default format preferences. Zero or absent means no preference.
#[derive(Deserialize, Clone, Default)]
pub struct Defaults {
    bandwidth: Option<Bandwidth>,
    color_format: Option<ColorFormat>,
    audio_channels: Option<u32>,
    audio_sample_rate: Option<u32>,
    video_width: Option<u32>,
    video_height: Option<u32>,
    frame_rate_n: Option<u32>,
    frame_rate_d: Option<u32>,
    progressive: Option<bool>,
}

impl Settings {
    /// Loads settings from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Settings, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Settings>()?)
    }

    /// Parses settings from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Settings, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<Settings>()?)
    }

    pub fn product(&self) -> Product {
        self.product.clone().unwrap_or_default()
    }

    pub fn receiver_name(&self) -> &str {
        self.receiver_name
            .as_deref()
            .unwrap_or(DEFAULT_RECEIVER_NAME)
    }

    /// Free-form XML for sources, empty if unset.
    pub fn custom_metadata(&self) -> &str {
        self.custom_metadata.as_deref().unwrap_or("")
    }

    pub fn audio_reference_level(&self) -> i32 {
        self.audio_reference_level
            .unwrap_or(DEFAULT_AUDIO_REFERENCE_LEVEL)
    }

    pub fn use_timecode(&self) -> bool {
        self.use_timecode.unwrap_or(false)
    }

    /// Returns the audio tick interval.
    pub fn audio_tick_interval(&self) -> Result<Duration, ConfigError> {
        match &self.audio_tick_interval {
            Some(interval) => DurationString::from_string(interval.clone())
                .map(Into::into)
                .map_err(|e| ConfigError::Duration {
                    value: interval.clone(),
                    reason: e.to_string(),
                }),
            None => Ok(DEFAULT_AUDIO_TICK_INTERVAL),
        }
    }

    pub fn finder(&self) -> Finder {
        self.finder.clone().unwrap_or_default()
    }

    /// Builds the default media options these settings imply. Only preferences that are
    /// actually set appear in the map.
    pub fn media_options(&self) -> OptionMap {
        let mut options = OptionMap::new()
            .with_string(keys::RECEIVER_NAME, self.receiver_name())
            .with_int(
                keys::AUDIO_REFERENCE_LEVEL,
                self.audio_reference_level() as i64,
            )
            .with_bool(keys::USE_TIMECODE, self.use_timecode());

        let defaults = match &self.defaults {
            Some(defaults) => defaults,
            None => return options,
        };

        if let Some(bandwidth) = defaults.bandwidth {
            options.set_int(keys::BANDWIDTH, bandwidth.value());
        }
        if let Some(color_format) = defaults.color_format {
            options.set_int(keys::COLOR_FORMAT, color_format.value());
        }
        if let Some(progressive) = defaults.progressive {
            options.set_string(keys::PROGRESSIVE, &progressive.to_string());
        }

        let numbers = [
            (keys::AUDIO_CHANNELS, defaults.audio_channels),
            (keys::AUDIO_SAMPLE_RATE, defaults.audio_sample_rate),
            (keys::VIDEO_WIDTH, defaults.video_width),
            (keys::VIDEO_HEIGHT, defaults.video_height),
            (keys::FRAME_RATE_N, defaults.frame_rate_n),
            (keys::FRAME_RATE_D, defaults.frame_rate_d),
        ];
        for (key, value) in numbers {
            if let Some(value) = value {
                options.set_int(key, value as i64);
            }
        }

        options
    }
}
