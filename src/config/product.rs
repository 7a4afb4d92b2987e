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
use serde::Deserialize;

const DEFAULT_LONG_NAME: &str = "ndimedia player";
const DEFAULT_SHORT_NAME: &str = "ndimedia";
const DEFAULT_MANUFACTURER: &str = "ndimedia";
const DEFAULT_SESSION: &str = "default";

/// The product identity announced to every source the player connects to.
#[derive(Deserialize, Clone, Default)]
pub struct Product {
    long_name: Option<String>,
    short_name: Option<String>,
    manufacturer: Option<String>,
    version: Option<String>,
    model_name: Option<String>,
    serial: Option<String>,
    session: Option<String>,
}

impl Product {
    pub fn long_name(&self) -> &str {
        self.long_name.as_deref().unwrap_or(DEFAULT_LONG_NAME)
    }

    pub fn short_name(&self) -> &str {
        self.short_name.as_deref().unwrap_or(DEFAULT_SHORT_NAME)
    }

    pub fn manufacturer(&self) -> &str {
        self.manufacturer.as_deref().unwrap_or(DEFAULT_MANUFACTURER)
    }

    /// Defaults to the crate version.
    pub fn version(&self) -> &str {
        self.version
            .as_deref()
            .unwrap_or(env!("CARGO_PKG_VERSION"))
    }

    /// Defaults to the short name.
    pub fn model_name(&self) -> &str {
        self.model_name.as_deref().unwrap_or(self.short_name())
    }

    pub fn serial(&self) -> &str {
        self.serial.as_deref().unwrap_or("")
    }

    pub fn session(&self) -> &str {
        self.session.as_deref().unwrap_or(DEFAULT_SESSION)
    }
}
