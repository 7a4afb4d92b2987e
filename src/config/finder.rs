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

use crate::ndi::FinderSettings;

/// A YAML representation of the source discovery settings.
#[derive(Deserialize, Clone, Default)]
pub struct Finder {
    /// Whether sources running on this machine are listed (default: true).
    show_local_sources: Option<bool>,

    /// Only list sources in these groups. Empty lists every group.
    groups: Option<Vec<String>>,

    /// Addresses to probe that mDNS discovery can't reach, e.g. other subnets.
    extra_addresses: Option<Vec<String>>,
}

impl Finder {
    /// Converts to the runtime's finder settings.
    pub fn to_settings(&self) -> FinderSettings {
        FinderSettings {
            show_local_sources: self.show_local_sources.unwrap_or(true),
            groups: self.groups.clone().unwrap_or_default(),
            extra_addresses: self.extra_addresses.clone().unwrap_or_default(),
        }
    }
}
