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

use tracing::{debug, error};

use crate::{
    ndi::{self, FinderSettings, Library, Source},
    url,
};

/// A discovered source, with the URL a player can open it by.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceId {
    pub endpoint: String,
    pub name: String,
    pub url: String,
}

impl From<&Source> for SourceId {
    fn from(source: &Source) -> Self {
        SourceId {
            endpoint: source.address.clone().unwrap_or_default(),
            name: source.name.clone().unwrap_or_default(),
            url: url::for_source(source).unwrap_or_default(),
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.name.is_empty(), self.endpoint.is_empty()) {
            (false, false) => write!(f, "{} [{}]", self.name, self.endpoint),
            (false, true) => write!(f, "{}", self.name),
            (true, _) => write!(f, "{}", self.endpoint),
        }
    }
}

/// Source discovery. Any change to the discovery settings restarts discovery if it is
/// running.
pub struct Finder {
    library: Arc<dyn Library>,
    settings: FinderSettings,
    instance: Option<Box<dyn ndi::Finder>>,
}

impl Finder {
    /// Creates a finder. Discovery starts with [`Finder::initialize`].
    pub fn new(library: Arc<dyn Library>, settings: FinderSettings) -> Finder {
        Finder {
            library,
            settings,
            instance: None,
        }
    }

    /// (Re)starts discovery with the current settings.
    pub fn initialize(&mut self) -> bool {
        self.shutdown();
        self.instance = self.library.create_finder(&self.settings);
        match self.instance {
            Some(_) => {
                debug!(
                    show_local_sources = self.settings.show_local_sources,
                    groups = self.settings.groups.join(","),
                    extra_addresses = self.settings.extra_addresses.join(","),
                    "Started source discovery"
                );
                true
            }
            None => {
                error!("Unable to create a source finder");
                false
            }
        }
    }

    pub fn shutdown(&mut self) {
        self.instance = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.instance.is_some()
    }

    pub fn settings(&self) -> &FinderSettings {
        &self.settings
    }

    /// Lists the sources discovered so far, or None if discovery isn't running.
    pub fn sources(&self) -> Option<Vec<SourceId>> {
        let instance = self.instance.as_ref()?;
        Some(instance.sources().iter().map(SourceId::from).collect())
    }

    pub fn set_show_local_sources(&mut self, show: bool) {
        if self.settings.show_local_sources != show {
            self.settings.show_local_sources = show;
            self.settings_changed();
        }
    }

    pub fn add_extra_address(&mut self, address: &str) -> bool {
        add(&mut self.settings.extra_addresses, address) && self.settings_changed()
    }

    pub fn remove_extra_address(&mut self, address: &str) -> bool {
        remove(&mut self.settings.extra_addresses, address) && self.settings_changed()
    }

    pub fn clear_extra_addresses(&mut self) {
        if !self.settings.extra_addresses.is_empty() {
            self.settings.extra_addresses.clear();
            self.settings_changed();
        }
    }

    pub fn add_group(&mut self, group: &str) -> bool {
        add(&mut self.settings.groups, group) && self.settings_changed()
    }

    pub fn remove_group(&mut self, group: &str) -> bool {
        remove(&mut self.settings.groups, group) && self.settings_changed()
    }

    pub fn clear_groups(&mut self) {
        if !self.settings.groups.is_empty() {
            self.settings.groups.clear();
            self.settings_changed();
        }
    }

    /// Always returns true so it can terminate the add/remove chains.
    fn settings_changed(&mut self) -> bool {
        if self.is_initialized() {
            self.initialize();
        }
        true
    }
}

fn add(values: &mut Vec<String>, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || values.iter().any(|existing| existing == value) {
        return false;
    }
    values.push(value.to_string());
    true
}

fn remove(values: &mut Vec<String>, value: &str) -> bool {
    let before = values.len();
    values.retain(|existing| existing != value.trim());
    values.len() != before
}
