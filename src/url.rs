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

//! Media URLs of the form `ndi://<endpoint-or-name>`.

use crate::{config::resolve_hostname, error::PlayerError, ndi::Source};

pub const SCHEME: &str = "ndi://";

/// Source names beginning with this prefix refer to the local machine.
const LOCALHOST_PREFIX: &str = "localhost ";

/// Parses a media URL into a source. A remainder containing `:` is an `ip:port`
/// endpoint, anything else is a source name.
pub fn parse(url: &str) -> Result<Source, PlayerError> {
    parse_with_hostname(url, resolve_hostname)
}

fn parse_with_hostname<F>(url: &str, hostname: F) -> Result<Source, PlayerError>
where
    F: FnOnce() -> String,
{
    if url.is_empty() {
        return Err(PlayerError::EmptyUrl);
    }

    let remainder = match url.strip_prefix(SCHEME) {
        Some(remainder) => remainder.trim(),
        None => return Err(PlayerError::InvalidScheme(url.to_string())),
    };

    if remainder.is_empty() {
        return Err(PlayerError::EmptySource(url.to_string()));
    }

    if remainder.contains(':') {
        return Ok(Source::from_address(remainder));
    }

    match remainder.strip_prefix(LOCALHOST_PREFIX) {
        Some(rest) => Ok(Source::from_name(&format!("{} {}", hostname(), rest))),
        None => Ok(Source::from_name(remainder)),
    }
}

/// Builds the media URL of a source, preferring its name over its endpoint.
pub fn for_source(source: &Source) -> Option<String> {
    source
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .or(source.address.as_deref().filter(|address| !address.is_empty()))
        .map(|target| format!("{}{}", SCHEME, target))
}
