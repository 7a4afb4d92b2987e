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

//! The XML payloads announced to a source once per connection.

use std::fmt::Write;

use crate::{config::Product, options::ReceiveOptions};

/// Escapes a value for use inside a double quoted XML attribute.
pub fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Builds the product identity descriptor.
pub fn product_xml(product: &Product) -> String {
    let attributes = [
        ("long_name", product.long_name()),
        ("short_name", product.short_name()),
        ("manufacturer", product.manufacturer()),
        ("version", product.version()),
        ("model_name", product.model_name()),
        ("serial", product.serial()),
        ("session", product.session()),
    ];

    let mut xml = String::from("<ndi_product");
    for (name, value) in attributes {
        push_attr(&mut xml, name, value);
    }
    xml.push_str("/>");
    xml
}

/// Builds the format hint descriptor from the preferences that are actually set. Returns
/// None when there are no hints at all.
pub fn format_xml(options: &ReceiveOptions) -> Option<String> {
    let mut audio = Vec::new();
    if options.audio_channels > 0 {
        audio.push(("no_channels", options.audio_channels.to_string()));
    }
    if options.audio_sample_rate > 0 {
        audio.push(("sample_rate", options.audio_sample_rate.to_string()));
    }

    let mut video = Vec::new();
    if options.video_width > 0 {
        video.push(("xres", options.video_width.to_string()));
    }
    if options.video_height > 0 {
        video.push(("yres", options.video_height.to_string()));
    }
    if options.frame_rate_n > 0 {
        video.push(("frame_rate_n", options.frame_rate_n.to_string()));
    }
    if options.frame_rate_d > 0 {
        video.push(("frame_rate_d", options.frame_rate_d.to_string()));
    }
    if let Some(progressive) = options.progressive {
        video.push(("progressive", progressive.to_string()));
    }

    if audio.is_empty() && video.is_empty() {
        return None;
    }

    let mut xml = String::from("<ndi_format>");
    for (element, attributes) in [("audio_format", audio), ("video_format", video)] {
        if attributes.is_empty() {
            continue;
        }
        xml.push('<');
        xml.push_str(element);
        for (name, value) in attributes {
            push_attr(&mut xml, name, &value);
        }
        xml.push_str("/>");
    }
    xml.push_str("</ndi_format>");
    Some(xml)
}

/// Returns the operator's free-form metadata, or None if it is blank.
pub fn custom_xml(blob: &str) -> Option<&str> {
    let blob = blob.trim();
    if blob.is_empty() {
        None
    } else {
        Some(blob)
    }
}

fn push_attr(xml: &mut String, name: &str, value: &str) {
    // Writing to a String can't fail.
    let _ = write!(xml, " {}=\"{}\"", name, escape_attr(value));
}
