//! The quality ladder: ordered candidate renditions.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::rendition::{is_valid_bitrate, is_valid_label, RenditionSpec, Resolution};

/// Ordered catalog of candidate renditions, lowest quality first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionCatalog {
    entries: Vec<RenditionSpec>,
}

impl Default for RenditionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl RenditionCatalog {
    /// 360p / 720p / 1080p ladder.
    pub fn standard() -> Self {
        Self {
            entries: vec![
                RenditionSpec::catalog_entry("360p", Resolution::new(640, 360), "800k"),
                RenditionSpec::catalog_entry("720p", Resolution::new(1280, 720), "1500k"),
                RenditionSpec::catalog_entry("1080p", Resolution::new(1920, 1080), "3000k"),
            ],
        }
    }

    /// Build a catalog from entries in their declared order.
    pub fn new(entries: Vec<RenditionSpec>) -> ModelResult<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !is_valid_label(&entry.label) {
                return Err(ModelError::InvalidCatalog(format!(
                    "label '{}' must match [A-Za-z0-9_-]+",
                    entry.label
                )));
            }
            if !seen.insert(entry.label.as_str()) {
                return Err(ModelError::InvalidCatalog(format!(
                    "duplicate label '{}'",
                    entry.label
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Parse `label=WxH@bitrate` entries separated by commas,
    /// e.g. `360p=640x360@800k,720p=1280x720@1500k`.
    pub fn parse(s: &str) -> ModelResult<Self> {
        let mut entries = Vec::new();

        for raw in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (label, rest) = raw
                .split_once('=')
                .ok_or_else(|| ModelError::InvalidCatalog(format!("missing '=' in '{raw}'")))?;
            let (resolution, bitrate) = rest
                .split_once('@')
                .ok_or_else(|| ModelError::InvalidCatalog(format!("missing '@' in '{raw}'")))?;

            let bitrate = bitrate.trim();
            if !is_valid_bitrate(bitrate) {
                return Err(ModelError::InvalidBitrate(bitrate.to_string()));
            }

            entries.push(RenditionSpec::catalog_entry(
                label.trim(),
                resolution.parse::<Resolution>()?,
                bitrate,
            ));
        }

        Self::new(entries)
    }

    pub fn entries(&self) -> &[RenditionSpec] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
