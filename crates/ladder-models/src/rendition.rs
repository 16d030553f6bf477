//! Rendition specs: one resolution/bitrate variant of the source video.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::{ModelError, ModelResult};

/// Output frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// ffmpeg scale filter for this resolution.
    pub fn scale_filter(&self) -> String {
        format!("scale={}:{}", self.width, self.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidResolution(s.to_string());

        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;

        if width == 0 || height == 0 {
            return Err(invalid());
        }

        Ok(Self { width, height })
    }
}

impl Serialize for Resolution {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Resolution {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A single encode profile of the quality ladder.
///
/// Catalog entries carry `min_source_height == resolution.height` so a
/// rendition is never produced by upscaling. Caller-supplied specs have a
/// `min_source_height` of zero and are planned unconditionally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenditionSpec {
    /// Human label, also used in artifact file names (e.g. `720p`)
    pub label: String,
    /// Target frame size
    pub resolution: Resolution,
    /// Target video bitrate in ffmpeg syntax (e.g. `1500k`)
    pub bitrate: String,
    /// Smallest source height this rendition may be derived from
    pub min_source_height: u32,
}

impl RenditionSpec {
    /// Create a catalog entry.
    pub fn catalog_entry(
        label: impl Into<String>,
        resolution: Resolution,
        bitrate: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            resolution,
            bitrate: bitrate.into(),
            min_source_height: resolution.height,
        }
    }

    /// Create a caller-supplied spec (never filtered by source height).
    pub fn custom(
        label: impl Into<String>,
        resolution: Resolution,
        bitrate: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            resolution,
            bitrate: bitrate.into(),
            min_source_height: 0,
        }
    }

    /// Whether this spec may be derived from a source of the given height.
    pub fn fits_source(&self, source_height: u32) -> bool {
        self.min_source_height <= source_height
    }

    /// Playlist file name for this rendition.
    pub fn playlist_name(&self) -> String {
        format!("stream-{}.m3u8", self.label)
    }

    /// Segment file pattern (ffmpeg `%03d` numbering).
    pub fn segment_pattern(&self) -> String {
        format!("stream-{}_%03d.ts", self.label)
    }
}

/// Extra rendition requested by the uploader.
///
/// Wire format: `{"resolution": "1280x720", "bitrate": "1500k", "label": "720p"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RenditionRequest {
    #[validate(custom(function = "validate_resolution"))]
    pub resolution: String,

    #[validate(custom(function = "validate_bitrate"))]
    pub bitrate: String,

    #[validate(length(min = 1, max = 32), custom(function = "validate_label"))]
    pub label: String,
}

impl RenditionRequest {
    /// Validate and convert into a planned spec.
    pub fn into_spec(self) -> ModelResult<RenditionSpec> {
        self.validate()
            .map_err(|e| ModelError::InvalidRendition(e.to_string()))?;
        let resolution = self.resolution.parse()?;
        Ok(RenditionSpec::custom(self.label, resolution, self.bitrate))
    }
}

/// Labels end up in file names, so only `[A-Za-z0-9_-]` is accepted.
pub fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Bitrate in ffmpeg syntax: digits with an optional `k`/`M` suffix.
pub fn is_valid_bitrate(bitrate: &str) -> bool {
    let digits = bitrate.trim_end_matches(['k', 'K', 'm', 'M']);
    let suffix_len = bitrate.len() - digits.len();

    suffix_len <= 1
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && digits.chars().any(|c| c != '0')
}

fn validate_label(label: &str) -> Result<(), ValidationError> {
    if is_valid_label(label) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_label"))
    }
}

fn validate_bitrate(bitrate: &str) -> Result<(), ValidationError> {
    if is_valid_bitrate(bitrate) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_bitrate"))
    }
}

fn validate_resolution(resolution: &str) -> Result<(), ValidationError> {
    resolution
        .parse::<Resolution>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_resolution"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_parse() {
        let r: Resolution = "1280x720".parse().unwrap();
        assert_eq!(r, Resolution::new(1280, 720));
        assert_eq!(r.to_string(), "1280x720");
        assert_eq!(r.scale_filter(), "scale=1280:720");

        assert!("1280".parse::<Resolution>().is_err());
        assert!("0x720".parse::<Resolution>().is_err());
        assert!("axb".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_catalog_entry_never_upscales() {
        let spec = RenditionSpec::catalog_entry("720p", Resolution::new(1280, 720), "1500k");
        assert_eq!(spec.min_source_height, 720);
        assert!(spec.fits_source(720));
        assert!(spec.fits_source(1080));
        assert!(!spec.fits_source(719));
    }

    #[test]
    fn test_custom_spec_fits_any_source() {
        let spec = RenditionSpec::custom("4k", Resolution::new(3840, 2160), "12M");
        assert!(spec.fits_source(1));
    }

    #[test]
    fn test_artifact_names() {
        let spec = RenditionSpec::catalog_entry("360p", Resolution::new(640, 360), "800k");
        assert_eq!(spec.playlist_name(), "stream-360p.m3u8");
        assert_eq!(spec.segment_pattern(), "stream-360p_%03d.ts");
    }

    #[test]
    fn test_request_into_spec() {
        let request: RenditionRequest = serde_json::from_str(
            r#"{"resolution":"854x480","bitrate":"1000k","label":"480p"}"#,
        )
        .unwrap();

        let spec = request.into_spec().unwrap();
        assert_eq!(spec.label, "480p");
        assert_eq!(spec.resolution, Resolution::new(854, 480));
        assert_eq!(spec.min_source_height, 0);
    }

    #[test]
    fn test_request_rejects_unsafe_label() {
        let request = RenditionRequest {
            resolution: "854x480".into(),
            bitrate: "1000k".into(),
            label: "../480p".into(),
        };
        assert!(request.into_spec().is_err());
    }

    #[test]
    fn test_bitrate_validation() {
        assert!(is_valid_bitrate("800k"));
        assert!(is_valid_bitrate("3M"));
        assert!(is_valid_bitrate("2500000"));
        assert!(!is_valid_bitrate("k"));
        assert!(!is_valid_bitrate("0k"));
        assert!(!is_valid_bitrate("8kk"));
        assert!(!is_valid_bitrate("fast"));
    }
}
