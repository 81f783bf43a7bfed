//! Target container formats and their capability table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a format name cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown image format: {0}")]
pub struct FormatParseError(pub String);

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Jpeg,
    Png,
    Webp,
    Gif,
}

/// What an output format can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether the encoder honours a scalar quality setting.
    pub supports_quality: bool,
    /// Whether the container can store an alpha channel.
    pub supports_alpha: bool,
}

impl Format {
    /// Every format, in the order the UI lists them.
    pub const ALL: [Format; 4] = [Format::Jpeg, Format::Png, Format::Webp, Format::Gif];

    pub fn capabilities(self) -> Capabilities {
        match self {
            Format::Jpeg => Capabilities {
                supports_quality: true,
                supports_alpha: false,
            },
            Format::Png => Capabilities {
                supports_quality: false,
                supports_alpha: true,
            },
            Format::Webp => Capabilities {
                supports_quality: true,
                supports_alpha: true,
            },
            Format::Gif => Capabilities {
                supports_quality: false,
                supports_alpha: true,
            },
        }
    }

    /// Lowercase format name (`jpeg`, `png`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Format::Jpeg => "jpeg",
            Format::Png => "png",
            Format::Webp => "webp",
            Format::Gif => "gif",
        }
    }

    /// File extension used for delivered artifacts. JPEG uses `jpg`.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Jpeg => "jpg",
            other => other.name(),
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Format::Jpeg => "image/jpeg",
            Format::Png => "image/png",
            Format::Webp => "image/webp",
            Format::Gif => "image/gif",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Format::Jpeg),
            "png" => Ok(Format::Png),
            "webp" => Ok(Format::Webp),
            "gif" => Ok(Format::Gif),
            _ => Err(FormatParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jpeg_extension_is_jpg() {
        assert_eq!(Format::Jpeg.extension(), "jpg");
        assert_eq!(Format::Png.extension(), "png");
        assert_eq!(Format::Webp.extension(), "webp");
        assert_eq!(Format::Gif.extension(), "gif");
    }

    #[test]
    fn test_quality_capability() {
        assert!(Format::Jpeg.capabilities().supports_quality);
        assert!(Format::Webp.capabilities().supports_quality);
        assert!(!Format::Png.capabilities().supports_quality);
        assert!(!Format::Gif.capabilities().supports_quality);
    }

    #[test]
    fn test_alpha_capability() {
        assert!(!Format::Jpeg.capabilities().supports_alpha);
        assert!(Format::Png.capabilities().supports_alpha);
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("JPEG".parse::<Format>(), Ok(Format::Jpeg));
        assert_eq!("jpg".parse::<Format>(), Ok(Format::Jpeg));
        assert_eq!(" webp ".parse::<Format>(), Ok(Format::Webp));
        assert_eq!(
            "tiff".parse::<Format>(),
            Err(FormatParseError("tiff".to_string()))
        );
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(Format::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(Format::Gif.to_string(), "gif");
    }
}
