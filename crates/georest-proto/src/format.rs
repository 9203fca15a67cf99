//! Response formats.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Wire format of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// One JSON object per record.
    Json,
    /// A GeoJSON feature collection.
    GeoJson,
    /// The plain encoding rendered as XML.
    Xml,
}

impl Format {
    /// Name used in request paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::GeoJson => "geojson",
            Format::Xml => "xml",
        }
    }

    /// MIME type of the response body.
    pub fn content_type(&self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::GeoJson => "application/geo+json",
            Format::Xml => "application/xml",
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "geojson" => Ok(Format::GeoJson),
            "xml" => Ok(Format::Xml),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
