//! Schema references and resource locations
//!
//! A [`SchemaReference`] says which validation, if any, runs before
//! conversion. XSD schemas are addressed by a [`Location`].

use crate::error::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Resource location - a file path or a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// URL; only `file://` URLs can be loaded
    Url(Url),
}

impl Location {
    /// Create a location from a string (auto-detect type)
    pub fn from_str(s: &str) -> Result<Self> {
        // Single-letter schemes are Windows drive letters, not URLs.
        if let Ok(url) = Url::parse(s) {
            if url.scheme().len() > 1 {
                return Ok(Location::Url(url));
            }
        }

        Ok(Location::Path(PathBuf::from(s)))
    }

    /// Get the location as a string
    pub fn as_str(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::Url(u) => u.to_string(),
        }
    }

    /// Check if this is a remote location (non-file URL)
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Url(url) if url.scheme() != "file")
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        !self.is_remote()
    }
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Location::Path(path)
    }
}

impl From<&Path> for Location {
    fn from(path: &Path) -> Self {
        Location::Path(path.to_path_buf())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which schema, if any, validates the document before conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SchemaReference {
    /// No validation
    #[default]
    None,
    /// Validate against the DTD declared by the document's DOCTYPE
    Dtd,
    /// Validate against an external XSD schema
    Xsd(Location),
}

impl SchemaReference {
    /// Reference an XSD schema by path or URL string
    pub fn xsd(location: &str) -> Result<Self> {
        Ok(SchemaReference::Xsd(Location::from_str(location)?))
    }

    /// Map the optional-string form: absent skips validation, an empty
    /// string selects the document's DTD, anything else is an XSD location
    pub fn from_option(schema: Option<&str>) -> Result<Self> {
        match schema {
            None => Ok(SchemaReference::None),
            Some("") => Ok(SchemaReference::Dtd),
            Some(location) => Self::xsd(location),
        }
    }

    /// Whether any validation is requested
    pub fn is_none(&self) -> bool {
        matches!(self, SchemaReference::None)
    }
}

impl fmt::Display for SchemaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaReference::None => write!(f, "none"),
            SchemaReference::Dtd => write!(f, "DTD"),
            SchemaReference::Xsd(location) => write!(f, "XSD {}", location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_file_urls_are_local() {
        let remote = Location::from_str("https://example.com/person.xsd").unwrap();
        assert!(remote.is_remote());

        let local = Location::from_str("file:///srv/schemas/person.xsd").unwrap();
        assert!(matches!(local, Location::Url(_)));
        assert!(local.is_file());
    }

    #[test]
    fn test_plain_strings_are_paths() {
        for raw in ["/srv/schemas/person.xsd", "schemas/person.xsd", r"C:\schemas\person.xsd"] {
            let location = Location::from_str(raw).unwrap();
            assert_eq!(location, Location::Path(PathBuf::from(raw)), "{}", raw);
            assert_eq!(location.to_string(), raw);
        }
    }

    #[test]
    fn test_schema_reference_from_option() {
        assert_eq!(SchemaReference::from_option(None).unwrap(), SchemaReference::None);
        assert_eq!(SchemaReference::from_option(Some("")).unwrap(), SchemaReference::Dtd);

        let xsd = SchemaReference::from_option(Some("person.xsd")).unwrap();
        assert_eq!(xsd.to_string(), "XSD person.xsd");
        assert!(!xsd.is_none());
    }
}
