//! Reads XSD schemas and external DTD subsets
//!
//! Only the local file system is reachable: plain paths and `file://` URLs.
//! Every resource is held to [`Limits::max_schema_size`].

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::Location;
use std::fs;
use std::path::Path;

/// Schema resource reader
#[derive(Debug, Default)]
pub struct Loader {
    limits: Limits,
}

impl Loader {
    /// Loader with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `limits` instead of the defaults
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Read the resource at `location` as UTF-8 text
    pub fn load(&self, location: &Location) -> Result<String> {
        match location {
            Location::Path(path) => self.load_path(path),
            Location::Url(url) if url.scheme() == "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| Error::Resource(format!("Invalid file URL: {}", url)))?;
                self.load_path(&path)
            }
            Location::Url(url) => Err(Error::Resource(format!(
                "Remote resources are not supported: {}",
                url
            ))),
        }
    }

    /// Read a local file, checking its size before reading it
    pub fn load_path(&self, path: &Path) -> Result<String> {
        let unreadable =
            |e: std::io::Error| Error::Resource(format!("cannot read '{}': {}", path.display(), e));

        let size = fs::metadata(path).map_err(unreadable)?.len();
        self.limits
            .check_schema_size(usize::try_from(size).unwrap_or(usize::MAX))?;
        let content = fs::read_to_string(path).map_err(unreadable)?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "loaded resource");

        Ok(content)
    }
}
