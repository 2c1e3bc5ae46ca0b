//! Resource bounds for conversion and validation
//!
//! Every entry point takes a [`Limits`] so that hostile input (huge payloads,
//! pathological nesting, attribute floods, oversized schemas) fails early with
//! [`Error::LimitExceeded`] instead of exhausting memory or stack.

use crate::error::{Error, Result};

/// Bounds applied while parsing, walking and validating a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Deepest element a document may contain (root is depth 1)
    ///
    /// Checked by a streaming pass before the tree is built. The tree parser
    /// recurses once per level, so values far above the default need a
    /// thread stack larger than the usual 2 MiB.
    pub max_xml_depth: usize,

    /// Largest accepted input document, in bytes
    pub max_xml_size: usize,

    /// Most attributes a single element may carry
    pub max_attributes: usize,

    /// Largest XSD or external DTD subset that will be loaded, in bytes
    pub max_schema_size: usize,
}

const MIB: usize = 1024 * 1024;

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_depth: 256,
            max_xml_size: 100 * MIB,
            max_attributes: 1000,
            max_schema_size: 10 * MIB,
        }
    }
}

impl Limits {
    /// Default bounds
    pub fn new() -> Self {
        Self::default()
    }

    /// Tight bounds for untrusted input
    pub fn strict() -> Self {
        Self {
            max_xml_depth: 64,
            max_xml_size: 10 * MIB,
            max_attributes: 100,
            max_schema_size: MIB,
        }
    }

    /// Loose bounds for large trusted documents
    pub fn permissive() -> Self {
        Self {
            max_xml_depth: 1024,
            max_xml_size: 1024 * MIB,
            max_attributes: 10_000,
            max_schema_size: 100 * MIB,
        }
    }

    /// Override the depth bound
    pub fn with_max_xml_depth(mut self, depth: usize) -> Self {
        self.max_xml_depth = depth;
        self
    }

    /// Override the document size bound
    pub fn with_max_xml_size(mut self, bytes: usize) -> Self {
        self.max_xml_size = bytes;
        self
    }

    /// Override the per-element attribute bound
    pub fn with_max_attributes(mut self, count: usize) -> Self {
        self.max_attributes = count;
        self
    }

    /// Override the schema size bound
    pub fn with_max_schema_size(mut self, bytes: usize) -> Self {
        self.max_schema_size = bytes;
        self
    }

    /// Fails when an element sits deeper than `max_xml_depth`
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        ensure(depth, self.max_xml_depth, "element depth", "")
    }

    /// Fails when the input document is larger than `max_xml_size`
    pub fn check_xml_size(&self, bytes: usize) -> Result<()> {
        ensure(bytes, self.max_xml_size, "document size", " bytes")
    }

    /// Fails when an element carries more than `max_attributes`
    pub fn check_attributes(&self, count: usize) -> Result<()> {
        ensure(count, self.max_attributes, "attribute count", "")
    }

    /// Fails when a schema resource is larger than `max_schema_size`
    pub fn check_schema_size(&self, bytes: usize) -> Result<()> {
        ensure(bytes, self.max_schema_size, "schema size", " bytes")
    }
}

fn ensure(actual: usize, max: usize, what: &str, unit: &str) -> Result<()> {
    if actual > max {
        return Err(Error::LimitExceeded(format!(
            "{what} {actual}{unit} is over the limit of {max}{unit}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_are_inclusive() {
        let limits = Limits::new().with_max_xml_depth(3).with_max_attributes(1);
        assert!(limits.check_xml_depth(3).is_ok());
        assert!(limits.check_xml_depth(4).is_err());
        assert!(limits.check_attributes(1).is_ok());
        assert!(limits.check_attributes(2).is_err());
    }

    #[test]
    fn test_presets_are_ordered() {
        let (strict, default, loose) = (Limits::strict(), Limits::default(), Limits::permissive());
        assert!(strict.max_xml_depth < default.max_xml_depth);
        assert!(default.max_xml_depth < loose.max_xml_depth);
        assert!(strict.max_schema_size < loose.max_schema_size);
    }

    #[test]
    fn test_message_names_the_bound() {
        let err = Limits::new()
            .with_max_schema_size(10)
            .check_schema_size(11)
            .unwrap_err();
        assert_eq!(err.to_string(), "limit exceeded: schema size 11 bytes is over the limit of 10 bytes");
    }
}
