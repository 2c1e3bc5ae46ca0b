//! Capability detection
//!
//! The XML parser is always compiled in; the DTD and XSD engines sit behind
//! the `dtd` and `xsd` cargo features. A request that needs a missing engine
//! fails before any work is done.

use crate::error::{Error, Result};
use crate::locations::SchemaReference;
use std::fmt;

/// An engine the converter may depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Well-formedness parsing and tree access
    XmlParser,
    /// DTD validation
    DtdValidation,
    /// XSD validation
    XsdValidation,
}

impl Capability {
    /// Feature-style name of the capability
    pub fn name(&self) -> &'static str {
        match self {
            Capability::XmlParser => "xml",
            Capability::DtdValidation => "dtd",
            Capability::XsdValidation => "xsd",
        }
    }

    /// Whether this build includes the capability
    pub fn is_available(&self) -> bool {
        match self {
            Capability::XmlParser => true,
            Capability::DtdValidation => cfg!(feature = "dtd"),
            Capability::XsdValidation => cfg!(feature = "xsd"),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Capabilities compiled into this build
pub fn available() -> Vec<Capability> {
    [
        Capability::XmlParser,
        Capability::DtdValidation,
        Capability::XsdValidation,
    ]
    .into_iter()
    .filter(Capability::is_available)
    .collect()
}

/// Capabilities a conversion with `schema` depends on
pub fn required_for(schema: &SchemaReference) -> Vec<Capability> {
    match schema {
        SchemaReference::None => vec![Capability::XmlParser],
        SchemaReference::Dtd => vec![Capability::XmlParser, Capability::DtdValidation],
        SchemaReference::Xsd(_) => vec![Capability::XmlParser, Capability::XsdValidation],
    }
}

/// Fail with [`Error::CapabilityMissing`] if a required engine is absent
pub fn check(schema: &SchemaReference) -> Result<()> {
    match required_for(schema).into_iter().find(|c| !c.is_available()) {
        Some(missing) => Err(Error::CapabilityMissing(format!(
            "{} validation was not compiled in (enable the '{}' feature)",
            missing.name().to_uppercase(),
            missing.name()
        ))),
        None => Ok(()),
    }
}
