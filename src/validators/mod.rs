//! Schema validation
//!
//! Validation runs before conversion. A DTD comes from the document's own
//! DOCTYPE; an XSD is loaded from a file path or `file://` URL.

pub mod models;
pub mod validation;

#[cfg(feature = "dtd")]
pub mod dtd;

#[cfg(feature = "xsd")]
pub mod builtins;
#[cfg(feature = "xsd")]
pub mod document_validation;
#[cfg(feature = "xsd")]
pub mod facets;
#[cfg(feature = "xsd")]
pub mod schemas;

pub use models::{match_content, ContentMatch, Occurs, Particle, Term};
pub use validation::{element_path, DocumentValidator, ValidationContext, ValidationReport};

#[cfg(feature = "xsd")]
pub use schemas::XsdSchema;

use crate::capabilities;
use crate::error::Result;
use crate::limits::Limits;
use crate::locations::{Location, SchemaReference};

/// Validate `xml` against `schema`
///
/// Returns the report (warnings only) when the document is valid, and
/// [`Error::SchemaValidation`](crate::Error::SchemaValidation) carrying every
/// diagnostic otherwise.
pub fn validate(xml: &str, schema: &SchemaReference, limits: &Limits) -> Result<ValidationReport> {
    capabilities::check(schema)?;

    match schema {
        SchemaReference::None => Ok(ValidationReport::empty()),
        SchemaReference::Dtd => validate_dtd(xml, limits),
        SchemaReference::Xsd(location) => validate_xsd(xml, location, limits),
    }
}

#[cfg(feature = "dtd")]
fn validate_dtd(xml: &str, limits: &Limits) -> Result<ValidationReport> {
    dtd::validate(xml, limits)
}

#[cfg(not(feature = "dtd"))]
fn validate_dtd(_xml: &str, _limits: &Limits) -> Result<ValidationReport> {
    capabilities::check(&SchemaReference::Dtd).map(|_| ValidationReport::empty())
}

#[cfg(feature = "xsd")]
fn validate_xsd(xml: &str, location: &Location, limits: &Limits) -> Result<ValidationReport> {
    use crate::documents::Document;
    use crate::error::{Diagnostic, Error, Severity, INVALID_XML_FOR_SCHEMA, XSD_VALIDATION_FAILED};
    use crate::loaders::Loader;

    let document = Document::parse(xml, limits).map_err(|err| {
        tracing::warn!(error = %err, "XSD Load Error");
        Error::SchemaValidation {
            reason: INVALID_XML_FOR_SCHEMA.to_string(),
            diagnostics: vec![Diagnostic::new(err.to_string()).with_severity(Severity::Fatal)],
        }
    })?;

    let loader = Loader::new().with_limits(limits.clone());
    let mut context = ValidationContext::new(&document);

    match loader.load(location).and_then(|text| XsdSchema::parse(&text)) {
        Ok(schema) => {
            tracing::debug!(kind = schema.kind(), schema = %location, "validating document");
            schema.validate_document(&document, &mut context);
        }
        Err(err) => {
            context.fatal(format!("Failed to load schema '{}': {}", location, err));
        }
    }

    context.into_report().into_result(XSD_VALIDATION_FAILED)
}

#[cfg(not(feature = "xsd"))]
fn validate_xsd(_xml: &str, _location: &Location, _limits: &Limits) -> Result<ValidationReport> {
    capabilities::check(&SchemaReference::Xsd(_location.clone())).map(|_| ValidationReport::empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_no_schema_is_always_valid() {
        let report = validate("<a/>", &SchemaReference::None, &Limits::default()).unwrap();
        assert!(report.is_valid());
        assert!(report.diagnostics.is_empty());
    }

    #[cfg(feature = "xsd")]
    #[test]
    fn test_missing_schema_file() {
        let schema = SchemaReference::xsd("/nonexistent/schema.xsd").unwrap();
        match validate("<a/>", &schema, &Limits::default()) {
            Err(Error::SchemaValidation { reason, diagnostics }) => {
                assert_eq!(reason, crate::error::XSD_VALIDATION_FAILED);
                assert!(diagnostics[0].message.starts_with("Failed to load schema"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[cfg(feature = "xsd")]
    #[test]
    fn test_malformed_instance_for_xsd() {
        let schema = SchemaReference::xsd("/nonexistent/schema.xsd").unwrap();
        match validate("<a>", &schema, &Limits::default()) {
            Err(Error::SchemaValidation { reason, .. }) => {
                assert_eq!(reason, crate::error::INVALID_XML_FOR_SCHEMA);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
