//! Conversion entry points
//!
//! [`XmlConverter`] sequences capability check, optional schema validation,
//! parsing and the tree walk. [`xml_to_array`] and [`xml_to_json`]
//! are one-shot shortcuts over it.

use crate::capabilities;
use crate::converters::{to_pretty_json, ConversionOptions, TreeWalker};
use crate::documents::Document;
use crate::error::Result;
use crate::limits::Limits;
use crate::locations::SchemaReference;
use crate::validators;
use crate::value::Value;

/// Configured XML to value converter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlConverter {
    options: ConversionOptions,
    schema: SchemaReference,
    limits: Limits,
}

impl XmlConverter {
    /// Converter with default options, no validation and default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Key namespaced children as `prefix:name` and add `@namespace`
    pub fn with_namespace_in_tag_name(mut self, enabled: bool) -> Self {
        self.options = self.options.with_namespace_in_tag_name(enabled);
        self
    }

    /// Keep text verbatim and never collapse elements to scalars
    pub fn with_cdata(mut self, enabled: bool) -> Self {
        self.options = self.options.with_cdata(enabled);
        self
    }

    /// Replace all conversion options at once
    pub fn with_options(mut self, options: ConversionOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate against `schema` before converting
    pub fn with_schema(mut self, schema: SchemaReference) -> Self {
        self.schema = schema;
        self
    }

    /// Use custom processing limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Get the conversion options
    pub fn options(&self) -> ConversionOptions {
        self.options
    }

    /// Get the schema reference
    pub fn schema(&self) -> &SchemaReference {
        &self.schema
    }

    /// Get the limits
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Convert an XML document into a structured value
    ///
    /// A root that converts to nothing an empty object would not also say
    /// (`Null`, `false`, zero, `""` or `"0"`) becomes an empty object.
    pub fn to_value(&self, xml: &str) -> Result<Value> {
        capabilities::check(&self.schema)?;

        let report = validators::validate(xml, &self.schema, &self.limits)?;
        if !report.diagnostics.is_empty() {
            tracing::debug!(
                warnings = report.diagnostics.len(),
                "schema validation passed with warnings"
            );
        }

        let document = Document::parse(xml, &self.limits)?;
        let root = document.root_element();
        tracing::trace!(root = %root.qualified_name(), "converting document");

        let value = TreeWalker::new(self.options, &self.limits).convert(&root)?;
        Ok(if is_blank(&value) { Value::object() } else { value })
    }

    /// Convert an XML document into pretty-printed JSON
    pub fn to_json(&self, xml: &str) -> Result<String> {
        to_pretty_json(&self.to_value(xml)?)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Int(n) => *n == 0,
        Value::Float(f) => *f == 0.0,
        Value::String(s) => s.is_empty() || s == "0",
        Value::Object(map) => map.is_empty(),
    }
}

/// Convert XML text into a structured value
///
/// ```
/// use xmlconvert::{xml_to_array, SchemaReference, Value};
///
/// let value = xml_to_array("<note><to>User</to></note>", false, false, &SchemaReference::None)?;
/// assert_eq!(value["to"], Value::from("User"));
/// # Ok::<(), xmlconvert::Error>(())
/// ```
pub fn xml_to_array(
    xml: &str,
    namespace_in_tag_name: bool,
    is_cdata: bool,
    schema: &SchemaReference,
) -> Result<Value> {
    XmlConverter::new()
        .with_namespace_in_tag_name(namespace_in_tag_name)
        .with_cdata(is_cdata)
        .with_schema(schema.clone())
        .to_value(xml)
}

/// Convert XML text into pretty-printed JSON
pub fn xml_to_json(
    xml: &str,
    namespace_in_tag_name: bool,
    is_cdata: bool,
    schema: &SchemaReference,
) -> Result<String> {
    XmlConverter::new()
        .with_namespace_in_tag_name(namespace_in_tag_name)
        .with_cdata(is_cdata)
        .with_schema(schema.clone())
        .to_json(xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_empty_root_becomes_object() {
        let value = xml_to_array("<root/>", false, false, &SchemaReference::None).unwrap();
        assert_eq!(value, Value::object());
        assert_eq!(xml_to_json("<root/>", false, false, &SchemaReference::None).unwrap(), "{}");
    }

    #[test]
    fn test_falsy_root_becomes_object() {
        for xml in ["<flag>false</flag>", "<n>0</n>", "<n>0.0</n>", "<s>  </s>"] {
            let value = xml_to_array(xml, false, false, &SchemaReference::None).unwrap();
            assert_eq!(value, Value::object(), "{}", xml);
        }
        let value = xml_to_array("<flag>true</flag>", false, false, &SchemaReference::None).unwrap();
        assert_eq!(value, Value::Bool(true));
    }

    #[test]
    fn test_scalar_root_is_returned() {
        let value = xml_to_array("<age>30</age>", false, false, &SchemaReference::None).unwrap();
        assert_eq!(value, Value::Int(30));
    }

    #[test]
    fn test_malformed_input() {
        let err = xml_to_array("<note><to>User</note>", false, false, &SchemaReference::None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_builder_options() {
        let converter = XmlConverter::new()
            .with_cdata(true)
            .with_namespace_in_tag_name(true)
            .with_limits(Limits::strict());
        assert!(converter.options().is_cdata);
        assert!(converter.options().namespace_in_tag_name);
        assert!(converter.schema().is_none());
        assert_eq!(converter.limits(), &Limits::strict());
    }

    #[test]
    fn test_size_limit() {
        let converter = XmlConverter::new().with_limits(Limits::new().with_max_xml_size(8));
        let err = converter.to_value("<root>too long</root>").unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
    }

    #[cfg(feature = "dtd")]
    #[test]
    fn test_dtd_gate() {
        let xml = r#"<!DOCTYPE note [<!ELEMENT note (to)><!ELEMENT to (#PCDATA)>]><note><to>A</to></note>"#;
        let value = xml_to_array(xml, false, false, &SchemaReference::Dtd).unwrap();
        assert_eq!(value["to"], Value::from("A"));

        let invalid = r#"<!DOCTYPE note [<!ELEMENT note (to)><!ELEMENT to (#PCDATA)>]><note><from>A</from></note>"#;
        match xml_to_array(invalid, false, false, &SchemaReference::Dtd) {
            Err(Error::SchemaValidation { reason, .. }) => {
                assert_eq!(reason, crate::error::DTD_VALIDATION_FAILED)
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
