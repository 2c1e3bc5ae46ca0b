//! # xmlconvert
//!
//! Convert XML documents into ordered structured values and JSON, with
//! optional DTD or XSD validation before conversion.
//!
//! ## Shape of the output
//!
//! - every child element becomes a key of its parent object, in document
//!   order; a later sibling with the same name replaces an earlier one
//! - unqualified attributes are gathered under `@attributes` as strings
//! - an element without children or attributes collapses to a scalar:
//!   `true`/`false`, integers, floats, strings or `null`
//! - text next to children or attributes is kept under `value`
//!
//! ## Example
//!
//! ```
//! use xmlconvert::{xml_to_array, SchemaReference, Value};
//!
//! let xml = r#"<book id="123" genre="fiction"><title>1984</title></book>"#;
//! let value = xml_to_array(xml, false, false, &SchemaReference::None)?;
//!
//! assert_eq!(value["@attributes"]["id"], Value::from("123"));
//! assert_eq!(value["title"], Value::Int(1984));
//! # Ok::<(), xmlconvert::Error>(())
//! ```
//!
//! Validation is selected with [`SchemaReference`]: `Dtd` checks the
//! document against its own DOCTYPE, `Xsd` against a schema file.
//!
//! ```no_run
//! use xmlconvert::{SchemaReference, XmlConverter};
//!
//! let json = XmlConverter::new()
//!     .with_namespace_in_tag_name(true)
//!     .with_schema(SchemaReference::xsd("schemas/order.xsd")?)
//!     .to_json("<order/>")?;
//! println!("{}", json);
//! # Ok::<(), xmlconvert::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Utilities
pub mod capabilities;
pub mod locations;
pub mod names;
pub mod namespaces;

// Resource loading and parsing
pub mod documents;
pub mod loaders;

// Validation
pub mod validators;

// Conversion
pub mod convert;
pub mod converters;
pub mod value;

// Re-exports for convenience
pub use convert::{xml_to_array, xml_to_json, XmlConverter};
pub use converters::ConversionOptions;
pub use error::{Diagnostic, Error, Result, Severity};
pub use limits::Limits;
pub use locations::{Location, SchemaReference};
pub use validators::ValidationReport;
pub use value::Value;

/// Version of the xmlconvert library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_reexports() {
        let value = xml_to_array("<a><b>x</b></a>", false, false, &SchemaReference::None).unwrap();
        assert_eq!(value["b"], Value::from("x"));
        assert!(Limits::default().max_xml_depth > 0);
    }
}
