//! Schema validation integration tests
//!
//! DTD checks use documents carrying their own DOCTYPE; XSD checks use the
//! schema files under `tests/fixtures` or temporary files.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use xmlconvert::error::{DTD_VALIDATION_FAILED, INVALID_XML_FOR_SCHEMA, XSD_VALIDATION_FAILED};
use xmlconvert::validators::validate;
use xmlconvert::{xml_to_array, Error, Limits, SchemaReference, Value};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).unwrap()
}

fn person_schema() -> SchemaReference {
    SchemaReference::Xsd(fixture_path("person.xsd").into())
}

fn failure(result: xmlconvert::Result<Value>) -> (String, Vec<String>) {
    match result {
        Err(Error::SchemaValidation { reason, diagnostics }) => {
            (reason, diagnostics.into_iter().map(|d| d.message).collect())
        }
        other => panic!("expected a schema validation failure, got {:?}", other),
    }
}

// ============================================================================
// XSD
// ============================================================================

#[cfg(feature = "xsd")]
mod xsd {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_valid_document_converts() {
        let value = xml_to_array(&fixture("person.xml"), false, false, &person_schema()).unwrap();
        assert_eq!(value["age"], Value::Int(30));
        assert_eq!(value["name"], Value::from("Ada Lovelace"));
        assert_eq!(value["@attributes"]["id"], Value::from("7"));
    }

    #[test]
    fn test_type_mismatch_fails() {
        let (reason, messages) = failure(xml_to_array(
            &fixture("person_invalid.xml"),
            false,
            false,
            &person_schema(),
        ));
        assert_eq!(reason, XSD_VALIDATION_FAILED);
        assert_eq!(
            messages,
            ["Element 'age': 'thirty' is not a valid value of the atomic type 'xs:integer'."]
        );
    }

    #[test]
    fn test_pattern_and_required_attribute() {
        let xml = "<person><name>A</name><age>1</age><email>not-an-email</email></person>";
        let (_, messages) = failure(xml_to_array(xml, false, false, &person_schema()));
        assert_eq!(messages.len(), 2, "{:?}", messages);
        assert_eq!(messages[0], "Element 'person': The attribute 'id' is required but missing.");
        assert!(messages[1].starts_with("Element 'email': [facet 'pattern']"));
    }

    #[test]
    fn test_malformed_instance() {
        let (reason, _) = failure(xml_to_array("<person>", false, false, &person_schema()));
        assert_eq!(reason, INVALID_XML_FOR_SCHEMA);
    }

    #[test]
    fn test_missing_schema_file() {
        let schema = SchemaReference::xsd("/definitely/not/here.xsd").unwrap();
        let (reason, messages) = failure(xml_to_array("<person/>", false, false, &schema));
        assert_eq!(reason, XSD_VALIDATION_FAILED);
        assert!(messages[0].contains("/definitely/not/here.xsd"));
    }

    #[test]
    fn test_diagnostics_carry_positions() {
        let xml = fixture("person_invalid.xml");
        let err = validate(&xml, &person_schema(), &Limits::default()).unwrap_err();
        let diagnostic = &err.diagnostics()[0];
        assert_eq!(diagnostic.line, Some(4));
        assert_eq!(diagnostic.path.as_deref(), Some("/person/age"));
    }

    #[test]
    fn test_namespaced_schema_from_temp_file() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
            targetNamespace="urn:orders" xmlns="urn:orders" elementFormDefault="qualified">
  <xs:element name="order">
    <xs:complexType>
      <xs:choice maxOccurs="unbounded">
        <xs:element name="line" type="xs:decimal"/>
        <xs:element name="note" type="xs:string"/>
      </xs:choice>
      <xs:attribute name="currency" default="EUR">
        <xs:simpleType>
          <xs:restriction base="xs:string">
            <xs:enumeration value="EUR"/>
            <xs:enumeration value="USD"/>
          </xs:restriction>
        </xs:simpleType>
      </xs:attribute>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(xsd.as_bytes()).unwrap();
        let schema = SchemaReference::Xsd(file.path().into());

        let valid = r#"<o:order xmlns:o="urn:orders" currency="USD"><o:line>1.50</o:line><o:note>gift</o:note><o:line>2</o:line></o:order>"#;
        let value = xml_to_array(valid, true, false, &schema).unwrap();
        assert_eq!(value["o:line"], Value::Int(2));
        assert_eq!(value["o:note"], Value::from("gift"));

        let invalid = r#"<order xmlns="urn:orders" currency="GBP"><line>x</line></order>"#;
        let (_, messages) = failure(xml_to_array(invalid, false, false, &schema));
        assert_eq!(messages.len(), 2, "{:?}", messages);
        assert!(messages[0].contains("[facet 'enumeration']"));
        assert!(messages[1].contains("atomic type 'xs:decimal'"));
    }

    #[test]
    fn test_import_warning_does_not_fail() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:import namespace="urn:x" schemaLocation="x.xsd"/>
  <xs:element name="r" type="xs:boolean"/>
</xs:schema>"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(xsd.as_bytes()).unwrap();
        let schema = SchemaReference::Xsd(file.path().into());

        let report = validate("<r>true</r>", &schema, &Limits::default()).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.warnings().count(), 1);
    }
}

// ============================================================================
// DTD
// ============================================================================

#[cfg(feature = "dtd")]
mod dtd {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_valid_document_converts() {
        let value = xml_to_array(&fixture("note.xml"), false, false, &SchemaReference::Dtd).unwrap();
        assert_eq!(value["to"], Value::from("Tove"));
        assert_eq!(value["@attributes"]["priority"], Value::from("high"));
    }

    #[test]
    fn test_content_model_violation() {
        let xml = fixture("note.xml").replace("<from>Jani</from>", "");
        let (reason, messages) = failure(xml_to_array(&xml, false, false, &SchemaReference::Dtd));
        assert_eq!(reason, DTD_VALIDATION_FAILED);
        assert!(messages[0].starts_with("Element note content does not follow the DTD"));
    }

    #[test]
    fn test_enumerated_attribute_violation() {
        let xml = fixture("note.xml").replace(r#"priority="high""#, r#"priority="urgent""#);
        let (reason, _) = failure(xml_to_array(&xml, false, false, &SchemaReference::Dtd));
        assert_eq!(reason, DTD_VALIDATION_FAILED);
    }

    #[test]
    fn test_document_without_doctype() {
        let (reason, messages) = failure(xml_to_array("<note/>", false, false, &SchemaReference::Dtd));
        assert_eq!(reason, DTD_VALIDATION_FAILED);
        assert!(messages.iter().any(|m| m.contains("no DTD found")));
    }

    #[test]
    fn test_malformed_document() {
        let (reason, _) = failure(xml_to_array(
            "<!DOCTYPE a [<!ELEMENT a EMPTY>]><a>",
            false,
            false,
            &SchemaReference::Dtd,
        ));
        assert_eq!(reason, DTD_VALIDATION_FAILED);
    }
}

#[test]
fn test_sentinel_mapping() {
    assert_eq!(SchemaReference::from_option(None).unwrap(), SchemaReference::None);
    assert_eq!(SchemaReference::from_option(Some("")).unwrap(), SchemaReference::Dtd);
    assert!(matches!(
        SchemaReference::from_option(Some("schema.xsd")).unwrap(),
        SchemaReference::Xsd(_)
    ));
}
