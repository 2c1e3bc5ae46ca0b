//! XML to JSON Conversion Example
//!
//! This example converts the test fixtures with the different option
//! combinations: plain, namespace tagging, CDATA mode and XSD validation.
//!
//! Run with: cargo run --example xml_to_json

use std::path::PathBuf;
use xmlconvert::{xml_to_json, SchemaReference, XmlConverter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let fixtures = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");

    println!("=== XML to JSON Conversion Example ===\n");

    // Plain conversion
    let feed = std::fs::read_to_string(fixtures.join("feed.xml"))?;
    println!("--- Plain ---\n");
    println!("{}\n", xml_to_json(&feed, false, false, &SchemaReference::None)?);

    // Namespace tagging keeps prefixes in keys
    println!("--- Namespace tagging ---\n");
    println!("{}\n", xml_to_json(&feed, true, false, &SchemaReference::None)?);

    // CDATA mode keeps text verbatim
    println!("--- CDATA mode ---\n");
    let message = "<message><![CDATA[Some <b>bold</b> text]]><id>010</id></message>";
    println!("{}\n", xml_to_json(message, false, true, &SchemaReference::None)?);

    // XSD validation before conversion
    println!("--- XSD validated ---\n");
    let person = std::fs::read_to_string(fixtures.join("person.xml"))?;
    let converter = XmlConverter::new().with_schema(SchemaReference::Xsd(fixtures.join("person.xsd").into()));
    println!("{}\n", converter.to_json(&person)?);

    let invalid = std::fs::read_to_string(fixtures.join("person_invalid.xml"))?;
    match converter.to_value(&invalid) {
        Ok(_) => println!("unexpectedly valid"),
        Err(err) => {
            println!("{}", err);
            for diagnostic in err.diagnostics() {
                println!("  {}", diagnostic);
            }
        }
    }

    Ok(())
}
