//! Command-line interface for xmlconvert

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::io::{self, Read};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cli")]
use xmlconvert::converters::{to_compact_json, to_pretty_json};
#[cfg(feature = "cli")]
use xmlconvert::{SchemaReference, XmlConverter};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xmlconvert")]
#[command(author, version, about = "Convert XML documents to JSON", long_about = None)]
struct Cli {
    /// XML file to convert, or `-` for standard input
    #[arg(value_name = "FILE", default_value = "-")]
    file: String,

    /// Key namespaced elements as `prefix:name` and record `@namespace`
    #[arg(short, long)]
    namespaces: bool,

    /// Keep text verbatim instead of casting scalars
    #[arg(long)]
    cdata: bool,

    /// Validate against the document's DTD before converting
    #[arg(long, conflicts_with = "xsd")]
    dtd: bool,

    /// Validate against an XSD schema file before converting
    #[arg(long, value_name = "SCHEMA")]
    xsd: Option<String>,

    /// Emit compact JSON instead of pretty-printed
    #[arg(short, long)]
    compact: bool,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[cfg(feature = "cli")]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let xml = if cli.file == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(&cli.file)?
    };

    let schema = match (&cli.xsd, cli.dtd) {
        (Some(location), _) => SchemaReference::xsd(location)?,
        (None, true) => SchemaReference::Dtd,
        (None, false) => SchemaReference::None,
    };

    let converter = XmlConverter::new()
        .with_namespace_in_tag_name(cli.namespaces)
        .with_cdata(cli.cdata)
        .with_schema(schema);

    let value = converter.to_value(&xml)?;
    let json = if cli.compact {
        to_compact_json(&value)?
    } else {
        to_pretty_json(&value)?
    };

    if let Some(output_path) = cli.output {
        fs::write(&output_path, format!("{}\n", json))?;
        eprintln!("Output written to: {}", output_path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
