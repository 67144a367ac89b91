//! Command-line interface for xsdbind

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use xsdbind::{Dialect, FileSource, Limits, Schema, Settings, SourceProvider, Value};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xsdbind")]
#[command(author, version, about = "Schema-driven XML binding tool", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Schema dialect: auto, tree or divided
    #[arg(short, long, default_value = "auto", global = true)]
    dialect: String,

    /// Settings file (JSON)
    #[arg(long, value_name = "SETTINGS", global = true)]
    settings: Option<PathBuf>,

    /// Use strict resource limits
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a schema and print its element tree
    Inspect {
        /// Path to the XSD schema file
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Show a single top-level definition
        #[arg(short, long)]
        element: Option<String>,

        /// Output a summary as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Validate XML documents against a schema
    Validate {
        /// Path to the XSD schema file
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// XML files to validate
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Decode an XML document into JSON
    Decode {
        /// Path to the XSD schema file
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// Path to the XML file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Encode a JSON object graph into XML
    Encode {
        /// Path to the XSD schema file
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// Path to the JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let dialect: Dialect = cli.dialect.parse()?;
    let mut settings = match &cli.settings {
        Some(path) => Settings::from_json(&fs::read_to_string(path)?)?,
        None => Settings::default(),
    };
    if cli.strict {
        settings = settings.with_limits(Limits::strict());
    }

    let load = |path: &PathBuf| -> xsdbind::Result<Schema> {
        let source = FileSource::new(path).with_limits(settings.limits().clone());
        Schema::from_source(&source, dialect, settings.clone())
    };

    match cli.command {
        Commands::Inspect {
            schema,
            element,
            json,
        } => cmd_inspect(&load(&schema)?, element, json),
        Commands::Validate { schema, files } => cmd_validate(&load(&schema)?, files),
        Commands::Decode {
            schema,
            file,
            pretty,
        } => cmd_decode(&load(&schema)?, file, pretty),
        Commands::Encode {
            schema,
            file,
            output,
        } => cmd_encode(&load(&schema)?, file, output),
    }
}

#[cfg(feature = "cli")]
fn cmd_inspect(
    schema: &Schema,
    element: Option<String>,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(name) = element {
        let definition = schema
            .definition(&name)
            .ok_or_else(|| format!("Element '{}' not found in schema", name))?;
        print!("{}", definition);
        return Ok(());
    }

    if json_output {
        let definitions: Vec<serde_json::Value> = schema
            .definitions()
            .map(|d| {
                serde_json::json!({
                    "name": d.name,
                    "children": d.children.len(),
                    "attributes": d.attributes.len(),
                })
            })
            .collect();
        let json = serde_json::json!({
            "dialect": schema.dialect().to_string(),
            "targetNamespace": schema.target_namespace(),
            "root": schema.root().name,
            "definitions": definitions,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("xsdbind v{}", xsdbind::VERSION);
        println!();
        println!("Dialect: {}", schema.dialect());
        println!(
            "Target Namespace: {}",
            schema.target_namespace().unwrap_or("(none)")
        );
        println!();
        print!("{}", schema);
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_validate(schema: &Schema, files: Vec<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let mut invalid = 0usize;
    for file in &files {
        let xml = FileSource::new(file)
            .with_limits(schema.settings().limits().clone())
            .read_lines()?
            .join("\n");
        match schema.validate(&xml) {
            Ok(()) => println!("✓ {} is valid", file.display()),
            Err(e) => {
                invalid += 1;
                println!("✗ {} is invalid: {}", file.display(), e);
            }
        }
    }

    if invalid > 0 {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_decode(schema: &Schema, file: PathBuf, pretty: bool) -> Result<(), Box<dyn std::error::Error>> {
    let source = FileSource::new(file).with_limits(schema.settings().limits().clone());
    let value = schema.decode_source(&source)?;
    let json = value.to_json();

    let json_str = if pretty {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    };
    println!("{}", json_str);
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_encode(
    schema: &Schema,
    file: PathBuf,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&file)?)?;
    let value = Value::from_json(&json);

    match output {
        Some(path) => schema.encode_to(&value, &mut FileSource::new(path))?,
        None => print!("{}", schema.encode(&value)?),
    }
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
