//! Fieldmap CLI - build, check and run field mapping configurations
//!
//! # Main Commands
//!
//! ```bash
//! fieldmap serve                                   # Start HTTP server (port 3000)
//! fieldmap automap sample.csv --entity PFA -o map.json
//! fieldmap validate map.json                       # List unmapped required fields
//! fieldmap preview map.json sample.csv             # Run the mappings over sample rows
//! fieldmap config save map.json                    # Persist (refused when incomplete)
//! ```
//!
//! # Catalog Commands
//!
//! ```bash
//! fieldmap fields PFA                              # Destination fields of an entity
//! fieldmap transforms                              # Transform kinds and parameters
//! ```

use clap::{Parser, Subcommand};
use fieldmap::{
    api::{start_server, AppState},
    automap::AutomapRequest,
    mapping::DEFAULT_CONFIDENCE_THRESHOLD,
    parser::read_sample_file,
    transforms_description,
    validation::{self, parse_document},
    AutomapClient, ConfigRegistry, Direction, FieldCatalog, MappingSet, Settings,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fieldmap")]
#[command(about = "Field mapping configuration engine", long_about = None)]
struct Cli {
    /// Directory of saved configurations (overrides FIELDMAP_REGISTRY_DIR)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the destination fields of an entity
    Fields {
        /// Entity name (PFA, Asset, BEO)
        entity: String,
    },

    /// Show available transforms and their parameters
    Transforms,

    /// Check a configuration file for unmapped required fields
    Validate {
        /// Configuration JSON file
        config: PathBuf,
    },

    /// Build a configuration from delimited mapping text
    Import {
        /// Delimited mapping file
        file: PathBuf,

        #[arg(short, long)]
        entity: String,

        /// import or export
        #[arg(short, long)]
        direction: Direction,

        #[arg(long)]
        endpoint: Option<String>,

        #[arg(short, long)]
        name: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a configuration as delimited mapping text
    Export {
        /// Configuration JSON file
        config: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a configuration over sample CSV rows
    Preview {
        /// Configuration JSON file
        config: PathBuf,

        /// Sample CSV file
        data: PathBuf,

        /// Number of rows to transform
        #[arg(long, default_value = "10")]
        rows: usize,
    },

    /// Suggest a configuration for a sample CSV
    Automap {
        /// Sample CSV file
        data: PathBuf,

        #[arg(short, long)]
        entity: String,

        #[arg(short, long, default_value = "import")]
        direction: Direction,

        #[arg(long)]
        endpoint: Option<String>,

        /// Minimum confidence (exclusive)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Use name matching even when an API key is set
        #[arg(long)]
        heuristic: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (overrides FIELDMAP_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage saved configurations
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// List saved configurations
    List,

    /// Show a saved configuration
    Show {
        id: String,
    },

    /// Save a configuration file
    Save {
        /// Configuration JSON file
        config: PathBuf,
    },

    /// Delete a saved configuration
    Delete {
        id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(dir) = cli.registry {
        settings = settings.with_registry_dir(dir);
    }
    let catalog = FieldCatalog::builtin().with_default_entity(&settings.default_entity);

    let result = match cli.command {
        Commands::Fields { entity } => cmd_fields(&catalog, &entity),

        Commands::Transforms => cmd_transforms(),

        Commands::Validate { config } => cmd_validate(&catalog, &config),

        Commands::Import {
            file,
            entity,
            direction,
            endpoint,
            name,
            output,
        } => cmd_import(
            &catalog,
            &file,
            &entity,
            direction,
            endpoint.as_deref(),
            name.as_deref(),
            output.as_deref(),
        ),

        Commands::Export { config, output } => cmd_export(&config, output.as_deref()),

        Commands::Preview { config, data, rows } => cmd_preview(&config, &data, rows),

        Commands::Automap {
            data,
            entity,
            direction,
            endpoint,
            threshold,
            heuristic,
            output,
        } => {
            let threshold = threshold.unwrap_or(settings.confidence_threshold);
            cmd_automap(
                &settings,
                &catalog,
                &data,
                &entity,
                direction,
                endpoint.as_deref(),
                threshold,
                heuristic,
                output.as_deref(),
            )
            .await
        }

        Commands::Serve { port } => {
            if let Some(port) = port {
                settings = settings.with_port(port);
            }
            start_server(AppState::from_settings(settings).shared()).await
        }

        Commands::Config { action } => cmd_config(&settings, &catalog, action),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn read_config(path: &Path) -> Result<MappingSet, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    Ok(parse_document(value)?)
}

fn cmd_fields(catalog: &FieldCatalog, entity: &str) -> CliResult {
    let found = catalog
        .fields_or_default(entity)
        .ok_or_else(|| format!("Unknown entity: {}", entity))?;
    if found.fallback {
        eprintln!("⚠️  Unknown entity '{}', showing {} fields", entity, found.entity);
    }

    println!("{}:", found.entity);
    for field in found.fields {
        println!(
            "  {} {:<22} {:<24} {}",
            if field.required { "*" } else { " " },
            field.name,
            field.label,
            field.data_type
        );
    }
    Ok(())
}

fn cmd_transforms() -> CliResult {
    println!("{}", transforms_description());
    Ok(())
}

fn cmd_validate(catalog: &FieldCatalog, path: &Path) -> CliResult {
    eprintln!("✔️  Validating: {}", path.display());
    let set = read_config(path)?;
    let found = catalog
        .fields_or_default(&set.entity)
        .ok_or_else(|| format!("Unknown entity: {}", set.entity))?;

    let report = validation::report(&set, found.fields);
    for dest in &report.unknown_destinations {
        eprintln!("   ⚠️  Unknown destination field: {}", dest);
    }
    for issue in &report.invalid_params {
        eprintln!("   ⚠️  {}: {}", issue.destination_field, issue.message);
    }

    validation::ensure_saveable(&set, found.fields)?;
    eprintln!("✅ {} mappings, all required fields mapped", set.len());
    Ok(())
}

fn cmd_import(
    catalog: &FieldCatalog,
    file: &Path,
    entity: &str,
    direction: Direction,
    endpoint: Option<&str>,
    name: Option<&str>,
    output: Option<&Path>,
) -> CliResult {
    let text = fs::read_to_string(file)?;
    let mut set = MappingSet::create(direction, entity, endpoint);
    if let Some(name) = name {
        set = set.with_name(name);
    }

    let outcome = set.import_from_delimited(&text)?;
    for error in &outcome.errors {
        eprintln!("   ⚠️  Line {}: {}", error.line, error.message);
    }
    eprintln!("📄 {}", outcome.summary());

    if let Some(found) = catalog.fields_or_default(entity) {
        let missing = validation::validate(&set, found.fields);
        if !missing.is_empty() {
            eprintln!("   Missing required fields: {}", missing.join(", "));
        }
    }

    write_output(&serde_json::to_string_pretty(&set)?, output)
}

fn cmd_export(path: &Path, output: Option<&Path>) -> CliResult {
    let set = read_config(path)?;
    write_output(&set.export_to_delimited(), output)
}

fn cmd_preview(config: &Path, data: &Path, rows: usize) -> CliResult {
    let set = read_config(config)?;
    let sample = read_sample_file(data)?;
    eprintln!(
        "📄 {} records (encoding {}, delimiter '{}')",
        sample.records.len(),
        sample.encoding,
        format_delimiter(sample.delimiter)
    );

    let result = fieldmap::preview(&set, sample.head(rows));
    for failure in &result.failures {
        eprintln!(
            "   ❌ Row {} {} → {}: {}",
            failure.row, failure.source_field, failure.destination_field, failure.message
        );
    }
    for skipped in &result.skipped {
        eprintln!("   ⚠️  Row {} skipped: {}", skipped.row, skipped.reason);
    }
    eprintln!("📊 {}", result.summary());

    println!("{}", serde_json::to_string_pretty(&result.rows)?);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_automap(
    settings: &Settings,
    catalog: &FieldCatalog,
    data: &Path,
    entity: &str,
    direction: Direction,
    endpoint: Option<&str>,
    threshold: f64,
    heuristic: bool,
    output: Option<&Path>,
) -> CliResult {
    let found = catalog
        .fields_or_default(entity)
        .ok_or_else(|| format!("Unknown entity: {}", entity))?;
    let sample = read_sample_file(data)?.source_sample();

    let request = AutomapRequest {
        source_fields: sample.fields,
        destination_fields: found.fields.to_vec(),
        entity: found.entity.to_string(),
        sample_data: sample.sample,
    };

    let suggestions = match AutomapClient::from_settings(settings) {
        Ok(client) if !heuristic => client.suggest(&request).await?,
        _ => {
            eprintln!("🔎 Using name matching");
            request.heuristic()
        }
    };

    let mut set = MappingSet::create(direction, entity, endpoint);
    set.apply_suggestions(&suggestions, threshold, found.fields);
    eprintln!(
        "✨ {} suggestions, {} above {}",
        suggestions.len(),
        set.len(),
        threshold
    );
    if threshold != DEFAULT_CONFIDENCE_THRESHOLD {
        eprintln!("   (default threshold is {})", DEFAULT_CONFIDENCE_THRESHOLD);
    }

    let missing = validation::validate(&set, found.fields);
    if !missing.is_empty() {
        eprintln!("   Still unmapped: {}", missing.join(", "));
    }

    write_output(&serde_json::to_string_pretty(&set)?, output)
}

fn cmd_config(settings: &Settings, catalog: &FieldCatalog, action: ConfigAction) -> CliResult {
    let mut registry = ConfigRegistry::with_dir(&settings.registry_dir);

    match action {
        ConfigAction::List => {
            let configs = registry.list();
            if configs.is_empty() {
                println!("No saved configurations in {}", registry.dir().display());
                return Ok(());
            }
            println!("{:<36} {:<8} {:<8} {:<12} {}", "ID", "DIR", "ENTITY", "ENDPOINT", "MAPPINGS");
            for stored in configs {
                println!(
                    "{:<36} {:<8} {:<8} {:<12} {}",
                    stored.id,
                    stored.config.direction,
                    stored.config.entity,
                    stored.config.endpoint_id.as_deref().unwrap_or("-"),
                    stored.config.mappings.len()
                );
            }
        }

        ConfigAction::Show { id } => {
            let stored = registry.get(&id)?;
            println!("{}", serde_json::to_string_pretty(stored)?);
        }

        ConfigAction::Save { config } => {
            let set = read_config(&config)?;
            let found = catalog
                .fields_or_default(&set.entity)
                .ok_or_else(|| format!("Unknown entity: {}", set.entity))?;
            let id = registry.save(set, found.fields)?;
            println!("{}", id);
        }

        ConfigAction::Delete { id } => {
            registry.delete(&id)?;
            eprintln!("🗑️  Deleted {}", id);
        }
    }

    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> CliResult {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Saved to: {}", p.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
