use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use schemars::schema_for;
use status_core::export::{export_settings, validate_import};
use status_core::{
    load_chat, prompt_injection, BlockExtractor, HostEvent, LatestStatus, PromptInjection, Settings, StatusTracker,
    DEFAULT_MARKER,
};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "status-tracker")]
#[command(about = "Status block extraction for AI chat logs", long_about = None)]
struct Cli {
    /// Verbose diagnostics on stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export canonical JSON Schemas to the ./schemas directory
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
    /// Print the latest status record found in a chat as JSON
    Scan {
        /// Chat export (JSONL) or JSON array of messages
        #[arg(long)]
        chat: PathBuf,
        /// Settings file (TOML). When omitted, default fields get fresh ids on
        /// every run; create a file with `settings init` for stable ids.
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Decode the status block of a single message
    Extract {
        #[arg(long, default_value = DEFAULT_MARKER)]
        marker: String,
        /// Message file, or `-` for stdin
        #[arg(default_value = "-")]
        input: String,
    },
    /// Print a message with its status block removed
    Strip {
        #[arg(long, default_value = DEFAULT_MARKER)]
        marker: String,
        /// Message file, or `-` for stdin
        #[arg(default_value = "-")]
        input: String,
    },
    /// Print the prompt injected at generation start
    Prompt {
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Create, back up and restore settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Export JSON Schema files for canonical types
    Export {
        /// Output directory (default: ./schemas)
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Write default settings
    Init {
        #[arg(long, default_value = "settings.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Write a JSON backup of the settings
    Export {
        #[arg(long, default_value = "settings.toml")]
        settings: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Merge a JSON backup into the settings file
    Import {
        #[arg(long, default_value = "settings.toml")]
        settings: PathBuf,
        #[arg(long)]
        from: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Commands::Schema { command } => match command {
            SchemaCommands::Export { out_dir } => schema_export(out_dir),
        },
        Commands::Scan { chat, settings } => scan(&chat, settings.as_deref()),
        Commands::Extract { marker, input } => extract(&marker, &input),
        Commands::Strip { marker, input } => strip(&marker, &input),
        Commands::Prompt { settings } => prompt(settings.as_deref()),
        Commands::Settings { command } => match command {
            SettingsCommands::Init { path, force } => settings_init(&path, force),
            SettingsCommands::Export { settings, out } => settings_export(&settings, &out),
            SettingsCommands::Import { settings, from } => settings_import(&settings, &from),
        },
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("status_tracker=debug,status_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("status_tracker=info,status_core=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => {
            Settings::load(path).with_context(|| format!("failed to load settings from {}", path.display()))
        }
        None => Ok(Settings::default()),
    }
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        fs::read_to_string(input).with_context(|| format!("failed to read {input}"))
    }
}

fn schema_export(out_dir: PathBuf) -> Result<()> {
    fs::create_dir_all(&out_dir)?;

    // Export FieldDescriptor schema
    let field_schema = schema_for!(status_core::FieldDescriptor);
    let field_json = serde_json::to_string_pretty(&field_schema)?;
    fs::write(out_dir.join("FieldDescriptor.schema.json"), field_json)?;

    // Export StatusRecord schema
    let record_schema = schema_for!(status_core::StatusRecord);
    let record_json = serde_json::to_string_pretty(&record_schema)?;
    fs::write(out_dir.join("StatusRecord.schema.json"), record_json)?;

    // Export Settings schema
    let settings_schema = schema_for!(status_core::Settings);
    let settings_json = serde_json::to_string_pretty(&settings_schema)?;
    fs::write(out_dir.join("Settings.schema.json"), settings_json)?;

    // Export ExportData schema
    let export_schema = schema_for!(status_core::export::ExportData);
    let export_json = serde_json::to_string_pretty(&export_schema)?;
    fs::write(out_dir.join("ExportData.schema.json"), export_json)?;

    println!("Exported schemas to {}", out_dir.display());
    Ok(())
}

fn scan(chat: &Path, settings_path: Option<&Path>) -> Result<()> {
    let settings = load_settings(settings_path)?;
    let messages = load_chat(chat).with_context(|| format!("failed to load chat {}", chat.display()))?;
    let tracker = StatusTracker::new(&settings.marker)?;

    let mut latest = LatestStatus::default();
    tracker.handle_event(HostEvent::ChatChanged, &messages, &settings.fields, &mut latest);
    println!("{}", serde_json::to_string_pretty(&latest.current)?);
    Ok(())
}

fn extract(marker: &str, input: &str) -> Result<()> {
    let text = read_input(input)?;
    let extractor = BlockExtractor::new(marker)?;
    let decoded = extractor.extract_block(&text).map(|block| block.to_json());
    println!("{}", serde_json::to_string_pretty(&decoded)?);
    Ok(())
}

fn strip(marker: &str, input: &str) -> Result<()> {
    let text = read_input(input)?;
    let extractor = BlockExtractor::new(marker)?;
    println!("{}", extractor.strip_block(&text));
    Ok(())
}

fn prompt(settings_path: Option<&Path>) -> Result<()> {
    let settings = load_settings(settings_path)?;
    match prompt_injection(&settings) {
        PromptInjection::Set(text) => println!("{text}"),
        PromptInjection::Clear => tracing::info!("panel disabled, nothing to inject"),
    }
    Ok(())
}

fn settings_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    Settings::default().save(path)?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

fn settings_export(settings_path: &Path, out: &Path) -> Result<()> {
    let settings = load_settings(Some(settings_path))?;
    let data = export_settings(&settings, env!("CARGO_PKG_VERSION"));
    fs::write(out, serde_json::to_string_pretty(&data)?)?;
    println!("Exported settings to {}", out.display());
    Ok(())
}

fn settings_import(settings_path: &Path, from: &Path) -> Result<()> {
    let current = if settings_path.exists() {
        load_settings(Some(settings_path))?
    } else {
        Settings::default()
    };
    let raw = fs::read_to_string(from).with_context(|| format!("failed to read {}", from.display()))?;
    let patch = validate_import(&raw)?;
    if patch.is_empty() {
        anyhow::bail!("{} contains no importable settings", from.display());
    }
    let merged = patch.apply(&current)?;
    merged.save(settings_path)?;
    println!("Imported settings into {}", settings_path.display());
    Ok(())
}
