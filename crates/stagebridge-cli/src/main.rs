use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stagebridge_codec::{
    copy, materialize, table_info, Cursor, CsvReader, CsvWriter, JsonReader, JsonWriter,
    SqlTupleWriter, SqliteCursor, TupleReader, TupleWriter,
};
use stagebridge_core::{
    Config, DialectConfig, ExportConfig, FileFormat, ImportConfig, Tuple, WarehouseConfig,
};
use stagebridge_stage::{
    ExportSummary, MockStage, SnowflakeStageClient, StageClient, StageExporter, StageImporter,
};

const DEFAULT_CONFIG: &str = "stagebridge.toml";

/// stagebridge - schema-driven tuple interchange and stage transfers
#[derive(Parser)]
#[command(name = "stagebridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: stagebridge.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy the export query onto the stage and write pointer files
    Export {
        /// Write the run summary as JSON to this file
        #[arg(short, long)]
        summary: Option<PathBuf>,
    },

    /// Resolve pointer files into the staged content they reference
    Import {
        /// Directory for temporary downloads (default: system temp dir)
        #[arg(long)]
        temp_dir: Option<PathBuf>,
    },

    /// Run a query against a SQLite database and write the result to a file
    Materialize {
        /// SQLite database file
        #[arg(short, long)]
        database: PathBuf,

        /// Query to run
        query: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long, value_enum, default_value_t = TextFormat::Csv)]
        format: TextFormat,

        /// Write a header row (CSV only)
        #[arg(long)]
        header: bool,
    },

    /// Load a CSV or JSON file into an existing SQLite table
    Copy {
        /// Input file
        input: PathBuf,

        /// SQLite database file
        #[arg(short, long)]
        database: PathBuf,

        /// Target table
        #[arg(short, long)]
        table: String,

        #[arg(short, long, value_enum, default_value_t = TextFormat::Csv)]
        format: TextFormat,

        /// Skip a header row (CSV only)
        #[arg(long)]
        header: bool,
    },

    /// Write a starter config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Text encodings the CLI reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TextFormat {
    Csv,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    if let Commands::Init { force } = cli.command {
        return init_command(&config_path, force);
    }

    // Load config if present
    let config = if config_path.exists() {
        Config::from_file(&config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    if cli.verbose {
        eprintln!("{} dialect: {:?}", "Using".cyan(), config.dialect);
    }

    match cli.command {
        Commands::Export { summary } => export_command(&config, summary.as_deref()).await,
        Commands::Import { temp_dir } => import_command(&config, temp_dir).await,
        Commands::Materialize {
            database,
            query,
            output,
            format,
            header,
        } => materialize_command(&database, &query, &output, format, header),
        Commands::Copy {
            input,
            database,
            table,
            format,
            header,
        } => copy_command(&input, &database, &table, format, header),
        Commands::Init { .. } => Ok(()),
    }
}

/// Create the stage client named by the `[warehouse]` section
fn build_client(config: &Config) -> Result<Box<dyn StageClient>> {
    let warehouse = config.warehouse.as_ref().ok_or_else(|| {
        anyhow::anyhow!(
            "No warehouse configuration found in {}. \
             Add a [warehouse] section with type and connection settings.",
            DEFAULT_CONFIG
        )
    })?;

    info!(warehouse_type = %warehouse.warehouse_type, "Connecting to warehouse");

    match warehouse.warehouse_type.to_lowercase().as_str() {
        "snowflake" => Ok(Box::new(snowflake_client(warehouse)?)),
        "mock" => Ok(Box::new(MockStage::new())),
        other => Err(anyhow::anyhow!(
            "Unsupported warehouse type '{}'. Supported: snowflake, mock",
            other
        )),
    }
}

fn snowflake_client(warehouse: &WarehouseConfig) -> Result<SnowflakeStageClient> {
    let account = warehouse
        .setting("account")
        .ok_or_else(|| anyhow::anyhow!("Snowflake requires 'account' in warehouse settings"))?;
    let user = warehouse
        .setting("user")
        .or_else(|| warehouse.setting("username"))
        .ok_or_else(|| anyhow::anyhow!("Snowflake requires 'user' in warehouse settings"))?;

    let mut builder = if let Ok(key_path) = std::env::var("SNOWFLAKE_PRIVATE_KEY_PATH") {
        let pem = std::fs::read_to_string(&key_path)
            .with_context(|| format!("Failed to read private key {}", key_path))?;
        stagebridge_stage::SnowflakeStageClientBuilder::with_key_pair(account, user, pem)
    } else {
        let password = std::env::var("SNOWFLAKE_PASSWORD").context(
            "Snowflake requires SNOWFLAKE_PASSWORD or SNOWFLAKE_PRIVATE_KEY_PATH in the environment",
        )?;
        SnowflakeStageClient::new(account, user, password)
    };

    if let Some(wh) = warehouse.setting("warehouse") {
        builder = builder.with_warehouse(wh);
    }
    if let Some(role) = warehouse.setting("role") {
        builder = builder.with_role(role);
    }
    if let Some(database) = warehouse.setting("database") {
        builder = builder.with_database(database);
    }
    if let Some(schema) = warehouse.setting("schema") {
        builder = builder.with_schema(schema);
    }

    builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create Snowflake client: {}", e))
}

async fn export_command(config: &Config, summary_path: Option<&Path>) -> Result<()> {
    let export: ExportConfig = config
        .export
        .clone()
        .ok_or_else(|| anyhow::anyhow!("No [export] section found in config"))?;
    let client = build_client(config)?;

    info!(stage = %export.stage, client = client.name(), "Exporting to stage");

    let exporter = StageExporter::new(client.as_ref(), export)?;
    let summary = exporter.run().await.context("Export failed")?;
    print_export_summary(&summary);

    if let Some(path) = summary_path {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("{} {}", "Summary written to".green(), path.display());
    }

    Ok(())
}

fn print_export_summary(summary: &ExportSummary) {
    println!();
    println!("{}", "═".repeat(60).cyan());
    println!("{}", "  Export Summary".bold().cyan());
    println!("{}", "═".repeat(60).cyan());
    println!("  {} {}", "Location:".bold(), summary.location);
    println!("  {} {}", "Timestamp:".bold(), summary.timestamp);

    if summary.staged.is_empty() {
        println!("  {}", "Zero files exported".yellow());
        return;
    }

    for (file, pointer) in summary.staged.iter().zip(&summary.pointers) {
        println!(
            "  {} {} ({} bytes) -> {}",
            "✓".green(),
            file.name,
            file.size,
            pointer.display()
        );
    }
    println!("  {} {}", "Files:".bold(), summary.pointers.len());
}

async fn import_command(config: &Config, temp_dir: Option<PathBuf>) -> Result<()> {
    let import: ImportConfig = config
        .import
        .clone()
        .ok_or_else(|| anyhow::anyhow!("No [import] section found in config"))?;
    let client = build_client(config)?;

    info!(input_dir = %import.input_dir.display(), client = client.name(), "Importing pointers");

    let output_dir = import.output_dir.clone();
    let mut importer = StageImporter::new(client.as_ref(), import);
    if let Some(dir) = temp_dir {
        importer = importer.with_temp_root(dir);
    }
    let count = importer.run().await.context("Import failed")?;

    println!(
        "{} {} files into {}",
        "✓ Imported".green(),
        count,
        output_dir.display()
    );
    Ok(())
}

fn materialize_command(
    database: &Path,
    query: &str,
    output: &Path,
    format: TextFormat,
    header: bool,
) -> Result<()> {
    let conn = rusqlite::Connection::open(database)
        .with_context(|| format!("Failed to open {}", database.display()))?;
    let mut stmt = conn.prepare(query).context("Failed to prepare query")?;
    let mut cursor = SqliteCursor::query(&mut stmt, [])?;

    let file = File::create(output).with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer: Box<dyn TupleWriter> = match format {
        TextFormat::Csv if header => Box::new(CsvWriter::with_header(BufWriter::new(file), cursor.column_names())),
        TextFormat::Csv => Box::new(CsvWriter::new(BufWriter::new(file))),
        TextFormat::Json => Box::new(JsonWriter::new(file, cursor.column_names())),
    };

    let result = materialize(&mut writer, &mut cursor)?;
    println!(
        "{} {} rows ({}) to {}",
        "✓ Materialized".green(),
        result.row_count,
        result.column_names.join(", "),
        output.display()
    );
    Ok(())
}

fn copy_command(input: &Path, database: &Path, table: &str, format: TextFormat, header: bool) -> Result<()> {
    let mut conn = rusqlite::Connection::open(database)
        .with_context(|| format!("Failed to open {}", database.display()))?;
    let info = table_info(&conn, table)?;
    let mut row = Tuple::from_table_info(&info)?;

    let file = File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
    let mut reader: Box<dyn TupleReader> = match format {
        TextFormat::Csv if header => Box::new(CsvReader::with_header(BufReader::new(file))),
        TextFormat::Csv => Box::new(CsvReader::new(BufReader::new(file))),
        TextFormat::Json => Box::new(JsonReader::new(BufReader::new(file), info.column_names())),
    };

    let tx = conn.transaction()?;
    let count = {
        let mut writer = SqlTupleWriter::new(&tx, &info, DialectConfig::Sqlite)?;
        copy(&mut reader, &mut writer, &mut row)?
    };
    tx.commit()?;

    println!(
        "{} {} rows into {}",
        "✓ Copied".green(),
        count,
        info.qualified_name()
    );
    Ok(())
}

fn init_command(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(anyhow::anyhow!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        ));
    }

    let mut warehouse = WarehouseConfig::default();
    warehouse
        .settings
        .insert("account".to_string(), "xy12345.us-east-1".to_string());
    warehouse
        .settings
        .insert("user".to_string(), "LOADER".to_string());

    let config = Config {
        dialect: DialectConfig::Snowflake,
        warehouse: Some(warehouse),
        export: Some(
            ExportConfig::new("in/cron", "out/pointers", "select * from orders", "%orders", "orders-export")
                .with_format(FileFormat::Csv, Some("none".to_string())),
        ),
        import: Some(ImportConfig::new("out/pointers", "out/data")),
    };
    config.save_to_file(path)?;

    println!("{} {}", "✓ Wrote".green(), path.display());
    Ok(())
}
