//! Varonis SaaS CLI
//!
//! Command-line interface for searching and triaging Varonis SaaS alerts.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use vs_connector::{
    translate, AlertCategory, AlertSearch, AlertSeverity, AlertStatus, CancellationToken,
    CloseReason, Connector, ConnectorHealth, EnumItem, EventSearch, Record, SearchInput,
    SortOrder, TimeBound, VaronisConnector,
};
use vs_observability::{LogFormat, LoggingConfig};

mod config;

use config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "varonis-saas")]
#[command(author = "Varonis SaaS Connector Team")]
#[command(version)]
#[command(about = "Search and triage Varonis SaaS alerts and events", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "VARONIS_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Log line format (plain, json); overrides the config file
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Print the effective configuration (API key redacted) and exit
    #[arg(long)]
    show_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search alerts
    Alerts(AlertArgs),

    /// Search events
    Events(EventArgs),

    /// Run a search from a JSON file: a search request or a compiled wire query ("-" reads stdin)
    Query {
        file: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// List threat models (alert rules)
    ThreatModels,

    /// Show a platform enum
    Enum {
        /// Enum id
        id: u32,
    },

    /// Change the status of alerts
    UpdateStatus {
        /// Alert id (repeatable)
        #[arg(long = "id", required = true)]
        ids: Vec<String>,

        /// New status (new, under investigation, closed)
        #[arg(long)]
        status: AlertStatus,

        /// Close reason, required with --status closed
        #[arg(long)]
        close_reason: Option<CloseReason>,
    },

    /// Add a note to alerts
    AddNote {
        /// Alert id (repeatable)
        #[arg(long = "id", required = true)]
        ids: Vec<String>,

        /// Note text
        #[arg(long)]
        note: String,
    },

    /// Verify the credentials against the tenant
    Check,
}

/// Options shared by every search command.
#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Return at most this many rows
    #[arg(long)]
    max_rows: Option<u32>,

    /// Print the compiled wire query instead of running it
    #[arg(long)]
    compile_only: bool,
}

#[derive(Args, Debug, Default)]
struct AlertArgs {
    /// Alert id (repeatable)
    #[arg(long = "id")]
    alert_ids: Vec<String>,

    /// Threat model id (repeatable)
    #[arg(long = "rule-id")]
    rule_ids: Vec<String>,

    /// Rule category name (repeatable)
    #[arg(long = "category")]
    categories: Vec<AlertCategory>,

    /// Device host name (repeatable)
    #[arg(long = "device")]
    device_names: Vec<String>,

    /// User identity name (repeatable)
    #[arg(long = "user")]
    user_names: Vec<String>,

    /// Alert status (repeatable; all statuses when omitted)
    #[arg(long = "status")]
    statuses: Vec<AlertStatus>,

    /// Alert severity (repeatable; all severities when omitted)
    #[arg(long = "severity")]
    severities: Vec<AlertSeverity>,

    /// Range start (RFC 3339)
    #[arg(long)]
    start: Option<TimeBound>,

    /// Range end (RFC 3339); defaults to now when only --start is given
    #[arg(long)]
    end: Option<TimeBound>,

    /// Ingest-time range start (RFC 3339)
    #[arg(long)]
    ingest_start: Option<TimeBound>,

    /// Ingest-time range end (RFC 3339)
    #[arg(long)]
    ingest_end: Option<TimeBound>,

    /// Only alerts from the last N days
    #[arg(long)]
    last_days: Option<u32>,

    /// Extra column (repeatable; glob patterns allowed)
    #[arg(long = "field")]
    extra_fields: Vec<String>,

    /// Newest first
    #[arg(long)]
    desc: bool,

    #[command(flatten)]
    run: RunArgs,
}

impl AlertArgs {
    fn search(&self) -> AlertSearch {
        let mut search = AlertSearch::new()
            .alert_ids(&self.alert_ids)
            .rule_ids(&self.rule_ids)
            .category_ids(self.categories.iter().map(|c| c.id()))
            .device_names(&self.device_names)
            .user_names(&self.user_names)
            .statuses(self.statuses.iter().copied())
            .severities(self.severities.iter().copied())
            .extra_fields(&self.extra_fields);

        if let Some(start) = self.start {
            search = search.start_time(start);
        }
        if let Some(end) = self.end {
            search = search.end_time(end);
        }
        if let Some(start) = self.ingest_start {
            search = search.ingest_time_start(start);
        }
        if let Some(end) = self.ingest_end {
            search = search.ingest_time_end(end);
        }
        if let Some(days) = self.last_days {
            search = search.last_days(days);
        }
        if self.desc {
            search = search.order(SortOrder::Desc);
        }
        search
    }
}

#[derive(Args, Debug, Default)]
struct EventArgs {
    /// Alert id whose events to fetch (repeatable)
    #[arg(long = "alert-id")]
    alert_ids: Vec<String>,

    /// Range start (RFC 3339)
    #[arg(long)]
    start: Option<TimeBound>,

    /// Range end (RFC 3339)
    #[arg(long)]
    end: Option<TimeBound>,

    /// Only events from the last N days
    #[arg(long)]
    last_days: Option<u32>,

    /// Extra column (repeatable)
    #[arg(long = "field")]
    extra_fields: Vec<String>,

    /// Oldest first
    #[arg(long)]
    asc: bool,

    #[command(flatten)]
    run: RunArgs,
}

impl EventArgs {
    fn search(&self) -> EventSearch {
        let mut search = EventSearch::new()
            .alert_ids(&self.alert_ids)
            .extra_fields(&self.extra_fields);

        if let Some(start) = self.start {
            search = search.start_time(start);
        }
        if let Some(end) = self.end {
            search = search.end_time(end);
        }
        if let Some(days) = self.last_days {
            search = search.last_days(days);
        }
        if self.asc {
            search = search.order(SortOrder::Asc);
        }
        search
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::resolve(cli.config.as_deref())?;
    init_logging(&cli, &config)?;

    if cli.show_config {
        return cmd_show_config(&config, cli.format);
    }

    let Some(command) = cli.command else {
        anyhow::bail!("No command given (try --help)");
    };

    match command {
        Commands::Alerts(args) => {
            let input = SearchInput::from(args.search().build()?);
            cmd_search(&config, input, &args.run, cli.format).await
        }
        Commands::Events(args) => {
            let input = SearchInput::from(args.search().build()?);
            cmd_search(&config, input, &args.run, cli.format).await
        }
        Commands::Query { file, run } => {
            let input = SearchInput::from_value(read_json(&file)?)?;
            cmd_search(&config, input, &run, cli.format).await
        }
        Commands::ThreatModels => cmd_threat_models(&config, cli.format).await,
        Commands::Enum { id } => cmd_enum(&config, id, cli.format).await,
        Commands::UpdateStatus {
            ids,
            status,
            close_reason,
        } => {
            let connector = connect(&config)?;
            connector
                .update_alert_status(&ids, status, close_reason)
                .await?;
            println!(
                "{} {} alert(s) set to '{}'",
                "✓".green(),
                ids.len(),
                status
            );
            Ok(())
        }
        Commands::AddNote { ids, note } => {
            let connector = connect(&config)?;
            connector.add_alert_note(&ids, &note).await?;
            println!("{} Note added to {} alert(s)", "✓".green(), ids.len());
            Ok(())
        }
        Commands::Check => cmd_check(&config).await,
    }
}

fn init_logging(cli: &Cli, config: &AppConfig) -> Result<()> {
    let mut logging = if cli.verbose > 0 {
        LoggingConfig::from_verbosity(cli.verbose)
    } else {
        LoggingConfig {
            level: config.logging.level()?,
            ..LoggingConfig::default()
        }
    };
    logging = logging.with_format(match cli.log_format {
        Some(format) => format,
        None => config.logging.format()?,
    });

    vs_observability::init_logging_with_config(logging).context("Failed to initialize logging")
}

fn connect(config: &AppConfig) -> Result<VaronisConnector> {
    Ok(VaronisConnector::new(config.connector_config()?)?)
}

fn read_json(file: &Path) -> Result<Value> {
    let contents = if file == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("Failed to read query from stdin")?
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read query file: {}", file.display()))?
    };
    serde_json::from_str(&contents)
        .with_context(|| format!("Query is not valid JSON: {}", file.display()))
}

fn cmd_show_config(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let redacted = config.redact_secrets();
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&redacted)?);
    } else {
        println!("{}", "Current Configuration".bold());
        println!("─────────────────────────");
        print!("{}", serde_yaml::to_string(&redacted)?);
    }
    Ok(())
}

async fn cmd_search(
    config: &AppConfig,
    input: SearchInput,
    run: &RunArgs,
    format: OutputFormat,
) -> Result<()> {
    if run.compile_only {
        let wire = translate(input);
        println!("{}", serde_json::to_string_pretty(&wire)?);
        return Ok(());
    }

    let connector = connect(config)?;
    let cancel = cancel_on_ctrl_c();
    let results = connector
        .search_with_cancel(input, run.max_rows, &cancel)
        .await?;
    let records = results.records()?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print_records(&records);
    }
    Ok(())
}

async fn cmd_threat_models(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let models = connect(config)?.get_threat_models().await?;
    print_enum_items("Threat Models", &models, format)
}

async fn cmd_enum(config: &AppConfig, id: u32, format: OutputFormat) -> Result<()> {
    let entries = connect(config)?.get_enum(id).await?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    let items = vs_connector::map_enum(&entries)?;
    print_enum_items(&format!("Enum {}", id), &items, format)
}

async fn cmd_check(config: &AppConfig) -> Result<()> {
    let connector = connect(config)?;
    println!(
        "Checking {} at {}",
        connector.name().cyan(),
        connector.config().normalized_base_url()
    );
    match connector.health_check().await? {
        ConnectorHealth::Healthy => {
            println!("{}", "Connection is healthy.".green().bold());
            Ok(())
        }
        ConnectorHealth::Degraded(reason) => {
            println!("{}: {}", "Connection is degraded".yellow().bold(), reason);
            Ok(())
        }
        ConnectorHealth::Unhealthy(reason) => {
            println!("{}: {}", "Connection failed".red().bold(), reason);
            std::process::exit(1);
        }
    }
}

fn print_enum_items(title: &str, items: &[EnumItem], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(items)?);
        return Ok(());
    }
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()));
    for item in items {
        println!("  {:>8}  {}", display_value(&item.id), display_value(&item.name));
    }
    Ok(())
}

fn print_records(records: &[Record]) {
    if records.is_empty() {
        println!("No results found");
        return;
    }
    for (index, record) in records.iter().enumerate() {
        println!("{}", format!("#{}", index + 1).bold());
        for (column, value) in record {
            println!("  {}: {}", column.cyan(), display_value(value));
        }
    }
    println!();
    println!("{} row(s)", records.len());
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "-".dimmed().to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Token that fires when the process receives Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling search");
            trigger.cancel();
        }
    });
    token
}
