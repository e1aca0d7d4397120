//! Order Analytics CLI - TPCH order metrics from Databricks
//!
//! Usage:
//!   order-analytics metric <id> [--limit <n>] [--format <format>]
//!   order-analytics query <sql> | --file <path> [--csv <out>]
//!   order-analytics view <name> [--limit <n>]
//!   order-analytics health | info | list | samples
//!
//! Examples:
//!   order-analytics metric kpi_metrics
//!   order-analytics metric top_customers --limit 5 --format csv
//!   order-analytics query "SELECT COUNT(*) AS n FROM samples.tpch.orders"
//!   order-analytics view products --limit 15

use clap::{Parser, Subcommand, ValueEnum};
use order_analytics::catalog::{Limit, MetricCatalog, MetricId, MetricParams};
use order_analytics::config::{Settings, REMEDIATION};
use order_analytics::export::{self, format_currency, format_number};
use order_analytics::resolver::{ConnectionResolver, DatabricksClientFactory};
use order_analytics::views::{load_view, SectionData, View, ViewOptions};
use order_analytics::{logging, KpiMetrics, TabularResult};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "order-analytics")]
#[command(about = "Order Analytics - TPCH order metrics from a Databricks SQL warehouse or cluster")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to $ORDER_ANALYTICS_CONFIG, ./order-analytics.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a catalog metric
    Metric {
        /// Metric identifier (see `list`)
        id: String,

        /// Row limit for ranking metrics
        #[arg(short, long, value_parser = parse_limit)]
        limit: Option<Limit>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Run an ad-hoc SQL query (never cached)
    Query {
        /// SQL text
        #[arg(conflicts_with = "file", required_unless_present = "file")]
        sql: Option<String>,

        /// Read SQL from a file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Also write the result to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Load every section of a dashboard view
    View {
        /// overview, customers, geography or products
        name: String,

        /// Row limit for ranking sections
        #[arg(short, long, value_parser = parse_limit)]
        limit: Option<Limit>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Check connectivity to the backend
    Health,

    /// Show the resolved connection and settings
    Info,

    /// List catalog metrics
    List,

    /// Print the sample ad-hoc queries
    Samples,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Aligned text table
    Table,
    /// CSV with a header row
    Csv,
    /// JSON array of row objects
    Json,
}

fn parse_limit(s: &str) -> Result<Limit, String> {
    let value: i64 = s.parse().map_err(|e| format!("invalid limit '{}': {}", s, e))?;
    Limit::try_from(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&settings.logging) {
        eprintln!("Warning: {}", e);
    }

    let factory = Arc::new(DatabricksClientFactory::new(settings.query.clone()));
    let resolver = Arc::new(ConnectionResolver::new(factory));
    let catalog = match MetricCatalog::from_settings(&settings, Arc::clone(&resolver)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let code = match cli.command {
        Commands::Metric { id, limit, format } => cmd_metric(&catalog, &id, limit, format).await,
        Commands::Query {
            sql,
            file,
            csv,
            format,
        } => cmd_query(&catalog, sql, file, csv, format).await,
        Commands::View {
            name,
            limit,
            format,
        } => cmd_view(&catalog, &name, limit, format).await,
        Commands::Health => cmd_health(&catalog).await,
        Commands::Info => cmd_info(&catalog, &resolver, &settings),
        Commands::List => cmd_list(),
        Commands::Samples => cmd_samples(&catalog),
    };

    resolver.close().await;
    code
}

async fn cmd_metric(
    catalog: &MetricCatalog,
    id: &str,
    limit: Option<Limit>,
    format: OutputFormat,
) -> ExitCode {
    let id: MetricId = match id.parse() {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run `order-analytics list` to see available metrics.");
            return ExitCode::FAILURE;
        }
    };

    if limit.is_some() && !id.takes_limit() {
        eprintln!("Warning: metric '{}' does not take a limit; ignoring it", id);
    }

    if id == MetricId::KpiMetrics && matches!(format, OutputFormat::Table) {
        return match catalog.kpi_metrics().await {
            Ok(kpis) => {
                print_kpis(&kpis);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Query failed: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    match catalog.metric(id, MetricParams::for_metric(id, limit)).await {
        Ok(result) => print_result(&result, format),
        Err(e) => {
            eprintln!("Query failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_query(
    catalog: &MetricCatalog,
    sql: Option<String>,
    file: Option<PathBuf>,
    csv: Option<PathBuf>,
    format: OutputFormat,
) -> ExitCode {
    let sql = match (sql, file) {
        (Some(sql), _) => sql,
        (None, Some(path)) => match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        (None, None) => {
            eprintln!("Error: provide SQL text or --file");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("Note: custom queries are not cached.");

    let outcome = match catalog.execute_custom(&sql).await {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Query failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Query executed successfully in {:.2}s - {} rows returned",
        outcome.elapsed.as_secs_f64(),
        outcome.result.num_rows()
    );
    if outcome.truncated {
        eprintln!("Warning: the result was truncated by the engine");
    }

    if let Some(path) = csv {
        let written = export::to_csv(&outcome.result)
            .map_err(|e| e.to_string())
            .and_then(|text| fs::write(&path, text).map_err(|e| e.to_string()));
        match written {
            Ok(()) => eprintln!("Wrote {}", path.display()),
            Err(e) => {
                eprintln!("Error writing '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        }
    }

    print_result(&outcome.result, format)
}

async fn cmd_view(
    catalog: &MetricCatalog,
    name: &str,
    limit: Option<Limit>,
    format: OutputFormat,
) -> ExitCode {
    let view: View = match name.parse() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let options = limit.map(ViewOptions::uniform).unwrap_or_default();
    let report = load_view(catalog, view, options).await;

    for section in &report.sections {
        println!("== {} ==", section.metric);
        match &section.data {
            Ok(SectionData::Kpis(kpis)) => print_kpis(kpis),
            Ok(SectionData::Table(result)) => {
                print_result(result, format);
            }
            Err(e) => eprintln!("Failed to load {}: {}", section.metric, e),
        }
        println!();
    }

    if report.failures() == report.sections.len() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn cmd_health(catalog: &MetricCatalog) -> ExitCode {
    if catalog.health_check().await {
        println!("Connected: {}", catalog.connection_info());
        ExitCode::SUCCESS
    } else {
        eprintln!("Connection failed ({})", catalog.connection_info());
        eprintln!();
        eprintln!("{}", REMEDIATION);
        ExitCode::FAILURE
    }
}

fn cmd_info(catalog: &MetricCatalog, resolver: &ConnectionResolver, settings: &Settings) -> ExitCode {
    let mode = resolver.resolve_mode();
    let config = resolver.config();

    println!("Connection: {} ({})", mode.description(), mode);
    println!(
        "Host:       {}",
        config.host.as_deref().unwrap_or("(DATABRICKS_HOST not set)")
    );
    if let Some(path) = config.warehouse_path() {
        println!("Warehouse:  {}", path);
    }
    if let Some(cluster) = &config.cluster_id {
        println!("Cluster:    {}", cluster);
    }
    println!("Data:       {}", catalog.schema());
    if settings.cache.enabled {
        println!("Cache:      enabled, ttl {}s", catalog.ttl().as_secs());
    } else {
        println!("Cache:      disabled");
    }
    ExitCode::SUCCESS
}

fn cmd_list() -> ExitCode {
    println!("Metrics:");
    for id in MetricId::ALL {
        let limit = if id.takes_limit() { " [--limit]" } else { "" };
        println!("  - {}{}: {}", id, limit, id.description());
        println!("      columns: {}", id.columns().join(", "));
    }
    println!();
    println!("Views:");
    for view in View::ALL {
        let metrics: Vec<&str> = view.metrics().iter().map(|m| m.as_str()).collect();
        println!("  - {}: {}", view, metrics.join(", "));
    }
    ExitCode::SUCCESS
}

fn cmd_samples(catalog: &MetricCatalog) -> ExitCode {
    for sample in catalog.sample_queries() {
        println!("-- {}", sample.name);
        println!("{};", sample.sql);
        println!();
    }
    ExitCode::SUCCESS
}

fn print_kpis(kpis: &KpiMetrics) {
    println!("Total Orders:     {}", format_number(kpis.total_orders as f64));
    println!("Total Revenue:    {}", format_currency(kpis.total_revenue));
    println!("Total Customers:  {}", format_number(kpis.total_customers as f64));
    println!("Avg Order Value:  {}", format_currency(kpis.avg_order_value));
}

fn print_result(result: &TabularResult, format: OutputFormat) -> ExitCode {
    let rendered = match format {
        OutputFormat::Table => Ok(export::to_text_table(result)),
        OutputFormat::Csv => export::to_csv(result),
        OutputFormat::Json => export::to_json(result).map(|s| s + "\n"),
    };

    match rendered {
        Ok(text) => {
            print!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error rendering result: {}", e);
            ExitCode::FAILURE
        }
    }
}
