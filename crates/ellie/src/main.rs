use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use ellie::{
    AppConfig, ExportPlan, ExportResult, Exporter, ExporterKind, Orchestrator,
    PluginConfig,
};
use moves_client::MovesClient;
use moves_client::http_client::ReqwestMovesClient;

#[derive(Parser)]
#[command(name = "ellie", version)]
#[command(about = "Export your Moves storyline day by day", long_about = None)]
struct Cli {
    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create your configuration file
    Init,
    /// Show information for the user the access token belongs to
    Show,
    /// List the available exporters and their options
    Exporters,
    /// Start an export
    Export(ExportArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Exporter to use, see `ellie exporters`
    #[arg(long)]
    output: Option<String>,

    /// Start exporting after this day (YYYYMMDD)
    #[arg(long)]
    day_start: Option<String>,

    /// Stop exporting at this day (YYYYMMDD)
    #[arg(long)]
    day_end: Option<String>,

    /// Export the last n days
    #[arg(long)]
    days: Option<u64>,

    /// Export yesterday
    #[arg(long)]
    yesterday: bool,

    /// Export the last calendar month
    #[arg(long)]
    last_month: bool,

    /// Exporter option, repeatable (e.g. --set overwrite=true)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = PluginConfig::parse_assignment)]
    options: Vec<(String, serde_json::Value)>,
}

impl ExportArgs {
    /// Run-time parameters. Named flags win over `--set` pairs with the same key.
    fn params(&self) -> PluginConfig {
        let mut params = PluginConfig::from_pairs(self.options.iter().cloned());
        if let Some(output) = &self.output {
            params.insert("output", output.as_str());
        }
        if let Some(start) = &self.day_start {
            params.insert("dayStart", start.as_str());
        }
        if let Some(end) = &self.day_end {
            params.insert("dayEnd", end.as_str());
        }
        if let Some(days) = self.days {
            params.insert("days", days);
        }
        if self.yesterday {
            params.insert("yesterday", true);
        }
        if self.last_month {
            params.insert("lastMonth", true);
        }
        params
    }
}

fn init_logging() {
    // Configure logging from env var `ELLIE_LOG_LEVEL` (or fallback to `RUST_LOG`, default `info`).
    let log_env = std::env::var("ELLIE_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());

    // Keep connection pool internals quiet by default
    let combined_filter = format!("{},hyper_util=warn", log_env);
    let env_filter = tracing_subscriber::EnvFilter::try_new(combined_filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,hyper_util=warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::debug!("ellie: log filter: {}", log_env);
}

fn client_for(config: &AppConfig) -> ExportResult<ReqwestMovesClient> {
    let credentials = config.credentials()?;
    Ok(ReqwestMovesClient::from_credentials(&credentials))
}

fn cmd_init(path: &Path) -> ExportResult<()> {
    AppConfig::write_template(path)?;
    println!("> Created configuration file at {}", path.display());
    println!("> Create a Moves API client at https://dev.moves-app.com/apps");
    println!("> and fill in client_id, client_secret and access_token.");
    Ok(())
}

async fn cmd_show(config: &AppConfig) -> ExportResult<()> {
    let profile = client_for(config)?.get_profile().await?;
    println!("> Your profile info:");
    println!(" userId: {}", profile.user_id);
    println!(" startDay: {}", profile.first_date);
    if let Some(tz) = profile.time_zone {
        println!(" timeZone: {tz}");
    }
    Ok(())
}

fn cmd_exporters() {
    println!("Available exporters:");
    for kind in ExporterKind::ALL {
        let help = kind.build(&PluginConfig::new()).help();
        println!(" {}: {}", help.name, help.description);
        for (key, doc) in help.options {
            println!("  --set {key}=... {doc}");
        }
        println!();
    }
}

async fn cmd_export(config: &AppConfig, args: &ExportArgs) -> ExportResult<()> {
    let today = chrono::Local::now().date_naive();
    let plan = ExportPlan::resolve(&config.defaults, &args.params(), today)?;
    let client = Arc::new(client_for(config)?);
    let exporter: Arc<dyn Exporter> = Arc::from(plan.build_exporter());

    println!(
        "> Using {} to export {} days with trackPoints {}!",
        exporter.help().name,
        plan.range.days(),
        exporter.fetch_options().track_points
    );
    println!();

    let report = Orchestrator::new(client, exporter).run(&plan.range).await;
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(id) => println!("> Exported {id}"),
            Err(e) => println!("! Error: {e}"),
        }
    }
    tracing::info!(
        exported = report.exported().count(),
        failed = report.failures().count(),
        "export finished"
    );
    Ok(())
}

async fn run(cli: Cli) -> ExportResult<()> {
    let config_path = cli.config.unwrap_or_else(AppConfig::default_config_path);
    match cli.command {
        Commands::Init => cmd_init(&config_path),
        Commands::Exporters => {
            cmd_exporters();
            Ok(())
        }
        Commands::Show => cmd_show(&AppConfig::load_from(&config_path)?).await,
        Commands::Export(args) => cmd_export(&AppConfig::load_from(&config_path)?, &args).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("> {e}");
        std::process::exit(if e.is_fatal() { 1 } else { 2 });
    }
    Ok(())
}
