mod render;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use supplychain_core::{ActorId, LedgerError, ProductId};
use supplychain_infra::{LedgerConfig, open_file_ledger, verify_ledger};
use supplychain_observability::LogFormat;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Product lifecycle ledger.
#[derive(Debug, Parser)]
#[command(name = "supplychain", version, about = "Product lifecycle ledger")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Event log file (overrides SUPPLYCHAIN_LOG_PATH)
    #[arg(long, global = true)]
    log_path: Option<PathBuf>,

    /// Skip fsync after each append (overrides SUPPLYCHAIN_SYNC_WRITES)
    #[arg(long, global = true)]
    no_sync: bool,

    /// Diagnostic log format, json or text (overrides SUPPLYCHAIN_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Register a new product in state Created
    Create {
        /// Product name
        #[arg(long)]
        name: String,
        /// Actor registering the product; becomes its first owner
        #[arg(long)]
        actor: ActorId,
    },

    /// Move a product to the next lifecycle state
    Advance {
        id: ProductId,
        #[arg(long)]
        actor: ActorId,
    },

    /// Request a specific state code (0 created, 1 packed, 2 shipped, 3 delivered)
    SetState {
        id: ProductId,
        state: u8,
        #[arg(long)]
        actor: ActorId,
    },

    /// List every product
    List,

    /// Show one product
    Show { id: ProductId },

    /// Show a product together with its events
    History { id: ProductId },

    /// Check the hash chain and replay every product against the store
    Verify,
}

impl Cli {
    fn ledger_config(&self) -> anyhow::Result<LedgerConfig> {
        let mut config = LedgerConfig::from_env()?;
        if let Some(path) = &self.log_path {
            config.event_log_path = path.clone();
        }
        if self.no_sync {
            config.sync_writes = false;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Ok(config)
    }
}

/// Outcome of a command that ran to completion.
#[derive(Debug, PartialEq, Eq)]
enum Completion {
    Ok,
    /// The command ran but found problems (a failed audit).
    Findings,
}

fn run(cli: &Cli, config: &LedgerConfig, out: &mut dyn Write) -> anyhow::Result<Completion> {
    let ledger = open_file_ledger(config)
        .with_context(|| format!("opening ledger at {}", config.event_log_path.display()))?;
    debug!(path = %config.event_log_path.display(), products = ledger.count(), "ledger ready");

    match &cli.command {
        Commands::Create { name, actor } => {
            let id = ledger.create_product(name, actor)?;
            render::product_id(out, cli.output, id)?;
        }
        Commands::Advance { id, actor } => {
            let record = ledger.advance(*id, actor)?;
            render::view(out, cli.output, &(&record).into())?;
        }
        Commands::SetState { id, state, actor } => {
            let record = ledger.change_state(*id, *state, actor)?;
            render::view(out, cli.output, &(&record).into())?;
        }
        Commands::List => {
            render::views(out, cli.output, &ledger.list_views()?)?;
        }
        Commands::Show { id } => {
            render::view(out, cli.output, &ledger.view(*id)?)?;
        }
        Commands::History { id } => {
            let (record, events) = ledger.history(*id)?;
            render::history(out, cli.output, &(&record).into(), &events)?;
        }
        Commands::Verify => {
            let report = verify_ledger(&ledger)?;
            render::audit(out, cli.output, &report)?;
            if !report.is_clean() {
                return Ok(Completion::Findings);
            }
        }
    }
    Ok(Completion::Ok)
}

fn report_error(format: OutputFormat, err: &anyhow::Error) {
    let kind = err
        .downcast_ref::<LedgerError>()
        .map_or("error", LedgerError::kind);
    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({ "error": kind, "message": format!("{err:#}") });
            eprintln!("{body}");
        }
        OutputFormat::Text => eprintln!("error: {err:#}"),
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match cli.ledger_config() {
        Ok(config) => config,
        Err(err) => {
            report_error(cli.output, &err);
            process::exit(2);
        }
    };
    supplychain_observability::init_with(config.log_format);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match run(&cli, &config, &mut out) {
        Ok(Completion::Ok) => {}
        Ok(Completion::Findings) => process::exit(1),
        Err(err) => {
            report_error(cli.output, &err);
            process::exit(1);
        }
    }
}
