use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fdalens::Endpoint;
use fdalens::cli::commands::{count::CountOptions, fetch::FetchOptions, insights::InsightsOptions};
use fdalens::cli::util::{DateArgs, parse_endpoint};

#[derive(Parser)]
#[command(name = "fdalens")]
#[command(
    version,
    about = "Cached, concurrent OpenFDA queries with AI trend commentary"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true, help = "Extra config file merged over project config")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch records from an OpenFDA endpoint
    Fetch {
        #[arg(value_parser = parse_endpoint, help = "Endpoint, e.g. drug/event")]
        endpoint: Endpoint,
        #[arg(long, short, help = "OpenFDA search expression")]
        search: Option<String>,
        #[arg(long, short, help = "Records per page (1-1000)")]
        limit: Option<u32>,
        #[arg(long, default_value = "0", help = "Records to skip")]
        skip: u32,
        #[arg(long, help = "Follow pagination up to --max-records")]
        all: bool,
        #[arg(long, help = "Record ceiling with --all")]
        max_records: Option<usize>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
        #[command(flatten)]
        dates: DateArgs,
    },

    /// Count records by a field
    Count {
        #[arg(value_parser = parse_endpoint, help = "Endpoint, e.g. drug/event")]
        endpoint: Endpoint,
        #[arg(help = "Field to aggregate, e.g. patient.patientsex")]
        field: String,
        #[arg(long, short, help = "OpenFDA search expression")]
        search: Option<String>,
        #[arg(long, short, default_value = "10", help = "Buckets to keep")]
        top: usize,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
        #[command(flatten)]
        dates: DateArgs,
    },

    /// Run several count queries concurrently
    Batch {
        #[arg(required = true, help = "Queries as endpoint:field[:label]")]
        queries: Vec<String>,
        #[arg(long, short, help = "Search expression applied to every query")]
        search: Option<String>,
        #[arg(long, short, default_value = "10", help = "Buckets to keep")]
        top: usize,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
        #[command(flatten)]
        dates: DateArgs,
    },

    /// Ask the language model about an aggregated field
    Insights {
        #[arg(value_parser = parse_endpoint, help = "Endpoint, e.g. device/event")]
        endpoint: Endpoint,
        #[arg(help = "Field to aggregate")]
        field: String,
        #[arg(long, short, help = "OpenFDA search expression")]
        search: Option<String>,
        #[arg(long, help = "Question for the model (default: trend analysis)")]
        question: Option<String>,
        #[arg(long, short, default_value = "10", help = "Buckets to include")]
        top: usize,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
        #[command(flatten)]
        dates: DateArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mfdalens encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Fetch {
            endpoint,
            search,
            limit,
            skip,
            all,
            max_records,
            dates,
            format,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(fdalens::cli::commands::fetch::run(
                config_path,
                FetchOptions {
                    endpoint,
                    search,
                    limit,
                    skip,
                    all,
                    max_records,
                    dates,
                    format,
                },
            ))?;
        }
        Commands::Count {
            endpoint,
            field,
            search,
            top,
            dates,
            format,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(fdalens::cli::commands::count::run(
                config_path,
                CountOptions {
                    endpoint,
                    field,
                    search,
                    top,
                    dates,
                    format,
                },
            ))?;
        }
        Commands::Batch {
            queries,
            search,
            top,
            dates,
            format,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(fdalens::cli::commands::batch::run(
                config_path,
                &queries,
                search.as_deref(),
                top,
                &dates,
                &format,
            ))?;
        }
        Commands::Insights {
            endpoint,
            field,
            search,
            question,
            top,
            dates,
            format,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(fdalens::cli::commands::insights::run(
                config_path,
                InsightsOptions {
                    endpoint,
                    field,
                    search,
                    question,
                    top,
                    dates,
                    format,
                },
            ))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => {
                fdalens::cli::commands::config::show(config_path, global, &format)?;
            }
            ConfigAction::Path => {
                fdalens::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                fdalens::cli::commands::config::init(global, force)?;
            }
        },
    }

    Ok(())
}
