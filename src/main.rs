use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use mqctl::broker::{
    list_users, DesiredState, ReconcileOptions, Reconciler, TargetState, UpdatePolicy, UserQuery,
};
use mqctl::config::{load_desired_state, Config};
use mqctl::mq::{format_api_error, MqClient};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Declarative lifecycle management for managed message brokers
#[derive(Parser, Debug)]
#[command(name = "mqctl", version, about, long_about = None)]
struct Args {
    /// Broker API endpoint (defaults to the regional endpoint)
    #[arg(long, global = true, env = "MQCTL_ENDPOINT")]
    endpoint: Option<String>,

    /// Region to operate in
    #[arg(long, global = true, env = "MQCTL_REGION")]
    region: Option<String>,

    /// Bearer token sent to the endpoint
    #[arg(long, global = true, env = "MQCTL_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log level for debugging
    #[arg(long, global = true, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create, update, delete or reboot a broker from a declaration
    Apply {
        /// YAML or JSON file with the broker parameters
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Broker name (overrides `broker_name` in the file)
        #[arg(short, long)]
        name: Option<String>,

        /// Target state: present, absent or restarted (overrides `state` in the file)
        #[arg(short, long)]
        state: Option<String>,

        /// Report what would happen without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Fail instead of ignoring creation-only parameters when the broker exists
        #[arg(long)]
        strict_update: bool,
    },
    /// Show a broker's details
    Describe {
        #[arg(long)]
        id: Option<String>,

        #[arg(long)]
        name: Option<String>,
    },
    /// List the users of a broker
    Users {
        #[arg(long)]
        broker_id: String,

        #[arg(long, default_value_t = 100)]
        max_results: u32,

        #[arg(long)]
        skip_pending_create: bool,

        #[arg(long)]
        skip_pending_delete: bool,

        /// Key the result by username
        #[arg(long)]
        as_map: bool,
    },
    /// Persist endpoint, region or token for later runs
    Configure,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {}: {}", log_path.display(), e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    // RUST_LOG narrows per target; the flag still caps the level
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(tracing_level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("mqctl started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("mqctl").join("mqctl.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".mqctl").join("mqctl.log");
    }
    PathBuf::from("mqctl.log")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    match run(args).await {
        Ok(output) => {
            match serde_json::to_string_pretty(&output) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("Error: {}", format_api_error(&err));
            ExitCode::FAILURE
        }
    }
}

/// Resolve endpoint and region (CLI > config > defaults) and build the client
fn connect(
    config: &Config,
    endpoint: Option<String>,
    region: Option<String>,
    token: Option<String>,
) -> Result<(MqClient, String)> {
    let region = region.unwrap_or_else(|| config.effective_region());
    let endpoint = match endpoint {
        Some(endpoint) => endpoint,
        None => config.effective_endpoint(&region)?,
    };
    let token = token.or_else(|| config.token.clone());

    tracing::info!("Using endpoint: {}, region: {}", endpoint, region);

    Ok((MqClient::new(&endpoint, token)?, region))
}

async fn run(args: Args) -> Result<Value> {
    let mut config = Config::load();

    match args.command {
        Command::Configure => {
            config.update(args.endpoint, args.region, args.token)?;
            Ok(serde_json::to_value(&config)?)
        }
        Command::Apply {
            file,
            name,
            state,
            dry_run,
            strict_update,
        } => {
            let (client, region) = connect(&config, args.endpoint, args.region, args.token)?;

            let mut desired = match file {
                Some(path) => load_desired_state(&path)?,
                None => DesiredState::new(),
            };
            if let Some(name) = name {
                desired.insert("broker_name".to_string(), Value::String(name));
            }

            let target: TargetState = match state {
                Some(state) => state.parse()?,
                None => match desired.get("state").and_then(|v| v.as_str()) {
                    Some(state) => state.parse()?,
                    None => TargetState::default(),
                },
            };

            let options = ReconcileOptions {
                dry_run,
                update_policy: if strict_update {
                    UpdatePolicy::RejectCreateOnly
                } else {
                    UpdatePolicy::DropCreateOnly
                },
                region,
            };

            let outcome = Reconciler::new(&client, options)
                .reconcile(target, &desired)
                .await?;
            Ok(serde_json::to_value(&outcome)?)
        }
        Command::Describe { id, name } => {
            let (client, _) = connect(&config, args.endpoint, args.region, args.token)?;
            let broker = Reconciler::new(&client, ReconcileOptions::default())
                .describe(id.as_deref(), name.as_deref())
                .await?;
            Ok(json!({ "broker": broker }))
        }
        Command::Users {
            broker_id,
            max_results,
            skip_pending_create,
            skip_pending_delete,
            as_map,
        } => {
            let (client, _) = connect(&config, args.endpoint, args.region, args.token)?;
            let query = UserQuery {
                max_results,
                skip_pending_create,
                skip_pending_delete,
                as_map,
            };
            let users = list_users(&client, &broker_id, &query).await?;
            Ok(json!({ "users": users }))
        }
    }
}
