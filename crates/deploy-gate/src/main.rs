use std::collections::HashMap;
use std::env;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing::{info, warn};

use deploy_gate::coordinator::{ApprovalCoordinator, GateOutcome};
use deploy_gate::session::{DeploymentSession, DynamoSessionStore, SessionStore};
use deploy_gate::GateConfig;

const APP_NAME: &str = "deploy-gate";

fn main() {
    let code = match try_main() {
        Ok(code) => code,
        Err(err) => {
            let _ = writeln!(io::stderr(), "{err:?}");
            workflow_error(&format!("{err:#}"));
            1
        }
    };
    std::process::exit(code);
}

fn try_main() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(&cli.common);

    match cli.command {
        Command::Run => async_run(&cli.common),
        Command::Status { deploy_id } => async_status(&cli.common, &deploy_id),
        Command::Config { command } => handle_config(&cli.common, command),
        Command::Completions { shell } => {
            handle_completions(shell);
            Ok(0)
        }
    }
}

#[tokio::main]
async fn async_run(common: &CommonOpts) -> Result<i32> {
    handle_run(common).await
}

#[tokio::main]
async fn async_status(common: &CommonOpts, deploy_id: &str) -> Result<i32> {
    handle_status(common, deploy_id).await
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Deploy Gate - hold a deployment until a human approves it.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// TOML file with gate settings (overridden by INPUT_* and DEPLOY_GATE_* variables)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Enable debug logging (equivalent to -v)
    #[arg(long, global = true)]
    debug: bool,
    /// Output machine readable JSON
    #[arg(long, global = true)]
    json: bool,
    /// Disable ANSI colors in output
    #[arg(long = "no-color", global = true)]
    no_color: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the gate and wait for an approval decision
    Run,
    /// Show the stored record of a deployment session
    Status {
        /// Deploy id printed when the gate opened
        deploy_id: String,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Output the effective configuration with secrets redacted
    Show,
}

fn init_logging(common: &CommonOpts) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let level = if common.quiet {
        "error"
    } else if common.debug {
        "debug"
    } else {
        match common.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("deploy_gate={level}")));

    if common.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .try_init()
            .ok();
    } else {
        let disable_color = common.no_color
            || env::var_os("NO_COLOR").is_some()
            || !io::stderr().is_terminal();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_ansi(!disable_color)
                    .with_target(false),
            )
            .try_init()
            .ok();
    }
}

fn load_config(common: &CommonOpts) -> Result<GateConfig> {
    let file = common
        .config
        .as_deref()
        .map(|path| -> Result<PathBuf> {
            let text = path.to_str().context("config path is not valid UTF-8")?;
            let expanded = shellexpand::full(text).context("expanding config path")?;
            Ok(PathBuf::from(expanded.to_string()))
        })
        .transpose()?;

    let vars: HashMap<String, String> = env::vars().collect();
    GateConfig::load(file.as_deref(), &vars).context("loading gate configuration")
}

async fn handle_run(common: &CommonOpts) -> Result<i32> {
    let config = load_config(common)?;
    config.validate().context("invalid gate configuration")?;

    let coordinator = ApprovalCoordinator::from_config(&config)?;
    let session = DeploymentSession::new(&config.deployment_request());
    let deploy_id = session.deploy_id.clone();
    info!(
        %deploy_id,
        service = %config.service,
        environment = %config.environment,
        "opening deployment gate"
    );

    let report = tokio::select! {
        report = coordinator.run_session(session) => report,
        signal = shutdown_signal() => {
            // Dropping the gate future closes the subscription.
            warn!(%deploy_id, signal, "gate cancelled");
            workflow_error(&format!("Deployment gate {deploy_id} was cancelled ({signal})."));
            return Ok(1);
        }
    };

    match &report.outcome {
        GateOutcome::Approved => {
            println!("Deployment {} approved.", report.deploy_id);
        }
        GateOutcome::Rejected => {
            workflow_error(&format!("Deployment {} was rejected.", report.deploy_id));
        }
        GateOutcome::Failed(err) => {
            workflow_error(&format!(
                "Deployment gate {} failed: {}",
                report.deploy_id, err
            ));
        }
    }

    Ok(report.outcome.exit_code())
}

async fn handle_status(common: &CommonOpts, deploy_id: &str) -> Result<i32> {
    let config = load_config(common)?;
    let store = DynamoSessionStore::from_config(&config);

    let Some(session) = store
        .get_session(deploy_id)
        .await
        .with_context(|| format!("reading session {deploy_id} from {}", store.table()))?
    else {
        warn!(deploy_id, "no such deployment session");
        return Ok(1);
    };

    if common.json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        print!("{}", toml::to_string_pretty(&session)?);
    }
    Ok(0)
}

fn handle_config(common: &CommonOpts, command: ConfigCommand) -> Result<i32> {
    match command {
        ConfigCommand::Show => {
            let config = load_config(common)?.redacted();
            if common.json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }
    Ok(0)
}

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
}

/// Resolve on SIGINT or SIGTERM with the signal's name.
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// Surface a failure as a workflow annotation when running in GitHub Actions.
fn workflow_error(message: &str) {
    if env::var("GITHUB_ACTIONS").is_ok_and(|value| value == "true") {
        println!("::error::{message}");
    }
}
