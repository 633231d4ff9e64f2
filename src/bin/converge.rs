use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use converge::client::{InMemoryClient, RestClient};
use converge::config::Config;
use converge::modules::{ExecutionContext, ModuleRegistry, ModuleResult};
use converge::task::parse_tasks;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "converge")]
#[command(about = "Desired-state reconciliation for storage and firewall management APIs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct ConvergeCli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<tracing::Level>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a task file (or stdin if -)
    Apply {
        task: PathBuf,

        /// Report what would change without changing anything
        #[arg(long)]
        check: bool,

        /// Include before/after field values in the result
        #[arg(long)]
        diff: bool,

        /// Run against an empty in-memory endpoint instead of the API
        #[arg(long)]
        offline: bool,
    },
    /// List available modules
    ListModules,
    /// Print the argument documentation of a module
    ShowSchema { module: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ConvergeCli::parse();

    let level = cli.log_level.unwrap_or(if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    });

    // stdout carries the JSON result
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting converge v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Apply {
            ref task,
            check,
            diff,
            offline,
        } => {
            let failed = apply(task, cli.config.as_deref(), check, diff, offline).await?;
            if failed {
                std::process::exit(2);
            }
        }
        Command::ListModules => list_modules(),
        Command::ShowSchema { ref module } => show_schema(module)?,
    }

    Ok(())
}

async fn apply(
    task: &Path,
    config_path: Option<&Path>,
    check: bool,
    diff: bool,
    offline: bool,
) -> Result<bool> {
    let content = if task == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("Failed to read tasks from stdin")?
    } else {
        std::fs::read_to_string(task)
            .with_context(|| format!("Failed to read task file {}", task.display()))?
    };
    let tasks = parse_tasks(&content).context("Invalid task file")?;

    let mut config = Config::discover(config_path)?;
    config.apply_env();

    let context = ExecutionContext {
        defaults: config.options.clone(),
        check_mode: check || config.options.check_mode,
        diff_mode: diff || config.options.diff_mode,
    };

    let registry = if offline {
        ModuleRegistry::for_client(InMemoryClient::new())
    } else {
        config.validate()?;
        ModuleRegistry::for_client(RestClient::new(&config.connection)?)
    };

    let mut results = Vec::new();
    let mut failed = false;
    for task in &tasks {
        info!(task = task.label(), module = %task.module, "running task");
        let result = match registry
            .execute_module(&task.module, &task.module_args(), &context)
            .await
        {
            Ok(result) => result,
            Err(e) => ModuleResult::failed(e.to_string()),
        };

        if result.failed {
            error!(
                task = task.label(),
                "{}",
                result.msg.as_deref().unwrap_or("task failed")
            );
            failed = true;
        }
        results.push(result);
        if failed {
            break;
        }
    }

    let output = match results.as_slice() {
        [single] => serde_json::to_string_pretty(single)?,
        many => serde_json::to_string_pretty(many)?,
    };
    println!("{output}");

    Ok(failed)
}

fn list_modules() {
    let registry = ModuleRegistry::for_client(InMemoryClient::new());
    for name in registry.list_modules() {
        let description = registry
            .get_module(name)
            .map(|m| m.documentation().description)
            .unwrap_or_default();
        println!("{name:<28} {description}");
    }
}

fn show_schema(module: &str) -> Result<()> {
    let registry = ModuleRegistry::for_client(InMemoryClient::new());
    let Some(module) = registry.get_module(module) else {
        bail!("Module not found: {module}");
    };
    println!("{}", serde_json::to_string_pretty(&module.documentation())?);
    Ok(())
}
