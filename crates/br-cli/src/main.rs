//! CLI entry point for bg-recompiler.
//!
//! This binary watches a directory for relevant file changes and runs a
//! refresh command once per burst of changes, never while the previous run
//! is still in flight.
//!
//! # Usage
//!
//! ```bash
//! bg-recompile [OPTIONS] <COMMAND>
//!
//! # Rebuild whenever a Rust source changes
//! bg-recompile watch --path ./src --ext "*.rs" -- cargo build
//!
//! # Hold off while a lock file exists
//! bg-recompile watch --lock-file .build.lock -- make
//!
//! # Inspect and edit persisted settings
//! bg-recompile settings show
//! bg-recompile settings set debug_mode true
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod action;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use br_core::{Config, JsonFileStore, Settings};
use br_trigger::{IntervalTicker, Recompiler};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::action::CommandAction;

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Background recompiler: runs a command whenever watched files change.
#[derive(Parser)]
#[command(name = "bg-recompile", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Settings file holding the persisted switches.
    #[arg(
        long,
        global = true,
        env = "BG_RECOMPILE_SETTINGS",
        default_value = "bg-recompile.json"
    )]
    settings: Utf8PathBuf,

    /// JSON configuration file; command-line flags override its values.
    #[arg(long, global = true, env = "BG_RECOMPILE_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Watch a directory and run a command after each burst of changes.
    Watch(WatchArgs),

    /// Inspect or edit the persisted settings.
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
}

#[derive(Args)]
struct WatchArgs {
    /// Directory to watch (defaults to the current directory).
    #[arg(short, long)]
    path: Option<Utf8PathBuf>,

    /// File pattern for relevant changes, e.g. "*.rs" or "*.rs,*.toml".
    #[arg(short, long)]
    ext: Option<String>,

    /// Watch only the top-level directory.
    #[arg(long)]
    non_recursive: bool,

    /// Debounce window in milliseconds.
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Interval between trigger checks in milliseconds.
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Skip triggers while this file exists.
    #[arg(long)]
    lock_file: Option<Utf8PathBuf>,

    /// Do not log each trigger.
    #[arg(short, long)]
    quiet: bool,

    /// Command to run on each trigger.
    #[arg(last = true, required = true, num_args = 1..)]
    command: Vec<String>,
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print every setting.
    Show,

    /// Change one setting.
    Set {
        /// Setting name (enabled, debug_mode, log_on_trigger).
        key: String,

        /// New value (true/false, on/off, yes/no).
        #[arg(action = ArgAction::Set, value_parser = clap::builder::BoolishValueParser::new())]
        value: bool,
    },
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `debug` is set, or `info` level by default. `notify`
/// is filtered to `warn` level.
fn init_tracing(debug: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if debug { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn,mio=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Builds a [`Config`] from the optional config file and the watch flags.
///
/// # Errors
///
/// Returns an error if the config file cannot be loaded, the watch root is
/// not a directory, or the tick interval is zero.
fn build_config(
    config_file: Option<&Utf8Path>,
    args: &WatchArgs,
    settings: &Settings,
) -> color_eyre::Result<Config> {
    let mut config = match config_file {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };

    if let Some(path) = &args.path {
        config.watch.root_path.clone_from(path);
    }
    if config.watch.root_path.as_str().is_empty() {
        config.watch.root_path = Utf8PathBuf::from(".");
    }
    if let Some(ext) = &args.ext {
        config.watch.extension_filter.clone_from(ext);
    }
    if args.non_recursive {
        config.watch.recursive = false;
    }
    if let Some(debounce_ms) = args.debounce_ms {
        config.watch.debounce_ms = debounce_ms;
    }
    if let Some(tick_ms) = args.tick_ms {
        config.tick.tick_ms = tick_ms;
    }

    // The only lock this binary knows about is the lock file.
    config.trigger.lock_check = args.lock_file.is_some();
    config.trigger.log_on_trigger =
        config.trigger.log_on_trigger && settings.log_on_trigger && !args.quiet;

    let root = &config.watch.root_path;
    if !root.exists() {
        return Err(color_eyre::eyre::eyre!("Path does not exist: {}", root));
    }
    if !root.is_dir() {
        return Err(color_eyre::eyre::eyre!("Path is not a directory: {}", root));
    }
    if config.tick.tick_ms == 0 {
        return Err(color_eyre::eyre::eyre!("Tick interval must be at least 1 ms"));
    }

    Ok(config)
}

/// Creates the command action for `watch`.
fn build_action(config: &Config, args: &WatchArgs) -> color_eyre::Result<CommandAction> {
    let Some((program, rest)) = args.command.split_first() else {
        return Err(color_eyre::eyre::eyre!("No command given after '--'"));
    };

    Ok(CommandAction::new(
        program.clone(),
        rest.to_vec(),
        config.watch.root_path.clone(),
    )
    .with_lock_file(args.lock_file.clone()))
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Watches until Ctrl-C or SIGTERM, then switches the recompiler off.
///
/// # Errors
///
/// Returns an error if the listener cannot be started.
async fn run_watch(config: Config, action: CommandAction) -> color_eyre::Result<()> {
    let command_line = action.command_line();
    let ticker = Arc::new(IntervalTicker::start(Duration::from_millis(
        config.tick.tick_ms,
    )));

    let mut recompiler = Recompiler::new(
        config.watch,
        config.trigger,
        action,
        Arc::clone(&ticker),
    );

    recompiler
        .set_active(true)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Failed to start recompiler: {}", e))?;

    info!(
        path = %recompiler.watch_config().root_path,
        command = %command_line,
        tick_ms = config.tick.tick_ms,
        "Watching for changes"
    );

    wait_for_shutdown().await?;

    recompiler.shutdown();
    ticker.stop().await;
    recompiler.trigger().action().wait_until_idle().await;

    let stats = recompiler.trigger().stats();
    info!(
        triggered = stats.triggered,
        deferred = stats.deferred,
        dropped = stats.dropped,
        failed = stats.failed,
        "Recompiler stopped"
    );

    Ok(())
}

/// Waits for Ctrl-C, or SIGTERM on Unix.
async fn wait_for_shutdown() -> color_eyre::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received Ctrl-C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl-C, shutting down");
    }

    Ok(())
}

/// Prints every setting with its current value.
fn run_settings_show(store: &JsonFileStore, settings: &Settings) -> color_eyre::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    writeln!(handle, "Settings ({})", store.path())?;
    for (key, value) in settings.entries() {
        writeln!(handle, "  {key:<16} {value}")?;
    }
    Ok(())
}

/// Changes one setting and writes the store back.
fn run_settings_set(
    store: &mut JsonFileStore,
    mut settings: Settings,
    key: &str,
    value: bool,
) -> color_eyre::Result<()> {
    settings.set(key, value)?;
    settings.save(store)?;
    info!(key, value, path = %store.path(), "Setting saved");

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{key} = {value}")?;
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Load persisted settings (debug_mode affects the log level)
    let mut store = JsonFileStore::open(cli.settings.clone())?;
    let settings = Settings::load(&store);

    // 4. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose || settings.debug_mode, cli.no_color);

    // 5. Route to appropriate command
    match &cli.command {
        Commands::Watch(args) => {
            if !settings.enabled {
                info!(path = %store.path(), "Recompiler is disabled in settings, not watching");
                return Ok(());
            }
            let config = build_config(cli.config.as_deref(), args, &settings)?;
            let action = build_action(&config, args)?;
            run_watch(config, action).await
        }
        Commands::Settings { action } => match action {
            SettingsCommand::Show => run_settings_show(&store, &settings),
            SettingsCommand::Set { key, value } => {
                run_settings_set(&mut store, settings, key, *value)
            }
        },
    }
}
