// # dufwd - ufw/DDNS sync daemon
//
// Thin integration layer around dufw-core. All reconciliation logic lives in
// the core crate; this binary only:
// 1. Reads configuration from environment variables
// 2. Initializes logging
// 3. Verifies ufw is runnable (the only fatal runtime check)
// 4. Runs the reconciler until SIGTERM/SIGINT
//
// ## Configuration
//
// - `DUFW_DOMAIN`: DDNS hostname to track (required)
// - `DUFW_INTERVAL_SECS`: Seconds between checks (default 300)
// - `DUFW_UFW_COMMAND`: Command used to run ufw (default `ufw`, e.g. `sudo ufw`)
// - `DUFW_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export DUFW_DOMAIN=home.example.com
// export DUFW_INTERVAL_SECS=300
//
// dufwd
// ```
//
// Service registration is left to the host's service manager; see
// `dist/dufw.service` for a systemd unit.

use anyhow::Result;
use dufw_core::{DufwConfig, ReconcileEvent, Reconciler, SystemResolver, UfwRuleSet};
use std::env;
use std::process::ExitCode;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DufwExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DufwExitCode> for ExitCode {
    fn from(code: DufwExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    domain: String,
    interval_secs: u64,
    ufw_command: Vec<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, one variable at a time
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let domain = lookup("DUFW_DOMAIN").ok_or_else(|| {
            anyhow::anyhow!(
                "DUFW_DOMAIN is required. \
                Set it via: export DUFW_DOMAIN=home.example.com"
            )
        })?;

        let interval_secs = match lookup("DUFW_INTERVAL_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                anyhow::anyhow!("DUFW_INTERVAL_SECS must be a whole number of seconds. Got: {}", raw)
            })?,
            None => 300,
        };

        let ufw_command = lookup("DUFW_UFW_COMMAND")
            .unwrap_or_else(|| "ufw".to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Ok(Self {
            domain: domain.trim().to_string(),
            interval_secs,
            ufw_command,
            log_level: lookup("DUFW_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        validate_domain_name(&self.domain)?;

        if !(1..=86_400).contains(&self.interval_secs) {
            anyhow::bail!(
                "DUFW_INTERVAL_SECS must be between 1 and 86400 seconds. Got: {}",
                self.interval_secs
            );
        }

        if self.ufw_command.is_empty() {
            anyhow::bail!("DUFW_UFW_COMMAND cannot be empty");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DUFW_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn core_config(&self) -> DufwConfig {
        DufwConfig::new(self.domain.clone())
            .with_interval_secs(self.interval_secs)
            .with_ufw_command(self.ufw_command.clone())
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks; catches typos, not every invalid name.
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        anyhow::bail!("Domain name cannot be empty");
    }

    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DufwExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DufwExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DufwExitCode::ConfigError.into();
    }

    info!("Starting dufwd daemon");

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DufwExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(config)).into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> DufwExitCode {
    let rule_set = match UfwRuleSet::from_command(&config.ufw_command) {
        Ok(rule_set) => rule_set,
        Err(e) => {
            error!("{}", e);
            return DufwExitCode::ConfigError;
        }
    };

    match rule_set.check_available().await {
        Ok(version) => info!("Using {}", version),
        Err(e) => {
            error!("{}. Install ufw first.", e);
            return DufwExitCode::ConfigError;
        }
    }

    let (mut reconciler, events) = match Reconciler::new(
        Box::new(SystemResolver::new()),
        Box::new(rule_set),
        config.core_config(),
    ) {
        Ok(pair) => pair,
        Err(e) => {
            error!("{}", e);
            return DufwExitCode::ConfigError;
        }
    };

    let signals = match ShutdownSignals::install() {
        Ok(signals) => signals,
        Err(e) => {
            error!("{}", e);
            return DufwExitCode::RuntimeError;
        }
    };

    tokio::spawn(log_events(events));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        let name = signals.recv().await;
        info!("Received shutdown signal: {}", name);
        let _ = shutdown_tx.send(());
    });

    match reconciler.run_until(shutdown_rx).await {
        Ok(()) => {
            info!("Shutting down daemon");
            DufwExitCode::CleanShutdown
        }
        Err(e) => {
            error!("Daemon error: {}", e);
            DufwExitCode::RuntimeError
        }
    }
}

/// Drain reconciler events into the debug log
async fn log_events(mut events: mpsc::Receiver<ReconcileEvent>) {
    while let Some(event) = events.recv().await {
        debug!("Reconciler event: {:?}", event);
    }
}

/// Shutdown signal handlers (SIGTERM, SIGINT)
///
/// Installed before the loop starts so a failure surfaces as a startup
/// error rather than as an immediate shutdown.
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        let sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
        let sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;
        Ok(Self { sigterm, sigint })
    }

    /// Wait for either signal, returning its name
    async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Shutdown signal handler (Ctrl-C only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self)
    }

    /// Wait for Ctrl-C; keeps running if it cannot be listened for
    async fn recv(self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    }
}
