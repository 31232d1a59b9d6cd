//! applock CLI
//!
//! Usage:
//!   applock --serve --events usage.jsonl        # HTTP API + monitor
//!   applock --replay usage.jsonl --lock com.a   # Re-run a recorded usage log
//!   applock --interactive --lock com.a          # Type events, one tick per line
//!   applock ... --json                          # JSON output

use clap::Parser;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use applock::config::{LockSetRefresh, MonitorConfig};
use applock::core::{
    run_server, AppLocker, ForegroundReconciler, JsonFileStore, JsonlUsageLog, MemoryUsageLog,
    SimulatedPlatform, UsageEventSource, UsagePoller,
};
use applock::types::{EventKind, LockSet, MonitorError, Signal, TickOutput, UsageEvent};
use applock::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "applock",
    version = VERSION,
    about = "applock - Block locked apps while they are in the foreground",
    long_about = "applock polls a usage-event log, tracks which app is in the\n\
                  foreground and tells the overlay UI to show while a locked app\n\
                  is in front and to hide once it leaves.\n\n\
                  Modes:\n  \
                  --serve        HTTP API + monitor (event plane on /ws)\n  \
                  --replay FILE  Re-run a recorded JSON-lines usage log\n  \
                  --interactive  Type events, one tick per line\n\n\
                  Overlay states:\n  \
                  HIDDEN - nothing locked in the foreground\n  \
                  SHOWN  - a locked app is blocked"
)]
struct Args {
    /// Run as HTTP API server with a live monitor
    #[arg(short, long)]
    serve: bool,

    /// Replay a JSON-lines usage log
    #[arg(short, long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Interactive mode - read events from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Server address (default: 127.0.0.1:3000)
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Key-value store file holding app_data / is_stopped
    #[arg(long, default_value = "./applock_store.json")]
    store: PathBuf,

    /// JSON-lines usage log polled by the live monitor
    #[arg(long, value_name = "FILE")]
    events: Option<PathBuf>,

    /// Locked apps, comma separated
    #[arg(long, value_delimiter = ',')]
    lock: Vec<String>,

    /// Monitor config file (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the tick period (milliseconds)
    #[arg(long)]
    period_ms: Option<u64>,

    /// Re-read the lock set from the store every tick
    #[arg(long)]
    refresh_every_tick: bool,

    /// Do not send the user home when a locked app is detected
    #[arg(long)]
    no_force_home: bool,

    /// Simulate a device without overlay permission
    #[arg(long)]
    deny_overlay: bool,

    /// Print every tick, not only transitions (replay mode)
    #[arg(long)]
    all_ticks: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(args.verbose);
    if args.no_color {
        colored::control::set_override(false);
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "could not load config");
            return ExitCode::FAILURE;
        }
    };

    let result = if args.serve {
        run_serve(&args, config).await
    } else if let Some(ref path) = args.replay {
        run_replay(path, &args, &config)
    } else {
        if !args.interactive {
            info!("no mode given, defaulting to interactive");
        }
        run_interactive(&args, &config);
        Ok(())
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "applock failed");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(verbose > 1)
        .with_writer(io::stderr)
        .init();
}

/// Config file (if any) with CLI overrides applied
fn load_config(args: &Args) -> Result<MonitorConfig, applock::config::ConfigError> {
    let mut config = match &args.config {
        Some(path) => MonitorConfig::from_file(path)?,
        None => MonitorConfig::default(),
    };
    if let Some(period_ms) = args.period_ms {
        config.poll_period_ms = period_ms;
    }
    if args.refresh_every_tick {
        config.lock_set_refresh = LockSetRefresh::EveryTick;
    }
    if args.no_force_home {
        config.force_home = false;
    }
    Ok(config)
}

/// Run the API server with a live monitor
async fn run_serve(args: &Args, config: MonitorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(JsonFileStore::open(&args.store)?);
    let platform = Arc::new(SimulatedPlatform::new(!args.deny_overlay, true));
    let source: Arc<dyn UsageEventSource> = match &args.events {
        Some(path) => Arc::new(JsonlUsageLog::new(path)),
        None => {
            warn!("no --events log given, the monitor will never see a foreground app");
            Arc::new(MemoryUsageLog::new())
        }
    };

    let locker = Arc::new(AppLocker::new(config, store, platform, source));

    if !args.lock.is_empty() {
        match locker.start_monitoring(args.lock.clone()).await {
            Ok(ack) => info!("{}", ack),
            Err(MonitorError::PermissionDenied) => {
                warn!("overlay permission is not granted, monitor not started")
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        match locker.boot_recover().await {
            Ok(true) => info!("resumed monitoring from persisted state"),
            Ok(false) => info!("monitoring is stopped, waiting for /monitor/start"),
            Err(e) => warn!(error = %e, "could not resume monitoring"),
        }
    }

    run_server(&args.addr, locker).await
}

/// Re-run a recorded usage log through the poller and reconciler
fn run_replay(
    path: &Path,
    args: &Args,
    config: &MonitorConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let recorded = JsonlUsageLog::new(path).read_all()?;
    let log = Arc::new(MemoryUsageLog::with_events(recorded));
    let lock_set: LockSet = args.lock.iter().cloned().collect();

    let Some((first, last)) = log.span() else {
        println!("Usage log is empty.");
        return Ok(());
    };

    let mut poller = UsagePoller::new(log.clone(), config.period(), config.window_periods);
    let mut reconciler = ForegroundReconciler::new();
    let period_ms = config.period().as_millis() as i64;
    let (window_start, window_end) = poller.window(0);
    let window_ms = window_end - window_start;

    if !args.json {
        print_header("Replay", args.no_color);
        println!("{} events, {} locked apps, period {}ms", log.len(), lock_set.len(), period_ms);
        println!();
    }

    let mut now = first + period_ms;
    let mut transitions = 0u64;
    while now <= last + window_ms {
        let events = poller.poll(now)?;
        let output = reconciler.process(&events, &lock_set, true);
        if !output.signal.is_none() {
            transitions += 1;
        }
        if args.all_ticks || !output.signal.is_none() {
            print_output(&output, args);
        }
        now += period_ms;
    }

    if !args.json {
        println!();
        println!("Replay ended. Ticks: {} | Transitions: {}", reconciler.tick_count(), transitions);
    }
    Ok(())
}

/// Interactive mode: each line is one tick
fn run_interactive(args: &Args, config: &MonitorConfig) {
    let lock_set: LockSet = args.lock.iter().cloned().collect();
    let mut reconciler = ForegroundReconciler::new();
    let period_ms = config.period().as_millis() as i64;
    let mut now = chrono::Utc::now().timestamp_millis();

    print_header("Interactive", args.no_color);
    println!("Locked apps: {}", lock_set.to_persisted());
    println!("Enter one event per line: <resumed|stopped|KIND> <package> [activity]");
    println!("An empty line is a tick with no events. Type 'quit' to exit.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{}", format_prompt(&reconciler, args.no_color));
        if stdout.flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => break,
        }

        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            println!("\nSession ended. Ticks: {}", reconciler.tick_count());
            break;
        }

        now += period_ms;
        let events: Vec<UsageEvent> = parse_event_line(line, now).into_iter().collect();
        let output = reconciler.process(&events, &lock_set, true);
        print_output(&output, args);
    }
}

/// `<kind> <package> [activity]`; blank → no event
fn parse_event_line(line: &str, timestamp_ms: i64) -> Option<UsageEvent> {
    let mut parts = line.split_whitespace();
    let kind = parts.next()?;
    let kind = match kind.parse::<i64>() {
        Ok(code) => EventKind::from_code(code),
        Err(_) => EventKind::from_name(kind),
    };
    let package = parts.next()?;
    let event = UsageEvent::new(timestamp_ms, package, kind);
    Some(match parts.next() {
        Some(activity) => event.with_activity(activity),
        None => event,
    })
}

fn print_output(output: &TickOutput, args: &Args) {
    if args.json {
        match serde_json::to_string(output) {
            Ok(json) => println!("{}", json),
            Err(e) => error!(error = %e, "could not encode tick output"),
        }
    } else if args.no_color {
        println!("{}", output.to_parseable_string());
    } else {
        println!("{}", output.to_terminal_string());
        print_transition_message(output);
    }
}

fn print_transition_message(output: &TickOutput) {
    match &output.signal {
        Signal::Show(package) => {
            println!("{}", format!("  ✋ {} is locked - overlay shown", package).red());
        }
        Signal::Hide => println!("{}", "  ✓ left locked app - overlay hidden".green()),
        Signal::None => {}
    }
}

fn print_header(mode: &str, no_color: bool) {
    let title = format!("  applock v{} - {}", VERSION, mode);
    if no_color {
        println!("========================================");
        println!("{}", title);
        println!("========================================");
    } else {
        println!("{}", "════════════════════════════════════════".bold());
        println!("{}", title.bold());
        println!("{}", "════════════════════════════════════════".bold());
    }
    println!();
}

fn format_prompt(reconciler: &ForegroundReconciler, no_color: bool) -> String {
    let state = reconciler.state();
    let fg = state.current_foreground_app.as_deref().unwrap_or("-");
    if no_color {
        format!("[{} | {}] > ", state.overlay, fg)
    } else {
        format!(
            "{} [{} | {}] > ",
            state.overlay.emoji(),
            state.overlay.paint(&state.overlay.to_string()),
            fg
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config_file(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("applock.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_config_file_sets_tick_period() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file(&dir, r#"{"poll_period_ms": 250}"#);
        let args = Args::try_parse_from(["applock", "--interactive", "--config", path.to_str().unwrap()])
            .unwrap();

        let config = load_config(&args).unwrap();
        assert_eq!(config.period(), Duration::from_millis(250));
        assert!(config.force_home);
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file(&dir, r#"{"poll_period_ms": 250, "force_home": true}"#);
        let args = Args::try_parse_from([
            "applock",
            "--config",
            path.to_str().unwrap(),
            "--period-ms",
            "100",
            "--no-force-home",
            "--refresh-every-tick",
        ])
        .unwrap();

        let config = load_config(&args).unwrap();
        assert_eq!(config.period(), Duration::from_millis(100));
        assert!(!config.force_home);
        assert_eq!(config.lock_set_refresh, LockSetRefresh::EveryTick);
    }

    #[test]
    fn test_parse_event_line() {
        let event = parse_event_line("resumed com.game.app .MainActivity", 42).unwrap();
        assert!(event.is_resumed());
        assert_eq!(event.package, "com.game.app");
        assert_eq!(event.timestamp_ms, 42);

        assert_eq!(parse_event_line("23 com.game.app", 1).unwrap().kind, EventKind::Stopped);
        assert!(parse_event_line("", 1).is_none());
        assert!(parse_event_line("resumed", 1).is_none());
    }
}
