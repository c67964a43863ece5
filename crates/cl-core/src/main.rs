//! cpulimitd - per-process CPU usage limiter daemon.
//!
//! Observes processes via procfs, estimates their CPU utilization with an
//! exponentially-smoothed estimator, and enforces user-chosen limits by
//! periodically sending SIGSTOP/SIGCONT to processes that exceed them.

use clap::Parser;
use cl_core::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use cl_core::Handle;
use cl_common::{OutputFormat, UsageScale};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Per-process CPU usage limiter.
#[derive(Parser)]
#[command(name = "cpulimitd", about = "Per-process CPU usage limiter", version)]
struct Args {
    /// Path to the settings file. Falls back to CPULIMIT_CONFIG, the XDG
    /// config dir, /etc/cpulimit, then built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the procfs mount. Overrides the config file's `proc_root`;
    /// override only for testing.
    #[arg(long)]
    proc_root: Option<PathBuf>,

    /// Apply a limit at startup: PID:FRACTION, e.g. "1234:0.25". May be
    /// repeated.
    #[arg(long = "limit", value_parser = parse_limit_arg)]
    limits: Vec<(u32, f64)>,

    /// Snapshot print format.
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// How to scale reported CPU usage: per-core percentage or
    /// percentage of total system capacity.
    #[arg(long, value_enum, default_value = "per-core")]
    scale: UsageScale,

    /// Log level.
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Log output format.
    #[arg(long)]
    log_format: Option<LogFormat>,
}

fn parse_limit_arg(s: &str) -> Result<(u32, f64), String> {
    let (pid_str, limit_str) = s
        .split_once(':')
        .ok_or_else(|| format!("expected PID:FRACTION, got '{s}'"))?;
    let pid: u32 = pid_str.parse().map_err(|e| format!("invalid pid '{pid_str}': {e}"))?;
    let limit: f64 = limit_str.parse().map_err(|e| format!("invalid limit '{limit_str}': {e}"))?;
    Ok((pid, limit))
}

fn main() {
    let args = Args::parse();

    let log_config = LogConfig::from_env(args.log_level, args.log_format);
    init_logging(&log_config);

    let (settings, source) = match cl_config::load_settings(args.config.as_deref()) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{}", cl_common::format_error_human(&e, true));
            std::process::exit(1);
        }
    };
    info!(source = %source, "loaded settings");

    let online_cpus = cl_core::collect::online_cpu_count();
    info!(online_cpus, "detected online CPUs");

    let proc_root = args
        .proc_root
        .unwrap_or_else(|| PathBuf::from(&settings.proc_root));
    let handle = Handle::spawn(settings, proc_root);

    if !args.limits.is_empty() {
        // The first snapshot only arrives once the worker's initial
        // discovery pass has populated the registry; block for it so a
        // startup --limit doesn't race discovery and get silently dropped.
        handle.recv_snapshot();
        for (pid, limit) in &args.limits {
            handle.set_limit(*pid, *limit);
        }
    }

    let scale = args.scale;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("failed to install ctrl-c handler: {e}");
    }

    info!("cpulimitd running; press Ctrl-C to stop");

    while running.load(Ordering::SeqCst) {
        if let Some(snapshot) = handle.try_recv_latest_snapshot() {
            print_snapshot(&snapshot, args.format, scale, online_cpus);
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    info!("shutting down");
    drop(handle);
}

fn print_snapshot(snapshot: &cl_core::Snapshot, format: OutputFormat, scale: UsageScale, online_cpus: u32) {
    match format {
        OutputFormat::Table => {
            for record in &snapshot.process_list {
                let pct = scale.scale(record.cpu_usage, online_cpus);
                let min_pct = scale.scale(record.min_cpu_usage, online_cpus);
                let max_pct = scale.scale(record.max_cpu_usage, online_cpus);
                println!(
                    "{:>7} {:<20} {:<10} {:>6.1}% (min {:>5.1}%, max {:>5.1}%)  limit={}",
                    record.pid,
                    record.command,
                    record.user.as_deref().unwrap_or("-"),
                    pct,
                    min_pct,
                    max_pct,
                    record
                        .limit
                        .map(|l| format!("{:.2}", l))
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "added_pids": snapshot.added_pids,
                "removed_pids": snapshot.removed_pids,
                "processes": snapshot.process_list.iter().map(|r| serde_json::json!({
                    "pid": r.pid,
                    "command": r.command,
                    "user": r.user,
                    "cpu_usage_cores": r.cpu_usage,
                    "cpu_usage_percent": scale.scale(r.cpu_usage, online_cpus),
                    "min_cpu_usage_percent": scale.scale(r.min_cpu_usage, online_cpus),
                    "max_cpu_usage_percent": scale.scale(r.max_cpu_usage, online_cpus),
                    "limit": r.limit,
                    "sleep_ticks": r.sleep_ticks,
                })).collect::<Vec<_>>(),
            });
            println!("{json}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_limit_arg_accepts_well_formed() {
        assert_eq!(parse_limit_arg("1234:0.25").unwrap(), (1234, 0.25));
    }

    #[test]
    fn parse_limit_arg_rejects_missing_colon() {
        assert!(parse_limit_arg("1234").is_err());
    }

    #[test]
    fn parse_limit_arg_rejects_non_numeric_pid() {
        assert!(parse_limit_arg("abc:0.25").is_err());
    }
}
