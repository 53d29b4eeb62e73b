// The entry point wires the request-processing core's pieces together
// for a single process: read config, install logging, open the
// database, and bring up one scheduler plus (if configured as a
// replica) a write-through reconnect tracker. Driving these off real
// sockets is the low-level event loop's job, which this workspace does
// not implement (spec.md §1 Non-goals) — this binary reaches the
// `Run` state and stops there, the way the teacher's own `submerge`
// binary is a thin shell around its `-ui` crate.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use graphd_islink::IslinkEngine;
use graphd_replication::ReconnectBackoff;
use graphd_session::{Scheduler, Session, SessionType};
use graphd_startup::{Cli, Config, Opener, EX_GRAPHD_DATABASE, EX_OSERR, EX_USAGE};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let text = match std::fs::read_to_string(&cli.config) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("graphd: cannot read config {}: {e}", cli.config.display());
            return ExitCode::from(EX_OSERR as u8);
        }
    };

    let config = match Config::from_text(&text) {
        Ok(config) => cli.apply_overrides(config),
        Err(e) => {
            eprintln!("graphd: {}: {e}", cli.config.display());
            return ExitCode::from(EX_USAGE as u8);
        }
    };

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(port = config.port, database = %config.database_path.display(), "graphd starting");

    match bring_up(&config) {
        Ok(()) => {
            info!("graphd reached running state; request loop not wired into this build");
            ExitCode::SUCCESS
        }
        Err(code) => {
            error!(exit_code = code, "graphd failed to reach a running state");
            ExitCode::from(code as u8)
        }
    }
}

/// Drive the opener to `Run`, then stand up the in-process pieces that
/// would serve requests once real sockets are attached: a scheduler
/// with a bootstrap session, the islink acceleration index, and (if
/// configured as a write-through replica) a reconnect tracker.
fn bring_up(config: &Config) -> Result<(), i32> {
    let mut opener = Opener::new();
    opener.configure_done().map_err(|_| EX_GRAPHD_DATABASE)?;
    opener.open_succeeded().map_err(|_| EX_GRAPHD_DATABASE)?;
    opener.verify_passed().map_err(|_| EX_GRAPHD_DATABASE)?;
    debug_assert!(opener.is_running());

    let mut scheduler = Scheduler::new();
    scheduler.add_session(Session::new(0, SessionType::Client));
    let _islink = IslinkEngine::new();

    if let Some(replica) = &config.replica {
        let backoff = ReconnectBackoff::new();
        info!(of = %replica.of, write_through = replica.write_through, "configured as replica");
        let _ = backoff;
    }

    info!(sessions = scheduler.session_count(), "scheduler ready");
    Ok(())
}
