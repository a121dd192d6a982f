//! `headsync` – simulated head-tracking session.
//!
//! 1. Loads `~/.headsync/config.toml`, writing the defaults on first run.
//! 2. Builds a simulated viewer, character rig and barrel range.
//! 3. Runs the configured number of frames, printing rig alerts and prop
//!    events as they happen and a status line once a second.
//! 4. Intercepts **Ctrl-C** to stop between frames and print the report.

mod config;
mod session;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{info, warn};

use headsync_types::{BarrelEvent, Event, EventPayload};

use crate::session::{FrameSummary, Session, SessionReport};

fn main() {
    // Set HEADSYNC_LOG_FORMAT=json for newline-delimited JSON logs.  The
    // session's user-facing output still uses println!.
    let _telemetry = headsync_runtime::init_tracing("headsync");

    print_banner();

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping after this frame …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the session can only run to completion");
    }

    let cfg = load_config();

    let mut session = match Session::new(&cfg) {
        Ok(s) => s,
        Err(e) => {
            println!("{}: {}", "Invalid configuration".red().bold(), e);
            std::process::exit(1);
        }
    };

    println!(
        "  Running {} frame(s) at {} Hz{}\n",
        cfg.frames.to_string().bold(),
        cfg.frame_rate_hz,
        if cfg.realtime { "" } else { " (as fast as possible)" }
    );

    let frame_time = session.frame_time();
    let status_every = cfg.frame_rate_hz.round().max(1.0) as u64;
    let started = Instant::now();

    for _ in 0..cfg.frames {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        let tick = Instant::now();
        let summary = session.step();

        for event in &summary.events {
            print_event(summary.frame, event);
        }
        if summary.frame % status_every == 0 {
            print_status(&summary);
        }

        if cfg.realtime
            && let Some(rest) = frame_time.checked_sub(tick.elapsed())
        {
            std::thread::sleep(rest);
        }
    }

    let report = session.report();
    info!(
        frames = report.frames,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "session finished"
    );
    print_report(&report);
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

fn load_config() -> config::Config {
    match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let mut cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("  {} {}",
        "HeadSync".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Head pose reconciler – simulated session");
    println!();
}

fn print_event(frame: u64, event: &Event) {
    let prefix = format!("  [{:>5}]", frame).dimmed();
    match &event.payload {
        EventPayload::RigSyncLost { reason } => {
            println!("{} {} {}", prefix, "rig sync lost:".red().bold(), reason);
        }
        EventPayload::RigSyncRestored => {
            println!("{} {}", prefix, "rig sync restored".green());
        }
        EventPayload::Barrel { barrel_id, event } => {
            let text = match event {
                BarrelEvent::SwapMesh(i) => format!("dented (mesh {})", i).yellow(),
                BarrelEvent::Tilt => "tilts".normal(),
                BarrelEvent::TiltAndLeak => "tilts and starts leaking".yellow(),
                BarrelEvent::Detonate => "DETONATES".red().bold(),
                BarrelEvent::ApplyBlast => "blast wave".red(),
                BarrelEvent::EffectExpired => "smoke clears".dimmed(),
            };
            println!("{} {} {}", prefix, barrel_id.bold(), text);
        }
        EventPayload::FrameReport { .. } | EventPayload::Aim { .. } => {}
    }
}

fn print_status(summary: &FrameSummary) {
    let [pitch, yaw, roll] = summary.camera_degrees;
    let aim = match &summary.aim {
        Some(a) if a.hit => format!(
            "{} at {:.2} m",
            a.collider.as_deref().unwrap_or("?").green(),
            a.distance
        ),
        Some(a) => format!("nothing within {:.0} m", a.distance).dimmed().to_string(),
        None => "-".dimmed().to_string(),
    };
    println!(
        "  [{:>5}] camera pitch {:>6.1}° yaw {:>6.1}° roll {:>6.1}°  aim: {}",
        summary.frame, pitch, yaw, roll, aim
    );
}

fn print_report(report: &SessionReport) {
    println!();
    println!("{}", "  Session report".bold());
    println!("    frames run      : {}", report.frames);
    println!("    frames on target: {}", report.aim_hits);
    println!("    barrel hits     : {} ({:?})", report.barrel_hits, report.barrel_stage);
    let rig = if report.rig_synced { "synced".green() } else { "camera only".yellow() };
    println!("    character rig   : {}", rig);
    let p = report.player_position;
    println!("    player position : ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z);
    for impact in &report.impacts {
        match impact.damage {
            Some(d) => println!(
                "    blast           : {} at {:.2} m took {:.1} damage",
                impact.id.bold(), impact.distance, d
            ),
            None => println!("    blast           : {} pushed at {:.2} m", impact.id.bold(), impact.distance),
        }
    }
    println!();
}
