//! `swervekit` – swerve drive simulator.
//!
//! Runs the full control stack (scheduler, swerve drive, heading hold) on
//! simulated hardware:
//!
//! 1. Loads `~/.swervekit/config.toml`, or the path given as the first
//!    argument; writes the defaults there on first run.
//! 2. Builds a robot from the configured modules and enables it in teleop.
//! 3. Ticks at the configured period while a scripted operator drives.
//! 4. On **Ctrl-C** (or when the run length elapses) disables the robot,
//!    which stops every control task, and prints a summary.

mod config;
mod script;
mod sim;

use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use swervekit_runtime::{Period, init_tracing};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let explicit_path = std::env::args().nth(1).map(PathBuf::from);
    let path = explicit_path.clone().unwrap_or_else(config::config_path);
    let first_run = explicit_path.is_none() && !path.exists();

    let cfg = config::load(&path)?;
    let _guard = init_tracing(&cfg.telemetry);

    print_banner();
    if first_run {
        match config::save_to(&cfg, &path) {
            Ok(()) => println!(
                "  {} Default config written to {}",
                "✓".green().bold(),
                path.display().to_string().bold()
            ),
            Err(e) => println!("  {}: {}", "Could not write default config".yellow(), e),
        }
    } else {
        println!("  Config loaded from {}", path.display().to_string().bold());
    }

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – disabling robot …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(
            error = %e,
            "Failed to install Ctrl-C handler; the run stops only at duration_s"
        );
    }

    // ── Control loop ──────────────────────────────────────────────────────
    let start = Instant::now();
    let mut world = sim::SimWorld::build(&cfg, 0.0)?;
    world.robot.set_period(Period::TELEOP, 0.0);
    println!(
        "  Simulating {} module(s) at {} ms/tick, {} mode\n",
        cfg.modules.len(),
        cfg.tick_ms,
        format!("{:?}", cfg.drive_mode).cyan()
    );

    let tick = Duration::from_millis(cfg.tick_ms);
    let mut last_report = 0.0;
    let mut now = 0.0;
    while !shutdown.load(Ordering::SeqCst) {
        now = start.elapsed().as_secs_f64();
        if cfg.duration_s > 0.0 && now >= cfg.duration_s {
            break;
        }
        world.robot.periodic(now);
        world.integrate(world.robot.scheduler().tick_info().dt);

        if now - last_report >= 1.0 {
            last_report = now;
            info!(
                t = now,
                heading_deg = world.drive.get_heading().to_degrees(),
                tasks = world.robot.scheduler().len(),
                "tick report"
            );
        }
        std::thread::sleep(tick);
    }

    world.robot.set_period(Period::DISABLED, now);
    // The Always phase keeps running while disabled.
    world.robot.periodic(now);
    print_summary(&world, now);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "SwerveKit".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Swerve drive simulator");
    println!();
}

fn print_summary(world: &sim::SimWorld, elapsed: f64) {
    let tick = world.robot.scheduler().tick_info();
    println!();
    println!("{}", "  Simulation stopped".bold());
    println!("    ticks run     : {}", tick.frame);
    println!("    elapsed       : {:.2} s", elapsed);
    println!("    final heading : {:.1}°", world.drive.get_heading().to_degrees());
    println!("    tasks queued  : {}", world.robot.scheduler().len());
    println!();
    println!("  {:<14} {:>8} {:>10} {:>8}", "module", "drive", "target°", "flipped");
    for (name, out) in world.module_report() {
        let flipped = if out.flipped { "yes".yellow() } else { "no".normal() };
        println!(
            "  {:<14} {:>8.3} {:>10.1} {:>8}",
            name.bold(),
            out.drive,
            out.target_angle.to_degrees(),
            flipped
        );
    }
    println!();
}
