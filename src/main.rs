/*
 * This file is part of Expansiond.
 *
 * Copyright (C) 2025 Expansiond contributors
 *
 * Expansiond is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Expansiond is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Expansiond. If not, see <https://www.gnu.org/licenses/>.
 */

mod board;
mod bus;
mod codec;
mod config;
mod logger;
mod registers;
mod sensor;
mod service;
mod thermal;

use anyhow::Context;

use board::ExpansionBoard;
use config::{config_path, load_saved_config, validate_config, write_config, AgentConfig};

fn main() -> anyhow::Result<()> {
    // /dev/i2c-* and the cooling_fan sysfs node need elevated access
    if unsafe { libc::geteuid() } != 0 {
        eprintln!("Error: expansiond requires root privileges to access the I2C bus.");
        eprintln!(
            "Please run with: sudo {}",
            std::env::args()
                .next()
                .unwrap_or_else(|| "expansiond".to_string())
        );
        std::process::exit(1);
    }

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--logging") {
        logger::init_logging();
        logger::log_event("startup", serde_json::json!({ "args": args }));
    }

    let cfg = match load_saved_config() {
        Some(c) => c,
        None => AgentConfig::default(),
    };
    if let Err(e) = validate_config(&cfg) {
        eprintln!("expansiond: invalid config: {e}");
        std::process::exit(1);
    }

    // `expansiond write-config` seeds a default config file and exits
    if args.get(1).map(|s| s.as_str()) == Some("write-config") {
        let path = config_path();
        write_config(&AgentConfig::default(), &path)
            .with_context(|| format!("write config to {}", path.display()))?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    // `expansiond probe` dumps the board's current state and exits
    if args.get(1).map(|s| s.as_str()) == Some("probe") {
        return probe(&cfg);
    }

    // `expansiond off` runs the safe teardown sequence and exits
    if args.get(1).map(|s| s.as_str()) == Some("off") {
        let mut board = ExpansionBoard::open(cfg.i2c_bus, cfg.i2c_address)
            .context("open expansion board")?;
        let report = board.shutdown_sequence();
        for step in &report.steps {
            match &step.result {
                Ok(()) => println!("{}: ok", step.name),
                Err(e) => println!("{}: FAILED ({e})", step.name),
            }
        }
        if !report.is_clean() {
            std::process::exit(1);
        }
        return Ok(());
    }

    // Default (and `--service`): run the agent loop
    let res = service::run_service(&cfg);
    if let Err(err) = &res {
        eprintln!("error: {err:#}");
        logger::log_event(
            "fatal_error",
            serde_json::json!({ "error": err.to_string() }),
        );
        std::process::exit(1);
    }
    res
}

fn probe(cfg: &AgentConfig) -> anyhow::Result<()> {
    let mut board =
        ExpansionBoard::open(cfg.i2c_bus, cfg.i2c_address).context("open expansion board")?;
    println!("address:       {:#04x}", board.get_i2c_address()?);
    println!("brand:         {}", board.get_brand()?);
    println!("version:       {}", board.get_version()?);
    println!("led mode:      {}", board.get_led_mode()?);
    println!("fan mode:      {}", board.get_fan_mode()?);
    println!("fan frequency: {} Hz", board.get_fan_frequency()?);
    println!(
        "fan duty:      {} / {}",
        board.get_fan_duty0()?,
        board.get_fan_duty1()?
    );
    let (lo, hi) = board.get_fan_threshold()?;
    println!("fan threshold: {lo}..{hi}");
    println!("temperature:   {} (raw)", board.get_temperature()?);
    for (i, led) in board.get_all_leds()?.iter().enumerate() {
        println!("led {i}:         ({}, {}, {})", led.r, led.g, led.b);
    }
    Ok(())
}
