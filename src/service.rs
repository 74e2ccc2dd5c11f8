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

//! The agent loop: one cooperative control tick per interval.
//!
//! Each tick runs to completion: read the cooling readout (bounded
//! retry), evaluate the hysteresis policy, possibly command fan duty,
//! occasionally log a status snapshot. A single failed tick is never
//! fatal; only persistent transport failure tears the board down and
//! exits.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};

use crate::board::{ExpansionBoard, FanMode, FanThreshold, LedColor, LedMode};
use crate::config::AgentConfig;
use crate::logger;
use crate::sensor::CoolingSensor;
use crate::thermal::ThermalController;

const SENSOR_MAX_RETRIES: u32 = 3;
const SENSOR_RETRY_DELAY: Duration = Duration::from_millis(100);
/// Consecutive fan-duty write failures tolerated before giving up.
const MAX_TRANSPORT_FAILURES: u32 = 5;

/// Push the configured startup state to the board. Any failure here is
/// fatal: an unconfigurable board is not worth running against.
fn apply_startup(board: &mut ExpansionBoard, cfg: &AgentConfig) -> Result<()> {
    let led_mode = LedMode::from_raw(cfg.led_mode)
        .ok_or_else(|| anyhow!("invalid led_mode {}", cfg.led_mode))?;
    let fan_mode = FanMode::from_raw(cfg.fan_mode)
        .ok_or_else(|| anyhow!("invalid fan_mode {}", cfg.fan_mode))?;
    board.set_led_mode(led_mode).context("set led mode")?;
    board
        .set_all_leds(LedColor::new(
            cfg.led_color[0] as i32,
            cfg.led_color[1] as i32,
            cfg.led_color[2] as i32,
        ))
        .context("set led color")?;
    board.set_fan_mode(fan_mode).context("set fan mode")?;
    board
        .set_fan_threshold(FanThreshold {
            low: cfg.fan_threshold.low,
            high: cfg.fan_threshold.high,
        })
        .context("set fan threshold")?;
    if cfg.power_on_check {
        board.set_power_on_check(true).context("set power-on check")?;
    }
    if cfg.save_to_flash {
        board.persist_to_flash(true).context("persist to flash")?;
    }
    Ok(())
}

/// Best-effort status snapshot. Individual read failures are logged as
/// nulls rather than aborting the tick.
fn log_status(board: &mut ExpansionBoard, tick: u64, reading: Option<u8>) {
    let temp = board.get_temperature().ok();
    let fan_mode = board.get_fan_mode().ok();
    let duty0 = board.get_fan_duty0().ok();
    let duty1 = board.get_fan_duty1().ok();
    let threshold = board.get_fan_threshold().ok();
    logger::log_event(
        "status",
        serde_json::json!({
            "tick": tick,
            "cooling_pwm": reading,
            "board_temp": temp,
            "fan_mode": fan_mode,
            "fan_duty": [duty0, duty1],
            "fan_threshold": threshold.map(|(lo, hi)| [lo, hi]),
        }),
    );
}

pub fn run_service(cfg: &AgentConfig) -> Result<()> {
    eprintln!("expansiond: starting service mode");

    let mut board = ExpansionBoard::open(cfg.i2c_bus, cfg.i2c_address)
        .context("open expansion board")?;
    apply_startup(&mut board, cfg).context("apply startup config")?;
    logger::log_event(
        "board_configured",
        serde_json::json!({ "bus": cfg.i2c_bus, "address": cfg.i2c_address }),
    );

    let mut sensor = CoolingSensor::new();
    let mut controller = ThermalController::new();
    let interval = Duration::from_millis(cfg.interval_ms);
    let mut last = Instant::now() - interval;
    let mut tick: u64 = 0;
    let mut transport_failures: u32 = 0;

    loop {
        let now = Instant::now();
        if now.duration_since(last) < interval {
            thread::sleep(Duration::from_millis(50));
            continue;
        }
        last = now;
        tick += 1;

        let reading = match sensor.read_value(SENSOR_MAX_RETRIES, SENSOR_RETRY_DELAY) {
            Ok(v) => Some(v),
            Err(e) => {
                logger::log_event(
                    "sensor_read_failed",
                    serde_json::json!({ "tick": tick, "error": e.to_string() }),
                );
                // Re-resolve next tick in case the hwmon index moved
                sensor.invalidate();
                None
            }
        };

        match controller.tick(reading, &mut board) {
            Ok(Some(duty)) => {
                transport_failures = 0;
                logger::log_event(
                    "fan_duty",
                    serde_json::json!({
                        "tick": tick,
                        "engaged": controller.state().engaged,
                        "duty": [duty.duty0, duty.duty1],
                    }),
                );
            }
            Ok(None) => transport_failures = 0,
            Err(e) => {
                transport_failures += 1;
                eprintln!("expansiond: fan command failed: {e}");
                logger::log_event(
                    "fan_command_failed",
                    serde_json::json!({ "tick": tick, "error": e.to_string() }),
                );
                if transport_failures >= MAX_TRANSPORT_FAILURES {
                    let report = board.shutdown_sequence();
                    for step in report.failures() {
                        eprintln!("expansiond: teardown step {} failed", step.name);
                    }
                    return Err(anyhow!(
                        "giving up after {transport_failures} consecutive transport failures"
                    ));
                }
            }
        }

        if cfg.status_every > 0 && tick % cfg.status_every == 0 {
            log_status(&mut board, tick, reading);
        }
    }
}
