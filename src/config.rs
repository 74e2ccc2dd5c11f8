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

//! Agent configuration.
//!
//! Everything here is startup policy sent to the board once (LED look,
//! fan mode, firmware threshold pair) plus loop pacing. The hysteresis
//! thresholds are deliberately NOT configurable; they are constants of
//! the control policy in `thermal`.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::registers::DEFAULT_ADDRESS;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartupThreshold {
    pub low: u8,
    pub high: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// I2C bus number, i.e. the N in /dev/i2c-N.
    #[serde(default = "default_bus")]
    pub i2c_bus: u8,
    /// Board slave address.
    #[serde(default = "default_address")]
    pub i2c_address: u8,
    /// LED animation mode written at startup (1..=4).
    #[serde(default = "default_led_mode")]
    pub led_mode: u8,
    /// Color written to all LEDs at startup, [r, g, b].
    #[serde(default = "default_led_color")]
    pub led_color: [u8; 3],
    /// Fan mode written at startup (0 off, 1 manual, 2 auto).
    #[serde(default = "default_fan_mode")]
    pub fan_mode: u8,
    /// Threshold pair handed to the board's own auto-fan logic, in board
    /// units. Distinct from the agent-side hysteresis constants.
    #[serde(default = "default_threshold")]
    pub fan_threshold: StartupThreshold,
    /// Enable the board's power-on self check.
    #[serde(default)]
    pub power_on_check: bool,
    /// Persist the startup settings to board flash.
    #[serde(default)]
    pub save_to_flash: bool,
    /// Control tick interval in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Log a status snapshot every this many ticks (0 disables).
    #[serde(default = "default_status_every")]
    pub status_every: u64,
}

fn default_bus() -> u8 { 1 }
fn default_address() -> u8 { DEFAULT_ADDRESS }
fn default_led_mode() -> u8 { 4 }
fn default_led_color() -> [u8; 3] { [255, 0, 0] }
fn default_fan_mode() -> u8 { 2 }
fn default_threshold() -> StartupThreshold { StartupThreshold { low: 30, high: 70 } }
fn default_interval_ms() -> u64 { 1000 }
fn default_status_every() -> u64 { 5 }

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            i2c_bus: default_bus(),
            i2c_address: default_address(),
            led_mode: default_led_mode(),
            led_color: default_led_color(),
            fan_mode: default_fan_mode(),
            fan_threshold: default_threshold(),
            power_on_check: false,
            save_to_flash: false,
            interval_ms: default_interval_ms(),
            status_every: default_status_every(),
        }
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("expansiond").join("config.json");
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home)
            .join(".config")
            .join("expansiond")
            .join("config.json");
    }
    PathBuf::from("/etc/expansiond/config.json")
}

pub fn load_saved_config() -> Option<AgentConfig> {
    let path = config_path();
    let data = fs::read_to_string(&path).ok()?;
    let cfg: AgentConfig = serde_json::from_str(&data).ok()?;
    validate_config(&cfg).ok()?;
    Some(cfg)
}

pub fn write_config(cfg: &AgentConfig, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let json = serde_json::to_string_pretty(cfg).unwrap_or_else(|_| "{}".to_string());
    fs::write(path, json)
}

pub fn validate_config(cfg: &AgentConfig) -> Result<(), String> {
    if !(1..=4).contains(&cfg.led_mode) {
        return Err(format!("led_mode must be 1..=4, got {}", cfg.led_mode));
    }
    if cfg.fan_mode > 2 {
        return Err(format!("fan_mode must be 0..=2, got {}", cfg.fan_mode));
    }
    if cfg.i2c_address > 0x7f {
        return Err(format!(
            "i2c_address must be a 7-bit address, got {:#04x}",
            cfg.i2c_address
        ));
    }
    if cfg.fan_threshold.low > cfg.fan_threshold.high {
        return Err(format!(
            "fan_threshold low {} exceeds high {}",
            cfg.fan_threshold.low, cfg.fan_threshold.high
        ));
    }
    if cfg.interval_ms == 0 {
        return Err("interval_ms must be nonzero".to_string());
    }
    Ok(())
}
