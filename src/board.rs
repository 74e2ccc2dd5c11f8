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

//! Typed facade over the register protocol.
//!
//! Every operation maps to exactly one register transaction (plus the
//! select-write for single-LED read-back, which the firmware requires).
//! Errors propagate to the caller untouched; only `shutdown_sequence`
//! swallows per-step failures, so teardown always runs to the end.

use crate::bus::{I2cTransport, PeripheralBus, TransportError};
use crate::codec;
use crate::registers::Register;

/// One LED color, channels clamped to 0..=255 at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl LedColor {
    pub const BLACK: LedColor = LedColor { r: 0, g: 0, b: 0 };

    pub fn new(r: i32, g: i32, b: i32) -> Self {
        Self {
            r: r.clamp(0, 255) as u8,
            g: g.clamp(0, 255) as u8,
            b: b.clamp(0, 255) as u8,
        }
    }
}

/// LED animation mode as understood by the board firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedMode {
    Steady = 1,
    Following = 2,
    Breathing = 3,
    Rainbow = 4,
}

impl LedMode {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(LedMode::Steady),
            2 => Some(LedMode::Following),
            3 => Some(LedMode::Breathing),
            4 => Some(LedMode::Rainbow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanMode {
    Off = 0,
    Manual = 1,
    Auto = 2,
}

impl FanMode {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(FanMode::Off),
            1 => Some(FanMode::Manual),
            2 => Some(FanMode::Auto),
            _ => None,
        }
    }
}

/// Temperature bounds handed to the board's onboard auto-fan logic.
/// `low <= high` is expected but not enforced here; once written, the
/// firmware owns the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanThreshold {
    pub low: u8,
    pub high: u8,
}

/// Independent duty values for the two fan channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanDutyPair {
    pub duty0: u8,
    pub duty1: u8,
}

impl FanDutyPair {
    pub const OFF: FanDutyPair = FanDutyPair { duty0: 0, duty1: 0 };
    pub const FULL: FanDutyPair = FanDutyPair {
        duty0: 255,
        duty1: 255,
    };
}

/// Outcome of one teardown step. Failures are collected, never fatal.
#[derive(Debug)]
pub struct TeardownStep {
    pub name: &'static str,
    pub result: Result<(), TransportError>,
}

#[derive(Debug, Default)]
pub struct TeardownReport {
    pub steps: Vec<TeardownStep>,
}

impl TeardownReport {
    fn record(&mut self, name: &'static str, result: Result<(), TransportError>) {
        self.steps.push(TeardownStep { name, result });
    }

    pub fn is_clean(&self) -> bool {
        self.steps.iter().all(|s| s.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TeardownStep> {
        self.steps.iter().filter(|s| s.result.is_err())
    }
}

/// Brand string register is a 9-byte NUL-padded block.
const BRAND_LEN: usize = 9;
/// Version string register is a 14-byte NUL-padded block.
const VERSION_LEN: usize = 14;
/// Fan frequency written during teardown, matching the firmware default.
const SAFE_FAN_FREQUENCY_HZ: u32 = 50;

/// The expansion board behind its register protocol.
pub struct ExpansionBoard {
    bus: PeripheralBus,
}

impl ExpansionBoard {
    /// Open the board on `/dev/i2c-<bus>` at the given address.
    pub fn open(bus: u8, addr: u8) -> Result<Self, TransportError> {
        Ok(Self {
            bus: PeripheralBus::open(bus, addr)?,
        })
    }

    pub fn with_transport(transport: Box<dyn I2cTransport>) -> Self {
        Self {
            bus: PeripheralBus::with_transport(transport),
        }
    }

    /// Write a new I2C address to the board, then retarget the transport.
    pub fn set_i2c_address(&mut self, addr: u8) -> Result<(), TransportError> {
        self.bus.write_byte(Register::I2cAddress, addr)?;
        self.bus.set_address(addr)
    }

    pub fn set_led(&mut self, id: u8, color: LedColor) -> Result<(), TransportError> {
        self.bus
            .write_block(Register::LedSpecified, &[id, color.r, color.g, color.b])
    }

    pub fn set_all_leds(&mut self, color: LedColor) -> Result<(), TransportError> {
        self.bus
            .write_block(Register::LedAll, &[color.r, color.g, color.b])
    }

    pub fn set_led_mode(&mut self, mode: LedMode) -> Result<(), TransportError> {
        self.bus.write_byte(Register::LedMode, mode as u8)
    }

    pub fn set_fan_mode(&mut self, mode: FanMode) -> Result<(), TransportError> {
        self.bus.write_byte(Register::FanMode, mode as u8)
    }

    pub fn set_fan_frequency(&mut self, hz: u32) -> Result<(), TransportError> {
        self.bus
            .write_block(Register::FanFrequency, &codec::encode_u32_be(hz))
    }

    pub fn set_fan_duty(&mut self, duty: FanDutyPair) -> Result<(), TransportError> {
        self.bus
            .write_block(Register::FanDuty, &[duty.duty0, duty.duty1])
    }

    pub fn set_fan_threshold(&mut self, threshold: FanThreshold) -> Result<(), TransportError> {
        self.bus
            .write_block(Register::FanThreshold, &[threshold.low, threshold.high])
    }

    pub fn set_power_on_check(&mut self, enabled: bool) -> Result<(), TransportError> {
        self.bus
            .write_byte(Register::PowerOnCheck, enabled as u8)
    }

    /// Forward the save bit; the persistence effect is firmware-defined.
    pub fn persist_to_flash(&mut self, enabled: bool) -> Result<(), TransportError> {
        self.bus.write_byte(Register::SaveFlash, enabled as u8)
    }

    pub fn get_i2c_address(&mut self) -> Result<u8, TransportError> {
        self.bus.read_byte(Register::I2cAddressRead)
    }

    /// Read back one LED's color. The firmware requires a select-write of
    /// the LED id before the mirror register yields that LED.
    pub fn get_led(&mut self, id: u8) -> Result<LedColor, TransportError> {
        self.bus.write_block(Register::LedSpecified, &[id])?;
        let raw = self.bus.read_block(Register::LedSpecifiedRead, 3)?;
        Ok(LedColor {
            r: raw[0],
            g: raw[1],
            b: raw[2],
        })
    }

    /// Read all four LED colors in one 12-byte block.
    pub fn get_all_leds(&mut self) -> Result<Vec<LedColor>, TransportError> {
        let raw = self.bus.read_block(Register::LedAllRead, 12)?;
        Ok(raw
            .chunks_exact(3)
            .map(|c| LedColor {
                r: c[0],
                g: c[1],
                b: c[2],
            })
            .collect())
    }

    /// Raw mode byte; values outside 1..=4 are surfaced as-is.
    pub fn get_led_mode(&mut self) -> Result<u8, TransportError> {
        self.bus.read_byte(Register::LedModeRead)
    }

    pub fn get_fan_mode(&mut self) -> Result<u8, TransportError> {
        self.bus.read_byte(Register::FanModeRead)
    }

    pub fn get_fan_frequency(&mut self) -> Result<u32, TransportError> {
        let raw = self.bus.read_block(Register::FanFrequencyRead, 4)?;
        Ok(codec::decode_u32_be(&raw))
    }

    pub fn get_fan_duty0(&mut self) -> Result<u8, TransportError> {
        self.bus.read_byte(Register::Fan0DutyRead)
    }

    pub fn get_fan_duty1(&mut self) -> Result<u8, TransportError> {
        self.bus.read_byte(Register::Fan1DutyRead)
    }

    pub fn get_fan_threshold(&mut self) -> Result<(u8, u8), TransportError> {
        let raw = self.bus.read_block(Register::FanThresholdRead, 2)?;
        Ok((raw[0], raw[1]))
    }

    /// Board temperature in raw device units.
    pub fn get_temperature(&mut self) -> Result<u8, TransportError> {
        self.bus.read_byte(Register::TempRead)
    }

    pub fn get_brand(&mut self) -> Result<String, TransportError> {
        let raw = self.bus.read_block(Register::Brand, BRAND_LEN)?;
        Ok(codec::decode_ascii(&raw))
    }

    pub fn get_version(&mut self) -> Result<String, TransportError> {
        let raw = self.bus.read_block(Register::Version, VERSION_LEN)?;
        Ok(codec::decode_ascii(&raw))
    }

    /// Ordered best-effort teardown. Each step runs regardless of earlier
    /// failures so the board is left as safe as the working steps allow.
    pub fn shutdown_sequence(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        report.record("led_mode_steady", self.set_led_mode(LedMode::Steady));
        report.record("leds_black", self.set_all_leds(LedColor::BLACK));
        report.record("fan_mode_off", self.set_fan_mode(FanMode::Off));
        report.record(
            "fan_frequency_default",
            self.set_fan_frequency(SAFE_FAN_FREQUENCY_HZ),
        );
        report.record("fan_duty_zero", self.set_fan_duty(FanDutyPair::OFF));
        self.bus.close();
        report.record("bus_close", Ok(()));
        report
    }
}
