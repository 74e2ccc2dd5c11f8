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

//! Register map of the expansion board protocol.
//!
//! The numeric ids are a fixed external contract of the board firmware
//! and must never be renumbered. Write registers live at 0x00..=0x08
//! plus the flash-save register at 0xff; read-only mirrors occupy
//! 0xf3..=0xfe.

/// Default I2C address of the expansion board.
pub const DEFAULT_ADDRESS: u8 = 0x21;

/// One logical operation on the board, keyed to its fixed register id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Reassign the board's I2C address.
    I2cAddress,
    /// Set (or select for read-back) a single LED's color.
    LedSpecified,
    /// Set all LEDs to one color.
    LedAll,
    /// LED animation mode.
    LedMode,
    /// Fan mode (off / manual / auto).
    FanMode,
    /// Fan PWM frequency, 4 bytes big-endian.
    FanFrequency,
    /// Fan duty pair, one byte per channel.
    FanDuty,
    /// Auto-fan temperature threshold pair (low, high).
    FanThreshold,
    /// Power-on self check toggle.
    PowerOnCheck,
    /// Persist current settings to board flash.
    SaveFlash,

    I2cAddressRead,
    LedSpecifiedRead,
    LedAllRead,
    LedModeRead,
    FanModeRead,
    FanFrequencyRead,
    Fan0DutyRead,
    Fan1DutyRead,
    FanThresholdRead,
    TempRead,
    Brand,
    Version,
}

impl Register {
    /// Numeric register id on the wire.
    pub const fn addr(self) -> u8 {
        match self {
            Register::I2cAddress => 0x00,
            Register::LedSpecified => 0x01,
            Register::LedAll => 0x02,
            Register::LedMode => 0x03,
            Register::FanMode => 0x04,
            Register::FanFrequency => 0x05,
            Register::FanDuty => 0x06,
            Register::FanThreshold => 0x07,
            Register::PowerOnCheck => 0x08,
            Register::SaveFlash => 0xff,
            Register::I2cAddressRead => 0xf3,
            Register::LedSpecifiedRead => 0xf4,
            Register::LedAllRead => 0xf5,
            Register::LedModeRead => 0xf6,
            Register::FanModeRead => 0xf7,
            Register::FanFrequencyRead => 0xf8,
            Register::Fan0DutyRead => 0xf9,
            Register::Fan1DutyRead => 0xfa,
            Register::FanThresholdRead => 0xfb,
            Register::TempRead => 0xfc,
            Register::Brand => 0xfd,
            Register::Version => 0xfe,
        }
    }
}
