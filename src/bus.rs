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

//! Addressed register transactions against the expansion board.
//!
//! One call, one transaction. Transport failures surface as
//! [`TransportError`] and are never retried here; retry and
//! swallow-or-crash decisions belong to callers.

use i2cdev::core::I2CDevice;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use thiserror::Error;

use crate::registers::Register;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open i2c device {path}: {source}")]
    DeviceOpen {
        path: String,
        #[source]
        source: LinuxI2CError,
    },
    #[error("write to register {reg:#04x} failed: {source}")]
    Write {
        reg: u8,
        #[source]
        source: LinuxI2CError,
    },
    #[error("read from register {reg:#04x} failed: {source}")]
    Read {
        reg: u8,
        #[source]
        source: LinuxI2CError,
    },
    #[error("failed to set slave address {addr:#04x}: {source}")]
    SetAddress {
        addr: u8,
        #[source]
        source: LinuxI2CError,
    },
    #[error("bus is closed")]
    Closed,
}

/// Raw byte-oriented transport, keyed by register id. The slave address
/// is bound at open time and only changes through [`set_address`].
///
/// [`set_address`]: I2cTransport::set_address
#[cfg_attr(test, mockall::automock)]
pub trait I2cTransport {
    fn write_reg_byte(&mut self, reg: u8, value: u8) -> Result<(), TransportError>;
    fn write_reg_block(&mut self, reg: u8, data: &[u8]) -> Result<(), TransportError>;
    fn read_reg_byte(&mut self, reg: u8) -> Result<u8, TransportError>;
    fn read_reg_block(&mut self, reg: u8, len: usize) -> Result<Vec<u8>, TransportError>;
    fn set_address(&mut self, addr: u8) -> Result<(), TransportError>;
}

/// Production transport over `/dev/i2c-<bus>`.
pub struct LinuxTransport {
    device: LinuxI2CDevice,
}

impl LinuxTransport {
    pub fn open(bus: u8, addr: u8) -> Result<Self, TransportError> {
        let path = format!("/dev/i2c-{}", bus);
        let device = LinuxI2CDevice::new(&path, addr as u16)
            .map_err(|e| TransportError::DeviceOpen { path, source: e })?;
        Ok(Self { device })
    }
}

impl I2cTransport for LinuxTransport {
    fn write_reg_byte(&mut self, reg: u8, value: u8) -> Result<(), TransportError> {
        self.device
            .smbus_write_byte_data(reg, value)
            .map_err(|e| TransportError::Write { reg, source: e })
    }

    fn write_reg_block(&mut self, reg: u8, data: &[u8]) -> Result<(), TransportError> {
        let mut frame = Vec::with_capacity(1 + data.len());
        frame.push(reg);
        frame.extend_from_slice(data);
        self.device
            .write(&frame)
            .map_err(|e| TransportError::Write { reg, source: e })
    }

    fn read_reg_byte(&mut self, reg: u8) -> Result<u8, TransportError> {
        self.device
            .smbus_read_byte_data(reg)
            .map_err(|e| TransportError::Read { reg, source: e })
    }

    fn read_reg_block(&mut self, reg: u8, len: usize) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; len];
        self.device
            .write(&[reg])
            .and_then(|_| self.device.read(&mut buf))
            .map_err(|e| TransportError::Read { reg, source: e })?;
        Ok(buf)
    }

    fn set_address(&mut self, addr: u8) -> Result<(), TransportError> {
        self.device
            .set_slave_address(addr as u16)
            .map_err(|e| TransportError::SetAddress { addr, source: e })
    }
}

/// Owns the transport for the lifetime of the peripheral connection.
///
/// `close()` releases the transport exactly once; later operations fail
/// with [`TransportError::Closed`].
pub struct PeripheralBus {
    transport: Option<Box<dyn I2cTransport>>,
}

impl PeripheralBus {
    /// Open the board on `/dev/i2c-<bus>` at the given slave address.
    pub fn open(bus: u8, addr: u8) -> Result<Self, TransportError> {
        let transport = LinuxTransport::open(bus, addr)?;
        Ok(Self::with_transport(Box::new(transport)))
    }

    pub fn with_transport(transport: Box<dyn I2cTransport>) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    fn transport(&mut self) -> Result<&mut dyn I2cTransport, TransportError> {
        match self.transport.as_deref_mut() {
            Some(t) => Ok(t),
            None => Err(TransportError::Closed),
        }
    }

    pub fn write_byte(&mut self, reg: Register, value: u8) -> Result<(), TransportError> {
        self.transport()?.write_reg_byte(reg.addr(), value)
    }

    pub fn write_block(&mut self, reg: Register, data: &[u8]) -> Result<(), TransportError> {
        self.transport()?.write_reg_block(reg.addr(), data)
    }

    pub fn read_byte(&mut self, reg: Register) -> Result<u8, TransportError> {
        self.transport()?.read_reg_byte(reg.addr())
    }

    pub fn read_block(&mut self, reg: Register, len: usize) -> Result<Vec<u8>, TransportError> {
        self.transport()?.read_reg_block(reg.addr(), len)
    }

    /// Point subsequent transactions at a different slave address.
    pub fn set_address(&mut self, addr: u8) -> Result<(), TransportError> {
        self.transport()?.set_address(addr)
    }

    /// Release the transport. Idempotent; a second call is a no-op.
    pub fn close(&mut self) {
        self.transport = None;
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }
}
