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

//! Expansiond - fan and LED agent for Raspberry Pi I2C expansion boards
//!
//! This library provides the register protocol client for the expansion
//! board (LEDs, two fan channels, temperature), the cached read of the
//! platform cooling device, and the hysteresis fan controller driving
//! the two together.

pub mod board;
pub mod bus;
pub mod codec;
pub mod config;
pub mod logger;
pub mod registers;
pub mod sensor;
pub mod service;
pub mod thermal;
