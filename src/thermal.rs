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

//! Two-threshold hysteresis over the platform cooling readout.
//!
//! Classic Schmitt-trigger policy: engage full duty when the reading
//! crosses above the high threshold, release to zero when it crosses
//! below the low one, do nothing in the dead band between them. At most
//! one duty command is issued per state transition, never per tick.
//!
//! NOTE: the reading compared here is the platform fan's raw PWM
//! readout (0..=255), while the thresholds were labelled as temperature
//! upstream. The observed behavior is preserved as-is pending product
//! clarification; nothing in this module claims a unit.

use crate::board::{ExpansionBoard, FanDutyPair};
use crate::bus::TransportError;

/// Reading above which the fan engages at full duty.
pub const ENGAGE_ABOVE: u8 = 170;
/// Reading below which an engaged fan releases to zero duty.
pub const RELEASE_BELOW: u8 = 130;

/// The only state carried across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HysteresisState {
    pub engaged: bool,
    pub last_duty: u8,
}

impl HysteresisState {
    pub const fn initial() -> Self {
        Self {
            engaged: false,
            last_duty: 0,
        }
    }
}

/// Pure transition function: `(state, reading) -> (state, command)`.
/// No command means no transition happened this tick.
pub fn transition(state: HysteresisState, reading: u8) -> (HysteresisState, Option<FanDutyPair>) {
    if !state.engaged && reading > ENGAGE_ABOVE {
        (
            HysteresisState {
                engaged: true,
                last_duty: 255,
            },
            Some(FanDutyPair::FULL),
        )
    } else if state.engaged && reading < RELEASE_BELOW {
        (
            HysteresisState {
                engaged: false,
                last_duty: 0,
            },
            Some(FanDutyPair::OFF),
        )
    } else {
        (state, None)
    }
}

/// Applies the hysteresis policy to the expansion board fans.
pub struct ThermalController {
    state: HysteresisState,
}

impl ThermalController {
    pub fn new() -> Self {
        Self {
            state: HysteresisState::initial(),
        }
    }

    pub fn state(&self) -> HysteresisState {
        self.state
    }

    /// One control tick. A missing reading (failed sensor read) holds the
    /// current state and commands nothing. The new state is committed
    /// only after the duty write succeeds, so a transient bus failure is
    /// retried on the next tick the crossing condition still holds.
    pub fn tick(
        &mut self,
        reading: Option<u8>,
        board: &mut ExpansionBoard,
    ) -> Result<Option<FanDutyPair>, TransportError> {
        let Some(value) = reading else {
            return Ok(None);
        };
        let (next, command) = transition(self.state, value);
        if let Some(duty) = command {
            board.set_fan_duty(duty)?;
        }
        self.state = next;
        Ok(command)
    }
}

impl Default for ThermalController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_sequence(readings: &[u8]) -> (HysteresisState, Vec<FanDutyPair>) {
        let mut state = HysteresisState::initial();
        let mut commands = Vec::new();
        for &r in readings {
            let (next, cmd) = transition(state, r);
            state = next;
            if let Some(c) = cmd {
                commands.push(c);
            }
        }
        (state, commands)
    }

    #[test]
    fn test_monotonic_rise_engages_exactly_once() {
        let (state, commands) = run_sequence(&[0, 50, 130, 169, 170, 171, 255]);
        assert!(state.engaged);
        assert_eq!(commands, vec![FanDutyPair::FULL]);
    }

    #[test]
    fn test_engagement_requires_strictly_above_high() {
        let state = HysteresisState::initial();
        let (next, cmd) = transition(state, ENGAGE_ABOVE);
        assert!(!next.engaged);
        assert!(cmd.is_none());
        let (next, cmd) = transition(state, ENGAGE_ABOVE + 1);
        assert!(next.engaged);
        assert_eq!(cmd, Some(FanDutyPair::FULL));
    }

    #[test]
    fn test_dead_band_holds_engaged_state() {
        let mut state = HysteresisState {
            engaged: true,
            last_duty: 255,
        };
        for r in [170, 150, 131, 130] {
            let (next, cmd) = transition(state, r);
            assert!(next.engaged, "reading {r} must not release");
            assert!(cmd.is_none(), "reading {r} must not command");
            state = next;
        }
        let (next, cmd) = transition(state, 129);
        assert!(!next.engaged);
        assert_eq!(cmd, Some(FanDutyPair::OFF));
        assert_eq!(next.last_duty, 0);
    }

    #[test]
    fn test_dead_band_holds_released_state() {
        let state = HysteresisState::initial();
        for r in [130, 150, 169, 170] {
            let (next, cmd) = transition(state, r);
            assert!(!next.engaged);
            assert!(cmd.is_none());
        }
    }

    #[test]
    fn test_full_cycle_issues_two_commands() {
        let (state, commands) = run_sequence(&[100, 180, 200, 160, 140, 120, 100]);
        assert!(!state.engaged);
        assert_eq!(commands, vec![FanDutyPair::FULL, FanDutyPair::OFF]);
    }

    #[test]
    fn test_controller_holds_on_missing_reading() {
        // No transport ever gets touched when the reading is None, so an
        // all-expectations-empty mock works as a tripwire.
        let mock = crate::bus::MockI2cTransport::new();
        let mut board = ExpansionBoard::with_transport(Box::new(mock));
        let mut ctl = ThermalController::new();
        assert_eq!(ctl.tick(None, &mut board).unwrap(), None);
        assert_eq!(ctl.state(), HysteresisState::initial());
    }

    #[test]
    fn test_controller_state_not_committed_on_write_failure() {
        use i2cdev::linux::LinuxI2CError;

        let mut mock = crate::bus::MockI2cTransport::new();
        mock.expect_write_reg_block().times(1).returning(|reg, _| {
            Err(TransportError::Write {
                reg,
                source: LinuxI2CError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "nack",
                )),
            })
        });
        let mut board = ExpansionBoard::with_transport(Box::new(mock));
        let mut ctl = ThermalController::new();
        assert!(ctl.tick(Some(200), &mut board).is_err());
        // Still disengaged; the crossing will be retried next tick.
        assert!(!ctl.state().engaged);
    }
}
