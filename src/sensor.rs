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

//! Cached-path read of the platform cooling device.
//!
//! The kernel exposes the Pi's own fan as
//! `/sys/devices/platform/cooling_fan/hwmon/hwmonN/pwm1` where N varies
//! per boot. The directory is scanned once and the leaf path memoized;
//! re-resolution only happens through an explicit `invalidate()`.
//! Reads can transiently fail under concurrent sysfs access, hence the
//! bounded retry.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use thiserror::Error;

const COOLING_HWMON_BASE: &str = "/sys/devices/platform/cooling_fan/hwmon";
const HWMON_PREFIX: &str = "hwmon";
const READOUT_FILE: &str = "pwm1";

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("no hwmon* directory under {0}")]
    PathNotFound(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid readout value: {0:?}")]
    Parse(String),
    #[error("readout failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

/// Memoized location of the cooling device readout.
pub struct CoolingSensor {
    base: PathBuf,
    cached: Option<PathBuf>,
}

impl CoolingSensor {
    pub fn new() -> Self {
        Self::with_base(COOLING_HWMON_BASE)
    }

    /// Base directory override, used by tests with a tempdir sysfs tree.
    pub fn with_base<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            cached: None,
        }
    }

    /// Resolve the readout path, scanning the base directory only on the
    /// first call (or the first call after `invalidate()`).
    pub fn resolve(&mut self) -> Result<PathBuf, SensorError> {
        if let Some(p) = &self.cached {
            return Ok(p.clone());
        }
        let path = scan_for_readout(&self.base)?;
        self.cached = Some(path.clone());
        Ok(path)
    }

    /// Drop the memoized path so the next `resolve()` re-scans. Callers
    /// decide when a stale path warrants this; it never happens implicitly.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Read the current value, clamped to 0..=255, retrying up to
    /// `max_retries` additional times with a fixed delay in between.
    pub fn read_value(
        &mut self,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Result<u8, SensorError> {
        let path = self.resolve()?;
        read_with_retry(|| read_clamped(&path), max_retries, retry_delay)
    }
}

impl Default for CoolingSensor {
    fn default() -> Self {
        Self::new()
    }
}

fn scan_for_readout(base: &Path) -> Result<PathBuf, SensorError> {
    let entries = match fs::read_dir(base) {
        Ok(e) => e,
        Err(_) => return Err(SensorError::PathNotFound(base.to_path_buf())),
    };
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .filter(|ent| {
            ent.file_name()
                .to_string_lossy()
                .starts_with(HWMON_PREFIX)
        })
        .map(|ent| ent.path())
        .collect();
    // Deterministic pick if the kernel ever exposes more than one
    dirs.sort();
    match dirs.first() {
        Some(dir) => Ok(dir.join(READOUT_FILE)),
        None => Err(SensorError::PathNotFound(base.to_path_buf())),
    }
}

fn read_clamped(path: &Path) -> Result<u8, SensorError> {
    let raw = fs::read_to_string(path)?;
    let trimmed = raw.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| SensorError::Parse(trimmed.to_string()))?;
    Ok(value.clamp(0, 255) as u8)
}

/// Bounded-retry driver for a single readout attempt. Total attempts are
/// `max_retries + 1`; the delay is applied between attempts, not after
/// the last one.
fn read_with_retry<F>(
    mut attempt: F,
    max_retries: u32,
    retry_delay: Duration,
) -> Result<u8, SensorError>
where
    F: FnMut() -> Result<u8, SensorError>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match attempt() {
            Ok(v) => return Ok(v),
            Err(e) if attempts > max_retries => {
                return Err(SensorError::Exhausted {
                    attempts,
                    last: e.to_string(),
                });
            }
            Err(_) => thread::sleep(retry_delay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fake_tree(value: &str) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let hwmon = tmp.path().join("hwmon3");
        fs::create_dir(&hwmon).unwrap();
        fs::write(hwmon.join("pwm1"), value).unwrap();
        (tmp, hwmon.join("pwm1"))
    }

    #[test]
    fn test_resolve_finds_prefixed_subdir() {
        let (tmp, expected) = fake_tree("128\n");
        let mut sensor = CoolingSensor::with_base(tmp.path());
        assert_eq!(sensor.resolve().unwrap(), expected);
    }

    #[test]
    fn test_resolve_missing_base_reports_not_found() {
        let tmp = TempDir::new().unwrap();
        let mut sensor = CoolingSensor::with_base(tmp.path().join("nope"));
        assert!(matches!(
            sensor.resolve(),
            Err(SensorError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_empty_base_reports_not_found() {
        let tmp = TempDir::new().unwrap();
        let mut sensor = CoolingSensor::with_base(tmp.path());
        assert!(matches!(
            sensor.resolve(),
            Err(SensorError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_is_memoized() {
        let (tmp, expected) = fake_tree("1");
        let mut sensor = CoolingSensor::with_base(tmp.path());
        assert_eq!(sensor.resolve().unwrap(), expected);
        // Remove the tree; a second resolve must not re-scan.
        fs::remove_dir_all(tmp.path().join("hwmon3")).unwrap();
        assert_eq!(sensor.resolve().unwrap(), expected);
    }

    #[test]
    fn test_invalidate_forces_rescan() {
        let (tmp, _) = fake_tree("1");
        let mut sensor = CoolingSensor::with_base(tmp.path());
        sensor.resolve().unwrap();
        fs::remove_dir_all(tmp.path().join("hwmon3")).unwrap();
        sensor.invalidate();
        assert!(matches!(
            sensor.resolve(),
            Err(SensorError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_read_value_parses_and_trims() {
        let (tmp, _) = fake_tree(" 204\n");
        let mut sensor = CoolingSensor::with_base(tmp.path());
        assert_eq!(sensor.read_value(0, Duration::ZERO).unwrap(), 204);
    }

    #[test]
    fn test_read_value_clamps_range() {
        let (tmp, path) = fake_tree("300\n");
        let mut sensor = CoolingSensor::with_base(tmp.path());
        assert_eq!(sensor.read_value(0, Duration::ZERO).unwrap(), 255);
        fs::write(&path, "-7\n").unwrap();
        assert_eq!(sensor.read_value(0, Duration::ZERO).unwrap(), 0);
    }

    #[test]
    fn test_read_value_garbage_exhausts_retries() {
        let (tmp, _) = fake_tree("not-a-number");
        let mut sensor = CoolingSensor::with_base(tmp.path());
        let err = sensor.read_value(2, Duration::ZERO).unwrap_err();
        match err {
            SensorError::Exhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_retry_stops_at_first_success() {
        let mut calls = 0;
        let result = read_with_retry(
            || {
                calls += 1;
                if calls < 3 {
                    Err(SensorError::Parse("flaky".into()))
                } else {
                    Ok(42)
                }
            },
            3,
            Duration::ZERO,
        );
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_retry_attempt_budget_is_max_retries_plus_one() {
        let mut calls = 0;
        let result = read_with_retry(
            || {
                calls += 1;
                Err(SensorError::Parse("dead".into()))
            },
            3,
            Duration::ZERO,
        );
        assert!(matches!(
            result,
            Err(SensorError::Exhausted { attempts: 4, .. })
        ));
        assert_eq!(calls, 4);
    }
}
