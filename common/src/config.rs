use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    band::Band,
    hysteresis::ControlReference,
    scheduler::{DriftCorrection, FALLBACK_REDUCER_MS},
};

const MAX_DELAY_S: u32 = 86_400;
const MAX_PRIME_PULSE_MS: u64 = 600_000;
const MAX_RELAY_PULSE_MS: u64 = 60_000;
const MAX_REDUCER_MS: i32 = 1_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("default band {min_c}..{max_c} must lie within 0..=120 with min <= max")]
    InvalidBand { min_c: f32, max_c: f32 },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Operating parameters. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermostatConfig {
    pub startup_delay_s: u32,
    pub prime_pulse_ms: u64,
    pub settle_delay_s: u32,
    /// Seconds between evaluations, `1..=86400`.
    pub evaluation_period_s: u32,
    pub relay_pulse_ms: u64,
    pub default_band: Band,
    pub backlight: bool,
    /// Estimated in-tick work subtracted from each second, `0..=1000` ms.
    pub drift_reducer_ms: i32,
    pub drift_correction: DriftCorrection,
    pub control_reference: ControlReference,
}

impl Default for ThermostatConfig {
    fn default() -> Self {
        Self {
            startup_delay_s: 300,
            prime_pulse_ms: 120_000,
            settle_delay_s: 60,
            evaluation_period_s: 300,
            relay_pulse_ms: 2_000,
            default_band: Band::default(),
            backlight: true,
            drift_reducer_ms: FALLBACK_REDUCER_MS as i32,
            drift_correction: DriftCorrection::Static,
            control_reference: ControlReference::LiveBand,
        }
    }
}

impl ThermostatConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "startup_delay_s",
            self.startup_delay_s.into(),
            0,
            MAX_DELAY_S.into(),
        )?;
        check_range(
            "settle_delay_s",
            self.settle_delay_s.into(),
            0,
            MAX_DELAY_S.into(),
        )?;
        check_range(
            "evaluation_period_s",
            self.evaluation_period_s.into(),
            1,
            MAX_DELAY_S.into(),
        )?;
        check_range(
            "prime_pulse_ms",
            saturating_i64(self.prime_pulse_ms),
            0,
            MAX_PRIME_PULSE_MS as i64,
        )?;
        check_range(
            "relay_pulse_ms",
            saturating_i64(self.relay_pulse_ms),
            0,
            MAX_RELAY_PULSE_MS as i64,
        )?;
        check_range(
            "drift_reducer_ms",
            self.drift_reducer_ms.into(),
            0,
            MAX_REDUCER_MS.into(),
        )?;
        if !self.default_band.is_valid() {
            return Err(ConfigError::InvalidBand {
                min_c: self.default_band.min_c,
                max_c: self.default_band.max_c,
            });
        }
        Ok(())
    }

    /// Replaces every out-of-range field with its default.
    pub fn sanitize(&mut self) {
        let defaults = Self::default();

        if self.startup_delay_s > MAX_DELAY_S {
            self.startup_delay_s = defaults.startup_delay_s;
        }
        if self.settle_delay_s > MAX_DELAY_S {
            self.settle_delay_s = defaults.settle_delay_s;
        }
        if !(1..=MAX_DELAY_S).contains(&self.evaluation_period_s) {
            self.evaluation_period_s = defaults.evaluation_period_s;
        }
        if self.prime_pulse_ms > MAX_PRIME_PULSE_MS {
            self.prime_pulse_ms = defaults.prime_pulse_ms;
        }
        if self.relay_pulse_ms > MAX_RELAY_PULSE_MS {
            self.relay_pulse_ms = defaults.relay_pulse_ms;
        }
        if !(0..=MAX_REDUCER_MS).contains(&self.drift_reducer_ms) {
            self.drift_reducer_ms = defaults.drift_reducer_ms;
        }
        self.default_band.validate();
    }
}

fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
