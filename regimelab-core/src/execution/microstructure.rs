//! Session and volatility scaling of spread and slippage.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::regime::VolatilityState;

/// UTC trading session by hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionBucket {
    /// [00:00, 07:00)
    Asia,
    /// [07:00, 13:00)
    London,
    /// [13:00, 21:00)
    NewYork,
    /// [21:00, 24:00)
    OffHours,
}

impl SessionBucket {
    pub fn at(at: DateTime<Utc>) -> Self {
        match at.hour() {
            0..=6 => SessionBucket::Asia,
            7..=12 => SessionBucket::London,
            13..=20 => SessionBucket::NewYork,
            _ => SessionBucket::OffHours,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicrostructureConfig {
    pub enabled: bool,
    pub asia: f64,
    pub london: f64,
    pub new_york: f64,
    pub off_hours: f64,
    pub compression: f64,
    pub normal: f64,
    pub expansion: f64,
    pub extreme_expansion: f64,
}

impl Default for MicrostructureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            asia: 1.1,
            london: 1.0,
            new_york: 1.1,
            off_hours: 1.3,
            compression: 0.8,
            normal: 1.0,
            expansion: 1.3,
            extreme_expansion: 1.6,
        }
    }
}

impl MicrostructureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("execution.microstructure.asia", self.asia),
            ("execution.microstructure.london", self.london),
            ("execution.microstructure.new_york", self.new_york),
            ("execution.microstructure.off_hours", self.off_hours),
            ("execution.microstructure.compression", self.compression),
            ("execution.microstructure.normal", self.normal),
            ("execution.microstructure.expansion", self.expansion),
            ("execution.microstructure.extreme_expansion", self.extreme_expansion),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        Ok(())
    }

    pub fn session_multiplier(&self, bucket: SessionBucket) -> f64 {
        match bucket {
            SessionBucket::Asia => self.asia,
            SessionBucket::London => self.london,
            SessionBucket::NewYork => self.new_york,
            SessionBucket::OffHours => self.off_hours,
        }
    }

    pub fn volatility_multiplier(&self, state: VolatilityState) -> f64 {
        match state {
            VolatilityState::Compression => self.compression,
            VolatilityState::Normal => self.normal,
            VolatilityState::Expansion => self.expansion,
            VolatilityState::ExtremeExpansion => self.extreme_expansion,
        }
    }

    /// Combined factor applied to both spread and slippage. 1.0 when disabled.
    pub fn multiplier(&self, at: DateTime<Utc>, volatility: VolatilityState) -> f64 {
        if !self.enabled {
            return 1.0;
        }
        self.session_multiplier(SessionBucket::at(at)) * self.volatility_multiplier(volatility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 2, h, 0, 0).unwrap()
    }

    #[test]
    fn session_buckets() {
        assert_eq!(SessionBucket::at(at(0)), SessionBucket::Asia);
        assert_eq!(SessionBucket::at(at(6)), SessionBucket::Asia);
        assert_eq!(SessionBucket::at(at(7)), SessionBucket::London);
        assert_eq!(SessionBucket::at(at(13)), SessionBucket::NewYork);
        assert_eq!(SessionBucket::at(at(21)), SessionBucket::OffHours);
    }

    #[test]
    fn multipliers_compose() {
        let ms = MicrostructureConfig::default();
        assert!((ms.multiplier(at(22), VolatilityState::ExtremeExpansion) - 1.3 * 1.6).abs() < 1e-12);
        assert!((ms.multiplier(at(9), VolatilityState::Normal) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn disabled_is_identity() {
        let ms = MicrostructureConfig {
            enabled: false,
            ..MicrostructureConfig::default()
        };
        assert_eq!(ms.multiplier(at(22), VolatilityState::ExtremeExpansion), 1.0);
    }
}
