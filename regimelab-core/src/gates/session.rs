//! Session filter: trade only inside configured UTC hours.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionFilter {
    pub enabled: bool,
    /// First allowed UTC hour (inclusive).
    pub start_hour: u32,
    /// End UTC hour (exclusive).
    pub end_hour: u32,
    pub skip_weekends: bool,
    /// UTC hours vetoed even inside the allowed range.
    pub blocked_hours: Vec<u32>,
}

impl Default for SessionFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            start_hour: 7,
            end_hour: 17,
            skip_weekends: true,
            blocked_hours: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionVeto {
    Weekend,
    OutsideHours,
    BlockedHour,
}

impl fmt::Display for SessionVeto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionVeto::Weekend => "weekend",
            SessionVeto::OutsideHours => "outside session hours",
            SessionVeto::BlockedHour => "blocked hour",
        })
    }
}

impl SessionFilter {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_hour >= self.end_hour || self.end_hour > 24 {
            return Err(ConfigError::OutOfRange {
                field: "session.hours",
                detail: format!(
                    "need start < end <= 24, got {}..{}",
                    self.start_hour, self.end_hour
                ),
            });
        }
        if let Some(h) = self.blocked_hours.iter().find(|h| **h > 23) {
            return Err(ConfigError::OutOfRange {
                field: "session.blocked_hours",
                detail: format!("hour {h} is not in 0..24"),
            });
        }
        Ok(())
    }

    pub fn check(&self, at: DateTime<Utc>) -> Result<(), SessionVeto> {
        if !self.enabled {
            return Ok(());
        }
        if self.skip_weekends && matches!(at.weekday(), Weekday::Sat | Weekday::Sun) {
            return Err(SessionVeto::Weekend);
        }
        let hour = at.hour();
        if hour < self.start_hour || hour >= self.end_hour {
            return Err(SessionVeto::OutsideHours);
        }
        if self.blocked_hours.contains(&hour) {
            return Err(SessionVeto::BlockedHour);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        // 2025-12-01 is a Monday.
        Utc.with_ymd_and_hms(2025, 12, day, hour, 30, 0).unwrap()
    }

    fn enabled() -> SessionFilter {
        SessionFilter {
            enabled: true,
            blocked_hours: vec![10, 11, 12],
            ..SessionFilter::default()
        }
    }

    #[test]
    fn disabled_filter_passes_everything() {
        assert_eq!(SessionFilter::default().check(at(6, 3)), Ok(()));
    }

    #[test]
    fn hours_are_half_open() {
        let f = enabled();
        assert_eq!(f.check(at(1, 6)), Err(SessionVeto::OutsideHours));
        assert_eq!(f.check(at(1, 7)), Ok(()));
        assert_eq!(f.check(at(1, 16)), Ok(()));
        assert_eq!(f.check(at(1, 17)), Err(SessionVeto::OutsideHours));
    }

    #[test]
    fn blocked_hours_and_weekends() {
        let f = enabled();
        assert_eq!(f.check(at(1, 11)), Err(SessionVeto::BlockedHour));
        assert_eq!(f.check(at(6, 9)), Err(SessionVeto::Weekend));
    }

    #[test]
    fn inverted_hours_rejected() {
        let f = SessionFilter {
            start_hour: 17,
            end_hour: 7,
            ..SessionFilter::default()
        };
        assert!(f.validate().is_err());
    }
}
