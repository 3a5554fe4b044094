use crate::error::ConfigError;
use chrono::{NaiveTime, Timelike};
use chrono_tz::Tz;
use std::fmt;
use std::str::FromStr;

/// Daily wall-clock trigger time, parsed from "HH:MM".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTime {
    pub hour: u32,
    pub minute: u32,
}

impl ScheduleTime {
    /// Six-field cron expression (seconds first) firing once a day at this time.
    pub fn cron_expression(&self) -> String {
        format!("0 {} {} * * *", self.minute, self.hour)
    }
}

impl FromStr for ScheduleTime {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let time = NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map_err(|_| ConfigError::InvalidScheduleTime(s.to_string()))?;
        Ok(Self {
            hour: time.hour(),
            minute: time.minute(),
        })
    }
}

impl fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::UnknownTimezone(name.to_string()))
}

/// Validated scheduler settings.
#[derive(Debug, Clone)]
pub struct ResolvedSchedule {
    pub time: ScheduleTime,
    pub timezone: Tz,
    pub run_on_startup: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schedule_time() {
        let time: ScheduleTime = "02:00".parse().unwrap();
        assert_eq!(time, ScheduleTime { hour: 2, minute: 0 });
        assert_eq!(time.to_string(), "02:00");

        let time: ScheduleTime = "23:45".parse().unwrap();
        assert_eq!(time.cron_expression(), "0 45 23 * * *");
    }

    #[test]
    fn test_reject_bad_schedule_time() {
        assert!(matches!("25:00".parse::<ScheduleTime>(), Err(ConfigError::InvalidScheduleTime(_))));
        assert!("2am".parse::<ScheduleTime>().is_err());
        assert!("".parse::<ScheduleTime>().is_err());
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("Europe/Paris").unwrap(), chrono_tz::Europe::Paris);
        assert_eq!(parse_timezone("UTC").unwrap(), chrono_tz::UTC);
        assert!(matches!(parse_timezone("Mars/Olympus"), Err(ConfigError::UnknownTimezone(_))));
    }
}
