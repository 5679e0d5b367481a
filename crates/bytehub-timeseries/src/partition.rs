//! Partition granularity for stored series.
//!
//! Partitions are laid out Hive-style (`date=2024-03-05`, `month=2024-03`,
//! `year=2024`). Keys sort lexicographically in time order, which lets a
//! loader skip partitions outside a requested range by comparing keys.

use std::fmt;
use std::str::FromStr;

use bytehub_core::DBDateTime;

use crate::error::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Partition {
    #[default]
    Date,
    Month,
    Year,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Date => "date",
            Partition::Month => "month",
            Partition::Year => "year",
        }
    }

    /// Partition key for a timestamp
    pub fn key(&self, ts: DBDateTime) -> String {
        match self {
            Partition::Date => ts.format("%Y-%m-%d").to_string(),
            Partition::Month => ts.format("%Y-%m").to_string(),
            Partition::Year => ts.format("%Y").to_string(),
        }
    }

    /// Directory name (`<granularity>=<key>`) for a timestamp
    pub fn dir_name(&self, ts: DBDateTime) -> String {
        format!("{}={}", self.as_str(), self.key(ts))
    }

    /// Extract the key from a directory name written by [`Partition::dir_name`]
    pub fn parse_dir_name<'a>(&self, dir_name: &'a str) -> Option<&'a str> {
        dir_name
            .strip_prefix(self.as_str())
            .and_then(|rest| rest.strip_prefix('='))
    }
}

impl FromStr for Partition {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date" => Ok(Partition::Date),
            "month" => Ok(Partition::Month),
            "year" => Ok(Partition::Year),
            other => Err(BackendError::InvalidPartition(format!(
                "unknown partition {:?}, expected date, month or year",
                other
            ))),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_partition_keys() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        assert_eq!(Partition::Date.dir_name(ts), "date=2024-03-05");
        assert_eq!(Partition::Month.dir_name(ts), "month=2024-03");
        assert_eq!(Partition::Year.dir_name(ts), "year=2024");
    }

    #[test]
    fn test_parse_dir_name() {
        assert_eq!(Partition::Date.parse_dir_name("date=2024-03-05"), Some("2024-03-05"));
        assert_eq!(Partition::Date.parse_dir_name("month=2024-03"), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("month".parse::<Partition>().unwrap(), Partition::Month);
        assert!("hour".parse::<Partition>().is_err());
    }
}
