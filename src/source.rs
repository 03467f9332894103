// 🗂️ Data sources - the three collection feeds the dashboard can switch between

use crate::error::RecoveryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source - Which feed a record set came from.
/// Selects the normalization rules and the column set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Source {
    #[default]
    Captira,
    Simply,
    Joint,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Captira, Source::Simply, Source::Joint];

    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            Source::Captira => "Captira",
            Source::Simply => "Simply",
            Source::Joint => "Joint",
        }
    }

    /// File the feed is exported to inside the data directory
    pub fn file_name(&self) -> &'static str {
        match self {
            Source::Captira => "captira-dataa.csv",
            Source::Simply => "simply-data.csv",
            Source::Joint => "joint-data.csv",
        }
    }

    /// Next source in tab order (wraps around)
    pub fn next(&self) -> Self {
        match self {
            Source::Captira => Source::Simply,
            Source::Simply => Source::Joint,
            Source::Joint => Source::Captira,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Source {
    type Err = RecoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "captira" => Ok(Source::Captira),
            "simply" => Ok(Source::Simply),
            "joint" => Ok(Source::Joint),
            other => Err(RecoveryError::UnknownSource(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("captira".parse::<Source>().unwrap(), Source::Captira);
        assert_eq!(" SIMPLY ".parse::<Source>().unwrap(), Source::Simply);
        assert_eq!("Joint".parse::<Source>().unwrap(), Source::Joint);
        assert!("bofa".parse::<Source>().is_err());
    }

    #[test]
    fn test_next_cycles_through_all() {
        let mut source = Source::Captira;
        for expected in [Source::Simply, Source::Joint, Source::Captira] {
            source = source.next();
            assert_eq!(source, expected);
        }
    }

    #[test]
    fn test_file_names() {
        assert_eq!(Source::Captira.file_name(), "captira-dataa.csv");
        assert_eq!(Source::Simply.file_name(), "simply-data.csv");
        assert_eq!(Source::Joint.file_name(), "joint-data.csv");
    }

    #[test]
    fn test_default_is_captira() {
        assert_eq!(Source::default(), Source::Captira);
    }
}
