use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Granularity of consumption records, sent to the API as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Minutes,
    Hourly,
    Daily,
    Monthly,
    Quarterly,
}

impl Aggregation {
    pub const ALL: [Aggregation; 5] = [
        Aggregation::Minutes,
        Aggregation::Hourly,
        Aggregation::Daily,
        Aggregation::Monthly,
        Aggregation::Quarterly,
    ];

    pub fn code(&self) -> u8 {
        match self {
            Aggregation::Minutes => 1,
            Aggregation::Hourly => 2,
            Aggregation::Daily => 3,
            Aggregation::Monthly => 4,
            Aggregation::Quarterly => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.code() == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_the_api() {
        assert_eq!(Aggregation::Minutes.code(), 1);
        assert_eq!(Aggregation::Hourly.code(), 2);
        assert_eq!(Aggregation::Daily.code(), 3);
        assert_eq!(Aggregation::Monthly.code(), 4);
        assert_eq!(Aggregation::Quarterly.code(), 5);
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert_eq!(Aggregation::from_code(4), Some(Aggregation::Monthly));
        assert_eq!(Aggregation::from_code(0), None);
        assert_eq!(Aggregation::from_code(6), None);
    }
}
