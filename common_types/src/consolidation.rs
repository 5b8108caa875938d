//! The read-time reduction applied to a stored bin (GLOSSARY: Consolidation).

use std::{fmt, str::FromStr};

use crate::error::{Error, ParseConsolidationSnafu};

/// A read-time reduction function, selected per query.
///
/// `query_base_rate` only accepts `Average`/`Delta`; `query_aggregation`
/// only accepts `Average`/`Min`/`Max`/`Raw`. Which subset is valid for a
/// given operation is enforced by the query planner, not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Consolidation {
    Average,
    Delta,
    Min,
    Max,
    Raw,
}

impl Consolidation {
    /// The substitute applied when an invalid consolidation argument is
    /// supplied to `query_base_rate` (§7 "Invalid consolidation/query
    /// argument").
    pub const BASE_RATE_DEFAULT: Self = Self::Average;

    /// The substitute applied when an invalid consolidation argument is
    /// supplied to `query_aggregation` (§7).
    pub const AGGREGATION_DEFAULT: Self = Self::Average;
}

impl fmt::Display for Consolidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Average => "average",
            Self::Delta => "delta",
            Self::Min => "min",
            Self::Max => "max",
            Self::Raw => "raw",
        };
        f.write_str(s)
    }
}

impl FromStr for Consolidation {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "average" => Ok(Self::Average),
            "delta" => Ok(Self::Delta),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "raw" => Ok(Self::Raw),
            _ => ParseConsolidationSnafu { input: s.to_string() }.fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display_and_parse() {
        for c in [
            Consolidation::Average,
            Consolidation::Delta,
            Consolidation::Min,
            Consolidation::Max,
            Consolidation::Raw,
        ] {
            assert_eq!(c.to_string().parse::<Consolidation>().unwrap(), c);
        }
    }

    #[test]
    fn rejects_unknown_names() {
        let err = "bogus".parse::<Consolidation>().unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }
}
