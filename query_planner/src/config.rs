//! Query planner tuning knobs (§6 "Configuration surface, expanded").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// The defensive margin added to a computed count when a query doesn't
    /// specify an explicit limit (§4.6 step 2: "`sum + 5`", §9). Preserved
    /// as a configurable constant for bug-for-bug compatibility until a
    /// replacement pagination strategy is adopted.
    pub query_limit_pad: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { query_limit_pad: 5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pad_matches_spec_constant() {
        assert_eq!(Config::default().query_limit_pad, 5);
    }
}
