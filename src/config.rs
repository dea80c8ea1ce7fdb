//! Compiler configuration.
//!
//! Thresholds that vary by corpus are explicit configuration, not
//! hard-coded constants: the fuzzy-match similarity floor and the Tier-2
//! escalation threshold both live here with documented defaults.

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::resolver::FieldResolver`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Minimum Jaro-Winkler similarity for an approximate field-name match.
    /// Acceptable floors vary by corpus; sensible values sit in 0.75–0.85.
    pub similarity_floor: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            similarity_floor: 0.80,
        }
    }
}

/// Configuration for [`crate::matching::MatchingPipeline`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Tier-1 results below this confidence escalate to the semantic
    /// capability.
    pub escalation_threshold: f32,
    /// Bounded timeout applied to every semantic-resolution call.
    pub semantic_timeout_seconds: u64,
    /// Semantic results below this confidence are discarded as unmatched.
    pub semantic_confidence_floor: f32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            escalation_threshold: 0.7,
            semantic_timeout_seconds: 30,
            semantic_confidence_floor: 0.5,
        }
    }
}

/// Top-level compiler configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilerConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_in_documented_ranges() {
        let config = CompilerConfig::default();
        assert!((0.75..=0.85).contains(&config.resolver.similarity_floor));
        assert_eq!(config.matching.escalation_threshold, 0.7);
        assert!(config.matching.semantic_timeout_seconds > 0);
    }

    #[test]
    fn config_roundtrips_through_serde() {
        let config = CompilerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: CompilerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.resolver.similarity_floor, config.resolver.similarity_floor);
    }
}
