use serde::{Deserialize, Serialize};

use concord_merge::{AgreementOnly, IncludeIncomplete, MergeStrategy, ThresholdStrategy};
use concord_schema::LinkCompareBehavior;

use crate::error::SdkResult;

/// Which built-in strategy a session merges with.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Only positions every annotator agrees on.
    #[default]
    AgreementOnly,
    /// Agreeing positions plus positions a single annotator covered.
    IncludeIncomplete,
    /// Majority vote.
    Threshold(ThresholdStrategy),
}

impl StrategyConfig {
    /// Build the configured strategy.
    pub fn build(&self) -> Box<dyn MergeStrategy> {
        match self {
            Self::AgreementOnly => Box::new(AgreementOnly),
            Self::IncludeIncomplete => Box::new(IncludeIncomplete),
            Self::Threshold(strategy) => Box::new(strategy.clone()),
        }
    }
}

/// Configuration of a curation session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationConfig {
    /// Which value of a link is compared. Diff and merge always share it.
    pub link_compare_behavior: LinkCompareBehavior,
    /// The strategy used by [`CurationSession::merge`](crate::CurationSession::merge).
    pub strategy: StrategyConfig,
    /// Empty the target before every merge pass.
    pub clear_target_before_merge: bool,
    /// Stop a pass at the first unsupported layer configuration.
    pub abort_on_configuration_error: bool,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            link_compare_behavior: LinkCompareBehavior::default(),
            strategy: StrategyConfig::default(),
            clear_target_before_merge: false,
            abort_on_configuration_error: true,
        }
    }
}

impl CurationConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// The same configuration with another strategy.
    pub fn with_strategy(mut self, strategy: StrategyConfig) -> Self {
        self.strategy = strategy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = CurationConfig::default();
        assert_eq!(c.link_compare_behavior, LinkCompareBehavior::TargetAsLabel);
        assert_eq!(c.strategy, StrategyConfig::AgreementOnly);
        assert!(!c.clear_target_before_merge);
        assert!(c.abort_on_configuration_error);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(CurationConfig::from_toml_str("").unwrap(), CurationConfig::default());
    }

    #[test]
    fn threshold_from_toml() {
        let c = CurationConfig::from_toml_str(
            r#"
            link_compare_behavior = "role_as_label"
            clear_target_before_merge = true

            [strategy]
            kind = "threshold"
            min_votes = 2
            min_share = 0.6
            "#,
        )
        .unwrap();
        assert_eq!(c.link_compare_behavior, LinkCompareBehavior::RoleAsLabel);
        assert!(c.clear_target_before_merge);
        assert!(c.abort_on_configuration_error);
        assert_eq!(
            c.strategy,
            StrategyConfig::Threshold(ThresholdStrategy {
                min_votes: 2,
                min_share: 0.6,
                include_incomplete: false,
            })
        );
        assert_eq!(c.strategy.build().name(), "threshold");
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let err = CurationConfig::from_toml_str("[strategy]\nkind = \"coin_flip\"\n").unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
    }

    #[test]
    fn strategy_names() {
        assert_eq!(StrategyConfig::AgreementOnly.build().name(), "agreement-only");
        assert_eq!(StrategyConfig::IncludeIncomplete.build().name(), "include-incomplete");
    }
}
