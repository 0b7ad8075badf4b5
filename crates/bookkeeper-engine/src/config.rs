use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid engine config: {0}")]
    Invalid(&'static str),
}

/// Tunables for reports and recommendations. Mutations have none.
///
/// Every field has a default, so a partial JSON document only overrides what
/// it names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    low_stock_threshold: u32,
    high_demand_threshold: u32,
    recommendation_window: usize,
    max_recommendations: usize,
    discovery_limit: usize,
    activity_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: 5,
            high_demand_threshold: 5,
            recommendation_window: 50,
            max_recommendations: 5,
            discovery_limit: 2,
            activity_limit: 100,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recommendation_window == 0 {
            return Err(ConfigError::Invalid("recommendation_window must be positive"));
        }
        if self.max_recommendations == 0 {
            return Err(ConfigError::Invalid("max_recommendations must be positive"));
        }
        Ok(())
    }

    pub fn low_stock_threshold(mut self, threshold: u32) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    pub fn high_demand_threshold(mut self, threshold: u32) -> Self {
        self.high_demand_threshold = threshold;
        self
    }

    pub fn recommendation_window(mut self, window: usize) -> Self {
        self.recommendation_window = window;
        self
    }

    pub fn max_recommendations(mut self, max: usize) -> Self {
        self.max_recommendations = max;
        self
    }

    pub fn discovery_limit(mut self, limit: usize) -> Self {
        self.discovery_limit = limit;
        self
    }

    pub fn activity_limit(mut self, limit: usize) -> Self {
        self.activity_limit = limit;
        self
    }

    pub fn get_low_stock_threshold(&self) -> u32 {
        self.low_stock_threshold
    }

    pub fn get_high_demand_threshold(&self) -> u32 {
        self.high_demand_threshold
    }

    pub fn get_recommendation_window(&self) -> usize {
        self.recommendation_window
    }

    pub fn get_max_recommendations(&self) -> usize {
        self.max_recommendations
    }

    pub fn get_discovery_limit(&self) -> usize {
        self.discovery_limit
    }

    pub fn get_activity_limit(&self) -> usize {
        self.activity_limit
    }
}
