//! Collection configuration.

use std::time::Duration;

use ferry_core::KeyExtractor;
use ferry_mutation::{DeliveryStrategy, MutationType};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::strategy::OperationKind;

const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Retry schedule handed to the offline runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Replays attempted after the first failure.
    pub attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 2 }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero-based): 1s, 4s, 16s, capped at 30s.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ms = 4u64
            .saturating_pow(attempt)
            .saturating_mul(1000)
            .min(MAX_RETRY_DELAY_MS);
        Duration::from_millis(ms)
    }

    /// Whether another replay is allowed after `failures` failed ones.
    pub fn allows_retry(&self, failures: u32) -> bool {
        failures <= self.attempts
    }
}

/// Configuration of one offline-capable collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionConfig {
    pub name: String,
    #[serde(default)]
    pub on_insert: Option<DeliveryStrategy>,
    #[serde(default)]
    pub on_update: Option<DeliveryStrategy>,
    #[serde(default)]
    pub on_delete: Option<DeliveryStrategy>,
    #[serde(default = "default_key_field")]
    pub key_field: String,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_key_field() -> String {
    "id".to_string()
}

impl CollectionConfig {
    /// A collection with no operation configured.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            on_insert: None,
            on_update: None,
            on_delete: None,
            key_field: default_key_field(),
            retry: RetryPolicy::default(),
        }
    }

    /// Parse a JSON configuration.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_insert(mut self, strategy: DeliveryStrategy) -> Self {
        self.on_insert = Some(strategy);
        self
    }

    pub fn with_update(mut self, strategy: DeliveryStrategy) -> Self {
        self.on_update = Some(strategy);
        self
    }

    pub fn with_delete(mut self, strategy: DeliveryStrategy) -> Self {
        self.on_delete = Some(strategy);
        self
    }

    pub fn with_key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = field.into();
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        Ok(())
    }

    /// Strategy configured for `operation`, if any.
    pub fn strategy_for(&self, operation: OperationKind) -> Option<DeliveryStrategy> {
        match operation {
            OperationKind::Insert => self.on_insert,
            OperationKind::Update => self.on_update,
            OperationKind::Delete => self.on_delete,
        }
    }

    /// Mutation types whose endpoint must exist.
    pub fn required_endpoints(&self) -> Vec<MutationType> {
        OperationKind::ALL
            .into_iter()
            .filter(|op| self.strategy_for(*op).is_some())
            .map(OperationKind::mutation_type)
            .collect()
    }

    /// Name the offline runtime knows this collection's sync function by.
    pub fn mutation_fn_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => format!("sync{}{}", first.to_uppercase(), chars.as_str()),
            None => "sync".to_string(),
        }
    }

    pub fn key_extractor(&self) -> KeyExtractor {
        KeyExtractor::field(self.key_field.clone())
    }
}
