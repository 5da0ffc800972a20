//! Tunables for rename inference, code generation and the service client.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::MigrateError;
use crate::types::Confidence;

/// Similarity thresholds for the rename confidence tiers.
///
/// Tiers are checked from High down; the first one satisfied wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RenameThresholds {
    /// High when name similarity alone reaches this.
    pub high_name: f64,
    /// High when name similarity reaches this and relations reach `high_relations`.
    pub high_name_with_relations: f64,
    pub high_relations: f64,
    pub medium_name: f64,
    pub medium_relations: f64,
    pub low_name: f64,
    pub low_relations: f64,
}

impl Default for RenameThresholds {
    fn default() -> Self {
        Self {
            high_name: 0.70,
            high_name_with_relations: 0.40,
            high_relations: 0.70,
            medium_name: 0.30,
            medium_relations: 0.70,
            low_name: 0.20,
            low_relations: 0.50,
        }
    }
}

impl RenameThresholds {
    pub fn with_high(mut self, name: f64, name_with_relations: f64, relations: f64) -> Self {
        self.high_name = name;
        self.high_name_with_relations = name_with_relations;
        self.high_relations = relations;
        self
    }

    pub fn with_medium(mut self, name: f64, relations: f64) -> Self {
        self.medium_name = name;
        self.medium_relations = relations;
        self
    }

    pub fn with_low(mut self, name: f64, relations: f64) -> Self {
        self.low_name = name;
        self.low_relations = relations;
        self
    }

    /// Assign a tier from a name similarity and a relation-set similarity.
    pub fn tier(&self, name_similarity: f64, relation_similarity: f64) -> Confidence {
        if name_similarity >= self.high_name
            || (name_similarity >= self.high_name_with_relations
                && relation_similarity >= self.high_relations)
        {
            Confidence::High
        } else if name_similarity >= self.medium_name
            || relation_similarity >= self.medium_relations
        {
            Confidence::Medium
        } else if name_similarity >= self.low_name || relation_similarity >= self.low_relations {
            Confidence::Low
        } else {
            Confidence::None
        }
    }
}

/// Settings for generated migration programs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Path the generated program uses to reach this crate.
    pub crate_path: String,
    /// Path of the function that turns a `ClientConfig` into a boxed client.
    pub client_factory: String,
    pub batch_size: usize,
}

pub const DEFAULT_BATCH_SIZE: usize = 100;

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            crate_path: "fga_migrate".to_string(),
            client_factory: "migration_client::connect".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl GeneratorConfig {
    pub fn with_crate_path(mut self, path: impl Into<String>) -> Self {
        self.crate_path = path.into();
        self
    }

    pub fn with_client_factory(mut self, path: impl Into<String>) -> Self {
        self.client_factory = path.into();
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }
}

pub const ENV_API_URL: &str = "FGA_API_URL";
pub const ENV_STORE_ID: &str = "FGA_STORE_ID";
pub const ENV_API_TOKEN: &str = "FGA_API_TOKEN";

/// Connection settings handed to the client factory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Default::default()
        }
    }

    pub fn with_store_id(mut self, store_id: impl Into<String>) -> Self {
        self.store_id = Some(store_id.into());
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn from_env() -> Result<Self, MigrateError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, MigrateError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let api_url = get(ENV_API_URL).ok_or_else(|| {
            MigrateError::ServiceUnavailable(format!("{ENV_API_URL} is not set"))
        })?;
        Ok(Self {
            api_url,
            store_id: get(ENV_STORE_ID),
            api_token: get(ENV_API_TOKEN),
        })
    }
}
