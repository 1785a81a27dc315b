use super::types::{Dimension, Metric, Relationship, SemanticModel};
use crate::api::{ApiClient, ApiError};
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

const MODELS_PATH: &[&str] = &["api", "modeling", "definitions"];

/// An entity stored under `/api/semantic/{collection}`.
pub trait SemanticEntity: Serialize + DeserializeOwned {
    /// Path segment and list key, e.g. `metrics`.
    const COLLECTION: &'static str;
    /// Key wrapping a single entity in responses, e.g. `metric`.
    const SINGULAR: &'static str;

    fn validate(&self) -> Vec<String>;
}

impl SemanticEntity for Metric {
    const COLLECTION: &'static str = "metrics";
    const SINGULAR: &'static str = "metric";

    fn validate(&self) -> Vec<String> {
        Metric::validate(self)
    }
}

impl SemanticEntity for Dimension {
    const COLLECTION: &'static str = "dimensions";
    const SINGULAR: &'static str = "dimension";

    fn validate(&self) -> Vec<String> {
        Dimension::validate(self)
    }
}

impl SemanticEntity for Relationship {
    const COLLECTION: &'static str = "relationships";
    const SINGULAR: &'static str = "relationship";

    fn validate(&self) -> Vec<String> {
        Relationship::validate(self)
    }
}

/// Pull `key` out of a wrapped response (`{"metrics": [...]}`), or take the
/// body as-is when the backend returns it bare.
fn unwrap_key<T: DeserializeOwned>(mut body: Value, key: &str) -> Result<T, ApiError> {
    let inner = if body.get(key).is_some() {
        body[key].take()
    } else {
        body
    };
    Ok(serde_json::from_value(inner)?)
}

pub struct SemanticClient<'a> {
    api: &'a ApiClient,
}

impl<'a> SemanticClient<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    pub async fn list<E: SemanticEntity>(&self) -> Result<Vec<E>, ApiError> {
        let body: Value = self
            .api
            .get(&["api", "semantic", E::COLLECTION])
            .await?;
        unwrap_key(body, E::COLLECTION)
    }

    pub async fn create<E: SemanticEntity>(&self, entity: &E) -> Result<E> {
        let errors = entity.validate();
        if !errors.is_empty() {
            bail!(errors.join("; "));
        }
        let body: Value = self
            .api
            .post(&["api", "semantic", E::COLLECTION], entity)
            .await
            .with_context(|| format!("Failed to create {}", E::SINGULAR))?;
        let created: E = unwrap_key(body, E::SINGULAR)?;
        info!(kind = E::SINGULAR, "semantic entity created");
        Ok(created)
    }

    pub async fn delete<E: SemanticEntity>(&self, id: &str) -> Result<(), ApiError> {
        self.api
            .delete(&["api", "semantic", E::COLLECTION, id])
            .await
    }

    pub async fn list_models(&self) -> Result<Vec<SemanticModel>, ApiError> {
        let body: Value = self.api.get(MODELS_PATH).await?;
        unwrap_key(body, "definitions")
    }

    pub async fn get_model(&self, id: &str) -> Result<SemanticModel, ApiError> {
        let body: Value = self
            .api
            .get(&["api", "modeling", "definitions", id])
            .await?;
        unwrap_key(body, "definition")
    }

    pub async fn create_model(&self, model: &SemanticModel) -> Result<SemanticModel> {
        let errors = model.validate();
        if !errors.is_empty() {
            bail!(errors.join("; "));
        }
        let body: Value = self
            .api
            .post(MODELS_PATH, model)
            .await
            .context("Failed to create semantic model")?;
        Ok(unwrap_key(body, "definition")?)
    }

    pub async fn delete_model(&self, id: &str) -> Result<(), ApiError> {
        self.api
            .delete(&["api", "modeling", "definitions", id])
            .await
    }

    pub async fn add_model_metric(&self, model_id: &str, metric: &Metric) -> Result<Metric> {
        let errors = metric.validate();
        if !errors.is_empty() {
            bail!(errors.join("; "));
        }
        let path = ["api", "modeling", "definitions", model_id, "metrics"];
        let body: Value = self
            .api
            .post(&path, metric)
            .await
            .context("Failed to add metric to model")?;
        Ok(unwrap_key(body, "metric")?)
    }
}
