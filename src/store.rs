//! Persistence of parsed recipes in a managed relational store.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::http::{decode_json, ensure_success, request_with_retry, RetryPolicy};
use crate::model::ParsedRecipe;
use crate::RecipeError;

const SERVICE: &str = "store";

/// A recipe row as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecipe {
    pub id: String,
    #[serde(flatten)]
    pub recipe: ParsedRecipe,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn insert(&self, recipe: &ParsedRecipe) -> Result<StoredRecipe, RecipeError>;
    async fn get(&self, id: &str) -> Result<Option<StoredRecipe>, RecipeError>;
    async fn list(&self) -> Result<Vec<StoredRecipe>, RecipeError>;
    async fn delete(&self, id: &str) -> Result<(), RecipeError>;
}

/// PostgREST-style store: rows live at `/rest/v1/<table>`.
pub struct RestRecipeStore {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
    retry: RetryPolicy,
}

impl RestRecipeStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            table: config.table.clone(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, self.table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

#[async_trait]
impl RecipeStore for RestRecipeStore {
    async fn insert(&self, recipe: &ParsedRecipe) -> Result<StoredRecipe, RecipeError> {
        let response = request_with_retry(&self.retry, || {
            self.request(Method::POST)
                .header("Prefer", "return=representation")
                .json(recipe)
        })
        .await?;
        let rows: Vec<StoredRecipe> =
            decode_json(SERVICE, ensure_success(SERVICE, response).await?).await?;

        let stored = rows
            .into_iter()
            .next()
            .ok_or_else(|| RecipeError::Store("insert returned no rows".to_string()))?;
        info!("Saved recipe '{}' as {}", stored.recipe.title, stored.id);
        Ok(stored)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredRecipe>, RecipeError> {
        let filter = format!("eq.{id}");
        let response = request_with_retry(&self.retry, || {
            self.request(Method::GET)
                .query(&[("id", filter.as_str()), ("select", "*")])
        })
        .await?;
        let rows: Vec<StoredRecipe> =
            decode_json(SERVICE, ensure_success(SERVICE, response).await?).await?;
        debug!("Lookup of {} returned {} rows", id, rows.len());
        Ok(rows.into_iter().next())
    }

    async fn list(&self) -> Result<Vec<StoredRecipe>, RecipeError> {
        let response = request_with_retry(&self.retry, || {
            self.request(Method::GET)
                .query(&[("select", "*"), ("order", "created_at.desc")])
        })
        .await?;
        decode_json(SERVICE, ensure_success(SERVICE, response).await?).await
    }

    async fn delete(&self, id: &str) -> Result<(), RecipeError> {
        let filter = format!("eq.{id}");
        let response = request_with_retry(&self.retry, || {
            self.request(Method::DELETE).query(&[("id", filter.as_str())])
        })
        .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RecipeError::Store(format!("recipe {id} not found")));
        }
        ensure_success(SERVICE, response).await?;
        info!("Deleted recipe {}", id);
        Ok(())
    }
}
