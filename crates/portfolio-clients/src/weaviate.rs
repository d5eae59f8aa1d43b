//! Weaviate REST (`/v1`) client.
//!
//! Covers schema management for datasets and the object operations the post
//! synchronization needs. Objects are inserted without vectors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};

use portfolio_core::{
    defaults, Dataset, DatasetProperty, Error, InsertFailure, PropertyType, Result, VectorStore,
};

/// Ids per batch-delete request.
const DELETE_BATCH_SIZE: usize = 100;

/// Map a dataset property type to a Weaviate data type name.
pub fn to_weaviate_data_type(t: PropertyType) -> &'static str {
    match t {
        PropertyType::Text => "text",
        PropertyType::Number => "number",
        PropertyType::Integer => "int",
        PropertyType::Date => "date",
        PropertyType::Boolean => "boolean",
        PropertyType::GeoCoordinates => "geoCoordinates",
        PropertyType::PhoneNumber => "phoneNumber",
        PropertyType::Uuid => "uuid",
        PropertyType::Blob => "blob",
        PropertyType::Object => "object",
    }
}

/// Map a Weaviate data type name to a dataset property type. Unknown names
/// (arrays, cross-references) map to `Text`.
pub fn from_weaviate_data_type(name: &str) -> PropertyType {
    match name {
        "number" => PropertyType::Number,
        "int" => PropertyType::Integer,
        "date" => PropertyType::Date,
        "boolean" => PropertyType::Boolean,
        "geoCoordinates" => PropertyType::GeoCoordinates,
        "phoneNumber" => PropertyType::PhoneNumber,
        "uuid" => PropertyType::Uuid,
        "blob" => PropertyType::Blob,
        "object" => PropertyType::Object,
        _ => PropertyType::Text,
    }
}

/// Weaviate class (collection) definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaviateClass {
    #[serde(rename = "class")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: Vec<WeaviateProperty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vectorizer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_index_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_index_config: Option<JsonValue>,
}

/// Weaviate property definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaviateProperty {
    pub name: String,
    #[serde(default)]
    pub data_type: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_filterable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_searchable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_config: Option<JsonValue>,
}

impl WeaviateProperty {
    /// True when some vectorizer module is configured and not skipped.
    pub fn is_vectorized(&self) -> bool {
        match &self.module_config {
            Some(JsonValue::Object(modules)) => modules.values().any(|cfg| {
                !cfg.get("skip").and_then(JsonValue::as_bool).unwrap_or(false)
            }),
            _ => false,
        }
    }
}

impl From<WeaviateClass> for Dataset {
    fn from(class: WeaviateClass) -> Self {
        let properties = class
            .properties
            .into_iter()
            .map(|p| DatasetProperty {
                property_type: p
                    .data_type
                    .first()
                    .map(|t| from_weaviate_data_type(t))
                    .unwrap_or_default(),
                is_indexed: p.index_filterable.unwrap_or(true),
                is_vector: p.is_vectorized(),
                description: p.description,
                name: p.name,
            })
            .collect();
        Dataset {
            name: class.name,
            description: class.description,
            properties,
        }
    }
}

impl From<&Dataset> for WeaviateClass {
    fn from(dataset: &Dataset) -> Self {
        WeaviateClass {
            name: dataset.name.clone(),
            description: dataset.description.clone(),
            properties: dataset
                .properties
                .iter()
                .map(|p| WeaviateProperty {
                    name: p.name.clone(),
                    data_type: vec![to_weaviate_data_type(p.property_type).to_string()],
                    description: p.description.clone(),
                    index_filterable: Some(p.is_indexed),
                    index_searchable: Some(p.is_searchable()),
                    module_config: None,
                })
                .collect(),
            vectorizer: Some("none".to_string()),
            vector_index_type: Some("hnsw".to_string()),
            vector_index_config: Some(json!({ "distance": "cosine" })),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SchemaResponse {
    #[serde(default)]
    classes: Vec<WeaviateClass>,
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    #[serde(default)]
    data: Option<JsonValue>,
    #[serde(default)]
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct BatchObjectResult {
    #[serde(default)]
    result: Option<BatchResultErrors>,
}

#[derive(Debug, Default, Deserialize)]
struct BatchResultErrors {
    #[serde(default)]
    errors: Option<BatchErrorList>,
}

#[derive(Debug, Default, Deserialize)]
struct BatchErrorList {
    #[serde(default)]
    error: Vec<GraphQLError>,
}

#[derive(Debug, Deserialize)]
struct BatchDeleteResponse {
    results: BatchDeleteResults,
}

#[derive(Debug, Deserialize)]
struct BatchDeleteResults {
    #[serde(default)]
    successful: usize,
    #[serde(default)]
    failed: usize,
}

/// Class names start with an uppercase letter; property names with a letter
/// or underscore. Both are otherwise `[_0-9A-Za-z]`.
fn is_valid_name(name: &str, class: bool) -> bool {
    let mut chars = name.chars();
    let first_ok = match chars.next() {
        Some(c) if class => c.is_ascii_uppercase(),
        Some(c) => c.is_ascii_alphabetic() || c == '_',
        None => false,
    };
    first_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Configuration for the Weaviate client.
#[derive(Debug, Clone)]
pub struct WeaviateConfig {
    pub host: String,
    pub port: u16,
    pub scheme: String,
    pub token: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for WeaviateConfig {
    fn default() -> Self {
        Self {
            host: defaults::WEAVIATE_HOST.to_string(),
            port: defaults::WEAVIATE_PORT,
            scheme: defaults::WEAVIATE_SCHEME.to_string(),
            token: None,
            timeout_seconds: defaults::WEAVIATE_TIMEOUT_SECS,
        }
    }
}

impl WeaviateConfig {
    /// Load from `WEAVIATE_HOST`, `WEAVIATE_PORT`, `WEAVIATE_SCHEME`,
    /// `WEAVIATE_TOKEN` and `WEAVIATE_TIMEOUT`.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("WEAVIATE_HOST")
                .unwrap_or_else(|_| defaults::WEAVIATE_HOST.to_string()),
            port: std::env::var("WEAVIATE_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::WEAVIATE_PORT),
            scheme: std::env::var("WEAVIATE_SCHEME")
                .unwrap_or_else(|_| defaults::WEAVIATE_SCHEME.to_string()),
            token: std::env::var("WEAVIATE_TOKEN").ok().filter(|t| !t.is_empty()),
            timeout_seconds: std::env::var("WEAVIATE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::WEAVIATE_TIMEOUT_SECS),
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}:{}/v1", self.scheme, self.host, self.port)
    }
}

/// Weaviate REST client.
pub struct WeaviateClient {
    client: Client,
    config: WeaviateConfig,
    base_url: String,
}

impl WeaviateClient {
    pub fn new(config: WeaviateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        let base_url = config.base_url();

        info!(
            subsystem = "clients",
            component = "weaviate",
            base_url = %base_url,
            "Initializing Weaviate client"
        );

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(WeaviateConfig::from_env())
    }

    pub fn config(&self) -> &WeaviateConfig {
        &self.config
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(ref token) = self.config.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> Result<reqwest::Response> {
        req.send()
            .await
            .map_err(|e| Error::Upstream(format!("Weaviate request failed: {}", e)))
    }

    async fn error_for(response: reqwest::Response) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Error::Upstream(format!("Weaviate returned {}: {}", status, body))
    }

    fn check_class_name(name: &str) -> Result<()> {
        if is_valid_name(name, true) {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!("invalid collection name: {name}")))
        }
    }

    /// Every collection in the schema.
    pub async fn list_collections(&self) -> Result<Vec<Dataset>> {
        let response = self.send(self.request(reqwest::Method::GET, "/schema")).await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        let schema: SchemaResponse = response.json().await?;
        Ok(schema.classes.into_iter().map(Dataset::from).collect())
    }

    /// A single collection, or `None` when it does not exist.
    pub async fn get_collection(&self, name: &str) -> Result<Option<Dataset>> {
        if name.is_empty() {
            return Ok(None);
        }
        let response = self
            .send(self.request(reqwest::Method::GET, &format!("/schema/{name}")))
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let class: WeaviateClass = response.json().await?;
                Ok(Some(class.into()))
            }
            _ => Err(Self::error_for(response).await),
        }
    }

    /// Create a collection. A definition Weaviate rejects (for example an
    /// existing name) yields `None`.
    pub async fn create_collection(&self, dataset: &Dataset) -> Result<Option<Dataset>> {
        dataset.validate()?;
        let class = WeaviateClass::from(dataset);
        let response = self
            .send(self.request(reqwest::Method::POST, "/schema").json(&class))
            .await?;
        match response.status() {
            s if s.is_success() => {
                info!(
                    subsystem = "clients",
                    component = "weaviate",
                    collection = %dataset.name,
                    "Collection created"
                );
                Ok(Some(dataset.clone()))
            }
            StatusCode::UNPROCESSABLE_ENTITY => {
                let body = response.text().await.unwrap_or_default();
                warn!(
                    subsystem = "clients",
                    component = "weaviate",
                    collection = %dataset.name,
                    error = %body,
                    "Collection definition rejected"
                );
                Ok(None)
            }
            _ => Err(Self::error_for(response).await),
        }
    }

    /// Delete a collection. Missing collections yield `None`.
    pub async fn delete_collection(&self, name: &str) -> Result<Option<Dataset>> {
        if !self.collection_exists(name).await? {
            return Ok(None);
        }
        let response = self
            .send(self.request(reqwest::Method::DELETE, &format!("/schema/{name}")))
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        info!(
            subsystem = "clients",
            component = "weaviate",
            collection = name,
            "Collection deleted"
        );
        Ok(Some(Dataset::named(name)))
    }

    /// Ids of objects in `collection` whose text `property` equals `value`.
    pub async fn find_object_ids(
        &self,
        collection: &str,
        property: &str,
        value: &str,
    ) -> Result<Vec<String>> {
        Self::check_class_name(collection)?;
        if !is_valid_name(property, false) {
            return Err(Error::InvalidInput(format!("invalid property name: {property}")));
        }
        let query = format!(
            "{{ Get {{ {collection}(where: {{path: [\"{property}\"], operator: Equal, valueText: {value}}}, limit: {limit}) {{ _additional {{ id }} }} }} }}",
            value = serde_json::to_string(value)?,
            limit = defaults::WEAVIATE_QUERY_LIMIT,
        );

        let response = self
            .send(
                self.request(reqwest::Method::POST, "/graphql")
                    .json(&json!({ "query": query })),
            )
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        let body: GraphQLResponse = response.json().await?;
        if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(Error::Upstream(format!(
                "Weaviate query failed: {}",
                messages.join("; ")
            )));
        }

        let ids = body
            .data
            .as_ref()
            .and_then(|d| d.pointer(&format!("/Get/{collection}")))
            .and_then(JsonValue::as_array)
            .map(|objects| {
                objects
                    .iter()
                    .filter_map(|o| o.pointer("/_additional/id").and_then(JsonValue::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }
}

#[async_trait]
impl VectorStore for WeaviateClient {
    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        Ok(self.get_collection(collection).await?.is_some())
    }

    async fn object_ids_for_post(&self, collection: &str, post_id: i64) -> Result<Vec<String>> {
        self.find_object_ids(collection, "postId", &post_id.to_string())
            .await
    }

    async fn insert_objects(
        &self,
        collection: &str,
        properties: Vec<JsonValue>,
    ) -> Result<Vec<InsertFailure>> {
        if properties.is_empty() {
            return Ok(Vec::new());
        }
        let count = properties.len();
        let objects: Vec<JsonValue> = properties
            .into_iter()
            .map(|p| json!({ "class": collection, "properties": p }))
            .collect();

        let response = self
            .send(
                self.request(reqwest::Method::POST, "/batch/objects")
                    .json(&json!({ "objects": objects })),
            )
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        let results: Vec<BatchObjectResult> = response.json().await?;

        let failures: Vec<InsertFailure> = results
            .into_iter()
            .enumerate()
            .filter_map(|(index, r)| {
                let errors = r.result?.errors?.error;
                if errors.is_empty() {
                    return None;
                }
                let message = errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; ");
                Some(InsertFailure { index, message })
            })
            .collect();

        debug!(
            subsystem = "clients",
            component = "weaviate",
            collection,
            result_count = count,
            failed = failures.len(),
            "Batch insert finished"
        );
        Ok(failures)
    }

    async fn delete_objects(&self, collection: &str, ids: &[String]) -> Result<usize> {
        let mut deleted = 0;
        for batch in ids.chunks(DELETE_BATCH_SIZE) {
            let mut operands: Vec<JsonValue> = batch
                .iter()
                .map(|id| json!({ "path": ["id"], "operator": "Equal", "valueText": id }))
                .collect();
            let filter = if operands.len() == 1 {
                operands.remove(0)
            } else {
                json!({ "operator": "Or", "operands": operands })
            };
            let body = json!({
                "match": { "class": collection, "where": filter },
                "output": "minimal",
            });

            let response = self
                .send(self.request(reqwest::Method::DELETE, "/batch/objects").json(&body))
                .await?;
            if !response.status().is_success() {
                return Err(Self::error_for(response).await);
            }
            let result: BatchDeleteResponse = response.json().await?;
            if result.results.failed > 0 {
                warn!(
                    subsystem = "clients",
                    component = "weaviate",
                    collection,
                    failed = result.results.failed,
                    "Some objects could not be deleted"
                );
            }
            deleted += result.results.successful;
        }
        Ok(deleted)
    }
}
