//! API and documentation catalogs served at `/apis` and `/docs`.
//!
//! Both are read from JSON files on every request so they can be edited
//! without a restart.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Placeholder in endpoint URLs replaced by the request's `Host`.
pub const HOST_PLACEHOLDER: &str = "[YOUR_HOST]";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCatalog {
    pub message: String,
    #[serde(default)]
    pub endpoints: Vec<Value>,
}

impl Default for ApiCatalog {
    fn default() -> Self {
        Self {
            message: "Available API Endpoints".to_string(),
            endpoints: Vec::new(),
        }
    }
}

impl ApiCatalog {
    /// Replace the host placeholder in every endpoint's `url`.
    pub fn with_host(mut self, host: &str) -> Self {
        for endpoint in &mut self.endpoints {
            if let Some(Value::String(url)) = endpoint.get_mut("url") {
                *url = url.replace(HOST_PLACEHOLDER, host);
            }
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocsCatalog {
    pub message: String,
    pub documentations: Value,
}

/// Reads `apis.json` and `docs.json` from a directory.
#[derive(Debug, Clone)]
pub struct Catalog {
    dir: PathBuf,
}

impl Catalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The API catalog; the default catalog when the file is unusable.
    pub async fn apis(&self) -> ApiCatalog {
        match read_json::<ApiCatalog>(&self.dir.join("apis.json")).await {
            Ok(catalog) => {
                debug!(endpoints = catalog.endpoints.len(), "Loaded API endpoints from apis.json");
                catalog
            }
            Err(e) => {
                warn!(error = %e, "Error loading apis.json");
                ApiCatalog::default()
            }
        }
    }

    /// The documentation list; empty when the file is unusable.
    pub async fn docs(&self) -> DocsCatalog {
        let documentations = read_json::<Value>(&self.dir.join("docs.json"))
            .await
            .unwrap_or_else(|e| {
                debug!(error = %e, "No documentation catalog");
                Value::Array(Vec::new())
            });
        DocsCatalog {
            message: "Available Documents".to_string(),
            documentations,
        }
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&raw).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })
}
