//! Boot descriptor: modelo de dados e carregamento (HTTP ou disco)

use crate::error::ShellError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub name: String,
    pub surname: String,
}

/// Onde uma aplicação está hospedada e qual o arquivo de entrada
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppDescriptor {
    #[serde(rename = "publicPath")]
    pub public_path: String,
    pub main: String,
}

impl AppDescriptor {
    pub fn new(public_path: impl Into<String>, main: impl Into<String>) -> Self {
        Self {
            public_path: public_path.into(),
            main: main.into(),
        }
    }

    /// Locator do módulo: `publicPath` concatenado com `main`
    pub fn locator(&self) -> String {
        format!("{}{}", self.public_path, self.main)
    }
}

/// Configuração de boot. Não é validada além do parse JSON: um descriptor sem
/// `apps` vira um mapa vazio e o erro aparece depois, no lookup da aplicação.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct BootConfig {
    pub user: User,
    pub apps: BTreeMap<String, AppDescriptor>,
}

impl BootConfig {
    pub fn app(&self, key: &str) -> Option<&AppDescriptor> {
        self.apps.get(key)
    }

    pub fn from_json(location: &str, bytes: &[u8]) -> Result<Self, ShellError> {
        serde_json::from_slice(bytes).map_err(|source| ShellError::ConfigParse {
            location: location.to_string(),
            source,
        })
    }
}

/// Carrega o boot descriptor. Sem retry e sem cache.
#[derive(Debug, Clone, Default)]
pub struct BootConfigLoader {
    client: reqwest::Client,
}

impl BootConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Busca e faz o parse do descriptor em `entry_point` (URL http(s), `file://` ou caminho)
    pub async fn load(&self, entry_point: &str) -> Result<BootConfig, ShellError> {
        let body = if is_http(entry_point) {
            self.fetch(entry_point).await?
        } else {
            read_file(entry_point).await?
        };

        BootConfig::from_json(entry_point, &body)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ShellError> {
        let fetch_err = |source| ShellError::ConfigFetch {
            location: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(fetch_err)?;

        // O status não é interpretado: o corpo decide se o descriptor é válido
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, url, "boot config respondeu com status não-2xx");
        }

        let bytes = response.bytes().await.map_err(fetch_err)?;
        Ok(bytes.to_vec())
    }
}

pub(crate) fn is_http(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

pub(crate) fn strip_file_scheme(location: &str) -> &str {
    location.strip_prefix("file://").unwrap_or(location)
}

async fn read_file(location: &str) -> Result<Vec<u8>, ShellError> {
    let path = Path::new(strip_file_scheme(location));
    tokio::fs::read(path)
        .await
        .map_err(|source| ShellError::ConfigRead {
            location: location.to_string(),
            source,
        })
}
