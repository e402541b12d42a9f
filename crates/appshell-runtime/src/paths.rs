//! Mapa de public paths das aplicações, derivado do boot config.
//! É entregue explicitamente ao `ModuleLoader` em cada import.

use crate::boot_config::BootConfig;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublicPaths {
    paths: BTreeMap<String, String>,
}

impl PublicPaths {
    /// `{ appKey: publicPath }` para todas as aplicações do boot config
    pub fn from_boot_config(config: &BootConfig) -> Self {
        let paths = config
            .apps
            .iter()
            .map(|(key, app)| (key.clone(), app.public_path.clone()))
            .collect();
        Self { paths }
    }

    pub fn get(&self, app_key: &str) -> Option<&str> {
        self.paths.get(app_key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.paths.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Traduz um especificador "nu" (`<appKey>/<asset>`) para `publicPath + asset`.
    ///
    /// Locators absolutos (com esquema, `/` ou `.`) não são especificadores nus e
    /// retornam `None`, assim como chaves desconhecidas.
    pub fn resolve(&self, specifier: &str) -> Option<String> {
        if specifier.contains("://") || specifier.starts_with('/') || specifier.starts_with('.') {
            return None;
        }

        let (app_key, asset) = specifier.split_once('/').unwrap_or((specifier, ""));
        self.get(app_key).map(|public_path| format!("{public_path}{asset}"))
    }
}
