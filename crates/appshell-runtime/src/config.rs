//! Configuração do shell (arquivo TOML + overrides da linha de comando)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ShellConfig {
    /// Locator do boot descriptor (URL ou caminho)
    pub boot_config: Option<String>,

    /// Identificador do ponto de montagem entregue às aplicações
    pub mount_point: Option<String>,

    /// Filtro de log no formato do `EnvFilter` (ex.: "info,appshell::app=debug")
    pub log_filter: Option<String>,
}

/// Configuração com os dois valores obrigatórios garantidos
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub boot_config: String,
    pub mount_point: String,
}

impl ShellConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Falha ao ler configuração '{}'", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Configuração inválida em '{}'", path.display()))
    }

    /// Carrega `path` se existir; sem arquivo, configuração vazia
    pub fn load_if_exists(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// `<config_dir>/appshell/shell.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("appshell").join("shell.toml"))
    }

    /// Valores de `other` que estiverem presentes têm prioridade
    pub fn merge(self, other: ShellConfig) -> Self {
        Self {
            boot_config: other.boot_config.or(self.boot_config),
            mount_point: other.mount_point.or(self.mount_point),
            log_filter: other.log_filter.or(self.log_filter),
        }
    }

    /// Boot config e mount point são obrigatórios e não têm valor padrão
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let boot_config = self
            .boot_config
            .clone()
            .context("Boot config não informado (use --boot-config ou `boot_config` no arquivo)")?;
        let mount_point = self
            .mount_point
            .clone()
            .context("Mount point não informado (use --mount-point ou `mount_point` no arquivo)")?;

        Ok(ResolvedConfig {
            boot_config,
            mount_point,
        })
    }
}
