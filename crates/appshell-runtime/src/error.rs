//! Erros do shell de aplicações

use std::any::Any;
use thiserror::Error;

/// Falhas possíveis do shell. Todas chegam ao chamador pelo mesmo `Result`.
#[derive(Debug, Error)]
pub enum ShellError {
    /// Falha ao ler o boot descriptor do disco
    #[error("Falha ao ler boot config em '{location}': {source}")]
    ConfigRead {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// Falha de transporte ao buscar o boot descriptor
    #[error("Falha ao buscar boot config em '{location}': {source}")]
    ConfigFetch {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    /// Corpo do boot descriptor não é JSON válido
    #[error("Boot config em '{location}' não é JSON válido: {source}")]
    ConfigParse {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Shell ainda não foi inicializado; chame boot() antes de load_app()")]
    NotBooted,

    #[error("App {0} is not defined!")]
    UnknownApp(String),

    /// O loader não conseguiu resolver/importar o módulo
    #[error("Falha ao importar módulo '{locator}': {source:#}")]
    Import {
        locator: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unable to find 'main' function in module '{locator}'")]
    NoEntryPoint { locator: String },

    /// O `main` da aplicação falhou durante a montagem
    #[error("App '{key}' falhou ao montar: {source:#}")]
    Mount {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// A aplicação entrou em pânico durante montagem, desmontagem ou import
    #[error("App '{key}' entrou em pânico: {message}")]
    AppPanicked { key: String, message: String },

    #[error("Fila de comandos do shell foi encerrada")]
    ShellClosed,
}

impl ShellError {
    /// Erros que deixam o shell sem aplicação ativa (a anterior já foi desmontada)
    pub fn leaves_shell_idle(&self) -> bool {
        matches!(
            self,
            ShellError::Import { .. }
                | ShellError::NoEntryPoint { .. }
                | ShellError::Mount { .. }
                | ShellError::AppPanicked { .. }
        )
    }
}

/// Texto do payload de um pânico (`panic!("...")` produz `&str` ou `String`)
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "pânico sem mensagem".to_string()
    }
}
