//! Fila única de comandos do shell.
//!
//! O `AppShell` vive dentro de uma task; todo `boot`/`load_app`/`unmount` passa
//! por um único canal e é processado em ordem, um de cada vez.

use crate::error::{panic_message, ShellError};
use crate::paths::PublicPaths;
use crate::shell::{AppShell, LoadOutcome};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

const COMMAND_BUFFER_SIZE: usize = 32;

enum ShellCommand {
    Boot(oneshot::Sender<Result<(), ShellError>>),
    LoadApp(String, oneshot::Sender<Result<LoadOutcome, ShellError>>),
    Unmount(oneshot::Sender<Option<String>>),
    CurrentApp(oneshot::Sender<Option<String>>),
    PublicPaths(oneshot::Sender<Arc<PublicPaths>>),
}

/// Handle clonável para o shell. Clones compartilham a mesma fila.
#[derive(Clone)]
pub struct ShellHandle {
    command_tx: mpsc::Sender<ShellCommand>,
}

impl ShellHandle {
    /// Move o shell para uma task de background. Precisa de um runtime tokio.
    pub fn spawn(shell: AppShell) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        tokio::spawn(command_consumer_loop(shell, command_rx));
        Self { command_tx }
    }

    pub async fn boot(&self) -> Result<(), ShellError> {
        self.request(ShellCommand::Boot).await?
    }

    pub async fn load_app(&self, key: impl Into<String>) -> Result<LoadOutcome, ShellError> {
        let key = key.into();
        self.request(|reply| ShellCommand::LoadApp(key, reply)).await?
    }

    pub async fn unmount(&self) -> Result<Option<String>, ShellError> {
        self.request(ShellCommand::Unmount).await
    }

    pub async fn current_app(&self) -> Result<Option<String>, ShellError> {
        self.request(ShellCommand::CurrentApp).await
    }

    pub async fn public_paths(&self) -> Result<Arc<PublicPaths>, ShellError> {
        self.request(ShellCommand::PublicPaths).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> ShellCommand,
    ) -> Result<T, ShellError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| ShellError::ShellClosed)?;
        reply_rx.await.map_err(|_| ShellError::ShellClosed)
    }
}

async fn command_consumer_loop(mut shell: AppShell, mut command_rx: mpsc::Receiver<ShellCommand>) {
    tracing::debug!("fila de comandos do shell iniciada");

    while let Some(command) = command_rx.recv().await {
        // Quem desistiu da resposta não impede o próximo comando
        match command {
            ShellCommand::Boot(reply) => {
                let _ = reply.send(shell.boot().await);
            }
            ShellCommand::LoadApp(key, reply) => {
                // Um pânico no loader não derruba a fila; o shell já está sem aplicação ativa
                let result = AssertUnwindSafe(shell.load_app(&key))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        Err(ShellError::AppPanicked {
                            key: key.clone(),
                            message: panic_message(payload.as_ref()),
                        })
                    });
                let _ = reply.send(result);
            }
            ShellCommand::Unmount(reply) => {
                let _ = reply.send(shell.unmount());
            }
            ShellCommand::CurrentApp(reply) => {
                let _ = reply.send(shell.current_app().map(str::to_string));
            }
            ShellCommand::PublicPaths(reply) => {
                let _ = reply.send(shell.public_paths());
            }
        }
    }

    // Todos os handles foram dropados: desmonta o que estiver ativo
    if let Some(key) = shell.unmount() {
        tracing::debug!(app = %key, "aplicação desmontada ao encerrar a fila");
    }
    tracing::debug!("fila de comandos do shell encerrada");
}
