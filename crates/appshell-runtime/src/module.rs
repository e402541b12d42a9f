//! Contrato entre o shell e os módulos de aplicação

use crate::api::ShellApi;
use crate::paths::PublicPaths;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Callback informativo que a aplicação chama quando terminou de carregar
pub type OnLoaded = Box<dyn FnOnce() + Send>;

type MainFn = dyn Fn(Arc<ShellApi>, OnLoaded) -> anyhow::Result<UnmountHandle> + Send + Sync;

/// Função `main` exportada por um módulo
#[derive(Clone)]
pub struct EntryPoint(Arc<MainFn>);

impl EntryPoint {
    pub fn new<F>(main: F) -> Self
    where
        F: Fn(Arc<ShellApi>, OnLoaded) -> anyhow::Result<UnmountHandle> + Send + Sync + 'static,
    {
        Self(Arc::new(main))
    }

    pub fn call(&self, api: Arc<ShellApi>, on_loaded: OnLoaded) -> anyhow::Result<UnmountHandle> {
        (self.0)(api, on_loaded)
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EntryPoint(..)")
    }
}

/// Módulo importado. `main` é `None` quando o módulo não exporta um entry point utilizável.
#[derive(Debug, Clone)]
pub struct AppModule {
    locator: String,
    main: Option<EntryPoint>,
}

impl AppModule {
    pub fn new(locator: impl Into<String>, main: Option<EntryPoint>) -> Self {
        Self {
            locator: locator.into(),
            main,
        }
    }

    pub fn with_main<F>(locator: impl Into<String>, main: F) -> Self
    where
        F: Fn(Arc<ShellApi>, OnLoaded) -> anyhow::Result<UnmountHandle> + Send + Sync + 'static,
    {
        Self::new(locator, Some(EntryPoint::new(main)))
    }

    /// Módulo sem `main`
    pub fn without_main(locator: impl Into<String>) -> Self {
        Self::new(locator, None)
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn main(&self) -> Option<&EntryPoint> {
        self.main.as_ref()
    }
}

/// Handle de desmontagem devolvido pelo `main` da aplicação.
///
/// Pode ser clonado; a limpeza roda no máximo uma vez.
#[derive(Clone)]
pub struct UnmountHandle {
    inner: Arc<Mutex<Option<Box<dyn FnOnce() + Send>>>>,
}

impl UnmountHandle {
    pub fn new<F>(cleanup: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Some(Box::new(cleanup)))),
        }
    }

    /// Handle sem limpeza nenhuma
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Executa a limpeza. Retorna `false` se ela já tinha rodado.
    pub fn unmount(&self) -> bool {
        // Solta o lock antes de chamar a limpeza
        let cleanup = self.inner.lock().take();
        match cleanup {
            Some(cleanup) => {
                cleanup();
                true
            }
            None => false,
        }
    }

    pub fn is_unmounted(&self) -> bool {
        self.inner.lock().is_none()
    }
}

impl fmt::Debug for UnmountHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnmountHandle")
            .field("unmounted", &self.is_unmounted())
            .finish()
    }
}

/// Mecanismo de import dinâmico: traduz um locator em um módulo.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Importa o módulo exatamente em `locator` (`publicPath + main`), sem reescrita.
    async fn import(&self, locator: &str) -> anyhow::Result<AppModule>;

    /// Importa um especificador nu (`<appKey>/<asset>`), resolvido pelo mapa
    /// publicado no `boot()`.
    async fn import_specifier(
        &self,
        specifier: &str,
        paths: &PublicPaths,
    ) -> anyhow::Result<AppModule> {
        let locator = paths
            .resolve(specifier)
            .ok_or_else(|| anyhow::anyhow!("Especificador '{specifier}' não corresponde a nenhuma aplicação"))?;
        self.import(&locator).await
    }
}
