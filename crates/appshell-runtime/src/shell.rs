//! Gerenciador de ciclo de vida: no máximo uma aplicação montada por vez

use crate::api::ShellApi;
use crate::boot_config::BootConfigLoader;
use crate::error::{panic_message, ShellError};
use crate::module::{ModuleLoader, OnLoaded, UnmountHandle};
use crate::paths::PublicPaths;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Aplicação atualmente montada
#[derive(Debug, Clone)]
pub struct ActiveApp {
    pub key: String,
    pub unmount: UnmountHandle,
}

/// Resultado de um `load_app` bem-sucedido
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// Nova aplicação montada; o handle também fica guardado no shell
    Mounted(UnmountHandle),
    /// A aplicação pedida já era a ativa; nada foi feito
    AlreadyLoaded,
}

impl LoadOutcome {
    pub fn unmount_handle(&self) -> Option<&UnmountHandle> {
        match self {
            LoadOutcome::Mounted(handle) => Some(handle),
            LoadOutcome::AlreadyLoaded => None,
        }
    }
}

/// Shell de micro-frontends.
///
/// `boot()` carrega o boot config, monta o `ShellApi` e publica os public paths.
/// `load_app()` troca a aplicação ativa: desmonta a anterior antes de importar a nova.
/// Se o import ou a montagem falhar, o shell fica sem aplicação ativa; a anterior
/// não é remontada.
pub struct AppShell {
    boot_config_entry_point: String,
    mount_point: String,
    config_loader: BootConfigLoader,
    loader: Arc<dyn ModuleLoader>,
    api: Option<Arc<ShellApi>>,
    paths: Arc<PublicPaths>,
    active: Option<ActiveApp>,
}

impl AppShell {
    pub fn new(
        boot_config_entry_point: impl Into<String>,
        mount_point: impl Into<String>,
        loader: Arc<dyn ModuleLoader>,
    ) -> Self {
        Self {
            boot_config_entry_point: boot_config_entry_point.into(),
            mount_point: mount_point.into(),
            config_loader: BootConfigLoader::new(),
            loader,
            api: None,
            paths: Arc::new(PublicPaths::default()),
            active: None,
        }
    }

    pub fn with_config_loader(mut self, config_loader: BootConfigLoader) -> Self {
        self.config_loader = config_loader;
        self
    }

    /// Carrega o boot config e prepara o shell.
    ///
    /// Chamar de novo busca o descriptor outra vez e reconstrói api e paths,
    /// mas não mexe na aplicação ativa.
    pub async fn boot(&mut self) -> Result<(), ShellError> {
        if self.api.is_some() {
            tracing::warn!(
                entry_point = %self.boot_config_entry_point,
                "boot() chamado de novo; a aplicação ativa não será recarregada"
            );
        }

        let boot_config = self
            .config_loader
            .load(&self.boot_config_entry_point)
            .await?;

        let api = Arc::new(ShellApi::new(boot_config, self.mount_point.clone()));
        self.paths = Arc::new(PublicPaths::from_boot_config(&api.boot_config));
        self.api = Some(api);

        tracing::info!(
            entry_point = %self.boot_config_entry_point,
            apps = self.paths.len(),
            "shell inicializado"
        );
        Ok(())
    }

    /// Torna `key` a aplicação ativa.
    ///
    /// Chaves desconhecidas falham antes de qualquer mudança de estado.
    pub async fn load_app(&mut self, key: &str) -> Result<LoadOutcome, ShellError> {
        let api = self.api.clone().ok_or(ShellError::NotBooted)?;

        let app = api
            .boot_config
            .app(key)
            .ok_or_else(|| ShellError::UnknownApp(key.to_string()))?;

        if self.current_app() == Some(key) {
            tracing::info!(app = key, "App {key} already loaded");
            return Ok(LoadOutcome::AlreadyLoaded);
        }

        if let Some(previous) = self.active.take() {
            tracing::debug!(app = %previous.key, "desmontando aplicação anterior");
            catch_app_panic(&previous.key, || previous.unmount.unmount())?;
        }

        // O locator vai ao loader exatamente como `publicPath + main`
        let locator = app.locator();
        let module = self
            .loader
            .import(&locator)
            .await
            .map_err(|source| ShellError::Import {
                locator: locator.clone(),
                source,
            })?;

        let main = module
            .main()
            .ok_or_else(|| ShellError::NoEntryPoint {
                locator: locator.clone(),
            })?;

        let loaded_key = key.to_string();
        let on_loaded: OnLoaded = Box::new(move || {
            tracing::info!(app = %loaded_key, "App '{loaded_key}' loaded");
        });

        let unmount = catch_app_panic(key, || main.call(api.clone(), on_loaded))?
            .map_err(|source| ShellError::Mount {
                key: key.to_string(),
                source,
            })?;

        tracing::debug!(app = key, %locator, "aplicação montada");
        self.active = Some(ActiveApp {
            key: key.to_string(),
            unmount: unmount.clone(),
        });
        Ok(LoadOutcome::Mounted(unmount))
    }

    /// Desmonta a aplicação ativa, se houver. Retorna a chave desmontada.
    pub fn unmount(&mut self) -> Option<String> {
        let active = self.active.take()?;
        match catch_app_panic(&active.key, || active.unmount.unmount()) {
            Ok(_) => tracing::debug!(app = %active.key, "aplicação desmontada"),
            Err(e) => tracing::warn!(app = %active.key, "{e}"),
        }
        Some(active.key)
    }

    pub fn current_app(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.key.as_str())
    }

    pub fn active(&self) -> Option<&ActiveApp> {
        self.active.as_ref()
    }

    pub fn is_booted(&self) -> bool {
        self.api.is_some()
    }

    pub fn api(&self) -> Option<Arc<ShellApi>> {
        self.api.clone()
    }

    pub fn public_paths(&self) -> Arc<PublicPaths> {
        self.paths.clone()
    }

    pub fn mount_point(&self) -> &str {
        &self.mount_point
    }
}

/// Executa código da aplicação; um pânico vira `ShellError::AppPanicked`
fn catch_app_panic<T>(key: &str, f: impl FnOnce() -> T) -> Result<T, ShellError> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| ShellError::AppPanicked {
        key: key.to_string(),
        message: panic_message(payload.as_ref()),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::loader::RegistryLoader;
    use crate::module::AppModule;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::io::Write;

    pub(crate) const DESCRIPTOR: &str = r#"{
        "user": {"id": "42", "name": "Grace", "surname": "Hopper"},
        "apps": {
            "a": {"publicPath": "/a/", "main": "index.js"},
            "b": {"publicPath": "/b/", "main": "index.js"},
            "x": {"publicPath": "/x/", "main": "index.js"}
        }
    }"#;

    pub(crate) type Events = Arc<Mutex<Vec<String>>>;

    /// Registry que anota cada import em `events`
    pub(crate) struct RecordingLoader {
        pub registry: RegistryLoader,
        pub events: Events,
    }

    #[async_trait]
    impl ModuleLoader for RecordingLoader {
        async fn import(&self, locator: &str) -> anyhow::Result<AppModule> {
            self.events.lock().push(format!("import:{locator}"));
            self.registry.import(locator).await
        }
    }

    /// Módulo cujo `main` anota mount/unmount em `events`
    pub(crate) fn recording_module(key: &str, events: &Events) -> AppModule {
        let events = events.clone();
        let key = key.to_string();
        AppModule::with_main(format!("/{key}/index.js"), move |api, on_loaded| {
            assert_eq!(api.boot_config.user.name, "Grace");
            events.lock().push(format!("mount:{key}:{}", api.app_mount_point));
            on_loaded();

            let events = events.clone();
            let key = key.clone();
            Ok(UnmountHandle::new(move || {
                events.lock().push(format!("unmount:{key}"));
            }))
        })
    }

    pub(crate) fn descriptor_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DESCRIPTOR.as_bytes()).unwrap();
        file
    }

    fn shell_with(apps: &[&str], file: &tempfile::NamedTempFile) -> (AppShell, Arc<RecordingLoader>, Events) {
        let events: Events = Arc::default();
        let registry = RegistryLoader::new();
        for key in apps {
            registry.register(recording_module(key, &events));
        }
        let loader = Arc::new(RecordingLoader {
            registry,
            events: events.clone(),
        });
        let shell = AppShell::new(file.path().to_string_lossy(), "#app-root", loader.clone());
        (shell, loader, events)
    }

    #[tokio::test]
    async fn test_boot_publishes_paths() {
        let file = descriptor_file();
        let (mut shell, _, _) = shell_with(&[], &file);
        assert!(!shell.is_booted());

        shell.boot().await.unwrap();

        let api = shell.api().unwrap();
        assert_eq!(api.app_mount_point, "#app-root");
        let paths = shell.public_paths();
        assert_eq!(paths.len(), api.boot_config.apps.len());
        for (key, app) in &api.boot_config.apps {
            assert_eq!(paths.get(key), Some(app.public_path.as_str()));
        }
    }

    #[tokio::test]
    async fn test_boot_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let loader = Arc::new(RegistryLoader::new());
        let mut shell = AppShell::new(
            dir.path().join("missing.json").to_string_lossy(),
            "#app-root",
            loader,
        );

        let err = shell.boot().await.unwrap_err();
        assert!(matches!(err, ShellError::ConfigRead { .. }));
        assert!(!shell.is_booted());
    }

    #[tokio::test]
    async fn test_load_before_boot_fails_fast() {
        let file = descriptor_file();
        let (mut shell, _, events) = shell_with(&["x"], &file);

        let err = shell.load_app("x").await.unwrap_err();
        assert!(matches!(err, ShellError::NotBooted));
        assert!(events.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_key_leaves_state_unchanged() {
        let file = descriptor_file();
        let (mut shell, _, events) = shell_with(&["a"], &file);
        shell.boot().await.unwrap();
        shell.load_app("a").await.unwrap();
        let before = events.lock().clone();

        let err = shell.load_app("nope").await.unwrap_err();
        assert!(matches!(err, ShellError::UnknownApp(ref k) if k == "nope"));
        assert_eq!(err.to_string(), "App nope is not defined!");
        assert_eq!(shell.current_app(), Some("a"));
        assert_eq!(*events.lock(), before);
    }

    #[tokio::test]
    async fn test_same_key_twice_is_noop() {
        let file = descriptor_file();
        let (mut shell, _, events) = shell_with(&["x"], &file);
        shell.boot().await.unwrap();

        let first = shell.load_app("x").await.unwrap();
        assert!(first.unmount_handle().is_some());
        let second = shell.load_app("x").await.unwrap();
        assert!(matches!(second, LoadOutcome::AlreadyLoaded));

        assert_eq!(
            *events.lock(),
            vec!["import:/x/index.js", "mount:x:#app-root"]
        );
        assert_eq!(shell.current_app(), Some("x"));
    }

    #[tokio::test]
    async fn test_switch_unmounts_before_import() {
        let file = descriptor_file();
        let (mut shell, _, events) = shell_with(&["a", "b"], &file);
        shell.boot().await.unwrap();

        shell.load_app("a").await.unwrap();
        shell.load_app("b").await.unwrap();

        assert_eq!(
            *events.lock(),
            vec![
                "import:/a/index.js",
                "mount:a:#app-root",
                "unmount:a",
                "import:/b/index.js",
                "mount:b:#app-root",
            ]
        );
        assert_eq!(shell.current_app(), Some("b"));
    }

    #[tokio::test]
    async fn test_failed_import_leaves_shell_idle_then_recovers() {
        let file = descriptor_file();
        let (mut shell, loader, events) = shell_with(&["a"], &file);
        shell.boot().await.unwrap();
        shell.load_app("a").await.unwrap();

        let err = shell.load_app("b").await.unwrap_err();
        assert!(matches!(err, ShellError::Import { ref locator, .. } if locator == "/b/index.js"));
        assert!(err.leaves_shell_idle());
        assert_eq!(shell.current_app(), None);
        assert!(events.lock().contains(&"unmount:a".to_string()));

        loader.registry.register(recording_module("b", &events));
        shell.load_app("b").await.unwrap();
        assert_eq!(shell.current_app(), Some("b"));
    }

    #[tokio::test]
    async fn test_module_without_main_is_not_mounted() {
        let file = descriptor_file();
        let (mut shell, loader, events) = shell_with(&[], &file);
        loader
            .registry
            .register(AppModule::without_main("/x/index.js"));
        shell.boot().await.unwrap();

        let err = shell.load_app("x").await.unwrap_err();
        assert!(matches!(err, ShellError::NoEntryPoint { .. }));
        assert!(err.to_string().contains("Unable to find 'main' function"));
        assert_eq!(shell.current_app(), None);
        assert_eq!(*events.lock(), vec!["import:/x/index.js"]);
    }

    #[tokio::test]
    async fn test_failing_main_is_mount_error() {
        let file = descriptor_file();
        let (mut shell, loader, _) = shell_with(&[], &file);
        loader.registry.register(AppModule::with_main("/x/index.js", |_, _| {
            anyhow::bail!("render falhou")
        }));
        shell.boot().await.unwrap();

        let err = shell.load_app("x").await.unwrap_err();
        assert!(matches!(err, ShellError::Mount { ref key, .. } if key == "x"));
        assert_eq!(shell.current_app(), None);
    }

    #[tokio::test]
    async fn test_scenario_single_app() {
        let file = descriptor_file();
        let (mut shell, _, events) = shell_with(&["x"], &file);
        shell.boot().await.unwrap();

        let outcome = shell.load_app("x").await.unwrap();
        let handle = outcome.unmount_handle().unwrap().clone();
        let stored = shell.active().unwrap().unmount.clone();
        assert!(!handle.is_unmounted());

        // O handle devolvido e o guardado são o mesmo
        stored.unmount();
        assert!(handle.is_unmounted());
        assert_eq!(events.lock().last().unwrap(), "unmount:x");

        assert!(matches!(
            shell.load_app("x").await.unwrap(),
            LoadOutcome::AlreadyLoaded
        ));
        assert_eq!(events.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_unmount_returns_to_idle() {
        let file = descriptor_file();
        let (mut shell, _, events) = shell_with(&["a"], &file);
        shell.boot().await.unwrap();
        assert_eq!(shell.unmount(), None);

        shell.load_app("a").await.unwrap();
        assert_eq!(shell.unmount().as_deref(), Some("a"));
        assert_eq!(shell.current_app(), None);
        assert_eq!(events.lock().last().unwrap(), "unmount:a");
    }

    #[tokio::test]
    async fn test_reboot_keeps_active_app() {
        let file = descriptor_file();
        let (mut shell, _, events) = shell_with(&["a"], &file);
        shell.boot().await.unwrap();
        shell.load_app("a").await.unwrap();

        shell.boot().await.unwrap();
        assert_eq!(shell.current_app(), Some("a"));
        assert!(!events.lock().contains(&"unmount:a".to_string()));
    }

    #[tokio::test]
    async fn test_relative_public_path_imported_verbatim() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"apps": {
                "dist": {"publicPath": "cdn/dist/", "main": "a.wasm"},
                "other": {"publicPath": "dist/other/", "main": "b.wasm"}
            }}"#,
        )
        .unwrap();

        let events: Events = Arc::default();
        let registry = RegistryLoader::new()
            .with_module(AppModule::with_main("dist/other/b.wasm", |_, _| {
                Ok(UnmountHandle::noop())
            }));
        let loader = Arc::new(RecordingLoader {
            registry,
            events: events.clone(),
        });
        let mut shell = AppShell::new(file.path().to_string_lossy(), "#app-root", loader);
        shell.boot().await.unwrap();

        shell.load_app("other").await.unwrap();
        assert_eq!(shell.current_app(), Some("other"));
        assert_eq!(*events.lock(), vec!["import:dist/other/b.wasm"]);
    }

    #[tokio::test]
    async fn test_panicking_main_leaves_shell_usable() {
        let file = descriptor_file();
        let (mut shell, loader, events) = shell_with(&["b"], &file);
        loader
            .registry
            .register(AppModule::with_main("/a/index.js", |_, _| panic!("app bug")));
        shell.boot().await.unwrap();

        let err = shell.load_app("a").await.unwrap_err();
        assert!(
            matches!(err, ShellError::AppPanicked { ref key, ref message } if key == "a" && message == "app bug")
        );
        assert!(err.leaves_shell_idle());
        assert_eq!(shell.current_app(), None);

        shell.load_app("b").await.unwrap();
        assert_eq!(shell.current_app(), Some("b"));
        assert_eq!(events.lock().last().unwrap(), "mount:b:#app-root");
    }

    #[tokio::test]
    async fn test_panicking_unmount_is_reported() {
        let file = descriptor_file();
        let (mut shell, loader, events) = shell_with(&["b"], &file);
        loader.registry.register(AppModule::with_main("/a/index.js", |_, _| {
            Ok(UnmountHandle::new(|| panic!("cleanup bug")))
        }));
        shell.boot().await.unwrap();
        shell.load_app("a").await.unwrap();

        let err = shell.load_app("b").await.unwrap_err();
        assert!(matches!(err, ShellError::AppPanicked { ref key, .. } if key == "a"));
        assert_eq!(shell.current_app(), None);
        assert!(!events.lock().contains(&"import:/b/index.js".to_string()));

        shell.load_app("b").await.unwrap();
        assert_eq!(shell.current_app(), Some("b"));
    }

    #[tokio::test]
    async fn test_panicking_unmount_on_shutdown() {
        let file = descriptor_file();
        let (mut shell, loader, _) = shell_with(&[], &file);
        loader.registry.register(AppModule::with_main("/a/index.js", |_, _| {
            Ok(UnmountHandle::new(|| panic!("cleanup bug")))
        }));
        shell.boot().await.unwrap();
        shell.load_app("a").await.unwrap();

        assert_eq!(shell.unmount().as_deref(), Some("a"));
        assert_eq!(shell.current_app(), None);
    }
}
