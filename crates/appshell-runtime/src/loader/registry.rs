use crate::module::{AppModule, ModuleLoader};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Registry em memória de módulos, indexado por locator (`publicPath + main`).
#[derive(Default)]
pub struct RegistryLoader {
    modules: RwLock<HashMap<String, AppModule>>,
}

impl RegistryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra o módulo no locator dele. Substitui um registro anterior.
    pub fn register(&self, module: AppModule) {
        self.modules
            .write()
            .insert(module.locator().to_string(), module);
    }

    pub fn with_module(self, module: AppModule) -> Self {
        self.register(module);
        self
    }

    pub fn contains(&self, locator: &str) -> bool {
        self.modules.read().contains_key(locator)
    }
}

#[async_trait]
impl ModuleLoader for RegistryLoader {
    async fn import(&self, locator: &str) -> anyhow::Result<AppModule> {
        self.modules
            .read()
            .get(locator)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Módulo '{locator}' não encontrado no registry"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot_config::{AppDescriptor, BootConfig};
    use crate::module::UnmountHandle;
    use crate::paths::PublicPaths;

    #[tokio::test]
    async fn test_import_registered_module() {
        let loader = RegistryLoader::new()
            .with_module(AppModule::with_main("/x/index.js", |_, _| Ok(UnmountHandle::noop())));

        let module = loader
            .import("/x/index.js")
            .await
            .unwrap();
        assert_eq!(module.locator(), "/x/index.js");
        assert!(module.main().is_some());

        let err = loader
            .import("/y/index.js")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/y/index.js"));
    }

    #[tokio::test]
    async fn test_import_bare_specifier() {
        let mut config = BootConfig::default();
        config
            .apps
            .insert("x".into(), AppDescriptor::new("/x/", "index.js"));
        let paths = PublicPaths::from_boot_config(&config);

        let loader = RegistryLoader::new().with_module(AppModule::without_main("/x/index.js"));
        assert!(loader.contains("/x/index.js"));

        let module = loader.import_specifier("x/index.js", &paths).await.unwrap();
        assert_eq!(module.locator(), "/x/index.js");

        let err = loader
            .import_specifier("nope/index.js", &paths)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nope/index.js"));
    }

    #[tokio::test]
    async fn test_relative_locator_is_not_rewritten() {
        // "dist/other/" começa com a chave de outra aplicação
        let mut config = BootConfig::default();
        config
            .apps
            .insert("dist".into(), AppDescriptor::new("cdn/dist/", "a.wasm"));
        config
            .apps
            .insert("other".into(), AppDescriptor::new("dist/other/", "b.wasm"));

        let loader = RegistryLoader::new().with_module(AppModule::without_main("dist/other/b.wasm"));

        let module = loader
            .import(&config.apps["other"].locator())
            .await
            .unwrap();
        assert_eq!(module.locator(), "dist/other/b.wasm");
    }
}
