use crate::boot_config::BootConfig;
use std::sync::Arc;

/// Objeto de capacidades entregue a toda aplicação carregada.
///
/// Construído uma vez no `boot()` e compartilhado por referência; as aplicações
/// só têm acesso de leitura.
#[derive(Debug, Clone)]
pub struct ShellApi {
    pub boot_config: Arc<BootConfig>,
    pub app_mount_point: String,
}

impl ShellApi {
    pub fn new(boot_config: BootConfig, app_mount_point: impl Into<String>) -> Self {
        Self {
            boot_config: Arc::new(boot_config),
            app_mount_point: app_mount_point.into(),
        }
    }
}
