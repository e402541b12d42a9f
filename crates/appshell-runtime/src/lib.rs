//! Shell de micro-frontends: carrega um boot descriptor e mantém no máximo uma
//! aplicação montada por vez, entregando a cada uma o mesmo `ShellApi`.

pub mod api;
pub mod boot_config;
pub mod config;
pub mod error;
pub mod handle;
pub mod loader;
pub mod module;
pub mod paths;
pub mod shell;

pub use api::ShellApi;
pub use boot_config::{AppDescriptor, BootConfig, BootConfigLoader, User};
pub use config::{ResolvedConfig, ShellConfig};
pub use error::ShellError;
pub use handle::ShellHandle;
pub use loader::{RegistryLoader, WasmLoader};
pub use module::{AppModule, EntryPoint, ModuleLoader, OnLoaded, UnmountHandle};
pub use paths::PublicPaths;
pub use shell::{ActiveApp, AppShell, LoadOutcome};
