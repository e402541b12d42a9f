//! Implementações de `ModuleLoader`
//!
//! - `RegistryLoader`: módulos Rust nativos registrados em memória
//! - `WasmLoader`: módulos `wasm32-unknown-unknown` executados com wasmtime

mod registry;
mod wasm;

pub use registry::RegistryLoader;
pub use wasm::{WasmLoader, APP_MAIN_EXPORT, APP_UNMOUNT_EXPORT};
