use crate::api::ShellApi;
use crate::boot_config::{is_http, strip_file_scheme};
use crate::module::{AppModule, ModuleLoader, OnLoaded, UnmountHandle};
use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::ops::Range;
use std::sync::Arc;
use wasmtime::{Caller, Engine, Extern, Linker, Module, Store, TypedFunc};

/// Export que faz o papel de `main` da aplicação
pub const APP_MAIN_EXPORT: &str = "app_main";
/// Export opcional chamado pelo unmount handle
pub const APP_UNMOUNT_EXPORT: &str = "app_unmount";

const HOST_MODULE: &str = "appshell";

/// Estado do host visto pelas funções importadas pela aplicação
struct HostState {
    locator: String,
    api: Option<Arc<ShellApi>>,
    on_loaded: Option<OnLoaded>,
}

/// Instância viva de uma aplicação WASM
struct WasmApp {
    store: Store<HostState>,
    main: TypedFunc<(), ()>,
    unmount: Option<TypedFunc<(), ()>>,
}

impl WasmApp {
    fn mount(app: &Arc<Mutex<WasmApp>>, api: Arc<ShellApi>, on_loaded: OnLoaded) -> Result<UnmountHandle> {
        {
            let mut guard = app.lock();
            let WasmApp { store, main, .. } = &mut *guard;
            let state = store.data_mut();
            state.api = Some(api);
            state.on_loaded = Some(on_loaded);

            main.call(&mut *store, ())
                .with_context(|| format!("'{APP_MAIN_EXPORT}' falhou"))?;
        }

        let app = app.clone();
        Ok(UnmountHandle::new(move || {
            let mut guard = app.lock();
            let WasmApp { store, unmount, .. } = &mut *guard;
            if let Some(unmount) = unmount {
                if let Err(e) = unmount.call(&mut *store, ()) {
                    tracing::warn!(
                        locator = %store.data().locator,
                        "'{APP_UNMOUNT_EXPORT}' falhou: {e:#}"
                    );
                }
            }
        }))
    }
}

/// Loader de aplicações WASM (wasm32-unknown-unknown).
///
/// A aplicação importa funções do módulo `"appshell"` e exporta `app_main`
/// (e opcionalmente `app_unmount`).
pub struct WasmLoader {
    engine: Engine,
    client: reqwest::Client,
}

impl Default for WasmLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl WasmLoader {
    pub fn new() -> Self {
        Self {
            engine: Engine::default(),
            client: reqwest::Client::new(),
        }
    }

    async fn read_bytes(&self, location: &str) -> Result<Vec<u8>> {
        if is_http(location) {
            let response = self
                .client
                .get(location)
                .send()
                .await
                .with_context(|| format!("Falha ao buscar '{location}'"))?
                .error_for_status()?;
            return Ok(response.bytes().await?.to_vec());
        }

        let path = strip_file_scheme(location);
        tokio::fs::read(path).await.with_context(|| {
            format!(
                "Arquivo WASM não encontrado em '{path}'. Compile a aplicação com \
                 `cargo build --target wasm32-unknown-unknown` e verifique o `publicPath` \
                 e o `main` no boot config."
            )
        })
    }

    fn linker(&self) -> Result<Linker<HostState>> {
        let mut linker = Linker::new(&self.engine);

        linker.func_wrap(
            HOST_MODULE,
            "host_log",
            |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| {
                if let Some(msg) = read_string_from_memory(&mut caller, ptr, len) {
                    tracing::info!(target: "appshell::app", locator = %caller.data().locator, "{msg}");
                }
            },
        )?;

        linker.func_wrap(
            HOST_MODULE,
            "host_notify_loaded",
            |mut caller: Caller<'_, HostState>| {
                if let Some(on_loaded) = caller.data_mut().on_loaded.take() {
                    on_loaded();
                }
            },
        )?;

        linker.func_wrap(
            HOST_MODULE,
            "host_mount_point",
            |mut caller: Caller<'_, HostState>, ptr: i32, cap: i32| -> i32 {
                let value = match &caller.data().api {
                    Some(api) => api.app_mount_point.clone(),
                    None => return -1,
                };
                write_to_memory(&mut caller, ptr, cap, value.as_bytes())
            },
        )?;

        linker.func_wrap(
            HOST_MODULE,
            "host_boot_config",
            |mut caller: Caller<'_, HostState>, ptr: i32, cap: i32| -> i32 {
                let json = match &caller.data().api {
                    Some(api) => match serde_json::to_vec(&*api.boot_config) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::warn!("falha ao serializar boot config: {e}");
                            return -1;
                        }
                    },
                    None => return -1,
                };
                write_to_memory(&mut caller, ptr, cap, &json)
            },
        )?;

        Ok(linker)
    }
}

#[async_trait]
impl ModuleLoader for WasmLoader {
    async fn import(&self, locator: &str) -> Result<AppModule> {
        let location = locator.to_string();
        tracing::debug!(%location, "importando módulo WASM");

        let bytes = self.read_bytes(&location).await?;
        let module = Module::new(&self.engine, &bytes)
            .with_context(|| format!("'{location}' não é um módulo WASM válido"))?;

        // Não há WASI no host: falha explícita em vez de erro de link
        if let Some(import) = module
            .imports()
            .find(|import| import.module().starts_with("wasi"))
        {
            anyhow::bail!(
                "Aplicação requer WASI (módulo de importação: '{}'). Construa a aplicação \
                 para wasm32-unknown-unknown.",
                import.module()
            );
        }

        let mut store = Store::new(
            &self.engine,
            HostState {
                locator: location.clone(),
                api: None,
                on_loaded: None,
            },
        );
        let instance = self.linker()?.instantiate(&mut store, &module)?;

        let main = match instance.get_typed_func::<(), ()>(&mut store, APP_MAIN_EXPORT) {
            Ok(main) => main,
            Err(e) => {
                tracing::debug!(%location, "sem '{APP_MAIN_EXPORT}' utilizável: {e}");
                return Ok(AppModule::without_main(location));
            }
        };
        let unmount = instance
            .get_typed_func::<(), ()>(&mut store, APP_UNMOUNT_EXPORT)
            .ok();

        let app = Arc::new(Mutex::new(WasmApp {
            store,
            main,
            unmount,
        }));
        Ok(AppModule::with_main(location, move |api, on_loaded| {
            WasmApp::mount(&app, api, on_loaded)
        }))
    }
}

fn read_string_from_memory(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> Option<String> {
    let memory = match caller.get_export("memory") {
        Some(Extern::Memory(mem)) => mem,
        _ => {
            tracing::warn!("aplicação não exporta memória \"memory\"");
            return None;
        }
    };

    // Valida o intervalo antes de alocar qualquer coisa
    let Some(range) = guest_range(ptr, len, memory.data_size(&*caller)) else {
        tracing::warn!(ptr, len, "intervalo fora da memória da aplicação");
        return None;
    };
    let buf = memory.data(&*caller)[range].to_vec();

    match String::from_utf8(buf) {
        Ok(s) => Some(s),
        Err(_) => {
            tracing::warn!("bytes não são UTF-8 válidos");
            None
        }
    }
}

/// Copia até `cap` bytes para a memória da aplicação e retorna o tamanho total,
/// para que a aplicação repita a chamada com um buffer maior se precisar.
fn write_to_memory(caller: &mut Caller<'_, HostState>, ptr: i32, cap: i32, bytes: &[u8]) -> i32 {
    let memory = match caller.get_export("memory") {
        Some(Extern::Memory(mem)) => mem,
        _ => {
            tracing::warn!("aplicação não exporta memória \"memory\"");
            return -1;
        }
    };

    let n = bytes.len().min(cap.max(0) as usize);
    let Some(range) = guest_range(ptr, n as i32, memory.data_size(&*caller)) else {
        tracing::warn!(ptr, cap, "intervalo fora da memória da aplicação");
        return -1;
    };
    memory.data_mut(&mut *caller)[range].copy_from_slice(&bytes[..n]);

    bytes.len() as i32
}

/// `ptr..ptr+len` dentro de uma memória de `size` bytes; `None` se negativo ou fora
fn guest_range(ptr: i32, len: i32, size: usize) -> Option<Range<usize>> {
    let start = usize::try_from(ptr).ok()?;
    let end = start.checked_add(usize::try_from(len).ok()?)?;
    (end <= size).then_some(start..end)
}
