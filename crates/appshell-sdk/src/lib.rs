/// Módulo de FFI com o host AppShell.
///
/// As funções vêm do módulo de import "appshell" no WASM e são registradas
/// pelo `WasmLoader` do runtime.
#[link(wasm_import_module = "appshell")]
extern "C" {
    fn host_log(ptr: *const u8, len: u32);
    fn host_notify_loaded();
    fn host_mount_point(ptr: *mut u8, cap: u32) -> i32;
    fn host_boot_config(ptr: *mut u8, cap: u32) -> i32;
}

const INITIAL_BUFFER: usize = 256;

/// Envia uma linha de log para o host.
pub fn log(msg: &str) {
    unsafe {
        host_log(msg.as_ptr(), msg.len() as u32);
    }
}

/// Avisa o shell que a aplicação terminou de carregar.
///
/// Só tem efeito na primeira chamada de cada montagem.
pub fn notify_loaded() {
    unsafe {
        host_notify_loaded();
    }
}

/// Identificador do ponto de montagem onde a aplicação deve se renderizar.
///
/// `None` fora de `app_main` (o host ainda não entregou o `ShellApi`).
pub fn mount_point() -> Option<String> {
    read_host_string(|ptr, cap| unsafe { host_mount_point(ptr, cap) })
}

/// Boot config completo, em JSON.
pub fn boot_config_json() -> Option<String> {
    read_host_string(|ptr, cap| unsafe { host_boot_config(ptr, cap) })
}

/// O host devolve o tamanho total do valor; se não coube, repete com buffer maior.
fn read_host_string(read: impl Fn(*mut u8, u32) -> i32) -> Option<String> {
    let mut buf = vec![0u8; INITIAL_BUFFER];
    loop {
        let len = read(buf.as_mut_ptr(), buf.len() as u32);
        if len < 0 {
            return None;
        }

        let len = len as usize;
        if len <= buf.len() {
            buf.truncate(len);
            return String::from_utf8(buf).ok();
        }
        buf.resize(len, 0);
    }
}
