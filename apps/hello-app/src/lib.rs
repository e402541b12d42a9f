use appshell_sdk::{log, mount_point, notify_loaded};

/// Entry point da aplicação. O shell chama ao montar.
#[no_mangle]
pub extern "C" fn app_main() {
    let target = mount_point().unwrap_or_else(|| "<sem mount point>".to_string());
    log(&format!("hello-app: renderizando em {target}"));
    notify_loaded();
}

/// Chamado pelo shell antes de montar outra aplicação.
#[no_mangle]
pub extern "C" fn app_unmount() {
    log("hello-app: limpando o mount point");
}
