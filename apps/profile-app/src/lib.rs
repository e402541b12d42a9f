use appshell_sdk::{boot_config_json, log, mount_point, notify_loaded};
use serde::Deserialize;

#[derive(Deserialize)]
struct User {
    name: String,
    surname: String,
}

#[derive(Deserialize)]
struct BootConfig {
    user: User,
}

/// Entry point da aplicação de perfil.
///
/// Lê o usuário do boot config e mostra o nome completo.
#[no_mangle]
pub extern "C" fn app_main() {
    let target = mount_point().unwrap_or_default();

    let user = boot_config_json()
        .and_then(|json| serde_json::from_str::<BootConfig>(&json).ok())
        .map(|config| config.user);

    match user {
        Some(user) => log(&format!(
            "profile-app: {} {} em {target}",
            user.name, user.surname
        )),
        None => log("profile-app: boot config indisponível"),
    }

    notify_loaded();
}

#[no_mangle]
pub extern "C" fn app_unmount() {
    log("profile-app: desmontada");
}
