use anyhow::Context;
use appshell_runtime::{AppShell, BootConfigLoader, ShellConfig, ShellHandle, WasmLoader};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "appshell",
    about = "AppShell: carrega o boot descriptor e monta aplicações WASM, uma por vez"
)]
struct Args {
    /// Locator do boot descriptor (URL http(s), file:// ou caminho)
    #[arg(long)]
    boot_config: Option<String>,

    /// Identificador do ponto de montagem entregue às aplicações
    #[arg(long)]
    mount_point: Option<String>,

    /// Arquivo de configuração TOML (padrão: <config_dir>/appshell/shell.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Chave da aplicação a montar; pode repetir para trocar de aplicação em sequência
    #[arg(long = "app")]
    apps: Vec<String>,

    /// Lista as aplicações do boot descriptor e sai
    #[arg(long)]
    list_apps: bool,
}

fn load_config(args: &Args) -> anyhow::Result<ShellConfig> {
    let file = match &args.config {
        Some(path) => ShellConfig::load(path)?,
        None => match ShellConfig::default_path() {
            Some(path) => ShellConfig::load_if_exists(&path)?,
            None => ShellConfig::default(),
        },
    };

    Ok(file.merge(ShellConfig {
        boot_config: args.boot_config.clone(),
        mount_point: args.mount_point.clone(),
        log_filter: None,
    }))
}

fn init_tracing(log_filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter.unwrap_or("info")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

async fn list_apps(boot_config: &str) -> anyhow::Result<()> {
    let config = BootConfigLoader::new().load(boot_config).await?;

    println!("Aplicações registradas em \"{boot_config}\":");
    for (key, app) in &config.apps {
        println!("- {:<30} -> {}", key, app.locator());
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_tracing(config.log_filter.as_deref());
    let resolved = config.resolve()?;

    if args.list_apps {
        return list_apps(&resolved.boot_config).await;
    }

    if args.apps.is_empty() {
        anyhow::bail!("Use --app <chave> (repetível) ou --list-apps");
    }

    let shell = AppShell::new(
        resolved.boot_config.clone(),
        resolved.mount_point,
        Arc::new(WasmLoader::new()),
    );
    let handle = ShellHandle::spawn(shell);

    handle
        .boot()
        .await
        .with_context(|| format!("Falha no boot a partir de '{}'", resolved.boot_config))?;

    for key in &args.apps {
        handle
            .load_app(key.as_str())
            .await
            .with_context(|| format!("Falha ao carregar a aplicação '{key}'"))?;
    }

    if let Some(key) = handle.unmount().await? {
        tracing::info!(app = %key, "aplicação desmontada, encerrando");
    }

    Ok(())
}
