use clap::Parser;

mod cli;
mod command;
mod launcher;
mod properties;
mod registry;
mod spawn;

/// Installation root of the launcher: the directory that contains the
/// binary's own directory. Best-effort; falls back to the current dir so a
/// `cargo run` from a checkout still works.
fn server_home() -> std::path::PathBuf {
    let exe = std::env::current_exe()
        .ok()
        .and_then(|p| std::fs::canonicalize(p).ok());
    if let Some(exe) = exe
        && let Some(bin_dir) = exe.parent()
        && let Some(root) = bin_dir.parent()
    {
        return root.to_path_buf();
    }
    std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let opts: stoker_core::LaunchOptions = cli::Cli::parse().into();
    let registry = registry::InstanceRegistry::in_temp_dir();
    let env = command::LaunchEnv::from_os_env();

    if let Err(err) = launcher::run(opts, &registry, &env, &server_home()).await {
        eprintln!("{}", launcher::format_error_chain(&err));
        std::process::exit(1);
    }
    Ok(())
}
