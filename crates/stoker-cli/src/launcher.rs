use std::path::Path;

use anyhow::Context;
use stoker_core::LaunchOptions;

use crate::command::{self, LaunchEnv};
use crate::registry::{self, InstanceRegistry};
use crate::spawn;

/// One launcher invocation: version query, stop request, or start request.
/// Every path is terminal; nothing is retried.
pub async fn run(
    opts: LaunchOptions,
    registry: &InstanceRegistry,
    env: &LaunchEnv,
    server_home: &Path,
) -> anyhow::Result<()> {
    if opts.version {
        println!("stoker version is {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if opts.stop {
        return stop(registry);
    }

    start(&opts, registry, env, server_home).await
}

fn stop(reg: &InstanceRegistry) -> anyhow::Result<()> {
    let Some(pid) = reg.read_record()? else {
        println!("Model server is not currently running.");
        return Ok(());
    };

    // A failed signal means the process is already gone; either way the
    // record is cleared.
    match registry::terminate(pid) {
        Ok(()) => println!("Model server has stopped."),
        Err(_) => println!("Model server already stopped."),
    }
    reg.clear_record()?;
    Ok(())
}

async fn start(
    opts: &LaunchOptions,
    reg: &InstanceRegistry,
    env: &LaunchEnv,
    server_home: &Path,
) -> anyhow::Result<()> {
    if let Some(pid) = reg.read_record()? {
        if registry::is_alive(pid) {
            anyhow::bail!(
                "Model server is already running (pid {pid}), use `stoker --stop` to stop it"
            );
        }
        tracing::info!(pid, "removing orphan instance record");
        reg.clear_record()?;
    }

    let spec = command::build_launch_spec(opts, env, server_home)?;
    tracing::info!(command = %spec.command_line(), "starting model server frontend");

    let handle = match spawn::launch(&spec) {
        Ok(handle) => handle,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(e).context("java not found, please make sure JAVA_HOME is set properly");
        }
        Err(e) => return Err(e).context("failed to start the model server frontend"),
    };

    let pid = handle.pid().context("spawned backend reported no pid")?;
    reg.write_record(pid)?;

    if opts.foreground {
        // Attached mode blocks until the backend exits; its status is not
        // propagated.
        let _ = handle.wait().await;
    }
    Ok(())
}

/// Render an error chain as a single operator-facing line, skipping empty
/// and repeated causes.
pub fn format_error_chain(err: &anyhow::Error) -> String {
    let mut parts = Vec::<String>::new();
    for cause in err.chain() {
        let s = cause.to_string();
        if s.is_empty() {
            continue;
        }
        if parts.last() == Some(&s) {
            continue;
        }
        parts.push(s);
    }
    if parts.is_empty() {
        "unknown error".to_string()
    } else {
        parts.join(": ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_registry() -> (tempfile::TempDir, InstanceRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let reg = InstanceRegistry::new(dir.path());
        (dir, reg)
    }

    /// Pid of a child that has already been reaped.
    #[cfg(unix)]
    fn dead_pid() -> u32 {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        pid
    }

    #[tokio::test]
    async fn version_query_has_no_side_effects() {
        let (_dir, reg) = scratch_registry();
        let opts = LaunchOptions {
            version: true,
            ..LaunchOptions::default()
        };

        run(opts, &reg, &LaunchEnv::default(), Path::new("/opt/stoker"))
            .await
            .unwrap();
        assert_eq!(reg.read_record().unwrap(), None);
    }

    #[tokio::test]
    async fn stop_without_a_record_is_a_success() {
        let (_dir, reg) = scratch_registry();
        let opts = LaunchOptions {
            stop: true,
            ..LaunchOptions::default()
        };

        run(opts, &reg, &LaunchEnv::default(), Path::new("/opt/stoker"))
            .await
            .unwrap();
        assert_eq!(reg.read_record().unwrap(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_clears_the_record_even_when_the_process_is_gone() {
        let (_dir, reg) = scratch_registry();
        reg.write_record(dead_pid()).unwrap();
        let opts = LaunchOptions {
            stop: true,
            ..LaunchOptions::default()
        };

        run(opts, &reg, &LaunchEnv::default(), Path::new("/opt/stoker"))
            .await
            .unwrap();
        assert_eq!(reg.read_record().unwrap(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn start_refuses_while_the_recorded_pid_is_alive() {
        let (_dir, reg) = scratch_registry();
        reg.write_record(std::process::id()).unwrap();

        let err = run(
            LaunchOptions::default(),
            &reg,
            &LaunchEnv::default(),
            Path::new("/opt/stoker"),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("already running"));
        // The record is left untouched on a conflict.
        assert_eq!(reg.read_record().unwrap(), Some(std::process::id()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn start_clears_an_orphan_record_before_validating() {
        let (_dir, reg) = scratch_registry();
        reg.write_record(dead_pid()).unwrap();

        // No model store anywhere, so the attempt fails after orphan
        // cleanup, in the command builder.
        let err = run(
            LaunchOptions::default(),
            &reg,
            &LaunchEnv::default(),
            Path::new("/opt/stoker"),
        )
        .await
        .unwrap_err();
        assert!(
            err.to_string()
                .contains("missing mandatory parameter --model-store")
        );
        assert_eq!(reg.read_record().unwrap(), None);
    }

    #[tokio::test]
    async fn start_fails_fast_before_spawning_on_bad_config() {
        let (_dir, reg) = scratch_registry();
        let opts = LaunchOptions {
            log_config: Some("/nonexistent/log4j.properties".into()),
            ..LaunchOptions::default()
        };

        let err = run(opts, &reg, &LaunchEnv::default(), Path::new("/opt/stoker"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--log-config file not found"));
        assert_eq!(reg.read_record().unwrap(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn start_records_the_spawned_pid() {
        let (_dir, reg) = scratch_registry();
        let store = tempfile::tempdir().unwrap();
        let opts = LaunchOptions {
            model_store: Some(store.path().to_path_buf()),
            foreground: true,
            ..LaunchOptions::default()
        };
        // `java` resolves to a tiny shell instead of a real JVM so the
        // lifecycle can run end to end.
        let home = fake_java_home();
        let env = LaunchEnv {
            java_home: Some(home.path().display().to_string()),
            tmp_dir: None,
        };

        run(opts, &reg, &env, Path::new("/opt/stoker")).await.unwrap();
        let pid = reg.read_record().unwrap().expect("record written");
        assert!(pid > 0);
    }

    #[tokio::test]
    async fn start_reports_a_missing_runtime_distinctly() {
        let (_dir, reg) = scratch_registry();
        let store = tempfile::tempdir().unwrap();
        let opts = LaunchOptions {
            model_store: Some(store.path().to_path_buf()),
            ..LaunchOptions::default()
        };
        let env = LaunchEnv {
            java_home: Some("/nonexistent/jdk".to_string()),
            tmp_dir: None,
        };

        let err = run(opts, &reg, &env, Path::new("/opt/stoker"))
            .await
            .unwrap_err();
        assert!(format_error_chain(&err).contains("java not found"));
        assert_eq!(reg.read_record().unwrap(), None);
    }

    #[test]
    fn format_error_chain_joins_and_dedupes_causes() {
        let err = anyhow::anyhow!("root cause")
            .context("root cause")
            .context("outer");
        assert_eq!(format_error_chain(&err), "outer: root cause");
    }

    /// A throwaway JAVA_HOME whose `bin/java` is a no-op script.
    #[cfg(unix)]
    fn fake_java_home() -> tempfile::TempDir {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let home = tempfile::tempdir().unwrap();
        let bin = home.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let java = bin.join("java");
        let mut f = std::fs::File::create(&java).unwrap();
        f.write_all(b"#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();
        home
    }
}
