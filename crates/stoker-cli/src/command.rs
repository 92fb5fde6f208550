use std::path::{Path, PathBuf};

use anyhow::Context;
use stoker_core::{LaunchOptions, LaunchSpec};

use crate::properties;

/// Backend entry point inside the frontend jars.
const MAIN_CLASS: &str = "org.stoker.serve.ModelServer";

/// Worker runtime the backend shells back into; resolved via the platform
/// search path at spawn time, like the bare `java` fallback.
const PYTHON_EXEC: &str = "python3";

/// Snapshot of the environment variables the builder consumes.
///
/// Captured once per invocation so every override rule is pure and can be
/// exercised in tests without touching the process environment.
#[derive(Debug, Clone, Default)]
pub struct LaunchEnv {
    /// `JAVA_HOME`: installation home of the backend runtime.
    pub java_home: Option<String>,
    /// `TEMP`: override for the runtime's temp-file root.
    pub tmp_dir: Option<String>,
}

impl LaunchEnv {
    pub fn from_os_env() -> Self {
        Self {
            java_home: std::env::var("JAVA_HOME").ok(),
            tmp_dir: std::env::var("TEMP").ok(),
        }
    }
}

/// Merge CLI options, properties-file values, and environment into the
/// backend invocation. Any validation failure aborts the whole launch
/// attempt; nothing here is retried.
pub fn build_launch_spec(
    opts: &LaunchOptions,
    env: &LaunchEnv,
    server_home: &Path,
) -> anyhow::Result<LaunchSpec> {
    let exec = match &env.java_home {
        Some(home) => format!("{home}/bin/java"),
        None => "java".to_string(),
    };

    let mut args = vec![format!("-Dmodel_server_home={}", server_home.display())];

    if let Some(log_config) = &opts.log_config {
        if !log_config.is_file() {
            anyhow::bail!("--log-config file not found: {}", log_config.display());
        }
        let abs = std::fs::canonicalize(log_config)
            .with_context(|| format!("resolve --log-config {}", log_config.display()))?;
        args.push(format!("-Dlog4j.configuration=file://{}", abs.display()));
    }

    if let Some(tmp_dir) = &env.tmp_dir {
        if !Path::new(tmp_dir).is_dir() {
            anyhow::bail!(
                "invalid temp directory: {tmp_dir}, please check the TEMP environment variable"
            );
        }
        args.push(format!("-Djava.io.tmpdir={tmp_dir}"));
    }

    let ts_config = opts.ts_config.as_deref();
    if let Some(conf) = ts_config {
        if !conf.is_file() {
            anyhow::bail!("--ts-config file not found: {}", conf.display());
        }
    }

    let mut class_path = format!(".:{}", server_home.join("frontend").join("*").display());
    let mut model_store = opts.model_store.clone();

    if let Some(conf) = ts_config.filter(|c| c.is_file()) {
        let props = properties::load_properties(conf)?;

        if let Some(vm_args) = props.get("vmargs") {
            tracing::warn!("using non-default JVM parameters: {vm_args}");
            for word in vm_args.split_whitespace() {
                // An explicit --log-config wins over a logging flag carried
                // in the properties file.
                if opts.log_config.is_some() && word.starts_with("-Dlog4j.configuration=") {
                    continue;
                }
                args.push(word.to_string());
            }
        }

        if let Some(plugins) = props.get("plugins_path") {
            // Plain string containment; a value that already carries a
            // wildcard is taken as-is.
            if plugins.contains('*') {
                class_path.push_str(&format!(":{plugins}"));
            } else {
                class_path.push_str(&format!(":{plugins}/*"));
            }
        }

        if model_store.is_none()
            && let Some(store) = props.get("model_store")
        {
            model_store = Some(PathBuf::from(store));
        }
    }

    args.push("-cp".to_string());
    args.push(class_path);
    args.push(MAIN_CLASS.to_string());

    args.push("--python".to_string());
    args.push(PYTHON_EXEC.to_string());

    if let Some(conf) = ts_config {
        args.push("-f".to_string());
        args.push(conf.display().to_string());
    }

    // A bare local model name cannot be resolved without a store; report
    // that before the missing-store failure so the two outcomes stay
    // distinct.
    if model_store.is_none() {
        for reference in &opts.models {
            if reference != "ALL" && !is_remote_model_ref(reference) {
                anyhow::bail!("--model-store is required to load model locally: {reference}");
            }
        }
    }

    let Some(store) = model_store else {
        anyhow::bail!("missing mandatory parameter --model-store");
    };
    if !store.is_dir() {
        anyhow::bail!("--model-store directory not found: {}", store.display());
    }
    args.push("-s".to_string());
    args.push(store.display().to_string());

    if opts.no_config_snapshots {
        args.push("-ncs".to_string());
    }

    if !opts.models.is_empty() {
        args.push("-m".to_string());
        args.extend(opts.models.iter().cloned());
    }

    Ok(LaunchSpec { exec, args })
}

/// Accept `URL` or `name=URL` where the URL scheme is http or https,
/// matched case-insensitively. The name part may itself contain `=`.
fn is_remote_model_ref(reference: &str) -> bool {
    if is_http_url(reference) {
        return true;
    }
    reference
        .match_indices('=')
        .any(|(i, _)| i >= 1 && is_http_url(&reference[i + 1..]))
}

fn is_http_url(s: &str) -> bool {
    let bytes = s.as_bytes();
    for scheme in [b"http://".as_slice(), b"https://".as_slice()] {
        if bytes.len() > scheme.len() && bytes[..scheme.len()].eq_ignore_ascii_case(scheme) {
            return true;
        }
    }
    false
}
