use std::path::PathBuf;

/// Structured launch request for one launcher invocation.
///
/// Produced by the CLI layer and owned by the launch controller; never
/// mutated after parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LaunchOptions {
    pub version: bool,
    pub stop: bool,
    pub foreground: bool,
    pub log_config: Option<PathBuf>,
    pub ts_config: Option<PathBuf>,
    pub model_store: Option<PathBuf>,
    pub no_config_snapshots: bool,
    /// Model references to preload: a bare name, `name=URL`, or `ALL`.
    pub models: Vec<String>,
}

/// Fully-formed backend invocation: program plus arguments in spawn order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LaunchSpec {
    pub exec: String,
    pub args: Vec<String>,
}

impl LaunchSpec {
    /// Render the invocation as a single line for logging.
    pub fn command_line(&self) -> String {
        let mut out = self.exec.clone();
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }
        out
    }
}
