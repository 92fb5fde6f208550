use std::path::PathBuf;

use clap::Parser;
use stoker_core::LaunchOptions;

/// Flag surface of the `stoker` binary. Parsing yields a plain
/// `LaunchOptions`; everything downstream works on that.
#[derive(Debug, Parser)]
#[command(name = "stoker", about = "Launcher for the stoker model-serving backend")]
pub struct Cli {
    /// Print the launcher version and exit
    #[arg(long)]
    pub version: bool,

    /// Stop the running model server instance
    #[arg(long)]
    pub stop: bool,

    /// Stay attached and block until the backend exits
    #[arg(long)]
    pub foreground: bool,

    /// Log4j configuration file for the backend
    #[arg(long, value_name = "PATH")]
    pub log_config: Option<PathBuf>,

    /// Layered key=value configuration file
    #[arg(long, value_name = "PATH")]
    pub ts_config: Option<PathBuf>,

    /// Directory the backend loads model archives from
    #[arg(long, value_name = "PATH")]
    pub model_store: Option<PathBuf>,

    /// Disable configuration snapshotting in the backend
    #[arg(long)]
    pub no_config_snapshots: bool,

    /// Models to preload: a name, name=URL, or the literal ALL
    #[arg(long, value_name = "MODEL", num_args = 1..)]
    pub models: Vec<String>,
}

impl From<Cli> for LaunchOptions {
    fn from(cli: Cli) -> Self {
        LaunchOptions {
            version: cli.version,
            stop: cli.stop,
            foreground: cli.foreground,
            log_config: cli.log_config,
            ts_config: cli.ts_config,
            model_store: cli.model_store,
            no_config_snapshots: cli.no_config_snapshots,
            models: cli.models,
        }
    }
}
