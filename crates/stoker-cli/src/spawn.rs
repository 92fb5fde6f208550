use std::process::ExitStatus;

use stoker_core::LaunchSpec;
use tokio::process::{Child, Command};

/// Handle on a spawned backend.
///
/// The launcher's only coupling to the child: a pid to record, and an
/// optional blocking wait. Dropping the handle instead of waiting leaves the
/// backend running on its own.
#[derive(Debug)]
pub struct LaunchHandle {
    child: Child,
}

impl LaunchHandle {
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Block until the backend exits. Foreground mode is simply the caller
    /// choosing to invoke this.
    pub async fn wait(mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }
}

/// Spawn the built command as a child process. No timeout, no retry; the
/// caller decides what a failure means.
pub fn launch(spec: &LaunchSpec) -> std::io::Result<LaunchHandle> {
    let child = Command::new(&spec.exec).args(&spec.args).spawn()?;
    Ok(LaunchHandle { child })
}
