//! Child process execution.

use anyhow::{Context, Result};
use log::debug;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) async fn run_command_impl(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<Option<i32>> {
        debug!("Running {} {:?} in {:?}", program, args, cwd);

        let status = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .with_context(|| format!("Failed to start '{}'", program))?;

        debug!("{} exited with {}", program, status);
        Ok(status.code())
    }
}
