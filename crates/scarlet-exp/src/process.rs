//! Collaborators backed by external programs, plus a log-only plotter.

use std::io::{Seek, SeekFrom, Write};
use std::process::{Command, Output, Stdio};

use scarlet_core::{
    Deblender, ErrorInfo, HarnessError, ModelOutput, ResidualArtifact, ResidualPlotter, SceneData,
};
use tempfile::tempfile;
use tracing::{debug, info};

use crate::codec::from_json_slice;
use crate::config::CommandSpec;

/// Lines of stderr kept in error hints.
const STDERR_TAIL: usize = 20;

/// Runs the deblender of the revision under test as a subprocess.
///
/// The scene is written as JSON to the child's stdin; the child prints a
/// [`ModelOutput`] as JSON on stdout. Fit settings are passed through the
/// `SCARLET_MAX_ITER` and `SCARLET_E_REL` environment variables.
#[derive(Debug, Clone)]
pub struct CommandDeblender {
    command: CommandSpec,
    max_iter: u32,
    e_rel: f64,
}

impl CommandDeblender {
    pub fn new(command: CommandSpec, max_iter: u32, e_rel: f64) -> Self {
        Self {
            command,
            max_iter,
            e_rel,
        }
    }
}

impl Deblender for CommandDeblender {
    fn deblend(&self, scene: &SceneData) -> Result<ModelOutput, HarnessError> {
        let payload = serde_json::to_vec(scene).map_err(|err| {
            HarnessError::Serde(ErrorInfo::new("deblend-encode", err.to_string()))
        })?;
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .env("SCARLET_MAX_ITER", self.max_iter.to_string())
            .env("SCARLET_E_REL", self.e_rel.to_string());
        let output = run_with_stdin(cmd, &payload).map_err(|info| {
            HarnessError::Deblend(info.with_context("program", program_name(&self.command)))
        })?;
        from_json_slice::<ModelOutput>(&output.stdout).map_err(|err| {
            HarnessError::Deblend(
                ErrorInfo::new("deblend-output", "deblender printed malformed model output")
                    .with_context("program", program_name(&self.command))
                    .with_hint(err.info().message.clone()),
            )
        })
    }
}

/// Hands residual artifacts to an external renderer on stdin.
#[derive(Debug, Clone)]
pub struct CommandPlotter {
    command: CommandSpec,
}

impl CommandPlotter {
    pub fn new(command: CommandSpec) -> Self {
        Self { command }
    }
}

impl ResidualPlotter for CommandPlotter {
    fn plot(&self, residuals: &ResidualArtifact) -> Result<(), HarnessError> {
        let payload = serde_json::to_vec(residuals).map_err(|err| {
            HarnessError::Plotting(ErrorInfo::new("plot-encode", err.to_string()))
        })?;
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .env("SCARLET_DATASET", &residuals.provenance.dataset)
            .env("SCARLET_REVISION", &residuals.provenance.revision);
        run_with_stdin(cmd, &payload).map_err(|info| {
            HarnessError::Plotting(info.with_context("program", program_name(&self.command)))
        })?;
        Ok(())
    }
}

/// Reports residual statistics through `tracing` instead of rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPlotter;

impl ResidualPlotter for LogPlotter {
    fn plot(&self, residuals: &ResidualArtifact) -> Result<(), HarnessError> {
        for blend in &residuals.blends {
            info!(
                revision = residuals.provenance.revision.as_str(),
                blend = blend.blend_id.as_str(),
                rms = blend.stats.rms,
                max_abs = blend.stats.max_abs,
                chi2 = blend.stats.chi2_per_pixel,
                "residual"
            );
        }
        Ok(())
    }
}

fn program_name(command: &CommandSpec) -> String {
    command.program.display().to_string()
}

// Stdin is fed from an unlinked temp file so a child that writes before it
// finishes reading cannot block on a full pipe.
fn run_with_stdin(mut cmd: Command, payload: &[u8]) -> Result<Output, ErrorInfo> {
    let buffer_error = |err: std::io::Error| {
        ErrorInfo::new("process-stdin", "failed to buffer child input").with_hint(err.to_string())
    };
    let mut input = tempfile().map_err(buffer_error)?;
    input
        .write_all(payload)
        .and_then(|_| input.seek(SeekFrom::Start(0)))
        .map_err(buffer_error)?;
    debug!(program = ?cmd.get_program(), bytes = payload.len(), "spawning collaborator");
    let output = cmd
        .stdin(Stdio::from(input))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|err| {
            ErrorInfo::new("process-spawn", "failed to start program").with_hint(err.to_string())
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL)..].join("\n");
        return Err(ErrorInfo::new("process-exit", "program exited unsuccessfully")
            .with_context("status", output.status.to_string())
            .with_hint(tail));
    }
    Ok(output)
}
