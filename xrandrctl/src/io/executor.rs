//! Command execution abstraction for the display tool.
//!
//! The [`CommandRunner`] trait decouples dispatch from actually spawning
//! `xrandr`. Tests use recording runners that return scripted outcomes
//! without spawning processes.

use std::io::{self, Read};
use std::process::{ChildStderr, ChildStdout, Command, Stdio};
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info, instrument, warn};
use wait_timeout::ChildExt;

use crate::io::config::ControlConfig;

/// What happened when the display tool was run once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecOutcome {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    /// Bytes of stdout/stderr beyond the configured limit.
    pub dropped_bytes: u64,
    pub timed_out: bool,
}

impl ExecOutcome {
    pub fn succeeded() -> Self {
        Self {
            code: Some(0),
            success: true,
            ..Self::default()
        }
    }

    pub fn failed(code: i32, stderr: &str) -> Self {
        Self {
            code: Some(code),
            success: false,
            stderr: stderr.to_string(),
            ..Self::default()
        }
    }

    /// Human-readable reason for a failed outcome.
    pub fn failure_reason(&self) -> String {
        let mut reason = if self.timed_out {
            "timed out".to_string()
        } else {
            match self.code {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            }
        };
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            reason.push_str(": ");
            reason.push_str(stderr);
        }
        if self.dropped_bytes > 0 {
            reason.push_str(&format!(" ({} more bytes of output dropped)", self.dropped_bytes));
        }
        reason
    }
}

/// Capability to run the display tool with one argument list.
pub trait CommandRunner {
    /// Run the tool with `args` (program name excluded).
    ///
    /// `Err` means the tool could not be run at all; a tool that ran and
    /// failed is reported through [`ExecOutcome::success`].
    fn execute(&self, args: &[String]) -> Result<ExecOutcome>;
}

/// Runner that spawns the configured program (`xrandr` by default).
#[derive(Debug, Clone)]
pub struct XrandrRunner {
    /// Program and leading arguments, e.g. `["xrandr"]`.
    pub program: Vec<String>,
    pub timeout: Duration,
    /// Keep at most this many bytes of each of stdout and stderr.
    pub output_limit_bytes: usize,
}

impl XrandrRunner {
    pub fn from_config(cfg: &ControlConfig) -> Self {
        Self {
            program: cfg.program.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
            output_limit_bytes: cfg.output_limit_bytes,
        }
    }
}

impl CommandRunner for XrandrRunner {
    #[instrument(skip_all, fields(output = output_label(args)))]
    fn execute(&self, args: &[String]) -> Result<ExecOutcome> {
        let Some((program, leading)) = self.program.split_first() else {
            bail!("no program configured");
        };
        debug!(?args, "starting display tool");

        let start = Instant::now();
        let mut child = Command::new(program)
            .args(leading)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn {}", program))?;
        let stdout: ChildStdout = child.stdout.take().context("stdout was not piped")?;
        let stderr: ChildStderr = child.stderr.take().context("stderr was not piped")?;
        let limit = self.output_limit_bytes as u64;

        // Pipes are drained while the tool runs so a chatty tool cannot block.
        let (status, timed_out, (out, out_dropped), (err, err_dropped)) =
            thread::scope(|scope| -> Result<_> {
                let out = scope.spawn(move || drain_limited(stdout, limit));
                let err = scope.spawn(move || drain_limited(stderr, limit));
                let (status, timed_out) = match child
                    .wait_timeout(self.timeout)
                    .context("wait for display tool")?
                {
                    Some(status) => (status, false),
                    None => {
                        warn!(
                            timeout_ms = self.timeout.as_millis() as u64,
                            "display tool timed out, killing"
                        );
                        child.kill().context("kill display tool")?;
                        (child.wait().context("reap display tool")?, true)
                    }
                };
                Ok((status, timed_out, joined(out)?, joined(err)?))
            })?;

        let outcome = ExecOutcome {
            code: status.code(),
            success: status.success() && !timed_out,
            stdout: String::from_utf8_lossy(&out).into_owned(),
            stderr: String::from_utf8_lossy(&err).into_owned(),
            dropped_bytes: out_dropped + err_dropped,
            timed_out,
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        if outcome.success {
            info!(elapsed_ms, stdout = %outcome.stdout.trim(), "display tool completed");
        } else {
            warn!(
                elapsed_ms,
                exit_code = ?outcome.code,
                timed_out,
                dropped_bytes = outcome.dropped_bytes,
                stderr = %outcome.stderr.trim(),
                "display tool failed"
            );
        }
        Ok(outcome)
    }
}

/// The `--output` value in `args`, for log context.
fn output_label(args: &[String]) -> &str {
    args.iter()
        .position(|arg| arg == "--output")
        .and_then(|index| args.get(index + 1))
        .map_or("-", String::as_str)
}

/// Keep the first `limit` bytes of `reader`; count and discard the rest.
fn drain_limited<R: Read>(reader: R, limit: u64) -> io::Result<(Vec<u8>, u64)> {
    let mut kept = Vec::new();
    let mut head = reader.take(limit);
    head.read_to_end(&mut kept)?;
    let dropped = io::copy(&mut head.into_inner(), &mut io::sink())?;
    Ok((kept, dropped))
}

fn joined(handle: ScopedJoinHandle<'_, io::Result<(Vec<u8>, u64)>>) -> Result<(Vec<u8>, u64)> {
    handle
        .join()
        .map_err(|_| anyhow!("output reader panicked"))?
        .context("read display tool output")
}

/// Runner that only logs what would be executed.
#[derive(Debug, Clone, Default)]
pub struct DryRunRunner {
    pub program: Vec<String>,
}

impl CommandRunner for DryRunRunner {
    fn execute(&self, args: &[String]) -> Result<ExecOutcome> {
        let line = self
            .program
            .iter()
            .chain(args.iter())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");
        info!(command = %line, "dry run");
        println!("{}", line);
        Ok(ExecOutcome::succeeded())
    }
}
