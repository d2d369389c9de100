//! Single-image fallback: hand raw image bytes to an external background-removal program and
//! take RGBA PNG bytes back.
//!
//! The matting core never depends on this path. Availability is checked once, up front, with
//! [`probe_remover`], and callers branch on the returned [`Availability`].

use std::{
    io::{Read as _, Write as _},
    path::Path,
    process::{Command, Stdio},
};

use anyhow::Context as _;

use crate::{
    codec::ensure_parent_dir,
    foundation::error::{MatteError, MatteResult},
};

/// Default external program used for single-image background removal.
pub const DEFAULT_REMOVER: &str = "rembg";

/// Bytes-in / bytes-out background removal.
pub trait BackgroundRemover {
    /// Remove the background from an encoded image, returning encoded RGBA PNG bytes.
    fn remove(&self, input: &[u8]) -> MatteResult<Vec<u8>>;
}

/// Whether an optional capability can be used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Availability {
    Available,
    Missing { capability: String, hint: String },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// Turn a missing capability into [`MatteError::MissingDependency`].
    pub fn require(self) -> MatteResult<()> {
        match self {
            Self::Available => Ok(()),
            Self::Missing { capability, hint } => {
                Err(MatteError::missing_dependency(capability, hint))
            }
        }
    }
}

/// Check that `program` can be spawned and answers `--help` successfully.
pub fn probe_remover(program: &str) -> Availability {
    let ok = Command::new(program)
        .arg("--help")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);

    if ok {
        Availability::Available
    } else {
        tracing::debug!(program, "background remover check failed");
        Availability::Missing {
            capability: program.to_string(),
            hint: format!(
                "'{program}' was not found on PATH; install it (e.g. `pip install \"rembg[cli]\"`) \
                 or use two-pass extraction with white and black background images"
            ),
        }
    }
}

/// A remover backed by an external program that reads stdin and writes stdout.
#[derive(Clone, Debug)]
pub struct CommandRemover {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for CommandRemover {
    fn default() -> Self {
        Self::new(DEFAULT_REMOVER)
    }
}

impl CommandRemover {
    /// `<program> i - -`, the `rembg` command-line convention for piping one image.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec!["i".to_string(), "-".to_string(), "-".to_string()],
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl BackgroundRemover for CommandRemover {
    fn remove(&self, input: &[u8]) -> MatteResult<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                MatteError::missing_dependency(
                    self.program.clone(),
                    format!("failed to spawn (is it installed and on PATH?): {e}"),
                )
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| MatteError::validation("failed to open remover stdin (unexpected)"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| MatteError::validation("failed to open remover stdout (unexpected)"))?;

        // Feed stdin from a separate thread so a large output cannot deadlock the pipe.
        let payload = input.to_vec();
        let writer = std::thread::spawn(move || -> std::io::Result<()> {
            stdin.write_all(&payload)?;
            drop(stdin);
            Ok(())
        });

        let mut out = Vec::new();
        stdout
            .read_to_end(&mut out)
            .with_context(|| format!("read output of '{}'", self.program))?;

        let output = child
            .wait_with_output()
            .with_context(|| format!("wait for '{}' to finish", self.program))?;
        let write_result = writer
            .join()
            .map_err(|_| MatteError::validation("remover stdin writer panicked"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!(
                "'{}' exited with status {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )
            .into());
        }
        write_result.with_context(|| format!("write input to '{}'", self.program))?;

        if out.is_empty() {
            return Err(MatteError::codec(format!(
                "'{}' produced no output",
                self.program
            )));
        }
        Ok(out)
    }
}

/// Read `input`, run it through `remover`, and write the result to `output`.
#[tracing::instrument(skip(remover))]
pub fn remove_background_file(
    remover: &dyn BackgroundRemover,
    input: &Path,
    output: &Path,
) -> MatteResult<()> {
    if !input.is_file() {
        return Err(MatteError::not_found(input));
    }
    let bytes = std::fs::read(input).with_context(|| format!("read '{}'", input.display()))?;
    let out = remover.remove(&bytes)?;
    ensure_parent_dir(output)?;
    std::fs::write(output, out).with_context(|| format!("write '{}'", output.display()))?;
    Ok(())
}
