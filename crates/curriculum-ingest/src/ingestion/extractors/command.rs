//! Extraction via local command-line tools (pdftotext, pandoc)
//!
//! Every invocation runs under a wall-clock timeout and an output ceiling.
//! Runaway tools are killed rather than allowed to exhaust memory or stall a
//! worker.

use std::ffi::OsString;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::FormatExtractor;
use crate::error::{Error, Result};
use crate::processing::ExtractionVariant;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// External tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalToolConfig {
    /// Wall-clock limit per invocation in seconds
    pub timeout_secs: u64,
    /// Maximum bytes read from a tool's stdout
    pub max_output_bytes: usize,
    /// pdftotext executable
    pub pdftotext_path: String,
    /// pandoc executable
    pub pandoc_path: String,
    /// Pages read by pdftotext for the fast variant
    pub fast_page_limit: u32,
}

impl Default for ExternalToolConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            max_output_bytes: 50 * 1024 * 1024,
            pdftotext_path: "pdftotext".to_string(),
            pandoc_path: "pandoc".to_string(),
            fast_page_limit: 50,
        }
    }
}

/// Supported command-line tools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalTool {
    /// poppler-utils PDF to text converter
    Pdftotext,
    /// Universal document converter
    Pandoc,
}

impl ExternalTool {
    /// Method name used in logs and attempts
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pdftotext => "pdftotext",
            Self::Pandoc => "pandoc",
        }
    }

    fn program<'a>(&self, config: &'a ExternalToolConfig) -> &'a str {
        match self {
            Self::Pdftotext => &config.pdftotext_path,
            Self::Pandoc => &config.pandoc_path,
        }
    }

    /// Check whether the tool can be launched
    pub fn is_available(&self, config: &ExternalToolConfig) -> bool {
        let flag = match self {
            Self::Pdftotext => "-v",
            Self::Pandoc => "--version",
        };
        Command::new(self.program(config))
            .arg(flag)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn args(&self, path: &Path, variant: ExtractionVariant, config: &ExternalToolConfig) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        match self {
            Self::Pdftotext => {
                args.extend(["-layout", "-nopgbrk", "-enc", "UTF-8"].map(OsString::from));
                if variant == ExtractionVariant::Fast {
                    args.push("-l".into());
                    args.push(config.fast_page_limit.to_string().into());
                }
                args.push(path.as_os_str().to_owned());
                args.push("-".into());
            }
            Self::Pandoc => {
                args.extend(["-t", "plain", "--wrap=none"].map(OsString::from));
                args.push(path.as_os_str().to_owned());
            }
        }
        args
    }
}

/// Runs an external tool against the staged artifact
pub struct CommandExtractor {
    tool: ExternalTool,
    config: ExternalToolConfig,
}

impl CommandExtractor {
    /// Create a new command extractor
    pub fn new(tool: ExternalTool, config: ExternalToolConfig) -> Self {
        Self { tool, config }
    }
}

impl FormatExtractor for CommandExtractor {
    fn name(&self) -> &'static str {
        self.tool.name()
    }

    fn try_primary(&self, path: &Path, variant: ExtractionVariant) -> Result<String> {
        let mut command = Command::new(self.tool.program(&self.config));
        command.args(self.tool.args(path, variant, &self.config));

        let output = run_with_limits(
            command,
            Duration::from_secs(self.config.timeout_secs),
            self.config.max_output_bytes,
        )?;

        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}

/// Run a command, capturing stdout, under a timeout and an output ceiling
///
/// stdin and stderr are discarded. The child is killed when either limit is
/// hit.
pub fn run_with_limits(mut command: Command, timeout: Duration, max_output: usize) -> Result<Vec<u8>> {
    let program = command.get_program().to_string_lossy().into_owned();
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let mut child = command
        .spawn()
        .map_err(|e| Error::extraction(program.as_str(), format!("failed to spawn: {}", e)))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::internal(format!("{} stdout was not captured", program)))?;

    let overflow = Arc::new(AtomicBool::new(false));
    let reader_overflow = Arc::clone(&overflow);
    let reader = thread::spawn(move || -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let read = stdout.take(max_output as u64 + 1).read_to_end(&mut buf)?;
        if read > max_output {
            reader_overflow.store(true, Ordering::SeqCst);
            buf.truncate(max_output);
        }
        Ok(buf)
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if overflow.load(Ordering::SeqCst) {
            kill_quietly(&mut child, &program);
            let _ = reader.join();
            return Err(Error::OutputLimit {
                operation: program,
                limit: max_output,
            });
        }

        match child.try_wait()? {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                // Grandchildren may still hold the pipe open, so the reader is left detached
                kill_quietly(&mut child, &program);
                drop(reader);
                tracing::warn!("{} killed after {}s", program, timeout.as_secs());
                return Err(Error::timeout(program, timeout));
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    let output = reader
        .join()
        .map_err(|_| Error::internal(format!("{} output reader panicked", program)))??;

    if overflow.load(Ordering::SeqCst) {
        return Err(Error::OutputLimit {
            operation: program,
            limit: max_output,
        });
    }
    if !status.success() {
        return Err(Error::extraction(program, format!("exited with {}", status)));
    }

    Ok(output)
}

fn kill_quietly(child: &mut Child, program: &str) {
    if let Err(e) = child.kill() {
        tracing::debug!("Failed to kill {}: {}", program, e);
    }
    let _ = child.wait();
}
