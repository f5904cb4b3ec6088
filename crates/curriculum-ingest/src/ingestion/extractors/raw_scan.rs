//! Format-agnostic printable-run scanner
//!
//! Last line of defence for every format: reads raw bytes and keeps runs of
//! printable ASCII. Works on truncated, encrypted-but-uncompressed and
//! otherwise malformed files where structural parsers give up.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::Result;

const READ_BLOCK: usize = 64 * 1024;

/// Extracts printable ASCII runs from raw bytes
#[derive(Debug, Clone)]
pub struct RawScanner {
    /// Minimum run length (after trimming) to keep
    min_run: usize,
    /// Stop once this many bytes of output have been produced
    max_output: usize,
}

impl RawScanner {
    /// Create a new scanner
    pub fn new(min_run: usize, max_output: usize) -> Self {
        Self {
            min_run: min_run.max(1),
            max_output,
        }
    }

    /// Scan an in-memory buffer
    pub fn scan_bytes(&self, data: &[u8]) -> String {
        let mut collector = RunCollector::new(self.min_run, self.max_output);
        collector.feed(data);
        collector.finish()
    }

    /// Stream a file from disk; memory stays bounded by the output ceiling
    pub fn scan_file(&self, path: &Path) -> Result<String> {
        let mut reader = BufReader::with_capacity(READ_BLOCK, File::open(path)?);
        let mut block = vec![0u8; READ_BLOCK];
        let mut collector = RunCollector::new(self.min_run, self.max_output);

        while !collector.is_full() {
            let read = reader.read(&mut block)?;
            if read == 0 {
                break;
            }
            collector.feed(&block[..read]);
        }

        Ok(collector.finish())
    }
}

impl Default for RawScanner {
    fn default() -> Self {
        Self::new(4, 5 * 1024 * 1024)
    }
}

struct RunCollector {
    min_run: usize,
    max_output: usize,
    current: Vec<u8>,
    output: String,
    full: bool,
}

impl RunCollector {
    fn new(min_run: usize, max_output: usize) -> Self {
        Self {
            min_run,
            max_output,
            current: Vec::new(),
            output: String::new(),
            full: false,
        }
    }

    fn is_full(&self) -> bool {
        self.full
    }

    fn feed(&mut self, data: &[u8]) {
        for &byte in data {
            if self.full {
                return;
            }
            if is_printable(byte) {
                self.current.push(byte);
            } else {
                self.flush();
            }
        }
    }

    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }

        // Printable ASCII only, so byte and char boundaries coincide
        let run = String::from_utf8_lossy(&self.current);
        let run = run.trim();
        if run.len() >= self.min_run {
            if !self.output.is_empty() {
                self.output.push('\n');
            }
            self.output.push_str(run);

            if self.output.len() >= self.max_output {
                self.output.truncate(self.max_output);
                self.full = true;
            }
        }
        self.current.clear();
    }

    fn finish(mut self) -> String {
        self.flush();
        self.output
    }
}

fn is_printable(byte: u8) -> bool {
    byte == b'\t' || (0x20..=0x7e).contains(&byte)
}
