//! Run output: directory layout, logging, and diagnostic dumps.
//!
//! Everything a run writes lands in the configured `output_dir`:
//!
//! - `log.txt` — the run log (mirrored to stdout),
//! - `config.txt` — verbatim copy of the input configuration,
//! - append-only data streams (`H_violations.dat`, field statistics, ...),
//! - strips / slices / snapshots of selected fields as plain-text floats,
//! - power-spectrum dumps,
//! - `constraints.png` — constraint-violation history chart.
//!
//! Diagnostic write failures are reported through the log and otherwise
//! ignored: losing a dump must not kill a long run.

pub mod export;
pub mod visualization;

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, SimError};

/// Handle to the output directory and run log.
pub struct IoContext {
    dir: PathBuf,
    log: BufWriter<File>,
}

impl IoContext {
    /// Create the output directory (if needed) and open the log.
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| SimError::OutputDir {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let log_path = dir.join("log.txt");
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| SimError::OutputDir {
                path: log_path,
                source: e,
            })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            log: BufWriter::new(log),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append a line to the run log and mirror it to stdout.
    pub fn log(&mut self, msg: &str) {
        println!("{msg}");
        // A failing log write is itself unreportable; drop it.
        let _ = writeln!(self.log, "{msg}");
        let _ = self.log.flush();
    }

    /// Copy the input configuration file verbatim into the output dir.
    pub fn config_backup(&mut self, config_path: &Path) {
        let dest = self.dir.join("config.txt");
        if let Err(e) = std::fs::copy(config_path, &dest) {
            self.log(&format!(
                "warning: could not back up config {}: {e}",
                config_path.display()
            ));
        }
    }

    /// Rewrite the in-place progress line on stdout.
    pub fn show_progress(&self, step: usize, total: usize) {
        let pct = if total > 0 {
            100.0 * step as f64 / total as f64
        } else {
            100.0
        };
        print!("\rRunning simulation: {step} / {total} ({pct:.1} %)  ");
        let _ = std::io::stdout().flush();
    }

    /// Open an append handle for a named data stream in the output dir.
    pub fn append_stream(&self, name: &str) -> std::io::Result<BufWriter<File>> {
        let path = self.dir.join(name);
        Ok(BufWriter::new(
            OpenOptions::new().create(true).append(true).open(path)?,
        ))
    }

    /// Create (truncate) a named file in the output dir.
    pub fn create_file(&self, name: &str) -> std::io::Result<BufWriter<File>> {
        Ok(BufWriter::new(File::create(self.dir.join(name))?))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_directory_and_log() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("run");
        let mut io = IoContext::new(&dir).unwrap();
        io.log("hello");
        let text = std::fs::read_to_string(dir.join("log.txt")).unwrap();
        assert!(text.contains("hello"));
    }

    #[test]
    fn config_backup_copies_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = tmp.path().join("c.txt");
        std::fs::write(&cfg, "steps = 3\n# comment\n").unwrap();
        let mut io = IoContext::new(&tmp.path().join("out")).unwrap();
        io.config_backup(&cfg);
        let copied = std::fs::read_to_string(tmp.path().join("out/config.txt")).unwrap();
        assert_eq!(copied, "steps = 3\n# comment\n");
    }

    #[test]
    fn append_stream_accumulates_across_opens() {
        let tmp = tempfile::tempdir().unwrap();
        let io = IoContext::new(tmp.path()).unwrap();
        {
            let mut w = io.append_stream("x.dat").unwrap();
            writeln!(w, "1").unwrap();
        }
        {
            let mut w = io.append_stream("x.dat").unwrap();
            writeln!(w, "2").unwrap();
        }
        let text = std::fs::read_to_string(tmp.path().join("x.dat")).unwrap();
        assert_eq!(text, "1\n2\n");
    }
}
