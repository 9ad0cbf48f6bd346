//! Caller-controlled trace sink.
//!
//! An optional, explicitly opened log target: the terminal, or an
//! append-mode file in the system temp directory. Trace writes must never
//! fail the call they decorate — a write error silently closes the sink
//! instead of propagating.

use std::fs::OpenOptions;
use std::io::Write;

use tracing::warn;

/// Where trace output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceTarget {
    Terminal,
    /// Named log file, created as `itoolkit_<name>.log` in the system temp
    /// directory and opened for append.
    File(String),
}

/// The open sink. Every exit path drops the file handle; `Disabled` is both
/// the initial and the post-close state.
#[derive(Debug, Default)]
pub enum TraceSink {
    #[default]
    Disabled,
    Terminal,
    File(std::fs::File),
}

impl TraceSink {
    /// Open a sink for the given target. A file that cannot be opened
    /// degrades to `Disabled` rather than failing the caller.
    pub fn open(target: TraceTarget) -> TraceSink {
        match target {
            TraceTarget::Terminal => TraceSink::Terminal,
            TraceTarget::File(name) => {
                let path = std::env::temp_dir().join(format!("itoolkit_{name}.log"));
                match OpenOptions::new().create(true).append(true).open(&path) {
                    Ok(file) => TraceSink::File(file),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "trace file open failed");
                        TraceSink::Disabled
                    }
                }
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, TraceSink::Disabled)
    }

    /// Write one trace line. On any I/O error the sink closes itself.
    pub fn write(&mut self, text: &str) {
        let failed = match self {
            TraceSink::Disabled => false,
            TraceSink::Terminal => {
                println!("{text}");
                false
            }
            TraceSink::File(file) => writeln!(file, "{text}").is_err(),
        };
        if failed {
            self.close();
        }
    }

    /// Hexdump `data`, sixteen bytes per line, hex column then printable
    /// column with control bytes shown as `.`.
    pub fn hexdump(&mut self, data: &str) {
        if !self.is_enabled() {
            return;
        }
        for chunk in data.as_bytes().chunks(16) {
            let hex: String = chunk.iter().map(|b| format!("{b:02x}")).collect();
            let printable: String = chunk
                .iter()
                .map(|&b| {
                    if (0x20..0x7f).contains(&b) {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            self.write(&format!("{hex:<32} {printable}"));
        }
    }

    /// Flush and drop the target.
    pub fn close(&mut self) {
        if let TraceSink::File(file) = self {
            let _ = file.flush();
        }
        *self = TraceSink::Disabled;
    }
}
