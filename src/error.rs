//! Fatal generation errors.
//!
//! Selection failures are not errors: they surface as `None` and the driver
//! moves on. What remains here is the emitter refusing a fragment, which
//! means the synthesizer produced something invalid. It is reported with
//! everything needed to replay the run.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::emit::{GenerationConfig, TraceEntry};

/// Everything needed to reproduce a rejected fragment.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReproContext {
    /// Signature of the method the fragment was aimed at.
    pub method: String,
    /// Rendered fragment text.
    pub fragment: String,
    /// The emitter's reason for refusing it.
    pub reason: String,
    pub seed: u64,
    pub config: GenerationConfig,
    /// Actions performed before the failure, in order.
    pub trace: Vec<TraceEntry>,
}

impl ReproContext {
    /// Human-readable multi-line report.
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "fragment rejected in `{}`: {}", self.method, self.reason);
        let _ = writeln!(out, "  seed:   {}", self.seed);
        let _ = writeln!(
            out,
            "  config: max_loop_iterations={} if_branching_factor={} max_operators={} no_overflow={} no_div_by_zero={}",
            self.config.max_loop_iterations,
            self.config.if_branching_factor,
            self.config.max_operators,
            self.config.no_overflow,
            self.config.no_div_by_zero,
        );
        let _ = writeln!(out, "  calls:  {}", self.trace.len());
        for (i, entry) in self.trace.iter().enumerate().rev().take(10).rev() {
            let _ = writeln!(
                out,
                "    #{i:<5} {:<28} {}{}",
                entry.action.to_string(),
                entry.method,
                if entry.produced { "" } else { " (nothing)" }
            );
        }
        let _ = writeln!(out, "  fragment:");
        for line in self.fragment.lines() {
            let _ = writeln!(out, "    {line}");
        }
        out
    }

    /// Write the context as pretty JSON to `<dir>/<stem>.failure.json`.
    pub fn write_to_dir(&self, dir: &Path, stem: &str) -> io::Result<PathBuf> {
        let path = dir.join(format!("{stem}.failure.json"));
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&path, json)?;
        Ok(path)
    }
}

/// A generation run that cannot continue.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("fragment rejected in `{}`: {}", .0.method, .0.reason)]
    Rejected(Box<ReproContext>),
    #[error("declaration of `{name}` rejected: {reason}")]
    Declaration { name: String, reason: String },
}

impl GenerateError {
    pub fn repro(&self) -> Option<&ReproContext> {
        match self {
            GenerateError::Rejected(ctx) => Some(ctx),
            GenerateError::Declaration { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::Action;

    fn context() -> ReproContext {
        ReproContext {
            method: "methodA(I)".into(),
            fragment: "a = b;\nc++;".into(),
            reason: "unknown identifier `b`".into(),
            seed: 42,
            config: GenerationConfig {
                seed: 42,
                ..GenerationConfig::default()
            },
            trace: vec![TraceEntry {
                action: Action::Cast,
                method: "methodA".into(),
                produced: true,
            }],
        }
    }

    #[test]
    fn report_names_seed_and_fragment() {
        let report = context().report();
        assert!(report.contains("seed:   42"));
        assert!(report.contains("    a = b;"));
        assert!(report.contains("cast"));
        assert!(report.contains("unknown identifier `b`"));
    }

    #[test]
    fn error_display_is_one_line() {
        let err = GenerateError::Rejected(Box::new(context()));
        assert_eq!(
            err.to_string(),
            "fragment rejected in `methodA(I)`: unknown identifier `b`"
        );
        assert_eq!(err.repro().map(|c| c.seed), Some(42));
    }

    #[test]
    fn writes_json_next_to_output() {
        let dir = std::env::temp_dir().join(format!("jvm-stress-repro-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = context().write_to_dir(&dir, "SwiftPenguin").unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["seed"], 42);
        assert_eq!(value["trace"][0]["action"], "cast");
        let _ = fs::remove_dir_all(&dir);
    }
}
