//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use convsched_core::MigrationController;
use convsched_types::ProgressSnapshot;
use serde_json::Value;
use thiserror::Error;

/// Controller call observed by [`RecordingController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    SetDowntime(i64),
    StartPostCopy,
    Abort,
}

#[derive(Debug, Error)]
#[error("controller refused the call")]
pub struct Refused;

/// Controller that records every call and optionally refuses them all.
#[derive(Debug, Default)]
pub struct RecordingController {
    pub calls: Vec<Call>,
    pub refuse: bool,
    pub iteration: i64,
}

impl RecordingController {
    fn record(&mut self, call: Call) -> Result<(), Refused> {
        self.calls.push(call);
        if self.refuse { Err(Refused) } else { Ok(()) }
    }
}

impl MigrationController for RecordingController {
    type Error = Refused;

    fn set_downtime(&mut self, downtime_ms: i64) -> Result<(), Refused> {
        self.record(Call::SetDowntime(downtime_ms))
    }

    fn start_post_copy(&mut self) -> Result<(), Refused> {
        self.record(Call::StartPostCopy)
    }

    fn abort(&mut self) -> Result<(), Refused> {
        self.record(Call::Abort)
    }

    fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            iteration: self.iteration,
            ..ProgressSnapshot::default()
        }
    }
}

/// Wraps a schedule JSON value in a configuration envelope.
pub fn configuration_message(schedule: &Value, monitor_interval: &Value) -> String {
    serde_json::json!({
        "configuration": {
            "schedule": schedule,
            "monitorInterval": monitor_interval,
        }
    })
    .to_string()
}

pub fn write_message(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

/// Runs the built binary with config lookups pinned inside `dir`.
pub fn run_convsched(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_convsched"))
        .args(args)
        .env("CONVSCHED_CONFIG", dir.join("absent-config.toml"))
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn convsched")
}

/// Parses every stdout line as a JSON record.
pub fn stdout_records(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line is a JSON record"))
        .collect()
}
