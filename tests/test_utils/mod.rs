#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use spectralguard::config::{SessionConfig, ThreatProfile};
use spectralguard::core::{Countermeasure, Frame, FrameSource, Session};
use spectralguard::detection::{EventSink, RecordingSink};

pub fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_spectralguard"))
}

pub fn run_spectralguard<P: AsRef<std::ffi::OsStr>>(file_path: P) -> Command {
    let mut cmd = Command::new(get_binary_path());
    cmd.arg(file_path);
    cmd
}

pub fn run_json_analysis<P: AsRef<std::ffi::OsStr>>(file_path: P, extra: &[&str]) -> std::process::Output {
    run_spectralguard(file_path)
        .arg("--json")
        .args(extra)
        .output()
        .expect("Failed to execute with --json")
}

/// Fresh per-test directory under the system temp dir
pub fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("spectralguard-{}-{}", label, uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir
}

pub fn write_config(config: &SessionConfig, dir: &Path) -> PathBuf {
    let path = dir.join("session.json");
    std::fs::write(&path, config.to_json().expect("Failed to serialize config")).expect("Failed to write config");
    path
}

/// Countermeasure that records every call in order
#[derive(Debug, Default)]
pub struct CountingCountermeasure {
    pub calls: Vec<CountermeasureCall>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountermeasureCall {
    Activate(ThreatProfile),
    Deactivate,
}

impl CountingCountermeasure {
    pub fn activations(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, CountermeasureCall::Activate(_))).count()
    }

    pub fn deactivations(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, CountermeasureCall::Deactivate)).count()
    }
}

impl Countermeasure for CountingCountermeasure {
    fn activate(&mut self, profile: ThreatProfile) {
        self.calls.push(CountermeasureCall::Activate(profile));
    }

    fn deactivate(&mut self) {
        self.calls.push(CountermeasureCall::Deactivate);
    }
}

/// Sink whose every callback fails
#[derive(Debug, Default)]
pub struct FailingSink {
    pub attempts: usize,
}

impl EventSink for FailingSink {
    fn on_lock_acquired(&mut self, _: ThreatProfile, _: f32, _: DateTime<Utc>) -> Result<()> {
        self.attempts += 1;
        Err(anyhow!("report store unavailable"))
    }

    fn on_lock_released(&mut self, _: ThreatProfile, _: DateTime<Utc>) -> Result<()> {
        self.attempts += 1;
        Err(anyhow!("report store unavailable"))
    }

    fn on_score_tick(&mut self, _: ThreatProfile, _: u32, _: bool) -> Result<()> {
        self.attempts += 1;
        Err(anyhow!("report store unavailable"))
    }
}

/// Yields the given frames, then fails
pub struct BrokenSource {
    pub frames: std::vec::IntoIter<Frame>,
}

impl BrokenSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames: frames.into_iter() }
    }
}

impl FrameSource for BrokenSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match self.frames.next() {
            Some(f) => Ok(Some(f)),
            None => Err(anyhow!("capture device disconnected")),
        }
    }
}

pub fn recording_session(config: SessionConfig) -> Session<RecordingSink, CountingCountermeasure> {
    Session::new(config, RecordingSink::new(), CountingCountermeasure::default()).expect("Invalid config")
}
