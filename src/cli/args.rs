//! CLI argument parsing

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::config::{ConfigBuilder, LockPolicy, SessionConfig, ThreatProfile};

#[derive(Parser, Debug, Clone)]
#[command(name = "spectralguard")]
#[command(version, about = "Classify audio captures against spectral threat profiles")]
pub struct Args {
    /// Input file or directory
    pub input: PathBuf,

    /// JSON session config; flags below override it
    #[arg(short, long, env = "SPECTRALGUARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run the full analysis on every Nth frame
    #[arg(short, long)]
    pub stride: Option<usize>,

    /// Primary-profile score needed for a detection
    #[arg(short, long)]
    pub threshold: Option<u32>,

    /// FFT size per frame; frames carry half as many bins
    #[arg(long, default_value_t = 8192)]
    pub fft_size: usize,

    /// How many locks may be held at once
    #[arg(long, value_enum)]
    pub lock_policy: Option<LockPolicy>,

    /// Profiles allowed to drive the countermeasure (repeatable)
    #[arg(long = "countermeasure", value_enum)]
    pub countermeasure: Vec<ThreatProfile>,

    /// Print a JSON report instead of the colored one
    #[arg(long)]
    pub json: bool,

    /// Show lock history and per-profile counts; enables debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Session config from the file (or defaults) with flag overrides applied
    pub fn session_config(&self) -> Result<SessionConfig> {
        let base = match &self.config {
            Some(path) => SessionConfig::from_json_file(path)?,
            None => SessionConfig::default(),
        };

        let mut builder = ConfigBuilder::from_config(base);
        if let Some(stride) = self.stride {
            builder = builder.stride(stride);
        }
        if let Some(threshold) = self.threshold {
            builder = builder.detection_score(threshold);
        }
        if let Some(policy) = self.lock_policy {
            builder = builder.lock_policy(policy);
        }
        if !self.countermeasure.is_empty() {
            builder = builder.countermeasure_profiles(self.countermeasure.clone());
        }
        Ok(builder.build()?)
    }
}
