// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod output;

use std::path::{Path, PathBuf};

use anyhow::Result;
use colorful::Colorful;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{debug, error};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::SessionConfig;
use crate::core::decoder::is_supported;
use crate::core::{AudioFileSource, LoggingCountermeasure, Session};
use crate::detection::LogSink;

pub use args::Args;
pub use output::{format_json, format_report, format_summary, FileReport};

/// Audio files at `path`: the file itself, or every supported file below it
pub fn collect_audio_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return if is_supported(path) { vec![path.to_path_buf()] } else { Vec::new() };
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_supported(p))
        .collect();
    files.sort();
    files
}

/// Stream one file through a fresh session
pub fn analyze_file(path: &Path, config: &SessionConfig, fft_size: usize) -> Result<FileReport> {
    let mut source = AudioFileSource::open(path, fft_size)?;
    let sample_rate = source.sample_rate();
    let duration_secs = source.duration_secs();

    let mut session = Session::new(config.clone(), LogSink, LoggingCountermeasure)?;
    debug!("Session {} reading {}", session.id(), path.display());
    session.run(&mut source);
    let (summary, _, _) = session.into_parts();

    Ok(FileReport {
        file: path.display().to_string(),
        sample_rate,
        duration_secs,
        frame_secs: fft_size as f64 / sample_rate as f64,
        summary,
    })
}

/// Run the CLI
pub fn run(args: &Args) -> Result<()> {
    let config = args.session_config()?;
    let files = collect_audio_files(&args.input);

    if files.is_empty() {
        println!("{}", "No audio files found!".red());
        return Ok(());
    }
    if !args.json {
        println!("Found {} audio file(s)\n", files.len());
    }

    let progress = if args.json || files.len() == 1 {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(files.len() as u64)
    };
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}") {
        progress.set_style(style);
    }

    let results: Vec<(PathBuf, Result<FileReport>)> = files
        .par_iter()
        .progress_with(progress.clone())
        .map(|path| (path.clone(), analyze_file(path, &config, args.fft_size)))
        .collect();
    progress.finish_and_clear();

    let mut reports = Vec::new();
    let mut failures = 0;
    for (path, result) in results {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                failures += 1;
                error!("{}: {:#}", path.display(), e);
                if !args.json {
                    println!("{} {}: {:#}\n", "✗".red(), path.display(), e);
                }
            }
        }
    }

    if args.json {
        println!("{}", format_json(&reports)?);
        return Ok(());
    }

    for report in &reports {
        println!("{}", format_report(report, args.verbose));
    }
    if reports.len() + failures > 1 {
        println!("{}", format_summary(&reports, failures));
    }
    Ok(())
}
