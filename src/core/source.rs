// src/core/source.rs
//
// Capture boundary: anything that yields frames one at a time.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use log::debug;

use super::decoder::{decode_audio, extract_mono};
use super::dsp::{ByteSpectrumAnalyzer, WindowFunction};
use super::frame::Frame;

/// Producer of frames at the capture cadence
///
/// `Ok(None)` ends the stream. An `Err` is treated by the session as an
/// unexpected end of stream.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }
}

/// Frames taken from any iterator
pub struct IterSource<I> {
    frames: I,
}

impl<I: Iterator<Item = Frame>> IterSource<I> {
    pub fn new(frames: impl IntoIterator<IntoIter = I>) -> Self {
        Self { frames: frames.into_iter() }
    }
}

impl<I: Iterator<Item = Frame>> FrameSource for IterSource<I> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.next())
    }
}

/// Byte spectra of consecutive blocks of a decoded audio file
pub struct AudioFileSource {
    path: Option<PathBuf>,
    samples: Vec<f32>,
    sample_rate: u32,
    analyzer: ByteSpectrumAnalyzer,
    hop: usize,
    position: usize,
    sequence: u64,
}

impl AudioFileSource {
    /// Decode `path` and mix it down to mono
    pub fn open(path: &Path, fft_size: usize) -> Result<Self> {
        let audio = decode_audio(path)?;
        debug!(
            "Decoded {}: {} Hz, {} ch, {:.2}s, {}",
            path.display(),
            audio.sample_rate,
            audio.channels,
            audio.duration_secs,
            audio.codec_name
        );
        let mono = extract_mono(&audio);
        let mut source = Self::from_samples(mono, audio.sample_rate, fft_size)?;
        source.path = Some(path.to_path_buf());
        Ok(source)
    }

    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, fft_size: usize) -> Result<Self> {
        if fft_size < 2 {
            bail!("FFT size must be at least 2, got {}", fft_size);
        }
        if sample_rate == 0 {
            bail!("Sample rate must be non-zero");
        }
        Ok(Self {
            path: None,
            samples,
            sample_rate,
            analyzer: ByteSpectrumAnalyzer::new(fft_size, WindowFunction::Blackman),
            hop: fft_size,
            position: 0,
            sequence: 0,
        })
    }

    /// Samples to advance between frames; defaults to the FFT size
    pub fn with_hop(mut self, hop: usize) -> Self {
        self.hop = hop.max(1);
        self
    }

    /// Replace the spectrum settings, e.g. to disable smoothing
    pub fn with_analyzer(mut self, analyzer: ByteSpectrumAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Frames this source will yield in total
    pub fn frame_count(&self) -> usize {
        if self.samples.is_empty() {
            0
        } else {
            (self.samples.len() - 1) / self.hop + 1
        }
    }
}

impl FrameSource for AudioFileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.position >= self.samples.len() {
            return Ok(None);
        }
        let end = (self.position + self.analyzer.fft_size()).min(self.samples.len());
        let bins = self.analyzer.process(&self.samples[self.position..end]);

        let frame = Frame::new(bins, self.sample_rate, self.sequence);
        self.position += self.hop;
        self.sequence += 1;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iter_source_drains() {
        let frames = (0..3).map(|i| Frame::new(vec![0u8; 4], 48000, i));
        let mut source = IterSource::new(frames);
        let mut seen = 0;
        while let Some(frame) = source.next_frame().unwrap() {
            assert_eq!(frame.sequence(), seen);
            seen += 1;
        }
        assert_eq!(seen, 3);
    }

    #[test]
    fn test_file_source_block_count() {
        let samples = vec![0.0f32; 1000];
        let mut source = AudioFileSource::from_samples(samples, 48000, 256).unwrap();
        assert_eq!(source.frame_count(), 4);

        let mut frames = Vec::new();
        while let Some(f) = source.next_frame().unwrap() {
            frames.push(f);
        }
        assert_eq!(frames.len(), 4);
        assert!(frames.iter().all(|f| f.bin_count() == 128 && f.sample_rate() == 48000));
        assert_eq!(frames[3].sequence(), 3);
    }

    #[test]
    fn test_file_source_rejects_bad_params() {
        assert!(AudioFileSource::from_samples(vec![0.0; 10], 48000, 1).is_err());
        assert!(AudioFileSource::from_samples(vec![0.0; 10], 0, 256).is_err());
    }
}
