// src/core/history.rs
//
// Bounded FIFO of recent frames for the temporal features.

use std::collections::VecDeque;

use super::frame::Frame;

/// The last `capacity` frames, oldest first
#[derive(Debug, Clone)]
pub struct FrameHistory {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl FrameHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a frame, evicting the oldest when full
    pub fn push(&mut self, frame: Frame) {
        if self.capacity == 0 {
            return;
        }
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// Frames oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Frame> + ExactSizeIterator {
        self.frames.iter()
    }

    pub fn history(&self) -> Vec<&Frame> {
        self.frames.iter().collect()
    }

    pub fn latest(&self) -> Option<&Frame> {
        self.frames.back()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(seq: u64) -> Frame {
        Frame::new(vec![seq as u8; 4], 48000, seq)
    }

    #[test]
    fn test_bounded_after_many_pushes() {
        let mut history = FrameHistory::new(5);
        for seq in 0..100 {
            history.push(frame(seq));
        }
        assert_eq!(history.len(), 5);
        let seqs: Vec<u64> = history.iter().map(|f| f.sequence()).collect();
        assert_eq!(seqs, vec![95, 96, 97, 98, 99]);
        assert_eq!(history.latest().map(|f| f.sequence()), Some(99));
    }

    #[test]
    fn test_accepts_mixed_lengths() {
        let mut history = FrameHistory::new(3);
        history.push(Frame::new(vec![0u8; 4], 48000, 0));
        history.push(Frame::new(vec![0u8; 8], 48000, 1));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut history = FrameHistory::new(2);
        history.push(frame(1));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 2);
    }
}
