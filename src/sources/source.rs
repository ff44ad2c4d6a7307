//! SampleSource trait and adapters

use std::collections::VecDeque;

/// Trait for raw sample sources
pub trait SampleSource {
    /// Read one raw sample
    fn read(&mut self) -> u32;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read(&mut self) -> u32 {
        (**self).read()
    }
}

/// Adapts a closure into a source
pub struct FnSource<F>(pub F);

impl<F> SampleSource for FnSource<F>
where
    F: FnMut() -> u32,
{
    fn read(&mut self) -> u32 {
        (self.0)()
    }
}

/// Source that plays back a fixed list of samples
///
/// Once the list is exhausted the last sample is repeated forever, which
/// models a sensor resting at its final position.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    samples: VecDeque<u32>,
    last: u32,
}

impl ScriptedSource {
    pub fn new(samples: impl IntoIterator<Item = u32>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            last: 0,
        }
    }

    /// Queue more samples after the ones still pending
    pub fn push(&mut self, sample: u32) {
        self.samples.push_back(sample);
    }

    /// Queue the same sample `count` times
    pub fn push_repeated(&mut self, sample: u32, count: usize) {
        self.samples.extend(std::iter::repeat(sample).take(count));
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl SampleSource for ScriptedSource {
    fn read(&mut self) -> u32 {
        if let Some(sample) = self.samples.pop_front() {
            self.last = sample;
        }
        self.last
    }
}

/// Holds the last plausible reading of a source that reports dropouts
///
/// Pulse-echo distance sensors return 0 when no echo arrives and garbage
/// far beyond their rated range. Readings of 0 or at/above `limit` are
/// replaced with the last valid reading (0 until one has been seen).
#[derive(Debug, Clone)]
pub struct LastValid<S> {
    inner: S,
    limit: u32,
    last_valid: u32,
}

impl<S: SampleSource> LastValid<S> {
    pub fn new(inner: S, limit: u32) -> Self {
        Self {
            inner,
            limit,
            last_valid: 0,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: SampleSource> SampleSource for LastValid<S> {
    fn read(&mut self) -> u32 {
        let sample = self.inner.read();
        if sample > 0 && sample < self.limit {
            self.last_valid = sample;
        } else {
            tracing::trace!(sample, kept = self.last_valid, "rejected out-of-range reading");
        }
        self.last_valid
    }
}
