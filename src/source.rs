//! `SampleSource`: the leaf stage of the pipeline.
//!
//! Per the design notes, this collapses to a small capability set — `request_samples` and
//! `advance`, plus a fixed rate and an interpolation hint — rather than a class hierarchy.
//! Variants are enumerated behind one trait object so `ReferenceSignal` can hold any of them
//! uniformly.

use crate::error::{Error, Result};
use num_complex::Complex64;
use std::f64::consts::TAU;

/// A stream of complex baseband samples produced at a fixed rate.
///
/// Implementations must preserve phase/index continuity across calls: the samples returned by
/// two consecutive `request_samples` calls must equal those from one call for the summed
/// length, i.e. `request(n)` then `request(m)` is the concatenation of `request(n + m)`.
pub trait SampleSource: Send {
    /// Fixed sample rate in Hz.
    fn rate(&self) -> f64;

    /// Whether downstream resampling should use nearest-lower interpolation (square-wave chip
    /// streams) rather than shape-preserving cubic.
    fn use_neighbor_interp(&self) -> bool;

    /// Produce exactly `n` samples and advance internal state by `n`.
    fn request_samples(&mut self, n: usize) -> Vec<Complex64>;

    /// Advance internal state by `n` samples without generating them.
    fn advance(&mut self, n: usize);
}

/// Repeating chip sequence: an immutable array played on a loop.
pub struct RepeatingSource {
    samples: Vec<Complex64>,
    rate: f64,
    idx: usize,
}

impl RepeatingSource {
    /// `start` is 1-based per the external convention (`o` in `[1, L]`); internally stored
    /// zero-based.
    pub fn new(samples: Vec<f64>, rate: f64, start: usize) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::EmptyChipArray);
        }
        if rate <= 0.0 {
            return Err(Error::NonPositiveRate(rate));
        }
        let len = samples.len();
        if start < 1 || start > len {
            return Err(Error::StartOffsetOutOfRange { offset: start, len });
        }
        Ok(Self {
            samples: samples.into_iter().map(|v| Complex64::new(v, 0.0)).collect(),
            rate,
            idx: start - 1,
        })
    }

    /// Construct directly from complex chips (used by BOC-upsampled tables, which are already
    /// complex-valued square waves).
    pub fn from_complex(samples: Vec<Complex64>, rate: f64, start: usize) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::EmptyChipArray);
        }
        if rate <= 0.0 {
            return Err(Error::NonPositiveRate(rate));
        }
        let len = samples.len();
        if start < 1 || start > len {
            return Err(Error::StartOffsetOutOfRange { offset: start, len });
        }
        Ok(Self {
            samples,
            rate,
            idx: start - 1,
        })
    }
}

impl SampleSource for RepeatingSource {
    fn rate(&self) -> f64 {
        self.rate
    }

    fn use_neighbor_interp(&self) -> bool {
        true
    }

    fn request_samples(&mut self, n: usize) -> Vec<Complex64> {
        let len = self.samples.len();
        let mut out = Vec::with_capacity(n);
        for k in 0..n {
            out.push(self.samples[(self.idx + k) % len]);
        }
        self.idx = (self.idx + n) % len;
        out
    }

    fn advance(&mut self, n: usize) {
        self.idx = (self.idx + n) % self.samples.len();
    }
}

/// Pure sine-wave source at a fixed frequency (used for FDMA-free test carriers and as a
/// building block for Doppler-free reference cases).
pub struct SineSource {
    rate: f64,
    freq_hz: f64,
    phase: f64,
}

impl SineSource {
    pub fn new(freq_hz: f64, rate: f64) -> Result<Self> {
        if rate <= 0.0 {
            return Err(Error::NonPositiveRate(rate));
        }
        Ok(Self {
            rate,
            freq_hz,
            phase: 0.0,
        })
    }
}

impl SampleSource for SineSource {
    fn rate(&self) -> f64 {
        self.rate
    }

    fn use_neighbor_interp(&self) -> bool {
        false
    }

    fn request_samples(&mut self, n: usize) -> Vec<Complex64> {
        let step = TAU * self.freq_hz / self.rate;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(Complex64::from_polar(1.0, self.phase));
            self.phase = (self.phase + step) % TAU;
        }
        out
    }

    fn advance(&mut self, n: usize) {
        let step = TAU * self.freq_hz / self.rate;
        self.phase = (self.phase + step * n as f64) % TAU;
    }
}

/// Wraps an upstream [`SampleSource`] with a direct-form-II-transposed IIR/FIR filter.
/// The delay line is lazily zero-initialized on first use and persists across calls.
pub struct FilteredSource {
    upstream: Box<dyn SampleSource>,
    b: Vec<f64>,
    a: Vec<f64>,
    delay: Option<Vec<Complex64>>,
}

impl FilteredSource {
    pub fn new(upstream: Box<dyn SampleSource>, b: Vec<f64>, a: Vec<f64>) -> Result<Self> {
        if b.is_empty() {
            return Err(Error::EmptyNumerator);
        }
        let a = if a.is_empty() { vec![1.0] } else { a };
        let a0 = a[0];
        // Normalize by a[0] once so the hot loop needs no per-sample division.
        let b: Vec<f64> = b.iter().map(|v| v / a0).collect();
        let a: Vec<f64> = a.iter().map(|v| v / a0).collect();
        Ok(Self {
            upstream,
            b,
            a,
            delay: None,
        })
    }

    fn state_len(&self) -> usize {
        self.b.len().max(self.a.len()) - 1
    }
}

impl SampleSource for FilteredSource {
    fn rate(&self) -> f64 {
        self.upstream.rate()
    }

    fn use_neighbor_interp(&self) -> bool {
        false
    }

    fn request_samples(&mut self, n: usize) -> Vec<Complex64> {
        let input = self.upstream.request_samples(n);
        let state_len = self.state_len();
        let z = self
            .delay
            .get_or_insert_with(|| vec![Complex64::new(0.0, 0.0); state_len]);
        let mut out = Vec::with_capacity(n);
        for &x in &input {
            let y = self.b[0] * x + z.first().copied().unwrap_or(Complex64::new(0.0, 0.0));
            for i in 0..state_len {
                let b_i = self.b.get(i + 1).copied().unwrap_or(0.0);
                let a_i = self.a.get(i + 1).copied().unwrap_or(0.0);
                let next = if i + 1 < state_len {
                    z[i + 1]
                } else {
                    Complex64::new(0.0, 0.0)
                };
                z[i] = x * b_i - y * a_i + next;
            }
            out.push(y);
        }
        out
    }

    fn advance(&mut self, n: usize) {
        // The delay line depends on every sample the filter has seen, so advancing without
        // running the filter would desynchronize its state from the upstream index; run it and
        // discard the output instead.
        let _ = self.request_samples(n);
    }
}
