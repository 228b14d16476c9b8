//! Crate-wide error taxonomy.
//!
//! Construction-time errors name the offending parameter and fail fast; runtime errors
//! surface from the streaming hot path (`request`/`request_samples`) when the pipeline
//! detects a condition it cannot recover from (see the error variants' docs for which).
//! Stream exhaustion and PP extrapolation are deliberately *not* errors — see
//! [`crate::modulated::ModulatedSignal`] and [`crate::poly::PiecewisePolynomial`].

use thiserror::Error;

/// Errors raised while constructing or driving the synthesis pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// A repeating chip array was empty.
    #[error("chip array for source must be non-empty")]
    EmptyChipArray,

    /// A sample rate was zero or negative.
    #[error("sample rate must be positive, got {0}")]
    NonPositiveRate(f64),

    /// A 1-based start offset fell outside `[1, len]`.
    #[error("start offset {offset} out of range [1, {len}] for array of length {len}")]
    StartOffsetOutOfRange { offset: usize, len: usize },

    /// A piecewise polynomial was built with fewer than two breakpoints.
    #[error("piecewise polynomial needs at least 2 breakpoints, got {0}")]
    TooFewBreaks(usize),

    /// Breakpoints were not strictly increasing.
    #[error("piecewise polynomial breakpoints must be strictly increasing (violated at index {0})")]
    BreaksNotIncreasing(usize),

    /// The number of coefficient rows did not match `breaks.len() - 1`.
    #[error("expected {expected} coefficient rows (breaks.len() - 1), got {got}")]
    CoefficientRowMismatch { expected: usize, got: usize },

    /// The binary PP file did not start with the expected magic word.
    #[error("bad piecewise polynomial file magic: expected 0x{expected:08x}, got 0x{got:08x}")]
    BadMagic { expected: u32, got: u32 },

    /// The binary PP file was truncated relative to its declared sizes.
    #[error("piecewise polynomial file truncated: needed {needed} bytes, had {had}")]
    TruncatedFile { needed: usize, had: usize },

    /// A FIR/IIR filter was constructed with an empty numerator.
    #[error("filter numerator must be non-empty")]
    EmptyNumerator,

    /// An oversample ratio or filter order was not a positive integer.
    #[error("{name} must be a positive integer, got {value}")]
    NonPositiveInteger { name: &'static str, value: i64 },

    /// A cutoff scale fell outside `(0, 1]`.
    #[error("cutoff scale must lie in (0, 1], got {0}")]
    CutoffOutOfRange(f64),

    /// `Composite::request` was asked for a duration too short to produce one high-rate sample.
    #[error("requested duration {duration} s at rate {rate} Hz produced {n_hi} high-rate samples, need >= 1")]
    ChunkTooSmall { duration: f64, rate: f64, n_hi: i64 },

    /// A source's accumulated buffer time axis failed to stay strictly increasing.
    ///
    /// This indicates a misconfigured signal-time warp that would otherwise force the
    /// fill loop to spin forever waiting for the buffer to reach the requested horizon.
    #[error("source {index} produced a non-monotonic time axis (buffer would never reach the requested horizon); check its time-warp profile")]
    NonMonotonicTimeAxis { index: usize },

    /// The nearest-lower resampler was given a non-increasing query axis.
    #[error("resampler query axis must be weakly increasing (violated at index {0})")]
    QueryAxisNotIncreasing(usize),

    /// Reference/source x and y axes had mismatched lengths.
    #[error("x axis (len {x_len}) and y axis (len {y_len}) must have equal length")]
    AxisLengthMismatch { x_len: usize, y_len: usize },

    /// An unknown or unsupported PRN / system+signal name was requested from a code table.
    #[error("no PRN table entry for system={system:?} name={name:?} prn={prn}")]
    UnknownPrn {
        system: String,
        name: String,
        prn: u32,
    },

    /// A BOC upsample ratio `k = 2m/n` was requested with a non-integer `m/n`.
    #[error("BOC upsample ratio 2*{m}/{n} is not an integer")]
    NonIntegerBocRatio { m: u32, n: u32 },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
