//! `ReferenceSignal`: wraps a [`SampleSource`] and multiplies successive fixed-length segments
//! by successive data symbols.

use crate::source::SampleSource;
use log::trace;
use num_complex::Complex64;

/// Default segment length when no data-symbol generator is attached: 20 ms of chips.
const DEFAULT_SEGMENT_SECONDS: f64 = 0.02;

/// A finite sequence of complex data symbols at a fixed symbol period.
///
/// Once the symbol list is exhausted, [`next_symbol`](Self::next_symbol) yields unit symbols
/// (`1+0i`) indefinitely rather than signaling end-of-stream.
pub struct DataSymbolSource {
    symbols: Vec<Complex64>,
    symbol_period_s: f64,
    next_idx: usize,
}

impl DataSymbolSource {
    pub fn new(symbols: Vec<Complex64>, symbol_period_s: f64) -> Self {
        Self {
            symbols,
            symbol_period_s,
            next_idx: 0,
        }
    }

    pub fn symbol_period_s(&self) -> f64 {
        self.symbol_period_s
    }

    /// Draw the next symbol, advancing the cursor. Past the end of the list this keeps
    /// returning `1+0i` forever.
    pub fn next_symbol(&mut self) -> Complex64 {
        let sym = self
            .symbols
            .get(self.next_idx)
            .copied()
            .unwrap_or(Complex64::new(1.0, 0.0));
        self.next_idx += 1;
        sym
    }
}

/// Wraps an upstream [`SampleSource`] and optionally multiplies fixed-length segments by
/// successive data symbols.
pub struct ReferenceSignal {
    upstream: Box<dyn SampleSource>,
    symbols: Option<DataSymbolSource>,
    segment_length: usize,
    segment: Vec<Complex64>,
    segment_idx: usize,
}

impl ReferenceSignal {
    /// `symbols = None` defaults the segment length to 20 ms of chips at the upstream rate.
    pub fn new(upstream: Box<dyn SampleSource>, symbols: Option<DataSymbolSource>) -> Self {
        let rate = upstream.rate();
        let segment_length = match &symbols {
            Some(s) => (s.symbol_period_s() * rate).round() as usize,
            None => (DEFAULT_SEGMENT_SECONDS * rate).round() as usize,
        }
        .max(1);
        Self {
            upstream,
            symbols,
            segment_length,
            segment: Vec::new(),
            // Initialized as "exhausted" so the first request triggers segment generation.
            segment_idx: segment_length,
        }
    }

    pub fn rate(&self) -> f64 {
        self.upstream.rate()
    }

    pub fn use_neighbor_interp(&self) -> bool {
        self.upstream.use_neighbor_interp()
    }

    /// Produce `n` samples, crossing as many segment boundaries as needed. Exactly one symbol
    /// is consumed per boundary crossing, regardless of `n`.
    pub fn request_samples(&mut self, n: usize) -> Vec<Complex64> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            if self.segment_idx >= self.segment_length {
                self.fill_segment();
            }
            let remaining_out = n - out.len();
            let remaining_seg = self.segment_length - self.segment_idx;
            let take = remaining_out.min(remaining_seg);
            out.extend_from_slice(&self.segment[self.segment_idx..self.segment_idx + take]);
            self.segment_idx += take;
        }
        out
    }

    fn fill_segment(&mut self) {
        trace!("regenerating {}-sample data segment", self.segment_length);
        let mut seg = self.upstream.request_samples(self.segment_length);
        if let Some(symbols) = &mut self.symbols {
            let sym = symbols.next_symbol();
            for s in &mut seg {
                *s *= sym;
            }
        }
        self.segment = seg;
        self.segment_idx = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RepeatingSource;

    #[test]
    fn default_segment_is_20ms_of_chips() {
        let src = RepeatingSource::new(vec![1.0; 2000], 1000.0, 1).unwrap();
        let mut r = ReferenceSignal::new(Box::new(src), None);
        // 20ms @ 1kHz = 20 samples per segment; request across two segments.
        let out = r.request_samples(45);
        assert_eq!(out.len(), 45);
    }

    #[test]
    fn one_symbol_consumed_per_segment_regardless_of_request_size() {
        let src = RepeatingSource::new(vec![1.0; 10], 10.0, 1).unwrap();
        let symbols = DataSymbolSource::new(
            vec![
                Complex64::new(1.0, 0.0),
                Complex64::new(-1.0, 0.0),
                Complex64::new(1.0, 0.0),
            ],
            1.0, // 1 second period @ 10 Hz -> 10-sample segments
        );
        let mut r = ReferenceSignal::new(Box::new(src), Some(symbols));
        let first = r.request_samples(3);
        assert!(first.iter().all(|c| c.re == 1.0));
        let second = r.request_samples(10); // crosses into the -1 segment
        assert!(second[7..].iter().any(|c| c.re == -1.0));
    }

    #[test]
    fn exhausted_symbols_default_to_unit() {
        let src = RepeatingSource::new(vec![1.0; 4], 4.0, 1).unwrap();
        let symbols = DataSymbolSource::new(vec![Complex64::new(2.0, 0.0)], 1.0);
        let mut r = ReferenceSignal::new(Box::new(src), Some(symbols));
        let first = r.request_samples(4);
        assert!(first.iter().all(|c| c.re == 2.0));
        let second = r.request_samples(4);
        assert!(second.iter().all(|c| c.re == 1.0));
    }
}
