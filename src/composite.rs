//! `Composite`: aggregates modulated signals onto a common high-rate grid, applies per-source
//! FDMA carrier offsets, sums, anti-alias filters, and downsamples to the output rate.

use crate::error::{Error, Result};
use crate::modulated::ModulatedSignal;
use crate::resample;
use log::{debug, trace};
use num_complex::Complex64;
use std::collections::VecDeque;
use std::f64::consts::{PI, TAU};

const DEFAULT_OVERSAMPLE: usize = 4;
const DEFAULT_FILTER_ORDER: usize = 60;
const DEFAULT_CUTOFF_SCALE: f64 = 1.0;

/// One aggregated signal plus its ring buffer and FDMA state.
struct Source {
    modulated: ModulatedSignal,
    fdma_hz: f64,
    fdma_phase: f64,
    time_buf: VecDeque<f64>,
    sample_buf: VecDeque<Complex64>,
    ended: bool,
}

/// Windowed-sinc FIR lowpass with a persistent delay line, used as the anti-alias filter ahead
/// of downsampling. Per the design notes, this carries only `order` samples of state across
/// calls rather than refiltering the accumulated output.
struct Fir {
    taps: Vec<f64>,
    delay: VecDeque<Complex64>,
}

impl Fir {
    /// Hamming-windowed sinc lowpass with `order + 1` taps and cutoff `cutoff_norm` expressed
    /// as a fraction of the Nyquist frequency (i.e. in `(0, 1]`).
    fn design_lowpass(order: usize, cutoff_norm: f64) -> Self {
        let n_taps = order + 1;
        let mid = order as f64 / 2.0;
        let fc = cutoff_norm / 2.0; // cycles per sample
        let mut taps: Vec<f64> = (0..n_taps)
            .map(|n| {
                let x = n as f64 - mid;
                let sinc = if x.abs() < 1e-12 {
                    2.0 * fc
                } else {
                    (TAU * fc * x).sin() / (PI * x)
                };
                let window = 0.54 - 0.46 * (TAU * n as f64 / order as f64).cos();
                sinc * window
            })
            .collect();
        let gain: f64 = taps.iter().sum();
        if gain.abs() > 1e-15 {
            for t in &mut taps {
                *t /= gain;
            }
        }
        let delay = VecDeque::from(vec![Complex64::new(0.0, 0.0); n_taps - 1]);
        Self { taps, delay }
    }

    /// Filter `input` through the persistent delay line, direct-form FIR: `y[n] = sum_i
    /// taps[i] * x[n - i]`, reading the delay line (holding `x[n-1], x[n-2], ...`) before
    /// shifting the current sample in.
    fn process(&mut self, input: &[Complex64]) -> Vec<Complex64> {
        let mut out = Vec::with_capacity(input.len());
        for &x in input {
            let mut acc = self.taps[0] * x;
            for (i, &c) in self.taps.iter().enumerate().skip(1) {
                acc += c * self.delay[i - 1];
            }
            self.delay.push_front(x);
            self.delay.truncate(self.taps.len() - 1);
            out.push(acc);
        }
        out
    }
}

/// Builder-style configuration for [`Composite`]. Defaults match a typical 4x-oversampled,
/// 60-tap anti-alias setup.
pub struct CompositeConfig {
    pub output_rate: f64,
    pub oversample: usize,
    pub filter_order: usize,
    pub cutoff_scale: f64,
}

impl CompositeConfig {
    pub fn new(output_rate: f64) -> Self {
        Self {
            output_rate,
            oversample: DEFAULT_OVERSAMPLE,
            filter_order: DEFAULT_FILTER_ORDER,
            cutoff_scale: DEFAULT_CUTOFF_SCALE,
        }
    }

    pub fn with_oversample(mut self, k: usize) -> Self {
        self.oversample = k;
        self
    }

    pub fn with_filter_order(mut self, order: usize) -> Self {
        self.filter_order = order;
        self
    }

    pub fn with_cutoff_scale(mut self, alpha: f64) -> Self {
        self.cutoff_scale = alpha;
        self
    }
}

/// The result of one [`Composite::request`] call.
pub struct CompositeChunk {
    pub time: Vec<f64>,
    pub samples: Vec<Complex64>,
}

pub struct Composite {
    sources: Vec<Source>,
    r_out: f64,
    k: usize,
    r_hi: f64,
    tau_g: f64,
    fir: Option<Fir>,
    sample_counter_hi: u64,
}

impl Composite {
    pub fn new(config: CompositeConfig) -> Result<Self> {
        if config.output_rate <= 0.0 {
            return Err(Error::NonPositiveRate(config.output_rate));
        }
        if config.oversample == 0 {
            return Err(Error::NonPositiveInteger {
                name: "oversample ratio",
                value: config.oversample as i64,
            });
        }
        if !(config.cutoff_scale > 0.0 && config.cutoff_scale <= 1.0) {
            return Err(Error::CutoffOutOfRange(config.cutoff_scale));
        }
        let r_hi = config.oversample as f64 * config.output_rate;
        let (fir, tau_g) = if config.oversample != 1 {
            if config.filter_order == 0 {
                return Err(Error::NonPositiveInteger {
                    name: "filter order",
                    value: 0,
                });
            }
            let cutoff_norm = config.cutoff_scale / config.oversample as f64;
            let fir = Fir::design_lowpass(config.filter_order, cutoff_norm);
            let tau_g = (config.filter_order as f64 / 2.0) / r_hi;
            (Some(fir), tau_g)
        } else {
            (None, 0.0)
        };
        Ok(Self {
            sources: Vec::new(),
            r_out: config.output_rate,
            k: config.oversample,
            r_hi,
            tau_g,
            fir,
            sample_counter_hi: 0,
        })
    }

    /// Register a modulated signal with an optional FDMA carrier offset (Hz).
    pub fn add_signal(&mut self, modulated: ModulatedSignal, fdma_hz: f64) {
        self.sources.push(Source {
            modulated,
            fdma_hz,
            fdma_phase: 0.0,
            time_buf: VecDeque::new(),
            sample_buf: VecDeque::new(),
            ended: false,
        });
    }

    pub fn output_rate(&self) -> f64 {
        self.r_out
    }

    /// Request `duration` seconds of output at the configured output rate.
    pub fn request(&mut self, duration: f64) -> Result<CompositeChunk> {
        let n_hi = (duration * self.r_hi).floor() as i64;
        if n_hi < 1 {
            return Err(Error::ChunkTooSmall {
                duration,
                rate: self.r_hi,
                n_hi,
            });
        }
        let n_hi = n_hi as usize;
        let t_hi: Vec<f64> = (0..n_hi)
            .map(|k| (self.sample_counter_hi + k as u64) as f64 / self.r_hi)
            .collect();
        self.sample_counter_hi += n_hi as u64;

        let mut sum = vec![Complex64::new(0.0, 0.0); n_hi];

        for (index, source) in self.sources.iter_mut().enumerate() {
            let x = fill_and_resample(index, source, duration, &t_hi, self.tau_g)?;
            if source.fdma_hz != 0.0 {
                apply_fdma(source, &t_hi, &x)
                    .into_iter()
                    .enumerate()
                    .for_each(|(i, v)| sum[i] += v);
            } else {
                for (i, v) in x.into_iter().enumerate() {
                    sum[i] += v;
                }
            }
        }

        if let Some(fir) = &mut self.fir {
            trace!("anti-alias filtering {n_hi} high-rate samples");
            let filtered = fir.process(&sum);
            let out_samples: Vec<Complex64> = filtered.iter().step_by(self.k).copied().collect();
            let out_time: Vec<f64> = t_hi.iter().step_by(self.k).copied().collect();
            Ok(CompositeChunk {
                time: out_time,
                samples: out_samples,
            })
        } else {
            Ok(CompositeChunk {
                time: t_hi,
                samples: sum,
            })
        }
    }
}

fn apply_fdma(source: &mut Source, t_hi: &[f64], x: &[Complex64]) -> Vec<Complex64> {
    let t0 = t_hi[0];
    let mut out = Vec::with_capacity(x.len());
    let mut last_t_rel = 0.0;
    for (&xi, &t) in x.iter().zip(t_hi) {
        let t_rel = t - t0;
        last_t_rel = t_rel;
        let phase = source.fdma_phase + TAU * source.fdma_hz * t_rel;
        out.push(xi * Complex64::from_polar(1.0, phase));
    }
    source.fdma_phase = (source.fdma_phase + TAU * source.fdma_hz * last_t_rel).rem_euclid(TAU);
    out
}

fn fill_and_resample(
    index: usize,
    source: &mut Source,
    duration: f64,
    t_hi: &[f64],
    tau_g: f64,
) -> Result<Vec<Complex64>> {
    // (a) Trim leading entries older than the common grid's start.
    while let Some(&front) = source.time_buf.front() {
        if front < t_hi[0] {
            source.time_buf.pop_front();
            source.sample_buf.pop_front();
        } else {
            break;
        }
    }

    // (b) Fill until the buffer spans the requested horizon or the source has ended.
    let horizon = *t_hi.last().unwrap();
    while !source.ended
        && source
            .time_buf
            .back()
            .map(|&t| t < horizon)
            .unwrap_or(true)
    {
        let chunk = source.modulated.request(duration);
        if chunk.samples.is_empty() && chunk.stream_ended {
            source.ended = true;
            break;
        }
        for (t, s) in chunk.true_time.iter().zip(chunk.samples.iter()) {
            let adjusted = if tau_g != 0.0 { t - tau_g } else { *t };
            source.time_buf.push_back(adjusted);
            source.sample_buf.push_back(*s);
        }
        if chunk.stream_ended {
            source.ended = true;
        }
        if chunk.samples.is_empty() {
            // No progress and not yet marked ended defensively avoids spinning forever.
            break;
        }
    }

    if source.time_buf.len() >= 2 {
        let times = source.time_buf.make_contiguous();
        for w in times.windows(2) {
            if !(w[1] > w[0]) {
                return Err(Error::NonMonotonicTimeAxis { index });
            }
        }
    }

    debug!(
        "source {index}: buffer spans [{:?}, {:?}) with {} samples",
        source.time_buf.front(),
        source.time_buf.back(),
        source.time_buf.len()
    );

    let times: Vec<f64> = source.time_buf.iter().copied().collect();
    let samples: Vec<Complex64> = source.sample_buf.iter().copied().collect();

    if times.is_empty() {
        return Ok(vec![Complex64::new(0.0, 0.0); t_hi.len()]);
    }

    if source.modulated.use_neighbor_interp() {
        resample::nearest_lower(&times, &samples, t_hi)
    } else {
        resample::pchip(&times, &samples, t_hi)
    }
}
