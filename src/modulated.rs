//! `ModulatedSignal`: applies power scaling, Doppler carrier rotation, and signal-time ->
//! true-time warping on top of a [`ReferenceSignal`].

use crate::error::{Error, Result};
use crate::poly::PolyHandle;
use crate::reference::ReferenceSignal;
use log::warn;
use num_complex::Complex64;
use std::f64::consts::TAU;

/// One request's output: the true-time axis, the modulated samples, and whether the stream
/// has ended (its time-warp profile's domain has been exceeded).
pub struct ModulatedChunk {
    pub true_time: Vec<f64>,
    pub samples: Vec<Complex64>,
    pub stream_ended: bool,
}

/// Optional independently-enabled profiles for one modulated signal.
#[derive(Default, Clone)]
pub struct ModulationProfiles {
    /// Linear power vs true time.
    pub power: Option<PolyHandle>,
    /// Doppler shift (Hz) vs true time.
    pub doppler: Option<PolyHandle>,
    /// True time as a function of signal time.
    pub time_warp: Option<PolyHandle>,
}

pub struct ModulatedSignal {
    upstream: ReferenceSignal,
    profiles: ModulationProfiles,
    signal_time: f64,
    phase: f64,
    /// Latched once the time-warp domain has been exceeded: once this is set the stream stays
    /// empty forever, since `signal_time` keeps advancing past the warp's domain on every
    /// subsequent call.
    ended: bool,
    /// Last emitted `(true_time, doppler_freq)` pair, carried across calls so the phase
    /// integral bridges the (real, nonzero) time gap between the end of one chunk and the
    /// start of the next rather than resetting to zero at every chunk boundary.
    doppler_carry: Option<(f64, f64)>,
}

impl ModulatedSignal {
    /// `initial_phase` is `phi_0` in radians. Structural validation of the PP operands
    /// themselves (non-empty, increasing breaks) already happened in [`PiecewisePolynomial::new`];
    /// this constructor performs no further validation of its own — in particular it validates
    /// only the profiles it was actually given, not e.g. the Doppler PP in place of the warp PP.
    pub fn new(
        upstream: ReferenceSignal,
        profiles: ModulationProfiles,
        initial_phase: f64,
    ) -> Self {
        Self {
            upstream,
            profiles,
            signal_time: 0.0,
            phase: initial_phase.rem_euclid(TAU),
            ended: false,
            doppler_carry: None,
        }
    }

    pub fn rate(&self) -> f64 {
        self.upstream.rate()
    }

    /// Whether this signal's underlying sample source prefers nearest-lower (square-wave)
    /// interpolation downstream.
    pub fn use_neighbor_interp(&self) -> bool {
        self.upstream.use_neighbor_interp()
    }

    /// Request `duration` seconds of *signal time* worth of samples and return the resulting
    /// true-time axis, modulated samples, and stream-ended flag.
    pub fn request(&mut self, duration: f64) -> ModulatedChunk {
        if self.ended {
            return ModulatedChunk {
                true_time: Vec::new(),
                samples: Vec::new(),
                stream_ended: true,
            };
        }

        let rate = self.upstream.rate();
        let t = 1.0 / rate;
        let m = (duration * rate).round().max(0.0) as usize;
        let mut samples = self.upstream.request_samples(m);

        let sig_t: Vec<f64> = (0..m).map(|k| self.signal_time + k as f64 * t).collect();

        let (true_t, stream_ended) = match &self.profiles.time_warp {
            Some(warp) => {
                let last_break = warp.last_break();
                let kept = sig_t.iter().take_while(|&&s| s < last_break).count();
                let ended = kept < sig_t.len();
                samples.truncate(kept);
                let true_t = warp.eval_vec(&sig_t[..kept]);
                (true_t, ended)
            }
            None => (sig_t, false),
        };

        // Signal-time advances by the *original*, untruncated m: future calls stay truncated
        // (or empty) even though we keep moving signal_time forward.
        self.signal_time += m as f64 * t;

        if true_t.is_empty() {
            if stream_ended {
                self.ended = true;
                warn!("modulated signal's time-warp domain exceeded; stream ending");
            }
            return ModulatedChunk {
                true_time: true_t,
                samples,
                stream_ended,
            };
        }

        if let Some(power) = &self.profiles.power {
            for (s, &tt) in samples.iter_mut().zip(&true_t) {
                *s *= power.eval(tt).sqrt();
            }
        }

        if let Some(doppler) = &self.profiles.doppler {
            let f: Vec<f64> = doppler.eval_vec(&true_t);
            let phi = cumulative_phase(self.phase, &f, &true_t, self.doppler_carry);
            for (s, &p) in samples.iter_mut().zip(&phi) {
                *s *= Complex64::from_polar(1.0, p);
            }
            self.phase = phi.last().copied().unwrap_or(self.phase).rem_euclid(TAU);
            self.doppler_carry = Some((*true_t.last().unwrap(), *f.last().unwrap()));
        }

        if stream_ended {
            self.ended = true;
        }

        ModulatedChunk {
            true_time: true_t,
            samples,
            stream_ended,
        }
    }
}

/// `phi[k] = phi0 + 2*pi * integral_0^k f dt`, trapezoidal over `true_t`, with the
/// single-sample fallback `phi0 + 2*pi * true_t[0] * f[0]` when `m == 1`.
///
/// `carry`, when present, is the `(true_time, doppler_freq)` pair the previous chunk ended on;
/// its trapezoid segment into `true_t[0]` is folded into `phi[0]` so the phase integral stays
/// continuous across the real time gap between chunks rather than resetting at every boundary.
/// With no carry (the very first chunk), the bridging segment degenerates to the plain
/// single-sample formula, integrating from time zero.
fn cumulative_phase(phi0: f64, f: &[f64], true_t: &[f64], carry: Option<(f64, f64)>) -> Vec<f64> {
    let m = f.len();
    if m == 0 {
        return Vec::new();
    }
    let bridge = match carry {
        Some((t_prev, f_prev)) => 0.5 * (f_prev + f[0]) * (true_t[0] - t_prev),
        None => true_t[0] * f[0],
    };
    if m == 1 {
        return vec![phi0 + TAU * bridge];
    }
    let mut out = Vec::with_capacity(m);
    let mut acc = bridge;
    out.push(phi0 + TAU * acc);
    for k in 1..m {
        let dt = true_t[k] - true_t[k - 1];
        acc += 0.5 * (f[k] + f[k - 1]) * dt;
        out.push(phi0 + TAU * acc);
    }
    out
}

/// A structural-validity check callers may run on a constructed warp profile independent of
/// any other profile, rather than validating the Doppler PP in its place at construction.
pub fn validate_time_warp(warp: &PolyHandle) -> Result<()> {
    if warp.len() < 2 {
        return Err(Error::TooFewBreaks(warp.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceSignal;
    use crate::source::SineSource;
    use std::sync::Arc;

    fn dc_reference(rate: f64) -> ReferenceSignal {
        ReferenceSignal::new(Box::new(SineSource::new(0.0, rate).unwrap()), None)
    }

    #[test]
    fn no_profiles_passes_through_and_advances_true_time_uniformly() {
        let rate = 1000.0;
        let mut m = ModulatedSignal::new(dc_reference(rate), ModulationProfiles::default(), 0.0);
        let chunk = m.request(0.01);
        assert_eq!(chunk.samples.len(), 10);
        for (k, &tt) in chunk.true_time.iter().enumerate() {
            assert!((tt - chunk.true_time[0] - k as f64 / rate).abs() < 1e-12);
        }
    }

    #[test]
    fn doppler_phase_continuity_across_calls() {
        let rate = 1000.0;
        let doppler = Arc::new(crate::poly::PiecewisePolynomial::new(
            vec![-1.0, 0.0, 1e9],
            vec![vec![100.0], vec![100.0]],
        )
        .unwrap());
        let profiles = ModulationProfiles {
            doppler: Some(doppler),
            ..Default::default()
        };
        let mut m = ModulatedSignal::new(dc_reference(rate), profiles, 0.0);
        let first = m.request(1.0);
        let second = m.request(1.0);
        let last_phase = first.samples.last().unwrap().arg();
        let first_phase_next = second.samples.first().unwrap().arg();
        let expected_delta = TAU * 100.0 * (1.0 / rate);
        let mut delta = first_phase_next - last_phase;
        delta = delta.rem_euclid(TAU);
        let expected = expected_delta.rem_euclid(TAU);
        assert!((delta - expected).abs() < 1e-6, "delta={delta} expected={expected}");
    }

    #[test]
    fn time_warp_truncation_sets_stream_ended() {
        let rate = 10.0;
        let warp = Arc::new(
            crate::poly::PiecewisePolynomial::new(vec![0.0, 0.5], vec![vec![1.0, 0.0]]).unwrap(),
        );
        let profiles = ModulationProfiles {
            time_warp: Some(warp),
            ..Default::default()
        };
        let mut m = ModulatedSignal::new(dc_reference(rate), profiles, 0.0);
        let chunk = m.request(1.0); // requests 10 samples but warp domain ends at 0.5s
        assert!(chunk.samples.len() < 10);
        assert!(chunk.stream_ended);
        let next = m.request(1.0);
        assert!(next.samples.is_empty());
        assert!(next.stream_ended);
    }
}
