//! End-to-end pipeline tests exercising each stage's external contract.

use gnss_iq_synth::boc::{boc_upsample, GpsL1Ca};
use gnss_iq_synth::composite::{Composite, CompositeConfig};
use gnss_iq_synth::modulated::{ModulatedSignal, ModulationProfiles};
use gnss_iq_synth::poly::PiecewisePolynomial;
use gnss_iq_synth::reference::{DataSymbolSource, ReferenceSignal};
use gnss_iq_synth::source::{RepeatingSource, SampleSource, SineSource};
use num_complex::Complex64;
use std::sync::Arc;

const TOLERANCE: f64 = 1e-6;

#[test]
fn full_stack_gps_l1ca_source_through_composite() {
    let chips = GpsL1Ca::generate(1).unwrap();
    let source = RepeatingSource::new(chips, GpsL1Ca::CHIP_RATE_HZ, 1).unwrap();
    let symbols = DataSymbolSource::new(
        vec![Complex64::new(1.0, 0.0), Complex64::new(-1.0, 0.0)],
        0.02,
    );
    let reference = ReferenceSignal::new(Box::new(source), Some(symbols));

    let power = Arc::new(PiecewisePolynomial::new(vec![0.0, 10.0], vec![vec![1.0]]).unwrap());
    let profiles = ModulationProfiles {
        power: Some(power),
        ..Default::default()
    };
    let modulated = ModulatedSignal::new(reference, profiles, 0.0);

    let mut composite = Composite::new(CompositeConfig::new(2_046_000.0)).unwrap();
    composite.add_signal(modulated, 0.0);

    let chunk = composite.request(0.001).unwrap();
    assert!(!chunk.samples.is_empty());
    assert_eq!(chunk.samples.len(), chunk.time.len());
    assert!(chunk.samples.iter().all(|s| s.norm().is_finite()));
}

#[test]
fn repeating_source_advance_then_request() {
    let mut src = RepeatingSource::new(vec![1.0, -1.0, 1.0, -1.0], 1.0, 1).unwrap();
    let first = src.request_samples(3);
    assert_eq!(first.iter().map(|c| c.re).collect::<Vec<_>>(), vec![1.0, -1.0, 1.0]);
    src.advance(2);
    let second = src.request_samples(3);
    assert_eq!(second.iter().map(|c| c.re).collect::<Vec<_>>(), vec![-1.0, 1.0, -1.0]);
}

#[test]
fn piecewise_polynomial_evaluates_clamped_at_boundaries() {
    let pp = PiecewisePolynomial::new(
        vec![0.0, 1.0, 2.0],
        vec![vec![0.0, 1.0, 0.0], vec![0.0, 1.0, 1.0]],
    )
    .unwrap();
    let xs = [-1.0, 0.0, 0.5, 1.0, 1.5, 3.0];
    let expect = [-1.0, 0.0, 0.5, 1.0, 1.5, 3.0];
    let got = pp.eval_vec(&xs);
    for (g, e) in got.iter().zip(expect) {
        assert!((g - e).abs() < TOLERANCE);
    }
}

#[test]
fn nearest_lower_holds_last_seen_value() {
    let x = [0.0, 3.0, 7.0, 16.0, 24.0];
    let y: Vec<Complex64> = [50.0, 51.0, 52.0, 53.0, 54.0]
        .iter()
        .map(|&v| Complex64::new(v, 0.0))
        .collect();
    let xi = [0.0, 5.0, 10.0, 15.0, 20.0, 25.0];
    let out = gnss_iq_synth::resample::nearest_lower(&x, &y, &xi).unwrap();
    let expect = [50.0, 51.0, 52.0, 52.0, 53.0, 54.0];
    for (o, e) in out.iter().zip(expect) {
        assert_eq!(o.re, e);
    }
}

#[test]
fn doppler_phase_continuity_across_calls() {
    let rate = 1000.0;
    let doppler = Arc::new(PiecewisePolynomial::new(vec![-1.0, 1e9], vec![vec![100.0]]).unwrap());
    let reference = ReferenceSignal::new(Box::new(SineSource::new(0.0, rate).unwrap()), None);
    let profiles = ModulationProfiles {
        doppler: Some(doppler),
        ..Default::default()
    };
    let mut m = ModulatedSignal::new(reference, profiles, 0.0);
    let first = m.request(1.0);
    let second = m.request(1.0);
    let delta = (second.samples[0].arg() - first.samples.last().unwrap().arg()).rem_euclid(
        std::f64::consts::TAU,
    );
    let expect = (std::f64::consts::TAU * 100.0 / rate).rem_euclid(std::f64::consts::TAU);
    assert!((delta - expect).abs() < 1e-6);
}

#[test]
fn composite_sums_two_sources_elementwise() {
    let rate = 8000.0;
    let mk = |f| {
        let reference = ReferenceSignal::new(Box::new(SineSource::new(f, rate).unwrap()), None);
        ModulatedSignal::new(reference, ModulationProfiles::default(), 0.0)
    };
    let mut composite = Composite::new(CompositeConfig::new(rate).with_oversample(1)).unwrap();
    composite.add_signal(mk(1000.0), 0.0);
    composite.add_signal(mk(2000.0), 0.0);

    let mut a = mk(1000.0);
    let mut b = mk(2000.0);
    let ea = a.request(0.01);
    let eb = b.request(0.01);
    let chunk = composite.request(0.01).unwrap();
    for i in 0..chunk.samples.len() {
        let expect = ea.samples[i] + eb.samples[i];
        assert!((chunk.samples[i] - expect).norm() < 1e-9);
    }
}

#[test]
fn pseudorange_inversion_does_not_panic_on_degenerate_profile() {
    // p(t) = c * t means signal_time(t) = t - p(t)/c = 0 for all t: a fully degenerate,
    // non-invertible mapping. The fit either rejects the duplicate breakpoints or degrades
    // gracefully -- either is acceptable, a panic is not.
    let c = 299_792_458.0;
    let p = PiecewisePolynomial::new(vec![0.0, 10.0], vec![vec![c, 0.0]]).unwrap();
    let _ = gnss_iq_synth::poly::invert_pseudorange(&p, c);
}

#[test]
fn boc_1_1_preserves_chip_energy_and_doubles_length() {
    let chips = vec![1.0, -1.0, 1.0];
    let up = boc_upsample(&chips, 1, 1).unwrap();
    assert_eq!(up.len(), chips.len() * 2);
    assert!(up.iter().all(|&c| c == 1.0 || c == -1.0));
}
