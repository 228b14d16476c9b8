//! Output adapter: scales and interleaves complex samples for a raw IQ capture file.
//!
//! The file writer itself (and the metadata sidecar) is out of scope; this module supplies
//! only the boundary conversion the core must expose so a caller's writer has
//! something concrete to consume. Per the design notes, the core keeps a native complex type
//! throughout and leaves the real/imaginary split to this adapter rather than threading
//! parallel arrays through the pipeline.

use num_complex::Complex64;

/// Full-scale amplitude of a signed 16-bit sample.
const I16_FULL_SCALE: f64 = 32_767.0; // 2^15 - 1

/// Compute the linear scale factor for a target full-scale power level in dBFS, e.g.
/// `scale_factor_from_dbfs(-3.0) == (2^15 - 1) / 10^(-3.0 / 20)`.
pub fn scale_factor_from_dbfs(full_scale_dbfs: f64) -> f64 {
    I16_FULL_SCALE / 10f64.powf(full_scale_dbfs / 20.0)
}

/// Scale and convert complex samples to interleaved (I, Q, I, Q, ...) 16-bit signed integers,
/// saturating at the `i16` range.
pub fn to_i16_interleaved(samples: &[Complex64], scale: f64) -> Vec<i16> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        out.push(scale_to_i16(s.re * scale));
        out.push(scale_to_i16(s.im * scale));
    }
    out
}

/// Scale and convert complex samples to interleaved 32-bit float I/Q pairs, with no clamping.
pub fn to_f32_interleaved(samples: &[Complex64], scale: f64) -> Vec<f32> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        out.push((s.re * scale) as f32);
        out.push((s.im * scale) as f32);
    }
    out
}

fn scale_to_i16(v: f64) -> i16 {
    v.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_scale_maps_to_i16_max() {
        let scale = scale_factor_from_dbfs(0.0);
        let samples = [Complex64::new(1.0, -1.0)];
        let out = to_i16_interleaved(&samples, scale);
        assert_eq!(out, vec![32_767, -32_767]);
    }

    #[test]
    fn clamps_out_of_range_values() {
        let samples = [Complex64::new(10.0, -10.0)];
        let out = to_i16_interleaved(&samples, I16_FULL_SCALE);
        assert_eq!(out, vec![i16::MAX, i16::MIN]);
    }

    #[test]
    fn float_path_is_unscaled_identity_at_unit_scale() {
        let samples = [Complex64::new(0.5, -0.25)];
        let out = to_f32_interleaved(&samples, 1.0);
        assert_eq!(out, vec![0.5f32, -0.25f32]);
    }
}
