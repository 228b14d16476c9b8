//! Resampling a reference axis onto a query axis.
//!
//! Two interpolation strategies are used depending on a source's `use_neighbor_interp` flag
//! (see [`crate::source::SampleSource`]): nearest-lower for square-wave chip streams (avoids
//! ringing at chip transitions), shape-preserving cubic (pchip) for everything else.

use crate::error::{Error, Result};
use num_complex::Complex64;

/// Nearest-lower ("sample and hold") resample: `yi[k] = y[j]` where `j` is the largest index
/// with `x[j] <= xi[k]`, or a zeroed value if no such index exists (`xi[k] < x[0]`).
///
/// `x` must be strictly increasing; `xi` must be weakly increasing (the single forward pass is
/// undefined otherwise, and this is rejected rather than silently misbehaving).
pub fn nearest_lower(x: &[f64], y: &[Complex64], xi: &[f64]) -> Result<Vec<Complex64>> {
    if x.len() != y.len() {
        return Err(Error::AxisLengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    for (i, w) in xi.windows(2).enumerate() {
        if w[1] < w[0] {
            return Err(Error::QueryAxisNotIncreasing(i + 1));
        }
    }
    let mut out = Vec::with_capacity(xi.len());
    let mut j = 0usize;
    for &q in xi {
        while j < x.len() && x[j] <= q {
            j += 1;
        }
        // j is now the first index with x[j] > q (or x.len()); the covering sample is j - 1.
        out.push(if j == 0 {
            Complex64::new(0.0, 0.0)
        } else {
            y[j - 1]
        });
    }
    Ok(out)
}

/// Real-valued convenience wrapper over [`nearest_lower`].
pub fn nearest_lower_real(x: &[f64], y: &[f64], xi: &[f64]) -> Result<Vec<f64>> {
    let yc: Vec<Complex64> = y.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    Ok(nearest_lower(x, &yc, xi)?.iter().map(|c| c.re).collect())
}

/// Shape-preserving (Fritsch-Carlson / PCHIP) cubic interpolation, evaluated independently at
/// each point of `xi`. Outside `[x[0], x[last]]` this clamps to the nearest endpoint value,
/// matching the piecewise-polynomial extrapolation policy used throughout the crate.
pub fn pchip(x: &[f64], y: &[Complex64], xi: &[f64]) -> Result<Vec<Complex64>> {
    if x.len() != y.len() {
        return Err(Error::AxisLengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    if x.len() == 1 {
        return Ok(vec![y[0]; xi.len()]);
    }
    let re: Vec<f64> = y.iter().map(|c| c.re).collect();
    let im: Vec<f64> = y.iter().map(|c| c.im).collect();
    let d_re = pchip_slopes(x, &re);
    let d_im = pchip_slopes(x, &im);

    let n = x.len();
    let mut out = Vec::with_capacity(xi.len());
    let mut j = 0usize;
    for &q in xi {
        if q <= x[0] {
            out.push(Complex64::new(re[0], im[0]));
            continue;
        }
        if q >= x[n - 1] {
            out.push(Complex64::new(re[n - 1], im[n - 1]));
            continue;
        }
        while j + 1 < n - 1 && x[j + 1] < q {
            j += 1;
        }
        let h = x[j + 1] - x[j];
        let t = (q - x[j]) / h;
        out.push(Complex64::new(
            hermite(re[j], re[j + 1], d_re[j], d_re[j + 1], h, t),
            hermite(im[j], im[j + 1], d_im[j], d_im[j + 1], h, t),
        ));
    }
    Ok(out)
}

fn hermite(y0: f64, y1: f64, d0: f64, d1: f64, h: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    h00 * y0 + h10 * h * d0 + h01 * y1 + h11 * h * d1
}

/// Fritsch-Carlson monotone tangent estimation.
fn pchip_slopes(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut delta = vec![0.0; n - 1];
    for i in 0..n - 1 {
        delta[i] = (y[i + 1] - y[i]) / (x[i + 1] - x[i]);
    }
    let mut d = vec![0.0; n];
    d[0] = delta[0];
    d[n - 1] = delta[n - 2];
    for i in 1..n - 1 {
        if delta[i - 1] * delta[i] <= 0.0 {
            d[i] = 0.0;
        } else {
            let h0 = x[i] - x[i - 1];
            let h1 = x[i + 1] - x[i];
            let w1 = 2.0 * h1 + h0;
            let w2 = h1 + 2.0 * h0;
            d[i] = (w1 + w2) / (w1 / delta[i - 1] + w2 / delta[i]);
        }
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_lower_holds_last_seen_value() {
        let x = [0.0, 3.0, 7.0, 16.0, 24.0];
        let y: Vec<Complex64> = [50.0, 51.0, 52.0, 53.0, 54.0]
            .iter()
            .map(|&v| Complex64::new(v, 0.0))
            .collect();
        let xi = [0.0, 5.0, 10.0, 15.0, 20.0, 25.0];
        let out = nearest_lower(&x, &y, &xi).unwrap();
        let expect = [50.0, 51.0, 52.0, 52.0, 53.0, 54.0];
        for (o, e) in out.iter().zip(expect) {
            assert_eq!(o.re, e);
        }
    }

    #[test]
    fn below_first_sample_is_zero() {
        let x = [1.0, 2.0];
        let y = [Complex64::new(9.0, 0.0), Complex64::new(10.0, 0.0)];
        let out = nearest_lower(&x, &y, &[0.0]).unwrap();
        assert_eq!(out[0], Complex64::new(0.0, 0.0));
    }

    #[test]
    fn at_or_above_last_sample_holds_last_value() {
        let x = [1.0, 2.0];
        let y = [Complex64::new(9.0, 0.0), Complex64::new(10.0, 0.0)];
        let out = nearest_lower(&x, &y, &[2.0, 100.0]).unwrap();
        assert_eq!(out[0], Complex64::new(10.0, 0.0));
        assert_eq!(out[1], Complex64::new(10.0, 0.0));
    }

    #[test]
    fn rejects_decreasing_query_axis() {
        let x = [0.0, 1.0];
        let y = [Complex64::new(0.0, 0.0); 2];
        assert!(nearest_lower(&x, &y, &[1.0, 0.0]).is_err());
    }

    #[test]
    fn pchip_reproduces_samples_at_nodes() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y: Vec<Complex64> = [0.0, 1.0, 0.0, -1.0]
            .iter()
            .map(|&v| Complex64::new(v, 0.0))
            .collect();
        let out = pchip(&x, &y, &x).unwrap();
        for (o, e) in out.iter().zip(y.iter()) {
            assert!((o.re - e.re).abs() < 1e-9);
        }
    }
}
