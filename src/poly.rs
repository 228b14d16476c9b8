//! Piecewise polynomials: the value-typed evaluator shared by every time-varying profile
//! (power, Doppler, pseudorange, signal-time warp) in the pipeline.
//!
//! A [`PiecewisePolynomial`] is immutable once built and cheap to clone (it is typically
//! wrapped in an `Arc` by callers that share one profile across several signals). Evaluation
//! never fails: points outside the breakpoint range silently clamp to the nearest end piece,
//! per the documented extrapolation policy.

use crate::error::{Error, Result};
use std::sync::Arc;

/// Magic word identifying the binary piecewise-polynomial file format (little-endian).
pub const PP_FILE_MAGIC: u32 = 0x7053_7750;

/// A shared, immutable handle to a piecewise polynomial. Cheap to clone.
pub type PolyHandle = Arc<PiecewisePolynomial>;

/// Breakpoints plus per-piece coefficients, in descending-power order.
///
/// Piece `i` spans `(breaks[i], breaks[i + 1]]` (the first piece also covers everything at or
/// below `breaks[0]`, and the last piece covers everything above `breaks[N - 1]`) and is
/// evaluated as `sum_k coefs[i][k] * (x - breaks[i])^(order - 1 - k)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewisePolynomial {
    breaks: Vec<f64>,
    /// `coefs[i]` always has length `order`; shorter source rows are left-padded with zeros.
    coefs: Vec<Vec<f64>>,
    order: usize,
}

impl PiecewisePolynomial {
    /// Build a piecewise polynomial from breakpoints and per-piece coefficient rows.
    ///
    /// `coefs.len()` must equal `breaks.len() - 1`. Rows shorter than the longest row are
    /// left-padded with zeros so every piece shares a common order, matching the binary file
    /// format's `C_i <= O` convention.
    pub fn new(breaks: Vec<f64>, coefs: Vec<Vec<f64>>) -> Result<Self> {
        if breaks.len() < 2 {
            return Err(Error::TooFewBreaks(breaks.len()));
        }
        for i in 1..breaks.len() {
            if !(breaks[i] > breaks[i - 1]) {
                return Err(Error::BreaksNotIncreasing(i));
            }
        }
        let expected = breaks.len() - 1;
        if coefs.len() != expected {
            return Err(Error::CoefficientRowMismatch {
                expected,
                got: coefs.len(),
            });
        }
        let order = coefs.iter().map(Vec::len).max().unwrap_or(0);
        let coefs = coefs
            .into_iter()
            .map(|row| {
                let mut padded = vec![0.0; order - row.len()];
                padded.extend(row);
                padded
            })
            .collect();
        Ok(Self {
            breaks,
            coefs,
            order,
        })
    }

    /// Number of breakpoints.
    pub fn len(&self) -> usize {
        self.breaks.len()
    }

    /// Polynomial order (number of coefficients per piece).
    pub fn order(&self) -> usize {
        self.order
    }

    pub fn breaks(&self) -> &[f64] {
        &self.breaks
    }

    pub fn coefs(&self) -> &[Vec<f64>] {
        &self.coefs
    }

    /// Last breakpoint; the end of the domain this polynomial was fit over.
    pub fn last_break(&self) -> f64 {
        *self.breaks.last().expect("breaks is never empty")
    }

    pub fn first_break(&self) -> f64 {
        self.breaks[0]
    }

    /// Locate the piece index covering `x`, via clamped binary search: `x <= breaks[0]` maps to
    /// piece 0, `x > breaks[N-1]` maps to piece `N-2`, otherwise the piece whose upper break is
    /// the first strictly greater than `x`.
    fn locate(&self, x: f64) -> usize {
        let n = self.breaks.len();
        if x <= self.breaks[0] {
            return 0;
        }
        if x > self.breaks[n - 1] {
            return n - 2;
        }
        // Binary search for the first break strictly greater than x; that break's index
        // minus one is the covering piece.
        let mut lo = 0usize;
        let mut hi = n - 1;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.breaks[mid] < x {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo - 1
    }

    /// Evaluate at a single point via Horner's method on the located piece.
    pub fn eval(&self, x: f64) -> f64 {
        let piece = self.locate(x);
        let dx = x - self.breaks[piece];
        let row = &self.coefs[piece];
        let mut acc = 0.0;
        for &c in row {
            acc = acc * dx + c;
        }
        acc
    }

    /// Evaluate at every point in `xs`, independently. Vectorized convenience over [`eval`](Self::eval).
    pub fn eval_vec(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.eval(x)).collect()
    }

    /// Parse a polynomial from the binary format described in the external interface: magic
    /// word, break count, breakpoints, a per-piece offset table (ignored — see `DESIGN.md`),
    /// then `N - 1` length-prefixed coefficient rows.
    pub fn read_bytes(data: &[u8]) -> Result<Self> {
        const HEADER: usize = 20;
        if data.len() < HEADER {
            return Err(Error::TruncatedFile {
                needed: HEADER,
                had: data.len(),
            });
        }
        let magic = u32::from_le_bytes(data[0..4].try_into().unwrap());
        if magic != PP_FILE_MAGIC {
            return Err(Error::BadMagic {
                expected: PP_FILE_MAGIC,
                got: magic,
            });
        }
        let n = i32::from_le_bytes(data[16..20].try_into().unwrap());
        if n < 2 {
            return Err(Error::TooFewBreaks(n.max(0) as usize));
        }
        let n = n as usize;

        let mut offset = HEADER;
        let breaks_len = 8 * n;
        require(data, offset, breaks_len)?;
        let breaks: Vec<f64> = data[offset..offset + breaks_len]
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
            .collect();
        offset += breaks_len;

        // Per-piece byte-offset lookup table: 4 * (N - 1) bytes, ignored by this reader.
        let lookup_len = 4 * (n - 1);
        require(data, offset, lookup_len)?;
        offset += lookup_len;

        let mut coefs = Vec::with_capacity(n - 1);
        for _ in 0..n - 1 {
            require(data, offset, 4)?;
            let c_i = i32::from_le_bytes(data[offset..offset + 4].try_into().unwrap());
            offset += 4;
            let c_i = c_i.max(0) as usize;
            let row_len = 8 * c_i;
            require(data, offset, row_len)?;
            let row: Vec<f64> = data[offset..offset + row_len]
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
                .collect();
            offset += row_len;
            coefs.push(row);
        }

        Self::new(breaks, coefs)
    }

    /// Serialize to the binary format. Emits a zero-length per-piece lookup table (see Open
    /// Question 1 in `DESIGN.md`): a reader that ignores it, like [`read_bytes`](Self::read_bytes),
    /// round-trips correctly, but this writer is not interoperable with readers that actually
    /// consume offsets from that table.
    pub fn write_bytes(&self) -> Vec<u8> {
        let n = self.breaks.len();
        let mut out = Vec::new();
        out.extend_from_slice(&PP_FILE_MAGIC.to_le_bytes());
        out.extend_from_slice(&[0u8; 12]); // bytes 4..16: reserved/unused by this format.
        out.extend_from_slice(&(n as i32).to_le_bytes());
        for b in &self.breaks {
            out.extend_from_slice(&b.to_le_bytes());
        }
        // Zero-length lookup table: (n - 1) zero offsets. See `DESIGN.md` for why this writer
        // emits a zero-length table rather than real byte offsets.
        out.extend_from_slice(&vec![0u8; 4 * (n - 1)]);
        for row in &self.coefs {
            out.extend_from_slice(&(row.len() as i32).to_le_bytes());
            for c in row {
                out.extend_from_slice(&c.to_le_bytes());
            }
        }
        out
    }
}

fn require(data: &[u8], offset: usize, len: usize) -> Result<()> {
    if data.len() < offset + len {
        Err(Error::TruncatedFile {
            needed: offset + len,
            had: data.len(),
        })
    } else {
        Ok(())
    }
}

/// Sampling resolution (seconds) used by [`invert_pseudorange`] when breakpoints are sparse.
pub const PSEUDORANGE_RESOLUTION_S: f64 = 0.1;

/// Invert a pseudorange profile `p(t)` (meters vs true time `t`) into a piecewise polynomial
/// mapping *signal time* `ts = t - p(t) / c` back to true time `t`.
///
/// `p` is evaluated densely enough that no gap between consecutive evaluation points exceeds
/// [`PSEUDORANGE_RESOLUTION_S`], then a natural cubic spline is fit through the `(ts, t)` pairs.
/// Because `p` need not be analytically invertible, the returned spline's accuracy is bounded
/// by this sampling density, not by floating-point precision.
pub fn invert_pseudorange(p: &PiecewisePolynomial, speed_of_light: f64) -> Result<PiecewisePolynomial> {
    let t_samples = dense_evaluation_points(p.breaks(), PSEUDORANGE_RESOLUTION_S);
    let ts: Vec<f64> = t_samples
        .iter()
        .map(|&t| t - p.eval(t) / speed_of_light)
        .collect();
    natural_cubic_spline(&ts, &t_samples)
}

/// Insert a dense grid between breakpoints whose spacing exceeds `resolution`, keeping the
/// original endpoints and returning a unique, sorted vector.
fn dense_evaluation_points(breaks: &[f64], resolution: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(breaks.len());
    out.push(breaks[0]);
    for w in breaks.windows(2) {
        let (a, b) = (w[0], w[1]);
        let span = b - a;
        if span > resolution {
            let steps = (span / resolution).ceil() as usize;
            for k in 1..steps {
                out.push(a + span * (k as f64) / (steps as f64));
            }
        }
        out.push(b);
    }
    out.dedup_by(|a, b| (*a - *b).abs() <= f64::EPSILON);
    out
}

/// Fit a natural cubic spline through `(x[i], y[i])`, `x` strictly increasing, and return it as
/// a degree-3 [`PiecewisePolynomial`] in the descending-power coefficient layout this module
/// otherwise uses. Standard tridiagonal second-derivative solve (Thomas algorithm).
fn natural_cubic_spline(x: &[f64], y: &[f64]) -> Result<PiecewisePolynomial> {
    let n = x.len();
    if n < 2 {
        return Err(Error::TooFewBreaks(n));
    }
    let mut h = vec![0.0; n - 1];
    for i in 0..n - 1 {
        h[i] = x[i + 1] - x[i];
    }

    // Solve for second derivatives m[i] with natural boundary conditions m[0] = m[n-1] = 0.
    let mut alpha = vec![0.0; n];
    for i in 1..n - 1 {
        alpha[i] = 3.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
    }
    let mut l = vec![1.0; n];
    let mut mu = vec![0.0; n];
    let mut z = vec![0.0; n];
    for i in 1..n - 1 {
        l[i] = 2.0 * (x[i + 1] - x[i - 1]) - h[i - 1] * mu[i - 1];
        mu[i] = h[i] / l[i];
        z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
    }
    let mut c = vec![0.0; n];
    for j in (0..n - 1).rev() {
        c[j] = z[j] - mu[j] * c[j + 1];
    }

    let mut breaks = Vec::with_capacity(n);
    let mut coefs = Vec::with_capacity(n - 1);
    for i in 0..n - 1 {
        let b = (y[i + 1] - y[i]) / h[i] - h[i] * (c[i + 1] + 2.0 * c[i]) / 3.0;
        let d = (c[i + 1] - c[i]) / (3.0 * h[i]);
        // Descending power: d*dx^3 + c*dx^2 + b*dx + a
        coefs.push(vec![d, c[i], b, y[i]]);
        breaks.push(x[i]);
    }
    breaks.push(x[n - 1]);
    PiecewisePolynomial::new(breaks, coefs)
}
