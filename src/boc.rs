//! Binary offset carrier (BOC) upsampling and the PRN code table boundary.
//!
//! Code tables themselves are opaque lookup data out of this crate's scope; this module
//! supplies the one reusable transform (the BOC upsampler) plus a trait a caller implements to
//! plug in real code tables, with a built-in analytically-generatable GPS L1 C/A generator to
//! exercise the rest of the pipeline without external data.

use crate::error::{Error, Result};

/// Upsample a binary chip sequence by a BOC subcarrier of ratio `k = 2m/n`: each chip `c`
/// becomes a block of `k` values alternating `c, -c` (equivalently, XOR with the subcarrier
/// square wave). `m/n` must reduce to an integer.
///
/// Input chips are `+-1`-valued; so is the output.
pub fn boc_upsample(chips: &[f64], m: u32, n: u32) -> Result<Vec<f64>> {
    if n == 0 || (2 * m) % n != 0 {
        return Err(Error::NonIntegerBocRatio { m, n });
    }
    let k = (2 * m / n) as usize;
    let mut out = Vec::with_capacity(chips.len() * k);
    for &c in chips {
        for half in 0..k {
            out.push(if half % 2 == 0 { c } else { -c });
        }
    }
    Ok(out)
}

/// A GNSS system/signal code table: opaque lookup data keyed by PRN.
///
/// Concrete implementations supply raw chip arrays (and, for modern signals, overlay codes and
/// pilot/data components); this crate treats the contents as opaque and ships only the trait
/// boundary plus one analytically-derivable example ([`GpsL1Ca`]).
pub trait PrnTable {
    /// `+-1`-valued chip array for the given PRN, at this table's native chip rate.
    fn chips(&self, prn: u32) -> Result<Vec<f64>>;

    /// Native chip rate in chips/second.
    fn chip_rate(&self) -> f64;
}

/// GPS L1 C/A: 1023-chip Gold codes at 1.023 Mcps, generated from the two G1/G2 LFSR taps
/// rather than stored as a table.
pub struct GpsL1Ca;

const G2_TAPS: [(u32, u32); 32] = [
    (2, 6), (3, 7), (4, 8), (5, 9), (1, 9), (2, 10), (1, 8), (2, 9),
    (3, 10), (2, 3), (3, 4), (5, 6), (6, 7), (7, 8), (8, 9), (9, 10),
    (1, 4), (2, 5), (3, 6), (4, 7), (5, 8), (6, 9), (1, 3), (4, 6),
    (5, 7), (6, 8), (7, 9), (8, 10), (1, 6), (2, 7), (3, 8), (4, 9),
];

impl GpsL1Ca {
    const LENGTH: usize = 1023;
    pub const CHIP_RATE_HZ: f64 = 1_023_000.0;

    /// PRNs 1..=32 are defined by the G2 tap table above.
    pub fn generate(prn: u32) -> Result<Vec<f64>> {
        let (t1, t2) = *G2_TAPS.get(prn as usize - 1).ok_or_else(|| Error::UnknownPrn {
            system: "GPS".into(),
            name: "L1CA".into(),
            prn,
        })?;

        let mut g1 = [true; 10];
        let mut g2 = [true; 10];
        let mut chips = Vec::with_capacity(Self::LENGTH);
        for _ in 0..Self::LENGTH {
            let g1_out = g1[9];
            let g2_out = g2[t1 as usize - 1] ^ g2[t2 as usize - 1];
            chips.push(if g1_out ^ g2_out { -1.0 } else { 1.0 });

            let g1_fb = g1[9] ^ g1[2];
            let g2_fb = g2[9] ^ g2[8] ^ g2[7] ^ g2[5] ^ g2[2] ^ g2[1];
            for i in (1..10).rev() {
                g1[i] = g1[i - 1];
                g2[i] = g2[i - 1];
            }
            g1[0] = g1_fb;
            g2[0] = g2_fb;
        }
        Ok(chips)
    }
}

impl PrnTable for GpsL1Ca {
    fn chips(&self, prn: u32) -> Result<Vec<f64>> {
        Self::generate(prn)
    }

    fn chip_rate(&self) -> f64 {
        Self::CHIP_RATE_HZ
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boc_1_1_doubles_rate_and_alternates_sign() {
        let chips = [1.0, -1.0];
        let out = boc_upsample(&chips, 1, 1).unwrap();
        assert_eq!(out, vec![1.0, -1.0, -1.0, 1.0]);
    }

    #[test]
    fn rejects_non_integer_ratio() {
        assert!(boc_upsample(&[1.0], 1, 3).is_err());
    }

    #[test]
    fn gps_l1ca_prn1_has_correct_length_and_is_balanced() {
        let chips = GpsL1Ca::generate(1).unwrap();
        assert_eq!(chips.len(), GpsL1Ca::LENGTH);
        assert!(chips.iter().all(|&c| c == 1.0 || c == -1.0));
    }

    #[test]
    fn gps_l1ca_unknown_prn_is_rejected() {
        assert!(matches!(
            GpsL1Ca::generate(99),
            Err(Error::UnknownPrn { .. })
        ));
    }
}
