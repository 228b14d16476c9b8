//! Scenario boundary types.
//!
//! These are the plain structs an out-of-scope scenario loader (JSON/XML) would populate; this
//! crate parses no scenario file formats itself.

use crate::poly::PolyHandle;

/// One signal's time-varying profiles, each independently optional.
#[derive(Clone, Default)]
pub struct SignalProfiles {
    pub pseudorange: Option<PolyHandle>,
    pub doppler: Option<PolyHandle>,
    pub power: Option<PolyHandle>,
    pub data_symbols_real: Option<PolyHandle>,
    pub data_symbols_imag: Option<PolyHandle>,
    pub noise_density: Option<PolyHandle>,
}

/// Per-signal scenario parameters.
#[derive(Clone)]
pub struct SignalParams {
    pub prn: u32,
    pub data_rate: f64,
}

/// One enumerated signal in a scenario.
#[derive(Clone)]
pub struct ScenarioSignal {
    pub system: String,
    pub name: String,
    pub signal_params: SignalParams,
    pub carrier_phase: f64,
    pub profiles: SignalProfiles,
}

/// A full scenario: one or more signals sharing an output rate.
#[derive(Clone, Default)]
pub struct Scenario {
    pub signals: Vec<ScenarioSignal>,
}
