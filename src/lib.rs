//! Streaming baseband IQ synthesis for GNSS signal scenarios.
//!
//! The pipeline is a leaves-first stack of pull-based stages: [`source::SampleSource`] chips
//! feed a [`reference::ReferenceSignal`] (data-symbol segmenting), which feeds a
//! [`modulated::ModulatedSignal`] (power/Doppler/time-warp), several of which are aggregated by
//! [`composite::Composite`] onto a common high-rate grid, anti-alias filtered, and downsampled
//! to the output rate. [`poly::PiecewisePolynomial`] is the shared evaluator behind every
//! time-varying profile.
//!
//! Scenario file parsing, the PRN code tables' raw data, and fixed-point output-file writing
//! are out of scope; [`scenario`], [`boc::PrnTable`], and [`output`] define only the boundary
//! types a caller wires those external pieces through.

pub mod boc;
pub mod composite;
pub mod error;
pub mod modulated;
pub mod output;
pub mod poly;
pub mod reference;
pub mod resample;
pub mod scenario;
pub mod source;

pub use error::{Error, Result};
