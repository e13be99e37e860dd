//! Model evidence by thermodynamic integration over adaptive, population-based
//! Metropolis-Hastings chains. See [`evidence::estimate_log_evidence`] for the pipeline.

pub mod adaptive;
pub mod core;
pub mod distributions;
pub mod error;
pub mod evidence;
pub mod experiment;
pub mod io;
pub mod ladder;
pub mod likelihood;
pub mod metropolis_hastings;
pub mod parameter;
pub mod population;
pub mod ratio;
pub mod stats;

pub use error::{EvidenceError, Result};
pub use evidence::{
    estimate_log_evidence, estimate_model_evidence, EvidenceEstimate, EvidenceSettings,
};
