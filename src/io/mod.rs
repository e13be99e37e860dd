/*!
Diagnostic output: the per-iteration trace contract and its CSV writers.

Enable the CSV writers via the `csv` feature (on by default).
*/

#[cfg(feature = "csv")]
pub mod csv;

use crate::error::Result;
use crate::parameter::ParameterVector;

/// One MH iteration as seen by a [`TraceSink`].
#[derive(Debug, Clone, Copy)]
pub struct TraceRecord<'a> {
    pub iteration: usize,
    pub temperature: f64,
    pub current: &'a ParameterVector,
    pub proposed: &'a ParameterVector,
    pub current_log_likelihood: f64,
    pub proposed_log_likelihood: f64,
    pub ratio: f64,
    pub accepted: bool,
}

/// An append-only destination for iteration records.
pub trait TraceSink {
    fn record(&mut self, record: &TraceRecord<'_>) -> Result<()>;
}
