/*!
# CSV Writers for Traces and Evidence Samples

- [`CsvTraceSink`] streams one row per MH iteration.
- [`save_evidence_sample`] writes the final per-temperature states.

Enable via the `csv` feature.
*/

use csv::Writer;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::{TraceRecord, TraceSink};
use crate::error::Result;
use crate::evidence::EvidenceSample;

/**
A [`TraceSink`] writing CSV rows.

The header is written with the first record:
`iteration, temperature, current_<name>..., proposed_<name>..., current_log_likelihood,
proposed_log_likelihood, ratio, accepted`.

# Examples

```rust
use evidence_mcmc::io::csv::CsvTraceSink;

let sink = CsvTraceSink::from_writer(Vec::new());
assert_eq!(sink.rows(), 0);
```
*/
pub struct CsvTraceSink<W: Write> {
    writer: Writer<W>,
    rows: usize,
}

impl CsvTraceSink<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_writer(File::create(path)?))
    }
}

impl<W: Write> CsvTraceSink<W> {
    pub fn from_writer(inner: W) -> Self {
        Self {
            writer: Writer::from_writer(inner),
            rows: 0,
        }
    }

    /// Records written so far, header excluded.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn write_header(&mut self, record: &TraceRecord<'_>) -> Result<()> {
        let names = record.current.names();
        let mut header = vec!["iteration".to_string(), "temperature".to_string()];
        header.extend(names.iter().map(|n| format!("current_{n}")));
        header.extend(names.iter().map(|n| format!("proposed_{n}")));
        header.extend(
            [
                "current_log_likelihood",
                "proposed_log_likelihood",
                "ratio",
                "accepted",
            ]
            .map(String::from),
        );
        self.writer.write_record(&header)?;
        Ok(())
    }
}

impl<W: Write> TraceSink for CsvTraceSink<W> {
    fn record(&mut self, record: &TraceRecord<'_>) -> Result<()> {
        if self.rows == 0 {
            self.write_header(record)?;
        }
        let mut row = vec![record.iteration.to_string(), record.temperature.to_string()];
        row.extend(record.current.values().iter().map(f64::to_string));
        row.extend(record.proposed.values().iter().map(f64::to_string));
        row.push(record.current_log_likelihood.to_string());
        row.push(record.proposed_log_likelihood.to_string());
        row.push(record.ratio.to_string());
        row.push(record.accepted.to_string());
        self.writer.write_record(&row)?;
        self.rows += 1;
        Ok(())
    }
}

/**
Saves the final states of an evidence run, one row per state.

Columns: `temperature_index`, `temperature`, `draw`, one column per parameter, then
`log_likelihood`.
*/
pub fn save_evidence_sample<P: AsRef<Path>>(sample: &EvidenceSample, path: P) -> Result<()> {
    let mut wtr = Writer::from_writer(File::create(path)?);

    let mut header = vec![
        "temperature_index".to_string(),
        "temperature".to_string(),
        "draw".to_string(),
    ];
    header.extend(sample.parameter_names());
    header.push("log_likelihood".to_string());
    wtr.write_record(&header)?;

    for (t, (beta, states)) in sample.iter().enumerate() {
        for (d, state) in states.iter().enumerate() {
            let mut row = vec![t.to_string(), beta.to_string(), d.to_string()];
            row.extend(state.theta.values().iter().map(f64::to_string));
            row.push(state.log_likelihood.to_string());
            wtr.write_record(&row)?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptive::FixedCovariance;
    use crate::core::ChainState;
    use crate::distributions::{Constant, Gamma};
    use crate::likelihood::ConstantLikelihood;
    use crate::metropolis_hastings::{MetropolisHastings, TemperedRule};
    use crate::parameter::{Parameter, ParameterVector};
    use nalgebra::DMatrix;
    use std::fs;
    use tempfile::tempdir;

    fn theta(a: f64) -> ParameterVector {
        ParameterVector::new(
            vec![Parameter::new("a", a, Gamma::new(2.0, 1.0).unwrap())],
            Some(Parameter::new("sigma", 0.3, Constant::new(0.3).unwrap())),
        )
    }

    #[test]
    fn trace_has_one_row_per_iteration() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trace.csv");
        {
            let mut mh = MetropolisHastings::new(
                ConstantLikelihood(-1.0),
                FixedCovariance::new(DMatrix::from_element(1, 1, 0.2)).unwrap(),
                TemperedRule::new(0.5),
            )
            .set_seed(42)
            .with_trace(CsvTraceSink::create(&path).unwrap());
            mh.start_sample(theta(1.0)).unwrap();
            mh.get_sample(25).unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        let lines = contents.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 26);
        assert_eq!(
            lines[0],
            "iteration,temperature,current_a,current_sigma,proposed_a,proposed_sigma,\
             current_log_likelihood,proposed_log_likelihood,ratio,accepted"
        );
        assert!(lines[1].starts_with("0,0.5,1,0.3,"));
        assert!(lines[1..]
            .iter()
            .all(|l| l.ends_with(",true") || l.ends_with(",false")));
    }

    #[test]
    fn sink_counts_rows_in_memory() {
        let mut sink = CsvTraceSink::from_writer(Vec::new());
        let (current, proposed) = (theta(1.0), theta(1.5));
        for i in 0..3 {
            sink.record(&TraceRecord {
                iteration: i,
                temperature: 1.0,
                current: &current,
                proposed: &proposed,
                current_log_likelihood: -2.0,
                proposed_log_likelihood: -1.0,
                ratio: 2.0,
                accepted: true,
            })
            .unwrap();
        }
        assert_eq!(sink.rows(), 3);
        sink.flush().unwrap();
    }

    #[test]
    fn evidence_sample_round_trips_through_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("evidence.csv");
        let sample = EvidenceSample::new(
            vec![0.0, 1.0],
            vec![
                vec![ChainState::new(theta(1.0), -3.0), ChainState::new(theta(2.0), -2.5)],
                vec![ChainState::new(theta(1.5), -1.0)],
            ],
        )
        .unwrap();
        save_evidence_sample(&sample, &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["temperature_index", "temperature", "draw", "a", "sigma", "log_likelihood"]
        );
        let rows = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[2][0], "1");
        assert_eq!(rows[1][3].parse::<f64>().unwrap(), 2.0);
        assert_eq!(rows[2][5].parse::<f64>().unwrap(), -1.0);
    }
}
