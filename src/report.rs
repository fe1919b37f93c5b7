//! Report formatting - tables, tornado bars, traceability CSV
//!
//! Every writer takes a caller-supplied sink; nothing here touches global
//! state or decides file locations. The tabular summary is meant for
//! documentation embedding, the CSV for full per-sample traceability.

use std::io::{self, Write};

use tabled::settings::Style;
use tabled::{Table, Tabled};
use thiserror::Error;

use crate::runner::{OutcomeRecord, RunOutcomes};
use crate::sampling::SampleSet;
use crate::sensitivity::SensitivityIndex;
use crate::study::{SensitivityOutcome, StudyReport};

/// Width in characters of the widest tornado bar
const TORNADO_BAR_WIDTH: usize = 30;

/// Errors raised while writing report artifacts
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Tabled)]
struct SensitivityRow {
    #[tabled(rename = "Parameter")]
    parameter: String,
    #[tabled(rename = "S_i")]
    first_order: String,
    #[tabled(rename = "S_Ti")]
    total_order: String,
    #[tabled(rename = "Rank")]
    rank: usize,
}

impl From<&SensitivityIndex> for SensitivityRow {
    fn from(idx: &SensitivityIndex) -> Self {
        Self {
            parameter: idx.parameter.clone(),
            first_order: format!("{:.4}", idx.first_order),
            total_order: format!("{:.4}", idx.total_order),
            rank: idx.rank,
        }
    }
}

/// Write the human-readable study summary
///
/// Always states successful vs. failed sample counts so confidence-interval
/// interpretation can account for reduced effective sample size.
pub fn write_summary<W: Write>(mut w: W, report: &StudyReport) -> Result<(), ReportError> {
    if let Some(ref invention) = report.invention {
        writeln!(w, "Uncertainty study: {invention}")?;
    } else {
        writeln!(w, "Uncertainty study")?;
    }
    writeln!(
        w,
        "Seed {} | base N = {} | completed {}",
        report.seed,
        report.base_samples,
        report.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(
        w,
        "Samples: {} total, {} successful, {} failed{}",
        report.total_samples,
        report.successes,
        report.failures,
        if report.cancelled { " (cancelled)" } else { "" }
    )?;
    writeln!(w)?;

    let s = &report.summary;
    writeln!(w, "Outcome statistics ({} successful samples):", s.count)?;
    writeln!(w, "  Mean:    {:.6}", s.mean)?;
    writeln!(w, "  Std Dev: {:.6}", s.std_dev)?;
    writeln!(w, "  Range:   {:.6} to {:.6}", s.min, s.max)?;
    writeln!(
        w,
        "  {:.0}% CI: [{:.6}, {:.6}]",
        s.confidence_interval.level * 100.0,
        s.confidence_interval.lower,
        s.confidence_interval.upper
    )?;
    writeln!(w)?;

    match &report.sensitivity {
        SensitivityOutcome::Ranked { indices } => {
            writeln!(w, "Sensitivity indices (variance decomposition):")?;
            let rows: Vec<SensitivityRow> = indices.iter().map(SensitivityRow::from).collect();
            let table = Table::new(rows).with(Style::sharp()).to_string();
            writeln!(w, "{table}")?;
            writeln!(w)?;
            write!(w, "{}", render_tornado(indices, TORNADO_BAR_WIDTH))?;
        }
        SensitivityOutcome::Degenerate { variance } => {
            writeln!(
                w,
                "Sensitivity indices: undefined (output variance ≈ 0, {variance:.3e})"
            )?;
        }
        SensitivityOutcome::Unavailable { reason } => {
            writeln!(w, "Sensitivity indices: not computed ({reason})")?;
        }
    }

    Ok(())
}

/// Render tornado-chart bars, widest at the top
///
/// Indices are expected pre-sorted descending by total-order contribution,
/// which is how the sensitivity calculator returns them.
pub fn render_tornado(indices: &[SensitivityIndex], width: usize) -> String {
    let mut out = String::new();
    let name_width = indices
        .iter()
        .map(|i| i.parameter.len())
        .max()
        .unwrap_or(0);

    for idx in indices {
        let bar_len = (idx.total_order * width as f64).round() as usize;
        let bar = "█".repeat(bar_len.min(width));
        out.push_str(&format!(
            "  {:<name_width$} {:>6.1}% {}\n",
            idx.parameter,
            idx.total_order * 100.0,
            bar
        ));
    }
    out
}

/// Write the full traceability CSV: one row per attempted sample with its
/// parameter values, outcome, and status
pub fn write_trace_csv<W: Write>(
    w: W,
    samples: &SampleSet,
    outcomes: &RunOutcomes,
) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_writer(w);

    let mut header: Vec<String> = vec!["sample_index".to_string()];
    header.extend(samples.names().iter().cloned());
    header.push("outcome".to_string());
    header.push("status".to_string());
    writer.write_record(&header)?;

    for (index, record) in outcomes.records().iter().enumerate() {
        let mut row: Vec<String> = vec![index.to_string()];
        for value in &samples.rows()[index] {
            row.push(format!("{value:.9}"));
        }
        match record {
            OutcomeRecord::Success(value) => {
                row.push(format!("{value:.9}"));
                row.push("ok".to_string());
            }
            OutcomeRecord::Failure(failure) => {
                row.push(String::new());
                row.push(format!("failed: {}", failure.reason));
            }
        }
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the machine-readable JSON summary
pub fn write_json_summary<W: Write>(w: W, report: &StudyReport) -> Result<(), ReportError> {
    serde_json::to_writer_pretty(w, report)?;
    Ok(())
}
