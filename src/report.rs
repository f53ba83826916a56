//! Result table of one analysis run.

use std::fmt;

use crate::extract::BoundarySet;
use crate::interp::Value;
use crate::partition::Partition;

const CLASS_WIDTH: usize = 30;
const INPUT_WIDTH: usize = 12;

/// What the target did on a representative input.
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Returned(Value),
    Failed(String),
}

impl Observed {
    pub fn is_failure(&self) -> bool {
        matches!(self, Observed::Failed(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Observed::Returned(value) => Some(value),
            Observed::Failed(_) => None,
        }
    }
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observed::Returned(value) => write!(f, "{}", value),
            Observed::Failed(description) => write!(f, "Error: {}", description),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub partition: Partition,
    pub observed: Observed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub function: String,
    /// Parameter that the labels refer to.
    pub variable: String,
    pub boundaries: BoundarySet,
    /// One row per partition, ascending.
    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn failures(&self) -> usize {
        self.rows.iter().filter(|row| row.observed.is_failure()).count()
    }

    /// Observed outcomes rendered as in the table, in row order.
    pub fn observed_strings(&self) -> Vec<String> {
        self.rows.iter().map(|row| row.observed.to_string()).collect()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Analyzing Function: '{}' ---", self.function)?;
        writeln!(f, "Found boundaries: {}", self.boundaries)?;
        writeln!(f)?;
        writeln!(
            f,
            "{:<cw$} | {:<iw$} | {}",
            "EQUIVALENCE CLASS",
            "TEST INPUT",
            "OBSERVED BEHAVIOR",
            cw = CLASS_WIDTH,
            iw = INPUT_WIDTH
        )?;
        for row in &self.rows {
            // Width only applies through `Display` of a `String`, so render first.
            let input = row.partition.representative.to_string();
            writeln!(
                f,
                "{:<cw$} | {:<iw$} | {}",
                row.partition.label,
                input,
                row.observed,
                cw = CLASS_WIDTH,
                iw = INPUT_WIDTH
            )?;
        }
        Ok(())
    }
}
