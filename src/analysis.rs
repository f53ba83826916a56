//! The analysis driver.
//!
//! [`Analyzer::analyze`] runs the whole pipeline for one function:
//!
//! 1. retrieve the source text through a [`SourceResolver`],
//! 2. parse it and select the named definition,
//! 3. extract the boundaries,
//! 4. synthesize one partition per interval,
//! 5. call the target once per representative, in ascending order,
//! 6. collect the observations into a [`Report`].
//!
//! Missing source and missing boundaries are ordinary [`Outcome`]s. Failures
//! of the target are recorded in the report row and never abort the run.
//!
//! # Example
//!
//! ```rust
//! use eqclass::analysis::{Analyzer, Outcome};
//! use eqclass::source::SourceMap;
//!
//! let sources = SourceMap::new().with("is_adult", "fn is_adult(age) { return age >= 18; }");
//! let analyzer = Analyzer::new(sources);
//! let Outcome::Completed(report) = analyzer.analyze(&"is_adult".into()).unwrap() else {
//!     panic!("expected a report");
//! };
//! assert_eq!(report.observed_strings(), vec!["false", "true"]);
//! ```

use std::fmt;
use std::rc::Rc;

use log::{debug, info, warn};

use crate::extract::extract_boundaries;
use crate::interp::InterpreterConfig;
use crate::parser::{parse_source, ParseError};
use crate::partition::{PartitionSynthesizer, SynthesisConfig, SynthesisError};
use crate::report::{Observed, Report, ReportRow};
use crate::source::{FunctionHandle, SourceError, SourceResolver};
use crate::target::{ScriptFunction, TargetFunction, TargetRegistry};

/// Label variable for functions without parameters.
const FALLBACK_VARIABLE: &str = "value";

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("cannot parse source: {0}")]
    Parse(#[from] ParseError),
    #[error("function `{0}` is not defined in its source")]
    FunctionNotFound(String),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

#[derive(Debug)]
pub enum Outcome {
    SourceUnavailable(SourceError),
    NoBoundaries { function: String },
    Completed(Report),
}

impl Outcome {
    pub fn report(&self) -> Option<&Report> {
        match self {
            Outcome::Completed(report) => Some(report),
            _ => None,
        }
    }

    pub fn into_report(self) -> Option<Report> {
        match self {
            Outcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::SourceUnavailable(e) => writeln!(f, "Error: could not retrieve source code: {}", e),
            Outcome::NoBoundaries { function } => {
                writeln!(f, "--- Analyzing Function: '{}' ---", function)?;
                writeln!(f, "No boundaries found. The function might not use numeric comparisons.")
            }
            Outcome::Completed(report) => write!(f, "{}", report),
        }
    }
}

/// Picks the function to analyze among the names a source unit defines.
///
/// Without a request the first definition is used.
pub fn select_function(defined: &[String], requested: Option<&str>) -> Result<String, AnalysisError> {
    match requested {
        Some(name) if defined.iter().any(|d| d == name) => Ok(name.to_string()),
        Some(name) => Err(AnalysisError::FunctionNotFound(name.to_string())),
        None => defined.first().cloned().ok_or_else(|| AnalysisError::Parse(ParseError::EmptyInput)),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyzerConfig {
    pub synthesis: SynthesisConfig,
    pub interpreter: InterpreterConfig,
}

impl AnalyzerConfig {
    pub fn with_synthesis(mut self, synthesis: SynthesisConfig) -> Self {
        self.synthesis = synthesis;
        self
    }

    pub fn with_interpreter(mut self, interpreter: InterpreterConfig) -> Self {
        self.interpreter = interpreter;
        self
    }
}

pub struct Analyzer<R> {
    resolver: R,
    config: AnalyzerConfig,
    natives: TargetRegistry,
}

impl<R> Analyzer<R>
where
    R: SourceResolver,
{
    pub fn new(resolver: R) -> Self {
        Self::with_config(resolver, AnalyzerConfig::default())
    }

    pub fn with_config(resolver: R, config: AnalyzerConfig) -> Self {
        Self {
            resolver,
            config,
            natives: TargetRegistry::new(),
        }
    }

    /// Runs `target` instead of interpreting the source of the function with the same name.
    ///
    /// The source is still retrieved and parsed for boundary extraction.
    pub fn with_native<T>(mut self, target: T) -> Self
    where
        T: TargetFunction + 'static,
    {
        self.natives.register(target);
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn analyze(&self, handle: &FunctionHandle) -> Result<Outcome, AnalysisError> {
        info!("Analyzing {}", handle);

        let text = match self.resolver.resolve(handle) {
            Ok(text) => text,
            Err(e) => {
                warn!("Source of {} is unavailable: {}", handle, e);
                return Ok(Outcome::SourceUnavailable(e));
            }
        };

        let unit = Rc::new(parse_source(&text)?);
        let def = unit
            .function(handle.name())
            .cloned()
            .ok_or_else(|| AnalysisError::FunctionNotFound(handle.name().to_string()))?;

        let boundaries = extract_boundaries(&def);
        if boundaries.is_empty() {
            info!("No boundaries found in {}", handle);
            return Ok(Outcome::NoBoundaries {
                function: handle.name().to_string(),
            });
        }

        let variable = def.primary_param().unwrap_or(FALLBACK_VARIABLE).to_string();
        let synthesizer = PartitionSynthesizer::new(self.config.synthesis.clone());
        let partitions = synthesizer.synthesize(&boundaries, &variable)?;

        let script;
        let target: &dyn TargetFunction = match self.natives.get(handle.name()) {
            Some(native) => native,
            None => {
                script = ScriptFunction::new(Rc::clone(&unit), handle.name(), self.config.interpreter.clone());
                &script
            }
        };

        let rows: Vec<ReportRow> = partitions
            .into_iter()
            .map(|partition| {
                let observed = match target.call(partition.representative) {
                    Ok(value) => Observed::Returned(value),
                    Err(e) => Observed::Failed(e.to_string()),
                };
                debug!("{} -> {}", partition, observed);
                ReportRow { partition, observed }
            })
            .collect();

        let report = Report {
            function: handle.name().to_string(),
            variable,
            boundaries,
            rows,
        };
        info!(
            "Analyzed {}: {} partitions, {} failures",
            handle,
            report.rows.len(),
            report.failures()
        );
        Ok(Outcome::Completed(report))
    }
}

impl<R> fmt::Debug for Analyzer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("config", &self.config)
            .field("natives", &self.natives)
            .finish_non_exhaustive()
    }
}
