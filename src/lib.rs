//! # eqclass: Boundary-Value Equivalence Classes
//!
//! **`eqclass`** derives black-box test inputs for scalar threshold logic.
//! It reads the source of a one-argument function, collects the numeric constants the function compares its
//! input against, splits the number line at those constants and runs the function once per resulting interval.
//!
//! ## How it works
//!
//! For a function with the boundaries `b1 < b2 < ... < bn` the crate builds `n + 1` half-open intervals:
//!
//! - `x < b1`, represented by `b1 - δ`,
//! - `bi <= x < b(i+1)`, represented by the floored midpoint,
//! - `x >= bn`, represented by `bn + δ`.
//!
//! The offset `δ` defaults to 5 (see [`SynthesisConfig`][crate::partition::SynthesisConfig]).
//! Every representative is then fed to the function and the observed result is recorded next to its interval.
//!
//! Analyzed functions are written in a small brace language: `fn`, `let`, `if`/`else`, `while`, `return`,
//! `raise`, chained comparisons and the usual arithmetic. The same text is both scanned for boundaries and
//! executed by the built-in [interpreter][crate::interp]. A native Rust closure can stand in as the executed
//! target while its source text still supplies the boundaries.
//!
//! ## Basic Usage
//!
//! ```rust
//! use eqclass::analysis::{Analyzer, Outcome};
//! use eqclass::sample::{sample_sources, DETERMINE_PRICE_NAME};
//!
//! let analyzer = Analyzer::new(sample_sources());
//! let outcome = analyzer.analyze(&DETERMINE_PRICE_NAME.into()).unwrap();
//!
//! let report = outcome.into_report().unwrap();
//! assert_eq!(report.boundaries.to_string(), "[0, 3, 13, 60]");
//! assert_eq!(
//!     report.observed_strings(),
//!     vec!["Invalid Age", "Free (Infant)", "Child Price", "Adult Price", "Senior Price"]
//! );
//! println!("{}", report);
//! ```
//!
//! ## Core Components
//!
//! - **[`extract`]**: boundary extraction over the syntax tree.
//! - **[`partition`]**: equivalence classes and their representatives.
//! - **[`analysis`]**: the end-to-end driver and its [`Outcome`][crate::analysis::Outcome].
//! - **[`source`]** and **[`target`]**: the collaborators the driver is built around.

pub mod analysis;
pub mod ast;
pub mod extract;
pub mod interp;
pub mod lexer;
pub mod number;
pub mod parser;
pub mod partition;
pub mod report;
pub mod sample;
pub mod source;
pub mod target;
