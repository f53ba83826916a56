use std::cell::{Cell, RefCell};
use std::rc::Rc;

use test_log::test;

use eqclass::analysis::{AnalysisError, Analyzer, Outcome};
use eqclass::extract::{extract_boundaries, BoundarySet};
use eqclass::interp::Value;
use eqclass::number::Number;
use eqclass::parser::parse_function;
use eqclass::partition::{Category, PartitionSynthesizer};
use eqclass::report::Report;
use eqclass::sample::{sample_sources, DETERMINE_PRICE, DETERMINE_PRICE_NAME};
use eqclass::source::{FunctionHandle, SourceError, SourceMap};
use eqclass::target::NativeFunction;

const PRICES: [&str; 5] = ["Invalid Age", "Free (Infant)", "Child Price", "Adult Price", "Senior Price"];

fn ints(values: &[i64]) -> Vec<Number> {
    values.iter().copied().map(Number::Int).collect()
}

fn representatives(report: &Report) -> Vec<Number> {
    report.rows.iter().map(|row| row.partition.representative).collect()
}

fn completed(outcome: Outcome) -> Report {
    match outcome {
        Outcome::Completed(report) => report,
        other => panic!("expected a completed analysis, got {:?}", other),
    }
}

#[test]
fn test_pricing_sample() {
    let analyzer = Analyzer::new(sample_sources());
    let report = completed(analyzer.analyze(&DETERMINE_PRICE_NAME.into()).unwrap());

    assert_eq!(report.boundaries.as_slice(), ints(&[0, 3, 13, 60]).as_slice());
    assert_eq!(representatives(&report), ints(&[-5, 1, 8, 36, 65]));
    assert_eq!(report.observed_strings(), PRICES);

    let labels: Vec<&str> = report.rows.iter().map(|row| row.partition.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["age < 0", "0 <= age < 3", "3 <= age < 13", "13 <= age < 60", "age >= 60"]
    );
    let categories: Vec<Category> = report.rows.iter().map(|row| row.partition.category).collect();
    assert_eq!(
        categories,
        vec![
            Category::BelowRange,
            Category::Interior,
            Category::Interior,
            Category::Interior,
            Category::AboveRange,
        ]
    );

    let text = report.to_string();
    assert!(text.starts_with("--- Analyzing Function: 'determine_price' ---\nFound boundaries: [0, 3, 13, 60]\n"));
    assert!(text.contains("3 <= age < 13                  | 8            | Child Price"));
}

#[test]
fn test_inclusive_child_bound() {
    let src = DETERMINE_PRICE.replace("age < 13", "age <= 12");
    let analyzer = Analyzer::new(SourceMap::new().with(DETERMINE_PRICE_NAME, src));
    let report = completed(analyzer.analyze(&DETERMINE_PRICE_NAME.into()).unwrap());

    assert_eq!(report.boundaries.to_string(), "[0, 3, 12, 60]");
    assert_eq!(representatives(&report), ints(&[-5, 1, 7, 36, 65]));
    assert_eq!(report.observed_strings(), PRICES);
}

#[test]
fn test_single_boundary() {
    let def = parse_function("fn gate(age) { if age >= 18 { return \"adult\"; } return \"minor\"; }").unwrap();
    let boundaries = extract_boundaries(&def);
    let partitions = PartitionSynthesizer::default().synthesize(&boundaries, "age").unwrap();
    let values: Vec<Number> = partitions.iter().map(|p| p.representative).collect();
    assert_eq!(values, ints(&[13, 23]));
}

#[test]
fn test_synthesis_is_deterministic() {
    let boundaries = BoundarySet::from_values([Number::Int(40), Number::Float(2.5), Number::Int(-7), Number::Int(40)]);
    let synthesizer = PartitionSynthesizer::default();
    let first = synthesizer.synthesize(&boundaries, "x").unwrap();
    let second = synthesizer.synthesize(&boundaries, "x").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), boundaries.len() + 1);
    for window in first.windows(2) {
        assert!(window[0].representative <= window[1].representative);
    }
    for partition in &first {
        assert!(partition.contains(partition.representative), "{}", partition);
    }
}

#[test]
fn test_no_boundaries_never_invokes_target() {
    let calls = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&calls);
    let analyzer = Analyzer::new(SourceMap::new().with("scale", "fn scale(x) { return x * 3 + 1; }")).with_native(
        NativeFunction::new("scale", move |n: Number| {
            counter.set(counter.get() + 1);
            Ok(Value::Num(n))
        }),
    );

    let outcome = analyzer.analyze(&"scale".into()).unwrap();
    assert!(matches!(outcome, Outcome::NoBoundaries { ref function } if function == "scale"));
    assert_eq!(calls.get(), 0);
    assert!(outcome.to_string().contains("No boundaries found"));
}

#[test]
fn test_native_target_sees_each_representative_once() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let analyzer = Analyzer::new(sample_sources()).with_native(NativeFunction::new(DETERMINE_PRICE_NAME, move |n: Number| {
        log.borrow_mut().push(n);
        Ok(Value::from(n))
    }));

    let report = completed(analyzer.analyze(&DETERMINE_PRICE_NAME.into()).unwrap());
    assert_eq!(*seen.borrow(), ints(&[-5, 1, 8, 36, 65]));
    assert_eq!(report.observed_strings(), vec!["-5", "1", "8", "36", "65"]);
}

#[test]
fn test_source_unavailable() {
    let resolver = |_: &FunctionHandle| -> Option<String> { None };
    let analyzer = Analyzer::new(resolver);
    let outcome = analyzer.analyze(&"len".into()).unwrap();
    assert!(matches!(outcome, Outcome::SourceUnavailable(SourceError::NotFound(_))));
}

#[test]
fn test_failing_partition_does_not_affect_others() {
    let src = r#"
        fn reciprocal(x) {
            if x < 0 {
                return "negative";
            }
            if x >= 10 {
                return "large";
            }
            return 1 // (x - 5);
        }
    "#;
    let analyzer = Analyzer::new(SourceMap::new().with("reciprocal", src));
    let report = completed(analyzer.analyze(&"reciprocal".into()).unwrap());
    assert_eq!(
        report.observed_strings(),
        vec!["negative", "Error: division by zero", "large"]
    );
    assert_eq!(report.failures(), 1);
}

#[test]
fn test_helper_functions_and_missing_definition() {
    let src = r#"
        fn bucket(n) {
            return label(n);
        }
        fn label(v) {
            if v < 100 { return "small"; }
            return "big";
        }
    "#;
    let mut sources = SourceMap::new();
    assert_eq!(sources.insert_unit(src).unwrap(), vec!["bucket", "label"]);
    let analyzer = Analyzer::new(sources);

    assert!(matches!(
        analyzer.analyze(&"bucket".into()).unwrap(),
        Outcome::NoBoundaries { .. }
    ));
    let report = completed(analyzer.analyze(&"label".into()).unwrap());
    assert_eq!(report.observed_strings(), vec!["small", "big"]);

    let err = Analyzer::new(SourceMap::new().with("absent", src))
        .analyze(&"absent".into())
        .unwrap_err();
    assert!(matches!(err, AnalysisError::FunctionNotFound(_)));
}
