use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};
use log::info;

use eqclass::analysis::{select_function, Analyzer, AnalyzerConfig, Outcome};
use eqclass::interp::InterpreterConfig;
use eqclass::number::Number;
use eqclass::partition::{MidpointPolicy, OffsetPolicy, SynthesisConfig, DEFAULT_OFFSET};
use eqclass::sample::{sample_sources, DETERMINE_PRICE_NAME};
use eqclass::source::{read_source_file, FunctionHandle, SourceMap};

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Offset {
    Fixed,
    ClampToGap,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Midpoint {
    Floor,
    Mean,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Source file to analyze. Defaults to the built-in `determine_price` sample.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Function to analyze. Defaults to the first function in FILE.
    #[arg(short, long, value_name = "NAME")]
    function: Option<String>,

    /// Distance of the out-of-range samples from the extreme boundaries.
    #[arg(long, value_name = "NUM", default_value_t = DEFAULT_OFFSET)]
    offset: Number,

    #[arg(long, value_enum, default_value = "fixed")]
    offset_policy: Offset,

    /// How interior samples are chosen.
    #[arg(long, value_enum, default_value = "floor")]
    midpoint: Midpoint,

    /// Evaluation budget for a single call of the analyzed function.
    #[arg(long, value_name = "INT")]
    step_limit: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> AnalyzerConfig {
        let synthesis = SynthesisConfig::default()
            .with_offset(self.offset)
            .with_offset_policy(match self.offset_policy {
                Offset::Fixed => OffsetPolicy::Fixed,
                Offset::ClampToGap => OffsetPolicy::ClampToGap,
            })
            .with_midpoint(match self.midpoint {
                Midpoint::Floor => MidpointPolicy::FloorMean,
                Midpoint::Mean => MidpointPolicy::ArithmeticMean,
            });
        let mut interpreter = InterpreterConfig::default();
        if let Some(limit) = self.step_limit {
            interpreter = interpreter.with_step_limit(limit);
        }
        AnalyzerConfig::default()
            .with_synthesis(synthesis)
            .with_interpreter(interpreter)
    }

    fn log_level(&self) -> simplelog::LevelFilter {
        match self.verbose {
            0 => simplelog::LevelFilter::Warn,
            1 => simplelog::LevelFilter::Info,
            2 => simplelog::LevelFilter::Debug,
            _ => simplelog::LevelFilter::Trace,
        }
    }
}

fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        args.log_level(),
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;
    info!("args = {:?}", args);

    let (sources, name) = match &args.file {
        None => {
            let name = select_function(&[DETERMINE_PRICE_NAME.to_string()], args.function.as_deref())?;
            (sample_sources(), name)
        }
        Some(path) => {
            let text = match read_source_file(path) {
                Ok(text) => text,
                Err(e) => {
                    print!("{}", Outcome::SourceUnavailable(e));
                    return Ok(ExitCode::from(2));
                }
            };
            let mut sources = SourceMap::new();
            let names = sources.insert_unit(&text)?;
            let name = select_function(&names, args.function.as_deref())?;
            (sources, name)
        }
    };

    let analyzer = Analyzer::with_config(sources, args.config());
    let outcome = analyzer.analyze(&FunctionHandle::new(name))?;
    print!("{}", outcome);

    let code = match outcome {
        Outcome::Completed(_) | Outcome::NoBoundaries { .. } => ExitCode::SUCCESS,
        Outcome::SourceUnavailable(_) => ExitCode::from(2),
    };
    Ok(code)
}
