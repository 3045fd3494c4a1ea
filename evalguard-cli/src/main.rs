use std::{
    collections::BTreeMap,
    hint::black_box,
    io::{self, Read},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use anyhow::Context;
use clap::Parser;
use evalguard::{
    Config, EntryStatus, EvaluationError, ResidualBlock, classify_array,
    guard::{self, EvaluationBuffers},
    is_cost_valid, is_evaluation_valid,
    textual::Recording,
};
use tracing_subscriber::EnvFilter;

const NUM_ITERS_BENCHMARK: u32 = 100;

#[derive(Parser)]
#[command(name = "evalguard", version, about, long_about = None)]
struct Cli {
    /// Path to the recorded evaluation.
    /// Use '-' for stdin.
    #[arg(short = 'f', long)]
    filepath: PathBuf,

    /// Also print every input and output of the evaluation.
    #[arg(long, default_value_t = false)]
    dump: bool,

    /// Arrays shorter than this are listed in full in the error report.
    #[arg(long)]
    threshold: Option<usize>,

    /// Leave out the explanation at the top of the error report.
    #[arg(long = "no-preamble", default_value_t = false)]
    no_preamble: bool,

    /// Replay the recording through a guarded evaluation, so the error report
    /// is logged (see `RUST_LOG`) the way a solver would log it.
    #[arg(long, default_value_t = false)]
    replay: bool,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::default()
            .with_preamble(!self.no_preamble)
            .with_log_reports(self.replay);
        if let Some(threshold) = self.threshold {
            config = config.with_full_listing_threshold(threshold);
        }
        config
    }
}

/// What we found out about one recorded evaluation.
struct Outcome {
    recording: Recording,
    valid: bool,
    /// Rendered if the evaluation was invalid, unless it was already logged.
    report: Option<String>,
    dump: Option<String>,
    /// Mean time to validate.
    duration: Duration,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();
    let outcome = match main_inner(&cli) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };
    print_output(&outcome);
    if !outcome.valid {
        std::process::exit(1);
    }
}

fn main_inner(cli: &Cli) -> anyhow::Result<Outcome> {
    let txt = read_recording(cli)?;
    let recording = Recording::from_str(&txt)
        .map_err(anyhow::Error::msg)
        .context("could not parse the recorded evaluation")?;
    let config = cli.config();

    let duration = time_validation(&recording);
    let (valid, report) = if cli.replay {
        match replay(&recording, &config) {
            Ok(()) => (true, None),
            // Already logged by the guard.
            Err(EvaluationError::InvalidOutput { .. }) => (false, None),
            Err(e) => return Err(e).context("could not replay the recorded evaluation"),
        }
    } else {
        let valid = recording.is_valid();
        let report = (!valid).then(|| recording.render_error_report(&config));
        (valid, report)
    };
    let dump = cli.dump.then(|| recording.render_full_dump());
    Ok(Outcome {
        recording,
        valid,
        report,
        dump,
        duration,
    })
}

/// Feed the recorded outputs back through [`guard::evaluate`], as if a routine
/// had just written them. Entries missing from the recording stay poisoned.
fn replay(recording: &Recording, config: &Config) -> Result<(), EvaluationError> {
    let shape = &recording.shape;
    let parameters = recording.parameter_slices();
    let recorded_jacobians = recording.jacobian_slices();
    let mut buffers = match &recorded_jacobians {
        None => EvaluationBuffers::residuals_only(shape),
        Some(jacobians) => {
            let constant: Vec<bool> = jacobians.iter().map(Option::is_none).collect();
            EvaluationBuffers::with_jacobians(shape, &constant)?
        }
    };
    guard::evaluate(
        shape,
        &parameters,
        &mut buffers,
        config,
        |_, cost, residuals, jacobians| {
            *cost = recording.cost;
            copy_prefix(residuals, &recording.residuals);
            if let (Some(outputs), Some(recorded)) = (jacobians, &recorded_jacobians) {
                for (output, recorded) in outputs.iter_mut().zip(recorded) {
                    if let (Some(output), Some(recorded)) = (output, recorded) {
                        copy_prefix(output, recorded);
                    }
                }
            }
            true
        },
    )
}

fn copy_prefix(dst: &mut [f64], src: &[f64]) {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
}

/// Mean time taken by the validator on this recording.
fn time_validation(recording: &Recording) -> Duration {
    let jacobians = recording.jacobian_slices();
    let now = std::time::Instant::now();
    for _ in 0..NUM_ITERS_BENCHMARK {
        black_box(is_evaluation_valid(
            black_box(&recording.shape),
            black_box(&recording.residuals),
            black_box(jacobians.as_deref()),
        ));
    }
    now.elapsed() / NUM_ITERS_BENCHMARK
}

/// Prints the output nicely to stdout.
fn print_output(outcome: &Outcome) {
    use colored::Colorize;
    print_problem_size(&outcome.recording);
    if let Some(dump) = &outcome.dump {
        println!("{dump}");
    }
    if outcome.valid {
        println!("{}", "Evaluation is valid".green());
    } else {
        println!("{}", "Evaluation is invalid".red());
    }
    if !is_cost_valid(outcome.recording.cost) {
        println!("{}", "The cost was not written or is not finite".yellow());
    }
    if !outcome.valid {
        print_problem_counts(&outcome.recording);
    }
    if let Some(report) = &outcome.report {
        println!("{report}");
    }
    print_performance(outcome.duration);
}

/// Count the offending entries by kind, over residuals and requested Jacobians.
fn problem_counts(recording: &Recording) -> BTreeMap<&'static str, usize> {
    let shape = &recording.shape;
    let residuals = Some(recording.residuals.as_slice());
    let mut statuses: Vec<EntryStatus> = classify_array(shape.num_residuals(), residuals)
        .map(|(_, status)| status)
        .collect();
    if let Some(jacobians) = &recording.jacobians {
        for (i, jacobian) in jacobians.iter().enumerate() {
            if let Some(jacobian) = jacobian {
                statuses.extend(
                    classify_array(shape.jacobian_len(i), Some(jacobian)).map(|(_, status)| status),
                );
            }
        }
    }
    let mut counts = BTreeMap::new();
    for status in statuses {
        let kind = match status {
            EntryStatus::Present(_, class) if class.is_ok() => continue,
            EntryStatus::Present(_, class) => class.name(),
            EntryStatus::Missing => "missing",
        };
        *counts.entry(kind).or_default() += 1;
    }
    counts
}

fn print_problem_counts(recording: &Recording) {
    use colored::Colorize;
    let counts = problem_counts(recording)
        .into_iter()
        .map(|(kind, n)| format!("{n} {kind}"))
        .collect::<Vec<_>>();
    if !counts.is_empty() {
        println!("Offending entries: {}", counts.join(", ").yellow());
    }
}

fn print_problem_size(recording: &Recording) {
    let shape = &recording.shape;
    let requested = match &recording.jacobians {
        None => "no jacobians requested".to_owned(),
        Some(jacobians) => {
            let n = jacobians.iter().filter(|j| j.is_some()).count();
            format!("{n} of {} jacobian blocks requested", shape.num_parameter_blocks())
        }
    };
    println!("Problem size: {shape} ({requested})");
}

fn print_performance(duration: Duration) {
    println!(
        "Validated in {}ns (mean over {NUM_ITERS_BENCHMARK} iterations)",
        duration.as_nanos()
    );
}

/// Read the recorded evaluation from a file or stdin, depending on user args.
/// They pass a filename, or '-' for stdin.
fn read_recording(cli: &Cli) -> anyhow::Result<String> {
    // Read from file
    if cli.filepath != PathBuf::from("-") {
        return std::fs::read_to_string(&cli.filepath)
            .with_context(|| format!("could not read {}", cli.filepath.display()));
    }

    // Read from stdin
    let mut txt = String::with_capacity(100);
    io::stdin()
        .read_to_string(&mut txt)
        .context("could not read stdin")?;
    Ok(txt)
}
