use std::io::{self, BufRead, Write as _};
use std::process::ExitCode;
use std::{env, fs};

use multiverse::{EngineConfig, RunReport, Supervisor, UniverseResult};
use multiverse_cli::surface::{self, SurfaceError};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    match args.get(1) {
        Some(path) => run_file(path),
        None => run_repl(),
    }
}

fn run_file(path: &str) -> ExitCode {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("error reading {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    match surface::compile(&text) {
        Ok((program, var_count)) => {
            let report = Supervisor::new().run(program, var_count, EngineConfig::new());
            print_report(&report);
            if report.failed_labels().next().is_some() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("{path}: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Reads source lines from stdin one at a time. Every line re-compiles and
/// re-runs the whole program accumulated so far, surfacing parse errors
/// against the newest line without losing the prior ones — the same
/// recompile-on-each-line loop the surface syntax's own reference tooling
/// used for interactive testing.
fn run_repl() -> ExitCode {
    let stdin = io::stdin();
    let mut source = String::new();

    loop {
        print!("multiverse> ");
        if io::stdout().flush().is_err() {
            break;
        }
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                eprintln!("error reading stdin: {err}");
                return ExitCode::FAILURE;
            }
        }
        if line.trim().is_empty() {
            continue;
        }

        let mut candidate = source.clone();
        candidate.push_str(&line);

        match surface::compile(&candidate) {
            Ok((program, var_count)) => {
                source = candidate;
                let report = Supervisor::new().run(program, var_count, EngineConfig::new());
                print_report(&report);
            }
            Err(err) => report_surface_error(&line, &err),
        }
    }
    ExitCode::SUCCESS
}

fn print_report(report: &RunReport) {
    let mut labels: Vec<&str> = report.results().keys().map(String::as_str).collect();
    labels.sort_unstable();
    for label in labels {
        match report.get(label) {
            Some(UniverseResult::Output(values)) => {
                println!("{label}: [{}]", values.join(", "));
            }
            Some(UniverseResult::Failed(err)) => {
                println!("{label}: failed — {err}");
            }
            None => unreachable!("label came from this report's own key set"),
        }
    }
    println!("({} universe(s) total)", report.universe_count());
}

fn report_surface_error(line: &str, err: &SurfaceError) {
    eprintln!("{err}");
    eprintln!("  {}", line.trim_end());
}
