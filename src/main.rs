//! CLI entry point. Owns argument parsing, signal handler installation, and
//! is the only place that calls `std::process::exit`.

use clap::Parser;
use rdc::error::FatalError;
use rdc::machine::Machine;
use rdc::source::{StreamSource, StringSource};
use std::fs::File;
use std::io::stdin;
use std::path::PathBuf;
use std::sync::atomic::Ordering;

/// An arbitrary-precision RPN calculator, the execution core of a `dc`-family
/// interpreter.
#[derive(Parser)]
#[command(name = "rdc", version, about)]
struct Args {
    /// Files to interpret, in order. Reads standard input if none are given.
    files: Vec<PathBuf>,

    /// Evaluate EXPR before reading any files or standard input. Repeatable.
    #[arg(short = 'e', long = "expression")]
    expressions: Vec<String>,

    /// Use the extended (256 + 65536) register set.
    #[arg(short = 'x', long = "extended-register-set")]
    extended_register_set: bool,
}

/// Runs `src` to completion against `m`, exiting the process with status 1
/// on a fatal interpreter error.
fn run_source(m: &mut Machine, src: Box<dyn rdc::source::Source>) {
    m.install_primary_source(src);
    match rdc::interpreter::run(m) {
        Ok(()) => {}
        Err(FatalError::Quit) => std::process::exit(0),
        Err(e) => {
            eprintln!("rdc: {}", e);
            std::process::exit(1);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut m = Machine::new(
        args.extended_register_set,
        Box::new(std::io::stdout()),
        Box::new(std::io::stderr()),
    );

    let interrupted = m.interrupt_flag();
    let _ = ctrlc::set_handler(move || {
        interrupted.store(true, Ordering::SeqCst);
    });

    for expr in &args.expressions {
        run_source(&mut m, Box::new(StringSource::new(expr.clone())));
    }

    if args.files.is_empty() {
        run_source(&mut m, Box::new(StreamSource::new(stdin())));
    } else {
        for path in &args.files {
            match File::open(path) {
                Ok(f) => run_source(&mut m, Box::new(StreamSource::new(f))),
                Err(e) => {
                    eprintln!("rdc: {}: {}", path.display(), e);
                    std::process::exit(1);
                }
            }
        }
    }

    std::process::exit(0);
}
