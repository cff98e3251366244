use clap::Parser;
use env_logger::{Builder, Target};
use log::LevelFilter;

use extract_lecturas::args::Args;
use extract_lecturas::processor::Processor;

/// Library crate plus this binary
const LOG_MODULES: [&str; 2] = ["extract_lecturas", module_path!()];

fn init_logger(verbose: bool) {
    if std::env::var("RUST_LOG").is_ok() {
        env_logger::init();
        return;
    }

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let mut builder = Builder::new();
    builder.target(Target::Stderr).filter_level(LevelFilter::Warn);
    for module in LOG_MODULES {
        builder.filter_module(module, level);
    }
    builder.init();
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_logger(args.verbose);

    let config = args.resolve()?;
    log::debug!("Resolved configuration: {:?}", config);

    let processor = Processor::new(config)?;
    processor.run()?;

    Ok(())
}
