use std::{env, process};

use snapgraph::cli::{self, CommandLineConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_env("SNAPGRAPH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("{}", CommandLineConfig::help());
        return;
    }
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    let config = match CommandLineConfig::from_args(&arg_refs) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            eprint!("{}", CommandLineConfig::help());
            process::exit(2);
        }
    };

    match cli::run(&config) {
        Ok(output) => println!("{output}"),
        Err(err) => {
            eprintln!("command failed: {err}");
            process::exit(1);
        }
    }
}
