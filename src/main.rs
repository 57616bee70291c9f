use burdencascade::cli::{self, Cli, EXIT_FAILURE};
use burdencascade::telemetry;
use clap::Parser;

fn main() {
    let cli = Cli::parse();

    let guard = match telemetry::init_tracing(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(EXIT_FAILURE);
        }
    };

    match cli::run(&cli) {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("error: {}", e.message);
            drop(guard);
            std::process::exit(e.code);
        }
    }
}
