use clap::{Parser, Subcommand};
use drawdown::api::{SimulateArgs, run_cli_report, run_http_server};
use drawdown::logging::init_logging;

#[derive(Debug, Parser)]
#[command(name = "drawdown", about = "Monte Carlo retirement drawdown simulator")]
struct Cli {
    /// Default log level when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run one simulation and print the report as JSON.
    Simulate(SimulateArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Serve { port } => {
            if let Err(e) = run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Simulate(args) => {
            let report = match run_cli_report(&args) {
                Ok(report) => report,
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            };
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error: failed to encode report: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
