use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "keyservice-ctl")]
#[command(about = "Operator CLI for the key service server", long_about = None)]
struct Cli {
    /// API listener base URL.
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    url: String,

    /// Metrics listener base URL.
    #[arg(short, long, default_value = "http://127.0.0.1:8090")]
    metrics_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show liveness and readiness
    Status,
    /// Take the instance out of traffic
    Drain,
    /// Put the instance back into traffic
    Undrain,
    /// Show runtime diagnostics (requires --enable-debug on the server)
    Vars,
    /// Dump the Prometheus metrics
    Metrics,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Status => {
            for probe in ["livez", "readyz"] {
                let res = client.get(format!("{}/{}", cli.url, probe)).send().await?;
                println!("{:<7} {}", probe, res.status());
            }
        }
        Commands::Drain => {
            let res = client.get(format!("{}/drain", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Undrain => {
            let res = client.get(format!("{}/undrain", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Vars => {
            let res = client.get(format!("{}/debug/vars", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Metrics => {
            let res = client.get(format!("{}/metrics", cli.metrics_url)).send().await?;
            println!("{}", res.text().await?);
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if status.is_success() {
        let json: Value = res.json().await?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        eprintln!("Error: {}", status);
        let text = res.text().await?;
        if !text.is_empty() {
            eprintln!("{}", text);
        }
    }
    Ok(())
}
