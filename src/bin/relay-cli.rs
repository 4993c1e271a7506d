use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};

use mcp_relay::relay::{ResponseMode, UploadRoute};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Command-line client for the MCP relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an EDF file to one of the relay routes
    Upload {
        /// eeg, visualize, features, summary, export or filter
        route: UploadRoute,
        /// File to send
        file: PathBuf,
        /// Where to write binary responses (visualize, export)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Ask the language model a question
    Query { question: String },
    /// Check relay liveness
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Upload { route, file, out } => {
            let data = tokio::fs::read(&file).await?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload.edf".to_string());
            let form = Form::new().part("file", Part::bytes(data).file_name(file_name));

            let res = client
                .post(format!("{}{}", base, route.mount_path()))
                .multipart(form)
                .send()
                .await?;

            if route.mode() == ResponseMode::Stream && res.status().is_success() {
                let bytes = res.bytes().await?;
                match out {
                    Some(path) => {
                        tokio::fs::write(&path, &bytes).await?;
                        println!("Wrote {} bytes to {}", bytes.len(), path.display());
                    }
                    None => println!("Received {} bytes (use --out to save)", bytes.len()),
                }
            } else {
                print_response(res).await?;
            }
        }
        Commands::Query { question } => {
            let res = client
                .post(format!("{}/mcp/query", base))
                .json(&json!({ "question": question }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{}/health", base)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        eprintln!("{}", text);
        std::process::exit(1);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
