use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "apm-cli")]
#[command(about = "Command line client for the APM collector", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check collector liveness
    Health,
    /// Send a custom event (raw JSON object)
    Track {
        /// JSON object body, e.g. '{"signup": "completed"}'
        data: String,
    },
    /// Submit the contact form
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    // Redirects stay visible so `contact` can report the 303 target.
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Track { data } => {
            let body: Value = serde_json::from_str(&data)?;
            if !body.is_object() {
                return Err("event body must be a JSON object".into());
            }
            let res = client
                .post(format!("{}/apm/track_event/", cli.url))
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Contact {
            name,
            email,
            message,
        } => {
            let res = client
                .post(format!("{}/contact", cli.url))
                .form(&[
                    ("name", name.as_str()),
                    ("email", email.as_str()),
                    ("message", message.as_str()),
                ])
                .send()
                .await?;
            let status = res.status();
            if status.is_redirection() {
                let location = res
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("<missing>");
                println!("{} -> {}", status, location);
            } else {
                print_response(res).await?;
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: collector returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
