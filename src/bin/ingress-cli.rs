use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "ingress-cli")]
#[command(about = "Management CLI for the add-on ingress", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8099")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List ingress panels of all add-ons
    Panels,
    /// Issue a new ingress session
    CreateSession,
    /// Check (and extend) an ingress session
    ValidateSession {
        /// Session credential to check
        session: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Panels => {
            client
                .get(format!("{}/panels", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::CreateSession => {
            client
                .post(format!("{}/session", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::ValidateSession { session } => {
            client
                .post(format!("{}/validate_session", cli.url))
                .headers(headers)
                .json(&json!({ "session": session }))
                .send()
                .await?
        }
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: ingress API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
