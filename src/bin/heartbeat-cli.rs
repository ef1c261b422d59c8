use std::process::ExitCode;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use url::Url;

const RATE_LIMIT_HEADERS: [&str; 3] = [
    "x-ratelimit-limit",
    "x-ratelimit-remaining",
    "x-ratelimit-reset",
];

#[derive(Parser)]
#[command(name = "heartbeat-cli")]
#[command(about = "Query a running k8s-heartbeat endpoint", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: Url,

    /// Shared secret, sent as the Basic credential.
    #[arg(short, long, env = "AUTH_TOKEN_BASIC")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a component's health
    Check {
        namespace: String,
        component: String,
    },
    /// Check the endpoint's own connectivity to the cluster
    Ping,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        "x-request-id",
        HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())?,
    );

    let target = match &cli.command {
        Commands::Check {
            namespace,
            component,
        } => {
            let mut target = cli.url.clone();
            target
                .path_segments_mut()
                .map_err(|_| "server URL cannot be a base")?
                .pop_if_empty()
                .extend(["api", "healthz", namespace.as_str(), "component", component.as_str()]);
            target
        }
        Commands::Ping => cli.url.join("/healthz")?,
    };

    let mut request = client.get(target.clone()).headers(headers);
    if let (Some(token), Commands::Check { .. }) = (&cli.token, &cli.command) {
        request = request.header(reqwest::header::AUTHORIZATION, format!("Basic {token}"));
    }

    let res = request.send().await?;
    print_response(&target, res).await
}

async fn print_response(
    target: &Url,
    res: reqwest::Response,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let status = res.status();
    println!("{} {}", status, target);
    for name in RATE_LIMIT_HEADERS {
        if let Some(value) = res.headers().get(name) {
            println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
        }
    }

    if status.is_success() {
        return Ok(ExitCode::SUCCESS);
    }

    let text = res.text().await?;
    if !text.is_empty() {
        eprintln!("Response: {}", text);
    }
    Ok(ExitCode::FAILURE)
}
