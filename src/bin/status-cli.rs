use clap::{Parser, Subcommand};
use serde_json::Value;
use url::Url;

#[derive(Parser)]
#[command(name = "status-cli")]
#[command(about = "Query a running status service", long_about = None)]
struct Cli {
    #[arg(short, long, env = "STATUS_SERVICE_URL", default_value = "http://localhost:8082")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Liveness of the status service itself
    Health,
    /// Overall status and per-service health
    Status,
    /// List monitored services
    Services,
    /// Detailed record of one service
    Service {
        /// Service name as registered
        name: String,
    },
}

impl Commands {
    fn segments(&self) -> Vec<&str> {
        match self {
            Commands::Health => vec!["health"],
            Commands::Status => vec!["status"],
            Commands::Services => vec!["services"],
            Commands::Service { name } => vec!["services", name.as_str()],
        }
    }

    /// Endpoint under `base`; path segments are percent-encoded.
    fn endpoint(&self, base: &str) -> Result<Url, Box<dyn std::error::Error>> {
        let mut url = Url::parse(base)?;
        url.path_segments_mut()
            .map_err(|_| format!("'{}' cannot be used as a base URL", base))?
            .pop_if_empty()
            .extend(self.segments());
        Ok(url)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let url = cli.command.endpoint(&cli.url)?;
    let res = client.get(url).send().await?;

    if !print_response(res).await? {
        std::process::exit(1);
    }
    Ok(())
}

/// Print the body, pretty-printed when it is JSON. Returns false on non-2xx.
async fn print_response(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{}", rendered);
        Ok(true)
    } else {
        eprintln!("Error: status service returned {}", status);
        eprintln!("{}", rendered);
        Ok(false)
    }
}
