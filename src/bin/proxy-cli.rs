use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Management CLI for the RPC upstream proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:4999")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pool status and windowed response times
    Status,
    /// Per-upstream health and load snapshot
    Stats,
    /// Aggregate pool health
    Health,
    /// Send a call through the proxy
    Call {
        /// RPC method name
        method: String,
        /// Params as a JSON value
        #[arg(short, long)]
        params: Option<String>,
        /// Call id (defaults to a random one)
        #[arg(long)]
        id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Status => client.get(format!("{}/", base)).send().await?,
        Commands::Stats => client.get(format!("{}/stats", base)).send().await?,
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
        Commands::Call { method, params, id } => {
            let id = id.unwrap_or_else(|| format!("cli-{}", rand::random::<u32>()));
            let mut call = json!({ "id": id, "method": method });
            if let Some(params) = params {
                call["params"] = serde_json::from_str::<Value>(&params)?;
            }
            client.post(format!("{}/", base)).json(&call).send().await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
    }

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
