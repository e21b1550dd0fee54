//! StudyHub CLI
//!
//! Command-line client for the StudyHub assistant:
//! - Chat with the assistant (streamed, with tool cards)
//! - Check server health
//! - Generate a default config file

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use studyhub::config::generate_default_config;
use studyhub::relay::{MarkerParser, StreamItem, ToolCallCard};
use studyhub::tools::{CREATE_PRACTICE_TASK, CREATE_STUDY_SESSION};

#[derive(Parser)]
#[command(name = "studyhub-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Talk to the StudyHub study assistant")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8085", global = true)]
    pub api_url: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a message to the assistant and stream the reply
    Chat {
        /// Message text
        message: String,
        /// Bearer token for the study backend
        #[arg(short, long, env = "STUDYHUB_TOKEN")]
        token: String,
        /// Print tool-call cards as raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Show server health
    Health,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Chat {
            message,
            token,
            json,
        } => {
            let body = serde_json::json!({
                "messages": [{ "role": "user", "content": message }],
            });

            let response = client
                .post(format!("{}/api/v1/assistant/chat", cli.api_url))
                .bearer_auth(&token)
                .json(&body)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                eprintln!("Failed ({}): {}", status, text);
                std::process::exit(1);
            }

            let mut parser = MarkerParser::new();
            let mut stream = response.bytes_stream();
            let mut pending = Vec::new();
            let mut stdout = std::io::stdout();

            while let Some(chunk) = stream.next().await {
                pending.extend_from_slice(&chunk?);
                let text = take_utf8(&mut pending);

                for item in parser.push(&text) {
                    render(&mut stdout, item, json)?;
                }
            }

            if !pending.is_empty() {
                for item in parser.push(&String::from_utf8_lossy(&pending)) {
                    render(&mut stdout, item, json)?;
                }
            }
            for item in parser.finish() {
                render(&mut stdout, item, json)?;
            }
            println!();
        }

        Commands::Health => {
            let response = client
                .get(format!("{}/health", cli.api_url))
                .send()
                .await?;

            if response.status().is_success() {
                let health: serde_json::Value = response.json().await?;
                println!("StudyHub Status");
                println!("===============");
                println!("Status:   {}", health["status"].as_str().unwrap_or("unknown"));
                println!("Provider: {}", health["provider"].as_str().unwrap_or("unknown"));
                println!("Backend:  {}", health["backend"].as_str().unwrap_or("unknown"));
                println!("Version:  {}", health["version"].as_str().unwrap_or("unknown"));
                println!("Uptime:   {}s", health["uptime_seconds"].as_u64().unwrap_or(0));
            } else {
                eprintln!("Server unhealthy ({})", response.status());
                std::process::exit(1);
            }
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    println!("Config written to {}", path.display());
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

/// Decode what is decodable, keeping only an incomplete trailing sequence
///
/// Invalid sequences become U+FFFD so a bad byte never stalls the output.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();
    loop {
        match std::str::from_utf8(pending) {
            Ok(text) => {
                out.push_str(text);
                pending.clear();
                return out;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&pending[..valid]));
                match e.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        pending.drain(..valid + len);
                    }
                    None => {
                        pending.drain(..valid);
                        return out;
                    }
                }
            }
        }
    }
}

fn render(out: &mut impl Write, item: StreamItem, json: bool) -> std::io::Result<()> {
    match item {
        StreamItem::Text(text) => write!(out, "{}", text)?,
        StreamItem::ToolCall(card) if json => {
            writeln!(out)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&card).unwrap_or_default())?;
        }
        StreamItem::ToolCall(card) => {
            writeln!(out)?;
            writeln!(out, "{}", describe(&card))?;
        }
    }
    out.flush()
}

fn describe(card: &ToolCallCard) -> String {
    let field = |key: &str| card.result[key].as_str().unwrap_or("?").to_string();
    match card.name.as_str() {
        CREATE_STUDY_SESSION => format!(
            "  [+] Study session: {} ({}) on {} for {} min",
            field("title"),
            field("subject"),
            field("date"),
            card.result["duration_minutes"].as_u64().unwrap_or(0)
        ),
        CREATE_PRACTICE_TASK => format!(
            "  [+] Practice task: {} ({}) due {}",
            field("title"),
            field("subject"),
            field("due_date")
        ),
        other => format!("  [+] {}: {}", other, card.result),
    }
}
