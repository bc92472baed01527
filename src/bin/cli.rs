//! Hackboard CLI
//!
//! Command-line interface for Hackboard operations:
//! - Scan text for links
//! - Render blog posts to HTML
//! - Check and clear unread announcements through the API server

use clap::{Parser, Subcommand};
use hackboard::blog::{render_post_html, BlogPost};
use hackboard::content::{scan, Segment};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hackboard-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Hackathon site tooling")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8090", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split text into plain and link segments
    Scan {
        /// Text to scan
        text: String,
    },

    /// Render a blog post file to HTML
    RenderBlog {
        /// Post body (markdown-ish text, one block per line)
        path: PathBuf,
        /// Post title (default: file stem)
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Show the unread announcement count for a user
    Unread {
        #[arg(short, long)]
        user: String,
    },

    /// Mark all announcements read for a user
    ReadAll {
        #[arg(short, long)]
        user: String,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Scan { text } => {
            let segments = scan(&text);

            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&segments)?),
                _ => print_segments(&segments),
            }
        }

        Commands::RenderBlog { path, title } => {
            let content = std::fs::read_to_string(&path)?;
            let title = title.unwrap_or_else(|| {
                path.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });

            println!("{}", render_post_html(&BlogPost { title, content }));
        }

        Commands::Unread { user } => {
            let response = client
                .get(format!("{}/api/v1/announcements/unread", cli.api_url))
                .header("x-user-id", &user)
                .send()
                .await;

            let data = expect_success(response, &cli.api_url).await?;
            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&data)?),
                _ => println!(
                    "{} unread announcement(s) for {}",
                    data["count"].as_u64().unwrap_or(0),
                    user
                ),
            }
        }

        Commands::ReadAll { user } => {
            let response = client
                .post(format!("{}/api/v1/announcements/read-all", cli.api_url))
                .header("x-user-id", &user)
                .send()
                .await;

            let data = expect_success(response, &cli.api_url).await?;
            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&data)?),
                _ => println!(
                    "Marked {} announcement(s) read for {}",
                    data["marked"].as_u64().unwrap_or(0),
                    user
                ),
            }
        }

        Commands::Config { output } => {
            let config = hackboard::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

/// Unwrap a successful JSON response or exit with the server's error
async fn expect_success(
    response: reqwest::Result<reqwest::Response>,
    api_url: &str,
) -> anyhow::Result<serde_json::Value> {
    match response {
        Ok(resp) if resp.status().is_success() => Ok(resp.json().await?),
        Ok(resp) => {
            let status = resp.status();
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            eprintln!(
                "Failed ({}): {}",
                status,
                body["error"]["message"].as_str().unwrap_or("unknown error")
            );
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Cannot connect to Hackboard API at {}", api_url);
            eprintln!("Error: {}", e);
            eprintln!();
            eprintln!("Make sure the API server is running:");
            eprintln!("  cargo run --bin hackboard");
            std::process::exit(1);
        }
    }
}

fn print_segments(segments: &[Segment]) {
    println!("{:<6} {:<40} HREF", "KIND", "TEXT");
    println!("{}", "-".repeat(80));
    for segment in segments {
        match segment {
            Segment::Text { value } => println!("{:<6} {:<40?}", "text", value),
            Segment::Link { display_text, href } => {
                println!("{:<6} {:<40?} {}", "link", display_text, href)
            }
        }
    }
}
