//! echovault CLI and REST API entry point.
//!
//! Binary name: `evault`
//!
//! Parses CLI arguments, initializes the stores and embedding model, then
//! dispatches to the appropriate command handler or starts the webhook
//! receiver.

mod http;
mod state;

use clap::{Parser, Subcommand};
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use state::AppState;

#[derive(Parser)]
#[command(name = "evault", version, about = "Call transcript vault with semantic context retrieval")]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit machine-readable JSON output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook receiver and retrieval API
    Serve {
        /// Bind host (overrides config.toml)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config.toml)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Query the context index from the terminal
    Search {
        /// Free-text query
        query: String,
    },

    /// Index an ad-hoc text snippet
    Remember {
        /// Text to index
        text: String,
    },

    /// Show a stored conversation
    Show {
        /// Conversation id
        id: i64,
    },

    /// Stored-conversation and indexed-document counts
    Status,

    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,echovault=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "evault", &mut std::io::stdout());
        return Ok(());
    }

    // Initialize application state (stores, embedding model)
    let state = AppState::init().await?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| state.config.server.host.clone());
            let port = port.unwrap_or(state.config.server.port);
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} echovault listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Search { query } => {
            let hits = state.conversation_service.retrieve_context(&query).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if hits.is_empty() {
                println!("  No matching context.");
            } else {
                println!();
                for (rank, hit) in hits.iter().enumerate() {
                    println!(
                        "  {}. {} {}",
                        rank + 1,
                        console::style(&hit.document.text).cyan(),
                        console::style(format!(
                            "({}, distance {:.3})",
                            hit.document.source, hit.distance
                        ))
                        .dim()
                    );
                }
                println!();
            }
        }

        Commands::Remember { text } => {
            let id = state.conversation_service.index_snippet(&text).await?;

            if cli.json {
                println!("{}", serde_json::json!({ "status": "stored", "id": id }));
            } else {
                println!(
                    "  {} Indexed snippet {}",
                    console::style("✓").green(),
                    console::style(&id).cyan()
                );
            }
        }

        Commands::Show { id } => {
            match state.conversation_service.conversation(id).await? {
                Some(record) => {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
                None => {
                    eprintln!("  {} No conversation with id {id}", console::style("✗").red());
                    std::process::exit(1);
                }
            }
        }

        Commands::Status => {
            let conversations = state.conversation_service.conversation_count().await?;
            let documents = state.conversation_service.document_count().await?;

            if cli.json {
                let status = serde_json::json!({
                    "conversations": conversations,
                    "indexed_documents": documents,
                    "data_dir": state.data_dir.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!();
                println!("  Conversations stored: {conversations}");
                println!("  Documents indexed:    {documents}");
                println!("  Data directory:       {}", state.data_dir.display());

                let recent = state.conversation_service.recent_conversations(5).await?;
                if !recent.is_empty() {
                    println!();
                    println!("  Recent calls:");
                    for record in &recent {
                        let summary = record.summary.as_deref().unwrap_or("(no summary)");
                        println!(
                            "    {} {}",
                            console::style(format!("#{}", record.id)).cyan(),
                            summary
                        );
                    }
                }
                println!();
            }
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
