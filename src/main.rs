use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use waypoint::status::StatusEngine;
use waypoint::{api, db, mcp};

#[derive(Parser)]
#[command(name = "waypoint")]
#[command(about = "Hierarchical work item tracking for AI-agent development workflows")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Waypoint HTTP server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Start MCP server via stdio (for agent integration)
    Mcp,
}

/// Initialize tracing with output to stderr (for MCP mode) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "waypoint=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // MCP mode: log to stderr so stdout is clean for protocol
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn serve_http(port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting Waypoint server on port {}", port);

    let db = db::Database::open_default()?;
    db.migrate()?;

    let engine = StatusEngine::new(db);
    let app = api::create_router(engine);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Waypoint server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // MCP mode needs stderr for logging since stdout is the protocol channel
    let use_stderr = matches!(cli.command, Some(Commands::Mcp));
    init_tracing(use_stderr);

    match cli.command {
        Some(Commands::Serve { port }) => serve_http(port).await?,
        Some(Commands::Mcp) => {
            let db = db::Database::open_default()?;
            db.migrate()?;

            let engine = StatusEngine::new(db);
            mcp::run_stdio_server(engine).await?;
        }
        None => serve_http(3000).await?,
    }

    Ok(())
}
