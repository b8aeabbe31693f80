/**
 * relayhub Server Entry Point
 *
 * Loads `.env`, initialises tracing, reads the relay configuration and
 * serves the relay until the process is stopped.
 */

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    tracing::info!("[STARTUP] Server initialization started");

    let config = relayhub::backend::server::load_config()?;
    let addr = config.bind_addr()?;
    let app = relayhub::backend::server::create_app(config).await?;

    tracing::info!("[STARTUP] Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(not(feature = "ssr"))]
fn main() {
    eprintln!("Server requires the 'ssr' feature to be enabled.");
    eprintln!("Run with: cargo run --bin relayhub-server --features ssr");
    std::process::exit(1);
}
