use argh::FromArgs;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use casebook::{AppState, Config, create_app};

#[derive(FromArgs, Debug)]
/// Casebook: a local state service for a test-case-management API.
struct Args {
    /// host to bind to
    #[argh(option, default = "String::from(\"127.0.0.1\")")]
    host: String,

    /// port to listen on (0 for random available port)
    #[argh(option, short = 'p', default = "0")]
    port: u16,

    /// base URL of the test-management API (overrides CASEBOOK_API_URL)
    #[argh(option)]
    api_url: Option<String>,

    /// request timeout in seconds (overrides CASEBOOK_TIMEOUT_SECS)
    #[argh(option)]
    timeout: Option<u64>,

    /// serve built-in sample projects instead of calling the API
    #[argh(switch)]
    sample_data: bool,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casebook=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Args = argh::from_env();
    if let Err(e) = run(args).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::from_env();
    if let Some(api_url) = args.api_url {
        config = config.with_api_url(api_url);
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    let state = if args.sample_data {
        tracing::info!("serving sample data");
        AppState::sample(&config)
    } else {
        AppState::remote(&config)?
    };
    let app = create_app(Arc::new(state));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("http://{}", actual_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
