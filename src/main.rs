use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use weather_gateway::config::{load_env_file, Config, Units};
use weather_gateway::{router, AppState};

#[derive(Debug, Parser)]
#[command(version, about = "HTTP gateway for weather, forecasts, air quality and alerts")]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "GATEWAY_BIND", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,

    /// Unit system for temperatures and wind speeds; overrides WEATHER_UNITS.
    #[arg(long, value_enum)]
    units: Option<Units>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("weather_gateway=info,tower_http=info")),
        )
        .init();

    // Load .env before parsing so GATEWAY_BIND can come from the file too.
    load_env_file();
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(units) = cli.units {
        config.units = units;
    }

    let app = router(AppState::new(&config)?);
    let listener = TcpListener::bind(cli.bind).await?;
    info!(addr = %cli.bind, units = config.units.as_str(), "weather gateway listening");

    axum::serve(listener, app).await?;
    Ok(())
}
