use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inquire::{Select, Text};
use serde_json::json;
use std::path::PathBuf;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use weather_core::{
    ARTIFACT_PREFIX, ArtifactStore, Config, StorageBackend, WeatherQuery, WeatherService,
    create_router, provider_from_config,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Historical weather archive service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server.
    Serve {
        /// Address to bind; overrides the config file.
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on; overrides the config file and $PORT.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Interactively set bucket, project and storage backend.
    Configure,

    /// Fetch weather for a location and date range and store it once.
    Fetch {
        #[arg(long, allow_negative_numbers = true, value_parser = finite_coordinate)]
        latitude: f64,

        #[arg(long, allow_negative_numbers = true, value_parser = finite_coordinate)]
        longitude: f64,

        /// First day, YYYY-MM-DD.
        #[arg(long)]
        start_date: String,

        /// Last day, YYYY-MM-DD.
        #[arg(long)]
        end_date: String,
    },

    /// List stored artifacts, in the order the backend returns them.
    List {
        #[arg(long, default_value = ARTIFACT_PREFIX)]
        prefix: String,
    },

    /// Print a stored artifact.
    Show {
        /// Artifact name, e.g. weather_lat52_52_lon13_41_from20230101_to20230105.json
        file_name: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Serve { host, port } => {
                let mut config = load_config()?;
                if let Some(host) = host {
                    config.host = host;
                }
                if let Some(port) = port {
                    config.port = port;
                }
                serve(config).await?;
            }
            Command::Configure => configure()?,
            Command::Fetch {
                latitude,
                longitude,
                start_date,
                end_date,
            } => {
                let query = WeatherQuery::from_value(&json!({
                    "latitude": latitude,
                    "longitude": longitude,
                    "start_date": start_date,
                    "end_date": end_date,
                }))?;
                let service = build_service(&load_config()?)?;
                let receipt = service.store_weather(&query).await?;
                println!("{}", receipt.message);
                println!("  file: {}", receipt.file_name);
                println!("  path: {}", receipt.gcs_path);
            }
            Command::List { prefix } => {
                let service = build_service(&load_config()?)?;
                let list = service.list_files_with_prefix(&prefix).await?;
                if list.files.is_empty() {
                    println!("No files matching '{prefix}' in bucket '{}'.", list.bucket);
                }
                for name in list.files {
                    println!("{name}");
                }
            }
            Command::Show { file_name } => {
                let service = build_service(&load_config()?)?;
                let content = service.file_content(&file_name).await?;
                let pretty = serde_json::to_string_pretty(&content)
                    .context("Failed to format stored document")?;
                println!("{pretty}");
            }
        }

        Ok(())
    }
}

/// JSON has no NaN or infinity, so these never reach the validator intact.
fn finite_coordinate(raw: &str) -> std::result::Result<f64, String> {
    let value: f64 = raw.parse().map_err(|err| format!("{err}"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("'{raw}' is not a finite number"))
    }
}

fn load_config() -> Result<Config> {
    Config::load()?.with_process_env()
}

fn build_service(config: &Config) -> Result<WeatherService> {
    let store = ArtifactStore::open(config)?;
    let provider = provider_from_config(&config.upstream)?;
    Ok(WeatherService::new(provider, store))
}

async fn serve(config: Config) -> Result<()> {
    let service = build_service(&config)?;
    if let Some(project) = &config.project_id {
        info!(project = %project, "Using cloud project");
    }

    let app = create_router(service);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(%err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                warn!(%err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down...");
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let bucket = Text::new("Bucket name:")
        .with_default(config.bucket.as_deref().unwrap_or_default())
        .prompt()?;
    config.bucket = Some(bucket.trim().to_string()).filter(|b| !b.is_empty());

    let project = Text::new("Cloud project id (optional):")
        .with_default(config.project_id.as_deref().unwrap_or_default())
        .prompt()?;
    config.project_id = Some(project.trim().to_string()).filter(|p| !p.is_empty());

    let backends = StorageBackend::all().to_vec();
    let start = backends
        .iter()
        .position(|b| *b == config.storage)
        .unwrap_or_default();
    config.storage = Select::new("Storage backend:", backends)
        .with_starting_cursor(start)
        .prompt()?;

    if config.storage == StorageBackend::Local {
        let current = config
            .local_root
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let root = Text::new("Local storage directory:")
            .with_default(&current)
            .prompt()?;
        config.local_root = Some(PathBuf::from(root.trim()));
    }

    config.require_bucket()?;
    config.save()?;
    println!(
        "Configuration saved to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fetch_with_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "weather",
            "fetch",
            "--latitude",
            "-33.87",
            "--longitude",
            "151.21",
            "--start-date",
            "2023-01-01",
            "--end-date",
            "2023-01-05",
        ])
        .expect("fetch args parse");

        match cli.command {
            Command::Fetch {
                latitude,
                longitude,
                start_date,
                end_date,
            } => {
                assert_eq!(latitude, -33.87);
                assert_eq!(longitude, 151.21);
                assert_eq!(start_date, "2023-01-01");
                assert_eq!(end_date, "2023-01-05");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    fn fetch_args(latitude: &str) -> Vec<String> {
        [
            "weather",
            "fetch",
            "--latitude",
            latitude,
            "--longitude",
            "13.41",
            "--start-date",
            "2023-01-01",
            "--end-date",
            "2023-01-05",
        ]
        .map(String::from)
        .to_vec()
    }

    #[test]
    fn fetch_rejects_non_finite_coordinates() {
        for raw in ["NaN", "nan", "inf", "infinity"] {
            let err = Cli::try_parse_from(fetch_args(raw)).unwrap_err();
            assert!(err.to_string().contains("not a finite number"), "{raw}: {err}");
        }
        assert!(Cli::try_parse_from(fetch_args("52.52")).is_ok());
    }

    #[test]
    fn list_defaults_to_weather_prefix() {
        let cli = Cli::try_parse_from(["weather", "list"]).unwrap();
        assert!(matches!(cli.command, Command::List { prefix } if prefix == "weather_"));
    }

    #[test]
    fn serve_port_override() {
        let cli = Cli::try_parse_from(["weather", "serve", "-p", "9000"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Serve { host: None, port: Some(9000) }
        ));
    }

    #[test]
    fn show_requires_file_name() {
        assert!(Cli::try_parse_from(["weather", "show"]).is_err());
    }
}
