use clap::Parser;
use picser::client::{PicserClient, TenantTarget};
use picser::config::{Args, Command, HistoryAction, UploadArgs};
use picser::history::{HistoryRecord, HistoryStore, JsonFileHistoryStore};
use picser::{Application, Config, telemetry};

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

async fn run_upload(config: &Config, args: UploadArgs) -> anyhow::Result<()> {
    let tenant = match (args.token, args.owner, args.repo) {
        (Some(token), Some(owner), Some(repo)) => Some(TenantTarget {
            token,
            owner,
            repo,
            branch: args.branch,
            folder: args.folder,
        }),
        _ => None,
    };

    let client = PicserClient::new(args.server)?;
    let response = client.upload(&args.file, tenant.as_ref()).await?;

    let store = JsonFileHistoryStore::new(&config.history.path);
    store.append(HistoryRecord::from_response(&response), config.history.capacity);

    println!("Uploaded {} ({} bytes)", response.filename, response.size);
    println!("  commit:          {}", response.commit_sha);
    println!("  github:          {}", response.urls.github);
    println!("  raw:             {}", response.urls.raw);
    println!("  jsdelivr:        {}", response.urls.jsdelivr);
    println!("  github (commit): {}", response.urls.github_commit);
    println!("  raw (commit):    {}", response.urls.raw_commit);
    println!("  jsdelivr (commit): {}", response.urls.jsdelivr_commit);
    Ok(())
}

fn run_history(config: &Config, action: HistoryAction) {
    let store = JsonFileHistoryStore::new(&config.history.path);
    match action {
        HistoryAction::List => {
            let records = store.list();
            if records.is_empty() {
                println!("No uploads recorded.");
            }
            for record in records {
                println!(
                    "{}  {:>10}  {}  {}",
                    record.upload_date.format("%Y-%m-%d %H:%M:%S"),
                    record.size,
                    record.filename,
                    record.urls.as_ref().map(|u| u.best()).unwrap_or(&record.url)
                );
            }
        }
        HistoryAction::Clear => {
            store.clear();
            println!("Upload history cleared.");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args)?;

    // If --validate flag is set, exit successfully after config validation
    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    let command = args.command.clone().unwrap_or(Command::Serve);
    let default_filter = match command {
        Command::Serve => "info",
        _ => "warn",
    };
    telemetry::init_telemetry(config.enable_otel_export, default_filter)?;

    tracing::debug!("{:?}", args);

    match command {
        Command::Serve => {
            // Run the application with graceful shutdown on SIGTERM/Ctrl+C
            let shutdown = shutdown_signal();
            Application::new(config)?.serve(shutdown).await
        }
        Command::Upload(upload_args) => {
            let result = run_upload(&config, upload_args).await;
            telemetry::shutdown_telemetry();
            result
        }
        Command::History { action } => {
            run_history(&config, action);
            Ok(())
        }
    }
}
