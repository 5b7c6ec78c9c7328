use std::{env, sync::Arc};

use clap::Parser;
use cli::Args;
use ducks_config::config::{config_path, generate_default_config, set_config_path, Config};
use ducks_core::ResolutionEngineBuilder;
use ducks_events::{ChannelSink, EventSinkHandle, NullSink};
use ducks_utils::path::resolve_path;
use error::{CliError, CliResult};
use events::spawn_event_logger;
use logging::setup_logging;
use resolve::resolve_coordinates;
use tracing::{debug, info};
use utils::COLOR;

mod cli;
mod error;
mod events;
mod logging;
mod resolve;
mod utils;

fn load_config(args: &Args) -> CliResult<Config> {
    if let Some(ref c) = args.config {
        let path = resolve_path(c)?;
        let path = if path.is_absolute() {
            path
        } else {
            env::current_dir()
                .map_err(|source| {
                    CliError::IoError {
                        action: "retrieving current directory".into(),
                        source,
                    }
                })?
                .join(path)
        };
        set_config_path(path);
    }

    debug!("Using configuration at {}", config_path().display());
    let mut config = Config::new()?;

    let mut overridden = false;
    if let Some(upstream) = &args.upstream {
        config.upstream_base_url = upstream.clone();
        overridden = true;
    }
    if let Some(user_agent) = &args.user_agent {
        config.user_agent = Some(user_agent.clone());
        overridden = true;
    }
    if overridden {
        config.resolve()?;
    }

    Ok(config)
}

async fn handle_cli() -> CliResult<()> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        let mut color = COLOR.write().unwrap();
        *color = false;
    }

    match args.command {
        cli::Commands::DefConfig => {
            if let Some(ref c) = args.config {
                set_config_path(resolve_path(c)?);
            }
            generate_default_config()?;
        }
        cli::Commands::Config => {
            let config = load_config(&args)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                info!("{}", toml::to_string_pretty(&config)?);
            }
        }
        cli::Commands::Resolve {
            ref coordinates,
        } => {
            let config = load_config(&args)?;

            let mut guard = None;
            let events: EventSinkHandle = if args.verbose > 0 {
                let (sink, receiver) = ChannelSink::new();
                guard = Some(spawn_event_logger(receiver));
                Arc::new(sink)
            } else {
                Arc::new(NullSink)
            };

            let engine = Arc::new(
                ResolutionEngineBuilder::from_config(&config)?
                    .events(events)
                    .build(),
            );

            let result = resolve_coordinates(engine, coordinates, args.json).await;

            // The engine holds the channel sender; the logger exits once it is gone.
            if let Some(guard) = guard {
                guard.finish();
            }
            result?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli().await {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
