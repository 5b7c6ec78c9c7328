use std::sync::Arc;

use ducks_core::{LookupError, MetadataView, ResolutionEngine};
use ducks_registry::Coordinate;
use nu_ansi_term::Color::{Cyan, Green, LightRed, Yellow};
use tracing::{error, info};

use crate::{
    error::{CliError, CliResult},
    utils::Colored,
};

/// Resolves every coordinate concurrently and prints the results in input
/// order.
pub async fn resolve_coordinates(
    engine: Arc<ResolutionEngine>,
    coordinates: &[String],
    json: bool,
) -> CliResult<()> {
    let handles: Vec<_> = coordinates
        .iter()
        .map(|input| {
            let engine = Arc::clone(&engine);
            let input = input.clone();
            tokio::spawn(async move {
                let coordinate = input.parse::<Coordinate>()?;
                engine.resolve_coordinate(&coordinate).await
            })
        })
        .collect();

    let mut views = Vec::new();
    let mut failed = 0;
    for (input, handle) in coordinates.iter().zip(handles) {
        let outcome = handle.await.unwrap_or(Err(LookupError::Aborted));
        match outcome {
            Ok(view) => views.push(view),
            Err(err) => {
                failed += 1;
                error!("{}: {}", Colored(Cyan, input), err);
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
    } else {
        for view in &views {
            print_view(view);
        }
    }

    if failed > 0 {
        return Err(CliError::ResolveFailed {
            failed,
            total: coordinates.len(),
        });
    }
    Ok(())
}

fn print_view(view: &MetadataView) {
    let mut coordinate = format!("{}:{}", view.group_id, view.artifact_id);
    if let Some(version) = &view.version {
        coordinate.push(':');
        coordinate.push_str(version);
    }

    let stale = if view.stale {
        format!(" {}", Colored(Yellow, "[stale]"))
    } else {
        String::new()
    };
    info!("{}{}", Colored(Cyan, &coordinate), stale);

    if let Some(latest) = &view.latest {
        info!("  latest:       {}", Colored(Green, latest));
    }
    if let Some(release) = &view.release {
        info!("  release:      {}", Colored(Green, release));
    }
    match (&view.last_updated_at, &view.last_updated) {
        (Some(at), _) => info!("  last updated: {}", at),
        (None, Some(raw)) => info!("  last updated: {}", raw),
        (None, None) => {}
    }
    if let Some(snapshot) = &view.snapshot {
        if let (Some(timestamp), Some(build)) = (&snapshot.timestamp, snapshot.build_number) {
            match snapshot.timestamp_at() {
                Some(at) => {
                    info!(
                        "  snapshot:     {}-{} (built {})",
                        timestamp,
                        build,
                        at.format("%Y-%m-%d %H:%M:%S UTC")
                    )
                }
                None => info!("  snapshot:     {}-{}", timestamp, build),
            }
        }
    }
    for snapshot_version in &view.snapshot_versions {
        if let Some(value) = &snapshot_version.value {
            let extension = snapshot_version.extension.as_deref().unwrap_or("?");
            match &snapshot_version.classifier {
                Some(classifier) => info!("    {classifier}.{extension}: {value}"),
                None => info!("    {extension}: {value}"),
            }
        }
    }
    if !view.versions.is_empty() {
        let versions = view
            .versions
            .iter()
            .map(|v| Colored(LightRed, v).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        info!("  versions:     {}", versions);
    }
}
