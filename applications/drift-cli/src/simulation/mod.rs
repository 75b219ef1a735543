//! Simulated collaborators
//!
//! Stand-ins for the streaming backend, the audio device and the
//! recommendation service, so the player can run end-to-end in a terminal.

mod catalog;
mod engine;
mod resolver;

pub use catalog::Catalog;
pub use engine::VirtualEngine;
pub use resolver::SimulatedResolver;

use crate::config::SimulationConfig;
use drift_core::TrackId;
use std::sync::Arc;
use url::Url;

const STREAM_SCHEME: &str = "sim";
const STREAM_HOST: &str = "stream.drift";

/// Collaborators wired from one configuration
pub struct Simulation {
    pub catalog: Arc<Catalog>,
    pub resolver: Arc<SimulatedResolver>,
    pub engine: Arc<VirtualEngine>,
}

impl Simulation {
    /// Build the catalog, resolver and engine; starts the engine clock
    pub fn new(config: &SimulationConfig) -> Self {
        let mut catalog = Catalog::generate(config.seed, config.catalog_size)
            .with_latency(config.related_latency());
        if let Some(dir) = &config.download_dir {
            catalog = catalog.with_downloads(dir);
        }
        let catalog = Arc::new(catalog);

        let resolver = SimulatedResolver::new(catalog.clone(), config.seed)
            .with_latency(config.resolve_latency())
            .with_validity(config.validity_secs)
            .with_failure_rate(config.failure_rate);

        let engine = VirtualEngine::spawn(catalog.clone(), config.tick(), config.time_scale);

        Self {
            catalog,
            resolver: Arc::new(resolver),
            engine,
        }
    }
}

/// Stream URL minted for a resolved track
pub fn stream_url(id: &TrackId, bitrate: u32) -> String {
    format!("{STREAM_SCHEME}://{STREAM_HOST}/{id}?bitrate={bitrate}")
}

/// Track id behind a stream URL or a downloaded copy's `file://` URI
pub fn track_id_from_uri(uri: &str) -> Option<TrackId> {
    let url = Url::parse(uri).ok()?;
    match url.scheme() {
        STREAM_SCHEME if url.host_str() == Some(STREAM_HOST) => {
            let id = url.path_segments()?.last()?;
            (!id.is_empty()).then(|| TrackId::new(id))
        }
        "file" => {
            let path = url.to_file_path().ok()?;
            let stem = path.file_stem()?.to_str()?;
            Some(TrackId::new(stem))
        }
        _ => None,
    }
}
