use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::cmd::{CmdClient, submit_query};
use crate::config::ResolvedConfig;
use crate::domain::{MetallicityScale, PhotometricSystem, Track};
use crate::error::IsoError;
use crate::params::resolve_parameters;
use crate::payload::{PayloadKind, fetch_table};
use crate::reconstruct::reconstruct;
use crate::scrape::{CmdHtmlScraper, FilterMetadata, ResponseScraper, SystemEntry};
use crate::store::OutputStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub track: String,
    pub track_description: String,
    pub photometric_system: String,
    pub output_dir: String,
    pub ages: usize,
    pub dry_run: bool,
    pub files: Vec<IsochroneFile>,
    pub side_table: Option<SideTable>,
    pub completed_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IsochroneFile {
    pub metallicity: f64,
    pub scale: MetallicityScale,
    pub z: f64,
    pub path: String,
    pub token: Option<String>,
    pub payload: Option<PayloadKind>,
    pub blocks: usize,
    pub dropped_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SideTable {
    pub path: String,
    pub metadata: FilterMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemsResult {
    pub systems: Vec<SystemEntry>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Runs the query pipeline once per metallicity, strictly in grid order.
///
/// The first failure ends the batch. Files already written stay on disk.
pub struct App<C: CmdClient, S: ResponseScraper = CmdHtmlScraper> {
    client: C,
    scraper: S,
    store: OutputStore,
}

impl<C: CmdClient> App<C, CmdHtmlScraper> {
    pub fn new(client: C, store: OutputStore) -> Self {
        Self::with_scraper(client, CmdHtmlScraper::new(), store)
    }
}

impl<C: CmdClient, S: ResponseScraper> App<C, S> {
    pub fn with_scraper(client: C, scraper: S, store: OutputStore) -> Self {
        Self {
            client,
            scraper,
            store,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    pub fn fetch(
        &self,
        config: &ResolvedConfig,
        options: FetchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<BatchResult, IsoError> {
        let selection = &config.selection;
        let system = &selection.photometric_system;
        let ages_yr = selection.ages.years();
        let total = config.metallicities.len();

        sink.event(ProgressEvent {
            message: format!(
                "phase=Resolve; query CMD using {} in the '{}' system",
                selection.track.description(),
                system
            ),
            elapsed: None,
        });
        info!(
            track = %selection.track,
            system = %system,
            metallicities = total,
            ages = ages_yr.len(),
            "starting isochrone batch"
        );

        if !options.dry_run {
            self.store.ensure_system_dir(system)?;
        }

        let mut files = Vec::with_capacity(total);
        let mut side_table = None;
        for (index, metallicity) in config.metallicities.iter().enumerate() {
            let start = Instant::now();
            sink.event(ProgressEvent {
                message: format!("phase=Query; {metallicity} ({}/{total})", index + 1),
                elapsed: None,
            });

            let params = resolve_parameters(selection, metallicity)?;
            let path = self.store.isochrone_path(system, &metallicity);

            if options.dry_run {
                files.push(IsochroneFile {
                    metallicity: metallicity.value,
                    scale: metallicity.scale,
                    z: metallicity.mass_fraction(),
                    path: path.to_string(),
                    token: None,
                    payload: None,
                    blocks: ages_yr.len(),
                    dropped_rows: 0,
                });
                continue;
            }

            let submission = submit_query(&self.client, &self.scraper, &params, system)?;
            info!(token = %submission.token, "CMD accepted the query");

            if index == 0 {
                side_table = self.write_side_table(selection.track, system, &submission.document)?;
            }

            sink.event(ProgressEvent {
                message: format!("phase=Download; {}", submission.token),
                elapsed: None,
            });
            let payload = fetch_table(&self.client, &submission.token)?;
            if payload.kind != PayloadKind::Text {
                sink.event(ProgressEvent {
                    message: format!("phase=Decode; {:?} payload detected", payload.kind),
                    elapsed: None,
                });
            }

            let rebuilt = reconstruct(&payload.text, &ages_yr, config.drop_discarded_stage)?;
            OutputStore::write_text_atomic(&path, &rebuilt.text)?;

            sink.event(ProgressEvent {
                message: format!("phase=Store; wrote {path}"),
                elapsed: Some(start.elapsed()),
            });
            info!(
                path = %path,
                blocks = rebuilt.blocks,
                dropped_rows = rebuilt.dropped_rows,
                "isochrone file written"
            );

            files.push(IsochroneFile {
                metallicity: metallicity.value,
                scale: metallicity.scale,
                z: metallicity.mass_fraction(),
                path: path.to_string(),
                token: Some(submission.token.to_string()),
                payload: Some(payload.kind),
                blocks: rebuilt.blocks,
                dropped_rows: rebuilt.dropped_rows,
            });
        }

        Ok(BatchResult {
            track: selection.track.code().to_string(),
            track_description: selection.track.description().to_string(),
            photometric_system: system.to_string(),
            output_dir: self.store.system_dir(system).to_string(),
            ages: ages_yr.len(),
            dry_run: options.dry_run,
            files,
            side_table,
            completed_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    pub fn systems(&self, sink: &dyn ProgressSink) -> Result<SystemsResult, IsoError> {
        sink.event(ProgressEvent {
            message: "phase=Resolve; reading the CMD input form".to_string(),
            elapsed: None,
        });
        let page = self.client.form_page()?;
        let systems = self.scraper.photometric_systems(&page);
        if systems.is_empty() {
            warn!("no photometric systems found on the CMD form page");
        }
        Ok(SystemsResult { systems })
    }

    fn write_side_table(
        &self,
        track: Track,
        system: &PhotometricSystem,
        document: &str,
    ) -> Result<Option<SideTable>, IsoError> {
        let metadata = self.scraper.filter_metadata(document);
        if metadata.is_empty() {
            warn!(system = %system, "filter table not found in CMD response; skipping side-car");
            return Ok(None);
        }
        let path = self.store.sidecar_path(system);
        OutputStore::write_text_atomic(&path, &metadata.sidecar_line(track))?;
        Ok(Some(SideTable {
            path: path.to_string(),
            metadata,
        }))
    }
}
