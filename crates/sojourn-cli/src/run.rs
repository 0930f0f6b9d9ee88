//! Subcommand wiring: load input, run the pipeline stages, write and print results.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use arrow::util::pretty::pretty_format_batches;
use sojourn_ai::activity::rank_candidates;
use sojourn_ai::home_work::attach_addresses;
use sojourn_ai::prompt::render_pois;
use sojourn_ai::Pipeline;
use sojourn_core::{ActivityParams, BoundingBox, GeoPoint, PipelineConfig};
use sojourn_store::{JsonCheckpoint, LoadedStays, load_stay_points, stays_to_batch, write_parquet};
use sojourn_sync::{ChatClient, NominatimClient, OverpassClient};
use tracing::warn;

use crate::{ServiceArgs, display};

const GEOCODE_TIMEOUT: Duration = Duration::from_secs(20);

pub struct Services {
    pub pois: OverpassClient,
    pub model: ChatClient,
}

impl Services {
    pub(crate) fn connect(args: &ServiceArgs, params: &ActivityParams) -> Self {
        if args.api_key.is_none() {
            warn!("no API key set; the model endpoint must accept anonymous requests");
        }
        Self {
            pois: overpass(&args.overpass_url, params),
            model: ChatClient::new(args.llm_url.clone(), args.model.clone(), args.api_key.clone())
                .with_temperature(args.temperature),
        }
    }
}

/// The server-side query limit matches the client-side timeout.
fn overpass(url: &str, params: &ActivityParams) -> OverpassClient {
    OverpassClient::new(url.to_string()).with_server_timeout(params.poi_timeout_secs)
}

pub struct ClassifyPaths {
    pub input: PathBuf,
    pub checkpoint: PathBuf,
    pub output: PathBuf,
}

pub fn nominatim(url: &str, user_agent: &str) -> anyhow::Result<NominatimClient> {
    NominatimClient::new(url.to_string(), user_agent).context("building Nominatim client")
}

fn load(input: &Path) -> anyhow::Result<LoadedStays> {
    let loaded = load_stay_points(input)
        .with_context(|| format!("reading stay points from {}", input.display()))?;
    eprintln!("  Read {} stay points from {}", loaded.stays.len(), input.display());
    if !loaded.rejected.is_empty() {
        eprintln!("  Skipped {} malformed records:", loaded.rejected.len());
        for err in &loaded.rejected {
            eprintln!("    {err}");
        }
    }
    Ok(loaded)
}

/// `sojourn homework`: locations, month windows and home/work sites.
pub async fn homework(
    config: &PipelineConfig,
    input: &Path,
    geocoder: Option<&NominatimClient>,
) -> anyhow::Result<()> {
    let loaded = load(input)?;
    let pipeline = Pipeline::new(config.clone());
    let mut stage = pipeline.home_work(loaded.stays);

    if let Some(geocoder) = geocoder {
        attach_addresses(&mut stage.sites, geocoder, GEOCODE_TIMEOUT).await;
    }

    println!("{} locations", stage.locations.len());
    println!();
    print!("{}", display::windows_table(&stage.windows));
    println!();
    print!("{}", display::sites_table(&stage.sites));
    Ok(())
}

/// `sojourn classify`: the full pipeline with checkpoint, resume and Parquet export.
pub async fn classify(
    config: &PipelineConfig,
    services: &Services,
    paths: &ClassifyPaths,
    fresh: bool,
    preview: usize,
) -> anyhow::Result<()> {
    let start = Instant::now();

    // 1. Read stay points.
    let loaded = load(&paths.input)?;

    // 2. Pick up where an interrupted run stopped.
    let mut checkpoint = JsonCheckpoint::new(&paths.checkpoint);
    let previous = if fresh {
        Vec::new()
    } else {
        checkpoint.load().context("loading checkpoint")?
    };
    if !previous.is_empty() {
        eprintln!(
            "  Resuming with {} records from {}",
            previous.len(),
            paths.checkpoint.display()
        );
    }

    // 3. Label.
    let pipeline = Pipeline::new(config.clone());
    let outcome = pipeline
        .run(
            loaded.stays,
            &services.pois,
            &services.model,
            &mut checkpoint,
            previous,
        )
        .await?;

    // 4. Export.
    write_parquet(&paths.output, &outcome.stays)
        .with_context(|| format!("writing {}", paths.output.display()))?;
    eprintln!(
        "  Wrote {} stay points to {} in {:.1}s",
        outcome.stays.len(),
        paths.output.display(),
        start.elapsed().as_secs_f64()
    );

    print!("{}", display::sites_table(&outcome.sites));
    println!();
    print!("{}", display::label_summary(&outcome.counts));

    if preview > 0 && !outcome.stays.is_empty() {
        let batch = stays_to_batch(&outcome.stays)?;
        let rows = preview.min(batch.num_rows());
        println!();
        println!("{}", pretty_format_batches(&[batch.slice(0, rows)])?);
    }
    Ok(())
}

/// `sojourn pois`: what the model would be shown for one coordinate.
pub async fn pois(
    config: &PipelineConfig,
    overpass_url: &str,
    lat: f64,
    lon: f64,
) -> anyhow::Result<()> {
    let point = GeoPoint::new(lon, lat);
    if !point.is_valid() {
        anyhow::bail!("coordinate out of range: lat {lat}, lon {lon}");
    }
    let params = &config.activity;
    let bbox = BoundingBox::around(point, params.search_radius_m);
    let client = overpass(overpass_url, params);

    let nodes = tokio::time::timeout(params.poi_timeout(), client.query(&bbox))
        .await
        .context("overpass query timed out")??;
    let candidates = rank_candidates(&nodes, &point, params.max_pois);
    eprintln!(
        "  {} nodes in {}, showing {}",
        nodes.len(),
        bbox.to_overpass(),
        candidates.len()
    );

    print!("{}", display::candidates_table(&candidates));
    println!();
    println!("{}", render_pois(&candidates, params.skip_unnamed));
    Ok(())
}
