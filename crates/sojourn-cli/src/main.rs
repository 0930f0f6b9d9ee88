mod display;
mod run;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sojourn_core::{ActivityParams, PipelineConfig};
use sojourn_sync::llm::{DEFAULT_CHAT_URL, DEFAULT_MODEL};
use sojourn_sync::nominatim::DEFAULT_NOMINATIM_URL;
use sojourn_sync::overpass::DEFAULT_OVERPASS_URL;

#[derive(Parser)]
#[command(name = "sojourn", version, about = "Infer the purpose of stay points")]
struct Cli {
    /// JSON pipeline configuration; missing fields take defaults.
    #[arg(long, global = true, env = "SOJOURN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Aggregate stay points into locations and list home/work sites.
    Homework {
        /// JSON array of stay-point records.
        #[arg(long)]
        input: PathBuf,

        /// Reverse-geocode each site via Nominatim.
        #[arg(long)]
        geocode: bool,

        #[command(flatten)]
        geocoder: GeocoderArgs,
    },

    /// Run the full pipeline and export the labelled stay points.
    Classify {
        /// JSON array of stay-point records.
        #[arg(long)]
        input: PathBuf,

        /// Classification records, rewritten after every stay point.
        #[arg(long, default_value = "classifications.json")]
        checkpoint: PathBuf,

        /// Parquet file for the final stay points.
        #[arg(long, default_value = "stay_points.parquet")]
        output: PathBuf,

        /// Ignore an existing checkpoint instead of resuming from it.
        #[arg(long)]
        fresh: bool,

        /// Print the first N exported rows.
        #[arg(long, default_value_t = 10)]
        preview: usize,

        #[command(flatten)]
        services: ServiceArgs,

        #[command(flatten)]
        activity: ActivityOverrides,
    },

    /// Show the candidate POIs and rendered context for one coordinate.
    Pois {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        #[arg(long, env = "SOJOURN_OVERPASS_URL", default_value = DEFAULT_OVERPASS_URL)]
        overpass_url: String,

        #[command(flatten)]
        activity: ActivityOverrides,
    },
}

#[derive(Args)]
struct GeocoderArgs {
    #[arg(long, env = "SOJOURN_NOMINATIM_URL", default_value = DEFAULT_NOMINATIM_URL)]
    nominatim_url: String,

    /// Identifying User-Agent required by Nominatim.
    #[arg(
        long,
        env = "SOJOURN_USER_AGENT",
        default_value = concat!("sojourn/", env!("CARGO_PKG_VERSION"))
    )]
    user_agent: String,
}

#[derive(Args)]
struct ServiceArgs {
    #[arg(long, env = "SOJOURN_OVERPASS_URL", default_value = DEFAULT_OVERPASS_URL)]
    overpass_url: String,

    /// OpenAI-compatible API root, including the version segment.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_CHAT_URL)]
    llm_url: String,

    #[arg(long, env = "SOJOURN_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Sampling temperature for the model.
    #[arg(long, default_value_t = 0.0)]
    temperature: f32,
}

/// Command-line overrides for the activity stage; unset flags keep the config value.
#[derive(Args, Default)]
struct ActivityOverrides {
    #[arg(long)]
    max_pois: Option<usize>,

    /// Half-width of the POI search box in meters.
    #[arg(long)]
    radius: Option<f64>,

    /// Minutes east of UTC used when describing stay times.
    #[arg(long, allow_hyphen_values = true)]
    utc_offset: Option<i32>,

    /// Leave out the name of unnamed POIs.
    #[arg(long)]
    skip_unnamed: bool,
}

impl ActivityOverrides {
    fn apply(&self, params: &mut ActivityParams) {
        if let Some(max_pois) = self.max_pois {
            params.max_pois = max_pois;
        }
        if let Some(radius) = self.radius {
            params.search_radius_m = radius;
        }
        if let Some(offset) = self.utc_offset {
            params.utc_offset_minutes = offset;
        }
        if self.skip_unnamed {
            params.skip_unnamed = true;
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

/// Apply overrides and check the result once, before any work starts.
fn finalize(
    mut config: PipelineConfig,
    overrides: &ActivityOverrides,
) -> anyhow::Result<PipelineConfig> {
    overrides.apply(&mut config.activity);
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("sojourn v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::Homework {
            input,
            geocode,
            geocoder: args,
        } => {
            let geocoder = geocode
                .then(|| run::nominatim(&args.nominatim_url, &args.user_agent))
                .transpose()?;
            run::homework(&config, &input, geocoder.as_ref()).await
        }
        Command::Classify {
            input,
            checkpoint,
            output,
            fresh,
            preview,
            services,
            activity,
        } => {
            let config = finalize(config, &activity)?;
            let services = run::Services::connect(&services, &config.activity);
            let paths = run::ClassifyPaths {
                input,
                checkpoint,
                output,
            };
            run::classify(&config, &services, &paths, fresh, preview).await
        }
        Command::Pois {
            lat,
            lon,
            overpass_url,
            activity,
        } => {
            let config = finalize(config, &activity)?;
            run::pois(&config, &overpass_url, lat, lon).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_only_touch_set_fields() {
        let mut params = ActivityParams::default();
        let overrides = ActivityOverrides {
            radius: Some(250.0),
            utc_offset: Some(-300),
            ..ActivityOverrides::default()
        };
        overrides.apply(&mut params);
        assert_eq!(params.search_radius_m, 250.0);
        assert_eq!(params.utc_offset_minutes, -300);
        assert_eq!(params.max_pois, ActivityParams::default().max_pois);
        assert!(!params.skip_unnamed);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let overrides = ActivityOverrides {
            radius: Some(-1.0),
            ..ActivityOverrides::default()
        };
        assert!(finalize(PipelineConfig::default(), &overrides).is_err());
    }

    #[test]
    fn parses_classify_with_defaults() {
        let cli = Cli::try_parse_from(["sojourn", "classify", "--input", "stays.json"]).unwrap();
        match cli.command {
            Command::Classify {
                checkpoint,
                output,
                fresh,
                ..
            } => {
                assert_eq!(checkpoint, PathBuf::from("classifications.json"));
                assert_eq!(output, PathBuf::from("stay_points.parquet"));
                assert!(!fresh);
            }
            _ => panic!("expected classify"),
        }
    }

    #[test]
    fn parses_temperature() {
        let cli = Cli::try_parse_from([
            "sojourn",
            "classify",
            "--input",
            "stays.json",
            "--temperature",
            "0.7",
        ])
        .unwrap();
        match cli.command {
            Command::Classify { services, .. } => assert_eq!(services.temperature, 0.7),
            _ => panic!("expected classify"),
        }
    }
}
