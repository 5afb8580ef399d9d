mod args;
mod confirm;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marquee_core::{
    assets::{AssetGenerator, FfmpegAssetGenerator},
    downloader::{TrailerDownloader, YtDlpDownloader},
    external_catalog::{MovieCatalog, TmdbClient, TmdbConfig},
    load_config,
    pipeline::write_download_report,
    validate_config, AssetOptions, AutoConfirm, Config, Confirmer, MovieId, Reconciler,
    RunOptions, SanitizedConfig, UpcomingOptions,
};

use args::{AssetArgs, Cli, Command, UpcomingArgs};
use confirm::StdinConfirmer;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so reports on stdout stay clean
    let json = cli.json_logs;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_filter().into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Loading configuration from {:?}", cli.config);
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;
    debug!("Configuration: {:?}", SanitizedConfig::from(&config));

    let options = RunOptions {
        dry_run: cli.dry_run || config.dry_run,
        force: cli.force,
        overwrite: cli.overwrite,
        limit: cli.count,
    };
    let confirmer: Arc<dyn Confirmer> = if cli.yes {
        Arc::new(AutoConfirm(true))
    } else {
        Arc::new(StdinConfirmer)
    };
    let reconciler = build_reconciler(&config, confirmer)?;

    let report = match cli.command {
        Command::Catalog => reconciler.catalog(&options).await?,
        Command::FetchExisting => reconciler.fetch_existing(&options).await?,
        Command::FetchUpcoming(upcoming) => {
            let upcoming = upcoming_options(&config, upcoming)?;
            reconciler.fetch_upcoming(&options, &upcoming).await?
        }
        Command::Sync => reconciler.sync(&options).await?,
        Command::GenerateAssets(assets) => {
            let assets = asset_options(&assets);
            reconciler.generate_assets(&options, &assets).await?
        }
        Command::ClearFailures { ids } => {
            let ids: Vec<MovieId> = ids.into_iter().map(MovieId).collect();
            let removed = reconciler
                .clear_failures(&ids)
                .context("Failed to clear known failures")?;
            println!("Cleared {} known failures", removed);
            return Ok(());
        }
        Command::RebuildJunk => {
            let junk = reconciler
                .rebuild_junk()
                .context("Failed to rebuild junk words")?;
            println!("Learned {} junk words", junk.words().len());
            return Ok(());
        }
    };

    print!("{}", report);
    if let Some(path) = &cli.report {
        write_download_report(path, &report.downloads)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
    }
    Ok(())
}

fn build_reconciler(config: &Config, confirmer: Arc<dyn Confirmer>) -> Result<Reconciler> {
    let catalog: Arc<dyn MovieCatalog> = Arc::new(
        TmdbClient::new(TmdbConfig::from(&config.tmdb)).context("Failed to create TMDB client")?,
    );
    let downloader: Arc<dyn TrailerDownloader> =
        Arc::new(YtDlpDownloader::new(config.downloader.clone()));
    let assets: Arc<dyn AssetGenerator> =
        Arc::new(FfmpegAssetGenerator::new(config.assets.clone()));
    info!(
        "Using {} for trailers and {} for assets",
        downloader.name(),
        assets.name()
    );

    Ok(Reconciler::new(
        config.clone(),
        catalog,
        downloader,
        assets,
        confirmer,
    ))
}

fn upcoming_options(config: &Config, args: UpcomingArgs) -> Result<UpcomingOptions> {
    let years = match args.year {
        Some(year) => Some(year..=year),
        None if args.year_start.is_some() || args.year_end.is_some() => {
            let start = args.year_start.unwrap_or(config.upcoming.start_year);
            let end = args.year_end.unwrap_or(config.upcoming.end_year);
            if start > end {
                bail!("Year range {}..{} is empty", start, end);
            }
            Some(start..=end)
        }
        None => None,
    };

    Ok(UpcomingOptions {
        years,
        no_cache: args.no_cache,
        clear_cache: args.clear_cache,
        export_list: args.export_list,
    })
}

fn asset_options(args: &AssetArgs) -> AssetOptions {
    let (placeholders, backdrops) = args.selection();
    AssetOptions {
        placeholders,
        backdrops,
    }
}
