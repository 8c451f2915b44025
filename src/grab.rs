use std::env;
use std::future::Future;
use std::path::PathBuf;

use anyhow::Context as _;
use url::Url;

use crate::browser::{self, BrowserSession};
use crate::cli::GrabArgs;
use crate::site;
use crate::worker::{self, WorkerContext};

/// Pagination stops after this many pages per listing unless the run is
/// marked as production.
const DEV_PAGE_CEILING: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Production,
    Development,
}

impl RunMode {
    pub fn from_env() -> Self {
        Self::parse(env::var("SITESNAP_ENV").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some(value) if value.trim().eq_ignore_ascii_case("production") => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn page_ceiling(self) -> Option<u32> {
        match self {
            Self::Production => None,
            Self::Development => Some(DEV_PAGE_CEILING),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GrabConfig {
    pub mode: RunMode,
    pub bench: bool,
    pub chromium: Option<PathBuf>,
}

impl GrabConfig {
    pub fn from_env() -> Self {
        Self {
            mode: RunMode::from_env(),
            bench: flag_set(env::var("SITESNAP_BENCH").ok().as_deref()),
            chromium: env::var_os("SITESNAP_CHROMIUM").map(PathBuf::from),
        }
    }
}

fn flag_set(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("1") | Some("true"))
}

pub async fn run(args: GrabArgs) -> anyhow::Result<()> {
    let config = GrabConfig::from_env();
    tracing::debug!(?config, "grab config");

    let seeds = site::seed_urls().context("build seed urls")?;
    let ctx = WorkerContext {
        storage_root: PathBuf::from(&args.out),
        user_agent: site::USER_AGENT,
        page_ceiling: config.mode.page_ceiling(),
        bench: config.bench,
    };
    let chromium = config.chromium;
    let launch = move || browser::launch(site::VIEWPORT, chromium.clone());
    run_with_browser(seeds, args.workers, launch, ctx).await
}

/// Splits the seeds round-robin over at most `workers` exclusive browser
/// sessions and waits for all of them. Worker 0 is the designated stylesheet
/// extractor. A failing worker does not cancel its siblings; the first
/// failure is reported once every worker has finished.
pub async fn run_with_browser<S, F, Fut>(
    seeds: Vec<Url>,
    workers: usize,
    launch: F,
    ctx: WorkerContext,
) -> anyhow::Result<()>
where
    S: BrowserSession + 'static,
    F: Fn() -> Fut + Clone + Send + 'static,
    Fut: Future<Output = anyhow::Result<S>> + Send + 'static,
{
    let seed_count = seeds.len();
    let worker_count = workers.min(seed_count).max(1);
    let buckets = partition_round_robin(seeds, worker_count);
    tracing::info!(
        workers = worker_count,
        seeds = seed_count,
        out = %ctx.storage_root.display(),
        "starting crawl"
    );

    let mut handles = Vec::with_capacity(buckets.len());
    for (index, bucket) in buckets.into_iter().enumerate() {
        let launch = launch.clone();
        let ctx = ctx.clone();
        handles.push(tokio::spawn(worker::run(
            index,
            bucket,
            index == 0,
            launch,
            ctx,
        )));
    }

    let mut first_failure: Option<anyhow::Error> = None;
    for (index, handle) in handles.into_iter().enumerate() {
        match handle
            .await
            .with_context(|| format!("join worker {index}"))?
        {
            Ok(()) => {}
            Err(err) => {
                tracing::error!(worker = index, ?err, "worker failed");
                if first_failure.is_none() {
                    first_failure = Some(err.context(format!("worker {index}")));
                }
            }
        }
    }

    match first_failure {
        Some(err) => Err(err),
        None => {
            tracing::info!("crawl complete");
            Ok(())
        }
    }
}

fn partition_round_robin(seeds: Vec<Url>, count: usize) -> Vec<Vec<Url>> {
    let mut buckets = vec![Vec::new(); count];
    for (position, seed) in seeds.into_iter().enumerate() {
        buckets[position % count].push(seed);
    }
    buckets
}
