use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context as _;
use url::Url;

use crate::browser::{BrowserSession, NavigablePage};
use crate::timing::WorkerTimings;
use crate::{sanitize, store, stylesheet};

/// Everything a worker needs besides its bucket: where output goes, how it
/// identifies itself, how far pagination may run, and whether to report
/// timing diagnostics.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub storage_root: PathBuf,
    pub user_agent: &'static str,
    pub page_ceiling: Option<u32>,
    pub bench: bool,
}

/// Drains one bucket of seed URLs on an exclusive browser session. The queue
/// grows as pagination discovers next pages; those stay on this worker, never
/// the distributor. The first URL doubles as the stylesheet source when
/// `extract_stylesheet` is set. Any navigation, sanitize or write failure
/// abandons the rest of the queue; pages already written stay on disk and the
/// session is still closed.
pub async fn run<S, F, Fut>(
    index: usize,
    bucket: Vec<Url>,
    extract_stylesheet: bool,
    launch: F,
    ctx: WorkerContext,
) -> anyhow::Result<()>
where
    S: BrowserSession,
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<S>>,
{
    let mut timings = WorkerTimings::default();
    let mut queue: VecDeque<Url> = bucket.into();
    tracing::info!(worker = index, seeds = queue.len(), "worker starting");

    let launch_started = Instant::now();
    let mut session = launch().await.context("acquire browser session")?;
    timings.startup = launch_started.elapsed();

    let crawled = crawl_bucket(
        index,
        &mut queue,
        extract_stylesheet,
        &session,
        &ctx,
        &mut timings,
    )
    .await;

    let close_started = Instant::now();
    let closed = session.close().await;
    timings.teardown = close_started.elapsed();

    let processed = match (crawled, closed) {
        (Ok(processed), Ok(())) => processed,
        (Ok(_), Err(err)) => return Err(err.context("close browser session")),
        (Err(err), Ok(())) => return Err(err),
        (Err(err), Err(close_err)) => {
            tracing::warn!(worker = index, err = ?close_err, "close browser session after failure");
            return Err(err);
        }
    };

    tracing::info!(worker = index, pages = processed, "worker done");
    if ctx.bench {
        timings.report(index);
    }
    Ok(())
}

async fn crawl_bucket<S: BrowserSession>(
    index: usize,
    queue: &mut VecDeque<Url>,
    extract_stylesheet: bool,
    session: &S,
    ctx: &WorkerContext,
    timings: &mut WorkerTimings,
) -> anyhow::Result<usize> {
    let page = session.new_page().await.context("open worker page")?;
    page.set_user_agent(ctx.user_agent)
        .await
        .context("set user agent")?;

    let stylesheet_url = match queue.front() {
        Some(first) => {
            let extraction_started = Instant::now();
            let url = stylesheet::extract(&page, first, extract_stylesheet, &ctx.storage_root)
                .await
                .context("resolve shared stylesheet")?;
            timings.stylesheet = extraction_started.elapsed();
            url
        }
        None => stylesheet::PUBLIC_URL,
    };

    let mut processed = 0usize;
    while let Some(url) = queue.pop_front() {
        let page_started = Instant::now();
        page.navigate(&url).await?;
        let markup = page.content().await?;

        let sanitized = sanitize::sanitize(&markup, &url, stylesheet_url, ctx.page_ceiling)
            .with_context(|| format!("sanitize {url}"))?;
        if let Some(next_url) = sanitized.next_url {
            tracing::debug!(worker = index, url = %next_url, "pagination discovered");
            queue.push_back(next_url);
        }

        let path = store::write_page(&ctx.storage_root, &url, &sanitized.markup).await?;
        timings.record_page(&url, page_started.elapsed());
        processed += 1;
        tracing::info!(worker = index, url = %url, path = %path.display(), "page stored");
    }

    Ok(processed)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use url::Url;

    use super::{WorkerContext, run};
    use crate::browser::fakes::{FakeBrowser, FakeSession};
    use crate::site;
    use crate::stylesheet;

    fn ctx(storage_root: &Path) -> WorkerContext {
        WorkerContext {
            storage_root: storage_root.to_path_buf(),
            user_agent: site::USER_AGENT,
            page_ceiling: Some(5),
            bench: false,
        }
    }

    fn listing(next_href: Option<&str>) -> String {
        match next_href {
            Some(href) => format!(
                "<html><head></head><body><p>doctors</p><link rel=\"next\" href=\"{href}\"></body></html>"
            ),
            None => "<html><head></head><body><p>doctors</p></body></html>".to_owned(),
        }
    }

    async fn run_worker(
        browser: &Arc<FakeBrowser>,
        bucket: Vec<Url>,
        extract_stylesheet: bool,
        ctx: WorkerContext,
    ) -> anyhow::Result<()> {
        run(
            0,
            bucket,
            extract_stylesheet,
            || async { Ok::<FakeSession, anyhow::Error>(browser.clone().session()) },
            ctx,
        )
        .await
    }

    #[tokio::test]
    async fn pagination_grows_the_workers_own_queue() {
        let browser = FakeBrowser::new();
        browser.insert_page("https://site.test/list", &listing(Some("?page=2")));
        browser.insert_page("https://site.test/list?page=2", &listing(Some("?page=3")));
        browser.insert_page("https://site.test/list?page=3", &listing(None));
        let out = tempfile::tempdir().unwrap();

        let bucket = vec![Url::parse("https://site.test/list").unwrap()];
        run_worker(&browser, bucket, false, ctx(out.path()))
            .await
            .unwrap();

        assert_eq!(
            browser.navigated(),
            vec![
                "https://site.test/list".to_owned(),
                "https://site.test/list?page=2".to_owned(),
                "https://site.test/list?page=3".to_owned(),
            ]
        );
        for file in ["list/index.html", "list/page-2.html", "list/page-3.html"] {
            let markup = std::fs::read_to_string(out.path().join(file)).unwrap();
            assert!(
                markup.contains("href=\"/search-stylesheet.css\""),
                "{file} misses the stylesheet link"
            );
        }
    }

    #[tokio::test]
    async fn pagination_stops_at_the_ceiling() {
        let browser = FakeBrowser::new();
        browser.insert_page("https://site.test/list?page=5", &listing(Some("?page=6")));
        let out = tempfile::tempdir().unwrap();

        let bucket = vec![Url::parse("https://site.test/list?page=5").unwrap()];
        run_worker(&browser, bucket, false, ctx(out.path()))
            .await
            .unwrap();

        assert_eq!(
            browser.navigated(),
            vec!["https://site.test/list?page=5".to_owned()]
        );
        assert!(out.path().join("list/page-5.html").exists());
        assert!(!out.path().join("list/page-6.html").exists());
    }

    #[tokio::test]
    async fn designated_worker_extracts_then_revisits_its_first_url() {
        let browser = FakeBrowser::new();
        browser.insert_page("https://site.test/list", &listing(None));
        browser.set_stylesheet_bodies(&["body{margin:0}"]);
        let out = tempfile::tempdir().unwrap();

        let bucket = vec![Url::parse("https://site.test/list").unwrap()];
        run_worker(&browser, bucket, true, ctx(out.path()))
            .await
            .unwrap();

        assert_eq!(browser.capture_navigations.load(Ordering::SeqCst), 1);
        assert_eq!(browser.navigated().len(), 2);
        assert_eq!(
            std::fs::read_to_string(out.path().join(stylesheet::FILE_NAME)).unwrap(),
            "body{margin:0}"
        );
    }

    #[tokio::test]
    async fn undesignated_worker_never_captures() {
        let browser = FakeBrowser::new();
        browser.insert_page("https://site.test/list", &listing(None));
        let out = tempfile::tempdir().unwrap();

        let bucket = vec![Url::parse("https://site.test/list").unwrap()];
        run_worker(&browser, bucket, false, ctx(out.path()))
            .await
            .unwrap();

        assert_eq!(browser.capture_navigations.load(Ordering::SeqCst), 0);
        assert!(!out.path().join(stylesheet::FILE_NAME).exists());
    }

    #[tokio::test]
    async fn empty_bucket_completes_and_releases_the_session() {
        let browser = FakeBrowser::new();
        let out = tempfile::tempdir().unwrap();

        run_worker(&browser, Vec::new(), false, ctx(out.path()))
            .await
            .unwrap();

        assert!(browser.navigated().is_empty());
        assert_eq!(browser.sessions_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn navigation_failure_abandons_the_queue_but_keeps_earlier_pages() {
        let browser = FakeBrowser::new();
        browser.insert_page("https://site.test/a", &listing(None));
        browser.insert_page("https://site.test/c", &listing(None));
        browser.fail_navigation("https://site.test/b");
        let out = tempfile::tempdir().unwrap();

        let bucket = vec![
            Url::parse("https://site.test/a").unwrap(),
            Url::parse("https://site.test/b").unwrap(),
            Url::parse("https://site.test/c").unwrap(),
        ];
        let result = run_worker(&browser, bucket, false, ctx(out.path())).await;

        assert!(result.is_err());
        assert!(out.path().join("a/index.html").exists());
        assert!(!out.path().join("b/index.html").exists());
        assert!(!out.path().join("c/index.html").exists());
        assert_eq!(browser.sessions_closed.load(Ordering::SeqCst), 1);
    }
}
