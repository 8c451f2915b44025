use std::time::Duration;

use url::Url;

/// Wall-clock breakdown of one worker's run. Collected unconditionally since
/// it is a handful of durations; reported only when diagnostics are enabled.
#[derive(Debug, Default)]
pub struct WorkerTimings {
    pub startup: Duration,
    pub stylesheet: Duration,
    pub teardown: Duration,
    pages: Vec<PageTiming>,
}

#[derive(Debug)]
struct PageTiming {
    url: String,
    elapsed: Duration,
}

impl WorkerTimings {
    pub fn record_page(&mut self, url: &Url, elapsed: Duration) {
        self.pages.push(PageTiming {
            url: url.to_string(),
            elapsed,
        });
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn total_page_time(&self) -> Duration {
        self.pages.iter().map(|page| page.elapsed).sum()
    }

    pub fn report(&self, worker: usize) {
        for page in &self.pages {
            tracing::info!(
                worker,
                url = %page.url,
                elapsed_ms = page.elapsed.as_millis() as u64,
                "page timing"
            );
        }
        tracing::info!(
            worker,
            startup_ms = self.startup.as_millis() as u64,
            stylesheet_ms = self.stylesheet.as_millis() as u64,
            pages = self.page_count(),
            pages_ms = self.total_page_time().as_millis() as u64,
            teardown_ms = self.teardown.as_millis() as u64,
            "worker timings"
        );
    }
}
