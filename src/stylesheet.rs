use std::path::Path;

use anyhow::Context as _;
use tokio::fs;
use url::Url;

use crate::browser::NavigablePage;

/// File the concatenated stylesheet is persisted under, at the storage root.
pub const FILE_NAME: &str = "search-stylesheet.css";

/// Site-absolute URL every sanitized page references the stylesheet by.
pub const PUBLIC_URL: &str = "/search-stylesheet.css";

/// Resolves the shared stylesheet URL for a worker. With `should_extract` set
/// this performs the run's one capturing navigation to `source_url`, joins the
/// captured bodies in arrival order and writes them under `storage_root`; all
/// other callers return immediately without navigating. Both branches yield
/// [`PUBLIC_URL`], so callers cannot tell which worker did the work.
///
/// The whole stylesheet is kept on purpose. Coverage-trimmed extraction broke
/// around media-query range boundaries and dropped `@font-face` rules, so we
/// accept the full payload instead of a minimized one.
pub async fn extract<P: NavigablePage>(
    page: &P,
    source_url: &Url,
    should_extract: bool,
    storage_root: &Path,
) -> anyhow::Result<&'static str> {
    if !should_extract {
        return Ok(PUBLIC_URL);
    }

    let bodies = page
        .navigate_capturing_stylesheets(source_url)
        .await
        .with_context(|| format!("capture stylesheets from {source_url}"))?;
    let stylesheet = bodies.join("\n");

    fs::create_dir_all(storage_root)
        .await
        .with_context(|| format!("create storage root: {}", storage_root.display()))?;
    let path = storage_root.join(FILE_NAME);
    fs::write(&path, &stylesheet)
        .await
        .with_context(|| format!("write stylesheet: {}", path.display()))?;

    tracing::info!(
        url = %source_url,
        sheets = bodies.len(),
        bytes = stylesheet.len(),
        "stylesheet extracted"
    );

    Ok(PUBLIC_URL)
}
