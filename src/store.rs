use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tokio::fs;
use url::Url;

/// Maps a crawled URL to its output file under `storage_root`, mirroring the
/// URL path. A `page=N` query becomes a `page-N.html` leaf in the directory
/// that would otherwise hold the listing's `index.html`; extensionless paths
/// get an `index.html`; paths already naming a file map as given. Distinct
/// (URL, page) pairs never share a path, and reruns resolve to the same path
/// so writes overwrite instead of duplicating.
pub fn page_output_path(storage_root: &Path, url: &Url) -> PathBuf {
    let mut path = storage_root.to_path_buf();
    for segment in url.path().split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        path = path.join(segment);
    }

    if let Some(page) = pagination_number(url) {
        return path.join(format!("page-{page}.html"));
    }

    let last_segment = url.path().rsplit('/').next().unwrap_or_default();
    if Path::new(last_segment).extension().is_some() {
        return path;
    }

    path.join("index.html")
}

fn pagination_number(url: &Url) -> Option<u32> {
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

pub async fn prepare_page_path(storage_root: &Path, url: &Url) -> anyhow::Result<PathBuf> {
    let path = page_output_path(storage_root, url);
    let dir = path.parent().unwrap_or(storage_root);
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("create output dir: {}", dir.display()))?;
    Ok(path)
}

pub async fn write_page(storage_root: &Path, url: &Url, markup: &str) -> anyhow::Result<PathBuf> {
    let path = prepare_page_path(storage_root, url).await?;
    fs::write(&path, markup)
        .await
        .with_context(|| format!("write page: {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use url::Url;

    use super::{page_output_path, write_page};

    fn map(url: &str) -> PathBuf {
        page_output_path(Path::new("/snap"), &Url::parse(url).unwrap())
    }

    #[test]
    fn listing_maps_to_directory_index() {
        assert_eq!(
            map("https://www.doctolib.fr/osteopathe/paris"),
            Path::new("/snap/osteopathe/paris/index.html")
        );
    }

    #[test]
    fn site_root_maps_to_top_level_index() {
        assert_eq!(map("https://www.doctolib.fr/"), Path::new("/snap/index.html"));
    }

    #[test]
    fn trailing_slash_maps_like_the_bare_path() {
        assert_eq!(
            map("https://www.doctolib.fr/osteopathe/paris/"),
            map("https://www.doctolib.fr/osteopathe/paris")
        );
    }

    #[test]
    fn pagination_maps_to_page_file_beside_the_index() {
        assert_eq!(
            map("https://www.doctolib.fr/osteopathe/paris?page=2"),
            Path::new("/snap/osteopathe/paris/page-2.html")
        );
    }

    #[test]
    fn extensioned_path_maps_as_given() {
        assert_eq!(
            map("https://www.doctolib.fr/assets/search.css"),
            Path::new("/snap/assets/search.css")
        );
    }

    #[test]
    fn non_numeric_page_parameter_maps_to_the_index() {
        assert_eq!(
            map("https://www.doctolib.fr/osteopathe/paris?page=next"),
            Path::new("/snap/osteopathe/paris/index.html")
        );
    }

    #[test]
    fn unrelated_query_parameters_leave_the_path_alone() {
        assert_eq!(
            map("https://www.doctolib.fr/osteopathe/paris?sort=rating"),
            Path::new("/snap/osteopathe/paris/index.html")
        );
    }

    #[test]
    fn distinct_pages_of_one_listing_never_collide() {
        let pages: Vec<_> = (1..=5)
            .map(|page| map(&format!("https://www.doctolib.fr/osteopathe/paris?page={page}")))
            .collect();
        for (i, first) in pages.iter().enumerate() {
            for second in &pages[i + 1..] {
                assert_ne!(first, second);
            }
        }
    }

    #[test]
    fn mapping_is_stable_across_calls() {
        let url = "https://www.doctolib.fr/radiologue/strasbourg?page=3";
        assert_eq!(map(url), map(url));
    }

    #[tokio::test]
    async fn write_page_creates_ancestors_and_overwrites_on_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::parse("https://www.doctolib.fr/osteopathe/paris?page=2").unwrap();

        let path = write_page(dir.path(), &url, "<html>first</html>").await.unwrap();
        assert_eq!(path, dir.path().join("osteopathe/paris/page-2.html"));

        let rewritten = write_page(dir.path(), &url, "<html>second</html>").await.unwrap();
        assert_eq!(rewritten, path);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "<html>second</html>"
        );
    }
}
