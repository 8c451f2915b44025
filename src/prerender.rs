use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context as _;
use tokio::fs;

use crate::characters::{self, CHARACTER_IDS, CharacterApi, PrefetchCache};
use crate::cli::PrerenderArgs;

pub async fn run(args: PrerenderArgs) -> anyhow::Result<()> {
    let api = CharacterApi::from_env()?;
    let mut cache = PrefetchCache::new();
    characters::prefetch(&api, &CHARACTER_IDS, &mut cache).await;
    tracing::info!(characters = cache.len(), "prefetch complete");

    let out_dir = Path::new(&args.out);
    reset_output_dir(out_dir).await?;

    for id in CHARACTER_IDS {
        let markup = render_character(&cache, id);
        let path = out_dir.join(format!("character-{id}.html"));
        fs::write(&path, &markup)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        tracing::info!(id, path = %path.display(), "character page written");
    }
    Ok(())
}

/// Renders one character page body. Ids missing from the cache get a
/// placeholder heading instead of aborting the batch.
pub fn render_character(cache: &PrefetchCache, id: u32) -> String {
    match cache.get(id) {
        Some(character) => format!(
            "<section class=\"character\"><h2>{}</h2><p>Born {}</p><hr/></section>",
            html_escape::encode_text(&character.name),
            html_escape::encode_text(&character.birth_year),
        ),
        None => format!("<section class=\"character\"><h2>Character #{id}</h2><hr/></section>"),
    }
}

/// Clears leftovers from earlier runs so the directory holds exactly the
/// pages of this run.
async fn reset_output_dir(out_dir: &Path) -> anyhow::Result<()> {
    match fs::remove_dir_all(out_dir).await {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("clear output directory {}", out_dir.display()));
        }
    }
    fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("create output directory {}", out_dir.display()))
}
