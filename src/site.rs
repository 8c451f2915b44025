use anyhow::Context as _;
use url::Url;

use crate::browser::Viewport;

/// Identifies the tool in request headers so crawls are attributable.
pub const USER_AGENT: &str = concat!("sitesnap/", env!("CARGO_PKG_VERSION"));

/// Window size every worker page renders at. Listing layouts reflow per
/// breakpoint, so captures must all use the same one.
pub const VIEWPORT: Viewport = Viewport {
    width: 1024,
    height: 768,
};

const BASE_URL: &str = "https://www.doctolib.fr";

const SPECIALTIES: [&str; 9] = [
    "osteopathe",
    "radiologue",
    "orthophoniste",
    "psychiatre",
    "psychologue",
    "anesthesiste",
    "cardiologue",
    "chirurgien",
    "chirurgien-plastique",
];

const PLACES: [&str; 2] = ["paris", "strasbourg"];

/// Every (specialty, place) search listing the snapshot starts from.
/// Pagination discovered on these pages is followed by the worker that
/// owns the seed, not re-seeded here.
pub fn seed_urls() -> anyhow::Result<Vec<Url>> {
    let mut seeds = Vec::with_capacity(SPECIALTIES.len() * PLACES.len());
    for specialty in SPECIALTIES {
        for place in PLACES {
            let raw = format!("{BASE_URL}/{specialty}/{place}");
            let url = Url::parse(&raw).with_context(|| format!("parse seed url: {raw}"))?;
            seeds.push(url);
        }
    }
    Ok(seeds)
}
