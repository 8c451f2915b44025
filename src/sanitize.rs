use anyhow::Context as _;
use lol_html::html_content::ContentType;
use lol_html::{RewriteStrSettings, doc_text, element, rewrite_str, text};
use url::Url;

/// Attributes stripped from every element. Test hooks and design-system
/// bookkeeping carry no meaning in a static snapshot.
const STRIPPED_ATTRIBUTES: [&str; 6] = [
    "data-test",
    "data-test-id",
    "data-props",
    "data-design-system",
    "data-design-system-component",
    "data-icon-name",
];

/// Script type exempt from removal. Structured data keeps search listings
/// interpretable even after every executable script is gone.
const STRUCTURED_DATA_TYPE: &str = "application/ld+json";

#[derive(Debug)]
pub struct SanitizedPage {
    pub markup: String,
    pub next_url: Option<Url>,
}

/// Rewrites one rendered page into its static form: drops scripts (except
/// structured-data blocks) and stylesheet links, strips the attributes in
/// [`STRIPPED_ATTRIBUTES`], appends a link to the shared stylesheet as the
/// last child of `<head>`, and removes whitespace-only text so the output
/// stays compact.
///
/// When the page advertises a `rel="next"` link, its href is resolved against
/// `current_url` and returned as `next_url`, but only while the target's page
/// number stays within `page_ceiling` (`None` means unbounded).
pub fn sanitize(
    markup: &str,
    current_url: &Url,
    stylesheet_url: &str,
    page_ceiling: Option<u32>,
) -> anyhow::Result<SanitizedPage> {
    let mut next_href: Option<String> = None;
    let stylesheet_link = format!(
        r#"<link rel="stylesheet" href="{}">"#,
        html_escape::encode_double_quoted_attribute(stylesheet_url)
    );

    let output = rewrite_str(
        markup,
        RewriteStrSettings {
            document_content_handlers: vec![doc_text!(|chunk| {
                if chunk.as_str().trim().is_empty() {
                    chunk.remove();
                }
                Ok(())
            })],
            element_content_handlers: vec![
                element!("script", |el| {
                    if el.get_attribute("type").as_deref() != Some(STRUCTURED_DATA_TYPE) {
                        el.remove();
                    }
                    Ok(())
                }),
                element!("link[rel=\"stylesheet\"]", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("*", |el| {
                    for attribute in STRIPPED_ATTRIBUTES {
                        el.remove_attribute(attribute);
                    }
                    Ok(())
                }),
                element!("head", |el| {
                    el.append(&stylesheet_link, ContentType::Html);
                    Ok(())
                }),
                element!("link[rel=\"next\"]", |el| {
                    if next_href.is_none() {
                        next_href = el.get_attribute("href");
                    }
                    Ok(())
                }),
                text!("*", |chunk| {
                    if chunk.as_str().trim().is_empty() {
                        chunk.remove();
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .context("rewrite page markup")?;

    let next_url = next_href
        .as_deref()
        .and_then(|href| next_page_url(current_url, href, page_ceiling));

    Ok(SanitizedPage {
        markup: output,
        next_url,
    })
}

fn next_page_url(current_url: &Url, href: &str, page_ceiling: Option<u32>) -> Option<Url> {
    let resolved = current_url.join(href).ok()?;
    let page = page_number(&resolved)?;
    match page_ceiling {
        Some(ceiling) if page > ceiling => None,
        _ => Some(resolved),
    }
}

/// Page number a URL points at: its `page` query parameter when present and
/// numeric, `1` when absent. Present but non-numeric yields `None`, which
/// stops pagination rather than following a link we cannot order.
fn page_number(url: &Url) -> Option<u32> {
    match url.query_pairs().find(|(key, _)| key == "page") {
        Some((_, value)) => value.parse().ok(),
        None => Some(1),
    }
}
