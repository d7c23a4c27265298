//! HTML cleanup and markdown extraction
//!
//! Turns a fetched HTML document into the markdown returned to clients:
//! - Drops non-content elements (scripts, styles, document head)
//! - Optionally drops overlays such as modals and cookie banners
//! - Collects iframe sources so the engine can inline them
//! - Converts the remaining HTML to markdown and filters short paragraphs

use scraper::{Html, Selector};
use url::Url;

/// Elements that never carry page content
const NON_CONTENT_SELECTORS: &[&str] = &["head", "script", "style", "noscript", "template"];

/// Popups, modals and consent banners
const OVERLAY_SELECTORS: &[&str] = &[
    "dialog",
    "[role='dialog']",
    "[role='alertdialog']",
    "[aria-modal='true']",
    ".modal",
    ".popup",
    ".overlay",
    ".cookie-banner",
    "#cookie-banner",
    "[class*='cookie-consent']",
    "[id*='cookie-consent']",
    ".newsletter-popup",
];

/// Content extracted from one HTML document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Filtered markdown rendering of the page body
    pub markdown: String,

    /// Absolute iframe sources found in the page
    pub iframe_sources: Vec<Url>,
}

/// Extracts markdown from an HTML document
///
/// # Arguments
///
/// * `html` - The HTML content to convert
/// * `base_url` - The base URL for resolving iframe sources
/// * `remove_overlays` - Whether to drop modal/popup elements first
/// * `word_count_threshold` - Minimum words for a paragraph to be kept
///
/// # Returns
///
/// * `Ok(ExtractedPage)` - Successfully converted page
/// * `Err(String)` - Markdown conversion failed
///
/// # Example
///
/// ```
/// use crawl_relay::engine::extract_page;
/// use url::Url;
///
/// let html = "<html><head><title>T</title></head><body><h1>Hello</h1></body></html>";
/// let base = Url::parse("https://example.com/").unwrap();
/// let page = extract_page(html, &base, true, 0).unwrap();
/// assert_eq!(page.title.as_deref(), Some("T"));
/// assert!(page.markdown.contains("Hello"));
/// ```
pub fn extract_page(
    html: &str,
    base_url: &Url,
    remove_overlays: bool,
    word_count_threshold: usize,
) -> Result<ExtractedPage, String> {
    let mut document = Html::parse_document(html);

    let title = extract_title(&document);
    let iframe_sources = extract_iframe_sources(&document, base_url);

    remove_matching(&mut document, NON_CONTENT_SELECTORS);
    if remove_overlays {
        remove_matching(&mut document, OVERLAY_SELECTORS);
    }

    let markdown = htmd::convert(&document.html()).map_err(|e| e.to_string())?;
    let markdown = filter_blocks(&markdown, word_count_threshold);

    Ok(ExtractedPage {
        title,
        markdown,
        iframe_sources,
    })
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_iframe_sources(document: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(selector) = Selector::parse("iframe[src]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("src"))
        .filter_map(|src| base_url.join(src.trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .collect()
}

/// Detaches every element matching any of `selectors` from the tree
fn remove_matching(document: &mut Html, selectors: &[&str]) {
    let mut ids = Vec::new();
    for raw in selectors {
        match Selector::parse(raw) {
            Ok(selector) => ids.extend(document.select(&selector).map(|element| element.id())),
            Err(e) => tracing::warn!("Skipping invalid selector {}: {:?}", raw, e),
        }
    }

    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Drops plain paragraphs shorter than `threshold` words
///
/// Headings, list items, tables, quotes, images and fenced code blocks are
/// always kept. A threshold of zero keeps everything.
pub fn filter_blocks(markdown: &str, threshold: usize) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }

        if line.trim().is_empty() && !in_fence {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
            continue;
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }

    blocks
        .into_iter()
        .filter(|block| threshold == 0 || is_structural(block) || word_count(block) >= threshold)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn is_structural(block: &str) -> bool {
    let first = block.trim_start();
    first.starts_with('#')
        || first.starts_with("```")
        || first.starts_with("~~~")
        || first.starts_with('|')
        || first.starts_with('>')
        || first.starts_with("![")
        || first.starts_with("- ")
        || first.starts_with("* ")
        || first.starts_with("+ ")
        || is_ordered_item(first)
        || is_setext_heading(block)
}

fn is_setext_heading(block: &str) -> bool {
    block.lines().nth(1).is_some_and(|underline| {
        let underline = underline.trim();
        !underline.is_empty() && (underline.chars().all(|c| c == '=') || underline.chars().all(|c| c == '-'))
    })
}

fn is_ordered_item(line: &str) -> bool {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && line[digits..].starts_with(". ")
}

fn word_count(block: &str) -> usize {
    block.split_whitespace().count()
}
