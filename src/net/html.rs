//! HTML parsing utilities for scraping-based sources.
//!
//! Thin convenience layer over the `scraper` crate for CSS-selector based
//! extraction, plus a rayon-parallel item parser for large listings.
//!
//! # Examples
//!
//! ```rust
//! use hakken::net::html;
//!
//! let page = html::parse(r#"
//!     <div class="flw-item">
//!         <a class="film-name" href="/anime/cowboy-bebop-27">Cowboy Bebop</a>
//!         <img class="film-poster-img" data-src="/thumbs/bebop.jpg">
//!     </div>
//! "#);
//!
//! let title = html::select_text(&page, ".film-name").unwrap();
//! assert_eq!(title, "Cowboy Bebop");
//! let thumb = html::select_attr(&page, ".film-poster-img", "data-src").unwrap();
//! assert_eq!(thumb, "/thumbs/bebop.jpg");
//! ```

use rayon::prelude::*;
use scraper::{Html, Selector};

/// Parses an HTML document from a string.
pub fn parse(html: &str) -> Html {
    Html::parse_document(html)
}

/// Extracts trimmed text from the first element matching a CSS selector.
///
/// Returns `None` when nothing matches or the selector is invalid.
pub fn select_text(html: &Html, selector: &str) -> Option<String> {
    Selector::parse(selector).ok().and_then(|sel| {
        html.select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
    })
}

/// Extracts an attribute value from the first element matching a selector.
pub fn select_attr(html: &Html, selector: &str, attr: &str) -> Option<String> {
    Selector::parse(selector).ok().and_then(|sel| {
        html.select(&sel)
            .next()
            .and_then(|el| el.value().attr(attr).map(String::from))
    })
}

/// Extracts trimmed text from every element matching a selector.
pub fn select_all_text(html: &Html, selector: &str) -> Vec<String> {
    Selector::parse(selector)
        .ok()
        .map(|sel| {
            html.select(&sel)
                .map(|el| el.text().collect::<String>().trim().to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Extracts an attribute value from every element matching a selector.
///
/// Elements without the attribute are skipped.
pub fn select_all_attr(html: &Html, selector: &str, attr: &str) -> Vec<String> {
    Selector::parse(selector)
        .ok()
        .map(|sel| {
            html.select(&sel)
                .filter_map(|el| el.value().attr(attr).map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Parses repeated container elements into values, in parallel.
///
/// Finds every element matching `selector`, detaches each as an HTML
/// fragment, and runs `parser` over the fragments on the rayon thread pool.
/// Elements the parser rejects (returns `None` for) are dropped; the output
/// preserves document order.
///
/// Useful for search listings where one page carries dozens of item cards
/// and each card needs several selector lookups.
///
/// # Examples
///
/// ```rust
/// use hakken::net::html;
///
/// let page = html::parse(r#"
///     <div class="flw-item"><a class="film-name" href="/anime/a-1">A</a></div>
///     <div class="flw-item"><a class="film-name" href="/anime/b-2">B</a></div>
/// "#);
///
/// let titles = html::parse_items(&page, ".flw-item", |item| {
///     html::select_text(&html::parse(&item.html()), ".film-name")
/// });
/// assert_eq!(titles, vec!["A".to_string(), "B".to_string()]);
/// ```
pub fn parse_items<T, F>(html: &Html, selector: &str, parser: F) -> Vec<T>
where
    T: Send,
    F: Fn(scraper::ElementRef) -> Option<T> + Sync,
{
    Selector::parse(selector)
        .ok()
        .map(|sel| {
            // ElementRef is not Send; detach each match into an owned
            // fragment so rayon can chew on them in parallel.
            let fragments: Vec<String> = html.select(&sel).map(|el| el.html()).collect();

            fragments
                .into_par_iter()
                .filter_map(|fragment| {
                    let doc = Html::parse_fragment(&fragment);
                    parser(doc.root_element())
                })
                .collect()
        })
        .unwrap_or_default()
}
