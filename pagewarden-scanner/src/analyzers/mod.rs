//! Markup analyzers that ship with the scanner.
//!
//! They read the serialized DOM only, so anything that needs layout or
//! computed styles is approximated from inline `style` attributes.

pub mod accessibility;
pub mod responsive;
pub mod visual;

use scraper::{ElementRef, Selector};

const SNIPPET_LEN: usize = 100;

pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid built-in selector")
}

/// Opening tag of an element, cut to a readable length.
pub(crate) fn snippet(element: &ElementRef) -> String {
    let attrs: String = element
        .value()
        .attrs()
        .map(|(k, v)| format!(" {}=\"{}\"", k, v))
        .collect();
    let tag = format!("<{}{}>", element.value().name(), attrs);
    tag.chars().take(SNIPPET_LEN).collect()
}

/// `(property, value)` pairs of the inline style, lowercased.
pub(crate) fn inline_style(element: &ElementRef) -> Vec<(String, String)> {
    element
        .value()
        .attr("style")
        .map(|style| {
            style
                .split(';')
                .filter_map(|decl| decl.split_once(':'))
                .map(|(prop, value)| {
                    (prop.trim().to_lowercase(), value.trim().to_lowercase())
                })
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn px(value: &str) -> Option<f64> {
    value.strip_suffix("px")?.trim().parse().ok()
}
