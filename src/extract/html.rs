//! Text helpers over `scraper` elements
//!
//! Element text is collapsed the way a browser renders it: runs of
//! whitespace become one space, `<br>` counts as whitespace, and the result
//! is trimmed.

use scraper::{ElementRef, Node, Selector};

/// Collapses whitespace runs into single spaces and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of an element and all its descendants
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => raw.push_str(text),
            Node::Element(el) if el.name() == "br" => raw.push(' '),
            _ => {}
        }
    }
    collapse_whitespace(&raw)
}

/// Text of an element's direct text children, ignoring child elements
pub fn own_text(element: ElementRef<'_>) -> String {
    let raw = element
        .children()
        .filter_map(|node| node.value().as_text().map(|text| &**text))
        .collect::<Vec<&str>>()
        .join(" ");
    collapse_whitespace(&raw)
}

/// Turns an empty string into `None`
pub fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Text of the first element matching `selector` under `scope`
pub fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(element_text)
        .and_then(non_empty)
}

/// Trimmed attribute of the first element matching `selector` under `scope`
pub fn first_attr(scope: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    scope
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|value| value.trim().to_string())
        .and_then(non_empty)
}

/// The first `<td>` sibling following a header cell
pub fn next_cell(header: ElementRef<'_>) -> Option<ElementRef<'_>> {
    header
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "td")
}
