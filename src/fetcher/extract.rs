//! Metadata extraction from the document head

use scraper::{ElementRef, Html};

use crate::outcome::Metadata;

/// Prefix of the Open Graph properties that are kept
pub const OPEN_GRAPH_PREFIX: &str = "og:";

/// Extract the title and Open Graph properties from an HTML document.
///
/// Only direct element children of `<head>` are inspected; anything in the
/// body or nested deeper is ignored. Later duplicates overwrite earlier ones.
pub fn extract_metadata(html: &str) -> Metadata {
    let document = Html::parse_document(html);
    let mut metadata = Metadata::default();

    let Some(head) = document
        .root_element()
        .children()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "head")
    else {
        return metadata;
    };

    for element in head.children().filter_map(ElementRef::wrap) {
        match element.value().name() {
            "meta" => {
                let Some(property) = attr(&element, "property") else {
                    continue;
                };
                if property.starts_with(OPEN_GRAPH_PREFIX) {
                    let content = attr(&element, "content").unwrap_or_default();
                    metadata.insert(property, content);
                }
            }
            "title" => metadata.insert(Metadata::TITLE, own_text(&element)),
            _ => {}
        }
    }

    metadata
}

fn attr<'a>(element: &ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attrs()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

/// Text nodes directly inside the element, whitespace-normalized
fn own_text(element: &ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .flat_map(|text| text.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}
