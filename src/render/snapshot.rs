//! Queries over a rendered HTML document.

use std::sync::LazyLock;

use scraper::{Html, Selector};

static SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("valid selector"));
static META_WITH_PROPERTY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[property]").expect("valid selector"));

/// Text of every `<script>` whose text contains `marker`, in document order.
pub fn scripts_containing(html: &str, marker: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&SCRIPT)
        .map(|element| element.text().collect::<String>())
        .filter(|text| text.contains(marker))
        .collect()
}

/// `content` of the first `<meta>` whose `property` attribute contains `property`.
pub fn meta_content(html: &str, property: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&META_WITH_PROPERTY)
        .find(|element| {
            element
                .value()
                .attr("property")
                .is_some_and(|p| p.contains(property))
        })
        .and_then(|element| element.value().attr("content"))
        .map(str::to_string)
}
