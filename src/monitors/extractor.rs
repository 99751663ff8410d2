use scraper::{Html, Selector};

#[derive(Debug, thiserror::Error)]
#[error("invalid selector `{selector}`: {details}")]
pub struct InvalidSelector {
    pub selector: String,
    pub details: String,
}

pub fn parse_selector(selector: &str) -> Result<Selector, InvalidSelector> {
    Selector::parse(selector).map_err(|e| InvalidSelector {
        selector: selector.to_string(),
        details: format!("{:?}", e),
    })
}

/// Inner HTML of the first element matching `selector`.
///
/// Malformed markup is parsed with the usual HTML error recovery, so this
/// never fails; `None` only means nothing matched.
pub fn extract_fragment(html: &str, selector: &Selector) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(selector)
        .next()
        .map(|element| element.inner_html())
}
