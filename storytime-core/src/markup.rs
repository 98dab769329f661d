use scraper::{Html, Node};

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "tr", "td", "h1", "h2", "h3", "h4", "h5", "h6",
    "blockquote", "section", "article", "hr",
];

/// Reduces an HTML fragment to its visible text.
///
/// Entities are decoded, block-level elements become word breaks and runs of
/// whitespace collapse to a single space.
#[must_use]
pub fn plain_text<S: AsRef<str>>(s: S) -> String {
    let s = s.as_ref();
    if !s.contains(['<', '&']) {
        return collapse_whitespace(s);
    }

    let fragment = Html::parse_fragment(s);
    let mut text = String::with_capacity(s.len());

    for node in fragment.root_element().descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(element) if BLOCK_ELEMENTS.contains(&element.name()) => {
                text.push(' ')
            }
            _ => {}
        }
    }

    collapse_whitespace(&text)
}

/// Like [`plain_text`], but maps text that strips down to nothing to `None`.
#[must_use]
pub fn plain_text_opt<S: AsRef<str>>(s: Option<S>) -> Option<String> {
    s.map(plain_text).filter(|text| !text.is_empty())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
