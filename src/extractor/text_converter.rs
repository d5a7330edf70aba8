use crate::error::{Result, TextFetchError};
use crate::fetcher::FetchedPage;
use ego_tree::NodeRef;
use scraper::{Html, Node, Selector};

/// Tags whose subtree contributes no visible text.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "head", "iframe", "svg", "object",
];

/// Tags that end a paragraph-level block (separated by a blank line).
const PARAGRAPH_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "table", "ul", "ol", "dl",
    "figure", "section", "article",
];

/// Tags that force a line break without a blank line.
const LINE_TAGS: &[&str] = &[
    "div", "li", "tr", "dt", "dd", "header", "footer", "main", "aside", "nav", "figcaption",
    "form", "hr", "option", "summary", "details",
];

/// Converts fetched markup to plain text.
///
/// HTML bodies are reduced to their visible text with paragraph structure
/// preserved as newline-separated blocks; `text/*` payloads pass through
/// with normalized whitespace; anything else is a conversion failure.
pub struct TextConverter {
    selector: Option<Selector>,
}

impl TextConverter {
    /// Build a converter, optionally scoped to a CSS selector.
    ///
    /// An unparseable selector is a configuration error, caught before any
    /// jobs run.
    pub fn new(selector: Option<&str>) -> Result<Self> {
        let selector = match selector {
            Some(s) => Some(Selector::parse(s).map_err(|e| TextFetchError::Config {
                message: format!("invalid CSS selector {:?}: {}", s, e),
            })?),
            None => None,
        };

        Ok(Self { selector })
    }

    pub fn convert(&self, page: &FetchedPage) -> Result<String> {
        match payload_kind(page) {
            PayloadKind::Html => Ok(self.convert_html(&page.body)),
            PayloadKind::PlainText => Ok(normalize_text(&page.body)),
            PayloadKind::Binary(content_type) => Err(TextFetchError::Conversion {
                url: page.url.clone(),
                message: format!("unsupported content type: {}", content_type),
            }),
        }
    }

    fn convert_html(&self, html: &str) -> String {
        let doc = Html::parse_document(html);

        match &self.selector {
            Some(selector) => {
                // Selector mode: one block of text per matching element,
                // blocks separated by a blank line. No match yields an
                // empty document, which is still a successful extraction.
                let blocks: Vec<String> = doc
                    .select(selector)
                    .map(|element| {
                        let mut text = String::new();
                        collect_text(*element, &mut text);
                        normalize_text(&text)
                    })
                    .filter(|block| !block.is_empty())
                    .collect();

                blocks.join("\n\n")
            }
            None => {
                let body_selector = Selector::parse("body").unwrap();
                let mut text = String::new();

                if let Some(body) = doc.select(&body_selector).next() {
                    collect_text(*body, &mut text);
                } else {
                    collect_text(*doc.root_element(), &mut text);
                }

                normalize_text(&text)
            }
        }
    }
}

enum PayloadKind {
    Html,
    PlainText,
    Binary(String),
}

fn payload_kind(page: &FetchedPage) -> PayloadKind {
    match page.content_type.as_deref() {
        Some(ct) => {
            let ct = ct.to_ascii_lowercase();
            if ct.contains("html") || ct.contains("xml") {
                PayloadKind::Html
            } else if ct.starts_with("text/") || ct.contains("json") {
                PayloadKind::PlainText
            } else {
                PayloadKind::Binary(ct)
            }
        }
        // No content type: sniff. Markup starts with a tag; anything else
        // already decoded as UTF-8, so treat it as plain text.
        None => {
            if page.body.trim_start().starts_with('<') {
                PayloadKind::Html
            } else {
                PayloadKind::PlainText
            }
        }
    }
}

/// Depth-first walk emitting text nodes, with newlines at block boundaries.
fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(&text.text),
        Node::Element(element) => {
            let tag = element.name();

            if SKIP_TAGS.contains(&tag) {
                return;
            }

            if tag == "br" {
                out.push('\n');
                return;
            }

            let break_text = if PARAGRAPH_TAGS.contains(&tag) {
                "\n\n"
            } else if LINE_TAGS.contains(&tag) {
                "\n"
            } else {
                ""
            };

            out.push_str(break_text);
            for child in node.children() {
                collect_text(child, out);
            }
            out.push_str(break_text);
        }
        _ => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
    }
}

/// Collapse intra-line whitespace, drop empty edges, and squeeze runs of
/// blank lines down to a single paragraph separator.
fn normalize_text(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut pending_blank = false;

    for line in raw.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");

        if collapsed.is_empty() {
            if !lines.is_empty() {
                pending_blank = true;
            }
            continue;
        }

        if pending_blank {
            lines.push(String::new());
            pending_blank = false;
        }
        lines.push(collapsed);
    }

    lines.join("\n")
}
