//! Extraction of PDF locations and mirror links from HTML.
//!
//! Mirrors answer most lookups with a landing page that embeds the actual
//! PDF, and the mirror listing page is a plain list of links. Both are read
//! through [`Document`], a thin wrapper over `scraper` offering "select by
//! tag/attribute" and "read attribute".
//!
//! Extraction never fails because nothing matched; that is `None` or an
//! empty list. It fails only when the input can't be treated as markup at
//! all.

use scraper::{Html, Selector};

/// A strategy inspects a parsed page and may produce a result
pub type Strategy<T> = fn(&Document) -> Option<T>;

/// Ordered strategies for locating the embedded PDF on a landing page
pub const EMBEDDED_DOCUMENT_STRATEGIES: &[(&str, Strategy<String>)] = &[
    ("iframe", iframe_target),
    ("embed", embed_target),
    ("object", object_target),
];

/// Ordered strategies for recognising a captcha challenge
const CAPTCHA_STRATEGIES: &[(&str, Strategy<()>)] = &[
    ("captcha image", captcha_image),
    ("captcha form", captcha_form),
];

/// Errors raised when a page cannot be read at all
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// The input is not markup
    #[error("Malformed HTML: {0}")]
    Malformed(String),

    /// A selector failed to compile
    #[error("Invalid selector '{0}'")]
    Selector(String),
}

/// A parsed HTML page
pub struct Document {
    html: Html,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document").finish_non_exhaustive()
    }
}

impl Document {
    /// Parse a response body.
    ///
    /// The body is decoded as UTF-8 with invalid sequences replaced, so pages
    /// in a legacy charset still parse. Empty bodies and bodies with no tags
    /// are rejected as malformed. Anything else parses; the HTML parser
    /// recovers from broken nesting and unclosed tags.
    pub fn parse(body: &[u8]) -> Result<Self, ExtractError> {
        Self::parse_str(&String::from_utf8_lossy(body))
    }

    /// Parse markup that is already text
    pub fn parse_str(markup: &str) -> Result<Self, ExtractError> {
        let trimmed = markup.trim();
        if trimmed.is_empty() {
            return Err(ExtractError::Malformed("empty document".to_string()));
        }
        if !trimmed.contains('<') {
            return Err(ExtractError::Malformed("no markup found".to_string()));
        }

        Ok(Self {
            html: Html::parse_document(markup),
        })
    }

    /// Values of `attr` on every element matching `selector`, in document order
    pub fn select_attr(&self, selector: &str, attr: &str) -> Result<Vec<String>, ExtractError> {
        let selector =
            Selector::parse(selector).map_err(|_| ExtractError::Selector(selector.to_string()))?;

        Ok(self
            .html
            .select(&selector)
            .filter_map(|element| element.value().attr(attr))
            .map(|value| value.trim().to_string())
            .collect())
    }

    /// Value of `attr` on the first matching element that carries it
    pub fn first_attr(&self, selector: &str, attr: &str) -> Result<Option<String>, ExtractError> {
        Ok(self
            .select_attr(selector, attr)?
            .into_iter()
            .find(|value| !value.is_empty()))
    }

    /// Whether any element matches `selector`
    pub fn contains(&self, selector: &str) -> Result<bool, ExtractError> {
        let selector =
            Selector::parse(selector).map_err(|_| ExtractError::Selector(selector.to_string()))?;
        Ok(self.html.select(&selector).next().is_some())
    }
}

/// Run strategies in order, returning the first hit
pub fn first_match<T>(document: &Document, strategies: &[(&str, Strategy<T>)]) -> Option<T> {
    strategies.iter().find_map(|(name, strategy)| {
        let found = strategy(document);
        if found.is_some() {
            tracing::trace!("Extraction strategy '{}' matched", name);
        }
        found
    })
}

/// Turn a protocol-relative target (`//host/x.pdf`) into `http://host/x.pdf`
pub fn normalize_target(target: &str) -> String {
    let target = target.trim();
    match target.strip_prefix("//") {
        Some(rest) => format!("http://{}", rest),
        None => target.to_string(),
    }
}

fn iframe_target(document: &Document) -> Option<String> {
    document.first_attr("iframe", "src").ok()?
}

fn embed_target(document: &Document) -> Option<String> {
    document.first_attr("embed", "src").ok()?
}

fn object_target(document: &Document) -> Option<String> {
    document.first_attr("object", "data").ok()?
}

fn captcha_image(document: &Document) -> Option<()> {
    document
        .contains("img#captcha, div#gs_captcha")
        .ok()?
        .then_some(())
}

fn captcha_form(document: &Document) -> Option<()> {
    document
        .contains("form#captcha, input[name='answer'], input[name='captcha']")
        .ok()?
        .then_some(())
}

/// Locate the embedded PDF on a landing page.
///
/// Returns the target of the first inline-frame-like element, with
/// protocol-relative targets given an `http:` scheme.
pub fn embedded_document(body: &[u8]) -> Result<Option<String>, ExtractError> {
    let document = Document::parse(body)?;
    Ok(first_match(&document, EMBEDDED_DOCUMENT_STRATEGIES).map(|target| normalize_target(&target)))
}

/// Collect every link whose target contains `domain_fragment`, in document order
pub fn mirror_candidates(body: &[u8], domain_fragment: &str) -> Result<Vec<String>, ExtractError> {
    let document = Document::parse(body)?;
    Ok(document
        .select_attr("a[href]", "href")?
        .into_iter()
        .filter(|href| href.contains(domain_fragment))
        .collect())
}

/// Whether the page is a captcha challenge rather than content
pub fn is_captcha(body: &[u8]) -> Result<bool, ExtractError> {
    let document = Document::parse(body)?;
    Ok(first_match(&document, CAPTCHA_STRATEGIES).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_document_protocol_relative() {
        let html = br#"<html><body>
            <div id="article"><iframe id="pdf" src="//mirror.example/x.pdf"></iframe></div>
        </body></html>"#;

        assert_eq!(
            embedded_document(html).unwrap(),
            Some("http://mirror.example/x.pdf".to_string())
        );
    }

    #[test]
    fn test_embedded_document_absolute_target_untouched() {
        let html = br#"<iframe src="https://mirror.example/downloads/x.pdf#view=FitH"></iframe>"#;
        assert_eq!(
            embedded_document(html).unwrap(),
            Some("https://mirror.example/downloads/x.pdf#view=FitH".to_string())
        );
    }

    #[test]
    fn test_embedded_document_first_iframe_wins() {
        let html = br#"<iframe src="//a.example/1.pdf"></iframe><iframe src="//b.example/2.pdf"></iframe>"#;
        assert_eq!(
            embedded_document(html).unwrap(),
            Some("http://a.example/1.pdf".to_string())
        );
    }

    #[test]
    fn test_embedded_document_falls_back_to_embed() {
        let html = br#"<html><body><embed type="application/pdf" src="/storage/x.pdf"></body></html>"#;
        assert_eq!(
            embedded_document(html).unwrap(),
            Some("/storage/x.pdf".to_string())
        );
    }

    #[test]
    fn test_embedded_document_no_match_is_not_an_error() {
        let html = b"<html><body><p>article not found</p></body></html>";
        assert_eq!(embedded_document(html).unwrap(), None);
    }

    #[test]
    fn test_malformed_input_is_an_error() {
        assert!(matches!(
            embedded_document(b""),
            Err(ExtractError::Malformed(_))
        ));
        assert!(matches!(
            embedded_document(b"just some words"),
            Err(ExtractError::Malformed(_))
        ));
        assert!(matches!(
            embedded_document(&[0xe9, 0xe8, 0x20, 0xff]),
            Err(ExtractError::Malformed(_))
        ));
    }

    #[test]
    fn test_legacy_charset_page_still_parses() {
        // "Caf\xe9" is Latin-1, not UTF-8
        let html = b"<html><head><title>Caf\xe9</title></head><body><iframe src=\"//mirror.example/x.pdf\"></iframe></body></html>";
        assert_eq!(
            embedded_document(html).unwrap(),
            Some("http://mirror.example/x.pdf".to_string())
        );
    }

    #[test]
    fn test_mirror_candidates_keep_document_order() {
        let html = br#"<html><body><ul>
            <li><a href="https://sci-hub.se">se</a></li>
            <li><a href="https://example.org/about">about</a></li>
            <li><a href="https://sci-hub.st">st</a></li>
            <li><a href="/faq">faq</a></li>
            <li><a>no target</a></li>
            <li><a href="https://sci-hub.ru">ru</a></li>
            <li><a href="https://twitter.com/scihub">twitter</a></li>
        </ul></body></html>"#;

        assert_eq!(
            mirror_candidates(html, "sci-hub.").unwrap(),
            vec!["https://sci-hub.se", "https://sci-hub.st", "https://sci-hub.ru"]
        );
    }

    #[test]
    fn test_mirror_candidates_none_found() {
        let html = b"<html><body><a href='https://example.org'>x</a></body></html>";
        assert!(mirror_candidates(html, "sci-hub.").unwrap().is_empty());
    }

    #[test]
    fn test_is_captcha() {
        let captcha = br#"<html><body><form id="captcha"><img id="captcha" src="/c.jpg"><input name="answer"></form></body></html>"#;
        assert!(is_captcha(captcha).unwrap());

        let plain = b"<html><body><iframe src='//x/y.pdf'></iframe></body></html>";
        assert!(!is_captcha(plain).unwrap());
    }

    #[test]
    fn test_document_select_attr() {
        let doc = Document::parse_str(r#"<a href=" /a ">1</a><a href="/b">2</a>"#).unwrap();
        assert_eq!(doc.select_attr("a", "href").unwrap(), vec!["/a", "/b"]);
        assert!(doc.contains("a[href='/b']").unwrap());
        assert!(matches!(
            doc.select_attr("a[", "href"),
            Err(ExtractError::Selector(_))
        ));
    }

    #[test]
    fn test_normalize_target() {
        assert_eq!(normalize_target("//host/x.pdf"), "http://host/x.pdf");
        assert_eq!(normalize_target(" https://host/x.pdf "), "https://host/x.pdf");
        assert_eq!(normalize_target("/x.pdf"), "/x.pdf");
    }
}
