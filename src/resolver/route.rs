//! Where a resolution sends its request.

use crate::config::ArxivConfig;
use crate::models::{classify, is_arxiv, looks_like_doi, strip_arxiv_prefixes, IdentifierClass};

/// Target of a resolution, decided once per identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Straight to the arXiv PDF endpoint, no mirror involved
    Direct { arxiv_id: String, url: String },
    /// Appended to whichever mirror is current at fetch time
    Mirrored {
        class: IdentifierClass,
        identifier: String,
    },
}

impl Route {
    /// Pick the route for `identifier`.
    ///
    /// ArXiv references go direct whatever their class; everything else is
    /// mirror-routed, including URLs that already point at a PDF.
    pub fn for_identifier(identifier: &str, arxiv: &ArxivConfig) -> Self {
        if is_arxiv(identifier) {
            let arxiv_id = strip_arxiv_prefixes(identifier);
            let url = format!("{}/{}.pdf", arxiv.pdf_base.trim_end_matches('/'), arxiv_id);
            return Route::Direct { arxiv_id, url };
        }

        Route::Mirrored {
            class: classify(identifier),
            identifier: identifier.trim().to_string(),
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, Route::Direct { .. })
    }

    /// Mirrored as a DOI without having DOI shape; mirrors will most likely reject it
    pub fn is_doubtful_doi(&self) -> bool {
        matches!(
            self,
            Route::Mirrored { class: IdentifierClass::Doi, identifier } if !looks_like_doi(identifier)
        )
    }

    /// Full request URL for a mirrored route against `base` (ending in `/`)
    pub fn mirrored_url(base: &str, identifier: &str) -> Result<String, url::ParseError> {
        let target = format!("{}{}", base, identifier);
        url::Url::parse(&target)?;
        Ok(target)
    }
}
