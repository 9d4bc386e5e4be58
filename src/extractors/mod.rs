use crate::error::ExtractionError;
use scraper::Html;

mod json_ld;
mod listing;
mod markup;

pub use json_ld::{JsonLdExtractor, RawNumber, StructuredRecipe};
pub use listing::{ListingEntry, ListingExtractor, ListingKind};
pub use markup::{MarkupExtractor, MarkupRecipe};

/// A fetched page, parsed once and shared by every extractor
pub struct ParsingContext {
    pub url: String,
    pub document: Html,
}

impl ParsingContext {
    pub fn new(url: impl Into<String>, html: &str) -> Self {
        Self {
            url: url.into(),
            document: Html::parse_document(html),
        }
    }
}

pub trait Extractor {
    type Output;

    fn extract(&self, context: &ParsingContext) -> Result<Self::Output, ExtractionError>;
}

/// Whitespace-normalized text content of an element
pub(crate) fn element_text(element: scraper::ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
