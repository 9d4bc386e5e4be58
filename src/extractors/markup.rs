use super::{element_text, Extractor, ParsingContext};
use crate::error::ExtractionError;
use indexmap::IndexMap;
use log::debug;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// One attribute and the places it is looked up, most specific first.
///
/// `attr` is `None` when the value is the element's text.
struct Rule {
    selectors: &'static [&'static str],
    attr: Option<&'static str>,
}

const TITLE: Rule = Rule {
    selectors: &["article.recipe-header h1", "h1"],
    attr: None,
};

const IMAGE: Rule = Rule {
    selectors: &[
        "article.recipe-header amp-img[src]",
        "article.recipe-header img[src]",
        "amp-img img[src]",
        "amp-img[src]",
        "meta[property='og:image']",
    ],
    attr: Some("src"),
};

const DIFFICULTY: Rule = Rule {
    selectors: &["span.recipe-difficulty"],
    attr: None,
};

const PORTIONS: Rule = Rule {
    selectors: &[
        ".recipe-servings input[name='portionen']",
        "input[name='portionen']",
    ],
    attr: Some("value"),
};

static GALLERY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.recipe-images amp-img[src], div.recipe-images img[src]")
        .expect("Invalid gallery selector")
});

static BREADCRUMB_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".ds-breadcrumb a, [itemtype*='BreadcrumbList'] a[itemprop='item']")
        .expect("Invalid breadcrumb selector")
});

static AUTHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a.bi-profile span").expect("Invalid author selector")
});

static NUTRITION_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.recipe-nutrition_content").expect("Invalid nutrition selector")
});

/// Reads what the structured data leaves out from the page markup itself.
pub struct MarkupExtractor;

/// Attributes found in the markup. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkupRecipe {
    pub title: Option<String>,
    pub image: Option<String>,
    pub gallery: Vec<String>,
    pub breadcrumb: Vec<String>,
    pub difficulty: Option<String>,
    pub author: Option<String>,
    pub portions: Option<u32>,
    pub nutrition: IndexMap<String, String>,
}

impl MarkupRecipe {
    /// The innermost breadcrumb entry
    pub fn category(&self) -> Option<&str> {
        self.breadcrumb.last().map(String::as_str)
    }
}

impl Rule {
    fn find(&self, document: &Html) -> Option<String> {
        for selector in self.selectors {
            let Ok(selector) = Selector::parse(selector) else {
                continue;
            };
            let found = document.select(&selector).find_map(|element| {
                let value = match self.attr {
                    // og:image keeps its URL in `content`
                    Some(attr) => element
                        .value()
                        .attr(attr)
                        .or_else(|| element.value().attr("content"))
                        .map(|value| value.trim().to_string()),
                    None => Some(element_text(element)),
                };
                value.filter(|value| !value.is_empty())
            });
            if found.is_some() {
                return found;
            }
        }
        None
    }
}

impl MarkupExtractor {
    /// Image URLs of a gallery, from a recipe page or its image overview page
    pub fn gallery(&self, document: &Html) -> Vec<String> {
        let mut images: Vec<String> = Vec::new();
        for element in document.select(&GALLERY_SELECTOR) {
            if let Some(src) = element.value().attr("src").map(str::trim) {
                if !src.is_empty() && !images.iter().any(|known| known == src) {
                    images.push(src.to_string());
                }
            }
        }
        images
    }

    fn breadcrumb(&self, document: &Html) -> Vec<String> {
        let mut crumbs: Vec<String> = Vec::new();
        for element in document.select(&BREADCRUMB_SELECTOR) {
            let text = element_text(element);
            if !text.is_empty() && crumbs.last() != Some(&text) {
                crumbs.push(text);
            }
        }
        crumbs
    }

    fn difficulty(&self, document: &Html) -> Option<String> {
        // The badge reads e.g. "<icon> simpel"; the label is the last word
        DIFFICULTY
            .find(document)
            .and_then(|text| text.split_whitespace().last().map(str::to_string))
    }

    fn author(&self, document: &Html) -> Option<String> {
        document
            .select(&AUTHOR_SELECTOR)
            .map(element_text)
            .filter(|name| !name.is_empty())
            .last()
    }

    fn nutrition(&self, document: &Html) -> IndexMap<String, String> {
        let Some(block) = document.select(&NUTRITION_SELECTOR).next() else {
            return IndexMap::new();
        };
        let texts: Vec<String> = block
            .text()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .collect();
        texts
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect()
    }
}

impl Extractor for MarkupExtractor {
    type Output = MarkupRecipe;

    fn extract(&self, context: &ParsingContext) -> Result<MarkupRecipe, ExtractionError> {
        let document = &context.document;

        let recipe = MarkupRecipe {
            title: TITLE.find(document),
            image: IMAGE.find(document),
            gallery: self.gallery(document),
            breadcrumb: self.breadcrumb(document),
            difficulty: self.difficulty(document),
            author: self.author(document),
            portions: PORTIONS.find(document).and_then(|value| value.parse().ok()),
            nutrition: self.nutrition(document),
        };

        for (field, present) in [
            ("title", recipe.title.is_some()),
            ("image", recipe.image.is_some()),
            ("difficulty", recipe.difficulty.is_some()),
            ("category", !recipe.breadcrumb.is_empty()),
            ("portions", recipe.portions.is_some()),
        ] {
            if !present {
                debug!("MarkupExtractor: no {} in markup of {}", field, context.url);
            }
        }

        Ok(recipe)
    }
}

/// Text of the first element matching `selector` below `root`
pub(crate) fn first_text(root: ElementRef<'_>, selector: &Selector) -> Option<String> {
    root.select(selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}
