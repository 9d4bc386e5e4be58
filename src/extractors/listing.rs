use super::markup::first_text;
use super::{Extractor, ParsingContext};
use crate::error::ExtractionError;
use crate::model::RecipeSummary;
use crate::urls;
use log::debug;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use url::Url;

static DAILY_CARD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.ds-recipe-card__link").expect("Invalid card selector"));

static SEARCH_CARD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.ds-recipe-card").expect("Invalid card selector"));

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("Invalid link selector"));

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".ds-recipe-card__title, h2, h3").expect("Invalid title selector")
});

static IMAGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("amp-img[src], img[src]").expect("Invalid image selector"));

static RATING_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".ds-rating-avg").expect("Invalid rating selector"));

static RATING_COUNT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".ds-rating-count").expect("Invalid rating selector"));

static PREP_TIME_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".recipe-preptime, .ds-recipe-card__prep-time")
        .expect("Invalid preparation time selector")
});

/// Which listing page the cards come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    /// Daily recommendation page: every card is itself a link
    Daily,
    /// Search result page: cards wrap their link
    Search,
}

/// One card of a listing: a summary, or why the card could not be read
pub type ListingEntry = Result<RecipeSummary, ExtractionError>;

/// Reads recipe cards (link, title and headline data) from a listing page.
///
/// Cards that link somewhere other than a recipe on the same site (ads,
/// magazine articles) are skipped.
pub struct ListingExtractor {
    pub kind: ListingKind,
}

impl ListingExtractor {
    pub fn new(kind: ListingKind) -> Self {
        Self { kind }
    }

    fn card_link<'a>(&self, card: ElementRef<'a>) -> Option<&'a str> {
        match self.kind {
            ListingKind::Daily => card.value().attr("href"),
            ListingKind::Search => card
                .select(&LINK_SELECTOR)
                .next()
                .and_then(|link| link.value().attr("href")),
        }
    }

    fn read_card(&self, base: &Url, card: ElementRef<'_>, position: usize) -> Option<ListingEntry> {
        let Some(href) = self.card_link(card) else {
            return Some(Err(ExtractionError::IncompleteSummary {
                position,
                missing: vec!["link"],
            }));
        };
        let url = match base.join(href.trim()) {
            Ok(url) if urls::is_recipe_url(base, &url) => url,
            _ => {
                debug!("ListingExtractor: skipping non-recipe link {}", href);
                return None;
            }
        };

        let title = first_text(card, &TITLE_SELECTOR)
            .or_else(|| card.value().attr("title").map(str::to_string))
            .or_else(|| {
                let text = super::element_text(card);
                (!text.is_empty()).then_some(text)
            });
        let Some(title) = title else {
            return Some(Err(ExtractionError::IncompleteSummary {
                position,
                missing: vec!["title"],
            }));
        };

        Some(Ok(RecipeSummary {
            id: urls::recipe_id(&url),
            url: url.to_string(),
            title,
            image: card
                .select(&IMAGE_SELECTOR)
                .find_map(|img| img.value().attr("src"))
                .map(str::to_string),
            rating: first_text(card, &RATING_SELECTOR)
                .and_then(|text| leading_number(&text))
                .map(|rating| rating.clamp(0.0, 5.0)),
            rating_count: first_text(card, &RATING_COUNT_SELECTOR).and_then(|text| {
                let digits: String = text.chars().filter(char::is_ascii_digit).collect();
                digits.parse().ok()
            }),
            preparation_time: first_text(card, &PREP_TIME_SELECTOR),
        }))
    }
}

fn leading_number(text: &str) -> Option<f64> {
    let number: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    number.replace(',', ".").parse().ok()
}

impl Extractor for ListingExtractor {
    type Output = Vec<ListingEntry>;

    fn extract(&self, context: &ParsingContext) -> Result<Vec<ListingEntry>, ExtractionError> {
        // The listing URL is ours, so a parse failure means no card can be resolved
        let Ok(base) = Url::parse(&context.url) else {
            return Ok(vec![]);
        };
        let selector: &Selector = match self.kind {
            ListingKind::Daily => &DAILY_CARD_SELECTOR,
            ListingKind::Search => &SEARCH_CARD_SELECTOR,
        };

        let entries: Vec<ListingEntry> = context
            .document
            .select(selector)
            .enumerate()
            .filter_map(|(position, card)| self.read_card(&base, card, position))
            .collect();
        debug!(
            "ListingExtractor: {} card(s) on {}",
            entries.len(),
            context.url
        );
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_URL: &str = "https://www.chefkoch.de/rs/s0/Kuchen/Rezepte.html";

    fn extract(kind: ListingKind, body: &str) -> Vec<ListingEntry> {
        let context = ParsingContext::new(LISTING_URL, &format!("<html><body>{body}</body></html>"));
        ListingExtractor::new(kind).extract(&context).unwrap()
    }

    #[test]
    fn test_search_cards() {
        let entries = extract(
            ListingKind::Search,
            r#"
            <div class="ds-recipe-card">
                <a href="https://www.chefkoch.de/rezepte/111/Zupfkuchen.html">
                    <amp-img src="https://img.chefkoch-cdn.de/111.jpg"></amp-img>
                    <h2 class="ds-recipe-card__title">Zupfkuchen</h2>
                    <span class="ds-rating-avg"><strong>4.7</strong></span>
                    <span class="ds-rating-count">(1.234)</span>
                    <span class="recipe-preptime">30 Min.</span>
                </a>
            </div>
            <div class="ds-recipe-card">
                <a href="/rezepte/222/Apfelkuchen.html"><h2>Apfelkuchen</h2></a>
            </div>
            "#,
        );

        assert_eq!(entries.len(), 2);
        let first = entries[0].as_ref().unwrap();
        assert_eq!(first.url, "https://www.chefkoch.de/rezepte/111/Zupfkuchen.html");
        assert_eq!(first.id.as_deref(), Some("111"));
        assert_eq!(first.title, "Zupfkuchen");
        assert_eq!(first.image.as_deref(), Some("https://img.chefkoch-cdn.de/111.jpg"));
        assert_eq!(first.rating, Some(4.7));
        assert_eq!(first.rating_count, Some(1234));
        assert_eq!(first.preparation_time.as_deref(), Some("30 Min."));

        let second = entries[1].as_ref().unwrap();
        assert_eq!(second.url, "https://www.chefkoch.de/rezepte/222/Apfelkuchen.html");
        assert_eq!(second.rating, None);
    }

    #[test]
    fn test_card_without_link_is_reported() {
        let entries = extract(
            ListingKind::Search,
            r#"<div class="ds-recipe-card"><h2>Ohne Link</h2></div>"#,
        );
        assert_eq!(
            entries,
            vec![Err(ExtractionError::IncompleteSummary {
                position: 0,
                missing: vec!["link"]
            })]
        );
    }

    #[test]
    fn test_daily_cards_skip_foreign_links() {
        let entries = extract(
            ListingKind::Daily,
            r#"
            <a class="ds-recipe-card__link" href="https://www.chefkoch.de/rezepte/333/Gulasch.html" title="Gulasch">
                <span>Gulasch</span>
            </a>
            <a class="ds-recipe-card__link" href="https://www.chefkoch.de/magazin/artikel/1.html">Magazin</a>
            <a class="ds-recipe-card__link" href="https://ads.example.com/rezepte/1/X.html">Anzeige</a>
            "#,
        );

        assert_eq!(entries.len(), 1);
        let summary = entries[0].as_ref().unwrap();
        assert_eq!(summary.title, "Gulasch");
        assert_eq!(summary.id.as_deref(), Some("333"));
    }
}
