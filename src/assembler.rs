use crate::duration::parse_duration;
use crate::error::ExtractionError;
use crate::extractors::{
    Extractor, JsonLdExtractor, MarkupExtractor, MarkupRecipe, ParsingContext, RawNumber,
    StructuredRecipe,
};
use crate::model::{Difficulty, Recipe};
use crate::urls;
use chrono::NaiveDate;
use indexmap::IndexMap;
use log::debug;
use std::time::Duration;
use url::Url;

/// Tokens ending in a period that do not end a sentence
const ABBREVIATIONS: &[&str] = &[
    "ca.", "min.", "mind.", "max.", "ggf.", "ggfs.", "evtl.", "bzw.", "usw.", "etc.", "z.b.",
    "o.ä.", "u.u.", "d.h.", "msp.", "pck.", "el.", "tl.", "gr.", "std.", "stk.", "inkl.", "zzgl.",
    "vgl.", "bspw.", "lt.", "tk.", "nr.",
];

/// Abbreviations written as two spaced tokens, like "z. B."
const SPACED_ABBREVIATIONS: &[(&str, &str)] = &[
    ("z.", "b."),
    ("o.", "ä."),
    ("u.", "u."),
    ("u.", "a."),
    ("v.", "a."),
    ("n.", "b."),
    ("d.", "h."),
];

/// Builds validated recipes from fetched pages.
///
/// Structured data wins; markup only fills the gaps it leaves.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecipeAssembler;

impl RecipeAssembler {
    pub fn assemble_html(&self, url: &str, html: &str) -> Result<Recipe, ExtractionError> {
        self.assemble(&ParsingContext::new(url, html))
    }

    pub fn assemble(&self, context: &ParsingContext) -> Result<Recipe, ExtractionError> {
        let structured = JsonLdExtractor.extract(context).map_err(|err| match err {
            ExtractionError::MalformedStructuredData { missing, .. } if !missing.is_empty() => {
                ExtractionError::RecipeAssembly {
                    url: context.url.clone(),
                    missing,
                }
            }
            other => other,
        })?;
        let markup = MarkupExtractor.extract(context)?;

        self.merge(&context.url, structured, markup)
    }

    fn merge(
        &self,
        url: &str,
        structured: StructuredRecipe,
        markup: MarkupRecipe,
    ) -> Result<Recipe, ExtractionError> {
        let page_url = Url::parse(url).ok();
        let resolve = |link: &str| match &page_url {
            Some(base) => base.join(link).map_or_else(|_| link.to_string(), String::from),
            None => link.to_string(),
        };

        let title = if structured.title.is_empty() {
            markup.title.clone().unwrap_or_default()
        } else {
            structured.title.clone()
        };

        // Markup's main image only counts when structured data has none
        let markup_image = markup.image.iter().filter(|_| structured.images.is_empty());
        let mut images: Vec<String> = Vec::new();
        for image in structured
            .images
            .iter()
            .chain(markup_image)
            .chain(markup.gallery.iter())
        {
            let image = resolve(image);
            if !images.contains(&image) {
                images.push(image);
            }
        }

        let mut missing = Vec::new();
        if title.is_empty() {
            missing.push("title");
        }
        if images.is_empty() {
            missing.push("image");
        }
        if structured.ingredients.is_empty() {
            missing.push("ingredients");
        }
        if !missing.is_empty() {
            return Err(ExtractionError::RecipeAssembly {
                url: url.to_string(),
                missing,
            });
        }

        let image = images.remove(0);
        let nutrition = if structured.nutrition.is_empty() {
            markup.nutrition.clone()
        } else {
            structured.nutrition.clone()
        };

        Ok(Recipe {
            url: url.to_string(),
            id: page_url.as_ref().and_then(urls::recipe_id),
            title,
            description: structured.description.unwrap_or_default(),
            prep_time: duration_field("prepTime", structured.prep_time.as_deref()),
            cook_time: duration_field("cookTime", structured.cook_time.as_deref()),
            total_time: duration_field("totalTime", structured.total_time.as_deref()),
            ingredients: structured.ingredients,
            instructions: structured
                .instructions
                .iter()
                .flat_map(|text| split_steps(text))
                .collect(),
            image,
            images,
            difficulty: markup
                .difficulty
                .as_deref()
                .map_or(Difficulty::Unknown, Difficulty::from_label),
            publisher: structured.publisher,
            author: structured.author.or_else(|| markup.author.clone()),
            rating: structured
                .rating_value
                .as_ref()
                .and_then(RawNumber::as_f64)
                .filter(|rating| !rating.is_nan())
                .map(|rating| rating.clamp(0.0, 5.0)),
            rating_count: count(structured.rating_count.as_ref()),
            review_count: count(structured.review_count.as_ref()),
            calories: calories(&nutrition),
            keywords: structured.keywords,
            category: structured
                .category
                .or_else(|| markup.category().map(str::to_string)),
            date_published: structured.date_published.as_deref().and_then(parse_date),
            portions: structured
                .recipe_yield
                .as_deref()
                .and_then(leading_integer)
                .or(markup.portions)
                .filter(|portions| *portions > 0)
                .unwrap_or(1),
            nutrition,
        })
    }
}

fn duration_field(field: &str, value: Option<&str>) -> Option<Duration> {
    let value = value?;
    match parse_duration(value) {
        Ok(duration) => Some(duration),
        Err(e) => {
            debug!("Treating {} as unknown: {}", field, e);
            None
        }
    }
}

fn count(value: Option<&RawNumber>) -> u32 {
    value
        .and_then(RawNumber::as_f64)
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map_or(0, |n| n.round().min(f64::from(u32::MAX)) as u32)
}

fn calories(nutrition: &IndexMap<String, String>) -> Option<String> {
    nutrition
        .get("calories")
        .or_else(|| nutrition.get("kcal"))
        .cloned()
}

/// Calendar date of `2014-04-13` or `2014-04-13T08:15:00+02:00`
fn parse_date(value: &str) -> Option<NaiveDate> {
    let date = value.trim().get(..10)?;
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            debug!("Ignoring publish date {:?}: {}", value, e);
            None
        }
    }
}

fn leading_integer(text: &str) -> Option<u32> {
    let digits: String = text
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Split an instruction text into steps at sentence ends and line breaks.
pub fn split_steps(text: &str) -> Vec<String> {
    let mut steps = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();

    let mut flush = |current: &mut String| {
        let step = current.trim();
        if !step.is_empty() {
            steps.push(step.to_string());
        }
        current.clear();
    };

    for (i, &c) in chars.iter().enumerate() {
        if c == '\n' || c == '\r' {
            flush(&mut current);
            continue;
        }
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let at_gap = chars.get(i + 1).map_or(true, |next| next.is_whitespace());
            let following: String = chars[i + 1..].iter().take(16).collect();
            if at_gap && !(c == '.' && ends_with_abbreviation(&current, &following)) {
                flush(&mut current);
            }
        }
    }
    flush(&mut current);

    steps
}

fn ends_with_abbreviation(text: &str, following: &str) -> bool {
    let mut tokens = text.split_whitespace().rev().map(normalize_token);
    let Some(token) = tokens.next() else {
        return false;
    };
    if ABBREVIATIONS.contains(&token.as_str()) {
        return true;
    }
    let previous = tokens.next();
    let next = following.split_whitespace().next().map(normalize_token);
    SPACED_ABBREVIATIONS.iter().any(|&(first, second)| {
        (token == second && previous.as_deref() == Some(first))
            || (token == first && next.as_deref() == Some(second))
    })
}

fn normalize_token(token: &str) -> String {
    token
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(json_ld: &str, body: &str) -> String {
        format!(
            r#"<html><head><script type="application/ld+json">{json_ld}</script></head><body>{body}</body></html>"#
        )
    }

    const URL: &str = "https://www.chefkoch.de/rezepte/745721177147257/Gulasch.html";

    #[test]
    fn test_split_steps() {
        let steps = split_steps(
            "Zwiebeln ca. 5 Min. anbraten. Mit 1.5 l Brühe ablöschen, z. B. Gemüsebrühe! \
             Fertig?\n\nGgf. nachwürzen.",
        );
        assert_eq!(
            steps,
            vec![
                "Zwiebeln ca. 5 Min. anbraten.",
                "Mit 1.5 l Brühe ablöschen, z. B. Gemüsebrühe!",
                "Fertig?",
                "Ggf. nachwürzen.",
            ]
        );
    }

    #[test]
    fn test_split_steps_after_units() {
        assert_eq!(
            split_steps("Den Ofen auf 200 °C. Kartoffeln schälen."),
            vec!["Den Ofen auf 200 °C.", "Kartoffeln schälen."]
        );
        assert_eq!(
            split_steps("Dazu kommen 100 g. Danach 2 l. Umrühren, u. a. mit Zucker."),
            vec!["Dazu kommen 100 g.", "Danach 2 l.", "Umrühren, u. a. mit Zucker."]
        );
        // A lone "z." is not half of "z. B."
        assert_eq!(split_steps("Bis Stufe z. Dann ruhen."), vec!["Bis Stufe z.", "Dann ruhen."]);
    }

    #[test]
    fn test_split_steps_drops_empty_segments() {
        assert_eq!(split_steps("  . \n\n  "), vec!["."]);
        assert!(split_steps("   \n ").is_empty());
        assert_eq!(split_steps("Ohne Punkt am Ende"), vec!["Ohne Punkt am Ende"]);
    }

    #[test]
    fn test_markup_fills_gaps_only() {
        let json_ld = r#"{
            "@type": "Recipe",
            "name": "Gulasch",
            "image": "https://img.chefkoch-cdn.de/gulasch.jpg",
            "recipeIngredient": ["1 kg Rindfleisch"],
            "recipeInstructions": "Fleisch anbraten. Schmoren lassen.",
            "recipeCategory": "Hauptspeise",
            "prepTime": "P0DT0H30M",
            "cookTime": "kaputt",
            "aggregateRating": {"ratingValue": "7,5", "ratingCount": -3},
            "datePublished": "2009-11-02T10:00:00+01:00"
        }"#;
        let body = r#"
            <h1>Anderer Titel</h1>
            <nav class="ds-breadcrumb"><a href="/">Rezepte</a><a href="/x">Fleisch</a></nav>
            <span class="recipe-difficulty">pfiffig</span>
            <a class="bi-profile" href="/u"><span>Gulaschkönig</span></a>
            <div class="recipe-images"><amp-img src="/bilder/2.jpg"></amp-img></div>
        "#;

        let recipe = RecipeAssembler.assemble_html(URL, &page(json_ld, body)).unwrap();

        assert_eq!(recipe.id.as_deref(), Some("745721177147257"));
        assert_eq!(recipe.title, "Gulasch");
        assert_eq!(recipe.category.as_deref(), Some("Hauptspeise"));
        assert_eq!(recipe.author.as_deref(), Some("Gulaschkönig"));
        assert_eq!(recipe.difficulty, Difficulty::Advanced);
        assert_eq!(recipe.image, "https://img.chefkoch-cdn.de/gulasch.jpg");
        assert_eq!(recipe.images, vec!["https://www.chefkoch.de/bilder/2.jpg"]);
        assert_eq!(recipe.prep_time, Some(Duration::from_secs(30 * 60)));
        assert_eq!(recipe.cook_time, None);
        assert_eq!(recipe.rating, Some(5.0));
        assert_eq!(recipe.rating_count, 0);
        assert_eq!(recipe.date_published, NaiveDate::from_ymd_opt(2009, 11, 2));
        assert_eq!(recipe.instructions, vec!["Fleisch anbraten.", "Schmoren lassen."]);
        assert_eq!(recipe.portions, 1);
    }

    #[test]
    fn test_odd_optional_values_do_not_fail_assembly() {
        let json_ld = r#"{
            "@type": "Recipe",
            "name": "Kartoffelsalat",
            "image": "https://img.chefkoch-cdn.de/salat.jpg",
            "recipeIngredient": ["1 kg Kartoffeln"],
            "recipeYield": [4, "4 Portionen"],
            "prepTime": 30
        }"#;

        let recipe = RecipeAssembler.assemble_html(URL, &page(json_ld, "")).unwrap();
        assert_eq!(recipe.title, "Kartoffelsalat");
        assert_eq!(recipe.prep_time, None);
        assert_eq!(recipe.portions, 4);
    }

    #[test]
    fn test_missing_structured_data_is_reported() {
        let html = "<html><body><h1>Kein Rezept</h1></body></html>";
        assert_eq!(
            RecipeAssembler.assemble_html(URL, html),
            Err(ExtractionError::NoStructuredData { found: 0 })
        );
    }

    #[test]
    fn test_empty_title_and_images_fail_assembly() {
        let json_ld = r#"{"@type": "Recipe", "name": " ", "image": [], "recipeIngredient": ["1 Ei"]}"#;
        assert_eq!(
            RecipeAssembler.assemble_html(URL, &page(json_ld, "")),
            Err(ExtractionError::RecipeAssembly {
                url: URL.to_string(),
                missing: vec!["title", "image"],
            })
        );
    }

    #[test]
    fn test_markup_image_used_when_structured_has_none() {
        let json_ld = r#"{"@type": "Recipe", "name": "Brot", "image": [], "recipeIngredient": ["500 g Mehl"], "recipeYield": "1 Laib"}"#;
        let body = r#"<article class="recipe-header"><amp-img src="https://img.chefkoch-cdn.de/brot.jpg"></amp-img></article>"#;

        let recipe = RecipeAssembler.assemble_html(URL, &page(json_ld, body)).unwrap();
        assert_eq!(recipe.image, "https://img.chefkoch-cdn.de/brot.jpg");
        assert!(recipe.images.is_empty());
        assert_eq!(recipe.portions, 1);
        assert!(recipe.instructions.is_empty());
    }
}
