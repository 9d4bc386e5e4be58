use super::{Extractor, ParsingContext};
use crate::error::ExtractionError;
use html_escape::decode_html_entities;
use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use scraper::Selector;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::LazyLock;

static SCRIPT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script[type='application/ld+json']").expect("Invalid JSON-LD selector")
});

/// Spots a recipe block even when its JSON does not parse
static RECIPE_TYPE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"@type"\s*:\s*(?:\[[^\]]*)?"recipe""#).expect("Invalid recipe type regex")
});

/// Keys a recipe block must carry, with the recipe field each one feeds
const REQUIRED_KEYS: &[(&str, &str)] = &[
    ("name", "title"),
    ("image", "image"),
    ("recipeIngredient", "ingredients"),
];

/// Locates the page's single schema.org `Recipe` block.
pub struct JsonLdExtractor;

/// The recipe block projected onto recipe field names.
///
/// Values are decoded but not yet coerced; the assembler owns coercion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredRecipe {
    pub title: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub recipe_yield: Option<String>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub total_time: Option<String>,
    pub rating_value: Option<RawNumber>,
    pub rating_count: Option<RawNumber>,
    pub review_count: Option<RawNumber>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub keywords: Option<String>,
    pub category: Option<String>,
    pub date_published: Option<String>,
    pub nutrition: IndexMap<String, String>,
}

/// A number that some sites publish as a string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawNumber::Number(n) => Some(*n),
            RawNumber::Text(s) => s.trim().replace(',', ".").parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JsonLdRecipe {
    name: String,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<DescriptionType>,
    #[serde(default, deserialize_with = "lenient")]
    image: Option<ImageType>,
    #[serde(rename = "recipeIngredient")]
    recipe_ingredient: Vec<String>,
    #[serde(rename = "recipeInstructions", default, deserialize_with = "lenient")]
    recipe_instructions: Option<RecipeInstructions>,
    #[serde(rename = "recipeYield", default, deserialize_with = "lenient")]
    recipe_yield: Option<RecipeYield>,
    #[serde(rename = "prepTime", default, deserialize_with = "lenient")]
    prep_time: Option<String>,
    #[serde(rename = "cookTime", default, deserialize_with = "lenient")]
    cook_time: Option<String>,
    #[serde(rename = "totalTime", default, deserialize_with = "lenient")]
    total_time: Option<String>,
    #[serde(rename = "aggregateRating", default, deserialize_with = "lenient")]
    aggregate_rating: Option<AggregateRating>,
    #[serde(rename = "recipeCategory", default, deserialize_with = "lenient")]
    recipe_category: Option<StringOrList>,
    #[serde(default, deserialize_with = "lenient")]
    keywords: Option<StringOrList>,
    #[serde(default, deserialize_with = "lenient")]
    author: Option<Author>,
    #[serde(default, deserialize_with = "lenient")]
    publisher: Option<Author>,
    #[serde(rename = "datePublished", default, deserialize_with = "lenient")]
    date_published: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    nutrition: Option<serde_json::Map<String, Value>>,
}

/// Optional fields of an unexpected shape are dropped instead of failing the block
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            debug!("JsonLdExtractor: ignoring optional field: {}", e);
            Ok(None)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImageObject {
    url: String,
}

#[derive(Debug, Deserialize)]
struct TextObject {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DescriptionType {
    String(String),
    Object(TextObject),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImageType {
    String(String),
    Object(ImageObject),
    MultipleStrings(Vec<String>),
    MultipleObjects(Vec<ImageObject>),
}

#[derive(Debug, Deserialize)]
struct RecipeInstructionObject {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeInstructions {
    String(String),
    Multiple(Vec<String>),
    MultipleObject(Vec<RecipeInstructionObject>),
    HowTo(Vec<HowTo>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "@type")]
enum HowTo {
    HowToStep(HowToStep),
    HowToSection(HowToSection),
}

#[derive(Debug, Deserialize)]
struct HowToStep {
    text: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HowToSection {
    #[serde(rename = "itemListElement")]
    item_list_element: Vec<HowToStep>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeYield {
    String(String),
    Number(f64),
    Array(Vec<Value>),
}

#[derive(Debug, Deserialize)]
struct AggregateRating {
    #[serde(rename = "ratingValue", default, deserialize_with = "lenient")]
    rating_value: Option<RawNumber>,
    #[serde(rename = "ratingCount", default, deserialize_with = "lenient")]
    rating_count: Option<RawNumber>,
    #[serde(rename = "reviewCount", default, deserialize_with = "lenient")]
    review_count: Option<RawNumber>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrList {
    String(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Author {
    String(String),
    Object(AuthorObject),
    Multiple(Vec<AuthorObject>),
}

#[derive(Debug, Deserialize)]
struct AuthorObject {
    name: Option<String>,
}

impl StringOrList {
    fn joined(self) -> String {
        match self {
            StringOrList::String(s) => decode_html_symbols(&s),
            StringOrList::Multiple(v) => v
                .iter()
                .map(|s| decode_html_symbols(s))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl Author {
    fn name(self) -> Option<String> {
        let name = match self {
            Author::String(name) => name,
            Author::Object(obj) => obj.name?,
            Author::Multiple(authors) => authors
                .into_iter()
                .filter_map(|a| a.name)
                .collect::<Vec<_>>()
                .join(", "),
        };
        non_empty(decode_html_symbols(&name))
    }
}

impl HowToStep {
    fn into_text(self) -> Option<String> {
        // Prefer text over name
        self.text.or(self.name)
    }
}

impl From<JsonLdRecipe> for StructuredRecipe {
    fn from(recipe: JsonLdRecipe) -> Self {
        let (rating_value, rating_count, review_count) = match recipe.aggregate_rating {
            Some(rating) => (rating.rating_value, rating.rating_count, rating.review_count),
            None => (None, None, None),
        };

        StructuredRecipe {
            title: decode_html_symbols(&recipe.name).trim().to_string(),
            description: recipe
                .description
                .map(|desc| match desc {
                    DescriptionType::String(d) => decode_html_symbols(&d),
                    DescriptionType::Object(d) => decode_html_symbols(&d.text),
                })
                .and_then(non_empty),
            images: recipe.image.map_or(vec![], |img| match img {
                ImageType::String(i) => vec![decode_html_symbols(&i)],
                ImageType::MultipleStrings(imgs) => {
                    imgs.into_iter().map(|i| decode_html_symbols(&i)).collect()
                }
                ImageType::MultipleObjects(imgs) => imgs.into_iter().map(|i| i.url).collect(),
                ImageType::Object(i) => vec![i.url],
            })
            .into_iter()
            .filter(|url| !url.trim().is_empty())
            .collect(),
            ingredients: recipe
                .recipe_ingredient
                .into_iter()
                .map(|ing| decode_html_symbols(&ing).trim().to_string())
                .filter(|ing| !ing.is_empty())
                .collect(),
            instructions: recipe
                .recipe_instructions
                .map_or(vec![], flatten_instructions)
                .into_iter()
                .map(|text| decode_html_symbols(&text))
                .collect(),
            recipe_yield: recipe
                .recipe_yield
                .map(|yield_val| match yield_val {
                    RecipeYield::String(s) => s,
                    RecipeYield::Number(n) => n.to_string(),
                    RecipeYield::Array(arr) => arr
                        .into_iter()
                        .find_map(|item| match item {
                            Value::String(s) if !s.trim().is_empty() => Some(s),
                            Value::Number(n) => Some(n.to_string()),
                            _ => None,
                        })
                        .unwrap_or_default(),
                })
                .and_then(non_empty),
            prep_time: recipe.prep_time.and_then(non_empty),
            cook_time: recipe.cook_time.and_then(non_empty),
            total_time: recipe.total_time.and_then(non_empty),
            rating_value,
            rating_count,
            review_count,
            author: recipe.author.and_then(Author::name),
            publisher: recipe.publisher.and_then(Author::name),
            keywords: recipe.keywords.map(StringOrList::joined).and_then(non_empty),
            category: recipe
                .recipe_category
                .map(StringOrList::joined)
                .and_then(non_empty),
            date_published: recipe.date_published.and_then(non_empty),
            nutrition: recipe
                .nutrition
                .map(|map| {
                    map.into_iter()
                        .filter(|(key, _)| !key.starts_with('@'))
                        .filter_map(|(key, value)| {
                            let value = match value {
                                Value::String(s) => s,
                                Value::Number(n) => n.to_string(),
                                _ => return None,
                            };
                            non_empty(value).map(|value| (key, value))
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

fn flatten_instructions(instructions: RecipeInstructions) -> Vec<String> {
    match instructions {
        RecipeInstructions::String(text) => vec![text],
        RecipeInstructions::Multiple(steps) => steps,
        RecipeInstructions::MultipleObject(steps) => steps.into_iter().map(|obj| obj.text).collect(),
        RecipeInstructions::HowTo(sections) => sections
            .into_iter()
            .flat_map(|section| match section {
                HowTo::HowToStep(step) => step.into_text().into_iter().collect::<Vec<_>>(),
                HowTo::HowToSection(section) => section
                    .item_list_element
                    .into_iter()
                    .filter_map(HowToStep::into_text)
                    .collect(),
            })
            .collect(),
    }
}

fn decode_html_symbols(text: &str) -> String {
    // for some reason need to decode twice to get the correct string
    decode_html_entities(&decode_html_entities(text)).into_owned()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

fn is_recipe_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(type_str)) => type_str.eq_ignore_ascii_case("recipe"),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|type_str| type_str.eq_ignore_ascii_case("recipe")),
        _ => false,
    }
}

/// Every recipe object inside one JSON-LD value: the root, array items or `@graph` items
fn recipe_objects(json_ld: &Value) -> Vec<&Value> {
    if let Some(items) = json_ld.as_array() {
        return items.iter().flat_map(recipe_objects).collect();
    }
    if is_recipe_type(json_ld) {
        return vec![json_ld];
    }
    match json_ld.get("@graph").and_then(Value::as_array) {
        Some(graph) => graph.iter().filter(|item| is_recipe_type(item)).collect(),
        None => vec![],
    }
}

fn missing_required_keys(recipe: &Value) -> Vec<&'static str> {
    REQUIRED_KEYS
        .iter()
        .filter(|(key, _)| recipe.get(key).map_or(true, Value::is_null))
        .map(|(_, field)| *field)
        .collect()
}

impl JsonLdExtractor {
    /// Validate one recipe block against the expected schema and project it
    pub fn project(&self, recipe: &Value) -> Result<StructuredRecipe, ExtractionError> {
        let missing = missing_required_keys(recipe);
        if !missing.is_empty() {
            debug!("JsonLdExtractor: recipe block is missing {:?}", missing);
            return Err(ExtractionError::MalformedStructuredData {
                reason: format!("missing required keys: {}", missing.join(", ")),
                missing,
            });
        }

        let recipe: JsonLdRecipe = serde_json::from_value(recipe.clone()).map_err(|e| {
            ExtractionError::MalformedStructuredData {
                reason: e.to_string(),
                missing: vec![],
            }
        })?;
        Ok(StructuredRecipe::from(recipe))
    }
}

impl Extractor for JsonLdExtractor {
    type Output = StructuredRecipe;

    fn extract(&self, context: &ParsingContext) -> Result<StructuredRecipe, ExtractionError> {
        debug!("JsonLdExtractor: Starting parse for URL: {}", context.url);

        let mut candidates: Vec<Result<Value, String>> = Vec::new();
        for (index, script) in context.document.select(&SCRIPT_SELECTOR).enumerate() {
            let raw_json = script.inner_html();
            match serde_json::from_str::<Value>(&sanitize_json(&raw_json)) {
                Ok(json_ld) => {
                    let recipes = recipe_objects(&json_ld);
                    debug!(
                        "JsonLdExtractor: script {} holds {} recipe object(s)",
                        index,
                        recipes.len()
                    );
                    candidates.extend(recipes.into_iter().cloned().map(Ok));
                }
                Err(e) if RECIPE_TYPE_REGEX.is_match(&raw_json) => {
                    debug!("JsonLdExtractor: recipe script {} is not valid JSON: {}", index, e);
                    candidates.push(Err(e.to_string()));
                }
                Err(e) => {
                    debug!("JsonLdExtractor: Failed to parse JSON-LD {}: {}", index, e);
                }
            }
        }

        match candidates.as_slice() {
            [Ok(recipe)] => self.project(recipe),
            [Err(reason)] => Err(ExtractionError::MalformedStructuredData {
                reason: reason.clone(),
                missing: vec![],
            }),
            _ => Err(ExtractionError::NoStructuredData {
                found: candidates.len(),
            }),
        }
    }
}

/// Make JSON-LD text embedded by a CMS acceptable to serde_json: strip HTML
/// comments, escape raw control characters inside strings and drop trailing
/// commas.
fn sanitize_json(json_str: &str) -> String {
    let trimmed = json_str
        .trim()
        .trim_start_matches("<!--")
        .trim_end_matches("-->")
        .trim();

    let mut cleaned = String::with_capacity(trimmed.len());
    let mut in_string = false;
    let mut escaped = false;
    let chars: Vec<char> = trimmed.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            match c {
                _ if escaped => {
                    escaped = false;
                    cleaned.push(c);
                }
                '\\' => {
                    escaped = true;
                    cleaned.push(c);
                }
                '"' => {
                    in_string = false;
                    cleaned.push(c);
                }
                '\n' => cleaned.push_str("\\n"),
                '\r' => {}
                '\t' => cleaned.push_str("\\t"),
                _ => cleaned.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                cleaned.push(c);
            }
            ',' => {
                // Skip trailing commas before a closing bracket
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some(']' | '}')) {
                    cleaned.push(c);
                }
            }
            _ => cleaned.push(c),
        }
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_html_document(scripts: &[&str]) -> String {
        let scripts: String = scripts
            .iter()
            .map(|json_ld| format!(r#"<script type="application/ld+json">{json_ld}</script>"#))
            .collect();
        format!(
            r#"
            <!DOCTYPE html>
            <html>
            <head>{scripts}</head>
            <body></body>
            </html>
            "#
        )
    }

    fn extract(scripts: &[&str]) -> Result<StructuredRecipe, ExtractionError> {
        let context = ParsingContext::new(
            "https://www.chefkoch.de/rezepte/1/Test.html",
            &create_html_document(scripts),
        );
        JsonLdExtractor.extract(&context)
    }

    const BREADCRUMB: &str = r#"{
        "@context": "https://schema.org",
        "@type": "BreadcrumbList",
        "itemListElement": [{"@type": "ListItem", "position": 1, "name": "Rezepte"}]
    }"#;

    const RECIPE: &str = r#"{
        "@context": "http://schema.org",
        "@type": "Recipe",
        "name": "Spaghetti Carbonara",
        "description": "Cremig &amp; schnell",
        "image": ["https://img.chefkoch-cdn.de/1.jpg", "https://img.chefkoch-cdn.de/2.jpg"],
        "recipeIngredient": ["200 g Spaghetti", "  ", "100 g Speck"],
        "recipeInstructions": "Nudeln kochen. Speck anbraten.",
        "recipeYield": "2 Portionen",
        "prepTime": "P0DT0H15M",
        "cookTime": "",
        "aggregateRating": {"@type": "AggregateRating", "ratingValue": 4.6, "ratingCount": "123", "reviewCount": 45},
        "author": {"@type": "Person", "name": "Koch123"},
        "publisher": {"@type": "Organization", "name": "Chefkoch.de"},
        "keywords": ["Pasta", "Schnell"],
        "recipeCategory": "Hauptspeise",
        "datePublished": "2014-04-13",
        "nutrition": {"@type": "NutritionInformation", "calories": "620 kcal", "proteinContent": "25g"}
    }"#;

    #[test]
    fn test_picks_the_recipe_among_other_blocks() {
        let recipe = extract(&[BREADCRUMB, RECIPE]).unwrap();

        assert_eq!(recipe.title, "Spaghetti Carbonara");
        assert_eq!(recipe.description.as_deref(), Some("Cremig & schnell"));
        assert_eq!(recipe.images.len(), 2);
        assert_eq!(recipe.ingredients, vec!["200 g Spaghetti", "100 g Speck"]);
        assert_eq!(recipe.instructions, vec!["Nudeln kochen. Speck anbraten."]);
        assert_eq!(recipe.recipe_yield.as_deref(), Some("2 Portionen"));
        assert_eq!(recipe.prep_time.as_deref(), Some("P0DT0H15M"));
        assert_eq!(recipe.cook_time, None);
        assert_eq!(recipe.rating_value, Some(RawNumber::Number(4.6)));
        assert_eq!(recipe.rating_count.as_ref().and_then(RawNumber::as_f64), Some(123.0));
        assert_eq!(recipe.author.as_deref(), Some("Koch123"));
        assert_eq!(recipe.publisher.as_deref(), Some("Chefkoch.de"));
        assert_eq!(recipe.keywords.as_deref(), Some("Pasta, Schnell"));
        assert_eq!(recipe.category.as_deref(), Some("Hauptspeise"));
        assert_eq!(recipe.date_published.as_deref(), Some("2014-04-13"));
        assert_eq!(recipe.nutrition.get("calories").map(String::as_str), Some("620 kcal"));
        assert!(!recipe.nutrition.contains_key("@type"));
    }

    #[test]
    fn test_recipe_inside_graph_with_lowercase_type() {
        let json_ld = r#"{
            "@context": "https://schema.org",
            "@graph": [
                {"@type": "WebSite", "name": "Site"},
                {
                    "@type": ["recipe"],
                    "name": "Graph Recipe",
                    "image": {"@type": "ImageObject", "url": "https://example.com/a.jpg"},
                    "recipeIngredient": ["1 Ei"],
                    "recipeInstructions": [
                        {"@type": "HowToSection", "name": "Teig", "itemListElement": [
                            {"@type": "HowToStep", "text": "Ei aufschlagen."},
                            {"@type": "HowToStep", "name": "Verquirlen."}
                        ]}
                    ]
                }
            ]
        }"#;

        let recipe = extract(&[json_ld]).unwrap();
        assert_eq!(recipe.title, "Graph Recipe");
        assert_eq!(recipe.images, vec!["https://example.com/a.jpg"]);
        assert_eq!(recipe.instructions, vec!["Ei aufschlagen.", "Verquirlen."]);
    }

    #[test]
    fn test_unusable_optional_fields_are_dropped() {
        let json_ld = r#"{
            "@type": "Recipe",
            "name": "Kartoffelsalat",
            "image": "https://img.chefkoch-cdn.de/salat.jpg",
            "recipeIngredient": ["1 kg Kartoffeln"],
            "recipeYield": [4, "4 Portionen"],
            "prepTime": 30,
            "cookTime": {"@type": "Duration"},
            "datePublished": 2014,
            "author": 17,
            "aggregateRating": {"ratingValue": {"value": 4}, "ratingCount": 12}
        }"#;

        let recipe = extract(&[json_ld]).unwrap();
        assert_eq!(recipe.title, "Kartoffelsalat");
        assert_eq!(recipe.recipe_yield.as_deref(), Some("4"));
        assert_eq!(recipe.prep_time, None);
        assert_eq!(recipe.cook_time, None);
        assert_eq!(recipe.date_published, None);
        assert_eq!(recipe.author, None);
        assert_eq!(recipe.rating_value, None);
        assert_eq!(recipe.rating_count, Some(RawNumber::Number(12.0)));
    }

    #[test]
    fn test_no_recipe_block() {
        assert_eq!(
            extract(&[BREADCRUMB]),
            Err(ExtractionError::NoStructuredData { found: 0 })
        );
        assert_eq!(extract(&[]), Err(ExtractionError::NoStructuredData { found: 0 }));
    }

    #[test]
    fn test_two_recipe_blocks_are_ambiguous() {
        assert_eq!(
            extract(&[RECIPE, RECIPE]),
            Err(ExtractionError::NoStructuredData { found: 2 })
        );
    }

    #[test]
    fn test_missing_required_keys() {
        let json_ld = r#"{"@type": "Recipe", "name": "Ohne Zutaten", "image": null}"#;
        match extract(&[json_ld]) {
            Err(ExtractionError::MalformedStructuredData { missing, .. }) => {
                assert_eq!(missing, vec!["image", "ingredients"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_shape_is_malformed() {
        let json_ld = r#"{"@type": "Recipe", "name": "Kaputt", "image": "x.jpg", "recipeIngredient": 5}"#;
        assert!(matches!(
            extract(&[json_ld]),
            Err(ExtractionError::MalformedStructuredData { ref missing, .. }) if missing.is_empty()
        ));
    }

    #[test]
    fn test_unparseable_recipe_block_is_malformed() {
        let json_ld = r#"{"@type": "Recipe", "name": "Kaputt" "image": }"#;
        assert!(matches!(
            extract(&[json_ld]),
            Err(ExtractionError::MalformedStructuredData { .. })
        ));
    }

    #[test]
    fn test_sanitize_json() {
        let raw = "{\"name\": \"Zeile 1\nZeile 2\", \"list\": [1, 2,],}";
        let value: Value = serde_json::from_str(&sanitize_json(raw)).unwrap();
        assert_eq!(value["name"], "Zeile 1\nZeile 2");
        assert_eq!(value["list"], serde_json::json!([1, 2]));

        let escaped = r#"{"text": "ein \"Zitat\", hier"}"#;
        let value: Value = serde_json::from_str(&sanitize_json(escaped)).unwrap();
        assert_eq!(value["text"], "ein \"Zitat\", hier");
    }
}
