//! Search filters and the listing URL they encode to.
//!
//! The site encodes a search as a single path segment, e.g.
//! `/rs/s1t57,32pr1o3/Lasagne/Rezepte.html`: result offset, tag ids, then the
//! prep time, rating and sort tokens.

use crate::error::ValidationError;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use url::Url;

const SEARCH_SEGMENT: &str = "rs";
const LISTING_DOCUMENT: &str = "Rezepte.html";

/// Declares a closed filter enumeration with its display names and site tokens.
///
/// Variants compare in declaration order, which is the order they are encoded in.
macro_rules! filter_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $dimension:literal {
            $($(#[$vmeta:meta])* $variant:ident => ($display:literal, $token:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const DIMENSION: &'static str = $dimension;
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Name as shown on the site's filter panel
            pub fn display_name(self) -> &'static str {
                match self {
                    $($name::$variant => $display),+
                }
            }

            /// Value used in the listing URL
            pub fn token(self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($display => Ok($name::$variant),)+
                    _ => Err(ValidationError::UnknownFilterValue {
                        dimension: $dimension,
                        value: value.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.display_name())
            }
        }
    };
}

filter_enum! {
    /// General recipe properties
    Property, "property" {
        Easy => ("Einfach", "50"),
        Quick => ("Schnell", "49"),
        Basic => ("Basisrezepte", "79"),
        Budget => ("Preiswert", "48"),
    }
}

filter_enum! {
    /// Diet and health tags
    Health, "health" {
        Vegetarian => ("Vegetarisch", "32"),
        Vegan => ("Vegan", "57"),
        LowCalorie => ("Kalorienarm", "55"),
        LowCarb => ("Low Carb", "9948"),
        Keto => ("Ketogen", "9947"),
        Paleo => ("Paleo", "7710"),
        LowFat => ("Fettarm", "56"),
        FoodCombining => ("Trennkost", "112"),
        Wholefood => ("Vollwert", "143"),
    }
}

filter_enum! {
    /// Dish categories
    Category, "category" {
        Casserole => ("Auflauf", "30"),
        Pizza => ("Pizza", "82"),
        RiceOrPastaSalad => ("Reis- oder Nudelsalat", "94"),
        Salad => ("Salat", "15"),
        SaladDressing => ("Salatdressing", "3669"),
        Tart => ("Tarte", "122"),
        FingerFood => ("Fingerfood", "52"),
        Dips => ("Dips", "35"),
        Sauces => ("Saucen", "34"),
        Soup => ("Suppe", "40"),
        Dumplings => ("Klöße", "166"),
        Bread => ("Brot und Brötchen", "108"),
        BreadDish => ("Brotspeise", "46"),
        Spread => ("Aufstrich", "51"),
        SweetDish => ("Süßspeise", "89"),
        IceCream => ("Eis", "127"),
        Cake => ("Kuchen", "92"),
        Cookies => ("Kekse", "147"),
        Gateau => ("Torte", "93"),
        Confectionery => ("Confiserie", "157"),
        Drinks => ("Getränke", "11"),
        Shake => ("Shake", "113"),
        SpiceMix => ("Gewürzmischung", "313"),
        Pastes => ("Pasten", "243"),
        StudentKitchen => ("Studentenküche", "211"),
    }
}

filter_enum! {
    /// Regional cuisines
    Country, "country" {
        Germany => ("Deutschland", "65"),
        Italy => ("Italien", "28"),
        Spain => ("Spanien", "43"),
        Portugal => ("Portugal", "149"),
        France => ("Frankreich", "84"),
        England => ("England", "117"),
        EasternEurope => ("Osteuropa", "86"),
        Scandinavia => ("Skandinavien", "133"),
        Greece => ("Griechenland", "44"),
        Turkey => ("Türkei", "103"),
        Russia => ("Russland", "212"),
        MiddleEast => ("Naher Osten", "163"),
        Asia => ("Asien", "14"),
        India => ("Indien", "13"),
        Japan => ("Japan", "148"),
        America => ("Amerika", "38"),
        Mexico => ("Mexiko", "74"),
        Caribbean => ("Karibik", "95"),
        LatinAmerica => ("Lateinamerika", "114"),
        Africa => ("Afrika", "101"),
        Morocco => ("Marokko", "131"),
        Egypt => ("Ägypten", "168"),
        Australia => ("Australien", "145"),
    }
}

filter_enum! {
    /// Course of a meal
    MealType, "meal_type" {
        Main => ("Hauptspeise", "21"),
        Starter => ("Vorspeise", "19"),
        Side => ("Beilage", "36"),
        Dessert => ("Dessert", "90"),
        Snack => ("Snack", "71"),
        Breakfast => ("Frühstück", "53"),
    }
}

filter_enum! {
    /// Maximum preparation time in minutes
    #[derive(Default)]
    PrepTime, "prep_time" {
        Minutes15 => ("15", "15"),
        Minutes30 => ("30", "30"),
        Minutes60 => ("60", "60"),
        Minutes120 => ("120", "120"),
        #[default]
        All => ("Alle", ""),
    }
}

filter_enum! {
    /// Minimum average rating
    #[derive(Default)]
    RatingFilter, "rating" {
        #[default]
        All => ("Alle", "1"),
        Two => ("2", "2"),
        Three => ("3", "3"),
        Four => ("4", "4"),
        Top => ("Top", "4.5"),
    }
}

filter_enum! {
    /// Result ordering
    #[derive(Default)]
    SortOrder, "sort" {
        #[default]
        Recommendation => ("Empfehlung", "2"),
        Rating => ("Bewertung", "3"),
        Newest => ("Neuheiten", "6"),
    }
}

/// A validated set of search filters.
///
/// Values within a dimension are OR-combined, dimensions are AND-combined.
/// Sets keep their values in enumeration order, so equal filters always encode
/// to the same URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub properties: BTreeSet<Property>,
    pub health: BTreeSet<Health>,
    pub categories: BTreeSet<Category>,
    pub countries: BTreeSet<Country>,
    pub meal_types: BTreeSet<MealType>,
    pub prep_time: PrepTime,
    pub rating: RatingFilter,
    pub sort: SortOrder,
}

impl SearchFilter {
    pub fn builder() -> SearchFilterBuilder {
        SearchFilterBuilder::default()
    }

    /// Tag ids of every set dimension, in canonical order
    pub fn tags(&self) -> Vec<&'static str> {
        self.properties
            .iter()
            .map(|value| value.token())
            .chain(self.health.iter().map(|value| value.token()))
            .chain(self.categories.iter().map(|value| value.token()))
            .chain(self.countries.iter().map(|value| value.token()))
            .chain(self.meal_types.iter().map(|value| value.token()))
            .collect()
    }

    /// The parameter segment for one result page, e.g. `s1t57pr1o3`
    pub fn encode(&self, page: &SearchPage) -> String {
        format!(
            "s{}t{}p{}r{}o{}",
            page.index() - 1,
            self.tags().join(","),
            self.prep_time.token(),
            self.rating.token(),
            self.sort.token()
        )
    }
}

/// Collects filter values by display name and validates them in `build`.
#[derive(Debug, Clone, Default)]
pub struct SearchFilterBuilder {
    properties: Vec<String>,
    health: Vec<String>,
    categories: Vec<String>,
    countries: Vec<String>,
    meal_types: Vec<String>,
    prep_times: Vec<String>,
    ratings: Vec<String>,
    sorts: Vec<String>,
}

impl SearchFilterBuilder {
    pub fn property(mut self, value: impl Into<String>) -> Self {
        self.properties.push(value.into());
        self
    }

    pub fn health(mut self, value: impl Into<String>) -> Self {
        self.health.push(value.into());
        self
    }

    pub fn category(mut self, value: impl Into<String>) -> Self {
        self.categories.push(value.into());
        self
    }

    pub fn country(mut self, value: impl Into<String>) -> Self {
        self.countries.push(value.into());
        self
    }

    pub fn meal_type(mut self, value: impl Into<String>) -> Self {
        self.meal_types.push(value.into());
        self
    }

    pub fn prep_time(mut self, value: impl Into<String>) -> Self {
        self.prep_times.push(value.into());
        self
    }

    pub fn rating(mut self, value: impl Into<String>) -> Self {
        self.ratings.push(value.into());
        self
    }

    pub fn sort(mut self, value: impl Into<String>) -> Self {
        self.sorts.push(value.into());
        self
    }

    pub fn build(self) -> Result<SearchFilter, ValidationError> {
        Ok(SearchFilter {
            properties: parse_set(&self.properties)?,
            health: parse_set(&self.health)?,
            categories: parse_set(&self.categories)?,
            countries: parse_set(&self.countries)?,
            meal_types: parse_set(&self.meal_types)?,
            prep_time: parse_single(&self.prep_times, PrepTime::DIMENSION)?.unwrap_or_default(),
            rating: parse_single(&self.ratings, RatingFilter::DIMENSION)?.unwrap_or_default(),
            sort: parse_single(&self.sorts, SortOrder::DIMENSION)?.unwrap_or_default(),
        })
    }
}

fn parse_set<T>(values: &[String]) -> Result<BTreeSet<T>, ValidationError>
where
    T: FromStr<Err = ValidationError> + Ord,
{
    values.iter().map(|value| value.parse()).collect()
}

/// Single-valued dimensions accept one distinct value; "Alle" plus a bucket,
/// or two buckets, conflict.
fn parse_single<T>(values: &[String], dimension: &'static str) -> Result<Option<T>, ValidationError>
where
    T: FromStr<Err = ValidationError> + Ord + fmt::Display,
{
    let parsed: BTreeSet<T> = parse_set(values)?;
    if parsed.len() > 1 {
        return Err(ValidationError::ConflictingFilterValues {
            dimension,
            values: parsed.iter().map(ToString::to_string).collect(),
        });
    }
    Ok(parsed.into_iter().next())
}

/// Query text and a 1-based result page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    query: String,
    index: u32,
}

impl SearchPage {
    pub fn new(query: impl Into<String>, page: i64) -> Result<Self, ValidationError> {
        let index = u32::try_from(page)
            .ok()
            .filter(|index| *index >= 1)
            .ok_or(ValidationError::InvalidPage(page))?;
        Ok(Self {
            query: query.into(),
            index,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

/// Listing URL of one result page below `base`.
///
/// The query is percent-encoded as a path segment and left out when blank.
pub fn build_search_url(
    base: &Url,
    filter: &SearchFilter,
    page: &SearchPage,
) -> Result<Url, url::ParseError> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
        segments
            .clear()
            .push(SEARCH_SEGMENT)
            .push(&filter.encode(page));
        let query = page.query().trim();
        if !query.is_empty() {
            segments.push(query);
        }
        segments.push(LISTING_DOCUMENT);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.chefkoch.de").unwrap()
    }

    #[test]
    fn test_vegan_sorted_by_rating_page_two() {
        let filter = SearchFilter::builder()
            .health("Vegan")
            .sort("Bewertung")
            .build()
            .unwrap();
        let page = SearchPage::new("Lasagne", 2).unwrap();

        let url = build_search_url(&base(), &filter, &page).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.chefkoch.de/rs/s1t57pr1o3/Lasagne/Rezepte.html"
        );
        assert_eq!(build_search_url(&base(), &filter, &page).unwrap(), url);
    }

    #[test]
    fn test_default_filter_first_page() {
        let page = SearchPage::new("Kuchen", 1).unwrap();
        let url = build_search_url(&base(), &SearchFilter::default(), &page).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.chefkoch.de/rs/s0tpr1o2/Kuchen/Rezepte.html"
        );
        assert_eq!(PrepTime::default(), PrepTime::All);
        assert_eq!(RatingFilter::default(), RatingFilter::All);
        assert_eq!(SortOrder::default(), SortOrder::Recommendation);
    }

    #[test]
    fn test_order_is_canonical_regardless_of_insertion() {
        let first = SearchFilter::builder()
            .meal_type("Dessert")
            .health("Vegan")
            .health("Vegetarisch")
            .property("Schnell")
            .property("Einfach")
            .country("Italien")
            .category("Kuchen")
            .prep_time("30")
            .rating("Top")
            .sort("Neuheiten")
            .build()
            .unwrap();
        let second = SearchFilter::builder()
            .property("Einfach")
            .sort("Neuheiten")
            .category("Kuchen")
            .health("Vegetarisch")
            .rating("Top")
            .country("Italien")
            .property("Schnell")
            .prep_time("30")
            .health("Vegan")
            .meal_type("Dessert")
            .build()
            .unwrap();

        assert_eq!(first, second);
        let page = SearchPage::new("", 1).unwrap();
        assert_eq!(first.encode(&page), "s0t50,49,32,57,92,28,90p30r4.5o6");
        assert_eq!(
            build_search_url(&base(), &first, &page).unwrap().as_str(),
            "https://www.chefkoch.de/rs/s0t50,49,32,57,92,28,90p30r4.5o6/Rezepte.html"
        );
    }

    #[test]
    fn test_query_is_percent_encoded() {
        let page = SearchPage::new("  Käse Spätzle  ", 1).unwrap();
        let url = build_search_url(&base(), &SearchFilter::default(), &page).unwrap();
        assert_eq!(url.path(), "/rs/s0tpr1o2/K%C3%A4se%20Sp%C3%A4tzle/Rezepte.html");
    }

    #[test]
    fn test_unknown_values_are_rejected() {
        let err = SearchFilter::builder().health("vegan").build().unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownFilterValue {
                dimension: "health",
                value: "vegan".to_string()
            }
        );
        assert!(SearchFilter::builder().sort("Beliebtheit").build().is_err());
        assert!(SearchFilter::builder().prep_time("45").build().is_err());
    }

    #[test]
    fn test_every_enumeration_value_is_accepted() {
        let mut builder = SearchFilter::builder();
        for value in Property::ALL {
            builder = builder.property(value.display_name());
        }
        for value in Health::ALL {
            builder = builder.health(value.display_name());
        }
        for value in Category::ALL {
            builder = builder.category(value.display_name());
        }
        for value in Country::ALL {
            builder = builder.country(value.display_name());
        }
        for value in MealType::ALL {
            builder = builder.meal_type(value.display_name());
        }
        let filter = builder.build().unwrap();

        assert_eq!(filter.categories.len(), Category::ALL.len());
        assert_eq!(filter.countries.len(), 23);
        for value in PrepTime::ALL {
            assert!(SearchFilter::builder().prep_time(value.display_name()).build().is_ok());
        }
        for value in RatingFilter::ALL {
            assert!(SearchFilter::builder().rating(value.display_name()).build().is_ok());
        }
    }

    #[test]
    fn test_alle_conflicts_with_a_bucket() {
        let err = SearchFilter::builder()
            .prep_time("Alle")
            .prep_time("15")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::ConflictingFilterValues {
                dimension: "prep_time",
                values: vec!["15".to_string(), "Alle".to_string()]
            }
        );
        assert!(matches!(
            SearchFilter::builder().rating("Top").rating("Alle").build(),
            Err(ValidationError::ConflictingFilterValues { dimension: "rating", .. })
        ));
        // Repeating the same value is not a conflict
        assert!(SearchFilter::builder().rating("3").rating("3").build().is_ok());
    }

    #[test]
    fn test_page_must_be_positive() {
        assert_eq!(SearchPage::new("x", 0), Err(ValidationError::InvalidPage(0)));
        assert_eq!(SearchPage::new("x", -3), Err(ValidationError::InvalidPage(-3)));
        assert_eq!(SearchPage::new("x", 1).unwrap().index(), 1);
    }
}
