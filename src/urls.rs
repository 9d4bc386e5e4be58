//! Site paths and recipe URL helpers.

use url::Url;

pub const RANDOM_RECIPE_PATH: &str = "/rezepte/zufallsrezept/";
pub const DAILY_COOKING_PATH: &str = "/rezepte/was-koche-ich-heute/";
pub const DAILY_BAKING_PATH: &str = "/rezepte/was-backe-ich-heute/";
const RECIPE_SEGMENT: &str = "rezepte";
const GALLERY_SEGMENT: &str = "bilderuebersicht";

/// Id of a recipe URL such as `https://www.chefkoch.de/rezepte/745721177147257/Lasagne.html`
pub fn recipe_id(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    if segments.next()? != RECIPE_SEGMENT {
        return None;
    }
    let id = segments.next()?;
    let looks_like_id = id.starts_with(|c: char| c.is_ascii_digit())
        && id.chars().all(|c| c.is_ascii_alphanumeric());
    looks_like_id.then(|| id.to_string())
}

/// Whether `url` is a recipe page on the site rooted at `base`
pub fn is_recipe_url(base: &Url, url: &Url) -> bool {
    url.host_str() == base.host_str() && url.port_or_known_default() == base.port_or_known_default()
        && recipe_id(url).is_some()
}

pub fn recipe_url_for_id(base: &Url, id: &str) -> Result<Url, url::ParseError> {
    base.join(&format!("/{RECIPE_SEGMENT}/{id}"))
}

/// The image overview page listing every photo of a recipe
pub fn gallery_url(base: &Url, id: &str) -> Result<Url, url::ParseError> {
    base.join(&format!("/{RECIPE_SEGMENT}/{GALLERY_SEGMENT}/{id}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_recipe_id() {
        assert_eq!(
            recipe_id(&url("https://www.chefkoch.de/rezepte/448991137121794/Waffeln.html")),
            Some("448991137121794".to_string())
        );
        assert_eq!(
            recipe_id(&url("https://www.chefkoch.de/rezepte/745721177147257")),
            Some("745721177147257".to_string())
        );
        assert_eq!(recipe_id(&url("https://www.chefkoch.de/rezepte/zufallsrezept/")), None);
        assert_eq!(recipe_id(&url("https://www.chefkoch.de/rs/s0/Kuchen/Rezepte.html")), None);
    }

    #[test]
    fn test_is_recipe_url_requires_same_site() {
        let base = url("https://www.chefkoch.de");
        assert!(is_recipe_url(&base, &url("https://www.chefkoch.de/rezepte/1/X.html")));
        assert!(!is_recipe_url(&base, &url("https://example.com/rezepte/1/X.html")));
    }

    #[test]
    fn test_generated_urls() {
        let base = url("http://127.0.0.1:8080");
        assert_eq!(
            recipe_url_for_id(&base, "42").unwrap().as_str(),
            "http://127.0.0.1:8080/rezepte/42"
        );
        assert_eq!(
            gallery_url(&base, "42").unwrap().as_str(),
            "http://127.0.0.1:8080/rezepte/bilderuebersicht/42"
        );
    }
}
