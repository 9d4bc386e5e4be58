//! Ways of finding recipes: at random, from the daily recommendations, or by search.
//!
//! Each retriever owns its own [`RecipeClient`] session and releases it on
//! `close` or drop.

use crate::client::{Batch, RecipeClient};
use crate::config::ClientConfig;
use crate::error::{ChefkochError, ValidationError};
use crate::extractors::ListingKind;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::model::{Recipe, RecipeSummary};
use crate::search::{build_search_url, SearchFilter, SearchPage};
use crate::urls;
use log::{debug, info};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Picks random recipes through the site's random-recipe redirect
pub struct RandomRetriever<F = HttpFetcher> {
    client: RecipeClient<F>,
}

impl RandomRetriever<HttpFetcher> {
    pub fn new() -> Result<Self, ChefkochError> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, ChefkochError> {
        Ok(Self::with_client(RecipeClient::with_config(config)?))
    }
}

impl<F: Fetcher> RandomRetriever<F> {
    pub fn with_client(client: RecipeClient<F>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RecipeClient<F> {
        &self.client
    }

    /// One random recipe, assembled under the URL the site redirected to
    pub fn get_recipe(&self) -> Result<Recipe, ChefkochError> {
        let url = self.client.site_url(urls::RANDOM_RECIPE_PATH)?;
        self.client.load_recipe(url.as_str())
    }

    /// `count` independent draws. The same recipe may come up more than once.
    ///
    /// Failures are recorded under the page the draw redirected to, when known.
    pub fn get_recipes(&self, count: usize) -> Result<Batch<Recipe>, ChefkochError> {
        let url = self.client.site_url(urls::RANDOM_RECIPE_PATH)?;
        let mut batch = Batch::new();
        for _ in 0..count {
            let (source, recipe) = self.client.load_recipe_traced(url.as_str());
            batch.push(source, recipe);
        }
        info!("Drew {} of {} random recipe(s)", batch.items.len(), count);
        Ok(batch)
    }

    pub fn close(self) {
        self.client.close();
    }
}

/// Which daily recommendation page to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyCategory {
    Cooking,
    Baking,
}

impl DailyCategory {
    pub fn path(self) -> &'static str {
        match self {
            DailyCategory::Cooking => urls::DAILY_COOKING_PATH,
            DailyCategory::Baking => urls::DAILY_BAKING_PATH,
        }
    }
}

impl FromStr for DailyCategory {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "cooking" => Ok(DailyCategory::Cooking),
            "baking" => Ok(DailyCategory::Baking),
            _ => Err(ValidationError::UnknownDailyCategory(value.to_string())),
        }
    }
}

impl fmt::Display for DailyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DailyCategory::Cooking => f.write_str("cooking"),
            DailyCategory::Baking => f.write_str("baking"),
        }
    }
}

/// Reads today's cooking or baking suggestions.
///
/// Listings only carry link and headline data; full recipes are loaded on
/// demand with `resolve` or `resolve_all`.
pub struct DailyRecommendationRetriever<F = HttpFetcher> {
    category: DailyCategory,
    client: RecipeClient<F>,
}

impl DailyRecommendationRetriever<HttpFetcher> {
    pub fn new(category: DailyCategory) -> Result<Self, ChefkochError> {
        Self::with_config(category, ClientConfig::default())
    }

    pub fn with_config(category: DailyCategory, config: ClientConfig) -> Result<Self, ChefkochError> {
        Ok(Self::with_client(category, RecipeClient::with_config(config)?))
    }
}

impl<F: Fetcher> DailyRecommendationRetriever<F> {
    pub fn with_client(category: DailyCategory, client: RecipeClient<F>) -> Self {
        Self { category, client }
    }

    pub fn category(&self) -> DailyCategory {
        self.category
    }

    pub fn client(&self) -> &RecipeClient<F> {
        &self.client
    }

    pub fn get_recipes(&self) -> Result<Batch<RecipeSummary>, ChefkochError> {
        let url = self.client.site_url(self.category.path())?;
        debug!("Reading daily {} recommendations from {}", self.category, url);
        self.client.listing(url.as_str(), ListingKind::Daily)
    }

    pub fn resolve(&self, summary: &RecipeSummary) -> Result<Recipe, ChefkochError> {
        self.client.resolve(summary)
    }

    pub fn resolve_all(&self, summaries: &[RecipeSummary]) -> Batch<Recipe> {
        self.client.resolve_all(summaries)
    }

    pub fn close(self) {
        self.client.close();
    }
}

/// Runs searches with a fixed set of filters
pub struct SearchRetriever<F = HttpFetcher> {
    filter: SearchFilter,
    client: RecipeClient<F>,
}

impl SearchRetriever<HttpFetcher> {
    pub fn new(filter: SearchFilter) -> Result<Self, ChefkochError> {
        Self::with_config(filter, ClientConfig::default())
    }

    pub fn with_config(filter: SearchFilter, config: ClientConfig) -> Result<Self, ChefkochError> {
        Ok(Self::with_client(filter, RecipeClient::with_config(config)?))
    }
}

impl<F: Fetcher> SearchRetriever<F> {
    pub fn with_client(filter: SearchFilter, client: RecipeClient<F>) -> Self {
        Self { filter, client }
    }

    pub fn filter(&self) -> &SearchFilter {
        &self.filter
    }

    pub fn client(&self) -> &RecipeClient<F> {
        &self.client
    }

    /// Listing URL for `query` on the 1-based `page`, validated before any request
    pub fn search_url(&self, query: &str, page: i64) -> Result<Url, ChefkochError> {
        let page = SearchPage::new(query, page)?;
        Ok(build_search_url(self.client.base_url(), &self.filter, &page)?)
    }

    pub fn get_recipes(&self, query: &str, page: i64) -> Result<Batch<RecipeSummary>, ChefkochError> {
        let url = self.search_url(query, page)?;
        debug!("Searching {}", url);
        self.client.listing(url.as_str(), ListingKind::Search)
    }

    pub fn resolve_all(&self, summaries: &[RecipeSummary]) -> Batch<Recipe> {
        self.client.resolve_all(summaries)
    }

    pub fn close(self) {
        self.client.close();
    }
}
