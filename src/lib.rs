//! Retrieve recipes from chefkoch.de.
//!
//! Recipes are found at random, from the daily recommendations or through a
//! filtered search, then assembled from the page's JSON-LD block with markup
//! fallbacks into a typed [`Recipe`].
//!
//! ```no_run
//! use chefkoch::{SearchFilter, SearchRetriever};
//!
//! let filter = SearchFilter::builder().health("Vegan").sort("Bewertung").build()?;
//! let retriever = SearchRetriever::new(filter)?;
//! let listing = retriever.get_recipes("Lasagne", 1)?;
//! let recipes = retriever.resolve_all(&listing.items);
//! for recipe in &recipes.items {
//!     println!("{recipe}");
//! }
//! # Ok::<(), chefkoch::ChefkochError>(())
//! ```

pub mod assembler;
pub mod client;
pub mod config;
pub mod duration;
pub mod error;
pub mod extractors;
pub mod fetcher;
pub mod model;
pub mod portions;
pub mod retrievers;
pub mod search;
pub mod urls;

pub use assembler::RecipeAssembler;
pub use client::{Batch, BatchFailure, RecipeClient};
pub use config::ClientConfig;
pub use error::{ChefkochError, DurationParseError, EndOfRecipeError, ExtractionError, ValidationError};
pub use fetcher::{FetchedPage, Fetcher, HttpFetcher};
pub use model::{Difficulty, Recipe, RecipeSummary, StepCursor};
pub use retrievers::{DailyCategory, DailyRecommendationRetriever, RandomRetriever, SearchRetriever};
pub use search::{
    Category, Country, Health, MealType, PrepTime, Property, RatingFilter, SearchFilter,
    SearchFilterBuilder, SearchPage, SortOrder,
};

/// Load a single recipe page with the default configuration
pub fn fetch_recipe(url: &str) -> Result<Recipe, ChefkochError> {
    let client = RecipeClient::new()?;
    let recipe = client.recipe(url);
    client.close();
    recipe
}
