use crate::assembler::RecipeAssembler;
use crate::config::ClientConfig;
use crate::error::{ChefkochError, ValidationError};
use crate::extractors::{Extractor, ListingExtractor, ListingKind, MarkupExtractor, ParsingContext};
use crate::fetcher::{FetchedPage, Fetcher, HttpFetcher};
use crate::model::{Recipe, RecipeSummary};
use crate::urls;
use log::{debug, info, warn};
use scraper::Html;
use url::Url;

/// Results of an operation over several URLs.
///
/// Every URL ends up either in `items` or, with the reason, in `failures`.
#[derive(Debug)]
pub struct Batch<T> {
    pub items: Vec<T>,
    pub failures: Vec<BatchFailure>,
}

/// One URL of a batch that could not be processed
#[derive(Debug)]
pub struct BatchFailure {
    pub url: String,
    pub error: ChefkochError,
}

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> Batch<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, url: impl Into<String>, result: Result<T, ChefkochError>) {
        match result {
            Ok(item) => self.items.push(item),
            Err(error) => {
                let url = url.into();
                warn!("Skipping {}: {}", url, error);
                self.failures.push(BatchFailure { url, error });
            }
        }
    }

    /// Whether every URL succeeded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An HTTP session against the recipe site.
///
/// Every retriever owns one; it can also be used on its own to load single
/// recipes. Dropping or closing the client releases its connections.
pub struct RecipeClient<F = HttpFetcher> {
    config: ClientConfig,
    base: Url,
    fetcher: F,
    assembler: RecipeAssembler,
}

impl RecipeClient<HttpFetcher> {
    /// Client with the default configuration
    pub fn new() -> Result<Self, ChefkochError> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, ChefkochError> {
        let fetcher = HttpFetcher::new(&config)?;
        Self::with_fetcher(config, fetcher)
    }
}

impl<F: Fetcher> RecipeClient<F> {
    pub fn with_fetcher(config: ClientConfig, fetcher: F) -> Result<Self, ChefkochError> {
        let base = Url::parse(config.base())?;
        debug!("Opened session for {}", base);
        Ok(Self {
            config,
            base,
            fetcher,
            assembler: RecipeAssembler,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Root every site path is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Absolute URL of a path on the site
    pub fn site_url(&self, path: &str) -> Result<Url, ChefkochError> {
        Ok(self.base.join(path)?)
    }

    /// Fetch a page, treating error statuses as failures
    pub fn fetch_page(&self, url: &str) -> Result<FetchedPage, ChefkochError> {
        self.fetcher.fetch(url)?.into_success()
    }

    /// Load and assemble the recipe at `url`.
    ///
    /// `url` may be absolute or a path on the site, but must name a recipe page.
    pub fn recipe(&self, url: &str) -> Result<Recipe, ChefkochError> {
        let target = self
            .base
            .join(url.trim())
            .ok()
            .filter(|target| urls::is_recipe_url(&self.base, target))
            .ok_or_else(|| ValidationError::InvalidRecipeUrl(url.to_string()))?;
        self.load_recipe(target.as_str())
    }

    /// Load a recipe by its numeric id; the site redirects to the full URL
    pub fn recipe_by_id(&self, id: &str) -> Result<Recipe, ChefkochError> {
        let target = self.recipe_url_for_id(id)?;
        self.load_recipe(target.as_str())
    }

    /// Image URLs from a recipe's image overview page
    pub fn gallery(&self, id: &str) -> Result<Vec<String>, ChefkochError> {
        let id = valid_id(id)?;
        let url = urls::gallery_url(&self.base, id)?;
        let page = self.fetch_page(url.as_str())?;
        let page_url = Url::parse(&page.url)?;

        let document = Html::parse_document(&page.body);
        let images: Vec<String> = MarkupExtractor
            .gallery(&document)
            .iter()
            .map(|src| page_url.join(src).map_or_else(|_| src.clone(), String::from))
            .collect();
        debug!("Found {} gallery image(s) for recipe {}", images.len(), id);
        Ok(images)
    }

    /// Raw bytes of an image, e.g. one of `Recipe::images`
    pub fn image(&self, url: &str) -> Result<Vec<u8>, ChefkochError> {
        let url = self.base.join(url)?;
        self.fetcher.fetch_bytes(url.as_str())
    }

    /// Load every summarized recipe, keeping failures next to the results
    pub fn resolve_all(&self, summaries: &[RecipeSummary]) -> Batch<Recipe> {
        let mut batch = Batch::new();
        for summary in summaries {
            batch.push(summary.url.as_str(), self.resolve(summary));
        }
        info!(
            "Resolved {} of {} recipe(s)",
            batch.items.len(),
            summaries.len()
        );
        batch
    }

    pub fn resolve(&self, summary: &RecipeSummary) -> Result<Recipe, ChefkochError> {
        self.recipe(&summary.url)
    }

    /// Release the session
    pub fn close(self) {
        debug!("Closed session for {}", self.base);
    }

    /// Fetch `url` and assemble the page under the URL it was finally served from
    pub(crate) fn load_recipe(&self, url: &str) -> Result<Recipe, ChefkochError> {
        self.load_recipe_traced(url).1
    }

    /// Like `load_recipe`, also returning the URL the request ended on.
    ///
    /// After redirects that is the recipe page; on transport errors it stays `url`.
    pub(crate) fn load_recipe_traced(
        &self,
        url: &str,
    ) -> (String, Result<Recipe, ChefkochError>) {
        let page = match self.fetcher.fetch(url) {
            Ok(page) => page,
            Err(e) => return (url.to_string(), Err(e)),
        };
        let final_url = page.url.clone();
        let recipe = page.into_success().and_then(|page| {
            let recipe = self.assembler.assemble_html(&page.url, &page.body)?;
            info!("Assembled \"{}\" from {}", recipe.title, recipe.url);
            Ok(recipe)
        });
        (final_url, recipe)
    }

    /// Recipe cards of a listing page
    pub(crate) fn listing(
        &self,
        url: &str,
        kind: ListingKind,
    ) -> Result<Batch<RecipeSummary>, ChefkochError> {
        let page = self.fetch_page(url)?;
        let context = ParsingContext::new(page.url.as_str(), &page.body);
        let entries = ListingExtractor::new(kind).extract(&context)?;

        let mut batch = Batch::new();
        for entry in entries {
            batch.push(page.url.as_str(), entry.map_err(ChefkochError::from));
        }
        info!("Found {} recipe(s) on {}", batch.items.len(), page.url);
        Ok(batch)
    }

    fn recipe_url_for_id(&self, id: &str) -> Result<Url, ChefkochError> {
        let id = valid_id(id)?;
        Ok(urls::recipe_url_for_id(&self.base, id)?)
    }
}

fn valid_id(id: &str) -> Result<&str, ValidationError> {
    let id = id.trim();
    let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(id)
    } else {
        Err(ValidationError::InvalidRecipeUrl(id.to_string()))
    }
}
