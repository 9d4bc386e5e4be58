use thiserror::Error;

/// Errors that can occur while retrieving or assembling recipes
#[derive(Error, Debug)]
pub enum ChefkochError {
    /// Bad caller input, detected before any request is sent
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A fetched page could not be turned into a recipe
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Failed to fetch URL
    #[error("Failed to fetch URL: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Unexpected HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// A URL could not be parsed or joined
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Caller input rejected locally
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown value {value:?} for filter {dimension}")]
    UnknownFilterValue {
        dimension: &'static str,
        value: String,
    },

    #[error("Conflicting values for filter {dimension}: {values:?}")]
    ConflictingFilterValues {
        dimension: &'static str,
        values: Vec<String>,
    },

    #[error("Invalid page index {0}, pages start at 1")]
    InvalidPage(i64),

    #[error("Invalid portions: base {base}, target {target}")]
    InvalidPortions { base: u32, target: u32 },

    #[error("Not a recipe URL: {0}")]
    InvalidRecipeUrl(String),

    #[error("Unknown daily category {0:?}, expected \"cooking\" or \"baking\"")]
    UnknownDailyCategory(String),
}

/// A page that was fetched but could not be turned into a recipe
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// Zero, or more than one, JSON-LD recipe block on the page
    #[error("Expected exactly one structured recipe block, found {found}")]
    NoStructuredData { found: usize },

    /// The recipe block exists but does not match the expected schema
    #[error("Malformed structured recipe data: {reason}")]
    MalformedStructuredData {
        reason: String,
        missing: Vec<&'static str>,
    },

    /// A listing card without the data a summary needs
    #[error("Listing card {position} is missing: {}", missing.join(", "))]
    IncompleteSummary {
        position: usize,
        missing: Vec<&'static str>,
    },

    /// The merged data does not describe a valid recipe
    #[error("Could not assemble recipe from {url}, missing: {}", missing.join(", "))]
    RecipeAssembly {
        url: String,
        missing: Vec<&'static str>,
    },
}

/// Raised by the step cursor once every step has been handed out
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("End of recipe reached")]
pub struct EndOfRecipeError;

/// An ISO-8601 duration that could not be read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid ISO-8601 duration {input:?}: {reason}")]
pub struct DurationParseError {
    pub input: String,
    pub reason: &'static str,
}

impl ChefkochError {
    /// Whether the error was raised before any network access
    pub fn is_validation(&self) -> bool {
        matches!(self, ChefkochError::Validation(_))
    }
}
