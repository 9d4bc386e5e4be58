//! Command-line access to chefkoch.de recipes.
//!
//! Every command prints JSON on stdout. Recipes that could not be loaded are
//! reported on stderr and do not abort the command.

use chefkoch::{
    Batch, ChefkochError, ClientConfig, DailyCategory, DailyRecommendationRetriever,
    RandomRetriever, RecipeClient, SearchFilter, SearchRetriever,
};
use clap::{Args, Parser, Subcommand};
use log::debug;
use serde::Serialize;

#[derive(Parser)]
#[command(author, version, about = "Fetch recipes from chefkoch.de", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Draw random recipes
    Random {
        /// Number of recipes
        #[arg(short, default_value = "1")]
        n: usize,
    },

    /// Today's suggestions ("cooking" or "baking")
    Daily {
        category: String,

        /// Load the full recipes instead of listing them
        #[arg(long)]
        resolve: bool,
    },

    /// Search recipes
    Search(SearchArgs),

    /// Load one recipe by URL or id
    Recipe {
        url_or_id: String,

        /// Also print ingredient amounts scaled to this many portions
        #[arg(long)]
        portions: Option<u32>,
    },
}

#[derive(Args, Debug)]
struct SearchArgs {
    query: String,

    /// Result page, starting at 1
    #[arg(long, default_value = "1", allow_negative_numbers = true)]
    page: i64,

    #[arg(long)]
    property: Vec<String>,

    #[arg(long)]
    health: Vec<String>,

    #[arg(long)]
    category: Vec<String>,

    #[arg(long)]
    country: Vec<String>,

    #[arg(long)]
    meal_type: Vec<String>,

    /// 15, 30, 60, 120 or Alle
    #[arg(long)]
    prep_time: Vec<String>,

    /// Alle, 2, 3, 4 or Top
    #[arg(long)]
    rating: Vec<String>,

    /// Empfehlung, Bewertung or Neuheiten
    #[arg(long)]
    sort: Vec<String>,

    /// Load the full recipes instead of listing them
    #[arg(long)]
    resolve: bool,
}

impl SearchArgs {
    fn filter(&self) -> Result<SearchFilter, ChefkochError> {
        let mut builder = SearchFilter::builder();
        for value in &self.property {
            builder = builder.property(value);
        }
        for value in &self.health {
            builder = builder.health(value);
        }
        for value in &self.category {
            builder = builder.category(value);
        }
        for value in &self.country {
            builder = builder.country(value);
        }
        for value in &self.meal_type {
            builder = builder.meal_type(value);
        }
        for value in &self.prep_time {
            builder = builder.prep_time(value);
        }
        for value in &self.rating {
            builder = builder.rating(value);
        }
        for value in &self.sort {
            builder = builder.sort(value);
        }
        Ok(builder.build()?)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let config = ClientConfig::load()?;
    debug!("Using {:?}", config);

    match cli.command {
        Commands::Random { n } => {
            let retriever = RandomRetriever::with_config(config)?;
            let batch = retriever.get_recipes(n)?;
            retriever.close();
            print_batch(batch)?;
        }
        Commands::Daily { category, resolve } => {
            let category: DailyCategory = category.parse()?;
            let retriever = DailyRecommendationRetriever::with_config(category, config)?;
            let listing = retriever.get_recipes()?;
            if resolve {
                let recipes = retriever.resolve_all(&listing.items);
                report_failures(&listing);
                print_batch(recipes)?;
            } else {
                print_batch(listing)?;
            }
            retriever.close();
        }
        Commands::Search(args) => {
            let retriever = SearchRetriever::with_config(args.filter()?, config)?;
            let listing = retriever.get_recipes(&args.query, args.page)?;
            if args.resolve {
                let recipes = retriever.resolve_all(&listing.items);
                report_failures(&listing);
                print_batch(recipes)?;
            } else {
                print_batch(listing)?;
            }
            retriever.close();
        }
        Commands::Recipe {
            url_or_id,
            portions,
        } => {
            let client = RecipeClient::with_config(config)?;
            let recipe = if url_or_id.chars().all(|c| c.is_ascii_digit()) {
                client.recipe_by_id(&url_or_id)?
            } else {
                client.recipe(&url_or_id)?
            };
            client.close();

            match portions {
                Some(target) => {
                    let scaled = recipe.modify_portions(target)?;
                    let output = serde_json::json!({
                        "recipe": recipe,
                        "portions": target,
                        "scaled_ingredients": scaled,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                None => println!("{}", serde_json::to_string_pretty(&recipe)?),
            }
        }
    }

    Ok(())
}

fn report_failures<T>(batch: &Batch<T>) {
    for failure in &batch.failures {
        eprintln!("{}: {}", failure.url, failure.error);
    }
}

fn print_batch<T: Serialize>(batch: Batch<T>) -> Result<(), serde_json::Error> {
    report_failures(&batch);
    println!("{}", serde_json::to_string_pretty(&batch.items)?);
    Ok(())
}
