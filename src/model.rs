use crate::error::{EndOfRecipeError, ValidationError};
use crate::portions;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// A fully assembled recipe.
///
/// Only the assembler builds these, so every `Recipe` has a title, a source
/// URL, a primary image and at least one ingredient.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Recipe {
    pub url: String,
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub prep_time: Option<Duration>,
    pub cook_time: Option<Duration>,
    pub total_time: Option<Duration>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub image: String,
    pub images: Vec<String>,
    pub difficulty: Difficulty,
    pub publisher: Option<String>,
    pub author: Option<String>,
    pub rating: Option<f64>,
    pub rating_count: u32,
    pub review_count: u32,
    pub calories: Option<String>,
    pub keywords: Option<String>,
    pub category: Option<String>,
    pub date_published: Option<NaiveDate>,
    pub portions: u32,
    pub nutrition: IndexMap<String, String>,
}

impl Recipe {
    /// Ingredient amounts rescaled from the recipe's own portions to `target`.
    ///
    /// Keys are ingredient names, values the scaled amount with its unit.
    pub fn modify_portions(&self, target: u32) -> Result<IndexMap<String, String>, ValidationError> {
        portions::scale_ingredients(&self.ingredients, self.portions, target)
    }

    /// A fresh cursor over the instruction steps
    pub fn steps(&self) -> StepCursor<'_> {
        StepCursor::new(&self.instructions)
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        if let Some(author) = &self.author {
            write!(f, " by {author}")?;
        }
        Ok(())
    }
}

/// Difficulty badge shown on a recipe page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Simple,
    Normal,
    Advanced,
    #[default]
    Unknown,
}

impl Difficulty {
    /// Map the site's wording; anything unrecognized becomes `Unknown`
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "simpel" | "einfach" => Difficulty::Simple,
            "normal" => Difficulty::Normal,
            "pfiffig" | "schwer" => Difficulty::Advanced,
            _ => Difficulty::Unknown,
        }
    }
}

/// Link and headline data of a recipe shown on a listing page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeSummary {
    pub url: String,
    pub title: String,
    pub id: Option<String>,
    pub image: Option<String>,
    pub rating: Option<f64>,
    pub rating_count: Option<u32>,
    pub preparation_time: Option<String>,
}

/// Walks the steps of one recipe in order.
///
/// Once exhausted it keeps returning `EndOfRecipeError`.
#[derive(Debug, Clone)]
pub struct StepCursor<'a> {
    steps: &'a [String],
    position: usize,
}

impl<'a> StepCursor<'a> {
    pub fn new(steps: &'a [String]) -> Self {
        Self { steps, position: 0 }
    }

    pub fn next_step(&mut self) -> Result<&'a str, EndOfRecipeError> {
        let step = self.steps.get(self.position).ok_or(EndOfRecipeError)?;
        self.position += 1;
        Ok(step)
    }

    pub fn has_next(&self) -> bool {
        self.position < self.steps.len()
    }

    /// Steps handed out so far
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.steps.len() - self.position
    }
}

impl<'a> Iterator for StepCursor<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_step().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining(), Some(self.remaining()))
    }
}

impl ExactSizeIterator for StepCursor<'_> {}

impl std::iter::FusedIterator for StepCursor<'_> {}
