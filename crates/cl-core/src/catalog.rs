//! # Catalog
//!
//! The canonical, read-only registry of bread entities and their built-in recipes.
//! Built once at startup (from the embedded seed or a config-supplied file) and shared
//! behind an `Arc`.

use crate::error::{AppError, Result};
use crate::models::{BreadEntity, Category, Difficulty};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};

const SEED: &str = include_str!("../data/breads.json");

/// Number of entries the "related" and "new additions" shelves show.
pub const SHELF_SIZE: usize = 3;

/// Browse filters. Every criterion that is set must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFilter {
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
    pub best_for: Option<String>,
}

impl CatalogFilter {
    pub fn matches(&self, bread: &BreadEntity) -> bool {
        self.category.map_or(true, |c| bread.category == c)
            && self.difficulty.map_or(true, |d| bread.difficulty == d)
            && self
                .best_for
                .as_deref()
                .map_or(true, |tag| bread.best_for.iter().any(|b| b == tag))
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    breads: Vec<BreadEntity>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Validates and indexes `breads`, keeping their order.
    pub fn new(breads: Vec<BreadEntity>) -> Result<Self> {
        let mut index = HashMap::with_capacity(breads.len());
        for (pos, bread) in breads.iter().enumerate() {
            if bread.id.trim().is_empty() {
                return Err(AppError::validation(format!("catalog entry #{pos} has an empty id")));
            }
            if index.insert(bread.id.clone(), pos).is_some() {
                return Err(AppError::validation(format!("duplicate bread id '{}'", bread.id)));
            }
            if let Some(recipe) = bread.recipes.iter().find(|r| !r.time.is_consistent()) {
                return Err(AppError::validation(format!(
                    "recipe '{}' of '{}': total time must equal prep + rise + bake",
                    recipe.id, bread.id
                )));
            }
        }
        Ok(Self { breads, index })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let breads: Vec<BreadEntity> = serde_json::from_str(json)
            .map_err(|e| AppError::validation(format!("catalog is not valid JSON: {e}")))?;
        Self::new(breads)
    }

    /// The seed catalog compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(SEED)
    }

    pub fn get(&self, id: &str) -> Option<&BreadEntity> {
        self.index.get(id).map(|&pos| &self.breads[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn list(&self) -> &[BreadEntity] {
        &self.breads
    }

    pub fn len(&self) -> usize {
        self.breads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breads.is_empty()
    }

    pub fn filter(&self, filter: &CatalogFilter) -> Vec<&BreadEntity> {
        self.breads.iter().filter(|b| filter.matches(b)).collect()
    }

    /// Distinct categories in use, sorted by display name.
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = self
            .breads
            .iter()
            .map(|b| b.category)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        categories.sort_by_key(|c| c.as_str());
        categories
    }

    pub fn best_for_options(&self) -> Vec<String> {
        self.breads
            .iter()
            .flat_map(|b| b.best_for.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Other breads sharing the category or the difficulty, in catalog order.
    pub fn related(&self, id: &str) -> Vec<&BreadEntity> {
        let Some(current) = self.get(id) else {
            return Vec::new();
        };
        self.breads
            .iter()
            .filter(|b| {
                b.id != current.id
                    && (b.category == current.category || b.difficulty == current.difficulty)
            })
            .take(SHELF_SIZE)
            .collect()
    }

    /// Rotates daily through the catalog by day of year (1 January is day 1).
    pub fn bread_of_the_day(&self, date: NaiveDate) -> Option<&BreadEntity> {
        if self.breads.is_empty() {
            return None;
        }
        let pos = date.ordinal() as usize % self.breads.len();
        self.breads.get(pos)
    }

    pub fn new_additions(&self) -> Vec<&BreadEntity> {
        self.breads.iter().filter(|b| b.is_new).take(SHELF_SIZE).collect()
    }
}
