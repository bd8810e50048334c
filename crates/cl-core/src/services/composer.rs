//! # Content Composer
//!
//! Read-side merge of the catalog, approved community recipes and rating
//! summaries into the views served to end users. Nothing here writes.

use crate::catalog::{Catalog, CatalogFilter};
use crate::error::{AppError, Result};
use crate::models::{BreadEntity, Category, Difficulty, Recipe, RatingSummary};
use crate::services::ratings::RatingAggregator;
use crate::services::submissions::SubmissionQueue;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

/// Compact listing entry for browse pages and "you might also like" shelves.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreadCard {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub is_new: bool,
    pub rating: RatingSummary,
    pub total_recipes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedBreadView {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<String>,
    pub is_new: bool,
    pub category: Category,
    pub difficulty: Difficulty,
    pub best_for: Vec<String>,
    pub key_features: Vec<String>,
    /// Built-in recipes first, then approved community recipes in submission order.
    pub recipes: Vec<Recipe>,
    pub total_recipes: usize,
    pub rating: RatingSummary,
    pub related: Vec<BreadCard>,
}

/// Pure merge of one bread with its approved recipes and rating summary.
pub fn compose(
    bread: &BreadEntity,
    approved: Vec<Recipe>,
    rating: RatingSummary,
    related: Vec<BreadCard>,
) -> ComposedBreadView {
    let mut recipes = Vec::with_capacity(bread.recipes.len() + approved.len());
    recipes.extend(bread.recipes.iter().cloned());
    recipes.extend(approved);

    ComposedBreadView {
        id: bread.id.clone(),
        name: bread.name.clone(),
        description: bread.description.clone(),
        history: bread.history.clone(),
        is_new: bread.is_new,
        category: bread.category,
        difficulty: bread.difficulty,
        best_for: bread.best_for.clone(),
        key_features: bread.key_features.clone(),
        total_recipes: recipes.len(),
        recipes,
        rating,
        related,
    }
}

pub struct ContentComposer {
    catalog: Arc<Catalog>,
    submissions: Arc<SubmissionQueue>,
    ratings: Arc<RatingAggregator>,
}

impl ContentComposer {
    pub fn new(
        catalog: Arc<Catalog>,
        submissions: Arc<SubmissionQueue>,
        ratings: Arc<RatingAggregator>,
    ) -> Self {
        Self { catalog, submissions, ratings }
    }

    pub async fn view_for(&self, bread_id: &str) -> Result<ComposedBreadView> {
        let bread = self
            .catalog
            .get(bread_id)
            .ok_or_else(|| AppError::not_found("Bread", bread_id))?;
        self.view_of(bread).await
    }

    async fn view_of(&self, bread: &BreadEntity) -> Result<ComposedBreadView> {
        let approved = self.submissions.list_approved_for_bread(&bread.id).await?;
        let rating = self.ratings.summary_for(&bread.id).await?;

        let mut related = Vec::new();
        for other in self.catalog.related(&bread.id) {
            related.push(self.card(other).await?);
        }
        Ok(compose(bread, approved, rating, related))
    }

    pub async fn card(&self, bread: &BreadEntity) -> Result<BreadCard> {
        let approved = self.submissions.list_approved_for_bread(&bread.id).await?;
        Ok(BreadCard {
            id: bread.id.clone(),
            name: bread.name.clone(),
            description: bread.description.clone(),
            category: bread.category,
            difficulty: bread.difficulty,
            is_new: bread.is_new,
            rating: self.ratings.summary_for(&bread.id).await?,
            total_recipes: bread.recipes.len() + approved.len(),
        })
    }

    pub async fn cards(&self, filter: &CatalogFilter) -> Result<Vec<BreadCard>> {
        let mut cards = Vec::new();
        for bread in self.catalog.filter(filter) {
            cards.push(self.card(bread).await?);
        }
        Ok(cards)
    }

    /// Cards for the "new additions" shelf, in catalog order.
    pub async fn new_additions(&self) -> Result<Vec<BreadCard>> {
        let mut cards = Vec::new();
        for bread in self.catalog.new_additions() {
            cards.push(self.card(bread).await?);
        }
        Ok(cards)
    }

    pub async fn featured(&self, date: NaiveDate) -> Result<Option<ComposedBreadView>> {
        match self.catalog.bread_of_the_day(date) {
            Some(bread) => Ok(Some(self.view_of(bread).await?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ingredient, RecipeTime};

    fn recipe(id: &str) -> Recipe {
        Recipe {
            id: id.into(),
            title: id.into(),
            author: "Kitchen".into(),
            difficulty: Difficulty::Beginner,
            time: RecipeTime::new(10, 0, 30),
            yield_desc: "1 loaf".into(),
            ingredients: vec![Ingredient { name: "cornmeal".into(), amount: "1 cup".into() }],
            instructions: vec!["Bake.".into()],
            tips: vec![],
        }
    }

    #[test]
    fn builtin_recipes_come_first() {
        let catalog = Catalog::builtin().unwrap();
        let mut bread = catalog.get("cornbread").unwrap().clone();
        bread.recipes = vec![recipe("house")];

        let view = compose(
            &bread,
            vec![recipe("community-1"), recipe("community-2")],
            RatingSummary { average: None, count: 0 },
            vec![],
        );
        let ids: Vec<_> = view.recipes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["house", "community-1", "community-2"]);
        assert_eq!(view.total_recipes, 3);
        assert_eq!(view.best_for, bread.best_for);
    }

    #[test]
    fn unrated_view_serializes_null_average() {
        let catalog = Catalog::builtin().unwrap();
        let view = compose(
            catalog.get("rye").unwrap(),
            vec![],
            RatingSummary { average: None, count: 0 },
            vec![],
        );
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["rating"]["average"].is_null());
        assert_eq!(json["rating"]["count"], 0);
        assert_eq!(json["category"], "Whole Grain");
    }
}
