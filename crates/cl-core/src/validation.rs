//! Input validation and normalisation for user-supplied data.

use crate::error::{AppError, Result};
use crate::models::{Ingredient, Recipe, RecipeDraft, RecipeTime};
use serde_json::Number;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

/// Longest accepted single time component (one week, in minutes).
pub const MAX_STAGE_MINUTES: u64 = 7 * 24 * 60;

/// Trims the username and checks it against `[A-Za-z0-9_-]{3,}`.
pub fn normalize_username(raw: &str) -> Result<String> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(AppError::validation("username is required"));
    }
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AppError::validation(format!(
            "username must be at least {MIN_USERNAME_LEN} characters"
        )));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(AppError::validation(
            "username can only contain letters, numbers, underscores, and hyphens",
        ));
    }
    Ok(username.to_string())
}

/// Trims and lower-cases the address, then requires `local@domain.tld`.
pub fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::validation("email is required"));
    }
    if !is_email_syntax(&email) {
        return Err(AppError::validation("please enter a valid email address"));
    }
    Ok(email)
}

fn is_email_syntax(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    // a dot with at least one character on each side
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Blank or whitespace-only optional text becomes `None`.
pub fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn minutes(stage: &str, n: &Number) -> Result<u32> {
    if let Some(v) = n.as_u64() {
        if v > MAX_STAGE_MINUTES {
            return Err(AppError::validation(format!(
                "{stage} time must not exceed {MAX_STAGE_MINUTES} minutes"
            )));
        }
        return Ok(v as u32);
    }
    if n.as_i64().is_some() {
        return Err(AppError::validation(format!("{stage} time must not be negative")));
    }
    Err(AppError::validation(format!("{stage} time must be a whole number of minutes")))
}

/// Turns a client draft into a catalog-shaped recipe.
///
/// Blank ingredients, steps and tips are dropped and every string is trimmed
/// before the "at least one ingredient / instruction" rule is applied. The
/// client's `total` is ignored and recomputed from the stages.
pub fn normalize_recipe(draft: &RecipeDraft, id: String) -> Result<Recipe> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(AppError::validation("recipe title is required"));
    }
    let author = draft.author.trim();
    if author.is_empty() {
        return Err(AppError::validation("recipe author is required"));
    }

    let ingredients: Vec<Ingredient> = draft
        .ingredients
        .iter()
        .filter(|i| !i.name.trim().is_empty() && !i.amount.trim().is_empty())
        .map(|i| Ingredient {
            name: i.name.trim().to_string(),
            amount: i.amount.trim().to_string(),
        })
        .collect();
    if ingredients.is_empty() {
        return Err(AppError::validation("recipe needs at least one ingredient"));
    }

    let instructions = trimmed_non_blank(&draft.instructions);
    if instructions.is_empty() {
        return Err(AppError::validation("recipe needs at least one instruction"));
    }

    let time = RecipeTime::new(
        minutes("prep", &draft.time.prep)?,
        minutes("rise", &draft.time.rise)?,
        minutes("bake", &draft.time.bake)?,
    );

    Ok(Recipe {
        id,
        title: title.to_string(),
        author: author.to_string(),
        difficulty: draft.difficulty,
        time,
        yield_desc: draft.yield_desc.trim().to_string(),
        ingredients,
        instructions,
        tips: trimmed_non_blank(&draft.tips),
    })
}

fn trimmed_non_blank(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, TimeDraft};

    fn draft() -> RecipeDraft {
        RecipeDraft {
            title: "  Weekday Focaccia ".into(),
            author: "Mo".into(),
            difficulty: Difficulty::Beginner,
            time: TimeDraft::minutes(15, 120, 25),
            yield_desc: "1 sheet pan".into(),
            ingredients: vec![
                Ingredient { name: "flour".into(), amount: "500 g".into() },
                Ingredient { name: "  ".into(), amount: "1 tsp".into() },
            ],
            instructions: vec!["Mix.".into(), "   ".into(), " Bake. ".into()],
            tips: vec!["".into()],
        }
    }

    #[test]
    fn username_rules() {
        assert_eq!(normalize_username(" crumb_lover-1 ").unwrap(), "crumb_lover-1");
        assert!(normalize_username("ab").is_err());
        assert!(normalize_username("has space").is_err());
        assert!(normalize_username("émile").is_err());
        assert!(normalize_username("").is_err());
    }

    #[test]
    fn email_rules() {
        assert_eq!(normalize_email(" Baker@Example.COM ").unwrap(), "baker@example.com");
        for bad in ["baker", "baker@", "@example.com", "baker@example", "baker@.com", "baker@example.", "a b@c.de", "a@b@c.de"] {
            assert!(normalize_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn password_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn recipe_is_trimmed_and_filtered() {
        let recipe = normalize_recipe(&draft(), "id-1".into()).unwrap();
        assert_eq!(recipe.title, "Weekday Focaccia");
        assert_eq!(recipe.ingredients.len(), 1);
        assert_eq!(recipe.instructions, vec!["Mix.".to_string(), "Bake.".to_string()]);
        assert!(recipe.tips.is_empty());
        assert_eq!(recipe.time.total, 160);
    }

    #[test]
    fn client_total_is_ignored() {
        let mut d = draft();
        d.time.total = Some(5.into());
        assert_eq!(normalize_recipe(&d, "x".into()).unwrap().time.total, 160);
    }

    #[test]
    fn blank_only_lists_are_rejected() {
        let mut d = draft();
        d.instructions = vec!["  ".into()];
        assert!(matches!(normalize_recipe(&d, "x".into()), Err(AppError::Validation(_))));

        let mut d = draft();
        d.ingredients = vec![Ingredient { name: "salt".into(), amount: "".into() }];
        assert!(matches!(normalize_recipe(&d, "x".into()), Err(AppError::Validation(_))));
    }

    #[test]
    fn negative_and_fractional_minutes_are_rejected() {
        let mut d = draft();
        d.time.rise = (-5).into();
        assert!(matches!(normalize_recipe(&d, "x".into()), Err(AppError::Validation(m)) if m.contains("negative")));

        let mut d = draft();
        d.time.bake = Number::from_f64(12.5).unwrap();
        assert!(matches!(normalize_recipe(&d, "x".into()), Err(AppError::Validation(m)) if m.contains("whole")));
    }

    #[test]
    fn missing_stages_count_as_zero() {
        let time: TimeDraft = serde_json::from_str(r#"{ "bake": 40 }"#).unwrap();
        let mut d = draft();
        d.time = time;
        let recipe = normalize_recipe(&d, "r2".into()).unwrap();
        assert_eq!((recipe.time.prep, recipe.time.rise, recipe.time.bake), (0, 0, 40));
        assert_eq!(recipe.time.total, 40);
    }
}
