use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

use crate::database::manager::DatabaseError;

pub const TITLE_MAX_LEN: usize = 80;

/// One line of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub color: String,
    pub parts: u32,
}

/// Ingredient list. Accepts either a single ingredient object or an array
/// on input and always serializes as an array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Recipe(pub Vec<Ingredient>);

impl<'de> Deserialize<'de> for Recipe {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            Many(Vec<Ingredient>),
            One(Ingredient),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::Many(list) => Recipe(list),
            OneOrMany::One(item) => Recipe(vec![item]),
        })
    }
}

impl Recipe {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.0
    }

    /// Column encoding: the recipe is kept as JSON text.
    pub fn to_column(&self) -> Result<String, DatabaseError> {
        serde_json::to_string(self).map_err(|e| DatabaseError::Corrupt(e.to_string()))
    }

    pub fn from_column(raw: &str) -> Result<Self, DatabaseError> {
        serde_json::from_str(raw).map_err(|e| DatabaseError::Corrupt(e.to_string()))
    }
}

/// A persisted drink. Serializes as the long form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Drink {
    pub id: i32,
    pub title: String,
    pub recipe: Recipe,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortIngredient {
    pub color: String,
    pub parts: u32,
}

/// Public projection: ingredient names are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortDrink {
    pub id: i32,
    pub title: String,
    pub recipe: Vec<ShortIngredient>,
}

impl Drink {
    pub fn short(&self) -> ShortDrink {
        ShortDrink {
            id: self.id,
            title: self.title.clone(),
            recipe: self
                .recipe
                .ingredients()
                .iter()
                .map(|i| ShortIngredient {
                    color: i.color.clone(),
                    parts: i.parts,
                })
                .collect(),
        }
    }

    pub fn long(&self) -> Drink {
        self.clone()
    }

    /// Overwrites only the fields present in `patch`. An explicit `null`
    /// is an error and leaves the drink untouched.
    pub fn apply(&mut self, patch: DrinkPatch) -> Result<(), DrinkError> {
        let title = match patch.title {
            Some(None) => return Err(DrinkError::NullField("title")),
            other => other.flatten(),
        };
        let recipe = match patch.recipe {
            Some(None) => return Err(DrinkError::NullField("recipe")),
            other => other.flatten(),
        };

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(recipe) = recipe {
            self.recipe = recipe;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), DrinkError> {
        validate_fields(&self.title, &self.recipe)
    }
}

/// Insert payload; the id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDrink {
    pub title: String,
    pub recipe: Recipe,
}

impl NewDrink {
    pub fn new(title: impl Into<String>, recipe: Recipe) -> Result<Self, DrinkError> {
        let title = title.into();
        validate_fields(&title, &recipe)?;
        Ok(Self { title, recipe })
    }
}

/// Partial update body. The outer `Option` is presence, the inner one
/// is `null`; absent fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrinkPatch {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub recipe: Option<Option<Recipe>>,
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DrinkError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("title must be at most 80 characters")]
    TitleTooLong,

    #[error("recipe must contain at least one ingredient")]
    EmptyRecipe,

    #[error("{0} must not be null")]
    NullField(&'static str),
}

fn validate_fields(title: &str, recipe: &Recipe) -> Result<(), DrinkError> {
    if title.trim().is_empty() {
        return Err(DrinkError::EmptyTitle);
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(DrinkError::TitleTooLong);
    }
    if recipe.is_empty() {
        return Err(DrinkError::EmptyRecipe);
    }
    Ok(())
}

/// Raw `drink` table row.
#[derive(Debug, Clone, FromRow)]
pub struct DrinkRow {
    pub id: i32,
    pub title: String,
    pub recipe: String,
}

impl TryFrom<DrinkRow> for Drink {
    type Error = DatabaseError;

    fn try_from(row: DrinkRow) -> Result<Self, Self::Error> {
        Ok(Drink {
            id: row.id,
            title: row.title,
            recipe: Recipe::from_column(&row.recipe)?,
        })
    }
}
