use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::drink::{Drink, DrinkRow, NewDrink};

/// Persistence seam for drinks. Handlers only ever see this trait.
#[async_trait]
pub trait DrinkStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Drink>, DatabaseError>;

    async fn find(&self, id: i32) -> Result<Option<Drink>, DatabaseError>;

    async fn insert(&self, drink: NewDrink) -> Result<Drink, DatabaseError>;

    /// Writes every field of `drink` back to the row with the same id.
    async fn update(&self, drink: &Drink) -> Result<Drink, DatabaseError>;

    /// Returns `false` when no row had that id.
    async fn delete(&self, id: i32) -> Result<bool, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}

/// `drink` table in Postgres.
#[derive(Clone)]
pub struct PgDrinkStore {
    pool: PgPool,
}

impl PgDrinkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DrinkStore for PgDrinkStore {
    async fn list(&self) -> Result<Vec<Drink>, DatabaseError> {
        let rows = sqlx::query_as::<_, DrinkRow>("SELECT id, title, recipe FROM drink ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Drink::try_from).collect()
    }

    async fn find(&self, id: i32) -> Result<Option<Drink>, DatabaseError> {
        let row = sqlx::query_as::<_, DrinkRow>("SELECT id, title, recipe FROM drink WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Drink::try_from).transpose()
    }

    async fn insert(&self, drink: NewDrink) -> Result<Drink, DatabaseError> {
        let recipe = drink.recipe.to_column()?;

        let row = sqlx::query_as::<_, DrinkRow>(
            "INSERT INTO drink (title, recipe) VALUES ($1, $2) RETURNING id, title, recipe",
        )
        .bind(&drink.title)
        .bind(&recipe)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, &drink.title))?;

        Drink::try_from(row)
    }

    async fn update(&self, drink: &Drink) -> Result<Drink, DatabaseError> {
        let recipe = drink.recipe.to_column()?;

        let row = sqlx::query_as::<_, DrinkRow>(
            "UPDATE drink SET title = $2, recipe = $3 WHERE id = $1 RETURNING id, title, recipe",
        )
        .bind(drink.id)
        .bind(&drink.title)
        .bind(&recipe)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, &drink.title))?;

        match row {
            Some(row) => Drink::try_from(row),
            None => Err(DatabaseError::NotFound(format!("drink {}", drink.id))),
        }
    }

    async fn delete(&self, id: i32) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM drink WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
