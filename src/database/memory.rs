use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::models::drink::{Drink, NewDrink};
use crate::database::repository::DrinkStore;

/// In-process store with the same uniqueness rules as the `drink` table.
/// Used by tests and by `serve --in-memory`.
#[derive(Default)]
pub struct MemoryDrinkStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i32,
    rows: BTreeMap<i32, Drink>,
}

impl Inner {
    fn title_taken(&self, title: &str, except: Option<i32>) -> bool {
        self.rows
            .values()
            .any(|d| d.title == title && Some(d.id) != except)
    }
}

impl MemoryDrinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }
}

#[async_trait]
impl DrinkStore for MemoryDrinkStore {
    async fn list(&self) -> Result<Vec<Drink>, DatabaseError> {
        Ok(self.inner.read().await.rows.values().cloned().collect())
    }

    async fn find(&self, id: i32) -> Result<Option<Drink>, DatabaseError> {
        Ok(self.inner.read().await.rows.get(&id).cloned())
    }

    async fn insert(&self, drink: NewDrink) -> Result<Drink, DatabaseError> {
        let mut inner = self.inner.write().await;
        if inner.title_taken(&drink.title, None) {
            return Err(DatabaseError::Duplicate(drink.title));
        }

        inner.next_id += 1;
        let created = Drink {
            id: inner.next_id,
            title: drink.title,
            recipe: drink.recipe,
        };
        inner.rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, drink: &Drink) -> Result<Drink, DatabaseError> {
        let mut inner = self.inner.write().await;
        if !inner.rows.contains_key(&drink.id) {
            return Err(DatabaseError::NotFound(format!("drink {}", drink.id)));
        }
        if inner.title_taken(&drink.title, Some(drink.id)) {
            return Err(DatabaseError::Duplicate(drink.title.clone()));
        }

        inner.rows.insert(drink.id, drink.clone());
        Ok(drink.clone())
    }

    async fn delete(&self, id: i32) -> Result<bool, DatabaseError> {
        Ok(self.inner.write().await.rows.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
