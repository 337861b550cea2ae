use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, State},
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::{DeleteDrinks, GetDrinks, GetDrinksDetail, PatchDrinks, PostDrinks};
use crate::database::models::{Drink, DrinkPatch, NewDrink, Recipe, ShortDrink};
use crate::database::DrinkStore;
use crate::error::ApiError;
use crate::middleware::{ApiResult, Authorized, DeletedEnvelope, DrinksEnvelope};

#[derive(Debug, Deserialize)]
struct CreateDrink {
    title: Option<String>,
    recipe: Option<Recipe>,
}

/// Non-numeric ids can never match a row.
fn drink_id(path: Result<Path<i32>, PathRejection>) -> Result<i32, ApiError> {
    path.map(|Path(id)| id).map_err(|rejection| {
        debug!("Unusable drink id: {}", rejection);
        ApiError::not_found()
    })
}

/// GET /drinks - every drink in short form
pub async fn list(
    _auth: Authorized<GetDrinks>,
    State(store): State<Arc<dyn DrinkStore>>,
) -> ApiResult<DrinksEnvelope<ShortDrink>> {
    let drinks = store.list().await?;
    Ok(DrinksEnvelope::new(drinks.iter().map(Drink::short).collect()))
}

/// GET /drinks-detail - every drink in long form
pub async fn list_detail(
    _auth: Authorized<GetDrinksDetail>,
    State(store): State<Arc<dyn DrinkStore>>,
) -> ApiResult<DrinksEnvelope<Drink>> {
    let drinks = store.list().await?;
    Ok(DrinksEnvelope::new(drinks.iter().map(Drink::long).collect()))
}

/// POST /drinks - create a drink from `{title, recipe}`
pub async fn create(
    auth: Authorized<PostDrinks>,
    State(store): State<Arc<dyn DrinkStore>>,
    body: Bytes,
) -> ApiResult<DrinksEnvelope<Drink>> {
    let payload: CreateDrink = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))?;

    let (Some(title), Some(recipe)) = (payload.title, payload.recipe) else {
        return Err(ApiError::bad_request("Title and recipe are required."));
    };
    let new_drink = NewDrink::new(title, recipe).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let created = store.insert(new_drink).await?;

    info!(
        "Drink {} '{}' created by {}",
        created.id,
        created.title,
        auth.claims.sub.as_deref().unwrap_or("unknown")
    );
    Ok(DrinksEnvelope::single(created.long()))
}

/// PATCH /drinks/:id - change title and/or recipe
///
/// Anything that goes wrong after the drink was found is a 422.
pub async fn update(
    auth: Authorized<PatchDrinks>,
    State(store): State<Arc<dyn DrinkStore>>,
    id: Result<Path<i32>, PathRejection>,
    body: Bytes,
) -> ApiResult<DrinksEnvelope<Drink>> {
    let id = drink_id(id)?;

    let mut drink = store.find(id).await?.ok_or_else(ApiError::not_found)?;

    let patch: DrinkPatch = serde_json::from_slice(&body).map_err(|e| {
        debug!("Rejected patch for drink {}: {}", id, e);
        ApiError::unprocessable()
    })?;

    drink.apply(patch).and_then(|()| drink.validate()).map_err(|e| {
        debug!("Rejected patch for drink {}: {}", id, e);
        ApiError::unprocessable()
    })?;

    let updated = store.update(&drink).await.map_err(|e| {
        warn!("Failed to update drink {}: {}", id, e);
        ApiError::unprocessable()
    })?;

    info!(
        "Drink {} updated by {}",
        updated.id,
        auth.claims.sub.as_deref().unwrap_or("unknown")
    );
    Ok(DrinksEnvelope::single(updated.long()))
}

/// DELETE /drinks/:id
pub async fn delete(
    auth: Authorized<DeleteDrinks>,
    State(store): State<Arc<dyn DrinkStore>>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<DeletedEnvelope> {
    let id = drink_id(id)?;

    let removed = store.delete(id).await?;
    if !removed {
        return Err(ApiError::not_found());
    }

    info!(
        "Drink {} deleted by {}",
        id,
        auth.claims.sub.as_deref().unwrap_or("unknown")
    );
    Ok(DeletedEnvelope::new(id))
}
