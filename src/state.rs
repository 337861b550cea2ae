use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::TokenVerifier;
use crate::database::DrinkStore;

/// Everything a handler may touch, built once in `main` and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DrinkStore>,
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(store: Arc<dyn DrinkStore>, verifier: Arc<TokenVerifier>) -> Self {
        Self { store, verifier }
    }
}

impl FromRef<AppState> for Arc<TokenVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}

impl FromRef<AppState> for Arc<dyn DrinkStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}
