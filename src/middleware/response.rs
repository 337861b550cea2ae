use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// `{success: true, drinks: [...]}`
#[derive(Debug, Serialize)]
pub struct DrinksEnvelope<T: Serialize> {
    pub success: bool,
    pub drinks: Vec<T>,
}

impl<T: Serialize> DrinksEnvelope<T> {
    pub fn new(drinks: Vec<T>) -> Self {
        Self { success: true, drinks }
    }

    pub fn single(drink: T) -> Self {
        Self::new(vec![drink])
    }
}

/// `{success: true, delete: <id>}`
#[derive(Debug, Serialize)]
pub struct DeletedEnvelope {
    pub success: bool,
    pub delete: i32,
}

impl DeletedEnvelope {
    pub fn new(id: i32) -> Self {
        Self { success: true, delete: id }
    }
}

impl<T: Serialize> IntoResponse for DrinksEnvelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

impl IntoResponse for DeletedEnvelope {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

pub type ApiResult<T> = Result<T, crate::error::ApiError>;
