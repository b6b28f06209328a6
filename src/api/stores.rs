use aide::axum::routing::get_with;
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::Json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::database::AppState;
use crate::error::ServiceResult;
use crate::models;
use crate::request_state::RequestState;

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/stores",
            get_with(list_stores, list_stores_docs).post_with(create_store, create_store_docs),
        )
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct StoreDto {
    pub id: u64,
    pub name: String,
}

impl From<&models::Store> for StoreDto {
    fn from(value: &models::Store) -> Self {
        Self {
            id: value.id.to_owned(),
            name: value.name.to_owned(),
        }
    }
}

pub async fn list_stores(mut state: RequestState) -> ServiceResult<Json<Vec<StoreDto>>> {
    state.session_require()?;

    let stores = state.db.get_all_stores().await?;
    Ok(Json(stores.iter().map(|s| s.into()).collect()))
}

fn list_stores_docs(op: TransformOperation) -> TransformOperation {
    op.description("List all stores.")
        .tag("stores")
        .response::<200, Json<Vec<StoreDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .security_requirement_scopes("SessionToken", ["self"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct SaveStoreDto {
    pub name: String,
}

async fn create_store(
    mut state: RequestState,
    form: Json<SaveStoreDto>,
) -> ServiceResult<Json<StoreDto>> {
    state.session_require_manager()?;

    let store = state.db.create_store(form.0.name).await?;
    Ok(Json(StoreDto::from(&store)))
}

fn create_store_docs(op: TransformOperation) -> TransformOperation {
    op.description("Create a new store.")
        .tag("stores")
        .response::<200, Json<StoreDto>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}
