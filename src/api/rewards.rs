use aide::axum::routing::get_with;
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::Json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::database::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::models;
use crate::request_state::RequestState;

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/reward/:id",
            get_with(get_reward, get_reward_docs)
                .put_with(update_reward, update_reward_docs)
                .delete_with(delete_reward, delete_reward_docs),
        )
        .api_route(
            "/rewards",
            get_with(list_rewards, list_rewards_docs).post_with(create_reward, create_reward_docs),
        )
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct RewardDto {
    pub id: u64,
    pub name: String,
    pub points_cost: i32,
    pub stock: i32,
    pub is_enabled: bool,
}

impl From<&models::Reward> for RewardDto {
    fn from(value: &models::Reward) -> Self {
        Self {
            id: value.id.to_owned(),
            name: value.name.to_owned(),
            points_cost: value.points_cost,
            stock: value.stock,
            is_enabled: value.is_enabled,
        }
    }
}

pub async fn list_rewards(mut state: RequestState) -> ServiceResult<Json<Vec<RewardDto>>> {
    state.session_require()?;

    let rewards = state.db.get_all_rewards().await?;
    Ok(Json(rewards.iter().map(|r| r.into()).collect()))
}

fn list_rewards_docs(op: TransformOperation) -> TransformOperation {
    op.description("List the reward catalog.")
        .tag("rewards")
        .response::<200, Json<Vec<RewardDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .security_requirement_scopes("SessionToken", ["self"])
}

pub async fn get_reward(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<RewardDto>> {
    state.session_require()?;

    let reward = state.db.get_reward_by_id(id).await?;

    if let Some(reward) = reward {
        return Ok(Json(RewardDto::from(&reward)));
    }

    Err(ServiceError::NotFound)
}

fn get_reward_docs(op: TransformOperation) -> TransformOperation {
    op.description("Get a reward by id.")
        .tag("rewards")
        .response::<200, Json<RewardDto>>()
        .response_with::<404, (), _>(|res| res.description("The requested reward does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .security_requirement_scopes("SessionToken", ["self"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct SaveRewardDto {
    pub name: String,
    pub points_cost: i32,
    pub stock: i32,
    pub is_enabled: bool,
}

async fn create_reward(
    mut state: RequestState,
    form: Json<SaveRewardDto>,
) -> ServiceResult<Json<RewardDto>> {
    state.session_require_manager()?;

    let form = form.0;

    let reward = models::Reward {
        id: 0,
        name: form.name,
        points_cost: form.points_cost,
        stock: form.stock,
        is_enabled: form.is_enabled,
    };

    let reward = state.db.store_reward(reward).await?;
    Ok(Json(RewardDto::from(&reward)))
}

fn create_reward_docs(op: TransformOperation) -> TransformOperation {
    op.description("Create a new reward.")
        .tag("rewards")
        .response::<200, Json<RewardDto>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}

async fn update_reward(
    mut state: RequestState,
    Path(id): Path<u64>,
    form: Json<SaveRewardDto>,
) -> ServiceResult<Json<RewardDto>> {
    state.session_require_manager()?;

    let form = form.0;
    let reward = state.db.get_reward_by_id(id).await?;

    if let Some(mut reward) = reward {
        reward.name = form.name;
        reward.points_cost = form.points_cost;
        reward.stock = form.stock;
        reward.is_enabled = form.is_enabled;

        let reward = state.db.store_reward(reward).await?;
        return Ok(Json(RewardDto::from(&reward)));
    }

    Err(ServiceError::NotFound)
}

fn update_reward_docs(op: TransformOperation) -> TransformOperation {
    op.description("Update an existing reward.")
        .tag("rewards")
        .response::<200, Json<RewardDto>>()
        .response_with::<404, (), _>(|res| res.description("The requested reward does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}

async fn delete_reward(mut state: RequestState, Path(id): Path<u64>) -> ServiceResult<StatusCode> {
    state.session_require_manager()?;

    state.db.delete_reward(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn delete_reward_docs(op: TransformOperation) -> TransformOperation {
    op.description("Delete an existing reward.")
        .tag("rewards")
        .response_with::<204, (), _>(|res| res.description("The reward was successfully deleted!"))
        .response_with::<409, (), _>(|res| {
            res.description("The reward is still referenced by redemptions!")
        })
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}
