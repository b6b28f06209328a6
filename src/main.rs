use std::sync::Arc;

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::Extension;
use tower_http::cors::CorsLayer;

use crate::database::AppState;
use crate::error::ServiceResult;

pub mod api;
pub mod database;
pub mod docs;
pub mod env;
pub mod error;
pub mod models;
pub mod request_state;

pub const SESSION_COOKIE_NAME: &str = "session_token";

#[tokio::main]
async fn main() {
    let result = init().await;

    let exit_code = match result {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn init() -> ServiceResult<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    aide::gen::on_error(|error| {
        log::error!("{error}");
    });
    aide::gen::extract_schemas(true);

    let app_state = AppState::connect(env::DATABASE_URL.as_str()).await;

    let mut open_api = OpenApi::default();

    let router = ApiRouter::new()
        .nest_api_service("/api/v1", api::router(app_state))
        .nest_api_service("/docs", docs::docs_routes())
        .finish_api_with(&mut open_api, docs::api_docs)
        .layer(Extension(Arc::new(open_api)))
        .layer(CorsLayer::permissive());

    let address = format!("{}:{}", env::API_HOST.as_str(), env::API_PORT.as_str());
    log::info!("Starting http server at {}", address);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| error::ServiceError::InternalServerError(e.to_string()))?;
    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|e| error::ServiceError::InternalServerError(e.to_string()))?;

    Ok(())
}
