use std::sync::Arc;

use aide::{
    axum::{
        routing::{get, get_with},
        ApiRouter, IntoApiResponse,
    },
    openapi::{OpenApi, Tag},
    redoc::Redoc,
    transform::TransformOpenApi,
};
use axum::{response::IntoResponse, Extension, Json};

pub fn api_docs(api: TransformOpenApi) -> TransformOpenApi {
    api.title("incentive-points-server")
        .summary("Employee incentive program backend")
        .description(include_str!("../README.md"))
        .tag(Tag {
            name: "auth".into(),
            description: Some("Session Management".into()),
            ..Default::default()
        })
        .tag(Tag {
            name: "employees".into(),
            description: Some("Employee Management".into()),
            ..Default::default()
        })
        .tag(Tag {
            name: "event_types".into(),
            description: Some("Event Type Management".into()),
            ..Default::default()
        })
        .tag(Tag {
            name: "events".into(),
            description: Some("Points Ledger".into()),
            ..Default::default()
        })
        .tag(Tag {
            name: "requests".into(),
            description: Some("Event Requests".into()),
            ..Default::default()
        })
        .tag(Tag {
            name: "rewards".into(),
            description: Some("Reward Catalog".into()),
            ..Default::default()
        })
        .tag(Tag {
            name: "redemptions".into(),
            description: Some("Reward Redemptions".into()),
            ..Default::default()
        })
        .tag(Tag {
            name: "revenue".into(),
            description: Some("Revenue Tracking".into()),
            ..Default::default()
        })
        .tag(Tag {
            name: "kudos".into(),
            description: Some("Peer Kudos".into()),
            ..Default::default()
        })
        .tag(Tag {
            name: "bonuses".into(),
            description: Some("Monthly Bonuses".into()),
            ..Default::default()
        })
        .tag(Tag {
            name: "notifications".into(),
            description: Some("Employee Notifications".into()),
            ..Default::default()
        })
        .tag(Tag {
            name: "stores".into(),
            description: Some("Store Management".into()),
            ..Default::default()
        })
        .security_scheme(
            "SessionToken",
            aide::openapi::SecurityScheme::Http {
                scheme: "bearer".into(),
                bearer_format: Some("SessionToken".into()),
                description: Some("A session token issued by the login endpoint.".into()),
                extensions: Default::default(),
            },
        )
}

pub fn docs_routes() -> ApiRouter {
    aide::gen::infer_responses(true);

    let router = ApiRouter::new()
        .api_route_with(
            "/",
            get_with(
                Redoc::new("/docs/api.json")
                    .with_title("incentive-points")
                    .axum_handler(),
                |op| op.description("This documentation page."),
            ),
            |p| p.security_requirement("SessionToken"),
        )
        .route("/api.json", get(serve_docs));

    // Response inference is incorrect for the api routes.
    aide::gen::infer_responses(false);

    router
}

async fn serve_docs(Extension(api): Extension<Arc<OpenApi>>) -> impl IntoApiResponse {
    Json(api).into_response()
}
