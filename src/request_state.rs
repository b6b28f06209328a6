use aide::OperationInput;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    RequestPartsExt,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};

use crate::{
    database::{AppState, DatabaseConnection},
    error::{ServiceError, ServiceResult},
    models,
};

/// Per-request extractor holding a pool connection and the session
/// resolved from the bearer token, if any.
pub struct RequestState {
    pub db: DatabaseConnection,
    pub session: Option<models::Session>,
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestState
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let connection = state
            .pool
            .acquire()
            .await
            .map_err(|err| ServiceError::InternalServerError(err.to_string()))?;
        let mut db = DatabaseConnection { connection };

        let session = if let Ok(TypedHeader(Authorization(bearer))) =
            parts.extract::<TypedHeader<Authorization<Bearer>>>().await
        {
            let session_token = bearer.token().to_owned();
            db.get_session_by_session_token(session_token).await?
        } else {
            None
        };

        Ok(Self { db, session })
    }
}

impl OperationInput for RequestState {}

impl RequestState {
    pub fn session_require(&self) -> ServiceResult<models::Session> {
        self.session
            .clone()
            .ok_or(ServiceError::Unauthorized("Missing login!"))
    }

    /// The employee behind the current session.
    pub fn session_require_self(&self) -> ServiceResult<models::Employee> {
        Ok(self.session_require()?.employee)
    }

    /// Require a manager (or admin) session.
    pub fn session_require_manager(&self) -> ServiceResult<models::Employee> {
        let employee = self.session_require_self()?;
        if employee.is_manager() {
            Ok(employee)
        } else {
            Err(ServiceError::Forbidden("Missing permissions!"))
        }
    }

    /// Require a manager session or the session of the employee with the
    /// given id.
    pub fn session_require_manager_or_self(&self, id: u64) -> ServiceResult<models::Employee> {
        let employee = self.session_require_self()?;
        if employee.is_manager() || employee.id == id {
            Ok(employee)
        } else {
            Err(ServiceError::Forbidden("Missing permissions!"))
        }
    }

    /// Require exactly the session of the employee with the given id. Used
    /// for self-service operations like redemption cancel/edit that even a
    /// manager must not perform on behalf of someone else.
    pub fn session_require_exact(&self, id: u64) -> ServiceResult<models::Employee> {
        let employee = self.session_require_self()?;
        if employee.id == id {
            Ok(employee)
        } else {
            Err(ServiceError::Forbidden("Missing permissions!"))
        }
    }
}
