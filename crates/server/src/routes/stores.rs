use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use service::{errors::ServiceError, storage::Storage};
use tracing::debug;

use crate::errors::ApiError;
use crate::routes::ServerState;

/// Body of every store operation. Missing fields default to empty.
#[derive(Debug, Default, Deserialize)]
pub struct StoreRequest {
    #[serde(default, alias = "credential")]
    pub pass: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub body: Option<Value>,
}

fn payload(body: Option<Value>) -> Result<Storage, ServiceError> {
    match body {
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(ServiceError::validation("body must be a JSON object")),
        None => Err(ServiceError::validation("body is required")),
    }
}

/// `POST /:method` with `{ "pass", "name", "body" }`.
/// A body that is not JSON is handled as an empty request.
pub async fn dispatch(
    State(state): State<ServerState>,
    Path(method): Path<String>,
    request: Option<Json<StoreRequest>>,
) -> Result<Response, ApiError> {
    let StoreRequest { pass, name, body } = request.map(|Json(r)| r).unwrap_or_default();
    debug!(%method, name = %name, "store operation");
    let repo = state.repo.clone();

    let response = match method.as_str() {
        "create" => {
            repo.create(&pass, &name).await?;
            format!("DB {name} is created").into_response()
        }
        "delete" => {
            repo.delete(&pass, &name).await?;
            format!("DB {name} is deleted").into_response()
        }
        "update" => {
            repo.update(&pass, &name, payload(body)?).await?;
            format!("DB {name} is updated").into_response()
        }
        "select" => Json(repo.select(&pass, &name).await?).into_response(),
        "append" => {
            repo.append(&pass, &name, payload(body)?).await?;
            format!("DB {name} is update content").into_response()
        }
        _ => return Err(ApiError::UnknownMethod(method)),
    };
    Ok(response)
}
