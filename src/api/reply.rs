use serde::Serialize;
use serde_json::json;
use warp::{
    http::StatusCode,
    reply::{self, Reply, Response},
};

pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Response {
    reply::with_status(reply::json(body), status).into_response()
}

/// `{"error": message}` with the given status.
pub fn error(status: StatusCode, message: &str) -> Response {
    json(status, &json!({ "error": message }))
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
