//! In-memory stand-in for the iCE Server REST API.
//!
//! Serves the two routes the client talks to, plus a read-back route so tests
//! can check what was stored. Validation mimics the server's error envelope:
//! `_error` with a message and `_issues` keyed by field.

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{
    extract::{ConnectInfo, Path, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub const NULL_VALUE_ISSUE: &str = "null value not allowed";

/// Body of a successful store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Created {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "_status")]
    pub status: String,
}

/// Body of a rejected store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rejection {
    #[serde(rename = "_status")]
    pub status: String,
    #[serde(rename = "_error")]
    pub error: ErrorBody,
    #[serde(rename = "_issues", default, skip_serializing_if = "Map::is_empty")]
    pub issues: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Map<String, Value>>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/v2/my_ip", get(my_ip))
        .route("/v2/instances", post(store_instance))
        .route("/v2/instances/{id}", get(get_instance))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(
        listener,
        app().into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

/// First `X-Forwarded-For` hop if present, otherwise the peer address.
async fn my_ip(request: Request) -> Response {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    match forwarded.or(peer) {
        Some(ip) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("{ip}\n"),
        )
            .into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "peer address unavailable\n").into_response(),
    }
}

async fn store_instance(State(db): State<Db>, Json(input): Json<Value>) -> Response {
    let Value::Object(fields) = input else {
        return reject("Instance must be a JSON object", Map::new());
    };

    let issues: Map<String, Value> = fields
        .iter()
        .filter(|(_, value)| value.is_null())
        .map(|(field, _)| (field.clone(), Value::from(NULL_VALUE_ISSUE)))
        .collect();
    if !issues.is_empty() {
        return reject(
            "Insertion failure: 1 document(s) contain(s) error(s)",
            issues,
        );
    }

    let id = Uuid::new_v4();
    db.write().await.insert(id, fields);
    info!(%id, "stored instance");

    (
        StatusCode::CREATED,
        Json(Created {
            id,
            status: "OK".to_string(),
        }),
    )
        .into_response()
}

async fn get_instance(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<Map<String, Value>>, StatusCode> {
    let instances = db.read().await;
    let mut record = instances.get(&id).cloned().ok_or(StatusCode::NOT_FOUND)?;
    record.insert("_id".to_string(), Value::from(id.to_string()));
    Ok(Json(record))
}

fn reject(message: &str, issues: Map<String, Value>) -> Response {
    let status = StatusCode::UNPROCESSABLE_ENTITY;
    let body = Rejection {
        status: "ERR".to_string(),
        error: ErrorBody {
            code: status.as_u16(),
            message: message.to_string(),
        },
        issues,
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_uses_underscore_field_names() {
        let created = Created {
            id: Uuid::nil(),
            status: "OK".to_string(),
        };
        let json = serde_json::to_value(&created).unwrap();
        assert_eq!(json["_id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["_status"], "OK");
    }

    #[test]
    fn rejection_omits_empty_issues() {
        let rejection = Rejection {
            status: "ERR".to_string(),
            error: ErrorBody {
                code: 422,
                message: "bad".to_string(),
            },
            issues: Map::new(),
        };
        let json = serde_json::to_value(&rejection).unwrap();
        assert_eq!(json["_error"]["message"], "bad");
        assert!(json.get("_issues").is_none());
    }

    #[test]
    fn rejection_reads_back_issue_map() {
        let rejection: Rejection = serde_json::from_str(
            r#"{"_status":"ERR","_error":{"code":422,"message":"m"},"_issues":{"name":"null value not allowed"}}"#,
        )
        .unwrap();
        assert_eq!(rejection.issues["name"], NULL_VALUE_ISSUE);
    }
}
