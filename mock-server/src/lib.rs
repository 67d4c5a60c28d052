//! In-memory contacts API used by the core integration tests.
//!
//! Collections are served in a `{"results", "next", "count"}` envelope with
//! offset/limit pagination and an optional name filter. Validation failures
//! answer 422 with `{"errors": {field: [messages]}}`. The `/flaky/contacts`
//! route fails with 503 a fixed number of times before succeeding, for
//! retry tests.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Contact {
    pub id: u64,
    pub name: String,
    pub email: Option<String>,
    pub age: Option<i64>,
    pub signup_date: Option<String>,
    pub active: bool,
}

#[derive(Deserialize)]
pub struct ContactInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub signup_date: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    pub name: Option<String>,
    pub id__in: Option<String>,
}

#[derive(Default)]
pub struct Store {
    contacts: BTreeMap<u64, Contact>,
    next_id: u64,
}

#[derive(Clone)]
pub struct AppState {
    db: Arc<RwLock<Store>>,
    flaky_remaining: Arc<AtomicU32>,
}

/// Number of 503s `/flaky/contacts` serves before it starts succeeding.
pub const FLAKY_FAILURES: u32 = 2;

pub fn app() -> Router {
    app_with_flaky(FLAKY_FAILURES)
}

pub fn app_with_flaky(failures: u32) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Store::default())),
        flaky_remaining: Arc::new(AtomicU32::new(failures)),
    };
    Router::new()
        .route(
            "/contacts",
            get(list_contacts)
                .post(create_contact)
                .delete(delete_contacts),
        )
        .route(
            "/contacts/{id}",
            get(get_contact)
                .put(replace_contact)
                .patch(patch_contact)
                .delete(delete_contact),
        )
        .route("/flaky/contacts", get(flaky_contacts))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn validation_error(field: &str, message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "errors": { field: [message] } })),
    )
}

fn require_name(name: &Option<String>) -> Result<String, (StatusCode, Json<Value>)> {
    match name {
        Some(n) if !n.trim().is_empty() => Ok(n.clone()),
        _ => Err(validation_error("name", "must not be empty")),
    }
}

async fn list_contacts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Value> {
    let store = state.db.read().await;
    let filtered: Vec<&Contact> = store
        .contacts
        .values()
        .filter(|c| params.name.as_ref().is_none_or(|n| &c.name == n))
        .collect();

    let total = filtered.len();
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(total);
    let page: Vec<&Contact> = filtered.into_iter().skip(offset).take(limit).collect();

    let next = if offset + page.len() < total {
        Some(format!(
            "/contacts?offset={}&limit={limit}",
            offset + page.len()
        ))
    } else {
        None
    };

    Json(json!({ "results": page, "next": next, "count": total }))
}

async fn create_contact(
    State(state): State<AppState>,
    Json(input): Json<ContactInput>,
) -> Result<(StatusCode, Json<Contact>), (StatusCode, Json<Value>)> {
    let name = require_name(&input.name)?;
    let mut store = state.db.write().await;
    store.next_id += 1;
    let contact = Contact {
        id: store.next_id,
        name,
        email: input.email,
        age: input.age,
        signup_date: input.signup_date,
        active: input.active.unwrap_or(true),
    };
    store.contacts.insert(contact.id, contact.clone());
    Ok((StatusCode::CREATED, Json(contact)))
}

async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Contact>, StatusCode> {
    let store = state.db.read().await;
    store
        .contacts
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn replace_contact(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(input): Json<ContactInput>,
) -> Result<Json<Contact>, (StatusCode, Json<Value>)> {
    let name = require_name(&input.name)?;
    let mut store = state.db.write().await;
    if !store.contacts.contains_key(&id) {
        return Err((StatusCode::NOT_FOUND, Json(Value::Null)));
    }
    let contact = Contact {
        id,
        name,
        email: input.email,
        age: input.age,
        signup_date: input.signup_date,
        active: input.active.unwrap_or(true),
    };
    store.contacts.insert(id, contact.clone());
    Ok(Json(contact))
}

/// Partial merge. The raw JSON body distinguishes a field sent as `null`
/// (clears the value) from a field not sent at all (left unchanged).
async fn patch_contact(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(patch): Json<Value>,
) -> Result<Json<Contact>, (StatusCode, Json<Value>)> {
    let Value::Object(patch) = patch else {
        return Err(validation_error("body", "expected an object"));
    };
    let mut store = state.db.write().await;
    let contact = store
        .contacts
        .get_mut(&id)
        .ok_or((StatusCode::NOT_FOUND, Json(Value::Null)))?;

    if let Some(raw) = patch.get("name") {
        match raw.as_str() {
            Some(n) if !n.trim().is_empty() => contact.name = n.to_string(),
            _ => return Err(validation_error("name", "must not be empty")),
        }
    }
    if let Some(raw) = patch.get("email") {
        contact.email = raw.as_str().map(str::to_string);
    }
    if let Some(raw) = patch.get("age") {
        contact.age = raw.as_i64();
    }
    if let Some(raw) = patch.get("signup_date") {
        contact.signup_date = raw.as_str().map(str::to_string);
    }
    if let Some(raw) = patch.get("active") {
        if let Some(active) = raw.as_bool() {
            contact.active = active;
        }
    }
    Ok(Json(contact.clone()))
}

async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, StatusCode> {
    let mut store = state.db.write().await;
    store
        .contacts
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Bulk delete addressed as `DELETE /contacts?id__in=1,2,3`.
async fn delete_contacts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let Some(ids) = params.id__in else {
        return Err(validation_error("id__in", "required for bulk delete"));
    };
    let mut parsed = Vec::new();
    for part in ids.split(',') {
        let id: u64 = part
            .trim()
            .parse()
            .map_err(|_| validation_error("id__in", "ids must be integers"))?;
        parsed.push(id);
    }
    let mut store = state.db.write().await;
    for id in parsed {
        store.contacts.remove(&id);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn flaky_contacts(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let decremented = state
        .flaky_remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    if decremented.is_ok() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(json!({ "results": [], "next": null, "count": 0 })))
}
