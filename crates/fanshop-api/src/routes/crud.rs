//! Generic list/create/get/update/delete handlers shared by every record collection.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, MethodRouter},
    Json, Router,
};
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};
use fanshop_persist::{Page, Persistence, RecordStore};
use fanshop_types::{
    new_id, AdGroup, ApiToken, Customer, Fanpage, OpenAIConfig, Order, OtherCost, Product, Quote,
    Record,
};

/// A record type together with the collection that holds it
pub trait Stored: Record {
    fn store(persist: &dyn Persistence) -> &dyn RecordStore<Self>;
}

macro_rules! stored {
    ($($ty:ty => $accessor:ident),* $(,)?) => {
        $(
            impl Stored for $ty {
                fn store(persist: &dyn Persistence) -> &dyn RecordStore<Self> {
                    persist.$accessor()
                }
            }
        )*
    };
}

stored! {
    Fanpage => fanpages,
    Product => products,
    Customer => customers,
    Quote => quotes,
    AdGroup => ad_groups,
    OtherCost => other_costs,
    Order => orders,
    OpenAIConfig => openai_configs,
    ApiToken => api_tokens,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

/// Full CRUD routes for `T` under `path`
pub fn routes<T: Stored>(path: &str) -> Router<Arc<AppState>> {
    routes_with_create::<T>(path, post(create::<T>))
}

/// CRUD routes for `T` with a collection-specific create handler
pub fn routes_with_create<T: Stored>(
    path: &str,
    create: MethodRouter<Arc<AppState>>,
) -> Router<Arc<AppState>> {
    Router::new()
        .route(path, create.get(list::<T>))
        .route(&item_path(path), get(get_one::<T>).put(update::<T>).delete(remove::<T>))
}

fn item_path(path: &str) -> String {
    format!("{}/:id", path)
}

/// Decode a request body, reporting failures as 400 instead of axum's 422
pub(crate) fn parse_body<T: DeserializeOwned>(body: Value) -> ApiResult<T> {
    serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Assign a fresh identity, validate and store a client-built record
pub(crate) async fn insert_new<T: Stored>(state: &AppState, mut record: T) -> ApiResult<T> {
    let now = Utc::now();
    record.assign_identity(new_id(), now, now);
    record.validate()?;

    let created = T::store(state.persist.as_ref()).insert(record).await?;
    tracing::info!(kind = T::KIND, id = %created.id(), "Record created");
    Ok(created)
}

pub async fn list<T: Stored>(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Vec<T>>> {
    let page = Page::new(query.limit, query.skip);
    let records = T::store(state.persist.as_ref()).list(page).await?;
    Ok(Json(records))
}

pub async fn create<T: Stored>(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<T>)> {
    let record: T = parse_body(body)?;
    let created = insert_new(&state, record).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_one<T: Stored>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<T>> {
    T::store(state.persist.as_ref())
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(T::KIND, id))
}

/// Replace a record. Identity, creation time and server-managed fields are
/// kept from the stored version whatever the body says.
pub async fn update<T: Stored>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<T>> {
    let store = T::store(state.persist.as_ref());
    let existing = store
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(T::KIND, id.clone()))?;

    let mut record: T = parse_body(body)?;
    record.keep_server_fields(&existing);
    record.assign_identity(id.clone(), existing.created_at(), Utc::now());
    record.validate()?;

    let updated = store
        .replace(record)
        .await?
        .ok_or_else(|| ApiError::not_found(T::KIND, id))?;
    Ok(Json(updated))
}

pub async fn remove<T: Stored>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if T::store(state.persist.as_ref()).delete(&id).await? {
        tracing::info!(kind = T::KIND, id = %id, "Record deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(T::KIND, id))
    }
}
