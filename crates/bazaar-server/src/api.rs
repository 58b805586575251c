use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, HeaderMap, Method, StatusCode},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use bazaar_market::{
    Actor, Category, CategoryId, Feed, Item, ItemId, ItemPatch, Market, NewItem, Pricing,
    Profile, Transaction, TransactionId, TransactionStatus,
};

use crate::config::{ServerConfig, StoreBackend};
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub market: Market,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            patch(rename_category).delete(delete_category),
        )
        .route(
            "/categories/:id/items",
            get(list_category_items).post(create_item),
        )
        .route("/items/:id", patch(update_item).delete(delete_item))
        .route("/items/:id/purchase", post(start_transaction))
        .route("/transactions/:id/complete", post(complete_transaction))
        .route("/me/items", get(my_items))
        .route("/me/transactions", get(my_transactions))
        .route("/me/profile", put(save_profile))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

const USER_ID_HEADER: &str = "x-user-id";
const USER_NAME_HEADER: &str = "x-user-name";

/// The caller, as identified by the fronting authentication layer.
pub struct CurrentActor(pub Actor);

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentActor {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(&parts.headers, USER_ID_HEADER).unwrap_or_default();
        let name = header(&parts.headers, USER_NAME_HEADER);
        Ok(CurrentActor(bazaar_market::actor(id, name)?))
    }
}

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    backend: &'static str,
}

#[derive(Deserialize)]
struct NameRequest {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateItemRequest {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    is_free: bool,
    /// Decimal price text, e.g. `"19.99"`.  Ignored for free items.
    #[serde(default)]
    price: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateItemRequest {
    #[serde(default)]
    title: Option<String>,
    /// Absent leaves the description alone; `null` clears it.
    #[serde(default, deserialize_with = "present")]
    description: Option<Option<String>>,
    #[serde(default)]
    is_free: Option<bool>,
    #[serde(default)]
    price: Option<String>,
}

fn present<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(de).map(Some)
}

impl UpdateItemRequest {
    fn into_patch(self) -> Result<ItemPatch, ServerError> {
        let pricing = if self.is_free.is_some() || self.price.is_some() {
            Some(Pricing::from_input(
                self.is_free.unwrap_or(false),
                self.price.as_deref(),
            )?)
        } else {
            None
        };
        Ok(ItemPatch {
            title: self.title,
            description: self.description,
            pricing,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRequest {
    display_name: String,
}

#[derive(Deserialize)]
struct StatusQuery {
    status: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// The current contents of a feed, then let it go.
async fn first_snapshot<T: Send + 'static>(mut feed: Feed<T>) -> Result<Vec<T>, ServerError> {
    let current = feed.next().await.ok_or(ServerError::FeedClosed)?;
    feed.unsubscribe();
    Ok(current?)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend: match state.config.store_backend {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::Memory => "memory",
        },
    })
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ServerError> {
    Ok(Json(first_snapshot(state.market.categories()?).await?))
}

async fn create_category(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(req): Json<NameRequest>,
) -> Result<(StatusCode, Json<Category>), ServerError> {
    let category = state.market.create_category(&actor, &req.name).await?;
    info!(id = %category.id, "Category created via API");
    Ok((StatusCode::CREATED, Json(category)))
}

async fn rename_category(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<CategoryId>,
    Json(req): Json<NameRequest>,
) -> Result<Json<Category>, ServerError> {
    Ok(Json(
        state.market.rename_category(&actor, &id, &req.name).await?,
    ))
}

async fn delete_category(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode, ServerError> {
    state.market.delete_category(&actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_category_items(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Vec<Item>>, ServerError> {
    Ok(Json(
        first_snapshot(state.market.items_in_category(&id)?).await?,
    ))
}

async fn create_item(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(category): Path<CategoryId>,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<Item>), ServerError> {
    let pricing = Pricing::from_input(req.is_free, req.price.as_deref())?;
    let new_item = NewItem {
        title: req.title,
        description: req.description,
        pricing,
    };
    let item = state.market.create_item(&actor, new_item, &category).await?;
    info!(id = %item.id, category = %category, "Item created via API");
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<ItemId>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<Item>, ServerError> {
    let patch = req.into_patch()?;
    Ok(Json(state.market.update_item(&actor, &id, patch).await?))
}

async fn delete_item(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<ItemId>,
) -> Result<StatusCode, ServerError> {
    state.market.delete_item(&actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn start_transaction(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(item): Path<ItemId>,
) -> Result<(StatusCode, Json<Transaction>), ServerError> {
    let tx = state.market.start_transaction(&actor, &item).await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

async fn complete_transaction(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<TransactionId>,
) -> Result<Json<Transaction>, ServerError> {
    Ok(Json(state.market.complete_transaction(&actor, &id).await?))
}

async fn my_items(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<Item>>, ServerError> {
    Ok(Json(first_snapshot(state.market.my_items(&actor)?).await?))
}

async fn my_transactions(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<Transaction>>, ServerError> {
    let status = query
        .status
        .map(|raw| {
            TransactionStatus::parse(&raw)
                .ok_or_else(|| ServerError::BadRequest(format!("unknown status '{raw}'")))
        })
        .transpose()?;
    Ok(Json(
        first_snapshot(state.market.my_transactions(&actor, status)?).await?,
    ))
}

async fn save_profile(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<Profile>, ServerError> {
    Ok(Json(
        state.market.save_profile(&actor, &req.display_name).await?,
    ))
}

/// Start the HTTP server.
pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
