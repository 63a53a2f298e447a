//! Persistence adapters.
//!
//! Services only talk to the traits below. [`postgres::PgStore`] is the
//! production backend; [`memory::InMemoryStore`] keeps the same contract in
//! process memory and backs the test suite and database-less runs.

use async_trait::async_trait;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Category, Order, Product, ProductPatch, User},
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    CreatedAt,
    Price,
    /// Case-insensitive on both backends.
    Name,
}

/// One page of a listing plus the number of rows matching the query.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Product listing criteria. Every criterion is optional and they combine
/// with AND.
#[derive(Debug, Clone)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Case-insensitive substring match over name and description.
    pub search: Option<String>,
    pub sort_by: ProductSortBy,
    pub sort_order: SortOrder,
    pub limit: u64,
    pub offset: u64,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            category_id: None,
            min_price: None,
            max_price: None,
            search: None,
            sort_by: ProductSortBy::CreatedAt,
            sort_order: SortOrder::Desc,
            limit: 20,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub lines: Vec<OrderLine>,
    pub shipping_address: String,
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Fails with `ConstraintViolation` when the name is taken.
    async fn create(&self, category: Category) -> AppResult<Category>;

    async fn get_by_id(&self, id: Uuid) -> AppResult<Category>;

    async fn exists(&self, id: Uuid) -> AppResult<bool>;

    async fn list(&self) -> AppResult<Vec<Category>>;

    /// Fetches the categories with the given ids; unknown ids are skipped.
    async fn find_many(&self, ids: &[Uuid]) -> AppResult<Vec<Category>>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Fails with `ConstraintViolation` when `category_id` is dangling.
    async fn create(&self, product: Product) -> AppResult<Product>;

    async fn get_by_id(&self, id: Uuid) -> AppResult<Product>;

    async fn list(&self, filter: &ProductFilter) -> AppResult<Page<Product>>;

    async fn update(&self, id: Uuid, patch: ProductPatch) -> AppResult<Product>;

    /// Removes the product only. Order items keep their snapshot.
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `DuplicateUser` when the email is taken.
    async fn create(&self, user: User) -> AppResult<User>;

    async fn get_by_id(&self, id: Uuid) -> AppResult<User>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Snapshots current product prices, checks and decrements stock and
    /// stores the order with its items, all or nothing. Lines must already be
    /// merged so each product appears once.
    async fn place(&self, order: NewOrder) -> AppResult<Order>;

    async fn get_by_id(&self, id: Uuid) -> AppResult<Order>;

    async fn list_by_user(&self, user_id: Uuid, limit: u64, offset: u64)
    -> AppResult<Page<Order>>;
}
