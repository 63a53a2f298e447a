use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::JwtConfig,
    repository::{
        CategoryRepository, InMemoryStore, OrderRepository, PgStore, ProductRepository,
        UserRepository,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub categories: Arc<dyn CategoryRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub users: Arc<dyn UserRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub jwt: JwtConfig,
}

impl AppState {
    pub fn postgres(orm: DatabaseConnection, jwt: JwtConfig) -> Self {
        let store = Arc::new(PgStore::new(orm));
        Self {
            categories: store.clone(),
            products: store.clone(),
            users: store.clone(),
            orders: store,
            jwt,
        }
    }

    pub fn in_memory(jwt: JwtConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            categories: store.clone(),
            products: store.clone(),
            users: store.clone(),
            orders: store,
            jwt,
        }
    }
}
