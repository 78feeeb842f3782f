//! Read-only views of the users and products a reservation points at.
//!
//! Both are owned by other parts of the marketplace; the engine only checks
//! existence and reads the few fields notifications need.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ReservationError, ReservationResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn exists(&self, id: Uuid) -> ReservationResult<bool>;

    /// Fails `NotFound` for an unknown id
    async fn get(&self, id: Uuid) -> ReservationResult<UserSummary>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn exists(&self, id: Uuid) -> ReservationResult<bool>;

    /// Fails `NotFound` for an unknown id
    async fn get(&self, id: Uuid) -> ReservationResult<ProductSummary>;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<Uuid, UserSummary>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, name: &str, email: &str) -> UserSummary {
        let user = UserSummary {
            id: Uuid::now_v7(),
            name: name.to_string(),
            email: email.to_string(),
        };
        self.users.write().await.insert(user.id, user.clone());
        user
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn exists(&self, id: Uuid) -> ReservationResult<bool> {
        Ok(self.users.read().await.contains_key(&id))
    }

    async fn get(&self, id: Uuid) -> ReservationResult<UserSummary> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| ReservationError::user_not_found(id))
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryProductCatalog {
    products: Arc<RwLock<HashMap<Uuid, ProductSummary>>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, name: &str, price: Decimal) -> ProductSummary {
        let product = ProductSummary {
            id: Uuid::now_v7(),
            name: name.to_string(),
            price,
        };
        self.products
            .write()
            .await
            .insert(product.id, product.clone());
        product
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn exists(&self, id: Uuid) -> ReservationResult<bool> {
        Ok(self.products.read().await.contains_key(&id))
    }

    async fn get(&self, id: Uuid) -> ReservationResult<ProductSummary> {
        self.products
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| ReservationError::product_not_found(id))
    }
}
