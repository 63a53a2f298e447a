use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "shipped" => Ok(OrderStatus::Shipped),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(id: Option<Uuid>, name: impl Into<String>, image: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.unwrap_or_else(Uuid::new_v4),
            name: name.into(),
            image: image.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image: String,
    pub category_id: Uuid,
    pub rating: f64,
    pub reviews: i32,
    pub discount: f64,
    pub stock: i32,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything a product carries except its identity and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFields {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image: String,
    pub category_id: Uuid,
    pub rating: f64,
    pub reviews: i32,
    pub discount: f64,
    pub stock: i32,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
}

impl Product {
    pub fn new(id: Option<Uuid>, fields: ProductFields) -> Self {
        let now = Utc::now();
        Self {
            id: id.unwrap_or_else(Uuid::new_v4),
            name: fields.name,
            description: fields.description,
            price: fields.price,
            image: fields.image,
            category_id: fields.category_id,
            rating: fields.rating,
            reviews: fields.reviews,
            discount: fields.discount,
            stock: fields.stock,
            colors: fields.colors,
            sizes: fields.sizes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a product. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub category_id: Option<Uuid>,
    pub rating: Option<f64>,
    pub reviews: Option<i32>,
    pub discount: Option<f64>,
    pub stock: Option<i32>,
    pub colors: Option<Vec<String>>,
    pub sizes: Option<Vec<String>>,
}

impl ProductPatch {
    pub fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(image) = self.image {
            product.image = image;
        }
        if let Some(category_id) = self.category_id {
            product.category_id = category_id;
        }
        if let Some(rating) = self.rating {
            product.rating = rating;
        }
        if let Some(reviews) = self.reviews {
            product.reviews = reviews;
        }
        if let Some(discount) = self.discount {
            product.discount = discount;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(colors) = self.colors {
            product.colors = colors;
        }
        if let Some(sizes) = self.sizes {
            product.sizes = sizes;
        }
        product.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing, default)]
    #[schema(ignore)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        id: Option<Uuid>,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.unwrap_or_else(Uuid::new_v4),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            password_hash: password_hash.into(),
            role,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    /// `price` is the unit price at the time the order is placed and is never
    /// refreshed from the product afterwards.
    pub fn new(id: Option<Uuid>, order_id: Uuid, product_id: Uuid, quantity: i32, price: f64) -> Self {
        let now = Utc::now();
        Self {
            id: id.unwrap_or_else(Uuid::new_v4),
            order_id,
            product_id,
            quantity,
            price,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub total: f64,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds a pending order from `(product_id, quantity, unit_price)` lines.
    /// Item ids are generated and the total is the sum of the line totals.
    pub fn new(
        id: Option<Uuid>,
        user_id: Uuid,
        lines: impl IntoIterator<Item = (Uuid, i32, f64)>,
        shipping_address: impl Into<String>,
    ) -> Self {
        let id = id.unwrap_or_else(Uuid::new_v4);
        let items: Vec<OrderItem> = lines
            .into_iter()
            .map(|(product_id, quantity, price)| OrderItem::new(None, id, product_id, quantity, price))
            .collect();
        let total = items.iter().map(OrderItem::line_total).sum();
        let now = Utc::now();
        Self {
            id,
            user_id,
            items,
            status: OrderStatus::Pending,
            total,
            shipping_address: shipping_address.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factories_assign_fresh_ids() {
        let a = Category::new(None, "Shoes", "shoes.png");
        let b = Category::new(None, "Shoes", "shoes.png");
        assert_ne!(a.id, Uuid::nil());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn factories_keep_supplied_id() {
        let id = Uuid::new_v4();
        let category = Category::new(Some(id), "Bags", "bags.png");
        assert_eq!(category.id, id);
    }

    #[test]
    fn order_total_is_sum_of_lines() {
        let user_id = Uuid::new_v4();
        let order = Order::new(
            None,
            user_id,
            vec![(Uuid::new_v4(), 2, 10.5), (Uuid::new_v4(), 1, 4.0)],
            "1 Main St",
        );
        assert_eq!(order.total, 25.0);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.items.iter().all(|item| item.order_id == order.id));
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let user = User::new(None, "a@b.co", "Ada", "Lovelace", "secret-hash", Role::User);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["role"], "user");
    }
}
