use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::Order;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, message = "an order needs at least one item"))]
    #[validate(nested)]
    pub items: Vec<OrderLineRequest>,
    #[validate(length(min = 1, message = "shipping address must not be empty"))]
    pub shipping_address: String,
}

impl PlaceOrderRequest {
    pub fn trimmed(mut self) -> Self {
        self.shipping_address = self.shipping_address.trim().to_string();
        self
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct OrderList {
    #[schema(value_type = Vec<Order>)]
    pub items: Vec<Order>,
}
