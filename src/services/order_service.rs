use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::orders::{OrderList, PlaceOrderRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Order,
    repository::{NewOrder, OrderLine},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let payload = payload.trimmed();
    payload.validate()?;

    // Lines for the same product are merged so stock is checked once per product.
    let mut lines: Vec<OrderLine> = Vec::with_capacity(payload.items.len());
    for item in payload.items {
        match lines.iter_mut().find(|l| l.product_id == item.product_id) {
            Some(line) => {
                line.quantity = line
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or_else(|| AppError::Validation("quantity is too large".into()))?;
            }
            None => lines.push(OrderLine {
                product_id: item.product_id,
                quantity: item.quantity,
            }),
        }
    }

    let order = state
        .orders
        .place(NewOrder {
            user_id: user.user_id,
            lines,
            shipping_address: payload.shipping_address,
        })
        .await?;

    tracing::info!(order_id = %order.id, user_id = %user.user_id, "order placed");
    Ok(ApiResponse::success("Order placed", order, Some(Meta::empty())))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = pagination.normalize();
    let found = state
        .orders
        .list_by_user(user.user_id, limit as u64, offset as u64)
        .await?;

    let meta = Meta::new(page, limit, found.total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: found.items },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = state.orders.get_by_id(id).await?;
    // Other users' orders are indistinguishable from missing ones.
    if order.user_id != user.user_id {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success("Order", order, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::JwtConfig,
        dto::orders::OrderLineRequest,
        models::{Category, Product, ProductFields, Role, User},
    };

    struct Fixture {
        state: AppState,
        buyer: AuthUser,
        product: Product,
    }

    async fn fixture(stock: i32) -> Fixture {
        let state = AppState::in_memory(JwtConfig::new("secret", 1));
        let user = state
            .users
            .create(User::new(None, "buyer@shop.test", "Bea", "Buyer", "hash", Role::User))
            .await
            .unwrap();
        let category = state
            .categories
            .create(Category::new(None, "Kitchen", ""))
            .await
            .unwrap();
        let product = state
            .products
            .create(Product::new(
                None,
                ProductFields {
                    name: "Kettle".into(),
                    description: "Boils water".into(),
                    price: 25.0,
                    image: String::new(),
                    category_id: category.id,
                    rating: 4.0,
                    reviews: 3,
                    discount: 0.0,
                    stock,
                    colors: vec![],
                    sizes: vec![],
                },
            ))
            .await
            .unwrap();
        Fixture {
            state,
            buyer: AuthUser {
                user_id: user.id,
                role: Role::User,
            },
            product,
        }
    }

    fn order_of(product_id: Uuid, quantities: &[i32]) -> PlaceOrderRequest {
        PlaceOrderRequest {
            items: quantities
                .iter()
                .map(|&quantity| OrderLineRequest {
                    product_id,
                    quantity,
                })
                .collect(),
            shipping_address: "12 Market Road".into(),
        }
    }

    #[tokio::test]
    async fn placing_an_order_snapshots_price_and_decrements_stock() {
        let f = fixture(10).await;
        let order = place_order(&f.state, &f.buyer, order_of(f.product.id, &[2, 1]))
            .await
            .unwrap()
            .data
            .unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 3);
        assert_eq!(order.items[0].price, 25.0);
        assert_eq!(order.total, 75.0);

        let product = f.state.products.get_by_id(f.product.id).await.unwrap();
        assert_eq!(product.stock, 7);
    }

    #[tokio::test]
    async fn ordering_more_than_stock_fails() {
        let f = fixture(1).await;
        let result = place_order(&f.state, &f.buyer, order_of(f.product.id, &[2])).await;
        assert!(matches!(result, Err(AppError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn zero_quantity_and_empty_orders_are_invalid() {
        let f = fixture(5).await;
        let zero = place_order(&f.state, &f.buyer, order_of(f.product.id, &[0])).await;
        assert!(matches!(zero, Err(AppError::Validation(_))));
        let empty = place_order(&f.state, &f.buyer, order_of(f.product.id, &[])).await;
        assert!(matches!(empty, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn blank_shipping_address_is_invalid() {
        let f = fixture(5).await;
        let mut request = order_of(f.product.id, &[1]);
        request.shipping_address = "   ".into();
        let result = place_order(&f.state, &f.buyer, request).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let product = f.state.products.get_by_id(f.product.id).await.unwrap();
        assert_eq!(product.stock, 5);
    }

    #[tokio::test]
    async fn orders_are_private_to_their_owner() {
        let f = fixture(5).await;
        let order = place_order(&f.state, &f.buyer, order_of(f.product.id, &[1]))
            .await
            .unwrap()
            .data
            .unwrap();

        let stranger = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::User,
        };
        let result = get_order(&f.state, &stranger, order.id).await;
        assert!(matches!(result, Err(AppError::NotFound)));

        let listed = list_orders(&f.state, &f.buyer, Pagination::default())
            .await
            .unwrap();
        assert_eq!(listed.meta.unwrap().total, Some(1));
        let theirs = list_orders(&f.state, &stranger, Pagination::default())
            .await
            .unwrap();
        assert_eq!(theirs.meta.unwrap().total, Some(0));
    }
}
