use std::collections::HashMap;

use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::products::{CreateProductRequest, ProductList, ProductView, UpdateProductRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    repository::{ProductFilter, ProductSortBy, SortOrder},
    response::{ApiResponse, Meta},
    routes::params::{Expand, ProductQuery},
    services::auth_service::require_admin,
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();

    if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
        if min > max {
            return Err(AppError::Validation(
                "minPrice must not exceed maxPrice".into(),
            ));
        }
    }

    let filter = ProductFilter {
        category_id: query.category_id,
        min_price: query.min_price,
        max_price: query.max_price,
        search: query.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
        sort_by: query.sort_by.unwrap_or(ProductSortBy::CreatedAt),
        sort_order: query.sort_order.unwrap_or(SortOrder::Desc),
        limit: limit as u64,
        offset: offset as u64,
    };

    let found = state.products.list(&filter).await?;
    let items = expand_products(state, found.items, query.expand).await?;

    let meta = Meta::new(page, limit, found.total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(
    state: &AppState,
    id: Uuid,
    expand: Option<Expand>,
) -> AppResult<ApiResponse<ProductView>> {
    let product = state.products.get_by_id(id).await?;
    let view = expand_products(state, vec![product], expand)
        .await?
        .into_iter()
        .next()
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Product", view, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    require_admin(user.role)?;
    let payload = payload.trimmed();
    payload.validate()?;

    let (id, fields) = payload.into_parts();
    ensure_category(state, fields.category_id).await?;

    let product = state.products.create(Product::new(id, fields)).await?;
    tracing::info!(product_id = %product.id, actor = %user.user_id, "product created");

    Ok(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    require_admin(user.role)?;
    let payload = payload.trimmed();
    payload.validate()?;

    if let Some(category_id) = payload.category_id {
        ensure_category(state, category_id).await?;
    }

    let product = state.products.update(id, payload.into()).await?;
    tracing::info!(product_id = %product.id, actor = %user.user_id, "product updated");

    Ok(ApiResponse::success(
        "Updated",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    require_admin(user.role)?;
    state.products.delete(id).await?;
    tracing::info!(product_id = %id, actor = %user.user_id, "product deleted");

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    ))
}

async fn ensure_category(state: &AppState, category_id: Uuid) -> AppResult<()> {
    if !state.categories.exists(category_id).await? {
        return Err(AppError::ConstraintViolation(format!(
            "category {category_id} does not exist"
        )));
    }
    Ok(())
}

/// Embeds categories only when the caller asked for them, with one lookup
/// for the whole page.
async fn expand_products(
    state: &AppState,
    products: Vec<Product>,
    expand: Option<Expand>,
) -> AppResult<Vec<ProductView>> {
    if expand != Some(Expand::Category) {
        return Ok(products.into_iter().map(ProductView::from).collect());
    }

    let mut ids: Vec<Uuid> = products.iter().map(|p| p.category_id).collect();
    ids.sort();
    ids.dedup();
    let categories: HashMap<_, _> = state
        .categories
        .find_many(&ids)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    Ok(products
        .into_iter()
        .map(|product| {
            let category = categories.get(&product.category_id).cloned();
            ProductView { product, category }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::JwtConfig, models::{Category, Role}};

    fn admin() -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        }
    }

    fn request(category_id: Uuid, name: &str, price: f64) -> CreateProductRequest {
        CreateProductRequest {
            id: None,
            name: name.to_string(),
            description: "Comfortable".to_string(),
            price,
            image: "item.png".to_string(),
            category_id,
            rating: 4.5,
            reviews: 12,
            discount: 10.0,
            stock: 7,
            colors: vec!["red".into()],
            sizes: vec!["M".into(), "L".into()],
        }
    }

    async fn setup() -> (AppState, Category) {
        let state = AppState::in_memory(JwtConfig::new("secret", 1));
        let category = state
            .categories
            .create(Category::new(None, "Apparel", "apparel.png"))
            .await
            .unwrap();
        (state, category)
    }

    #[tokio::test]
    async fn negative_price_is_rejected_and_not_persisted() {
        let (state, category) = setup().await;
        let result = create_product(&state, &admin(), request(category.id, "Shirt", -1.0)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let listed = list_products(&state, ProductQuery::default()).await.unwrap();
        assert_eq!(listed.meta.unwrap().total, Some(0));
    }

    #[tokio::test]
    async fn unknown_category_is_a_constraint_violation() {
        let (state, _) = setup().await;
        let result = create_product(&state, &admin(), request(Uuid::new_v4(), "Shirt", 10.0)).await;
        assert!(matches!(result, Err(AppError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn regular_user_cannot_create() {
        let (state, category) = setup().await;
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::User,
        };
        let result = create_product(&state, &user, request(category.id, "Shirt", 10.0)).await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn supplied_id_is_kept() {
        let (state, category) = setup().await;
        let id = Uuid::new_v4();
        let mut req = request(category.id, "Shirt", 10.0);
        req.id = Some(id);
        let product = create_product(&state, &admin(), req).await.unwrap().data.unwrap();
        assert_eq!(product.id, id);
    }

    #[tokio::test]
    async fn update_patches_only_given_fields() {
        let (state, category) = setup().await;
        let created = create_product(&state, &admin(), request(category.id, "Shirt", 10.0))
            .await
            .unwrap()
            .data
            .unwrap();

        let patch = UpdateProductRequest {
            price: Some(12.5),
            stock: Some(3),
            ..Default::default()
        };
        let updated = update_product(&state, &admin(), created.id, patch)
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(updated.price, 12.5);
        assert_eq!(updated.stock, 3);
        assert_eq!(updated.name, "Shirt");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);

        let bad = UpdateProductRequest {
            stock: Some(-1),
            ..Default::default()
        };
        let result = update_product(&state, &admin(), created.id, bad).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let missing = update_product(&state, &admin(), Uuid::new_v4(), UpdateProductRequest::default()).await;
        assert!(matches!(missing, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn expand_embeds_category() {
        let (state, category) = setup().await;
        let created = create_product(&state, &admin(), request(category.id, "Shirt", 10.0))
            .await
            .unwrap()
            .data
            .unwrap();

        let plain = get_product(&state, created.id, None).await.unwrap().data.unwrap();
        assert!(plain.category.is_none());

        let expanded = get_product(&state, created.id, Some(Expand::Category))
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(expanded.category.map(|c| c.name), Some("Apparel".to_string()));
    }

    #[tokio::test]
    async fn blank_product_names_are_rejected() {
        let (state, category) = setup().await;
        let blank = create_product(&state, &admin(), request(category.id, " \t ", 10.0)).await;
        assert!(matches!(blank, Err(AppError::Validation(_))));

        let created = create_product(&state, &admin(), request(category.id, " Shirt ", 10.0))
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(created.name, "Shirt");

        let rename = UpdateProductRequest {
            name: Some("   ".into()),
            ..Default::default()
        };
        let result = update_product(&state, &admin(), created.id, rename).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn inverted_price_range_is_rejected() {
        let (state, _) = setup().await;
        let query = ProductQuery {
            min_price: Some(50.0),
            max_price: Some(10.0),
            ..Default::default()
        };
        let result = list_products(&state, query).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
