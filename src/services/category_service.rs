use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::categories::{CategoryList, CreateCategoryRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Category,
    response::{ApiResponse, Meta},
    services::auth_service::require_admin,
    state::AppState,
};

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items = state.categories.list().await?;
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn get_category(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Category>> {
    let category = state.categories.get_by_id(id).await?;
    Ok(ApiResponse::success("Category", category, None))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    require_admin(user.role)?;
    let payload = payload.trimmed();
    payload.validate()?;

    let category = Category::new(payload.id, payload.name, payload.image);
    let category = state.categories.create(category).await?;
    tracing::info!(category_id = %category.id, actor = %user.user_id, "category created");

    Ok(ApiResponse::success(
        "Category created",
        category,
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::JwtConfig, error::AppError, models::Role};

    fn admin() -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        }
    }

    fn request(name: &str) -> CreateCategoryRequest {
        CreateCategoryRequest {
            id: None,
            name: name.to_string(),
            image: String::new(),
        }
    }

    #[tokio::test]
    async fn created_categories_get_unique_ids() {
        let state = AppState::in_memory(JwtConfig::new("secret", 1));
        let a = create_category(&state, &admin(), request("Shoes")).await.unwrap().data.unwrap();
        let b = create_category(&state, &admin(), request("Bags")).await.unwrap().data.unwrap();
        assert_ne!(a.id, b.id);

        let listed = list_categories(&state).await.unwrap().data.unwrap();
        let names: Vec<_> = listed.items.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Bags", "Shoes"]);
    }

    #[tokio::test]
    async fn duplicate_name_conflicts() {
        let state = AppState::in_memory(JwtConfig::new("secret", 1));
        create_category(&state, &admin(), request("Shoes")).await.unwrap();
        let again = create_category(&state, &admin(), request("Shoes")).await;
        assert!(matches!(again, Err(AppError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn blank_names_are_rejected_and_names_are_trimmed() {
        let state = AppState::in_memory(JwtConfig::new("secret", 1));
        let blank = create_category(&state, &admin(), request("   ")).await;
        assert!(matches!(blank, Err(AppError::Validation(_))));

        let padded = create_category(&state, &admin(), request("  Garden  "))
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(padded.name, "Garden");
        assert_eq!(list_categories(&state).await.unwrap().data.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn missing_category_is_not_found() {
        let state = AppState::in_memory(JwtConfig::new("secret", 1));
        let result = get_category(&state, Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }
}
