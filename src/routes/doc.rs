use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        categories::{CategoryList, CreateCategoryRequest},
        orders::{OrderLineRequest, OrderList, PlaceOrderRequest},
        products::{CreateProductRequest, ProductList, ProductView, UpdateProductRequest},
    },
    models::{Category, Order, OrderItem, OrderStatus, Product, Role, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, categories, health, orders, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        products::list_products,
        products::get_product,
        categories::list_categories,
        categories::get_category,
        orders::place_order,
        orders::list_orders,
        orders::get_order,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::create_category
    ),
    components(
        schemas(
            User,
            Role,
            Category,
            Product,
            Order,
            OrderItem,
            OrderStatus,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            UpdateProductRequest,
            ProductView,
            ProductList,
            CreateCategoryRequest,
            CategoryList,
            PlaceOrderRequest,
            OrderLineRequest,
            OrderList,
            params::Pagination,
            params::ProductSortBy,
            params::SortOrder,
            params::Expand,
            health::HealthData,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Category>,
            ApiResponse<Order>,
            ApiResponse<User>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and current user"),
        (name = "Products", description = "Public product catalogue"),
        (name = "Categories", description = "Public category listing"),
        (name = "Orders", description = "Orders of the authenticated user"),
        (name = "Admin", description = "Admin-only catalogue management"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
