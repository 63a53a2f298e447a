use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Category, Product, ProductFields, ProductPatch};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    /// Optional client-chosen id; generated when absent.
    pub id: Option<Uuid>,
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: f64,
    #[serde(default)]
    pub image: String,
    pub category_id: Uuid,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 5.0, message = "rating must be between 0 and 5"))]
    pub rating: f64,
    #[serde(default)]
    #[validate(range(min = 0, message = "reviews must not be negative"))]
    pub reviews: i32,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0, message = "discount must be between 0 and 100"))]
    pub discount: f64,
    #[serde(default)]
    #[validate(range(min = 0, message = "stock must not be negative"))]
    pub stock: i32,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
}

impl CreateProductRequest {
    pub fn trimmed(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self
    }

    pub fn into_parts(self) -> (Option<Uuid>, ProductFields) {
        let fields = ProductFields {
            name: self.name,
            description: self.description,
            price: self.price,
            image: self.image,
            category_id: self.category_id,
            rating: self.rating,
            reviews: self.reviews,
            discount: self.discount,
            stock: self.stock,
            colors: self.colors,
            sizes: self.sizes,
        };
        (self.id, fields)
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: Option<f64>,
    pub image: Option<String>,
    pub category_id: Option<Uuid>,
    #[validate(range(min = 0.0, max = 5.0, message = "rating must be between 0 and 5"))]
    pub rating: Option<f64>,
    #[validate(range(min = 0, message = "reviews must not be negative"))]
    pub reviews: Option<i32>,
    #[validate(range(min = 0.0, max = 100.0, message = "discount must be between 0 and 100"))]
    pub discount: Option<f64>,
    #[validate(range(min = 0, message = "stock must not be negative"))]
    pub stock: Option<i32>,
    pub colors: Option<Vec<String>>,
    pub sizes: Option<Vec<String>>,
}

impl UpdateProductRequest {
    pub fn trimmed(mut self) -> Self {
        self.name = self.name.map(|name| name.trim().to_string());
        self
    }
}

impl From<UpdateProductRequest> for ProductPatch {
    fn from(req: UpdateProductRequest) -> Self {
        ProductPatch {
            name: req.name,
            description: req.description,
            price: req.price,
            image: req.image,
            category_id: req.category_id,
            rating: req.rating,
            reviews: req.reviews,
            discount: req.discount,
            stock: req.stock,
            colors: req.colors,
            sizes: req.sizes,
        }
    }
}

/// A product, optionally with its category embedded when the caller asked
/// for `expand=category`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            product,
            category: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<ProductView>)]
    pub items: Vec<ProductView>,
}
