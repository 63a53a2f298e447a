use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Category, Order, Product, ProductPatch, User},
    repository::{
        CategoryRepository, NewOrder, OrderRepository, Page, ProductFilter, ProductRepository,
        ProductSortBy, SortOrder, UserRepository,
    },
};

#[derive(Debug, Default)]
struct Tables {
    categories: HashMap<Uuid, Category>,
    products: HashMap<Uuid, Product>,
    users: HashMap<Uuid, User>,
    orders: HashMap<Uuid, Order>,
}

/// In-memory implementation of every repository trait. It enforces the same
/// unique and foreign-key constraints as the SQL schema.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter(product: &Product, filter: &ProductFilter, needle: Option<&str>) -> bool {
    if filter.category_id.is_some_and(|id| product.category_id != id) {
        return false;
    }
    if filter.min_price.is_some_and(|min| product.price < min) {
        return false;
    }
    if filter.max_price.is_some_and(|max| product.price > max) {
        return false;
    }
    if let Some(needle) = needle {
        return product.name.to_lowercase().contains(needle)
            || product.description.to_lowercase().contains(needle);
    }
    true
}

fn compare_products(a: &Product, b: &Product, sort_by: ProductSortBy) -> Ordering {
    let primary = match sort_by {
        ProductSortBy::CreatedAt => a.created_at.cmp(&b.created_at),
        ProductSortBy::Price => a.price.total_cmp(&b.price),
        ProductSortBy::Name => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn create(&self, category: Category) -> AppResult<Category> {
        let mut tables = self.tables.write().await;
        if tables.categories.contains_key(&category.id) {
            return Err(AppError::ConstraintViolation(format!(
                "category {} already exists",
                category.id
            )));
        }
        if tables.categories.values().any(|c| c.name == category.name) {
            return Err(AppError::ConstraintViolation(format!(
                "category name '{}' is taken",
                category.name
            )));
        }
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Category> {
        let tables = self.tables.read().await;
        tables.categories.get(&id).cloned().ok_or(AppError::NotFound)
    }

    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.categories.contains_key(&id))
    }

    async fn list(&self) -> AppResult<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_many(&self, ids: &[Uuid]) -> AppResult<Vec<Category>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.categories.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn create(&self, product: Product) -> AppResult<Product> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&product.category_id) {
            return Err(AppError::ConstraintViolation(format!(
                "category {} does not exist",
                product.category_id
            )));
        }
        if tables.products.contains_key(&product.id) {
            return Err(AppError::ConstraintViolation(format!(
                "product {} already exists",
                product.id
            )));
        }
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Product> {
        let tables = self.tables.read().await;
        tables.products.get(&id).cloned().ok_or(AppError::NotFound)
    }

    async fn list(&self, filter: &ProductFilter) -> AppResult<Page<Product>> {
        let tables = self.tables.read().await;
        let needle = filter
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut matching: Vec<&Product> = tables
            .products
            .values()
            .filter(|p| matches_filter(p, filter, needle.as_deref()))
            .collect();
        matching.sort_by(|a, b| {
            let ord = compare_products(a, b, filter.sort_by);
            match filter.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect();
        Ok(Page { items, total })
    }

    async fn update(&self, id: Uuid, patch: ProductPatch) -> AppResult<Product> {
        let mut tables = self.tables.write().await;
        if let Some(category_id) = patch.category_id {
            if !tables.categories.contains_key(&category_id) {
                return Err(AppError::ConstraintViolation(format!(
                    "category {category_id} does not exist"
                )));
            }
        }
        let product = tables.products.get_mut(&id).ok_or(AppError::NotFound)?;
        patch.apply(product);
        Ok(product.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        match tables.products.remove(&id) {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: User) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.id == user.id || u.email == user.email)
        {
            return Err(AppError::DuplicateUser);
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        let tables = self.tables.read().await;
        tables.users.get(&id).cloned().ok_or(AppError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn place(&self, order: NewOrder) -> AppResult<Order> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&order.user_id) {
            return Err(AppError::ConstraintViolation(format!(
                "user {} does not exist",
                order.user_id
            )));
        }

        // Validate every line before touching stock so a failure leaves no trace.
        let mut priced = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let product = tables.products.get(&line.product_id).ok_or_else(|| {
                AppError::ConstraintViolation(format!("product {} does not exist", line.product_id))
            })?;
            if product.stock < line.quantity {
                return Err(AppError::ConstraintViolation(format!(
                    "insufficient stock for product {}",
                    line.product_id
                )));
            }
            priced.push((line.product_id, line.quantity, product.price));
        }

        for line in &order.lines {
            if let Some(product) = tables.products.get_mut(&line.product_id) {
                product.stock -= line.quantity;
            }
        }

        let placed = Order::new(None, order.user_id, priced, order.shipping_address);
        tables.orders.insert(placed.id, placed.clone());
        Ok(placed)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Order> {
        let tables = self.tables.read().await;
        tables.orders.get(&id).cloned().ok_or(AppError::NotFound)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> AppResult<Page<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<&Order> = tables
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        let total = orders.len() as i64;
        let items = orders
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(Page { items, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProductFields, Role};
    use crate::repository::OrderLine;

    fn fields(category_id: Uuid, name: &str, price: f64, stock: i32) -> ProductFields {
        ProductFields {
            name: name.to_string(),
            description: format!("{name} description"),
            price,
            image: String::new(),
            category_id,
            rating: 4.0,
            reviews: 0,
            discount: 0.0,
            stock,
            colors: vec![],
            sizes: vec![],
        }
    }

    async fn seeded_category(store: &InMemoryStore, name: &str) -> Category {
        CategoryRepository::create(store, Category::new(None, name, ""))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn product_with_dangling_category_is_rejected() {
        let store = InMemoryStore::new();
        let product = Product::new(None, fields(Uuid::new_v4(), "Ghost", 1.0, 1));

        let result = ProductRepository::create(&store, product).await;
        assert!(matches!(result, Err(AppError::ConstraintViolation(_))));

        let page = ProductRepository::list(&store, &ProductFilter::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn list_filters_combine_and_paginate() {
        let store = InMemoryStore::new();
        let shoes = seeded_category(&store, "Shoes").await;
        let bags = seeded_category(&store, "Bags").await;
        for (category, name, price) in [
            (&shoes, "Runner", 80.0),
            (&shoes, "Trail Runner", 120.0),
            (&shoes, "Sandal", 30.0),
            (&bags, "Tote", 90.0),
        ] {
            ProductRepository::create(&store, Product::new(None, fields(category.id, name, price, 5)))
                .await
                .unwrap();
        }

        let filter = ProductFilter {
            category_id: Some(shoes.id),
            min_price: Some(50.0),
            search: Some("RUNNER".into()),
            sort_by: ProductSortBy::Price,
            sort_order: SortOrder::Asc,
            ..ProductFilter::default()
        };
        let page = ProductRepository::list(&store, &filter).await.unwrap();
        let names: Vec<&str> = page.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Runner", "Trail Runner"]);
        assert_eq!(page.total, 2);

        let filter = ProductFilter {
            limit: 1,
            offset: 1,
            sort_by: ProductSortBy::Name,
            sort_order: SortOrder::Asc,
            ..ProductFilter::default()
        };
        let page = ProductRepository::list(&store, &filter).await.unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Sandal");
    }

    #[tokio::test]
    async fn name_sort_ignores_case_and_search_is_literal() {
        let store = InMemoryStore::new();
        let misc = seeded_category(&store, "Misc").await;
        for name in ["banana", "Cherry", "apple", "100% Cotton Tee"] {
            ProductRepository::create(&store, Product::new(None, fields(misc.id, name, 1.0, 1)))
                .await
                .unwrap();
        }

        let filter = ProductFilter {
            sort_by: ProductSortBy::Name,
            sort_order: SortOrder::Asc,
            ..ProductFilter::default()
        };
        let page = ProductRepository::list(&store, &filter).await.unwrap();
        let names: Vec<&str> = page.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["100% Cotton Tee", "apple", "banana", "Cherry"]);

        let filter = ProductFilter {
            search: Some("0%".into()),
            ..ProductFilter::default()
        };
        let page = ProductRepository::list(&store, &filter).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "100% Cotton Tee");

        let filter = ProductFilter {
            search: Some("_".into()),
            ..ProductFilter::default()
        };
        assert_eq!(ProductRepository::list(&store, &filter).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn update_and_delete_missing_product_is_not_found() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        let update = ProductRepository::update(&store, id, ProductPatch::default()).await;
        assert!(matches!(update, Err(AppError::NotFound)));
        let delete = ProductRepository::delete(&store, id).await;
        assert!(matches!(delete, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryStore::new();
        let user = User::new(None, "a@shop.test", "A", "B", "hash", Role::User);
        UserRepository::create(&store, user).await.unwrap();
        let again = User::new(None, "a@shop.test", "C", "D", "hash", Role::User);
        let result = UserRepository::create(&store, again).await;
        assert!(matches!(result, Err(AppError::DuplicateUser)));
    }

    #[tokio::test]
    async fn failed_order_leaves_stock_untouched() {
        let store = InMemoryStore::new();
        let category = seeded_category(&store, "Mugs").await;
        let user = UserRepository::create(
            &store,
            User::new(None, "buyer@shop.test", "B", "Uyer", "hash", Role::User),
        )
        .await
        .unwrap();
        let plenty = ProductRepository::create(&store, Product::new(None, fields(category.id, "Big", 5.0, 10)))
            .await
            .unwrap();
        let scarce = ProductRepository::create(&store, Product::new(None, fields(category.id, "Rare", 50.0, 1)))
            .await
            .unwrap();

        let result = store
            .place(NewOrder {
                user_id: user.id,
                lines: vec![
                    OrderLine { product_id: plenty.id, quantity: 3 },
                    OrderLine { product_id: scarce.id, quantity: 2 },
                ],
                shipping_address: "Somewhere".into(),
            })
            .await;
        assert!(matches!(result, Err(AppError::ConstraintViolation(_))));

        let plenty = ProductRepository::get_by_id(&store, plenty.id).await.unwrap();
        assert_eq!(plenty.stock, 10);
    }
}
