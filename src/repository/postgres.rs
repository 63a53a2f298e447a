use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{
        Expr, Func, LikeExpr, LockType, Order as Direction, SimpleExpr,
        extension::postgres::PgExpr,
    },
};
use uuid::Uuid;

use crate::{
    entity::{
        categories::{ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories, Model as CategoryModel},
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems, Model as OrderItemModel},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{ActiveModel as ProductActive, Column as ProductCol, Entity as Products, Model as ProductModel},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    models::{Category, Order, OrderItem, Product, ProductPatch, User},
    repository::{
        CategoryRepository, NewOrder, OrderRepository, Page, ProductFilter, ProductRepository,
        ProductSortBy, SortOrder, UserRepository,
    },
};

/// SeaORM-backed store over a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    db: DatabaseConnection,
}

impl PgStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn items_for(&self, order_ids: Vec<Uuid>) -> AppResult<HashMap<Uuid, Vec<OrderItem>>> {
        let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(grouped);
        }
        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.is_in(order_ids))
            .order_by_asc(OrderItemCol::CreatedAt)
            .all(&self.db)
            .await?;
        for item in items {
            grouped
                .entry(item.order_id)
                .or_default()
                .push(order_item_from_entity(item));
        }
        Ok(grouped)
    }
}

#[async_trait]
impl CategoryRepository for PgStore {
    async fn create(&self, category: Category) -> AppResult<Category> {
        let model = CategoryActive {
            id: Set(category.id),
            name: Set(category.name),
            image: Set(category.image),
            created_at: Set(category.created_at.into()),
            updated_at: Set(category.updated_at.into()),
        }
        .insert(&self.db)
        .await?;
        tracing::info!(category_id = %model.id, "category created");
        Ok(category_from_entity(model))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Category> {
        Categories::find_by_id(id)
            .one(&self.db)
            .await?
            .map(category_from_entity)
            .ok_or(AppError::NotFound)
    }

    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        let count = Categories::find()
            .filter(CategoryCol::Id.eq(id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn list(&self) -> AppResult<Vec<Category>> {
        let categories = Categories::find()
            .order_by_asc(CategoryCol::Name)
            .all(&self.db)
            .await?
            .into_iter()
            .map(category_from_entity)
            .collect();
        Ok(categories)
    }

    async fn find_many(&self, ids: &[Uuid]) -> AppResult<Vec<Category>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let categories = Categories::find()
            .filter(CategoryCol::Id.is_in(ids.to_vec()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(category_from_entity)
            .collect();
        Ok(categories)
    }
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn create(&self, product: Product) -> AppResult<Product> {
        let model = product_to_active(product).insert(&self.db).await?;
        tracing::info!(product_id = %model.id, "product created");
        Ok(product_from_entity(model))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Product> {
        Products::find_by_id(id)
            .one(&self.db)
            .await?
            .map(product_from_entity)
            .ok_or(AppError::NotFound)
    }

    async fn list(&self, filter: &ProductFilter) -> AppResult<Page<Product>> {
        let mut condition = Condition::all();

        if let Some(category_id) = filter.category_id {
            condition = condition.add(ProductCol::CategoryId.eq(category_id));
        }

        if let Some(search) = filter.search.as_ref().filter(|s| !s.is_empty()) {
            let pattern = contains_pattern(search);
            condition = condition.add(
                Condition::any()
                    .add(Expr::col(ProductCol::Name).ilike(LikeExpr::new(&pattern).escape('\\')))
                    .add(Expr::col(ProductCol::Description).ilike(LikeExpr::new(pattern).escape('\\'))),
            );
        }

        if let Some(min_price) = filter.min_price {
            condition = condition.add(ProductCol::Price.gte(min_price));
        }

        if let Some(max_price) = filter.max_price {
            condition = condition.add(ProductCol::Price.lte(max_price));
        }

        let order = match filter.sort_order {
            SortOrder::Asc => Direction::Asc,
            SortOrder::Desc => Direction::Desc,
        };

        let mut finder = Products::find().filter(condition);
        finder = match filter.sort_by {
            ProductSortBy::CreatedAt => finder.order_by(ProductCol::CreatedAt, order),
            ProductSortBy::Price => finder.order_by(ProductCol::Price, order),
            // Case-folded first so the order does not depend on the column collation.
            ProductSortBy::Name => finder
                .order_by(
                    SimpleExpr::from(Func::lower(Expr::col(ProductCol::Name))),
                    order.clone(),
                )
                .order_by(ProductCol::Name, order),
        };
        // Tie-break on the key so a page is stable across repeated requests.
        finder = finder.order_by_asc(ProductCol::Id);

        let total = finder.clone().count(&self.db).await? as i64;

        let items = finder
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.db)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect();

        Ok(Page { items, total })
    }

    async fn update(&self, id: Uuid, patch: ProductPatch) -> AppResult<Product> {
        let existing = Products::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut product = product_from_entity(existing);
        patch.apply(&mut product);

        let model = product_to_active(product).update(&self.db).await?;
        tracing::info!(product_id = %model.id, "product updated");
        Ok(product_from_entity(model))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = Products::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: User) -> AppResult<User> {
        let model = UserActive {
            id: Set(user.id),
            email: Set(user.email),
            first_name: Set(user.first_name),
            last_name: Set(user.last_name),
            password_hash: Set(user.password_hash),
            role: Set(user.role.as_str().to_string()),
            created_at: Set(user.created_at.into()),
            updated_at: Set(user.updated_at.into()),
        }
        .insert(&self.db)
        .await
        .map_err(|err| match AppError::from(err) {
            AppError::ConstraintViolation(_) => AppError::DuplicateUser,
            other => other,
        })?;
        user_from_entity(model)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        let model = Users::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        user_from_entity(model)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Users::find()
            .filter(UserCol::Email.eq(email))
            .one(&self.db)
            .await?
            .map(user_from_entity)
            .transpose()
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn place(&self, order: NewOrder) -> AppResult<Order> {
        let txn = self.db.begin().await?;

        let ids: Vec<Uuid> = order.lines.iter().map(|line| line.product_id).collect();
        let products: HashMap<Uuid, ProductModel> = Products::find()
            .filter(ProductCol::Id.is_in(ids))
            .lock(LockType::Update)
            .all(&txn)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut priced = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let product = products.get(&line.product_id).ok_or_else(|| {
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

        let placed = Order::new(None, order.user_id, priced, order.shipping_address);

        OrderActive {
            id: Set(placed.id),
            user_id: Set(placed.user_id),
            status: Set(placed.status.as_str().to_string()),
            total: Set(placed.total),
            shipping_address: Set(placed.shipping_address.clone()),
            created_at: Set(placed.created_at.into()),
            updated_at: Set(placed.updated_at.into()),
        }
        .insert(&txn)
        .await?;

        for item in &placed.items {
            OrderItemActive {
                id: Set(item.id),
                order_id: Set(item.order_id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                price: Set(item.price),
                created_at: Set(item.created_at.into()),
                updated_at: Set(item.updated_at.into()),
            }
            .insert(&txn)
            .await?;

            Products::update_many()
                .col_expr(ProductCol::Stock, Expr::col(ProductCol::Stock).sub(item.quantity))
                .col_expr(ProductCol::UpdatedAt, Expr::value(Utc::now()))
                .filter(ProductCol::Id.eq(item.product_id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        tracing::info!(order_id = %placed.id, user_id = %placed.user_id, total = placed.total, "order placed");
        Ok(placed)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Order> {
        let model = Orders::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        let mut items = self.items_for(vec![model.id]).await?;
        let items = items.remove(&model.id).unwrap_or_default();
        order_from_entity(model, items)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> AppResult<Page<Order>> {
        let finder = Orders::find()
            .filter(OrderCol::UserId.eq(user_id))
            .order_by_desc(OrderCol::CreatedAt)
            .order_by_asc(OrderCol::Id);

        let total = finder.clone().count(&self.db).await? as i64;
        let models = finder.limit(limit).offset(offset).all(&self.db).await?;

        let mut items = self.items_for(models.iter().map(|m| m.id).collect()).await?;
        let orders = models
            .into_iter()
            .map(|model| {
                let lines = items.remove(&model.id).unwrap_or_default();
                order_from_entity(model, lines)
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Page {
            items: orders,
            total,
        })
    }
}

/// `ILIKE` pattern matching `search` as a literal substring. Wildcards in the
/// input are escaped with `\`.
fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
        image: model.image,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn product_to_active(product: Product) -> ProductActive {
    ProductActive {
        id: Set(product.id),
        name: Set(product.name),
        description: Set(product.description),
        price: Set(product.price),
        image: Set(product.image),
        category_id: Set(product.category_id),
        rating: Set(product.rating),
        reviews: Set(product.reviews),
        discount: Set(product.discount),
        stock: Set(product.stock),
        colors: Set(product.colors),
        sizes: Set(product.sizes),
        created_at: Set(product.created_at.into()),
        updated_at: Set(product.updated_at.into()),
    }
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        image: model.image,
        category_id: model.category_id,
        rating: model.rating,
        reviews: model.reviews,
        discount: model.discount,
        stock: model.stock,
        colors: model.colors,
        sizes: model.sizes,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn user_from_entity(model: UserModel) -> AppResult<User> {
    let role = model
        .role
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    Ok(User {
        id: model.id,
        email: model.email,
        first_name: model.first_name,
        last_name: model.last_name,
        password_hash: model.password_hash,
        role,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn order_from_entity(model: OrderModel, items: Vec<OrderItem>) -> AppResult<Order> {
    let status = model
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        items,
        status,
        total: model.total,
        shipping_address: model.shipping_address,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_wildcards_match_literally() {
        assert_eq!(contains_pattern("boot"), "%boot%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
        assert_eq!(contains_pattern("c:\\dir"), "%c:\\\\dir%");
    }
}
