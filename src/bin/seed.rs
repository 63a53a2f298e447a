use anyhow::Context;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use shopease_api::{
    db::{create_orm_conn, run_migrations},
    entity::{categories, products},
    models::{Category, Product, ProductFields, Role, User},
    repository::{CategoryRepository, PgStore, ProductRepository, UserRepository},
    services::auth_service::hash_password,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    let store = PgStore::new(orm);

    let admin_id = ensure_user(&store, "admin@example.com", "admin123", Role::Admin).await?;
    let user_id = ensure_user(&store, "user@example.com", "user123", Role::User).await?;
    seed_catalog(&store).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    store: &PgStore,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = store.find_by_email(email).await? {
        println!("User {email} already present (role={})", existing.role);
        return Ok(existing.id);
    }

    let password_hash = hash_password(password)?;
    let user = User::new(None, email, "Seed", role.as_str(), password_hash, role);
    let user = UserRepository::create(store, user).await?;

    println!("Ensured user {email} (role={role})");
    Ok(user.id)
}

async fn ensure_category(store: &PgStore, name: &str, image: &str) -> anyhow::Result<Uuid> {
    let existing = categories::Entity::find()
        .filter(categories::Column::Name.eq(name))
        .one(store.connection())
        .await?;
    if let Some(model) = existing {
        return Ok(model.id);
    }
    let category = CategoryRepository::create(store, Category::new(None, name, image)).await?;
    Ok(category.id)
}

async fn seed_catalog(store: &PgStore) -> anyhow::Result<()> {
    let apparel = ensure_category(store, "Apparel", "/images/apparel.jpg").await?;
    let home = ensure_category(store, "Home", "/images/home.jpg").await?;

    let catalog = vec![
        (apparel, "Classic Hoodie", "Warm fleece hoodie", 55.0, 50, vec!["black", "grey"], vec!["S", "M", "L"]),
        (apparel, "Canvas Sneakers", "Everyday low-top sneakers", 64.5, 30, vec!["white"], vec!["40", "41", "42"]),
        (home, "Ceramic Mug", "Stoneware mug, 350ml", 12.0, 100, vec!["blue", "sand"], vec![]),
        (home, "Linen Throw", "Lightweight linen blanket", 48.0, 20, vec!["natural"], vec![]),
    ];

    for (category_id, name, description, price, stock, colors, sizes) in catalog {
        let exists = products::Entity::find()
            .filter(products::Column::Name.eq(name))
            .one(store.connection())
            .await?
            .is_some();
        if exists {
            continue;
        }

        let product = Product::new(
            None,
            ProductFields {
                name: name.to_string(),
                description: description.to_string(),
                price,
                image: String::new(),
                category_id,
                rating: 0.0,
                reviews: 0,
                discount: 0.0,
                stock,
                colors: colors.into_iter().map(String::from).collect(),
                sizes: sizes.into_iter().map(String::from).collect(),
            },
        );
        ProductRepository::create(store, product).await?;
    }

    println!("Seeded catalog");
    Ok(())
}
