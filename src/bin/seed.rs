use hairlab_storefront::{
    config::AppConfig,
    db::{create_pool, orm_from_pool, run_migrations},
    services::auth_service::hash_password,
};
use secrecy::ExposeSecret;
use uuid::Uuid;

struct SeedProduct {
    name: &'static str,
    slug: &'static str,
    short_description: &'static str,
    description: &'static str,
    price: i64,
    compare_at_price: Option<i64>,
    category: &'static str,
    ingredients: &'static [&'static str],
    benefits: &'static [&'static str],
    featured: bool,
    variants: &'static [(&'static str, i64)],
}

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "Crème Camouflante Noire",
        slug: "creme-camouflante-noire",
        short_description: "Couverture naturelle pour zones clairsemées",
        description: "Crème aux pigments micronisés qui couvre les zones clairsemées pour un résultat invisible et durable.",
        price: 3800,
        compare_at_price: Some(4900),
        category: "camouflage",
        ingredients: &["Cire d'abeille naturelle", "Huile de jojoba bio", "Pigments minéraux naturels", "Vitamine E"],
        benefits: &["Couverture immédiate et naturelle", "Résistant à l'eau et à la transpiration"],
        featured: true,
        variants: &[("Noir", 3900)],
    },
    SeedProduct {
        name: "Crème Camouflante Châtain",
        slug: "creme-camouflante-chatain",
        short_description: "Couverture naturelle teinte châtain",
        description: "Crème aux pigments micronisés teinte châtain pour une couverture imperceptible des zones clairsemées.",
        price: 3900,
        compare_at_price: Some(4900),
        category: "camouflage",
        ingredients: &["Cire d'abeille naturelle", "Huile de jojoba bio", "Pigments minéraux naturels", "Vitamine E"],
        benefits: &["Couverture immédiate et naturelle", "Formule non comédogène"],
        featured: true,
        variants: &[("Châtain", 3900), ("Châtain clair", 3900)],
    },
    SeedProduct {
        name: "Shampoing Anti-Chute Fortifiant",
        slug: "shampoing-anti-chute-fortifiant",
        short_description: "Formule active pour renforcer le cheveu",
        description: "Shampoing à la caféine et à la biotine qui stimule la micro-circulation du cuir chevelu.",
        price: 2800,
        compare_at_price: None,
        category: "anti-chute",
        ingredients: &["Caféine naturelle", "Biotine (Vitamine B7)", "Extrait de saw palmetto", "Zinc PCA"],
        benefits: &["Stimule la micro-circulation", "Renforce la fibre capillaire"],
        featured: true,
        variants: &[],
    },
    SeedProduct {
        name: "Sérum Anti-Chute Intensif",
        slug: "serum-anti-chute-intensif",
        short_description: "Traitement concentré sans rinçage",
        description: "Sérum concentré à appliquer sur cuir chevelu sec pour densifier la chevelure.",
        price: 4500,
        compare_at_price: None,
        category: "anti-chute",
        ingredients: &["Redensyl", "Capixyl", "Extrait de romarin"],
        benefits: &["Densifie la chevelure", "Sans rinçage"],
        featured: false,
        variants: &[],
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(config.database_url.expose_secret()).await?;
    run_migrations(&orm_from_pool(pool.clone())).await?;

    let admin_id = ensure_user_with_role(&pool, "admin@example.com", "admin123", "admin").await?;
    let user_id = ensure_user_with_role(&pool, "user@example.com", "user123", "user").await?;
    seed_products(&pool).await?;
    seed_promotions(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user_with_role(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for product in PRODUCTS {
        let inserted: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO products (id, name, slug, description, short_description, price,
                compare_at_price, category, ingredients, benefits, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (slug) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product.name)
        .bind(product.slug)
        .bind(product.description)
        .bind(product.short_description)
        .bind(product.price)
        .bind(product.compare_at_price)
        .bind(product.category)
        .bind(product.ingredients)
        .bind(product.benefits)
        .bind(product.featured)
        .fetch_optional(pool)
        .await?;

        // Existing products keep whatever variants an admin gave them.
        let Some((product_id,)) = inserted else {
            continue;
        };
        for (name, price) in product.variants {
            sqlx::query(
                "INSERT INTO product_variants (id, product_id, name, price) VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(*name)
            .bind(*price)
            .execute(pool)
            .await?;
        }
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_promotions(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO promotions (id, code, description, discount_type, discount_value, min_purchase)
        VALUES ($1, 'BIENVENUE', 'Bienvenue : 10% sur la première commande', 'percentage', 10, 3000)
        ON CONFLICT (code) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .execute(pool)
    .await?;

    println!("Seeded promotions");
    Ok(())
}
