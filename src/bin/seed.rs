//! Seed script for development — creates the default staff accounts.
//!
//! Usage: `cargo run --bin seed`
//!
//! Requires `DATABASE_URL` (reads .env).

use sqlx::PgPool;

const STAFF: &[(&str, &str, &str, &str, &str, &str)] = &[
    (
        "admin",
        "admin@immigration.gov.ss",
        "admin123",
        "System",
        "Administrator",
        "admin",
    ),
    (
        "supervisor",
        "supervisor@immigration.gov.ss",
        "super123",
        "John",
        "Supervisor",
        "supervisor",
    ),
    (
        "officer1",
        "officer1@immigration.gov.ss",
        "officer123",
        "Mary",
        "Officer",
        "officer",
    ),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    // Run migrations first
    sqlx::migrate!("./migrations").run(&pool).await?;

    println!("=== Immigration Portal Seed Script ===");

    for (username, email, password, first_name, last_name, role) in STAFF {
        seed_staff_user(&pool, username, email, password, first_name, last_name, role).await?;
    }

    println!("\n=== Seed complete! ===");
    println!("Logins: admin / admin123, supervisor / super123, officer1 / officer123");

    Ok(())
}

async fn seed_staff_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
    role: &str,
) -> anyhow::Result<()> {
    let hash = immigration_portal::services::auth::hash_password(password)?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(pool)
            .await?;

    if exists {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE username = $2")
            .bind(&hash)
            .bind(username)
            .execute(pool)
            .await?;
        println!("[done] Updated password for {username}");
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO users (username, email, password_hash, first_name, last_name, phone_number, role)
         VALUES ($1, $2, $3, $4, $5, '+211123456789', $6::user_role)",
    )
    .bind(username)
    .bind(email)
    .bind(&hash)
    .bind(first_name)
    .bind(last_name)
    .bind(role)
    .execute(pool)
    .await?;

    println!("[done] Created {role} user {username}");
    Ok(())
}
