//! Throwaway Postgres databases for store tests.
//!
//! One container is started per test binary and shared. Every [`TestDb`] gets its
//! own freshly migrated database inside it, so tests never see each other's rows.

use sqlx::{Connection, PgConnection, PgPool};
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres as PostgresImage;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::store::postgres::PgStore;

const USER: &str = "golbarg_test";
const PASSWORD: &str = "golbarg_test_password";

struct SharedPostgres {
    _container: ContainerAsync<PostgresImage>,
    host: String,
    port: u16,
}

impl SharedPostgres {
    fn url(&self, database: &str) -> String {
        format!("postgres://{USER}:{PASSWORD}@{}:{}/{database}", self.host, self.port)
    }
}

static POSTGRES: OnceCell<SharedPostgres> = OnceCell::const_new();

async fn shared_postgres() -> &'static SharedPostgres {
    POSTGRES
        .get_or_init(|| async {
            let container = PostgresImage::default()
                .with_user(USER)
                .with_password(PASSWORD)
                .with_db_name(USER)
                .start()
                .await
                .expect("Failed to start PostgreSQL container");
            let host = std::env::var("TESTCONTAINERS_HOST_OVERRIDE").unwrap_or_else(|_| "localhost".to_string());
            let port = container.get_host_port_ipv4(5432).await.expect("Failed to get container port");
            SharedPostgres { _container: container, host, port }
        })
        .await
}

pub(crate) struct TestDb {
    pub(crate) pool: PgPool,
    pub(crate) store: PgStore,
}

impl TestDb {
    pub(crate) async fn new() -> Self {
        let postgres = shared_postgres().await;
        let name = format!("golbarg_{}", Uuid::new_v4().simple());

        let mut admin = PgConnection::connect(&postgres.url(USER)).await.expect("Failed to connect to postgres");
        sqlx::query(&format!("CREATE DATABASE \"{name}\""))
            .execute(&mut admin)
            .await
            .expect("Failed to create test database");
        admin.close().await.expect("Failed to close admin connection");

        let pool = PgPool::connect(&postgres.url(&name)).await.expect("Failed to create pool");
        let store = PgStore::new(pool.clone());
        store.migrate().await.expect("Failed to run migrations");
        Self { pool, store }
    }

    pub(crate) async fn insert_product(&self, product: &Product) {
        sqlx::query(
            "INSERT INTO products (id, name, slug, category, description, cover_url, price, sale_price, stock, active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(product.id.into_uuid())
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.category)
        .bind(&product.description)
        .bind(&product.cover_url)
        .bind(product.price.amount())
        .bind(product.sale_price.map(|m| m.amount()))
        .bind(product.stock)
        .bind(product.active)
        .bind(product.created_at)
        .execute(&self.pool)
        .await
        .expect("Failed to insert product");
    }

    pub(crate) async fn stock(&self, product: &Product) -> i32 {
        sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(product.id.into_uuid())
            .fetch_one(&self.pool)
            .await
            .expect("Failed to read stock")
    }

    pub(crate) async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count rows")
    }
}
