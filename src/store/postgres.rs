//! Postgres implementation of the store traits.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres, QueryBuilder, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::aggregates::{NewOrder, Order, OrderItem, OrderStatus, Product};
use crate::domain::profile::Profile;
use crate::domain::value_objects::{Money, OrderId, OrderItemId, ProductId, Quantity, UserId};
use crate::store::{AccountStore, CatalogStore, OrderFilter, Page, ProductFilter, StoreError, Transition};

const PRODUCT_COLUMNS: &str =
    "id, name, slug, category, description, cover_url, price, sale_price, stock, active, created_at";
const ORDER_COLUMNS: &str =
    "id, user_id, status, full_name, phone, address, note, sub_total, shipping_fee, grand_total, created_at";
const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, product_id, product_name, product_slug, product_category, qty, unit_price, line_total";
const PROFILE_COLUMNS: &str = "id, full_name, phone, address, email, updated_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn decode_error(column: &str, source: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::ColumnDecode { index: column.to_string(), source: Box::new(source) }
}

impl<'r> FromRow<'r, PgRow> for Product {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: ProductId::from_uuid(row.try_get("id")?),
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            category: row.try_get("category")?,
            description: row.try_get("description")?,
            cover_url: row.try_get("cover_url")?,
            price: Money::new(row.try_get("price")?),
            sale_price: row.try_get::<Option<i64>, _>("sale_price")?.map(Money::new),
            stock: row.try_get("stock")?,
            active: row.try_get("active")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for Order {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: OrderId::from_uuid(row.try_get("id")?),
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            status: status.parse::<OrderStatus>().map_err(|e| decode_error("status", e))?,
            full_name: row.try_get("full_name")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            note: row.try_get("note")?,
            sub_total: Money::new(row.try_get("sub_total")?),
            shipping_fee: Money::new(row.try_get("shipping_fee")?),
            grand_total: Money::new(row.try_get("grand_total")?),
            created_at: row.try_get("created_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for OrderItem {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let qty: i32 = row.try_get("qty")?;
        let qty = u32::try_from(qty).map_err(|e| decode_error("qty", e))?;
        Ok(Self {
            id: OrderItemId::from_uuid(row.try_get("id")?),
            order_id: OrderId::from_uuid(row.try_get("order_id")?),
            product_id: row.try_get::<Option<Uuid>, _>("product_id")?.map(ProductId::from_uuid),
            product_name: row.try_get("product_name")?,
            product_slug: row.try_get("product_slug")?,
            product_category: row.try_get("product_category")?,
            qty: Quantity::new(qty).map_err(|e| decode_error("qty", e))?,
            unit_price: Money::new(row.try_get("unit_price")?),
            line_total: Money::new(row.try_get("line_total")?),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for Profile {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: UserId::from_uuid(row.try_get("id")?),
            full_name: row.try_get("full_name")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            email: row.try_get("email")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn escape_like(value: &str) -> String {
    value.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND name ILIKE ").push_bind(format!("%{}%", escape_like(search)));
    }
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND COALESCE(sale_price, price) >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND COALESCE(sale_price, price) <= ").push_bind(max);
    }
    if filter.in_stock {
        qb.push(" AND stock > 0");
    }
}

fn push_order_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    if let Some(status) = filter.status {
        qb.push(" WHERE status = ").push_bind(status.as_str());
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();
        let products = sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Page<Product>, StoreError> {
        let page = filter.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products WHERE active");
        push_product_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE active"));
        push_product_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(page.per_page()))
            .push(" OFFSET ")
            .push_bind(page.offset());
        let data = select.build_query_as::<Product>().fetch_all(&self.pool).await?;

        Ok(Page::new(data, total, &page))
    }

    async fn active_product_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError> {
        let product = sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1 AND active"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn commit_order(&self, new: &NewOrder) -> Result<(), StoreError> {
        let order = &new.order;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, user_id, status, full_name, phone, address, note, sub_total, shipping_fee, grand_total, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)",
        )
        .bind(order.id.into_uuid())
        .bind(order.user_id.into_uuid())
        .bind(order.status.as_str())
        .bind(&order.full_name)
        .bind(&order.phone)
        .bind(&order.address)
        .bind(&order.note)
        .bind(order.sub_total.amount())
        .bind(order.shipping_fee.amount())
        .bind(order.grand_total.amount())
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        for item in &new.items {
            sqlx::query(&format!("INSERT INTO order_items ({ORDER_ITEM_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"))
                .bind(item.id.into_uuid())
                .bind(item.order_id.into_uuid())
                .bind(item.product_id.map(ProductId::into_uuid))
                .bind(&item.product_name)
                .bind(&item.product_slug)
                .bind(&item.product_category)
                .bind(item.qty.as_i32())
                .bind(item.unit_price.amount())
                .bind(item.line_total.amount())
                .execute(&mut *tx)
                .await?;
        }

        for item in &new.items {
            let Some(product_id) = item.product_id else { continue };
            let taken = sqlx::query(
                "UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1 AND active AND stock >= $2",
            )
            .bind(product_id.into_uuid())
            .bind(item.qty.as_i32())
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if taken == 0 {
                let active: Option<bool> = sqlx::query_scalar("SELECT active FROM products WHERE id = $1")
                    .bind(product_id.into_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;
                debug!(order_id = %order.id, product_id = %product_id, ?active, "product changed concurrently, rolling back");
                let product_name = item.product_name.clone();
                return Err(match active {
                    Some(true) => StoreError::StockConflict { product_name },
                    _ => StoreError::ProductUnavailable { product_name },
                });
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>, StoreError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user.into_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Page<Order>, StoreError> {
        let page = filter.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
        push_order_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        push_order_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(page.per_page()))
            .push(" OFFSET ")
            .push_bind(page.offset());
        let data = select.build_query_as::<Order>().fetch_all(&self.pool).await?;

        Ok(Page::new(data, total, &page))
    }

    async fn items_for_orders(&self, ids: &[OrderId]) -> Result<Vec<OrderItem>, StoreError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();
        // item ids are v7, so ordering by id keeps placement order
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn cancel_order(&self, id: OrderId, user: UserId) -> Result<Transition, StoreError> {
        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(
            "UPDATE orders SET status = 'canceled', updated_at = NOW() WHERE id = $1 AND user_id = $2 AND status = 'pending'",
        )
        .bind(id.into_uuid())
        .bind(user.into_uuid())
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if flipped == 0 {
            return Ok(Transition::Stale);
        }

        let lines: Vec<(Option<Uuid>, i32)> = sqlx::query_as("SELECT product_id, qty FROM order_items WHERE order_id = $1")
            .bind(id.into_uuid())
            .fetch_all(&mut *tx)
            .await?;

        for (product_id, qty) in lines {
            let Some(product_id) = product_id else {
                warn!(order_id = %id, "product removed from catalog, skipping restock");
                continue;
            };
            sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
                .bind(product_id)
                .bind(qty)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(Transition::Applied)
    }

    async fn mark_paid(&self, id: OrderId, user: UserId) -> Result<Transition, StoreError> {
        let paid = sqlx::query(
            "UPDATE orders SET status = 'paid', updated_at = NOW() WHERE id = $1 AND user_id = $2 AND status = 'pending'",
        )
        .bind(id.into_uuid())
        .bind(user.into_uuid())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(if paid == 0 { Transition::Stale } else { Transition::Applied })
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn profile(&self, user: UserId) -> Result<Option<Profile>, StoreError> {
        let profile = sqlx::query_as::<_, Profile>(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"))
            .bind(user.into_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile, StoreError> {
        let saved = sqlx::query_as::<_, Profile>(&format!(
            "INSERT INTO profiles ({PROFILE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO UPDATE SET full_name = EXCLUDED.full_name, phone = EXCLUDED.phone, \
             address = EXCLUDED.address, email = EXCLUDED.email, updated_at = EXCLUDED.updated_at \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(profile.id.into_uuid())
        .bind(&profile.full_name)
        .bind(&profile.phone)
        .bind(&profile.address)
        .bind(&profile.email)
        .bind(profile.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn is_admin(&self, user: UserId) -> Result<bool, StoreError> {
        let admin: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM admin_users WHERE user_id = $1)")
            .bind(user.into_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(admin)
    }

    async fn session_user(&self, token: &str) -> Result<Option<UserId>, StoreError> {
        let user: Option<Uuid> = sqlx::query_scalar("SELECT user_id FROM sessions WHERE token = $1 AND expires_at > NOW()")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user.map(UserId::from_uuid))
    }
}


#[cfg(all(test, feature = "test-postgres"))]
mod db_tests {
    use chrono::{SubsecRound, Utc};

    use super::*;
    use crate::domain::aggregates::product::sample;
    use crate::domain::aggregates::{OrderLine, Recipient};
    use crate::store::test_db::TestDb;

    fn priced(user: UserId, lines: &[(&Product, u32)]) -> NewOrder {
        let recipient = Recipient {
            full_name: "کیان صالحی".into(),
            phone: "09131234567".into(),
            address: "یزد، میدان امیرچخماق، کوچه ۴".into(),
            note: None,
        };
        let order_lines: Vec<OrderLine> = lines
            .iter()
            .map(|(p, qty)| OrderLine { product_id: p.id, qty: Quantity::new(*qty).unwrap() })
            .collect();
        let products: Vec<Product> = lines.iter().map(|(p, _)| (*p).clone()).collect();
        // timestamptz keeps microseconds
        let now = Utc::now().trunc_subsecs(6);
        NewOrder::price(user, recipient, &order_lines, &products, Money::new(20_000), now).unwrap()
    }

    #[tokio::test]
    async fn test_commit_writes_order_and_takes_stock() {
        let db = TestDb::new().await;
        let rose = sample("Red Rose", 100_000, Some(80_000), 10);
        db.insert_product(&rose).await;
        let user = UserId::new();

        let new = priced(user, &[(&rose, 2)]);
        db.store.commit_order(&new).await.unwrap();

        assert_eq!(db.stock(&rose).await, 8);
        let order = db.store.order(new.order.id).await.unwrap().unwrap();
        assert_eq!(order, new.order);
        let items = db.store.items_for_orders(&[new.order.id]).await.unwrap();
        assert_eq!(items, new.items);
        assert_eq!(db.store.orders_for_user(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stock_conflict_rolls_back_everything() {
        let db = TestDb::new().await;
        let rose = sample("Red Rose", 100_000, None, 10);
        let tulip = sample("Tulip", 30_000, None, 5);
        db.insert_product(&rose).await;
        db.insert_product(&tulip).await;

        let new = priced(UserId::new(), &[(&rose, 2), (&tulip, 3)]);
        sqlx::query("UPDATE products SET stock = 1 WHERE id = $1")
            .bind(tulip.id.into_uuid())
            .execute(&db.pool)
            .await
            .unwrap();

        let err = db.store.commit_order(&new).await.unwrap_err();
        assert_eq!(err, StoreError::StockConflict { product_name: "Tulip".into() });
        assert_eq!(db.count("orders").await, 0);
        assert_eq!(db.count("order_items").await, 0);
        assert_eq!(db.stock(&rose).await, 10);
        assert_eq!(db.stock(&tulip).await, 1);
    }

    #[tokio::test]
    async fn test_deactivated_product_is_reported_as_unavailable() {
        let db = TestDb::new().await;
        let lily = sample("Lily", 50_000, None, 10);
        db.insert_product(&lily).await;

        let new = priced(UserId::new(), &[(&lily, 1)]);
        sqlx::query("UPDATE products SET active = FALSE WHERE id = $1")
            .bind(lily.id.into_uuid())
            .execute(&db.pool)
            .await
            .unwrap();

        let err = db.store.commit_order(&new).await.unwrap_err();
        assert_eq!(err, StoreError::ProductUnavailable { product_name: "Lily".into() });
        assert_eq!(db.count("orders").await, 0);
        assert_eq!(db.stock(&lily).await, 10);
    }

    #[tokio::test]
    async fn test_inconsistent_totals_are_refused_by_the_schema() {
        let db = TestDb::new().await;
        let rose = sample("Red Rose", 100_000, None, 10);
        db.insert_product(&rose).await;

        let mut new = priced(UserId::new(), &[(&rose, 1)]);
        new.order.grand_total = Money::new(1);
        assert!(matches!(db.store.commit_order(&new).await, Err(StoreError::Backend(_))));

        let mut new = priced(UserId::new(), &[(&rose, 1)]);
        new.items[0].line_total = Money::new(1);
        assert!(matches!(db.store.commit_order(&new).await, Err(StoreError::Backend(_))));

        assert_eq!(db.count("orders").await, 0);
        assert_eq!(db.stock(&rose).await, 10);
    }

    #[tokio::test]
    async fn test_cancel_restocks_once() {
        let db = TestDb::new().await;
        let rose = sample("Red Rose", 100_000, None, 5);
        db.insert_product(&rose).await;
        let user = UserId::new();
        let new = priced(user, &[(&rose, 2)]);
        db.store.commit_order(&new).await.unwrap();

        assert_eq!(db.store.cancel_order(new.order.id, UserId::new()).await.unwrap(), Transition::Stale);
        assert_eq!(db.stock(&rose).await, 3);

        assert_eq!(db.store.cancel_order(new.order.id, user).await.unwrap(), Transition::Applied);
        assert_eq!(db.stock(&rose).await, 5);
        let order = db.store.order(new.order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Canceled);

        assert_eq!(db.store.cancel_order(new.order.id, user).await.unwrap(), Transition::Stale);
        assert_eq!(db.store.mark_paid(new.order.id, user).await.unwrap(), Transition::Stale);
        assert_eq!(db.stock(&rose).await, 5);
    }

    #[tokio::test]
    async fn test_mark_paid_only_from_pending() {
        let db = TestDb::new().await;
        let rose = sample("Red Rose", 100_000, None, 5);
        db.insert_product(&rose).await;
        let user = UserId::new();
        let new = priced(user, &[(&rose, 1)]);
        db.store.commit_order(&new).await.unwrap();

        assert_eq!(db.store.mark_paid(new.order.id, user).await.unwrap(), Transition::Applied);
        assert_eq!(db.store.mark_paid(new.order.id, user).await.unwrap(), Transition::Stale);
        assert_eq!(db.store.cancel_order(new.order.id, user).await.unwrap(), Transition::Stale);
        assert_eq!(db.stock(&rose).await, 4);
    }

    #[tokio::test]
    async fn test_deleted_product_keeps_order_history() {
        let db = TestDb::new().await;
        let rose = sample("Red Rose", 100_000, None, 5);
        let tulip = sample("Tulip", 30_000, None, 5);
        db.insert_product(&rose).await;
        db.insert_product(&tulip).await;
        let user = UserId::new();
        let new = priced(user, &[(&rose, 1), (&tulip, 2)]);
        db.store.commit_order(&new).await.unwrap();

        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(rose.id.into_uuid())
            .execute(&db.pool)
            .await
            .unwrap();

        let items = db.store.items_for_orders(&[new.order.id]).await.unwrap();
        let gone = items.iter().find(|i| i.product_name == "Red Rose").unwrap();
        assert_eq!(gone.product_id, None);
        assert_eq!(gone.product_slug, "red-rose");
        assert_eq!(gone.line_total, Money::new(100_000));

        // the surviving line is still restocked
        assert_eq!(db.store.cancel_order(new.order.id, user).await.unwrap(), Transition::Applied);
        assert_eq!(db.stock(&tulip).await, 5);
    }

    #[tokio::test]
    async fn test_listing_filters_and_pages() {
        let db = TestDb::new().await;
        db.insert_product(&sample("Red Rose", 100_000, Some(80_000), 4)).await;
        db.insert_product(&sample("White Rose", 60_000, None, 0)).await;
        let mut hidden = sample("Hidden Rose", 10_000, None, 9);
        hidden.active = false;
        db.insert_product(&hidden).await;

        let filter = ProductFilter { search: Some("rose".into()), ..Default::default() };
        assert_eq!(db.store.list_products(&filter).await.unwrap().total, 2);

        let filter = ProductFilter { in_stock: true, max_price: Some(80_000), ..Default::default() };
        let page = db.store.list_products(&filter).await.unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].name, "Red Rose");

        assert!(db.store.active_product_by_slug("hidden-rose").await.unwrap().is_none());
    }
}
