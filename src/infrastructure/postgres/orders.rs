use async_trait::async_trait;
use sqlx::PgConnection;
use std::collections::HashMap;
use uuid::Uuid;

use super::catalog::{lock_products, save_product};
use super::rows::{self, int, ORDER_COLUMNS, ORDER_ITEM_COLUMNS, PAYMENT_COLUMNS};
use super::PostgresStore;
use crate::application::store::{OrderRequest, OrderStore, Page};
use crate::application::transactions;
use crate::domain::{
    Order, OrderId, OrderItem, OrderStatus, Payment, PaymentSubject, TransactionReference, UserId,
};
use crate::{Error, Result};

/// Load the line items of `orders` and attach them in position order
async fn with_items(conn: &mut PgConnection, mut orders: Vec<Order>) -> Result<Vec<Order>> {
    if orders.is_empty() {
        return Ok(orders);
    }

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id.into_inner()).collect();
    let sql = format!(
        "SELECT {ORDER_ITEM_COLUMNS} FROM order_items \
         WHERE order_id = ANY($1) ORDER BY order_id, position"
    );
    let found = sqlx::query(&sql).bind(ids).fetch_all(&mut *conn).await?;

    let mut items: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
    for row in &found {
        let (order_id, item) = rows::order_item(row)?;
        items.entry(order_id).or_default().push(item);
    }
    for order in &mut orders {
        order.items = items.remove(&order.id).unwrap_or_default();
    }
    Ok(orders)
}

async fn lock_order(conn: &mut PgConnection, id: OrderId) -> Result<Order> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
    let row = sqlx::query(&sql)
        .bind(id.into_inner())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::not_found(format!("order {id}")))?;
    let order = rows::order(&row)?;
    with_items(conn, vec![order])
        .await?
        .pop()
        .ok_or_else(|| Error::not_found(format!("order {id}")))
}

async fn insert_order(conn: &mut PgConnection, order: &Order) -> Result<()> {
    sqlx::query(
        "INSERT INTO orders (id, client_id, vendor_id, total, status, note, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(order.id.into_inner())
    .bind(order.client_id.into_inner())
    .bind(order.vendor_id.into_inner())
    .bind(order.total.into_inner())
    .bind(order.status.as_str())
    .bind(order.note.as_ref().map(|n| n.as_ref().to_string()))
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    for (position, item) in order.items.iter().enumerate() {
        let position = i32::try_from(position).map_err(|_| Error::invalid_input("items"))?;
        sqlx::query(
            "INSERT INTO order_items (order_id, position, product_id, product_name, unit_price, quantity) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(order.id.into_inner())
        .bind(position)
        .bind(item.product_id.into_inner())
        .bind(item.product_name.as_ref())
        .bind(item.unit_price.into_inner())
        .bind(int(item.quantity.into_inner())?)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn save_order_status(conn: &mut PgConnection, order: &Order) -> Result<()> {
    sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
        .bind(order.id.into_inner())
        .bind(order.status.as_str())
        .bind(order.updated_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

fn subject_ids(subject: PaymentSubject) -> (Option<Uuid>, Option<Uuid>) {
    match subject {
        PaymentSubject::Order(id) => (Some(id.into_inner()), None),
        PaymentSubject::Reservation(id) => (None, Some(id.into_inner())),
    }
}

pub(super) async fn insert_payment(conn: &mut PgConnection, payment: &Payment) -> Result<()> {
    let (order_id, reservation_id) = subject_ids(payment.subject);
    sqlx::query(
        "INSERT INTO payments (id, order_id, reservation_id, payer_id, amount, method, status, \
         reference, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(payment.id.into_inner())
    .bind(order_id)
    .bind(reservation_id)
    .bind(payment.payer_id.into_inner())
    .bind(payment.amount.into_inner())
    .bind(payment.method.as_str())
    .bind(payment.status.as_str())
    .bind(payment.reference.as_ref().map(|r| r.as_ref().to_string()))
    .bind(payment.created_at)
    .bind(payment.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(super) async fn save_payment(conn: &mut PgConnection, payment: &Payment) -> Result<()> {
    sqlx::query("UPDATE payments SET status = $2, reference = $3, updated_at = $4 WHERE id = $1")
        .bind(payment.id.into_inner())
        .bind(payment.status.as_str())
        .bind(payment.reference.as_ref().map(|r| r.as_ref().to_string()))
        .bind(payment.updated_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Fetch the payment for `subject`, optionally locking it
pub(super) async fn payment_for(
    conn: &mut PgConnection,
    subject: PaymentSubject,
    lock: bool,
) -> Result<Option<Payment>> {
    let (order_id, reservation_id) = subject_ids(subject);
    let sql = format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments \
         WHERE ($1::uuid IS NOT NULL AND order_id = $1) \
            OR ($2::uuid IS NOT NULL AND reservation_id = $2){}",
        if lock { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query(&sql)
        .bind(order_id)
        .bind(reservation_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(rows::payment).transpose()
}

impl PostgresStore {
    async fn list_orders_where(
        &self,
        column: &str,
        user: UserId,
        page: Page,
    ) -> Result<Vec<Order>> {
        let mut conn = self.pool().acquire().await?;
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {column} = $1 \
             ORDER BY id DESC LIMIT $2 OFFSET $3"
        );
        let found = sqlx::query(&sql)
            .bind(user.into_inner())
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&mut *conn)
            .await?;
        let orders = found.iter().map(rows::order).collect::<Result<Vec<_>>>()?;
        with_items(&mut conn, orders).await
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn place_order(&self, request: &OrderRequest) -> Result<(Order, Payment)> {
        let mut tx = self.pool().begin().await?;
        let mut products =
            lock_products(&mut tx, request.lines.iter().map(|line| line.product_id)).await?;

        let (order, payment) = transactions::checkout(request, &mut products)?;

        for item in &order.items {
            if let Some(product) = products.get(&item.product_id) {
                save_product(&mut tx, product).await?;
            }
        }
        insert_order(&mut tx, &order).await?;
        insert_payment(&mut tx, &payment).await?;
        tx.commit().await?;
        Ok((order, payment))
    }

    async fn cancel_order(&self, id: OrderId, actor: UserId) -> Result<(Order, Payment)> {
        let mut tx = self.pool().begin().await?;
        let mut order = lock_order(&mut tx, id).await?;
        let mut payment = payment_for(&mut tx, PaymentSubject::Order(id), true)
            .await?
            .ok_or_else(|| Error::not_found(format!("payment for order {id}")))?;
        let mut products =
            lock_products(&mut tx, order.items.iter().map(|item| item.product_id)).await?;

        transactions::cancel_order(&mut order, &mut payment, &mut products, actor)?;

        for product in products.values() {
            save_product(&mut tx, product).await?;
        }
        save_order_status(&mut tx, &order).await?;
        save_payment(&mut tx, &payment).await?;
        tx.commit().await?;
        Ok((order, payment))
    }

    async fn advance_order(
        &self,
        id: OrderId,
        actor: UserId,
        next: OrderStatus,
    ) -> Result<Order> {
        let mut tx = self.pool().begin().await?;
        let mut order = lock_order(&mut tx, id).await?;

        transactions::advance_order(&mut order, actor, next)?;

        save_order_status(&mut tx, &order).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        let mut conn = self.pool().acquire().await?;
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.into_inner())
            .fetch_optional(&mut *conn)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let order = rows::order(&row)?;
        Ok(with_items(&mut conn, vec![order]).await?.pop())
    }

    async fn list_orders_for_client(&self, client_id: UserId, page: Page) -> Result<Vec<Order>> {
        self.list_orders_where("client_id", client_id, page).await
    }

    async fn list_orders_for_vendor(&self, vendor_id: UserId, page: Page) -> Result<Vec<Order>> {
        self.list_orders_where("vendor_id", vendor_id, page).await
    }

    async fn find_payment(&self, subject: PaymentSubject) -> Result<Option<Payment>> {
        let mut conn = self.pool().acquire().await?;
        payment_for(&mut conn, subject, false).await
    }

    async fn settle_payment(
        &self,
        subject: PaymentSubject,
        payer: UserId,
        reference: TransactionReference,
    ) -> Result<Payment> {
        let mut tx = self.pool().begin().await?;
        let mut payment = payment_for(&mut tx, subject, true)
            .await?
            .ok_or_else(|| Error::not_found(format!("payment for {subject:?}")))?;

        transactions::settle_payment(&mut payment, payer, reference)?;

        save_payment(&mut tx, &payment).await?;
        tx.commit().await?;
        Ok(payment)
    }
}
