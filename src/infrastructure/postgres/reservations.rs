use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use super::catalog::{lock_event, lock_service, save_event};
use super::orders::{insert_payment, payment_for, save_payment};
use super::rows::{self, int, RESERVATION_COLUMNS};
use super::PostgresStore;
use crate::application::store::{
    EventReservationRequest, Page, ReservationStore, ServiceBookingRequest,
};
use crate::application::transactions;
use crate::domain::{
    Payment, PaymentSubject, Reservation, ReservationId, ReservationTarget, ServiceId, TimeSlot,
    UserId,
};
use crate::{Error, Result};

async fn insert_reservation(conn: &mut PgConnection, reservation: &Reservation) -> Result<()> {
    let (kind, event_id, seats, service_id, slot) = match reservation.target {
        ReservationTarget::Event { event_id, seats } => (
            "event",
            Some(event_id.into_inner()),
            Some(int(seats.into_inner())?),
            None,
            None,
        ),
        ReservationTarget::Service { service_id, slot } => (
            "service",
            None,
            None,
            Some(service_id.into_inner()),
            Some(slot),
        ),
    };

    sqlx::query(
        "INSERT INTO reservations (id, client_id, vendor_id, kind, event_id, seats, service_id, \
         slot_starts_at, slot_ends_at, total, status, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(reservation.id.into_inner())
    .bind(reservation.client_id.into_inner())
    .bind(reservation.vendor_id.into_inner())
    .bind(kind)
    .bind(event_id)
    .bind(seats)
    .bind(service_id)
    .bind(slot.map(|s| s.starts_at))
    .bind(slot.map(|s| s.ends_at))
    .bind(reservation.total.into_inner())
    .bind(reservation.status.as_str())
    .bind(reservation.created_at)
    .bind(reservation.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn lock_reservation(conn: &mut PgConnection, id: ReservationId) -> Result<Reservation> {
    let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1 FOR UPDATE");
    let row = sqlx::query(&sql)
        .bind(id.into_inner())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::not_found(format!("reservation {id}")))?;
    rows::reservation(&row)
}

pub(super) async fn confirmed_slots(
    conn: &mut PgConnection,
    service_id: ServiceId,
    after: DateTime<Utc>,
) -> Result<Vec<TimeSlot>> {
    let found = sqlx::query(
        "SELECT slot_starts_at, slot_ends_at FROM reservations \
         WHERE service_id = $1 AND status = 'confirmed' AND slot_ends_at > $2 \
         ORDER BY slot_starts_at",
    )
    .bind(service_id.into_inner())
    .bind(after)
    .fetch_all(&mut *conn)
    .await?;
    found.iter().map(rows::slot).collect()
}

impl PostgresStore {
    async fn list_reservations_where(
        &self,
        column: &str,
        user: UserId,
        page: Page,
    ) -> Result<Vec<Reservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE {column} = $1 \
             ORDER BY id DESC LIMIT $2 OFFSET $3"
        );
        let found = sqlx::query(&sql)
            .bind(user.into_inner())
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(self.pool())
            .await?;
        found.iter().map(rows::reservation).collect()
    }
}

#[async_trait]
impl ReservationStore for PostgresStore {
    async fn reserve_event(
        &self,
        request: &EventReservationRequest,
    ) -> Result<(Reservation, Option<Payment>)> {
        let mut tx = self.pool().begin().await?;
        let mut event = lock_event(&mut tx, request.event_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("event {}", request.event_id)))?;

        let (reservation, payment) = transactions::reserve_event(request, &mut event, Utc::now())?;

        save_event(&mut tx, &event).await?;
        insert_reservation(&mut tx, &reservation).await?;
        if let Some(payment) = &payment {
            insert_payment(&mut tx, payment).await?;
        }
        tx.commit().await?;
        Ok((reservation, payment))
    }

    async fn book_service(
        &self,
        request: &ServiceBookingRequest,
    ) -> Result<(Reservation, Option<Payment>)> {
        let mut tx = self.pool().begin().await?;
        // The service row lock serializes bookings for the same service.
        let service = lock_service(&mut tx, request.service_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("service {}", request.service_id)))?;
        let now = Utc::now();
        let booked = confirmed_slots(&mut tx, service.id, now).await?;

        let (reservation, payment) = transactions::book_service(request, &service, &booked, now)?;

        insert_reservation(&mut tx, &reservation).await?;
        if let Some(payment) = &payment {
            insert_payment(&mut tx, payment).await?;
        }
        tx.commit().await?;
        Ok((reservation, payment))
    }

    async fn cancel_reservation(
        &self,
        id: ReservationId,
        actor: UserId,
    ) -> Result<(Reservation, Option<Payment>)> {
        let mut tx = self.pool().begin().await?;
        let mut reservation = lock_reservation(&mut tx, id).await?;
        let mut payment = payment_for(&mut tx, PaymentSubject::Reservation(id), true).await?;
        let mut event = match reservation.target {
            ReservationTarget::Event { event_id, .. } => lock_event(&mut tx, event_id).await?,
            ReservationTarget::Service { .. } => None,
        };

        transactions::cancel_reservation(
            &mut reservation,
            payment.as_mut(),
            event.as_mut(),
            actor,
        )?;

        if let Some(event) = &event {
            save_event(&mut tx, event).await?;
        }
        if let Some(payment) = &payment {
            save_payment(&mut tx, payment).await?;
        }
        sqlx::query("UPDATE reservations SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(reservation.id.into_inner())
            .bind(reservation.status.as_str())
            .bind(reservation.updated_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok((reservation, payment))
    }

    async fn find_reservation(&self, id: ReservationId) -> Result<Option<Reservation>> {
        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.into_inner())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(rows::reservation).transpose()
    }

    async fn list_reservations_for_client(
        &self,
        client_id: UserId,
        page: Page,
    ) -> Result<Vec<Reservation>> {
        self.list_reservations_where("client_id", client_id, page)
            .await
    }

    async fn list_reservations_for_vendor(
        &self,
        vendor_id: UserId,
        page: Page,
    ) -> Result<Vec<Reservation>> {
        self.list_reservations_where("vendor_id", vendor_id, page)
            .await
    }
}
