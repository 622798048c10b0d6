//! Payment records attached to orders and priced reservations
//!
//! Payments are recorded, not charged: a client settles a pending payment by
//! supplying the external transaction reference.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::errors::DomainError;
use crate::domain::identifiers::{OrderId, PaymentId, ReservationId, UserId};
use crate::domain::types::{Money, TransactionReference};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[display("card")]
    Card,
    #[display("cash_on_pickup")]
    CashOnPickup,
    #[display("bank_transfer")]
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::CashOnPickup => "cash_on_pickup",
            Self::BankTransfer => "bank_transfer",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "cash_on_pickup" => Ok(Self::CashOnPickup),
            "bank_transfer" => Ok(Self::BankTransfer),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[display("pending")]
    Pending,
    #[display("completed")]
    Completed,
    #[display("failed")]
    Failed,
    #[display("cancelled")]
    Cancelled,
    #[display("refunded")]
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// What a payment pays for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PaymentSubject {
    Order(OrderId),
    Reservation(ReservationId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub subject: PaymentSubject,
    pub payer_id: UserId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub reference: Option<TransactionReference>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        subject: PaymentSubject,
        payer_id: UserId,
        amount: Money,
        method: PaymentMethod,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentId::generate(),
            subject,
            payer_id,
            amount,
            method,
            status: PaymentStatus::Pending,
            reference: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn complete(&mut self, reference: TransactionReference) -> Result<(), DomainError> {
        self.require(PaymentStatus::Pending, PaymentStatus::Completed)?;
        self.status = PaymentStatus::Completed;
        self.reference = Some(reference);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn fail(&mut self) -> Result<(), DomainError> {
        self.require(PaymentStatus::Pending, PaymentStatus::Failed)?;
        self.status = PaymentStatus::Failed;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Void the payment because what it paid for was cancelled
    ///
    /// Pending payments are cancelled, completed ones refunded. Payments that
    /// already failed or were voided are left as they are.
    pub fn void(&mut self) {
        let next = match self.status {
            PaymentStatus::Pending => PaymentStatus::Cancelled,
            PaymentStatus::Completed => PaymentStatus::Refunded,
            PaymentStatus::Failed | PaymentStatus::Cancelled | PaymentStatus::Refunded => return,
        };
        self.status = next;
        self.updated_at = Utc::now();
    }

    fn require(&self, expected: PaymentStatus, next: PaymentStatus) -> Result<(), DomainError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(DomainError::invalid_transition("payment", self.status, next))
        }
    }
}
