use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, Type};
use std::fmt;
use uuid::Uuid;

use crate::error::AppResult;

/// Draw lifecycle status
///
/// Forward order: Scheduled → Closed → Drawn → Completed.
/// Published and Cancelled belong to the publishing/cancellation branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "draw_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DrawStatus {
    Scheduled,
    Closed,
    Drawn,
    Published,
    Completed,
    Cancelled,
}

impl fmt::Display for DrawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl DrawStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrawStatus::Scheduled => "scheduled",
            DrawStatus::Closed => "closed",
            DrawStatus::Drawn => "drawn",
            DrawStatus::Published => "published",
            DrawStatus::Completed => "completed",
            DrawStatus::Cancelled => "cancelled",
        }
    }

    /// Valid transitions:
    /// - Scheduled → Closed, Cancelled
    /// - Closed → Drawn, Cancelled
    /// - Drawn → Completed, Published
    /// - Published → Completed
    /// - Completed, Cancelled are terminal
    pub fn can_advance_to(&self, next: DrawStatus) -> bool {
        let allowed: &[DrawStatus] = match self {
            DrawStatus::Scheduled => &[DrawStatus::Closed, DrawStatus::Cancelled],
            DrawStatus::Closed => &[DrawStatus::Drawn, DrawStatus::Cancelled],
            DrawStatus::Drawn => &[DrawStatus::Completed, DrawStatus::Published],
            DrawStatus::Published => &[DrawStatus::Completed],
            DrawStatus::Completed | DrawStatus::Cancelled => &[],
        };
        allowed.contains(&next)
    }
}

/// Ticket lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "ticket_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Won,
    Lost,
}

/// Outcome of one wagered line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "line_outcome", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LineOutcome {
    Won,
    Lost,
}

impl LineOutcome {
    pub fn is_won(&self) -> bool {
        matches!(self, LineOutcome::Won)
    }
}

/// Balance-affecting ledger entry kind.
/// Only `Prize` is written by settlement; the others come from the purchase
/// and cashier flows sharing the same table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "transaction_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Prize,
    Bet,
    Deposit,
    Withdrawal,
}

pub const TRANSACTION_STATUS_COMPLETED: &str = "completed";

/// Scale of every money column (`NUMERIC(18,2)`)
pub const MONEY_SCALE: u32 = 2;

/// Round to the stored money scale, half away from zero like Postgres `NUMERIC`
pub fn to_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Draw joined with its game and (optional) winning item
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Draw {
    pub id: Uuid,
    pub game_id: Uuid,
    pub game_name: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: DrawStatus,
    pub winner_item_id: Option<Uuid>,
    pub winner_item_number: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub drawn_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Draw {
    /// The winning item, present only when both the reference and its number resolved
    pub fn winner(&self) -> Option<WinningItem> {
        match (self.winner_item_id, self.winner_item_number.as_ref()) {
            (Some(item_id), Some(number)) => Some(WinningItem {
                item_id,
                number: number.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinningItem {
    pub item_id: Uuid,
    pub number: String,
}

/// Selectable number/animal within a game
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GameItem {
    pub id: Uuid,
    pub game_id: Uuid,
    pub number: String,
    pub name: String,
    pub multiplier: Decimal,
    pub is_active: bool,
}

/// Player account as seen by settlement
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub draw_id: Uuid,
    pub status: TicketStatus,
    pub total_prize: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One wagered line. `multiplier` is the snapshot taken at bet time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketDetail {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub game_item_id: Uuid,
    pub amount: Decimal,
    pub multiplier: Decimal,
    pub outcome: Option<LineOutcome>,
    pub prize: Decimal,
}

/// An active ticket loaded for settlement, with its lines and owner
#[derive(Debug, Clone)]
pub struct TicketForSettlement {
    pub ticket: Ticket,
    pub details: Vec<TicketDetail>,
    pub username: String,
}

/// Structured metadata of a ledger transaction, serialized only at the storage boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionMetadata {
    Prize {
        ticket_id: Uuid,
        draw_id: Uuid,
        winner_item_number: String,
    },
}

impl TransactionMetadata {
    pub fn kind(&self) -> TransactionKind {
        match self {
            TransactionMetadata::Prize { .. } => TransactionKind::Prize,
        }
    }

    pub fn to_json(&self) -> AppResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Transaction row about to be inserted
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub amount: Decimal,
    pub description: String,
    pub metadata: TransactionMetadata,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
}

/// Immutable ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LedgerTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub status: String,
    pub description: String,
    pub metadata: serde_json::Value,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Result of an additive balance increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    pub before: Decimal,
    pub after: Decimal,
}

/// Ticket row joined with its owner, as read by reporting
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketWithOwner {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub status: TicketStatus,
    pub total_prize: Decimal,
    pub created_at: DateTime<Utc>,
}
