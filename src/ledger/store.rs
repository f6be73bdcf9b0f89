use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::models::*;
use crate::error::AppResult;

/// Durable ledger holding draws, tickets, balances and transactions.
///
/// Reads that do not need isolation go straight to the store; everything
/// settlement writes goes through a [`LedgerSession`] obtained from `begin`.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Session: LedgerSession;

    /// Open a new all-or-nothing unit of work
    async fn begin(&self) -> AppResult<Self::Session>;

    async fn get_draw(&self, draw_id: Uuid) -> AppResult<Option<Draw>>;

    /// Draws in `drawn` status with a winning item set, oldest schedule first
    async fn pending_draws(&self) -> AppResult<Vec<Draw>>;

    async fn tickets_for_draw(&self, draw_id: Uuid) -> AppResult<Vec<TicketWithOwner>>;
}

/// One open ledger transaction.
///
/// Dropping a session without calling `commit` discards every write made
/// through it.
#[async_trait]
pub trait LedgerSession: Send {
    /// Load the draw and lock it against concurrent settlement
    async fn lock_draw(&mut self, draw_id: Uuid) -> AppResult<Option<Draw>>;

    /// Active tickets of the draw, each with its lines and owner
    async fn active_tickets(&mut self, draw_id: Uuid) -> AppResult<Vec<TicketForSettlement>>;

    async fn record_line_outcome(
        &mut self,
        detail_id: Uuid,
        outcome: LineOutcome,
        prize: Decimal,
    ) -> AppResult<()>;

    /// Move an active ticket to its settled status
    async fn record_ticket_outcome(
        &mut self,
        ticket_id: Uuid,
        status: TicketStatus,
        total_prize: Decimal,
    ) -> AppResult<()>;

    /// Additive increment of a user's balance
    async fn credit_balance(&mut self, user_id: Uuid, amount: Decimal) -> AppResult<BalanceChange>;

    async fn insert_transaction(&mut self, transaction: NewTransaction) -> AppResult<Uuid>;

    /// Move the draw from `drawn` to `completed`, returning the completion time
    async fn complete_draw(&mut self, draw_id: Uuid) -> AppResult<DateTime<Utc>>;

    async fn commit(self) -> AppResult<()>
    where
        Self: Sized;

    async fn rollback(self) -> AppResult<()>
    where
        Self: Sized;
}
