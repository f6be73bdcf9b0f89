use super::models::*;
use super::store::{LedgerSession, LedgerStore};
use crate::error::{AppError, AppResult, SettlementError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{prelude::FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

const DRAW_SELECT: &str = r#"
    SELECT
        d.id, d.game_id, g.name AS game_name, d.scheduled_at, d.status,
        d.winner_item_id, gi.number AS winner_item_number,
        d.closed_at, d.drawn_at, d.completed_at, d.notes
    FROM draws d
    JOIN games g ON g.id = d.game_id
    LEFT JOIN game_items gi ON gi.id = d.winner_item_id
"#;

/// Ledger repository - THE source of truth for draws, tickets and balances
pub struct LedgerRepository {
    pub pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for LedgerRepository {
    type Session = PgLedgerSession;

    async fn begin(&self) -> AppResult<PgLedgerSession> {
        Ok(PgLedgerSession {
            tx: self.pool.begin().await?,
        })
    }

    async fn get_draw(&self, draw_id: Uuid) -> AppResult<Option<Draw>> {
        let sql = format!("{DRAW_SELECT} WHERE d.id = $1");
        let draw = sqlx::query_as::<_, Draw>(&sql)
            .bind(draw_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(draw)
    }

    async fn pending_draws(&self) -> AppResult<Vec<Draw>> {
        let sql = format!(
            "{DRAW_SELECT} WHERE d.status = $1 AND d.winner_item_id IS NOT NULL ORDER BY d.scheduled_at"
        );
        let draws = sqlx::query_as::<_, Draw>(&sql)
            .bind(DrawStatus::Drawn)
            .fetch_all(&self.pool)
            .await?;

        Ok(draws)
    }

    async fn tickets_for_draw(&self, draw_id: Uuid) -> AppResult<Vec<TicketWithOwner>> {
        let tickets = sqlx::query_as::<_, TicketWithOwner>(
            r#"
            SELECT t.id, t.user_id, u.username, t.status, t.total_prize, t.created_at
            FROM tickets t
            JOIN users u ON u.id = t.user_id
            WHERE t.draw_id = $1
            ORDER BY t.created_at
            "#,
        )
        .bind(draw_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }
}

/// Ticket row joined with the owner's username
#[derive(FromRow)]
struct ActiveTicketRow {
    id: Uuid,
    user_id: Uuid,
    draw_id: Uuid,
    status: TicketStatus,
    total_prize: Decimal,
    created_at: DateTime<Utc>,
    username: String,
}

/// A Postgres transaction scoped to one settlement run.
/// sqlx rolls the transaction back when it is dropped uncommitted.
pub struct PgLedgerSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerSession for PgLedgerSession {
    async fn lock_draw(&mut self, draw_id: Uuid) -> AppResult<Option<Draw>> {
        // Concurrent settlements of one draw queue up on this row lock
        let sql = format!("{DRAW_SELECT} WHERE d.id = $1 FOR UPDATE OF d");
        let draw = sqlx::query_as::<_, Draw>(&sql)
            .bind(draw_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(draw)
    }

    async fn active_tickets(&mut self, draw_id: Uuid) -> AppResult<Vec<TicketForSettlement>> {
        let rows = sqlx::query_as::<_, ActiveTicketRow>(
            r#"
            SELECT t.id, t.user_id, t.draw_id, t.status, t.total_prize, t.created_at, u.username
            FROM tickets t
            JOIN users u ON u.id = t.user_id
            WHERE t.draw_id = $1 AND t.status = $2
            ORDER BY t.created_at
            FOR UPDATE OF t
            "#,
        )
        .bind(draw_id)
        .bind(TicketStatus::Active)
        .fetch_all(&mut *self.tx)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ticket_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let details = sqlx::query_as::<_, TicketDetail>(
            r#"
            SELECT id, ticket_id, game_item_id, amount, multiplier, outcome, prize
            FROM ticket_details
            WHERE ticket_id = ANY($1)
            ORDER BY ticket_id, id
            "#,
        )
        .bind(&ticket_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut by_ticket: HashMap<Uuid, Vec<TicketDetail>> = HashMap::new();
        for detail in details {
            by_ticket.entry(detail.ticket_id).or_default().push(detail);
        }

        let tickets = rows
            .into_iter()
            .map(|row| TicketForSettlement {
                details: by_ticket.remove(&row.id).unwrap_or_default(),
                username: row.username,
                ticket: Ticket {
                    id: row.id,
                    user_id: row.user_id,
                    draw_id: row.draw_id,
                    status: row.status,
                    total_prize: row.total_prize,
                    created_at: row.created_at,
                },
            })
            .collect();

        Ok(tickets)
    }

    async fn record_line_outcome(
        &mut self,
        detail_id: Uuid,
        outcome: LineOutcome,
        prize: Decimal,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE ticket_details
            SET outcome = $2, prize = $3
            WHERE id = $1 AND outcome IS NULL
            "#,
        )
        .bind(detail_id)
        .bind(outcome)
        .bind(prize)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Internal(format!(
                "Ticket detail {} already has an outcome",
                detail_id
            )));
        }

        Ok(())
    }

    async fn record_ticket_outcome(
        &mut self,
        ticket_id: Uuid,
        status: TicketStatus,
        total_prize: Decimal,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET status = $3, total_prize = $4, updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(ticket_id)
        .bind(TicketStatus::Active)
        .bind(status)
        .bind(total_prize)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Internal(format!(
                "Ticket {} is no longer active",
                ticket_id
            )));
        }

        Ok(())
    }

    async fn credit_balance(&mut self, user_id: Uuid, amount: Decimal) -> AppResult<BalanceChange> {
        // Both sides come back at column scale
        let (before, after) = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            UPDATE users
            SET balance = balance + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING balance - $2::NUMERIC(18, 2), balance
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User not found: {}", user_id)))?;

        Ok(BalanceChange { before, after })
    }

    async fn insert_transaction(&mut self, transaction: NewTransaction) -> AppResult<Uuid> {
        let kind = transaction.metadata.kind();
        let metadata = transaction.metadata.to_json()?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO transactions (
                user_id, kind, amount, status, description, metadata,
                balance_before, balance_after
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(transaction.user_id)
        .bind(kind)
        .bind(transaction.amount)
        .bind(TRANSACTION_STATUS_COMPLETED)
        .bind(&transaction.description)
        .bind(metadata)
        .bind(transaction.balance_before)
        .bind(transaction.balance_after)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(id)
    }

    async fn complete_draw(&mut self, draw_id: Uuid) -> AppResult<DateTime<Utc>> {
        let from = DrawStatus::Drawn;
        let to = DrawStatus::Completed;
        if !from.can_advance_to(to) {
            return Err(SettlementError::InvalidState {
                draw_id,
                current: from.to_string(),
                expected: to.to_string(),
            }
            .into());
        }

        let completed_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            UPDATE draws
            SET status = $3, completed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING completed_at
            "#,
        )
        .bind(draw_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| SettlementError::InvalidState {
            draw_id,
            current: "unknown".to_string(),
            expected: from.to_string(),
        })?;

        debug!(%draw_id, "Draw marked completed");
        Ok(completed_at)
    }

    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> AppResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
