// Settlement Coordinator - one draw, one transaction
//
// Flow:
// 1. Lock the draw row and re-check it is DRAWN with a winning item
// 2. Load every active ticket with its lines
// 3. Evaluate each ticket, write lines, ticket, balance credit and PRIZE entry
// 4. Move the draw to COMPLETED
// 5. Commit; any error rolls the whole draw back

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::evaluator::{evaluate_ticket, Wager};
use crate::error::{AppResult, SettlementError};
use crate::ledger::models::{
    Draw, DrawStatus, NewTransaction, TicketForSettlement, TransactionMetadata, WinningItem,
};
use crate::ledger::store::{LedgerSession, LedgerStore};

/// Outcome of one successful settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub draw_id: Uuid,
    pub game_name: String,
    pub winner_item_number: String,
    pub total_tickets: usize,
    pub winners_count: usize,
    pub losers_count: usize,
    pub total_prizes_awarded: Decimal,
    pub completed_at: DateTime<Utc>,
}

pub struct SettlementCoordinator<S: LedgerStore> {
    ledger: Arc<S>,
}

impl<S: LedgerStore> Clone for SettlementCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
        }
    }
}

impl<S: LedgerStore> SettlementCoordinator<S> {
    pub fn new(ledger: Arc<S>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<S> {
        &self.ledger
    }

    /// Settle one draw in its own transaction.
    ///
    /// The session is committed only when every write succeeded; on error it
    /// is rolled back, and if this future is dropped midway the session drop
    /// discards the writes.
    pub async fn settle(&self, draw_id: Uuid) -> AppResult<SettlementSummary> {
        info!(%draw_id, "Starting prize settlement");

        let mut session = self.ledger.begin().await?;

        match self.settle_in(&mut session, draw_id).await {
            Ok(summary) => {
                session.commit().await?;
                info!(
                    %draw_id,
                    game = %summary.game_name,
                    winner = %summary.winner_item_number,
                    tickets = summary.total_tickets,
                    winners = summary.winners_count,
                    losers = summary.losers_count,
                    total_prizes = %summary.total_prizes_awarded,
                    "Prize settlement completed"
                );
                Ok(summary)
            }
            Err(e) => {
                if let Err(rollback_error) = session.rollback().await {
                    error!(%draw_id, "Rollback failed: {:?}", rollback_error);
                }
                error!(%draw_id, kind = e.kind().as_str(), "Prize settlement failed: {}", e);
                Err(e)
            }
        }
    }

    /// Run settlement inside a caller-owned session without committing it
    pub async fn settle_in(
        &self,
        session: &mut S::Session,
        draw_id: Uuid,
    ) -> AppResult<SettlementSummary> {
        let draw = session
            .lock_draw(draw_id)
            .await?
            .ok_or(SettlementError::DrawNotFound(draw_id))?;

        let winner = Self::check_settleable(&draw)?;

        let tickets = session.active_tickets(draw_id).await?;
        debug!(%draw_id, tickets = tickets.len(), "Loaded active tickets");

        let mut winners_count = 0;
        let mut total_prizes_awarded = Decimal::ZERO;

        for entry in &tickets {
            let paid = Self::settle_ticket(session, &draw, &winner, entry).await?;
            if let Some(prize) = paid {
                winners_count += 1;
                total_prizes_awarded += prize;
            }
        }

        let completed_at = session.complete_draw(draw_id).await?;

        Ok(SettlementSummary {
            draw_id,
            game_name: draw.game_name,
            winner_item_number: winner.number,
            total_tickets: tickets.len(),
            winners_count,
            losers_count: tickets.len() - winners_count,
            total_prizes_awarded,
            completed_at,
        })
    }

    /// Entry precondition: DRAWN with a resolved winning item
    fn check_settleable(draw: &Draw) -> AppResult<WinningItem> {
        if draw.status != DrawStatus::Drawn {
            return Err(SettlementError::InvalidState {
                draw_id: draw.id,
                current: draw.status.to_string(),
                expected: DrawStatus::Drawn.to_string(),
            }
            .into());
        }

        draw.winner()
            .ok_or_else(|| SettlementError::MissingWinner(draw.id).into())
    }

    /// Write one ticket's outcome; returns the prize paid when it won
    async fn settle_ticket(
        session: &mut S::Session,
        draw: &Draw,
        winner: &WinningItem,
        entry: &TicketForSettlement,
    ) -> AppResult<Option<Decimal>> {
        let wagers: Vec<Wager> = entry.details.iter().map(Wager::from).collect();
        let evaluation = evaluate_ticket(winner.item_id, &wagers);

        for line in &evaluation.lines {
            session
                .record_line_outcome(line.detail_id, line.outcome, line.prize)
                .await?;
        }

        session
            .record_ticket_outcome(entry.ticket.id, evaluation.status, evaluation.total_prize)
            .await?;

        if !evaluation.is_winner() {
            return Ok(None);
        }

        let balance = session
            .credit_balance(entry.ticket.user_id, evaluation.total_prize)
            .await?;

        session
            .insert_transaction(NewTransaction {
                user_id: entry.ticket.user_id,
                amount: evaluation.total_prize,
                description: format!(
                    "Prize won - {} #{} ({})",
                    draw.game_name,
                    winner.number,
                    draw.scheduled_at.format("%Y-%m-%d %H:%M")
                ),
                metadata: TransactionMetadata::Prize {
                    ticket_id: entry.ticket.id,
                    draw_id: draw.id,
                    winner_item_number: winner.number.clone(),
                },
                balance_before: balance.before,
                balance_after: balance.after,
            })
            .await?;

        debug!(
            ticket_id = %entry.ticket.id,
            user = %entry.username,
            prize = %evaluation.total_prize,
            "Prize credited"
        );

        Ok(Some(evaluation.total_prize))
    }
}
