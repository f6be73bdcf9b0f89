use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppResult, SettlementError};
use crate::ledger::models::{DrawStatus, TicketStatus, TicketWithOwner};
use crate::ledger::store::LedgerStore;

/// How winners are listed in a prize summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinnerOrder {
    #[default]
    PrizeDesc,
    CreatedAt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WinnerUser {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Winner {
    pub ticket_id: Uuid,
    pub user: WinnerUser,
    pub total_prize: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawPrizeSummary {
    pub draw_id: Uuid,
    pub game_name: String,
    pub winner_item_number: Option<String>,
    pub status: DrawStatus,
    pub total_tickets: usize,
    pub winners_count: usize,
    pub losers_count: usize,
    pub total_prizes_awarded: Decimal,
    pub winners: Vec<Winner>,
}

/// Read-only prize reporting over one draw
pub struct SummaryReader<S: LedgerStore> {
    ledger: Arc<S>,
}

impl<S: LedgerStore> SummaryReader<S> {
    pub fn new(ledger: Arc<S>) -> Self {
        Self { ledger }
    }

    pub async fn summary(&self, draw_id: Uuid, order: WinnerOrder) -> AppResult<DrawPrizeSummary> {
        let draw = self
            .ledger
            .get_draw(draw_id)
            .await?
            .ok_or(SettlementError::DrawNotFound(draw_id))?;

        let tickets = self.ledger.tickets_for_draw(draw_id).await?;
        let total_tickets = tickets.len();
        let winners = Self::winners(tickets, order);
        let total_prizes_awarded: Decimal = winners.iter().map(|w| w.total_prize).sum();

        Ok(DrawPrizeSummary {
            draw_id,
            game_name: draw.game_name,
            winner_item_number: draw.winner_item_number,
            status: draw.status,
            total_tickets,
            winners_count: winners.len(),
            losers_count: total_tickets - winners.len(),
            total_prizes_awarded,
            winners,
        })
    }

    fn winners(tickets: Vec<TicketWithOwner>, order: WinnerOrder) -> Vec<Winner> {
        let mut winners: Vec<Winner> = tickets
            .into_iter()
            .filter(|ticket| ticket.status == TicketStatus::Won)
            .map(|ticket| Winner {
                ticket_id: ticket.id,
                user: WinnerUser {
                    id: ticket.user_id,
                    username: ticket.username,
                },
                total_prize: ticket.total_prize,
                created_at: ticket.created_at,
            })
            .collect();

        match order {
            WinnerOrder::PrizeDesc => winners.sort_by(|a, b| {
                b.total_prize
                    .cmp(&a.total_prize)
                    .then(a.created_at.cmp(&b.created_at))
            }),
            WinnerOrder::CreatedAt => winners.sort_by_key(|w| w.created_at),
        }

        winners
    }
}
