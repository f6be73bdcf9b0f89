// In-memory ledger used by the settlement tests.
//
// A session holds the store lock for its whole lifetime and works on a copy
// of the state; commit writes the copy back, drop discards it. Money writes are
// rounded to the column scale the way Postgres stores them.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::models::*;
use super::store::{LedgerSession, LedgerStore};
use crate::error::{AppError, AppResult, SettlementError};

#[derive(Debug, Clone)]
pub struct StoredDraw {
    pub id: Uuid,
    pub game_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub status: DrawStatus,
    pub winner_item_id: Option<Uuid>,
    pub closed_at: Option<DateTime<Utc>>,
    pub drawn_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    pub games: HashMap<Uuid, String>,
    pub items: HashMap<Uuid, GameItem>,
    pub users: HashMap<Uuid, User>,
    pub draws: HashMap<Uuid, StoredDraw>,
    pub tickets: HashMap<Uuid, Ticket>,
    pub details: Vec<TicketDetail>,
    pub transactions: Vec<LedgerTransaction>,
}

impl LedgerState {
    fn draw_view(&self, draw_id: Uuid) -> Option<Draw> {
        let stored = self.draws.get(&draw_id)?;
        let winner_item_number = stored
            .winner_item_id
            .and_then(|item_id| self.items.get(&item_id))
            .map(|item| item.number.clone());

        Some(Draw {
            id: stored.id,
            game_id: stored.game_id,
            game_name: self.games.get(&stored.game_id).cloned().unwrap_or_default(),
            scheduled_at: stored.scheduled_at,
            status: stored.status,
            winner_item_id: stored.winner_item_id,
            winner_item_number,
            closed_at: stored.closed_at,
            drawn_at: stored.drawn_at,
            completed_at: stored.completed_at,
            notes: stored.notes.clone(),
        })
    }

    pub fn user(&self, user_id: Uuid) -> &User {
        &self.users[&user_id]
    }

    pub fn ticket(&self, ticket_id: Uuid) -> &Ticket {
        &self.tickets[&ticket_id]
    }

    pub fn lines(&self, ticket_id: Uuid) -> Vec<&TicketDetail> {
        self.details
            .iter()
            .filter(|detail| detail.ticket_id == ticket_id)
            .collect()
    }

    pub fn draw_status(&self, draw_id: Uuid) -> DrawStatus {
        self.draws[&draw_id].status
    }

    pub fn prize_transactions(&self) -> Vec<&LedgerTransaction> {
        self.transactions
            .iter()
            .filter(|tx| tx.kind == TransactionKind::Prize)
            .collect()
    }
}

#[derive(Default)]
struct Faults {
    /// Fail the n-th ticket status write of the next session that reaches it
    fail_on_ticket_write: StdMutex<Option<usize>>,
}

#[derive(Clone, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<LedgerState>>,
    faults: Arc<Faults>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> LedgerState {
        self.state.lock().await.clone()
    }

    /// Inject a storage failure on the `nth` (1-based) ticket write of one run
    pub fn fail_on_ticket_write(&self, nth: usize) {
        if let Ok(mut slot) = self.faults.fail_on_ticket_write.lock() {
            *slot = Some(nth);
        }
    }

    pub async fn add_game(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.games.insert(id, name.to_string());
        id
    }

    pub async fn add_item(&self, game_id: Uuid, number: &str, multiplier: Decimal) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.items.insert(
            id,
            GameItem {
                id,
                game_id,
                number: number.to_string(),
                name: format!("Item {}", number),
                multiplier,
                is_active: true,
            },
        );
        id
    }

    pub async fn set_item_multiplier(&self, item_id: Uuid, multiplier: Decimal) {
        if let Some(item) = self.state.lock().await.items.get_mut(&item_id) {
            item.multiplier = multiplier;
        }
    }

    pub async fn add_user(&self, username: &str, balance: Decimal) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.users.insert(
            id,
            User {
                id,
                username: username.to_string(),
                balance,
            },
        );
        id
    }

    pub async fn add_draw(&self, game_id: Uuid, status: DrawStatus, winner: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        let mut state = self.state.lock().await;
        let scheduled_at = Utc::now() + Duration::minutes(state.draws.len() as i64);
        state.draws.insert(
            id,
            StoredDraw {
                id,
                game_id,
                scheduled_at,
                status,
                winner_item_id: winner,
                closed_at: None,
                drawn_at: winner.map(|_| Utc::now()),
                completed_at: None,
                notes: None,
            },
        );
        id
    }

    pub async fn clear_winner(&self, draw_id: Uuid) {
        if let Some(draw) = self.state.lock().await.draws.get_mut(&draw_id) {
            draw.winner_item_id = None;
        }
    }

    /// Add an active ticket whose lines are `(item, amount, multiplier snapshot)`
    pub async fn add_ticket(
        &self,
        user_id: Uuid,
        draw_id: Uuid,
        lines: &[(Uuid, Decimal, Decimal)],
    ) -> Uuid {
        let id = Uuid::new_v4();
        let mut state = self.state.lock().await;
        let created_at = Utc::now() + Duration::seconds(state.tickets.len() as i64);
        state.tickets.insert(
            id,
            Ticket {
                id,
                user_id,
                draw_id,
                status: TicketStatus::Active,
                total_prize: Decimal::ZERO,
                created_at,
            },
        );
        for (game_item_id, amount, multiplier) in lines {
            state.details.push(TicketDetail {
                id: Uuid::new_v4(),
                ticket_id: id,
                game_item_id: *game_item_id,
                amount: *amount,
                multiplier: *multiplier,
                outcome: None,
                prize: Decimal::ZERO,
            });
        }
        id
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    type Session = MemorySession;

    async fn begin(&self) -> AppResult<MemorySession> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemorySession {
            guard,
            working,
            faults: self.faults.clone(),
            ticket_writes: 0,
        })
    }

    async fn get_draw(&self, draw_id: Uuid) -> AppResult<Option<Draw>> {
        Ok(self.state.lock().await.draw_view(draw_id))
    }

    async fn pending_draws(&self) -> AppResult<Vec<Draw>> {
        let state = self.state.lock().await;
        let mut draws: Vec<Draw> = state
            .draws
            .values()
            .filter(|draw| draw.status == DrawStatus::Drawn && draw.winner_item_id.is_some())
            .filter_map(|draw| state.draw_view(draw.id))
            .collect();
        draws.sort_by_key(|draw| draw.scheduled_at);
        Ok(draws)
    }

    async fn tickets_for_draw(&self, draw_id: Uuid) -> AppResult<Vec<TicketWithOwner>> {
        let state = self.state.lock().await;
        let mut tickets: Vec<TicketWithOwner> = state
            .tickets
            .values()
            .filter(|ticket| ticket.draw_id == draw_id)
            .map(|ticket| TicketWithOwner {
                id: ticket.id,
                user_id: ticket.user_id,
                username: state.user(ticket.user_id).username.clone(),
                status: ticket.status,
                total_prize: ticket.total_prize,
                created_at: ticket.created_at,
            })
            .collect();
        tickets.sort_by_key(|ticket| ticket.created_at);
        Ok(tickets)
    }
}

pub struct MemorySession {
    guard: OwnedMutexGuard<LedgerState>,
    working: LedgerState,
    faults: Arc<Faults>,
    ticket_writes: usize,
}

impl MemorySession {
    fn injected_failure(&mut self) -> AppResult<()> {
        self.ticket_writes += 1;
        let mut slot = self
            .faults
            .fail_on_ticket_write
            .lock()
            .map_err(|_| AppError::Internal("fault plan poisoned".to_string()))?;
        if *slot == Some(self.ticket_writes) {
            *slot = None;
            return Err(AppError::Database(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerSession for MemorySession {
    async fn lock_draw(&mut self, draw_id: Uuid) -> AppResult<Option<Draw>> {
        Ok(self.working.draw_view(draw_id))
    }

    async fn active_tickets(&mut self, draw_id: Uuid) -> AppResult<Vec<TicketForSettlement>> {
        let state = &self.working;
        let mut tickets: Vec<TicketForSettlement> = state
            .tickets
            .values()
            .filter(|ticket| ticket.draw_id == draw_id && ticket.status == TicketStatus::Active)
            .map(|ticket| TicketForSettlement {
                ticket: ticket.clone(),
                details: state.lines(ticket.id).into_iter().cloned().collect(),
                username: state.user(ticket.user_id).username.clone(),
            })
            .collect();
        tickets.sort_by_key(|entry| entry.ticket.created_at);
        Ok(tickets)
    }

    async fn record_line_outcome(
        &mut self,
        detail_id: Uuid,
        outcome: LineOutcome,
        prize: Decimal,
    ) -> AppResult<()> {
        let detail = self
            .working
            .details
            .iter_mut()
            .find(|detail| detail.id == detail_id && detail.outcome.is_none())
            .ok_or_else(|| {
                AppError::Internal(format!("Ticket detail {} already has an outcome", detail_id))
            })?;
        detail.outcome = Some(outcome);
        detail.prize = to_money(prize);
        Ok(())
    }

    async fn record_ticket_outcome(
        &mut self,
        ticket_id: Uuid,
        status: TicketStatus,
        total_prize: Decimal,
    ) -> AppResult<()> {
        self.injected_failure()?;

        let ticket = self
            .working
            .tickets
            .get_mut(&ticket_id)
            .filter(|ticket| ticket.status == TicketStatus::Active)
            .ok_or_else(|| AppError::Internal(format!("Ticket {} is no longer active", ticket_id)))?;
        ticket.status = status;
        ticket.total_prize = to_money(total_prize);
        Ok(())
    }

    async fn credit_balance(&mut self, user_id: Uuid, amount: Decimal) -> AppResult<BalanceChange> {
        let user = self
            .working
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("User not found: {}", user_id)))?;
        let before = user.balance;
        user.balance = to_money(user.balance + amount);
        Ok(BalanceChange {
            before,
            after: user.balance,
        })
    }

    async fn insert_transaction(&mut self, transaction: NewTransaction) -> AppResult<Uuid> {
        let id = Uuid::new_v4();
        self.working.transactions.push(LedgerTransaction {
            id,
            user_id: transaction.user_id,
            kind: transaction.metadata.kind(),
            amount: to_money(transaction.amount),
            status: TRANSACTION_STATUS_COMPLETED.to_string(),
            description: transaction.description,
            metadata: transaction.metadata.to_json()?,
            balance_before: to_money(transaction.balance_before),
            balance_after: to_money(transaction.balance_after),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn complete_draw(&mut self, draw_id: Uuid) -> AppResult<DateTime<Utc>> {
        let draw = self
            .working
            .draws
            .get_mut(&draw_id)
            .ok_or(SettlementError::DrawNotFound(draw_id))?;
        if draw.status != DrawStatus::Drawn || !draw.status.can_advance_to(DrawStatus::Completed) {
            return Err(SettlementError::InvalidState {
                draw_id,
                current: draw.status.to_string(),
                expected: DrawStatus::Drawn.to_string(),
            }
            .into());
        }
        let completed_at = Utc::now();
        draw.status = DrawStatus::Completed;
        draw.completed_at = Some(completed_at);
        Ok(completed_at)
    }

    async fn commit(self) -> AppResult<()> {
        let MemorySession {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> AppResult<()> {
        Ok(())
    }
}
