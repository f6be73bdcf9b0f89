// Settlement Evaluator - pure prize computation, no I/O
//
// A line wins iff its item is the winning item; it then pays
// amount × multiplier snapshot, rounded to the money scale. A ticket wins iff
// any of its lines won and pays the sum of its rounded winning lines, so the
// stored lines always add up to the ticket total.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::ledger::models::{to_money, LineOutcome, TicketDetail, TicketStatus};

/// The inputs of one wagered line the evaluator looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wager {
    pub detail_id: Uuid,
    pub game_item_id: Uuid,
    pub amount: Decimal,
    pub multiplier: Decimal,
}

impl From<&TicketDetail> for Wager {
    fn from(detail: &TicketDetail) -> Self {
        Self {
            detail_id: detail.id,
            game_item_id: detail.game_item_id,
            amount: detail.amount,
            multiplier: detail.multiplier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEvaluation {
    pub detail_id: Uuid,
    pub outcome: LineOutcome,
    pub prize: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketEvaluation {
    pub lines: Vec<LineEvaluation>,
    pub status: TicketStatus,
    pub total_prize: Decimal,
}

impl TicketEvaluation {
    pub fn is_winner(&self) -> bool {
        self.status == TicketStatus::Won
    }
}

pub fn evaluate_line(winning_item_id: Uuid, wager: &Wager) -> LineEvaluation {
    if wager.game_item_id == winning_item_id {
        LineEvaluation {
            detail_id: wager.detail_id,
            outcome: LineOutcome::Won,
            prize: to_money(wager.amount * wager.multiplier),
        }
    } else {
        LineEvaluation {
            detail_id: wager.detail_id,
            outcome: LineOutcome::Lost,
            prize: Decimal::ZERO,
        }
    }
}

pub fn evaluate_ticket(winning_item_id: Uuid, wagers: &[Wager]) -> TicketEvaluation {
    let lines: Vec<LineEvaluation> = wagers
        .iter()
        .map(|wager| evaluate_line(winning_item_id, wager))
        .collect();

    let total_prize = lines
        .iter()
        .filter(|line| line.outcome.is_won())
        .map(|line| line.prize)
        .sum();

    let status = if lines.iter().any(|line| line.outcome.is_won()) {
        TicketStatus::Won
    } else {
        TicketStatus::Lost
    };

    TicketEvaluation {
        lines,
        status,
        total_prize,
    }
}
