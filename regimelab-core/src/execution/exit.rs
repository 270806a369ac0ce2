//! Exit detection against a bar's high/low.
//!
//! When one bar trades through both the stop and the target, the intrabar
//! path is unknown; the stop is assumed to have filled first.

use crate::domain::{Bar, Direction, ExitReason, OpenTrade};

/// Which level was hit and at what price, before exit costs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitSignal {
    pub reason: ExitReason,
    pub level: f64,
}

pub fn check_exit(trade: &OpenTrade, bar: &Bar) -> Option<ExitSignal> {
    let (stop_hit, target_hit) = match trade.direction {
        Direction::Buy => (bar.low <= trade.stop_loss, bar.high >= trade.take_profit),
        Direction::Sell => (bar.high >= trade.stop_loss, bar.low <= trade.take_profit),
    };

    if stop_hit {
        let reason = if trade.breakeven_applied {
            ExitReason::BreakevenStop
        } else {
            ExitReason::StopLoss
        };
        return Some(ExitSignal {
            reason,
            level: trade.stop_loss,
        });
    }
    if target_hit {
        return Some(ExitSignal {
            reason: ExitReason::TakeProfit,
            level: trade.take_profit,
        });
    }
    None
}
