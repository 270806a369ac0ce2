//! Domain types for the replay engine.

pub mod bar;
pub mod instrument;
pub mod trade;

pub use bar::{Bar, BarError};
pub use instrument::Instrument;
pub use trade::{
    ClosedTradeRecord, Direction, EntrySnapshot, ExitReason, OpenTrade, Strategy, TradeResult,
};
