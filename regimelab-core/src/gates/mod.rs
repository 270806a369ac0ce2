//! Pre-trade gates. Each is a pure predicate returning `Ok(())` or a typed veto.
//!
//! Order in the pipeline: behavioral, session, cost.

pub mod behavioral;
pub mod cost;
pub mod session;

pub use behavioral::{BehavioralLimits, BehavioralVeto};
pub use cost::{CostLimits, CostVeto, RolloverWindow};
pub use session::{SessionFilter, SessionVeto};
