//! Decision pipeline and replay loop.
//!
//! [`decide`] is the one entry point both replay and a live orchestrator use.
//! [`run_replay`] drives it bar by bar and owns the trade lifecycle: at most
//! one open trade, exits checked before any new decision, and a result that
//! reports rather than force-closes a trade left open at the end.

pub mod decision;
pub mod replay;

pub use decision::{decide, Decision, DecisionContext, DecisionFault, SizedSignal, Veto};
pub use replay::{run_replay, run_replay_with_state, validate_bars, ReplayError, ReplayResult};
