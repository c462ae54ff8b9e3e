//! Readiness primitives: the shared wait slot, the named barrier the
//! registry drives, and the ready signal awaitable integrations embed.

pub mod barrier;
pub mod signal;
pub(crate) mod wait_slot;

pub use barrier::{BarrierPhase, ReadinessBarrier};
pub use signal::{ReadyCallback, ReadySignal};
pub use wait_slot::WaitOutcome;
