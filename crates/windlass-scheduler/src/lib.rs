//! Windlass Scheduler
//!
//! The polling supervisor: one long-lived loop per (user, automation)
//! pair that drives triggered workflows. Each loop runs a test tick on
//! registration, then polls at the trigger's interval; ticks for the
//! same pair never overlap (a tick that comes due while the previous one
//! is still running is skipped). Polling state (cursor and processed
//! set) is persisted after every tick, and OAuth tokens are refreshed
//! on demand before the engine runs.
//!
//! Loops survive process restarts: on startup every record with
//! `is_active = true` is re-installed, staggered to avoid a thundering
//! herd against the external APIs.

mod error;
mod supervisor;
mod template;
mod tick;

pub use error::SchedulerError;
pub use supervisor::{PollConfig, PollSupervisor};
pub use template::{AutomationTemplate, TemplateSource};
pub use tick::TickOutcome;
