//! Shared test doubles and fixtures for Raidroom.

mod clock;
mod fixtures;
mod oracle;
mod rng;

pub use clock::{FixedClock, fixed_clock};
pub use fixtures::{boss_outcome, character, player_outcome};
pub use oracle::{FailingOracle, ScriptedOracle, StallingOracle};
pub use rng::{MockRng, SequenceRng};
