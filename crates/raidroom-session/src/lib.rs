//! Raidroom — Session context.
//!
//! The turn phase engine (`Room`) is a plain state machine: every input
//! returns an ordered list of effects and performs no I/O. The room actor
//! owns one `Room`, executes those effects (fan-out, countdown timer, oracle
//! calls, delayed steps), and feeds the results back in as further inputs.
//! All mutation therefore happens on the actor's task, one command at a time.

pub mod application;
pub mod domain;
