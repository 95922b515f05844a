//! Test oracles — scripted, failing and stalling `Oracle` implementations.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use raidroom_oracle::{
    BossTurnOutcome, BossTurnRequest, Oracle, OracleError, PlayerTurnOutcome, PlayerTurnRequest,
};
use tokio::sync::Semaphore;

/// An oracle that replays queued results and records every request.
///
/// When a queue runs dry the call fails with `OracleError::Unavailable`, so
/// an unscripted call exercises the fallback path.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    player_turns: Mutex<VecDeque<Result<PlayerTurnOutcome, OracleError>>>,
    boss_turns: Mutex<VecDeque<Result<BossTurnOutcome, OracleError>>>,
    player_requests: Mutex<Vec<PlayerTurnRequest>>,
    boss_requests: Mutex<Vec<BossTurnRequest>>,
}

impl ScriptedOracle {
    /// Create an oracle with empty queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next player turn.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn push_player_turn(&self, result: Result<PlayerTurnOutcome, OracleError>) {
        self.player_turns.lock().unwrap().push_back(result);
    }

    /// Queue the result of the next boss turn.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn push_boss_turn(&self, result: Result<BossTurnOutcome, OracleError>) {
        self.boss_turns.lock().unwrap().push_back(result);
    }

    /// Player-turn requests received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn player_requests(&self) -> Vec<PlayerTurnRequest> {
        self.player_requests.lock().unwrap().clone()
    }

    /// Boss-turn requests received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn boss_requests(&self) -> Vec<BossTurnRequest> {
        self.boss_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn resolve_player_turn(
        &self,
        request: &PlayerTurnRequest,
    ) -> Result<PlayerTurnOutcome, OracleError> {
        self.player_requests.lock().unwrap().push(request.clone());
        self.player_turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Unavailable("no scripted player turn".into())))
    }

    async fn resolve_boss_turn(
        &self,
        request: &BossTurnRequest,
    ) -> Result<BossTurnOutcome, OracleError> {
        self.boss_requests.lock().unwrap().push(request.clone());
        self.boss_turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Unavailable("no scripted boss turn".into())))
    }
}

/// An oracle that always fails. Useful for testing the fallback paths.
#[derive(Debug)]
pub struct FailingOracle;

#[async_trait]
impl Oracle for FailingOracle {
    async fn resolve_player_turn(
        &self,
        _request: &PlayerTurnRequest,
    ) -> Result<PlayerTurnOutcome, OracleError> {
        Err(OracleError::Unavailable("connection refused".into()))
    }

    async fn resolve_boss_turn(
        &self,
        _request: &BossTurnRequest,
    ) -> Result<BossTurnOutcome, OracleError> {
        Err(OracleError::Unavailable("connection refused".into()))
    }
}

/// An oracle that holds every call open until the test releases it, then
/// answers from an inner `ScriptedOracle`. A call that is never released
/// hangs, which exercises the caller's timeout.
#[derive(Debug)]
pub struct StallingOracle {
    gate: Semaphore,
    started: AtomicUsize,
    inner: ScriptedOracle,
}

impl StallingOracle {
    /// Create a stalling oracle in front of `inner`.
    #[must_use]
    pub fn new(inner: ScriptedOracle) -> Self {
        Self {
            gate: Semaphore::new(0),
            started: AtomicUsize::new(0),
            inner,
        }
    }

    /// Let `calls` held calls proceed.
    pub fn release(&self, calls: usize) {
        self.gate.add_permits(calls);
    }

    /// Number of calls that have started waiting.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// The scripted oracle behind the gate.
    #[must_use]
    pub fn inner(&self) -> &ScriptedOracle {
        &self.inner
    }

    async fn wait(&self) -> Result<(), OracleError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.gate
            .acquire()
            .await
            .map(|permit| permit.forget())
            .map_err(|_| OracleError::Unavailable("gate closed".into()))
    }
}

#[async_trait]
impl Oracle for StallingOracle {
    async fn resolve_player_turn(
        &self,
        request: &PlayerTurnRequest,
    ) -> Result<PlayerTurnOutcome, OracleError> {
        self.wait().await?;
        self.inner.resolve_player_turn(request).await
    }

    async fn resolve_boss_turn(
        &self,
        request: &BossTurnRequest,
    ) -> Result<BossTurnOutcome, OracleError> {
        self.wait().await?;
        self.inner.resolve_boss_turn(request).await
    }
}
