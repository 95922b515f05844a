//! Turn phase engine and session lifecycle for one room.
//!
//! `Room` never performs I/O. Each input returns the effects it produced, in
//! order; the actor executes them. Oracle calls and delayed steps are tagged
//! with the room epoch at issue time, and the epoch advances on every reset,
//! so a result that arrives after a reset is discarded.
//!
//! ```text
//!  IDLE --start--> WAITING_FOR_ACTIONS --quorum|timeout--> PLAYERS_ATTACKING
//!                        ^                                       |
//!                        |                    boss defeated -> victory -> reset
//!                        |                                       v
//!                        +---- pause ------------------- BOSS_ATTACKING
//!                                       nobody alive -> defeat -> reset
//! ```

use std::time::Duration;

use raidroom_core::clock::Clock;
use raidroom_core::id::ConnectionId;
use raidroom_core::rng::DeterministicRng;
use raidroom_encounter::application::registry::SessionRegistry;
use raidroom_encounter::domain::entities::{Boss, CharacterTemplate, Participant};
use raidroom_oracle::{
    BossTurnOutcome, BossTurnRequest, OracleError, PlayerTurnOutcome, PlayerTurnRequest,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::config::RoomConfig;
use crate::domain::messages::{Audience, LogCategory, LogMessage, RoomSnapshot, ServerEvent};
use crate::domain::pending::PendingActions;
use crate::domain::phase::SessionPhase;

/// A step the room asks to be woken for after a delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Begin the boss's turn.
    BossTurn,
    /// Open the next action-collection window.
    ActionWindow,
    /// Return the room to the lobby.
    Reset,
}

/// Something the room needs done on its behalf.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Deliver an event.
    Send {
        /// Recipients.
        audience: Audience,
        /// The event.
        event: ServerEvent,
    },
    /// Start a countdown that calls [`Room::tick`] with `timer_id` every
    /// `period`, replacing any running countdown.
    ArmCountdown {
        /// Identifies this countdown's ticks.
        timer_id: u64,
        /// Tick period.
        period: Duration,
    },
    /// Stop the running countdown.
    CancelCountdown,
    /// Call the oracle and report back via [`Room::player_turn_settled`].
    ResolvePlayerTurn {
        /// Epoch at issue time.
        epoch: u64,
        /// Oracle input.
        request: PlayerTurnRequest,
    },
    /// Call the oracle and report back via [`Room::boss_turn_settled`].
    ResolveBossTurn {
        /// Epoch at issue time.
        epoch: u64,
        /// Oracle input.
        request: BossTurnRequest,
    },
    /// Call [`Room::scheduled`] with `step` after `delay`.
    Schedule {
        /// Epoch at issue time.
        epoch: u64,
        /// How long to wait.
        delay: Duration,
        /// What to do then.
        step: Step,
    },
}

/// Read-only view of the room for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    /// Current phase.
    pub phase: SessionPhase,
    /// Seconds left in the action window.
    pub seconds_remaining: u32,
    /// Current epoch.
    pub epoch: u64,
    /// Roster in join order.
    pub participants: Vec<Participant>,
    /// The boss.
    pub encounter_entity: Boss,
    /// Actions submitted in the current window.
    pub pending_actions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OracleCall {
    PlayerTurn,
    BossTurn,
}

#[derive(Debug, Clone, Copy)]
struct Countdown {
    timer_id: u64,
    remaining: u32,
}

/// Collects effects in order while handling one input.
struct Outbox<'a> {
    clock: &'a dyn Clock,
    effects: Vec<Effect>,
}

impl<'a> Outbox<'a> {
    fn new(clock: &'a dyn Clock) -> Self {
        Self {
            clock,
            effects: Vec::new(),
        }
    }

    fn push(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    fn send(&mut self, audience: Audience, event: ServerEvent) {
        self.push(Effect::Send { audience, event });
    }

    fn message(&mut self, text: impl Into<String>, category: LogCategory) {
        let entry = LogMessage::new(text, category, self.clock);
        self.send(Audience::All, ServerEvent::LogMessage(entry));
    }

    fn phase_change(&mut self, phase: SessionPhase, seconds_remaining: u32) {
        self.send(
            Audience::All,
            ServerEvent::PhaseChange {
                phase,
                seconds_remaining,
            },
        );
    }

    fn finish(self) -> Vec<Effect> {
        self.effects
    }
}

/// One room: registry, phase, pending actions, countdown and epoch.
#[derive(Debug)]
pub struct Room {
    registry: SessionRegistry,
    config: RoomConfig,
    phase: SessionPhase,
    pending: PendingActions,
    epoch: u64,
    countdown: Option<Countdown>,
    next_timer_id: u64,
    in_flight: Option<OracleCall>,
}

impl Room {
    /// Creates an idle, empty room whose boss resets to `template`.
    #[must_use]
    pub fn new(template: Boss, config: RoomConfig) -> Self {
        Self {
            registry: SessionRegistry::new(template),
            config,
            phase: SessionPhase::Idle,
            pending: PendingActions::default(),
            epoch: 0,
            countdown: None,
            next_timer_id: 0,
            in_flight: None,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Current epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The registry.
    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Actions submitted in the current window.
    #[must_use]
    pub fn pending(&self) -> &PendingActions {
        &self.pending
    }

    /// Room configuration.
    #[must_use]
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Seconds left in the action window; zero in any other phase.
    #[must_use]
    pub fn seconds_remaining(&self) -> u32 {
        match (self.phase, self.countdown) {
            (SessionPhase::WaitingForActions, Some(countdown)) => countdown.remaining,
            _ => 0,
        }
    }

    /// Roster and boss as clients see them.
    #[must_use]
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            participants: self.registry.participants().to_vec(),
            encounter_entity: self.registry.boss().clone(),
        }
    }

    /// Inspection view.
    #[must_use]
    pub fn view(&self) -> RoomView {
        RoomView {
            phase: self.phase,
            seconds_remaining: self.seconds_remaining(),
            epoch: self.epoch,
            participants: self.registry.participants().to_vec(),
            encounter_entity: self.registry.boss().clone(),
            pending_actions: self.pending.len(),
        }
    }

    /// Adds a participant. Permitted in any phase; a mid-encounter joiner
    /// counts toward quorum from the moment they join.
    pub fn join(
        &mut self,
        id: ConnectionId,
        character: CharacterTemplate,
        clock: &dyn Clock,
    ) -> Vec<Effect> {
        let mut out = Outbox::new(clock);
        if self.registry.participant(id).is_some() {
            debug!(connection_id = %id, "duplicate join rejected");
            out.send(
                Audience::Only(id),
                ServerEvent::error("already_joined", "this connection has already joined the room"),
            );
            return out.finish();
        }
        match self.registry.add_participant(id, character) {
            Ok(participant) => {
                info!(
                    connection_id = %id,
                    name = participant.name(),
                    phase = %self.phase,
                    "participant joined"
                );
                out.send(Audience::Only(id), ServerEvent::InitialState(self.snapshot()));
                out.send(
                    Audience::Only(id),
                    ServerEvent::PhaseChange {
                        phase: self.phase,
                        seconds_remaining: self.seconds_remaining(),
                    },
                );
                out.send(Audience::AllExcept(id), ServerEvent::ParticipantJoined(participant));
                self.publish_state(&mut out);
            }
            Err(e) => {
                warn!(connection_id = %id, error = %e, "join rejected");
                out.send(Audience::Only(id), ServerEvent::error("invalid_character", e.to_string()));
            }
        }
        out.finish()
    }

    /// Removes a participant. Resets the room if it becomes empty; otherwise
    /// re-checks quorum while actions are being collected.
    pub fn leave(&mut self, id: ConnectionId, clock: &dyn Clock) -> Vec<Effect> {
        let mut out = Outbox::new(clock);
        let Some(participant) = self.registry.remove_participant(id) else {
            return out.finish();
        };
        info!(connection_id = %id, name = participant.name(), phase = %self.phase, "participant left");
        self.pending.withdraw(id);
        out.send(Audience::All, ServerEvent::ParticipantLeft { id });

        if self.registry.is_empty() {
            self.reset_into(&mut out);
            return out.finish();
        }
        self.publish_state(&mut out);
        if self.phase == SessionPhase::WaitingForActions {
            self.check_quorum(&mut out);
        }
        out.finish()
    }

    /// Starts the encounter. Ignored unless the room is idle with a
    /// non-empty roster.
    pub fn start(&mut self, requested_by: ConnectionId, clock: &dyn Clock) -> Vec<Effect> {
        let mut out = Outbox::new(clock);
        if self.phase != SessionPhase::Idle || self.registry.is_empty() {
            debug!(connection_id = %requested_by, phase = %self.phase, "start ignored");
            return out.finish();
        }
        info!(connection_id = %requested_by, epoch = self.epoch, "encounter started");
        out.message("The battle begins!", LogCategory::System);
        self.open_action_window(&mut out);
        out.finish()
    }

    /// Records an action for the current window. Stale, duplicate, blank or
    /// unauthorised submissions are dropped.
    pub fn submit_action(&mut self, id: ConnectionId, text: &str, clock: &dyn Clock) -> Vec<Effect> {
        let mut out = Outbox::new(clock);
        let text = text.trim();
        let Some(participant) = self.registry.participant(id) else {
            debug!(connection_id = %id, "action from connection outside the roster");
            return out.finish();
        };
        if self.phase != SessionPhase::WaitingForActions {
            debug!(connection_id = %id, phase = %self.phase, "action outside the window");
            return out.finish();
        }
        if !participant.is_alive() {
            debug!(connection_id = %id, "action from defeated participant");
            return out.finish();
        }
        if text.is_empty() {
            debug!(connection_id = %id, "blank action");
            return out.finish();
        }
        let name = participant.name().to_owned();
        if !self.pending.submit(id, text) {
            debug!(connection_id = %id, "participant already acted this window");
            return out.finish();
        }
        out.message(format!("{name} has locked in their action."), LogCategory::Action);
        self.check_quorum(&mut out);
        out.finish()
    }

    /// One countdown tick. Ticks from a cancelled countdown are ignored.
    pub fn tick(&mut self, timer_id: u64, clock: &dyn Clock) -> Vec<Effect> {
        let mut out = Outbox::new(clock);
        let Some(countdown) = self.countdown.as_mut() else {
            debug!(timer_id, "tick with no countdown running");
            return out.finish();
        };
        if countdown.timer_id != timer_id || self.phase != SessionPhase::WaitingForActions {
            debug!(timer_id, "stale tick");
            return out.finish();
        }
        countdown.remaining = countdown.remaining.saturating_sub(1);
        let remaining = countdown.remaining;
        out.phase_change(SessionPhase::WaitingForActions, remaining);
        if remaining == 0 {
            out.message("Time is up! Processing actions...", LogCategory::System);
            self.close_action_window(&mut out);
        }
        out.finish()
    }

    /// Applies the settled player turn issued at `epoch`.
    pub fn player_turn_settled(
        &mut self,
        epoch: u64,
        result: Result<PlayerTurnOutcome, OracleError>,
        clock: &dyn Clock,
    ) -> Vec<Effect> {
        let mut out = Outbox::new(clock);
        if !self.accepts(epoch, OracleCall::PlayerTurn) {
            warn!(epoch, current_epoch = self.epoch, "discarding stale player turn result");
            return out.finish();
        }
        self.in_flight = None;

        match result {
            Ok(outcome) => {
                out.message(outcome.narrative, LogCategory::Attack);
                self.registry.merge_boss_update(&outcome.boss_update);
            }
            Err(e) => {
                warn!(epoch, error = %e, "player turn failed, boss state unchanged");
                out.message(
                    "A mystical force interfered! The players' attack was partially shielded.",
                    LogCategory::Damage,
                );
            }
        }
        self.publish_state(&mut out);

        if self.registry.boss().is_defeated() {
            info!(epoch, "boss defeated");
            out.message(
                format!(
                    "With a final, earth-shattering roar, {} has been vanquished! Victory!",
                    self.registry.boss().name()
                ),
                LogCategory::System,
            );
            self.schedule(&mut out, self.config.reset_delay, Step::Reset);
        } else {
            self.schedule(&mut out, self.config.phase_pause, Step::BossTurn);
        }
        out.finish()
    }

    /// Applies the settled boss turn issued at `epoch`. On failure a random
    /// living participant takes fallback damage drawn from `rng`.
    pub fn boss_turn_settled(
        &mut self,
        epoch: u64,
        result: Result<BossTurnOutcome, OracleError>,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Vec<Effect> {
        let mut out = Outbox::new(clock);
        if !self.accepts(epoch, OracleCall::BossTurn) {
            warn!(epoch, current_epoch = self.epoch, "discarding stale boss turn result");
            return out.finish();
        }
        self.in_flight = None;

        match result {
            Ok(outcome) => {
                out.message(outcome.narrative, LogCategory::Boss);
                let report = self.registry.merge_participant_updates(&outcome.participant_updates);
                if report.ignored > 0 {
                    debug!(epoch, ignored = report.ignored, "boss turn named unknown participants");
                }
                for name in report.fallen {
                    out.message(format!("{name} has fallen in battle!"), LogCategory::Damage);
                }
            }
            Err(e) => {
                warn!(epoch, error = %e, "boss turn failed, applying fallback strike");
                out.message(
                    format!(
                        "{} seems confused and lashes out randomly!",
                        self.registry.boss().name()
                    ),
                    LogCategory::Boss,
                );
                self.fallback_strike(&mut out, rng);
            }
        }
        self.publish_state(&mut out);

        if self.registry.living_count() == 0 {
            self.conclude_defeat(&mut out);
        } else {
            self.schedule(&mut out, self.config.phase_pause, Step::ActionWindow);
        }
        out.finish()
    }

    /// Runs a step scheduled at `epoch`.
    pub fn scheduled(&mut self, epoch: u64, step: Step, clock: &dyn Clock) -> Vec<Effect> {
        let mut out = Outbox::new(clock);
        if epoch != self.epoch {
            debug!(epoch, current_epoch = self.epoch, ?step, "discarding stale step");
            return out.finish();
        }
        match step {
            Step::BossTurn
                if self.phase == SessionPhase::PlayersAttacking && self.in_flight.is_none() =>
            {
                self.begin_boss_turn(&mut out);
            }
            Step::ActionWindow
                if self.phase == SessionPhase::BossAttacking && self.in_flight.is_none() =>
            {
                self.open_action_window(&mut out);
            }
            Step::Reset => self.reset_into(&mut out),
            other => debug!(step = ?other, phase = %self.phase, "step no longer applies"),
        }
        out.finish()
    }

    /// Returns the room to the lobby immediately.
    pub fn reset(&mut self, clock: &dyn Clock) -> Vec<Effect> {
        let mut out = Outbox::new(clock);
        self.reset_into(&mut out);
        out.finish()
    }

    fn accepts(&self, epoch: u64, call: OracleCall) -> bool {
        epoch == self.epoch && self.in_flight == Some(call)
    }

    fn publish_state(&self, out: &mut Outbox<'_>) {
        out.send(Audience::All, ServerEvent::StateSnapshot(self.snapshot()));
    }

    fn schedule(&self, out: &mut Outbox<'_>, delay: Duration, step: Step) {
        out.push(Effect::Schedule {
            epoch: self.epoch,
            delay,
            step,
        });
    }

    fn cancel_countdown(&mut self, out: &mut Outbox<'_>) {
        if self.countdown.take().is_some() {
            out.push(Effect::CancelCountdown);
        }
    }

    fn check_quorum(&mut self, out: &mut Outbox<'_>) {
        let living = self.registry.living_count();
        if living > 0 && self.pending.len() >= living {
            out.message(
                "All players have acted! The Game Master is calculating the result...",
                LogCategory::System,
            );
            self.close_action_window(out);
        }
    }

    fn open_action_window(&mut self, out: &mut Outbox<'_>) {
        if self.registry.is_empty() {
            self.reset_into(out);
            return;
        }
        self.cancel_countdown(out);
        self.pending.clear();
        self.phase = SessionPhase::WaitingForActions;

        self.next_timer_id += 1;
        let timer_id = self.next_timer_id;
        let seconds = self.config.turn_seconds;
        self.countdown = Some(Countdown {
            timer_id,
            remaining: seconds,
        });
        debug!(epoch = self.epoch, timer_id, "action window opened");

        out.push(Effect::ArmCountdown {
            timer_id,
            period: self.config.tick,
        });
        out.phase_change(SessionPhase::WaitingForActions, seconds);
        out.message(
            format!("Waiting for actions... You have {seconds} seconds to decide."),
            LogCategory::System,
        );
    }

    fn close_action_window(&mut self, out: &mut Outbox<'_>) {
        self.cancel_countdown(out);
        self.phase = SessionPhase::PlayersAttacking;
        out.phase_change(SessionPhase::PlayersAttacking, 0);

        let request = PlayerTurnRequest {
            boss: self.registry.boss().clone(),
            participants: self.registry.participants().to_vec(),
            actions: self.pending.actions().to_vec(),
        };
        debug!(epoch = self.epoch, actions = request.actions.len(), "resolving player turn");
        self.in_flight = Some(OracleCall::PlayerTurn);
        out.push(Effect::ResolvePlayerTurn {
            epoch: self.epoch,
            request,
        });
    }

    fn begin_boss_turn(&mut self, out: &mut Outbox<'_>) {
        self.phase = SessionPhase::BossAttacking;
        out.phase_change(SessionPhase::BossAttacking, 0);

        let targets: Vec<Participant> = self.registry.living_participants().cloned().collect();
        if targets.is_empty() {
            self.conclude_defeat(out);
            return;
        }
        debug!(epoch = self.epoch, targets = targets.len(), "resolving boss turn");
        self.in_flight = Some(OracleCall::BossTurn);
        out.push(Effect::ResolveBossTurn {
            epoch: self.epoch,
            request: BossTurnRequest {
                boss: self.registry.boss().clone(),
                targets,
            },
        });
    }

    fn fallback_strike(&mut self, out: &mut Outbox<'_>, rng: &mut dyn DeterministicRng) {
        let living = self.registry.living_count();
        if living == 0 {
            return;
        }
        let last = u32::try_from(living - 1).unwrap_or(u32::MAX);
        let index = usize::try_from(rng.next_u32_range(0, last)).unwrap_or(0).min(living - 1);
        let damage = rng.next_u32_range(self.config.fallback_damage_min, self.config.fallback_damage_max);
        let Some(strike) = self.registry.strike_living(index, damage) else {
            return;
        };
        out.message(
            format!(
                "{} strikes {} for {} damage!",
                self.registry.boss().name(),
                strike.target,
                strike.damage
            ),
            LogCategory::Damage,
        );
        if strike.fell {
            out.message(format!("{} has fallen in battle!", strike.target), LogCategory::Damage);
        }
    }

    fn conclude_defeat(&mut self, out: &mut Outbox<'_>) {
        info!(epoch = self.epoch, "all participants defeated");
        out.message(
            format!(
                "{} roars in victory over the fallen heroes. The world is plunged into twilight...",
                self.registry.boss().name()
            ),
            LogCategory::Boss,
        );
        self.schedule(out, self.config.reset_delay, Step::Reset);
    }

    fn reset_into(&mut self, out: &mut Outbox<'_>) {
        self.cancel_countdown(out);
        self.registry.reset_encounter();
        self.pending.clear();
        self.phase = SessionPhase::Idle;
        self.in_flight = None;
        self.epoch += 1;
        info!(epoch = self.epoch, "room reset");

        self.publish_state(out);
        out.phase_change(SessionPhase::Idle, 0);
        out.send(Audience::All, ServerEvent::FullReset);
    }
}
