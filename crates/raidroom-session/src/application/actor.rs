//! Room actor: the single task that owns a [`Room`].
//!
//! Transports talk to the actor through a cloneable [`RoomHandle`]. Oracle
//! calls, delayed steps and countdown ticks run on their own tasks and
//! report back through the same command queue, so every mutation of the room
//! happens on the actor's task in arrival order.

use std::sync::Arc;
use std::time::Duration;

use raidroom_core::clock::Clock;
use raidroom_core::error::DomainError;
use raidroom_core::id::ConnectionId;
use raidroom_core::rng::DeterministicRng;
use raidroom_encounter::domain::entities::CharacterTemplate;
use raidroom_oracle::{
    BossTurnOutcome, BossTurnRequest, Oracle, OracleError, PlayerTurnOutcome, PlayerTurnRequest,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::hub::{ConnectionHub, EventReceiver, EventSender, connection_channel};
use super::room::{Effect, Room, RoomView, Step};
use super::timer::CountdownTimer;

/// Command queue depth.
const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Commands processed by the room actor.
#[derive(Debug)]
enum RoomCommand {
    Connect {
        conn_id: ConnectionId,
        sender: EventSender,
    },
    Disconnect {
        conn_id: ConnectionId,
    },
    Join {
        conn_id: ConnectionId,
        character: Box<CharacterTemplate>,
    },
    Start {
        conn_id: ConnectionId,
    },
    SubmitAction {
        conn_id: ConnectionId,
        text: String,
    },
    View {
        reply: oneshot::Sender<RoomView>,
    },
    Tick {
        timer_id: u64,
    },
    PlayerTurnSettled {
        epoch: u64,
        result: Result<PlayerTurnOutcome, OracleError>,
    },
    BossTurnSettled {
        epoch: u64,
        result: Result<BossTurnOutcome, OracleError>,
    },
    Scheduled {
        epoch: u64,
        step: Step,
    },
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    async fn send(&self, command: RoomCommand) -> Result<(), DomainError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| DomainError::RoomUnavailable)
    }

    /// Registers a connection and returns its outbound event queue. The
    /// connection receives room-wide broadcasts from now on, joined or not.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomUnavailable` if the actor has stopped.
    pub async fn connect(&self, conn_id: ConnectionId) -> Result<EventReceiver, DomainError> {
        let (sender, receiver) = connection_channel();
        self.send(RoomCommand::Connect { conn_id, sender }).await?;
        Ok(receiver)
    }

    /// Unregisters a connection and removes its participant, if any.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomUnavailable` if the actor has stopped.
    pub async fn disconnect(&self, conn_id: ConnectionId) -> Result<(), DomainError> {
        self.send(RoomCommand::Disconnect { conn_id }).await
    }

    /// Joins the room with a character.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomUnavailable` if the actor has stopped.
    /// Validation failures are reported to the connection as an `error`
    /// event.
    pub async fn join(
        &self,
        conn_id: ConnectionId,
        character: CharacterTemplate,
    ) -> Result<(), DomainError> {
        self.send(RoomCommand::Join {
            conn_id,
            character: Box::new(character),
        })
        .await
    }

    /// Requests the encounter start.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomUnavailable` if the actor has stopped.
    pub async fn start(&self, conn_id: ConnectionId) -> Result<(), DomainError> {
        self.send(RoomCommand::Start { conn_id }).await
    }

    /// Submits an action for the current window.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomUnavailable` if the actor has stopped.
    pub async fn submit_action(
        &self,
        conn_id: ConnectionId,
        text: impl Into<String>,
    ) -> Result<(), DomainError> {
        self.send(RoomCommand::SubmitAction {
            conn_id,
            text: text.into(),
        })
        .await
    }

    /// Reads the current room state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomUnavailable` if the actor has stopped or
    /// dropped the request.
    pub async fn view(&self) -> Result<RoomView, DomainError> {
        let (reply, response) = oneshot::channel();
        self.send(RoomCommand::View { reply }).await?;
        response.await.map_err(|_| DomainError::RoomUnavailable)
    }
}

/// The actor state. Runs inside its own task.
pub struct RoomActor {
    room: Room,
    hub: ConnectionHub,
    oracle: Arc<dyn Oracle>,
    clock: Arc<dyn Clock>,
    rng: Box<dyn DeterministicRng>,
    countdown: Option<CountdownTimer>,
    receiver: mpsc::Receiver<RoomCommand>,
    loopback: mpsc::WeakSender<RoomCommand>,
}

impl RoomActor {
    /// Spawns the actor and returns a handle to it. The actor stops once
    /// every handle has been dropped.
    pub fn spawn(
        room: Room,
        oracle: Arc<dyn Oracle>,
        clock: Arc<dyn Clock>,
        rng: Box<dyn DeterministicRng>,
    ) -> (RoomHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let actor = Self {
            room,
            hub: ConnectionHub::new(),
            oracle,
            clock,
            rng,
            countdown: None,
            receiver,
            loopback: sender.downgrade(),
        };
        let task = tokio::spawn(actor.run());
        (RoomHandle { sender }, task)
    }

    async fn run(mut self) {
        info!(turn_seconds = self.room.config().turn_seconds, "room actor started");
        while let Some(command) = self.receiver.recv().await {
            let effects = self.handle(command);
            self.execute(effects);
        }
        info!("room actor stopped");
    }

    fn handle(&mut self, command: RoomCommand) -> Vec<Effect> {
        let clock = Arc::clone(&self.clock);
        let clock = clock.as_ref();
        match command {
            RoomCommand::Connect { conn_id, sender } => {
                self.hub.register(conn_id, sender);
                Vec::new()
            }
            RoomCommand::Disconnect { conn_id } => {
                self.hub.unregister(conn_id);
                self.room.leave(conn_id, clock)
            }
            RoomCommand::Join { conn_id, character } => self.room.join(conn_id, *character, clock),
            RoomCommand::Start { conn_id } => self.room.start(conn_id, clock),
            RoomCommand::SubmitAction { conn_id, text } => {
                self.room.submit_action(conn_id, &text, clock)
            }
            RoomCommand::View { reply } => {
                let _ = reply.send(self.room.view());
                Vec::new()
            }
            RoomCommand::Tick { timer_id } => self.room.tick(timer_id, clock),
            RoomCommand::PlayerTurnSettled { epoch, result } => {
                self.room.player_turn_settled(epoch, result, clock)
            }
            RoomCommand::BossTurnSettled { epoch, result } => {
                self.room
                    .boss_turn_settled(epoch, result, clock, self.rng.as_mut())
            }
            RoomCommand::Scheduled { epoch, step } => self.room.scheduled(epoch, step, clock),
        }
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send { audience, event } => {
                    self.hub.deliver(audience, &event);
                }
                Effect::ArmCountdown { timer_id, period } => {
                    self.countdown = Some(CountdownTimer::start(
                        timer_id,
                        period,
                        self.loopback.clone(),
                        |timer_id| RoomCommand::Tick { timer_id },
                    ));
                }
                Effect::CancelCountdown => {
                    if let Some(timer) = self.countdown.take() {
                        debug!(timer_id = timer.timer_id(), "countdown cancelled");
                    }
                }
                Effect::ResolvePlayerTurn { epoch, request } => self.resolve_player_turn(epoch, request),
                Effect::ResolveBossTurn { epoch, request } => self.resolve_boss_turn(epoch, request),
                Effect::Schedule { epoch, delay, step } => self.schedule(epoch, delay, step),
            }
        }
    }

    fn resolve_player_turn(&self, epoch: u64, request: PlayerTurnRequest) {
        let oracle = Arc::clone(&self.oracle);
        let deadline = self.room.config().oracle_timeout;
        let loopback = self.loopback.clone();
        tokio::spawn(async move {
            let result = with_deadline(deadline, oracle.resolve_player_turn(&request)).await;
            report(&loopback, RoomCommand::PlayerTurnSettled { epoch, result }).await;
        });
    }

    fn resolve_boss_turn(&self, epoch: u64, request: BossTurnRequest) {
        let oracle = Arc::clone(&self.oracle);
        let deadline = self.room.config().oracle_timeout;
        let loopback = self.loopback.clone();
        tokio::spawn(async move {
            let result = with_deadline(deadline, oracle.resolve_boss_turn(&request)).await;
            report(&loopback, RoomCommand::BossTurnSettled { epoch, result }).await;
        });
    }

    fn schedule(&self, epoch: u64, delay: Duration, step: Step) {
        let loopback = self.loopback.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            report(&loopback, RoomCommand::Scheduled { epoch, step }).await;
        });
    }
}

/// Bounds an oracle call; expiry is reported as `OracleError::Timeout`.
async fn with_deadline<T>(
    deadline: Duration,
    call: impl Future<Output = Result<T, OracleError>>,
) -> Result<T, OracleError> {
    tokio::time::timeout(deadline, call)
        .await
        .unwrap_or(Err(OracleError::Timeout(deadline)))
}

async fn report(loopback: &mpsc::WeakSender<RoomCommand>, command: RoomCommand) {
    let Some(sender) = loopback.upgrade() else {
        debug!("room actor gone, dropping result");
        return;
    };
    if sender.send(command).await.is_err() {
        warn!("room actor stopped before result arrived");
    }
}
