use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use skirmish_arena::{InputEvent, SimConfig, World};
use skirmish_core::game::{GameMode, PlayerId};
use skirmish_core::net::messages::{FindGameMsg, JoinedMsg, PlayerCountMsg, ServerMessage};
use skirmish_core::net::protocol::encode_server_message;
use skirmish_core::room::{FREE_FOR_ALL_ROOM, generate_room_code};

use crate::config::TickConfig;
use crate::game_loop::{GameBroadcast, GameCommand, spawn_room_session};

/// Outbound channel for one connected player.
pub type PlayerSender = mpsc::Sender<Bytes>;

type SharedSenders = Arc<Mutex<HashMap<PlayerId, PlayerSender>>>;

/// Why a matchmaking request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    AlreadyInMatch,
    NotInRoom,
    InvalidName,
}

impl std::fmt::Display for RoomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyInMatch => write!(f, "already in a match"),
            Self::NotInRoom => write!(f, "not in a match"),
            Self::InvalidName => write!(f, "invalid player name"),
        }
    }
}

impl std::error::Error for RoomError {}

/// Public view of a room for the HTTP API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub code: String,
    pub mode: GameMode,
    pub players: usize,
    /// A duel room still waiting for its second player.
    pub waiting: bool,
}

struct RoomEntry {
    mode: GameMode,
    /// Players in join order; the position is the player's seat.
    players: Vec<PlayerId>,
    senders: SharedSenders,
    command_tx: mpsc::UnboundedSender<GameCommand>,
    game_task: JoinHandle<()>,
    broadcast_task: JoinHandle<()>,
}

impl RoomEntry {
    fn is_waiting(&self) -> bool {
        self.mode == GameMode::Duel && self.players.len() == 1
    }

    fn send_to(&self, player_id: PlayerId, msg: &ServerMessage) {
        let sender = lock_senders(&self.senders).get(&player_id).cloned();
        if let Some(sender) = sender {
            send_message(&sender, msg);
        }
    }

    fn broadcast(&self, msg: &ServerMessage) {
        let snapshot = lock_senders(&self.senders).clone();
        for sender in snapshot.values() {
            send_message(sender, msg);
        }
    }
}

/// Owns every live room and the player-to-room mapping.
pub struct RoomManager {
    rooms: HashMap<String, RoomEntry>,
    player_rooms: HashMap<PlayerId, String>,
    next_player_id: PlayerId,
    sim: SimConfig,
    tick: TickConfig,
    max_name_len: usize,
}

impl RoomManager {
    pub fn new(sim: SimConfig, tick: TickConfig, max_name_len: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            next_player_id: 1,
            sim,
            tick,
            max_name_len,
        }
    }

    pub fn alloc_player_id(&mut self) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;
        id
    }

    /// Room code the player is currently in.
    #[cfg(test)]
    fn room_of(&self, player_id: PlayerId) -> Option<&str> {
        self.player_rooms.get(&player_id).map(String::as_str)
    }

    /// Place a player into a match. Returns the room code.
    pub fn find_game(
        &mut self,
        player_id: PlayerId,
        request: FindGameMsg,
        sender: PlayerSender,
    ) -> Result<String, RoomError> {
        if self.player_rooms.contains_key(&player_id) {
            return Err(RoomError::AlreadyInMatch);
        }
        let name = self.validate_name(request.name.as_deref())?;

        let code = match request.mode {
            GameMode::Duel => self.join_duel(player_id, name, request, sender),
            GameMode::FreeForAll => self.join_free_for_all(player_id, name, request, sender),
        };
        self.player_rooms.insert(player_id, code.clone());
        Ok(code)
    }

    fn validate_name(&self, name: Option<&str>) -> Result<Option<String>, RoomError> {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(None);
        };
        if name.chars().count() > self.max_name_len || name.chars().any(char::is_control) {
            return Err(RoomError::InvalidName);
        }
        Ok(Some(name.to_string()))
    }

    fn join_duel(
        &mut self,
        player_id: PlayerId,
        name: Option<String>,
        request: FindGameMsg,
        sender: PlayerSender,
    ) -> String {
        let waiting = self
            .rooms
            .iter()
            .find(|(_, room)| room.is_waiting())
            .map(|(code, _)| code.clone());

        let code = match waiting {
            Some(code) => code,
            None => {
                let code = generate_unique_room_code(&self.rooms);
                self.create_room(&code, GameMode::Duel);
                code
            },
        };

        let Some(room) = self.rooms.get_mut(&code) else {
            return code;
        };
        add_player(room, &code, player_id, name, request, sender);

        if room.is_waiting() {
            room.send_to(player_id, &ServerMessage::WaitingForPlayer);
        } else {
            room.broadcast(&ServerMessage::GameStarting);
            let _ = room.command_tx.send(GameCommand::Start);
            tracing::info!(room = %code, "Duel starting");
        }
        code
    }

    fn join_free_for_all(
        &mut self,
        player_id: PlayerId,
        name: Option<String>,
        request: FindGameMsg,
        sender: PlayerSender,
    ) -> String {
        let code = FREE_FOR_ALL_ROOM.to_string();
        if !self.rooms.contains_key(&code) {
            self.create_room(&code, GameMode::FreeForAll);
            if let Some(room) = self.rooms.get(&code) {
                let _ = room.command_tx.send(GameCommand::Start);
            }
        }

        let Some(room) = self.rooms.get_mut(&code) else {
            return code;
        };
        add_player(room, &code, player_id, name, request, sender);
        room.send_to(player_id, &ServerMessage::GameStarting);
        room.broadcast(&player_count(room));
        code
    }

    fn create_room(&mut self, code: &str, mode: GameMode) {
        let world = World::new(mode, self.sim.clone());
        let (command_tx, broadcast_rx, game_task) = spawn_room_session(world, self.tick.clone());

        let senders: SharedSenders = Arc::new(Mutex::new(HashMap::new()));
        let fanout_senders = Arc::clone(&senders);
        let resync_tx = command_tx.clone();
        let room_code = code.to_string();
        let broadcast_task = tokio::spawn(async move {
            forward_broadcasts(broadcast_rx, fanout_senders, resync_tx, &room_code).await;
        });

        tracing::info!(room = code, %mode, "Room created");
        self.rooms.insert(
            code.to_string(),
            RoomEntry {
                mode,
                players: Vec::new(),
                senders,
                command_tx,
                game_task,
                broadcast_task,
            },
        );
    }

    /// Forward an input event to the player's room. Players outside a room
    /// are ignored.
    pub fn route_input(&self, player_id: PlayerId, event: InputEvent) {
        let Some(room) = self
            .player_rooms
            .get(&player_id)
            .and_then(|code| self.rooms.get(code))
        else {
            return;
        };
        let _ = room.command_tx.send(GameCommand::Input { player_id, event });
    }

    /// Take a player out of their room.
    ///
    /// Leaving a duel ends it for both players; the opponent is told and may
    /// search again. Leaving free-for-all removes only that character.
    pub fn leave(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        let code = self
            .player_rooms
            .remove(&player_id)
            .ok_or(RoomError::NotInRoom)?;
        let Some(room) = self.rooms.get_mut(&code) else {
            return Ok(());
        };

        room.players.retain(|&id| id != player_id);
        lock_senders(&room.senders).remove(&player_id);
        tracing::info!(player_id, room = %code, "Player left room");

        let mode = room.mode;
        match mode {
            GameMode::Duel => {
                room.broadcast(&ServerMessage::OpponentLeft);
                self.shutdown_room(&code);
            },
            GameMode::FreeForAll => {
                if room.players.is_empty() {
                    self.shutdown_room(&code);
                } else {
                    let _ = room.command_tx.send(GameCommand::Leave { player_id });
                    room.broadcast(&player_count(room));
                }
            },
        }
        Ok(())
    }

    /// Stop a room's tick task and drop any emissions still queued for it.
    fn shutdown_room(&mut self, code: &str) {
        let Some(room) = self.rooms.remove(code) else {
            return;
        };
        for player_id in &room.players {
            self.player_rooms.remove(player_id);
        }
        if room.command_tx.send(GameCommand::Stop).is_err() {
            tracing::debug!(room = code, "Game session already gone");
            room.game_task.abort();
        }
        room.broadcast_task.abort();
        tracing::info!(room = code, "Room closed");
    }

    /// Number of rooms and players.
    pub fn stats(&self) -> (usize, usize) {
        (self.rooms.len(), self.player_rooms.len())
    }

    pub fn room_info(&self, code: &str) -> Option<RoomInfo> {
        self.rooms.get(code).map(|room| RoomInfo {
            code: code.to_string(),
            mode: room.mode,
            players: room.players.len(),
            waiting: room.is_waiting(),
        })
    }
}

fn add_player(
    room: &mut RoomEntry,
    code: &str,
    player_id: PlayerId,
    name: Option<String>,
    request: FindGameMsg,
    sender: PlayerSender,
) {
    room.players.push(player_id);
    let slot = u32::try_from(room.players.len()).unwrap_or(u32::MAX);
    send_message(
        &sender,
        &ServerMessage::Joined(JoinedMsg {
            player_id,
            room: code.to_string(),
            mode: room.mode,
            slot,
        }),
    );
    lock_senders(&room.senders).insert(player_id, sender);
    let _ = room.command_tx.send(GameCommand::Join {
        player_id,
        name,
        loadout: request.loadout,
    });
    tracing::info!(player_id, room = code, slot, "Player joined room");
}

fn player_count(room: &RoomEntry) -> ServerMessage {
    ServerMessage::PlayerCount(PlayerCountMsg {
        count: u32::try_from(room.players.len()).unwrap_or(u32::MAX),
    })
}

fn lock_senders(
    senders: &SharedSenders,
) -> std::sync::MutexGuard<'_, HashMap<PlayerId, PlayerSender>> {
    senders.lock().unwrap_or_else(PoisonError::into_inner)
}

fn send_message(sender: &PlayerSender, msg: &ServerMessage) {
    match encode_server_message(msg) {
        Ok(data) => {
            if sender.try_send(Bytes::from(data)).is_err() {
                tracing::debug!("Skipping message to slow client (channel full or closed)");
            }
        },
        Err(e) => tracing::error!(error = %e, "Failed to encode server message"),
    }
}

/// Fan a room's output out to its players.
///
/// A delta is only useful to a client holding the previous frame, so deltas
/// go only to players in `synced`. A player joins that set by receiving a full
/// frame and leaves it when a frame to them is dropped, which also asks the
/// room for a fresh full snapshot.
async fn forward_broadcasts(
    mut broadcast_rx: mpsc::UnboundedReceiver<GameBroadcast>,
    senders: SharedSenders,
    resync_tx: mpsc::UnboundedSender<GameCommand>,
    room_code: &str,
) {
    let mut synced: HashSet<PlayerId> = HashSet::new();

    while let Some(broadcast) = broadcast_rx.recv().await {
        match broadcast {
            GameBroadcast::State { data, full } => {
                let snapshot = lock_senders(&senders).clone();
                synced.retain(|id| snapshot.contains_key(id));

                let mut dropped = false;
                for (&player_id, sender) in &snapshot {
                    if !full && !synced.contains(&player_id) {
                        continue;
                    }
                    match sender.try_send(data.clone()) {
                        Ok(()) => {
                            if full {
                                synced.insert(player_id);
                            }
                        },
                        Err(TrySendError::Full(_)) => {
                            tracing::debug!(
                                player_id,
                                room = room_code,
                                "Dropped state frame for slow client, resyncing"
                            );
                            synced.remove(&player_id);
                            dropped = true;
                        },
                        Err(TrySendError::Closed(_)) => {
                            synced.remove(&player_id);
                        },
                    }
                }
                if dropped {
                    let _ = resync_tx.send(GameCommand::Resync);
                }
            },
            GameBroadcast::ToPlayer { player_id, data } => {
                let sender = lock_senders(&senders).get(&player_id).cloned();
                if let Some(sender) = sender
                    && sender.try_send(data).is_err()
                {
                    tracing::debug!(
                        player_id,
                        room = room_code,
                        "Skipping notice to slow client (channel full or closed)"
                    );
                }
            },
            GameBroadcast::GameEnded => {
                tracing::info!(room = room_code, "Game session ended");
                break;
            },
        }
    }
}

/// Generate a unique room code, retrying on collision with existing rooms.
fn generate_unique_room_code(existing: &HashMap<String, RoomEntry>) -> String {
    loop {
        let code = generate_room_code();
        if !existing.contains_key(&code) {
            return code;
        }
    }
}
