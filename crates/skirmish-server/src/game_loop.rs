use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use skirmish_arena::{InputEvent, Notice, StateCache, World};
use skirmish_core::game::PlayerId;
use skirmish_core::loadout::Loadout;
use skirmish_core::net::messages::{NoticeMsg, ServerMessage};
use skirmish_core::net::protocol::encode_server_message;

use crate::config::TickConfig;

/// Commands sent from the room manager to a room's tick task.
#[derive(Debug)]
pub enum GameCommand {
    Join {
        player_id: PlayerId,
        name: Option<String>,
        loadout: Loadout,
    },
    Input {
        player_id: PlayerId,
        event: InputEvent,
    },
    Leave {
        player_id: PlayerId,
    },
    /// Begin simulating. Ticks before this only advance the clock.
    Start,
    /// A client missed a state frame; send a full snapshot next tick.
    Resync,
    Stop,
}

/// Output of a room's tick task, in frame order.
#[derive(Debug)]
pub enum GameBroadcast {
    /// Encoded state payload for every player in the room. Deltas apply
    /// only on top of the previous frame, so `full` marks where a client
    /// that missed one can pick the stream back up.
    State { data: Bytes, full: bool },
    /// Encoded message for a single player.
    ToPlayer { player_id: PlayerId, data: Bytes },
    GameEnded,
}

/// Spawn the tick task that owns `world` for one room.
/// Returns the command sender and broadcast receiver.
pub fn spawn_room_session(
    world: World,
    tick: TickConfig,
) -> (
    mpsc::UnboundedSender<GameCommand>,
    mpsc::UnboundedReceiver<GameBroadcast>,
    JoinHandle<()>,
) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        run_room_tick_loop(world, tick, cmd_rx, broadcast_tx).await;
    });

    (cmd_tx, broadcast_rx, handle)
}

async fn run_room_tick_loop(
    mut world: World,
    tick: TickConfig,
    mut cmd_rx: mpsc::UnboundedReceiver<GameCommand>,
    broadcast_tx: mpsc::UnboundedSender<GameBroadcast>,
) {
    let tick_interval = Duration::from_secs_f64(1.0 / f64::from(tick.rate_hz.max(1)));
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut cache = StateCache::new();
    let mut notices: Vec<Notice> = Vec::new();
    let mut started = false;
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                let elapsed_ms = now.duration_since(last_tick).as_secs_f32() * 1000.0;
                last_tick = now;
                if !started {
                    continue;
                }

                let dt = elapsed_ms / tick.delta_time_divisor_ms;
                skirmish_arena::tick(&mut world, dt, &mut notices);

                for notice in notices.drain(..) {
                    let msg = ServerMessage::Notice(NoticeMsg {
                        notification: notice.notification,
                    });
                    match encode_server_message(&msg) {
                        Ok(data) => {
                            let _ = broadcast_tx.send(GameBroadcast::ToPlayer {
                                player_id: notice.to,
                                data: Bytes::from(data),
                            });
                        },
                        Err(e) => tracing::error!(error = %e, "Failed to encode Notice"),
                    }
                }

                if world.take_round_reset() {
                    cache.reset();
                }

                // The cache commits its baseline before encoding, so a frame
                // that fails to encode must not become the delta base.
                if let Some(payload) = cache.update(&world) {
                    let full = payload.is_full();
                    match encode_server_message(&ServerMessage::GameState(Box::new(payload))) {
                        Ok(data) => {
                            let frame = GameBroadcast::State { data: Bytes::from(data), full };
                            if broadcast_tx.send(frame).is_err() {
                                tracing::debug!("Broadcast receiver dropped, stopping room");
                                break;
                            }
                        },
                        Err(e) => {
                            tracing::error!(
                                frame = cache.frame_number(),
                                error = %e,
                                "Failed to encode GameState"
                            );
                            cache.reset();
                        },
                    }
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(GameCommand::Join { player_id, name, loadout }) => {
                        let seat = world.add_character(player_id, name.as_deref(), &loadout);
                        // Newcomers have no baseline to apply deltas to.
                        cache.reset();
                        tracing::debug!(player_id, seat, "Character added");
                    },
                    Some(GameCommand::Input { player_id, event }) => {
                        world.apply_input(player_id, event);
                    },
                    Some(GameCommand::Leave { player_id }) => {
                        if world.remove_character(player_id) {
                            tracing::debug!(player_id, "Character removed");
                        }
                    },
                    Some(GameCommand::Start) => {
                        started = true;
                        last_tick = Instant::now();
                    },
                    Some(GameCommand::Resync) => cache.reset(),
                    Some(GameCommand::Stop) | None => break,
                }
            }
        }
    }

    let _ = broadcast_tx.send(GameBroadcast::GameEnded);
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_arena::SimConfig;
    use skirmish_core::game::{GameMode, Notification};
    use skirmish_core::net::protocol::decode_server_message;
    use skirmish_core::net::state::{ClientReplica, PlayerEntry, StatePayload};
    use skirmish_core::test_helpers::loadout;

    fn spawn(mode: GameMode) -> (
        mpsc::UnboundedSender<GameCommand>,
        mpsc::UnboundedReceiver<GameBroadcast>,
        JoinHandle<()>,
    ) {
        // No obstacles, so nothing can block movement.
        let sim = SimConfig {
            obstacle_attempts: 0,
            ..SimConfig::default()
        };
        spawn_room_session(World::new(mode, sim), TickConfig::default())
    }

    fn join(cmd_tx: &mpsc::UnboundedSender<GameCommand>, player_id: PlayerId) {
        cmd_tx
            .send(GameCommand::Join {
                player_id,
                name: Some(format!("P{player_id}")),
                loadout: loadout("berserker", "m4"),
            })
            .unwrap();
    }

    async fn next_broadcast(rx: &mut mpsc::UnboundedReceiver<GameBroadcast>) -> GameBroadcast {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for broadcast")
            .expect("broadcast channel closed")
    }

    /// Skip notices until the next state payload.
    async fn next_state(rx: &mut mpsc::UnboundedReceiver<GameBroadcast>) -> StatePayload {
        loop {
            if let GameBroadcast::State { data, full } = next_broadcast(rx).await {
                match decode_server_message(&data).unwrap() {
                    ServerMessage::GameState(payload) => {
                        assert_eq!(payload.is_full(), full, "Frame flag must match payload");
                        return *payload;
                    },
                    other => panic!("Expected GameState, got: {other:?}"),
                }
            }
        }
    }

    #[tokio::test]
    async fn session_is_silent_until_started() {
        let (cmd_tx, mut rx, handle) = spawn(GameMode::Duel);
        join(&cmd_tx, 1);

        let early = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(early.is_err(), "No broadcast expected before Start");

        cmd_tx.send(GameCommand::Start).unwrap();
        let payload = next_state(&mut rx).await;
        assert!(payload.is_full(), "First payload must be a full snapshot");
        assert_eq!(payload.players.len(), 1);
        assert_eq!(payload.players[0].id(), 1);

        cmd_tx.send(GameCommand::Stop).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn held_key_moves_character_in_deltas() {
        let (cmd_tx, mut rx, handle) = spawn(GameMode::FreeForAll);
        join(&cmd_tx, 1);
        cmd_tx.send(GameCommand::Start).unwrap();

        let mut replica = ClientReplica::new();
        replica.apply(&next_state(&mut rx).await);
        let start_x = replica.players[&1].x;

        cmd_tx
            .send(GameCommand::Input {
                player_id: 1,
                event: InputEvent::KeyDown(68),
            })
            .unwrap();

        let mut moved = false;
        for _ in 0..30 {
            let payload = next_state(&mut rx).await;
            assert!(!payload.is_full(), "Steady-state payloads are deltas");
            replica.apply(&payload);
            if replica.players[&1].x > start_x {
                moved = true;
                break;
            }
        }
        assert!(moved, "Holding D should move the character right");

        cmd_tx.send(GameCommand::Stop).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn join_into_running_room_sends_full_snapshot() {
        let (cmd_tx, mut rx, handle) = spawn(GameMode::FreeForAll);
        join(&cmd_tx, 1);
        cmd_tx.send(GameCommand::Start).unwrap();
        let _ = next_state(&mut rx).await;

        join(&cmd_tx, 2);
        let payload = loop {
            let payload = next_state(&mut rx).await;
            if payload.players.iter().any(|p| p.id() == 2) {
                break payload;
            }
        };
        assert!(payload.is_full(), "A join must reset the delta baseline");
        assert_eq!(payload.players.len(), 2);

        cmd_tx.send(GameCommand::Stop).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn leave_is_reported_as_removed_player() {
        let (cmd_tx, mut rx, handle) = spawn(GameMode::FreeForAll);
        join(&cmd_tx, 1);
        join(&cmd_tx, 2);
        cmd_tx.send(GameCommand::Start).unwrap();
        let _ = next_state(&mut rx).await;

        cmd_tx.send(GameCommand::Leave { player_id: 2 }).unwrap();
        // Times out in next_state if the marker never arrives.
        loop {
            let payload = next_state(&mut rx).await;
            if payload
                .players
                .iter()
                .any(|p| matches!(p, PlayerEntry::Removed(r) if r.id == 2))
            {
                assert!(!payload.is_full());
                break;
            }
        }

        cmd_tx.send(GameCommand::Stop).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn firing_notifies_only_the_shooter() {
        let (cmd_tx, mut rx, handle) = spawn(GameMode::FreeForAll);
        join(&cmd_tx, 1);
        join(&cmd_tx, 2);
        cmd_tx.send(GameCommand::Start).unwrap();
        cmd_tx
            .send(GameCommand::Input {
                player_id: 1,
                event: InputEvent::Firing(true),
            })
            .unwrap();

        loop {
            if let GameBroadcast::ToPlayer { player_id, data } = next_broadcast(&mut rx).await {
                assert_eq!(player_id, 1, "Only the shooter gets a Fired notice first");
                let msg = decode_server_message(&data).unwrap();
                assert_eq!(
                    msg,
                    ServerMessage::Notice(NoticeMsg {
                        notification: Notification::Fired
                    })
                );
                break;
            }
        }

        cmd_tx.send(GameCommand::Stop).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn resync_sends_full_snapshot_next() {
        let (cmd_tx, mut rx, handle) = spawn(GameMode::FreeForAll);
        join(&cmd_tx, 1);
        cmd_tx.send(GameCommand::Start).unwrap();
        cmd_tx
            .send(GameCommand::Input {
                player_id: 1,
                event: InputEvent::KeyDown(68),
            })
            .unwrap();
        assert!(next_state(&mut rx).await.is_full());
        assert!(!next_state(&mut rx).await.is_full());

        cmd_tx.send(GameCommand::Resync).unwrap();
        // Frames already queued before the resync may still be deltas.
        let mut resynced = false;
        for _ in 0..10 {
            if next_state(&mut rx).await.is_full() {
                resynced = true;
                break;
            }
        }
        assert!(resynced, "Resync should produce a full snapshot");

        cmd_tx.send(GameCommand::Stop).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn stop_sends_game_ended() {
        let (cmd_tx, mut rx, handle) = spawn(GameMode::Duel);
        cmd_tx.send(GameCommand::Stop).unwrap();

        loop {
            if let GameBroadcast::GameEnded = next_broadcast(&mut rx).await {
                break;
            }
        }
        handle.await.unwrap();
    }
}
