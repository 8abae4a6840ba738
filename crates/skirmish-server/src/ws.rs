use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::FromRequest;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use skirmish_arena::InputEvent;
use skirmish_core::game::PlayerId;
use skirmish_core::net::messages::{ClientMessage, ErrorMsg, ServerMessage};
use skirmish_core::net::protocol::{MAX_MESSAGE_SIZE, decode_client_message, encode_server_message};

use crate::config::RateLimitConfig;
use crate::room_manager::{PlayerSender, RoomError};
use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> Result<axum::response::Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let ws = WebSocketUpgrade::from_request(request, &state)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (ws_sender, mut ws_receiver) = socket.split();

    let (tx, rx) = mpsc::channel::<Bytes>(state.config.limits.player_message_buffer);
    let player_id = state.rooms.write().await.alloc_player_id();
    tracing::debug!(player_id, "Player connected");

    spawn_writer(ws_sender, rx);

    read_loop(&mut ws_receiver, &state, player_id, &tx).await;

    // Player disconnected: free their seat if they had one
    let left = state.rooms.write().await.leave(player_id);
    if left.is_ok() {
        tracing::debug!(player_id, "Removed disconnected player from room");
    }

    tracing::info!(player_id, "Player disconnected");
}

fn spawn_writer(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Bytes>,
) {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if ws_sender
                .send(Message::Binary(data.to_vec().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// One bucket per message class, so a flood of one kind cannot starve
/// another.
struct InputLimits {
    find_game: RateLimiter,
    keys: RateLimiter,
    aim: RateLimiter,
    firing: RateLimiter,
}

impl InputLimits {
    fn new(rate: &RateLimitConfig) -> Self {
        Self {
            find_game: RateLimiter::new(rate.find_game_per_min, rate.find_game_per_min / 60.0),
            keys: RateLimiter::new(rate.keys_per_sec, rate.keys_per_sec),
            aim: RateLimiter::new(rate.aim_per_sec, rate.aim_per_sec),
            firing: RateLimiter::new(rate.firing_per_sec, rate.firing_per_sec),
        }
    }

    fn allow(&mut self, msg: &ClientMessage) -> bool {
        match msg {
            ClientMessage::FindGame(_) => self.find_game.allow(),
            ClientMessage::KeyDown(_) => self.keys.allow(),
            ClientMessage::Aim(_) => self.aim.allow(),
            ClientMessage::Firing(f) if f.firing => self.firing.allow(),
            // Releases always pass; dropping one would leave input held.
            ClientMessage::KeyUp(_) | ClientMessage::Firing(_) | ClientMessage::LeaveGame => true,
        }
    }
}

async fn read_loop(
    ws_receiver: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
    player_id: PlayerId,
    tx: &PlayerSender,
) {
    let mut limits = InputLimits::new(&state.config.limits.rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data = match msg {
            Message::Binary(d) => d,
            Message::Close(_) => break,
            _ => continue,
        };

        // Drop oversized and empty messages
        if data.is_empty() || data.len() > MAX_MESSAGE_SIZE {
            continue;
        }

        let client_msg = match decode_client_message(&data) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(player_id, error = %e, "Dropping undecodable client message");
                continue;
            },
        };

        if !limits.allow(&client_msg) {
            tracing::debug!(player_id, "Rate limited");
            continue;
        }

        match client_msg {
            ClientMessage::FindGame(request) => {
                let mode = request.mode;
                let result = state
                    .rooms
                    .write()
                    .await
                    .find_game(player_id, request, tx.clone());
                match result {
                    Ok(room) => tracing::info!(player_id, room = %room, %mode, "Player found game"),
                    Err(e) => {
                        tracing::debug!(player_id, error = %e, "FindGame refused");
                        send_error(tx, &e);
                    },
                }
            },
            ClientMessage::LeaveGame => {
                if let Err(e) = state.rooms.write().await.leave(player_id) {
                    send_error(tx, &e);
                }
            },
            ClientMessage::KeyDown(k) => route(state, player_id, InputEvent::KeyDown(k.code)).await,
            ClientMessage::KeyUp(k) => route(state, player_id, InputEvent::KeyUp(k.code)).await,
            ClientMessage::Aim(a) => route(state, player_id, InputEvent::Aim(a.angle)).await,
            ClientMessage::Firing(f) => route(state, player_id, InputEvent::Firing(f.firing)).await,
        }
    }
}

async fn route(state: &AppState, player_id: PlayerId, event: InputEvent) {
    state.rooms.read().await.route_input(player_id, event);
}

fn send_error(tx: &PlayerSender, error: &RoomError) {
    let msg = ServerMessage::Error(ErrorMsg {
        message: error.to_string(),
    });
    match encode_server_message(&msg) {
        Ok(data) => {
            if tx.try_send(Bytes::from(data)).is_err() {
                tracing::debug!("Skipping error reply to slow client");
            }
        },
        Err(e) => tracing::error!(error = %e, "Failed to encode Error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::net::messages::{AimMsg, FindGameMsg, FiringMsg, KeyMsg};

    #[tokio::test]
    async fn rate_limiter_refills_over_time() {
        let mut limiter = RateLimiter::new(2.0, 20.0);
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow(), "Bucket should be empty after the burst");

        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        assert!(limiter.allow(), "Bucket should refill after waiting");
        assert!(limiter.allow());
        assert!(!limiter.allow(), "Refill is capped at the burst size");
    }

    fn aim(angle: f32) -> ClientMessage {
        ClientMessage::Aim(AimMsg { angle })
    }

    #[test]
    fn aim_flood_does_not_starve_other_classes() {
        let mut limits = InputLimits::new(&RateLimitConfig::default());
        let mut allowed = 0;
        for i in 0..500 {
            if limits.allow(&aim(i as f32 * 0.01)) {
                allowed += 1;
            }
        }
        assert!(
            (360..370).contains(&allowed),
            "Aim is capped by its own bucket, allowed {allowed}"
        );

        assert!(limits.allow(&ClientMessage::KeyDown(KeyMsg { code: 83 })));
        assert!(limits.allow(&ClientMessage::Firing(FiringMsg { firing: true })));
    }

    #[test]
    fn releases_are_never_limited() {
        let rate = RateLimitConfig {
            keys_per_sec: 1.0,
            firing_per_sec: 1.0,
            ..RateLimitConfig::default()
        };
        let mut limits = InputLimits::new(&rate);
        assert!(limits.allow(&ClientMessage::KeyDown(KeyMsg { code: 83 })));
        assert!(!limits.allow(&ClientMessage::KeyDown(KeyMsg { code: 87 })));
        assert!(limits.allow(&ClientMessage::Firing(FiringMsg { firing: true })));
        assert!(!limits.allow(&ClientMessage::Firing(FiringMsg { firing: true })));

        for _ in 0..1000 {
            assert!(limits.allow(&ClientMessage::KeyUp(KeyMsg { code: 83 })));
            assert!(limits.allow(&ClientMessage::Firing(FiringMsg { firing: false })));
        }
        assert!(limits.allow(&ClientMessage::LeaveGame));
    }

    #[test]
    fn find_game_has_a_per_minute_budget() {
        let mut limits = InputLimits::new(&RateLimitConfig::default());
        let find = ClientMessage::FindGame(FindGameMsg::default());
        for _ in 0..5 {
            assert!(limits.allow(&find));
        }
        assert!(!limits.allow(&find), "Sixth search within a minute is refused");
        assert!(limits.allow(&aim(0.0)));
    }
}
