//! WebSocket upgrade handler and per-connection session

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::SessionEvent;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Errors while talking to one client
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("WebSocket send failed: {0}")]
    Send(#[from] axum::Error),
}

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let fighter_id = Uuid::new_v4();
    info!(fighter_id = %fighter_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();
    let event_tx = state.stage.event_tx.clone();

    // Subscribe before joining so nothing broadcast after the join is missed
    let snapshot_rx = state.stage.subscribe();

    let Some(joined_tick) = join_stage(fighter_id, &mut ws_sink, &event_tx).await else {
        return;
    };

    run_session(fighter_id, joined_tick, ws_sink, ws_stream, event_tx, snapshot_rx).await;
    info!(fighter_id = %fighter_id, "WebSocket connection closed");
}

/// Join the stage and send `currentPlayers` as the first frame.
/// Returns the tick of that snapshot, or None once the session is over.
async fn join_stage<S>(fighter_id: Uuid, ws_sink: &mut S, event_tx: &mpsc::Sender<SessionEvent>) -> Option<u64>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let (reply_tx, reply_rx) = oneshot::channel();
    let join = SessionEvent::Join {
        fighter_id,
        reply: reply_tx,
    };
    if event_tx.send(join).await.is_err() {
        error!(fighter_id = %fighter_id, "Stage is not running");
        return None;
    }

    let current = match reply_rx.await {
        Ok(msg) => msg,
        Err(_) => {
            error!(fighter_id = %fighter_id, "Stage dropped join without a reply");
            leave(event_tx, fighter_id).await;
            return None;
        }
    };
    let joined_tick = match &current {
        ServerMsg::CurrentPlayers { tick, .. } => *tick,
        _ => 0,
    };

    if let Err(e) = send_msg(ws_sink, &current).await {
        debug!(fighter_id = %fighter_id, error = %e, "Failed to send currentPlayers");
        leave(event_tx, fighter_id).await;
        return None;
    }

    Some(joined_tick)
}

/// Run the WebSocket session with read/write split
async fn run_session(
    fighter_id: Uuid,
    joined_tick: u64,
    mut ws_sink: SplitSink<WebSocket, Message>,
    ws_stream: SplitStream<WebSocket>,
    event_tx: mpsc::Sender<SessionEvent>,
    mut snapshot_rx: broadcast::Receiver<ServerMsg>,
) {
    // Spawn writer task: stage broadcasts -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match snapshot_rx.recv().await {
                Ok(msg) => {
                    if !should_forward(&msg, fighter_id, joined_tick) {
                        continue;
                    }
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(fighter_id = %fighter_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        fighter_id = %fighter_id,
                        lagged_count = n,
                        "Client lagged, skipping {} messages", n
                    );
                    // Continue - the next gameState is a full resync
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(fighter_id = %fighter_id, "Snapshot channel closed");
                    break;
                }
            }
        }
    });

    forward_inputs(fighter_id, ws_stream, &event_tx, &ConnectionRateLimiter::new()).await;

    writer_handle.abort();
}

/// Reader side: WebSocket -> stage. Always leaves the stage when the client is gone.
async fn forward_inputs<S, E>(
    fighter_id: Uuid,
    mut ws_stream: S,
    event_tx: &mpsc::Sender<SessionEvent>,
    rate_limiter: &ConnectionRateLimiter,
) where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display,
{
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                // Dropped frames leave the previous input in effect
                if !rate_limiter.check_input() {
                    debug!(fighter_id = %fighter_id, "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(ClientMsg::PlayerInput(input)) => {
                        if event_tx
                            .send(SessionEvent::Input { fighter_id, input })
                            .await
                            .is_err()
                        {
                            debug!(fighter_id = %fighter_id, "Event channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(fighter_id = %fighter_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(fighter_id = %fighter_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(fighter_id = %fighter_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(fighter_id = %fighter_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    leave(event_tx, fighter_id).await;
}

/// Whether a stage broadcast should reach this connection.
/// Skips our own `newPlayer` and any `gameState` not newer than our `currentPlayers`.
fn should_forward(msg: &ServerMsg, fighter_id: Uuid, joined_tick: u64) -> bool {
    match msg {
        ServerMsg::NewPlayer(snapshot) => snapshot.id != fighter_id,
        ServerMsg::GameState { tick, .. } => *tick > joined_tick,
        ServerMsg::CurrentPlayers { .. } | ServerMsg::PlayerDisconnected(_) => true,
    }
}

/// Tell the stage this connection is gone
async fn leave(event_tx: &mpsc::Sender<SessionEvent>, fighter_id: Uuid) {
    let _ = event_tx.send(SessionEvent::Leave { fighter_id }).await;
}

/// Send a message over WebSocket
async fn send_msg<S>(sink: &mut S, msg: &ServerMsg) -> Result<(), WsError>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let json = serde_json::to_string(msg)?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::archetype::VEXA;
    use crate::game::Fighter;
    use crate::game::{GameRules, Stage};
    use crate::ws::protocol::{FighterSnapshot, PlayerMap};
    use futures::stream;
    use serde_json::json;
    use tokio_test::assert_ok;

    fn announce(id: Uuid) -> ServerMsg {
        ServerMsg::NewPlayer(FighterSnapshot::from(&Fighter::new(id, &VEXA, 100.0, 300.0)))
    }

    fn game_state(tick: u64) -> ServerMsg {
        ServerMsg::GameState {
            tick,
            players: PlayerMap::new(),
        }
    }

    #[test]
    fn own_new_player_is_not_echoed() {
        let me = Uuid::from_u128(1);
        assert!(!should_forward(&announce(me), me, 0));
        assert!(should_forward(&announce(Uuid::from_u128(2)), me, 0));
    }

    #[test]
    fn stale_game_state_is_dropped_after_join() {
        let me = Uuid::from_u128(1);
        assert!(!should_forward(&game_state(9), me, 10));
        assert!(!should_forward(&game_state(10), me, 10));
        assert!(should_forward(&game_state(11), me, 10));
    }

    #[test]
    fn disconnects_are_always_forwarded() {
        let me = Uuid::from_u128(1);
        assert!(should_forward(&ServerMsg::PlayerDisconnected(Uuid::from_u128(3)), me, 10));
    }

    fn input_frame(data: serde_json::Value) -> Result<Message, axum::Error> {
        Ok(Message::Text(json!({ "type": "playerInput", "data": data }).to_string()))
    }

    /// Run the reader over `frames` and collect what reached the stage
    async fn forwarded(frames: Vec<Result<Message, axum::Error>>, limiter: ConnectionRateLimiter) -> Vec<SessionEvent> {
        let (event_tx, mut event_rx) = mpsc::channel(16);
        forward_inputs(Uuid::from_u128(1), stream::iter(frames), &event_tx, &limiter).await;
        drop(event_tx);

        let mut events = Vec::new();
        while let Some(event) = event_rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn malformed_frame_is_ignored_and_session_leaves_once() {
        let events = forwarded(
            vec![
                input_frame(json!({ "left": true })),
                Ok(Message::Text("not json".into())),
                Ok(Message::Text(r#"{"type":"chat","data":"hi"}"#.into())),
                Ok(Message::Close(None)),
                input_frame(json!({ "right": true })),
            ],
            ConnectionRateLimiter::new(),
        )
        .await;

        assert_eq!(events.len(), 2);
        match &events[0] {
            SessionEvent::Input { input, .. } => assert!(input.left && !input.right),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(events[1], SessionEvent::Leave { .. }));
    }

    #[tokio::test]
    async fn leave_is_sent_when_stream_ends_or_errors() {
        let ended = forwarded(vec![input_frame(json!({ "jump": true }))], ConnectionRateLimiter::new()).await;
        assert_eq!(ended.len(), 2);
        assert!(matches!(ended[1], SessionEvent::Leave { .. }));

        let errored = forwarded(
            vec![Err(axum::Error::new("connection reset")), input_frame(json!({ "jump": true }))],
            ConnectionRateLimiter::new(),
        )
        .await;
        assert_eq!(errored.len(), 1);
        assert!(matches!(errored[0], SessionEvent::Leave { .. }));
    }

    #[tokio::test]
    async fn rate_limited_frame_keeps_previous_input() {
        let events = forwarded(
            vec![input_frame(json!({ "left": true })), input_frame(json!({ "right": true }))],
            ConnectionRateLimiter::with_input_rate(1),
        )
        .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SessionEvent::Input { input, .. } if input.left));
        assert!(matches!(events[1], SessionEvent::Leave { .. }));
    }

    #[tokio::test]
    async fn current_players_is_the_first_frame() {
        let (stage, handle) = Stage::new(3, GameRules::default());
        let stage_task = tokio::spawn(stage.run());
        let me = Uuid::from_u128(9);

        let (frame_tx, mut frame_rx) = futures::channel::mpsc::unbounded::<Message>();
        let mut sink = frame_tx.sink_map_err(axum::Error::new);
        let joined_tick = join_stage(me, &mut sink, &handle.event_tx).await;
        assert!(joined_tick.is_some());

        let first = match frame_rx.next().await {
            Some(Message::Text(text)) => assert_ok!(serde_json::from_str::<serde_json::Value>(&text)),
            other => panic!("unexpected frame: {:?}", other),
        };
        assert_eq!(first["type"], "currentPlayers");
        assert_eq!(first["data"]["tick"], joined_tick.unwrap());
        assert!(first["data"]["players"].get(me.to_string()).is_some());

        drop(handle);
        assert_ok!(assert_ok!(stage_task.await));
    }

    #[tokio::test]
    async fn join_fails_cleanly_without_a_stage() {
        let (stage, handle) = Stage::new(3, GameRules::default());
        drop(stage);

        let (frame_tx, mut frame_rx) = futures::channel::mpsc::unbounded::<Message>();
        let mut sink = frame_tx.sink_map_err(axum::Error::new);

        assert!(join_stage(Uuid::from_u128(9), &mut sink, &handle.event_tx).await.is_none());
        drop(sink);
        assert!(frame_rx.next().await.is_none());
    }
}
