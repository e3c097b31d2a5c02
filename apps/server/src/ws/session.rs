//! Per-connection WebSocket actor.
//!
//! Parses inbound events into the typed protocol, binds the connection to
//! a user identity on the first `lobby:join`, and hands actions to the
//! session manager. All game-driven traffic flows back through the
//! connection registry; only parse and pre-identification failures are
//! answered directly on the socket.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::prelude::{Actor, ActorContext, AsyncContext, Handler, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::sessions::{GameSessionManager, PlayerRef};
use crate::state::app_state::AppState;
use crate::ws::hub::OutboundEvent;
use crate::ws::protocol::{ClientMsg, ServerMsg};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(40);

pub async fn upgrade(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session = WsSession::new(Uuid::new_v4(), app_state);
    ws::start(session, &req, stream)
}

pub struct WsSession {
    conn_id: Uuid,
    /// Set by the first `lobby:join`; identity is carried by the payload
    /// (authentication is an upstream concern).
    user: Option<PlayerRef>,
    app_state: web::Data<AppState>,
    last_heartbeat: Instant,
}

impl WsSession {
    fn new(conn_id: Uuid, app_state: web::Data<AppState>) -> Self {
        Self {
            conn_id,
            user: None,
            app_state,
            last_heartbeat: Instant::now(),
        }
    }

    fn sessions(&self) -> Arc<GameSessionManager> {
        Arc::clone(&self.app_state.sessions)
    }

    fn send_json(ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMsg) {
        match serde_json::to_string(msg) {
            Ok(payload) => ctx.text(payload),
            Err(err) => warn!(error = %err, "[WS SESSION] failed to serialize outbound message"),
        }
    }

    fn send_error(ctx: &mut ws::WebsocketContext<Self>, message: impl Into<String>) {
        Self::send_json(
            ctx,
            &ServerMsg::GameError {
                message: message.into(),
            },
        );
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |actor, ctx| {
            if Instant::now().duration_since(actor.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(
                    conn_id = %actor.conn_id,
                    user_id = actor.user.as_ref().map(|u| u.user_id),
                    "[WS SESSION] heartbeat timed out"
                );
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Normal)));
                ctx.stop();
                return;
            }
            ctx.ping(b"keepalive");
        });
    }

    fn dispatch(&mut self, cmd: ClientMsg, ctx: &mut ws::WebsocketContext<Self>) {
        match cmd {
            ClientMsg::LobbyJoin {
                user_id,
                name,
                game_type,
                bet_amount,
            } => {
                let player = PlayerRef { user_id, name };
                self.user = Some(player.clone());
                self.app_state.hub.register(
                    user_id,
                    self.conn_id,
                    ctx.address().recipient::<OutboundEvent>(),
                );

                let sessions = self.sessions();
                tokio::spawn(async move {
                    sessions.join_lobby(player, game_type, bet_amount).await;
                });
            }

            ClientMsg::LobbyLeave {} => {
                let Some(user) = &self.user else {
                    Self::send_error(ctx, "Join the lobby first");
                    return;
                };
                self.sessions().leave_lobby(user.user_id);
            }

            ClientMsg::PlayCard { game_id, card_id } => {
                let Some(user) = &self.user else {
                    Self::send_error(ctx, "Join the lobby first");
                    return;
                };
                let sessions = self.sessions();
                let user_id = user.user_id;
                tokio::spawn(async move {
                    sessions.play_card(user_id, game_id, &card_id);
                });
            }

            ClientMsg::Surrender { game_id } => {
                let Some(user) = &self.user else {
                    Self::send_error(ctx, "Join the lobby first");
                    return;
                };
                let sessions = self.sessions();
                let user_id = user.user_id;
                tokio::spawn(async move {
                    sessions.surrender(user_id, game_id);
                });
            }

            ClientMsg::RequestState { game_id } => {
                let Some(user) = &self.user else {
                    Self::send_error(ctx, "Join the lobby first");
                    return;
                };
                self.sessions().request_state(user.user_id, game_id);
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(conn_id = %self.conn_id, "[WS SESSION] started");
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!(
            conn_id = %self.conn_id,
            user_id = self.user.as_ref().map(|u| u.user_id),
            "[WS SESSION] stopped"
        );
        if let Some(user) = self.user.take() {
            self.app_state.hub.unregister(user.user_id, self.conn_id);

            // Connection loss is an implicit event: the session manager
            // reconciles any live game or lobby wait.
            let sessions = Arc::clone(&self.app_state.sessions);
            tokio::spawn(async move {
                sessions.handle_disconnect(user.user_id);
            });
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(cmd) => self.dispatch(cmd, ctx),
                    Err(err) => {
                        warn!(
                            conn_id = %self.conn_id,
                            error = %err,
                            "[WS SESSION] rejected malformed event"
                        );
                        Self::send_error(ctx, "Malformed event payload");
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                self.last_heartbeat = Instant::now();
                Self::send_error(ctx, "Binary not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {
                self.last_heartbeat = Instant::now();
            }
            Err(err) => {
                warn!(
                    conn_id = %self.conn_id,
                    error = %err,
                    "[WS SESSION] protocol error"
                );
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
                ctx.stop();
            }
        }
    }
}

impl Handler<OutboundEvent> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: OutboundEvent, ctx: &mut Self::Context) -> Self::Result {
        Self::send_json(ctx, &msg.0);
    }
}
