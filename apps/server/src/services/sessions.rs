//! Live game sessions: registry, turn timers, trick reveal, and
//! end-of-game reconciliation.
//!
//! Each active game is an independent, serially-executed state machine.
//! All mutation of one game goes through its room mutex in short
//! lock-compute-unlock sections; the guard is never held across an await.
//! Timer callbacks carry the turn epoch they were armed with, so any
//! state change that re-arms the turn invalidates stale timers. A reveal
//! timer, once started, always runs to resolution: forced endings that
//! arrive mid-reveal are parked and applied after the trick settles.

use std::sync::{Arc, Weak};
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::adapters::records_api::{GameRecordRow, GameRecordStore, TrickRow};
use crate::config::MatchSystemConfig;
use crate::domain::cards::Card;
use crate::domain::engine::{BiscaEngine, GameMode, Seat, TrickRecord};
use crate::protocol::game_state::{GameStateView, GameStatus, PlayerView, TablePlay};
use crate::services::lobby::{JoinOutcome, LobbyManager};
use crate::services::matches::MatchCoordinator;
use crate::ws::hub::ConnectionRegistry;
use crate::ws::protocol::ServerMsg;

/// Identity of a connected player as the session layer sees it.
#[derive(Debug, Clone)]
pub struct PlayerRef {
    pub user_id: i64,
    pub name: String,
}

/// Why a game was ended by forced resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndCause {
    Timeout,
    Surrender,
    Disconnect,
}

/// Session-level turn machine. The reveal window is an explicit state so
/// the reveal-then-resolve sequence can be driven synchronously in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnState {
    AwaitingPlay,
    Revealing,
    Finished,
}

struct GameSession {
    game_id: Uuid,
    match_id: Uuid,
    mode: GameMode,
    bet_amount: u32,
    players: [PlayerRef; 2],
    engine: BiscaEngine,
    turn_state: TurnState,
    /// Bumped whenever the pending turn timer becomes stale.
    turn_epoch: u64,
    turn_deadline: Instant,
    /// Forced ending that arrived during a reveal; applied after the
    /// trick resolves.
    pending_forced: Option<(Seat, EndCause)>,
    started_at: OffsetDateTime,
    ended_at: Option<OffsetDateTime>,
}

impl GameSession {
    fn seat_of(&self, user_id: i64) -> Option<Seat> {
        if self.players[0].user_id == user_id {
            Some(Seat::Player1)
        } else if self.players[1].user_id == user_id {
            Some(Seat::Player2)
        } else {
            None
        }
    }
}

struct GameRoom {
    id: Uuid,
    /// Cancels the room's broadcast task on teardown.
    cancel: CancellationToken,
    state: Mutex<GameSession>,
}

/// Everything needed to report and persist a finished game, captured
/// under the room lock and consumed after release.
struct FinishBundle {
    game_id: Uuid,
    match_id: Uuid,
    mode: GameMode,
    bet_amount: u32,
    players: [PlayerRef; 2],
    scores: [u16; 2],
    winner: Option<Seat>,
    started_at: OffsetDateTime,
    ended_at: OffsetDateTime,
    tricks: Vec<TrickRecord>,
}

enum LoserSpec {
    CurrentTurn,
    Seat(Seat),
}

pub struct GameSessionManager {
    /// Self-handle for the timer and broadcast tasks this manager spawns.
    me: Weak<GameSessionManager>,
    config: Arc<MatchSystemConfig>,
    hub: Arc<ConnectionRegistry>,
    lobby: Arc<LobbyManager>,
    matches: Arc<MatchCoordinator>,
    records: Arc<dyn GameRecordStore>,
    rooms: DashMap<Uuid, Arc<GameRoom>>,
    player_rooms: DashMap<i64, Uuid>,
}

impl GameSessionManager {
    pub fn new(
        config: Arc<MatchSystemConfig>,
        hub: Arc<ConnectionRegistry>,
        lobby: Arc<LobbyManager>,
        matches: Arc<MatchCoordinator>,
        records: Arc<dyn GameRecordStore>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            config,
            hub,
            lobby,
            matches,
            records,
            rooms: DashMap::new(),
            player_rooms: DashMap::new(),
        })
    }

    pub fn active_games(&self) -> usize {
        self.rooms.len()
    }

    pub fn game_of(&self, user_id: i64) -> Option<Uuid> {
        self.player_rooms.get(&user_id).map(|entry| *entry)
    }

    /// Personalized snapshot, or None if the game/viewer is unknown.
    pub fn state_view(&self, game_id: Uuid, user_id: i64) -> Option<GameStateView> {
        let room = self.room(game_id)?;
        let session = room.state.lock();
        let seat = session.seat_of(user_id)?;
        Some(self.view_for(&session, seat))
    }

    // ---------- lobby orchestration ----------

    /// Handle `lobby:join`: resolve the display name through the records
    /// API (best-effort), then either wait or pair-and-start.
    pub async fn join_lobby(&self, mut player: PlayerRef, mode: GameMode, bet_amount: u32) {
        match self.records.fetch_user(player.user_id).await {
            Ok(identity) => player.name = identity.name,
            Err(err) => warn!(
                user_id = player.user_id,
                error = %err,
                "display name lookup failed, using client-supplied name"
            ),
        }

        let user_id = player.user_id;
        match self.lobby.join(player.clone(), mode, bet_amount) {
            JoinOutcome::Waiting { lobby_id } => {
                self.hub
                    .send_to_user(user_id, ServerMsg::LobbyWaiting { lobby_id });
                self.hub
                    .broadcast_except(user_id, ServerMsg::LobbyAvailable { lobby_id });
            }
            JoinOutcome::Paired { opponent, .. } => {
                // The waiting player keeps the first seat.
                let match_id =
                    self.matches
                        .create_match(opponent.user_id, user_id, bet_amount);
                self.start_game(match_id, [opponent, player], mode, bet_amount);
            }
        }
    }

    pub fn leave_lobby(&self, user_id: i64) {
        self.lobby.leave(user_id);
    }

    // ---------- game lifecycle ----------

    fn start_game(
        &self,
        match_id: Uuid,
        players: [PlayerRef; 2],
        mode: GameMode,
        bet_amount: u32,
    ) {
        let game_id = Uuid::new_v4();
        let session = GameSession {
            game_id,
            match_id,
            mode,
            bet_amount,
            players: players.clone(),
            engine: BiscaEngine::new(mode, rand::random()),
            turn_state: TurnState::AwaitingPlay,
            turn_epoch: 0,
            turn_deadline: Instant::now() + self.config.turn_timeout,
            pending_forced: None,
            started_at: OffsetDateTime::now_utc(),
            ended_at: None,
        };
        let room = Arc::new(GameRoom {
            id: game_id,
            cancel: CancellationToken::new(),
            state: Mutex::new(session),
        });
        self.rooms.insert(game_id, Arc::clone(&room));
        for player in &players {
            self.player_rooms.insert(player.user_id, game_id);
        }
        info!(game_id = %game_id, match_id = %match_id, "game started");

        let starts = {
            let session = room.state.lock();
            [Seat::Player1, Seat::Player2].map(|seat| {
                (
                    session.players[seat.idx()].user_id,
                    ServerMsg::GameStart {
                        game_id,
                        match_id,
                        game_state: self.view_for(&session, seat),
                        opponent_user_id: session.players[seat.other().idx()].user_id,
                        bet_amount,
                        game_type: mode,
                    },
                )
            })
        };
        for (user_id, msg) in starts {
            self.hub.send_to_user(user_id, msg);
        }

        self.spawn_broadcast_loop(Arc::clone(&room));
        self.arm_turn_timer(game_id, 0);
    }

    /// Handle `game:play_card`. Turn ownership and the elapsed-time
    /// deadline are re-validated here even when the action arrives just
    /// under the wire: the first definitive outcome wins.
    pub fn play_card(&self, user_id: i64, game_id: Uuid, card_id: &str) {
        let Some(room) = self.room(game_id) else {
            self.error_to(user_id, format!("Game {game_id} not found"));
            return;
        };
        let card = match card_id.parse::<Card>() {
            Ok(card) => card,
            Err(err) => {
                self.error_to(user_id, err.detail().to_string());
                return;
            }
        };

        enum Step {
            Rejected(String),
            TimedOut,
            Played {
                updates: Vec<(i64, ServerMsg)>,
                epoch: u64,
            },
            TrickReady {
                updates: Vec<(i64, ServerMsg)>,
                table: Vec<TablePlay>,
            },
        }

        let step = {
            let mut session = room.state.lock();
            let Some(seat) = session.seat_of(user_id) else {
                drop(session);
                self.error_to(user_id, "You are not part of this game".to_string());
                return;
            };
            match session.turn_state {
                TurnState::Finished => Step::Rejected("Game already finished".to_string()),
                TurnState::Revealing => Step::Rejected("Trick awaiting resolution".to_string()),
                TurnState::AwaitingPlay => {
                    if session.engine.turn() == seat && Instant::now() >= session.turn_deadline {
                        Step::TimedOut
                    } else {
                        match session.engine.play_card(seat, card) {
                            Err(err) => Step::Rejected(err.detail().to_string()),
                            Ok(outcome) if outcome.trick_ready => {
                                session.turn_state = TurnState::Revealing;
                                session.turn_epoch += 1;
                                Step::TrickReady {
                                    updates: self.both_updates(&session),
                                    table: table_plays(&session.engine),
                                }
                            }
                            Ok(_) => {
                                session.turn_epoch += 1;
                                session.turn_deadline = Instant::now() + self.config.turn_timeout;
                                Step::Played {
                                    updates: self.both_updates(&session),
                                    epoch: session.turn_epoch,
                                }
                            }
                        }
                    }
                }
            }
        };

        match step {
            Step::Rejected(message) => self.error_to(user_id, message),
            Step::TimedOut => {
                self.force_finish(&room, LoserSpec::CurrentTurn, EndCause::Timeout, None)
            }
            Step::Played { updates, epoch } => {
                self.send_all(updates);
                self.arm_turn_timer(game_id, epoch);
            }
            Step::TrickReady { updates, table } => {
                let recipients: Vec<i64> = updates.iter().map(|(uid, _)| *uid).collect();
                self.send_all(updates);
                for uid in recipients {
                    self.hub
                        .send_to_user(uid, ServerMsg::TrickComplete { table: table.clone() });
                }
                self.schedule_reveal(game_id);
            }
        }
    }

    /// Resolve the revealed trick. Invoked by the reveal timer; public so
    /// tests can drive the sequence without waiting.
    pub fn resolve_revealed_trick(&self, game_id: Uuid) {
        let Some(room) = self.room(game_id) else {
            return;
        };

        enum Next {
            Skip,
            Continue {
                updates: Vec<(i64, ServerMsg)>,
                epoch: u64,
            },
            Natural(FinishBundle, Option<(Seat, EndCause)>),
            Forced(Seat, EndCause),
        }

        let next = {
            let mut session = room.state.lock();
            if session.turn_state != TurnState::Revealing {
                Next::Skip
            } else {
                match session.engine.resolve_trick() {
                    Err(err) => {
                        warn!(game_id = %game_id, error = %err, "reveal fired without a complete trick");
                        Next::Skip
                    }
                    Ok(record) => {
                        info!(
                            game_id = %game_id,
                            trick = record.number,
                            winner = ?record.winner,
                            points = record.points,
                            "trick resolved"
                        );
                        if session.engine.is_finished() {
                            session.turn_state = TurnState::Finished;
                            session.turn_epoch += 1;
                            session.ended_at = Some(OffsetDateTime::now_utc());
                            let pending = session.pending_forced.take();
                            Next::Natural(build_finish_bundle(&session), pending)
                        } else if let Some((loser, cause)) = session.pending_forced.take() {
                            session.turn_state = TurnState::AwaitingPlay;
                            session.turn_epoch += 1;
                            Next::Forced(loser, cause)
                        } else {
                            session.turn_state = TurnState::AwaitingPlay;
                            session.turn_epoch += 1;
                            session.turn_deadline = Instant::now() + self.config.turn_timeout;
                            Next::Continue {
                                updates: self.both_updates(&session),
                                epoch: session.turn_epoch,
                            }
                        }
                    }
                }
            }
        };

        match next {
            Next::Skip => {}
            Next::Continue { updates, epoch } => {
                self.send_all(updates);
                self.arm_turn_timer(game_id, epoch);
            }
            Next::Natural(bundle, pending) => self.finish_natural(bundle, pending),
            Next::Forced(loser, cause) => {
                self.force_finish(&room, LoserSpec::Seat(loser), cause, None)
            }
        }
    }

    /// Handle `game:surrender`.
    pub fn surrender(&self, user_id: i64, game_id: Uuid) {
        let Some(room) = self.room(game_id) else {
            self.error_to(user_id, format!("Game {game_id} not found"));
            return;
        };
        let seat = { room.state.lock().seat_of(user_id) };
        let Some(seat) = seat else {
            self.error_to(user_id, "You are not part of this game".to_string());
            return;
        };
        self.force_finish(&room, LoserSpec::Seat(seat), EndCause::Surrender, None);
    }

    /// Handle `game:request_state` (client re-sync).
    pub fn request_state(&self, user_id: i64, game_id: Uuid) {
        match self.state_view(game_id, user_id) {
            Some(view) => {
                self.hub
                    .send_to_user(user_id, ServerMsg::GameStateUpdate(view));
            }
            None => self.error_to(user_id, format!("Game {game_id} not found")),
        }
    }

    /// Connection loss: drop any lobby wait silently; a live game is
    /// forfeited to the opponent, identically to a surrender.
    pub fn handle_disconnect(&self, user_id: i64) {
        self.lobby.leave(user_id);
        let Some(game_id) = self.game_of(user_id) else {
            return;
        };
        let Some(room) = self.room(game_id) else {
            return;
        };
        let seat = { room.state.lock().seat_of(user_id) };
        if let Some(seat) = seat {
            info!(game_id = %game_id, user_id, "player disconnected mid-game");
            self.force_finish(&room, LoserSpec::Seat(seat), EndCause::Disconnect, None);
        }
    }

    // ---------- timers ----------

    fn arm_turn_timer(&self, game_id: Uuid, epoch: u64) {
        let Some(mgr) = self.me.upgrade() else {
            return;
        };
        let timeout = self.config.turn_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let Some(room) = mgr.room(game_id) else {
                return;
            };
            mgr.force_finish(
                &room,
                LoserSpec::CurrentTurn,
                EndCause::Timeout,
                Some(epoch),
            );
        });
    }

    fn schedule_reveal(&self, game_id: Uuid) {
        let Some(mgr) = self.me.upgrade() else {
            return;
        };
        let delay = self.config.reveal_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            mgr.resolve_revealed_trick(game_id);
        });
    }

    fn spawn_broadcast_loop(&self, room: Arc<GameRoom>) {
        let Some(mgr) = self.me.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(mgr.config.broadcast_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = room.cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let updates = {
                            let session = room.state.lock();
                            mgr.both_updates(&session)
                        };
                        mgr.send_all(updates);
                    }
                }
            }
        });
    }

    // ---------- endings ----------

    /// Apply a forced resolution (timeout, surrender, disconnect): all
    /// remaining card points flow to the opponent, who wins outright.
    ///
    /// `expected_epoch` makes timer callbacks no-ops once the turn has
    /// moved on. A forced ending arriving during a reveal is parked and
    /// applied by `resolve_revealed_trick` once the trick settles.
    fn force_finish(
        &self,
        room: &Arc<GameRoom>,
        loser_spec: LoserSpec,
        cause: EndCause,
        expected_epoch: Option<u64>,
    ) {
        enum Applied {
            Skip,
            Parked,
            Done(Box<FinishBundle>, Seat),
        }

        let applied = {
            let mut session = room.state.lock();
            if session.turn_state == TurnState::Finished {
                Applied::Skip
            } else if expected_epoch.is_some_and(|epoch| epoch != session.turn_epoch) {
                Applied::Skip
            } else {
                let loser = match loser_spec {
                    LoserSpec::CurrentTurn => session.engine.turn(),
                    LoserSpec::Seat(seat) => seat,
                };
                if session.turn_state == TurnState::Revealing {
                    if session.pending_forced.is_none() {
                        session.pending_forced = Some((loser, cause));
                    }
                    Applied::Parked
                } else {
                    match session.engine.award_remaining_to(loser.other()) {
                        Err(err) => {
                            warn!(game_id = %room.id, error = %err, "forced resolution skipped");
                            Applied::Skip
                        }
                        Ok(awarded) => {
                            session.turn_state = TurnState::Finished;
                            session.turn_epoch += 1;
                            session.ended_at = Some(OffsetDateTime::now_utc());
                            info!(
                                game_id = %room.id,
                                ?cause,
                                awarded,
                                winner = ?loser.other(),
                                "game ended by forced resolution"
                            );
                            Applied::Done(Box::new(build_finish_bundle(&session)), loser)
                        }
                    }
                }
            }
        };

        let Applied::Done(bundle, loser) = applied else {
            return;
        };
        let winner_user_id = bundle.players[loser.other().idx()].user_id;
        let loser_user_id = bundle.players[loser.idx()].user_id;

        let cause_msg = match cause {
            EndCause::Timeout => ServerMsg::GameTimeout {
                game_id: bundle.game_id,
                winner_user_id,
                loser_user_id,
            },
            EndCause::Surrender => ServerMsg::GameSurrendered {
                game_id: bundle.game_id,
                surrendered_by: loser_user_id,
                winner_user_id,
            },
            EndCause::Disconnect => ServerMsg::OpponentDisconnected {
                game_id: bundle.game_id,
                disconnected_user_id: loser_user_id,
                winner_user_id,
            },
        };
        self.send_to_players(&bundle, cause_msg);
        self.send_to_players(&bundle, game_ended_msg(&bundle));

        if let Some(report) = self
            .matches
            .record_surrender(bundle.match_id, loser_user_id)
        {
            if let Some(finish) = report.finished {
                self.send_to_players(
                    &bundle,
                    ServerMsg::MatchFinished {
                        match_id: bundle.match_id,
                        winner_user_id: finish.winner_user_id,
                        total_coins_won: finish.winner_payout,
                        total_bet: finish.total_bet,
                    },
                );
            }
        }

        self.spawn_persist(&bundle);
        self.teardown(room);
    }

    /// A game that ran to natural completion: record it on the series,
    /// persist, and either finish the series or deal the next game.
    fn finish_natural(&self, bundle: FinishBundle, pending: Option<(Seat, EndCause)>) {
        info!(
            game_id = %bundle.game_id,
            winner = ?bundle.winner,
            scores = ?bundle.scores,
            "game finished"
        );

        self.send_to_players(&bundle, game_ended_msg(&bundle));

        let report = self.matches.record_game_result(
            bundle.match_id,
            bundle.game_id,
            bundle.scores,
            bundle.winner,
        );

        self.spawn_persist(&bundle);
        if let Some(room) = self.room(bundle.game_id) {
            self.teardown(&room);
        }

        let Some(report) = report else {
            return;
        };
        self.send_to_players(
            &bundle,
            ServerMsg::MatchGameResult {
                game_id: bundle.game_id,
                winner_user_id: bundle
                    .winner
                    .map(|seat| bundle.players[seat.idx()].user_id),
                match_state: report.view,
            },
        );

        if let Some(finish) = report.finished {
            self.send_to_players(
                &bundle,
                ServerMsg::MatchFinished {
                    match_id: bundle.match_id,
                    winner_user_id: finish.winner_user_id,
                    total_coins_won: finish.winner_payout,
                    total_bet: finish.total_bet,
                },
            );
            return;
        }

        // A player who vanished during the final reveal cannot start the
        // next game: the series ends in the opponent's favor instead.
        if let Some((loser, _)) = pending {
            let loser_user_id = bundle.players[loser.idx()].user_id;
            if let Some(report) = self
                .matches
                .record_surrender(bundle.match_id, loser_user_id)
            {
                if let Some(finish) = report.finished {
                    self.send_to_players(
                        &bundle,
                        ServerMsg::MatchFinished {
                            match_id: bundle.match_id,
                            winner_user_id: finish.winner_user_id,
                            total_coins_won: finish.winner_payout,
                            total_bet: finish.total_bet,
                        },
                    );
                }
            }
            return;
        }

        // Series still open: deal the next game for the same pair.
        self.start_game(
            bundle.match_id,
            bundle.players.clone(),
            bundle.mode,
            bundle.bet_amount,
        );
    }

    fn teardown(&self, room: &Arc<GameRoom>) {
        self.rooms.remove(&room.id);
        let users: Vec<i64> = {
            let session = room.state.lock();
            session.players.iter().map(|p| p.user_id).collect()
        };
        for user_id in users {
            self.player_rooms.remove_if(&user_id, |_, game| *game == room.id);
        }
        room.cancel.cancel();
    }

    // ---------- persistence ----------

    /// Submit the finished game and its trick log to the records API.
    /// Best-effort: failures are logged and never roll back the
    /// in-memory outcome.
    fn spawn_persist(&self, bundle: &FinishBundle) {
        let row = GameRecordRow {
            game_type: bundle.mode,
            player1_user_id: bundle.players[0].user_id,
            player2_user_id: bundle.players[1].user_id,
            is_draw: bundle.winner.is_none(),
            winner_user_id: bundle.winner.map(|seat| bundle.players[seat.idx()].user_id),
            loser_user_id: bundle
                .winner
                .map(|seat| bundle.players[seat.other().idx()].user_id),
            match_id: Some(bundle.match_id),
            status: "Ended".to_string(),
            began_at: bundle.started_at,
            ended_at: bundle.ended_at,
            total_time: (bundle.ended_at - bundle.started_at).whole_seconds(),
            player1_points: bundle.scores[0],
            player2_points: bundle.scores[1],
        };
        let tricks: Vec<TrickRow> = bundle
            .tricks
            .iter()
            .map(|trick| trick_row(trick, &bundle.players))
            .collect();
        let records = Arc::clone(&self.records);
        let game_id = bundle.game_id;

        tokio::spawn(async move {
            match records.create_game(&row).await {
                Ok(record_id) => {
                    if let Err(err) = records.create_tricks(record_id, &tricks).await {
                        error!(game_id = %game_id, error = %err, "failed to persist trick log");
                    }
                }
                Err(err) => {
                    error!(
                        game_id = %game_id,
                        error = %err,
                        "failed to persist game record; outcome kept in-memory only"
                    );
                }
            }
        });
    }

    // ---------- helpers ----------

    fn room(&self, game_id: Uuid) -> Option<Arc<GameRoom>> {
        self.rooms.get(&game_id).map(|room| Arc::clone(room.value()))
    }

    fn error_to(&self, user_id: i64, message: String) {
        self.hub
            .send_to_user(user_id, ServerMsg::GameError { message });
    }

    fn send_all(&self, updates: Vec<(i64, ServerMsg)>) {
        for (user_id, msg) in updates {
            self.hub.send_to_user(user_id, msg);
        }
    }

    fn send_to_players(&self, bundle: &FinishBundle, msg: ServerMsg) {
        for player in &bundle.players {
            self.hub.send_to_user(player.user_id, msg.clone());
        }
    }

    fn both_updates(&self, session: &GameSession) -> Vec<(i64, ServerMsg)> {
        [Seat::Player1, Seat::Player2]
            .into_iter()
            .map(|seat| {
                (
                    session.players[seat.idx()].user_id,
                    ServerMsg::GameStateUpdate(self.view_for(session, seat)),
                )
            })
            .collect()
    }

    fn view_for(&self, session: &GameSession, viewer: Seat) -> GameStateView {
        let engine = &session.engine;
        let marks = engine.marks(&self.config.marks);
        let player_view = |seat: Seat| PlayerView {
            user_id: session.players[seat.idx()].user_id,
            name: session.players[seat.idx()].name.clone(),
            score: engine.score(seat),
            marks: marks[seat.idx()],
            hand: if seat == viewer {
                engine.hand(seat).to_vec()
            } else {
                Vec::new()
            },
            hand_size: engine.hand(seat).len() as u8,
            trick_count: engine.tricks_won(seat),
        };
        let turn_time_remaining_ms = match session.turn_state {
            TurnState::AwaitingPlay => session
                .turn_deadline
                .saturating_duration_since(Instant::now())
                .as_millis() as u64,
            _ => 0,
        };

        GameStateView {
            game_id: session.game_id,
            status: if session.turn_state == TurnState::Finished {
                GameStatus::Finished
            } else {
                GameStatus::Playing
            },
            current_player: engine.turn(),
            turn_time_remaining_ms,
            player1: player_view(Seat::Player1),
            player2: player_view(Seat::Player2),
            table: table_plays(engine),
            trump_card: engine.trump_card(),
            deck_remaining: engine.deck_remaining() as u8,
            winner: engine.winner(),
            started_at: session.started_at,
            ended_at: session.ended_at,
        }
    }
}

fn table_plays(engine: &BiscaEngine) -> Vec<TablePlay> {
    engine
        .table()
        .iter()
        .map(|&(player, card)| TablePlay { player, card })
        .collect()
}

fn build_finish_bundle(session: &GameSession) -> FinishBundle {
    FinishBundle {
        game_id: session.game_id,
        match_id: session.match_id,
        mode: session.mode,
        bet_amount: session.bet_amount,
        players: session.players.clone(),
        scores: session.engine.scores(),
        winner: session.engine.winner(),
        started_at: session.started_at,
        ended_at: session.ended_at.unwrap_or_else(OffsetDateTime::now_utc),
        tricks: session.engine.tricks().to_vec(),
    }
}

fn game_ended_msg(bundle: &FinishBundle) -> ServerMsg {
    ServerMsg::GameEnded {
        game_id: bundle.game_id,
        is_draw: bundle.winner.is_none(),
        winner_user_id: bundle.winner.map(|seat| bundle.players[seat.idx()].user_id),
        player1_score: bundle.scores[0],
        player2_score: bundle.scores[1],
    }
}

fn trick_row(trick: &TrickRecord, players: &[PlayerRef; 2]) -> TrickRow {
    let (lead_seat, lead) = trick.plays[0];
    let (second_seat, second) = trick.plays[1];
    TrickRow {
        trick_number: trick.number,
        card1_id: lead.id(),
        card1_suit: lead.suit,
        card1_rank: lead.rank,
        card1_value: lead.value(),
        card1_player_id: players[lead_seat.idx()].user_id,
        card2_id: second.id(),
        card2_suit: second.suit,
        card2_rank: second.rank,
        card2_value: second.value(),
        card2_player_id: players[second_seat.idx()].user_id,
        winner_user_id: players[trick.winner.idx()].user_id,
        points_won: trick.points,
        trump_suit: trick.trump_suit,
    }
}
