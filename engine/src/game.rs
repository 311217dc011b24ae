//! The authoritative session: lobby, turn order, phase progression, end
//! conditions and the event log. All mutation goes through the action
//! pipeline in [`crate::actions`]; this module owns the state machine the
//! pipeline runs against.

use std::collections::HashMap;

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{Board, PathTile, PathTileType, Position, SpecialSquare, TilePosition};
use crate::cards::{Card, DecksSnapshot, Decks, EffectCard, EffectKind, ZoneNameCard};
use crate::config::GameConfig;
use crate::player::{Player, PlayerId, PlayerSnapshot};
use crate::rng::GameRng;
use crate::rules::{
    is_lost_to_corruption, phase_for_actions, Die, GamePhase, BOARD_HEIGHT, BOARD_WIDTH,
    EFFECT_DECK_SIZE, ESCAPE_FLOOR, ESCAPE_ITEMS_REQUIRED, EXPERIMENT_REPORTS_REQUIRED,
    MOVEMENT_DIE, PLAYER_ORDER_DIE, STARTING_HAND_SIZE,
};

pub const ESCAPE_EXIT_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Waiting,
    PawnPlacement,
    Playing,
    Paused,
    Finished,
}

/// How a finished session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    Escape { player_id: PlayerId },
    Research { player_id: PlayerId },
    Purification,
    CorruptionOverrun,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LobbyError {
    #[error("game is full")]
    GameFull,
    #[error("game has already started")]
    AlreadyStarted,
    #[error("not enough players to start")]
    TooFewPlayers,
    #[error("player is already in the game")]
    AlreadyJoined,
    #[error("player is not in the game")]
    UnknownPlayer,
    #[error("operation is not valid in the current state")]
    WrongState,
}

/// One entry in the session event log, shown to spectators and replays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub kind: String,
    pub message: String,
    pub actor: Option<PlayerId>,
    pub turn: u32,
    pub round: u32,
    pub phase: GamePhase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: String,
    pub state: GameState,
    pub phase: GamePhase,
    pub round: u32,
    pub turn_number: u32,
    pub total_actions: u32,
    pub current_player: Option<PlayerId>,
    pub players: Vec<PlayerSnapshot>,
    pub board: crate::board::BoardSnapshot,
    pub decks: DecksSnapshot,
    pub dice_results: HashMap<PlayerId, u8>,
    pub active_anomalies: Vec<String>,
    pub recent_events: Vec<GameEvent>,
    pub outcome: Option<GameOutcome>,
}

#[derive(Debug)]
pub struct Game {
    pub id: String,
    pub players: Vec<Player>,
    pub board: Board,
    pub decks: Decks,
    pub rng: GameRng,
    pub config: GameConfig,
    pub dice_results: HashMap<PlayerId, u8>,
    state: GameState,
    resume_state: Option<GameState>,
    phase: GamePhase,
    current_turn_index: usize,
    round: u32,
    turn_number: u32,
    total_actions: u32,
    anomaly_seen: bool,
    active_anomalies: Vec<EffectCard>,
    revealed_zone_cards: Vec<ZoneNameCard>,
    exits_revealed: bool,
    outcome: Option<GameOutcome>,
    events: Vec<GameEvent>,
}

impl Game {
    pub fn new(id: String, config: GameConfig) -> Self {
        Self::with_rng(id, config, GameRng::new())
    }

    /// Seeded constructor; session setup (initial tile, deck shuffles) is
    /// fully determined by the rng.
    pub fn with_rng(id: String, config: GameConfig, mut rng: GameRng) -> Self {
        let board = Board::new(&mut rng);
        let decks = Decks::starting(&mut rng);
        Self {
            id,
            players: Vec::new(),
            board,
            decks,
            rng,
            config,
            dice_results: HashMap::new(),
            state: GameState::Waiting,
            resume_state: None,
            phase: GamePhase::Exploration,
            current_turn_index: 0,
            round: 0,
            turn_number: 0,
            total_actions: 0,
            anomaly_seen: false,
            active_anomalies: Vec::new(),
            revealed_zone_cards: Vec::new(),
            exits_revealed: false,
            outcome: None,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    pub fn total_actions(&self) -> u32 {
        self.total_actions
    }

    pub fn outcome(&self) -> Option<&GameOutcome> {
        self.outcome.as_ref()
    }

    pub fn anomaly_seen(&self) -> bool {
        self.anomaly_seen
    }

    pub fn active_anomalies(&self) -> &[EffectCard] {
        &self.active_anomalies
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Mutable access to two distinct players at once.
    pub fn player_pair_mut(&mut self, a: &str, b: &str) -> Option<(&mut Player, &mut Player)> {
        if a == b {
            return None;
        }
        let ia = self.players.iter().position(|p| p.id == a)?;
        let ib = self.players.iter().position(|p| p.id == b)?;
        if ia < ib {
            let (left, right) = self.players.split_at_mut(ib);
            Some((&mut left[ia], &mut right[0]))
        } else {
            let (left, right) = self.players.split_at_mut(ia);
            Some((&mut right[0], &mut left[ib]))
        }
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_turn_index)
    }

    pub fn is_player_turn(&self, id: &str) -> bool {
        self.current_player().is_some_and(|p| p.id == id)
    }

    pub fn pawn_at(&self, position: &Position) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.position == Some(*position))
    }

    // ---- Lobby ----

    /// Adds a player while the lobby is open; the first joiner hosts.
    pub fn add_player(&mut self, id: PlayerId, name: String) -> Result<u8, LobbyError> {
        if self.state != GameState::Waiting {
            return Err(LobbyError::AlreadyStarted);
        }
        if self.players.iter().any(|p| p.id == id) {
            return Err(LobbyError::AlreadyJoined);
        }
        if self.players.len() >= self.config.max_players {
            return Err(LobbyError::GameFull);
        }
        let number = self.players.len() as u8 + 1;
        let is_host = self.players.is_empty();
        info!("{} joined game {} as player {}", name, self.id, number);
        self.players.push(Player::new(id, name, number, is_host));
        Ok(number)
    }

    /// Removes a player in any state. An emptied started game finishes as
    /// abandoned; the host role and the turn pointer move on as needed.
    pub fn remove_player(&mut self, id: &str) -> Result<(), LobbyError> {
        let index = self
            .players
            .iter()
            .position(|p| p.id == id)
            .ok_or(LobbyError::UnknownPlayer)?;
        let removed = self.players.remove(index);
        info!("{} left game {}", removed.name, self.id);
        let _ = self.dice_results.remove(&removed.id);

        if self.players.is_empty() {
            if self.state != GameState::Waiting {
                self.outcome = Some(GameOutcome::Abandoned);
            }
            self.state = GameState::Finished;
            return Ok(());
        }
        if removed.is_host {
            self.players[0].is_host = true;
        }
        if self.state == GameState::Playing || self.state == GameState::PawnPlacement {
            if index < self.current_turn_index {
                self.current_turn_index -= 1;
            } else if index == self.current_turn_index {
                self.current_turn_index %= self.players.len();
                if self.state == GameState::Playing {
                    self.start_next_turn();
                }
            }
        }
        Ok(())
    }

    /// A game is startable while it is still waiting and has enough players.
    pub fn can_start(&self) -> bool {
        self.state == GameState::Waiting && self.players.len() >= self.config.min_players
    }

    /// Rolls turn order (highest first, join order breaks ties), deals the
    /// starting hands and opens pawn placement.
    pub fn start_game(&mut self) -> Result<(), LobbyError> {
        if self.state != GameState::Waiting {
            return Err(LobbyError::AlreadyStarted);
        }
        if self.players.len() < self.config.min_players {
            return Err(LobbyError::TooFewPlayers);
        }

        for player in &mut self.players {
            let roll = self.rng.roll(PLAYER_ORDER_DIE);
            let _ = self.dice_results.insert(player.id.clone(), roll);
        }
        let rolls = self.dice_results.clone();
        self.players.sort_by(|a, b| {
            let ra = rolls.get(&a.id).copied().unwrap_or(0);
            let rb = rolls.get(&b.id).copied().unwrap_or(0);
            rb.cmp(&ra).then(a.number.cmp(&b.number))
        });

        for index in 0..self.players.len() {
            self.deal_starting_hand(index);
        }

        self.state = GameState::PawnPlacement;
        self.current_turn_index = 0;
        let order: Vec<&str> = self.players.iter().map(|p| p.name.as_str()).collect();
        info!("game {} started, turn order: {:?}", self.id, order);
        self.log_event("game_started", None, format!("turn order: {}", order.join(", ")));
        Ok(())
    }

    /// Anomalies never start in a hand; a drawn one goes to the discard
    /// pile and the draw is retried.
    fn deal_starting_hand(&mut self, index: usize) {
        let mut dealt = 0;
        let mut attempts = 0;
        while dealt < STARTING_HAND_SIZE && attempts < EFFECT_DECK_SIZE {
            attempts += 1;
            let Some(card) = self.decks.effect.draw(&mut self.rng) else {
                break;
            };
            match card {
                Card::Effect(effect) if effect.kind != EffectKind::Anomaly => {
                    if self.players[index].inventory.add_to_hand(effect).is_ok() {
                        dealt += 1;
                    }
                }
                other => self.decks.effect.discard(other),
            }
        }
    }

    // ---- Setup ----

    /// Called by the action pipeline once a pawn lands; hands the placement
    /// turn to the next unplaced player, or opens the playing state when
    /// everyone stands on the board.
    pub fn finish_pawn_placement(&mut self) {
        if let Some(next) = self.players.iter().position(|p| p.position.is_none()) {
            self.current_turn_index = next;
            return;
        }
        self.state = GameState::Playing;
        self.current_turn_index = 0;
        self.round = 1;
        self.turn_number = 1;
        self.log_event("playing", None, "all pawns placed, exploration begins".to_string());
        self.start_next_turn();
    }

    // ---- Turn flow ----

    /// Rolls the movement budget for the player whose turn begins.
    pub fn start_next_turn(&mut self) {
        if self.state != GameState::Playing {
            return;
        }
        let roll = self.rng.roll(MOVEMENT_DIE);
        if let Some(player) = self.players.get_mut(self.current_turn_index) {
            player.start_turn();
            player.set_movement_points(u32::from(roll));
            let id = player.id.clone();
            let name = player.name.clone();
            let _ = self.dice_results.insert(id.clone(), roll);
            info!("{} begins turn {} with {} movement", name, self.turn_number, roll);
            self.log_event("turn_started", Some(id), format!("rolled {} movement", roll));
        }
    }

    /// Ends the current turn and hands play to the next pawn; a completed
    /// rotation closes the round.
    pub fn advance_turn(&mut self) {
        if self.state != GameState::Playing {
            return;
        }
        if let Some(player) = self.players.get_mut(self.current_turn_index) {
            player.end_turn();
        }
        self.turn_number += 1;
        self.current_turn_index += 1;
        if self.current_turn_index >= self.players.len() {
            self.current_turn_index = 0;
            self.end_round();
        }
        if self.state == GameState::Playing {
            self.start_next_turn();
        }
    }

    /// Timeout path: the server ends an unresponsive player's turn.
    pub fn force_end_turn(&mut self, id: &str) -> bool {
        if self.state != GameState::Playing || !self.is_player_turn(id) {
            return false;
        }
        self.log_event("turn_timeout", Some(id.to_string()), "turn ended by timeout".to_string());
        self.advance_turn();
        true
    }

    /// Corruption spreads between rounds, twice as fast once the end game
    /// has begun.
    fn end_round(&mut self) {
        self.round += 1;
        // Corruption stays dormant until the Mutation phase is crossed, even
        // when an event has already corrupted a tile during Exploration.
        if self.phase >= GamePhase::Mutation {
            let rate = if self.phase == GamePhase::EndGame {
                self.config.corruption_spread_rate * 2.0
            } else {
                self.config.corruption_spread_rate
            };
            let spread = self.board.spread_corruption(rate, &mut self.rng);
            if !spread.is_empty() {
                self.log_event(
                    "corruption_spread",
                    None,
                    format!("{} tiles fell to corruption", spread.len()),
                );
            }
        }
        let _ = self.check_end_conditions();
    }

    /// Bookkeeping after every successful action: the global action count
    /// drives phase progression, and end conditions are re-checked so a
    /// winning or losing move resolves immediately.
    pub fn record_completed_action(&mut self, actor: &str, action_name: &str) {
        self.total_actions += 1;
        if let Some(player) = self.player_mut(actor) {
            player.stats.actions_taken += 1;
        }
        self.log_event("action", Some(actor.to_string()), action_name.to_string());
        self.check_phase_progression();
        let _ = self.check_end_conditions();
    }

    fn check_phase_progression(&mut self) {
        let next = phase_for_actions(
            self.total_actions,
            self.config.mutation_action_threshold,
            self.config.end_game_action_threshold,
        );
        if next == self.phase {
            return;
        }
        self.phase = next;
        info!("game {} entered {:?}", self.id, next);
        match next {
            GamePhase::Mutation => {
                // The first corrupted tile seeds the spread.
                if let Some(id) = self.board.corrupt_random_tile(&mut self.rng) {
                    self.log_event(
                        "phase_changed",
                        None,
                        format!("mutation begins, tile {} is corrupted", id),
                    );
                } else {
                    self.log_event("phase_changed", None, "mutation begins".to_string());
                }
            }
            GamePhase::EndGame => {
                self.log_event("phase_changed", None, "the end game begins".to_string());
                self.reveal_escape_exits();
            }
            GamePhase::Exploration => {}
        }
    }

    /// Marks two random top-floor slots as escape exits, synthesizing an
    /// emergency-door tile wherever the slot is still empty.
    pub fn reveal_escape_exits(&mut self) {
        if self.exits_revealed {
            return;
        }
        self.exits_revealed = true;

        let mut slots: Vec<TilePosition> = (0..BOARD_WIDTH)
            .flat_map(|x| (0..BOARD_HEIGHT).map(move |y| TilePosition { x, y, floor: ESCAPE_FLOOR }))
            .collect();
        self.rng.shuffle(&mut slots);
        for slot in slots.into_iter().take(ESCAPE_EXIT_COUNT) {
            if self.board.tile_at(slot).is_none() {
                let id = self.board.next_synthetic_id();
                let mut layout = [[SpecialSquare::Normal; 4]; 4];
                layout[1][1] = SpecialSquare::EmergencyDoor;
                let tile = PathTile::new(id, PathTileType::Basic, slot, layout, 0);
                let _ = self.board.place_seed_tile(tile, &mut self.rng);
            }
            self.board.add_escape_exit(slot);
            self.log_event(
                "exit_revealed",
                None,
                format!("an exit opened at ({},{}) on floor {}", slot.x, slot.y, slot.floor),
            );
        }
    }

    // ---- End conditions ----

    /// Defeat is checked before victory: a session that crosses the
    /// corruption limit is lost even if a winning move landed the same
    /// action.
    pub fn check_end_conditions(&mut self) -> Option<GameOutcome> {
        if self.state == GameState::Finished {
            return self.outcome.clone();
        }
        if is_lost_to_corruption(self.board.corruption_percentage()) {
            return Some(self.finish(GameOutcome::CorruptionOverrun));
        }
        for index in 0..self.players.len() {
            let player = &self.players[index];
            let on_exit = player.floor == ESCAPE_FLOOR
                && player
                    .position
                    .is_some_and(|pos| self.board.is_escape_exit(pos.tile_position()));
            if on_exit && player.escape_item_count() >= ESCAPE_ITEMS_REQUIRED {
                let id = player.id.clone();
                return Some(self.finish(GameOutcome::Escape { player_id: id }));
            }
            if player.experiment_reports >= EXPERIMENT_REPORTS_REQUIRED {
                let id = player.id.clone();
                return Some(self.finish(GameOutcome::Research { player_id: id }));
            }
        }
        if self.anomaly_seen && self.active_anomalies.is_empty() {
            return Some(self.finish(GameOutcome::Purification));
        }
        None
    }

    fn finish(&mut self, outcome: GameOutcome) -> GameOutcome {
        info!("game {} finished: {:?}", self.id, outcome);
        self.state = GameState::Finished;
        self.outcome = Some(outcome.clone());
        self.log_event("game_finished", None, format!("{:?}", outcome));
        outcome
    }

    // ---- Anomalies ----

    /// An anomaly card activates the moment it is drawn; it stays in play
    /// until purified.
    pub fn activate_anomaly(&mut self, card: EffectCard) {
        self.anomaly_seen = true;
        info!("anomaly activated: {}", card.name);
        self.log_event("anomaly", None, format!("{} manifests", card.name));
        self.active_anomalies.push(card);
    }

    /// Removes the oldest active anomaly and discards its card. The caller
    /// re-checks end conditions afterwards.
    pub fn purify_anomaly(&mut self) -> Option<String> {
        if self.active_anomalies.is_empty() {
            return None;
        }
        let card = self.active_anomalies.remove(0);
        let name = card.name.clone();
        self.decks.effect.discard(Card::Effect(card));
        self.log_event("anomaly_purified", None, format!("{} was purified", name));
        Some(name)
    }

    // ---- Zone names ----

    /// Draws the next zone-name card for an unnamed zone. A draw that
    /// duplicates an already-revealed name sends every revealed card back
    /// into the deck and clears the assignments before drawing fresh.
    pub fn reveal_zone_name(&mut self, zone: char) -> Option<String> {
        if let Some(name) = self.board.zone_name(zone) {
            return Some(name.to_string());
        }
        let card = match self.decks.zone_name.draw(&mut self.rng)? {
            Card::ZoneName(card) => card,
            other => {
                self.decks.zone_name.discard(other);
                return None;
            }
        };
        if self.board.zone_name_assigned(&card.name) {
            let _ = self.board.take_zone_names();
            for revealed in self.revealed_zone_cards.drain(..) {
                self.decks.zone_name.discard(Card::ZoneName(revealed));
            }
            self.decks.zone_name.discard(Card::ZoneName(card));
            let card = match self.decks.zone_name.draw(&mut self.rng)? {
                Card::ZoneName(card) => card,
                other => {
                    self.decks.zone_name.discard(other);
                    return None;
                }
            };
            return Some(self.assign_zone_card(zone, card));
        }
        Some(self.assign_zone_card(zone, card))
    }

    fn assign_zone_card(&mut self, zone: char, card: ZoneNameCard) -> String {
        let name = card.name.clone();
        self.board.set_zone_name(zone, name.clone());
        self.revealed_zone_cards.push(card);
        self.log_event("zone_revealed", None, format!("zone {} is the {}", zone, name));
        name
    }

    // ---- Pause ----

    pub fn pause(&mut self) -> Result<(), LobbyError> {
        match self.state {
            GameState::Playing | GameState::PawnPlacement => {
                self.resume_state = Some(self.state);
                self.state = GameState::Paused;
                self.log_event("paused", None, "game paused".to_string());
                Ok(())
            }
            _ => Err(LobbyError::WrongState),
        }
    }

    pub fn resume(&mut self) -> Result<(), LobbyError> {
        if self.state != GameState::Paused {
            return Err(LobbyError::WrongState);
        }
        self.state = self.resume_state.take().unwrap_or(GameState::Playing);
        self.log_event("resumed", None, "game resumed".to_string());
        Ok(())
    }

    // ---- Queries ----

    pub fn roll_die_for(&mut self, id: &str, die: Die) -> u8 {
        let roll = self.rng.roll(die);
        let _ = self.dice_results.insert(id.to_string(), roll);
        roll
    }

    /// Action names the given player could plausibly submit right now.
    /// Advisory only; the pipeline re-validates everything.
    pub fn valid_actions(&self, id: &str) -> Vec<&'static str> {
        let Some(player) = self.player(id) else {
            return Vec::new();
        };
        match self.state {
            GameState::PawnPlacement => {
                if self.is_player_turn(id) && player.position.is_none() {
                    return vec!["place_pawn"];
                }
                return Vec::new();
            }
            GameState::Playing => {}
            _ => return Vec::new(),
        }
        if !self.is_player_turn(id) {
            return Vec::new();
        }

        let mut actions = vec!["pass", "end_turn"];
        if player.remaining_movement() > 0 {
            actions.push("move");
            actions.push("explore");
        }
        if player.disorder >= crate::rules::DISORDER_FALL_THRESHOLD
            && player.floor > crate::rules::FLOOR_MIN
        {
            actions.push("fall");
        }
        if let Some(position) = player.position {
            if let Some(tile) = self.board.tile_at_position(&position) {
                match tile.square(position.local()) {
                    SpecialSquare::Stairwell => actions.push("use_stairs"),
                    SpecialSquare::ElevatorRoom => actions.push("use_elevator"),
                    _ => {}
                }
            }
            let tile_pos = position.tile_position();
            let has_company = self.players.iter().any(|other| {
                other.id != id
                    && other
                        .position
                        .is_some_and(|p| p.tile_position() == tile_pos)
            });
            if has_company {
                actions.push("meet");
                actions.push("rob");
            }
        }
        if !player.inventory.items.is_empty() || !player.inventory.hand.is_empty() {
            actions.push("use_item");
        }
        actions
    }

    pub fn log_event(&mut self, kind: &str, actor: Option<PlayerId>, message: String) {
        self.events.push(GameEvent {
            kind: kind.to_string(),
            message,
            actor,
            turn: self.turn_number,
            round: self.round,
            phase: self.phase,
        });
    }

    pub fn recent_events(&self, count: usize) -> &[GameEvent] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            id: self.id.clone(),
            state: self.state,
            phase: self.phase,
            round: self.round,
            turn_number: self.turn_number,
            total_actions: self.total_actions,
            current_player: self.current_player().map(|p| p.id.clone()),
            players: self.players.iter().map(PlayerSnapshot::of).collect(),
            board: self.board.snapshot(),
            decks: self.decks.snapshot(),
            dice_results: self.dice_results.clone(),
            active_anomalies: self
                .active_anomalies
                .iter()
                .map(|card| card.name.clone())
                .collect(),
            recent_events: self.recent_events(10).to_vec(),
            outcome: self.outcome.clone(),
        }
    }
}
