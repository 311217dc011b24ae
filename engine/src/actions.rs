//! The action pipeline: every state change a player can request goes
//! through [`execute_action`], which admits, validates and commits in that
//! order. Validation never mutates; a failed action leaves the session
//! exactly as it was.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{PathTile, PathTileType, Position, SpecialSquare, TilePosition};
use crate::cards::{Card, CardEffect, EffectCard, EffectKind, PathTileCard};
use crate::game::{Game, GameState};
use crate::player::{ActiveEffect, InteractionError, PlayerId};
use crate::rules::{
    can_explore, GamePhase, DISORDER_FALL_THRESHOLD, ESCAPE_ITEMS_REQUIRED, FLOOR_MAX, FLOOR_MIN,
};

/// Lingering item effects last this many turns by default.
const EFFECT_DURATION_TURNS: u32 = 3;

/// Tiles a new path tile may be attached to, scanned in this order when the
/// explorer does not name a slot.
const EXPLORE_SCAN: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    PlacePawn { target: Position },
    Move { target: Position },
    Explore { placement: Option<TilePosition> },
    Fall,
    Meet { target: PlayerId },
    Rob { target: PlayerId },
    UseStairs { target_floor: u8 },
    UseElevator { target_floor: Option<u8>, target_zone: Option<char> },
    UseItem { item_id: u32 },
    Pass,
    EndTurn,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::PlacePawn { .. } => "place_pawn",
            Action::Move { .. } => "move",
            Action::Explore { .. } => "explore",
            Action::Fall => "fall",
            Action::Meet { .. } => "meet",
            Action::Rob { .. } => "rob",
            Action::UseStairs { .. } => "use_stairs",
            Action::UseElevator { .. } => "use_elevator",
            Action::UseItem { .. } => "use_item",
            Action::Pass => "pass",
            Action::EndTurn => "end_turn",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("player is not in the game")]
    PlayerNotFound,
    #[error("target player is not in the game")]
    TargetNotFound,
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("action is not valid while the game is {0:?}")]
    WrongState(GameState),
    #[error("disorder is too high to explore")]
    DisorderTooHigh,
    #[error("disorder is too low to fall")]
    DisorderTooLow,
    #[error("no movement points remaining")]
    NoMovementPoints,
    #[error("move needs {needed} points but only {available} remain")]
    InsufficientMovement { needed: u32, available: u32 },
    #[error("already at the target position")]
    AlreadyAtTarget,
    #[error("target position cannot be entered")]
    TargetNotMovable,
    #[error("no path to the target position")]
    NoPath,
    #[error("moves cannot cross floors")]
    CrossFloorMove,
    #[error("position is outside the board")]
    InvalidPosition,
    #[error("position is occupied by another pawn")]
    PositionOccupied,
    #[error("no adjacent slot is free for a new tile")]
    NoPlacementSlot,
    #[error("the path tile deck is exhausted")]
    NoTilesRemaining,
    #[error("tile cannot be placed there")]
    PlacementRejected,
    #[error("pawn is not on a stairwell")]
    NotOnStairwell,
    #[error("pawn is not in an elevator room")]
    NotOnElevator,
    #[error("target floor is out of reach")]
    InvalidFloor,
    #[error("the elevator malfunctions and goes nowhere")]
    ElevatorMalfunction,
    #[error("the button goes to floor {0}")]
    ButtonRejectsFloor(u8),
    #[error("the button goes to zone {0}")]
    ButtonRejectsZone(char),
    #[error("no elevator buttons remain")]
    NoButtonsRemaining,
    #[error("item is not in the inventory")]
    ItemNotFound,
    #[error("pawn has already been placed")]
    PawnAlreadyPlaced,
    #[error("pawns start on the entry hall tile")]
    NotOnInitialTile,
    #[error(transparent)]
    Interaction(#[from] InteractionError),
}

/// What a successful action changed, for the caller to relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionData {
    PawnPlaced { position: Position },
    Moved { position: Position, cost: u32, remaining: u32 },
    TilePlaced {
        tile_id: u32,
        tile_type: PathTileType,
        position: TilePosition,
        landed: Position,
    },
    Fell { floor: u8 },
    Met { target: PlayerId },
    Robbed { target: PlayerId, card_name: String },
    UsedStairs { floor: u8 },
    UsedElevator { floor: u8, zone: char },
    ItemUsed { name: String },
    Passed,
    TurnEnded { next_player: Option<PlayerId> },
}

/// The uniform reply for every submitted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub reason: Option<String>,
    pub data: Option<ActionData>,
}

impl ActionResult {
    fn ok(data: ActionData) -> Self {
        Self {
            success: true,
            reason: None,
            data: Some(data),
        }
    }

    fn fail(error: ActionError) -> Self {
        Self {
            success: false,
            reason: Some(error.to_string()),
            data: None,
        }
    }
}

/// Admits, validates and commits one action for one player. Successful
/// actions advance the global action count, which in turn drives phase
/// progression and the end-condition check.
pub fn execute_action(game: &mut Game, actor: &str, action: &Action) -> ActionResult {
    match dispatch(game, actor, action) {
        Ok(data) => {
            game.record_completed_action(actor, action.name());
            ActionResult::ok(data)
        }
        Err(error) => {
            warn!("{}: {} rejected: {}", actor, action.name(), error);
            ActionResult::fail(error)
        }
    }
}

fn dispatch(game: &mut Game, actor: &str, action: &Action) -> Result<ActionData, ActionError> {
    if game.player(actor).is_none() {
        return Err(ActionError::PlayerNotFound);
    }
    let expected = match action {
        Action::PlacePawn { .. } => GameState::PawnPlacement,
        _ => GameState::Playing,
    };
    if game.state() != expected {
        return Err(ActionError::WrongState(game.state()));
    }
    if !game.is_player_turn(actor) {
        return Err(ActionError::NotYourTurn);
    }

    match action {
        Action::PlacePawn { target } => place_pawn(game, actor, *target),
        Action::Move { target } => move_pawn(game, actor, *target),
        Action::Explore { placement } => explore(game, actor, *placement),
        Action::Fall => fall(game, actor),
        Action::Meet { target } => meet(game, actor, target),
        Action::Rob { target } => rob(game, actor, target),
        Action::UseStairs { target_floor } => use_stairs(game, actor, *target_floor),
        Action::UseElevator { target_floor, target_zone } => {
            use_elevator(game, actor, *target_floor, *target_zone)
        }
        Action::UseItem { item_id } => use_item(game, actor, *item_id),
        Action::Pass => Ok(ActionData::Passed),
        Action::EndTurn => {
            game.advance_turn();
            Ok(ActionData::TurnEnded {
                next_player: game.current_player().map(|p| p.id.clone()),
            })
        }
    }
}

fn place_pawn(game: &mut Game, actor: &str, target: Position) -> Result<ActionData, ActionError> {
    let player = game.player(actor).ok_or(ActionError::PlayerNotFound)?;
    if player.position.is_some() {
        return Err(ActionError::PawnAlreadyPlaced);
    }
    let tile = game
        .board
        .tile_at_position(&target)
        .ok_or(ActionError::InvalidPosition)?;
    if tile.tile_type != PathTileType::Initial {
        return Err(ActionError::NotOnInitialTile);
    }
    if !tile.is_local_movable(target.local()) {
        return Err(ActionError::TargetNotMovable);
    }
    if game.pawn_at(&target).is_some() {
        return Err(ActionError::PositionOccupied);
    }

    let player = game.player_mut(actor).ok_or(ActionError::PlayerNotFound)?;
    player.position = Some(target);
    player.floor = target.floor;
    info!("{} placed their pawn at {:?}", actor, target);
    game.finish_pawn_placement();
    Ok(ActionData::PawnPlaced { position: target })
}

fn move_pawn(game: &mut Game, actor: &str, target: Position) -> Result<ActionData, ActionError> {
    let player = game.player(actor).ok_or(ActionError::PlayerNotFound)?;
    let current = player.position.ok_or(ActionError::InvalidPosition)?;
    let disorder = player.disorder;
    let available = player.remaining_movement();

    if target.floor != current.floor {
        return Err(ActionError::CrossFloorMove);
    }
    if target == current {
        return Err(ActionError::AlreadyAtTarget);
    }
    if !game.board.can_enter(&target, disorder) {
        return Err(ActionError::TargetNotMovable);
    }
    if game.pawn_at(&target).is_some() {
        return Err(ActionError::PositionOccupied);
    }
    if available == 0 {
        return Err(ActionError::NoMovementPoints);
    }
    // Reachability comes from the pathfinder, but the charge is Manhattan
    // distance in absolute coordinates, so diagonals cost two.
    let _ = game
        .board
        .find_path(&current, &target, disorder)
        .ok_or(ActionError::NoPath)?;
    let cost = current.manhattan(&target);
    if cost > available {
        return Err(ActionError::InsufficientMovement {
            needed: cost,
            available,
        });
    }

    let player = game.player_mut(actor).ok_or(ActionError::PlayerNotFound)?;
    let _ = player.use_movement(cost);
    player.position = Some(target);
    let remaining = player.remaining_movement();
    resolve_square_entry(game, actor, &target);
    Ok(ActionData::Moved {
        position: target,
        cost,
        remaining,
    })
}

fn explore(
    game: &mut Game,
    actor: &str,
    placement: Option<TilePosition>,
) -> Result<ActionData, ActionError> {
    let player = game.player(actor).ok_or(ActionError::PlayerNotFound)?;
    let current = player.position.ok_or(ActionError::InvalidPosition)?;
    if !can_explore(player.disorder) {
        return Err(ActionError::DisorderTooHigh);
    }
    if player.remaining_movement() == 0 {
        return Err(ActionError::NoMovementPoints);
    }

    let here = current.tile_position();
    let slot = match placement {
        Some(slot) => {
            let adjacent = slot.floor == here.floor
                && (slot.x - here.x).abs() + (slot.y - here.y).abs() == 1;
            if !adjacent {
                return Err(ActionError::InvalidPosition);
            }
            if game.board.tile_at(slot).is_some() {
                return Err(ActionError::PlacementRejected);
            }
            slot
        }
        None => EXPLORE_SCAN
            .iter()
            .filter_map(|(dx, dy)| TilePosition::new(here.x + dx, here.y + dy, here.floor))
            .find(|candidate| game.board.tile_at(*candidate).is_none())
            .ok_or(ActionError::NoPlacementSlot)?,
    };

    let card = match game.decks.path.draw(&mut game.rng) {
        Some(Card::PathTile(card)) => card,
        Some(other) => {
            // A foreign card in the path deck is a construction bug; put it
            // aside rather than lose it.
            game.decks.path.discard(other);
            return Err(ActionError::NoTilesRemaining);
        }
        None => return Err(ActionError::NoTilesRemaining),
    };
    let tile = tile_from_card(&card, slot);
    let tile_id = tile.id;
    let tile_type = tile.tile_type;
    if !game.board.place_tile(tile, &mut game.rng) {
        game.decks.path.return_to_top(Card::PathTile(card));
        return Err(ActionError::PlacementRejected);
    }

    if tile_type == PathTileType::Disordered {
        if let Some(player) = game.player_mut(actor) {
            let _ = player.update_disorder(1, "entered a warped corridor");
        }
    }

    // Stepping onto the new tile is part of the explore and costs one point.
    let entrance = game
        .board
        .tile_at(slot)
        .map(|tile| tile.entrance_points())
        .unwrap_or_default();
    let landed = entrance
        .iter()
        .filter_map(|local| Position::from_parts(slot, *local))
        .find(|candidate| game.pawn_at(candidate).is_none())
        .unwrap_or(current);
    let player = game.player_mut(actor).ok_or(ActionError::PlayerNotFound)?;
    let _ = player.use_movement(1);
    player.position = Some(landed);
    player.stats.tiles_explored += 1;
    if landed != current {
        resolve_square_entry(game, actor, &landed);
    }

    info!("{} explored {:?} onto tile {}", actor, slot, tile_id);
    Ok(ActionData::TilePlaced {
        tile_id,
        tile_type,
        position: slot,
        landed,
    })
}

fn fall(game: &mut Game, actor: &str) -> Result<ActionData, ActionError> {
    let player = game.player(actor).ok_or(ActionError::PlayerNotFound)?;
    if player.disorder < DISORDER_FALL_THRESHOLD {
        return Err(ActionError::DisorderTooLow);
    }
    let player = game.player_mut(actor).ok_or(ActionError::PlayerNotFound)?;
    let floor = player.perform_fall()?;
    let landing = player
        .position
        .map(|p| p.tile_position())
        .ok_or(ActionError::InvalidPosition)?;
    ensure_landing_tile(game, landing);
    settle_pawn(game, actor, landing);
    info!("{} fell to floor {}", actor, floor);
    Ok(ActionData::Fell { floor })
}

fn meet(game: &mut Game, actor: &str, target: &str) -> Result<ActionData, ActionError> {
    if game.player(target).is_none() {
        return Err(ActionError::TargetNotFound);
    }
    let (player, other) = game
        .player_pair_mut(actor, target)
        .ok_or(ActionError::TargetNotFound)?;
    player.meet(other)?;
    Ok(ActionData::Met {
        target: target.to_string(),
    })
}

fn rob(game: &mut Game, actor: &str, target: &str) -> Result<ActionData, ActionError> {
    if game.player(target).is_none() {
        return Err(ActionError::TargetNotFound);
    }
    // The theft needs the rng and both players at once, so the roster is
    // taken out of the session for the duration.
    let mut players = std::mem::take(&mut game.players);
    let result = rob_within(&mut players, game, actor, target);
    game.players = players;
    let card = result?;
    Ok(ActionData::Robbed {
        target: target.to_string(),
        card_name: card.name,
    })
}

fn rob_within(
    players: &mut [crate::player::Player],
    game: &mut Game,
    actor: &str,
    target: &str,
) -> Result<EffectCard, ActionError> {
    let ia = players
        .iter()
        .position(|p| p.id == actor)
        .ok_or(ActionError::PlayerNotFound)?;
    let ib = players
        .iter()
        .position(|p| p.id == target)
        .ok_or(ActionError::TargetNotFound)?;
    let (thief, victim) = if ia < ib {
        let (left, right) = players.split_at_mut(ib);
        (&mut left[ia], &mut right[0])
    } else {
        let (left, right) = players.split_at_mut(ia);
        (&mut right[0], &mut left[ib])
    };
    Ok(thief.rob(victim, &mut game.rng)?)
}

fn use_stairs(game: &mut Game, actor: &str, target_floor: u8) -> Result<ActionData, ActionError> {
    let player = game.player(actor).ok_or(ActionError::PlayerNotFound)?;
    let current = player.position.ok_or(ActionError::InvalidPosition)?;
    let tile = game
        .board
        .tile_at_position(&current)
        .ok_or(ActionError::InvalidPosition)?;
    if tile.square(current.local()) != SpecialSquare::Stairwell {
        return Err(ActionError::NotOnStairwell);
    }
    if !(FLOOR_MIN..=FLOOR_MAX).contains(&target_floor)
        || current.floor.abs_diff(target_floor) != 1
    {
        return Err(ActionError::InvalidFloor);
    }

    // Stairwells collapse behind their user.
    let here = current.tile_position();
    let _ = game.board.remove_tile(here);
    let landing = TilePosition {
        x: here.x,
        y: here.y,
        floor: target_floor,
    };
    ensure_landing_tile(game, landing);

    let player = game.player_mut(actor).ok_or(ActionError::PlayerNotFound)?;
    player.floor = target_floor;
    player.stats.floors_visited += 1;
    settle_pawn(game, actor, landing);
    info!("{} took the stairs to floor {}", actor, target_floor);
    Ok(ActionData::UsedStairs { floor: target_floor })
}

fn use_elevator(
    game: &mut Game,
    actor: &str,
    target_floor: Option<u8>,
    target_zone: Option<char>,
) -> Result<ActionData, ActionError> {
    let player = game.player(actor).ok_or(ActionError::PlayerNotFound)?;
    let current = player.position.ok_or(ActionError::InvalidPosition)?;
    let tile = game
        .board
        .tile_at_position(&current)
        .ok_or(ActionError::InvalidPosition)?;
    if tile.square(current.local()) != SpecialSquare::ElevatorRoom {
        return Err(ActionError::NotOnElevator);
    }
    if let Some(floor) = target_floor {
        if !(FLOOR_MIN..=FLOOR_MAX).contains(&floor) {
            return Err(ActionError::InvalidFloor);
        }
    }

    // The button decides where the car actually goes; pressing it consumes
    // the card even when the ride is refused.
    let button = match game.decks.button.draw(&mut game.rng) {
        Some(Card::Button(button)) => button,
        Some(other) => {
            game.decks.button.discard(other);
            return Err(ActionError::NoButtonsRemaining);
        }
        None => return Err(ActionError::NoButtonsRemaining),
    };
    let destination_floor = button.floor;
    let destination_zone = button.zone;
    game.decks.button.discard(Card::Button(button));

    if let Some(wanted) = target_floor {
        if wanted != destination_floor {
            return Err(ActionError::ButtonRejectsFloor(destination_floor));
        }
    }
    if let Some(wanted) = target_zone {
        if wanted != destination_zone {
            return Err(ActionError::ButtonRejectsZone(destination_zone));
        }
    }
    let malfunction_applies = game.phase() >= GamePhase::Mutation;
    if malfunction_applies && game.rng.chance(game.config.elevator_malfunction_chance) {
        return Err(ActionError::ElevatorMalfunction);
    }

    let slot = elevator_destination(game, destination_floor, destination_zone);
    ensure_landing_tile(game, slot);
    let player = game.player_mut(actor).ok_or(ActionError::PlayerNotFound)?;
    if player.floor != destination_floor {
        player.stats.floors_visited += 1;
    }
    player.floor = destination_floor;
    settle_pawn(game, actor, slot);
    info!(
        "{} rode the elevator to floor {} zone {}",
        actor, destination_floor, destination_zone
    );
    Ok(ActionData::UsedElevator {
        floor: destination_floor,
        zone: destination_zone,
    })
}

fn use_item(game: &mut Game, actor: &str, item_id: u32) -> Result<ActionData, ActionError> {
    let player = game.player_mut(actor).ok_or(ActionError::PlayerNotFound)?;
    let card = player
        .inventory
        .remove_item(item_id)
        .or_else(|| player.inventory.remove_from_hand(item_id))
        .ok_or(ActionError::ItemNotFound)?;
    if card.kind != EffectKind::Item {
        // Only items are played deliberately; put the card back.
        let _ = player.inventory.add_to_hand(card);
        return Err(ActionError::ItemNotFound);
    }
    player.stats.items_used += 1;
    let name = card.name.clone();
    apply_card_effect(game, actor, &card);
    game.decks.effect.discard(Card::Effect(card));
    info!("{} used {}", actor, name);
    Ok(ActionData::ItemUsed { name })
}

/// Applies a card's mechanical payload against the session.
fn apply_card_effect(game: &mut Game, actor: &str, card: &EffectCard) {
    match card.effect {
        CardEffect::Disorder(delta) => {
            if let Some(player) = game.player_mut(actor) {
                let _ = player.update_disorder(delta, &card.name);
            }
        }
        CardEffect::DisorderAll(delta) => {
            let name = card.name.clone();
            for player in &mut game.players {
                let _ = player.update_disorder(delta, &name);
            }
        }
        CardEffect::VisionBonus(strength) => {
            if let Some(player) = game.player_mut(actor) {
                let _ = player.inventory.add_effect(ActiveEffect {
                    name: card.name.clone(),
                    remaining_turns: EFFECT_DURATION_TURNS + u32::from(strength),
                });
            }
        }
        CardEffect::GainReport => {
            if let Some(player) = game.player_mut(actor) {
                player.experiment_reports += 1;
            }
        }
        CardEffect::PurifyAnomaly => {
            let _ = game.purify_anomaly();
        }
        CardEffect::RevealExit => game.reveal_escape_exits(),
        CardEffect::CorruptRandomTile => {
            let _ = game.board.corrupt_random_tile(&mut game.rng);
        }
        CardEffect::RevealZone => {
            let zone = game
                .player(actor)
                .and_then(|p| p.position)
                .and_then(|pos| game.board.zone_at((pos.tile_x, pos.tile_y)));
            if let Some(zone) = zone {
                let _ = game.reveal_zone_name(zone);
            }
        }
        CardEffect::UnlockDoors => {
            if let Some(player) = game.player_mut(actor) {
                let _ = player.inventory.add_effect(ActiveEffect {
                    name: card.name.clone(),
                    remaining_turns: EFFECT_DURATION_TURNS,
                });
            }
        }
        CardEffect::Nothing => {}
    }
}

/// Event and item squares draw from the effect deck when stepped on. The
/// drawn card always ends up somewhere accountable: items go to the hand
/// (or the discard pile when it is full), events resolve and are
/// discarded, anomalies activate and stay in play. Emergency doors report
/// whether the pawn carries enough escape items to leave.
fn resolve_square_entry(game: &mut Game, actor: &str, position: &Position) {
    let square = match game.board.tile_at_position(position) {
        Some(tile) => tile.square(position.local()),
        None => return,
    };
    if square == SpecialSquare::EmergencyDoor {
        let carried = game
            .player(actor)
            .map(|player| player.escape_item_count())
            .unwrap_or(0);
        let (kind, message) = if carried >= ESCAPE_ITEMS_REQUIRED {
            ("escape_available", format!("{} escape items in hand, the door will open", carried))
        } else {
            (
                "escape_blocked",
                format!("{} of {} escape items in hand", carried, ESCAPE_ITEMS_REQUIRED),
            )
        };
        game.log_event(kind, Some(actor.to_string()), message);
        return;
    }
    if !matches!(square, SpecialSquare::EventSquare | SpecialSquare::ItemSquare) {
        return;
    }
    let card = match game.decks.effect.draw(&mut game.rng) {
        Some(Card::Effect(card)) => card,
        Some(other) => {
            game.decks.effect.discard(other);
            return;
        }
        None => return,
    };
    match card.kind {
        EffectKind::Item => {
            let name = card.name.clone();
            let added = game
                .player_mut(actor)
                .map(|player| player.inventory.add_to_hand(card.clone()).is_ok())
                .unwrap_or(false);
            if added {
                info!("{} picked up {}", actor, name);
            } else {
                game.decks.effect.discard(Card::Effect(card));
            }
        }
        EffectKind::Event => {
            info!("{} triggered event {}", actor, card.name);
            apply_card_effect(game, actor, &card);
            game.decks.effect.discard(Card::Effect(card));
        }
        EffectKind::Anomaly => {
            apply_card_effect(game, actor, &card);
            game.activate_anomaly(card);
        }
    }
}

/// The first slot assigned to the button's zone, or the building core when
/// the zone has no slots yet.
fn elevator_destination(game: &Game, floor: u8, zone: char) -> TilePosition {
    let slots = game.board.zone_slots(zone);
    let (x, y) = slots
        .first()
        .copied()
        .unwrap_or(crate::rules::INITIAL_TILE);
    TilePosition { x, y, floor }
}

fn tile_from_card(card: &PathTileCard, slot: TilePosition) -> PathTile {
    PathTile::new(card.id, card.tile_type, slot, card.layout, card.rotation)
}

/// A fall, staircase or elevator ride onto an unexplored slot tries to draw
/// a Basic tile from the path deck for the landing. A non-basic draw goes to
/// the discard pile, an exhausted deck places nothing; the pawn lands either
/// way.
fn ensure_landing_tile(game: &mut Game, slot: TilePosition) {
    if game.board.tile_at(slot).is_some() {
        return;
    }
    match game.decks.path.draw(&mut game.rng) {
        Some(Card::PathTile(card)) if card.tile_type == PathTileType::Basic => {
            let tile = tile_from_card(&card, slot);
            let _ = game.board.place_seed_tile(tile, &mut game.rng);
        }
        Some(card) => game.decks.path.discard(card),
        None => {}
    }
}

/// Puts the pawn on a free entrance cell of the landing tile.
fn settle_pawn(game: &mut Game, actor: &str, slot: TilePosition) {
    let entrance = game
        .board
        .tile_at(slot)
        .map(|tile| tile.entrance_points())
        .unwrap_or_else(|| vec![(1, 1)]);
    let landed = entrance
        .iter()
        .filter_map(|local| Position::from_parts(slot, *local))
        .find(|candidate| game.pawn_at(candidate).is_none())
        .or_else(|| Position::from_parts(slot, entrance[0]));
    if let Some(player) = game.player_mut(actor) {
        player.position = landed;
    }
}
