//! Per-player state: pawn, disorder, movement budget, inventory and the
//! direct player-to-player interactions (meet, rob, fall).

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::Position;
use crate::cards::EffectCard;
use crate::rng::GameRng;
use crate::rules::{
    FLOOR_MIN, HAND_SIZE_LIMIT, INITIAL_DISORDER, MAX_DISORDER, MAX_EFFECT_SLOTS, MAX_ITEM_SLOTS,
    MEET_DISORDER_RANGE, MEET_DISORDER_REDUCTION, ROB_DISORDER_PENALTY, STARTING_FLOOR,
};

pub type PlayerId = String;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InteractionError {
    #[error("players are not at the same position")]
    NotColocated,
    #[error("disorder levels are too far apart")]
    DisorderGap,
    #[error("target has nothing to rob")]
    NothingToRob,
    #[error("hand is full")]
    HandFull,
    #[error("item slots are full")]
    ItemSlotsFull,
    #[error("effect slots are full")]
    EffectSlotsFull,
    #[error("already on the bottom floor")]
    OnBottomFloor,
}

/// A lingering card effect with a turn countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub name: String,
    pub remaining_turns: u32,
}

/// Carried cards, split into equipped items, lingering effects and the
/// unplayed hand. Each compartment has its own capacity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    pub items: Vec<EffectCard>,
    pub effects: Vec<ActiveEffect>,
    pub hand: Vec<EffectCard>,
}

impl Inventory {
    pub fn add_item(&mut self, card: EffectCard) -> Result<(), InteractionError> {
        if self.items.len() >= MAX_ITEM_SLOTS {
            return Err(InteractionError::ItemSlotsFull);
        }
        self.items.push(card);
        Ok(())
    }

    pub fn add_effect(&mut self, effect: ActiveEffect) -> Result<(), InteractionError> {
        if self.effects.len() >= MAX_EFFECT_SLOTS {
            return Err(InteractionError::EffectSlotsFull);
        }
        self.effects.push(effect);
        Ok(())
    }

    pub fn add_to_hand(&mut self, card: EffectCard) -> Result<(), InteractionError> {
        if self.hand.len() >= HAND_SIZE_LIMIT {
            return Err(InteractionError::HandFull);
        }
        self.hand.push(card);
        Ok(())
    }

    pub fn remove_item(&mut self, id: u32) -> Option<EffectCard> {
        let index = self.items.iter().position(|card| card.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn remove_from_hand(&mut self, id: u32) -> Option<EffectCard> {
        let index = self.hand.iter().position(|card| card.id == id)?;
        Some(self.hand.remove(index))
    }

    /// Decrements every lingering effect and drops the expired ones.
    pub fn tick_effects(&mut self) {
        for effect in &mut self.effects {
            effect.remaining_turns = effect.remaining_turns.saturating_sub(1);
        }
        self.effects.retain(|effect| effect.remaining_turns > 0);
    }
}

/// Running counters kept for the end-of-game summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerStats {
    pub actions_taken: u32,
    pub tiles_explored: u32,
    pub floors_visited: u32,
    pub items_used: u32,
    pub falls: u32,
    pub max_disorder: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Join order, 1-based; breaks turn-order die ties.
    pub number: u8,
    pub disorder: u8,
    pub floor: u8,
    /// None until the pawn is placed during setup.
    pub position: Option<Position>,
    pub movement_points: u32,
    pub movement_used: u32,
    pub inventory: Inventory,
    pub turn_active: bool,
    pub is_host: bool,
    pub connected: bool,
    pub escape_items: u32,
    pub experiment_reports: u32,
    pub stats: PlayerStats,
}

impl Player {
    pub fn new(id: PlayerId, name: String, number: u8, is_host: bool) -> Self {
        Self {
            id,
            name,
            number,
            disorder: INITIAL_DISORDER,
            floor: STARTING_FLOOR,
            position: None,
            movement_points: 0,
            movement_used: 0,
            inventory: Inventory::default(),
            turn_active: false,
            is_host,
            connected: true,
            escape_items: 0,
            experiment_reports: 0,
            stats: PlayerStats::default(),
        }
    }

    /// Applies a disorder delta, clamped to `0..=MAX_DISORDER`. Returns
    /// whether the level actually changed.
    pub fn update_disorder(&mut self, delta: i8, reason: &str) -> bool {
        let before = self.disorder;
        let raw = i16::from(self.disorder) + i16::from(delta);
        self.disorder = raw.clamp(0, i16::from(MAX_DISORDER)) as u8;
        if self.disorder > self.stats.max_disorder {
            self.stats.max_disorder = self.disorder;
        }
        if self.disorder != before {
            info!(
                "{}: disorder {} -> {} ({})",
                self.name, before, self.disorder, reason
            );
        }
        self.disorder != before
    }

    pub fn set_movement_points(&mut self, points: u32) {
        self.movement_points = points;
        self.movement_used = 0;
    }

    pub fn remaining_movement(&self) -> u32 {
        self.movement_points.saturating_sub(self.movement_used)
    }

    pub fn use_movement(&mut self, points: u32) -> bool {
        if points > self.remaining_movement() {
            return false;
        }
        self.movement_used += points;
        true
    }

    pub fn start_turn(&mut self) {
        self.turn_active = true;
    }

    pub fn end_turn(&mut self) {
        self.turn_active = false;
        self.movement_points = 0;
        self.movement_used = 0;
        self.inventory.tick_effects();
    }

    pub fn escape_item_count(&self) -> u32 {
        let carried = self
            .inventory
            .items
            .iter()
            .chain(self.inventory.hand.iter())
            .filter(|card| card.escape_item)
            .count() as u32;
        self.escape_items + carried
    }

    /// Two co-located pawns steady each other. Requires exact sub-cell
    /// equality and a disorder gap within the allowed range; both sides
    /// drop one disorder.
    pub fn meet(&mut self, other: &mut Player) -> Result<(), InteractionError> {
        let (mine, theirs) = match (self.position, other.position) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(InteractionError::NotColocated),
        };
        if mine != theirs || self.floor != other.floor {
            return Err(InteractionError::NotColocated);
        }
        if self.disorder.abs_diff(other.disorder) > MEET_DISORDER_RANGE {
            return Err(InteractionError::DisorderGap);
        }
        let _ = self.update_disorder(MEET_DISORDER_REDUCTION, "met another explorer");
        let _ = other.update_disorder(MEET_DISORDER_REDUCTION, "met another explorer");
        Ok(())
    }

    /// Steals one random hand card from a pawn on the same tile. Capacity
    /// is checked before the target loses anything; a successful theft
    /// costs the thief a point of disorder.
    pub fn rob(&mut self, other: &mut Player, rng: &mut GameRng) -> Result<EffectCard, InteractionError> {
        let (mine, theirs) = match (self.position, other.position) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(InteractionError::NotColocated),
        };
        if mine.tile_position() != theirs.tile_position() {
            return Err(InteractionError::NotColocated);
        }
        if other.inventory.hand.is_empty() {
            return Err(InteractionError::NothingToRob);
        }
        if self.inventory.hand.len() >= HAND_SIZE_LIMIT {
            return Err(InteractionError::HandFull);
        }
        let index = rng.index(other.inventory.hand.len());
        let card = other.inventory.hand.remove(index);
        self.inventory.hand.push(card.clone());
        let _ = self.update_disorder(ROB_DISORDER_PENALTY, "robbed another explorer");
        info!("{} robbed '{}' from {}", self.name, card.name, other.name);
        Ok(card)
    }

    /// Drops the pawn one floor and relieves a point of disorder. Floor 1
    /// has nothing below it.
    pub fn perform_fall(&mut self) -> Result<u8, InteractionError> {
        if self.floor <= FLOOR_MIN {
            return Err(InteractionError::OnBottomFloor);
        }
        self.floor -= 1;
        if let Some(position) = self.position {
            self.position = position.on_floor(self.floor);
        }
        let _ = self.update_disorder(-1, "fell through the floor");
        self.stats.falls += 1;
        self.stats.floors_visited += 1;
        Ok(self.floor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub number: u8,
    pub disorder: u8,
    pub disorder_description: String,
    pub floor: u8,
    pub position: Option<Position>,
    pub movement_points: u32,
    pub movement_used: u32,
    pub items: Vec<EffectCard>,
    pub effects: Vec<ActiveEffect>,
    pub hand_size: usize,
    pub turn_active: bool,
    pub is_host: bool,
    pub connected: bool,
    pub escape_items: u32,
    pub experiment_reports: u32,
    pub stats: PlayerStats,
}

impl PlayerSnapshot {
    pub fn of(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            name: player.name.clone(),
            number: player.number,
            disorder: player.disorder,
            disorder_description: crate::rules::disorder_description(player.disorder).to_string(),
            floor: player.floor,
            position: player.position,
            movement_points: player.movement_points,
            movement_used: player.movement_used,
            items: player.inventory.items.clone(),
            effects: player.inventory.effects.clone(),
            hand_size: player.inventory.hand.len(),
            turn_active: player.turn_active,
            is_host: player.is_host,
            connected: player.connected,
            escape_items: player.escape_items,
            experiment_reports: player.experiment_reports,
            stats: player.stats.clone(),
        }
    }
}
