//! Static rules table: limits, thresholds, deck composition and the pure
//! lookup helpers derived from them. Nothing in here carries state.

use serde::{Deserialize, Serialize};

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;

pub const FLOOR_MIN: u8 = 1;
pub const FLOOR_MAX: u8 = 5;
pub const STARTING_FLOOR: u8 = 2;
pub const ESCAPE_FLOOR: u8 = 5;

/// Tile grid per floor.
pub const BOARD_WIDTH: i32 = 5;
pub const BOARD_HEIGHT: i32 = 5;
/// Sub-cells per tile edge.
pub const TILE_SIZE: i32 = 4;
/// Grid slot of the initial tile (center of the 5x5 grid).
pub const INITIAL_TILE: (i32, i32) = (2, 2);

pub const INITIAL_DISORDER: u8 = 0;
pub const MAX_DISORDER: u8 = 10;
/// At this disorder the Explore action is replaced by Fall.
pub const DISORDER_FALL_THRESHOLD: u8 = 6;
/// At this disorder wall squares stop blocking movement.
pub const WALL_PASS_THRESHOLD: u8 = 7;
pub const MEET_DISORDER_RANGE: u8 = 2;
pub const MEET_DISORDER_REDUCTION: i8 = -1;
pub const ROB_DISORDER_PENALTY: i8 = 1;

pub const MAX_ITEM_SLOTS: usize = 6;
pub const MAX_EFFECT_SLOTS: usize = 4;
pub const HAND_SIZE_LIMIT: usize = 7;
pub const STARTING_HAND_SIZE: usize = 3;

pub const ESCAPE_ITEMS_REQUIRED: u32 = 3;
pub const EXPERIMENT_REPORTS_REQUIRED: u32 = 7;
pub const MAP_CORRUPTION_LIMIT: f64 = 0.70;

pub const CORRUPTION_SPREAD_RATE: f64 = 0.05;
pub const ELEVATOR_MALFUNCTION_CHANCE: f64 = 0.30;

/// Cumulative completed actions at which Mutation begins.
pub const MUTATION_ACTION_THRESHOLD: u32 = 50;
/// Cumulative completed actions at which the End Game begins.
pub const END_GAME_ACTION_THRESHOLD: u32 = 100;

pub const TURN_TIME_LIMIT_SECS: u64 = 60;

/// Deck composition fixed at session start.
pub const PATH_TILE_DECK_SIZE: usize = 60;
pub const BASIC_TILE_COUNT: usize = 35;
pub const DISORDERED_TILE_COUNT: usize = 10;
pub const STAIRWELL_TILE_COUNT: usize = 8;
pub const ELEVATOR_TILE_COUNT: usize = 5;
pub const ROTATING_TILE_COUNT: usize = 2;
pub const ITEM_CARD_COUNT: usize = 25;
pub const EVENT_CARD_COUNT: usize = 35;
pub const ANOMALY_CARD_COUNT: usize = 20;
pub const BUTTON_CARD_COUNT: usize = 20;
pub const EFFECT_DECK_SIZE: usize = ITEM_CARD_COUNT + EVENT_CARD_COUNT + ANOMALY_CARD_COUNT;
pub const ZONE_NAME_DECK_SIZE: usize = ZONE_NAMES.len();

pub const ZONES: [char; 8] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];

/// Zone name pool, face-down until revealed.
pub const ZONE_NAMES: [&str; 8] = [
    "Laboratory Wing",
    "Administrative Office",
    "Research Facility",
    "Patient Ward",
    "Storage Area",
    "Maintenance Tunnel",
    "Observation Deck",
    "Emergency Exit",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GamePhase {
    Exploration,
    Mutation,
    EndGame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Die {
    D4,
    D6,
    D8,
    D12,
}

impl Die {
    pub fn sides(self) -> u8 {
        match self {
            Die::D4 => 4,
            Die::D6 => 6,
            Die::D8 => 8,
            Die::D12 => 12,
        }
    }
}

pub const MOVEMENT_DIE: Die = Die::D6;
pub const PLAYER_ORDER_DIE: Die = Die::D12;

pub fn can_explore(disorder: u8) -> bool {
    disorder < DISORDER_FALL_THRESHOLD
}

pub fn can_pass_walls(disorder: u8) -> bool {
    disorder >= WALL_PASS_THRESHOLD
}

pub fn corruption_percentage(corrupted: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    corrupted as f64 / total as f64
}

pub fn is_lost_to_corruption(percentage: f64) -> bool {
    percentage >= MAP_CORRUPTION_LIMIT
}

/// Phase is a pure function of cumulative completed actions.
pub fn phase_for_actions(total_actions: u32, mutation_at: u32, end_game_at: u32) -> GamePhase {
    if total_actions >= end_game_at {
        GamePhase::EndGame
    } else if total_actions >= mutation_at {
        GamePhase::Mutation
    } else {
        GamePhase::Exploration
    }
}

pub fn disorder_description(level: u8) -> &'static str {
    match level {
        0 => "Normal state",
        1 => "Slightly unsettled",
        2 => "Nervous",
        3 => "Anxious",
        4 => "Disturbed",
        5 => "Highly disturbed",
        6 => "Cannot explore - forces fall",
        7 => "Can pass through walls",
        8 => "Severe mental strain",
        9 => "Near breaking point",
        10 => "Complete breakdown",
        _ => "Unknown disorder level",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explore_gate() {
        assert!(can_explore(0));
        assert!(can_explore(5));
        assert!(!can_explore(DISORDER_FALL_THRESHOLD));
        assert!(!can_explore(MAX_DISORDER));
    }

    #[test]
    fn test_wall_passing_threshold() {
        assert!(!can_pass_walls(6));
        assert!(can_pass_walls(7));
        assert!(can_pass_walls(10));
    }

    #[test]
    fn test_corruption_percentage_empty_board() {
        assert_eq!(corruption_percentage(0, 0), 0.0);
        assert_eq!(corruption_percentage(5, 0), 0.0);
    }

    #[test]
    fn test_corruption_defeat_boundary() {
        assert!(!is_lost_to_corruption(0.69));
        assert!(is_lost_to_corruption(0.70));
        assert!(is_lost_to_corruption(1.0));
    }

    #[test]
    fn test_phase_thresholds() {
        let phase = |n| phase_for_actions(n, MUTATION_ACTION_THRESHOLD, END_GAME_ACTION_THRESHOLD);
        assert_eq!(phase(0), GamePhase::Exploration);
        assert_eq!(phase(49), GamePhase::Exploration);
        assert_eq!(phase(50), GamePhase::Mutation);
        assert_eq!(phase(99), GamePhase::Mutation);
        assert_eq!(phase(100), GamePhase::EndGame);
        assert_eq!(phase(5000), GamePhase::EndGame);
    }

    #[test]
    fn test_deck_composition_sums() {
        assert_eq!(
            BASIC_TILE_COUNT
                + DISORDERED_TILE_COUNT
                + STAIRWELL_TILE_COUNT
                + ELEVATOR_TILE_COUNT
                + ROTATING_TILE_COUNT,
            PATH_TILE_DECK_SIZE
        );
        assert_eq!(ITEM_CARD_COUNT + EVENT_CARD_COUNT + ANOMALY_CARD_COUNT, 80);
        assert_eq!(ZONES.len(), ZONE_NAMES.len());
    }

    #[test]
    fn test_die_sides() {
        assert_eq!(MOVEMENT_DIE.sides(), 6);
        assert_eq!(PLAYER_ORDER_DIE.sides(), 12);
    }
}
