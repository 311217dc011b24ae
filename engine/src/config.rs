//! Session configuration.
//!
//! Defaults mirror the rules table; the surrounding layer may override
//! individual values (and tests do, to force probabilistic branches).

use serde::{Deserialize, Serialize};

use crate::rules;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub min_players: usize,
    pub max_players: usize,
    pub corruption_spread_rate: f64,
    pub elevator_malfunction_chance: f64,
    pub mutation_action_threshold: u32,
    pub end_game_action_threshold: u32,
    /// Consumed by the surrounding orchestration layer; the engine only
    /// exposes `force_end_turn` for it to invoke on expiry.
    pub turn_time_limit_secs: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: rules::MIN_PLAYERS,
            max_players: rules::MAX_PLAYERS,
            corruption_spread_rate: rules::CORRUPTION_SPREAD_RATE,
            elevator_malfunction_chance: rules::ELEVATOR_MALFUNCTION_CHANCE,
            mutation_action_threshold: rules::MUTATION_ACTION_THRESHOLD,
            end_game_action_threshold: rules::END_GAME_ACTION_THRESHOLD,
            turn_time_limit_secs: rules::TURN_TIME_LIMIT_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_rules_table() {
        let config = GameConfig::default();
        assert_eq!(config.min_players, 2);
        assert_eq!(config.max_players, 4);
        assert_eq!(config.mutation_action_threshold, 50);
        assert_eq!(config.end_game_action_threshold, 100);
        assert_eq!(config.corruption_spread_rate, 0.05);
        assert_eq!(config.elevator_malfunction_chance, 0.30);
    }
}
