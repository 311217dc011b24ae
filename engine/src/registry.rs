//! Session registry: creates games, routes players to the game they are
//! in, and drops finished sessions.

use std::collections::HashMap;

use log::info;
use thiserror::Error;

use crate::config::GameConfig;
use crate::game::{Game, GameState, LobbyError};
use crate::player::PlayerId;
use crate::rng::GameRng;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("game not found")]
    GameNotFound,
    #[error("player is already in a game")]
    AlreadyInGame,
    #[error("player is not in any game")]
    NotInAnyGame,
    #[error(transparent)]
    Lobby(#[from] LobbyError),
}

/// Owns every live session and the player-to-game index.
#[derive(Debug)]
pub struct GameRegistry {
    games: HashMap<String, Game>,
    player_index: HashMap<PlayerId, String>,
    next_game_seq: u64,
    default_config: GameConfig,
}

impl GameRegistry {
    pub fn new(default_config: GameConfig) -> Self {
        Self {
            games: HashMap::new(),
            player_index: HashMap::new(),
            next_game_seq: 0,
            default_config,
        }
    }

    pub fn create_game(&mut self) -> String {
        self.create_game_with_rng(GameRng::new())
    }

    /// Seeded variant; the id is still sequence-derived so replays stay
    /// addressable.
    pub fn create_game_with_rng(&mut self, rng: GameRng) -> String {
        self.next_game_seq += 1;
        let id = format!("game-{}", self.next_game_seq);
        let game = Game::with_rng(id.clone(), self.default_config.clone(), rng);
        info!("created game {}", id);
        let _ = self.games.insert(id.clone(), game);
        id
    }

    pub fn game(&self, id: &str) -> Option<&Game> {
        self.games.get(id)
    }

    pub fn game_mut(&mut self, id: &str) -> Option<&mut Game> {
        self.games.get_mut(id)
    }

    /// The game the player currently sits in.
    pub fn game_of(&self, player: &str) -> Option<&Game> {
        self.games.get(self.player_index.get(player)?)
    }

    pub fn game_of_mut(&mut self, player: &str) -> Option<&mut Game> {
        let id = self.player_index.get(player)?.clone();
        self.games.get_mut(&id)
    }

    /// A player may only sit in one game at a time.
    pub fn join_game(
        &mut self,
        game_id: &str,
        player_id: PlayerId,
        name: String,
    ) -> Result<u8, RegistryError> {
        if self.player_index.contains_key(&player_id) {
            return Err(RegistryError::AlreadyInGame);
        }
        let game = self
            .games
            .get_mut(game_id)
            .ok_or(RegistryError::GameNotFound)?;
        let number = game.add_player(player_id.clone(), name)?;
        let _ = self.player_index.insert(player_id, game_id.to_string());
        Ok(number)
    }

    /// Removes the player from their game; a game left empty is dropped.
    pub fn leave_game(&mut self, player_id: &str) -> Result<(), RegistryError> {
        let game_id = self
            .player_index
            .remove(player_id)
            .ok_or(RegistryError::NotInAnyGame)?;
        if let Some(game) = self.games.get_mut(&game_id) {
            let _ = game.remove_player(player_id);
            if game.players.is_empty() {
                info!("dropping empty game {}", game_id);
                let _ = self.games.remove(&game_id);
            }
        }
        Ok(())
    }

    /// Lobbies that can still be joined, sorted by id for stable listings.
    pub fn open_games(&self) -> Vec<&Game> {
        let mut open: Vec<&Game> = self
            .games
            .values()
            .filter(|game| {
                game.state() == GameState::Waiting
                    && game.players.len() < game.config.max_players
            })
            .collect();
        open.sort_by(|a, b| a.id.cmp(&b.id));
        open
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    /// Garbage-collects finished sessions and their index entries.
    pub fn remove_finished(&mut self) -> usize {
        let finished: Vec<String> = self
            .games
            .iter()
            .filter(|(_, game)| game.state() == GameState::Finished)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &finished {
            self.player_index.retain(|_, game_id| game_id != id);
            let _ = self.games.remove(id);
            info!("removed finished game {}", id);
        }
        finished.len()
    }
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}
