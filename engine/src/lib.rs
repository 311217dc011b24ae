//! Authoritative engine for a cooperative-competitive exploration game.
//!
//! A session walks through a fixed state machine: a waiting lobby, a pawn
//! placement round, the playing loop and a finished terminal state. During
//! play the board grows tile by tile across five floors, a disorder meter
//! gates what each pawn may do, and the cumulative action count pushes the
//! session through its three phases until one of the end conditions fires.
//!
//! The engine is deliberately transport-free. Callers submit [`actions::Action`]
//! values through [`actions::execute_action`] and relay the resulting
//! [`actions::ActionResult`] plus [`game::GameSnapshot`] to their clients;
//! snapshots serialize with serde so any wire format works.

pub mod actions;
pub mod board;
pub mod cards;
pub mod config;
pub mod game;
pub mod player;
pub mod registry;
pub mod rng;
pub mod rules;

pub use actions::{execute_action, Action, ActionData, ActionError, ActionResult};
pub use board::{Board, PathTile, PathTileType, Position, SpecialSquare, TilePosition};
pub use cards::{Card, CardEffect, CardType, Deck, Decks, EffectCard, EffectKind};
pub use config::GameConfig;
pub use game::{Game, GameEvent, GameOutcome, GameSnapshot, GameState, LobbyError};
pub use player::{Inventory, Player, PlayerId, PlayerSnapshot};
pub use registry::{GameRegistry, RegistryError};
pub use rng::GameRng;
pub use rules::GamePhase;
