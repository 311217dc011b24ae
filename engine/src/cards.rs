//! Card definitions and the draw/discard piles.
//!
//! Cards are a closed set, so they are modeled as plain tagged unions
//! rather than trait objects; effect resolution happens in the action
//! pipeline, cards only carry data.

use std::collections::VecDeque;

use log::info;
use serde::{Deserialize, Serialize};

use crate::board::{PathTileType, TileLayout};
use crate::rng::GameRng;
use crate::rules::{
    BASIC_TILE_COUNT, BUTTON_CARD_COUNT, DISORDERED_TILE_COUNT, ELEVATOR_TILE_COUNT,
    EVENT_CARD_COUNT, FLOOR_MAX, FLOOR_MIN, ITEM_CARD_COUNT, ANOMALY_CARD_COUNT,
    ROTATING_TILE_COUNT, STAIRWELL_TILE_COUNT, ZONES, ZONE_NAMES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    PathTile,
    Effect,
    Button,
    ZoneName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    Item,
    Event,
    Anomaly,
}

/// The mechanical payload a card applies when resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CardEffect {
    /// Disorder delta for the acting player.
    Disorder(i8),
    /// Disorder delta for every player in the session.
    DisorderAll(i8),
    VisionBonus(u8),
    GainReport,
    PurifyAnomaly,
    RevealExit,
    CorruptRandomTile,
    RevealZone,
    UnlockDoors,
    Nothing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathTileCard {
    pub id: u32,
    pub tile_type: PathTileType,
    pub layout: TileLayout,
    pub rotation: u16,
}

impl PathTileCard {
    pub fn new(id: u32, tile_type: PathTileType, rng: &mut GameRng) -> Self {
        Self {
            id,
            tile_type,
            layout: crate::board::generate_layout(tile_type, rng),
            rotation: 0,
        }
    }

    /// Rotating tiles turn in 90 degree steps; the layout rotates with the
    /// recorded angle.
    pub fn rotate(&mut self, degrees: u16) {
        let steps = (degrees / 90) % 4;
        for _ in 0..steps {
            self.layout = crate::board::rotate_layout(&self.layout);
        }
        self.rotation = (self.rotation + degrees) % 360;
    }

    pub fn name(&self) -> &'static str {
        match self.tile_type {
            PathTileType::Basic => "Corridor",
            PathTileType::Disordered => "Warped Corridor",
            PathTileType::Construction => "Construction Zone",
            PathTileType::Rotating => "Rotating Chamber",
            PathTileType::Stairwell => "Stairwell",
            PathTileType::Elevator => "Elevator Shaft",
            PathTileType::Initial => "Entry Hall",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectCard {
    pub id: u32,
    pub kind: EffectKind,
    pub name: String,
    pub description: String,
    pub effect: CardEffect,
    /// Items flagged as escape gear count toward the escape victory.
    pub escape_item: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonCard {
    pub id: u32,
    pub floor: u8,
    pub zone: char,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneNameCard {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Card {
    PathTile(PathTileCard),
    Effect(EffectCard),
    Button(ButtonCard),
    ZoneName(ZoneNameCard),
}

impl Card {
    pub fn id(&self) -> u32 {
        match self {
            Card::PathTile(card) => card.id,
            Card::Effect(card) => card.id,
            Card::Button(card) => card.id,
            Card::ZoneName(card) => card.id,
        }
    }

    pub fn card_type(&self) -> CardType {
        match self {
            Card::PathTile(_) => CardType::PathTile,
            Card::Effect(_) => CardType::Effect,
            Card::Button(_) => CardType::Button,
            Card::ZoneName(_) => CardType::ZoneName,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Card::PathTile(card) => card.name().to_string(),
            Card::Effect(card) => card.name.clone(),
            Card::Button(card) => format!("Button {}{}", card.floor, card.zone),
            Card::ZoneName(card) => card.name.clone(),
        }
    }
}

/// Item templates: name, description, effect, escape flag.
const ITEMS: [(&str, &str, CardEffect, bool); 12] = [
    ("Flashlight", "Cuts through the dark", CardEffect::VisionBonus(2), false),
    ("First Aid Kit", "Steadies frayed nerves", CardEffect::Disorder(-2), false),
    ("Calming Pills", "Takes the edge off", CardEffect::Disorder(-1), false),
    ("Master Key", "Opens any sealed door", CardEffect::UnlockDoors, true),
    ("Escape Rope", "Long enough to matter", CardEffect::Nothing, true),
    ("Crowbar", "Forces stubborn doors", CardEffect::UnlockDoors, true),
    ("Holy Water", "Cleanses what should not be", CardEffect::PurifyAnomaly, false),
    ("Research Notes", "Raw material for a report", CardEffect::GainReport, false),
    ("Map Fragment", "A corner of the building, named", CardEffect::RevealZone, false),
    ("Emergency Radio", "Static, mostly", CardEffect::Nothing, false),
    ("Night Vision Goggles", "Sees a little further", CardEffect::VisionBonus(1), false),
    ("Lockpicks", "Quieter than a crowbar", CardEffect::UnlockDoors, false),
];

/// Event templates: name, description, effect.
const EVENTS: [(&str, &str, CardEffect); 6] = [
    ("Strange Noise", "Everyone hears it", CardEffect::DisorderAll(1)),
    ("Team Spirit", "A moment of shared calm", CardEffect::DisorderAll(-1)),
    ("Structural Damage", "Something gives way", CardEffect::CorruptRandomTile),
    ("Emergency Broadcast", "Coordinates for a way out", CardEffect::RevealExit),
    ("False Alarm", "Nothing happens after all", CardEffect::Nothing),
    ("Psychological Pressure", "The walls feel closer", CardEffect::Disorder(2)),
];

/// Anomaly templates: name, description, effect on activation.
const ANOMALIES: [(&str, &str, CardEffect); 7] = [
    ("Gravity Anomaly", "Down is negotiable here", CardEffect::Nothing),
    ("Shadow Infestation", "The corners are crowded", CardEffect::Nothing),
    ("Corruption Spread", "The rot finds new ground", CardEffect::CorruptRandomTile),
    ("Phantom Walls", "Surfaces that were not there", CardEffect::Nothing),
    ("Disorder Amplification", "Every fear, louder", CardEffect::DisorderAll(1)),
    ("Reality Fracture", "The floor plan disagrees with itself", CardEffect::Nothing),
    ("Memory Loss", "Which way did we come in?", CardEffect::Nothing),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckSnapshot {
    pub deck_type: CardType,
    pub remaining: usize,
    pub discarded: usize,
    pub drawn_count: usize,
}

/// A shuffled draw pile with a discard pile that recycles on exhaustion.
#[derive(Debug, Clone)]
pub struct Deck {
    deck_type: CardType,
    cards: VecDeque<Card>,
    discarded: Vec<Card>,
    drawn_count: usize,
}

impl Deck {
    pub fn new(deck_type: CardType, mut cards: Vec<Card>, rng: &mut GameRng) -> Self {
        rng.shuffle(&mut cards);
        Self {
            deck_type,
            cards: cards.into(),
            discarded: Vec::new(),
            drawn_count: 0,
        }
    }

    /// Draws from the top; an empty pile reshuffles the discard pile first.
    pub fn draw(&mut self, rng: &mut GameRng) -> Option<Card> {
        if self.cards.is_empty() && !self.discarded.is_empty() {
            info!(
                "reshuffling {} discarded {:?} cards back into the deck",
                self.discarded.len(),
                self.deck_type
            );
            self.cards = self.discarded.drain(..).collect();
            rng.shuffle(self.cards.make_contiguous());
        }
        let card = self.cards.pop_front()?;
        self.drawn_count += 1;
        Some(card)
    }

    pub fn discard(&mut self, card: Card) {
        self.discarded.push(card);
    }

    /// Puts a card back on top without counting as a draw (a rejected draw
    /// is rolled back, not discarded).
    pub fn return_to_top(&mut self, card: Card) {
        self.cards.push_front(card);
        self.drawn_count = self.drawn_count.saturating_sub(1);
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn discarded_count(&self) -> usize {
        self.discarded.len()
    }

    pub fn drawn_count(&self) -> usize {
        self.drawn_count
    }

    pub fn is_exhausted(&self) -> bool {
        self.cards.is_empty() && self.discarded.is_empty()
    }

    pub fn snapshot(&self) -> DeckSnapshot {
        DeckSnapshot {
            deck_type: self.deck_type,
            remaining: self.cards.len(),
            discarded: self.discarded.len(),
            drawn_count: self.drawn_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecksSnapshot {
    pub path: DeckSnapshot,
    pub effect: DeckSnapshot,
    pub button: DeckSnapshot,
    pub zone_name: DeckSnapshot,
}

/// The four session decks, built and shuffled once at game start.
#[derive(Debug, Clone)]
pub struct Decks {
    pub path: Deck,
    pub effect: Deck,
    pub button: Deck,
    pub zone_name: Deck,
}

impl Decks {
    pub fn starting(rng: &mut GameRng) -> Self {
        let mut next_id = 1u32;
        let mut id = || {
            let id = next_id;
            next_id += 1;
            id
        };

        let mut path_cards = Vec::new();
        let tile_counts = [
            (PathTileType::Basic, BASIC_TILE_COUNT),
            (PathTileType::Disordered, DISORDERED_TILE_COUNT),
            (PathTileType::Stairwell, STAIRWELL_TILE_COUNT),
            (PathTileType::Elevator, ELEVATOR_TILE_COUNT),
            (PathTileType::Rotating, ROTATING_TILE_COUNT),
        ];
        for (tile_type, count) in tile_counts {
            for _ in 0..count {
                path_cards.push(Card::PathTile(PathTileCard::new(id(), tile_type, rng)));
            }
        }

        let mut effect_cards = Vec::new();
        for i in 0..ITEM_CARD_COUNT {
            let (name, description, effect, escape_item) = ITEMS[i % ITEMS.len()];
            effect_cards.push(Card::Effect(EffectCard {
                id: id(),
                kind: EffectKind::Item,
                name: name.to_string(),
                description: description.to_string(),
                effect,
                escape_item,
            }));
        }
        for i in 0..EVENT_CARD_COUNT {
            let (name, description, effect) = EVENTS[i % EVENTS.len()];
            effect_cards.push(Card::Effect(EffectCard {
                id: id(),
                kind: EffectKind::Event,
                name: name.to_string(),
                description: description.to_string(),
                effect,
                escape_item: false,
            }));
        }
        for i in 0..ANOMALY_CARD_COUNT {
            let (name, description, effect) = ANOMALIES[i % ANOMALIES.len()];
            effect_cards.push(Card::Effect(EffectCard {
                id: id(),
                kind: EffectKind::Anomaly,
                name: name.to_string(),
                description: description.to_string(),
                effect,
                escape_item: false,
            }));
        }

        let mut button_cards = Vec::new();
        for i in 0..BUTTON_CARD_COUNT {
            let floor = FLOOR_MIN + (i as u8 % (FLOOR_MAX - FLOOR_MIN + 1));
            let zone = ZONES[i % ZONES.len()];
            button_cards.push(Card::Button(ButtonCard { id: id(), floor, zone }));
        }

        let zone_name_cards = ZONE_NAMES
            .iter()
            .map(|name| {
                Card::ZoneName(ZoneNameCard {
                    id: id(),
                    name: (*name).to_string(),
                })
            })
            .collect();

        Self {
            path: Deck::new(CardType::PathTile, path_cards, rng),
            effect: Deck::new(CardType::Effect, effect_cards, rng),
            button: Deck::new(CardType::Button, button_cards, rng),
            zone_name: Deck::new(CardType::ZoneName, zone_name_cards, rng),
        }
    }

    pub fn snapshot(&self) -> DecksSnapshot {
        DecksSnapshot {
            path: self.path.snapshot(),
            effect: self.effect.snapshot(),
            button: self.button.snapshot(),
            zone_name: self.zone_name.snapshot(),
        }
    }
}
