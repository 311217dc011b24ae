//! Spatial state: the multi-floor tile grid, zones, corruption and the
//! movement queries built on top of them.
//!
//! Two coordinate systems are deliberately kept apart: [`TilePosition`]
//! addresses a grid slot for tile placement, [`Position`] addresses a
//! sub-cell inside a placed tile for pawn movement. Conversions are explicit
//! (`Position::tile_position`, `Position::from_parts`) and total.

use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use log::info;
use serde::{Deserialize, Serialize};

use crate::rng::GameRng;
use crate::rules::{
    can_pass_walls, corruption_percentage, BOARD_HEIGHT, BOARD_WIDTH, FLOOR_MAX, FLOOR_MIN,
    INITIAL_TILE, STARTING_FLOOR, TILE_SIZE, ZONES,
};

/// Synthetic tiles (initial tile aside) are allocated ids from here up so
/// they never collide with card-derived ids.
const SYNTHETIC_ID_BASE: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathTileType {
    Basic,
    Disordered,
    Construction,
    Rotating,
    Stairwell,
    Elevator,
    Initial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialSquare {
    Normal,
    Stairwell,
    ElevatorRoom,
    EventSquare,
    EmergencyDoor,
    ItemSquare,
    Wall,
}

/// 4x4 special-square layout, indexed `layout[x][y]`.
pub type TileLayout = [[SpecialSquare; 4]; 4];

/// Generates the 4x4 layout for a freshly drawn tile.
pub fn generate_layout(tile_type: PathTileType, rng: &mut GameRng) -> TileLayout {
    let mut layout = [[SpecialSquare::Normal; 4]; 4];
    match tile_type {
        PathTileType::Stairwell => {
            layout[1][1] = SpecialSquare::Stairwell;
            layout[2][2] = SpecialSquare::Stairwell;
        }
        PathTileType::Elevator => {
            for x in 1..3 {
                for y in 1..3 {
                    layout[x][y] = SpecialSquare::ElevatorRoom;
                }
            }
        }
        PathTileType::Basic => {
            let specials = [
                SpecialSquare::EventSquare,
                SpecialSquare::ItemSquare,
                SpecialSquare::EmergencyDoor,
            ];
            let count = rng.range(0, 3);
            for _ in 0..count {
                let x = rng.range(0, TILE_SIZE) as usize;
                let y = rng.range(0, TILE_SIZE) as usize;
                if layout[x][y] == SpecialSquare::Normal {
                    if let Some(square) = rng.pick(&specials) {
                        layout[x][y] = *square;
                    }
                }
            }
        }
        PathTileType::Disordered => {
            let walls = rng.range(2, 5);
            for _ in 0..walls {
                let x = rng.range(0, TILE_SIZE) as usize;
                let y = rng.range(0, TILE_SIZE) as usize;
                layout[x][y] = SpecialSquare::Wall;
            }
        }
        PathTileType::Construction | PathTileType::Rotating | PathTileType::Initial => {}
    }
    layout
}

/// Rotates a layout 90 degrees clockwise.
pub fn rotate_layout(layout: &TileLayout) -> TileLayout {
    let mut rotated = [[SpecialSquare::Normal; 4]; 4];
    for x in 0..4 {
        for y in 0..4 {
            rotated[3 - y][x] = layout[x][y];
        }
    }
    rotated
}

/// A tile slot on the grid; used for placement, never for pawn movement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TilePosition {
    pub x: i32,
    pub y: i32,
    pub floor: u8,
}

impl TilePosition {
    pub fn new(x: i32, y: i32, floor: u8) -> Option<Self> {
        if (0..BOARD_WIDTH).contains(&x)
            && (0..BOARD_HEIGHT).contains(&y)
            && (FLOOR_MIN..=FLOOR_MAX).contains(&floor)
        {
            Some(Self { x, y, floor })
        } else {
            None
        }
    }

    /// Same-floor 4-directional neighbors, clipped to the grid.
    pub fn neighbors(&self) -> Vec<TilePosition> {
        [(1, 0), (-1, 0), (0, 1), (0, -1)]
            .iter()
            .filter_map(|(dx, dy)| TilePosition::new(self.x + dx, self.y + dy, self.floor))
            .collect()
    }
}

/// A sub-cell inside a tile; the unit of pawn occupancy and movement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub tile_x: i32,
    pub tile_y: i32,
    pub sub_x: i32,
    pub sub_y: i32,
    pub floor: u8,
}

impl Position {
    pub fn new(tile_x: i32, tile_y: i32, sub_x: i32, sub_y: i32, floor: u8) -> Option<Self> {
        if (0..BOARD_WIDTH).contains(&tile_x)
            && (0..BOARD_HEIGHT).contains(&tile_y)
            && (0..TILE_SIZE).contains(&sub_x)
            && (0..TILE_SIZE).contains(&sub_y)
            && (FLOOR_MIN..=FLOOR_MAX).contains(&floor)
        {
            Some(Self {
                tile_x,
                tile_y,
                sub_x,
                sub_y,
                floor,
            })
        } else {
            None
        }
    }

    pub fn from_parts(tile: TilePosition, local: (i32, i32)) -> Option<Self> {
        Self::new(tile.x, tile.y, local.0, local.1, tile.floor)
    }

    pub fn from_absolute(abs_x: i32, abs_y: i32, floor: u8) -> Option<Self> {
        if abs_x < 0 || abs_y < 0 {
            return None;
        }
        Self::new(
            abs_x / TILE_SIZE,
            abs_y / TILE_SIZE,
            abs_x % TILE_SIZE,
            abs_y % TILE_SIZE,
            floor,
        )
    }

    pub fn tile_position(&self) -> TilePosition {
        TilePosition {
            x: self.tile_x,
            y: self.tile_y,
            floor: self.floor,
        }
    }

    pub fn local(&self) -> (i32, i32) {
        (self.sub_x, self.sub_y)
    }

    pub fn to_absolute(&self) -> (i32, i32) {
        (
            self.tile_x * TILE_SIZE + self.sub_x,
            self.tile_y * TILE_SIZE + self.sub_y,
        )
    }

    /// Manhattan distance in absolute sub-cell coordinates, floor ignored.
    pub fn manhattan(&self, other: &Position) -> u32 {
        let (ax, ay) = self.to_absolute();
        let (bx, by) = other.to_absolute();
        (ax.abs_diff(bx) + ay.abs_diff(by)) as u32
    }

    /// Same-floor 8-directional neighbors, crossing tile boundaries.
    pub fn neighbors(&self) -> Vec<Position> {
        let (ax, ay) = self.to_absolute();
        let mut out = Vec::with_capacity(8);
        for dx in -1..=1 {
            for dy in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                if let Some(next) = Position::from_absolute(ax + dx, ay + dy, self.floor) {
                    out.push(next);
                }
            }
        }
        out
    }

    /// Pawn carried to another floor, same horizontal coordinates.
    pub fn on_floor(&self, floor: u8) -> Option<Position> {
        Self::new(self.tile_x, self.tile_y, self.sub_x, self.sub_y, floor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathTile {
    pub id: u32,
    pub tile_type: PathTileType,
    pub position: TilePosition,
    pub rotation: u16,
    pub layout: TileLayout,
    movable: HashSet<(i32, i32)>,
    pub zone: Option<char>,
    pub corrupted: bool,
    pub removed: bool,
}

impl PathTile {
    pub fn new(
        id: u32,
        tile_type: PathTileType,
        position: TilePosition,
        layout: TileLayout,
        rotation: u16,
    ) -> Self {
        let mut movable = HashSet::new();
        for x in 0..TILE_SIZE {
            for y in 0..TILE_SIZE {
                if layout[x as usize][y as usize] != SpecialSquare::Wall {
                    let _ = movable.insert((x, y));
                }
            }
        }
        Self {
            id,
            tile_type,
            position,
            rotation,
            layout,
            movable,
            zone: None,
            corrupted: false,
            removed: false,
        }
    }

    pub fn generated(
        id: u32,
        tile_type: PathTileType,
        position: TilePosition,
        rng: &mut GameRng,
    ) -> Self {
        let layout = generate_layout(tile_type, rng);
        Self::new(id, tile_type, position, layout, 0)
    }

    pub fn square(&self, local: (i32, i32)) -> SpecialSquare {
        self.layout[local.0 as usize][local.1 as usize]
    }

    pub fn is_local_movable(&self, local: (i32, i32)) -> bool {
        self.movable.contains(&local)
    }

    /// Wall squares open up at high disorder; everything else follows the
    /// movable set.
    pub fn can_enter_local(&self, local: (i32, i32), disorder: u8) -> bool {
        if self.movable.contains(&local) {
            return true;
        }
        self.square(local) == SpecialSquare::Wall && can_pass_walls(disorder)
    }

    pub fn movable_positions(&self) -> &HashSet<(i32, i32)> {
        &self.movable
    }

    /// Edge sub-cells a pawn may step in through, center fallback included.
    pub fn entrance_points(&self) -> Vec<(i32, i32)> {
        let mut points = Vec::new();
        for x in 0..TILE_SIZE {
            for y in [0, TILE_SIZE - 1] {
                if self.movable.contains(&(x, y)) {
                    points.push((x, y));
                }
            }
        }
        for y in 1..TILE_SIZE - 1 {
            for x in [0, TILE_SIZE - 1] {
                if self.movable.contains(&(x, y)) {
                    points.push((x, y));
                }
            }
        }
        if points.is_empty() {
            let mut interior: Vec<(i32, i32)> = self.movable.iter().copied().collect();
            interior.sort_unstable();
            interior.truncate(4);
            points = interior;
        }
        if points.is_empty() {
            points.push((1, 1));
        }
        points
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileSnapshot {
    pub id: u32,
    pub tile_type: PathTileType,
    pub position: TilePosition,
    pub rotation: u16,
    pub layout: TileLayout,
    pub zone: Option<char>,
    pub corrupted: bool,
    pub entrance_points: Vec<(i32, i32)>,
}

impl TileSnapshot {
    fn of(tile: &PathTile) -> Self {
        Self {
            id: tile.id,
            tile_type: tile.tile_type,
            position: tile.position,
            rotation: tile.rotation,
            layout: tile.layout,
            zone: tile.zone,
            corrupted: tile.corrupted,
            entrance_points: tile.entrance_points(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub floors: HashMap<u8, Vec<TileSnapshot>>,
    pub zone_assignments: HashMap<String, char>,
    pub zone_names: HashMap<char, String>,
    pub corrupted_tiles: Vec<u32>,
    pub corruption_percentage: f64,
    pub stairwells: HashMap<u8, Vec<TilePosition>>,
    pub elevators: HashMap<u8, Vec<TilePosition>>,
    pub escape_exits: Vec<TilePosition>,
}

/// The authoritative spatial state of one session.
#[derive(Debug)]
pub struct Board {
    floors: HashMap<u8, HashMap<(i32, i32), PathTile>>,
    zone_assignments: HashMap<(i32, i32), char>,
    zone_names: HashMap<char, String>,
    corrupted: HashSet<u32>,
    stairwells: HashMap<u8, Vec<TilePosition>>,
    elevators: HashMap<u8, Vec<TilePosition>>,
    escape_exits: Vec<TilePosition>,
    next_synthetic_id: u32,
}

impl Board {
    /// Empty floors plus the initial tile at the center of the starting
    /// floor, pre-assigned to zone B.
    pub fn new(rng: &mut GameRng) -> Self {
        let mut board = Self {
            floors: (FLOOR_MIN..=FLOOR_MAX).map(|f| (f, HashMap::new())).collect(),
            zone_assignments: HashMap::new(),
            zone_names: HashMap::new(),
            corrupted: HashSet::new(),
            stairwells: HashMap::new(),
            elevators: HashMap::new(),
            escape_exits: Vec::new(),
            next_synthetic_id: SYNTHETIC_ID_BASE,
        };
        let center = TilePosition {
            x: INITIAL_TILE.0,
            y: INITIAL_TILE.1,
            floor: STARTING_FLOOR,
        };
        let mut initial = PathTile::generated(0, PathTileType::Initial, center, rng);
        initial.zone = Some('B');
        let placed = board.place_tile(initial, rng);
        debug_assert!(placed);
        board
    }

    pub fn next_synthetic_id(&mut self) -> u32 {
        self.next_synthetic_id += 1;
        self.next_synthetic_id
    }

    /// Places a tile. Fails without mutation when the slot is occupied or a
    /// non-initial tile has no same-floor 4-neighbor.
    pub fn place_tile(&mut self, tile: PathTile, rng: &mut GameRng) -> bool {
        if self.tile_at(tile.position).is_some() {
            return false;
        }
        if tile.tile_type != PathTileType::Initial && !self.has_adjacent_tile(tile.position) {
            return false;
        }
        self.insert_tile(tile, rng);
        true
    }

    /// Placement variant for landing tiles reached by falling, stairs or
    /// elevators: an empty floor has no neighbors to be adjacent to, so only
    /// slot occupancy is checked.
    pub fn place_seed_tile(&mut self, tile: PathTile, rng: &mut GameRng) -> bool {
        if self.tile_at(tile.position).is_some() {
            return false;
        }
        self.insert_tile(tile, rng);
        true
    }

    fn insert_tile(&mut self, mut tile: PathTile, rng: &mut GameRng) {
        let pos = tile.position;
        match tile.zone {
            Some(zone) => {
                let _ = self.zone_assignments.entry((pos.x, pos.y)).or_insert(zone);
            }
            None => tile.zone = Some(self.assign_zone(pos, rng)),
        }
        match tile.tile_type {
            PathTileType::Stairwell => self.stairwells.entry(pos.floor).or_default().push(pos),
            PathTileType::Elevator => self.elevators.entry(pos.floor).or_default().push(pos),
            _ => {}
        }
        info!(
            "placed {:?} tile {} at ({},{}) floor {} zone {:?}",
            tile.tile_type, tile.id, pos.x, pos.y, pos.floor, tile.zone
        );
        let _ = self
            .floors
            .entry(pos.floor)
            .or_default()
            .insert((pos.x, pos.y), tile);
    }

    /// Detaches a tile (used when a stairwell is consumed). The returned
    /// tile is flagged removed; queries treat the slot as absent.
    pub fn remove_tile(&mut self, position: TilePosition) -> Option<PathTile> {
        let mut tile = self
            .floors
            .get_mut(&position.floor)?
            .remove(&(position.x, position.y))?;
        tile.removed = true;
        if let Some(index) = self.stairwells.get_mut(&position.floor) {
            index.retain(|p| *p != position);
        }
        if let Some(index) = self.elevators.get_mut(&position.floor) {
            index.retain(|p| *p != position);
        }
        info!(
            "removed tile {} from ({},{}) floor {}",
            tile.id, position.x, position.y, position.floor
        );
        Some(tile)
    }

    pub fn tile_at(&self, position: TilePosition) -> Option<&PathTile> {
        self.floors
            .get(&position.floor)
            .and_then(|floor| floor.get(&(position.x, position.y)))
    }

    pub fn tile_at_position(&self, position: &Position) -> Option<&PathTile> {
        self.tile_at(position.tile_position())
    }

    pub fn tile_by_id(&self, id: u32) -> Option<&PathTile> {
        self.floors
            .values()
            .flat_map(|floor| floor.values())
            .find(|tile| tile.id == id)
    }

    pub fn has_adjacent_tile(&self, position: TilePosition) -> bool {
        position
            .neighbors()
            .iter()
            .any(|neighbor| self.tile_at(*neighbor).is_some())
    }

    /// False when no tile owns the slot, the tile is corrupted or removed,
    /// or the sub-cell is outside the tile's movable set. Wall passing is
    /// the caller's concern (see [`Board::can_enter`]).
    pub fn is_position_movable(&self, position: &Position) -> bool {
        match self.tile_at_position(position) {
            Some(tile) if !tile.corrupted && !tile.removed => {
                tile.is_local_movable(position.local())
            }
            _ => false,
        }
    }

    /// `is_position_movable` plus the disorder-gated wall exception.
    pub fn can_enter(&self, position: &Position, disorder: u8) -> bool {
        match self.tile_at_position(position) {
            Some(tile) if !tile.corrupted && !tile.removed => {
                tile.can_enter_local(position.local(), disorder)
            }
            _ => false,
        }
    }

    /// Reuses a zone from same-floor neighbors for topological continuity,
    /// otherwise hands out an unused letter, otherwise any letter.
    pub fn assign_zone(&mut self, position: TilePosition, rng: &mut GameRng) -> char {
        let key = (position.x, position.y);
        if let Some(zone) = self.zone_assignments.get(&key) {
            return *zone;
        }
        let mut adjacent: Vec<char> = position
            .neighbors()
            .iter()
            .filter_map(|n| self.zone_assignments.get(&(n.x, n.y)).copied())
            .collect();
        adjacent.sort_unstable();
        adjacent.dedup();

        let zone = if let Some(zone) = rng.pick(&adjacent) {
            *zone
        } else {
            let used: HashSet<char> = self.zone_assignments.values().copied().collect();
            let unused: Vec<char> = ZONES.iter().copied().filter(|z| !used.contains(z)).collect();
            match rng.pick(&unused) {
                Some(zone) => *zone,
                None => ZONES[rng.index(ZONES.len())],
            }
        };
        let _ = self.zone_assignments.insert(key, zone);
        zone
    }

    pub fn zone_at(&self, slot: (i32, i32)) -> Option<char> {
        self.zone_assignments.get(&slot).copied()
    }

    pub fn set_zone(&mut self, slot: (i32, i32), zone: char) {
        let _ = self.zone_assignments.insert(slot, zone);
    }

    pub fn zone_slots(&self, zone: char) -> Vec<(i32, i32)> {
        let mut slots: Vec<(i32, i32)> = self
            .zone_assignments
            .iter()
            .filter(|(_, z)| **z == zone)
            .map(|(slot, _)| *slot)
            .collect();
        slots.sort_unstable();
        slots
    }

    pub fn zone_name(&self, zone: char) -> Option<&str> {
        self.zone_names.get(&zone).map(String::as_str)
    }

    pub fn set_zone_name(&mut self, zone: char, name: String) {
        let _ = self.zone_names.insert(zone, name);
    }

    pub fn zone_name_assigned(&self, name: &str) -> bool {
        self.zone_names.values().any(|n| n == name)
    }

    /// Clears all revealed names (duplicate-triggered batch reshuffle).
    pub fn take_zone_names(&mut self) -> Vec<String> {
        let mut names: Vec<String> = self.zone_names.drain().map(|(_, name)| name).collect();
        names.sort_unstable();
        names
    }

    /// Idempotently marks a tile corrupted.
    pub fn corrupt_tile(&mut self, id: u32) -> bool {
        if self.corrupted.contains(&id) {
            return false;
        }
        let Some(tile) = self
            .floors
            .values_mut()
            .flat_map(|floor| floor.values_mut())
            .find(|tile| tile.id == id)
        else {
            return false;
        };
        tile.corrupted = true;
        let _ = self.corrupted.insert(id);
        info!("tile {} became corrupted", id);
        true
    }

    /// Corrupts one uniformly chosen uncorrupted tile, if any.
    pub fn corrupt_random_tile(&mut self, rng: &mut GameRng) -> Option<u32> {
        let mut candidates: Vec<u32> = self
            .all_tiles()
            .filter(|tile| !tile.corrupted)
            .map(|tile| tile.id)
            .collect();
        candidates.sort_unstable();
        let id = *rng.pick(&candidates)?;
        let _ = self.corrupt_tile(id);
        Some(id)
    }

    /// Corruption spreads to same-floor 4-neighbors of already-corrupted
    /// tiles; each candidate corrupts independently with the given rate.
    pub fn spread_corruption(&mut self, rate: f64, rng: &mut GameRng) -> Vec<u32> {
        let mut candidates: HashSet<u32> = HashSet::new();
        for floor in self.floors.values() {
            for tile in floor.values() {
                if !tile.corrupted {
                    continue;
                }
                for neighbor in tile.position.neighbors() {
                    if let Some(adjacent) = self.tile_at(neighbor) {
                        if !adjacent.corrupted {
                            let _ = candidates.insert(adjacent.id);
                        }
                    }
                }
            }
        }
        let mut ordered: Vec<u32> = candidates.into_iter().collect();
        ordered.sort_unstable();

        let mut newly_corrupted = Vec::new();
        for id in ordered {
            if rng.chance(rate) && self.corrupt_tile(id) {
                newly_corrupted.push(id);
            }
        }
        newly_corrupted
    }

    pub fn corruption_percentage(&self) -> f64 {
        corruption_percentage(self.corrupted.len(), self.total_tiles())
    }

    pub fn corrupted_tiles(&self) -> &HashSet<u32> {
        &self.corrupted
    }

    pub fn all_tiles(&self) -> impl Iterator<Item = &PathTile> {
        self.floors.values().flat_map(|floor| floor.values())
    }

    pub fn tiles_on_floor(&self, floor: u8) -> Vec<&PathTile> {
        self.floors
            .get(&floor)
            .map(|tiles| tiles.values().collect())
            .unwrap_or_default()
    }

    pub fn total_tiles(&self) -> usize {
        self.floors.values().map(HashMap::len).sum()
    }

    pub fn stairwells_on(&self, floor: u8) -> &[TilePosition] {
        self.stairwells.get(&floor).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn elevators_on(&self, floor: u8) -> &[TilePosition] {
        self.elevators.get(&floor).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn escape_exits(&self) -> &[TilePosition] {
        &self.escape_exits
    }

    pub fn add_escape_exit(&mut self, position: TilePosition) {
        if !self.escape_exits.contains(&position) {
            self.escape_exits.push(position);
        }
    }

    pub fn is_escape_exit(&self, position: TilePosition) -> bool {
        self.escape_exits.contains(&position)
    }

    /// All positions reachable within the movement budget, starting position
    /// excluded. Breadth-first over the sub-cell graph, uniform step cost.
    pub fn valid_moves_from(&self, start: &Position, budget: u32, disorder: u8) -> Vec<Position> {
        let mut visited: HashSet<Position> = HashSet::new();
        let _ = visited.insert(*start);
        let mut frontier: VecDeque<(Position, u32)> = VecDeque::new();
        frontier.push_back((*start, 0));
        let mut reachable = Vec::new();

        while let Some((current, used)) = frontier.pop_front() {
            if used == budget {
                continue;
            }
            for next in current.neighbors() {
                if visited.contains(&next) || !self.can_enter(&next, disorder) {
                    continue;
                }
                let _ = visited.insert(next);
                reachable.push(next);
                frontier.push_back((next, used + 1));
            }
        }
        reachable
    }

    /// A* over the same-floor sub-cell graph, Manhattan heuristic, uniform
    /// cost. Floors are only connected by stairwells and elevators, so a
    /// cross-floor query has no path by construction.
    pub fn find_path(&self, start: &Position, goal: &Position, disorder: u8) -> Option<Vec<Position>> {
        if start.floor != goal.floor {
            return None;
        }
        if start == goal {
            return Some(vec![*start]);
        }

        let mut open: BinaryHeap<std::cmp::Reverse<(u32, Position)>> = BinaryHeap::new();
        let mut came_from: HashMap<Position, Position> = HashMap::new();
        let mut best: HashMap<Position, u32> = HashMap::new();
        let _ = best.insert(*start, 0);
        open.push(std::cmp::Reverse((start.manhattan(goal), *start)));

        while let Some(std::cmp::Reverse((_, current))) = open.pop() {
            if current == *goal {
                let mut path = vec![current];
                let mut cursor = current;
                while let Some(previous) = came_from.get(&cursor) {
                    path.push(*previous);
                    cursor = *previous;
                }
                path.reverse();
                return Some(path);
            }
            let current_cost = *best.get(&current)?;
            for next in current.neighbors() {
                if !self.can_enter(&next, disorder) {
                    continue;
                }
                let tentative = current_cost + 1;
                if tentative < *best.get(&next).unwrap_or(&u32::MAX) {
                    let _ = came_from.insert(next, current);
                    let _ = best.insert(next, tentative);
                    open.push(std::cmp::Reverse((tentative + next.manhattan(goal), next)));
                }
            }
        }
        None
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            floors: self
                .floors
                .iter()
                .map(|(floor, tiles)| {
                    let mut entries: Vec<TileSnapshot> =
                        tiles.values().map(TileSnapshot::of).collect();
                    entries.sort_by_key(|t| t.position);
                    (*floor, entries)
                })
                .collect(),
            zone_assignments: self
                .zone_assignments
                .iter()
                .map(|((x, y), zone)| (format!("{},{}", x, y), *zone))
                .collect(),
            zone_names: self.zone_names.clone(),
            corrupted_tiles: {
                let mut ids: Vec<u32> = self.corrupted.iter().copied().collect();
                ids.sort_unstable();
                ids
            },
            corruption_percentage: self.corruption_percentage(),
            stairwells: self.stairwells.clone(),
            elevators: self.elevators.clone(),
            escape_exits: self.escape_exits.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile_at(x: i32, y: i32, floor: u8, id: u32, tile_type: PathTileType) -> PathTile {
        let position = TilePosition::new(x, y, floor).unwrap();
        let layout = [[SpecialSquare::Normal; 4]; 4];
        PathTile::new(id, tile_type, position, layout, 0)
    }

    #[test]
    fn test_position_bounds() {
        assert!(Position::new(0, 0, 0, 0, 1).is_some());
        assert!(Position::new(4, 4, 3, 3, 5).is_some());
        assert!(Position::new(5, 0, 0, 0, 2).is_none());
        assert!(Position::new(0, 0, 4, 0, 2).is_none());
        assert!(Position::new(0, 0, 0, 0, 0).is_none());
        assert!(Position::new(0, 0, 0, 0, 6).is_none());
    }

    #[test]
    fn test_position_conversions_are_inverse() {
        let pos = Position::new(3, 1, 2, 0, 4).unwrap();
        let (ax, ay) = pos.to_absolute();
        assert_eq!(Position::from_absolute(ax, ay, 4), Some(pos));
        assert_eq!(pos.tile_position(), TilePosition::new(3, 1, 4).unwrap());
        assert_eq!(Position::from_parts(pos.tile_position(), pos.local()), Some(pos));
    }

    #[test]
    fn test_sub_position_neighbors_cross_tile_boundaries() {
        let edge = Position::new(1, 1, 3, 2, 2).unwrap();
        let neighbors = edge.neighbors();
        assert!(neighbors.contains(&Position::new(2, 1, 0, 2, 2).unwrap()));
        assert!(neighbors.iter().all(|n| n.floor == 2));
    }

    #[test]
    fn test_tile_neighbors_are_4_directional_same_floor() {
        let pos = TilePosition::new(2, 2, 3).unwrap();
        let neighbors = pos.neighbors();
        assert_eq!(neighbors.len(), 4);
        assert!(neighbors.iter().all(|n| n.floor == 3));
        assert!(!neighbors.contains(&TilePosition::new(3, 3, 3).unwrap()));

        let corner = TilePosition::new(0, 0, 1).unwrap();
        assert_eq!(corner.neighbors().len(), 2);
    }

    #[test]
    fn test_manhattan_distance_in_absolute_coords() {
        let a = Position::new(2, 2, 1, 1, 2).unwrap();
        let b = Position::new(2, 2, 3, 1, 2).unwrap();
        assert_eq!(a.manhattan(&b), 2);
        let c = Position::new(3, 2, 0, 1, 2).unwrap();
        assert_eq!(a.manhattan(&c), 3);
    }

    #[test]
    fn test_board_starts_with_initial_tile() {
        let mut rng = GameRng::seeded(1);
        let board = Board::new(&mut rng);
        assert_eq!(board.total_tiles(), 1);
        let center = TilePosition::new(2, 2, STARTING_FLOOR).unwrap();
        let tile = board.tile_at(center).unwrap();
        assert_eq!(tile.tile_type, PathTileType::Initial);
        assert_eq!(tile.zone, Some('B'));
    }

    #[test]
    fn test_place_tile_requires_adjacency() {
        let mut rng = GameRng::seeded(2);
        let mut board = Board::new(&mut rng);

        // Adjacent to the initial tile: succeeds.
        let adjacent = tile_at(3, 2, STARTING_FLOOR, 10, PathTileType::Basic);
        assert!(board.place_tile(adjacent, &mut rng));

        // Isolated slot on the same floor: fails.
        let isolated = tile_at(0, 0, STARTING_FLOOR, 11, PathTileType::Basic);
        assert!(!board.place_tile(isolated, &mut rng));
        assert_eq!(board.total_tiles(), 2);

        // Same slot as the initial tile but on another floor: floors do not
        // chain by adjacency.
        let other_floor = tile_at(2, 2, 3, 12, PathTileType::Basic);
        assert!(!board.place_tile(other_floor, &mut rng));
    }

    #[test]
    fn test_place_tile_rejects_occupied_slot() {
        let mut rng = GameRng::seeded(3);
        let mut board = Board::new(&mut rng);
        let duplicate = tile_at(2, 2, STARTING_FLOOR, 20, PathTileType::Basic);
        assert!(!board.place_tile(duplicate, &mut rng));
        assert_eq!(board.total_tiles(), 1);
    }

    #[test]
    fn test_diagonal_is_not_adjacent() {
        let mut rng = GameRng::seeded(4);
        let mut board = Board::new(&mut rng);
        let diagonal = tile_at(3, 3, STARTING_FLOOR, 30, PathTileType::Basic);
        assert!(!board.place_tile(diagonal, &mut rng));
    }

    #[test]
    fn test_seed_tile_skips_adjacency_but_not_occupancy() {
        let mut rng = GameRng::seeded(5);
        let mut board = Board::new(&mut rng);
        let landing = tile_at(2, 2, 1, 40, PathTileType::Basic);
        assert!(board.place_seed_tile(landing, &mut rng));
        let duplicate = tile_at(2, 2, 1, 41, PathTileType::Basic);
        assert!(!board.place_seed_tile(duplicate, &mut rng));
    }

    #[test]
    fn test_remove_tile_detaches_and_flags() {
        let mut rng = GameRng::seeded(6);
        let mut board = Board::new(&mut rng);
        let position = TilePosition::new(3, 2, STARTING_FLOOR).unwrap();
        let stairwell = tile_at(3, 2, STARTING_FLOOR, 50, PathTileType::Stairwell);
        assert!(board.place_tile(stairwell, &mut rng));
        assert_eq!(board.stairwells_on(STARTING_FLOOR), &[position]);

        let removed = board.remove_tile(position).unwrap();
        assert!(removed.removed);
        assert!(board.tile_at(position).is_none());
        assert!(board.stairwells_on(STARTING_FLOOR).is_empty());
        assert!(board.remove_tile(position).is_none());
    }

    #[test]
    fn test_zone_continuity_with_neighbors() {
        let mut rng = GameRng::seeded(7);
        let mut board = Board::new(&mut rng);
        let neighbor = tile_at(3, 2, STARTING_FLOOR, 60, PathTileType::Basic);
        assert!(board.place_tile(neighbor, &mut rng));
        // The only adjacent zone is B, so continuity forces B.
        assert_eq!(board.zone_at((3, 2)), Some('B'));
    }

    #[test]
    fn test_corrupt_tile_is_idempotent() {
        let mut rng = GameRng::seeded(8);
        let mut board = Board::new(&mut rng);
        assert!(board.corrupt_tile(0));
        assert!(!board.corrupt_tile(0));
        assert!(!board.corrupt_tile(999));
        assert_eq!(board.corrupted_tiles().len(), 1);
    }

    #[test]
    fn test_corruption_spread_rates() {
        let mut rng = GameRng::seeded(9);
        let mut board = Board::new(&mut rng);
        assert!(board.place_tile(tile_at(3, 2, STARTING_FLOOR, 70, PathTileType::Basic), &mut rng));
        assert!(board.place_tile(tile_at(1, 2, STARTING_FLOOR, 71, PathTileType::Basic), &mut rng));
        assert!(board.corrupt_tile(0));

        // Rate zero never spreads.
        assert!(board.spread_corruption(0.0, &mut rng).is_empty());

        // Rate one corrupts every adjacent candidate.
        let mut spread = board.spread_corruption(1.0, &mut rng);
        spread.sort_unstable();
        assert_eq!(spread, vec![70, 71]);
        assert_eq!(board.corrupted_tiles().len(), 3);
    }

    #[test]
    fn test_corruption_does_not_jump_floors() {
        let mut rng = GameRng::seeded(10);
        let mut board = Board::new(&mut rng);
        assert!(board.place_seed_tile(tile_at(2, 2, 3, 80, PathTileType::Basic), &mut rng));
        assert!(board.corrupt_tile(0));
        assert!(board.spread_corruption(1.0, &mut rng).is_empty());
    }

    #[test]
    fn test_corruption_percentage() {
        let mut rng = GameRng::seeded(11);
        let mut board = Board::new(&mut rng);
        assert_eq!(board.corruption_percentage(), 0.0);
        assert!(board.place_tile(tile_at(3, 2, STARTING_FLOOR, 90, PathTileType::Basic), &mut rng));
        assert!(board.corrupt_tile(90));
        assert_approx_eq::assert_approx_eq!(board.corruption_percentage(), 0.5);
    }

    #[test]
    fn test_board_snapshot_roundtrip() {
        let mut rng = GameRng::seeded(30);
        let mut board = Board::new(&mut rng);
        assert!(board.place_tile(tile_at(3, 2, STARTING_FLOOR, 91, PathTileType::Basic), &mut rng));
        assert!(board.corrupt_tile(91));

        let snapshot = board.snapshot();
        let bytes = bincode::serialize(&snapshot).unwrap();
        let decoded: BoardSnapshot = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded.corrupted_tiles, vec![91]);
        assert_eq!(decoded.floors[&STARTING_FLOOR].len(), 2);
        assert_eq!(decoded.zone_assignments.len(), snapshot.zone_assignments.len());
    }

    #[test]
    fn test_movable_checks_corruption_and_walls() {
        let mut rng = GameRng::seeded(12);
        let mut board = Board::new(&mut rng);
        let mut layout = [[SpecialSquare::Normal; 4]; 4];
        layout[0][0] = SpecialSquare::Wall;
        let position = TilePosition::new(3, 2, STARTING_FLOOR).unwrap();
        let tile = PathTile::new(100, PathTileType::Basic, position, layout, 0);
        assert!(board.place_tile(tile, &mut rng));

        let open = Position::new(3, 2, 1, 1, STARTING_FLOOR).unwrap();
        let wall = Position::new(3, 2, 0, 0, STARTING_FLOOR).unwrap();
        assert!(board.is_position_movable(&open));
        assert!(!board.is_position_movable(&wall));
        // High disorder passes walls; low does not.
        assert!(!board.can_enter(&wall, 6));
        assert!(board.can_enter(&wall, 7));

        assert!(board.corrupt_tile(100));
        assert!(!board.is_position_movable(&open));
        assert!(!board.can_enter(&wall, 10));
    }

    #[test]
    fn test_missing_tile_is_not_movable() {
        let mut rng = GameRng::seeded(13);
        let board = Board::new(&mut rng);
        let empty = Position::new(0, 0, 1, 1, STARTING_FLOOR).unwrap();
        assert!(!board.is_position_movable(&empty));
    }

    #[test]
    fn test_valid_moves_respect_budget() {
        let mut rng = GameRng::seeded(14);
        let board = Board::new(&mut rng);
        let start = Position::new(2, 2, 1, 1, STARTING_FLOOR).unwrap();

        let none = board.valid_moves_from(&start, 0, 0);
        assert!(none.is_empty());

        let one_step = board.valid_moves_from(&start, 1, 0);
        assert_eq!(one_step.len(), 8);
        assert!(!one_step.contains(&start));

        let plenty = board.valid_moves_from(&start, 10, 0);
        // Everything on the lone initial tile except the start cell.
        assert_eq!(plenty.len(), 15);
    }

    #[test]
    fn test_find_path_on_single_tile() {
        let mut rng = GameRng::seeded(15);
        let board = Board::new(&mut rng);
        let start = Position::new(2, 2, 0, 0, STARTING_FLOOR).unwrap();
        let goal = Position::new(2, 2, 3, 3, STARTING_FLOOR).unwrap();
        let path = board.find_path(&start, &goal, 0).unwrap();
        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&goal));
        // Diagonal steps allowed: 3 moves cover (3,3).
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn test_find_path_rejects_cross_floor() {
        let mut rng = GameRng::seeded(16);
        let board = Board::new(&mut rng);
        let start = Position::new(2, 2, 0, 0, 2).unwrap();
        let goal = Position::new(2, 2, 0, 0, 3).unwrap();
        assert!(board.find_path(&start, &goal, 0).is_none());
    }

    #[test]
    fn test_find_path_spans_adjacent_tiles() {
        let mut rng = GameRng::seeded(17);
        let mut board = Board::new(&mut rng);
        assert!(board.place_tile(tile_at(3, 2, STARTING_FLOOR, 110, PathTileType::Basic), &mut rng));
        let start = Position::new(2, 2, 3, 1, STARTING_FLOOR).unwrap();
        let goal = Position::new(3, 2, 2, 1, STARTING_FLOOR).unwrap();
        let path = board.find_path(&start, &goal, 0).unwrap();
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn test_find_path_none_when_goal_unreachable() {
        let mut rng = GameRng::seeded(18);
        let board = Board::new(&mut rng);
        let start = Position::new(2, 2, 0, 0, STARTING_FLOOR).unwrap();
        let goal = Position::new(0, 0, 0, 0, STARTING_FLOOR).unwrap();
        assert!(board.find_path(&start, &goal, 0).is_none());
    }

    #[test]
    fn test_layout_rotation() {
        let mut layout = [[SpecialSquare::Normal; 4]; 4];
        layout[0][0] = SpecialSquare::Wall;
        let rotated = rotate_layout(&layout);
        assert_eq!(rotated[3][0], SpecialSquare::Wall);
        assert_eq!(rotated[0][0], SpecialSquare::Normal);

        // Four rotations are the identity.
        let mut four = layout;
        for _ in 0..4 {
            four = rotate_layout(&four);
        }
        assert_eq!(four, layout);
    }

    #[test]
    fn test_entrance_points_prefer_edges() {
        let layout = [[SpecialSquare::Normal; 4]; 4];
        let position = TilePosition::new(1, 1, 2).unwrap();
        let tile = PathTile::new(1, PathTileType::Basic, position, layout, 0);
        let entrances = tile.entrance_points();
        assert!(!entrances.is_empty());
        assert!(entrances
            .iter()
            .all(|(x, y)| *x == 0 || *x == 3 || *y == 0 || *y == 3));
    }

    #[test]
    fn test_escape_exit_registry() {
        let mut rng = GameRng::seeded(19);
        let mut board = Board::new(&mut rng);
        let exit = TilePosition::new(1, 1, 5).unwrap();
        board.add_escape_exit(exit);
        board.add_escape_exit(exit);
        assert_eq!(board.escape_exits().len(), 1);
        assert!(board.is_escape_exit(exit));
    }
}
