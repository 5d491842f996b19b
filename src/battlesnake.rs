use rand::seq::SliceRandom;
use rand::Rng;
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone)]
pub struct Customizations {
    /// Hex color code used to display this Battlesnake. Must start with "#" and be 7 characters long. Example: "#888888"
    color: String,
    /// Displayed head of this Battlesnake. Example: "default"
    head: String,
    /// Displayed tail of this Battlesnake. Example: "default"
    tail: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct Info {
    /// Version of the Battlesnake API implemented by this Battlesnake. Currently only API version 1 is valid. Example: "1"
    apiversion: String,
    /// Username of the author of this Battlesnake. If provided, this will be used to verify ownership. Example: "BattlesnakeOfficial"
    author: String,
    /// The collection of customizations applied to this Battlesnake that represent how it is viewed.
    #[serde(flatten)]
    customizations: Customizations,
    /// A version number or tag for your snake.
    version: String,
}

#[derive(Debug, EnumIter, Serialize, Deserialize, JsonSchema, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn shift(&self, coord: &Coord) -> Coord {
        match self {
            Direction::Up => Coord {
                x: coord.x,
                y: coord.y + 1,
            },
            Direction::Down => Coord {
                x: coord.x,
                y: coord.y - 1,
            },
            Direction::Left => Coord {
                x: coord.x - 1,
                y: coord.y,
            },
            Direction::Right => Coord {
                x: coord.x + 1,
                y: coord.y,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RulesetSettings {
    /// Percentage chance of spawning a new food every round.
    food_spawn_chance: u32,
    /// Minimum food to keep on the board every turn.
    minimum_food: u32,
    /// Health damage a snake will take when ending its turn in a hazard. This stacks on top of the regular 1 damage a snake takes per turn.
    hazard_damage_per_turn: i32,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone)]
pub struct Ruleset {
    /// Name of the ruleset being used to run this game. Example: "standard"
    name: String,
    /// The release version of the Rules module used in this game. Example: "version": "v1.2.3"
    version: String,
    /// A collection of specific settings being used by the current game that control how the rules are applied.
    settings: RulesetSettings,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone)]
pub struct Game {
    /// A unique identifier for this Game. Example: "totally-unique-game-id"
    id: String,
    /// Information about the ruleset being used to run this game. Example: {"name": "standard", "version": "v1.2.3"}
    ruleset: Ruleset,
    /// The name of the map used to populate the game board with snakes, food, and hazards. Example: "standard"
    #[serde(default)]
    map: Option<String>,
    /// How much time your snake has to respond to requests for this Game. Example: 500
    timeout: u32,
    /// The source of this game. One of "tournament", "league", "arena", "challenge", "custom".
    #[serde(default)]
    source: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Coord {
    x: i32,
    y: i32,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone)]
pub struct Board {
    /// The number of rows in the y-axis of the game board. Example: 11
    height: i32,
    /// The number of columns in the x-axis of the game board. Example: 11
    width: i32,
    /// Array of coordinates representing food locations on the game board. Example: [{"x": 5, "y": 5}, ..., {"x": 2, "y": 6}]
    food: Vec<Coord>,
    /// Array of coordinates representing hazardous locations on the game board. These will only appear in some game modes. Example: [{"x": 0, "y": 0}, ..., {"x": 0, "y": 1}]
    hazards: Vec<Coord>,
    /// Array of Battlesnake Objects representing all Battlesnakes remaining on the game board (including yourself if you haven't been eliminated). Example: [{"id": "snake-one", ...}, ...]
    snakes: Vec<Battlesnake>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone)]
pub struct Battlesnake {
    /// Unique identifier for this Battlesnake in the context of the current Game. Example: "totally-unique-snake-id"
    id: String,
    /// Name given to this Battlesnake by its author. Example: "Sneky McSnek Face"
    name: String,
    /// Health value of this Battlesnake, between 0 and 100 inclusively. Example: 54
    health: i32,
    /// Array of coordinates representing this Battlesnake's location on the game board. This array is ordered from head to tail. Example: [{"x": 0, "y": 0}, ..., {"x": 2, "y": 0}]
    body: Vec<Coord>,
    /// The previous response time of this Battlesnake, in milliseconds. If the Battlesnake timed out and failed to respond, the game timeout will be returned (game.timeout) Example: "500"
    latency: String,
    /// Coordinates for this Battlesnake's head. Equivalent to the first element of the body array. Example: {"x": 0, "y": 0}
    head: Coord,
    /// Length of this Battlesnake from head to tail. Equivalent to the length of the body array. Example: 3
    length: u32,
    /// Message shouted by this Battlesnake on the previous turn. Example: "why are we shouting??"
    shout: String,
    /// The squad that the Battlesnake belongs to. Used to identify squad members in Squad Mode games. Example: "1"
    #[serde(default)]
    squad: String,
    /// The collection of customizations applied to this Battlesnake that represent how it is viewed.
    customizations: Customizations,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone)]
pub struct GameState {
    /// Game Object describing the game being played.
    game: Game,
    /// Turn number of the game being played (0 for new games).
    turn: u32,
    /// Board Object describing the initial state of the game board.
    board: Board,
    /// Battlesnake Object describing your Battlesnake.
    you: Battlesnake,
}

/// What a single grid cell holds. A cell has exactly one occupant; the
/// hazard flag is tracked separately and may coexist with any occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    Empty,
    Food,
    Head,
    Body,
    Tail,
}

#[derive(Debug, Clone)]
pub struct Cell {
    coord: Coord,
    occupant: Occupant,
    owner: Option<String>,
    hazard: bool,
}

/// Owned width x height arena of cells, row-major. Coordinates outside the
/// board are rejected by `in_bounds`, never stored; `get` on such a
/// coordinate is a caller bug and panics.
#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Grid {
        let mut cells = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(Cell {
                    coord: Coord { x, y },
                    occupant: Occupant::Empty,
                    owner: None,
                    hazard: false,
                });
            }
        }
        Grid {
            width,
            height,
            cells,
        }
    }

    pub fn in_bounds(&self, coord: &Coord) -> bool {
        coord.x >= 0 && coord.y >= 0 && coord.x < self.width && coord.y < self.height
    }

    fn index(&self, coord: &Coord) -> usize {
        assert!(
            self.in_bounds(coord),
            "coordinate ({}, {}) is outside the {}x{} grid",
            coord.x,
            coord.y,
            self.width,
            self.height
        );
        (coord.y * self.width + coord.x) as usize
    }

    pub fn get(&self, coord: &Coord) -> &Cell {
        &self.cells[self.index(coord)]
    }

    pub fn set_occupant(&mut self, coord: &Coord, occupant: Occupant) {
        let index = self.index(coord);
        self.cells[index].occupant = occupant;
    }

    pub fn set_owner(&mut self, coord: &Coord, id: &str) {
        let index = self.index(coord);
        self.cells[index].owner = Some(id.to_owned());
    }

    pub fn set_hazard(&mut self, coord: &Coord, hazard: bool) {
        let index = self.index(coord);
        self.cells[index].hazard = hazard;
    }

    /// In-bounds axis-aligned adjacent cells, in a fixed left, right, down,
    /// up order. The order feeds weight accumulation and must stay stable.
    pub fn neighbors(&self, coord: &Coord) -> Vec<&Cell> {
        let mut neighbors = Vec::new();
        if coord.x > 0 {
            neighbors.push(self.get(&Coord {
                x: coord.x - 1,
                y: coord.y,
            }));
        }
        if coord.x < self.width - 1 {
            neighbors.push(self.get(&Coord {
                x: coord.x + 1,
                y: coord.y,
            }));
        }
        if coord.y > 0 {
            neighbors.push(self.get(&Coord {
                x: coord.x,
                y: coord.y - 1,
            }));
        }
        if coord.y < self.height - 1 {
            neighbors.push(self.get(&Coord {
                x: coord.x,
                y: coord.y + 1,
            }));
        }
        neighbors
    }

    /// A head may move onto anything except a wall, a head, or a body.
    /// Tails and hazards are allowed here; the evaluator weighs them
    /// separately.
    pub fn is_legal_destination(&self, coord: &Coord) -> bool {
        if !self.in_bounds(coord) {
            return false;
        }
        let cell = self.get(coord);
        cell.occupant != Occupant::Head && cell.occupant != Occupant::Body
    }

    pub fn find_head(&self, id: &str) -> Option<Coord> {
        self.cells
            .iter()
            .find(|cell| cell.occupant == Occupant::Head && cell.owner.as_deref() == Some(id))
            .map(|cell| cell.coord)
    }

    pub fn find_tail(&self, id: &str) -> Option<Coord> {
        self.cells
            .iter()
            .find(|cell| cell.occupant == Occupant::Tail && cell.owner.as_deref() == Some(id))
            .map(|cell| cell.coord)
    }

    /// Every cell currently owned by the given snake. Stacked segments
    /// occupy one cell, so this is the snake's on-board length, not its
    /// reported length.
    pub fn cells_owned_by(&self, id: &str) -> Vec<Coord> {
        self.cells
            .iter()
            .filter(|cell| cell.owner.as_deref() == Some(id))
            .map(|cell| cell.coord)
            .collect()
    }

    /// Direction from `a` to `b` when they share exactly one axis; `None`
    /// for identical or diagonal coordinates.
    pub fn direction_between(a: &Coord, b: &Coord) -> Option<Direction> {
        if a.x == b.x {
            match a.y.cmp(&b.y) {
                Ordering::Less => Some(Direction::Up),
                Ordering::Greater => Some(Direction::Down),
                Ordering::Equal => None,
            }
        } else if a.y == b.y {
            if a.x < b.x {
                Some(Direction::Right)
            } else {
                Some(Direction::Left)
            }
        } else {
            None
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for y in (0..self.height).rev() {
            for x in 0..self.width {
                let cell = self.get(&Coord { x, y });
                let symbol = match cell.occupant {
                    Occupant::Head => 'H',
                    Occupant::Body => 'B',
                    Occupant::Tail => 'T',
                    Occupant::Food => 'F',
                    Occupant::Empty => {
                        if cell.hazard {
                            'x'
                        } else {
                            '.'
                        }
                    }
                };
                write!(f, "{} ", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Populates a fresh grid from a turn snapshot. Per snake the body pass
/// runs first, then the head and tail overwrites; the tail is written last
/// so a single-segment snake reads as a tail cell.
pub fn build_grid(gs: &GameState) -> Grid {
    let mut grid = Grid::new(gs.board.width, gs.board.height);
    for snake in &gs.board.snakes {
        for coord in &snake.body {
            grid.set_occupant(coord, Occupant::Body);
            grid.set_owner(coord, &snake.id);
        }
        grid.set_occupant(&snake.body[0], Occupant::Head);
        grid.set_occupant(&snake.body[snake.body.len() - 1], Occupant::Tail);
    }
    for food in &gs.board.food {
        grid.set_occupant(food, Occupant::Food);
    }
    for hazard in &gs.board.hazards {
        grid.set_hazard(hazard, true);
    }
    grid
}

const FED_TAIL_PENALTY: i32 = -100;
const HAZARD_WEIGHT_PER_DAMAGE: i32 = 10;
const SMALLER_HEAD_BONUS: i32 = 20;
const BIGGER_HEAD_PENALTY: i32 = -500;
const FOOD_AXIS_NUDGE: i32 = 1;
const CRAMPED_AREA_THRESHOLD: i32 = 20;
const CRAMPED_PENALTY_PER_CELL: i32 = 10;
const TAIL_STAYS_BELOW_LENGTH: usize = 3;
const FALLBACK_DIRECTION: Direction = Direction::Up;

/// Every one of the four directions is blocked by a wall, a head, or a
/// body. The transport layer still owes the engine an answer, so callers
/// fall back to a fixed direction when they see this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoLegalMove;

impl fmt::Display for NoLegalMove {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "no legal move available")
    }
}

impl std::error::Error for NoLegalMove {}

/// Per-direction accumulated weights plus a legality mask, indexed by the
/// direction discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveWeights {
    weights: [i32; 4],
    legal: [bool; 4],
}

impl MoveWeights {
    fn new() -> MoveWeights {
        MoveWeights {
            weights: [0; 4],
            legal: [true; 4],
        }
    }

    fn add(&mut self, direction: Direction, delta: i32) {
        self.weights[direction as usize] += delta;
    }

    fn get(&self, direction: Direction) -> i32 {
        self.weights[direction as usize]
    }

    fn mark_illegal(&mut self, direction: Direction) {
        self.legal[direction as usize] = false;
    }

    fn is_legal(&self, direction: Direction) -> bool {
        self.legal[direction as usize]
    }

    /// Highest-weighted legal direction, breaking ties uniformly at random.
    fn best(&self, rng: &mut impl Rng) -> Result<Direction, NoLegalMove> {
        let legal: Vec<Direction> = Direction::iter().filter(|d| self.is_legal(*d)).collect();
        let max = legal.iter().map(|d| self.get(*d)).max().ok_or(NoLegalMove)?;
        let tied: Vec<Direction> = legal.into_iter().filter(|d| self.get(*d) == max).collect();
        tied.choose(rng).copied().ok_or(NoLegalMove)
    }
}

/// A destination is safe when it is legal on the grid and is not the tail
/// of a snake too short to vacate it. A snake below length 3 keeps its
/// tail in place next turn, so its tail cell is a collision.
fn is_safe_destination(grid: &Grid, coord: &Coord) -> bool {
    if !grid.is_legal_destination(coord) {
        return false;
    }
    let cell = grid.get(coord);
    if cell.occupant == Occupant::Tail {
        if let Some(owner) = &cell.owner {
            if grid.cells_owned_by(owner).len() < TAIL_STAYS_BELOW_LENGTH {
                return false;
            }
        }
    }
    true
}

fn evaluate_moves(grid: &Grid, gs: &GameState) -> MoveWeights {
    let you = &gs.you;
    let head = you.head;
    let mut weights = MoveWeights::new();

    for direction in Direction::iter() {
        if !is_safe_destination(grid, &direction.shift(&head)) {
            weights.mark_illegal(direction);
        }
    }

    for neighbor in grid.neighbors(&head) {
        let toward = match Grid::direction_between(&head, &neighbor.coord) {
            Some(direction) => direction,
            None => continue,
        };
        // A tail normally vacates its cell, but not when its owner is
        // about to eat.
        if neighbor.occupant == Occupant::Tail {
            if let Some(owner) = &neighbor.owner {
                if let Some(owner_head) = grid.find_head(owner) {
                    let about_to_eat = grid
                        .neighbors(&owner_head)
                        .iter()
                        .any(|cell| cell.occupant == Occupant::Food);
                    if about_to_eat {
                        weights.add(toward, FED_TAIL_PENALTY);
                    }
                }
            }
        }
        if neighbor.hazard {
            weights.add(
                toward,
                -HAZARD_WEIGHT_PER_DAMAGE * gs.game.ruleset.settings.hazard_damage_per_turn,
            );
        }
        // Two hops out: cells an opposing head can contest next turn.
        if weights.is_legal(toward) {
            for two_hop in grid.neighbors(&neighbor.coord) {
                if two_hop.occupant != Occupant::Head {
                    continue;
                }
                if let Some(owner) = &two_hop.owner {
                    if *owner != you.id {
                        if you.length as usize > grid.cells_owned_by(owner).len() {
                            weights.add(toward, SMALLER_HEAD_BONUS);
                        } else {
                            weights.add(toward, BIGGER_HEAD_PENALTY);
                        }
                    }
                }
            }
        }
    }

    // All four comparisons run per food item; diagonal food pulls on both
    // axes at once.
    for food in &gs.board.food {
        if food.x < head.x {
            weights.add(Direction::Left, FOOD_AXIS_NUDGE);
        }
        if food.x > head.x {
            weights.add(Direction::Right, FOOD_AXIS_NUDGE);
        }
        if food.y < head.y {
            weights.add(Direction::Down, FOOD_AXIS_NUDGE);
        }
        if food.y > head.y {
            weights.add(Direction::Up, FOOD_AXIS_NUDGE);
        }
    }

    for direction in Direction::iter() {
        if !weights.is_legal(direction) {
            continue;
        }
        let dest = direction.shift(&head);
        let mut future = grid.clone();
        future.set_occupant(&head, Occupant::Body);
        future.set_occupant(&dest, Occupant::Head);
        future.set_owner(&dest, &you.id);
        let reachable = flood_fill(&future, &dest) as i32;
        if reachable < CRAMPED_AREA_THRESHOLD {
            weights.add(
                direction,
                -(CRAMPED_AREA_THRESHOLD - reachable) * CRAMPED_PENALTY_PER_CELL,
            );
        }
    }

    weights
}

/// Picks the next move for the controlled snake, or fails when no
/// direction is legal. Randomness is injected so callers can seed it.
pub fn choose_move(
    grid: &Grid,
    gs: &GameState,
    rng: &mut impl Rng,
) -> Result<Direction, NoLegalMove> {
    let weights = evaluate_moves(grid, gs);
    debug!("turn {} weights: {:?}", gs.turn, weights);
    weights.best(rng)
}

/// Counts legal cells reachable from a hypothetical head position on a
/// prepared grid clone. The frontier starts with the head and its
/// neighbors; the head cell itself is never legal, so it is never counted.
pub fn flood_fill(grid: &Grid, start: &Coord) -> usize {
    let mut visited: HashSet<Coord> = HashSet::new();
    let mut frontier: Vec<Coord> = vec![*start];
    for cell in grid.neighbors(start) {
        frontier.push(cell.coord);
    }
    while let Some(coord) = frontier.pop() {
        if visited.contains(&coord) {
            continue;
        }
        if !grid.is_legal_destination(&coord) {
            continue;
        }
        visited.insert(coord);
        for cell in grid.neighbors(&coord) {
            if !visited.contains(&cell.coord) {
                frontier.push(cell.coord);
            }
        }
    }
    visited.len()
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MoveResponse {
    /// Your Battlesnake's move for this turn. Valid moves are up, down, left, or right. Example: "up"
    #[serde(rename = "move")]
    direction: Direction,
    /// An optional message sent to all other Battlesnakes on the next turn. Must be 256 characters or less. Example: "I am moving up!"
    shout: String,
}

pub fn info() -> Info {
    let customizations = Customizations {
        color: "#2f9e44".to_owned(),
        head: "evil".to_owned(),
        tail: "bolt".to_owned(),
    };

    let result = Info {
        apiversion: "1".to_owned(),
        author: "gridlock".to_owned(),
        customizations,
        version: "0.3.1".to_owned(),
    };

    info!("{:?}", result);

    result
}

pub fn make_move(gs: GameState) -> MoveResponse {
    let grid = build_grid(&gs);
    debug!("board for turn {}:\n{}", gs.turn, grid);

    let direction = match choose_move(&grid, &gs, &mut rand::thread_rng()) {
        Ok(direction) => direction,
        Err(err) => {
            warn!(
                "{} MOVE {}: {}, falling back to {:?}",
                gs.game.id, gs.turn, err, FALLBACK_DIRECTION
            );
            FALLBACK_DIRECTION
        }
    };

    info!("{} MOVE {}: {:?}", gs.game.id, gs.turn, direction);

    MoveResponse {
        direction,
        shout: format!("moving {:?}", direction),
    }
}

pub fn start(gs: GameState) {
    info!("{} START", gs.game.id);
}

pub fn end(gs: GameState) {
    info!("{} END", gs.game.id);
}
