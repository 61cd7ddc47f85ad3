use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

pub const ROOM_SIZE: i32 = 50;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RoomType {
    Highway,
    Core,
    SourceKeeper,
    Controller,
}

/// Room coordinates on the world grid. `E0` is x = 0 and `W0` is x = -1, `S0` is
/// y = 0 and `N0` is y = -1, so that rooms tile the plane without a gap.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomName {
    x: i32,
    y: i32,
}

impl RoomName {
    pub fn new(name: &str) -> Result<RoomName, String> {
        Self::parse(name).ok_or_else(|| format!("Invalid room name: {}", name))
    }

    pub fn from_coords(x: i32, y: i32) -> RoomName {
        RoomName { x, y }
    }

    fn parse(name: &str) -> Option<RoomName> {
        if !name.is_ascii() {
            return None;
        }

        let bytes = name.as_bytes();

        let horizontal = *bytes.first()?;

        let vertical_index = name[1..].find(|c: char| c == 'N' || c == 'S' || c == 'n' || c == 's')? + 1;

        let x_value = Self::parse_number(&name[1..vertical_index])?;
        let y_value = Self::parse_number(&name[vertical_index + 1..])?;

        let x = match horizontal {
            b'E' | b'e' => x_value,
            b'W' | b'w' => -x_value - 1,
            _ => return None,
        };

        let y = match bytes[vertical_index] {
            b'S' | b's' => y_value,
            b'N' | b'n' => -y_value - 1,
            _ => return None,
        };

        Some(RoomName { x, y })
    }

    /// Digits only, small enough that the mirrored west or north coordinate still fits.
    fn parse_number(digits: &str) -> Option<i32> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let value: u32 = digits.parse().ok()?;

        i32::try_from(value).ok()
    }

    pub fn x_coord(&self) -> i32 {
        self.x
    }

    pub fn y_coord(&self) -> i32 {
        self.y
    }

    /// The numbers as they appear in the name, e.g. (5, 12) for `W5N12`.
    pub fn name_numbers(&self) -> (u32, u32) {
        let x = if self.x >= 0 { self.x } else { -self.x - 1 };
        let y = if self.y >= 0 { self.y } else { -self.y - 1 };

        (x as u32, y as u32)
    }

    pub fn linear_distance(&self, other: RoomName) -> u32 {
        (self.x - other.x).unsigned_abs().max((self.y - other.y).unsigned_abs())
    }

    pub fn room_type(&self) -> RoomType {
        let (x, y) = self.name_numbers();
        let (x_mod, y_mod) = (x % 10, y % 10);

        if x_mod == 0 || y_mod == 0 {
            RoomType::Highway
        } else if x_mod == 5 && y_mod == 5 {
            RoomType::Core
        } else if (4..=6).contains(&x_mod) && (4..=6).contains(&y_mod) {
            RoomType::SourceKeeper
        } else {
            RoomType::Controller
        }
    }

    pub fn is_highway(&self) -> bool {
        self.room_type() == RoomType::Highway
    }

    pub fn is_source_keeper(&self) -> bool {
        self.room_type() == RoomType::SourceKeeper
    }

    /// Rooms sharing an edge with this room, in top, right, bottom, left order.
    pub fn neighbors(&self) -> [RoomName; 4] {
        [
            RoomName::from_coords(self.x, self.y - 1),
            RoomName::from_coords(self.x + 1, self.y),
            RoomName::from_coords(self.x, self.y + 1),
            RoomName::from_coords(self.x - 1, self.y),
        ]
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y) = self.name_numbers();
        let horizontal = if self.x >= 0 { 'E' } else { 'W' };
        let vertical = if self.y >= 0 { 'S' } else { 'N' };

        write!(f, "{}{}{}{}", horizontal, x, vertical, y)
    }
}

impl fmt::Debug for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for RoomName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoomName::new(s)
    }
}

impl TryFrom<String> for RoomName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RoomName::new(&value)
    }
}

impl From<RoomName> for String {
    fn from(value: RoomName) -> String {
        value.to_string()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Top = 1,
    TopRight = 2,
    Right = 3,
    BottomRight = 4,
    Bottom = 5,
    BottomLeft = 6,
    Left = 7,
    TopLeft = 8,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Top,
        Direction::TopRight,
        Direction::Right,
        Direction::BottomRight,
        Direction::Bottom,
        Direction::BottomLeft,
        Direction::Left,
        Direction::TopLeft,
    ];

    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Top => (0, -1),
            Direction::TopRight => (1, -1),
            Direction::Right => (1, 0),
            Direction::BottomRight => (1, 1),
            Direction::Bottom => (0, 1),
            Direction::BottomLeft => (-1, 1),
            Direction::Left => (-1, 0),
            Direction::TopLeft => (-1, -1),
        }
    }

    pub fn from_offset(dx: i32, dy: i32) -> Option<Direction> {
        Direction::ALL.iter().copied().find(|d| d.offset() == (dx.signum(), dy.signum()))
    }

    pub fn to_digit(self) -> char {
        char::from(b'0' + self as u8)
    }

    pub fn from_digit(c: char) -> Option<Direction> {
        let value = c.to_digit(10)?;

        Direction::ALL.get((value as usize).checked_sub(1)?).copied()
    }

    pub fn reverse(self) -> Direction {
        let (dx, dy) = self.offset();

        Direction::from_offset(-dx, -dy).unwrap_or(self)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: u8,
    pub y: u8,
    pub room: RoomName,
}

impl Position {
    pub fn new(x: u8, y: u8, room: RoomName) -> Position {
        Position { x, y, room }
    }

    pub fn world_x(&self) -> i32 {
        self.room.x_coord() * ROOM_SIZE + self.x as i32
    }

    pub fn world_y(&self) -> i32 {
        self.room.y_coord() * ROOM_SIZE + self.y as i32
    }

    pub fn from_world(world_x: i32, world_y: i32) -> Position {
        let room = RoomName::from_coords(world_x.div_euclid(ROOM_SIZE), world_y.div_euclid(ROOM_SIZE));

        Position {
            x: world_x.rem_euclid(ROOM_SIZE) as u8,
            y: world_y.rem_euclid(ROOM_SIZE) as u8,
            room,
        }
    }

    pub fn range_to(&self, other: &Position) -> u32 {
        (self.world_x() - other.world_x())
            .unsigned_abs()
            .max((self.world_y() - other.world_y()).unsigned_abs())
    }

    pub fn in_range_to(&self, other: &Position, range: u32) -> bool {
        self.range_to(other) <= range
    }

    pub fn is_near_to(&self, other: &Position) -> bool {
        self.in_range_to(other, 1)
    }

    /// True when within `range` tiles of a room edge.
    pub fn is_near_exit(&self, range: u8) -> bool {
        let max = (ROOM_SIZE - 1) as u8;

        self.x <= range || self.y <= range || self.x >= max.saturating_sub(range) || self.y >= max.saturating_sub(range)
    }

    pub fn is_edge(&self) -> bool {
        self.is_near_exit(0)
    }

    pub fn position_at_direction(&self, direction: Direction) -> Position {
        let (dx, dy) = direction.offset();

        Position::from_world(self.world_x() + dx, self.world_y() + dy)
    }

    pub fn direction_to(&self, other: &Position) -> Option<Direction> {
        Direction::from_offset(other.world_x() - self.world_x(), other.world_y() - self.world_y())
    }

    pub fn neighbors(&self) -> impl Iterator<Item = Position> + '_ {
        Direction::ALL.iter().map(move |d| self.position_at_direction(*d))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[room {} pos {},{}]", self.room, self.x, self.y)
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
