//! Board geometry for the Game of the Amazons.
//!
//! Coordinates are 1-based (row, col) on an 11x11 index grid; row 0 and
//! column 0 are unused padding so that `index = row * 11 + col` matches the
//! wire format used by game servers. Playable squares are rows and columns
//! 1..=10.

/// Width of the index grid (one larger than the playable board).
pub const GRID: usize = 11;

/// Total number of grid slots, including the unused row/column 0 padding.
pub const TILE_COUNT: usize = GRID * GRID;

/// The eight queen-move directions as (row, col) steps.
pub const DIRECTIONS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Contents of a single board square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tile {
    Empty = 0,
    White = 1,
    Black = 2,
    Arrow = 3,
}

impl Tile {
    /// The queen tile belonging to `side`.
    pub fn queen_of(side: Side) -> Tile {
        match side {
            Side::White => Tile::White,
            Side::Black => Tile::Black,
        }
    }

    pub fn is_empty(self) -> bool {
        self == Tile::Empty
    }
}

/// One of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

/// A 1-based (row, col) square on the board.
///
/// Positions are plain coordinates; they may name an off-board square (row or
/// column 0, or past 10). Callers that need a playable square check
/// [`Position::on_board`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub const fn new(row: u8, col: u8) -> Position {
        Position { row, col }
    }

    /// Recover the (row, col) pair from a flat grid index.
    pub fn from_index(index: usize) -> Position {
        Position {
            row: (index / GRID) as u8,
            col: (index % GRID) as u8,
        }
    }

    /// Flat index into the 11x11 grid.
    pub fn index(self) -> usize {
        self.row as usize * GRID + self.col as usize
    }

    /// Whether the square is inside the playable 10x10 area.
    pub fn on_board(self) -> bool {
        let in_range = |v: u8| v >= 1 && v <= 10;
        in_range(self.row) && in_range(self.col)
    }

    /// Step by (dr, dc), returning `None` when the step leaves the playable
    /// area.
    pub fn offset(self, dr: i8, dc: i8) -> Option<Position> {
        let row = self.row as i16 + dr as i16;
        let col = self.col as i16 + dc as i16;
        let next = Position {
            row: row as u8,
            col: col as u8,
        };
        if (1..=10).contains(&row) && (1..=10).contains(&col) {
            Some(next)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for row in 1..=10u8 {
            for col in 1..=10u8 {
                let pos = Position::new(row, col);
                assert_eq!(Position::from_index(pos.index()), pos);
            }
        }
    }

    #[test]
    fn test_index_matches_wire_layout() {
        // index = row * 11 + col, the layout the server messages use
        assert_eq!(Position::new(1, 1).index(), 12);
        assert_eq!(Position::new(10, 10).index(), 120);
        assert_eq!(Position::new(4, 7).index(), 51);
    }

    #[test]
    fn test_on_board_bounds() {
        assert!(Position::new(1, 1).on_board());
        assert!(Position::new(10, 10).on_board());
        assert!(!Position::new(0, 5).on_board());
        assert!(!Position::new(5, 0).on_board());
        assert!(!Position::new(11, 5).on_board());
    }

    #[test]
    fn test_offset_stops_at_edges() {
        let corner = Position::new(1, 1);
        assert_eq!(corner.offset(-1, 0), None);
        assert_eq!(corner.offset(0, -1), None);
        assert_eq!(corner.offset(1, 1), Some(Position::new(2, 2)));

        let far = Position::new(10, 10);
        assert_eq!(far.offset(1, 0), None);
        assert_eq!(far.offset(0, 1), None);
    }

    #[test]
    fn test_side_opponent() {
        assert_eq!(Side::White.opponent(), Side::Black);
        assert_eq!(Side::Black.opponent(), Side::White);
    }
}
