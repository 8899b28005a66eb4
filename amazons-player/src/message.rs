//! Outbound move encoding and the transmission seam.

use std::error::Error;

use serde::{Deserialize, Serialize};

use amazons_core::{Move, Position};

/// Wire form of a move: three (row, col) pairs, serialized as two-element
/// arrays under the game server's field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveMessage {
    #[serde(rename = "queen-position-current")]
    pub queen_current: (u8, u8),

    #[serde(rename = "queen-position-next")]
    pub queen_next: (u8, u8),

    #[serde(rename = "arrow-position")]
    pub arrow: (u8, u8),
}

impl MoveMessage {
    pub fn from_move(mv: &Move) -> MoveMessage {
        MoveMessage {
            queen_current: (mv.start.row, mv.start.col),
            queen_next: (mv.target.row, mv.target.col),
            arrow: (mv.arrow.row, mv.arrow.col),
        }
    }

    pub fn to_move(&self) -> Move {
        Move::new(
            Position::new(self.queen_current.0, self.queen_current.1),
            Position::new(self.queen_next.0, self.queen_next.1),
            Position::new(self.arrow.0, self.arrow.1),
        )
    }
}

/// Receives the engine's chosen move. Implemented by whatever owns the
/// connection to the game server; a failing sink is logged by the
/// session, never fatal.
pub trait MoveSink: Send + Sync {
    fn send(&self, message: &MoveMessage) -> Result<(), Box<dyn Error + Send + Sync>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_round_trips_through_message() {
        let mv = Move::new(
            Position::new(4, 1),
            Position::new(6, 3),
            Position::new(6, 9),
        );
        let message = MoveMessage::from_move(&mv);
        assert_eq!(message.to_move(), mv);
    }

    #[test]
    fn test_serialized_field_names() {
        let message = MoveMessage {
            queen_current: (1, 4),
            queen_next: (5, 4),
            arrow: (5, 8),
        };
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(
            json,
            r#"{"queen-position-current":[1,4],"queen-position-next":[5,4],"arrow-position":[5,8]}"#
        );

        let parsed: MoveMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, message);
    }
}
