use serde::{Deserialize, Serialize};

/// Opaque identifier for a connected client, issued at WebSocket upgrade.
/// Lives exactly as long as the connection; never persisted.
pub type PlayerId = uuid::Uuid;

/// The role a player is assigned when a game starts. Black moves first.
///
/// Wire values are `1` (Black) and `2` (White) so the tic-tac-toe client can
/// map them to X/O without a separate role type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Stone {
    Black,
    White,
}

impl Stone {
    pub fn opponent(self) -> Stone {
        match self {
            Stone::Black => Stone::White,
            Stone::White => Stone::Black,
        }
    }
}

impl From<Stone> for u8 {
    fn from(stone: Stone) -> u8 {
        match stone {
            Stone::Black => 1,
            Stone::White => 2,
        }
    }
}

impl TryFrom<u8> for Stone {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Stone::Black),
            2 => Ok(Stone::White),
            other => Err(format!("invalid stone value: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stones_are_complementary() {
        assert_eq!(Stone::Black.opponent(), Stone::White);
        assert_eq!(Stone::White.opponent(), Stone::Black);
    }

    #[test]
    fn wire_values_are_one_and_two() {
        assert_eq!(u8::from(Stone::Black), 1);
        assert_eq!(u8::from(Stone::White), 2);
        assert_eq!(Stone::try_from(1).unwrap(), Stone::Black);
        assert_eq!(Stone::try_from(2).unwrap(), Stone::White);
        assert!(Stone::try_from(0).is_err());
        assert!(Stone::try_from(3).is_err());
    }
}
