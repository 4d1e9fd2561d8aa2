use super::board::Cell;

/// One of the two sides. Red is the human and always opens; Yellow is the
/// remote model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Player {
    Red,
    Yellow,
}

impl Player {
    /// Get the other player
    pub fn other(self) -> Player {
        match self {
            Player::Red => Player::Yellow,
            Player::Yellow => Player::Red,
        }
    }

    /// Convert player to cell type
    pub fn to_cell(self) -> Cell {
        match self {
            Player::Red => Cell::Red,
            Player::Yellow => Cell::Yellow,
        }
    }

    /// Get player name for display
    pub fn name(self) -> &'static str {
        match self {
            Player::Red => "Red",
            Player::Yellow => "Yellow",
        }
    }

    /// Integer used by the inference service: `1` for Red, `-1` for Yellow.
    pub fn to_wire(self) -> i8 {
        match self {
            Player::Red => 1,
            Player::Yellow => -1,
        }
    }

    pub fn from_wire(value: i8) -> Option<Player> {
        match value {
            1 => Some(Player::Red),
            -1 => Some(Player::Yellow),
            _ => None,
        }
    }
}

impl From<Player> for i8 {
    fn from(player: Player) -> i8 {
        player.to_wire()
    }
}

impl TryFrom<i8> for Player {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        Player::from_wire(value).ok_or_else(|| format!("invalid player value {value} (expected 1 or -1)"))
    }
}
