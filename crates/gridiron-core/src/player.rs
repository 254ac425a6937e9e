// Player entity and position model for the DraftKings NFL classic slate.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::lenient;

// ---------------------------------------------------------------------------
// Player IDs
// ---------------------------------------------------------------------------

/// DraftKings player ID. Serialized as a bare number; accepted as either a
/// number or a numeric string so IDs scraped from table cells round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

impl Serialize for PlayerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient::number(deserializer).map(PlayerId)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Player positions on an NFL classic slate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Position {
    Quarterback,
    RunningBack,
    WideReceiver,
    TightEnd,
    Defense,
}

impl Position {
    pub const ALL: [Position; 5] = [
        Position::Quarterback,
        Position::RunningBack,
        Position::WideReceiver,
        Position::TightEnd,
        Position::Defense,
    ];

    /// Parse a position string into a Position enum.
    ///
    /// Handles DraftKings-style multi-eligibility strings by taking the first
    /// token ("RB/FLEX" -> RunningBack) and the common defense spellings
    /// ("DST", "D/ST", "DEF", "D").
    pub fn from_str_pos(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        if upper == "D/ST" {
            return Some(Position::Defense);
        }
        let first = upper.split('/').next().unwrap_or("").trim();
        match first {
            "QB" => Some(Position::Quarterback),
            "RB" => Some(Position::RunningBack),
            "WR" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            "DST" | "DEF" | "D" => Some(Position::Defense),
            _ => None,
        }
    }

    /// Return the display string for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Defense => "DST",
        }
    }

    /// Whether this position can fill the FLEX slot.
    pub fn is_flex_eligible(&self) -> bool {
        matches!(
            self,
            Position::RunningBack | Position::WideReceiver | Position::TightEnd
        )
    }

    /// Whether this is an offensive skill position (RB/WR/TE).
    pub fn is_skill(&self) -> bool {
        self.is_flex_eligible()
    }

    /// Deterministic ordering index for lineup display.
    pub fn sort_order(&self) -> u8 {
        match self {
            Position::Quarterback => 0,
            Position::RunningBack => 1,
            Position::WideReceiver => 2,
            Position::TightEnd => 3,
            Position::Defense => 4,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.display_str())
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Position::from_str_pos(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown position {raw:?}")))
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A player on the slate. Field names follow the `players.json` contract the
/// rule-builder UI consumes, so catalogs round-trip without renaming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    #[serde(rename = "ID")]
    pub id: PlayerId,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Team")]
    pub team: String,
    #[serde(rename = "Position")]
    pub position: Position,
    #[serde(rename = "Salary", deserialize_with = "lenient::number")]
    pub salary: u32,
    #[serde(rename = "Fpts", default, deserialize_with = "lenient_f64")]
    pub fpts: f64,
    #[serde(rename = "GameInfo", default)]
    pub game_info: String,
    #[serde(rename = "Ownership", default, deserialize_with = "lenient_f64")]
    pub ownership: f64,
    #[serde(rename = "StdDev", default, deserialize_with = "lenient_f64")]
    pub std_dev: f64,
    #[serde(rename = "Ceiling", default, deserialize_with = "lenient_f64")]
    pub ceiling: f64,
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value: Option<f64> = lenient::option_number(deserializer)?;
    Ok(value.filter(|v| v.is_finite()).unwrap_or(0.0))
}

impl Player {
    /// The matchup token of the game info, e.g. `"PHI@DAL"` from
    /// `"PHI@DAL 10/27/2024 04:25PM ET"`.
    pub fn matchup(&self) -> Option<&str> {
        matchup_token(&self.game_info)
    }

    /// The opposing team code, if the game info names this player's team.
    pub fn opponent(&self) -> Option<&str> {
        let (away, home) = split_matchup(self.matchup()?)?;
        if away.eq_ignore_ascii_case(&self.team) {
            Some(home)
        } else if home.eq_ignore_ascii_case(&self.team) {
            Some(away)
        } else {
            None
        }
    }

    /// Whether `other` is on the opposing side of this player's game.
    pub fn faces(&self, other: &Player) -> bool {
        self.opponent()
            .is_some_and(|opp| opp.eq_ignore_ascii_case(&other.team))
            && self.matchup() == other.matchup()
    }

    /// Whether both players play in the same game (either side).
    pub fn shares_game(&self, other: &Player) -> bool {
        match (self.matchup(), other.matchup()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// First whitespace-separated token of a DraftKings game info string.
pub fn matchup_token(game_info: &str) -> Option<&str> {
    game_info.split_whitespace().next().filter(|t| t.contains('@'))
}

/// Split `"AWY@HOM"` into its two team codes.
pub fn split_matchup(matchup: &str) -> Option<(&str, &str)> {
    let (away, home) = matchup.split_once('@')?;
    if away.is_empty() || home.is_empty() {
        return None;
    }
    Some((away, home))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
