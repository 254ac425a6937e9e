// DraftKings classic lineup: roster slots, slot assignment, and lineup
// aggregates (salary, projection, stack labels).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::PlayerCatalog;
use crate::player::{PlayerId, Position};

pub const DK_SALARY_CAP: u32 = 50_000;
pub const ROSTER_SIZE: usize = 9;

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// A classic roster slot, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slot {
    #[serde(rename = "QB")]
    Qb,
    #[serde(rename = "RB1")]
    Rb1,
    #[serde(rename = "RB2")]
    Rb2,
    #[serde(rename = "WR1")]
    Wr1,
    #[serde(rename = "WR2")]
    Wr2,
    #[serde(rename = "WR3")]
    Wr3,
    #[serde(rename = "TE")]
    Te,
    #[serde(rename = "FLEX")]
    Flex,
    #[serde(rename = "DST")]
    Dst,
}

impl Slot {
    pub const ALL: [Slot; ROSTER_SIZE] = [
        Slot::Qb,
        Slot::Rb1,
        Slot::Rb2,
        Slot::Wr1,
        Slot::Wr2,
        Slot::Wr3,
        Slot::Te,
        Slot::Flex,
        Slot::Dst,
    ];

    /// The dedicated position of this slot, `None` for FLEX.
    pub fn position(&self) -> Option<Position> {
        match self {
            Slot::Qb => Some(Position::Quarterback),
            Slot::Rb1 | Slot::Rb2 => Some(Position::RunningBack),
            Slot::Wr1 | Slot::Wr2 | Slot::Wr3 => Some(Position::WideReceiver),
            Slot::Te => Some(Position::TightEnd),
            Slot::Flex => None,
            Slot::Dst => Some(Position::Defense),
        }
    }

    pub fn accepts(&self, pos: Position) -> bool {
        match self.position() {
            Some(p) => p == pos,
            None => pos.is_flex_eligible(),
        }
    }

    /// Column label as DraftKings writes it (`RB`, not `RB1`).
    pub fn label(&self) -> &'static str {
        match self {
            Slot::Qb => "QB",
            Slot::Rb1 | Slot::Rb2 => "RB",
            Slot::Wr1 | Slot::Wr2 | Slot::Wr3 => "WR",
            Slot::Te => "TE",
            Slot::Flex => "FLEX",
            Slot::Dst => "DST",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Roster (slot assignment)
// ---------------------------------------------------------------------------

/// A single slot on a roster under construction.
#[derive(Debug, Clone, Copy)]
pub struct RosterSlot {
    pub slot: Slot,
    /// Catalog index of the player occupying this slot, if any.
    pub player: Option<usize>,
}

/// An in-progress roster. Used by slot assignment and by the field
/// generator to know which positions it can still draw.
#[derive(Debug, Clone)]
pub struct Roster {
    pub slots: [RosterSlot; ROSTER_SIZE],
}

impl Default for Roster {
    fn default() -> Self {
        Roster::new()
    }
}

impl Roster {
    pub fn new() -> Self {
        Roster {
            slots: Slot::ALL.map(|slot| RosterSlot { slot, player: None }),
        }
    }

    /// Whether a player at `pos` still has somewhere to go.
    pub fn has_room_for(&self, pos: Position) -> bool {
        self.slots
            .iter()
            .any(|s| s.player.is_none() && s.slot.accepts(pos))
    }

    /// Add a player to the roster.
    ///
    /// Slot assignment priority:
    /// 1. Dedicated position slot
    /// 2. FLEX (RB/WR/TE only)
    ///
    /// Returns `true` if the player was placed, `false` if no slot is open.
    pub fn add_player(&mut self, idx: usize, pos: Position) -> bool {
        if let Some(slot) = self
            .slots
            .iter_mut()
            .find(|s| s.player.is_none() && s.slot.position() == Some(pos))
        {
            slot.player = Some(idx);
            return true;
        }

        if pos.is_flex_eligible() {
            if let Some(slot) = self
                .slots
                .iter_mut()
                .find(|s| s.player.is_none() && s.slot == Slot::Flex)
            {
                slot.player = Some(idx);
                return true;
            }
        }

        false
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.slots.iter().any(|s| s.player == Some(idx))
    }

    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.player.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.filled_count() == ROSTER_SIZE
    }

    /// Freeze a full roster into a lineup.
    pub fn into_lineup(self) -> Option<Lineup> {
        let mut players = [0usize; ROSTER_SIZE];
        for (out, slot) in players.iter_mut().zip(self.slots.iter()) {
            *out = slot.player?;
        }
        Some(Lineup { players })
    }
}

// ---------------------------------------------------------------------------
// Lineup
// ---------------------------------------------------------------------------

/// A complete lineup: catalog indices in `Slot::ALL` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lineup {
    players: [usize; ROSTER_SIZE],
}

impl Lineup {
    /// Assign a set of nine distinct players to slots. Players are placed by
    /// position, higher salary first, so the cheapest surplus RB/WR/TE lands
    /// in FLEX. Returns `None` if the set cannot fill the roster exactly.
    pub fn from_players(catalog: &PlayerCatalog, players: &[usize]) -> Option<Self> {
        if players.len() != ROSTER_SIZE {
            return None;
        }
        let mut ordered: Vec<usize> = players.to_vec();
        ordered.sort_by(|&a, &b| {
            let pa = catalog.player(a);
            let pb = catalog.player(b);
            pa.position
                .sort_order()
                .cmp(&pb.position.sort_order())
                .then(pb.salary.cmp(&pa.salary))
                .then(a.cmp(&b))
        });
        ordered.dedup();
        if ordered.len() != ROSTER_SIZE {
            return None;
        }

        let mut roster = Roster::new();
        for idx in ordered {
            if !roster.add_player(idx, catalog.player(idx).position) {
                return None;
            }
        }
        roster.into_lineup()
    }

    /// Resolve player IDs (as a custom lineup is entered) and assign slots.
    pub fn from_ids(catalog: &PlayerCatalog, ids: &[PlayerId]) -> Option<Self> {
        let players: Option<Vec<usize>> = ids.iter().map(|id| catalog.index_of(*id)).collect();
        Lineup::from_players(catalog, &players?)
    }

    pub fn players(&self) -> &[usize; ROSTER_SIZE] {
        &self.players
    }

    /// `(slot, catalog index)` pairs in display order.
    pub fn slots(&self) -> impl Iterator<Item = (Slot, usize)> + '_ {
        Slot::ALL.iter().copied().zip(self.players.iter().copied())
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.players.contains(&idx)
    }

    /// Player IDs in slot order.
    pub fn ids(&self, catalog: &PlayerCatalog) -> Vec<PlayerId> {
        self.players.iter().map(|&i| catalog.player(i).id).collect()
    }

    pub fn salary(&self, catalog: &PlayerCatalog) -> u32 {
        self.players.iter().map(|&i| catalog.player(i).salary).sum()
    }

    pub fn fpts(&self, catalog: &PlayerCatalog) -> f64 {
        self.players.iter().map(|&i| catalog.player(i).fpts).sum()
    }

    pub fn ownership_sum(&self, catalog: &PlayerCatalog) -> f64 {
        self.players.iter().map(|&i| catalog.player(i).ownership).sum()
    }

    pub fn ceiling(&self, catalog: &PlayerCatalog) -> f64 {
        self.players.iter().map(|&i| catalog.player(i).ceiling).sum()
    }

    /// Number of players shared with `other`.
    pub fn overlap(&self, other: &Lineup) -> usize {
        self.players.iter().filter(|i| other.contains(**i)).count()
    }

    /// The quarterback's catalog index.
    pub fn qb(&self) -> usize {
        self.players[0]
    }

    /// The defense's catalog index.
    pub fn dst(&self) -> usize {
        self.players[ROSTER_SIZE - 1]
    }

    /// QB stack label `QB+n|m`: `n` skill players on the QB's team and `m`
    /// skill players from the QB's opponent.
    pub fn stack_label(&self, catalog: &PlayerCatalog) -> String {
        let qb = catalog.player(self.qb());
        let opponent = qb.opponent();
        let mut same = 0;
        let mut opp = 0;
        for &i in &self.players {
            let p = catalog.player(i);
            if !p.position.is_skill() {
                continue;
            }
            if p.team == qb.team {
                same += 1;
            } else if opponent.is_some_and(|o| o.eq_ignore_ascii_case(&p.team)) {
                opp += 1;
            }
        }
        format!("QB+{same}|{opp}")
    }

    /// The two largest same-team groups of non-DST players, as
    /// `"<TEAM> <count>"`, or `"No Stack"` for groups smaller than two.
    pub fn team_stacks(&self, catalog: &PlayerCatalog) -> (String, String) {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for &i in &self.players {
            let p = catalog.player(i);
            if p.position != Position::Defense {
                *counts.entry(p.team.as_str()).or_default() += 1;
            }
        }
        let mut groups: Vec<(&str, usize)> = counts.into_iter().filter(|(_, n)| *n >= 2).collect();
        groups.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

        let label = |g: Option<&(&str, usize)>| match g {
            Some((team, n)) => format!("{team} {n}"),
            None => "No Stack".to_string(),
        };
        (label(groups.first()), label(groups.get(1)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Player;

    const PHI_DAL: &str = "PHI@DAL 10/27/2024 04:25PM ET";
    const BUF_MIA: &str = "BUF@MIA 10/27/2024 01:00PM ET";

    fn p(id: u64, team: &str, pos: Position, salary: u32, game: &str) -> Player {
        Player {
            id: PlayerId(id),
            name: format!("Player {id}"),
            team: team.into(),
            position: pos,
            salary,
            fpts: salary as f64 / 500.0,
            game_info: game.into(),
            ownership: 1.0,
            std_dev: 0.0,
            ceiling: 2.0,
        }
    }

    /// Indices 0..=9: QB PHI, RB PHI, RB BUF, RB DAL, WR PHI, WR DAL, WR MIA,
    /// WR BUF, TE PHI, DST DAL.
    fn catalog() -> PlayerCatalog {
        use Position::*;
        PlayerCatalog::new(vec![
            p(1, "PHI", Quarterback, 7000, PHI_DAL),
            p(2, "PHI", RunningBack, 8000, PHI_DAL),
            p(3, "BUF", RunningBack, 6000, BUF_MIA),
            p(4, "DAL", RunningBack, 4000, PHI_DAL),
            p(5, "PHI", WideReceiver, 7500, PHI_DAL),
            p(6, "DAL", WideReceiver, 8200, PHI_DAL),
            p(7, "MIA", WideReceiver, 5000, BUF_MIA),
            p(8, "BUF", WideReceiver, 3000, BUF_MIA),
            p(9, "PHI", TightEnd, 3500, PHI_DAL),
            p(10, "DAL", Defense, 2500, PHI_DAL),
        ])
        .unwrap()
    }

    #[test]
    fn roster_prefers_dedicated_slot_then_flex() {
        let mut roster = Roster::new();
        assert!(roster.add_player(1, Position::RunningBack));
        assert!(roster.add_player(2, Position::RunningBack));
        assert!(roster.add_player(3, Position::RunningBack));
        assert_eq!(roster.slots[7].player, Some(3));
        assert!(!roster.add_player(4, Position::RunningBack));
        assert!(!roster.has_room_for(Position::RunningBack));
        assert!(roster.has_room_for(Position::TightEnd));
        assert!(roster.add_player(5, Position::Quarterback));
        assert_eq!(roster.slots[0].player, Some(5));
    }

    #[test]
    fn from_players_orders_slots() {
        let cat = catalog();
        let lineup = Lineup::from_players(&cat, &[9, 8, 7, 6, 5, 4, 3, 1, 0]).unwrap();
        let ids: Vec<u64> = lineup.ids(&cat).iter().map(|id| id.0).collect();
        // QB, RB (8000), RB (4000), WR x3 by salary, TE, FLEX = cheapest WR, DST
        assert_eq!(ids, vec![1, 2, 4, 6, 5, 7, 9, 8, 10]);
        assert_eq!(lineup.salary(&cat), 7000 + 8000 + 4000 + 7500 + 8200 + 5000 + 3000 + 3500 + 2500);
        assert!((lineup.ceiling(&cat) - 18.0).abs() < 1e-9);
        assert!((lineup.ownership_sum(&cat) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn from_players_rejects_bad_sets() {
        let cat = catalog();
        // Only eight players.
        assert!(Lineup::from_players(&cat, &[9, 8, 7, 6, 5, 4, 3, 1]).is_none());
        // Duplicate player.
        assert!(Lineup::from_players(&cat, &[9, 8, 7, 6, 5, 4, 3, 1, 1]).is_none());
        // No QB: the fourth receiver has nowhere to go.
        assert!(Lineup::from_players(&cat, &[9, 8, 7, 6, 5, 4, 3, 2, 1]).is_none());
    }

    #[test]
    fn stack_label_counts_teammates_and_bring_backs() {
        let cat = catalog();
        let lineup = Lineup::from_players(&cat, &[0, 1, 3, 4, 5, 6, 8, 7, 9]).unwrap();
        // PHI skill: RB 2, WR 5, TE 9 -> 3; DAL skill: RB 4, WR 6 -> 2.
        assert_eq!(lineup.stack_label(&cat), "QB+3|2");
        let (s1, s2) = lineup.team_stacks(&cat);
        assert_eq!(s1, "PHI 4");
        assert_eq!(s2, "DAL 2");
    }

    #[test]
    fn overlap_counts_shared_players() {
        let cat = catalog();
        let a = Lineup::from_players(&cat, &[0, 1, 3, 4, 5, 6, 8, 7, 9]).unwrap();
        let b = Lineup::from_players(&cat, &[0, 1, 2, 4, 5, 6, 8, 7, 9]).unwrap();
        assert_eq!(a.overlap(&b), 8);
        assert_eq!(a.overlap(&a), ROSTER_SIZE);
    }

    #[test]
    fn slot_wire_names() {
        assert_eq!(serde_json::to_string(&Slot::Rb2).unwrap(), r#""RB2""#);
        assert_eq!(Slot::Rb2.label(), "RB");
        assert!(Slot::Flex.accepts(Position::TightEnd));
        assert!(!Slot::Flex.accepts(Position::Quarterback));
    }
}
