// Player catalog: the immutable player pool for one slate.

pub mod loader;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::warn;

use crate::error::DataError;
use crate::player::{split_matchup, Player, PlayerId, Position};
use crate::rules::Relation;

/// The player pool for a slate plus the lookup tables rules are validated
/// against. Players are addressed by their index in `players()` everywhere
/// on the hot path.
#[derive(Debug, Clone)]
pub struct PlayerCatalog {
    players: Vec<Player>,
    by_id: HashMap<PlayerId, usize>,
    by_name: HashMap<String, usize>,
    teams: BTreeSet<String>,
    matchups: BTreeMap<String, (String, String)>,
}

impl PlayerCatalog {
    /// Build a catalog, normalizing team codes to uppercase and names to
    /// trimmed form.
    ///
    /// Rejects empty pools, duplicate IDs, and players with no name or team.
    pub fn new(players: Vec<Player>) -> Result<Self, DataError> {
        if players.is_empty() {
            return Err(DataError::Empty("no players supplied".into()));
        }

        let mut normalized = Vec::with_capacity(players.len());
        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();
        let mut teams = BTreeSet::new();
        let mut matchups = BTreeMap::new();

        for (row, mut player) in players.into_iter().enumerate() {
            player.name = player.name.trim().to_string();
            player.team = player.team.trim().to_uppercase();
            player.game_info = normalize_game_info(&player.game_info);

            if player.name.is_empty() {
                return Err(DataError::MissingField { row, field: "Name" });
            }
            if player.team.is_empty() {
                return Err(DataError::MissingField { row, field: "Team" });
            }

            let idx = normalized.len();
            if by_id.insert(player.id, idx).is_some() {
                return Err(DataError::DuplicateId(player.id));
            }
            let key = player.name.to_lowercase();
            if by_name.contains_key(&key) {
                warn!(
                    "duplicate player name '{}'; name lookups resolve to the first entry",
                    player.name
                );
            } else {
                by_name.insert(key, idx);
            }

            teams.insert(player.team.clone());
            if let Some(m) = player.matchup() {
                if let Some((away, home)) = split_matchup(m) {
                    matchups
                        .entry(m.to_string())
                        .or_insert_with(|| (away.to_string(), home.to_string()));
                }
            }
            normalized.push(player);
        }

        Ok(PlayerCatalog {
            players: normalized,
            by_id,
            by_name,
            teams,
            matchups,
        })
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, idx: usize) -> &Player {
        &self.players[idx]
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn index_of(&self, id: PlayerId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.index_of(id).map(|idx| &self.players[idx])
    }

    /// Resolve a rule's player reference: numeric strings are tried as IDs
    /// first, then the reference is matched case-insensitively by name.
    pub fn resolve(&self, reference: &str) -> Option<usize> {
        let trimmed = reference.trim();
        if let Ok(id) = trimmed.parse::<u64>() {
            if let Some(idx) = self.index_of(PlayerId(id)) {
                return Some(idx);
            }
        }
        self.by_name.get(&trimmed.to_lowercase()).copied()
    }

    pub fn teams(&self) -> impl Iterator<Item = &str> {
        self.teams.iter().map(String::as_str)
    }

    pub fn has_team(&self, team: &str) -> bool {
        self.teams.contains(&team.trim().to_uppercase())
    }

    /// Matchup tokens on the slate, e.g. `"PHI@DAL"`.
    pub fn matchups(&self) -> impl Iterator<Item = &str> {
        self.matchups.keys().map(String::as_str)
    }

    pub fn has_matchup(&self, matchup: &str) -> bool {
        self.matchups.contains_key(&normalize_matchup(matchup))
    }

    /// The two teams of a matchup, away first.
    pub fn matchup_teams(&self, matchup: &str) -> Option<(&str, &str)> {
        self.matchups
            .get(&normalize_matchup(matchup))
            .map(|(a, h)| (a.as_str(), h.as_str()))
    }

    /// The opponent of `team` on this slate, if the team has a game.
    pub fn opponent_of(&self, team: &str) -> Option<&str> {
        self.matchups.values().find_map(|(away, home)| {
            if away == team {
                Some(home.as_str())
            } else if home == team {
                Some(away.as_str())
            } else {
                None
            }
        })
    }

    /// The matchup token `team` plays in.
    pub fn matchup_of(&self, team: &str) -> Option<&str> {
        self.matchups
            .iter()
            .find(|(_, (away, home))| away == team || home == team)
            .map(|(m, _)| m.as_str())
    }

    /// Indices of every player at `pos`, in catalog order.
    pub fn indices_at(&self, pos: Position) -> impl Iterator<Item = usize> + '_ {
        self.players
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.position == pos)
            .map(|(i, _)| i)
    }

    /// Whether players `a` and `b` (distinct) stand in `relation`.
    pub fn related(&self, relation: Relation, a: usize, b: usize) -> bool {
        if a == b {
            return false;
        }
        let pa = &self.players[a];
        let pb = &self.players[b];
        match relation {
            Relation::SameTeam => pa.team == pb.team,
            Relation::OppTeam => pa.faces(pb),
            Relation::SameGame => pa.shares_game(pb),
        }
    }
}

/// Accept either a bare matchup token or a full game info string.
fn normalize_matchup(raw: &str) -> String {
    raw.split_whitespace().next().unwrap_or("").to_uppercase()
}

/// Upper-case the leading matchup token so it agrees with the team codes.
fn normalize_game_info(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((token, rest)) => format!("{} {}", token.to_uppercase(), rest.trim_start()),
        None => trimmed.to_uppercase(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: u64, name: &str, team: &str, pos: Position, game: &str) -> Player {
        Player {
            id: PlayerId(id),
            name: name.into(),
            team: team.into(),
            position: pos,
            salary: 5000,
            fpts: 10.0,
            game_info: game.into(),
            ownership: 5.0,
            std_dev: 0.0,
            ceiling: 0.0,
        }
    }

    const GAME: &str = "PHI@DAL 10/27/2024 04:25PM ET";

    fn catalog() -> PlayerCatalog {
        PlayerCatalog::new(vec![
            p(1, "Jalen Hurts", "PHI", Position::Quarterback, GAME),
            p(2, "A.J. Brown", "phi ", Position::WideReceiver, GAME),
            p(3, "CeeDee Lamb", "DAL", Position::WideReceiver, GAME),
            p(4, "Cowboys", "DAL", Position::Defense, GAME),
            p(5, "Josh Allen", "BUF", Position::Quarterback, "BUF@MIA 10/27/2024 01:00PM ET"),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_empty_and_duplicate_ids() {
        assert!(matches!(PlayerCatalog::new(vec![]), Err(DataError::Empty(_))));
        let dup = PlayerCatalog::new(vec![
            p(1, "A", "PHI", Position::Quarterback, GAME),
            p(1, "B", "PHI", Position::WideReceiver, GAME),
        ]);
        assert!(matches!(dup, Err(DataError::DuplicateId(PlayerId(1)))));
    }

    #[test]
    fn rejects_missing_team() {
        let res = PlayerCatalog::new(vec![p(1, "A", "  ", Position::Quarterback, GAME)]);
        assert!(matches!(res, Err(DataError::MissingField { field: "Team", .. })));
    }

    #[test]
    fn teams_are_normalized() {
        let cat = catalog();
        assert_eq!(cat.player(1).team, "PHI");
        assert!(cat.has_team("phi"));
        assert_eq!(cat.teams().collect::<Vec<_>>(), vec!["BUF", "DAL", "PHI"]);
    }

    #[test]
    fn resolves_by_id_then_name() {
        let cat = catalog();
        assert_eq!(cat.resolve("3"), Some(2));
        assert_eq!(cat.resolve("a.j. brown"), Some(1));
        assert_eq!(cat.resolve("Nobody"), None);
    }

    #[test]
    fn matchup_lookups() {
        let cat = catalog();
        assert!(cat.has_matchup("PHI@DAL"));
        assert!(cat.has_matchup(GAME));
        assert_eq!(cat.opponent_of("PHI"), Some("DAL"));
        assert_eq!(cat.matchup_of("MIA"), Some("BUF@MIA"));
        assert_eq!(cat.matchup_teams("BUF@MIA"), Some(("BUF", "MIA")));
        assert!(!cat.has_matchup("NYG@WAS"));
    }

    #[test]
    fn lowercase_game_info_matches_upper_case_lookups() {
        let cat = PlayerCatalog::new(vec![
            p(1, "Jalen Hurts", "phi", Position::Quarterback, " phi@dal 10/27/2024 04:25PM ET"),
            p(2, "CeeDee Lamb", "dal", Position::WideReceiver, "Phi@Dal 10/27/2024 04:25PM ET"),
        ])
        .unwrap();
        assert_eq!(cat.player(0).game_info, GAME);
        assert_eq!(cat.player(1).matchup(), Some("PHI@DAL"));
        assert_eq!(cat.matchups().collect::<Vec<_>>(), vec!["PHI@DAL"]);
        assert_eq!(cat.matchup_teams("phi@dal"), Some(("PHI", "DAL")));
        assert_eq!(cat.opponent_of("PHI"), Some("DAL"));
        assert!(cat.related(Relation::OppTeam, 0, 1));
    }

    #[test]
    fn relations_between_players() {
        let cat = catalog();
        assert!(cat.related(Relation::SameTeam, 0, 1));
        assert!(!cat.related(Relation::SameTeam, 0, 2));
        assert!(cat.related(Relation::OppTeam, 0, 2));
        assert!(!cat.related(Relation::OppTeam, 0, 1));
        assert!(cat.related(Relation::SameGame, 0, 1));
        assert!(cat.related(Relation::SameGame, 0, 3));
        assert!(!cat.related(Relation::SameGame, 0, 4));
        assert!(!cat.related(Relation::SameTeam, 0, 0));
    }
}
