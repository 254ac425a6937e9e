// Constraint rule model: wire form, typed rules, and catalog validation.
//
// Rules arrive in the shape the rule-builder form posts (`RuleConfig`), are
// converted into the closed `Rule` enum, then resolved against a catalog
// into `ValidatedRules`. Only validated rules reach the optimizer, so every
// player, team and matchup reference downstream is known to exist.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::catalog::PlayerCatalog;
use crate::error::{Error, Result};
use crate::lenient;
use crate::player::Position;

// ---------------------------------------------------------------------------
// Relations and correlation targets
// ---------------------------------------------------------------------------

/// How a stacked player relates to the key player (or group anchor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Relation {
    #[serde(rename = "same-team", alias = "same_team")]
    SameTeam,
    #[serde(rename = "opp-team", alias = "opp_team")]
    OppTeam,
    #[serde(rename = "same-game", alias = "same_game")]
    SameGame,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relation::SameTeam => "same-team",
            Relation::OppTeam => "opp-team",
            Relation::SameGame => "same-game",
        })
    }
}

/// Target of a correlation override: a position on the player's own team
/// (`"WR"`) or on the opposing team (`"Opp WR"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationTarget {
    pub position: Position,
    pub opponent: bool,
}

impl CorrelationTarget {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let mut parts = trimmed.split_whitespace();
        let first = parts.next()?;
        let (opponent, pos_str) = if first.eq_ignore_ascii_case("opp") {
            (true, parts.next()?)
        } else {
            (false, first)
        };
        if parts.next().is_some() {
            return None;
        }
        Position::from_str_pos(pos_str).map(|position| CorrelationTarget { position, opponent })
    }
}

impl fmt::Display for CorrelationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.opponent {
            write!(f, "Opp {}", self.position)
        } else {
            write!(f, "{}", self.position)
        }
    }
}

// ---------------------------------------------------------------------------
// Typed rules
// ---------------------------------------------------------------------------

/// A lineup construction rule. Player references are IDs or names and are
/// resolved during validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    AtLeast {
        count: usize,
        players: Vec<String>,
    },
    AtMost {
        count: usize,
        players: Vec<String>,
    },
    /// For every selected `key` player, at least `count` players at
    /// `positions` standing in `relation` to it.
    PairStack {
        key: Position,
        positions: Vec<Position>,
        count: usize,
        relation: Relation,
        exclude_teams: Vec<String>,
    },
    /// At most `count` players at `positions` per relation group, unless the
    /// lineup also carries an `unless_positions` player related to the
    /// group's anchor.
    LimitStack {
        positions: Vec<Position>,
        relation: Relation,
        count: usize,
        unless_positions: Vec<Position>,
        unless_relation: Option<Relation>,
        exclude_teams: Vec<String>,
    },
    TeamLimit {
        team: String,
        max: usize,
    },
    MatchupLimit {
        matchup: String,
        max: usize,
    },
    MatchupAtLeast {
        matchup: String,
        min: usize,
    },
    /// Simulator-only override of a default position-pair correlation.
    CorrelationOverride {
        player: String,
        target: CorrelationTarget,
        coefficient: f64,
    },
}

// ---------------------------------------------------------------------------
// Wire form
// ---------------------------------------------------------------------------

/// Integer count that may arrive as a JSON string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Count(pub usize);

impl<'de> Deserialize<'de> for Count {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        lenient::number(deserializer).map(Count)
    }
}

impl Serialize for Count {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0 as u64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairStackWire {
    pub key: Position,
    pub positions: Vec<Position>,
    pub count: Count,
    #[serde(rename = "type")]
    pub relation: Relation,
    #[serde(default)]
    pub exclude_teams: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitStackWire {
    pub positions: Vec<Position>,
    #[serde(rename = "type")]
    pub relation: Relation,
    pub count: Count,
    #[serde(default)]
    pub exclude_teams: Vec<String>,
    #[serde(default)]
    pub unless_positions: Vec<Position>,
    #[serde(default)]
    pub unless_type: Option<Relation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackRules {
    #[serde(default)]
    pub pair: Vec<PairStackWire>,
    #[serde(default)]
    pub limit: Vec<LimitStackWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationRuleWire {
    #[serde(default, deserialize_with = "lenient::option_number")]
    pub player_id: Option<u64>,
    #[serde(default)]
    pub player_name: String,
    pub position: String,
    #[serde(deserialize_with = "lenient::number")]
    pub correlation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationEntryWire {
    pub position: String,
    #[serde(deserialize_with = "lenient::number")]
    pub correlation: f64,
}

/// Correlation rules come either as a list of per-player entries or as a
/// map keyed by player name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrelationRules {
    List(Vec<CorrelationRuleWire>),
    Map(BTreeMap<String, CorrelationEntryWire>),
}

impl Default for CorrelationRules {
    fn default() -> Self {
        CorrelationRules::List(Vec::new())
    }
}

/// Rule collections as posted by the rule-builder form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// `{"<count>": [[player, ...], ...]}`
    #[serde(default)]
    pub at_least: BTreeMap<String, Vec<Vec<String>>>,
    #[serde(default)]
    pub at_most: BTreeMap<String, Vec<Vec<String>>>,
    #[serde(default)]
    pub stack_rules: StackRules,
    #[serde(default)]
    pub team_limits: BTreeMap<String, Count>,
    #[serde(default)]
    pub matchup_limits: BTreeMap<String, Count>,
    #[serde(default)]
    pub matchup_at_least: BTreeMap<String, Count>,
    #[serde(default)]
    pub correlation_rules: CorrelationRules,
}

fn parse_count_key(kind: &str, key: &str) -> Result<usize> {
    key.trim()
        .parse::<usize>()
        .map_err(|_| Error::RuleValidation(format!("{kind} count {key:?} is not a number")))
}

impl RuleConfig {
    /// Convert the wire collections into typed rules. Empty player sets are
    /// dropped; malformed counts and correlation targets are rejected.
    pub fn to_rules(&self) -> Result<Vec<Rule>> {
        let mut rules = Vec::new();

        for (key, sets) in &self.at_least {
            let count = parse_count_key("at_least", key)?;
            for set in sets.iter().filter(|s| !s.is_empty()) {
                rules.push(Rule::AtLeast {
                    count,
                    players: set.clone(),
                });
            }
        }
        for (key, sets) in &self.at_most {
            let count = parse_count_key("at_most", key)?;
            for set in sets.iter().filter(|s| !s.is_empty()) {
                rules.push(Rule::AtMost {
                    count,
                    players: set.clone(),
                });
            }
        }

        for pair in &self.stack_rules.pair {
            rules.push(Rule::PairStack {
                key: pair.key,
                positions: pair.positions.clone(),
                count: pair.count.0,
                relation: pair.relation,
                exclude_teams: pair.exclude_teams.clone(),
            });
        }
        for limit in &self.stack_rules.limit {
            rules.push(Rule::LimitStack {
                positions: limit.positions.clone(),
                relation: limit.relation,
                count: limit.count.0,
                unless_positions: limit.unless_positions.clone(),
                unless_relation: limit.unless_type,
                exclude_teams: limit.exclude_teams.clone(),
            });
        }

        for (team, max) in &self.team_limits {
            rules.push(Rule::TeamLimit {
                team: team.clone(),
                max: max.0,
            });
        }
        for (matchup, max) in &self.matchup_limits {
            rules.push(Rule::MatchupLimit {
                matchup: matchup.clone(),
                max: max.0,
            });
        }
        for (matchup, min) in &self.matchup_at_least {
            rules.push(Rule::MatchupAtLeast {
                matchup: matchup.clone(),
                min: min.0,
            });
        }

        let parse_target = |raw: &str| {
            CorrelationTarget::parse(raw).ok_or_else(|| {
                Error::RuleValidation(format!("unknown correlation position {raw:?}"))
            })
        };
        match &self.correlation_rules {
            CorrelationRules::List(entries) => {
                for entry in entries {
                    let player = match entry.player_id {
                        Some(id) => id.to_string(),
                        None => entry.player_name.clone(),
                    };
                    rules.push(Rule::CorrelationOverride {
                        player,
                        target: parse_target(&entry.position)?,
                        coefficient: entry.correlation,
                    });
                }
            }
            CorrelationRules::Map(entries) => {
                for (player, entry) in entries {
                    rules.push(Rule::CorrelationOverride {
                        player: player.clone(),
                        target: parse_target(&entry.position)?,
                        coefficient: entry.correlation,
                    });
                }
            }
        }

        Ok(rules)
    }

    /// Convert and validate in one step.
    pub fn validate(&self, catalog: &PlayerCatalog) -> Result<ValidatedRules> {
        ValidatedRules::new(&self.to_rules()?, catalog)
    }
}

// ---------------------------------------------------------------------------
// Validated rules
// ---------------------------------------------------------------------------

/// A rule with every reference resolved to catalog indices or normalized
/// codes. Correlation overrides are split out into `CorrelationMap`.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedRule {
    AtLeast {
        count: usize,
        players: Vec<usize>,
    },
    AtMost {
        count: usize,
        players: Vec<usize>,
    },
    PairStack {
        key: Position,
        positions: Vec<Position>,
        count: usize,
        relation: Relation,
        exclude_teams: BTreeSet<String>,
    },
    LimitStack {
        positions: Vec<Position>,
        relation: Relation,
        count: usize,
        unless_positions: Vec<Position>,
        unless_relation: Relation,
        exclude_teams: BTreeSet<String>,
    },
    TeamLimit {
        team: String,
        max: usize,
    },
    MatchupLimit {
        matchup: String,
        max: usize,
    },
    MatchupAtLeast {
        matchup: String,
        min: usize,
    },
}

/// One LimitStack group: at most `count` of `members` unless any of
/// `unless` is also selected.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitGroup {
    pub anchor: String,
    pub members: Vec<usize>,
    pub unless: Vec<usize>,
}

/// Sparse player -> (target -> coefficient) overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationMap {
    entries: HashMap<usize, Vec<(CorrelationTarget, f64)>>,
}

impl CorrelationMap {
    pub fn insert(&mut self, player: usize, target: CorrelationTarget, coefficient: f64) {
        let list = self.entries.entry(player).or_default();
        match list.iter_mut().find(|(t, _)| *t == target) {
            Some(existing) => existing.1 = coefficient,
            None => list.push((target, coefficient)),
        }
    }

    pub fn get(&self, player: usize, target: CorrelationTarget) -> Option<f64> {
        self.entries
            .get(&player)?
            .iter()
            .find(|(t, _)| *t == target)
            .map(|(_, c)| *c)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rules resolved against one catalog. Build with [`ValidatedRules::new`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedRules {
    pub rules: Vec<ResolvedRule>,
    pub correlations: CorrelationMap,
}

fn resolve_players(kind: &str, refs: &[String], catalog: &PlayerCatalog) -> Result<Vec<usize>> {
    let mut out = Vec::with_capacity(refs.len());
    for r in refs {
        let idx = catalog
            .resolve(r)
            .ok_or_else(|| Error::RuleValidation(format!("{kind} rule references unknown player {r:?}")))?;
        if !out.contains(&idx) {
            out.push(idx);
        }
    }
    Ok(out)
}

fn resolve_teams(kind: &str, teams: &[String], catalog: &PlayerCatalog) -> Result<BTreeSet<String>> {
    teams
        .iter()
        .map(|t| {
            let code = t.trim().to_uppercase();
            if catalog.has_team(&code) {
                Ok(code)
            } else {
                Err(Error::RuleValidation(format!("{kind} rule excludes unknown team {t:?}")))
            }
        })
        .collect()
}

fn resolve_matchup(kind: &str, matchup: &str, catalog: &PlayerCatalog) -> Result<String> {
    let (away, home) = catalog
        .matchup_teams(matchup)
        .ok_or_else(|| Error::RuleValidation(format!("{kind} references unknown matchup {matchup:?}")))?;
    Ok(format!("{away}@{home}"))
}

impl ValidatedRules {
    /// Resolve `rules` against `catalog`. Any unknown player, team or
    /// matchup rejects the whole set.
    pub fn new(rules: &[Rule], catalog: &PlayerCatalog) -> Result<Self> {
        let mut out = ValidatedRules::default();

        for rule in rules {
            match rule {
                Rule::AtLeast { count, players } => {
                    let players = resolve_players("at_least", players, catalog)?;
                    if *count > players.len() {
                        return Err(Error::RuleValidation(format!(
                            "at_least requires {count} of only {} players",
                            players.len()
                        )));
                    }
                    out.rules.push(ResolvedRule::AtLeast {
                        count: *count,
                        players,
                    });
                }
                Rule::AtMost { count, players } => {
                    out.rules.push(ResolvedRule::AtMost {
                        count: *count,
                        players: resolve_players("at_most", players, catalog)?,
                    });
                }
                Rule::PairStack {
                    key,
                    positions,
                    count,
                    relation,
                    exclude_teams,
                } => {
                    if positions.is_empty() {
                        return Err(Error::RuleValidation(
                            "pair stack needs at least one position".into(),
                        ));
                    }
                    out.rules.push(ResolvedRule::PairStack {
                        key: *key,
                        positions: positions.clone(),
                        count: *count,
                        relation: *relation,
                        exclude_teams: resolve_teams("pair stack", exclude_teams, catalog)?,
                    });
                }
                Rule::LimitStack {
                    positions,
                    relation,
                    count,
                    unless_positions,
                    unless_relation,
                    exclude_teams,
                } => {
                    if positions.is_empty() {
                        return Err(Error::RuleValidation(
                            "limit stack needs at least one position".into(),
                        ));
                    }
                    out.rules.push(ResolvedRule::LimitStack {
                        positions: positions.clone(),
                        relation: *relation,
                        count: *count,
                        unless_positions: unless_positions.clone(),
                        unless_relation: unless_relation.unwrap_or(*relation),
                        exclude_teams: resolve_teams("limit stack", exclude_teams, catalog)?,
                    });
                }
                Rule::TeamLimit { team, max } => {
                    let code = team.trim().to_uppercase();
                    if !catalog.has_team(&code) {
                        return Err(Error::RuleValidation(format!(
                            "team limit references unknown team {team:?}"
                        )));
                    }
                    out.rules.push(ResolvedRule::TeamLimit {
                        team: code,
                        max: *max,
                    });
                }
                Rule::MatchupLimit { matchup, max } => {
                    out.rules.push(ResolvedRule::MatchupLimit {
                        matchup: resolve_matchup("matchup limit", matchup, catalog)?,
                        max: *max,
                    });
                }
                Rule::MatchupAtLeast { matchup, min } => {
                    out.rules.push(ResolvedRule::MatchupAtLeast {
                        matchup: resolve_matchup("matchup at-least", matchup, catalog)?,
                        min: *min,
                    });
                }
                Rule::CorrelationOverride {
                    player,
                    target,
                    coefficient,
                } => {
                    let idx = catalog.resolve(player).ok_or_else(|| {
                        Error::RuleValidation(format!(
                            "correlation rule references unknown player {player:?}"
                        ))
                    })?;
                    if !coefficient.is_finite() || !(-1.0..=1.0).contains(coefficient) {
                        return Err(Error::RuleValidation(format!(
                            "correlation {coefficient} for {player:?} is outside [-1, 1]"
                        )));
                    }
                    out.correlations.insert(idx, *target, *coefficient);
                }
            }
        }

        Ok(out)
    }

    /// Players any AtLeast rule explicitly requires. These survive the
    /// projection-minimum filter.
    pub fn required_players(&self) -> BTreeSet<usize> {
        self.rules
            .iter()
            .filter_map(|r| match r {
                ResolvedRule::AtLeast { players, .. } => Some(players.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Check a concrete lineup (catalog indices) against every rule,
    /// returning a description of the first violation.
    pub fn check_lineup(&self, catalog: &PlayerCatalog, lineup: &[usize]) -> std::result::Result<(), String> {
        for rule in &self.rules {
            rule.check(catalog, lineup)?;
        }
        Ok(())
    }
}

impl ResolvedRule {
    /// The player set a counting rule sums over: AtLeast/AtMost sets, a
    /// team's non-DST players, or every player in a matchup.
    pub fn members(&self, catalog: &PlayerCatalog) -> Vec<usize> {
        match self {
            ResolvedRule::AtLeast { players, .. } | ResolvedRule::AtMost { players, .. } => {
                players.clone()
            }
            ResolvedRule::TeamLimit { team, .. } => team_offense(catalog, team),
            ResolvedRule::MatchupLimit { matchup, .. } | ResolvedRule::MatchupAtLeast { matchup, .. } => {
                catalog
                    .players()
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.matchup() == Some(matchup.as_str()))
                    .map(|(i, _)| i)
                    .collect()
            }
            ResolvedRule::PairStack { .. } | ResolvedRule::LimitStack { .. } => Vec::new(),
        }
    }

    /// For a PairStack: every eligible key player with the partners that
    /// count toward its requirement.
    pub fn pair_anchors(&self, catalog: &PlayerCatalog) -> Vec<(usize, Vec<usize>)> {
        let ResolvedRule::PairStack {
            key,
            positions,
            relation,
            exclude_teams,
            ..
        } = self
        else {
            return Vec::new();
        };

        catalog
            .indices_at(*key)
            .filter(|&k| !exclude_teams.contains(&catalog.player(k).team))
            .map(|k| {
                let partners = (0..catalog.len())
                    .filter(|&q| {
                        positions.contains(&catalog.player(q).position)
                            && catalog.related(*relation, k, q)
                    })
                    .collect();
                (k, partners)
            })
            .collect()
    }

    /// For a LimitStack: the anchored groups the limit applies to.
    pub fn limit_groups(&self, catalog: &PlayerCatalog) -> Vec<LimitGroup> {
        let ResolvedRule::LimitStack {
            positions,
            relation,
            unless_positions,
            unless_relation,
            exclude_teams,
            ..
        } = self
        else {
            return Vec::new();
        };

        let select = |positions: &[Position], teams: &[&str]| -> Vec<usize> {
            catalog
                .players()
                .iter()
                .enumerate()
                .filter(|(_, p)| positions.contains(&p.position) && teams.contains(&p.team.as_str()))
                .map(|(i, _)| i)
                .collect()
        };

        let mut groups = Vec::new();
        match relation {
            Relation::SameTeam | Relation::OppTeam => {
                for team in catalog.teams() {
                    if exclude_teams.contains(team) {
                        continue;
                    }
                    let opponent = catalog.opponent_of(team);
                    let member_team = match relation {
                        Relation::SameTeam => Some(team),
                        _ => opponent,
                    };
                    let Some(member_team) = member_team else {
                        continue;
                    };
                    let unless_teams: Vec<&str> = match unless_relation {
                        Relation::SameTeam => vec![team],
                        Relation::OppTeam => opponent.into_iter().collect(),
                        Relation::SameGame => std::iter::once(team).chain(opponent).collect(),
                    };
                    groups.push(LimitGroup {
                        anchor: team.to_string(),
                        members: select(positions, &[member_team]),
                        unless: select(unless_positions, &unless_teams),
                    });
                }
            }
            Relation::SameGame => {
                for matchup in catalog.matchups() {
                    let Some((away, home)) = catalog.matchup_teams(matchup) else {
                        continue;
                    };
                    if exclude_teams.contains(away) || exclude_teams.contains(home) {
                        continue;
                    }
                    groups.push(LimitGroup {
                        anchor: matchup.to_string(),
                        members: select(positions, &[away, home]),
                        unless: select(unless_positions, &[away, home]),
                    });
                }
            }
        }
        groups.retain(|g| !g.members.is_empty());
        groups
    }

    fn check(&self, catalog: &PlayerCatalog, lineup: &[usize]) -> std::result::Result<(), String> {
        let selected = |set: &[usize]| set.iter().filter(|i| lineup.contains(i)).count();
        match self {
            ResolvedRule::AtLeast { count, .. } => {
                let n = selected(&self.members(catalog));
                if n < *count {
                    return Err(format!("at_least {count}: only {n} selected"));
                }
            }
            ResolvedRule::AtMost { count, .. } => {
                let n = selected(&self.members(catalog));
                if n > *count {
                    return Err(format!("at_most {count}: {n} selected"));
                }
            }
            ResolvedRule::TeamLimit { team, max } => {
                let n = selected(&self.members(catalog));
                if n > *max {
                    return Err(format!("team limit {team} {max}: {n} selected"));
                }
            }
            ResolvedRule::MatchupLimit { matchup, max } => {
                let n = selected(&self.members(catalog));
                if n > *max {
                    return Err(format!("matchup limit {matchup} {max}: {n} selected"));
                }
            }
            ResolvedRule::MatchupAtLeast { matchup, min } => {
                let n = selected(&self.members(catalog));
                if n < *min {
                    return Err(format!("matchup at-least {matchup} {min}: {n} selected"));
                }
            }
            ResolvedRule::PairStack { count, .. } => {
                for (key, partners) in self.pair_anchors(catalog) {
                    if lineup.contains(&key) && selected(&partners) < *count {
                        return Err(format!(
                            "pair stack: {} lacks {count} partners",
                            catalog.player(key).name
                        ));
                    }
                }
            }
            ResolvedRule::LimitStack { count, .. } => {
                for group in self.limit_groups(catalog) {
                    if selected(&group.members) > *count && selected(&group.unless) == 0 {
                        return Err(format!("limit stack {}: more than {count}", group.anchor));
                    }
                }
            }
        }
        Ok(())
    }
}

/// A team's non-DST players.
pub fn team_offense(catalog: &PlayerCatalog, team: &str) -> Vec<usize> {
    catalog
        .players()
        .iter()
        .enumerate()
        .filter(|(_, p)| p.team == team && p.position != Position::Defense)
        .map(|(i, _)| i)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
