//! Derived read views: fixtures, results, standings and top scorers
//!
//! Pure functions over fetched rows; nothing here touches the store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::entities::{Match, Player, PlayerId, Stats, Team, TeamId};

/// Points awarded per result
pub const POINTS_WIN: u32 = 3;
pub const POINTS_DRAW: u32 = 1;

/// Matches split around a point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchPartition {
    /// `date > now`, soonest first
    pub upcoming: Vec<Match>,
    /// `date <= now`, latest first
    pub recent: Vec<Match>,
}

pub fn partition_matches(matches: &[Match], now: DateTime<Utc>) -> MatchPartition {
    let (mut upcoming, mut recent): (Vec<Match>, Vec<Match>) =
        matches.iter().cloned().partition(|m| m.is_upcoming(now));

    upcoming.sort_by_key(|m| m.date);
    recent.sort_by(|a, b| b.date.cmp(&a.date));

    MatchPartition { upcoming, recent }
}

pub fn team_name(teams: &[Team], id: TeamId) -> Option<&str> {
    teams.iter().find(|t| t.id == id).map(|t| t.name.as_str())
}

fn display_name(teams: &[Team], id: TeamId) -> String {
    team_name(teams, id)
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", id))
}

/// Card title for a match: "River vs Boca", or "Racing 2 - 1 San Lorenzo"
/// once both scores are in.
pub fn describe_match(m: &Match, teams: &[Team]) -> String {
    let home = display_name(teams, m.home_team_id);
    let away = display_name(teams, m.away_team_id);
    match m.score() {
        Some((home_goals, away_goals)) => {
            format!("{} {} - {} {}", home, home_goals, away_goals, away)
        }
        None => format!("{} vs {}", home, away),
    }
}

/// One line of the league table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingRow {
    pub team_id: TeamId,
    pub team_name: String,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points: u32,
}

impl StandingRow {
    fn new(team: &Team) -> Self {
        Self {
            team_id: team.id,
            team_name: team.name.clone(),
            played: 0,
            won: 0,
            drawn: 0,
            lost: 0,
            goals_for: 0,
            goals_against: 0,
            points: 0,
        }
    }

    pub fn goal_difference(&self) -> i64 {
        i64::from(self.goals_for) - i64::from(self.goals_against)
    }

    // Totals saturate; negative scores count as zero
    fn record(&mut self, scored: i32, conceded: i32) {
        self.played = self.played.saturating_add(1);
        self.goals_for = self.goals_for.saturating_add(scored.max(0).unsigned_abs());
        self.goals_against = self
            .goals_against
            .saturating_add(conceded.max(0).unsigned_abs());
        match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => {
                self.won = self.won.saturating_add(1);
                self.points = self.points.saturating_add(POINTS_WIN);
            }
            std::cmp::Ordering::Equal => {
                self.drawn = self.drawn.saturating_add(1);
                self.points = self.points.saturating_add(POINTS_DRAW);
            }
            std::cmp::Ordering::Less => self.lost = self.lost.saturating_add(1),
        }
    }
}

/// League table from every match with both scores recorded.
///
/// Every team appears, including those without played matches. Sorted by
/// points, goal difference, goals for, then name.
pub fn standings(teams: &[Team], matches: &[Match]) -> Vec<StandingRow> {
    let mut rows: HashMap<TeamId, StandingRow> =
        teams.iter().map(|t| (t.id, StandingRow::new(t))).collect();

    for m in matches {
        let Some((home_goals, away_goals)) = m.score() else {
            continue;
        };
        if !rows.contains_key(&m.home_team_id) || !rows.contains_key(&m.away_team_id) {
            tracing::debug!(match_id = m.id, "Skipping match with unknown team");
            continue;
        }
        if let Some(home) = rows.get_mut(&m.home_team_id) {
            home.record(home_goals, away_goals);
        }
        if let Some(away) = rows.get_mut(&m.away_team_id) {
            away.record(away_goals, home_goals);
        }
    }

    let mut table: Vec<StandingRow> = rows.into_values().collect();
    table.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then_with(|| b.goal_difference().cmp(&a.goal_difference()))
            .then_with(|| b.goals_for.cmp(&a.goals_for))
            .then_with(|| a.team_name.cmp(&b.team_name))
    });
    table
}

/// One line of the scorers list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorerRow {
    pub player_id: PlayerId,
    pub player_name: String,
    pub team_name: Option<String>,
    pub goals: u32,
}

/// Players with at least one goal, most goals first, at most `limit` rows
pub fn top_scorers(
    stats: &[Stats],
    players: &[Player],
    teams: &[Team],
    limit: usize,
) -> Vec<ScorerRow> {
    let mut goals: HashMap<PlayerId, u32> = HashMap::new();
    for line in stats {
        let total = goals.entry(line.player_id).or_default();
        *total = total.saturating_add(line.goals.max(0).unsigned_abs());
    }

    let mut rows: Vec<ScorerRow> = goals
        .into_iter()
        .filter(|(_, goals)| *goals > 0)
        .filter_map(|(player_id, goals)| {
            let player = players.iter().find(|p| p.id == player_id)?;
            Some(ScorerRow {
                player_id,
                player_name: player.full_name(),
                team_name: player
                    .team_id
                    .and_then(|id| team_name(teams, id))
                    .map(str::to_string),
                goals,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.goals
            .cmp(&a.goals)
            .then_with(|| a.player_name.cmp(&b.player_name))
    });
    rows.truncate(limit);
    rows
}
