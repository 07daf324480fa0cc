//! Team-perspective view of a match batch: rolling form and head-to-head counts.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::config::FeatureConfig;
use crate::error::{FeatureError, Result};
use crate::features::TeamStats;
use crate::outcome::Outcome;
use crate::records::MatchRecord;
use crate::rolling::{Closed, RollingStat, RollingWindow, points_for};

/// One match seen from one team's side.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamPerspective<'a> {
    pub match_idx: usize,
    pub team: &'a str,
    pub date: DateTime<Utc>,
    pub is_home: bool,
    pub points: Option<f64>,
    pub goals_for: Option<f64>,
    pub goals_against: Option<f64>,
}

/// Two rows per match, sorted by date (ties: match id, then home before away).
pub fn pivot_team_perspectives(matches: &[MatchRecord]) -> Result<Vec<TeamPerspective<'_>>> {
    let mut rows = Vec::with_capacity(matches.len() * 2);
    for (idx, m) in matches.iter().enumerate() {
        let outcome = m.outcome()?;
        let home_goals = m.home_goals.map(f64::from);
        let away_goals = m.away_goals.map(f64::from);
        rows.push(TeamPerspective {
            match_idx: idx,
            team: m.home.as_str(),
            date: m.date,
            is_home: true,
            points: outcome.map(|o| points_for(o, true) as f64),
            goals_for: home_goals,
            goals_against: away_goals,
        });
        rows.push(TeamPerspective {
            match_idx: idx,
            team: m.away.as_str(),
            date: m.date,
            is_home: false,
            points: outcome.map(|o| points_for(o, false) as f64),
            goals_for: away_goals,
            goals_against: home_goals,
        });
    }
    rows.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| matches[a.match_idx].id.cmp(&matches[b.match_idx].id))
            .then_with(|| b.is_home.cmp(&a.is_home))
    });
    Ok(rows)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SideForm {
    pub form: Option<f64>,
    pub avg_goals_for: Option<f64>,
    pub avg_goals_against: Option<f64>,
}

impl SideForm {
    /// Fills sides without enough history with the configured defaults.
    pub fn or_defaults(self, cfg: &FeatureConfig) -> (f64, f64, f64) {
        if self.form.is_none() || self.avg_goals_for.is_none() || self.avg_goals_against.is_none() {
            trace!("insufficient history, substituting form defaults");
        }
        (
            self.form.unwrap_or(cfg.default_form),
            self.avg_goals_for.unwrap_or(cfg.default_goals),
            self.avg_goals_against.unwrap_or(cfg.default_goals),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MatchForm {
    pub home: Option<SideForm>,
    pub away: Option<SideForm>,
}

fn windows(cfg: &FeatureConfig, closed: Closed) -> Result<(RollingWindow, RollingWindow)> {
    let form = RollingWindow::new(cfg.form_window, RollingStat::Mean)?
        .with_min_periods(cfg.min_matches)?
        .closed(closed);
    let goals = RollingWindow::new(cfg.goal_window, RollingStat::Mean)?
        .with_min_periods(cfg.min_matches)?
        .closed(closed);
    Ok((form, goals))
}

/// Rolling points and goal averages for both sides of every match, indexed like `matches`.
pub fn compute_match_form(matches: &[MatchRecord], cfg: &FeatureConfig) -> Result<Vec<MatchForm>> {
    let closed = if cfg.include_current_match {
        Closed::Current
    } else {
        Closed::Prior
    };
    let (form_window, goal_window) = windows(cfg, closed)?;

    let rows = pivot_team_perspectives(matches)?;
    let teams: Vec<&str> = rows.iter().map(|r| r.team).collect();
    let points: Vec<Option<f64>> = rows.iter().map(|r| r.points).collect();
    let goals_for: Vec<Option<f64>> = rows.iter().map(|r| r.goals_for).collect();
    let goals_against: Vec<Option<f64>> = rows.iter().map(|r| r.goals_against).collect();

    let form = form_window.apply(&teams, &points)?;
    let avg_for = goal_window.apply(&teams, &goals_for)?;
    let avg_against = goal_window.apply(&teams, &goals_against)?;

    let mut out = vec![MatchForm::default(); matches.len()];
    for (i, row) in rows.iter().enumerate() {
        let side = SideForm {
            form: form[i],
            avg_goals_for: avg_for[i],
            avg_goals_against: avg_against[i],
        };
        let slot = &mut out[row.match_idx];
        if row.is_home {
            slot.home = Some(side);
        } else {
            slot.away = Some(side);
        }
    }
    Ok(out)
}

/// Form a team would carry into its next match after `history`, for serving.
///
/// Unplayed fixtures keep their window slot, exactly as in the training table, so
/// the result equals the prior-closed value of a match dated after `history`.
pub fn latest_side_form(
    history: &[MatchRecord],
    team: &str,
    cfg: &FeatureConfig,
) -> Result<SideForm> {
    let (form_window, goal_window) = windows(cfg, Closed::Current)?;
    let rows: Vec<TeamPerspective<'_>> = pivot_team_perspectives(history)?
        .into_iter()
        .filter(|r| r.team == team)
        .collect();
    let Some(last) = rows.len().checked_sub(1) else {
        return Ok(SideForm::default());
    };

    let teams: Vec<&str> = rows.iter().map(|r| r.team).collect();
    let points: Vec<Option<f64>> = rows.iter().map(|r| r.points).collect();
    let goals_for: Vec<Option<f64>> = rows.iter().map(|r| r.goals_for).collect();
    let goals_against: Vec<Option<f64>> = rows.iter().map(|r| r.goals_against).collect();

    Ok(SideForm {
        form: form_window.apply(&teams, &points)?[last],
        avg_goals_for: goal_window.apply(&teams, &goals_for)?[last],
        avg_goals_against: goal_window.apply(&teams, &goals_against)?[last],
    })
}

/// Team block for an upcoming fixture, computed with the same rolling windows as
/// the training table.
pub fn team_stats_from_history(
    history: &[MatchRecord],
    home: &str,
    away: &str,
    cfg: &FeatureConfig,
) -> Result<TeamStats> {
    cfg.validate()?;
    let (home_form, home_for, home_against) =
        latest_side_form(history, home, cfg)?.or_defaults(cfg);
    let (away_form, away_for, away_against) =
        latest_side_form(history, away, cfg)?.or_defaults(cfg);
    Ok(TeamStats {
        home_form,
        away_form,
        home_avg_goals_for: home_for,
        home_avg_goals_against: home_against,
        away_avg_goals_for: away_for,
        away_avg_goals_against: away_against,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct H2hCounts {
    pub home_wins: u32,
    pub draws: u32,
    pub away_wins: u32,
    pub total: u32,
}

struct Meeting<'a> {
    home: &'a str,
    away: &'a str,
    outcome: Outcome,
}

/// Earlier meetings of each fixture's two teams (either venue), counted from the
/// current home side, limited to the last `h2h_window` meetings.
pub fn head_to_head(matches: &[MatchRecord], cfg: &FeatureConfig) -> Result<Vec<H2hCounts>> {
    if cfg.h2h_window == 0 {
        return Err(FeatureError::validation(
            "h2h_window",
            "window must be greater than zero",
        ));
    }
    let mut order: Vec<usize> = (0..matches.len()).collect();
    order.sort_by(|&a, &b| {
        matches[a]
            .date
            .cmp(&matches[b].date)
            .then_with(|| matches[a].id.cmp(&matches[b].id))
    });

    let mut meetings: HashMap<(&str, &str), VecDeque<Meeting<'_>>> = HashMap::new();
    let mut out = vec![H2hCounts::default(); matches.len()];

    for idx in order {
        let m = &matches[idx];
        let key = pair_key(&m.home, &m.away);
        let past = meetings.entry(key).or_default();

        let counts = &mut out[idx];
        for prior in past.iter() {
            let winner = match prior.outcome {
                Outcome::Home => Some(prior.home),
                Outcome::Away => Some(prior.away),
                Outcome::Draw => None,
            };
            match winner {
                None => counts.draws += 1,
                Some(team) if team == m.home => counts.home_wins += 1,
                Some(_) => counts.away_wins += 1,
            }
            counts.total += 1;
        }

        if let Some(outcome) = m.outcome()? {
            past.push_back(Meeting {
                home: &m.home,
                away: &m.away,
                outcome,
            });
            while past.len() > cfg.h2h_window {
                past.pop_front();
            }
        }
    }
    Ok(out)
}

fn pair_key<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn m(id: &str, day: u32, home: &str, away: &str, hg: u32, ag: u32) -> MatchRecord {
        MatchRecord {
            id: id.to_string(),
            date: Utc.with_ymd_and_hms(2024, 9, day, 15, 0, 0).unwrap(),
            home: home.to_string(),
            away: away.to_string(),
            home_goals: Some(hg),
            away_goals: Some(ag),
            result: None,
        }
    }

    #[test]
    fn pivot_sorts_by_date_then_home_first() {
        let matches = vec![m("b", 8, "LIV", "CHE", 1, 1), m("a", 1, "ARS", "TOT", 2, 0)];
        let rows = pivot_team_perspectives(&matches).unwrap();
        let teams: Vec<&str> = rows.iter().map(|r| r.team).collect();
        assert_eq!(teams, vec!["ARS", "TOT", "LIV", "CHE"]);
        assert_eq!(rows[0].points, Some(3.0));
        assert_eq!(rows[1].points, Some(0.0));
        assert_eq!(rows[1].goals_for, Some(0.0));
        assert_eq!(rows[1].goals_against, Some(2.0));
    }

    #[test]
    fn prior_form_excludes_own_result() {
        let matches = vec![m("1", 1, "ARS", "TOT", 2, 0), m("2", 8, "ARS", "CHE", 0, 1)];
        let form = compute_match_form(&matches, &FeatureConfig::default()).unwrap();
        assert_eq!(form[0].home.unwrap().form, None);
        assert_eq!(form[1].home.unwrap().form, Some(3.0));
        assert_eq!(form[1].home.unwrap().avg_goals_for, Some(2.0));
        assert_eq!(form[1].away.unwrap().form, None);
    }

    #[test]
    fn inclusive_form_counts_current_match() {
        let cfg = FeatureConfig {
            include_current_match: true,
            ..FeatureConfig::default()
        };
        let matches = vec![m("1", 1, "ARS", "TOT", 2, 0)];
        let form = compute_match_form(&matches, &cfg).unwrap();
        assert_eq!(form[0].home.unwrap().form, Some(3.0));
        assert_eq!(form[0].away.unwrap().form, Some(0.0));
    }

    #[test]
    fn history_stats_use_latest_window() {
        let history = vec![
            m("1", 1, "ARS", "TOT", 2, 0),
            m("2", 8, "CHE", "ARS", 1, 1),
            m("3", 15, "ARS", "LIV", 0, 3),
        ];
        let cfg = FeatureConfig {
            form_window: 2,
            goal_window: 2,
            ..FeatureConfig::default()
        };
        let stats = team_stats_from_history(&history, "ARS", "NEW", &cfg).unwrap();
        assert_eq!(stats.home_form, 0.5);
        assert_eq!(stats.home_avg_goals_for, 0.5);
        assert_eq!(stats.home_avg_goals_against, 2.0);
        assert_eq!(stats.away_form, cfg.default_form);
        assert_eq!(stats.away_avg_goals_for, cfg.default_goals);
    }

    #[test]
    fn history_stats_keep_unplayed_slots() {
        let mut postponed = m("2", 8, "CHE", "ARS", 0, 0);
        postponed.home_goals = None;
        postponed.away_goals = None;
        let history = vec![
            m("1", 1, "ARS", "TOT", 2, 0),
            postponed,
            m("3", 15, "ARS", "LIV", 0, 3),
        ];
        let cfg = FeatureConfig {
            form_window: 2,
            goal_window: 2,
            ..FeatureConfig::default()
        };

        let mut batch = history.clone();
        batch.push(m("4", 22, "ARS", "NEW", 1, 0));
        let trained = compute_match_form(&batch, &cfg).unwrap()[3].home.unwrap();

        let served = latest_side_form(&history, "ARS", &cfg).unwrap();
        assert_eq!(served, trained);
        assert_eq!(served.form, Some(0.0));
        assert_eq!(served.avg_goals_for, Some(0.0));

        let stats = team_stats_from_history(&history, "ARS", "NEW", &cfg).unwrap();
        assert_eq!(stats.home_form, 0.0);
    }

    #[test]
    fn head_to_head_counts_prior_meetings_only() {
        let matches = vec![
            m("1", 1, "ARS", "TOT", 2, 0),
            m("2", 8, "TOT", "ARS", 1, 1),
            m("3", 15, "TOT", "ARS", 3, 1),
            m("4", 22, "ARS", "TOT", 0, 0),
        ];
        let h2h = head_to_head(&matches, &FeatureConfig::default()).unwrap();
        assert_eq!(h2h[0], H2hCounts::default());
        assert_eq!(
            h2h[3],
            H2hCounts {
                home_wins: 1,
                draws: 1,
                away_wins: 1,
                total: 3
            }
        );
        assert_eq!(h2h[2].away_wins, 1);
        assert_eq!(h2h[2].draws, 1);
    }

    #[test]
    fn head_to_head_respects_window() {
        let matches = vec![
            m("1", 1, "ARS", "TOT", 2, 0),
            m("2", 8, "ARS", "TOT", 2, 0),
            m("3", 15, "ARS", "TOT", 2, 0),
        ];
        let cfg = FeatureConfig {
            h2h_window: 1,
            ..FeatureConfig::default()
        };
        let h2h = head_to_head(&matches, &cfg).unwrap();
        assert_eq!(h2h[2].total, 1);
        assert_eq!(h2h[2].home_wins, 1);
    }
}
