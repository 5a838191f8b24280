//! Cohort selector

use crate::selection::rule::SelectionRule;
use crate::types::{Cohort, Player, Team};

/// Splits a roster snapshot into the two cohorts of a rule
#[derive(Debug, Clone, Copy, Default)]
pub struct CohortSelector;

impl CohortSelector {
    /// Select the cohorts of team one and team two
    ///
    /// Cohorts are disjoint because every player has exactly one team.
    pub fn select(roster: &[Player], rule: &SelectionRule) -> (Cohort, Cohort) {
        (
            Self::select_team(roster, rule, Team::One),
            Self::select_team(roster, rule, Team::Two),
        )
    }

    /// Select the cohort of a single team
    pub fn select_team(roster: &[Player], rule: &SelectionRule, team: Team) -> Cohort {
        roster
            .iter()
            .filter(|player| player.team == team)
            .filter(|player| rule.matches(player))
            .map(|player| player.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::rule::COMMAND_SQUAD_NAME;

    fn create_test_roster() -> Vec<Player> {
        vec![
            Player::new("a1", Team::One).with_role("USA_Rifleman_01"),
            Player::new("a2", Team::One)
                .leading("Alpha")
                .with_role("USA_SL_01"),
            Player::new("a3", Team::One)
                .leading(COMMAND_SQUAD_NAME)
                .with_role("USA_SL_01"),
            Player::new("b1", Team::Two).with_role("RUS_Medic_01"),
            Player::new("b2", Team::Two)
                .leading("Bravo")
                .with_role("RUS_SL_01"),
        ]
    }

    fn ids(cohort: &Cohort) -> Vec<&str> {
        cohort.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_empty_roster() {
        let (one, two) = CohortSelector::select(&[], &SelectionRule::all_players("teams"));
        assert!(one.is_empty());
        assert!(two.is_empty());
    }

    #[test]
    fn test_no_filters_selects_whole_teams() {
        let roster = create_test_roster();
        let (one, two) = CohortSelector::select(&roster, &SelectionRule::all_players("teams"));
        assert_eq!(ids(&one), vec!["a1", "a2", "a3"]);
        assert_eq!(ids(&two), vec!["b1", "b2"]);
    }

    #[test]
    fn test_squad_leaders() {
        let roster = create_test_roster();
        let (one, two) = CohortSelector::select(&roster, &SelectionRule::squad_leaders("sl"));
        assert_eq!(ids(&one), vec!["a2", "a3"]);
        assert_eq!(ids(&two), vec!["b2"]);
    }

    #[test]
    fn test_commanders_missing_on_one_side() {
        let roster = create_test_roster();
        let (one, two) = CohortSelector::select(&roster, &SelectionRule::commanders("cmd"));
        assert_eq!(ids(&one), vec!["a3"]);
        assert!(two.is_empty());
    }

    #[test]
    fn test_unmatched_squad_name_yields_empty_cohorts() {
        let roster = create_test_roster();
        let rule = SelectionRule {
            leader_of_squad: Some("Nobody".to_string()),
            ..SelectionRule::all_players("nobody")
        };
        let (one, two) = CohortSelector::select(&roster, &rule);
        assert!(one.is_empty());
        assert!(two.is_empty());
    }

    #[test]
    fn test_role_pattern() {
        let roster = create_test_roster();
        let rule = SelectionRule::all_players("medics")
            .with_role_pattern("Medic")
            .unwrap();
        let (one, two) = CohortSelector::select(&roster, &rule);
        assert!(one.is_empty());
        assert_eq!(ids(&two), vec!["b1"]);
    }

    #[test]
    fn test_duplicate_entries_collapse() {
        let roster = vec![Player::new("a1", Team::One), Player::new("a1", Team::One)];
        let (one, _) = CohortSelector::select(&roster, &SelectionRule::all_players("teams"));
        assert_eq!(one.len(), 1);
    }
}
