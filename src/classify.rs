//! Per-delivery predicates shared by every aggregation.
//!
//! None of these can fail: missing fields fall back to their "no effect"
//! reading (no extras means a legal ball, no dismissal kind means no bowler
//! credit).

use crate::delivery::{Delivery, ExtrasKind};

/// Counts as a ball faced. Wides never do.
pub fn is_legal_for_batting(d: &Delivery) -> bool {
    d.extras != ExtrasKind::Wide
}

/// Counts as a ball bowled. Wides and no-balls never do, although the
/// bowler still concedes their runs.
pub fn is_legal_for_bowling(d: &Delivery) -> bool {
    !matches!(d.extras, ExtrasKind::Wide | ExtrasKind::NoBall)
}

pub fn is_boundary(d: &Delivery) -> bool {
    matches!(d.batter_runs, 4 | 6)
}

pub fn is_dot_ball(d: &Delivery) -> bool {
    d.total_runs == 0
}

pub fn bowler_credited_dismissal(d: &Delivery) -> bool {
    d.is_wicket && d.dismissal_kind.is_some_and(|k| k.credits_bowler())
}

/// Wicket that ends `player`'s innings, whatever the dismissal kind.
pub fn batting_dismissal(d: &Delivery, player: &str) -> bool {
    d.is_wicket && d.player_dismissed.as_deref() == Some(player)
}

/// Wicket that breaks the partnership at the crease on this delivery.
pub fn ends_partnership(d: &Delivery) -> bool {
    batting_dismissal(d, &d.striker) || batting_dismissal(d, &d.non_striker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DismissalKind;

    fn ball(batter_runs: u32, extras: ExtrasKind, extra_runs: u32) -> Delivery {
        Delivery {
            match_id: 1,
            inning: 1,
            striker: "A".to_string(),
            non_striker: "B".to_string(),
            bowler: "X".to_string(),
            batter_runs,
            extra_runs,
            total_runs: batter_runs + extra_runs,
            extras,
            ..Delivery::default()
        }
    }

    #[test]
    fn wides_and_no_balls_differ_between_batting_and_bowling() {
        let wide = ball(0, ExtrasKind::Wide, 1);
        let no_ball = ball(0, ExtrasKind::NoBall, 1);
        let leg_bye = ball(0, ExtrasKind::LegBye, 1);

        assert!(!is_legal_for_batting(&wide));
        assert!(!is_legal_for_bowling(&wide));
        assert!(is_legal_for_batting(&no_ball));
        assert!(!is_legal_for_bowling(&no_ball));
        assert!(is_legal_for_batting(&leg_bye));
        assert!(is_legal_for_bowling(&leg_bye));
    }

    #[test]
    fn boundary_and_dot() {
        assert!(is_boundary(&ball(4, ExtrasKind::None, 0)));
        assert!(is_boundary(&ball(6, ExtrasKind::NoBall, 1)));
        assert!(!is_boundary(&ball(5, ExtrasKind::None, 0)));
        assert!(is_dot_ball(&ball(0, ExtrasKind::None, 0)));
        assert!(!is_dot_ball(&ball(0, ExtrasKind::Bye, 1)));
    }

    #[test]
    fn run_out_ends_innings_without_bowler_credit() {
        let mut d = ball(1, ExtrasKind::None, 0);
        d.is_wicket = true;
        d.player_dismissed = Some("B".to_string());
        d.dismissal_kind = Some(DismissalKind::RunOut);

        assert!(!bowler_credited_dismissal(&d));
        assert!(batting_dismissal(&d, "B"));
        assert!(!batting_dismissal(&d, "A"));
        assert!(ends_partnership(&d));
    }

    #[test]
    fn wicket_without_kind_does_not_credit_bowler() {
        let mut d = ball(0, ExtrasKind::None, 0);
        d.is_wicket = true;
        d.player_dismissed = Some("A".to_string());
        assert!(!bowler_credited_dismissal(&d));

        d.dismissal_kind = Some(DismissalKind::Caught);
        assert!(bowler_credited_dismissal(&d));
    }
}
