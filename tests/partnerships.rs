use cricket_analytics::aggregate::compute_batting_stats;
use cricket_analytics::config::PartnershipConfig;
use cricket_analytics::delivery::{Delivery, DismissalKind, ExtrasKind};
use cricket_analytics::event_store::{DeliveryFilter, MemoryEventStore};
use cricket_analytics::partnership::{
    compute_partnerships, partnerships_for_player, segment_innings,
};

struct Innings {
    match_id: i64,
    seq: u32,
    balls: Vec<Delivery>,
}

impl Innings {
    fn new(match_id: i64) -> Self {
        Self {
            match_id,
            seq: 0,
            balls: Vec::new(),
        }
    }

    fn push(&mut self, striker: &str, non_striker: &str, batter_runs: u32, extras: ExtrasKind, extra_runs: u32) -> &mut Delivery {
        let d = Delivery {
            match_id: self.match_id,
            inning: 1,
            batting_team: "Sunrisers".to_string(),
            bowling_team: "Royals".to_string(),
            over: self.seq / 6,
            ball: self.seq % 6 + 1,
            striker: striker.to_string(),
            non_striker: non_striker.to_string(),
            bowler: "Archer".to_string(),
            batter_runs,
            extra_runs,
            total_runs: batter_runs + extra_runs,
            extras,
            ..Delivery::default()
        };
        self.seq += 1;
        self.balls.push(d);
        self.balls.last_mut().expect("just pushed")
    }

    fn runs(&mut self, striker: &str, non_striker: &str, runs: u32) {
        self.push(striker, non_striker, runs, ExtrasKind::None, 0);
    }
}

fn out(d: &mut Delivery, who: &str, kind: DismissalKind) {
    d.is_wicket = true;
    d.player_dismissed = Some(who.to_string());
    d.dismissal_kind = Some(kind);
}

#[test]
fn leg_bye_on_dismissal_ball_belongs_to_partnership() {
    let mut inn = Innings::new(11);
    for i in 0..30 {
        if i % 2 == 0 {
            inn.runs("Williamson", "Abhishek", 1);
        } else {
            inn.runs("Abhishek", "Williamson", 2);
        }
    }
    let last = inn.push("Williamson", "Abhishek", 0, ExtrasKind::LegBye, 1);
    out(last, "Williamson", DismissalKind::RunOut);

    let cfg = PartnershipConfig::default();
    let stands = partnerships_for_player(&inn.balls, "Williamson", &cfg);
    assert_eq!(stands.len(), 1);
    let p = &stands[0];
    assert_eq!(p.runs, 15 + 30 + 1);
    assert_eq!(p.balls, 31);
    assert_eq!(p.dismissals, 1);
    assert_eq!(p.unbroken, 0);

    let faced: Vec<Delivery> = inn
        .balls
        .iter()
        .filter(|d| d.striker == "Williamson")
        .cloned()
        .collect();
    let batting = compute_batting_stats(&faced);
    assert_eq!(batting.runs, 15);
    assert_eq!(batting.balls_faced, 16);
    assert_eq!(batting.dismissals, 1);
}

#[test]
fn innings_partnerships_add_up_to_team_total() {
    let mut inn = Innings::new(21);
    for _ in 0..10 {
        inn.runs("Head", "Abhishek", 2);
    }
    inn.push("Head", "Abhishek", 0, ExtrasKind::Wide, 1);
    let wkt = inn.push("Abhishek", "Head", 0, ExtrasKind::None, 0);
    out(wkt, "Abhishek", DismissalKind::Caught);
    for _ in 0..4 {
        inn.runs("Klaasen", "Head", 6);
    }
    inn.push("Head", "Klaasen", 0, ExtrasKind::Bye, 4);
    // non-striker run out ends the stand too
    let ro = inn.push("Klaasen", "Head", 1, ExtrasKind::None, 0);
    out(ro, "Head", DismissalKind::RunOut);
    for _ in 0..3 {
        inn.runs("Klaasen", "Samad", 1);
    }
    inn.push("Samad", "Klaasen", 0, ExtrasKind::NoBall, 1);
    inn.push("Samad", "Klaasen", 0, ExtrasKind::Penalty, 5);

    let stands = segment_innings(&inn.balls);
    let team_total: u32 = inn.balls.iter().map(|d| d.total_runs).sum();
    assert_eq!(stands.iter().map(|s| s.runs).sum::<u32>(), team_total);
    assert_eq!(stands.len(), 3);
    assert_eq!(
        stands.iter().map(|s| s.wicket).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(stands[0].runs, 21);
    assert_eq!(stands[1].runs, 29);
    assert_eq!((stands[2].batter_one.as_str(), stands[2].batter_two.as_str()), ("Klaasen", "Samad"));
    assert!(!stands[2].ended_by_dismissal);

    // every delivery lands in exactly one stand
    let covered: usize = stands
        .iter()
        .map(|s| s.last_ball_seq - s.first_ball_seq + 1)
        .sum();
    assert_eq!(covered, inn.balls.len());
}

#[test]
fn store_backed_partnerships_respect_filters() {
    let mut first = Innings::new(1);
    for _ in 0..8 {
        first.runs("Head", "Abhishek", 3);
    }
    let mut second = Innings::new(2);
    for _ in 0..8 {
        second.runs("Head", "Markram", 1);
    }
    let mut all = first.balls;
    all.extend(second.balls);
    let store = MemoryEventStore::new(all);

    let cfg = PartnershipConfig::default();
    let list = compute_partnerships(&store, "Head", &DeliveryFilter::default(), &cfg)
        .unwrap()
        .data()
        .unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].partner, "Abhishek");
    assert_eq!(list[0].runs, 24);
    assert_eq!(list[1].partner, "Markram");

    let nobody = compute_partnerships(&store, "Gayle", &DeliveryFilter::default(), &cfg).unwrap();
    assert!(nobody.is_empty());
    assert!(compute_partnerships(&store, " ", &DeliveryFilter::default(), &cfg).is_err());
}

#[test]
fn stand_with_blank_partner_is_not_reported() {
    let mut inn = Innings::new(31);
    for _ in 0..10 {
        inn.runs("Head", "", 2);
    }
    let cfg = PartnershipConfig::default();
    assert!(partnerships_for_player(&inn.balls, "Head", &cfg).is_empty());

    // the innings view still accounts for the runs
    let stands = segment_innings(&inn.balls);
    assert_eq!(stands.len(), 1);
    assert_eq!(stands[0].runs, 20);
}
