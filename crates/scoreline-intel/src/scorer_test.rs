use chrono::{Duration, TimeZone};

use super::*;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 18, 0, 0).unwrap()
}

fn subject<'a>(
    headline: &'a str,
    news_type: NewsType,
    published_at: DateTime<Utc>,
    teams: &'a [String],
    players: &'a [String],
) -> ScoreSubject<'a> {
    ScoreSubject {
        headline,
        content: "",
        news_type,
        published_at,
        teams,
        players,
    }
}

#[test]
fn weights_sum_to_one() {
    let sum = WEIGHT_RECENCY
        + WEIGHT_TIME_SENSITIVITY
        + WEIGHT_ENTITY_RELEVANCE
        + WEIGHT_TOPIC
        + WEIGHT_EXCLUSIVITY
        + WEIGHT_SOURCE_AUTHORITY
        + WEIGHT_GAME_PROXIMITY
        + WEIGHT_BETTING_RELEVANCE;
    assert!(approx(sum, 1.0));
}

#[test]
fn recency_is_one_for_future_or_now() {
    assert!(approx(recency(0.0), 1.0));
    assert!(approx(recency(-3.0), 1.0));
}

#[test]
fn recency_is_at_most_floor_after_three_days() {
    assert!(recency(72.0) <= 0.05);
    assert!(recency(500.0) <= 0.05);
}

#[test]
fn recency_never_increases() {
    let mut previous = recency(0.0);
    let mut hours = 0.0;
    while hours < 100.0 {
        hours += 0.25;
        let current = recency(hours);
        assert!(current <= previous, "recency rose at {hours}h");
        previous = current;
    }
}

#[test]
fn recency_half_hour_is_about_097() {
    assert!((recency(0.5) - 0.971).abs() < 0.001);
}

#[test]
fn urgent_headline_phrase_overrides_type() {
    assert!(approx(
        time_sensitivity("Developing: storm delays kickoff", NewsType::Analysis),
        1.0
    ));
    assert!(approx(
        time_sensitivity("Season preview", NewsType::Analysis),
        0.2
    ));
    assert!(approx(time_sensitivity("Deal done", NewsType::Trade), 0.9));
}

#[test]
fn entity_relevance_formula() {
    assert!(approx(entity_relevance(0, 0), 0.2));
    assert!(approx(entity_relevance(1, 0), 0.45));
    assert!(approx(entity_relevance(2, 1), 0.7));
    assert!(approx(entity_relevance(5, 10), 1.0));
}

#[test]
fn exclusivity_cascade_is_additive_and_clamped() {
    assert!(approx(exclusivity("Plain update"), 0.3));
    assert!(approx(exclusivity("Exclusive: sources say deal is close"), 0.7));
    assert!(approx(
        exclusivity("BREAKING exclusive, first to report, sources tell us, confirmed"),
        1.0
    ));
    assert!(approx(exclusivity("Great catch via @someone"), 0.1));
}

#[test]
fn exclusivity_matches_only_the_listed_phrases() {
    assert!(approx(exclusivity("Reporter exclusively reveals plan"), 0.55));
    assert!(approx(exclusivity("Per sources, the deal is done"), 0.45));
    assert!(approx(exclusivity("Sources tell the network he is leaving"), 0.45));
    assert!(approx(exclusivity("Team confirmed the signing"), 0.4));

    assert!(approx(exclusivity("Team confirms the signing"), 0.3));
    assert!(approx(exclusivity("Coach will confirm later"), 0.3));
    assert!(approx(exclusivity("Sources said the deal stalled"), 0.3));
    assert!(approx(exclusivity("One source says no"), 0.3));
}

#[test]
fn betting_relevance_cascade() {
    assert!(approx(betting_relevance("anything", NewsType::BettingLine), 1.0));
    assert!(approx(
        betting_relevance("QB listed as questionable", NewsType::Analysis),
        0.9
    ));
    assert!(approx(
        betting_relevance("Guard is day-to-day with a sore ankle", NewsType::Analysis),
        0.6
    ));
    assert!(approx(betting_relevance("Quiet recovery", NewsType::Injury), 0.7));
    assert!(approx(betting_relevance("Deal done", NewsType::Trade), 0.5));
    assert!(approx(betting_relevance("Final", NewsType::GameResult), 0.4));
    assert!(approx(betting_relevance("Notes", NewsType::Rumor), 0.2));
}

#[test]
fn bare_out_and_ruled_out_are_high_betting_relevance() {
    for text in [
        "Mahomes out vs Bills",
        "Star QB will be out Sunday",
        "Guard ruled-out for the opener",
        "Guard ruled out for the opener",
    ] {
        assert!(approx(betting_relevance(text, NewsType::Analysis), 0.9), "{text}");
    }
    assert!(approx(
        betting_relevance("Outstanding outing for the rookie", NewsType::Analysis),
        0.2
    ));
}

#[test]
fn game_proximity_steps() {
    let teams = vec!["Kansas City Chiefs".to_string()];
    let game = |hours: i64| UpcomingGame {
        teams: vec!["Chiefs".to_string(), "Broncos".to_string()],
        starts_at: now() + Duration::hours(hours),
    };

    assert!(approx(game_proximity(&teams, &[game(1)], now()), 1.0));
    assert!(approx(game_proximity(&teams, &[game(10)], now()), 0.8));
    assert!(approx(game_proximity(&teams, &[game(20)], now()), 0.6));
    assert!(approx(game_proximity(&teams, &[game(40)], now()), 0.4));
    assert!(approx(game_proximity(&teams, &[game(100)], now()), 0.3));
}

#[test]
fn game_proximity_uses_nearest_matching_future_game() {
    let teams = vec!["Chiefs".to_string()];
    let games = vec![
        UpcomingGame {
            teams: vec!["Kansas City Chiefs".to_string()],
            starts_at: now() - Duration::hours(1),
        },
        UpcomingGame {
            teams: vec!["Buffalo Bills".to_string()],
            starts_at: now() + Duration::hours(1),
        },
        UpcomingGame {
            teams: vec!["Kansas City Chiefs".to_string()],
            starts_at: now() + Duration::hours(30),
        },
    ];
    assert!(approx(game_proximity(&teams, &games, now()), 0.4));
}

#[test]
fn game_proximity_neutral_without_teams_or_games() {
    let teams = vec!["Chiefs".to_string()];
    assert!(approx(game_proximity(&[], &[], now()), 0.3));
    assert!(approx(game_proximity(&teams, &[], now()), 0.3));
}

#[test]
fn breaking_espn_scenario() {
    let scorer = ImportanceScorer::default();
    let item = subject(
        "BREAKING: Star QB signs record-breaking contract extension",
        NewsType::Breaking,
        now() - Duration::minutes(30),
        &[],
        &[],
    );

    let score = scorer.calculate(&item, Some("ESPN"), &[], now());

    assert!(approx(score.breakdown.time_sensitivity, 1.0));
    assert!((score.breakdown.recency - 0.97).abs() < 0.01);
    assert!(approx(score.breakdown.source_authority, 0.95));
    assert!(approx(score.breakdown.topic_weight, 0.9));
    assert!(approx(score.breakdown.exclusivity, 0.5));
    assert!(approx(score.breakdown.entity_relevance, 0.2));
    assert!(approx(score.breakdown.game_proximity, 0.3));
    assert!(approx(score.breakdown.betting_relevance, 0.2));
    assert_eq!(score.total_score, total_score(&score.breakdown));
    assert_eq!(score.total_score, 73);
    assert_eq!(
        score.reasoning,
        "Very recent news. High-impact breaking news. From authoritative source"
    );
}

#[test]
fn stale_unremarkable_item_falls_back_to_standard_reasoning() {
    let scorer = ImportanceScorer::default();
    let item = subject(
        "Season preview",
        NewsType::Analysis,
        now() - Duration::days(5),
        &[],
        &[],
    );
    let score = scorer.calculate(&item, Some("Local Gazette"), &[], now());
    assert_eq!(score.reasoning, "Standard news item");
}

#[test]
fn total_is_always_in_range() {
    let scorer = ImportanceScorer::default();
    let teams = vec!["Chiefs".to_string(), "Bills".to_string()];
    let players: Vec<String> = (0..6).map(|i| format!("Player {i}")).collect();
    let headlines = [
        "",
        "BREAKING exclusive first to report: QB ruled out, sources say, confirmed",
        "RT: via @fan retweet",
    ];
    let types = [
        NewsType::Trade,
        NewsType::Injury,
        NewsType::GameResult,
        NewsType::BettingLine,
        NewsType::Breaking,
        NewsType::Rumor,
        NewsType::Analysis,
        NewsType::Schedule,
    ];
    let games = vec![UpcomingGame {
        teams: vec!["Chiefs".to_string()],
        starts_at: now() + Duration::hours(1),
    }];

    for headline in headlines {
        for news_type in types {
            for offset in [-10, 0, 1, 30, 100] {
                let item = subject(
                    headline,
                    news_type,
                    now() - Duration::hours(offset),
                    &teams,
                    &players,
                );
                let score = scorer.calculate(&item, Some("ESPN"), &games, now());
                assert!((0..=100).contains(&score.total_score));
            }
        }
    }
}

#[test]
fn extreme_breakdowns_clamp() {
    let all = |v: f64| ScoreBreakdown {
        recency: v,
        time_sensitivity: v,
        entity_relevance: v,
        topic_weight: v,
        exclusivity: v,
        source_authority: v,
        game_proximity: v,
        betting_relevance: v,
    };
    assert_eq!(total_score(&all(1.0)), 100);
    assert_eq!(total_score(&all(0.0)), 0);
}

#[test]
fn batch_is_keyed_by_item_id() {
    let scorer = ImportanceScorer::default();
    let source_id = Uuid::new_v4();
    let make = |headline: &str| NewsItem {
        id: Uuid::new_v4(),
        org_id: Uuid::new_v4(),
        source_id,
        external_id: headline.to_string(),
        news_type: NewsType::Trade,
        sport: scoreline_core::Sport::Nfl,
        headline: headline.to_string(),
        content: String::new(),
        url: None,
        author: None,
        published_at: now(),
        teams: vec![],
        players: vec![],
        topics: vec![],
        content_fingerprint: String::new(),
        importance_score: None,
        score_breakdown: None,
        score_reasoning: None,
        scored_at: None,
        paired: false,
        created_at: now(),
        updated_at: now(),
    };
    let items = vec![make("One"), make("Two")];
    let mut names = HashMap::new();
    names.insert(source_id, "ESPN".to_string());

    let scores = scorer.calculate_batch(&items, &names, &[], now());

    assert_eq!(scores.len(), 2);
    for item in &items {
        let score = &scores[&item.id];
        assert!(approx(score.breakdown.source_authority, 0.95));
    }
}

#[test]
fn sort_by_importance_is_descending_and_stable() {
    let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
    let mut items = vec![
        RankedItem { id: ids[0], importance_score: 40 },
        RankedItem { id: ids[1], importance_score: 80 },
        RankedItem { id: ids[2], importance_score: 40 },
        RankedItem { id: ids[3], importance_score: 90 },
    ];

    sort_by_importance(&mut items);

    let order: Vec<Uuid> = items.iter().map(|i| i.id).collect();
    assert_eq!(order, vec![ids[3], ids[1], ids[0], ids[2]]);
}
