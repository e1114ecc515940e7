use chrono::TimeZone;

use super::*;

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Wire</title>
    <link>https://wire.example.com</link>
    <description>Sports wire</description>
    <item>
      <title>BREAKING: Lakers trade for star guard</title>
      <link>https://wire.example.com/a</link>
      <guid>wire-a</guid>
      <description>&lt;p&gt;The Lakers   acquired a &lt;b&gt;guard&lt;/b&gt;.&lt;/p&gt;</description>
      <pubDate>Mon, 06 Jan 2025 15:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Celtics hold film session</title>
      <link>https://wire.example.com/b</link>
      <guid>wire-b</guid>
      <description>Routine practice notes.</description>
      <pubDate>Mon, 06 Jan 2025 12:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Knuckles ruled out with ankle injury</title>
      <link>https://wire.example.com/c</link>
      <guid>wire-c</guid>
      <pubDate>Mon, 06 Jan 2025 14:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

fn request(limit: usize) -> FetchRequest {
    FetchRequest { since: None, limit }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 6, 16, 0, 0).unwrap()
}

#[test]
fn parses_items_newest_first() {
    let drafts = parse_feed(FEED.as_bytes(), NewsType::Analysis, request(10), now()).unwrap();

    let ids: Vec<&str> = drafts.iter().map(|d| d.external_id.as_str()).collect();
    assert_eq!(ids, ["wire-a", "wire-c", "wire-b"]);
    assert_eq!(drafts[0].url.as_deref(), Some("https://wire.example.com/a"));
    assert_eq!(
        drafts[0].published_at,
        Utc.with_ymd_and_hms(2025, 1, 6, 15, 0, 0).unwrap()
    );
}

#[test]
fn strips_markup_from_content() {
    let drafts = parse_feed(FEED.as_bytes(), NewsType::Analysis, request(10), now()).unwrap();
    assert_eq!(drafts[0].content, "The Lakers acquired a guard .");
    assert_eq!(drafts[1].content, "");
}

#[test]
fn infers_type_from_headline() {
    let drafts = parse_feed(FEED.as_bytes(), NewsType::Analysis, request(10), now()).unwrap();
    assert_eq!(drafts[0].news_type, NewsType::Breaking);
    assert_eq!(drafts[1].news_type, NewsType::Injury);
    assert_eq!(drafts[2].news_type, NewsType::Analysis);
}

#[test]
fn since_and_limit_are_honoured() {
    let since = Utc.with_ymd_and_hms(2025, 1, 6, 13, 0, 0).unwrap();
    let drafts = parse_feed(
        FEED.as_bytes(),
        NewsType::Analysis,
        FetchRequest {
            since: Some(since),
            limit: 1,
        },
        now(),
    )
    .unwrap();

    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].external_id, "wire-a");
}

#[test]
fn garbage_body_is_a_parse_error() {
    let err = parse_feed(b"not a feed", NewsType::Analysis, request(10), now()).unwrap_err();
    assert!(matches!(err, AdapterError::Parse(_)));
    assert!(err.is_retryable());
}

#[test]
fn keyword_rules_apply_in_order() {
    assert_eq!(
        infer_news_type("Breaking: Jets trade pick", NewsType::Analysis),
        NewsType::Breaking
    );
    assert_eq!(
        infer_news_type("Yankees acquire reliever", NewsType::Analysis),
        NewsType::Trade
    );
    assert_eq!(
        infer_news_type("Chiefs open as 3-point favorites, odds shift", NewsType::Analysis),
        NewsType::BettingLine
    );
    assert_eq!(
        infer_news_type("Bruins beat Leafs in overtime", NewsType::Analysis),
        NewsType::GameResult
    );
    assert_eq!(
        infer_news_type("Warriors reportedly eye center", NewsType::Analysis),
        NewsType::Rumor
    );
    assert_eq!(
        infer_news_type("Week 5 kickoff time announced", NewsType::Analysis),
        NewsType::Schedule
    );
    assert_eq!(
        infer_news_type("Film room: zone coverage", NewsType::Rumor),
        NewsType::Rumor
    );
}

#[test]
fn config_errors_are_not_retryable() {
    assert!(!AdapterError::Config("missing feed_url".into()).is_retryable());
    assert!(AdapterError::Status {
        status: 503,
        url: "u".into()
    }
    .is_retryable());
    assert!(!AdapterError::Status {
        status: 404,
        url: "u".into()
    }
    .is_retryable());
}
