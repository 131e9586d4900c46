// tests/providers_google_rss.rs
use market_watcher::source::google_rss::GoogleNewsRss;
use market_watcher::source::{select_most_recent, NewsSource};

const FIXTURE: &str = include_str!("fixtures/google_news.xml");

#[tokio::test]
async fn fixture_feed_parses_normalized_items() {
    let src = GoogleNewsRss::from_fixture_str(FIXTURE);
    let items = src.fetch_latest("food tech", 10).await.unwrap();

    // Fourth entry has an empty title and is dropped.
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|it| it.keyword == "food tech"));

    let fund = &items[0];
    assert_eq!(fund.title, "Food tech fund closes & raises again");
    assert_eq!(fund.url, "https://news.example.com/articles/fund-closes");
    assert!(fund.published_at > 1_700_000_000);
}

#[tokio::test]
async fn cap_limits_returned_items() {
    let src = GoogleNewsRss::from_fixture_str(FIXTURE);
    let items = src.fetch_latest("food tech", 1).await.unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn most_recent_selection_breaks_ties_by_feed_order() {
    let src = GoogleNewsRss::from_fixture_str(FIXTURE);
    let items = src.fetch_latest("food tech", 10).await.unwrap();
    // Two items share the newest timestamp; the one listed first wins.
    let picked = select_most_recent(items).unwrap();
    assert_eq!(picked.url, "https://news.example.com/articles/robot-series-b");
}

#[tokio::test]
async fn unparseable_feed_is_an_error_not_a_panic() {
    let src = GoogleNewsRss::from_fixture_str("this is not xml");
    assert!(src.fetch_latest("food tech", 5).await.is_err());
}
