//! Comment tree scraping against the in-memory browser.

use std::sync::Arc;
use std::time::Duration;

use thread_ranker::testing::FakeBrowser;
use thread_ranker::{CommentScraper, CommentTreeScraper, NoDelay, RankerError, ScrapeSettings};

const URL: &str = "https://www.reddit.com/r/Fantasy/comments/aaa/best_fantasy/";

fn scraper(browser: &FakeBrowser) -> CommentTreeScraper {
    CommentTreeScraper::new(Arc::new(browser.clone()), Arc::new(NoDelay)).with_settings(
        ScrapeSettings {
            wait_timeout: Duration::from_millis(30),
            poll_interval: Duration::from_millis(5),
            max_expand_rounds: 10,
        },
    )
}

#[tokio::test]
async fn builds_nested_tree_in_page_order() {
    let browser = FakeBrowser::new()
        .with_comment_tree()
        .comment(None, "c1", Some("  The Name of the Wind  "), Some("120"))
        .comment(Some("c1"), "c1r1", Some("Still waiting on book 3"), Some("40"))
        .comment(Some("c1r1"), "c1r1r1", Some("Forever"), Some("7"))
        .comment(None, "c2", Some("Mistborn"), Some("88"));

    let comments = scraper(&browser).scrape(URL).await.unwrap();

    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].text, "The Name of the Wind");
    assert_eq!(comments[0].score, 120);
    assert_eq!(comments[0].replies.len(), 1);
    assert_eq!(comments[0].replies[0].text, "Still waiting on book 3");
    assert_eq!(comments[0].replies[0].replies[0].text, "Forever");
    assert_eq!(comments[0].replies[0].replies[0].score, 7);
    assert!(comments[0].replies[0].replies[0].replies.is_empty());
    assert_eq!(comments[1].text, "Mistborn");
    assert!(comments[1].replies.is_empty());

    assert_eq!(browser.navigations(), vec![URL.to_string()]);
    assert_eq!(browser.quits(), 1);
}

#[tokio::test]
async fn missing_text_slot_and_score_degrade_to_defaults() {
    let browser = FakeBrowser::new()
        .with_comment_tree()
        .comment(None, "deleted", None, Some("12"))
        .comment(None, "hidden", Some("Score hidden"), None)
        .comment(None, "odd", Some("Odd score"), Some("1.2k"));

    let comments = scraper(&browser).scrape(URL).await.unwrap();

    assert_eq!(comments.len(), 3);
    assert_eq!((comments[0].text.as_str(), comments[0].score), ("", 0));
    assert_eq!((comments[1].text.as_str(), comments[1].score), ("Score hidden", 0));
    assert_eq!(comments[2].score, 0);
}

#[tokio::test]
async fn clicks_every_reply_control_until_none_remain() {
    let browser = FakeBrowser::new()
        .with_comment_tree()
        .load_more_round(&["more-1", "more-2"])
        .load_more_round(&["more-3"])
        .comment(None, "c1", Some("Root"), Some("1"));

    let comments = scraper(&browser).scrape(URL).await.unwrap();

    assert_eq!(comments.len(), 1);
    assert_eq!(browser.clicks(), vec!["more-1", "more-2", "more-3"]);
    assert!(browser.script_clicks().is_empty());
}

#[tokio::test]
async fn intercepted_click_falls_back_to_script_click() {
    let browser = FakeBrowser::new()
        .with_comment_tree()
        .load_more_round(&["more-1", "covered"])
        .intercept_clicks_on("covered")
        .comment(None, "c1", Some("Root"), Some("1"));

    scraper(&browser).scrape(URL).await.unwrap();

    assert_eq!(browser.clicks(), vec!["more-1", "covered"]);
    assert_eq!(browser.script_clicks(), vec!["covered"]);
}

#[tokio::test]
async fn expansion_stops_at_round_ceiling() {
    let mut browser = FakeBrowser::new().with_comment_tree();
    for round in 0..5 {
        browser = browser.load_more_round(&[format!("more-{round}").as_str()]);
    }

    let scraper = CommentTreeScraper::new(Arc::new(browser.clone()), Arc::new(NoDelay))
        .with_settings(ScrapeSettings {
            wait_timeout: Duration::from_millis(30),
            poll_interval: Duration::from_millis(5),
            max_expand_rounds: 2,
        });
    scraper.scrape(URL).await.unwrap();

    assert_eq!(browser.clicks(), vec!["more-0", "more-1"]);
    assert_eq!(browser.quits(), 1);
}

#[tokio::test]
async fn missing_comment_tree_yields_empty_and_releases_session() {
    let browser = FakeBrowser::new().comment(None, "c1", Some("Never read"), Some("1"));

    let comments = scraper(&browser).scrape(URL).await.unwrap();

    assert!(comments.is_empty());
    assert_eq!(browser.launches(), 1);
    assert_eq!(browser.quits(), 1);
}

#[tokio::test]
async fn each_scrape_uses_a_fresh_session() {
    let browser = FakeBrowser::new()
        .with_comment_tree()
        .comment(None, "c1", Some("Root"), Some("1"));
    let scraper = scraper(&browser);

    scraper.scrape(URL).await.unwrap();
    scraper.scrape(URL).await.unwrap();

    assert_eq!(browser.launches(), 2);
    assert_eq!(browser.quits(), 2);
}

#[tokio::test]
async fn launch_failure_propagates() {
    let browser = FakeBrowser::new().failing_launch();

    let err = scraper(&browser).scrape(URL).await.unwrap_err();

    assert!(matches!(err, RankerError::Browser(_)), "got {err:?}");
    assert_eq!(browser.quits(), 0);
    assert!(browser.navigations().is_empty());
}
