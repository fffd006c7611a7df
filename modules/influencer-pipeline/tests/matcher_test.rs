//! Avatar matching across the worker pool.

use std::sync::Arc;

use httpmock::prelude::*;
use serde_json::json;

use influencer_common::AvatarProfile;
use influencer_pipeline::matcher::{
    match_avatars, run_matching_pool, MatchOutcome, MatchStats, VisionMatcher, WORKER_COUNT,
};
use influencer_pipeline::testing::{
    avatar_match, influencer, influencer_with_image, CallLog, MockMatcher, MockStore,
};
use influencer_pipeline::traits::AvatarMatcher;

fn roster_store(log: &CallLog) -> MockStore {
    MockStore::new()
        .with_log(log.clone())
        .with_avatar("a1", None, Some("Young woman, long brown hair."))
        .with_avatar("a2", None, Some("Older man, grey beard."))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reports_k_failures_and_writes_only_successes_after_the_pool() {
    let log = CallLog::new();
    let mut store = roster_store(&log);
    let mut matcher = MockMatcher::new().with_log(log.clone());

    // 7 matchable, 2 rejected by the model, 1 without an image, 1 choosing an
    // avatar outside the roster: N = 11, K = 4.
    let mut expected_matches = Vec::new();
    for i in 0..7 {
        let url = format!("https://img/ok{i}.jpg");
        let row = influencer_with_image(&format!("Match {i}"), &url);
        let avatar = if i % 2 == 0 { "a1" } else { "a2" };
        matcher = matcher.on(&url, avatar_match(avatar, 0.8));
        expected_matches.push((row.id, avatar));
        store = store.with_influencer(row);
    }
    for i in 0..2 {
        store = store.with_influencer(influencer_with_image(
            &format!("Rejected {i}"),
            &format!("https://img/bad{i}.jpg"),
        ));
    }
    let no_image = influencer("No Image");
    store = store.with_influencer(no_image.clone());
    let rogue = influencer_with_image("Rogue", "https://img/rogue.jpg");
    matcher = matcher.on("https://img/rogue.jpg", avatar_match("not_in_roster", 0.99));
    store = store.with_influencer(rogue.clone());

    let stats = match_avatars(&store, || matcher.clone(), WORKER_COUNT)
        .await
        .unwrap();

    assert_eq!(
        stats,
        MatchStats {
            matched: 7,
            failed: 4
        }
    );

    let entries = log.entries();
    let match_calls = entries.iter().filter(|e| e.starts_with("match:")).count();
    let writes: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.starts_with("set_avatar:"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(match_calls, 10, "influencer without image never reaches the model");
    assert_eq!(writes.len(), 7);
    let last_match = entries
        .iter()
        .rposition(|e| e.starts_with("match:"))
        .unwrap();
    assert!(writes.iter().all(|&w| w > last_match));

    for (id, avatar) in expected_matches {
        assert_eq!(store.influencer(id).unwrap().avatar_id.as_deref(), Some(avatar));
    }
    assert!(store.influencer(no_image.id).unwrap().avatar_id.is_none());
    assert!(store.influencer(rogue.id).unwrap().avatar_id.is_none());
}

#[tokio::test]
async fn pool_returns_one_outcome_per_influencer() {
    let roster = Arc::new(vec![AvatarProfile {
        avatar_id: "a1".into(),
        image_url: None,
        description: Some("Young woman.".into()),
    }]);
    let influencers: Vec<_> = (0..20)
        .map(|i| influencer_with_image(&format!("Person {i}"), "https://img/same.jpg"))
        .collect();
    let matcher = MockMatcher::new().on("https://img/same.jpg", avatar_match("a1", 1.7));

    let outcomes = run_matching_pool(influencers.clone(), roster, 3, || matcher.clone()).await;

    assert_eq!(outcomes.len(), 20);
    for inf in &influencers {
        let outcome = outcomes
            .iter()
            .find(|o| o.influencer_id() == inf.id)
            .unwrap();
        match outcome {
            MatchOutcome::Matched { confidence, .. } => assert_eq!(*confidence, 1.0),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}

#[tokio::test]
async fn panic_on_one_influencer_keeps_the_rest_of_the_batch() {
    let log = CallLog::new();
    let mut store = roster_store(&log);
    let mut matcher = MockMatcher::new();
    let mut rows = Vec::new();
    for i in 0..6 {
        let url = format!("https://img/p{i}.jpg");
        let row = influencer_with_image(&format!("Person {i}"), &url);
        matcher = if i == 5 {
            matcher.panic_on(&url)
        } else {
            matcher.on(&url, avatar_match("a1", 0.6))
        };
        rows.push(row.clone());
        store = store.with_influencer(row);
    }

    let stats = match_avatars(&store, || matcher.clone(), 1).await.unwrap();

    assert_eq!(
        stats,
        MatchStats {
            matched: 5,
            failed: 1
        }
    );
    for row in &rows[..5] {
        assert_eq!(store.influencer(row.id).unwrap().avatar_id.as_deref(), Some("a1"));
    }
    assert!(store.influencer(rows[5].id).unwrap().avatar_id.is_none());
}

#[tokio::test]
async fn panicked_match_is_reported_as_a_failed_outcome() {
    let roster = Arc::new(vec![AvatarProfile {
        avatar_id: "a1".into(),
        image_url: None,
        description: Some("Young woman.".into()),
    }]);
    let crash = influencer_with_image("Crash", "https://img/crash.jpg");
    let fine = influencer_with_image("Fine", "https://img/fine.jpg");
    let matcher = MockMatcher::new()
        .panic_on("https://img/crash.jpg")
        .on("https://img/fine.jpg", avatar_match("a1", 0.9));

    let outcomes =
        run_matching_pool(vec![crash.clone(), fine.clone()], roster, 2, || matcher.clone()).await;

    assert_eq!(outcomes.len(), 2);
    let crashed = outcomes
        .iter()
        .find(|o| o.influencer_id() == crash.id)
        .unwrap();
    assert_eq!(
        crashed,
        &MatchOutcome::Failed {
            influencer_id: crash.id,
            reason: "matcher panicked".into()
        }
    );
    assert!(outcomes
        .iter()
        .any(|o| o.influencer_id() == fine.id && o.is_match()));
}

#[tokio::test]
async fn empty_roster_skips_matching() {
    let log = CallLog::new();
    let store = MockStore::new()
        .with_log(log.clone())
        .with_influencer(influencer_with_image("Khaby Lame", "https://img/k.jpg"));
    let matcher = MockMatcher::new().with_log(log.clone());

    let stats = match_avatars(&store, || matcher.clone(), WORKER_COUNT)
        .await
        .unwrap();

    assert_eq!(stats, MatchStats::default());
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn vision_matcher_sends_roster_prompt_and_schema() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .body_includes("gpt-4o-mini")
                .body_includes("json_schema")
                .body_includes("Avatar a1: Young woman, long brown hair.")
                .body_includes("https://img/khaby.jpg");
            then.status(200).json_body(json!({
                "choices": [{"message": {
                    "role": "assistant",
                    "content": "{\"reasoning\":\"Same hair.\",\"best_match_avatar_id\":\"a1\",\"confidence_score\":0.72}"
                }}]
            }));
        })
        .await;

    let roster = vec![AvatarProfile {
        avatar_id: "a1".into(),
        image_url: None,
        description: Some("Young woman, long brown hair.".into()),
    }];
    let matcher = VisionMatcher::new("sk-test").with_base_url(&server.base_url());
    let result = matcher
        .match_avatar("https://img/khaby.jpg", &roster)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.best_match_avatar_id, "a1");
    assert_eq!(result.confidence_score, 0.72);
}
