//! Resolving profile pictures through image search.

use std::time::Duration;

use tokio::time::Instant;

use influencer_pipeline::image_resolver::{ImageResolver, ImageStats, REQUEST_INTERVAL};
use influencer_pipeline::testing::{influencer, MockImageSearch, MockStore};

#[tokio::test(start_paused = true)]
async fn requests_are_spaced_by_the_interval() {
    let khaby = influencer("Khaby Lame");
    let addison = influencer("Addison Rae");
    let store = MockStore::new()
        .with_influencer(khaby.clone())
        .with_influencer(addison.clone());
    let search = MockImageSearch::new()
        .on("test", "https://img/test.jpg")
        .on("Khaby Lame", "https://img/khaby.jpg");

    let start = Instant::now();
    let stats = ImageResolver::new(&search, &store).run().await.unwrap();

    assert_eq!(
        stats,
        ImageStats {
            updated: 1,
            no_image: 1,
            failed: 0,
            skipped: 0
        }
    );

    let calls = search.calls();
    let names: Vec<&str> = calls.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["test", "Khaby Lame", "Addison Rae"]);

    // The warm-up call waits too.
    assert!(calls[0].1 - start >= REQUEST_INTERVAL);
    for pair in calls.windows(2) {
        assert!(pair[1].1 - pair[0].1 >= REQUEST_INTERVAL);
    }

    assert_eq!(
        store.influencer(khaby.id).unwrap().image_url.as_deref(),
        Some("https://img/khaby.jpg")
    );
    assert!(store.influencer(addison.id).unwrap().image_url.is_none());
}

#[tokio::test(start_paused = true)]
async fn rejected_key_mid_batch_aborts_the_run() {
    let khaby = influencer("Khaby Lame");
    let addison = influencer("Addison Rae");
    let store = MockStore::new()
        .with_influencer(khaby)
        .with_influencer(addison.clone());
    let search = MockImageSearch::new()
        .on("test", "https://img/test.jpg")
        .reject("Khaby Lame")
        .on("Addison Rae", "https://img/addison.jpg");

    let err = ImageResolver::new(&search, &store).run().await.unwrap_err();

    assert!(err.to_string().contains("rejected the API key"));
    let names: Vec<String> = search.calls().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["test", "Khaby Lame"]);
    assert!(store.influencer(addison.id).unwrap().image_url.is_none());
}

#[tokio::test(start_paused = true)]
async fn rejected_key_at_warm_up_touches_no_rows() {
    let store = MockStore::new().with_influencer(influencer("Khaby Lame"));
    let search = MockImageSearch::new().reject("test");

    let result = ImageResolver::new(&search, &store).run().await;

    assert!(result.is_err());
    assert_eq!(search.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn warm_up_without_image_aborts() {
    let store = MockStore::new().with_influencer(influencer("Khaby Lame"));
    let search = MockImageSearch::new().on("Khaby Lame", "https://img/khaby.jpg");

    let err = ImageResolver::new(&search, &store).run().await.unwrap_err();

    assert!(err.to_string().contains("returned no image"));
    assert_eq!(search.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn per_influencer_errors_do_not_stop_the_batch() {
    let khaby = influencer("Khaby Lame");
    let addison = influencer("Addison Rae");
    let mut blank = influencer("placeholder");
    blank.name = Some("   ".into());
    let store = MockStore::new()
        .with_influencer(khaby.clone())
        .with_influencer(blank)
        .with_influencer(addison.clone());
    let search = MockImageSearch::new()
        .on("test", "https://img/test.jpg")
        .fail("Khaby Lame")
        .on("Addison Rae", "https://img/addison.jpg");

    let stats = ImageResolver::new(&search, &store)
        .with_interval(Duration::from_millis(10))
        .run()
        .await
        .unwrap();

    assert_eq!(
        stats,
        ImageStats {
            updated: 1,
            no_image: 0,
            failed: 1,
            skipped: 1
        }
    );
    assert!(store.influencer(khaby.id).unwrap().image_url.is_none());
    assert_eq!(
        store.influencer(addison.id).unwrap().image_url.as_deref(),
        Some("https://img/addison.jpg")
    );
}
