//! Seeding the influencers table from a catalog.

use influencer_pipeline::seeder::{parse_catalog, seed, INFLUENCER_CATALOG};
use influencer_pipeline::testing::MockStore;

const CATALOG: &str = "\
Comedy & Entertainment

Gilmher Croes (@gilmhercroes)
Khaby Lame (@khaby.lame)

Dance
Charli D'Amelio (@charlidamelio)
";

#[tokio::test]
async fn seed_inserts_one_row_per_handle_line() {
    let store = MockStore::new();

    let count = seed(&store, CATALOG).await.unwrap();

    assert_eq!(count, 3);
    assert_eq!(store.insert_batches(), 1);

    let rows = store.influencers();
    let gilmher = rows
        .iter()
        .find(|r| r.name.as_deref() == Some("Gilmher Croes"))
        .expect("seeded row");
    assert_eq!(
        gilmher.tiktok_profile_link.as_deref(),
        Some("https://www.tiktok.com/@gilmhercroes")
    );
    assert!(gilmher.image_url.is_none());
    assert!(gilmher.avatar_id.is_none());
}

#[tokio::test]
async fn failed_insert_writes_nothing() {
    let store = MockStore::new().failing_inserts();

    let err = seed(&store, CATALOG).await.unwrap_err();

    assert!(format!("{err:#}").contains("inserting 3 influencers"));
    assert!(store.influencers().is_empty());
}

#[tokio::test]
async fn catalog_without_handles_inserts_nothing() {
    let store = MockStore::new();

    let count = seed(&store, "Fitness\n\nFood\n").await.unwrap();

    assert_eq!(count, 0);
    assert_eq!(store.insert_batches(), 0);
}

#[test]
fn bundled_catalog_has_unique_ids_and_links() {
    let rows = parse_catalog(INFLUENCER_CATALOG);
    assert!(rows.len() > 100, "bundled catalog parsed to {} rows", rows.len());

    let ids: std::collections::HashSet<_> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids.len(), rows.len());
    assert!(rows
        .iter()
        .all(|r| r.tiktok_profile_link.starts_with("https://www.tiktok.com/@")));
}
