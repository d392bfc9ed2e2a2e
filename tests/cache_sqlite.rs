use cardinal_league::cache::{CachedVerdict, SqliteVerdictCache, VerdictCacheKey};
use cardinal_league::VerdictCache;
use tempfile::tempdir;

fn key(content_a: &str, content_b: &str) -> VerdictCacheKey {
    VerdictCacheKey::new(
        "openai/gpt-4o-mini",
        "pairwise_v1",
        "template_hash",
        "how memorable the tagline is",
        content_a,
        content_b,
    )
}

fn verdict(winner: &str) -> CachedVerdict {
    CachedVerdict {
        winner: winner.to_string(),
        rationale: Some("shorter and sharper".to_string()),
    }
}

#[tokio::test]
async fn sqlite_cache_put_get_increments_hit_count() {
    let dir = tempdir().unwrap();
    let cache = SqliteVerdictCache::new(dir.path().join("cache.sqlite")).unwrap();
    let key = key("Think different.", "Just do it.");

    assert!(cache.get(&key).await.unwrap().is_none());
    cache.put(&key, &verdict("player_a")).await.unwrap();

    let hit = cache.get(&key).await.unwrap().unwrap();
    assert_eq!(hit.winner, "player_a");
    assert_eq!(hit.rationale.as_deref(), Some("shorter and sharper"));
    let _ = cache.get(&key).await.unwrap().unwrap();

    assert_eq!(cache.len().await.unwrap(), 1);
    assert_eq!(cache.total_hits().await.unwrap(), 2);
}

#[tokio::test]
async fn sqlite_cache_put_overwrites_existing_verdict() {
    let dir = tempdir().unwrap();
    let cache = SqliteVerdictCache::new(dir.path().join("cache.sqlite")).unwrap();
    let key = key("Think different.", "Just do it.");

    cache.put(&key, &verdict("player_a")).await.unwrap();
    cache.put(&key, &verdict("draw")).await.unwrap();

    assert_eq!(cache.get(&key).await.unwrap().unwrap().winner, "draw");
    assert_eq!(cache.len().await.unwrap(), 1);
}

#[tokio::test]
async fn swapped_contents_are_separate_entries() {
    let dir = tempdir().unwrap();
    let cache = SqliteVerdictCache::new(dir.path().join("cache.sqlite")).unwrap();

    cache
        .put(&key("Think different.", "Just do it."), &verdict("player_a"))
        .await
        .unwrap();
    assert!(cache
        .get(&key("Just do it.", "Think different."))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn sqlite_cache_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.sqlite");
    let key = key("Think different.", "Just do it.");

    {
        let cache = SqliteVerdictCache::new(&path).unwrap();
        cache.put(&key, &verdict("player_b")).await.unwrap();
    }

    let reopened = SqliteVerdictCache::new(&path).unwrap();
    assert_eq!(reopened.path(), path.as_path());
    assert_eq!(reopened.get(&key).await.unwrap().unwrap().winner, "player_b");
}

#[tokio::test]
async fn sqlite_cache_prune_max_rows_keeps_most_recent() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("cache.sqlite");
    let cache = SqliteVerdictCache::new(&db_path).unwrap();

    let old_key = key("Think different.", "Just do it.");
    let new_key = key("I'm lovin' it.", "Because you're worth it.");
    cache.put(&old_key, &verdict("player_a")).await.unwrap();
    cache.put(&new_key, &verdict("player_b")).await.unwrap();

    // Age the first row so the ordering is deterministic.
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    conn.execute(
        "UPDATE verdict_cache SET updated_at = 0 WHERE key_hash = ?1",
        rusqlite::params![old_key.key_hash],
    )
    .unwrap();

    let stats = cache.prune(None, Some(1)).await.unwrap();
    assert_eq!(stats.deleted, 1);
    assert_eq!(stats.remaining, 1);
    assert!(cache.get(&old_key).await.unwrap().is_none());
    assert!(cache.get(&new_key).await.unwrap().is_some());
}

#[tokio::test]
async fn sqlite_cache_prune_by_age_drops_stale_rows() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("cache.sqlite");
    let cache = SqliteVerdictCache::new(&db_path).unwrap();

    let stale = key("Think different.", "Just do it.");
    let fresh = key("I'm lovin' it.", "Because you're worth it.");
    cache.put(&stale, &verdict("player_a")).await.unwrap();
    cache.put(&fresh, &verdict("player_b")).await.unwrap();

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    conn.execute(
        "UPDATE verdict_cache SET updated_at = 0 WHERE key_hash = ?1",
        rusqlite::params![stale.key_hash],
    )
    .unwrap();

    let stats = cache.prune(Some(30), None).await.unwrap();
    assert_eq!(stats.deleted, 1);
    assert_eq!(stats.remaining, 1);
    assert!(cache.get(&fresh).await.unwrap().is_some());
}
