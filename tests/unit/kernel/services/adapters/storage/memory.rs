use super::*;

#[tokio::test]
async fn test_set_get_remove() {
    let store = MemoryStore::new();
    assert_eq!(store.get("a").await.unwrap(), None);
    store.set("a", "1".to_string()).await.unwrap();
    assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
    store.remove("a").await.unwrap();
    store.remove("a").await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_keys_are_sorted() {
    let store = MemoryStore::new();
    store.set("b", String::new()).await.unwrap();
    store.set("a", String::new()).await.unwrap();
    assert_eq!(store.keys().await.unwrap(), vec!["a", "b"]);
    store.clear().await.unwrap();
    assert!(store.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clones_share_entries() {
    let store = MemoryStore::new();
    let other = store.clone();
    store.set("k", "v".to_string()).await.unwrap();
    assert_eq!(other.len(), 1);
}

#[tokio::test]
async fn test_quota_rejects_oversized_write() {
    let store = MemoryStore::with_quota(10);
    store.set("k", "12345".to_string()).await.unwrap();
    let err = store.set("j", "123456".to_string()).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::QuotaExceeded {
            needed: 7,
            available: 4
        }
    ));
    assert_eq!(store.get("j").await.unwrap(), None);
    assert_eq!(store.capacity(), Some(10));
}

#[tokio::test]
async fn test_quota_counts_replaced_value_once() {
    let store = MemoryStore::with_quota(10);
    store.set("k", "123456789".to_string()).await.unwrap();
    store.set("k", "987654321".to_string()).await.unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("987654321"));
}
