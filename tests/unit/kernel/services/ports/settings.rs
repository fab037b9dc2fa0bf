use super::*;

#[test]
fn settings_defaults() {
    let settings = Settings::default();
    assert!(settings.sync.auto_sync);
    assert_eq!(settings.sync.auto_sync_interval_secs, 300);
    assert_eq!(settings.storage.capacity_bytes, 5 * 1024 * 1024);
    assert_eq!(settings.recent_projects_limit, 5);
    assert!(settings.log.filter.is_none());
}

#[test]
fn partial_settings_file_fills_in_defaults() {
    let settings: Settings =
        serde_json::from_str(r#"{"sync":{"auto_sync":false}}"#).expect("deserialize Settings");
    assert!(!settings.sync.auto_sync);
    assert_eq!(
        settings.sync.auto_sync_interval_secs,
        DEFAULT_AUTO_SYNC_INTERVAL_SECS
    );
    assert_eq!(settings.recent_projects_limit, DEFAULT_RECENT_PROJECTS_LIMIT);
    assert!(settings.storage.data_dir.is_none());
}

#[test]
fn settings_serde_roundtrip() {
    let mut original = Settings::default();
    original.storage.data_dir = Some(PathBuf::from("/tmp/codecanvas"));
    original.log.filter = Some("codecanvas=debug".to_string());
    let json = serde_json::to_string(&original).expect("serialize Settings");
    let decoded: Settings = serde_json::from_str(&json).expect("deserialize Settings");
    assert_eq!(decoded.storage.data_dir, original.storage.data_dir);
    assert_eq!(decoded.log.filter, original.log.filter);
}
