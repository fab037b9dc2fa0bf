use super::*;
use tempfile::tempdir;

#[test]
fn test_settings_path_is_namespaced() {
    if let Some(path) = get_settings_path() {
        assert!(path.ends_with("codecanvas/settings.json"));
    }
}

#[test]
fn test_load_settings_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{"recent_projects_limit": 9}"#).unwrap();
    let settings = load_settings_from(&path).unwrap();
    assert_eq!(settings.recent_projects_limit, 9);
    assert!(settings.sync.auto_sync);
}

#[test]
fn test_invalid_or_missing_file_yields_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    assert!(load_settings_from(&path).is_none());
    std::fs::write(&path, "not json").unwrap();
    assert!(load_settings_from(&path).is_none());
}
