use super::*;
use tempfile::tempdir;

#[test]
fn test_data_and_log_dirs_share_app_dir() {
    let Some(app) = get_app_data_dir() else {
        return;
    };
    assert!(app.ends_with(APP_NAME));
    assert_eq!(get_data_dir(), Some(app.join("data")));
    assert_eq!(get_log_dir(), Some(app.join("logs")));
}

#[test]
fn test_ensure_data_dir_prefers_override() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("nested").join("data");
    let created = ensure_data_dir(Some(target.clone())).unwrap();
    assert_eq!(created, target);
    assert!(target.is_dir());
}
