use super::*;
use crate::kernel::editor::FileTab;
use crate::models::{File, FileKind};

fn storage() -> (Storage, MemoryStore) {
    let backend = MemoryStore::new();
    (Storage::new(Arc::new(backend.clone()), 1000), backend)
}

fn project(id: &str) -> Project {
    Project {
        id: ProjectId::new(id),
        name: id.to_string(),
        path: format!("/{id}"),
        files: vec![File {
            id: FileId::new("f"),
            name: "a.js".to_string(),
            kind: FileKind::File,
            path: "/a.js".to_string(),
            content: Some("x".to_string()),
            children: None,
        }],
        created_at: Utc::now(),
        user_id: None,
        is_public: false,
        description: String::new(),
    }
}

fn change(project: &str, file: &str, content: &str) -> PendingChange {
    PendingChange {
        project_id: ProjectId::new(project),
        file_id: FileId::new(file),
        content: content.to_string(),
        queued_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_project_round_trip_registers_id_once() {
    let (storage, _) = storage();
    let p = project("p");
    storage.save_project(&p).await.unwrap();
    storage.save_project(&p).await.unwrap();
    assert_eq!(storage.get_project_ids().await.unwrap(), vec![p.id.clone()]);
    assert_eq!(storage.get_project(&p.id).await.unwrap(), Some(p));
    assert_eq!(storage.get_project(&ProjectId::new("q")).await.unwrap(), None);
}

#[tokio::test]
async fn test_unknown_schema_is_rejected() {
    let (storage, backend) = storage();
    backend
        .set(
            "codecanvas/v1/project/p",
            r#"{"schema":99,"project":null}"#.to_string(),
        )
        .await
        .unwrap();
    let err = storage.get_project(&ProjectId::new("p")).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::UnsupportedSchema {
            found: 99,
            expected: SCHEMA_VERSION
        }
    ));
}

#[tokio::test]
async fn test_delete_project_cascades() {
    let (storage, _) = storage();
    let p = project("p");
    let keep = project("q");
    storage.save_project(&p).await.unwrap();
    storage.save_project(&keep).await.unwrap();
    storage.save_current_project_id(Some(&p.id)).await.unwrap();
    storage
        .save_open_tabs(&p.id, &[FileTab::from_file(&p.files[0])])
        .await
        .unwrap();
    storage
        .save_unsaved_files(&p.id, &[FileId::new("f")])
        .await
        .unwrap();
    storage.add_pending_change(&change("p", "f", "x")).await.unwrap();
    storage.add_pending_change(&change("q", "f", "y")).await.unwrap();
    storage.add_pending_project(&p.id).await.unwrap();

    storage.delete_project(&p.id).await.unwrap();

    assert_eq!(storage.get_project(&p.id).await.unwrap(), None);
    assert_eq!(storage.get_project_ids().await.unwrap(), vec![keep.id.clone()]);
    assert_eq!(storage.get_current_project_id().await.unwrap(), None);
    assert!(storage.load_open_tabs(&p.id).await.unwrap().is_empty());
    assert!(storage.load_unsaved_files(&p.id).await.unwrap().is_empty());
    assert!(storage.get_pending_projects().await.unwrap().is_empty());
    let pending = storage.get_pending_changes().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].project_id, keep.id);
}

#[tokio::test]
async fn test_pending_change_replaces_older_entry() {
    let (storage, _) = storage();
    storage.add_pending_change(&change("p", "a", "1")).await.unwrap();
    storage.add_pending_change(&change("p", "b", "2")).await.unwrap();
    storage.add_pending_change(&change("p", "a", "3")).await.unwrap();

    let pending = storage.get_pending_changes().await.unwrap();
    let contents: Vec<&str> = pending.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["3", "2"]);

    storage.remove_pending_change(&pending[0].key()).await.unwrap();
    assert_eq!(storage.get_pending_changes().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_pending_projects_are_a_set() {
    let (storage, _) = storage();
    let p = ProjectId::new("p");
    storage.add_pending_project(&p).await.unwrap();
    storage.add_pending_project(&p).await.unwrap();
    assert_eq!(storage.get_pending_projects().await.unwrap(), vec![p.clone()]);
    storage.remove_pending_project(&p).await.unwrap();
    assert!(storage.get_pending_projects().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_session_records_round_trip() {
    let (storage, _) = storage();
    let p = project("p");
    let tab = FileTab::from_file(&p.files[0]);
    storage.save_open_tabs(&p.id, &[tab.clone()]).await.unwrap();
    storage
        .save_current_file_id(&p.id, Some(&tab.id))
        .await
        .unwrap();
    assert_eq!(storage.load_open_tabs(&p.id).await.unwrap(), vec![tab.clone()]);
    assert_eq!(
        storage.get_current_file_id(&p.id).await.unwrap(),
        Some(tab.id.clone())
    );
    storage.save_current_file_id(&p.id, None).await.unwrap();
    assert_eq!(storage.get_current_file_id(&p.id).await.unwrap(), None);
}

#[tokio::test]
async fn test_last_sync_and_recent() {
    let (storage, _) = storage();
    assert_eq!(storage.get_last_sync().await.unwrap(), None);
    let now = Utc::now();
    storage.save_last_sync(now).await.unwrap();
    assert_eq!(storage.get_last_sync().await.unwrap(), Some(now));

    let recent = vec![project("p").summary()];
    storage.save_recent_projects(&recent).await.unwrap();
    assert_eq!(storage.load_recent_projects().await.unwrap(), recent);
}

#[tokio::test]
async fn test_usage_and_clear_only_touch_own_keys() {
    let (storage, backend) = storage();
    backend.set("other", "zzz".to_string()).await.unwrap();
    storage.save_last_sync(Utc::now()).await.unwrap();

    let usage = storage.usage().await.unwrap();
    assert!(usage.used > 0);
    assert_eq!(usage.capacity, 1000);
    assert!(usage.percent() > 0.0);

    storage.clear_all().await.unwrap();
    assert_eq!(backend.keys().await.unwrap(), vec!["other"]);
    assert_eq!(storage.usage().await.unwrap().used, 0);
}

#[test]
fn test_usage_percent_with_zero_capacity() {
    let usage = StorageUsage {
        used: 0,
        capacity: 0,
    };
    assert_eq!(usage.percent(), 100.0);
}
