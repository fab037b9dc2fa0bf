use super::*;
use chrono::TimeZone;

fn sample_project() -> Project {
    Project {
        id: ProjectId::new("p1"),
        name: "demo".to_string(),
        path: "/demo".to_string(),
        files: vec![File {
            id: FileId::new("f1"),
            name: "index.js".to_string(),
            kind: FileKind::File,
            path: "/index.js".to_string(),
            content: Some("a".to_string()),
            children: None,
        }],
        created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        user_id: None,
        is_public: false,
        description: String::new(),
    }
}

#[test]
fn test_generated_ids_are_unique() {
    let a = FileId::generate();
    let b = FileId::generate();
    assert_ne!(a, b);
    assert_eq!(a.as_str().len(), 36);
}

#[test]
fn test_file_serializes_type_field() {
    let project = sample_project();
    let json = serde_json::to_value(&project.files[0]).unwrap();
    assert_eq!(json["type"], "file");
    assert_eq!(json["id"], "f1");
    assert!(json.get("children").is_none());
}

#[test]
fn test_project_defaults_optional_fields() {
    let json = r#"{
        "id": "p1",
        "name": "demo",
        "path": "/demo",
        "files": [],
        "created_at": "2024-01-02T03:04:05Z"
    }"#;
    let project: Project = serde_json::from_str(json).unwrap();
    assert!(!project.is_remote());
    assert!(!project.is_public);
    assert!(project.description.is_empty());
}

#[test]
fn test_summary_copies_identity() {
    let project = sample_project();
    let summary = project.summary();
    assert_eq!(summary.id, project.id);
    assert_eq!(summary.name, "demo");
    assert_eq!(summary.created_at, project.created_at);
}

#[test]
fn test_patch_applies_only_set_fields() {
    let mut project = sample_project();
    let patch = ProjectPatch {
        is_public: Some(true),
        ..ProjectPatch::default()
    };
    patch.apply(&mut project);
    assert!(project.is_public);
    assert_eq!(project.name, "demo");

    let json = serde_json::to_value(&patch).unwrap();
    assert_eq!(json, serde_json::json!({ "is_public": true }));
}

#[test]
fn test_directory_accessors() {
    let dir = File {
        id: FileId::new("d"),
        name: "src".to_string(),
        kind: FileKind::Directory,
        path: "/src".to_string(),
        content: None,
        children: Some(vec![FileId::new("a")]),
    };
    assert!(dir.is_dir());
    assert_eq!(dir.content_str(), "");
    assert_eq!(dir.child_ids(), &[FileId::new("a")]);
}
