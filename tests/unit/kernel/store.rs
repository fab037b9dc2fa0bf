use super::*;
use crate::models::{ProjectId, UserId};
use chrono::Utc;

fn project(user: Option<&str>) -> Project {
    Project {
        id: ProjectId::new("p"),
        name: "demo".to_string(),
        path: "/demo".to_string(),
        files: Vec::new(),
        created_at: Utc::now(),
        user_id: user.map(UserId::new),
        is_public: false,
        description: String::new(),
    }
}

fn new_store(user: Option<&str>) -> Store {
    let mut store = Store::new();
    store
        .open_project(project(user), EditorSession::new())
        .unwrap();
    store
}

fn tree(store: &Store) -> &crate::models::FileTree {
    &store.project().unwrap().tree
}

fn path_of(store: &Store, id: &FileId) -> String {
    tree(store).path(id).unwrap()
}

#[test]
fn test_operations_need_a_project() {
    let mut store = Store::new();
    assert!(matches!(
        store.create_file("a.js", None),
        Err(WorkspaceError::NoActiveProject)
    ));
    assert!(matches!(
        store.paste_file(None),
        Err(WorkspaceError::NoActiveProject)
    ));
    assert!(!store.has_unsaved_changes(&FileId::new("a")));
}

#[test]
fn test_create_file_opens_it() {
    let mut store = new_store(None);
    let result = store.create_file("b.js", None).unwrap();
    let file = result.value;
    assert_eq!(file.path, "/b.js");
    assert_eq!(file.content.as_deref(), Some(""));
    assert_eq!(
        result.effects,
        vec![Effect::PersistProject, Effect::PersistSession]
    );
    let session = &store.project().unwrap().session;
    assert_eq!(session.current_id(), Some(&file.id));
}

#[test]
fn test_remote_projects_request_sync() {
    let mut store = new_store(Some("u"));
    let folder = store.create_folder("src", None).unwrap();
    assert_eq!(
        folder.effects,
        vec![Effect::PersistProject, Effect::SyncProject]
    );
    assert!(store.project().unwrap().session.tabs().is_empty());
}

#[test]
fn test_create_duplicate_path_fails() {
    let mut store = new_store(None);
    store.create_file("a.js", None).unwrap();
    assert!(matches!(
        store.create_file("a.js", None),
        Err(WorkspaceError::DuplicatePath(p)) if p == "/a.js"
    ));
    assert_eq!(tree(&store).len(), 1);
}

#[test]
fn test_create_under_file_is_invalid_target() {
    let mut store = new_store(None);
    let a = store.create_file("a.js", None).unwrap().value;
    assert!(matches!(
        store.create_file("b.js", Some(&a.id)),
        Err(WorkspaceError::InvalidTarget(_))
    ));
    assert!(matches!(
        store.create_file("b.js", Some(&FileId::new("missing"))),
        Err(WorkspaceError::NotFound(Entity::File(_)))
    ));
}

#[test]
fn test_delete_directory_closes_tabs_and_drops_pending() {
    let mut store = new_store(Some("u"));
    let src = store.create_folder("src", None).unwrap().value;
    let a = store.create_file("a.js", Some(&src.id)).unwrap().value;
    let result = store.delete_file(&src.id).unwrap();
    assert_eq!(result.value, vec![src.id.clone(), a.id.clone()]);
    assert!(result.effects.contains(&Effect::PersistSession));
    assert!(result.effects.contains(&Effect::DropPending {
        project: ProjectId::new("p"),
        files: vec![src.id.clone(), a.id.clone()],
    }));
    assert!(store.project().unwrap().session.tabs().is_empty());
    assert!(store.find_file(&a.id).is_none());
    assert!(matches!(
        store.delete_file(&src.id),
        Err(WorkspaceError::NotFound(_))
    ));
}

#[test]
fn test_rename_updates_open_tab() {
    let mut store = new_store(None);
    let src = store.create_folder("src", None).unwrap().value;
    let a = store.create_file("a.js", Some(&src.id)).unwrap().value;
    let result = store.rename_file(&src.id, "lib").unwrap();
    assert_eq!(result.value.path, "/lib");
    assert!(result.effects.contains(&Effect::PersistSession));
    assert_eq!(path_of(&store, &a.id), "/lib/a.js");
    assert_eq!(
        store.project().unwrap().session.tab(&a.id).unwrap().path,
        "/lib/a.js"
    );
}

#[test]
fn test_rename_collision_is_atomic() {
    let mut store = new_store(None);
    let foo = store.create_file("foo.js", None).unwrap().value;
    let bar = store.create_file("bar.js", None).unwrap().value;
    assert!(matches!(
        store.rename_file(&bar.id, "foo.js"),
        Err(WorkspaceError::DuplicatePath(_))
    ));
    assert_eq!(path_of(&store, &foo.id), "/foo.js");
    assert_eq!(path_of(&store, &bar.id), "/bar.js");
    assert!(matches!(
        store.rename_file(&bar.id, "a/b"),
        Err(WorkspaceError::InvalidName(_))
    ));
}

#[test]
fn test_move_to_root_and_into_self() {
    let mut store = new_store(None);
    let src = store.create_folder("src", None).unwrap().value;
    let util = store.create_file("util.js", Some(&src.id)).unwrap().value;
    let moved = store.move_file(&util.id, None).unwrap().value;
    assert_eq!(moved.path, "/util.js");
    assert!(tree(&store).children(Some(&src.id)).unwrap().is_empty());

    assert!(matches!(
        store.move_file(&src.id, Some(&src.id)),
        Err(WorkspaceError::InvalidTarget(_))
    ));
    assert!(matches!(
        store.move_file(&src.id, Some(&util.id)),
        Err(WorkspaceError::InvalidTarget(_))
    ));
}

#[test]
fn test_paste_twice_auto_suffixes() {
    let mut store = new_store(None);
    let a = store.create_file("a.js", None).unwrap().value;
    store.save_file(&a.id, "body").unwrap();
    store.copy_file(&a.id).unwrap();

    let first = store.paste_file(None).unwrap().value;
    let second = store.paste_file(None).unwrap().value;
    assert_eq!(path_of(&store, &first[0]), "/a (1).js");
    assert_eq!(path_of(&store, &second[0]), "/a (2).js");
    assert_eq!(tree(&store).content(&second[0]), Some("body"));
}

#[test]
fn test_paste_with_empty_clipboard_is_noop() {
    let mut store = new_store(None);
    let result = store.paste_file(None).unwrap();
    assert!(result.value.is_empty());
    assert!(result.effects.is_empty());
}

#[test]
fn test_paste_into_file_is_rejected() {
    let mut store = new_store(None);
    let a = store.create_file("a.js", None).unwrap().value;
    store.copy_file(&a.id).unwrap();
    assert!(matches!(
        store.paste_file(Some(&a.id)),
        Err(WorkspaceError::InvalidTarget(_))
    ));
    assert_eq!(tree(&store).len(), 1);
}

#[test]
fn test_clipboard_is_a_snapshot() {
    let mut store = new_store(None);
    let src = store.create_folder("src", None).unwrap().value;
    store.create_file("a.js", Some(&src.id)).unwrap();
    store.copy_file(&src.id).unwrap();
    store.delete_file(&src.id).unwrap();

    let created = store.paste_file(None).unwrap().value;
    assert_eq!(created.len(), 2);
    assert_eq!(path_of(&store, &created[0]), "/src");
    assert_eq!(path_of(&store, &created[1]), "/src/a.js");
}

#[test]
fn test_duplicate_returns_new_ids_and_keeps_clipboard() {
    let mut store = new_store(None);
    let src = store.create_folder("src", None).unwrap().value;
    let a = store.create_file("a.js", Some(&src.id)).unwrap().value;
    assert!(store.clipboard().is_none());

    let copies = store.duplicate_file(&a.id).unwrap().value;
    assert_eq!(copies.len(), 1);
    assert_eq!(path_of(&store, &copies[0]), "/src/a (1).js");
    assert!(store.clipboard().is_none());

    let dir_copies = store.duplicate_file(&src.id).unwrap().value;
    assert_eq!(path_of(&store, &dir_copies[0]), "/src (1)");
    assert_eq!(dir_copies.len(), 3);
}

#[test]
fn test_edit_save_cycle() {
    let mut store = new_store(Some("u"));
    let b = store.create_file("b.js", None).unwrap().value;

    store.update_file_content(&b.id, "x").unwrap();
    assert!(store.has_unsaved_changes(&b.id));
    assert_eq!(tree(&store).content(&b.id), Some(""));

    let saved = store.save_file(&b.id, "x").unwrap();
    assert!(saved.value);
    assert!(!store.has_unsaved_changes(&b.id));
    assert_eq!(tree(&store).content(&b.id), Some("x"));
    let pushes = saved
        .effects
        .iter()
        .filter(|e| matches!(e, Effect::PushFile { .. }))
        .count();
    assert_eq!(pushes, 1);

    let again = store.save_file(&b.id, "x").unwrap();
    assert!(!again.value);
    assert!(again.effects.is_empty());
}

#[test]
fn test_update_content_opens_closed_file() {
    let mut store = new_store(None);
    let a = store.create_file("a.js", None).unwrap().value;
    store.close_file(&a.id).unwrap();
    store.update_file_content(&a.id, "typed").unwrap();
    let session = &store.project().unwrap().session;
    assert_eq!(session.tab(&a.id).unwrap().content, "typed");

    let src = store.create_folder("src", None).unwrap().value;
    assert!(matches!(
        store.update_file_content(&src.id, "x"),
        Err(WorkspaceError::InvalidTarget(_))
    ));
}

#[test]
fn test_close_discards_working_copy() {
    let mut store = new_store(None);
    let a = store.create_file("a.js", None).unwrap().value;
    store.save_file(&a.id, "committed").unwrap();
    store.update_file_content(&a.id, "draft").unwrap();
    assert!(store.close_file(&a.id).unwrap().value);
    assert!(!store.has_unsaved_changes(&a.id));
    assert_eq!(tree(&store).content(&a.id), Some("committed"));
    assert!(!store.close_file(&a.id).unwrap().value);
}

#[test]
fn test_tab_focus_and_order() {
    let mut store = new_store(None);
    let a = store.create_file("a.js", None).unwrap().value;
    let b = store.create_file("b.js", None).unwrap().value;
    assert!(store.set_current_file(&a.id).unwrap().value);
    assert!(matches!(
        store.set_current_file(&FileId::new("nope")),
        Err(WorkspaceError::NotFound(_))
    ));
    store
        .reorder_tabs(&[b.id.clone(), a.id.clone()])
        .unwrap();
    assert!(matches!(
        store.reorder_tabs(&[b.id.clone()]),
        Err(WorkspaceError::InvalidTabOrder)
    ));
}

#[test]
fn test_toggle_public_patches_remote() {
    let mut store = new_store(Some("u"));
    let result = store.toggle_public().unwrap();
    assert!(result.value);
    assert_eq!(
        result.effects,
        vec![
            Effect::PersistProject,
            Effect::UpdateProject {
                project: ProjectId::new("p"),
                patch: ProjectPatch {
                    is_public: Some(true),
                    ..ProjectPatch::default()
                },
            },
        ]
    );
    assert!(!store.toggle_public().unwrap().value);
}

#[test]
fn test_replace_project_keeps_dirty_tabs() {
    let mut store = new_store(None);
    let a = store.create_file("a.js", None).unwrap().value;
    let b = store.create_file("b.js", None).unwrap().value;
    store.update_file_content(&a.id, "draft").unwrap();

    let mut canonical = store.project().unwrap().snapshot();
    canonical.files.retain(|f| f.id != b.id);
    store.replace_project(canonical).unwrap();

    let session = &store.project().unwrap().session;
    assert!(session.tab(&b.id).is_none());
    assert_eq!(session.tab(&a.id).unwrap().content, "draft");
    assert!(store.has_unsaved_changes(&a.id));

    let mut other = project(None);
    other.id = ProjectId::new("other");
    assert!(matches!(
        store.replace_project(other),
        Err(WorkspaceError::NotFound(Entity::Project(_)))
    ));
}

#[test]
fn test_close_project() {
    let mut store = new_store(None);
    let result = store.close_project();
    assert!(result.value);
    assert_eq!(result.effects, vec![Effect::PersistCurrentProject]);
    assert!(!store.close_project().value);
}
