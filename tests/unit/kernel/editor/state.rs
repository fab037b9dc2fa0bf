use super::*;

fn file(id: &str, name: &str, content: &str) -> File {
    File {
        id: FileId::new(id),
        name: name.to_string(),
        kind: FileKind::File,
        path: format!("/{name}"),
        content: Some(content.to_string()),
        children: None,
    }
}

fn session_with(ids: &[&str]) -> EditorSession {
    let mut session = EditorSession::new();
    for id in ids {
        session.open(&file(id, &format!("{id}.js"), ""));
    }
    session
}

fn tab_ids(session: &EditorSession) -> Vec<&str> {
    session.tabs().iter().map(|t| t.id.as_str()).collect()
}

#[test]
fn test_open_builds_tab_and_activates() {
    let mut session = EditorSession::new();
    assert!(session.open(&file("a", "a.ts", "let x = 1;")));
    let tab = session.current().unwrap();
    assert_eq!(tab.language, "typescript");
    assert_eq!(tab.content, "let x = 1;");
    assert_eq!(tab.path, "/a.ts");
}

#[test]
fn test_open_directory_is_noop() {
    let mut session = EditorSession::new();
    let dir = File {
        id: FileId::new("d"),
        name: "src".to_string(),
        kind: FileKind::Directory,
        path: "/src".to_string(),
        content: None,
        children: Some(Vec::new()),
    };
    assert!(!session.open(&dir));
    assert!(session.tabs().is_empty());
}

#[test]
fn test_open_existing_only_activates() {
    let mut session = session_with(&["a", "b"]);
    assert!(session.open(&file("a", "a.js", "ignored")));
    assert_eq!(tab_ids(&session), vec!["a", "b"]);
    assert_eq!(session.current_id(), Some(&FileId::new("a")));
    assert_eq!(session.tab(&FileId::new("a")).unwrap().content, "");
}

#[test]
fn test_close_active_picks_previous() {
    let mut session = session_with(&["a", "b", "c"]);
    session.set_current(&FileId::new("b"));
    assert!(session.close(&FileId::new("b")));
    assert_eq!(session.current_id(), Some(&FileId::new("a")));

    session.set_current(&FileId::new("a"));
    session.close(&FileId::new("a"));
    assert_eq!(session.current_id(), Some(&FileId::new("c")));

    session.close(&FileId::new("c"));
    assert_eq!(session.current_id(), None);
}

#[test]
fn test_close_inactive_keeps_current() {
    let mut session = session_with(&["a", "b", "c"]);
    session.close(&FileId::new("a"));
    assert_eq!(session.current_id(), Some(&FileId::new("c")));
    assert!(!session.close(&FileId::new("zz")));
}

#[test]
fn test_dirty_state_machine() {
    let mut session = session_with(&["a"]);
    let a = FileId::new("a");
    assert!(!session.has_unsaved(&a));
    assert!(session.update_content(&a, "x"));
    assert!(session.has_unsaved(&a));
    session.mark_saved(&a, "x");
    assert!(!session.has_unsaved(&a));

    session.update_content(&a, "y");
    session.close(&a);
    assert!(!session.has_unsaved(&a));
    assert!(!session.update_content(&a, "z"));
}

#[test]
fn test_reorder_requires_permutation() {
    let mut session = session_with(&["a", "b", "c"]);
    let ids = |raw: &[&str]| raw.iter().map(|r| FileId::new(*r)).collect::<Vec<_>>();

    assert!(session.reorder(&ids(&["c", "a", "b"])));
    assert_eq!(tab_ids(&session), vec!["c", "a", "b"]);

    assert!(!session.reorder(&ids(&["a", "b"])));
    assert!(!session.reorder(&ids(&["a", "a", "b"])));
    assert!(!session.reorder(&ids(&["a", "b", "x"])));
    assert_eq!(tab_ids(&session), vec!["c", "a", "b"]);
}

#[test]
fn test_restore_filters_unknown_markers() {
    let tabs = vec![FileTab::from_file(&file("a", "a.js", ""))];
    let session = EditorSession::restore(
        tabs,
        Some(FileId::new("gone")),
        vec![FileId::new("a"), FileId::new("gone")],
    );
    assert_eq!(session.current_id(), None);
    assert_eq!(session.unsaved_ids(), vec![FileId::new("a")]);
}

#[test]
fn test_refresh_and_retain_follow_tree() {
    let mut tree = FileTree::new();
    let a = FileId::new("a");
    let b = FileId::new("b");
    tree.insert(None, a.clone(), "a.js", FileKind::File, "one".into())
        .unwrap();
    tree.insert(None, b.clone(), "b.js", FileKind::File, "two".into())
        .unwrap();

    let mut session = EditorSession::new();
    session.open(&tree.get(&a).unwrap());
    session.open(&tree.get(&b).unwrap());
    session.update_content(&b, "dirty");

    tree.rename(&a, "a.py").unwrap();
    tree.set_content(&a, "changed").unwrap();
    tree.set_content(&b, "committed").unwrap();
    assert!(session.refresh_from(&tree));
    let tab = session.tab(&a).unwrap();
    assert_eq!(tab.path, "/a.py");
    assert_eq!(tab.language, "python");
    assert_eq!(tab.content, "changed");
    assert_eq!(session.tab(&b).unwrap().content, "dirty");

    tree.remove(&b).unwrap();
    assert_eq!(session.retain_existing(&tree), vec![b.clone()]);
    assert_eq!(session.current_id(), Some(&a));
    assert!(!session.has_unsaved(&b));
}
