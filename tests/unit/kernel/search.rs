use super::*;

fn tree_with(files: &[(&str, &str)]) -> FileTree {
    let mut tree = FileTree::new();
    for (name, content) in files {
        tree.insert(
            None,
            FileId::new(*name),
            name,
            FileKind::File,
            content.to_string(),
        )
        .unwrap();
    }
    tree
}

fn options(match_case: bool, whole_word: bool, use_regex: bool) -> SearchOptions {
    SearchOptions {
        match_case,
        whole_word,
        use_regex,
    }
}

#[test]
fn test_blank_query_finds_nothing() {
    let tree = tree_with(&[("a.js", "anything")]);
    assert!(search_tree(&tree, "   ", SearchOptions::default()).is_empty());
}

#[test]
fn test_literal_case_sensitive_reports_lines() {
    let tree = tree_with(&[("a.js", "let Foo = 1;\nfoo(Foo);\n")]);
    let results = search_tree(&tree, "Foo", options(true, false, false));
    assert_eq!(results.len(), 1);
    let matches = &results[0].matches;
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].line_number, 1);
    assert_eq!((matches[0].start, matches[0].end), (4, 7));
    assert_eq!(matches[1].line_number, 2);
    assert_eq!(matches[1].line_content, "foo(Foo);");
    assert_eq!(matches[1].start, 4);
}

#[test]
fn test_case_insensitive_by_default() {
    let tree = tree_with(&[("a.js", "Foo foo FOO")]);
    let results = search_tree(&tree, "foo", SearchOptions::default());
    let texts: Vec<&str> = results[0].matches.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["Foo", "foo", "FOO"]);
}

#[test]
fn test_whole_word() {
    let tree = tree_with(&[("a.js", "cat concat cat_ cat.")]);
    let results = search_tree(&tree, "cat", options(true, true, false));
    let starts: Vec<usize> = results[0].matches.iter().map(|m| m.start).collect();
    assert_eq!(starts, vec![0, 16]);
}

#[test]
fn test_regex_mode() {
    let tree = tree_with(&[("a.js", "x1 y22 z333")]);
    let results = search_tree(&tree, r"\d+", options(false, false, true));
    let texts: Vec<&str> = results[0].matches.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["1", "22", "333"]);
}

#[test]
fn test_invalid_regex_falls_back_to_literal() {
    let tree = tree_with(&[("a.js", "call(a\nno match")]);
    let results = search_tree(&tree, "call(", options(false, false, true));
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].matches[0].text, "call(");
}

#[test]
fn test_literal_special_characters_are_not_regex() {
    let tree = tree_with(&[("a.js", "a.b axb")]);
    let results = search_tree(&tree, "a.b", SearchOptions::default());
    assert_eq!(results[0].matches.len(), 1);
}

#[test]
fn test_only_matching_files_are_reported() {
    let mut tree = tree_with(&[("a.js", "needle"), ("b.js", "hay")]);
    tree.insert(
        None,
        FileId::new("dir"),
        "needle",
        FileKind::Directory,
        String::new(),
    )
    .unwrap();
    let results = search_tree(&tree, "needle", SearchOptions::default());
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].file_path, "/a.js");
    assert_eq!(results[0].file_id, FileId::new("a.js"));
}
