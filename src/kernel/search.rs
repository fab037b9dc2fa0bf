//! 项目内容搜索
//!
//! - Literal 模式（区分大小写、非整词）：memchr Finder 逐行查找
//! - 其余模式：编译为 regex，逐行查找
//!
//! 只搜索已提交的文件内容，不包含未保存的编辑。

use crate::models::{FileId, FileKind, FileTree};
use memchr::memmem::Finder;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    #[serde(default)]
    pub match_case: bool,
    #[serde(default)]
    pub whole_word: bool,
    #[serde(default)]
    pub use_regex: bool,
}

/// One hit. `start`/`end` are byte offsets into `line_content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub line_number: usize,
    pub line_content: String,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSearchResult {
    pub file_id: FileId,
    pub file_name: String,
    pub file_path: String,
    pub matches: Vec<SearchMatch>,
}

enum Matcher {
    Literal(Finder<'static>, usize),
    Regex(Regex),
}

impl Matcher {
    fn build(query: &str, options: SearchOptions) -> Self {
        if options.use_regex {
            match RegexBuilder::new(query)
                .case_insensitive(!options.match_case)
                .build()
            {
                Ok(regex) => return Self::Regex(regex),
                Err(e) => {
                    tracing::debug!(query, error = %e, "invalid regex, searching literally");
                }
            }
        }

        if options.match_case && !options.whole_word {
            return Self::Literal(Finder::new(query.as_bytes()).into_owned(), query.len());
        }

        let escaped = regex::escape(query);
        let pattern = if options.whole_word {
            format!(r"\b{escaped}\b")
        } else {
            escaped
        };
        match RegexBuilder::new(&pattern)
            .case_insensitive(!options.match_case)
            .build()
        {
            Ok(regex) => Self::Regex(regex),
            // An escaped literal always compiles; keep a case-sensitive finder
            // as the last resort.
            Err(_) => Self::Literal(Finder::new(query.as_bytes()).into_owned(), query.len()),
        }
    }

    fn find_in_line(&self, line: &str, out: &mut Vec<(usize, usize)>) {
        match self {
            Self::Literal(finder, len) => {
                out.extend(finder.find_iter(line.as_bytes()).map(|s| (s, s + len)));
            }
            Self::Regex(regex) => {
                out.extend(
                    regex
                        .find_iter(line)
                        .filter(|m| !m.is_empty())
                        .map(|m| (m.start(), m.end())),
                );
            }
        }
    }
}

fn search_content(content: &str, matcher: &Matcher) -> Vec<SearchMatch> {
    let mut matches = Vec::new();
    let mut spans = Vec::new();
    for (idx, line) in content.split('\n').enumerate() {
        spans.clear();
        matcher.find_in_line(line, &mut spans);
        for &(start, end) in &spans {
            matches.push(SearchMatch {
                line_number: idx + 1,
                line_content: line.to_string(),
                start,
                end,
                text: line[start..end].to_string(),
            });
        }
    }
    matches
}

/// Searches every file of `tree`, in tree order. A blank query yields nothing.
pub fn search_tree(tree: &FileTree, query: &str, options: SearchOptions) -> Vec<FileSearchResult> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    let matcher = Matcher::build(query, options);

    tree.records()
        .into_iter()
        .filter(|file| file.kind == FileKind::File)
        .filter_map(|file| {
            let matches = search_content(file.content_str(), &matcher);
            (!matches.is_empty()).then(|| FileSearchResult {
                file_id: file.id,
                file_name: file.name,
                file_path: file.path,
                matches,
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/search.rs"]
mod tests;
