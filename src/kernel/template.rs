use crate::models::{FileId, FileKind, FileTree, FileTreeError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectTemplate {
    #[default]
    Starter,
    Blank,
}

const INDEX_JS: &str = "// Welcome to Code Canvas!\nconsole.log(\"Hello, world!\");";
const STYLE_CSS: &str =
    "/* Styles for your project */\nbody {\n  font-family: sans-serif;\n  margin: 0;\n  padding: 20px;\n}";
const APP_JS: &str =
    "// App logic goes here\nfunction init() {\n  console.log(\"App initialized\");\n}\n\ninit();";
const UTILS_JS: &str = "// Utility functions\nexport function formatDate(date) {\n  return new Date(date).toLocaleDateString();\n}";

impl ProjectTemplate {
    pub fn build(self) -> Result<FileTree, FileTreeError> {
        let mut tree = FileTree::new();
        if self == ProjectTemplate::Blank {
            return Ok(tree);
        }

        let file = |tree: &mut FileTree, parent: Option<&FileId>, name: &str, content: &str| {
            tree.insert(
                parent,
                FileId::generate(),
                name,
                FileKind::File,
                content.to_string(),
            )
        };
        file(&mut tree, None, "index.js", INDEX_JS)?;
        file(&mut tree, None, "style.css", STYLE_CSS)?;
        let src = FileId::generate();
        tree.insert(None, src.clone(), "src", FileKind::Directory, String::new())?;
        file(&mut tree, Some(&src), "app.js", APP_JS)?;
        file(&mut tree, Some(&src), "utils.js", UTILS_JS)?;
        Ok(tree)
    }
}
