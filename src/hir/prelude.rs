//! Bundled packages: the engine API and a few standard helpers, written in
//! spx itself.
//!
//! Sources are parsed once per process; every unit declares them afresh into
//! its own model.

use once_cell::sync::Lazy;
use rowan::GreenNode;

use crate::base::{FileId, LineIndex};
use crate::parser::{SyntaxKind, SyntaxNode, parse};

/// One bundled package source
#[derive(Debug)]
pub struct PreludeFile {
    pub id: FileId,
    /// Import path of the package
    pub package: &'static str,
    pub text: &'static str,
    pub green: GreenNode,
    pub line_index: LineIndex,
}

impl PreludeFile {
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }
}

const SOURCES: &[(&str, &str)] = &[
    ("spx", include_str!("prelude/spx.spx")),
    ("math", include_str!("prelude/math.spx")),
    ("strings", include_str!("prelude/strings.spx")),
    ("fmt", include_str!("prelude/fmt.spx")),
];

static PRELUDE: Lazy<Vec<PreludeFile>> = Lazy::new(|| {
    SOURCES
        .iter()
        .enumerate()
        .map(|(index, (package, text))| {
            let parse = parse(text);
            if !parse.errors.is_empty() {
                tracing::error!(package, errors = ?parse.errors, "bundled package has syntax errors");
            }
            PreludeFile {
                id: FileId::prelude(index as u32),
                package,
                text,
                green: parse.green,
                line_index: LineIndex::new(*text),
            }
        })
        .collect()
});

/// All bundled package sources, engine package first.
pub fn prelude_files() -> &'static [PreludeFile] {
    &PRELUDE
}

pub fn prelude_file(id: FileId) -> Option<&'static PreludeFile> {
    if !id.is_prelude() {
        return None;
    }
    prelude_files().iter().find(|f| f.id == id)
}

/// Text of the `//` comment lines directly above `node`.
///
/// A blank line ends the comment block.
pub fn leading_comment(node: &SyntaxNode) -> Option<String> {
    let mut lines = Vec::new();
    let mut newlines = 0;
    let mut current = node.prev_sibling_or_token();
    while let Some(element) = current {
        match element.kind() {
            SyntaxKind::WHITESPACE => {}
            SyntaxKind::NEWLINE => {
                newlines += 1;
                if newlines > 1 {
                    break;
                }
            }
            SyntaxKind::LINE_COMMENT => {
                if let Some(token) = element.as_token() {
                    let text = token.text().trim_start_matches("//");
                    lines.push(text.strip_prefix(' ').unwrap_or(text).to_string());
                }
                newlines = 0;
            }
            _ => break,
        }
        current = element.prev_sibling_or_token();
    }
    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{AstNode, FuncDecl};

    #[test]
    fn test_bundled_sources_parse_cleanly() {
        for file in prelude_files() {
            assert!(
                parse(file.text).errors.is_empty(),
                "{} has syntax errors: {:?}",
                file.package,
                parse(file.text).errors
            );
            assert!(file.id.is_prelude());
        }
        assert_eq!(prelude_files()[0].package, "spx");
    }

    #[test]
    fn test_leading_comment() {
        let parse = parse("package p\n\n// first\n// second\nfunc f()\n\n// detached\n\nfunc g()\n");
        let funcs: Vec<FuncDecl> = parse.syntax().descendants().filter_map(FuncDecl::cast).collect();
        assert_eq!(leading_comment(funcs[0].syntax()).as_deref(), Some("first\nsecond"));
        assert_eq!(leading_comment(funcs[1].syntax()), None);
    }

    #[test]
    fn test_prelude_file_lookup() {
        assert_eq!(prelude_file(FileId::prelude(1)).map(|f| f.package), Some("math"));
        assert!(prelude_file(FileId::new(0)).is_none());
    }
}
