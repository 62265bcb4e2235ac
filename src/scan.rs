//! Recovery of function and method declaration spans from Go source.
use tree_sitter::{Node, Parser, Point};

use crate::error::{ConvertError, Result};

/// A 1-based source position; columns count bytes, as in Go profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: u32,
    pub col: u32,
}

impl From<Point> for Position {
    fn from(p: Point) -> Self {
        Self {
            line: p.row as u32 + 1,
            col: p.column as u32 + 1,
        }
    }
}

/// A top-level function or method declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: String,
    /// Receiver type name without pointer star, for methods.
    pub receiver: Option<String>,
    /// Position of the `func` keyword.
    pub start: Position,
    /// Position just past the closing brace.
    pub end: Position,
}

/// Yields the declarations of a source file in source order.
pub trait SourceScanner {
    fn scan(&self, source: &[u8]) -> Result<Vec<FuncDecl>>;
}

/// Tree-sitter backed scanner for Go.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoScanner;

impl SourceScanner for GoScanner {
    fn scan(&self, source: &[u8]) -> Result<Vec<FuncDecl>> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| ConvertError::Scan(e.to_string()))?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ConvertError::Scan("parser produced no tree".to_string()))?;

        let root = tree.root_node();
        if root.has_error() {
            log::debug!("source contains syntax errors, declarations may be incomplete");
        }

        let mut cursor = root.walk();
        let decls = root
            .named_children(&mut cursor)
            .filter_map(|node| match node.kind() {
                "function_declaration" => func_decl(&node, source, None),
                "method_declaration" => {
                    let receiver = node
                        .child_by_field_name("receiver")
                        .and_then(|r| receiver_type(&r, source));
                    func_decl(&node, source, receiver)
                }
                _ => None,
            })
            .collect();
        Ok(decls)
    }
}

fn func_decl(node: &Node, source: &[u8], receiver: Option<String>) -> Option<FuncDecl> {
    let name = node.child_by_field_name("name")?.utf8_text(source).ok()?;
    Some(FuncDecl {
        name: name.to_string(),
        receiver,
        start: node.start_position().into(),
        end: node.end_position().into(),
    })
}

/// `(t *Type1)` -> `Type1`. Type arguments are kept, as in `List[T]`.
fn receiver_type(params: &Node, source: &[u8]) -> Option<String> {
    let mut cursor = params.walk();
    let decl = params
        .named_children(&mut cursor)
        .find(|n| n.kind() == "parameter_declaration")?;
    let ty = decl.child_by_field_name("type")?.utf8_text(source).ok()?;
    let name = ty.trim_start_matches('*').trim();
    (!name.is_empty()).then(|| name.to_string())
}
