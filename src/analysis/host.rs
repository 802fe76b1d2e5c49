//! Host-side resolution services the analyses depend on.
//!
//! A real front end knows which expressions denote containers and which
//! storage two different spellings resolve to. The analyses stay agnostic
//! and ask through [`AnalysisHost`]; [`TextualHost`] is the symbol-free
//! fallback that compares rendered source text.

use std::collections::HashSet;

use crate::ast::{Expr, ExprKind, Ident};

use super::tracker::StorageKey;

pub trait AnalysisHost {
    /// Canonical identity of the storage location `expr` denotes.
    fn storage_of(&self, expr: &Expr) -> StorageKey;

    /// Whether `expr` denotes a container-like value (map, list, set).
    fn is_container(&self, expr: &Expr) -> bool;

    /// Storage identity of a bare name (declarators, loop variables).
    fn storage_of_ident(&self, ident: &Ident) -> StorageKey {
        match ident.symbol {
            Some(symbol) => StorageKey::Symbol(symbol),
            None => StorageKey::Text(ident.name.clone()),
        }
    }

    /// Alias predicate: do the two expressions denote the same storage?
    fn same_storage(&self, a: &Expr, b: &Expr) -> bool {
        self.storage_of(a) == self.storage_of(b)
    }
}

/// Resolution by source text alone, with an explicit list of names that
/// count as containers. Used by hosts without symbol tables and by tests.
#[derive(Debug, Default)]
pub struct TextualHost {
    containers: HashSet<String>,
}

impl TextualHost {
    pub fn new<I, S>(containers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            containers: containers.into_iter().map(Into::into).collect(),
        }
    }
}

impl AnalysisHost for TextualHost {
    fn storage_of(&self, expr: &Expr) -> StorageKey {
        match &expr.kind {
            ExprKind::Ident(ident) => self.storage_of_ident(ident),
            _ => StorageKey::Text(expr.render()),
        }
    }

    fn is_container(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Ident(ident) => self.containers.contains(&ident.name),
            ExprKind::Member { .. } => self.containers.contains(&expr.render()),
            // `c[i]` can itself be a container (nested maps).
            ExprKind::Index { object, .. } | ExprKind::Paren(object) => self.is_container(object),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    fn ident(name: &str) -> Expr {
        Expr::new(ExprKind::Ident(Ident::new(name)), Span::new(0, name.len()))
    }

    #[test]
    fn recognizes_listed_containers() {
        let host = TextualHost::new(["cache", "this.lookup"]);
        assert!(host.is_container(&ident("cache")));
        assert!(!host.is_container(&ident("other")));

        let member = Expr::new(
            ExprKind::Member {
                object: Box::new(ident("this")),
                name: "lookup".to_string(),
            },
            Span::new(0, 11),
        );
        assert!(host.is_container(&member));
    }

    #[test]
    fn nested_index_inherits_container_status() {
        let host = TextualHost::new(["outer"]);
        let element = Expr::new(
            ExprKind::Index {
                object: Box::new(ident("outer")),
                args: vec![ident("i")],
            },
            Span::new(0, 8),
        );
        assert!(host.is_container(&element));
    }

    #[test]
    fn same_storage_falls_back_to_text() {
        let host = TextualHost::default();
        assert!(host.same_storage(&ident("key"), &ident("key")));
        assert!(!host.same_storage(&ident("key"), &ident("other")));
    }

    #[test]
    fn symbols_beat_spelling() {
        use crate::ast::SymbolId;
        let host = TextualHost::default();
        let a = Expr::new(
            ExprKind::Ident(Ident::resolved("cache", SymbolId(3))),
            Span::new(0, 5),
        );
        let b = Expr::new(
            ExprKind::Ident(Ident::resolved("alias", SymbolId(3))),
            Span::new(10, 15),
        );
        assert!(host.same_storage(&a, &b));
    }
}
