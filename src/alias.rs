//! # Parameter Aliases
//!
//! `@name` tokens take their value from a sibling query parameter
//! (`?$filter=Age gt @a&@a=18`). One [`AliasTable`] lives for the parse of a
//! whole request URI and is shared by every option and the path, so an alias
//! is bound once and every reference sees the same node.
//!
//! Values are parsed lazily, on first reference. An alias may name another
//! alias (`@p1=@p2`); chains are followed with an explicit stack of the
//! aliases being resolved, so a chain that comes back to itself fails
//! instead of looping.
//!
//! The table uses interior mutability and is meant for one thread; share it
//! between option parsers with `Rc`.

use std::cell::RefCell;
use std::collections::HashMap;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::trace;

use crate::node::QueryNode;

/// Default longest alias chain.
pub const DEFAULT_MAX_ALIAS_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AliasError {
    #[error("The parameter alias '@{name}' is part of a circular chain of aliases.")]
    Circular { name: String },

    #[error("The chain of parameter aliases exceeded the maximum depth.")]
    TooDeep,
}

#[derive(Debug)]
pub struct AliasTable {
    /// Declared values; `None` for an alias given without a value
    raw: IndexMap<String, Option<String>>,
    cache: RefCell<HashMap<String, QueryNode>>,
    in_progress: RefCell<Vec<String>>,
    max_depth: usize,
}

impl Default for AliasTable {
    fn default() -> Self {
        AliasTable::new(DEFAULT_MAX_ALIAS_DEPTH)
    }
}

impl AliasTable {
    pub fn new(max_depth: usize) -> Self {
        AliasTable {
            raw: IndexMap::new(),
            cache: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(Vec::new()),
            max_depth,
        }
    }

    /// Builds a table from `(name, value)` query pairs; names without the
    /// leading `@` are skipped.
    pub fn from_pairs<'a, I>(pairs: I, max_depth: usize) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let mut table = AliasTable::new(max_depth);
        for (name, value) in pairs {
            if let Some(alias) = name.strip_prefix('@') {
                table.declare(alias, value);
            }
        }
        table
    }

    /// Declares `@name`. A later declaration replaces an earlier one and
    /// drops any cached binding.
    pub fn declare(&mut self, name: &str, value: Option<&str>) {
        let name = name.trim_start_matches('@');
        self.cache.get_mut().remove(name);
        self.raw.insert(name.to_string(), value.map(str::to_string));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.raw.contains_key(name)
    }

    /// Raw declared text, `None` when undeclared or declared without value.
    pub fn raw_value(&self, name: &str) -> Option<&str> {
        self.raw.get(name).and_then(|v| v.as_deref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.raw.keys().map(String::as_str)
    }

    /// Follows `@a=@b` chains down to text that is not itself an alias.
    pub fn resolve_text(&self, name: &str) -> Result<Option<&str>, AliasError> {
        let mut visited: Vec<&str> = Vec::new();
        let mut current = name;
        loop {
            if visited.contains(&current) {
                return Err(AliasError::Circular {
                    name: current.to_string(),
                });
            }
            if visited.len() >= self.max_depth {
                return Err(AliasError::TooDeep);
            }
            visited.push(current);
            let Some(text) = self.raw_value(current) else {
                return Ok(None);
            };
            match text.trim().strip_prefix('@') {
                Some(next) => current = next,
                None => return Ok(Some(text)),
            }
        }
    }

    /// Binding of `@name`, computed by `bind` from the raw text on first
    /// use and cached afterwards.
    ///
    /// Returns `Ok(None)` when the alias has no value. `bind` may resolve
    /// other aliases through this table; coming back to `name` while it is
    /// being bound fails with [`AliasError::Circular`].
    pub fn resolve_with<E, F>(&self, name: &str, bind: F) -> Result<Option<QueryNode>, E>
    where
        E: From<AliasError>,
        F: FnOnce(&str) -> Result<QueryNode, E>,
    {
        if let Some(node) = self.cache.borrow().get(name) {
            trace!(alias = name, "alias cache hit");
            return Ok(Some(node.clone()));
        }
        let Some(text) = self.raw_value(name) else {
            return Ok(None);
        };

        {
            let mut in_progress = self.in_progress.borrow_mut();
            if in_progress.iter().any(|n| n == name) {
                return Err(AliasError::Circular {
                    name: name.to_string(),
                }
                .into());
            }
            if in_progress.len() >= self.max_depth {
                return Err(AliasError::TooDeep.into());
            }
            in_progress.push(name.to_string());
        }

        trace!(alias = name, text, "binding alias");
        let result = bind(text);
        self.in_progress.borrow_mut().pop();

        let node = result?;
        self.cache
            .borrow_mut()
            .insert(name.to_string(), node.clone());
        Ok(Some(node))
    }

    /// Cached binding, if the alias has been resolved.
    pub fn cached(&self, name: &str) -> Option<QueryNode> {
        self.cache.borrow().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeRef;
    use crate::value::Value;

    fn constant(n: i32) -> QueryNode {
        QueryNode::constant(
            Value::Int32(n),
            Some(TypeRef::primitive(crate::model::Primitive::Int32, false)),
            n.to_string(),
        )
    }

    #[test]
    fn test_binds_once() {
        let table = AliasTable::from_pairs([("@a", Some("1"))], 8);
        let mut calls = 0;
        for _ in 0..3 {
            let node = table
                .resolve_with::<AliasError, _>("a", |_| {
                    calls += 1;
                    Ok(constant(1))
                })
                .unwrap();
            assert_eq!(node, Some(constant(1)));
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_text_chain() {
        let table = AliasTable::from_pairs([("@p1", Some("@p2")), ("@p2", Some("42"))], 8);
        assert_eq!(table.resolve_text("p1").unwrap(), Some("42"));
    }

    #[test]
    fn test_text_cycle() {
        let table = AliasTable::from_pairs([("@p1", Some("@p2")), ("@p2", Some("@p1"))], 8);
        assert!(matches!(table.resolve_text("p1"), Err(AliasError::Circular { .. })));
    }
}
