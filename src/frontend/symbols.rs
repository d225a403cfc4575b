//! Flat scoped symbol table for pyrite
//!
//! Symbols are keyed by `"name@scope"`, where the scope path was stamped
//! onto identifier tokens by the lexer. There is no scope tree here: scope
//! resolution already happened at tokenization time.

use std::collections::HashMap;
use std::fmt;

/// Inferred type of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeTag {
    #[default]
    Unknown,
    Int,
    Float,
    Str,
    Bool,
    List,
    Tuple,
    Set,
    Dictionary,
    Function,
    Class,
}

impl TypeTag {
    pub fn is_known(self) -> bool {
        self != TypeTag::Unknown
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Unknown => "unknown",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Str => "string",
            TypeTag::Bool => "bool",
            TypeTag::List => "list",
            TypeTag::Tuple => "tuple",
            TypeTag::Set => "set",
            TypeTag::Dictionary => "dictionary",
            TypeTag::Function => "function",
            TypeTag::Class => "class",
        };
        write!(f, "{}", name)
    }
}

/// Everything known about one `(name, scope)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolInfo {
    /// Dense id assigned at insertion, starting at 1.
    pub entry: usize,
    pub type_tag: TypeTag,
    pub scope: String,
    /// Line of first appearance.
    pub first_line: usize,
    /// Starts at 1 and grows with every later sighting of the same key.
    pub usage_count: usize,
    /// Textual rendering of a literal right-hand side, when one was seen.
    pub value: String,
}

/// Symbol table for one analyzed source file.
///
/// Keys are unique and the table is never rebuilt; re-insertions bump the
/// existing record instead.
#[derive(Debug, Default)]
pub struct SymbolTable {
    table: HashMap<String, SymbolInfo>,
    next_entry: usize,
}

fn key_for(name: &str, scope: &str) -> String {
    format!("{}@{}", name, scope)
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
            next_entry: 1,
        }
    }

    /// Insert a symbol, or bump it if the key already exists.
    ///
    /// On a repeat sighting the usage count grows, an `Unknown` type is
    /// upgraded to a known one (never the other way), and a non-empty value
    /// overwrites the stored one.
    pub fn add_symbol(
        &mut self,
        name: &str,
        type_tag: TypeTag,
        line: usize,
        scope: &str,
        value: &str,
    ) {
        let key = key_for(name, scope);
        match self.table.get_mut(&key) {
            None => {
                let entry = self.next_entry;
                self.next_entry += 1;
                self.table.insert(
                    key,
                    SymbolInfo {
                        entry,
                        type_tag,
                        scope: scope.to_string(),
                        first_line: line,
                        usage_count: 1,
                        value: value.to_string(),
                    },
                );
            }
            Some(info) => {
                info.usage_count += 1;
                if info.type_tag == TypeTag::Unknown && type_tag.is_known() {
                    info.type_tag = type_tag;
                }
                if !value.is_empty() {
                    info.value = value.to_string();
                }
            }
        }
    }

    /// Increment the usage count of an existing symbol.
    pub fn bump_usage(&mut self, name: &str, scope: &str) {
        if let Some(info) = self.table.get_mut(&key_for(name, scope)) {
            info.usage_count += 1;
        }
    }

    /// Overwrite a symbol's type after creation.
    pub fn update_type(&mut self, name: &str, scope: &str, type_tag: TypeTag) {
        if let Some(info) = self.table.get_mut(&key_for(name, scope)) {
            info.type_tag = type_tag;
        }
    }

    /// Overwrite a symbol's literal value after creation.
    pub fn update_value(&mut self, name: &str, scope: &str, value: &str) {
        if let Some(info) = self.table.get_mut(&key_for(name, scope)) {
            info.value = value.to_string();
        }
    }

    pub fn exists(&self, name: &str, scope: &str) -> bool {
        self.table.contains_key(&key_for(name, scope))
    }

    pub fn get_type(&self, name: &str, scope: &str) -> TypeTag {
        self.table
            .get(&key_for(name, scope))
            .map(|info| info.type_tag)
            .unwrap_or(TypeTag::Unknown)
    }

    pub fn get_value(&self, name: &str, scope: &str) -> String {
        self.table
            .get(&key_for(name, scope))
            .map(|info| info.value.clone())
            .unwrap_or_default()
    }

    /// The entry id of a symbol, if present (used by the token listing).
    pub fn entry_id(&self, name: &str, scope: &str) -> Option<usize> {
        self.table.get(&key_for(name, scope)).map(|info| info.entry)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// All symbols ordered by entry id, as `(name, info)` pairs.
    pub fn entries(&self) -> Vec<(&str, &SymbolInfo)> {
        let mut rows: Vec<(&str, &SymbolInfo)> = self
            .table
            .iter()
            .map(|(key, info)| {
                let name = key.split('@').next().unwrap_or(key.as_str());
                (name, info)
            })
            .collect();
        rows.sort_by_key(|(_, info)| info.entry);
        rows
    }

    /// Render the table as the report listing, ordered by entry id.
    pub fn render(&self) -> String {
        let mut out = String::from("Symbol Table:\n");
        for (name, info) in self.entries() {
            out.push_str(&format!(
                "Entry: {}, Name: {}, Scope: {}, Type: {}, First Appearance: Line {}, Usage Count: {}",
                info.entry, name, info.scope, info.type_tag, info.first_line, info.usage_count
            ));
            if !info.value.is_empty() {
                out.push_str(&format!(", Value: {}", info.value));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_bump() {
        let mut table = SymbolTable::new();
        table.add_symbol("x", TypeTag::Unknown, 1, "global", "");
        assert!(table.exists("x", "global"));
        assert_eq!(table.entry_id("x", "global"), Some(1));

        table.add_symbol("x", TypeTag::Int, 2, "global", "5");
        let (_, info) = table.entries()[0];
        assert_eq!(info.usage_count, 2);
        assert_eq!(info.type_tag, TypeTag::Int, "unknown upgrades to known");
        assert_eq!(info.value, "5");
        assert_eq!(info.first_line, 1, "first appearance is kept");
    }

    #[test]
    fn test_type_never_downgrades_on_add() {
        let mut table = SymbolTable::new();
        table.add_symbol("x", TypeTag::Int, 1, "global", "");
        table.add_symbol("x", TypeTag::Unknown, 2, "global", "");
        assert_eq!(table.get_type("x", "global"), TypeTag::Int);
    }

    #[test]
    fn test_same_name_different_scope() {
        let mut table = SymbolTable::new();
        table.add_symbol("x", TypeTag::Int, 1, "global", "1");
        table.add_symbol("x", TypeTag::Str, 2, "f", "\"s\"");
        assert_eq!(table.len(), 2);
        assert_eq!(table.get_type("x", "global"), TypeTag::Int);
        assert_eq!(table.get_type("x", "f"), TypeTag::Str);
    }

    #[test]
    fn test_entry_ids_dense_in_insertion_order() {
        let mut table = SymbolTable::new();
        table.add_symbol("a", TypeTag::Unknown, 1, "global", "");
        table.add_symbol("b", TypeTag::Unknown, 1, "global", "");
        table.add_symbol("a", TypeTag::Unknown, 2, "global", "");
        table.add_symbol("c", TypeTag::Unknown, 3, "global", "");
        let ids: Vec<usize> = table.entries().iter().map(|(_, i)| i.entry).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_update_type_overwrites() {
        let mut table = SymbolTable::new();
        table.add_symbol("x", TypeTag::Int, 1, "global", "");
        table.update_type("x", "global", TypeTag::Float);
        assert_eq!(table.get_type("x", "global"), TypeTag::Float);
    }

    #[test]
    fn test_missing_symbol_defaults() {
        let table = SymbolTable::new();
        assert_eq!(table.get_type("ghost", "global"), TypeTag::Unknown);
        assert_eq!(table.get_value("ghost", "global"), "");
        assert_eq!(table.entry_id("ghost", "global"), None);
    }

    #[test]
    fn test_render_includes_value_only_when_set() {
        let mut table = SymbolTable::new();
        table.add_symbol("x", TypeTag::Int, 1, "global", "5");
        table.add_symbol("f", TypeTag::Function, 2, "f", "");
        let rendered = table.render();
        assert!(rendered.contains(
            "Entry: 1, Name: x, Scope: global, Type: int, First Appearance: Line 1, Usage Count: 1, Value: 5"
        ));
        assert!(rendered.contains(
            "Entry: 2, Name: f, Scope: f, Type: function, First Appearance: Line 2, Usage Count: 1"
        ));
        assert!(!rendered.lines().nth(2).unwrap_or("").contains("Value:"));
    }
}
