// src/sema/symbol_table.rs
//! Lexically nested symbol tables.
//!
//! Tables live in one arena and refer to their parents by id, never by
//! reference. Slot indices are dense and zero-based within each table.
//! Lookups never fail: a missing name produces the null symbol (index -1)
//! and callers test with `Symbol::any` instead of branching on an Option.

use crate::sema::types::TypeId;
use rustc_hash::FxHashMap;

/// Index of a symbol table in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(pub u32);

/// A named binding with a type and a dense slot index
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub value_type: TypeId,
    pub index: i32,
    pub mutable: bool,
}

impl Symbol {
    /// The sentinel returned for failed lookups.
    pub fn null(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type: TypeId::DYNAMIC,
            index: -1,
            mutable: false,
        }
    }

    /// True when the symbol refers to a real definition.
    pub fn any(&self) -> bool {
        self.index >= 0
    }
}

#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    mapping: FxHashMap<String, usize>,
    parent: Option<TableId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: TableId) -> Self {
        Self {
            parent: Some(parent),
            ..Self::default()
        }
    }

    pub fn parent(&self) -> Option<TableId> {
        self.parent
    }

    /// Define a symbol. Redefining a name appends a fresh entry and points
    /// the mapping at it; earlier slots stay valid for already-resolved
    /// references.
    pub fn define(&mut self, name: impl Into<String>, value_type: TypeId, mutable: bool) -> Symbol {
        let name = name.into();
        let index = self.symbols.len() as i32;
        let symbol = Symbol {
            name: name.clone(),
            value_type,
            index,
            mutable,
        };
        self.mapping.insert(name, self.symbols.len());
        self.symbols.push(symbol.clone());
        symbol
    }

    pub fn lookup(&self, name: &str) -> Symbol {
        match self.mapping.get(name) {
            Some(&slot) => self.symbols[slot].clone(),
            None => Symbol::null(name),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mapping.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterate symbols in insertion order (used for exports and globbing).
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    /// The symbol at a slot index, regardless of later shadowing.
    pub fn symbol_at(&self, index: usize) -> Option<&Symbol> {
        self.symbols.get(index)
    }
}

/// Arena owning every scope tree in a compile
#[derive(Debug, Default)]
pub struct SymbolTables {
    tables: Vec<SymbolTable>,
}

impl SymbolTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, parent: Option<TableId>) -> TableId {
        let id = TableId(self.tables.len() as u32);
        let table = match parent {
            Some(parent) => SymbolTable::with_parent(parent),
            None => SymbolTable::new(),
        };
        self.tables.push(table);
        id
    }

    pub fn get(&self, id: TableId) -> &SymbolTable {
        &self.tables[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: TableId) -> &mut SymbolTable {
        &mut self.tables[id.0 as usize]
    }

    /// Resolve a name through the parent chain.
    ///
    /// The returned depth is -1 when the name lives in the starting table
    /// and grows by one per traversed parent. The null symbol comes back
    /// with depth -1.
    pub fn lookup_with_parent(&self, id: TableId, name: &str) -> (i32, Symbol) {
        let mut depth = -1;
        let mut current = Some(id);

        while let Some(table_id) = current {
            let table = self.get(table_id);
            let symbol = table.lookup(name);
            if symbol.any() {
                return (depth, symbol);
            }
            depth += 1;
            current = table.parent();
        }

        (-1, Symbol::null(name))
    }

    /// Resolve a name against the outermost table only.
    pub fn lookup_in_root(&self, id: TableId, name: &str) -> (i32, Symbol) {
        let mut depth = -1;
        let mut table_id = id;

        while let Some(parent) = self.get(table_id).parent() {
            depth += 1;
            table_id = parent;
        }

        let symbol = self.get(table_id).lookup(name);
        if symbol.any() { (depth, symbol) } else { (-1, symbol) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_assigns_dense_indices() {
        let mut table = SymbolTable::new();
        let a = table.define("a", TypeId::DYNAMIC, false);
        let b = table.define("b", TypeId::DYNAMIC, true);
        assert_eq!(a.index, 0);
        assert_eq!(b.index, 1);
        assert!(b.mutable);
    }

    #[test]
    fn lookup_missing_returns_null_symbol() {
        let table = SymbolTable::new();
        let symbol = table.lookup("ghost");
        assert!(!symbol.any());
        assert_eq!(symbol.index, -1);
        assert_eq!(symbol.name, "ghost");
    }

    #[test]
    fn redefining_shadows_but_keeps_old_slot() {
        let mut table = SymbolTable::new();
        let first = table.define("x", TypeId::DYNAMIC, false);
        let second = table.define("x", TypeId::DYNAMIC, false);
        assert_eq!(first.index, 0);
        assert_eq!(second.index, 1);
        assert_eq!(table.lookup("x").index, 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let mut table = SymbolTable::new();
        table.define("one", TypeId::DYNAMIC, false);
        table.define("two", TypeId::DYNAMIC, false);
        table.define("three", TypeId::DYNAMIC, false);
        let names: Vec<_> = table.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["one", "two", "three"]);
    }

    #[test]
    fn lookup_with_parent_reports_depth() {
        let mut tables = SymbolTables::new();
        let root = tables.alloc(None);
        let middle = tables.alloc(Some(root));
        let inner = tables.alloc(Some(middle));

        tables.get_mut(root).define("g", TypeId::DYNAMIC, false);
        tables.get_mut(inner).define("l", TypeId::DYNAMIC, false);

        let (depth, symbol) = tables.lookup_with_parent(inner, "l");
        assert_eq!(depth, -1);
        assert!(symbol.any());

        let (depth, symbol) = tables.lookup_with_parent(inner, "g");
        assert_eq!(depth, 1);
        assert!(symbol.any());

        let (depth, symbol) = tables.lookup_with_parent(inner, "missing");
        assert_eq!(depth, -1);
        assert!(!symbol.any());
    }

    #[test]
    fn lookup_in_root_skips_intermediate_tables() {
        let mut tables = SymbolTables::new();
        let root = tables.alloc(None);
        let inner = tables.alloc(Some(root));

        tables.get_mut(root).define("g", TypeId::DYNAMIC, false);
        tables.get_mut(inner).define("g", TypeId::DYNAMIC, false);
        tables.get_mut(inner).define("local", TypeId::DYNAMIC, false);

        let (depth, symbol) = tables.lookup_in_root(inner, "g");
        assert_eq!(depth, 0);
        assert!(symbol.any());

        // Names only defined in the inner table are not visible in the root
        let (_, symbol) = tables.lookup_in_root(inner, "local");
        assert!(!symbol.any());
    }
}
