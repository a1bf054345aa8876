// src/state.rs
//! Configuration and the per-compile state.
//!
//! One `CompileState` owns everything the passes share: the diagnostics
//! list, the type database, the symbol table arena and the module graph.
//! It is passed by `&mut` throughout; nothing lives in process-wide
//! statics.

use crate::errors::{Diagnostics, SemanticError};
use crate::frontend::Span;
use crate::frontend::ast::ModuleAst;
use crate::module::Module;
use crate::sema::database::TypeDatabase;
use crate::sema::symbol_table::SymbolTables;
use crate::sema::types::{ObjectType, TypeKind};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Compilation mode, selecting default target subdirectories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Debug,
    Release,
    Test,
}

impl Mode {
    pub fn directory_name(&self) -> &'static str {
        match self {
            Mode::Debug => "debug",
            Mode::Release => "release",
            Mode::Test => "test",
        }
    }
}

/// Recognized configuration options
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub target: PathBuf,
    pub include: Vec<PathBuf>,
}

impl Config {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            target: PathBuf::from("build").join(mode.directory_name()),
            include: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: PathBuf) -> Self {
        self.target = target;
        self
    }

    pub fn add_include(&mut self, directory: PathBuf) {
        self.include.push(directory);
    }

    /// Ensure the target tree exists.
    pub fn create_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.target)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Mode::Debug)
    }
}

/// All state shared by the passes of one compile
#[derive(Debug)]
pub struct CompileState {
    pub config: Config,
    pub diagnostics: Diagnostics,
    pub types: TypeDatabase,
    pub tables: SymbolTables,
    modules: FxHashMap<String, Module>,
    /// Qualified names in dependency-first order, used by TIR generation
    pub module_order: Vec<String>,
}

impl CompileState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            diagnostics: Diagnostics::new(),
            types: TypeDatabase::new(),
            tables: SymbolTables::new(),
            modules: FxHashMap::default(),
            module_order: Vec::new(),
        }
    }

    /// Register a module under its qualified name and return it.
    ///
    /// The module gets a fresh global symbol table and an object type of
    /// its own (prototype: the module prototype) serving as `self` at
    /// module scope.
    pub fn register_module(
        &mut self,
        qualified_name: &str,
        source_path: PathBuf,
        ast: Rc<ModuleAst>,
    ) -> &mut Module {
        let globals = self.tables.alloc(None);
        let self_type = self.types.arena.alloc(TypeKind::Object(ObjectType::new(
            qualified_name,
            Some(self.types.module_prototype),
        )));
        let module = Module::new(qualified_name, source_path, globals, self_type, ast);
        self.modules.insert(qualified_name.to_string(), module);
        self.modules.get_mut(qualified_name).unwrap()
    }

    pub fn has_module(&self, qualified_name: &str) -> bool {
        self.modules.contains_key(qualified_name)
    }

    /// Retrieve an already-loaded module.
    pub fn module(&self, qualified_name: &str) -> Result<&Module, SemanticError> {
        self.modules
            .get(qualified_name)
            .ok_or_else(|| SemanticError::UnknownModule {
                name: qualified_name.to_string(),
            })
    }

    pub fn module_mut(&mut self, qualified_name: &str) -> Result<&mut Module, SemanticError> {
        self.modules
            .get_mut(qualified_name)
            .ok_or_else(|| SemanticError::UnknownModule {
                name: qualified_name.to_string(),
            })
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Record an error diagnostic against a module's source file.
    pub fn error(
        &mut self,
        error: impl miette::Diagnostic + std::fmt::Display,
        path: &Path,
        span: Span,
    ) {
        self.diagnostics.error(error, path, span);
    }
}
