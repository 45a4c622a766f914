//! Process-wide symbol table mapping `<module>.<name>` tokens to types, plus
//! the name index used to resolve string forward references.
//!
//! Classes are held weakly so dynamically built classes can be dropped.

use crate::{
    FRAMEWORK_MODULE,
    annotation::{Builtin, TypeRef},
    class::{Class, WeakClass},
};
use std::{
    collections::HashMap,
    sync::{LazyLock, RwLock},
};

///
/// CONSTANTS
///

/// Non-class callables pre-registered under `builtins`.
pub const BUILTIN_FUNCTIONS: [&str; 14] = [
    "len",
    "print",
    "eval",
    "exec",
    "compile",
    "open",
    "input",
    "breakpoint",
    "help",
    "globals",
    "locals",
    "vars",
    "dir",
    "__import__",
];

static SYMBOLS: LazyLock<RwLock<HashMap<String, Entry>>> =
    LazyLock::new(|| RwLock::new(preload()));

static CLASSES_BY_NAME: LazyLock<RwLock<HashMap<String, Vec<WeakClass>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

///
/// Symbol
///
/// What a registered token names.
///

#[derive(Clone, Debug)]
pub enum Symbol {
    Type(TypeRef),
    Function(String),
    Module(String),
}

impl Symbol {
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Type(_) => "type",
            Self::Function(_) => "builtin_function_or_method",
            Self::Module(_) => "module",
        }
    }
}

#[derive(Clone)]
enum Entry {
    Type(TypeRef),
    Class(WeakClass),
    Function(String),
    Module(String),
}

fn preload() -> HashMap<String, Entry> {
    let mut symbols = HashMap::new();

    for builtin in Builtin::ALL {
        let ty = TypeRef::Builtin(builtin);
        symbols.insert(ty.qualified_name(), Entry::Type(ty));
    }
    for name in BUILTIN_FUNCTIONS {
        symbols.insert(format!("builtins.{name}"), Entry::Function(name.to_string()));
    }

    let root = Class::root();
    symbols.insert(root.qualified_name(), Entry::Class(root.downgrade()));
    symbols.insert(
        format!("{FRAMEWORK_MODULE}.primitives"),
        Entry::Module(format!("{FRAMEWORK_MODULE}.primitives")),
    );

    symbols
}

fn symbols_write() -> std::sync::RwLockWriteGuard<'static, HashMap<String, Entry>> {
    SYMBOLS
        .write()
        .expect("symbol table RwLock poisoned while acquiring write lock")
}

fn symbols_read() -> std::sync::RwLockReadGuard<'static, HashMap<String, Entry>> {
    SYMBOLS
        .read()
        .expect("symbol table RwLock poisoned while acquiring read lock")
}

/// Register a type under its qualified name. Later registrations win.
pub fn register_type(ty: TypeRef) {
    let entry = match &ty {
        TypeRef::Class(class) => Entry::Class(class.downgrade()),
        _ => Entry::Type(ty.clone()),
    };
    symbols_write().insert(ty.qualified_name(), entry);
}

/// Register a non-class callable, e.g. for tests of the secure resolver.
pub fn register_function(module: &str, name: &str) {
    symbols_write().insert(format!("{module}.{name}"), Entry::Function(name.to_string()));
}

pub fn register_module(module: &str, name: &str) {
    let token = format!("{module}.{name}");
    symbols_write().insert(token.clone(), Entry::Module(token));
}

/// Register a class in the symbol table and the forward-reference index.
pub fn register_class(class: &Class) {
    register_type(class.type_ref());

    let mut by_name = CLASSES_BY_NAME
        .write()
        .expect("class index RwLock poisoned while acquiring write lock");
    let entries = by_name.entry(class.name().to_string()).or_default();
    entries.retain(|weak| weak.upgrade().is_some());
    entries.push(class.downgrade());
}

#[must_use]
pub fn lookup(token: &str) -> Option<Symbol> {
    let symbols = symbols_read();

    match symbols.get(token)? {
        Entry::Type(ty) => Some(Symbol::Type(ty.clone())),
        Entry::Class(weak) => weak.upgrade().map(|class| Symbol::Type(TypeRef::Class(class))),
        Entry::Function(name) => Some(Symbol::Function(name.clone())),
        Entry::Module(name) => Some(Symbol::Module(name.clone())),
    }
}

/// True when at least one symbol lives in `module`.
#[must_use]
pub fn module_exists(module: &str) -> bool {
    let prefix = format!("{module}.");

    symbols_read().keys().any(|token| token.starts_with(&prefix))
}

/// Most recently registered live class called `name`, preferring one
/// defined in `module` when given.
#[must_use]
pub fn find_class(name: &str, module: Option<&str>) -> Option<Class> {
    let by_name = CLASSES_BY_NAME
        .read()
        .expect("class index RwLock poisoned while acquiring read lock");
    let live: Vec<Class> = by_name
        .get(name)?
        .iter()
        .filter_map(WeakClass::upgrade)
        .collect();

    module
        .and_then(|module| live.iter().rev().find(|c| c.module() == module).cloned())
        .or_else(|| live.last().cloned())
}

///
/// TESTS
///
