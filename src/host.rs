//! The shared metadata-host context.
//!
//! The parser and the intern factory are coupled only through this context: it
//! supplies interned names, token resolution and the platform type names, and it
//! carries the single lock that guards compound mutations (spanning the intern
//! tables and any host-side cache). The context is an explicit, reference-counted
//! object passed to constructors - never an ambient global - so tests can build
//! an isolated one with the lock disabled.
//!
//! # Key Components
//!
//! - [`HostContext`] - the shared context: name table, platform names, lock
//! - [`Name`] - an interned string key; equal keys mean equal strings
//! - [`TokenResolver`] - capability for resolving metadata tokens at query time
//! - [`CriticalSection`] - the explicit lock type, substitutable with a no-op

use std::{collections::HashMap, sync::Arc, sync::Mutex, sync::MutexGuard};

use dashmap::DashMap;

use crate::symbols::Token;

/// Names every host interns up front; components compare against these without
/// re-interning per call site.
const WELL_KNOWN_NAMES: &[&str] = &[
    "System.Object",
    "System.Boolean",
    "System.Char",
    "System.SByte",
    "System.Byte",
    "System.Int16",
    "System.UInt16",
    "System.Int32",
    "System.UInt32",
    "System.Int64",
    "System.UInt64",
    "System.Single",
    "System.Double",
    "System.String",
    "System.Void",
    ".ctor",
    ".cctor",
    "value__",
];

/// An interned string: a stable index into the host's name table.
///
/// Two `Name`s compare equal iff their strings are equal, making name comparison
/// an integer compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(pub u32);

impl Name {
    /// The raw table index.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// Append-only interned string table.
///
/// Lookup goes through a concurrent map; storage is an append-only vector so a
/// [`Name`] stays a valid index for the table's lifetime.
struct NameTable {
    lookup: DashMap<String, Name>,
    storage: boxcar::Vec<String>,
}

impl NameTable {
    fn new() -> Self {
        NameTable {
            lookup: DashMap::new(),
            storage: boxcar::Vec::new(),
        }
    }

    fn intern(&self, text: &str) -> Name {
        if let Some(existing) = self.lookup.get(text) {
            return *existing;
        }

        // The entry guard serializes racing interns of the same string.
        *self
            .lookup
            .entry(text.to_string())
            .or_insert_with(|| Name(self.storage.push(text.to_string()) as u32))
    }

    fn text(&self, name: Name) -> Option<&str> {
        self.storage.get(name.0 as usize).map(String::as_str)
    }
}

/// Interned names of the platform types components fall back to when a local's
/// type cannot be determined otherwise.
#[derive(Debug, Clone, Copy)]
pub struct PlatformTypes {
    /// `System.Object`
    pub system_object: Name,
    /// `System.Boolean`
    pub system_boolean: Name,
    /// `System.Int32`
    pub system_int32: Name,
    /// `System.String`
    pub system_string: Name,
    /// `System.Void`
    pub system_void: Name,
}

/// Opaque handle to an object in the host's metadata model.
///
/// The metadata object model itself is an external collaborator; this crate only
/// passes its handles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(pub u64);

/// Capability for resolving a metadata token to an object in the host's model.
///
/// Supplied at query time rather than parse time: continuation tokens in async
/// metadata may name methods not yet loaded while the PDB is parsed.
pub trait TokenResolver: Send + Sync {
    /// Resolve `token`, or `None` when the host has no object for it.
    fn object_for_token(&self, token: Token) -> Option<ObjectHandle>;
}

/// A [`TokenResolver`] backed by a plain map; the simplest useful host.
#[derive(Debug, Default)]
pub struct MapResolver {
    objects: HashMap<Token, ObjectHandle>,
}

impl MapResolver {
    /// Create an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        MapResolver::default()
    }

    /// Register an object for `token`.
    pub fn insert(&mut self, token: Token, object: ObjectHandle) {
        self.objects.insert(token, object);
    }
}

impl TokenResolver for MapResolver {
    fn object_for_token(&self, token: Token) -> Option<ObjectHandle> {
        self.objects.get(&token).copied()
    }
}

/// The process-wide lock discipline as an explicit type.
///
/// One critical section guards every compound mutation that spans the intern
/// factory's tables and the host's caches. Tests running single-threaded
/// substitute the disabled variant and skip the locking entirely.
pub enum CriticalSection {
    /// A real mutex
    Lock(Mutex<()>),
    /// No-op substitute for single-threaded harnesses
    Disabled,
}

impl CriticalSection {
    /// A real lock.
    #[must_use]
    pub fn new() -> Self {
        CriticalSection::Lock(Mutex::new(()))
    }

    /// Enter the critical section; the guard releases it on drop.
    ///
    /// A poisoned mutex is recovered rather than propagated.
    pub fn enter(&self) -> Option<MutexGuard<'_, ()>> {
        match self {
            CriticalSection::Lock(mutex) => {
                Some(mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner))
            }
            CriticalSection::Disabled => None,
        }
    }
}

impl Default for CriticalSection {
    fn default() -> Self {
        CriticalSection::new()
    }
}

/// The shared host context.
///
/// Constructed once and passed by `Arc` to every component that needs name
/// interning or the shared lock.
pub struct HostContext {
    names: NameTable,
    platform: PlatformTypes,
    lock: CriticalSection,
}

impl HostContext {
    /// Create a context with a real lock.
    #[must_use]
    pub fn new() -> Arc<HostContext> {
        Self::with_lock(CriticalSection::new())
    }

    /// Create a context with the no-op lock, for single-threaded harnesses.
    #[must_use]
    pub fn without_lock() -> Arc<HostContext> {
        Self::with_lock(CriticalSection::Disabled)
    }

    fn with_lock(lock: CriticalSection) -> Arc<HostContext> {
        let names = NameTable::new();
        for name in WELL_KNOWN_NAMES {
            names.intern(name);
        }

        let platform = PlatformTypes {
            system_object: names.intern("System.Object"),
            system_boolean: names.intern("System.Boolean"),
            system_int32: names.intern("System.Int32"),
            system_string: names.intern("System.String"),
            system_void: names.intern("System.Void"),
        };

        Arc::new(HostContext {
            names,
            platform,
            lock,
        })
    }

    /// Intern `text`, returning its stable name key.
    #[must_use]
    pub fn get_name_for(&self, text: &str) -> Name {
        self.names.intern(text)
    }

    /// The string behind a name, or `None` for a name from another context.
    #[must_use]
    pub fn name_text(&self, name: Name) -> Option<&str> {
        self.names.text(name)
    }

    /// The platform type names.
    #[must_use]
    pub fn platform(&self) -> &PlatformTypes {
        &self.platform
    }

    /// The shared critical section.
    #[must_use]
    pub fn critical_section(&self) -> &CriticalSection {
        &self.lock
    }
}
