//! Structural interning of metadata references.
//!
//! Comparing deep reference graphs (generic instantiations, arrays of modified
//! pointers, method signatures) is expensive; this module assigns every distinct
//! structural shape a stable `u32` key so equality becomes an integer compare and
//! graphs can be cached by key. Two references with the same shape and the same
//! constituent keys always receive the same key - structural equality, never
//! identity.
//!
//! # Architecture
//!
//! Keys are partitioned by category (assembly, module, type, method, field,
//! argument list, modifier list), each with its own append-only storage: the key
//! is the storage index plus one, so keys are monotonic, never reused, and zero
//! never names a real entity. Callers describe a reference as a
//! [`TypeDescription`] tree; [`InternFactory::intern_type`] folds it bottom-up
//! into keys, deduplicating through concurrent tables.
//!
//! Argument and modifier lists are interned as cons lists (head key, tail-list
//! key), so lists sharing a suffix share the tail's key - and argument order is
//! structurally significant.
//!
//! The one recursion hazard is a method signature mentioning the method's own
//! generic parameters: interning the parameter needs the method key, which is
//! still being computed. The factory short-circuits the cycle by handing out an
//! index-derived placeholder key for [`MethodOwner::Current`] references while
//! the owning method is mid-interning; [`InternFactory::keys_are_reliably_unique`]
//! reports `false` for that window.
//!
//! # Examples
//!
//! ```rust
//! use pdbscope::host::HostContext;
//! use pdbscope::intern::{InternFactory, TypeDescription};
//!
//! let host = HostContext::new();
//! let factory = InternFactory::new(host.clone());
//!
//! let assembly = factory.intern_assembly(&Default::default());
//! let module = factory.intern_module(assembly, host.get_name_for("Lib.dll"));
//! let list = TypeDescription::Namespace {
//!     module,
//!     namespace: host.get_name_for("System.Collections.Generic"),
//!     name: host.get_name_for("List"),
//!     generic_arity: 1,
//! };
//! assert_eq!(factory.intern_type(&list), factory.intern_type(&list.clone()));
//! ```

pub mod guess;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use dashmap::DashMap;

use crate::host::{HostContext, Name};

/// Placeholder key space for generic method parameters of a method that is
/// currently being interned. Real type keys never reach this range in practice;
/// callers must not persist placeholder keys (see
/// [`InternFactory::keys_are_reliably_unique`]).
pub const SELF_REFERENTIAL_PARAMETER_BASE: u32 = 1_000_000;

macro_rules! intern_key {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $name {
            /// The raw key value.
            #[must_use]
            pub fn value(&self) -> u32 {
                self.0
            }
        }
    };
}

intern_key!(
    /// Key of an interned assembly identity.
    AssemblyKey
);
intern_key!(
    /// Key of an interned module within an assembly.
    ModuleKey
);
intern_key!(
    /// Key of an interned type shape.
    TypeKey
);
intern_key!(
    /// Key of an interned method reference.
    MethodKey
);
intern_key!(
    /// Key of an interned field reference.
    FieldKey
);
intern_key!(
    /// Key of an interned type-argument cons list.
    ListKey
);
intern_key!(
    /// Key of an interned custom-modifier cons list.
    ModifierListKey
);

impl ListKey {
    /// The empty argument list.
    pub const EMPTY: ListKey = ListKey(0);
}

impl ModifierListKey {
    /// The empty modifier list.
    pub const EMPTY: ModifierListKey = ModifierListKey(0);
}

/// Structural identity of an assembly reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AssemblyIdentity {
    /// Simple name, e.g. `mscorlib`
    pub name: String,
    /// Major, minor, build, revision
    pub version: [u16; 4],
    /// Culture, empty for neutral
    pub culture: String,
    /// Public key token bytes, empty when unsigned
    pub public_key_token: Vec<u8>,
}

/// Who defines a generic method parameter being interned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodOwner {
    /// The method currently being interned (self-referential signature)
    Current,
    /// An already-interned method
    Interned(MethodKey),
}

/// One custom modifier: its type plus the required/optional flag.
///
/// The flag is part of the modifier's identity - `modreq` and `modopt` of the
/// same type intern differently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomModifier {
    /// `true` for `modreq`, `false` for `modopt`
    pub required: bool,
    /// The modifier type
    pub modifier: Box<TypeDescription>,
}

/// A structural description of a type reference, supplied by callers.
///
/// This is the closed shape set the factory understands. Already-interned
/// subtrees can be spliced in as [`TypeDescription::Interned`] to avoid
/// re-describing them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescription {
    /// A subtree that was interned before
    Interned(TypeKey),
    /// A namespace-level type: module + namespace + name + generic arity
    Namespace {
        /// Defining module
        module: ModuleKey,
        /// Containing namespace name
        namespace: Name,
        /// Simple type name
        name: Name,
        /// Number of generic parameters
        generic_arity: u16,
    },
    /// A type nested inside another type
    Nested {
        /// The containing type
        container: Box<TypeDescription>,
        /// Simple type name
        name: Name,
        /// Number of generic parameters
        generic_arity: u16,
    },
    /// Single-dimensional zero-based array
    Vector {
        /// Element type
        element: Box<TypeDescription>,
    },
    /// General array: identity includes rank, every lower bound and size
    Matrix {
        /// Element type
        element: Box<TypeDescription>,
        /// Number of dimensions
        rank: u32,
        /// Per-dimension lower bounds, possibly shorter than `rank`
        lower_bounds: Vec<i32>,
        /// Per-dimension sizes, possibly shorter than `rank`
        sizes: Vec<u64>,
    },
    /// Instantiation of a generic type; argument order is significant
    GenericInstance {
        /// The generic definition
        definition: Box<TypeDescription>,
        /// Arguments in declaration order
        arguments: Vec<TypeDescription>,
    },
    /// A generic parameter of a type, always normalized to the definition
    GenericTypeParameter {
        /// The defining type; an instantiation is normalized to its definition
        defining_type: Box<TypeDescription>,
        /// Parameter position
        index: u16,
    },
    /// A generic parameter of a method
    GenericMethodParameter {
        /// The defining method
        owner: MethodOwner,
        /// Parameter position
        index: u16,
    },
    /// Unmanaged pointer
    Pointer {
        /// Pointee type
        target: Box<TypeDescription>,
    },
    /// Managed (by-ref) pointer
    ManagedPointer {
        /// Pointee type
        target: Box<TypeDescription>,
    },
    /// Function pointer with full signature identity
    FunctionPointer {
        /// Calling convention byte
        calling_convention: u8,
        /// Return type
        return_type: Box<TypeDescription>,
        /// Parameter types in order
        parameters: Vec<TypeDescription>,
    },
    /// A type carrying custom modifiers
    Modified {
        /// The unmodified type
        unmodified: Box<TypeDescription>,
        /// Modifiers in signature order
        modifiers: Vec<CustomModifier>,
    },
}

/// A structural description of a method reference.
#[derive(Debug, Clone)]
pub struct MethodShape {
    /// The containing type
    pub container: TypeDescription,
    /// Method name
    pub name: Name,
    /// Number of generic method parameters
    pub generic_parameter_count: u16,
    /// Calling convention byte
    pub calling_convention: u8,
    /// Return type
    pub return_type: TypeDescription,
    /// Parameter types in order
    pub parameters: Vec<TypeDescription>,
}

/// A structural description of a field reference.
#[derive(Debug, Clone)]
pub struct FieldShape {
    /// The containing type
    pub container: TypeDescription,
    /// Field name
    pub name: Name,
    /// The field's type
    pub field_type: TypeDescription,
}

/// A fully-keyed type shape, as stored by the factory.
///
/// Every constituent is a key, so derived equality and hashing *are* the
/// structural identity - no deep comparison remains.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InternedType {
    /// Namespace-level type
    Namespace {
        /// Defining module
        module: ModuleKey,
        /// Containing namespace name
        namespace: Name,
        /// Simple type name
        name: Name,
        /// Number of generic parameters
        generic_arity: u16,
    },
    /// Nested type, discriminated by container key first
    Nested {
        /// Containing type key
        container: TypeKey,
        /// Simple type name
        name: Name,
        /// Number of generic parameters
        generic_arity: u16,
    },
    /// Single-dimensional zero-based array
    Vector {
        /// Element type key
        element: TypeKey,
    },
    /// General array
    Matrix {
        /// Element type key
        element: TypeKey,
        /// Number of dimensions
        rank: u32,
        /// Per-dimension lower bounds
        lower_bounds: Vec<i32>,
        /// Per-dimension sizes
        sizes: Vec<u64>,
    },
    /// Generic instantiation
    GenericInstance {
        /// Definition key
        definition: TypeKey,
        /// Interned argument list
        arguments: ListKey,
    },
    /// Generic type parameter, keyed by the uninstantiated definition
    GenericTypeParameter {
        /// Defining (definition) type key
        defining_type: TypeKey,
        /// Parameter position
        index: u16,
    },
    /// Generic method parameter
    GenericMethodParameter {
        /// Defining method key
        defining_method: MethodKey,
        /// Parameter position
        index: u16,
    },
    /// Unmanaged pointer
    Pointer {
        /// Pointee key
        target: TypeKey,
    },
    /// Managed pointer
    ManagedPointer {
        /// Pointee key
        target: TypeKey,
    },
    /// Function pointer
    FunctionPointer {
        /// Calling convention byte
        calling_convention: u8,
        /// Return type key
        return_type: TypeKey,
        /// Interned parameter list
        parameters: ListKey,
    },
    /// Modified type
    Modified {
        /// Unmodified type key
        unmodified: TypeKey,
        /// Interned modifier list
        modifiers: ModifierListKey,
    },
}

/// Fully-keyed method identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MethodFingerprint {
    container: TypeKey,
    name: Name,
    generic_parameter_count: u16,
    calling_convention: u8,
    return_type: TypeKey,
    parameters: ListKey,
}

/// Fully-keyed field identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FieldFingerprint {
    container: TypeKey,
    name: Name,
    field_type: TypeKey,
}

/// The intern factory: structural shapes in, stable keys out.
///
/// All operations are safe under concurrent callers. Lookups go through
/// concurrent tables; the host's critical section additionally serializes whole
/// method interns so the self-referential placeholder window (reported by
/// [`keys_are_reliably_unique`]) is well defined.
///
/// [`keys_are_reliably_unique`]: InternFactory::keys_are_reliably_unique
pub struct InternFactory {
    host: Arc<HostContext>,

    assemblies: DashMap<AssemblyIdentity, AssemblyKey>,
    assembly_storage: boxcar::Vec<AssemblyIdentity>,

    modules: DashMap<(AssemblyKey, Name), ModuleKey>,
    module_storage: boxcar::Vec<(AssemblyKey, Name)>,

    types: DashMap<InternedType, TypeKey>,
    type_storage: boxcar::Vec<InternedType>,

    methods: DashMap<MethodFingerprint, MethodKey>,
    method_storage: boxcar::Vec<MethodFingerprint>,

    fields: DashMap<FieldFingerprint, FieldKey>,
    field_storage: boxcar::Vec<FieldFingerprint>,

    lists: DashMap<(TypeKey, ListKey), ListKey>,
    list_storage: boxcar::Vec<(TypeKey, ListKey)>,

    modifier_lists: DashMap<((bool, TypeKey), ModifierListKey), ModifierListKey>,
    modifier_list_storage: boxcar::Vec<((bool, TypeKey), ModifierListKey)>,

    methods_in_progress: AtomicUsize,
}

/// RAII marker for a method intern in progress.
struct MethodScope<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> MethodScope<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        MethodScope { counter }
    }
}

impl Drop for MethodScope<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InternFactory {
    /// Create a factory sharing the host's lock discipline.
    #[must_use]
    pub fn new(host: Arc<HostContext>) -> InternFactory {
        InternFactory {
            host,
            assemblies: DashMap::new(),
            assembly_storage: boxcar::Vec::new(),
            modules: DashMap::new(),
            module_storage: boxcar::Vec::new(),
            types: DashMap::new(),
            type_storage: boxcar::Vec::new(),
            methods: DashMap::new(),
            method_storage: boxcar::Vec::new(),
            fields: DashMap::new(),
            field_storage: boxcar::Vec::new(),
            lists: DashMap::new(),
            list_storage: boxcar::Vec::new(),
            modifier_lists: DashMap::new(),
            modifier_list_storage: boxcar::Vec::new(),
            methods_in_progress: AtomicUsize::new(0),
        }
    }

    /// The host context this factory was built with.
    #[must_use]
    pub fn host(&self) -> &Arc<HostContext> {
        &self.host
    }

    /// `false` only while a method reference is mid-interning, when
    /// [`MethodOwner::Current`] parameters resolve to placeholder keys. Keys
    /// observed while this returns `false` must not be treated as globally
    /// comparable.
    #[must_use]
    pub fn keys_are_reliably_unique(&self) -> bool {
        self.methods_in_progress.load(Ordering::SeqCst) == 0
    }

    /// Intern an assembly identity.
    pub fn intern_assembly(&self, identity: &AssemblyIdentity) -> AssemblyKey {
        if let Some(existing) = self.assemblies.get(identity) {
            return *existing;
        }

        *self
            .assemblies
            .entry(identity.clone())
            .or_insert_with(|| {
                AssemblyKey(self.assembly_storage.push(identity.clone()) as u32 + 1)
            })
    }

    /// Intern a module by its defining assembly and name.
    pub fn intern_module(&self, assembly: AssemblyKey, name: Name) -> ModuleKey {
        *self
            .modules
            .entry((assembly, name))
            .or_insert_with(|| ModuleKey(self.module_storage.push((assembly, name)) as u32 + 1))
    }

    /// Intern a type description.
    ///
    /// Idempotent: structurally equal descriptions (independent instances
    /// included) always yield the same key.
    pub fn intern_type(&self, description: &TypeDescription) -> TypeKey {
        self.intern_type_inner(description, false)
    }

    /// Intern a method reference.
    ///
    /// Parameter and return types may reference the method's own generic
    /// parameters through [`MethodOwner::Current`]; such references resolve to
    /// placeholder keys for the duration of this call and the interning
    /// completes without recursing into itself.
    pub fn intern_method(&self, shape: &MethodShape) -> MethodKey {
        let _lock = self.host.critical_section().enter();
        let _scope = MethodScope::enter(&self.methods_in_progress);

        let container = self.intern_type_inner(&shape.container, true);
        let return_type = self.intern_type_inner(&shape.return_type, true);
        let parameter_keys: Vec<TypeKey> = shape
            .parameters
            .iter()
            .map(|parameter| self.intern_type_inner(parameter, true))
            .collect();
        let parameters = self.intern_type_list(&parameter_keys);

        let fingerprint = MethodFingerprint {
            container,
            name: shape.name,
            generic_parameter_count: shape.generic_parameter_count,
            calling_convention: shape.calling_convention,
            return_type,
            parameters,
        };

        if let Some(existing) = self.methods.get(&fingerprint) {
            return *existing;
        }

        *self
            .methods
            .entry(fingerprint.clone())
            .or_insert_with(|| {
                MethodKey(self.method_storage.push(fingerprint.clone()) as u32 + 1)
            })
    }

    /// Intern a field reference.
    pub fn intern_field(&self, shape: &FieldShape) -> FieldKey {
        let container = self.intern_type(&shape.container);
        let field_type = self.intern_type(&shape.field_type);

        let fingerprint = FieldFingerprint {
            container,
            name: shape.name,
            field_type,
        };

        if let Some(existing) = self.fields.get(&fingerprint) {
            return *existing;
        }

        *self
            .fields
            .entry(fingerprint.clone())
            .or_insert_with(|| FieldKey(self.field_storage.push(fingerprint.clone()) as u32 + 1))
    }

    /// Intern an ordered type list as a cons chain, sharing common suffixes.
    pub fn intern_type_list(&self, keys: &[TypeKey]) -> ListKey {
        let mut tail = ListKey::EMPTY;
        for &head in keys.iter().rev() {
            tail = *self
                .lists
                .entry((head, tail))
                .or_insert_with(|| ListKey(self.list_storage.push((head, tail)) as u32 + 1));
        }
        tail
    }

    /// Head and tail of an interned cons list, or `None` for the empty list.
    #[must_use]
    pub fn list_parts(&self, list: ListKey) -> Option<(TypeKey, ListKey)> {
        if list == ListKey::EMPTY {
            return None;
        }
        self.list_storage.get(list.0 as usize - 1).copied()
    }

    /// The stored shape behind a type key.
    ///
    /// Placeholder keys handed out for [`MethodOwner::Current`] parameters have
    /// no stored shape and yield `None`.
    #[must_use]
    pub fn type_shape(&self, key: TypeKey) -> Option<&InternedType> {
        if key.0 == 0 || key.0 > self.type_storage.count() as u32 {
            return None;
        }
        self.type_storage.get(key.0 as usize - 1)
    }

    /// Number of distinct type shapes interned so far.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.type_storage.count()
    }

    fn intern_modifier_list(&self, modifiers: &[(bool, TypeKey)]) -> ModifierListKey {
        let mut tail = ModifierListKey::EMPTY;
        for &modifier in modifiers.iter().rev() {
            tail = *self
                .modifier_lists
                .entry((modifier, tail))
                .or_insert_with(|| {
                    ModifierListKey(self.modifier_list_storage.push((modifier, tail)) as u32 + 1)
                });
        }
        tail
    }

    fn intern_shape(&self, shape: InternedType) -> TypeKey {
        if let Some(existing) = self.types.get(&shape) {
            return *existing;
        }

        *self
            .types
            .entry(shape.clone())
            .or_insert_with(|| TypeKey(self.type_storage.push(shape.clone()) as u32 + 1))
    }

    /// Recursive worker; `in_method` marks that a method intern is on the stack
    /// so [`MethodOwner::Current`] parameters short-circuit to placeholders.
    fn intern_type_inner(&self, description: &TypeDescription, in_method: bool) -> TypeKey {
        match description {
            TypeDescription::Interned(key) => *key,

            TypeDescription::Namespace {
                module,
                namespace,
                name,
                generic_arity,
            } => self.intern_shape(InternedType::Namespace {
                module: *module,
                namespace: *namespace,
                name: *name,
                generic_arity: *generic_arity,
            }),

            TypeDescription::Nested {
                container,
                name,
                generic_arity,
            } => {
                let container = self.intern_type_inner(container, in_method);
                self.intern_shape(InternedType::Nested {
                    container,
                    name: *name,
                    generic_arity: *generic_arity,
                })
            }

            TypeDescription::Vector { element } => {
                let element = self.intern_type_inner(element, in_method);
                self.intern_shape(InternedType::Vector { element })
            }

            TypeDescription::Matrix {
                element,
                rank,
                lower_bounds,
                sizes,
            } => {
                let element = self.intern_type_inner(element, in_method);
                self.intern_shape(InternedType::Matrix {
                    element,
                    rank: *rank,
                    lower_bounds: lower_bounds.clone(),
                    sizes: sizes.clone(),
                })
            }

            TypeDescription::GenericInstance {
                definition,
                arguments,
            } => {
                let definition = self.intern_type_inner(definition, in_method);
                let argument_keys: Vec<TypeKey> = arguments
                    .iter()
                    .map(|argument| self.intern_type_inner(argument, in_method))
                    .collect();
                let arguments = self.intern_type_list(&argument_keys);
                self.intern_shape(InternedType::GenericInstance {
                    definition,
                    arguments,
                })
            }

            TypeDescription::GenericTypeParameter {
                defining_type,
                index,
            } => {
                // Normalize to the generic definition so List<T>.Item and
                // List<int>.Item share the parameter identity.
                let defining_type = match &**defining_type {
                    TypeDescription::GenericInstance { definition, .. } => {
                        self.intern_type_inner(definition, in_method)
                    }
                    other => self.intern_type_inner(other, in_method),
                };
                self.intern_shape(InternedType::GenericTypeParameter {
                    defining_type,
                    index: *index,
                })
            }

            TypeDescription::GenericMethodParameter { owner, index } => match owner {
                MethodOwner::Interned(method) => {
                    self.intern_shape(InternedType::GenericMethodParameter {
                        defining_method: *method,
                        index: *index,
                    })
                }
                MethodOwner::Current => {
                    debug_assert!(in_method, "Current owner outside a method intern");
                    TypeKey(SELF_REFERENTIAL_PARAMETER_BASE + u32::from(*index))
                }
            },

            TypeDescription::Pointer { target } => {
                let target = self.intern_type_inner(target, in_method);
                self.intern_shape(InternedType::Pointer { target })
            }

            TypeDescription::ManagedPointer { target } => {
                let target = self.intern_type_inner(target, in_method);
                self.intern_shape(InternedType::ManagedPointer { target })
            }

            TypeDescription::FunctionPointer {
                calling_convention,
                return_type,
                parameters,
            } => {
                let return_type = self.intern_type_inner(return_type, in_method);
                let parameter_keys: Vec<TypeKey> = parameters
                    .iter()
                    .map(|parameter| self.intern_type_inner(parameter, in_method))
                    .collect();
                let parameters = self.intern_type_list(&parameter_keys);
                self.intern_shape(InternedType::FunctionPointer {
                    calling_convention: *calling_convention,
                    return_type,
                    parameters,
                })
            }

            TypeDescription::Modified {
                unmodified,
                modifiers,
            } => {
                let unmodified = self.intern_type_inner(unmodified, in_method);
                let modifier_keys: Vec<(bool, TypeKey)> = modifiers
                    .iter()
                    .map(|modifier| {
                        (
                            modifier.required,
                            self.intern_type_inner(&modifier.modifier, in_method),
                        )
                    })
                    .collect();
                let modifiers = self.intern_modifier_list(&modifier_keys);
                self.intern_shape(InternedType::Modified {
                    unmodified,
                    modifiers,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> (Arc<HostContext>, InternFactory) {
        let host = HostContext::without_lock();
        let factory = InternFactory::new(Arc::clone(&host));
        (host, factory)
    }

    fn corlib(host: &HostContext, factory: &InternFactory) -> ModuleKey {
        let assembly = factory.intern_assembly(&AssemblyIdentity {
            name: "mscorlib".into(),
            version: [4, 0, 0, 0],
            culture: String::new(),
            public_key_token: vec![0xB7, 0x7A, 0x5C, 0x56, 0x19, 0x34, 0xE0, 0x89],
        });
        factory.intern_module(assembly, host.get_name_for("mscorlib.dll"))
    }

    fn namespace_type(
        host: &HostContext,
        module: ModuleKey,
        namespace: &str,
        name: &str,
        arity: u16,
    ) -> TypeDescription {
        TypeDescription::Namespace {
            module,
            namespace: host.get_name_for(namespace),
            name: host.get_name_for(name),
            generic_arity: arity,
        }
    }

    #[test]
    fn interning_is_idempotent_across_instances() {
        let (host, factory) = factory();
        let module = corlib(&host, &factory);

        let first = namespace_type(&host, module, "System", "Int32", 0);
        let second = namespace_type(&host, module, "System", "Int32", 0);
        assert_eq!(factory.intern_type(&first), factory.intern_type(&second));
        assert_eq!(factory.type_count(), 1);
    }

    #[test]
    fn keys_are_monotonic_and_partitioned() {
        let (host, factory) = factory();
        let module = corlib(&host, &factory);

        let a = factory.intern_type(&namespace_type(&host, module, "System", "A", 0));
        let b = factory.intern_type(&namespace_type(&host, module, "System", "B", 0));
        assert!(a.value() < b.value());

        // Method and type counters are independent.
        let method = factory.intern_method(&MethodShape {
            container: TypeDescription::Interned(a),
            name: host.get_name_for("M"),
            generic_parameter_count: 0,
            calling_convention: 0,
            return_type: TypeDescription::Interned(b),
            parameters: vec![],
        });
        assert_eq!(method.value(), 1);
    }

    #[test]
    fn generic_argument_order_is_significant() {
        let (host, factory) = factory();
        let module = corlib(&host, &factory);

        let dict = namespace_type(&host, module, "System.Collections.Generic", "Dictionary", 2);
        let int32 = namespace_type(&host, module, "System", "Int32", 0);
        let string = namespace_type(&host, module, "System", "String", 0);

        let int_string = TypeDescription::GenericInstance {
            definition: Box::new(dict.clone()),
            arguments: vec![int32.clone(), string.clone()],
        };
        let string_int = TypeDescription::GenericInstance {
            definition: Box::new(dict),
            arguments: vec![string, int32],
        };

        assert_ne!(
            factory.intern_type(&int_string),
            factory.intern_type(&string_int)
        );
        assert_eq!(
            factory.intern_type(&int_string),
            factory.intern_type(&int_string.clone())
        );
    }

    #[test]
    fn cons_lists_share_suffixes() {
        let (host, factory) = factory();
        let module = corlib(&host, &factory);

        let a = factory.intern_type(&namespace_type(&host, module, "N", "A", 0));
        let b = factory.intern_type(&namespace_type(&host, module, "N", "B", 0));
        let c = factory.intern_type(&namespace_type(&host, module, "N", "C", 0));
        let x = factory.intern_type(&namespace_type(&host, module, "N", "X", 0));

        let abc = factory.intern_type_list(&[a, b, c]);
        let xbc = factory.intern_type_list(&[x, b, c]);
        assert_ne!(abc, xbc);

        let (_, abc_tail) = factory.list_parts(abc).unwrap();
        let (_, xbc_tail) = factory.list_parts(xbc).unwrap();
        assert_eq!(abc_tail, xbc_tail); // [b, c] shared

        assert_eq!(factory.intern_type_list(&[]), ListKey::EMPTY);
        assert!(factory.list_parts(ListKey::EMPTY).is_none());
    }

    #[test]
    fn nested_types_discriminate_by_container() {
        let (host, factory) = factory();
        let module = corlib(&host, &factory);

        let outer_a = namespace_type(&host, module, "N", "OuterA", 0);
        let outer_b = namespace_type(&host, module, "N", "OuterB", 0);

        let nested_in_a = TypeDescription::Nested {
            container: Box::new(outer_a),
            name: host.get_name_for("Inner"),
            generic_arity: 0,
        };
        let nested_in_b = TypeDescription::Nested {
            container: Box::new(outer_b),
            name: host.get_name_for("Inner"),
            generic_arity: 0,
        };

        assert_ne!(
            factory.intern_type(&nested_in_a),
            factory.intern_type(&nested_in_b)
        );
    }

    #[test]
    fn matrix_identity_includes_rank_bounds_and_sizes() {
        let (host, factory) = factory();
        let module = corlib(&host, &factory);
        let element = Box::new(namespace_type(&host, module, "System", "Double", 0));

        let base = TypeDescription::Matrix {
            element: element.clone(),
            rank: 2,
            lower_bounds: vec![0, 0],
            sizes: vec![3, 3],
        };
        let other_rank = TypeDescription::Matrix {
            element: element.clone(),
            rank: 3,
            lower_bounds: vec![0, 0],
            sizes: vec![3, 3],
        };
        let other_bounds = TypeDescription::Matrix {
            element: element.clone(),
            rank: 2,
            lower_bounds: vec![1, 0],
            sizes: vec![3, 3],
        };
        let vector = TypeDescription::Vector { element };

        let keys = [
            factory.intern_type(&base),
            factory.intern_type(&other_rank),
            factory.intern_type(&other_bounds),
            factory.intern_type(&vector),
        ];
        for i in 0..keys.len() {
            for j in i + 1..keys.len() {
                assert_ne!(keys[i], keys[j], "{i} vs {j}");
            }
        }
    }

    #[test]
    fn pointer_kinds_are_distinct() {
        let (host, factory) = factory();
        let module = corlib(&host, &factory);
        let int32 = Box::new(namespace_type(&host, module, "System", "Int32", 0));

        let pointer = factory.intern_type(&TypeDescription::Pointer {
            target: int32.clone(),
        });
        let managed = factory.intern_type(&TypeDescription::ManagedPointer { target: int32 });
        assert_ne!(pointer, managed);
    }

    #[test]
    fn generic_type_parameter_normalizes_to_definition() {
        let (host, factory) = factory();
        let module = corlib(&host, &factory);

        let list = namespace_type(&host, module, "System.Collections.Generic", "List", 1);
        let int32 = namespace_type(&host, module, "System", "Int32", 0);
        let list_of_int = TypeDescription::GenericInstance {
            definition: Box::new(list.clone()),
            arguments: vec![int32],
        };

        let from_definition = TypeDescription::GenericTypeParameter {
            defining_type: Box::new(list),
            index: 0,
        };
        let from_instance = TypeDescription::GenericTypeParameter {
            defining_type: Box::new(list_of_int),
            index: 0,
        };

        assert_eq!(
            factory.intern_type(&from_definition),
            factory.intern_type(&from_instance)
        );
    }

    #[test]
    fn modifier_identity_includes_required_flag() {
        let (host, factory) = factory();
        let module = corlib(&host, &factory);

        let int32 = Box::new(namespace_type(&host, module, "System", "Int32", 0));
        let volatile = Box::new(namespace_type(
            &host,
            module,
            "System.Runtime.CompilerServices",
            "IsVolatile",
            0,
        ));

        let required = TypeDescription::Modified {
            unmodified: int32.clone(),
            modifiers: vec![CustomModifier {
                required: true,
                modifier: volatile.clone(),
            }],
        };
        let optional = TypeDescription::Modified {
            unmodified: int32,
            modifiers: vec![CustomModifier {
                required: false,
                modifier: volatile,
            }],
        };

        assert_ne!(factory.intern_type(&required), factory.intern_type(&optional));
    }

    #[test]
    fn self_referential_method_completes() {
        let (host, factory) = factory();
        let module = corlib(&host, &factory);

        assert!(factory.keys_are_reliably_unique());

        // T M<T>(T value) - the parameter and return type mention the method's
        // own generic parameter.
        let shape = MethodShape {
            container: namespace_type(&host, module, "N", "C", 0),
            name: host.get_name_for("M"),
            generic_parameter_count: 1,
            calling_convention: 0x10,
            return_type: TypeDescription::GenericMethodParameter {
                owner: MethodOwner::Current,
                index: 0,
            },
            parameters: vec![TypeDescription::GenericMethodParameter {
                owner: MethodOwner::Current,
                index: 0,
            }],
        };

        let first = factory.intern_method(&shape);
        let second = factory.intern_method(&shape.clone());
        assert_eq!(first, second);
        assert!(factory.keys_are_reliably_unique());

        // With the method interned, its parameter gets a real, stored key.
        let parameter = factory.intern_type(&TypeDescription::GenericMethodParameter {
            owner: MethodOwner::Interned(first),
            index: 0,
        });
        assert!(parameter.value() < SELF_REFERENTIAL_PARAMETER_BASE);
        assert!(factory.type_shape(parameter).is_some());
    }

    #[test]
    fn placeholder_keys_are_out_of_band() {
        let (host, factory) = factory();
        let module = corlib(&host, &factory);

        let scope = MethodScope::enter(&factory.methods_in_progress);
        assert!(!factory.keys_are_reliably_unique());

        let placeholder = factory.intern_type_inner(
            &TypeDescription::GenericMethodParameter {
                owner: MethodOwner::Current,
                index: 3,
            },
            true,
        );
        assert_eq!(placeholder.value(), SELF_REFERENTIAL_PARAMETER_BASE + 3);
        assert!(factory.type_shape(placeholder).is_none());

        drop(scope);
        assert!(factory.keys_are_reliably_unique());

        // Real keys stay far below the placeholder range.
        let real = factory.intern_type(&namespace_type(&host, module, "N", "T", 0));
        assert!(real.value() < SELF_REFERENTIAL_PARAMETER_BASE);
    }

    #[test]
    fn field_interning() {
        let (host, factory) = factory();
        let module = corlib(&host, &factory);

        let container = namespace_type(&host, module, "N", "C", 0);
        let int32 = namespace_type(&host, module, "System", "Int32", 0);

        let shape = FieldShape {
            container: container.clone(),
            name: host.get_name_for("_count"),
            field_type: int32.clone(),
        };
        assert_eq!(factory.intern_field(&shape), factory.intern_field(&shape.clone()));

        let other = FieldShape {
            container,
            name: host.get_name_for("_other"),
            field_type: int32,
        };
        assert_ne!(factory.intern_field(&shape), factory.intern_field(&other));
    }

    #[test]
    fn assemblies_and_modules() {
        let (host, factory) = factory();

        let identity = AssemblyIdentity {
            name: "Lib".into(),
            version: [1, 2, 3, 4],
            culture: String::new(),
            public_key_token: vec![],
        };
        let assembly = factory.intern_assembly(&identity);
        assert_eq!(factory.intern_assembly(&identity.clone()), assembly);

        let other_version = AssemblyIdentity {
            version: [1, 2, 3, 5],
            ..identity
        };
        assert_ne!(factory.intern_assembly(&other_version), assembly);

        let name = host.get_name_for("Lib.dll");
        assert_eq!(
            factory.intern_module(assembly, name),
            factory.intern_module(assembly, name)
        );
    }

    #[test]
    fn concurrent_interning_agrees() {
        let (host, factory) = factory();
        let module = corlib(&host, &factory);
        let factory = Arc::new(factory);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let factory = Arc::clone(&factory);
            let host = Arc::clone(&host);
            handles.push(std::thread::spawn(move || {
                (0..50)
                    .map(|i| {
                        factory.intern_type(&TypeDescription::Namespace {
                            module,
                            namespace: host.get_name_for("N"),
                            name: host.get_name_for(&format!("T{}", i % 10)),
                            generic_arity: 0,
                        })
                    })
                    .collect::<Vec<_>>()
            }));
        }

        let results: Vec<Vec<TypeKey>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for window in results.windows(2) {
            assert_eq!(window[0], window[1]);
        }
        assert_eq!(factory.type_count(), 10);
    }
}
