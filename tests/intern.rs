//! End-to-end interning scenarios through the public API.

use std::sync::Arc;

use pdbscope::prelude::*;

fn list_type(factory: &InternFactory, module: ModuleKey) -> TypeKey {
    factory.intern_type(&TypeDescription::Namespace {
        module,
        namespace: factory.host().get_name_for("System.Collections.Generic"),
        name: factory.host().get_name_for("List`1"),
        generic_arity: 1,
    })
}

fn corlib_module(factory: &InternFactory) -> ModuleKey {
    let assembly = factory.intern_assembly(&AssemblyIdentity {
        name: "mscorlib".to_string(),
        version: [4, 0, 0, 0],
        ..Default::default()
    });
    factory.intern_module(assembly, factory.host().get_name_for("mscorlib.dll"))
}

#[test]
fn structural_identity_across_independent_descriptions() {
    let host = HostContext::new();
    let factory = InternFactory::new(Arc::clone(&host));

    let module = corlib_module(&factory);
    let int32 = factory.intern_type(&TypeDescription::Namespace {
        module,
        namespace: host.get_name_for("System"),
        name: host.get_name_for("Int32"),
        generic_arity: 0,
    });

    // List<int> built twice from scratch lands on the same key.
    let list = list_type(&factory, module);
    let first = factory.intern_type(&TypeDescription::GenericInstance {
        definition: Box::new(TypeDescription::Interned(list)),
        arguments: vec![TypeDescription::Interned(int32)],
    });
    let second = factory.intern_type(&TypeDescription::GenericInstance {
        definition: Box::new(TypeDescription::Interned(list)),
        arguments: vec![TypeDescription::Interned(int32)],
    });
    assert_eq!(first, second);

    // And a vector of it too.
    let array_a = factory.intern_type(&TypeDescription::Vector {
        element: Box::new(TypeDescription::Interned(first)),
    });
    let array_b = factory.intern_type(&TypeDescription::Vector {
        element: Box::new(TypeDescription::Interned(second)),
    });
    assert_eq!(array_a, array_b);
}

#[test]
fn methods_and_fields_key_off_their_shape() {
    let host = HostContext::new();
    let factory = InternFactory::new(Arc::clone(&host));

    let module = corlib_module(&factory);
    let container = list_type(&factory, module);
    let void = factory.intern_type(&TypeDescription::Namespace {
        module,
        namespace: host.get_name_for("System"),
        name: host.get_name_for("Void"),
        generic_arity: 0,
    });
    let int32 = factory.intern_type(&TypeDescription::Namespace {
        module,
        namespace: host.get_name_for("System"),
        name: host.get_name_for("Int32"),
        generic_arity: 0,
    });

    let add = MethodShape {
        container: TypeDescription::Interned(container),
        name: host.get_name_for("Add"),
        generic_parameter_count: 0,
        calling_convention: 0x20,
        return_type: TypeDescription::Interned(void),
        parameters: vec![TypeDescription::GenericTypeParameter {
            defining_type: Box::new(TypeDescription::Interned(container)),
            index: 0,
        }],
    };
    assert_eq!(factory.intern_method(&add), factory.intern_method(&add));

    let size = FieldShape {
        container: TypeDescription::Interned(container),
        name: host.get_name_for("_size"),
        field_type: TypeDescription::Interned(int32),
    };
    assert_eq!(factory.intern_field(&size), factory.intern_field(&size));
    assert!(factory.keys_are_reliably_unique());
}

#[test]
fn interning_agrees_across_threads() {
    let host = HostContext::new();
    let factory = Arc::new(InternFactory::new(Arc::clone(&host)));
    let module = corlib_module(&factory);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let factory = Arc::clone(&factory);
        let host = Arc::clone(&host);
        handles.push(std::thread::spawn(move || {
            (0..50)
                .map(|i| {
                    factory.intern_type(&TypeDescription::Namespace {
                        module,
                        namespace: host.get_name_for("App"),
                        name: host.get_name_for(&format!("Type{}", i % 7)),
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
}

/// Simulates parsing a custom-attribute blob holding one enum value of an
/// unknown width: the parse "succeeds" only when the guessed width matches the
/// width the blob was actually written with.
#[test]
fn guessing_game_converges_on_the_real_width() {
    let host = HostContext::new();
    let factory = InternFactory::new(Arc::clone(&host));
    let module = corlib_module(&factory);
    let enum_reference = factory.intern_type(&TypeDescription::Namespace {
        module,
        namespace: host.get_name_for("App"),
        name: host.get_name_for("Flags"),
        generic_arity: 0,
    });

    let game = GuessingGame::new();
    let real_width = 2u32;

    let mut attempts = 0;
    game.start_guessing_game();
    loop {
        attempts += 1;
        if game.guess_underlying_type_size(enum_reference) == real_width {
            game.win_guessing_game();
            break;
        }
        assert!(game.try_next_permutation(), "cycle exhausted before success");
    }
    assert_eq!(attempts, 3); // 4, 1, then 2

    // A later blob referencing the same enum parses on the first try.
    game.start_guessing_game();
    assert_eq!(game.guess_underlying_type_size(enum_reference), real_width);
}
