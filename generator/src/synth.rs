// synth.rs — Test-double synthesis
//
// Expands a resolved method set into a record type and its methods:
//
//   per method M (in flattened order), appended to the record:
//     MStub           func(<param types>) <results>
//     mMutex          sync.RWMutex
//     mArgsForCall    []struct{ arg1 T1; ... }     (only if M has params)
//     mReturns        struct{ result1 R1; ... }    (only if M has results)
//   then:
//     invocations      map[string][][]interface{}
//     invocationsMutex sync.RWMutex
//
// Methods: one live method per M, then `Invocations`, then
// `recordInvocation`. Lock order inside a live method is mMutex (released)
// then invocationsMutex; no path holds both.
//
// Preconditions: `resolution` comes from `resolve` or `resolve_record`.
// Postconditions: field and method order as above; skeleton fields first.
// Failure modes: none.
// Side effects: none.

use std::collections::BTreeSet;

use crate::ast::{FieldDecl, Ident, ImportSpec, StructType, TypeExpr};
use crate::fake_ast::*;
use crate::resolve::{MethodSignature, Resolution};

/// Package-level settings for the generated unit.
#[derive(Debug, Clone)]
pub struct SynthOptions {
    pub package: String,
    /// Imports of the source file; those whose names the output uses are
    /// carried over.
    pub source_imports: Vec<ImportSpec>,
}

// ── Naming ──────────────────────────────────────────────────────────────────

/// Lower-case the first code point, leave the rest unchanged.
pub fn privatize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => {
            let lower = first.to_lowercase().next().unwrap_or(first);
            std::iter::once(lower).chain(chars).collect()
        }
        None => String::new(),
    }
}

pub fn stub_field(method: &str) -> String {
    format!("{method}Stub")
}

pub fn mutex_field(method: &str) -> String {
    format!("{}Mutex", privatize(method))
}

pub fn args_field(method: &str) -> String {
    format!("{}ArgsForCall", privatize(method))
}

pub fn returns_field(method: &str) -> String {
    format!("{}Returns", privatize(method))
}

pub const INVOCATIONS_FIELD: &str = "invocations";
pub const INVOCATIONS_MUTEX_FIELD: &str = "invocationsMutex";
pub const INVOCATIONS_METHOD: &str = "Invocations";
pub const RECORD_INVOCATION_METHOD: &str = "recordInvocation";

// ── Types used by the generated code ────────────────────────────────────────

fn rw_mutex() -> TypeExpr {
    TypeExpr::qualified("sync", "RWMutex")
}

/// `[]interface{}`
fn snapshot_type() -> TypeExpr {
    TypeExpr::slice(TypeExpr::empty_interface())
}

/// `map[string][][]interface{}`
fn invocations_type() -> TypeExpr {
    TypeExpr::Map {
        key: Box::new(TypeExpr::named("string")),
        value: Box::new(TypeExpr::slice(snapshot_type())),
    }
}

fn struct_of(fields: impl IntoIterator<Item = (String, TypeExpr)>) -> TypeExpr {
    TypeExpr::Struct(StructType {
        fields: fields
            .into_iter()
            .map(|(name, ty)| FieldDecl {
                names: vec![Ident::new(name, (0..0).into())],
                ty,
                tag: None,
            })
            .collect(),
    })
}

/// `struct{ arg1 T1; ... }`, one slot per parameter.
fn args_record(method: &MethodSignature) -> TypeExpr {
    struct_of(
        method
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| (format!("arg{}", i + 1), p.captured_type())),
    )
}

/// `struct{ result1 R1; ... }`, one slot per result.
fn returns_record(method: &MethodSignature) -> TypeExpr {
    struct_of(
        method
            .results
            .iter()
            .enumerate()
            .map(|(i, r)| (format!("result{}", i + 1), r.clone())),
    )
}

// ── Entry point ─────────────────────────────────────────────────────────────

/// Build the double for `resolution`. Consumes the resolver output; the
/// skeleton's fields come first, synthesized fields are appended.
pub fn synthesize(resolution: Resolution, options: &SynthOptions) -> FakeFile {
    let Resolution {
        interface,
        skeleton,
    } = resolution;
    let recv = skeleton.receiver.clone();
    let mut fields = skeleton.fields;
    let mut methods = Vec::with_capacity(interface.methods.len() + 2);

    for m in &interface.methods {
        fields.push(Field::named(stub_field(&m.name), m.func_type()));
        fields.push(Field::named(mutex_field(&m.name), rw_mutex()));
        if !m.params.is_empty() {
            fields.push(Field::named(
                args_field(&m.name),
                TypeExpr::slice(args_record(m)),
            ));
        }
        if !m.results.is_empty() {
            fields.push(Field::named(returns_field(&m.name), returns_record(m)));
        }
        methods.push(live_method(m, &recv, &skeleton.name));
    }
    fields.push(Field::named(INVOCATIONS_FIELD, invocations_type()));
    fields.push(Field::named(INVOCATIONS_MUTEX_FIELD, rw_mutex()));

    methods.push(invocations_method(&interface.methods, &recv, &skeleton.name));
    methods.push(record_invocation_method(&recv, &skeleton.name));

    let record = RecordDecl {
        name: skeleton.name,
        fields,
    };
    let imports = required_imports(&record, &methods, &options.source_imports);

    tracing::debug!(
        record = %record.name,
        fields = record.fields.len(),
        methods = methods.len(),
        "double synthesized"
    );

    FakeFile {
        package: options.package.clone(),
        imports,
        record,
        methods,
    }
}

// ── Method bodies ───────────────────────────────────────────────────────────

fn field(recv: &str, name: impl Into<String>) -> Expr {
    Expr::ident(recv).select(name)
}

fn live_method(m: &MethodSignature, recv: &str, record: &str) -> MethodDecl {
    let mutex = field(recv, mutex_field(&m.name));
    let arg_exprs: Vec<Expr> = m.params.iter().map(|p| Expr::ident(&p.display_name)).collect();

    // Steps 1-3 run inside a function literal so the deferred unlock fires
    // before the shared log is touched.
    let mut guarded = vec![
        Stmt::Expr(mutex.clone().select("Lock").call(vec![])),
        Stmt::Defer(mutex.select("Unlock").call(vec![])),
    ];
    if !m.params.is_empty() {
        let log = field(recv, args_field(&m.name));
        guarded.push(Stmt::Assign {
            target: log.clone(),
            value: Expr::ident("append").call(vec![
                log,
                Expr::Composite {
                    ty: args_record(m),
                    elems: arg_exprs.clone(),
                },
            ]),
        });
    }

    let mut body = vec![
        Stmt::Expr(Expr::FuncLit { body: guarded }.call(vec![])),
        Stmt::Expr(field(recv, RECORD_INVOCATION_METHOD).call(vec![
            Expr::StringLit(m.name.clone()),
            Expr::Composite {
                ty: snapshot_type(),
                elems: arg_exprs.clone(),
            },
        ])),
    ];

    let stub = field(recv, stub_field(&m.name));
    let stub_call = stub.clone().call_spread(arg_exprs, m.is_variadic());
    let stub_nonnil = Expr::binary(BinOp::Ne, stub, Expr::Nil);

    if m.results.is_empty() {
        body.push(Stmt::If {
            cond: stub_nonnil,
            then: vec![Stmt::Expr(stub_call)],
        });
    } else {
        body.push(Stmt::If {
            cond: stub_nonnil,
            then: vec![Stmt::Return(vec![stub_call])],
        });
        let returns = field(recv, returns_field(&m.name));
        body.push(Stmt::Return(
            (1..=m.results.len())
                .map(|i| returns.clone().select(format!("result{i}")))
                .collect(),
        ));
    }

    MethodDecl {
        receiver: recv.to_string(),
        record: record.to_string(),
        name: m.name.clone(),
        params: m
            .params
            .iter()
            .map(|p| Param {
                name: p.display_name.clone(),
                ty: p.declared_type(),
            })
            .collect(),
        results: m.results.clone(),
        body,
    }
}

fn invocations_method(methods: &[MethodSignature], recv: &str, record: &str) -> MethodDecl {
    let mut body = Vec::with_capacity(methods.len() * 2 + 3);
    for name in std::iter::once(INVOCATIONS_MUTEX_FIELD.to_string()).chain(methods.iter().map(|m| mutex_field(&m.name))) {
        let mutex = field(recv, name);
        body.push(Stmt::Expr(mutex.clone().select("RLock").call(vec![])));
        body.push(Stmt::Defer(mutex.select("RUnlock").call(vec![])));
    }
    body.push(Stmt::Return(vec![field(recv, INVOCATIONS_FIELD)]));

    MethodDecl {
        receiver: recv.to_string(),
        record: record.to_string(),
        name: INVOCATIONS_METHOD.to_string(),
        params: Vec::new(),
        results: vec![invocations_type()],
        body,
    }
}

fn record_invocation_method(recv: &str, record: &str) -> MethodDecl {
    let mutex = field(recv, INVOCATIONS_MUTEX_FIELD);
    let log = field(recv, INVOCATIONS_FIELD);
    let entry = log.clone().index(Expr::ident("key"));

    let body = vec![
        Stmt::Expr(mutex.clone().select("Lock").call(vec![])),
        Stmt::Defer(mutex.select("Unlock").call(vec![])),
        Stmt::If {
            cond: Expr::binary(BinOp::Eq, log.clone(), Expr::Nil),
            then: vec![Stmt::Assign {
                target: log,
                value: Expr::Composite {
                    ty: invocations_type(),
                    elems: Vec::new(),
                },
            }],
        },
        Stmt::If {
            cond: Expr::binary(BinOp::Eq, entry.clone(), Expr::Nil),
            then: vec![Stmt::Assign {
                target: entry.clone(),
                value: Expr::Composite {
                    ty: TypeExpr::slice(snapshot_type()),
                    elems: Vec::new(),
                },
            }],
        },
        Stmt::Assign {
            target: entry.clone(),
            value: Expr::ident("append").call(vec![entry, Expr::ident("args")]),
        },
    ];

    MethodDecl {
        receiver: recv.to_string(),
        record: record.to_string(),
        name: RECORD_INVOCATION_METHOD.to_string(),
        params: vec![
            Param {
                name: "key".to_string(),
                ty: TypeExpr::named("string"),
            },
            Param {
                name: "args".to_string(),
                ty: snapshot_type(),
            },
        ],
        results: Vec::new(),
        body,
    }
}

// ── Imports ─────────────────────────────────────────────────────────────────

/// `sync` plus every source import whose local name qualifies a type in the
/// output.
fn required_imports(record: &RecordDecl, methods: &[MethodDecl], source_imports: &[ImportSpec]) -> Vec<ImportSpec> {
    let mut used: BTreeSet<String> = BTreeSet::new();
    let mut note = |pkg: &str| {
        used.insert(pkg.to_string());
    };
    for f in &record.fields {
        f.ty.for_each_package(&mut note);
    }
    for m in methods {
        for p in &m.params {
            p.ty.for_each_package(&mut note);
        }
        for r in &m.results {
            r.for_each_package(&mut note);
        }
    }

    let mut imports: Vec<ImportSpec> = Vec::new();
    let mut unmatched: Vec<&ImportSpec> = Vec::new();
    for spec in source_imports {
        let name = spec.local_name();
        if used.remove(name) {
            imports.push(spec.clone());
        } else if name != "_" && name != "." {
            unmatched.push(spec);
        }
    }
    // `sync` is always used by the mutex fields.
    let needs_sync = used.remove("sync");
    // The assumed name can be wrong; an unaliased import whose path spells
    // a leftover qualifier is kept as written.
    for spec in unmatched {
        let spelled = match spec.alias {
            Some(_) => None,
            None => spec
                .path
                .split('/')
                .find_map(|elem| used.iter().find(|q| elem.contains(q.as_str())).cloned()),
        };
        match spelled {
            Some(qualifier) => {
                used.remove(&qualifier);
                imports.push(spec.clone());
            }
            None => tracing::trace!(import = %spec.path, "import not used by the double"),
        }
    }
    if needs_sync {
        imports.push(ImportSpec {
            alias: None,
            path: "sync".to_string(),
            span: (0..0).into(),
        });
    }
    for missing in used {
        tracing::warn!(package = %missing, "type qualifier has no matching import");
    }
    imports
}

// ── Tests ───────────────────────────────────────────────────────────────────
