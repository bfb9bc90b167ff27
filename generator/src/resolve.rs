// resolve.rs — Interface flattening
//
// Locates the requested interface (or record type), expands embedded
// interfaces depth first through the symbol table and normalizes every
// method into a canonical `MethodSignature`. Also produces the empty record
// skeleton the synthesizer builds on.
//
// Preconditions: `file` is a parsed source file with no syntax errors.
// Postconditions: method names in the result are unique; parameters carry
//                 collision-free display names; variadics only appear last.
// Failure modes: see `GenError` (E0101..E0106, E0200, E0201).
// Side effects: none.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::ast::*;
use crate::diag::GenError;
use crate::fake_ast::Field;
use crate::id::DeclId;
use crate::render::{serialize_type, serialize_types};
use crate::symbols::SymbolTable;

// ── Public types ────────────────────────────────────────────────────────────

/// How parameters of live methods and stubs are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamNaming {
    /// `arg1`, `arg2`, ... counted across the flattened parameter list.
    #[default]
    Positional,
    /// Source names where usable, falling back to positional names.
    Preserve,
}

/// Naming inputs that shape the resolved methods and the record skeleton.
#[derive(Debug, Clone, Default)]
pub struct Naming {
    pub params: ParamNaming,
    /// Defaults to `Fake<Name>`.
    pub record_name: Option<String>,
    /// Defaults to the lower-cased first character of the record name.
    pub receiver_name: Option<String>,
}

/// One parameter of a canonical method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub display_name: String,
    pub source_name: Option<String>,
    /// For a variadic parameter this is the element type.
    #[serde(serialize_with = "serialize_type")]
    pub ty: TypeExpr,
    pub variadic: bool,
}

impl Param {
    /// Type as written in a parameter list (`...T` for variadics).
    pub fn declared_type(&self) -> TypeExpr {
        if self.variadic {
            TypeExpr::Ellipsis(Box::new(self.ty.clone()))
        } else {
            self.ty.clone()
        }
    }

    /// Type of the per-call snapshot slot (`[]T` for variadics).
    pub fn captured_type(&self) -> TypeExpr {
        if self.variadic {
            TypeExpr::slice(self.ty.clone())
        } else {
            self.ty.clone()
        }
    }
}

/// Canonical, flattened representation of one interface method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodSignature {
    pub name: String,
    pub params: Vec<Param>,
    #[serde(serialize_with = "serialize_types")]
    pub results: Vec<TypeExpr>,
    #[serde(skip)]
    pub span: Span,
}

impl MethodSignature {
    pub fn is_variadic(&self) -> bool {
        self.params.last().is_some_and(|p| p.variadic)
    }

    /// The method's function type with all names dropped (stub field type).
    pub fn func_type(&self) -> TypeExpr {
        let unnamed = |ty: TypeExpr| ParamGroup {
            names: Vec::new(),
            ty,
        };
        TypeExpr::Func(FuncSig {
            params: self.params.iter().map(|p| unnamed(p.declared_type())).collect(),
            results: self.results.iter().cloned().map(unnamed).collect(),
        })
    }

    /// Parameter and result types with names dropped; two methods with the
    /// same shape are the same method for duplicate detection.
    fn shape(&self) -> (Vec<(TypeExpr, bool)>, Vec<TypeExpr>) {
        (
            self.params.iter().map(|p| (p.ty.identity(), p.variadic)).collect(),
            self.results.iter().map(TypeExpr::identity).collect(),
        )
    }
}

/// An interface after embedding resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceDecl {
    pub name: String,
    pub methods: Vec<MethodSignature>,
}

/// The record type the synthesizer fills in.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSkeleton {
    pub name: String,
    pub receiver: String,
    /// Empty for a fresh record; the struct's own fields in record mode.
    pub fields: Vec<Field>,
}

/// Resolver output, handed to the synthesizer by value.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub interface: InterfaceDecl,
    pub skeleton: RecordSkeleton,
}

// ── Entry points ────────────────────────────────────────────────────────────

/// Resolve `interface_name` in `file` into its flattened method set.
pub fn resolve(file: &SourceFile, interface_name: &str, naming: &Naming) -> Result<Resolution, GenError> {
    let symbols = SymbolTable::build(file)?;
    let Some(id) = symbols.lookup(interface_name) else {
        return Err(GenError::InterfaceNotFound {
            name: interface_name.to_string(),
            available: symbols.interface_names(),
        });
    };

    let mut flattener = Flattener {
        symbols: &symbols,
        stack: Vec::new(),
        methods: Vec::new(),
        seen: HashMap::new(),
    };
    let decl = symbols.decl(id);
    flattener.enter(id, decl.name.span)?;

    let skeleton = skeleton(interface_name, Vec::new(), naming);
    let methods = flattener
        .methods
        .into_iter()
        .map(|m| name_params(m, naming.params, &skeleton.receiver))
        .collect();

    tracing::debug!(
        interface = interface_name,
        record = %skeleton.name,
        "interface resolved"
    );
    Ok(Resolution {
        interface: InterfaceDecl {
            name: interface_name.to_string(),
            methods,
        },
        skeleton,
    })
}

/// Build the method set from the pointer-receiver methods of struct
/// `record_name`. The skeleton starts with the struct's existing fields.
pub fn resolve_record(file: &SourceFile, record_name: &str, naming: &Naming) -> Result<Resolution, GenError> {
    let symbols = SymbolTable::build(file)?;
    let Some(id) = symbols.lookup(record_name) else {
        return Err(GenError::RecordTypeNotFound {
            name: record_name.to_string(),
        });
    };
    let decl = symbols.decl(id);
    let TypeExpr::Struct(st) = &decl.ty else {
        return Err(GenError::NotARecordType {
            name: record_name.to_string(),
            kind: describe(&decl.ty),
            span: decl.name.span,
        });
    };

    let fields = st
        .fields
        .iter()
        .flat_map(|f| {
            if f.is_embedded() {
                vec![Field {
                    name: None,
                    ty: f.ty.clone(),
                    tag: f.tag.clone(),
                }]
            } else {
                f.names
                    .iter()
                    .map(|n| Field {
                        name: Some(n.name.clone()),
                        ty: f.ty.clone(),
                        tag: f.tag.clone(),
                    })
                    .collect()
            }
        })
        .collect();

    let mut collected: Vec<MethodSignature> = Vec::new();
    for func in symbols.methods_of(id) {
        let receiver_pointer = func.receiver.as_ref().is_some_and(|r| r.pointer);
        if !receiver_pointer {
            tracing::trace!(method = %func.name.name, "skipping value-receiver method");
            continue;
        }
        if let Some(prev) = collected.iter().find(|m| m.name == func.name.name) {
            return Err(GenError::DuplicateMethodName {
                interface: record_name.to_string(),
                method: func.name.name.clone(),
                first: prev.span,
                second: func.name.span,
            });
        }
        collected.push(normalize(&func.name, &func.sig));
    }

    let skeleton = skeleton(record_name, fields, naming);
    let methods = collected
        .into_iter()
        .map(|m| name_params(m, naming.params, &skeleton.receiver))
        .collect();

    tracing::debug!(record = record_name, "record resolved");
    Ok(Resolution {
        interface: InterfaceDecl {
            name: record_name.to_string(),
            methods,
        },
        skeleton,
    })
}

/// Default record name for a source type.
pub fn default_record_name(source_name: &str) -> String {
    format!("Fake{source_name}")
}

/// Default receiver name: the record name's first character, lower-cased.
pub fn default_receiver_name(record_name: &str) -> String {
    record_name
        .chars()
        .next()
        .map(|c| c.to_lowercase().collect())
        .unwrap_or_else(|| "f".to_string())
}

fn skeleton(source_name: &str, fields: Vec<Field>, naming: &Naming) -> RecordSkeleton {
    let name = naming
        .record_name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default_record_name(source_name));
    let receiver = naming
        .receiver_name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default_receiver_name(&name));
    RecordSkeleton {
        name,
        receiver,
        fields,
    }
}

// ── Flattening ──────────────────────────────────────────────────────────────

struct Flattener<'s, 'a> {
    symbols: &'s SymbolTable<'a>,
    /// Declarations on the current embedding path.
    stack: Vec<DeclId>,
    methods: Vec<MethodSignature>,
    /// Method name → index in `methods`.
    seen: HashMap<String, usize>,
}

impl<'s, 'a> Flattener<'s, 'a> {
    /// Expand declaration `id`, reached from a reference at `at`.
    fn enter(&mut self, id: DeclId, at: Span) -> Result<(), GenError> {
        if let Some(pos) = self.stack.iter().position(|&d| d == id) {
            let mut path: Vec<String> = self.stack[pos..]
                .iter()
                .map(|&d| self.symbols.decl(d).name.name.clone())
                .collect();
            path.push(self.symbols.decl(id).name.name.clone());
            return Err(GenError::CyclicEmbedding { path, span: at });
        }

        let decl = self.symbols.decl(id);
        self.stack.push(id);
        match &decl.ty {
            TypeExpr::Interface(iface) => self.flatten(iface, &decl.name.name)?,
            TypeExpr::Named {
                package: None,
                name: target,
            } => match self.symbols.lookup(target) {
                Some(target_id) => self.enter(target_id, decl.name.span)?,
                None if target == "error" => self.push_error_method(decl.name.span)?,
                None => {
                    return Err(GenError::NotAnInterface {
                        name: decl.name.name.clone(),
                        kind: describe(&decl.ty),
                        span: decl.name.span,
                    })
                }
            },
            other => {
                return Err(GenError::NotAnInterface {
                    name: decl.name.name.clone(),
                    kind: describe(other),
                    span: decl.name.span,
                })
            }
        }
        self.stack.pop();
        Ok(())
    }

    fn flatten(&mut self, iface: &InterfaceType, owner: &str) -> Result<(), GenError> {
        for elem in &iface.elems {
            match elem {
                InterfaceElem::Method(spec) => {
                    let method = normalize(&spec.name, &spec.sig);
                    self.push(owner, method)?;
                }
                InterfaceElem::Embed(embed) => {
                    if let Some(pkg) = &embed.package {
                        return Err(GenError::UnresolvableEmbedding {
                            interface: owner.to_string(),
                            embed: format!("{}.{}", pkg.name, embed.name.name),
                            span: pkg.span,
                        });
                    }
                    match self.symbols.lookup(&embed.name.name) {
                        Some(id) => self.enter(id, embed.name.span)?,
                        None if embed.name.name == "error" => self.push_error_method(embed.name.span)?,
                        None => {
                            return Err(GenError::UnresolvableEmbedding {
                                interface: owner.to_string(),
                                embed: embed.name.name.clone(),
                                span: embed.name.span,
                            })
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// The predeclared `error` interface: `Error() string`.
    fn push_error_method(&mut self, at: Span) -> Result<(), GenError> {
        self.push(
            "error",
            MethodSignature {
                name: "Error".to_string(),
                params: Vec::new(),
                results: vec![TypeExpr::named("string")],
                span: at,
            },
        )
    }

    fn push(&mut self, owner: &str, method: MethodSignature) -> Result<(), GenError> {
        if let Some(&idx) = self.seen.get(&method.name) {
            let first = &self.methods[idx];
            if first.shape() == method.shape() {
                tracing::trace!(method = %method.name, "identical method reached twice, keeping first");
                return Ok(());
            }
            return Err(GenError::DuplicateMethodName {
                interface: owner.to_string(),
                method: method.name,
                first: first.span,
                second: method.span,
            });
        }
        self.seen.insert(method.name.clone(), self.methods.len());
        self.methods.push(method);
        Ok(())
    }
}

/// Short description of a non-interface type for error messages.
fn describe(ty: &TypeExpr) -> &'static str {
    match ty {
        TypeExpr::Named { .. } => "a named type",
        TypeExpr::Pointer(_) => "a pointer type",
        TypeExpr::Slice(_) | TypeExpr::Array { .. } => "a sequence type",
        TypeExpr::Map { .. } => "a map type",
        TypeExpr::Chan { .. } => "a channel type",
        TypeExpr::Func(_) => "a function type",
        TypeExpr::Interface(_) => "an interface type",
        TypeExpr::Struct(_) => "a struct type",
        TypeExpr::Ellipsis(_) => "a variadic type",
    }
}

// ── Normalization ───────────────────────────────────────────────────────────

/// Flatten parameter and result groups. Display names are assigned later.
fn normalize(name: &Ident, sig: &FuncSig) -> MethodSignature {
    let mut params = Vec::new();
    for group in &sig.params {
        let (ty, variadic) = match &group.ty {
            TypeExpr::Ellipsis(elem) => ((**elem).clone(), true),
            other => (other.clone(), false),
        };
        if group.names.is_empty() {
            params.push(Param {
                display_name: String::new(),
                source_name: None,
                ty,
                variadic,
            });
        } else {
            for n in &group.names {
                params.push(Param {
                    display_name: String::new(),
                    source_name: Some(n.name.clone()),
                    ty: ty.clone(),
                    variadic,
                });
            }
        }
    }

    let results = sig
        .results
        .iter()
        .flat_map(|g| std::iter::repeat(g.ty.clone()).take(g.arity()))
        .collect();

    MethodSignature {
        name: name.name.clone(),
        params,
        results,
        span: name.span,
    }
}

/// Identifiers a live method body refers to besides its parameters.
const BODY_IDENTS: &[&str] = &["append", "nil"];

fn name_params(mut method: MethodSignature, naming: ParamNaming, receiver: &str) -> MethodSignature {
    let positional = |i: usize| format!("arg{}", i + 1);

    // Names the body spells out (types in the captured-args literal) must
    // not be shadowed.
    let mut type_idents = Vec::new();
    for p in &method.params {
        collect_type_idents(&p.ty, &mut type_idents);
    }

    if naming == ParamNaming::Preserve {
        let names: Vec<String> = method
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| match p.source_name.as_deref() {
                Some(n) if n != "_" => n.to_string(),
                _ => positional(i),
            })
            .collect();

        let mut used: HashSet<&str> = BODY_IDENTS.iter().copied().collect();
        used.insert(receiver);
        used.extend(type_idents.iter().map(String::as_str));
        let clash = names.iter().any(|n| !used.insert(n.as_str()));
        if !clash {
            for (p, n) in method.params.iter_mut().zip(names) {
                p.display_name = n;
            }
            return method;
        }
        tracing::trace!(method = %method.name, "preserved names collide, using positional names");
    }

    // A receiver or type spelled `argN` pushes that parameter to `argN_`.
    let taken: HashSet<&str> = type_idents
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(receiver))
        .collect();
    for (i, p) in method.params.iter_mut().enumerate() {
        let mut name = positional(i);
        while taken.contains(name.as_str()) {
            name.push('_');
        }
        p.display_name = name;
    }
    method
}

/// Every package qualifier and unqualified type name `ty` mentions.
fn collect_type_idents(ty: &TypeExpr, out: &mut Vec<String>) {
    let sig_idents = |sig: &FuncSig, out: &mut Vec<String>| {
        for g in sig.params.iter().chain(&sig.results) {
            collect_type_idents(&g.ty, out);
        }
    };
    match ty {
        TypeExpr::Named { package, name } => match package {
            Some(pkg) => out.push(pkg.clone()),
            None => out.push(name.clone()),
        },
        TypeExpr::Pointer(elem)
        | TypeExpr::Slice(elem)
        | TypeExpr::Ellipsis(elem)
        | TypeExpr::Array { elem, .. }
        | TypeExpr::Chan { elem, .. } => collect_type_idents(elem, out),
        TypeExpr::Map { key, value } => {
            collect_type_idents(key, out);
            collect_type_idents(value, out);
        }
        TypeExpr::Func(sig) => sig_idents(sig, out),
        TypeExpr::Interface(iface) => {
            for elem in &iface.elems {
                match elem {
                    InterfaceElem::Method(m) => sig_idents(&m.sig, out),
                    InterfaceElem::Embed(e) => out.push(match &e.package {
                        Some(pkg) => pkg.name.clone(),
                        None => e.name.name.clone(),
                    }),
                }
            }
        }
        TypeExpr::Struct(st) => {
            for f in &st.fields {
                collect_type_idents(&f.ty, out);
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
