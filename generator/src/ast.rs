// AST node types for Go declaration sources.
//
// Covers the declaration-level subset of Go that test-double synthesis needs:
// package clause, imports, type declarations and function signatures.
// Declarations and identifiers carry a `SimpleSpan` for error reporting;
// type expressions are span-free so the synthesizer can reuse them verbatim
// in the generated tree.
//
// Preconditions: produced by the parser from a valid or partially-valid token stream.
// Postconditions: each spanned node's span covers the source range of the construct.
// Failure modes: none (data-only module).
// Side effects: none.

use chumsky::span::SimpleSpan;
use serde::Serialize;

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

// ── Root ──

/// A parsed Go source file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub package: Option<Ident>,
    pub imports: Vec<ImportSpec>,
    pub decls: Vec<Decl>,
    pub span: Span,
}

/// `import alias "path"`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpec {
    pub alias: Option<Ident>,
    pub path: String,
    pub span: Span,
}

impl ImportSpec {
    /// The name the import is referred to by inside the file: the alias if
    /// present, otherwise the package name assumed from the path.
    pub fn local_name(&self) -> &str {
        match &self.alias {
            Some(alias) => &alias.name,
            None => assumed_package_name(&self.path),
        }
    }
}

/// goimports' guess at a package name: the last path element, skipping a
/// trailing `/vN`, without a `go-` prefix and cut at the first character
/// that cannot appear in an identifier (`yaml.v3` → `yaml`).
pub fn assumed_package_name(path: &str) -> &str {
    let mut elems = path.rsplit('/');
    let mut base = elems.next().unwrap_or(path);
    let is_major_version =
        base.len() > 1 && base.starts_with('v') && base[1..].bytes().all(|b| b.is_ascii_digit());
    if is_major_version {
        if let Some(parent) = elems.next() {
            base = parent;
        }
    }
    let base = base.strip_prefix("go-").unwrap_or(base);
    let end = base
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(base.len());
    &base[..end]
}

// ── Declarations ──

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Type(TypeDecl),
    Func(FuncDecl),
    /// `var` / `const` declarations; contents are not retained.
    Other(Span),
}

/// `type Name T` or `type Name = T`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: Ident,
    pub alias: bool,
    pub ty: TypeExpr,
    pub span: Span,
}

/// `func (recv) Name(params) results { ... }`; the body is skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub receiver: Option<Receiver>,
    pub name: Ident,
    pub sig: FuncSig,
    pub span: Span,
}

/// Method receiver: `(r *T)`, `(T)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Receiver {
    pub name: Option<Ident>,
    pub type_name: Ident,
    pub pointer: bool,
}

// ── Type expressions ──

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// A Go type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeExpr {
    /// `Name` or `pkg.Name`.
    Named {
        package: Option<String>,
        name: String,
    },
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    Array {
        len: String,
        elem: Box<TypeExpr>,
    },
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    Chan {
        dir: ChanDir,
        elem: Box<TypeExpr>,
    },
    Func(FuncSig),
    Interface(InterfaceType),
    Struct(StructType),
    /// `...T`; only legal as the type of the final parameter group.
    Ellipsis(Box<TypeExpr>),
}

impl TypeExpr {
    /// An unqualified named type.
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named {
            package: None,
            name: name.into(),
        }
    }

    /// A package-qualified named type (`sync.RWMutex`).
    pub fn qualified(package: impl Into<String>, name: impl Into<String>) -> Self {
        TypeExpr::Named {
            package: Some(package.into()),
            name: name.into(),
        }
    }

    pub fn slice(elem: TypeExpr) -> Self {
        TypeExpr::Slice(Box::new(elem))
    }

    /// `interface{}`
    pub fn empty_interface() -> Self {
        TypeExpr::Interface(InterfaceType { elems: Vec::new() })
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self, TypeExpr::Ellipsis(_))
    }

    /// The type with every parameter and result name dropped. Go type
    /// identity ignores those names, so `func(p string)` and `func(string)`
    /// compare equal after this.
    pub fn identity(&self) -> TypeExpr {
        let boxed = |elem: &TypeExpr| Box::new(elem.identity());
        match self {
            TypeExpr::Named { .. } => self.clone(),
            TypeExpr::Pointer(elem) => TypeExpr::Pointer(boxed(elem)),
            TypeExpr::Slice(elem) => TypeExpr::Slice(boxed(elem)),
            TypeExpr::Ellipsis(elem) => TypeExpr::Ellipsis(boxed(elem)),
            TypeExpr::Array { len, elem } => TypeExpr::Array {
                len: len.clone(),
                elem: boxed(elem),
            },
            TypeExpr::Map { key, value } => TypeExpr::Map {
                key: boxed(key),
                value: boxed(value),
            },
            TypeExpr::Chan { dir, elem } => TypeExpr::Chan {
                dir: dir.clone(),
                elem: boxed(elem),
            },
            TypeExpr::Func(sig) => TypeExpr::Func(sig.identity()),
            TypeExpr::Interface(iface) => TypeExpr::Interface(InterfaceType {
                elems: iface
                    .elems
                    .iter()
                    .map(|elem| match elem {
                        InterfaceElem::Method(m) => InterfaceElem::Method(MethodSpec {
                            name: m.name.clone(),
                            sig: m.sig.identity(),
                        }),
                        InterfaceElem::Embed(e) => InterfaceElem::Embed(e.clone()),
                    })
                    .collect(),
            }),
            TypeExpr::Struct(st) => TypeExpr::Struct(StructType {
                fields: st
                    .fields
                    .iter()
                    .map(|f| FieldDecl {
                        names: f.names.clone(),
                        ty: f.ty.identity(),
                        tag: f.tag.clone(),
                    })
                    .collect(),
            }),
        }
    }

    /// Visit every package qualifier referenced by this type, in order.
    pub fn for_each_package(&self, f: &mut impl FnMut(&str)) {
        match self {
            TypeExpr::Named { package, .. } => {
                if let Some(pkg) = package {
                    f(pkg);
                }
            }
            TypeExpr::Pointer(elem)
            | TypeExpr::Slice(elem)
            | TypeExpr::Ellipsis(elem)
            | TypeExpr::Array { elem, .. }
            | TypeExpr::Chan { elem, .. } => elem.for_each_package(f),
            TypeExpr::Map { key, value } => {
                key.for_each_package(f);
                value.for_each_package(f);
            }
            TypeExpr::Func(sig) => sig.for_each_package(f),
            TypeExpr::Interface(iface) => {
                for elem in &iface.elems {
                    match elem {
                        InterfaceElem::Method(m) => m.sig.for_each_package(f),
                        InterfaceElem::Embed(e) => {
                            if let Some(pkg) = &e.package {
                                f(&pkg.name);
                            }
                        }
                    }
                }
            }
            TypeExpr::Struct(st) => {
                for field in &st.fields {
                    field.ty.for_each_package(f);
                }
            }
        }
    }
}

/// A function signature. Parameter groups keep Go's source grouping
/// (`a, b int` is one group with two names).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FuncSig {
    pub params: Vec<ParamGroup>,
    pub results: Vec<ParamGroup>,
}

impl FuncSig {
    /// One unnamed group per parameter and result.
    pub fn identity(&self) -> FuncSig {
        let unnamed = |groups: &[ParamGroup]| {
            groups
                .iter()
                .flat_map(|g| {
                    std::iter::repeat_with(|| ParamGroup {
                        names: Vec::new(),
                        ty: g.ty.identity(),
                    })
                    .take(g.arity())
                })
                .collect()
        };
        FuncSig {
            params: unnamed(&self.params),
            results: unnamed(&self.results),
        }
    }

    pub fn for_each_package(&self, f: &mut impl FnMut(&str)) {
        for group in self.params.iter().chain(&self.results) {
            group.ty.for_each_package(f);
        }
    }
}

/// One parameter group. Empty `names` means the group is a single unnamed
/// parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParamGroup {
    pub names: Vec<Ident>,
    pub ty: TypeExpr,
}

impl ParamGroup {
    /// Number of parameters this group declares.
    pub fn arity(&self) -> usize {
        self.names.len().max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InterfaceType {
    pub elems: Vec<InterfaceElem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceElem {
    Method(MethodSpec),
    Embed(EmbedRef),
}

/// `Name(params) results` inside an interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MethodSpec {
    pub name: Ident,
    pub sig: FuncSig,
}

/// An embedded interface reference: `Reader` or `io.Reader`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EmbedRef {
    pub package: Option<Ident>,
    pub name: Ident,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StructType {
    pub fields: Vec<FieldDecl>,
}

/// A struct field group: `a, b int "tag"` or an embedded `pkg.T`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FieldDecl {
    pub names: Vec<Ident>,
    pub ty: TypeExpr,
    pub tag: Option<String>,
}

impl FieldDecl {
    pub fn is_embedded(&self) -> bool {
        self.names.is_empty()
    }
}

// ── Identifier ──

/// An identifier with its source text and span.
///
/// Equality and hashing ignore the span: two type expressions that spell the
/// same names are the same type regardless of where they were written.
#[derive(Debug, Clone, Serialize)]
pub struct Ident {
    pub name: String,
    #[serde(skip)]
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Ident {
            name: name.into(),
            span,
        }
    }
}

impl PartialEq for Ident {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Ident {}

impl std::hash::Hash for Ident {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
