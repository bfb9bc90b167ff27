// fake_ast.rs — Declaration tree of a synthesized double
//
// The synthesizer builds this tree; the renderer prints it and the evaluator
// executes it. It models only the Go constructs a double needs: one struct,
// its pointer-receiver methods, and a small statement/expression language.
// Types reuse `ast::TypeExpr` unchanged.

use crate::ast::{ImportSpec, TypeExpr};

/// A complete generated source unit.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeFile {
    pub package: String,
    pub imports: Vec<ImportSpec>,
    pub record: RecordDecl,
    pub methods: Vec<MethodDecl>,
}

impl FakeFile {
    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordDecl {
    pub name: String,
    pub fields: Vec<Field>,
}

impl RecordDecl {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name.as_deref() == Some(name))
    }
}

/// A struct field. `name` is `None` for an embedded field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Option<String>,
    pub ty: TypeExpr,
    pub tag: Option<String>,
}

impl Field {
    pub fn named(name: impl Into<String>, ty: TypeExpr) -> Self {
        Field {
            name: Some(name.into()),
            ty,
            tag: None,
        }
    }
}

/// `func (receiver *record) name(params) results { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub receiver: String,
    pub record: String,
    pub name: String,
    pub params: Vec<Param>,
    pub results: Vec<TypeExpr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Defer(Expr),
    Assign { target: Expr, value: Expr },
    If { cond: Expr, then: Vec<Stmt> },
    Return(Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(String),
    /// `x.name`
    Selector(Box<Expr>, String),
    /// `x[index]`
    Index(Box<Expr>, Box<Expr>),
    /// `func(args)`, or `func(args...)` when `spread` is set.
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        spread: bool,
    },
    /// `func() { body }` with no parameters or results.
    FuncLit { body: Vec<Stmt> },
    /// `T{elems}`; keyed elements are not needed.
    Composite { ty: TypeExpr, elems: Vec<Expr> },
    StringLit(String),
    Nil,
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

// Constructors keep the synthesizer readable.
impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn select(self, name: impl Into<String>) -> Self {
        Expr::Selector(Box::new(self), name.into())
    }

    pub fn index(self, index: Expr) -> Self {
        Expr::Index(Box::new(self), Box::new(index))
    }

    pub fn call(self, args: Vec<Expr>) -> Self {
        Expr::Call {
            func: Box::new(self),
            args,
            spread: false,
        }
    }

    pub fn call_spread(self, args: Vec<Expr>, spread: bool) -> Self {
        Expr::Call {
            func: Box::new(self),
            args,
            spread,
        }
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}
