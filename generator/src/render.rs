// render.rs — Go source rendering for synthesized doubles
//
// Prints a `FakeFile` as gofmt-style Go: tab indentation, struct fields
// aligned in columns, multi-line struct types inside field lists and
// composite literals, imports sorted by path.
//
// Preconditions: `file` was produced by `synth::synthesize`.
// Postconditions: output is deterministic for a given tree and options.
// Failure modes: none.
// Side effects: none.

use std::fmt::Write as _;

use serde::Serializer;

use crate::ast::{ChanDir, FieldDecl, FuncSig, ImportSpec, InterfaceElem, ParamGroup, TypeExpr};
use crate::fake_ast::*;

pub const HEADER: &str = "// Code generated by fakegen. DO NOT EDIT.";

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Hex SHA-256 of the source text, written as a `// source:` line.
    pub source_hash: Option<String>,
}

// ── Public entry point ──────────────────────────────────────────────────────

pub fn render(file: &FakeFile, options: &RenderOptions) -> String {
    let mut r = Renderer { out: String::new() };
    r.emit_file(file, options);
    r.out
}

/// Single-line Go spelling of a type.
pub fn type_string(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Named { package, name } => match package {
            Some(pkg) => format!("{pkg}.{name}"),
            None => name.clone(),
        },
        TypeExpr::Pointer(elem) => format!("*{}", type_string(elem)),
        TypeExpr::Slice(elem) => format!("[]{}", type_string(elem)),
        TypeExpr::Array { len, elem } => format!("[{len}]{}", type_string(elem)),
        TypeExpr::Map { key, value } => format!("map[{}]{}", type_string(key), type_string(value)),
        TypeExpr::Chan { dir, elem } => {
            let elem_text = type_string(elem);
            match dir {
                // `chan (<-chan T)` needs parentheses to stay a bidirectional chan.
                ChanDir::Both if matches!(**elem, TypeExpr::Chan { dir: ChanDir::Recv, .. }) => {
                    format!("chan ({elem_text})")
                }
                ChanDir::Both => format!("chan {elem_text}"),
                ChanDir::Send => format!("chan<- {elem_text}"),
                ChanDir::Recv => format!("<-chan {elem_text}"),
            }
        }
        TypeExpr::Func(sig) => format!("func{}", signature_string(sig)),
        TypeExpr::Interface(iface) => {
            if iface.elems.is_empty() {
                return "interface{}".to_string();
            }
            let elems: Vec<String> = iface
                .elems
                .iter()
                .map(|e| match e {
                    InterfaceElem::Method(m) => format!("{}{}", m.name.name, signature_string(&m.sig)),
                    InterfaceElem::Embed(e) => match &e.package {
                        Some(pkg) => format!("{}.{}", pkg.name, e.name.name),
                        None => e.name.name.clone(),
                    },
                })
                .collect();
            format!("interface{{ {} }}", elems.join("; "))
        }
        TypeExpr::Struct(st) => {
            if st.fields.is_empty() {
                return "struct{}".to_string();
            }
            let fields: Vec<String> = st
                .fields
                .iter()
                .map(|f| {
                    let mut text = field_head(f);
                    if let Some(tag) = &f.tag {
                        text.push(' ');
                        text.push_str(&tag_literal(tag));
                    }
                    text
                })
                .collect();
            format!("struct{{ {} }}", fields.join("; "))
        }
        TypeExpr::Ellipsis(elem) => format!("...{}", type_string(elem)),
    }
}

/// `(params) results` of a function type or declaration.
pub fn signature_string(sig: &FuncSig) -> String {
    let params: Vec<String> = sig.params.iter().map(group_string).collect();
    let mut text = format!("({})", params.join(", "));
    let unnamed_single = sig.results.len() == 1 && sig.results[0].names.is_empty();
    if unnamed_single {
        text.push(' ');
        text.push_str(&type_string(&sig.results[0].ty));
    } else if !sig.results.is_empty() {
        let results: Vec<String> = sig.results.iter().map(group_string).collect();
        let _ = write!(text, " ({})", results.join(", "));
    }
    text
}

fn group_string(group: &ParamGroup) -> String {
    if group.names.is_empty() {
        type_string(&group.ty)
    } else {
        let names: Vec<&str> = group.names.iter().map(|n| n.name.as_str()).collect();
        format!("{} {}", names.join(", "), type_string(&group.ty))
    }
}

fn field_head(f: &FieldDecl) -> String {
    if f.is_embedded() {
        type_string(&f.ty)
    } else {
        let names: Vec<&str> = f.names.iter().map(|n| n.name.as_str()).collect();
        format!("{} {}", names.join(", "), type_string(&f.ty))
    }
}

/// Raw form unless the value holds a backquote or a character a raw
/// string cannot carry.
fn tag_literal(tag: &str) -> String {
    if tag.contains(|c: char| c == '`' || c.is_control()) {
        string_literal(tag)
    } else {
        format!("`{tag}`")
    }
}

fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn serialize_type<S: Serializer>(ty: &TypeExpr, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&type_string(ty))
}

pub fn serialize_types<S: Serializer>(tys: &[TypeExpr], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(tys.iter().map(type_string))
}

// ── Block-level type layout ─────────────────────────────────────────────────

/// One row of a field list before alignment.
struct FieldRow {
    /// Empty for embedded fields.
    name: String,
    ty: String,
    tag: Option<String>,
}

/// Type text for a field or composite literal at `indent`. Non-empty struct
/// types (also under `[]`, `[N]`, `*` and map values) break onto lines.
fn block_type(ty: &TypeExpr, indent: usize) -> String {
    match ty {
        TypeExpr::Struct(st) if !st.fields.is_empty() => {
            let rows: Vec<FieldRow> = st
                .fields
                .iter()
                .map(|f| FieldRow {
                    name: f.names.iter().map(|n| n.name.as_str()).collect::<Vec<_>>().join(", "),
                    ty: block_type(&f.ty, indent + 1),
                    tag: f.tag.clone(),
                })
                .collect();
            let mut text = String::from("struct {\n");
            write_rows(&mut text, &rows, indent + 1);
            text.push_str(&tabs(indent));
            text.push('}');
            text
        }
        TypeExpr::Slice(elem) => format!("[]{}", block_type(elem, indent)),
        TypeExpr::Array { len, elem } => format!("[{len}]{}", block_type(elem, indent)),
        TypeExpr::Pointer(elem) => format!("*{}", block_type(elem, indent)),
        TypeExpr::Map { key, value } => {
            format!("map[{}]{}", type_string(key), block_type(value, indent))
        }
        other => type_string(other),
    }
}

fn tabs(n: usize) -> String {
    "\t".repeat(n)
}

/// Write field rows with gofmt column alignment. A section of aligned rows
/// ends after a multi-line row or at an embedded field.
fn write_rows(out: &mut String, rows: &[FieldRow], indent: usize) {
    let mut start = 0;
    while start < rows.len() {
        let mut end = start;
        while end < rows.len() {
            let row = &rows[end];
            end += 1;
            if row.ty.contains('\n') || row.name.is_empty() {
                break;
            }
        }
        let section = &rows[start..end];
        let name_width = section
            .iter()
            .filter(|r| !r.name.is_empty())
            .map(|r| r.name.chars().count())
            .max()
            .unwrap_or(0);
        let type_width = section
            .iter()
            .filter(|r| !r.ty.contains('\n'))
            .map(|r| r.ty.chars().count())
            .max()
            .unwrap_or(0);

        for row in section {
            out.push_str(&tabs(indent));
            let mut line = String::new();
            if !row.name.is_empty() {
                let _ = write!(line, "{:<width$} ", row.name, width = name_width);
            }
            match &row.tag {
                Some(tag) if !row.ty.contains('\n') => {
                    let _ = write!(line, "{:<width$} {}", row.ty, tag_literal(tag), width = type_width);
                }
                Some(tag) => {
                    let _ = write!(line, "{} {}", row.ty, tag_literal(tag));
                }
                None => line.push_str(&row.ty),
            }
            out.push_str(&line);
            out.push('\n');
        }
        start = end;
    }
}

// ── Renderer ────────────────────────────────────────────────────────────────

struct Renderer {
    out: String,
}

impl Renderer {
    fn emit_file(&mut self, file: &FakeFile, options: &RenderOptions) {
        self.out.push_str(HEADER);
        self.out.push('\n');
        if let Some(hash) = &options.source_hash {
            let _ = writeln!(self.out, "// source: sha256:{}", hash);
        }
        let _ = writeln!(self.out, "\npackage {}", file.package);
        self.emit_imports(&file.imports);
        self.emit_record(&file.record);
        for method in &file.methods {
            self.out.push('\n');
            self.emit_method(method);
        }
    }

    fn emit_imports(&mut self, imports: &[ImportSpec]) {
        let mut sorted: Vec<&ImportSpec> = imports.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));
        let spec = |i: &ImportSpec| match &i.alias {
            Some(alias) => format!("{} {}", alias.name, string_literal(&i.path)),
            None => string_literal(&i.path),
        };
        match sorted.as_slice() {
            [] => {}
            [only] => {
                let _ = writeln!(self.out, "\nimport {}", spec(only));
            }
            many => {
                self.out.push_str("\nimport (\n");
                for i in many {
                    let _ = writeln!(self.out, "\t{}", spec(i));
                }
                self.out.push_str(")\n");
            }
        }
    }

    fn emit_record(&mut self, record: &RecordDecl) {
        if record.fields.is_empty() {
            let _ = writeln!(self.out, "\ntype {} struct{{}}", record.name);
            return;
        }
        let _ = writeln!(self.out, "\ntype {} struct {{", record.name);
        let rows: Vec<FieldRow> = record
            .fields
            .iter()
            .map(|f| FieldRow {
                name: f.name.clone().unwrap_or_default(),
                ty: block_type(&f.ty, 1),
                tag: f.tag.clone(),
            })
            .collect();
        write_rows(&mut self.out, &rows, 1);
        self.out.push_str("}\n");
    }

    fn emit_method(&mut self, method: &MethodDecl) {
        let params: Vec<String> = method
            .params
            .iter()
            .map(|p| format!("{} {}", p.name, type_string(&p.ty)))
            .collect();
        let _ = write!(
            self.out,
            "func ({} *{}) {}({})",
            method.receiver,
            method.record,
            method.name,
            params.join(", ")
        );
        match method.results.as_slice() {
            [] => {}
            [single] => {
                let _ = write!(self.out, " {}", type_string(single));
            }
            many => {
                let results: Vec<String> = many.iter().map(type_string).collect();
                let _ = write!(self.out, " ({})", results.join(", "));
            }
        }
        self.out.push_str(" {\n");
        self.emit_block(&method.body, 1);
        self.out.push_str("}\n");
    }

    fn emit_block(&mut self, stmts: &[Stmt], indent: usize) {
        for stmt in stmts {
            self.emit_stmt(stmt, indent);
        }
    }

    fn emit_stmt(&mut self, stmt: &Stmt, indent: usize) {
        let pad = tabs(indent);
        match stmt {
            Stmt::Expr(e) => {
                let text = expr_string(e, indent);
                let _ = writeln!(self.out, "{pad}{text}");
            }
            Stmt::Defer(e) => {
                let text = expr_string(e, indent);
                let _ = writeln!(self.out, "{pad}defer {text}");
            }
            Stmt::Assign { target, value } => {
                let lhs = expr_string(target, indent);
                let rhs = expr_string(value, indent);
                let _ = writeln!(self.out, "{pad}{lhs} = {rhs}");
            }
            Stmt::If { cond, then } => {
                let text = expr_string(cond, indent);
                let _ = writeln!(self.out, "{pad}if {text} {{");
                self.emit_block(then, indent + 1);
                let _ = writeln!(self.out, "{pad}}}");
            }
            Stmt::Return(values) => {
                if values.is_empty() {
                    let _ = writeln!(self.out, "{pad}return");
                } else {
                    let texts: Vec<String> = values.iter().map(|v| expr_string(v, indent)).collect();
                    let _ = writeln!(self.out, "{pad}return {}", texts.join(", "));
                }
            }
        }
    }
}

/// Expression text; function literals and struct literals may span lines,
/// continuation lines are indented relative to `indent`.
fn expr_string(expr: &Expr, indent: usize) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Selector(x, name) => format!("{}.{}", expr_string(x, indent), name),
        Expr::Index(x, i) => format!("{}[{}]", expr_string(x, indent), expr_string(i, indent)),
        Expr::Call { func, args, spread } => {
            let args: Vec<String> = args.iter().map(|a| expr_string(a, indent)).collect();
            let dots = if *spread { "..." } else { "" };
            format!("{}({}{})", expr_string(func, indent), args.join(", "), dots)
        }
        Expr::FuncLit { body } => {
            let mut inner = Renderer { out: String::new() };
            inner.emit_block(body, indent + 1);
            format!("func() {{\n{}{}}}", inner.out, tabs(indent))
        }
        Expr::Composite { ty, elems } => {
            let elems: Vec<String> = elems.iter().map(|e| expr_string(e, indent)).collect();
            format!("{}{{{}}}", block_type(ty, indent), elems.join(", "))
        }
        Expr::StringLit(s) => string_literal(s),
        Expr::Nil => "nil".to_string(),
        Expr::Binary { op, lhs, rhs } => {
            let op = match op {
                BinOp::Eq => "==",
                BinOp::Ne => "!=",
            };
            format!("{} {} {}", expr_string(lhs, indent), op, expr_string(rhs, indent))
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
