// eval.rs — In-process evaluator for synthesized doubles
//
// Executes the statements of a `FakeFile` against real locks so the
// generated concurrency discipline can be exercised from Rust tests.
// Every `sync.RWMutex` field becomes a `parking_lot::RwLock<()>`; every
// other field is a cell that is loaded and stored independently. An
// `x = append(x, v)` is therefore a load followed by a store, and only the
// surrounding lock makes it atomic.
//
// Preconditions: `file` was produced by `synth::synthesize` (or follows the
//                same statement subset).
// Postconditions: calls behave like the Go methods they interpret.
// Failure modes: `EvalError` for unknown methods, arity mismatches, failing
//                stubs and constructs outside the supported subset.
// Side effects: acquires and releases the instance's locks.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

use crate::ast::TypeExpr;
use crate::fake_ast::*;
use crate::synth::{returns_field, stub_field, INVOCATIONS_METHOD};

// ── Values ──────────────────────────────────────────────────────────────────

/// Behavior installed in a stub field. Receives one value per declared
/// parameter (a variadic arrives as a single `List`).
pub type StubFn = Arc<dyn Fn(&[Value]) -> Result<Vec<Value>, String> + Send + Sync>;

#[derive(Clone)]
pub enum Value {
    /// nil pointer, slice, map, func or interface.
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Non-nil slice or array.
    List(Vec<Value>),
    /// Non-nil map with string keys.
    Map(BTreeMap<String, Value>),
    /// Struct value; fields in declaration order.
    Struct(Vec<(String, Value)>),
    Func(StubFn),
}

impl Value {
    pub fn list(items: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Field of a struct value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Map(map) => f.debug_map().entries(map).finish(),
            Value::Struct(fields) => {
                let mut s = f.debug_struct("struct");
                for (name, value) in fields {
                    s.field(name, value);
                }
                s.finish()
            }
            Value::Func(_) => write!(f, "func"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// Go zero value of a type. Unknown named types are assumed to be
/// interfaces or pointers (nil).
pub fn zero_value(ty: &TypeExpr) -> Value {
    match ty {
        TypeExpr::Named {
            package: None,
            name,
        } => match name.as_str() {
            "string" => Value::Str(String::new()),
            "bool" => Value::Bool(false),
            "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16" | "uint32"
            | "uint64" | "uintptr" | "byte" | "rune" => Value::Int(0),
            "float32" | "float64" => Value::Float(0.0),
            _ => Value::Nil,
        },
        TypeExpr::Struct(st) => Value::Struct(
            st.fields
                .iter()
                .flat_map(|f| f.names.iter().map(|n| (n.name.clone(), zero_value(&f.ty))))
                .collect(),
        ),
        TypeExpr::Array { len, elem } => match len.parse::<usize>() {
            Ok(n) => Value::List(vec![zero_value(elem); n]),
            Err(_) => Value::Nil,
        },
        _ => Value::Nil,
    }
}

fn is_lock_type(ty: &TypeExpr) -> bool {
    matches!(
        ty,
        TypeExpr::Named { package: Some(pkg), name } if pkg == "sync" && (name == "RWMutex" || name == "Mutex")
    )
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("no method '{0}' on the double")]
    UnknownMethod(String),

    #[error("'{method}' takes {expected} value(s), got {got}")]
    ArityMismatch {
        method: String,
        expected: usize,
        got: usize,
    },

    #[error("stub for '{method}' failed: {message}")]
    StubFailed { method: String, message: String },

    #[error("call of nil function '{0}'")]
    NilFunc(String),

    #[error("unlock of unlocked mutex '{0}'")]
    UnlockOfUnlocked(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

// ── Instance ────────────────────────────────────────────────────────────────

/// A live double built from a synthesized file.
pub struct Instance {
    record: String,
    methods: HashMap<String, MethodDecl>,
    locks: HashMap<String, RwLock<()>>,
    cells: HashMap<String, Mutex<Value>>,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("record", &self.record)
            .field("methods", &self.methods.len())
            .field("locks", &self.locks.len())
            .finish()
    }
}

impl Instance {
    /// Allocate a zero-valued instance: unlocked mutexes, nil slices and
    /// maps, zeroed return records, no stubs.
    pub fn new(file: &FakeFile) -> Self {
        let mut locks = HashMap::new();
        let mut cells = HashMap::new();
        for field in &file.record.fields {
            let Some(name) = &field.name else { continue };
            if is_lock_type(&field.ty) {
                locks.insert(name.clone(), RwLock::new(()));
            } else {
                cells.insert(name.clone(), Mutex::new(zero_value(&field.ty)));
            }
        }
        Instance {
            record: file.record.name.clone(),
            methods: file
                .methods
                .iter()
                .map(|m| (m.name.clone(), m.clone()))
                .collect(),
            locks,
            cells,
        }
    }

    /// Install a stub for `method`. Must happen before concurrent calls.
    pub fn set_stub<F>(&mut self, method: &str, stub: F) -> Result<(), EvalError>
    where
        F: Fn(&[Value]) -> Result<Vec<Value>, String> + Send + Sync + 'static,
    {
        let cell = self
            .cells
            .get_mut(&stub_field(method))
            .ok_or_else(|| EvalError::UnknownMethod(method.to_string()))?;
        *cell.get_mut() = Value::Func(Arc::new(stub));
        Ok(())
    }

    pub fn clear_stub(&mut self, method: &str) -> Result<(), EvalError> {
        let cell = self
            .cells
            .get_mut(&stub_field(method))
            .ok_or_else(|| EvalError::UnknownMethod(method.to_string()))?;
        *cell.get_mut() = Value::Nil;
        Ok(())
    }

    /// Set the values `method` returns when no stub is installed.
    pub fn set_returns(&mut self, method: &str, values: Vec<Value>) -> Result<(), EvalError> {
        let expected = self
            .methods
            .get(method)
            .ok_or_else(|| EvalError::UnknownMethod(method.to_string()))?
            .results
            .len();
        if values.len() != expected {
            return Err(EvalError::ArityMismatch {
                method: method.to_string(),
                expected,
                got: values.len(),
            });
        }
        let cell = self
            .cells
            .get_mut(&returns_field(method))
            .ok_or_else(|| EvalError::UnknownMethod(method.to_string()))?;
        *cell.get_mut() = Value::Struct(
            values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (format!("result{}", i + 1), v))
                .collect(),
        );
        Ok(())
    }

    /// Call `method` with one value per declared parameter.
    pub fn call(&self, method: &str, args: Vec<Value>) -> Result<Vec<Value>, EvalError> {
        let mut interp = Interp {
            inst: self,
            held: Vec::new(),
        };
        let result = interp.invoke(method, args);
        if !interp.held.is_empty() {
            tracing::warn!(
                method,
                locks = interp.held.len(),
                "method returned while holding locks"
            );
        }
        result
    }

    /// The shared invocation log, read through the generated
    /// `Invocations()` method.
    pub fn invocations(&self) -> Result<BTreeMap<String, Vec<Vec<Value>>>, EvalError> {
        let values = self.call(INVOCATIONS_METHOD, Vec::new())?;
        let mut out = BTreeMap::new();
        match values.into_iter().next() {
            Some(Value::Map(map)) => {
                for (key, calls) in map {
                    let calls = match calls {
                        Value::List(calls) => calls
                            .into_iter()
                            .map(|c| match c {
                                Value::List(args) => args,
                                Value::Nil => Vec::new(),
                                other => vec![other],
                            })
                            .collect(),
                        _ => Vec::new(),
                    };
                    out.insert(key, calls);
                }
            }
            Some(Value::Nil) | None => {}
            Some(other) => {
                return Err(EvalError::Unsupported(format!(
                    "Invocations returned {other:?}"
                )))
            }
        }
        Ok(out)
    }

    /// Current value of a data field.
    pub fn field(&self, name: &str) -> Option<Value> {
        self.cells.get(name).map(|c| c.lock().clone())
    }

    fn load(&self, name: &str) -> Result<Value, EvalError> {
        self.field(name)
            .ok_or_else(|| EvalError::Unsupported(format!("no data field '{name}'")))
    }

    fn store(&self, name: &str, value: Value) -> Result<(), EvalError> {
        let cell = self
            .cells
            .get(name)
            .ok_or_else(|| EvalError::Unsupported(format!("no data field '{name}'")))?;
        *cell.lock() = value;
        Ok(())
    }
}

// ── Interpreter ─────────────────────────────────────────────────────────────

enum Held<'a> {
    Write(#[allow(dead_code)] RwLockWriteGuard<'a, ()>),
    Read(#[allow(dead_code)] RwLockReadGuard<'a, ()>),
}

struct Env<'a> {
    receiver: &'a str,
    locals: HashMap<&'a str, Value>,
}

enum Flow {
    Normal,
    Return(Vec<Value>),
}

enum Place {
    Field(String),
    Entry(String, String),
}

struct Interp<'a> {
    inst: &'a Instance,
    /// Locks taken by this call chain, in acquisition order.
    held: Vec<(String, Held<'a>)>,
}

impl<'a> Interp<'a> {
    fn invoke(&mut self, name: &str, args: Vec<Value>) -> Result<Vec<Value>, EvalError> {
        let inst = self.inst;
        let method = inst
            .methods
            .get(name)
            .ok_or_else(|| EvalError::UnknownMethod(name.to_string()))?;
        if args.len() != method.params.len() {
            return Err(EvalError::ArityMismatch {
                method: name.to_string(),
                expected: method.params.len(),
                got: args.len(),
            });
        }
        let env = Env {
            receiver: &method.receiver,
            locals: method
                .params
                .iter()
                .map(|p| p.name.as_str())
                .zip(args)
                .collect(),
        };
        tracing::trace!(method = name, "eval call");
        let results = self.run_frame(&method.body, &env)?;
        if results.len() != method.results.len() {
            return Err(EvalError::ArityMismatch {
                method: name.to_string(),
                expected: method.results.len(),
                got: results.len(),
            });
        }
        Ok(results)
    }

    /// Run a function body; deferred calls run on every exit path.
    fn run_frame(&mut self, body: &'a [Stmt], env: &Env<'a>) -> Result<Vec<Value>, EvalError> {
        let mut defers: Vec<&'a Expr> = Vec::new();
        let result = self.exec_block(body, env, &mut defers);
        let mut deferred_err = None;
        for call in defers.into_iter().rev() {
            if let Err(e) = self.eval_call(call, env) {
                deferred_err.get_or_insert(e);
            }
        }
        match (result, deferred_err) {
            (Err(e), _) | (Ok(_), Some(e)) => Err(e),
            (Ok(Flow::Return(values)), None) => Ok(values),
            (Ok(Flow::Normal), None) => Ok(Vec::new()),
        }
    }

    fn exec_block(
        &mut self,
        stmts: &'a [Stmt],
        env: &Env<'a>,
        defers: &mut Vec<&'a Expr>,
    ) -> Result<Flow, EvalError> {
        for stmt in stmts {
            match stmt {
                Stmt::Expr(e) => {
                    self.eval_call(e, env)?;
                }
                Stmt::Defer(e) => defers.push(e),
                Stmt::Assign { target, value } => {
                    let place = self.place(target, env)?;
                    let value = self.eval(value, env)?;
                    self.assign(place, value)?;
                }
                Stmt::If { cond, then } => {
                    if self.eval_bool(cond, env)? {
                        if let Flow::Return(v) = self.exec_block(then, env, defers)? {
                            return Ok(Flow::Return(v));
                        }
                    }
                }
                Stmt::Return(exprs) => {
                    let values = match exprs.as_slice() {
                        [single @ Expr::Call { .. }] => self.eval_call(single, env)?,
                        _ => exprs
                            .iter()
                            .map(|e| self.eval(e, env))
                            .collect::<Result<_, _>>()?,
                    };
                    return Ok(Flow::Return(values));
                }
            }
        }
        Ok(Flow::Normal)
    }

    fn is_receiver(expr: &Expr, env: &Env<'_>) -> bool {
        matches!(expr, Expr::Ident(name) if name == env.receiver)
    }

    /// `recv.field` → field name.
    fn receiver_field<'e>(expr: &'e Expr, env: &Env<'_>) -> Option<&'e str> {
        match expr {
            Expr::Selector(x, name) if Self::is_receiver(x, env) => Some(name),
            _ => None,
        }
    }

    fn place(&mut self, expr: &'a Expr, env: &Env<'a>) -> Result<Place, EvalError> {
        if let Some(field) = Self::receiver_field(expr, env) {
            return Ok(Place::Field(field.to_string()));
        }
        if let Expr::Index(x, key) = expr {
            if let Some(field) = Self::receiver_field(x, env) {
                let key = self.eval_key(key, env)?;
                return Ok(Place::Entry(field.to_string(), key));
            }
        }
        Err(EvalError::Unsupported(format!("assignment to {expr:?}")))
    }

    fn assign(&mut self, place: Place, value: Value) -> Result<(), EvalError> {
        match place {
            Place::Field(field) => self.inst.store(&field, value),
            Place::Entry(field, key) => {
                let mut map = self.inst.load(&field)?;
                match &mut map {
                    Value::Map(entries) => {
                        entries.insert(key, value);
                    }
                    Value::Nil => {
                        return Err(EvalError::Unsupported(format!(
                            "assignment to entry in nil map '{field}'"
                        )))
                    }
                    other => {
                        return Err(EvalError::Unsupported(format!(
                            "index assignment on {other:?}"
                        )))
                    }
                }
                self.inst.store(&field, map)
            }
        }
    }

    fn eval_key(&mut self, expr: &'a Expr, env: &Env<'a>) -> Result<String, EvalError> {
        match self.eval(expr, env)? {
            Value::Str(s) => Ok(s),
            other => Err(EvalError::Unsupported(format!("map key {other:?}"))),
        }
    }

    fn eval_bool(&mut self, expr: &'a Expr, env: &Env<'a>) -> Result<bool, EvalError> {
        match self.eval(expr, env)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::Unsupported(format!("non-bool condition {other:?}"))),
        }
    }

    /// Evaluate in single-value context.
    fn eval(&mut self, expr: &'a Expr, env: &Env<'a>) -> Result<Value, EvalError> {
        match expr {
            Expr::Ident(name) => env
                .locals
                .get(name.as_str())
                .cloned()
                .ok_or_else(|| EvalError::Unsupported(format!("undefined: {name}"))),
            Expr::Selector(x, name) => {
                if Self::is_receiver(x, env) {
                    if self.inst.locks.contains_key(name) {
                        return Err(EvalError::Unsupported(format!("mutex '{name}' used as value")));
                    }
                    return self.inst.load(name);
                }
                let base = self.eval(x, env)?;
                base.get(name)
                    .cloned()
                    .ok_or_else(|| EvalError::Unsupported(format!("no field '{name}' in {base:?}")))
            }
            Expr::Index(x, i) => {
                let base = self.eval(x, env)?;
                match base {
                    Value::Map(map) => {
                        let key = self.eval_key(i, env)?;
                        Ok(map.get(&key).cloned().unwrap_or(Value::Nil))
                    }
                    Value::Nil => Ok(Value::Nil),
                    Value::List(items) => match self.eval(i, env)? {
                        Value::Int(n) => usize::try_from(n)
                            .ok()
                            .and_then(|n| items.get(n).cloned())
                            .ok_or_else(|| EvalError::Unsupported(format!("index {n} out of range"))),
                        other => Err(EvalError::Unsupported(format!("list index {other:?}"))),
                    },
                    other => Err(EvalError::Unsupported(format!("index of {other:?}"))),
                }
            }
            Expr::Call { .. } => {
                let mut values = self.eval_call(expr, env)?;
                match values.len() {
                    1 => Ok(values.remove(0)),
                    n => Err(EvalError::Unsupported(format!(
                        "{n} values in single-value context"
                    ))),
                }
            }
            Expr::FuncLit { .. } => Err(EvalError::Unsupported("function literal as value".into())),
            Expr::Composite { ty, elems } => {
                let values: Vec<Value> = elems
                    .iter()
                    .map(|e| self.eval(e, env))
                    .collect::<Result<_, _>>()?;
                composite(ty, values)
            }
            Expr::StringLit(s) => Ok(Value::Str(s.clone())),
            Expr::Nil => Ok(Value::Nil),
            Expr::Binary { op, lhs, rhs } => {
                let l = self.eval(lhs, env)?;
                let r = self.eval(rhs, env)?;
                let equal = match (&l, &r) {
                    (Value::Nil, v) | (v, Value::Nil) => v.is_nil(),
                    _ => l == r,
                };
                Ok(Value::Bool(match op {
                    BinOp::Eq => equal,
                    BinOp::Ne => !equal,
                }))
            }
        }
    }

    /// Evaluate a call; returns all its results.
    fn eval_call(&mut self, expr: &'a Expr, env: &Env<'a>) -> Result<Vec<Value>, EvalError> {
        let Expr::Call { func, args, spread } = expr else {
            return Err(EvalError::Unsupported(format!("{expr:?} is not a call")));
        };

        // func() { ... }()
        if let Expr::FuncLit { body } = func.as_ref() {
            return self.run_frame(body, env);
        }

        // recv.mutex.Lock() and friends
        if let Expr::Selector(target, op) = func.as_ref() {
            if let Some(field) = Self::receiver_field(target, env) {
                if self.inst.locks.contains_key(field) {
                    self.lock_op(field, op)?;
                    return Ok(Vec::new());
                }
            }
        }

        let arg_values: Vec<Value> = args
            .iter()
            .map(|a| self.eval(a, env))
            .collect::<Result<_, _>>()?;

        // append(slice, elems...)
        if matches!(func.as_ref(), Expr::Ident(name) if name == "append" && !env.locals.contains_key("append")) {
            return append(arg_values, *spread).map(|v| vec![v]);
        }

        // recv.Method(...) or recv.Stub(...)
        if let Some(name) = Self::receiver_field(func, env) {
            if self.inst.methods.contains_key(name) {
                return self.invoke(name, arg_values);
            }
            return match self.inst.load(name)? {
                Value::Func(stub) => {
                    let method = name.strip_suffix("Stub").unwrap_or(name);
                    stub(&arg_values).map_err(|message| EvalError::StubFailed {
                        method: method.to_string(),
                        message,
                    })
                }
                Value::Nil => Err(EvalError::NilFunc(name.to_string())),
                other => Err(EvalError::Unsupported(format!("call of non-function {other:?}"))),
            };
        }

        Err(EvalError::Unsupported(format!("call of {func:?}")))
    }

    fn lock_op(&mut self, field: &str, op: &str) -> Result<(), EvalError> {
        let inst = self.inst;
        let lock = inst
            .locks
            .get(field)
            .ok_or_else(|| EvalError::Unsupported(format!("no mutex '{field}'")))?;
        match op {
            "Lock" => {
                let guard = lock.write();
                self.held.push((field.to_string(), Held::Write(guard)));
            }
            "RLock" => {
                let guard = lock.read();
                self.held.push((field.to_string(), Held::Read(guard)));
            }
            "Unlock" | "RUnlock" => {
                let write = op == "Unlock";
                let pos = self
                    .held
                    .iter()
                    .rposition(|(f, h)| f == field && matches!(h, Held::Write(_)) == write)
                    .ok_or_else(|| EvalError::UnlockOfUnlocked(field.to_string()))?;
                self.held.remove(pos);
            }
            other => return Err(EvalError::Unsupported(format!("mutex method '{other}'"))),
        }
        Ok(())
    }
}

fn composite(ty: &TypeExpr, values: Vec<Value>) -> Result<Value, EvalError> {
    match ty {
        TypeExpr::Struct(st) => {
            let names: Vec<&str> = st
                .fields
                .iter()
                .flat_map(|f| f.names.iter().map(|n| n.name.as_str()))
                .collect();
            if names.len() != values.len() {
                return Err(EvalError::Unsupported(format!(
                    "struct literal with {} of {} fields",
                    values.len(),
                    names.len()
                )));
            }
            Ok(Value::Struct(
                names.into_iter().map(String::from).zip(values).collect(),
            ))
        }
        TypeExpr::Slice(_) => Ok(Value::List(values)),
        TypeExpr::Map { .. } if values.is_empty() => Ok(Value::Map(BTreeMap::new())),
        other => Err(EvalError::Unsupported(format!("composite literal of {other:?}"))),
    }
}

fn append(mut args: Vec<Value>, spread: bool) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::Unsupported("append with no arguments".into()));
    }
    let mut extra = args.split_off(1);
    if spread {
        match extra.pop() {
            Some(Value::List(items)) => extra.extend(items),
            Some(Value::Nil) | None => {}
            Some(other) => return Err(EvalError::Unsupported(format!("spread of {other:?}"))),
        }
    }
    match args.remove(0) {
        Value::List(mut items) => {
            items.extend(extra);
            Ok(Value::List(items))
        }
        Value::Nil => Ok(Value::List(extra)),
        other => Err(EvalError::Unsupported(format!("append to {other:?}"))),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::resolve::{resolve, Naming};
    use crate::synth::{synthesize, SynthOptions};

    const STORE: &str = concat!(
        "package store\n",
        "type Store interface {\n",
        "\tGet(key string) (string, error)\n",
        "\tPut(key, value string)\n",
        "\tLog(format string, args ...int)\n",
        "\tClose()\n",
        "}\n",
    );

    fn instance(source: &str, name: &str) -> Instance {
        let file = parse(source).file.unwrap();
        let resolution = resolve(&file, name, &Naming::default()).unwrap();
        let fake = synthesize(
            resolution,
            &SynthOptions {
                package: "fakes".into(),
                source_imports: vec![],
            },
        );
        Instance::new(&fake)
    }

    #[test]
    fn zero_returns_without_stub() {
        let store = instance(STORE, "Store");
        let out = store.call("Get", vec!["k".into()]).unwrap();
        assert_eq!(out, vec![Value::Str(String::new()), Value::Nil]);
    }

    #[test]
    fn returns_override() {
        let mut store = instance(STORE, "Store");
        store.set_returns("Get", vec!["v".into(), Value::Nil]).unwrap();
        assert_eq!(store.call("Get", vec!["k".into()]).unwrap(), vec![Value::from("v"), Value::Nil]);
    }

    #[test]
    fn stub_takes_precedence() {
        let mut store = instance(STORE, "Store");
        store.set_returns("Get", vec!["canned".into(), Value::Nil]).unwrap();
        store
            .set_stub("Get", |args| match &args[0] {
                Value::Str(k) => Ok(vec![Value::Str(k.to_uppercase()), Value::Nil]),
                _ => Err("bad key".into()),
            })
            .unwrap();
        assert_eq!(store.call("Get", vec!["abc".into()]).unwrap()[0], Value::from("ABC"));

        store.clear_stub("Get").unwrap();
        assert_eq!(store.call("Get", vec!["abc".into()]).unwrap()[0], Value::from("canned"));
    }

    #[test]
    fn calls_are_recorded() {
        let store = instance(STORE, "Store");
        store.call("Put", vec!["a".into(), "1".into()]).unwrap();
        store.call("Put", vec!["b".into(), "2".into()]).unwrap();
        store.call("Close", vec![]).unwrap();

        let Some(Value::List(calls)) = store.field("putArgsForCall") else {
            panic!("expected recorded calls")
        };
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].get("arg1"), Some(&Value::from("b")));
        assert_eq!(calls[1].get("arg2"), Some(&Value::from("2")));

        let log = store.invocations().unwrap();
        assert_eq!(log["Put"], vec![vec![Value::from("a"), Value::from("1")], vec![Value::from("b"), Value::from("2")]]);
        assert_eq!(log["Close"], vec![Vec::<Value>::new()]);
        assert!(!log.contains_key("Get"));
    }

    #[test]
    fn variadic_captured_as_one_list() {
        let mut store = instance(STORE, "Store");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store
            .set_stub("Log", move |args| {
                sink.lock().push(args.to_vec());
                Ok(vec![])
            })
            .unwrap();
        store
            .call("Log", vec!["%d %d".into(), Value::list([1i64, 2])])
            .unwrap();

        let Some(Value::List(calls)) = store.field("logArgsForCall") else {
            panic!("expected recorded calls")
        };
        assert_eq!(calls[0].get("arg2"), Some(&Value::list([1i64, 2])));
        // The stub sees the variadic as a single list, not spread out.
        assert_eq!(seen.lock()[0], vec![Value::from("%d %d"), Value::list([1i64, 2])]);
    }

    #[test]
    fn stub_failure_releases_locks() {
        let mut store = instance(STORE, "Store");
        store.set_stub("Close", |_| Err("boom".into())).unwrap();
        let err = store.call("Close", vec![]).unwrap_err();
        assert_eq!(
            err,
            EvalError::StubFailed {
                method: "Close".into(),
                message: "boom".into(),
            }
        );
        // Neither lock is left held: later calls and the log still work.
        store.call("Put", vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(store.invocations().unwrap()["Close"].len(), 1);
    }

    #[test]
    fn unknown_method_and_arity() {
        let mut store = instance(STORE, "Store");
        assert_eq!(
            store.call("Nope", vec![]).unwrap_err(),
            EvalError::UnknownMethod("Nope".into())
        );
        assert_eq!(
            store.call("Get", vec![]).unwrap_err(),
            EvalError::ArityMismatch {
                method: "Get".into(),
                expected: 1,
                got: 0,
            }
        );
        assert!(matches!(
            store.set_returns("Get", vec![Value::Nil]),
            Err(EvalError::ArityMismatch { expected: 2, got: 1, .. })
        ));
        assert!(matches!(
            store.set_stub("Nope", |_| Ok(vec![])),
            Err(EvalError::UnknownMethod(_))
        ));
    }

    #[test]
    fn stub_with_wrong_result_count_is_reported() {
        let mut store = instance(STORE, "Store");
        store.set_stub("Get", |_| Ok(vec![])).unwrap();
        assert!(matches!(
            store.call("Get", vec!["k".into()]),
            Err(EvalError::ArityMismatch { expected: 2, got: 0, .. })
        ));
    }

    #[test]
    fn unlock_without_lock_is_an_error() {
        let mutex = Expr::ident("f").select("mMutex");
        let file = FakeFile {
            package: "p".into(),
            imports: vec![],
            record: RecordDecl {
                name: "F".into(),
                fields: vec![Field::named("mMutex", TypeExpr::qualified("sync", "RWMutex"))],
            },
            methods: vec![MethodDecl {
                receiver: "f".into(),
                record: "F".into(),
                name: "M".into(),
                params: vec![],
                results: vec![],
                body: vec![Stmt::Expr(mutex.select("Unlock").call(vec![]))],
            }],
        };
        let inst = Instance::new(&file);
        assert_eq!(
            inst.call("M", vec![]).unwrap_err(),
            EvalError::UnlockOfUnlocked("mMutex".into())
        );
    }

    #[test]
    fn zero_values() {
        assert_eq!(zero_value(&TypeExpr::named("int")), Value::Int(0));
        assert_eq!(zero_value(&TypeExpr::named("error")), Value::Nil);
        assert_eq!(zero_value(&TypeExpr::slice(TypeExpr::named("int"))), Value::Nil);
        assert_eq!(
            zero_value(&TypeExpr::Array {
                len: "2".into(),
                elem: Box::new(TypeExpr::named("bool")),
            }),
            Value::list([false, false])
        );
    }

    #[test]
    fn concurrent_calls_lose_nothing() {
        const THREADS: usize = 8;
        const CALLS: usize = 50;
        let store = instance(STORE, "Store");
        std::thread::scope(|s| {
            for t in 0..THREADS {
                let store = &store;
                s.spawn(move || {
                    for i in 0..CALLS {
                        store
                            .call("Put", vec![format!("{t}").into(), format!("{i}").into()])
                            .unwrap();
                    }
                });
            }
        });
        let Some(Value::List(calls)) = store.field("putArgsForCall") else {
            panic!("expected recorded calls")
        };
        assert_eq!(calls.len(), THREADS * CALLS);
        assert_eq!(store.invocations().unwrap()["Put"].len(), THREADS * CALLS);
    }
}
