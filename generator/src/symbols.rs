// symbols.rs — Symbol table for top-level declarations
//
// Built once per source file after parsing. Maps each top-level type name to
// a `DeclId` and each `DeclId` to the methods declared with it as receiver.
// Embedding references and receiver associations are resolved through this
// table only.
//
// Preconditions: `file` is a parsed source file.
// Postconditions: every top-level type declaration has exactly one `DeclId`,
//                 allocated in source order.
// Failure modes: a repeated type name yields `GenError::DuplicateDeclaration`.
// Side effects: none.

use std::collections::HashMap;

use crate::ast::{Decl, FuncDecl, SourceFile, TypeDecl, TypeExpr};
use crate::diag::GenError;
use crate::id::{DeclId, IdAllocator};

#[derive(Debug)]
pub struct SymbolTable<'a> {
    decls: Vec<&'a TypeDecl>,
    by_name: HashMap<&'a str, DeclId>,
    methods: HashMap<DeclId, Vec<&'a FuncDecl>>,
}

impl<'a> SymbolTable<'a> {
    pub fn build(file: &'a SourceFile) -> Result<Self, GenError> {
        let mut ids = IdAllocator::new();
        let mut table = SymbolTable {
            decls: Vec::new(),
            by_name: HashMap::new(),
            methods: HashMap::new(),
        };

        for decl in &file.decls {
            let Decl::Type(td) = decl else { continue };
            if let Some(&prev) = table.by_name.get(td.name.name.as_str()) {
                return Err(GenError::DuplicateDeclaration {
                    name: td.name.name.clone(),
                    first: table.decls[prev.0 as usize].name.span,
                    second: td.name.span,
                });
            }
            let id = ids.alloc_decl();
            table.decls.push(td);
            table.by_name.insert(&td.name.name, id);
        }

        // Methods may be declared before their receiver type.
        for decl in &file.decls {
            let Decl::Func(fd) = decl else { continue };
            let Some(recv) = &fd.receiver else { continue };
            match table.by_name.get(recv.type_name.name.as_str()) {
                Some(&id) => table.methods.entry(id).or_default().push(fd),
                None => tracing::trace!(
                    method = %fd.name.name,
                    receiver = %recv.type_name.name,
                    "receiver type not declared in this file"
                ),
            }
        }

        tracing::debug!(
            types = table.decls.len(),
            receivers = table.methods.len(),
            "symbol table built"
        );
        Ok(table)
    }

    pub fn lookup(&self, name: &str) -> Option<DeclId> {
        self.by_name.get(name).copied()
    }

    pub fn decl(&self, id: DeclId) -> &'a TypeDecl {
        self.decls[id.0 as usize]
    }

    /// Methods whose receiver names `id`, in source order.
    pub fn methods_of(&self, id: DeclId) -> &[&'a FuncDecl] {
        self.methods.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names of every declaration whose type is an interface literal, in
    /// source order.
    pub fn interface_names(&self) -> Vec<String> {
        self.decls
            .iter()
            .filter(|d| matches!(d.ty, TypeExpr::Interface(_)))
            .map(|d| d.name.name.clone())
            .collect()
    }
}
