// id.rs — Stable identifiers for top-level declarations
//
// Declarations are numbered in source order when the symbol table is built.
// Every cross reference (embedded interface, method receiver) is resolved to
// one of these IDs, so later phases compare integers instead of names or
// tree nodes.

use serde::Serialize;

/// Stable identifier for a top-level `type` declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeclId(pub u32);

/// Allocator for stable IDs. Produces monotonically increasing IDs in
/// allocation (source) order, ensuring deterministic assignment.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next_decl: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_decl(&mut self) -> DeclId {
        let id = DeclId(self.next_decl);
        self.next_decl += 1;
        id
    }
}
