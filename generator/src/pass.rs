// pass.rs — Pass descriptors and dependency resolution
//
// Declares the generator's passes (parse is outside the runner) and their
// dependency edges. The pipeline runner uses this to compute the minimal
// pass subset for each `--emit` target.

use std::collections::HashSet;

/// Identifies each generator pass (parsing runs before the runner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Resolve,
    Synthesize,
    Render,
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about a pass.
pub struct PassDescriptor {
    /// Name used in log events.
    pub name: &'static str,
    /// Passes whose outputs this pass consumes.
    pub inputs: &'static [PassId],
}

pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::Resolve => PassDescriptor {
            name: "resolve",
            inputs: &[],
        },
        PassId::Synthesize => PassDescriptor {
            name: "synthesize",
            inputs: &[PassId::Resolve],
        },
        PassId::Render => PassDescriptor {
            name: "render",
            inputs: &[PassId::Synthesize],
        },
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

/// Minimal ordered set of passes needed to produce `terminal`, in
/// execution order.
pub fn required_passes(terminal: PassId) -> Vec<PassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(terminal, &mut visited, &mut order);
    order
}

fn visit(id: PassId, visited: &mut HashSet<PassId>, order: &mut Vec<PassId>) {
    if !visited.insert(id) {
        return;
    }
    for &dep in descriptor(id).inputs {
        visit(dep, visited, order);
    }
    order.push(id);
}

// ── Tests ──────────────────────────────────────────────────────────────────
