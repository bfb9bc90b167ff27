// fakegen — Go test-double generator
//
// Library root, modules in pipeline order.

pub mod lexer;
pub mod ast;
pub mod parser;
pub mod id;
pub mod symbols;
pub mod resolve;
pub mod fake_ast;
pub mod synth;
pub mod render;
pub mod eval;
pub mod diag;
pub mod pass;
pub mod pipeline;
