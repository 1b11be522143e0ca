// flowgen — dataflow pipeline generator
//
// Library root. Loads dataflow IR documents, validates them and lowers them
// into push-based reactive pipeline modules.

pub mod codegen;
pub mod diag;
pub mod doc;
pub mod dot;
pub mod expr;
pub mod id;
pub mod interchange;
pub mod ir;
pub mod lexer;
pub mod lookup;
pub mod lower;
pub mod naming;
pub mod parser;
pub mod pass;
pub mod pipeline;
pub mod ports;
pub mod wiring;
