//! Compiler and decompiler for MSCI script command lines.

pub mod bytecode;
pub mod catalog;
pub mod command;
pub mod compiler;
pub mod config;
pub mod decompiler;
pub mod error;
pub mod expression;
pub mod lexer;
pub mod parameter;
pub mod parser;
pub mod passes;
pub mod script;
pub mod token;
pub mod tree;
pub mod types;

pub use compiler::{Compilation, ScriptCompiler};
pub use decompiler::Decompiler;
