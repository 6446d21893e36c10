//! Passes over the parse tree, run one after another by the compiler.

pub mod command_verifier;
pub mod generator;
pub mod identifiers;
pub mod linker;
pub mod logic;

use crate::bytecode::CompiledCommand;
use crate::catalog::Catalog;
use crate::config::Preferences;
use crate::error::ErrorList;
use crate::script::ScriptFile;
use crate::tree::{NodeId, ScriptTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    ConstantIdentifier,
    VariableIdentifier,
    CommandVerifier,
    NodeLinker,
    LogicVerifier,
    TerminationVerifier,
    NodeIndexer,
    CommandGenerator,
}

impl Pass {
    pub fn name(&self) -> &'static str {
        match self {
            Pass::ConstantIdentifier => "constant identifier",
            Pass::VariableIdentifier => "variable identifier",
            Pass::CommandVerifier => "command verifier",
            Pass::NodeLinker => "node linker",
            Pass::LogicVerifier => "logic verifier",
            Pass::TerminationVerifier => "termination verifier",
            Pass::NodeIndexer => "node indexer",
            Pass::CommandGenerator => "command generator",
        }
    }
}

/// State shared by every pass of one compilation.
pub struct PassContext<'a> {
    pub catalog: &'a Catalog,
    pub script: &'a mut ScriptFile,
    pub preferences: Preferences,
    pub errors: &'a mut ErrorList,
    /// Diagnostics that do not stop compilation.
    pub warnings: ErrorList,
    /// Next dense index handed out by the indexer.
    pub counter: usize,
    /// Next standard-command index handed out by the indexer.
    pub standard_counter: usize,
    pub output: Vec<CompiledCommand>,
}

impl<'a> PassContext<'a> {
    pub fn new(
        catalog: &'a Catalog,
        script: &'a mut ScriptFile,
        preferences: Preferences,
        errors: &'a mut ErrorList,
    ) -> Self {
        Self {
            catalog,
            script,
            preferences,
            errors,
            warnings: ErrorList::new(),
            counter: 0,
            standard_counter: 0,
            output: Vec::new(),
        }
    }
}

/// Runs `pass` over the whole tree.
pub fn run(pass: Pass, tree: &mut ScriptTree, context: &mut PassContext) {
    log::debug!("running {}", pass.name());
    match pass {
        Pass::TerminationVerifier => logic::verify_termination(tree, context),
        _ => {
            if pass == Pass::VariableIdentifier {
                identifiers::register_arguments(context);
            }
            let root = tree.root();
            walk(pass, tree, root, context);
        }
    }
}

/// Pre-order walk. Children are re-read after the visit so that nodes a
/// pass inserts are visited too.
fn walk(pass: Pass, tree: &mut ScriptTree, id: NodeId, context: &mut PassContext) {
    if id != tree.root() {
        visit(pass, tree, id, context);
    }
    let mut position = 0;
    while let Some(&child) = tree.children(id).get(position) {
        walk(pass, tree, child, context);
        position += 1;
    }
}

fn visit(pass: Pass, tree: &mut ScriptTree, id: NodeId, context: &mut PassContext) {
    match pass {
        Pass::ConstantIdentifier => identifiers::identify_constants(tree, id, context),
        Pass::VariableIdentifier => identifiers::identify_variables(tree, id, context),
        Pass::CommandVerifier => command_verifier::verify(tree, id, context),
        Pass::NodeLinker => linker::link(tree, id, context),
        Pass::LogicVerifier => logic::verify(tree, id, context),
        Pass::NodeIndexer => generator::index(tree, id, context),
        Pass::CommandGenerator => generator::generate(tree, id, context),
        Pass::TerminationVerifier => {}
    }
}
