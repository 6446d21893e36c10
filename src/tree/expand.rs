//! Rewrites `dim` and `for` macros into the commands they stand for.

use super::{NodeId, ScriptTree};
use crate::catalog::syntax::{CMD_DIM, CMD_FOR_EACH, CMD_FOR_EACH_COUNTER, CMD_FOR_LOOP};
use crate::command::Command;
use crate::error::{ErrorKind, ErrorList, ScriptError};
use crate::parameter::Parameter;
use crate::parser::CommandParser;
use crate::script::ScriptFile;

pub struct Expander<'a, 'c> {
    parser: &'a CommandParser<'c>,
    script: &'a mut ScriptFile,
    errors: &'a mut ErrorList,
}

impl<'a, 'c> Expander<'a, 'c> {
    pub fn new(parser: &'a CommandParser<'c>, script: &'a mut ScriptFile, errors: &'a mut ErrorList) -> Self {
        Self { parser, script, errors }
    }

    pub fn run(&mut self, tree: &mut ScriptTree) {
        let root = tree.root();
        self.expand_scope(tree, root);
    }

    /// Expands macros among the children of `scope`, bodies included, and
    /// installs the new child list.
    fn expand_scope(&mut self, tree: &mut ScriptTree, scope: NodeId) {
        let children = tree.children(scope).to_vec();
        let mut expanded = Vec::with_capacity(children.len());

        for child in children {
            if !tree.node(child).command.is_macro() {
                self.expand_scope(tree, child);
                expanded.push(child);
                continue;
            }
            // Named before the body so nested loops see this number as taken.
            let iterator = tree.next_iterator_name(scope);
            self.expand_scope(tree, child);
            match self.expand_macro(tree, child, &iterator) {
                Ok(nodes) => expanded.extend(nodes),
                Err(error) => {
                    self.errors.push(error);
                    expanded.push(child);
                }
            }
        }

        tree.set_children(scope, expanded);
    }

    fn expand_macro(&mut self, tree: &mut ScriptTree, id: NodeId, iterator: &str) -> Result<Vec<NodeId>, ScriptError> {
        let node = tree.node(id);
        let command = node.command.clone();
        let text = |p: &Parameter| p.display_text();
        let declared = command.declared();

        let nodes = match command.id() {
            CMD_FOR_LOOP => {
                let (variable, start, end, step) =
                    (text(&declared[0]), text(&declared[1]), text(&declared[2]), text(&declared[3]));
                let comparison = if step.starts_with('-') { ">" } else { "<" };
                let init = self.synthesize(tree, id, &format!("{} = {} - {}", variable, start, step))?;
                let check = self.synthesize(tree, id, &format!("while {} {} {}", variable, comparison, end))?;
                let advance = self.synthesize(tree, id, &format!("{} = {} + {}", variable, variable, step))?;
                self.adopt_body(tree, id, check, vec![advance]);
                vec![init, check]
            }
            CMD_FOR_EACH | CMD_FOR_EACH_COUNTER => {
                let (item, array) = (text(&declared[0]), text(&declared[1]));
                let counter = match declared.get(2) {
                    Some(counter) if command.id() == CMD_FOR_EACH_COUNTER => text(counter),
                    _ => format!("${}", iterator),
                };
                let init = self.synthesize(tree, id, &format!("{} = size of array {}", counter, array))?;
                let check = self.synthesize(tree, id, &format!("while {}", counter))?;
                let step = self.synthesize(tree, id, &format!("{} = {} - 1", counter, counter))?;
                let fetch = self.synthesize(tree, id, &format!("{} = {}[{}]", item, array, counter))?;
                self.adopt_body(tree, id, check, vec![step, fetch]);
                vec![init, check]
            }
            CMD_DIM => {
                let target = command
                    .return_value()
                    .and_then(|p| p.assigned_name())
                    .map(|name| format!("${}", name))
                    .ok_or_else(|| tree.node(id).error(ErrorKind::Syntax, "'dim' needs a variable to assign to"))?;
                let values: Vec<String> = command.arguments().iter().map(Parameter::display_text).collect();
                let mut nodes = vec![self.synthesize(
                    tree,
                    id,
                    &format!("{} = array alloc: size={}", target, values.len()),
                )?];
                for (index, value) in values.iter().enumerate() {
                    nodes.push(self.synthesize(tree, id, &format!("{}[{}] = {}", target, index, value))?);
                }
                nodes
            }
            other => {
                return Err(tree
                    .node(id)
                    .error(ErrorKind::Algorithm, format!("command {} is not a macro", other)))
            }
        };

        log::trace!("expanded line {} into {} commands", tree.node(id).line, nodes.len());
        Ok(nodes)
    }

    /// Moves the macro's body under `block`, after `prologue`.
    fn adopt_body(&self, tree: &mut ScriptTree, macro_node: NodeId, block: NodeId, prologue: Vec<NodeId>) {
        let mut children = prologue;
        children.extend_from_slice(tree.children(macro_node));
        tree.set_children(block, children);
        tree.set_children(macro_node, Vec::new());
    }

    /// Parses a generated line into a detached node on the macro's line.
    fn synthesize(&mut self, tree: &mut ScriptTree, origin: NodeId, line: &str) -> Result<NodeId, ScriptError> {
        let node = tree.node(origin);
        let (number, extent) = (node.line, node.extent.clone());
        let command: Command = self.parser.parse_line(line).map_err(|e| {
            ScriptError::new(ErrorKind::Algorithm, format!("expansion produced an invalid line '{}': {}", line, e.message))
                .on_line(number)
        })?;
        for parameter in &command.parameters {
            if let Some(name) = parameter.variable_name().or_else(|| parameter.assigned_name()) {
                self.script.variables.add(name).map_err(|e| e.on_line(number))?;
            }
        }
        Ok(tree.create(command, number, extent))
    }
}
