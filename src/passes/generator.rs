//! Numbers the linked tree and encodes it into rows.

use super::PassContext;
use crate::bytecode::{CommandKind, CompiledCommand, CompiledParameter};
use crate::catalog::syntax::{CMD_COMMAND_COMMENT, CMD_NOP};
use crate::error::ErrorList;
use crate::tree::{NodeId, ScriptTree};
use crate::types::DataType;

/// Auxiliary nodes share the index of the standard node that follows them.
pub fn index(tree: &mut ScriptTree, id: NodeId, context: &mut PassContext) {
    let node = tree.node_mut(id);
    node.index = Some(context.counter);
    node.standard_index = Some(context.standard_counter);
    context.counter += 1;
    if node.is_standard() {
        context.standard_counter += 1;
    }
}

pub fn generate(tree: &mut ScriptTree, id: NodeId, context: &mut PassContext) {
    let node = tree.node(id);
    let command = &node.command;
    let destination = node
        .jump_target
        .and_then(|target| tree.node(target).standard_index)
        .and_then(|index| u16::try_from(index).ok());

    let mut errors = ErrorList::new();
    let mut parameters = Vec::with_capacity(command.parameters.len() + 1);
    if command.commented {
        parameters.push(CompiledParameter::int(DataType::Integer, command.id() as i32));
    }
    for parameter in &command.parameters {
        match parameter.generate(context.catalog, context.script, destination, command.commented) {
            Ok(compiled) => parameters.push(compiled),
            Err(error) => errors.push(error.on_line(node.line).with_text(&command.text, node.extent.clone())),
        }
    }
    if !errors.is_empty() {
        context.errors.append(errors);
        return;
    }

    let id = match (&command.syntax, command.commented) {
        (None, _) => CMD_NOP,
        (Some(_), true) => CMD_COMMAND_COMMENT,
        (Some(_), false) => command.id(),
    };
    let (kind, reference) = if node.is_standard() {
        (CommandKind::Standard, None)
    } else {
        (CommandKind::Auxiliary, node.standard_index)
    };
    context.output.push(CompiledCommand {
        id,
        kind,
        reference,
        commented: command.commented,
        parameters,
        line: node.line,
    });
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::bytecode::{CommandKind, CompiledParameter};
    use crate::catalog::syntax::{CMD_COMMAND_COMMENT, CMD_END, CMD_HIDDEN_JUMP, CMD_NOP};
    use crate::config::Preferences;
    use crate::passes::testing::{run_passes, script, Outcome};
    use crate::passes::Pass;
    use crate::types::{DataType, ReturnType, ReturnValue};

    const ALL: [Pass; 8] = [
        Pass::ConstantIdentifier,
        Pass::VariableIdentifier,
        Pass::CommandVerifier,
        Pass::NodeLinker,
        Pass::LogicVerifier,
        Pass::TerminationVerifier,
        Pass::NodeIndexer,
        Pass::CommandGenerator,
    ];

    fn compile(source: &str) -> Outcome {
        let outcome = run_passes(source, script(), Preferences::default(), &ALL);
        assert!(outcome.errors.is_empty(), "{}", outcome.errors);
        outcome
    }

    fn return_value(parameter: &CompiledParameter) -> ReturnValue {
        parameter.as_int().and_then(ReturnValue::decode).unwrap()
    }

    #[test]
    fn indices_cover_every_node_once() {
        let outcome = compile(
            "for each $x in array $list\nif $x\nbreak\nelse\ncontinue\nend\nend\n\n* done\nreturn null",
        );
        let tree = &outcome.tree;
        let nodes = tree.pre_order();
        let indices: BTreeSet<usize> = nodes.iter().filter_map(|&id| tree.node(id).index).collect();
        assert_eq!(indices, (0..nodes.len()).collect());
        assert_eq!(outcome.output.len(), nodes.len());
    }

    #[test]
    fn while_loops_encode_their_destinations() {
        let outcome = compile("while $x\n$x = $x - 1\nend\nreturn null");
        let output = &outcome.output;
        let ids: Vec<u16> = output.iter().map(|c| c.id).collect();
        assert_eq!(ids[2], CMD_HIDDEN_JUMP);
        assert_eq!(ids[3], CMD_END);

        let check = return_value(&output[0].parameters[0]);
        assert_eq!(check.return_type, ReturnType::Jump);
        assert_eq!(check.destination, 3);
        assert_eq!(output[2].parameters[0], CompiledParameter::int(DataType::Integer, 0));
        assert_eq!(output[3].kind, CommandKind::Auxiliary);
        assert_eq!(output[3].reference, Some(3));
    }

    #[test]
    fn variables_are_encoded_by_slot() {
        let outcome = compile("$fuel = $ship-> get fuel\nreturn $fuel");
        assert_eq!(outcome.script.variables.names(), ["fuel", "ship"]);
        let get = &outcome.output[0];
        assert_eq!(get.id, 200);
        assert_eq!(return_value(&get.parameters[0]), ReturnValue::assignment(0));
        assert_eq!(get.parameters[1], CompiledParameter::int(DataType::Variable, 1));
    }

    #[test]
    fn commented_and_blank_rows_are_auxiliary() {
        let outcome = compile("* write to player logbook $x\n\nreturn null");
        let output = &outcome.output;
        assert_eq!(output[0].id, CMD_COMMAND_COMMENT);
        assert_eq!(output[0].parameters[0], CompiledParameter::int(DataType::Integer, 203));
        assert_eq!(output[0].kind, CommandKind::Auxiliary);
        assert_eq!(output[0].reference, Some(0));
        assert_eq!(output[1].id, CMD_NOP);
        assert!(output[2].is_standard());
    }
}
