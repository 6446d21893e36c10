//! Per-command checks: execution mode, placement and referenced names.

use super::PassContext;
use crate::catalog::syntax::CMD_COMMENT;
use crate::command::Command;
use crate::error::{ErrorKind, ErrorList, ScriptError};
use crate::parameter::{Parameter, ParameterValue};
use crate::tree::{Node, NodeId, ScriptTree};
use crate::types::{BranchLogic, Conditional, DataType, ExecutionMode, ParameterRole};

pub fn verify(tree: &mut ScriptTree, id: NodeId, context: &mut PassContext) {
    let node = tree.node(id);
    if node.command.syntax.is_none() || node.command.is(CMD_COMMENT) {
        return;
    }

    let mut errors = ErrorList::new();
    check(tree, id, context, &mut errors);

    if !tree.node(id).command.commented {
        context.errors.append(errors);
        warn_unassigned(tree.node(id), context);
        return;
    }
    // A commented command that would not compile becomes plain text.
    if !errors.is_empty() {
        revert_to_comment(tree, id, context);
    }
}

fn revert_to_comment(tree: &mut ScriptTree, id: NodeId, context: &PassContext) {
    let syntax = match context.catalog.syntaxes.get(CMD_COMMENT) {
        Some(syntax) => syntax,
        None => return,
    };
    let node = tree.node_mut(id);
    let text = node.command.text.trim_start_matches('*').trim().to_string();
    log::debug!("line {}: reverting '{}' to a comment", node.line, text);
    node.command = Command::comment(syntax, &text);
}

/// Reads of variables that nothing assigns and that are not script arguments.
/// These hold null at runtime, which usually means a misspelt name.
fn warn_unassigned(node: &Node, context: &mut PassContext) {
    for parameter in &node.command.parameters {
        let name = match parameter.variable_name() {
            Some(name) => name,
            None => continue,
        };
        if context.script.variables.assignments(name) > 0 || context.script.is_argument(name) {
            continue;
        }
        let warning = locate(
            node,
            parameter,
            ErrorKind::Verification,
            format!("${} is read but never assigned", name),
        );
        log::debug!("line {}: {}", node.line, warning.message);
        context.warnings.push(warning);
    }
}

fn locate(node: &Node, parameter: &Parameter, kind: ErrorKind, message: String) -> ScriptError {
    parameter
        .locate(ScriptError::new(kind, message))
        .on_line(node.line)
        .with_text(&node.command.text, node.extent.clone())
}

fn check(tree: &ScriptTree, id: NodeId, context: &PassContext, errors: &mut ErrorList) {
    let node = tree.node(id);
    let command = &node.command;
    let syntax = match &command.syntax {
        Some(syntax) => syntax,
        None => return,
    };

    let started = command.conditional() == Conditional::Start;
    match syntax.execution {
        ExecutionMode::Serial if started => {
            errors.push(node.error(ErrorKind::Verification, "'start' can only be used with concurrent commands"));
        }
        ExecutionMode::Concurrent if !started => {
            errors.push(node.error(ErrorKind::Verification, "this command must be run with 'start'"));
        }
        _ => {}
    }

    if command.is_macro() {
        let after_skip = tree
            .previous_significant_sibling(id)
            .map_or(false, |previous| tree.node(previous).logic() == BranchLogic::SkipIf);
        if after_skip {
            errors.push(node.error(ErrorKind::Logic, "'skip if' cannot guard a macro command"));
        }
    }

    for parameter in &command.parameters {
        if parameter.is_return_value() {
            continue;
        }
        check_reference(node, parameter, context, errors);
    }

    if command.is_script_call() {
        check_script_call(node, context, errors);
    }
}

fn check_reference(node: &Node, parameter: &Parameter, context: &PassContext, errors: &mut ErrorList) {
    let catalog = context.catalog;
    let name = match &parameter.value {
        ParameterValue::Str(name) => name,
        ParameterValue::Int(_) => return,
    };

    if parameter.role == ParameterRole::LabelNumber {
        if !context.script.labels.contains(name) {
            errors.push(locate(node, parameter, ErrorKind::Lookup, format!("label '{}' is not defined", name)));
        }
        return;
    }
    match parameter.data_type {
        DataType::Ware if !catalog.game_objects.contains(name) => {
            errors.push(locate(node, parameter, ErrorKind::Lookup, format!("unknown game object {{{}}}", name)));
        }
        data_type if data_type.is_script_object() && !catalog.script_objects.contains(name) => {
            errors.push(locate(node, parameter, ErrorKind::Lookup, format!("unknown script object [{}]", name)));
        }
        _ => {}
    }
}

fn check_script_call(node: &Node, context: &PassContext, errors: &mut ErrorList) {
    let command = &node.command;
    let name = match command.script_name() {
        Some(name) => name,
        None => return,
    };
    let calls = &context.script.script_calls;
    if calls.is_empty() {
        return;
    }
    let signature = match calls.find(name) {
        Some(signature) => signature,
        None => {
            errors.push(node.error(ErrorKind::Lookup, format!("script '{}' is not known", name)));
            return;
        }
    };

    let arguments = command.arguments();
    if arguments.len() != signature.arguments.len() {
        errors.push(node.error(
            ErrorKind::Argument,
            format!(
                "script '{}' takes {} argument(s) but {} were supplied",
                signature.name,
                signature.arguments.len(),
                arguments.len()
            ),
        ));
    }

    let preferences = context.preferences;
    for (position, (argument, declared)) in arguments.iter().zip(&signature.arguments).enumerate() {
        if preferences.check_argument_names {
            if let Some(given) = &argument.argument_name {
                if !given.text().eq_ignore_ascii_case(&declared.name) {
                    errors.push(locate(
                        node,
                        argument,
                        ErrorKind::Argument,
                        format!("argument {} should be '{}', not '{}'", position + 1, declared.name, given.text()),
                    ));
                }
            }
        }
        if preferences.check_argument_types && !declared.arg_type.accepts(argument.data_type) {
            errors.push(locate(
                node,
                argument,
                ErrorKind::Argument,
                format!("argument '{}' expects a {:?} value", declared.name, declared.arg_type),
            ));
        }
    }
}
