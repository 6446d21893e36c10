//! Symbol collection: assignment counts, variable IDs and label definitions.

use super::PassContext;
use crate::catalog::syntax::{CMD_FOR_EACH, CMD_FOR_EACH_COUNTER, CMD_FOR_LOOP};
use crate::command::Command;
use crate::error::ErrorKind;
use crate::tree::{NodeId, ScriptTree};

/// Counts the assignments to each variable name.
pub fn identify_constants(tree: &mut ScriptTree, id: NodeId, context: &mut PassContext) {
    let command = &tree.node(id).command;
    if command.commented {
        return;
    }
    let assigned = command
        .parameters
        .iter()
        .filter_map(|p| p.assigned_name())
        .chain(loop_variables(command));
    for name in assigned {
        context.script.variables.count_assignment(name);
    }
}

/// Variables a loop macro writes on every iteration.
fn loop_variables(command: &Command) -> impl Iterator<Item = &str> {
    let slots: &[usize] = match command.id() {
        CMD_FOR_LOOP | CMD_FOR_EACH => &[0],
        CMD_FOR_EACH_COUNTER => &[0, 2],
        _ => &[],
    };
    slots
        .iter()
        .filter_map(move |&slot| command.parameters.get(slot))
        .filter_map(|p| p.variable_name())
}

/// Script arguments take the lowest variable IDs.
pub fn register_arguments(context: &mut PassContext) {
    let names: Vec<String> = context.script.arguments.iter().map(|a| a.name.clone()).collect();
    for name in names {
        if let Err(error) = context.script.variables.add(&name) {
            context.errors.push(error);
        }
    }
}

pub fn identify_variables(tree: &mut ScriptTree, id: NodeId, context: &mut PassContext) {
    let node = tree.node(id);
    for parameter in &node.command.parameters {
        if let Some(name) = parameter.variable_name() {
            if let Err(error) = context.script.variables.add(name) {
                context.errors.push(error.on_line(node.line));
            }
        }
    }

    if !node.command.is_label() {
        return;
    }
    let name = match node.command.parameters.first().and_then(|p| p.label_name()) {
        Some(name) => name,
        None => return,
    };
    if let Err(first) = context.script.labels.add(name, node.line) {
        context.errors.push(node.error(
            ErrorKind::Logic,
            format!("label '{}' is already defined on line {}", name, first),
        ));
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::test_catalog;
    use crate::config::Preferences;
    use crate::error::ErrorList;
    use crate::parser::CommandParser;
    use crate::passes::{run, Pass, PassContext};
    use crate::script::{ArgumentType, ScriptArgument, ScriptFile};
    use crate::tree::ScriptTree;
    use crate::types::{GameVersion, VargTrimming};

    #[test]
    fn arguments_come_first_then_source_order() {
        let catalog = test_catalog();
        let parser = CommandParser::new(&catalog, GameVersion::AlbionPrelude, VargTrimming::TrailingNulls);
        let mut errors = ErrorList::new();
        let mut tree = ScriptTree::parse("$fuel = $ship-> get fuel\n$fuel = $fuel + 1\nreturn $fuel", &parser, &mut errors);
        let mut script = ScriptFile::new("test", GameVersion::AlbionPrelude);
        script.add_argument(ScriptArgument::new("ship", ArgumentType::Object));
        script.add_argument(ScriptArgument::new("unused", ArgumentType::Number));

        let mut context = PassContext::new(&catalog, &mut script, Preferences::default(), &mut errors);
        run(Pass::ConstantIdentifier, &mut tree, &mut context);
        run(Pass::VariableIdentifier, &mut tree, &mut context);
        drop(context);

        assert!(errors.is_empty(), "{}", errors);
        assert_eq!(script.variables.names(), ["ship", "unused", "fuel"]);
        assert_eq!(script.variables.assignments("fuel"), 2);
    }

    #[test]
    fn loop_macros_assign_their_variables() {
        let catalog = test_catalog();
        let parser = CommandParser::new(&catalog, GameVersion::AlbionPrelude, VargTrimming::TrailingNulls);
        let mut errors = ErrorList::new();
        let mut tree = ScriptTree::parse(
            "for $i = 0 to 3 step 1\nend\nfor each $x in array $list using counter $n\nend",
            &parser,
            &mut errors,
        );
        let mut script = ScriptFile::new("test", GameVersion::AlbionPrelude);
        let mut context = PassContext::new(&catalog, &mut script, Preferences::default(), &mut errors);
        run(Pass::ConstantIdentifier, &mut tree, &mut context);
        drop(context);

        assert_eq!(script.variables.assignments("i"), 1);
        assert_eq!(script.variables.assignments("x"), 1);
        assert_eq!(script.variables.assignments("n"), 1);
        assert_eq!(script.variables.assignments("list"), 0);
    }

    #[test]
    fn duplicate_labels_are_reported() {
        let catalog = test_catalog();
        let parser = CommandParser::new(&catalog, GameVersion::AlbionPrelude, VargTrimming::TrailingNulls);
        let mut errors = ErrorList::new();
        let mut tree = ScriptTree::parse("main:\n* main:\nmain:\nreturn null", &parser, &mut errors);
        let mut script = ScriptFile::new("test", GameVersion::AlbionPrelude);
        let mut context = PassContext::new(&catalog, &mut script, Preferences::default(), &mut errors);
        run(Pass::VariableIdentifier, &mut tree, &mut context);
        drop(context);

        assert_eq!(errors.len(), 1);
        let error = errors.iter().next().unwrap();
        assert_eq!(error.line, 3);
        assert!(error.message.contains("line 1"));
    }
}
