//! Structural checks: block placement and whether every path returns.

use std::collections::HashSet;

use super::PassContext;
use crate::catalog::syntax::{
    CMD_DEFINE_LABEL, CMD_END_SUB, CMD_GOTO_LABEL, CMD_GOTO_SUB, CMD_HIDDEN_JUMP, CMD_RETURN,
};
use crate::error::{ErrorKind, ScriptError};
use crate::tree::{NodeId, ScriptTree};
use crate::types::BranchLogic;

pub fn verify(tree: &mut ScriptTree, id: NodeId, context: &mut PassContext) {
    let node = tree.node(id);
    let message = match node.logic() {
        BranchLogic::Break if tree.find_ancestor(id, BranchLogic::While).is_none() => {
            Some("'break' must be inside a 'while' loop")
        }
        BranchLogic::Continue if tree.find_ancestor(id, BranchLogic::While).is_none() => {
            Some("'continue' must be inside a 'while' loop")
        }
        BranchLogic::Else | BranchLogic::ElseIf => {
            let previous = tree.previous_significant_sibling(id).map(|p| tree.node(p).logic());
            match previous {
                Some(BranchLogic::If | BranchLogic::ElseIf) => None,
                Some(BranchLogic::Else) => Some("nothing can follow 'else' in the same chain"),
                _ => Some("'else' without a matching 'if'"),
            }
        }
        BranchLogic::SkipIf => match next_significant(tree, id) {
            None => Some("'skip if' must be followed by a command"),
            Some(next) if !tree.node(next).is_standard() => Some("'skip if' must be followed by a command"),
            Some(next) if tree.node(next).logic().opens_block() => Some("'skip if' cannot guard a block"),
            Some(next) if tree.node(next).logic() == BranchLogic::SkipIf => {
                Some("'skip if' cannot guard another 'skip if'")
            }
            Some(_) => None,
        },
        _ => None,
    };
    if let Some(message) = message {
        let error = node.error(ErrorKind::Logic, message);
        context.errors.push(error);
    }
}

fn next_significant(tree: &ScriptTree, id: NodeId) -> Option<NodeId> {
    let mut current = tree.next_sibling(id);
    while let Some(sibling) = current {
        let node = tree.node(sibling);
        if node.logic() != BranchLogic::NOP && !node.command.is(CMD_HIDDEN_JUMP) {
            return Some(sibling);
        }
        current = tree.next_sibling(sibling);
    }
    None
}

/// Checks that the script body and every `gosub` target end in a command
/// that leaves them.
pub fn verify_termination(tree: &mut ScriptTree, context: &mut PassContext) {
    let root = tree.root();
    let body = tree.children(root);
    if !body.iter().any(|&id| tree.node(id).is_standard()) {
        return;
    }
    if !terminates(tree, body) {
        let line = body.last().map_or(0, |&last| tree.node(last).line);
        context.errors.push(
            ScriptError::new(ErrorKind::Logic, "the script can reach its end without a 'return'").on_line(line),
        );
    }

    let mut checked = HashSet::new();
    for id in tree.pre_order() {
        let command = &tree.node(id).command;
        if !command.is_goto() || !command.is(CMD_GOTO_SUB) {
            continue;
        }
        let label = match tree.node(id).jump_target {
            Some(label) => label,
            None => continue,
        };
        if !checked.insert(label) {
            continue;
        }
        if !subroutine_terminates(tree, label) {
            let node = tree.node(label);
            let name = node.command.parameters.first().and_then(|p| p.label_name()).unwrap_or_default();
            let error = node.error(
                ErrorKind::Logic,
                format!("subroutine '{}' can reach its end without an 'endsub'", name),
            );
            context.errors.push(error);
        }
    }
}

fn subroutine_terminates(tree: &ScriptTree, label: NodeId) -> bool {
    let parent = match tree.parent(label) {
        Some(parent) => parent,
        None => return false,
    };
    let siblings = tree.children(parent);
    let start = match siblings.iter().position(|&s| s == label) {
        Some(position) => position + 1,
        None => return false,
    };
    let section = &siblings[start..];
    let length = section
        .iter()
        .position(|&s| tree.node(s).command.is(CMD_DEFINE_LABEL))
        .unwrap_or(section.len());
    terminates(tree, &section[..length])
}

/// Whether the last executable command of `nodes` leaves through a return,
/// endsub or goto.
fn terminates(tree: &ScriptTree, nodes: &[NodeId]) -> bool {
    let significant: Vec<NodeId> = nodes
        .iter()
        .copied()
        .filter(|&id| {
            let node = tree.node(id);
            node.logic() != BranchLogic::NOP && !node.command.is(CMD_HIDDEN_JUMP)
        })
        .collect();
    let (&last, before) = match significant.split_last() {
        Some(split) => split,
        None => return false,
    };

    match tree.node(last).logic() {
        BranchLogic::None => {
            let guarded = before
                .last()
                .map_or(false, |&previous| tree.node(previous).logic() == BranchLogic::SkipIf);
            let command = &tree.node(last).command;
            !guarded && (command.is(CMD_RETURN) || command.is(CMD_END_SUB) || command.is(CMD_GOTO_LABEL))
        }
        BranchLogic::End => chain_terminates(tree, before),
        _ => false,
    }
}

/// Whether the `if` chain ending `nodes` has an `else` and every branch
/// leaves.
fn chain_terminates(tree: &ScriptTree, nodes: &[NodeId]) -> bool {
    let mut has_else = false;
    for &id in nodes.iter().rev() {
        let logic = tree.node(id).logic();
        if !matches!(logic, BranchLogic::If | BranchLogic::ElseIf | BranchLogic::Else) {
            return false;
        }
        if !terminates(tree, tree.children(id)) {
            return false;
        }
        has_else |= logic == BranchLogic::Else;
        if logic == BranchLogic::If {
            return has_else;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use crate::config::Preferences;
    use crate::error::ErrorKind;
    use crate::passes::testing::{run_passes, script, Outcome};
    use crate::passes::Pass;

    fn check(source: &str) -> Outcome {
        run_passes(
            source,
            script(),
            Preferences::default(),
            &[Pass::VariableIdentifier, Pass::NodeLinker, Pass::LogicVerifier, Pass::TerminationVerifier],
        )
    }

    fn messages(outcome: &Outcome) -> Vec<(usize, String)> {
        outcome.errors.iter().map(|e| (e.line, e.message.clone())).collect()
    }

    #[test]
    fn break_outside_a_loop_is_rejected() {
        let outcome = check("if $a\nbreak\nend\ncontinue\nreturn null");
        let errors = messages(&outcome);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].0, 2);
        assert!(errors[1].1.contains("continue"));
        assert!(outcome.errors.iter().all(|e| e.kind == ErrorKind::Logic));
    }

    #[test]
    fn skip_if_must_guard_a_single_command() {
        let outcome = check("skip if $a\nwhile $b\nend\nskip if $a\n* note\n$b = 1\nreturn $b");
        assert_eq!(messages(&outcome), vec![(1, "'skip if' cannot guard a block".to_string())]);

        let outcome = check("while $b\nskip if $a\nend\nreturn null");
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors.iter().next().unwrap().line, 2);
    }

    #[test]
    fn well_formed_chains_pass() {
        let outcome = check("if $a\n$b = 1\nelse if $c\n$b = 2\nelse\n$b = 3\nend\nreturn $b");
        assert!(outcome.errors.is_empty(), "{}", outcome.errors);
    }

    #[test]
    fn scripts_must_return() {
        let outcome = check("$a = 1\nwrite to player logbook $a");
        assert_eq!(messages(&outcome).len(), 1);
        assert_eq!(outcome.errors.iter().next().unwrap().line, 2);

        assert!(check("").errors.is_empty());
        assert!(check("* only a comment").errors.is_empty());
        assert!(check("top:\n$a = 1\ngoto label top").errors.is_empty());
        assert_eq!(check("return 1\n$a = 2").errors.len(), 1);
    }

    #[test]
    fn guarded_return_does_not_count() {
        let outcome = check("skip if $a\nreturn 1");
        assert_eq!(outcome.errors.len(), 1);
    }

    #[test]
    fn if_chains_terminate_only_with_an_else() {
        assert_eq!(check("if $a\nreturn 1\nelse if $b\nreturn 2\nend").errors.len(), 1);
        assert!(check("if $a\nreturn 1\nelse if $b\nreturn 2\nelse\nreturn 3\nend").errors.is_empty());
        assert_eq!(check("if $a\nreturn 1\nelse\n$b = 1\nend").errors.len(), 1);
    }

    #[test]
    fn subroutines_must_end() {
        let source = "gosub check:\nreturn null\ncheck:\n$a = 1\nendsub";
        assert!(check(source).errors.is_empty());

        let outcome = check("gosub check:\nreturn null\ncheck:\n$a = 1\nother:\nendsub");
        assert_eq!(messages(&outcome).len(), 1);
        assert_eq!(outcome.errors.iter().next().unwrap().line, 3);
        assert!(outcome.errors.iter().next().unwrap().message.contains("'check'"));
    }
}
