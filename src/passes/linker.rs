//! Resolves jump targets and inserts the unconditional jumps that close
//! conditional branches and loops.

use super::PassContext;
use crate::catalog::syntax::{CMD_HIDDEN_JUMP, CMD_RETURN};
use crate::command::Command;
use crate::error::ErrorKind;
use crate::tree::{NodeId, ScriptTree};
use crate::types::BranchLogic;

pub fn link(tree: &mut ScriptTree, id: NodeId, context: &mut PassContext) {
    match tree.node(id).logic() {
        BranchLogic::If | BranchLogic::ElseIf => link_conditional(tree, id, context),
        BranchLogic::SkipIf => {
            let target = tree.next_standard_after(id).or_else(|| tree.next_node_after(id));
            set_target(tree, id, target, context);
        }
        BranchLogic::While => {
            let target = tree.next_standard_after(id).or_else(|| tree.next_node_after(id));
            set_target(tree, id, target, context);
            let position = tree.children(id).len();
            insert_jump(tree, id, position, id, context);
        }
        // Misplaced break and continue are reported by the logic verifier.
        BranchLogic::Break => {
            let target = tree
                .find_ancestor(id, BranchLogic::While)
                .and_then(|loop_node| tree.next_standard_after(loop_node).or_else(|| tree.next_node_after(loop_node)));
            if let Some(target) = target {
                tree.node_mut(id).jump_target = Some(target);
                insert_jump(tree, id, 0, target, context);
            }
        }
        BranchLogic::Continue => {
            if let Some(target) = tree.find_ancestor(id, BranchLogic::While) {
                tree.node_mut(id).jump_target = Some(target);
                insert_jump(tree, id, 0, target, context);
            }
        }
        BranchLogic::None if tree.node(id).command.is_goto() => link_goto(tree, id, context),
        _ => {}
    }
}

fn link_conditional(tree: &mut ScriptTree, id: NodeId, context: &mut PassContext) {
    let alternate = tree.conditional_alternate(id);
    let end = tree.conditional_end(id);
    let target = alternate.or(end).or_else(|| tree.next_node_after(id));
    set_target(tree, id, target, context);

    let end = match (alternate, end) {
        (Some(_), Some(end)) => end,
        _ => return,
    };
    let returns = tree
        .last_executable_child(id)
        .map_or(false, |last| tree.node(last).command.is(CMD_RETURN));
    if context.preferences.validation_mode && returns {
        return;
    }
    let position = tree.children(id).len();
    insert_jump(tree, id, position, end, context);
}

fn link_goto(tree: &mut ScriptTree, id: NodeId, context: &mut PassContext) {
    let name = match tree.node(id).command.parameters.iter().find_map(|p| p.label_name()) {
        Some(name) => name.to_string(),
        None => return,
    };
    match tree.find_label(&name) {
        Some(label) => tree.node_mut(id).jump_target = Some(label),
        // Already reported as a lookup error.
        None if !context.script.labels.contains(&name) => {}
        None => {
            let error = tree.node(id).error(ErrorKind::Algorithm, format!("cannot find label '{}'", name));
            context.errors.push(error);
        }
    }
}

fn set_target(tree: &mut ScriptTree, id: NodeId, target: Option<NodeId>, context: &mut PassContext) {
    match target {
        Some(target) => tree.node_mut(id).jump_target = Some(target),
        // A block left open has been reported by the parser.
        None if !context.errors.is_empty() => {}
        None => {
            let error = tree.node(id).error(ErrorKind::Algorithm, "no command to jump to");
            context.errors.push(error);
        }
    }
}

fn insert_jump(tree: &mut ScriptTree, parent: NodeId, position: usize, target: NodeId, context: &mut PassContext) {
    let syntax = match context.catalog.syntaxes.get(CMD_HIDDEN_JUMP) {
        Some(syntax) => syntax,
        None => return,
    };
    let line = tree.node(parent).line;
    let jump = tree.insert_child(parent, position, Command::hidden_jump(syntax), line);
    tree.node_mut(jump).jump_target = Some(target);
}

#[cfg(test)]
mod tests {
    use crate::catalog::syntax::{CMD_HIDDEN_JUMP, CMD_RETURN};
    use crate::config::Preferences;
    use crate::passes::testing::{run_passes, script, Outcome};
    use crate::passes::Pass;
    use crate::tree::NodeId;

    fn link_with(source: &str, preferences: Preferences) -> Outcome {
        run_passes(source, script(), preferences, &[Pass::VariableIdentifier, Pass::NodeLinker])
    }

    fn link(source: &str) -> Outcome {
        link_with(source, Preferences::default())
    }

    fn top(outcome: &Outcome) -> Vec<NodeId> {
        outcome.tree.children(outcome.tree.root()).to_vec()
    }

    #[test]
    fn while_loops_jump_back_to_themselves() {
        let outcome = link("while $x\n$x = $x - 1\nend\nreturn null");
        assert!(outcome.errors.is_empty(), "{}", outcome.errors);
        let tree = &outcome.tree;
        let nodes = top(&outcome);
        let (check, exit) = (nodes[0], nodes[2]);

        assert_eq!(tree.node(check).jump_target, Some(exit));
        assert!(tree.node(exit).command.is(CMD_RETURN));
        let closing = *tree.children(check).last().unwrap();
        assert!(tree.node(closing).command.is(CMD_HIDDEN_JUMP));
        assert_eq!(tree.node(closing).jump_target, Some(check));
    }

    #[test]
    fn branches_jump_to_the_end_of_the_chain() {
        let source = "if $a\nreturn 1\nelse if $b\nreturn 2\nelse\nreturn 3\nend\nreturn null";
        let outcome = link(source);
        assert!(outcome.errors.is_empty(), "{}", outcome.errors);
        let tree = &outcome.tree;
        let nodes = top(&outcome);
        let (first, second, other, end) = (nodes[0], nodes[1], nodes[2], nodes[3]);

        assert_eq!(tree.node(first).jump_target, Some(second));
        assert_eq!(tree.node(second).jump_target, Some(other));
        assert_eq!(tree.node(other).jump_target, None);
        for branch in [first, second] {
            let jump = *tree.children(branch).last().unwrap();
            assert!(tree.node(jump).command.is(CMD_HIDDEN_JUMP));
            assert_eq!(tree.node(jump).jump_target, Some(end));
        }
        assert_eq!(tree.children(other).len(), 1);
    }

    #[test]
    fn validation_mode_skips_jumps_after_return() {
        let preferences = Preferences {
            validation_mode: true,
            ..Preferences::default()
        };
        let outcome = link_with("if $a\nreturn 1\nelse\n$a = 2\nend\nreturn $a", preferences);
        let first = top(&outcome)[0];
        assert_eq!(outcome.tree.children(first).len(), 1);
    }

    #[test]
    fn lone_if_targets_its_end() {
        let outcome = link("if $a\n$a = 1\nend\nreturn $a");
        let nodes = top(&outcome);
        assert_eq!(outcome.tree.node(nodes[0]).jump_target, Some(nodes[1]));
        assert_eq!(outcome.tree.children(nodes[0]).len(), 1);
    }

    #[test]
    fn break_and_continue_get_leading_jumps() {
        let outcome = link("while $x\nif $y\nbreak\nend\ncontinue\nend\nreturn null");
        assert!(outcome.errors.is_empty(), "{}", outcome.errors);
        let tree = &outcome.tree;
        let nodes = top(&outcome);
        let (check, exit) = (nodes[0], nodes[2]);
        let body = tree.children(check).to_vec();
        let stop = tree.children(body[0])[0];
        let again = body[2];

        let jump = tree.children(stop)[0];
        assert!(tree.node(jump).command.is(CMD_HIDDEN_JUMP));
        assert_eq!(tree.node(jump).jump_target, Some(exit));
        assert_eq!(tree.node(stop).jump_target, Some(exit));

        let jump = tree.children(again)[0];
        assert_eq!(tree.node(jump).jump_target, Some(check));
    }

    #[test]
    fn skip_if_targets_the_next_standard_command() {
        let outcome = link("skip if $x > 1000\n* note\nwrite to player logbook $x\nreturn null");
        let nodes = top(&outcome);
        assert_eq!(outcome.tree.node(nodes[0]).jump_target, Some(nodes[2]));
    }

    #[test]
    fn gotos_find_their_label() {
        let outcome = link("goto label done\nreturn 1\ndone:\nreturn 2");
        assert!(outcome.errors.is_empty(), "{}", outcome.errors);
        let nodes = top(&outcome);
        assert_eq!(outcome.tree.node(nodes[0]).jump_target, Some(nodes[2]));
    }
}
