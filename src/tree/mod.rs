//! The parse tree: an arena of command nodes linked by handles.

pub mod expand;

use std::ops::Range;

use crate::command::Command;
use crate::error::{ErrorKind, ErrorList, ScriptError};
use crate::parser::CommandParser;
use crate::types::BranchLogic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Hands out `$XS.IteratorN` names. A scope never reuses a number held by one
/// of its ancestors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameGenerator {
    last: usize,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub command: Command,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub jump_target: Option<NodeId>,
    /// 1-based source line; 0 for the root and synthesized nodes.
    pub line: usize,
    pub extent: Range<usize>,
    /// Position in the flattened command array.
    pub index: Option<usize>,
    /// Position among standard commands; auxiliary nodes take the position
    /// of the standard command that follows them.
    pub standard_index: Option<usize>,
    pub names: NameGenerator,
}

impl Node {
    fn new(command: Command, line: usize, extent: Range<usize>) -> Self {
        Self {
            command,
            parent: None,
            children: Vec::new(),
            jump_target: None,
            line,
            extent,
            index: None,
            standard_index: None,
            names: NameGenerator::default(),
        }
    }

    pub fn logic(&self) -> BranchLogic {
        self.command.logic()
    }

    pub fn is_standard(&self) -> bool {
        self.command.is_standard()
    }

    /// Builds an error located on this node's line.
    pub fn error(&self, kind: ErrorKind, message: impl Into<String>) -> ScriptError {
        ScriptError::new(kind, message)
            .on_line(self.line)
            .with_text(&self.command.text, self.extent.clone())
    }
}

#[derive(Debug, Clone)]
pub struct ScriptTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for ScriptTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(Command::nop(), 0, 0..0)],
            root: NodeId(0),
        }
    }

    /// Parses every line of `source` and nests block bodies under the
    /// command that opens them.
    pub fn parse(source: &str, parser: &CommandParser, errors: &mut ErrorList) -> Self {
        let mut tree = ScriptTree::new();
        let mut blocks: Vec<NodeId> = Vec::new();

        for (number, line) in source.lines().enumerate() {
            let number = number + 1;
            let command = match parser.parse_line(line) {
                Ok(command) => command,
                Err(error) => {
                    errors.push(error.on_line(number).with_text(line.trim(), 0..line.chars().count()));
                    continue;
                }
            };
            let extent = 0..line.chars().count();
            let logic = command.logic();
            let opens_loop = command.is_macro() && command.syntax.as_ref().map_or(false, |s| s.is_loop_macro());
            let parent = blocks.last().copied().unwrap_or(tree.root);

            match logic {
                BranchLogic::If | BranchLogic::While => {
                    let id = tree.add_child(parent, command, number, extent);
                    blocks.push(id);
                }
                _ if opens_loop => {
                    let id = tree.add_child(parent, command, number, extent);
                    blocks.push(id);
                }
                BranchLogic::ElseIf | BranchLogic::Else => {
                    let chained = blocks
                        .last()
                        .map_or(false, |&top| matches!(tree.node(top).logic(), BranchLogic::If | BranchLogic::ElseIf));
                    if chained {
                        blocks.pop();
                    }
                    let parent = blocks.last().copied().unwrap_or(tree.root);
                    let id = tree.add_child(parent, command, number, extent);
                    blocks.push(id);
                }
                BranchLogic::End => match blocks.pop() {
                    Some(_) => {
                        let parent = blocks.last().copied().unwrap_or(tree.root);
                        tree.add_child(parent, command, number, extent);
                    }
                    None => {
                        let id = tree.add_child(parent, command, number, extent);
                        errors.push(tree.node(id).error(ErrorKind::Logic, "'end' without an open block"));
                    }
                },
                _ => {
                    tree.add_child(parent, command, number, extent);
                }
            }
        }

        for open in blocks {
            errors.push(tree.node(open).error(ErrorKind::Logic, "block is missing its 'end'"));
        }
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Creates a node that is not attached anywhere yet.
    pub fn create(&mut self, command: Command, line: usize, extent: Range<usize>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(command, line, extent));
        id
    }

    pub fn add_child(&mut self, parent: NodeId, command: Command, line: usize, extent: Range<usize>) -> NodeId {
        let id = self.create(command, line, extent);
        self.nodes[id.0].parent = Some(parent);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn insert_child(&mut self, parent: NodeId, position: usize, command: Command, line: usize) -> NodeId {
        let id = self.create(command, line, 0..0);
        self.nodes[id.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        children.insert(position.min(children.len()), id);
        id
    }

    /// Replaces the whole child list of `parent`.
    pub fn set_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        for &child in &children {
            self.nodes[child.0].parent = Some(parent);
        }
        self.nodes[parent.0].children = children;
    }

    /// Every node below the root in source order.
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.children(self.root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    pub fn find_ancestor(&self, id: NodeId, logic: BranchLogic) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            if self.node(ancestor).logic() == logic {
                return Some(ancestor);
            }
            current = self.parent(ancestor);
        }
        None
    }

    fn position(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let position = self.children(parent).iter().position(|&c| c == id)?;
        Some((parent, position))
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, position) = self.position(id)?;
        self.children(parent).get(position + 1).copied()
    }

    /// Following siblings that are not comments or blank lines.
    fn significant_siblings_after(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let siblings: &[NodeId] = match self.position(id) {
            Some((parent, position)) => &self.children(parent)[position + 1..],
            None => &[],
        };
        siblings
            .iter()
            .copied()
            .filter(move |&s| self.node(s).logic() != BranchLogic::NOP)
    }

    pub fn next_standard_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, position) = self.position(id)?;
        self.children(parent)[position + 1..]
            .iter()
            .copied()
            .find(|&s| self.node(s).is_standard())
    }

    pub fn previous_standard_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, position) = self.position(id)?;
        self.children(parent)[..position]
            .iter()
            .rev()
            .copied()
            .find(|&s| self.node(s).is_standard())
    }

    /// Previous sibling ignoring comments and blank lines.
    pub fn previous_significant_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, position) = self.position(id)?;
        self.children(parent)[..position]
            .iter()
            .rev()
            .copied()
            .find(|&s| self.node(s).logic() != BranchLogic::NOP)
    }

    /// The next `else if` or `else` of the chain `id` belongs to.
    pub fn conditional_alternate(&self, id: NodeId) -> Option<NodeId> {
        self.significant_siblings_after(id)
            .next()
            .filter(|&s| matches!(self.node(s).logic(), BranchLogic::ElseIf | BranchLogic::Else))
    }

    /// The `end` closing the chain `id` belongs to.
    pub fn conditional_end(&self, id: NodeId) -> Option<NodeId> {
        for sibling in self.significant_siblings_after(id) {
            match self.node(sibling).logic() {
                BranchLogic::ElseIf | BranchLogic::Else => continue,
                BranchLogic::End => return Some(sibling),
                _ => return None,
            }
        }
        None
    }

    pub fn last_executable_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .rev()
            .copied()
            .find(|&c| self.node(c).is_standard())
    }

    pub fn find_label(&self, name: &str) -> Option<NodeId> {
        self.pre_order().into_iter().find(|&id| {
            let command = &self.node(id).command;
            command.is_label() && command.parameters.first().and_then(|p| p.label_name()) == Some(name)
        })
    }

    /// First node after the subtree of `id`, in source order.
    pub fn next_node_after(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            if let Some(next) = self.next_sibling(current) {
                return Some(next);
            }
            current = self.parent(current)?;
            if current == self.root {
                return None;
            }
        }
    }

    /// First standard node after the subtree of `id`, in source order.
    pub fn next_standard_after(&self, id: NodeId) -> Option<NodeId> {
        let mut next = self.next_node_after(id);
        while let Some(candidate) = next {
            if self.node(candidate).is_standard() {
                return Some(candidate);
            }
            next = match self.children(candidate).first() {
                Some(&child) => Some(child),
                None => self.next_node_after(candidate),
            };
        }
        None
    }

    /// Allocates an iterator name unique among `scope` and its ancestors.
    pub fn next_iterator_name(&mut self, scope: NodeId) -> String {
        let mut highest = self.node(scope).names.last;
        let mut current = self.parent(scope);
        while let Some(ancestor) = current {
            highest = highest.max(self.node(ancestor).names.last);
            current = self.parent(ancestor);
        }
        let next = highest + 1;
        self.node_mut(scope).names.last = next;
        format!("XS.Iterator{}", next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_catalog;
    use crate::types::{GameVersion, VargTrimming};

    fn build(source: &str) -> (ScriptTree, ErrorList) {
        let catalog = test_catalog();
        let parser = CommandParser::new(&catalog, GameVersion::AlbionPrelude, VargTrimming::TrailingNulls);
        let mut errors = ErrorList::new();
        let tree = ScriptTree::parse(source, &parser, &mut errors);
        (tree, errors)
    }

    fn texts(tree: &ScriptTree, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|&id| tree.node(id).command.text.clone()).collect()
    }

    const CHAIN: &str = "if $a\n$x = 1\nelse if $b\n* note\n$x = 2\nelse\n$x = 3\nend\nreturn $x";

    #[test]
    fn blocks_nest_and_chains_are_siblings() {
        let (tree, errors) = build(CHAIN);
        assert!(errors.is_empty(), "{}", errors);
        let top = tree.children(tree.root()).to_vec();
        assert_eq!(texts(&tree, &top), vec!["if $a", "else if $b", "else", "end", "return $x"]);
        assert_eq!(texts(&tree, tree.children(top[1])), vec!["* note", "$x = 2"]);
        assert_eq!(tree.node(top[1]).line, 3);
    }

    #[test]
    fn chain_queries() {
        let (tree, _) = build(CHAIN);
        let top = tree.children(tree.root()).to_vec();
        assert_eq!(tree.conditional_alternate(top[0]), Some(top[1]));
        assert_eq!(tree.conditional_alternate(top[1]), Some(top[2]));
        assert_eq!(tree.conditional_alternate(top[2]), None);
        assert_eq!(tree.conditional_end(top[0]), Some(top[3]));
        assert_eq!(tree.next_standard_after(top[0]), Some(top[1]));
        assert_eq!(tree.next_standard_after(top[2]), Some(top[4]));
        assert_eq!(tree.last_executable_child(top[1]), Some(tree.children(top[1])[1]));
        assert_eq!(tree.next_standard_sibling(top[0]), Some(top[1]));
        assert_eq!(tree.previous_standard_sibling(top[4]), Some(top[1]));
    }

    #[test]
    fn ancestors_and_labels() {
        let (tree, errors) = build("main:\nwhile $a\nif $b\nbreak\nend\nend\nreturn null");
        assert!(errors.is_empty(), "{}", errors);
        let top = tree.children(tree.root()).to_vec();
        let inner_if = tree.children(top[1])[0];
        let brk = tree.children(inner_if)[0];
        assert_eq!(tree.find_ancestor(brk, BranchLogic::While), Some(top[1]));
        assert_eq!(tree.find_ancestor(brk, BranchLogic::SkipIf), None);
        assert_eq!(tree.find_label("main"), Some(top[0]));
        assert_eq!(tree.find_label("other"), None);
    }

    #[test]
    fn unbalanced_blocks_are_reported() {
        let (_, errors) = build("end");
        assert_eq!(errors.len(), 1);
        let (_, errors) = build("while $a\n$x = 1");
        assert_eq!(errors.iter().next().unwrap().line, 1);
        let (_, errors) = build("$x = ( 1");
        assert_eq!(errors.iter().next().unwrap().line, 1);
    }

    #[test]
    fn iterator_names_do_not_clash_with_ancestors() {
        let (mut tree, _) = build("while $a\nwhile $b\n$x = 1\nend\nend");
        let outer = tree.children(tree.root())[0];
        let inner = tree.children(outer)[0];
        let root = tree.root();
        assert_eq!(tree.next_iterator_name(root), "XS.Iterator1");
        assert_eq!(tree.next_iterator_name(inner), "XS.Iterator2");
        assert_eq!(tree.next_iterator_name(root), "XS.Iterator2");
        assert_eq!(tree.next_iterator_name(inner), "XS.Iterator3");
    }
}
