//! Command syntaxes and the token trie that recognises them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CatalogError;
use crate::lexer;
use crate::token::{Kind, Token};
use crate::types::{ExecutionMode, GameVersion, ParameterRole, VargPadding};

pub const CMD_NOP: u16 = 0;
pub const CMD_DEFINE_LABEL: u16 = 1;
pub const CMD_GOTO_LABEL: u16 = 2;
pub const CMD_GOTO_SUB: u16 = 3;
pub const CMD_END_SUB: u16 = 4;
pub const CMD_HIDDEN_JUMP: u16 = 5;
pub const CMD_CALL_SCRIPT: u16 = 102;
pub const CMD_RETURN: u16 = 103;
pub const CMD_EXPRESSION: u16 = 104;
pub const CMD_COMMENT: u16 = 105;
pub const CMD_COMMAND_COMMENT: u16 = 106;
pub const CMD_END: u16 = 111;
pub const CMD_ELSE: u16 = 112;
pub const CMD_BREAK: u16 = 113;
pub const CMD_CONTINUE: u16 = 114;
pub const CMD_ARRAY_ALLOC: u16 = 120;
pub const CMD_ARRAY_GET: u16 = 121;
pub const CMD_ARRAY_SET: u16 = 122;
pub const CMD_ARRAY_SIZE: u16 = 123;
pub const CMD_DIM: u16 = 130;
pub const CMD_FOR_LOOP: u16 = 131;
pub const CMD_FOR_EACH: u16 = 132;
pub const CMD_FOR_EACH_COUNTER: u16 = 133;

/// Commands expanded into other commands before linking.
pub const MACRO_COMMANDS: [u16; 4] = [CMD_DIM, CMD_FOR_LOOP, CMD_FOR_EACH, CMD_FOR_EACH_COUNTER];

const SCRIPT_CALL_ARGUMENTS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSyntax {
    pub role: ParameterRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VargDefinition {
    pub max: usize,
    pub padding: VargPadding,
}

fn all_versions() -> u8 {
    GameVersion::ALL
}

/// One catalog entry as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxDefinition {
    pub id: u16,
    pub text: String,
    #[serde(default)]
    pub params: Vec<ParameterSyntax>,
    #[serde(default)]
    pub varg: Option<VargDefinition>,
    #[serde(default)]
    pub execution: ExecutionMode,
    #[serde(default = "all_versions")]
    pub versions: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SyntaxKey {
    Literal(String),
    Parameter,
}

/// A registered command syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSyntax {
    pub id: u16,
    pub text: String,
    /// Physical order.
    pub parameters: Vec<ParameterSyntax>,
    /// Physical indices in the order their markers appear in `text`.
    pub display_order: Vec<usize>,
    pub varg: Option<VargDefinition>,
    pub execution: ExecutionMode,
    pub versions: u8,
    path: Vec<SyntaxKey>,
}

impl CommandSyntax {
    pub fn from_definition(definition: SyntaxDefinition) -> Result<Self, CatalogError> {
        let invalid = |message: String| CatalogError::InvalidSyntax {
            id: definition.id,
            message,
        };
        let tokens = lexer::tokenize(&definition.text, false)
            .map_err(|e| invalid(e.to_string()))?;
        let tokens = tokens.as_slice();

        let mut display_order = Vec::new();
        let mut path = Vec::new();
        let mut skip_next = false;
        for (position, token) in tokens.iter().enumerate() {
            if skip_next {
                skip_next = false;
                continue;
            }
            if token.is_whitespace() {
                continue;
            }
            match marker_index(token) {
                Some(index) => {
                    let parameter = definition
                        .params
                        .get(index)
                        .ok_or_else(|| invalid(format!("marker ${} has no parameter", index)))?;
                    if parameter.role.is_return_value() {
                        return Err(invalid(format!("return value ${} cannot appear in the text", index)));
                    }
                    display_order.push(index);
                    path.push(SyntaxKey::Parameter);
                    if parameter.role == ParameterRole::ReferenceObject {
                        path.push(SyntaxKey::Literal("->".to_string()));
                    }
                    // `$0:` is a label parameter; the colon belongs to the label token.
                    if let Some(next) = tokens.get(position + 1) {
                        if next.kind() == Kind::Keyword && next.text() == ":" {
                            skip_next = true;
                        }
                    }
                }
                None => path.push(SyntaxKey::Literal(token.text().to_lowercase())),
            }
        }

        let return_values = definition
            .params
            .iter()
            .filter(|p| p.role.is_return_value())
            .count();
        if display_order.len() + return_values < definition.params.len() {
            return Err(invalid("not every parameter appears in the text".to_string()));
        }

        Ok(Self {
            id: definition.id,
            text: definition.text,
            parameters: definition.params,
            display_order,
            varg: definition.varg,
            execution: definition.execution,
            versions: definition.versions,
            path,
        })
    }

    pub fn return_value_index(&self) -> Option<usize> {
        self.parameters.iter().position(|p| p.role.is_return_value())
    }

    pub fn return_value_role(&self) -> Option<ParameterRole> {
        self.return_value_index().map(|i| self.parameters[i].role)
    }

    pub fn is_varg(&self) -> bool {
        self.varg.is_some()
    }

    pub fn is_concurrent(&self) -> bool {
        self.execution == ExecutionMode::Concurrent
    }

    pub fn is_compatible(&self, version: GameVersion) -> bool {
        version.is_in(self.versions)
    }

    pub fn is_script_call(&self) -> bool {
        self.id == CMD_CALL_SCRIPT
    }

    pub fn is_expression(&self) -> bool {
        self.id == CMD_EXPRESSION
    }

    pub fn is_macro(&self) -> bool {
        MACRO_COMMANDS.contains(&self.id)
    }

    pub fn is_loop_macro(&self) -> bool {
        matches!(self.id, CMD_FOR_LOOP | CMD_FOR_EACH | CMD_FOR_EACH_COUNTER)
    }

    /// Syntaxes without text never come from source lines.
    pub fn is_hidden(&self) -> bool {
        self.path.is_empty()
    }
}

fn marker_index(token: &Token) -> Option<usize> {
    if token.kind() != Kind::Variable {
        return None;
    }
    let value = token.value_text();
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

#[derive(Debug, Clone, Default)]
struct SyntaxNode {
    children: HashMap<SyntaxKey, SyntaxNode>,
    syntax: Option<u16>,
}

/// Result of a successful trie walk.
#[derive(Debug, Clone)]
pub struct LookupMatch {
    pub syntax: Arc<CommandSyntax>,
    /// Tokens consumed by parameter branches, in display order.
    pub parameters: Vec<Token>,
    /// Number of input tokens the walk consumed; the rest are variable arguments.
    pub consumed: usize,
}

/// All known syntaxes, indexed by ID and by token sequence.
#[derive(Debug, Clone)]
pub struct SyntaxLibrary {
    syntaxes: HashMap<u16, Arc<CommandSyntax>>,
    root: SyntaxNode,
}

impl Default for SyntaxLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxLibrary {
    /// A library holding the built-in structural commands and macros.
    pub fn new() -> Self {
        let mut library = Self::empty();
        for definition in core_definitions() {
            if let Err(e) = library.register(definition) {
                log::error!("core syntax rejected: {}", e);
            }
        }
        library
    }

    pub fn empty() -> Self {
        Self {
            syntaxes: HashMap::new(),
            root: SyntaxNode::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.syntaxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.syntaxes.is_empty()
    }

    pub fn register(&mut self, definition: SyntaxDefinition) -> Result<(), CatalogError> {
        let syntax = CommandSyntax::from_definition(definition)?;
        if self.syntaxes.contains_key(&syntax.id) {
            return Err(CatalogError::DuplicateSyntaxId(syntax.id));
        }

        if !syntax.is_hidden() {
            let mut node = &mut self.root;
            for key in &syntax.path {
                node = node.children.entry(key.clone()).or_default();
            }
            if let Some(existing) = node.syntax {
                return Err(CatalogError::DuplicateSyntaxPath {
                    existing,
                    new: syntax.id,
                });
            }
            node.syntax = Some(syntax.id);
        }

        log::trace!("registered syntax {} '{}'", syntax.id, syntax.text);
        self.syntaxes.insert(syntax.id, Arc::new(syntax));
        Ok(())
    }

    pub fn get(&self, id: u16) -> Option<Arc<CommandSyntax>> {
        self.syntaxes.get(&id).cloned()
    }

    /// Walks the trie over `tokens`, preferring literal branches over the
    /// parameter branch.
    pub fn lookup(&self, tokens: &[Token], version: GameVersion) -> Option<LookupMatch> {
        let mut node = &self.root;
        let mut parameters = Vec::new();

        for (position, token) in tokens.iter().enumerate() {
            if let Some(found) = self.varg_at(node) {
                return self.accept(found, parameters, position, version);
            }

            let literal = SyntaxKey::Literal(token.text().to_lowercase());
            if let Some(next) = node.children.get(&literal) {
                node = next;
                continue;
            }
            if token.is_parameter() {
                if let Some(next) = node.children.get(&SyntaxKey::Parameter) {
                    parameters.push(token.clone());
                    node = next;
                    continue;
                }
            }
            return None;
        }

        let found = self.get(node.syntax?)?;
        self.accept(found, parameters, tokens.len(), version)
    }

    fn varg_at(&self, node: &SyntaxNode) -> Option<Arc<CommandSyntax>> {
        node.syntax
            .and_then(|id| self.get(id))
            .filter(|syntax| syntax.is_varg())
    }

    fn accept(
        &self,
        syntax: Arc<CommandSyntax>,
        parameters: Vec<Token>,
        consumed: usize,
        version: GameVersion,
    ) -> Option<LookupMatch> {
        if !syntax.is_compatible(version) {
            return None;
        }
        Some(LookupMatch {
            syntax,
            parameters,
            consumed,
        })
    }
}

fn core(id: u16, text: &str, roles: &[ParameterRole]) -> SyntaxDefinition {
    SyntaxDefinition {
        id,
        text: text.to_string(),
        params: roles.iter().map(|&role| ParameterSyntax { role }).collect(),
        varg: None,
        execution: ExecutionMode::Serial,
        versions: GameVersion::ALL,
    }
}

fn core_definitions() -> Vec<SyntaxDefinition> {
    use ParameterRole::*;

    let mut call_script = core(
        CMD_CALL_SCRIPT,
        "$1 call script $2 :",
        &[ReturnValueIfStart, ReferenceObject, ScriptName],
    );
    call_script.execution = ExecutionMode::Either;
    call_script.varg = Some(VargDefinition {
        max: SCRIPT_CALL_ARGUMENTS,
        padding: VargPadding::StopEarly,
    });

    let mut dim = core(CMD_DIM, "dim", &[ReturnValue]);
    dim.varg = Some(VargDefinition {
        max: SCRIPT_CALL_ARGUMENTS,
        padding: VargPadding::StopEarly,
    });

    vec![
        core(CMD_NOP, "", &[]),
        core(CMD_COMMENT, "", &[Comment]),
        core(CMD_HIDDEN_JUMP, "", &[LabelNumber]),
        core(CMD_EXPRESSION, "", &[ReturnValueIf]),
        core(CMD_DEFINE_LABEL, "$0:", &[LabelName]),
        core(CMD_GOTO_LABEL, "goto label $0", &[LabelNumber]),
        core(CMD_GOTO_SUB, "gosub $0:", &[LabelNumber]),
        core(CMD_END_SUB, "endsub", &[]),
        core(CMD_RETURN, "return $0", &[Value]),
        core(CMD_END, "end", &[]),
        core(CMD_ELSE, "else", &[]),
        core(CMD_BREAK, "break", &[]),
        core(CMD_CONTINUE, "continue", &[]),
        call_script,
        core(CMD_ARRAY_ALLOC, "array alloc: size=$1", &[ReturnValue, Value]),
        core(CMD_ARRAY_GET, "$1[$2]", &[ReturnValue, Value, Value]),
        core(CMD_ARRAY_SET, "$0[$1] = $2", &[Value, Value, Value]),
        core(CMD_ARRAY_SIZE, "size of array $1", &[ReturnValueIf, Value]),
        dim,
        core(CMD_FOR_LOOP, "for $0 = $1 to $2 step $3", &[Value, Value, Value, Value]),
        core(CMD_FOR_EACH, "for each $0 in array $1", &[Value, Value]),
        core(
            CMD_FOR_EACH_COUNTER,
            "for each $0 in array $1 using counter $2",
            &[Value, Value, Value],
        ),
    ]
}
