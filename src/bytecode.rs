use serde::{Deserialize, Serialize};

use crate::parameter::ParameterValue;
use crate::script::ScriptArgument;
use crate::types::{DataType, GameVersion};

/// One encoded parameter: its type tag and value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledParameter {
    pub data_type: DataType,
    pub value: ParameterValue,
}

impl CompiledParameter {
    pub fn new(data_type: DataType, value: ParameterValue) -> Self {
        Self { data_type, value }
    }

    pub fn int(data_type: DataType, value: i32) -> Self {
        Self::new(data_type, ParameterValue::Int(value))
    }

    pub fn as_int(&self) -> Option<i32> {
        self.value.as_int()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Executed by the game; counted by jump destinations.
    Standard,
    /// Kept for display only (comments, `end`, `else`, ...).
    Auxiliary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledCommand {
    pub id: u16,
    pub kind: CommandKind,
    /// Auxiliary rows: index of the standard command that follows them.
    pub reference: Option<usize>,
    pub commented: bool,
    pub parameters: Vec<CompiledParameter>,
    pub line: usize,
}

impl CompiledCommand {
    pub fn is_standard(&self) -> bool {
        self.kind == CommandKind::Standard
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledScript {
    pub name: String,
    pub version: GameVersion,
    pub arguments: Vec<ScriptArgument>,
    /// Variable names indexed by slot ID.
    pub variables: Vec<String>,
    pub commands: Vec<CompiledCommand>,
}

impl CompiledScript {
    pub fn new(name: String, version: GameVersion) -> Self {
        Self {
            name,
            version,
            arguments: Vec::new(),
            variables: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: CompiledCommand) {
        self.commands.push(command);
    }

    pub fn standard_commands(&self) -> impl Iterator<Item = &CompiledCommand> {
        self.commands.iter().filter(|c| c.is_standard())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
