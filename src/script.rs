//! Per-script symbol tables and the signatures of scripts that may be called.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{CompilerError, ErrorKind, ScriptError};
use crate::types::{DataType, GameVersion};

/// Declared type of a script argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgumentType {
    Value,
    Number,
    String,
    Boolean,
    Ware,
    Race,
    Relation,
    Sector,
    ObjectClass,
    Object,
}

impl ArgumentType {
    pub fn from_name(name: &str) -> Option<ArgumentType> {
        let found = match name.to_lowercase().as_str() {
            "value" | "var" => ArgumentType::Value,
            "number" | "int" => ArgumentType::Number,
            "string" => ArgumentType::String,
            "boolean" | "bool" => ArgumentType::Boolean,
            "ware" => ArgumentType::Ware,
            "race" => ArgumentType::Race,
            "relation" => ArgumentType::Relation,
            "sector" => ArgumentType::Sector,
            "class" | "objectclass" => ArgumentType::ObjectClass,
            "object" | "ship" | "station" => ArgumentType::Object,
            _ => return None,
        };
        Some(found)
    }

    /// Whether a value of `data_type` can be passed for this argument.
    /// Variables and null are checked at runtime, so they always pass.
    pub fn accepts(&self, data_type: DataType) -> bool {
        if matches!(data_type, DataType::Variable | DataType::Null) {
            return true;
        }
        match self {
            ArgumentType::Value => true,
            ArgumentType::Number => data_type == DataType::Integer,
            ArgumentType::String => data_type == DataType::String,
            ArgumentType::Boolean => matches!(data_type, DataType::Integer | DataType::Constant),
            ArgumentType::Ware => data_type == DataType::Ware,
            ArgumentType::Race => data_type == DataType::Race,
            ArgumentType::Relation => data_type == DataType::Relation,
            ArgumentType::Sector => data_type == DataType::Sector,
            ArgumentType::ObjectClass => data_type == DataType::ObjectClass,
            ArgumentType::Object => data_type == DataType::Constant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptArgument {
    pub name: String,
    #[serde(rename = "type")]
    pub arg_type: ArgumentType,
    #[serde(default)]
    pub description: String,
}

impl ScriptArgument {
    pub fn new(name: &str, arg_type: ArgumentType) -> Self {
        Self {
            name: name.to_string(),
            arg_type,
            description: String::new(),
        }
    }
}

/// Variable names and their slot IDs, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    names: Vec<String>,
    ids: HashMap<String, u16>,
    assignments: HashMap<String, usize>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slot ID for `name`, allocating one on first use.
    pub fn add(&mut self, name: &str) -> Result<u16, ScriptError> {
        if let Some(id) = self.ids.get(name) {
            return Ok(*id);
        }
        let id = u16::try_from(self.names.len())
            .map_err(|_| ScriptError::new(ErrorKind::Algorithm, format!("no variable slot left for ${}", name)))?;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        log::trace!("variable ${} -> {}", name, id);
        Ok(id)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    pub fn id(&self, name: &str) -> Option<u16> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: u16) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn count_assignment(&mut self, name: &str) {
        *self.assignments.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Number of commands that assign to `name`. Loop macros count for
    /// their iteration variables.
    pub fn assignments(&self, name: &str) -> usize {
        self.assignments.get(name).copied().unwrap_or(0)
    }
}

/// Label definitions and the line each is defined on.
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    lines: HashMap<String, usize>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a definition; on a duplicate returns the line of the first one.
    pub fn add(&mut self, name: &str, line: usize) -> Result<(), usize> {
        match self.lines.get(name) {
            Some(existing) => Err(*existing),
            None => {
                self.lines.insert(name.to_string(), line);
                Ok(())
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lines.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSignature {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<ScriptArgument>,
}

/// Scripts that may be the target of `call script`.
#[derive(Debug, Clone, Default)]
pub struct ScriptCallTable {
    scripts: HashMap<String, ScriptSignature>,
}

impl ScriptCallTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, CompilerError> {
        let signatures: Vec<ScriptSignature> = serde_json::from_str(text)?;
        let mut table = ScriptCallTable::new();
        for signature in signatures {
            table.add(signature);
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, CompilerError> {
        if !path.exists() {
            return Err(CompilerError::FileNotFound(path.display().to_string()));
        }
        ScriptCallTable::from_json(&fs::read_to_string(path)?)
    }

    pub fn add(&mut self, signature: ScriptSignature) {
        self.scripts.insert(signature.name.to_lowercase(), signature);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scripts.contains_key(&name.to_lowercase())
    }

    pub fn find(&self, name: &str) -> Option<&ScriptSignature> {
        self.scripts.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

/// The script being compiled together with its symbol tables.
#[derive(Debug, Clone, Default)]
pub struct ScriptFile {
    pub name: String,
    pub version: GameVersion,
    pub description: String,
    pub arguments: Vec<ScriptArgument>,
    pub variables: VariableTable,
    pub labels: LabelTable,
    pub script_calls: ScriptCallTable,
}

impl ScriptFile {
    pub fn new(name: &str, version: GameVersion) -> Self {
        Self {
            name: name.to_string(),
            version,
            ..Default::default()
        }
    }

    pub fn add_argument(&mut self, argument: ScriptArgument) {
        self.arguments.push(argument);
    }

    pub fn is_argument(&self, name: &str) -> bool {
        self.arguments.iter().any(|a| a.name == name)
    }
}
