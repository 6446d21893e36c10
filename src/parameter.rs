//! Typed parameter values and their conversion to and from the encoded form.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::bytecode::CompiledParameter;
use crate::catalog::objects::ScriptObjectGroup;
use crate::catalog::Catalog;
use crate::error::{ErrorKind, ScriptError};
use crate::script::ScriptFile;
use crate::token::{Kind, Token};
use crate::types::{DataType, Operator, ParameterRole, ReturnType, ReturnValue};

/// A string or an integer, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i32),
    Str(String),
}

impl ParameterValue {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            ParameterValue::Int(value) => Some(*value),
            ParameterValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::Str(value) => Some(value),
            ParameterValue::Int(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub role: ParameterRole,
    pub data_type: DataType,
    pub value: ParameterValue,
    pub token: Option<Token>,
    /// `name=` prefix of a script-call argument.
    pub argument_name: Option<Token>,
}

/// Lookups needed to turn encoded values back into text.
pub struct TranslateContext<'a> {
    pub catalog: &'a Catalog,
    pub variables: &'a [String],
    /// Jump destination to label name.
    pub labels: &'a HashMap<i32, String>,
}

impl Parameter {
    pub fn new(role: ParameterRole, data_type: DataType, value: ParameterValue) -> Self {
        Self {
            role,
            data_type,
            value,
            token: None,
            argument_name: None,
        }
    }

    pub fn null(role: ParameterRole) -> Self {
        Parameter::new(role, DataType::Null, ParameterValue::Int(0))
    }

    pub fn variable(role: ParameterRole, name: &str) -> Self {
        Parameter::new(role, DataType::Variable, ParameterValue::Str(name.to_string()))
    }

    pub fn integer(role: ParameterRole, value: i32) -> Self {
        Parameter::new(role, DataType::Integer, ParameterValue::Int(value))
    }

    pub fn string(role: ParameterRole, value: &str) -> Self {
        Parameter::new(role, DataType::String, ParameterValue::Str(value.to_string()))
    }

    /// Classifies a token that the caller has already checked against `role`.
    pub fn from_token(role: ParameterRole, token: &Token, catalog: &Catalog) -> Result<Self, ScriptError> {
        let text = token.value_text();
        let (data_type, value) = match (token.kind(), role) {
            (_, ParameterRole::Comment) => (DataType::String, ParameterValue::Str(token.text().to_string())),
            (Kind::Variable, _) => (DataType::Variable, ParameterValue::Str(text.to_string())),
            (Kind::Number, _) => {
                let number = text.parse::<i32>().map_err(|_| {
                    ScriptError::from_token(ErrorKind::Syntax, token, format!("'{}' is out of range", text))
                })?;
                (DataType::Integer, ParameterValue::Int(number))
            }
            (Kind::String, _) => (DataType::String, ParameterValue::Str(text.to_string())),
            (Kind::Null, _) => (DataType::Null, ParameterValue::Int(0)),
            (Kind::GameObject, _) => (DataType::Ware, ParameterValue::Str(text.to_string())),
            (Kind::ScriptObject, _) => {
                let data_type = catalog
                    .script_objects
                    .resolve(text)
                    .map(|(group, _)| group.data_type())
                    .unwrap_or(DataType::Constant);
                (data_type, ParameterValue::Str(text.to_string()))
            }
            (Kind::Label | Kind::Text, ParameterRole::LabelNumber) => {
                (DataType::Integer, ParameterValue::Str(text.to_string()))
            }
            (Kind::Label | Kind::Text, _) => (DataType::String, ParameterValue::Str(text.to_string())),
            (Kind::BinaryOp | Kind::UnaryOp, _) => {
                let unary = token.kind() == Kind::UnaryOp;
                let operator = Operator::from_symbol(token.text(), unary).ok_or_else(|| {
                    ScriptError::from_token(ErrorKind::Syntax, token, format!("unknown operator '{}'", token.text()))
                })?;
                let data_type = if operator.is_unary() {
                    DataType::UnaryOperator
                } else {
                    DataType::Operator
                };
                (data_type, ParameterValue::Int(operator as i32))
            }
            _ => {
                return Err(ScriptError::from_token(
                    ErrorKind::Syntax,
                    token,
                    format!("'{}' cannot be used as a parameter", token.text()),
                ))
            }
        };
        Ok(Self {
            role,
            data_type,
            value,
            token: Some(token.clone()),
            argument_name: None,
        })
    }

    pub fn is_return_value(&self) -> bool {
        self.role.is_return_value()
    }

    /// Decoded return value, once the value is no longer a variable name.
    pub fn return_value(&self) -> Option<ReturnValue> {
        if !self.is_return_value() {
            return None;
        }
        self.value.as_int().and_then(ReturnValue::decode)
    }

    /// Assignment target name of an unresolved return value.
    pub fn assigned_name(&self) -> Option<&str> {
        if self.is_return_value() && self.data_type == DataType::Variable {
            self.value.as_str()
        } else {
            None
        }
    }

    pub fn variable_name(&self) -> Option<&str> {
        match (self.data_type, &self.value) {
            (DataType::Variable, ParameterValue::Str(name)) => Some(name),
            _ => None,
        }
    }

    /// Label referenced by a goto/gosub.
    pub fn label_name(&self) -> Option<&str> {
        match self.role {
            ParameterRole::LabelNumber | ParameterRole::LabelName => self.value.as_str(),
            _ => None,
        }
    }

    /// Infix and postfix elements compare on type and value only.
    pub fn same_value(&self, other: &Parameter) -> bool {
        self.data_type == other.data_type && self.value == other.value
    }

    /// Source position for diagnostics.
    pub fn locate(&self, error: ScriptError) -> ScriptError {
        match &self.token {
            Some(token) => error.with_text(token.text(), token.range()),
            None => error,
        }
    }

    /// Text as written in a command line.
    pub fn display_text(&self) -> String {
        let text = match (self.data_type, &self.value) {
            _ if self.role == ParameterRole::Comment => self.value.as_str().unwrap_or_default().to_string(),
            (_, ParameterValue::Str(label)) if self.role == ParameterRole::LabelNumber => label.clone(),
            (_, ParameterValue::Str(label)) if self.role == ParameterRole::LabelName => label.clone(),
            (DataType::Variable, ParameterValue::Str(name)) => format!("${}", name),
            (DataType::String, ParameterValue::Str(text)) => format!("'{}'", text),
            (DataType::Ware, ParameterValue::Str(name)) => format!("{{{}}}", name),
            (data_type, ParameterValue::Str(name)) if data_type.is_script_object() => format!("[{}]", name),
            (DataType::Null, _) => "null".to_string(),
            (DataType::Operator | DataType::UnaryOperator, ParameterValue::Int(code)) => Operator::from_code(*code)
                .map(|op| op.symbol().to_string())
                .unwrap_or_else(|| code.to_string()),
            (_, ParameterValue::Int(value)) => value.to_string(),
            (_, ParameterValue::Str(text)) => text.clone(),
        };
        self.decorate(text)
    }

    fn decorate(&self, text: String) -> String {
        if self.role == ParameterRole::ReferenceObject {
            format!("{}->", text)
        } else {
            text
        }
    }

    /// Encodes the parameter. `destination` is the jump index for label and
    /// conditional roles; it is only optional for commented rows.
    pub fn generate(
        &self,
        catalog: &Catalog,
        script: &ScriptFile,
        destination: Option<u16>,
        commented: bool,
    ) -> Result<CompiledParameter, ScriptError> {
        if self.is_return_value() {
            return self.generate_return_value(script, destination, commented);
        }
        if self.role == ParameterRole::LabelNumber {
            return match destination {
                Some(index) => Ok(CompiledParameter::int(DataType::Integer, index as i32)),
                None if commented => Ok(CompiledParameter::int(DataType::Integer, 0)),
                None => Err(self.locate(ScriptError::new(
                    ErrorKind::Algorithm,
                    format!("label '{}' was never linked", self.display_text()),
                ))),
            };
        }

        match (self.data_type, &self.value) {
            (DataType::Variable, ParameterValue::Str(name)) => match script.variables.id(name) {
                Some(id) => Ok(CompiledParameter::int(DataType::Variable, id as i32)),
                None => Err(self.locate(ScriptError::new(
                    ErrorKind::Lookup,
                    format!("unknown variable ${}", name),
                ))),
            },
            (DataType::Ware, ParameterValue::Str(name)) => match catalog.game_objects.resolve(name) {
                Some(id) => Ok(CompiledParameter::int(DataType::Ware, id)),
                None => Err(self.locate(ScriptError::new(
                    ErrorKind::Lookup,
                    format!("unknown game object {{{}}}", name),
                ))),
            },
            (data_type, ParameterValue::Str(name)) if data_type.is_script_object() => {
                match catalog.script_objects.resolve(name) {
                    Some((group, id)) => Ok(CompiledParameter::int(group.data_type(), id)),
                    None => Err(self.locate(ScriptError::new(
                        ErrorKind::Lookup,
                        format!("unknown script object [{}]", name),
                    ))),
                }
            }
            _ => Ok(CompiledParameter::new(self.data_type, self.value.clone())),
        }
    }

    fn generate_return_value(
        &self,
        script: &ScriptFile,
        destination: Option<u16>,
        commented: bool,
    ) -> Result<CompiledParameter, ScriptError> {
        let value = match &self.value {
            ParameterValue::Str(name) => match script.variables.id(name) {
                Some(id) => ReturnValue::assignment(id),
                None => {
                    return Err(self.locate(ScriptError::new(
                        ErrorKind::Lookup,
                        format!("unknown variable ${}", name),
                    )))
                }
            },
            ParameterValue::Int(encoded) => {
                let mut value = ReturnValue::decode(*encoded).ok_or_else(|| {
                    ScriptError::new(ErrorKind::Algorithm, format!("malformed return value {:#x}", encoded))
                })?;
                if value.return_type == ReturnType::Jump {
                    value.destination = match destination {
                        Some(index) => index,
                        None if commented => 0,
                        None => {
                            return Err(self.locate(ScriptError::new(
                                ErrorKind::Algorithm,
                                "conditional has no jump destination",
                            )))
                        }
                    };
                }
                value
            }
        };
        Ok(CompiledParameter::int(DataType::Variable, value.encode()))
    }

    /// Decodes an encoded parameter back into display text.
    pub fn translate(
        role: ParameterRole,
        compiled: &CompiledParameter,
        context: &TranslateContext,
    ) -> String {
        let value = compiled.as_int();
        let text = match (role, compiled.data_type, &compiled.value) {
            (ParameterRole::Comment | ParameterRole::LabelName, _, ParameterValue::Str(text)) => text.clone(),
            (ParameterRole::LabelNumber, _, ParameterValue::Int(index)) => context
                .labels
                .get(index)
                .cloned()
                .unwrap_or_else(|| index.to_string()),
            (_, DataType::Variable, ParameterValue::Int(id)) if role.is_return_value() => {
                match ReturnValue::decode(*id) {
                    Some(rv) if rv.return_type == ReturnType::Assignment => {
                        variable_text(context.variables, rv.destination as i32)
                    }
                    _ => String::new(),
                }
            }
            (_, DataType::Variable, ParameterValue::Int(id)) => variable_text(context.variables, *id),
            (_, DataType::String, ParameterValue::Str(text)) => format!("'{}'", text),
            (_, DataType::Null, _) => "null".to_string(),
            (_, DataType::Ware, ParameterValue::Int(id)) => {
                format!("{{{}}}", context.catalog.game_objects.describe(*id))
            }
            (_, DataType::Operator | DataType::UnaryOperator, ParameterValue::Int(code)) => {
                Operator::from_code(*code)
                    .map(|op| op.symbol().to_string())
                    .unwrap_or_else(|| code.to_string())
            }
            (_, data_type, ParameterValue::Int(id)) if data_type.is_script_object() => {
                match ScriptObjectGroup::from_data_type(data_type) {
                    Some(group) => format!("[{}]", context.catalog.script_objects.describe(group, *id)),
                    None => id.to_string(),
                }
            }
            (_, _, ParameterValue::Str(text)) => text.clone(),
            _ => value.map(|v| v.to_string()).unwrap_or_default(),
        };
        if role == ParameterRole::ReferenceObject {
            format!("{}->", text)
        } else {
            text
        }
    }
}

fn variable_text(variables: &[String], id: i32) -> String {
    match usize::try_from(id).ok().and_then(|i| variables.get(i)) {
        Some(name) => format!("${}", name),
        None => format!("$var{}", id),
    }
}
