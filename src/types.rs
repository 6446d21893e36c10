use serde::{Deserialize, Serialize};

use crate::token::Kind;

/// Type tag of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataType {
    Null = 0,
    Unknown = 1,
    Variable = 2,
    Constant = 3,
    Integer = 4,
    String = 5,
    Sector = 6,
    Ware = 7,
    ObjectClass = 8,
    Race = 9,
    Relation = 10,
    StationSerial = 11,
    TransportClass = 12,
    FlightReturn = 13,
    Operator = 14,
    UnaryOperator = 15,
}

impl DataType {
    /// Types whose values are looked up in the script object library.
    pub fn is_script_object(&self) -> bool {
        matches!(
            self,
            DataType::Constant
                | DataType::Sector
                | DataType::ObjectClass
                | DataType::Race
                | DataType::Relation
                | DataType::StationSerial
                | DataType::TransportClass
                | DataType::FlightReturn
        )
    }
}

/// The syntactic role a parameter plays inside its command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterRole {
    Value,
    ReturnValue,
    ReturnValueIf,
    ReturnValueIfStart,
    InterruptReturnValueIf,
    ReferenceObject,
    LabelName,
    LabelNumber,
    ScriptName,
    Comment,
    VariableArgument,
    StructuralCount,
    ExpressionPostfix,
    ExpressionInfix,
}

impl ParameterRole {
    pub fn is_return_value(&self) -> bool {
        matches!(
            self,
            ParameterRole::ReturnValue
                | ParameterRole::ReturnValueIf
                | ParameterRole::ReturnValueIfStart
                | ParameterRole::InterruptReturnValueIf
        )
    }

    pub fn allows_conditional(&self) -> bool {
        matches!(
            self,
            ParameterRole::ReturnValueIf
                | ParameterRole::ReturnValueIfStart
                | ParameterRole::InterruptReturnValueIf
        )
    }

    pub fn allows_start(&self) -> bool {
        *self == ParameterRole::ReturnValueIfStart
    }

    /// Whether a token of this kind may fill a slot with this role.
    pub fn accepts(&self, kind: Kind) -> bool {
        match self {
            ParameterRole::LabelName => kind == Kind::Label,
            ParameterRole::LabelNumber => matches!(kind, Kind::Label | Kind::Text),
            ParameterRole::ScriptName => matches!(kind, Kind::String | Kind::Variable),
            ParameterRole::Comment => true,
            _ => matches!(
                kind,
                Kind::Number
                    | Kind::String
                    | Kind::GameObject
                    | Kind::ScriptObject
                    | Kind::Variable
                    | Kind::Null
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Conditional {
    None = 0,
    Start = 1,
    If = 2,
    IfNot = 3,
    ElseIf = 4,
    ElseIfNot = 5,
    While = 6,
    WhileNot = 7,
    SkipIf = 8,
    SkipIfNot = 9,
}

impl Conditional {
    pub fn from_u8(value: u8) -> Option<Conditional> {
        use Conditional::*;
        [None, Start, If, IfNot, ElseIf, ElseIfNot, While, WhileNot, SkipIf, SkipIfNot]
            .into_iter()
            .find(|c| *c as u8 == value)
    }

    /// Source keywords that introduce this conditional.
    pub fn keywords(&self) -> &'static str {
        match self {
            Conditional::None => "",
            Conditional::Start => "start",
            Conditional::If => "if",
            Conditional::IfNot => "if not",
            Conditional::ElseIf => "else if",
            Conditional::ElseIfNot => "else if not",
            Conditional::While => "while",
            Conditional::WhileNot => "while not",
            Conditional::SkipIf => "skip if",
            Conditional::SkipIfNot => "skip if not",
        }
    }

    pub fn is_jump(&self) -> bool {
        !matches!(self, Conditional::None | Conditional::Start)
    }

    pub fn logic(&self) -> BranchLogic {
        match self {
            Conditional::If | Conditional::IfNot => BranchLogic::If,
            Conditional::While | Conditional::WhileNot => BranchLogic::While,
            Conditional::ElseIf | Conditional::ElseIfNot => BranchLogic::ElseIf,
            Conditional::SkipIf | Conditional::SkipIfNot => BranchLogic::SkipIf,
            Conditional::None | Conditional::Start => BranchLogic::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReturnType {
    Assignment = 0,
    Discard = 1,
    Jump = 2,
}

/// The packed contents of a return-value parameter: a return type, a
/// conditional and a 16-bit destination (variable ID or jump index).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnValue {
    pub return_type: ReturnType,
    pub conditional: Conditional,
    pub destination: u16,
}

impl ReturnValue {
    pub fn assignment(variable: u16) -> Self {
        Self {
            return_type: ReturnType::Assignment,
            conditional: Conditional::None,
            destination: variable,
        }
    }

    pub fn discard() -> Self {
        Self {
            return_type: ReturnType::Discard,
            conditional: Conditional::None,
            destination: 0,
        }
    }

    pub fn conditional(conditional: Conditional) -> Self {
        let return_type = if conditional.is_jump() {
            ReturnType::Jump
        } else {
            ReturnType::Discard
        };
        Self {
            return_type,
            conditional,
            destination: 0,
        }
    }

    pub fn encode(&self) -> i32 {
        ((self.destination as u32) << 16 | (self.conditional as u32) << 8 | self.return_type as u32)
            as i32
    }

    pub fn decode(value: i32) -> Option<Self> {
        let bits = value as u32;
        let return_type = match bits & 0xFF {
            0 => ReturnType::Assignment,
            1 => ReturnType::Discard,
            2 => ReturnType::Jump,
            _ => return None,
        };
        Some(Self {
            return_type,
            conditional: Conditional::from_u8(((bits >> 8) & 0xFF) as u8)?,
            destination: (bits >> 16) as u16,
        })
    }
}

/// The structural role a command plays in control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BranchLogic {
    None,
    If,
    ElseIf,
    Else,
    While,
    SkipIf,
    Break,
    Continue,
    End,
    NOP,
}

impl BranchLogic {
    pub fn opens_block(&self) -> bool {
        matches!(
            self,
            BranchLogic::If | BranchLogic::ElseIf | BranchLogic::Else | BranchLogic::While
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[repr(u8)]
pub enum GameVersion {
    Threat = 1,
    Reunion = 2,
    TerranConflict = 4,
    AlbionPrelude = 8,
}

impl GameVersion {
    pub const ALL: u8 = 0x0F;

    pub fn is_in(&self, mask: u8) -> bool {
        mask & (*self as u8) != 0
    }
}

impl Default for GameVersion {
    fn default() -> Self {
        GameVersion::AlbionPrelude
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionMode {
    #[default]
    Serial,
    /// Must be run with `start`.
    Concurrent,
    /// May be run either way.
    Either,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VargPadding {
    /// Pad missing arguments with null up to the maximum.
    PadNull,
    /// Stop after the last supplied argument.
    StopEarly,
}

/// Which trailing null arguments of a variable-argument command are left out
/// of its display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VargTrimming {
    /// Drop trailing nulls from every command.
    #[default]
    TrailingNulls,
    /// Drop trailing nulls except from `call script`, which shows every argument.
    PreserveScriptCalls,
}

/// Expression operators. Brackets are carried as operators so that the infix
/// form can be displayed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operator {
    OpenBracket = 0,
    CloseBracket = 1,
    LogicalOr = 2,
    LogicalAnd = 3,
    BitwiseOr = 4,
    BitwiseXor = 5,
    BitwiseAnd = 6,
    Equal = 7,
    NotEqual = 8,
    Less = 9,
    Greater = 10,
    LessEqual = 11,
    GreaterEqual = 12,
    Add = 13,
    Subtract = 14,
    Multiply = 15,
    Divide = 16,
    Modulus = 17,
    Minus = 18,
    BitwiseNot = 19,
    LogicalNot = 20,
}

const OPERATORS: [(Operator, &str); 21] = [
    (Operator::OpenBracket, "("),
    (Operator::CloseBracket, ")"),
    (Operator::LogicalOr, "OR"),
    (Operator::LogicalAnd, "AND"),
    (Operator::BitwiseOr, "|"),
    (Operator::BitwiseXor, "^"),
    (Operator::BitwiseAnd, "&"),
    (Operator::Equal, "=="),
    (Operator::NotEqual, "!="),
    (Operator::Less, "<"),
    (Operator::Greater, ">"),
    (Operator::LessEqual, "<="),
    (Operator::GreaterEqual, ">="),
    (Operator::Add, "+"),
    (Operator::Subtract, "-"),
    (Operator::Multiply, "*"),
    (Operator::Divide, "/"),
    (Operator::Modulus, "mod"),
    (Operator::Minus, "-"),
    (Operator::BitwiseNot, "~"),
    (Operator::LogicalNot, "!"),
];

impl Operator {
    pub fn from_code(code: i32) -> Option<Operator> {
        OPERATORS.iter().map(|(op, _)| *op).find(|op| *op as i32 == code)
    }

    /// Resolves the symbols that have no entry of their own in the object catalog.
    pub fn from_special(text: &str, unary: bool) -> Option<Operator> {
        match text {
            "-" if unary => Some(Operator::Minus),
            "-" => Some(Operator::Subtract),
            "&&" => Some(Operator::LogicalAnd),
            "||" => Some(Operator::LogicalOr),
            "%" => Some(Operator::Modulus),
            _ => None,
        }
    }

    pub fn from_symbol(text: &str, unary: bool) -> Option<Operator> {
        if let Some(op) = Operator::from_special(text, unary) {
            return Some(op);
        }
        OPERATORS
            .iter()
            .find(|(op, symbol)| symbol.eq_ignore_ascii_case(text) && op.is_unary() == unary)
            .map(|(op, _)| *op)
    }

    pub fn symbol(&self) -> &'static str {
        OPERATORS
            .iter()
            .find(|(op, _)| op == self)
            .map(|(_, symbol)| *symbol)
            .unwrap_or("?")
    }

    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::Minus | Operator::BitwiseNot | Operator::LogicalNot)
    }

    pub fn is_bracket(&self) -> bool {
        matches!(self, Operator::OpenBracket | Operator::CloseBracket)
    }

    pub fn precedence(&self) -> u8 {
        match self {
            Operator::OpenBracket | Operator::CloseBracket => 0,
            Operator::LogicalOr => 1,
            Operator::LogicalAnd => 2,
            Operator::BitwiseOr => 3,
            Operator::BitwiseXor => 4,
            Operator::BitwiseAnd => 5,
            Operator::Equal | Operator::NotEqual => 6,
            Operator::Less | Operator::Greater | Operator::LessEqual | Operator::GreaterEqual => 7,
            Operator::Add | Operator::Subtract => 8,
            Operator::Multiply | Operator::Divide | Operator::Modulus => 9,
            Operator::Minus | Operator::BitwiseNot | Operator::LogicalNot => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_value_packs_and_unpacks() {
        let mut value = ReturnValue::conditional(Conditional::SkipIfNot);
        value.destination = 0xBEEF;
        let decoded = ReturnValue::decode(value.encode()).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(decoded.return_type, ReturnType::Jump);
        assert_eq!(ReturnValue::conditional(Conditional::Start).return_type, ReturnType::Discard);
        assert!(ReturnValue::decode(0x0000_0F03).is_none());
    }

    #[test]
    fn special_operators_resolve_before_the_table() {
        assert_eq!(Operator::from_symbol("-", true), Some(Operator::Minus));
        assert_eq!(Operator::from_symbol("-", false), Some(Operator::Subtract));
        assert_eq!(Operator::from_symbol("&&", false), Some(Operator::LogicalAnd));
        assert_eq!(Operator::from_symbol("||", false), Some(Operator::LogicalOr));
        assert_eq!(Operator::from_symbol("%", false), Some(Operator::Modulus));
        assert_eq!(Operator::from_symbol("and", false), Some(Operator::LogicalAnd));
        assert_eq!(Operator::from_symbol("!", true), Some(Operator::LogicalNot));
        assert_eq!(Operator::from_symbol("!", false), None);
    }

    #[test]
    fn version_mask() {
        assert!(GameVersion::TerranConflict.is_in(0b1100));
        assert!(!GameVersion::Threat.is_in(0b1100));
    }
}
