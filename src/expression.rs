//! Infix expression parsing and conversion to postfix order.

use crate::catalog::Catalog;
use crate::error::{ErrorKind, ScriptError};
use crate::parameter::Parameter;
use crate::token::{Kind, Token};
use crate::types::{DataType, Operator, ParameterRole};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub infix: Vec<Parameter>,
    pub postfix: Vec<Parameter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Operand,
    Operator,
}

fn operator_of(parameter: &Parameter) -> Option<Operator> {
    match parameter.data_type {
        DataType::Operator | DataType::UnaryOperator => parameter.value.as_int().and_then(Operator::from_code),
        _ => None,
    }
}

impl Expression {
    /// Parses `tokens` as an infix expression.
    pub fn parse(tokens: &[Token], catalog: &Catalog) -> Result<Self, ScriptError> {
        let infix = parse_infix(tokens, catalog)?;
        let postfix = to_postfix(&infix)?;
        Ok(Self { infix, postfix })
    }
}

fn syntax_error(token: &Token, message: &str) -> ScriptError {
    ScriptError::from_token(ErrorKind::Syntax, token, message)
}

fn parse_infix(tokens: &[Token], catalog: &Catalog) -> Result<Vec<Parameter>, ScriptError> {
    let mut infix = Vec::new();
    let mut expect = Expect::Operand;
    let mut depth = 0usize;

    for token in tokens.iter().filter(|t| !t.is_whitespace()) {
        let role = ParameterRole::ExpressionInfix;
        match (expect, token.kind()) {
            (Expect::Operand, _) if token.is_operand() => {
                infix.push(Parameter::from_token(role, token, catalog)?);
                expect = Expect::Operator;
            }
            (Expect::Operand, Kind::UnaryOp) => {
                infix.push(Parameter::from_token(role, token, catalog)?);
            }
            (Expect::Operand, Kind::BinaryOp) if token.text() == "(" => {
                infix.push(Parameter::from_token(role, token, catalog)?);
                depth += 1;
            }
            (Expect::Operator, Kind::BinaryOp) if token.text() == ")" => {
                if depth == 0 {
                    return Err(syntax_error(token, "unmatched closing bracket"));
                }
                depth -= 1;
                infix.push(Parameter::from_token(role, token, catalog)?);
            }
            (Expect::Operator, Kind::BinaryOp) if token.text() != "(" => {
                infix.push(Parameter::from_token(role, token, catalog)?);
                expect = Expect::Operand;
            }
            (Expect::Operand, _) => return Err(syntax_error(token, "expected an operand")),
            (Expect::Operator, _) => return Err(syntax_error(token, "expected an operator")),
        }
    }

    if infix.is_empty() {
        return Err(ScriptError::new(ErrorKind::Syntax, "empty expression"));
    }
    if expect == Expect::Operand {
        return Err(ScriptError::new(ErrorKind::Syntax, "expression ends with an operator"));
    }
    if depth > 0 {
        return Err(ScriptError::new(ErrorKind::Syntax, "unmatched opening bracket"));
    }
    Ok(infix)
}

/// Shunting-yard conversion. Unary operators bind right to left.
fn to_postfix(infix: &[Parameter]) -> Result<Vec<Parameter>, ScriptError> {
    let mut output = Vec::new();
    let mut stack: Vec<(Operator, &Parameter)> = Vec::new();

    for parameter in infix {
        let operator = match operator_of(parameter) {
            None => {
                output.push(parameter);
                continue;
            }
            Some(operator) => operator,
        };
        match operator {
            Operator::OpenBracket => stack.push((operator, parameter)),
            Operator::CloseBracket => loop {
                match stack.pop() {
                    Some((Operator::OpenBracket, _)) => break,
                    Some((_, top)) => output.push(top),
                    None => return Err(ScriptError::new(ErrorKind::Algorithm, "bracket stack underflow")),
                }
            },
            op if op.is_unary() => stack.push((operator, parameter)),
            op => {
                while let Some((top, top_parameter)) = stack.last().copied() {
                    if top == Operator::OpenBracket || top.precedence() < op.precedence() {
                        break;
                    }
                    output.push(top_parameter);
                    stack.pop();
                }
                stack.push((operator, parameter));
            }
        }
    }
    while let Some((_, top)) = stack.pop() {
        output.push(top);
    }

    Ok(output
        .into_iter()
        .map(|p| Parameter {
            role: ParameterRole::ExpressionPostfix,
            ..p.clone()
        })
        .collect())
}
