//! One physical command row and the rules derived from it.

use std::sync::Arc;

use crate::catalog::syntax::*;
use crate::expression::Expression;
use crate::lexer;
use crate::bytecode::CompiledParameter;
use crate::parameter::{Parameter, ParameterValue};
use crate::token::Kind;
use crate::types::{BranchLogic, Conditional, DataType, ParameterRole, ReturnType, ReturnValue, VargTrimming};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// `None` only for empty lines.
    pub syntax: Option<Arc<CommandSyntax>>,
    /// Declared parameters in physical order, then the argument count of a
    /// script call, then variable arguments.
    pub parameters: Vec<Parameter>,
    pub commented: bool,
    pub text: String,
}

impl Command {
    pub fn new(syntax: Arc<CommandSyntax>, parameters: Vec<Parameter>, commented: bool) -> Self {
        let mut command = Self {
            syntax: Some(syntax),
            parameters,
            commented,
            text: String::new(),
        };
        command.text = command.build_text(VargTrimming::default());
        command
    }

    pub fn nop() -> Self {
        Self {
            syntax: None,
            parameters: Vec::new(),
            commented: false,
            text: String::new(),
        }
    }

    /// A plain comment row holding `text` verbatim.
    pub fn comment(syntax: Arc<CommandSyntax>, text: &str) -> Self {
        let parameter = Parameter::string(ParameterRole::Comment, text);
        let mut command = Command::new(syntax, vec![parameter], false);
        command.text = format!("* {}", text);
        command
    }

    /// An unconditional jump; its destination is filled in at generation.
    pub fn hidden_jump(syntax: Arc<CommandSyntax>) -> Self {
        let target = Parameter::integer(ParameterRole::LabelNumber, 0);
        Command::new(syntax, vec![target], false)
    }

    /// Lays out an expression row: the return value, then the postfix
    /// sequence, then the infix sequence whose operands point back into it.
    /// Commented rows keep only the infix sequence verbatim.
    pub fn expression(
        syntax: Arc<CommandSyntax>,
        return_value: Parameter,
        expression: Expression,
        commented: bool,
    ) -> Self {
        let mut parameters = vec![return_value];
        if commented {
            parameters.push(count(expression.infix.len()));
            parameters.extend(expression.infix);
            return Command::new(syntax, parameters, true);
        }

        let mut claimed = vec![false; expression.postfix.len()];
        let infix: Vec<Parameter> = expression
            .infix
            .iter()
            .map(|element| {
                if matches!(element.data_type, DataType::Operator | DataType::UnaryOperator) {
                    return element.clone();
                }
                let position = expression
                    .postfix
                    .iter()
                    .enumerate()
                    .position(|(i, p)| !claimed[i] && p.same_value(element));
                match position {
                    Some(i) => {
                        claimed[i] = true;
                        Parameter {
                            token: element.token.clone(),
                            ..Parameter::integer(ParameterRole::ExpressionInfix, -(i as i32 + 1))
                        }
                    }
                    None => element.clone(),
                }
            })
            .collect();

        parameters.push(count(expression.postfix.len()));
        parameters.extend(expression.postfix);
        parameters.push(count(infix.len()));
        parameters.extend(infix);
        Command::new(syntax, parameters, false)
    }

    pub fn id(&self) -> u16 {
        self.syntax.as_ref().map_or(CMD_NOP, |s| s.id)
    }

    pub fn is(&self, id: u16) -> bool {
        self.id() == id
    }

    pub fn is_nop(&self) -> bool {
        self.syntax.is_none() || self.is(CMD_NOP)
    }

    pub fn is_expression(&self) -> bool {
        self.is(CMD_EXPRESSION)
    }

    pub fn is_macro(&self) -> bool {
        !self.commented && self.syntax.as_ref().map_or(false, |s| s.is_macro())
    }

    pub fn is_script_call(&self) -> bool {
        self.is(CMD_CALL_SCRIPT)
    }

    pub fn is_goto(&self) -> bool {
        !self.commented && (self.is(CMD_GOTO_LABEL) || self.is(CMD_GOTO_SUB))
    }

    pub fn is_label(&self) -> bool {
        !self.commented && self.is(CMD_DEFINE_LABEL)
    }

    /// Standard rows are executed; auxiliary rows only exist for display.
    pub fn is_standard(&self) -> bool {
        !self.commented
            && !matches!(
                self.id(),
                CMD_NOP | CMD_COMMENT | CMD_COMMAND_COMMENT | CMD_END | CMD_ELSE | CMD_BREAK | CMD_CONTINUE
            )
    }

    pub fn return_value(&self) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.is_return_value())
    }

    pub fn return_value_mut(&mut self) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|p| p.is_return_value())
    }

    pub fn conditional(&self) -> Conditional {
        self.return_value()
            .and_then(Parameter::return_value)
            .map_or(Conditional::None, |rv| rv.conditional)
    }

    pub fn logic(&self) -> BranchLogic {
        if self.commented {
            return BranchLogic::NOP;
        }
        match self.id() {
            CMD_NOP | CMD_COMMENT | CMD_COMMAND_COMMENT => return BranchLogic::NOP,
            CMD_END => return BranchLogic::End,
            CMD_ELSE => return BranchLogic::Else,
            CMD_BREAK => return BranchLogic::Break,
            CMD_CONTINUE => return BranchLogic::Continue,
            _ => {}
        }
        match self.return_value().and_then(Parameter::return_value) {
            Some(rv) if rv.return_type == ReturnType::Jump => rv.conditional.logic(),
            _ => BranchLogic::None,
        }
    }

    /// Declared parameters in physical order.
    pub fn declared(&self) -> &[Parameter] {
        let declared = self.syntax.as_ref().map_or(0, |s| s.parameters.len());
        &self.parameters[..declared.min(self.parameters.len())]
    }

    /// Supplied variable arguments.
    pub fn arguments(&self) -> &[Parameter] {
        let mut start = self.declared().len();
        if self.is_script_call() {
            start += 1;
        }
        &self.parameters[start.min(self.parameters.len())..]
    }

    /// Name of the script targeted by a `call script` row.
    pub fn script_name(&self) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.role == ParameterRole::ScriptName && p.data_type == DataType::String)
            .and_then(|p| p.value.as_str())
    }

    /// The source line this row displays as.
    pub fn build_text(&self, trimming: VargTrimming) -> String {
        let syntax = match &self.syntax {
            Some(syntax) => syntax,
            None => return String::new(),
        };
        let body = match syntax.id {
            CMD_NOP => String::new(),
            CMD_COMMENT => {
                let text = self.parameters.first().map(|p| p.display_text()).unwrap_or_default();
                format!("* {}", text)
            }
            CMD_EXPRESSION => {
                let prefix = self.return_value().map(source_prefix).unwrap_or_default();
                let infix: Vec<String> = self.expression_infix().iter().map(Parameter::display_text).collect();
                format!("{}{}", prefix, infix.join(" "))
            }
            _ => {
                let prefix = self.return_value().map(source_prefix).unwrap_or_default();
                let slots: Vec<String> = self.declared().iter().map(Parameter::display_text).collect();
                let arguments = self.arguments();
                let nulls: Vec<bool> = arguments.iter().map(|a| a.data_type == DataType::Null).collect();
                let shown = visible_arguments(syntax, &nulls, trimming);
                let arguments: Vec<String> = arguments[..shown]
                    .iter()
                    .map(|a| match &a.argument_name {
                        Some(name) => format!("{}={}", name.text(), a.display_text()),
                        None => a.display_text(),
                    })
                    .collect();
                format!("{}{}", prefix, render(syntax, &slots, &arguments))
            }
        };
        if self.commented {
            format!("* {}", body)
        } else {
            body
        }
    }

    /// Infix elements of an expression with operand references resolved.
    pub fn expression_infix(&self) -> Vec<Parameter> {
        if !self.is_expression() {
            return Vec::new();
        }
        let sections = split_expression(&self.parameters[1..], self.commented);
        let (postfix, infix) = match sections {
            Some(sections) => sections,
            None => return Vec::new(),
        };
        infix
            .iter()
            .map(|element| match (element.data_type, element.value.as_int()) {
                (DataType::Integer, Some(reference)) if reference < 0 => operand_position(reference)
                    .and_then(|position| postfix.get(position))
                    .cloned()
                    .unwrap_or_else(|| element.clone()),
                _ => element.clone(),
            })
            .collect()
    }
}

fn count(n: usize) -> Parameter {
    Parameter::integer(ParameterRole::StructuralCount, n as i32)
}

/// Postfix position named by a negative infix operand reference.
pub(crate) fn operand_position(reference: i32) -> Option<usize> {
    let position = reference.checked_neg()?.checked_sub(1)?;
    usize::try_from(position).ok()
}

/// Splits the parameters after the return value into postfix and infix.
pub(crate) fn split_expression<T>(parameters: &[T], commented: bool) -> Option<(&[T], &[T])>
where
    T: ExpressionElement,
{
    let (first, rest) = parameters.split_first()?;
    let n = first.count()?;
    if commented {
        return Some((&rest[..0], rest.get(..n)?));
    }
    let postfix = rest.get(..n)?;
    let (second, rest) = rest.get(n..)?.split_first()?;
    let m = second.count()?;
    Some((postfix, rest.get(..m)?))
}

/// Access to the count cells of an encoded expression.
pub(crate) trait ExpressionElement {
    fn count(&self) -> Option<usize>;
}

impl ExpressionElement for Parameter {
    fn count(&self) -> Option<usize> {
        self.value.as_int().and_then(|n| usize::try_from(n).ok())
    }
}

impl ExpressionElement for CompiledParameter {
    fn count(&self) -> Option<usize> {
        self.as_int().and_then(|n| usize::try_from(n).ok())
    }
}

/// Number of variable arguments to display.
pub(crate) fn visible_arguments(syntax: &CommandSyntax, nulls: &[bool], trimming: VargTrimming) -> usize {
    if trimming == VargTrimming::PreserveScriptCalls && syntax.is_script_call() {
        return nulls.len();
    }
    nulls.iter().rposition(|null| !null).map_or(0, |last| last + 1)
}

/// Line prefix of a not yet generated return value.
fn source_prefix(parameter: &Parameter) -> String {
    match &parameter.value {
        ParameterValue::Str(name) => format!("${} = ", name),
        ParameterValue::Int(encoded) => match ReturnValue::decode(*encoded) {
            Some(rv) => conditional_prefix(rv.conditional),
            None => String::new(),
        },
    }
}

pub(crate) fn conditional_prefix(conditional: Conditional) -> String {
    match conditional {
        Conditional::None => String::new(),
        c => format!("{} ", c.keywords()),
    }
}

/// Substitutes `$N` markers in the syntax text with `slots[N]` and appends
/// the variable arguments.
pub(crate) fn render(syntax: &CommandSyntax, slots: &[String], arguments: &[String]) -> String {
    let mut text = String::new();
    match lexer::tokenize(&syntax.text, false) {
        Ok(tokens) => {
            for token in tokens.iter() {
                let marker = token
                    .value_text()
                    .parse::<usize>()
                    .ok()
                    .filter(|_| token.kind() == Kind::Variable);
                match marker.and_then(|n| slots.get(n)) {
                    Some(slot) => text.push_str(slot),
                    None => text.push_str(token.text()),
                }
            }
        }
        Err(_) => text.push_str(&syntax.text),
    }
    if !arguments.is_empty() {
        text.push(' ');
        text.push_str(&arguments.join(" "));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_catalog;
    use crate::lexer::tokenize;

    fn expression(line: &str, commented: bool) -> Command {
        let catalog = test_catalog();
        let tokens = tokenize(line, true).unwrap();
        let parsed = Expression::parse(tokens.as_slice(), &catalog).unwrap();
        let retvar = Parameter::variable(ParameterRole::ReturnValueIf, "x");
        Command::expression(catalog.syntaxes.get(CMD_EXPRESSION).unwrap(), retvar, parsed, commented)
    }

    #[test]
    fn auxiliary_rows_have_fixed_logic() {
        let catalog = test_catalog();
        for (id, logic) in [
            (CMD_END, BranchLogic::End),
            (CMD_ELSE, BranchLogic::Else),
            (CMD_BREAK, BranchLogic::Break),
            (CMD_CONTINUE, BranchLogic::Continue),
            (CMD_NOP, BranchLogic::NOP),
        ] {
            let command = Command::new(catalog.syntaxes.get(id).unwrap(), Vec::new(), false);
            assert_eq!(command.logic(), logic);
            assert!(!command.is_standard());
        }
        let comment = Command::comment(catalog.syntaxes.get(CMD_COMMENT).unwrap(), "note");
        assert_eq!(comment.logic(), BranchLogic::NOP);
        assert_eq!(comment.text, "* note");
    }

    #[test]
    fn logic_follows_the_encoded_conditional() {
        let catalog = test_catalog();
        let syntax = catalog.syntaxes.get(200).unwrap();
        let reference = Parameter::variable(ParameterRole::ReferenceObject, "ship");
        let assigned = Parameter::variable(ParameterRole::ReturnValueIf, "fuel");
        let command = Command::new(syntax.clone(), vec![assigned, reference.clone()], false);
        assert_eq!(command.logic(), BranchLogic::None);
        assert_eq!(command.text, "$fuel = $ship-> get fuel");

        let guarded = |conditional: Conditional| {
            let retvar = Parameter::new(
                ParameterRole::ReturnValueIf,
                DataType::Variable,
                ParameterValue::Int(ReturnValue::conditional(conditional).encode()),
            );
            Command::new(syntax.clone(), vec![retvar, reference.clone()], false)
        };
        assert_eq!(guarded(Conditional::SkipIfNot).logic(), BranchLogic::SkipIf);
        let mut started = guarded(Conditional::Start);
        assert_eq!(started.logic(), BranchLogic::None);
        assert!(started.is_standard());
        started.commented = true;
        assert_eq!(started.logic(), BranchLogic::NOP);
    }

    #[test]
    fn expression_infix_points_into_postfix() {
        let command = expression("$a + 2 * $a", false);
        let values: Vec<Option<i32>> = command.parameters.iter().map(|p| p.value.as_int()).collect();
        // retvar, 5 postfix ($a 2 $a * +), 5 infix
        assert_eq!(values[1], Some(5));
        assert_eq!(values[7], Some(5));
        assert_eq!(values[8], Some(-1));
        assert_eq!(values[10], Some(-2));
        assert_eq!(values[12], Some(-3));
        assert_eq!(command.text, "$x = $a + 2 * $a");
    }

    #[test]
    fn commented_expression_keeps_infix_only() {
        let command = expression("1 + 2", true);
        assert_eq!(command.parameters.len(), 5);
        assert_eq!(command.parameters[1].value, ParameterValue::Int(3));
        assert_eq!(command.text, "* $x = 1 + 2");
        assert_eq!(command.logic(), BranchLogic::NOP);
    }

    #[test]
    fn trailing_null_arguments_are_trimmed() {
        let catalog = test_catalog();
        let call = catalog.syntaxes.get(CMD_CALL_SCRIPT).unwrap();
        assert_eq!(visible_arguments(&call, &[false, true, true], VargTrimming::TrailingNulls), 1);
        assert_eq!(visible_arguments(&call, &[false, true, true], VargTrimming::PreserveScriptCalls), 3);
        let options = catalog.syntaxes.get(206).unwrap();
        assert_eq!(visible_arguments(&options, &[true, false, true], VargTrimming::PreserveScriptCalls), 2);
    }

    #[test]
    fn operand_references_map_to_postfix_positions() {
        assert_eq!(operand_position(-1), Some(0));
        assert_eq!(operand_position(-5), Some(4));
        assert_eq!(operand_position(0), None);
        assert_eq!(operand_position(i32::MIN), None);
    }
}
