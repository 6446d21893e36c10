//! Turns one source line into a [`Command`].

use crate::catalog::syntax::{LookupMatch, CMD_COMMENT, CMD_EXPRESSION};
use crate::catalog::Catalog;
use crate::command::Command;
use crate::error::{ErrorKind, ScriptError};
use crate::expression::Expression;
use crate::lexer::{self, TokenCursor};
use crate::parameter::{Parameter, ParameterValue};
use crate::token::{Kind, Token};
use crate::types::{Conditional, DataType, GameVersion, ParameterRole, ReturnValue, VargPadding, VargTrimming};

// Longest first; `do if` is the inverse spelling of `skip if not`.
const CONDITIONALS: [(&[&str], Conditional); 11] = [
    (&["skip", "if", "not"], Conditional::SkipIfNot),
    (&["skip", "if"], Conditional::SkipIf),
    (&["do", "if", "not"], Conditional::SkipIf),
    (&["do", "if"], Conditional::SkipIfNot),
    (&["else", "if", "not"], Conditional::ElseIfNot),
    (&["else", "if"], Conditional::ElseIf),
    (&["if", "not"], Conditional::IfNot),
    (&["if"], Conditional::If),
    (&["while", "not"], Conditional::WhileNot),
    (&["while"], Conditional::While),
    (&["start"], Conditional::Start),
];

pub struct CommandParser<'c> {
    catalog: &'c Catalog,
    version: GameVersion,
    trimming: VargTrimming,
}

impl<'c> CommandParser<'c> {
    pub fn new(catalog: &'c Catalog, version: GameVersion, trimming: VargTrimming) -> Self {
        Self {
            catalog,
            version,
            trimming,
        }
    }

    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    pub fn parse_line(&self, line: &str) -> Result<Command, ScriptError> {
        let tokens = lexer::tokenize(line, true).map_err(ScriptError::from_lexing)?;
        let first = match tokens.get(0) {
            Some(token) => token,
            None => return Ok(Command::nop()),
        };

        if first.kind() == Kind::Comment {
            return Ok(self.parse_comment(first.value_text()));
        }
        let mut command = self.parse_tokens(tokens.as_slice(), false)?;
        command.text = command.build_text(self.trimming);
        Ok(command)
    }

    /// A comment that reads as a command becomes a commented command;
    /// anything else stays free text.
    fn parse_comment(&self, text: &str) -> Command {
        let parsed = lexer::tokenize(text, true)
            .ok()
            .filter(|tokens| !tokens.is_empty())
            .and_then(|tokens| self.parse_tokens(tokens.as_slice(), true).ok());
        if let Some(mut command) = parsed {
            command.text = command.build_text(self.trimming);
            return command;
        }
        match self.catalog.syntaxes.get(CMD_COMMENT) {
            Some(syntax) => Command::comment(syntax, text),
            None => Command::nop(),
        }
    }

    pub fn parse_tokens(&self, tokens: &[Token], commented: bool) -> Result<Command, ScriptError> {
        let mut cursor = TokenCursor::new(tokens);
        let conditional = CONDITIONALS
            .iter()
            .find(|(words, _)| cursor.match_sequence(words))
            .map(|(_, conditional)| *conditional);

        let mut assignment = None;
        if conditional.is_none() {
            let is_assignment = matches!(
                (cursor.peek_nth(0), cursor.peek_nth(1)),
                (Some(variable), Some(equals))
                    if variable.kind() == Kind::Variable && equals.kind() == Kind::Keyword && equals.text() == "="
            );
            if is_assignment {
                assignment = cursor.advance().cloned();
                cursor.advance();
            }
        }

        let rest = cursor.remaining();
        if rest.is_empty() {
            let at = tokens.last().map(|t| t.end).unwrap_or(0);
            return Err(ScriptError::new(ErrorKind::Syntax, "missing command").with_text("", at..at));
        }

        if let Some(found) = self.catalog.syntaxes.lookup(&rest, self.version) {
            if let Some(parameters) = self.bind(&found) {
                return self.build(found, parameters, &rest, conditional, assignment.as_ref(), commented);
            }
        }

        let head = conditional.is_some() || assignment.is_some();
        let looks_like_expression = rest.iter().all(|t| t.is_operand() || matches!(t.kind(), Kind::BinaryOp | Kind::UnaryOp));
        if head && looks_like_expression {
            return self.build_expression(&rest, conditional, assignment.as_ref(), commented);
        }

        let text: String = rest.iter().map(Token::text).collect::<Vec<_>>().join(" ");
        let range = rest[0].start..rest[rest.len() - 1].end;
        Err(ScriptError::new(ErrorKind::Syntax, "unrecognized command").with_text(&text, range))
    }

    /// Pairs the matched tokens with the syntax's declared slots; `None` if a
    /// token cannot fill its slot.
    fn bind(&self, found: &LookupMatch) -> Option<Vec<(usize, Token)>> {
        let syntax = &found.syntax;
        if found.parameters.len() != syntax.display_order.len() {
            return None;
        }
        let mut bound = Vec::new();
        for (token, &index) in found.parameters.iter().zip(&syntax.display_order) {
            if !syntax.parameters[index].role.accepts(token.kind()) {
                return None;
            }
            bound.push((index, token.clone()));
        }
        Some(bound)
    }

    fn return_value(
        &self,
        role: ParameterRole,
        conditional: Option<Conditional>,
        assignment: Option<&Token>,
    ) -> Parameter {
        match (conditional, assignment) {
            (_, Some(token)) => Parameter {
                token: Some(token.clone()),
                ..Parameter::variable(role, token.value_text())
            },
            (Some(conditional), None) => Parameter::new(
                role,
                DataType::Variable,
                ParameterValue::Int(ReturnValue::conditional(conditional).encode()),
            ),
            (None, None) => Parameter::new(
                role,
                DataType::Variable,
                ParameterValue::Int(ReturnValue::discard().encode()),
            ),
        }
    }

    fn check_head(
        &self,
        role: Option<ParameterRole>,
        conditional: Option<Conditional>,
        assignment: Option<&Token>,
        first: &Token,
    ) -> Result<(), ScriptError> {
        if let Some(conditional) = conditional {
            let allowed = match conditional {
                Conditional::Start => role.map_or(false, |r| r.allows_start()),
                _ => role.map_or(false, |r| r.allows_conditional()),
            };
            if !allowed {
                return Err(ScriptError::from_token(
                    ErrorKind::Syntax,
                    first,
                    format!("'{}' cannot be used with this command", conditional.keywords()),
                ));
            }
        }
        if let Some(token) = assignment {
            if role.is_none() {
                return Err(ScriptError::from_token(
                    ErrorKind::Syntax,
                    token,
                    "this command does not return a value",
                ));
            }
        }
        Ok(())
    }

    fn build(
        &self,
        found: LookupMatch,
        bound: Vec<(usize, Token)>,
        rest: &[Token],
        conditional: Option<Conditional>,
        assignment: Option<&Token>,
        commented: bool,
    ) -> Result<Command, ScriptError> {
        let syntax = found.syntax;
        self.check_head(syntax.return_value_role(), conditional, assignment, &rest[0])?;

        let mut slots: Vec<Option<Parameter>> = vec![None; syntax.parameters.len()];
        for (index, token) in bound {
            let role = syntax.parameters[index].role;
            slots[index] = Some(Parameter::from_token(role, &token, self.catalog)?);
        }
        if let Some(index) = syntax.return_value_index() {
            let role = syntax.parameters[index].role;
            slots[index] = Some(self.return_value(role, conditional, assignment));
        }
        let mut parameters: Vec<Parameter> = slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Parameter::null(ParameterRole::Value)))
            .collect();

        if let Some(varg) = syntax.varg {
            let mut arguments = self.parse_arguments(&rest[found.consumed..])?;
            if arguments.len() > varg.max {
                let extra = &rest[rest.len() - 1];
                return Err(ScriptError::from_token(
                    ErrorKind::Syntax,
                    extra,
                    format!("too many arguments: at most {} allowed", varg.max),
                ));
            }
            if syntax.is_script_call() {
                parameters.push(Parameter::integer(ParameterRole::StructuralCount, arguments.len() as i32));
            }
            if varg.padding == VargPadding::PadNull {
                while arguments.len() < varg.max {
                    arguments.push(Parameter::null(ParameterRole::VariableArgument));
                }
            }
            parameters.extend(arguments);
        } else if found.consumed < rest.len() {
            let extra = &rest[found.consumed];
            return Err(ScriptError::from_token(ErrorKind::Syntax, extra, "unexpected text after command"));
        }

        Ok(Command::new(syntax, parameters, commented))
    }

    /// Reads `[name=]value` pairs, optionally separated by commas.
    fn parse_arguments(&self, tokens: &[Token]) -> Result<Vec<Parameter>, ScriptError> {
        let mut cursor = TokenCursor::new(tokens);
        let mut arguments = Vec::new();
        while let Some(token) = cursor.peek() {
            if token.kind() == Kind::Keyword && token.text() == "," {
                cursor.advance();
                continue;
            }
            let named = token.kind() == Kind::Text
                && cursor.peek_nth(1).map_or(false, |t| t.kind() == Kind::Keyword && t.text() == "=");
            let name = if named {
                let name = cursor.advance().cloned();
                cursor.advance();
                name
            } else {
                None
            };
            let value = match cursor.advance() {
                Some(value) if value.is_operand() => value,
                Some(other) => {
                    return Err(ScriptError::from_token(ErrorKind::Syntax, other, "expected an argument value"))
                }
                None => {
                    let at = tokens.last().map(|t| t.end).unwrap_or(0);
                    return Err(ScriptError::new(ErrorKind::Syntax, "expected an argument value").with_text("", at..at));
                }
            };
            let mut argument = Parameter::from_token(ParameterRole::VariableArgument, value, self.catalog)?;
            argument.argument_name = name;
            arguments.push(argument);
        }
        Ok(arguments)
    }

    fn build_expression(
        &self,
        rest: &[Token],
        conditional: Option<Conditional>,
        assignment: Option<&Token>,
        commented: bool,
    ) -> Result<Command, ScriptError> {
        let syntax = self
            .catalog
            .syntaxes
            .get(CMD_EXPRESSION)
            .ok_or_else(|| ScriptError::new(ErrorKind::Algorithm, "expression syntax is not registered"))?;
        let role = syntax.return_value_role();
        self.check_head(role, conditional, assignment, &rest[0])?;
        let expression = Expression::parse(rest, self.catalog)?;
        let return_value = self.return_value(role.unwrap_or(ParameterRole::ReturnValueIf), conditional, assignment);
        Ok(Command::expression(syntax, return_value, expression, commented))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::syntax::*;
    use crate::catalog::test_catalog;
    use crate::types::BranchLogic;

    fn parse(line: &str) -> Result<Command, ScriptError> {
        let catalog = test_catalog();
        CommandParser::new(&catalog, GameVersion::AlbionPrelude, VargTrimming::TrailingNulls).parse_line(line)
    }

    #[test]
    fn parses_assignment_and_conditionals() {
        let command = parse("$fuel = $ship-> get fuel").unwrap();
        assert_eq!(command.id(), 200);
        assert_eq!(command.return_value().unwrap().assigned_name(), Some("fuel"));
        assert_eq!(command.logic(), BranchLogic::None);
        assert_eq!(command.text, "$fuel = $ship-> get fuel");

        let command = parse("skip if not $ship-> is docked").unwrap();
        assert_eq!(command.logic(), BranchLogic::SkipIf);
        assert_eq!(command.conditional(), Conditional::SkipIfNot);

        let command = parse("do if $ship-> is docked").unwrap();
        assert_eq!(command.conditional(), Conditional::SkipIfNot);
        assert_eq!(command.text, "skip if not $ship-> is docked");
    }

    #[test]
    fn falls_back_to_expressions() {
        let command = parse("while $i < 10").unwrap();
        assert!(command.is_expression());
        assert_eq!(command.logic(), BranchLogic::While);
        let command = parse("$x = ( $a + 1 ) * 2").unwrap();
        assert!(command.is_expression());
        assert_eq!(command.text, "$x = ( $a + 1 ) * 2");
        assert!(parse("$x = 1 +").is_err());
    }

    #[test]
    fn start_requires_a_start_capable_syntax() {
        let command = parse("start $ship-> fly to station [THIS]").unwrap();
        assert_eq!(command.conditional(), Conditional::Start);
        assert_eq!(command.logic(), BranchLogic::None);
        let error = parse("start $ship-> get fuel").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Syntax);
        assert!(parse("if write to player logbook 'x'").is_err());
        assert!(parse("$x = write to player logbook 'x'").is_err());
    }

    #[test]
    fn loop_macros_take_no_conditional() {
        for line in ["if for $i = 0 to 3 step 1", "while for each $x in array $list", "skip if dim 1, 2"] {
            assert_eq!(parse(line).unwrap_err().kind, ErrorKind::Syntax, "{}", line);
        }
        assert!(parse("for $i = 0 to 3 step 1").unwrap().is_macro());
    }

    #[test]
    fn script_call_arguments_are_counted() {
        let command = parse("$r = [THIS]-> call script 'lib.trade' : ware={Energy Cells} amount=5").unwrap();
        assert!(command.is_script_call());
        assert_eq!(command.parameters[3].value, ParameterValue::Int(2));
        let arguments = command.arguments();
        assert_eq!(arguments.len(), 2);
        assert_eq!(arguments[0].argument_name.as_ref().unwrap().text(), "ware");
        assert_eq!(command.script_name(), Some("lib.trade"));
        assert_eq!(command.text, "$r = [THIS]-> call script 'lib.trade' : ware={Energy Cells} amount=5");
    }

    #[test]
    fn padded_variable_arguments() {
        let command = parse("$choice = display options 'a', 'b'").unwrap();
        assert_eq!(command.arguments().len(), 4);
        assert_eq!(command.arguments()[3].data_type, DataType::Null);
        assert_eq!(command.text, "$choice = display options 'a' 'b'");
        assert!(parse("$choice = display options 1 2 3 4 5").is_err());
    }

    #[test]
    fn comments_and_commented_commands() {
        let command = parse("* just a note").unwrap();
        assert!(command.is(CMD_COMMENT));
        assert_eq!(command.text, "* just a note");
        let command = parse("* $fuel = $ship-> get fuel").unwrap();
        assert!(command.commented);
        assert_eq!(command.id(), 200);
        assert_eq!(command.logic(), BranchLogic::NOP);
        assert_eq!(command.text, "* $fuel = $ship-> get fuel");
    }

    #[test]
    fn labels_and_structure() {
        assert!(parse("main:").unwrap().is(CMD_DEFINE_LABEL));
        assert!(parse("gosub main:").unwrap().is(CMD_GOTO_SUB));
        assert!(parse("goto label main").unwrap().is(CMD_GOTO_LABEL));
        assert_eq!(parse("else").unwrap().logic(), BranchLogic::Else);
        assert_eq!(parse("else if $x").unwrap().logic(), BranchLogic::ElseIf);
        assert!(parse("").unwrap().is_nop());
    }

    #[test]
    fn unknown_commands_and_bad_characters() {
        let error = parse("$ship-> explode loudly").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Syntax);
        assert_eq!(error.text, "$ship -> explode loudly");
        assert_eq!(parse("$x = #").unwrap_err().kind, ErrorKind::Lexing);
        assert!(parse("$ship-> get jump range").is_ok());
    }
}
