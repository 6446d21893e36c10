//! Turns compiled rows back into source lines.

use std::collections::HashMap;
use std::sync::Arc;

use crate::bytecode::{CompiledCommand, CompiledParameter, CompiledScript};
use crate::catalog::syntax::{
    CommandSyntax, CMD_COMMAND_COMMENT, CMD_COMMENT, CMD_DEFINE_LABEL, CMD_ELSE, CMD_END, CMD_EXPRESSION,
    CMD_HIDDEN_JUMP, CMD_NOP,
};
use crate::catalog::Catalog;
use crate::command::{conditional_prefix, operand_position, render, split_expression, visible_arguments};
use crate::error::{ErrorKind, ScriptError};
use crate::parameter::{Parameter, TranslateContext};
use crate::types::{BranchLogic, DataType, ParameterRole, ReturnType, ReturnValue, VargTrimming};

const INDENT: &str = " ";

pub struct Decompiler<'c> {
    catalog: &'c Catalog,
    trimming: VargTrimming,
}

impl<'c> Decompiler<'c> {
    pub fn new(catalog: &'c Catalog, trimming: VargTrimming) -> Self {
        Self { catalog, trimming }
    }

    /// Renders `script` as source text, one line per row. Jumps the
    /// compiler inserted are left out.
    pub fn decompile(&self, script: &CompiledScript) -> Result<String, ScriptError> {
        let labels = self.labels(script);
        let context = TranslateContext {
            catalog: self.catalog,
            variables: &script.variables,
            labels: &labels,
        };

        let mut lines = Vec::new();
        let mut depth: usize = 0;
        for (row, command) in script.commands.iter().enumerate() {
            if command.id == CMD_HIDDEN_JUMP {
                continue;
            }
            let (text, logic) = self
                .render_command(command, &context)
                .map_err(|error| error.on_line(row + 1))?;
            if matches!(logic, BranchLogic::ElseIf | BranchLogic::Else | BranchLogic::End) {
                depth = depth.saturating_sub(1);
            }
            lines.push(format!("{}{}", INDENT.repeat(depth), text).trim_end().to_string());
            if logic.opens_block() {
                depth += 1;
            }
        }
        log::debug!("decompiled {} into {} lines", script.name, lines.len());
        Ok(lines.join("\n"))
    }

    /// Names of the labels keyed by the standard index they define.
    fn labels(&self, script: &CompiledScript) -> HashMap<i32, String> {
        script
            .standard_commands()
            .enumerate()
            .filter(|(_, command)| command.id == CMD_DEFINE_LABEL)
            .filter_map(|(index, command)| {
                let name = command.parameters.first()?.value.as_str()?;
                Some((index as i32, name.to_string()))
            })
            .collect()
    }

    fn syntax(&self, id: u16) -> Result<Arc<CommandSyntax>, ScriptError> {
        self.catalog
            .syntaxes
            .get(id)
            .ok_or_else(|| ScriptError::new(ErrorKind::Lookup, format!("unknown command id {}", id)))
    }

    fn render_command(
        &self,
        command: &CompiledCommand,
        context: &TranslateContext,
    ) -> Result<(String, BranchLogic), ScriptError> {
        match command.id {
            CMD_NOP => return Ok((String::new(), BranchLogic::NOP)),
            CMD_COMMENT => {
                let text = command.parameters.first().and_then(|p| p.value.as_str()).unwrap_or_default();
                return Ok((format!("* {}", text), BranchLogic::NOP));
            }
            CMD_COMMAND_COMMENT => {
                let original = command
                    .parameters
                    .first()
                    .and_then(CompiledParameter::as_int)
                    .and_then(|id| u16::try_from(id).ok())
                    .ok_or_else(|| ScriptError::new(ErrorKind::Lookup, "commented row without a command id"))?;
                let syntax = self.syntax(original)?;
                let text = self.render_syntax(&syntax, &command.parameters[1..], true, context)?;
                return Ok((format!("* {}", text), BranchLogic::NOP));
            }
            _ => {}
        }

        let syntax = self.syntax(command.id)?;
        let text = self.render_syntax(&syntax, &command.parameters, false, context)?;
        Ok((text, self.logic(&syntax, command)))
    }

    fn render_syntax(
        &self,
        syntax: &CommandSyntax,
        parameters: &[CompiledParameter],
        commented: bool,
        context: &TranslateContext,
    ) -> Result<String, ScriptError> {
        let retvar = syntax.return_value_index().and_then(|index| parameters.get(index));
        let prefix = match retvar.and_then(|p| p.as_int()).and_then(ReturnValue::decode) {
            Some(rv) if rv.return_type == ReturnType::Assignment => {
                let role = syntax.return_value_role().unwrap_or(ParameterRole::ReturnValue);
                retvar.map(|p| format!("{} = ", Parameter::translate(role, p, context))).unwrap_or_default()
            }
            Some(rv) => conditional_prefix(rv.conditional),
            None => String::new(),
        };

        if syntax.id == CMD_EXPRESSION {
            let infix = match split_expression(parameters.get(1..).unwrap_or_default(), commented) {
                Some((postfix, infix)) => infix
                    .iter()
                    .map(|element| match (element.data_type, element.as_int()) {
                        (DataType::Integer, Some(reference)) if reference < 0 && !commented => {
                            operand_position(reference)
                                .and_then(|position| postfix.get(position))
                                .ok_or_else(|| {
                                    ScriptError::new(
                                        ErrorKind::Lookup,
                                        format!("expression operand {} has no postfix entry", reference),
                                    )
                                })
                        }
                        _ => Ok(element),
                    })
                    .map(|element| element.map(|e| Parameter::translate(ParameterRole::ExpressionInfix, e, context)))
                    .collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };
            return Ok(format!("{}{}", prefix, infix.join(" ")));
        }

        let declared = syntax.parameters.len().min(parameters.len());
        let slots: Vec<String> = syntax.parameters[..declared]
            .iter()
            .zip(parameters)
            .map(|(slot, parameter)| Parameter::translate(slot.role, parameter, context))
            .collect();

        let mut start = declared;
        if syntax.is_script_call() {
            start += 1;
        }
        let arguments = parameters.get(start..).unwrap_or_default();
        let nulls: Vec<bool> = arguments.iter().map(|a| a.data_type == DataType::Null).collect();
        let shown = visible_arguments(syntax, &nulls, self.trimming);
        let arguments: Vec<String> = arguments[..shown]
            .iter()
            .map(|a| Parameter::translate(ParameterRole::VariableArgument, a, context))
            .collect();

        Ok(format!("{}{}", prefix, render(syntax, &slots, &arguments)))
    }

    fn logic(&self, syntax: &CommandSyntax, command: &CompiledCommand) -> BranchLogic {
        match command.id {
            CMD_END => return BranchLogic::End,
            CMD_ELSE => return BranchLogic::Else,
            _ => {}
        }
        syntax
            .return_value_index()
            .and_then(|index| command.parameters.get(index))
            .and_then(CompiledParameter::as_int)
            .and_then(ReturnValue::decode)
            .filter(|rv| rv.return_type == ReturnType::Jump)
            .map_or(BranchLogic::None, |rv| rv.conditional.logic())
    }
}
