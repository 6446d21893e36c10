use std::fs;
use std::path::Path;

use crate::bytecode::{CompiledCommand, CompiledScript};
use crate::catalog::Catalog;
use crate::config::Preferences;
use crate::error::{CompilerError, ErrorList};
use crate::parser::CommandParser;
use crate::passes::{self, Pass, PassContext};
use crate::script::ScriptFile;
use crate::tree::expand::Expander;
use crate::tree::ScriptTree;

const VERIFICATION: [Pass; 3] = [Pass::ConstantIdentifier, Pass::VariableIdentifier, Pass::CommandVerifier];
const LINKING: [Pass; 3] = [Pass::NodeLinker, Pass::LogicVerifier, Pass::TerminationVerifier];
const GENERATION: [Pass; 2] = [Pass::NodeIndexer, Pass::CommandGenerator];

/// Everything one compilation produced. `output` is only present when
/// there were no errors; warnings never block it.
pub struct Compilation {
    pub tree: ScriptTree,
    pub script: ScriptFile,
    pub errors: ErrorList,
    pub warnings: ErrorList,
    pub output: Option<CompiledScript>,
}

impl Compilation {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.output.is_some()
    }

    pub fn into_result(self) -> Result<CompiledScript, CompilerError> {
        match self.output {
            Some(output) if self.errors.is_empty() => Ok(output),
            _ => Err(CompilerError::Compilation(self.errors)),
        }
    }
}

pub struct ScriptCompiler<'c> {
    catalog: &'c Catalog,
    preferences: Preferences,
}

impl<'c> ScriptCompiler<'c> {
    pub fn new(catalog: &'c Catalog, preferences: Preferences) -> Self {
        Self { catalog, preferences }
    }

    pub fn compile_file(&self, path: &Path, script: ScriptFile) -> Result<Compilation, CompilerError> {
        if !path.exists() {
            return Err(CompilerError::FileNotFound(path.display().to_string()));
        }
        let source = fs::read_to_string(path)?;
        Ok(self.compile(script, &source))
    }

    pub fn compile(&self, mut script: ScriptFile, source: &str) -> Compilation {
        log::info!("compiling {} ({:?})", script.name, script.version);
        let parser = CommandParser::new(self.catalog, script.version, self.preferences.varg_trimming);
        let mut errors = ErrorList::new();
        let mut warnings = ErrorList::new();
        let mut tree = ScriptTree::parse(source, &parser, &mut errors);

        for pass in VERIFICATION {
            self.run(pass, &mut tree, &mut script, &mut errors, &mut warnings);
        }
        Expander::new(&parser, &mut script, &mut errors).run(&mut tree);
        for pass in LINKING {
            self.run(pass, &mut tree, &mut script, &mut errors, &mut warnings);
        }

        let mut output = None;
        if errors.is_empty() {
            let mut compiled = CompiledScript::new(script.name.clone(), script.version);
            for pass in GENERATION {
                compiled.commands.extend(self.run(pass, &mut tree, &mut script, &mut errors, &mut warnings));
            }
            compiled.arguments = script.arguments.clone();
            compiled.variables = script.variables.names().to_vec();
            if errors.is_empty() {
                output = Some(compiled);
            }
        }

        for warning in warnings.iter() {
            log::debug!("{}: warning: {}", script.name, warning);
        }
        match &output {
            Some(compiled) => log::info!("{}: {} commands", script.name, compiled.commands.len()),
            None => log::warn!("{}: {} error(s)", script.name, errors.len()),
        }
        Compilation {
            tree,
            script,
            errors,
            warnings,
            output,
        }
    }

    fn run(
        &self,
        pass: Pass,
        tree: &mut ScriptTree,
        script: &mut ScriptFile,
        errors: &mut ErrorList,
        warnings: &mut ErrorList,
    ) -> Vec<CompiledCommand> {
        let mut context = PassContext::new(self.catalog, script, self.preferences, errors);
        passes::run(pass, tree, &mut context);
        warnings.append(context.warnings);
        context.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::CommandKind;
    use crate::catalog::test_catalog;
    use crate::error::ErrorKind;
    use crate::script::{ArgumentType, ScriptArgument};
    use crate::types::GameVersion;

    fn compile(source: &str) -> Compilation {
        let catalog = test_catalog();
        let compiler = ScriptCompiler::new(&catalog, Preferences::default());
        let mut script = ScriptFile::new("plugin.test", GameVersion::AlbionPrelude);
        script.add_argument(ScriptArgument::new("ship", ArgumentType::Object));
        compiler.compile(script, source)
    }

    #[test]
    fn compiles_a_small_script() {
        let compilation = compile(
            "$fuel = $ship-> get fuel\nif $fuel < 10\nwrite to player logbook 'low'\nend\nreturn $fuel",
        );
        assert!(compilation.is_success(), "{}", compilation.errors);
        let output = compilation.into_result().unwrap();
        assert_eq!(output.variables, ["ship", "fuel"]);
        assert_eq!(output.arguments.len(), 1);
        let kinds: Vec<CommandKind> = output.commands.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            [
                CommandKind::Standard,
                CommandKind::Standard,
                CommandKind::Standard,
                CommandKind::Auxiliary,
                CommandKind::Standard
            ]
        );
        assert_eq!(output.standard_commands().count(), 4);
    }

    #[test]
    fn errors_prevent_generation() {
        let compilation = compile("$x = $ship-> warp home\nreturn null");
        assert!(!compilation.is_success());
        assert!(compilation.output.is_none());
        assert_eq!(compilation.errors.iter().next().unwrap().kind, ErrorKind::Syntax);
        assert!(matches!(compilation.into_result(), Err(CompilerError::Compilation(_))));
    }

    #[test]
    fn errors_from_every_stage_are_collected() {
        let compilation = compile("write to player logbook {Nothing}\nbreak\n$a = 1");
        let kinds: Vec<ErrorKind> = compilation.errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, [ErrorKind::Lookup, ErrorKind::Logic, ErrorKind::Logic]);
    }

    #[test]
    fn warnings_do_not_block_output() {
        let compilation = compile("write to player logbook $missing\nreturn null");
        assert!(compilation.is_success(), "{}", compilation.errors);
        assert_eq!(compilation.warnings.len(), 1);
        assert_eq!(compilation.warnings.iter().next().unwrap().line, 1);
    }

    #[test]
    fn missing_source_file_is_reported() {
        let catalog = test_catalog();
        let compiler = ScriptCompiler::new(&catalog, Preferences::default());
        let script = ScriptFile::new("ghost", GameVersion::AlbionPrelude);
        let result = compiler.compile_file(Path::new("/nonexistent/ghost.msci"), script);
        assert!(matches!(result, Err(CompilerError::FileNotFound(_))));
    }
}
