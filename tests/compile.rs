use std::path::{Path, PathBuf};

use msci_compiler::bytecode::{CommandKind, CompiledScript};
use msci_compiler::catalog::Catalog;
use msci_compiler::config::Preferences;
use msci_compiler::error::ErrorKind;
use msci_compiler::script::{ArgumentType, ScriptArgument, ScriptCallTable, ScriptFile};
use msci_compiler::types::{GameVersion, VargTrimming};
use msci_compiler::{Decompiler, ScriptCompiler};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

fn catalog() -> Catalog {
    Catalog::load(&fixture("catalog.json")).unwrap()
}

fn script(name: &str) -> ScriptFile {
    let mut script = ScriptFile::new(name, GameVersion::TerranConflict);
    script.add_argument(ScriptArgument::new("home", ArgumentType::Object));
    script.script_calls = ScriptCallTable::load(&fixture("scripts.json")).unwrap();
    script
}

#[test]
fn compiles_fixture_script() {
    let catalog = catalog();
    let compiler = ScriptCompiler::new(&catalog, Preferences::default());
    let compilation = compiler.compile_file(&fixture("refuel.msci"), script("refuel")).unwrap();
    assert!(compilation.errors.is_empty(), "{}", compilation.errors);
    assert!(compilation.warnings.is_empty(), "{}", compilation.warnings);

    let output = compilation.into_result().unwrap();
    assert_eq!(output.variables, ["home", "fuel", "max", "text"]);
    // Source lines plus the loop jump and the jump over the else branch.
    assert_eq!(output.commands.len(), 20);

    // Every jump lands inside the script or one past its end.
    let standard = output.standard_commands().count() as i32;
    for command in &output.commands {
        if command.kind == CommandKind::Auxiliary {
            assert!(command.reference.unwrap() as i32 <= standard);
        }
    }
    let first = &output.commands[0];
    assert_eq!(first.kind, CommandKind::Auxiliary);
    assert_eq!(first.reference, Some(0));
}

#[test]
fn compiled_output_survives_json() {
    let catalog = catalog();
    let compiler = ScriptCompiler::new(&catalog, Preferences::default());
    let output = compiler
        .compile_file(&fixture("refuel.msci"), script("refuel"))
        .unwrap()
        .into_result()
        .unwrap();
    let json = output.to_json().unwrap();
    assert_eq!(CompiledScript::from_json(&json).unwrap(), output);
}

#[test]
fn decompiles_back_to_source() {
    let catalog = catalog();
    let compiler = ScriptCompiler::new(&catalog, Preferences::default());
    let output = compiler
        .compile_file(&fixture("refuel.msci"), script("refuel"))
        .unwrap()
        .into_result()
        .unwrap();
    let source = Decompiler::new(&catalog, VargTrimming::TrailingNulls)
        .decompile(&output)
        .unwrap();

    let lines: Vec<&str> = source.lines().collect();
    assert_eq!(lines.len(), 18);
    assert_eq!(lines[0], "* keeps the ship supplied with energy cells");
    assert_eq!(lines[1], "$fuel = [THIS]-> get true amount of {Energy Cells} in cargo bay");
    assert_eq!(lines[3], "while $fuel < $max / 2");
    assert_eq!(lines[4], " if not [THIS]-> is docked");
    assert_eq!(lines[5], "  start [THIS]-> fly to station $home");
    assert_eq!(lines[6], " else");
    assert!(lines[7].starts_with("  [THIS]-> call script 'lib.trade.unload' :"));
    assert_eq!(lines[9], " wait 1000 ms");
    assert_eq!(lines[11], " skip if $fuel");
    assert_eq!(lines[12], " write to player logbook 'out of fuel'");
    assert_eq!(lines[13], "end");
    assert_eq!(lines[14], "");
    assert_eq!(lines[17], "return $fuel");
}

#[test]
fn reports_every_problem_in_a_broken_script() {
    let catalog = catalog();
    let compiler = ScriptCompiler::new(&catalog, Preferences::default());
    let compilation = compiler.compile_file(&fixture("broken.msci"), script("broken")).unwrap();
    assert!(compilation.output.is_none());

    let found: Vec<(usize, ErrorKind)> = compilation.errors.iter().map(|e| (e.line, e.kind)).collect();
    assert_eq!(
        found,
        [
            (4, ErrorKind::Lookup),
            (5, ErrorKind::Argument),
            (5, ErrorKind::Argument),
            (5, ErrorKind::Argument),
            (7, ErrorKind::Verification),
            (8, ErrorKind::Logic),
            (8, ErrorKind::Logic),
        ]
    );
    assert!(!compilation.errors.has_algorithm_errors());

    let warnings: Vec<(usize, &str)> = compilation.warnings.iter().map(|w| (w.line, w.message.as_str())).collect();
    assert_eq!(warnings, [(7, "$ship is read but never assigned")]);
}

#[test]
fn relaxed_preferences_skip_argument_checks() {
    let catalog = catalog();
    let preferences = Preferences {
        check_argument_names: false,
        check_argument_types: false,
        ..Preferences::default()
    };
    let compiler = ScriptCompiler::new(&catalog, preferences);
    let compilation = compiler.compile_file(&fixture("broken.msci"), script("broken")).unwrap();
    let arguments = compilation.errors.iter().filter(|e| e.kind == ErrorKind::Argument).count();
    assert_eq!(arguments, 1);
}

#[test]
fn version_limits_available_commands() {
    let catalog = catalog();
    let compiler = ScriptCompiler::new(&catalog, Preferences::default());
    let source = "$range = [THIS]-> get jump range\nreturn $range";

    let reunion = ScriptFile::new("jump", GameVersion::Reunion);
    let compilation = compiler.compile(reunion, source);
    assert_eq!(compilation.errors.iter().next().unwrap().kind, ErrorKind::Syntax);

    let albion = ScriptFile::new("jump", GameVersion::AlbionPrelude);
    assert!(compiler.compile(albion, source).is_success());
}
