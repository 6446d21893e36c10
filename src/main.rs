use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

use msci_compiler::bytecode::CompiledScript;
use msci_compiler::catalog::Catalog;
use msci_compiler::config::Config;
use msci_compiler::error::CompilerError;
use msci_compiler::script::{ArgumentType, ScriptArgument, ScriptCallTable, ScriptFile};
use msci_compiler::types::GameVersion;
use msci_compiler::{Decompiler, ScriptCompiler};

#[derive(Parser)]
#[command(author, version, about = "MSCI Script Compiler")]
struct Cli {
    /// Log each compiler pass
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Catalog to use instead of the configured one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a script into its JSON command list
    Compile {
        file: PathBuf,
        /// Where to write the output (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum)]
        game_version: Option<GameVersion>,
        /// Script argument as name:type, in declaration order
        #[arg(long = "argument", value_parser = parse_argument)]
        arguments: Vec<ScriptArgument>,
        /// Signatures of the scripts this one may call
        #[arg(long)]
        scripts: Option<PathBuf>,
    },
    /// Turn a compiled JSON command list back into source
    Decompile {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Manage the configuration of the current environment
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the current configuration
    Show,
    /// Write a configuration file with defaults
    Init,
    /// Print where the configuration file lives
    Path,
}

fn parse_argument(text: &str) -> Result<ScriptArgument, String> {
    let (name, type_name) = text
        .split_once(':')
        .ok_or_else(|| format!("expected name:type, got '{}'", text))?;
    let arg_type = ArgumentType::from_name(type_name).ok_or_else(|| format!("unknown argument type '{}'", type_name))?;
    Ok(ScriptArgument::new(name.trim_start_matches('$'), arg_type))
}

fn setup_logging(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();
    // stdout carries compiled output, so logs go to stderr.
    if let Err(e) = WriteLogger::init(level, config, std::io::stderr()) {
        eprintln!("Warning: logging unavailable: {}", e);
    }
}

fn load_catalog(cli_catalog: &Option<PathBuf>, config: &Config) -> Result<Catalog, CompilerError> {
    let path = cli_catalog.as_ref().unwrap_or(&config.catalog);
    log::debug!("loading catalog from {}", path.display());
    Catalog::load(path)
}

fn write_output(output: &Option<PathBuf>, contents: &str) -> Result<(), CompilerError> {
    match output {
        Some(path) => {
            fs::write(path, contents)?;
            log::info!("wrote {}", path.display());
        }
        None => println!("{}", contents),
    }
    Ok(())
}

fn script_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("script")
        .to_string()
}

fn compile_script(
    file: &Path,
    catalog: &Catalog,
    config: &Config,
    version: GameVersion,
    arguments: Vec<ScriptArgument>,
    scripts: Option<&Path>,
) -> Result<CompiledScript, CompilerError> {
    let mut script = ScriptFile::new(&script_name(file), version);
    for argument in arguments {
        script.add_argument(argument);
    }
    if let Some(scripts) = scripts {
        script.script_calls = ScriptCallTable::load(scripts)?;
        log::debug!("{} callable scripts", script.script_calls.len());
    }

    let compiler = ScriptCompiler::new(catalog, config.preferences);
    let compilation = compiler.compile_file(file, script)?;
    for warning in compilation.warnings.iter() {
        eprintln!("{}: warning: {}", file.display(), warning);
    }
    for error in compilation.errors.iter() {
        eprintln!("{}: {}", file.display(), error);
    }
    compilation.into_result()
}

fn run(cli: Cli, config: Config) -> Result<(), CompilerError> {
    match cli.command {
        Commands::Compile {
            file,
            output,
            game_version,
            arguments,
            scripts,
        } => {
            let catalog = load_catalog(&cli.catalog, &config)?;
            let version = game_version.unwrap_or(config.game_version);
            let scripts = scripts.or_else(|| config.scripts.clone());
            let compiled = compile_script(&file, &catalog, &config, version, arguments, scripts.as_deref())?;
            write_output(&output, &compiled.to_json()?)?;
        }
        Commands::Decompile { file, output } => {
            if !file.exists() {
                return Err(CompilerError::FileNotFound(file.display().to_string()));
            }
            let catalog = load_catalog(&cli.catalog, &config)?;
            let compiled = CompiledScript::from_json(&fs::read_to_string(&file)?)?;
            let decompiler = Decompiler::new(&catalog, config.preferences.varg_trimming);
            match decompiler.decompile(&compiled) {
                Ok(source) => write_output(&output, &source)?,
                Err(error) => {
                    eprintln!("{}: {}", file.display(), error);
                    let mut errors = msci_compiler::error::ErrorList::new();
                    errors.push(error);
                    return Err(CompilerError::Compilation(errors));
                }
            }
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                println!("Environment: {}", config.env_name);
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigCommands::Init => {
                let path = Config::get_config_path();
                if path.exists() {
                    println!("Config file already exists at: {}", path.display());
                    println!("Remove it to reinitialize.");
                } else {
                    Config::default().save()?;
                    println!("Initialized new config file at: {}", path.display());
                }
            }
            ConfigCommands::Path => println!("{}", Config::get_config_path().display()),
        },
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let config = Config::load();

    if let Err(e) = run(cli, config) {
        match e {
            CompilerError::Compilation(errors) => eprintln!("Error: {} error(s)", errors.len()),
            other => eprintln!("Error: {}", other),
        }
        std::process::exit(1);
    }
}
