//! The `lime` binary.
//!
//! Two modes: `lime --c` compiles a source program (optionally writing a
//! disassembly listing and either executing in-process or persisting a
//! `.lmx` image), and `lime --x` loads and executes a persisted image.
//! Every compile or runtime diagnostic is a single stderr line and a
//! nonzero exit.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use lime_compiler::CompileError;
use lime_vm::error::{ImageError, VmError};
use lime_vm::interpreter::Vm;

#[derive(Debug, Parser)]
#[command(name = "lime", about = "Compile and execute Lime programs")]
#[command(group(ArgGroup::new("mode").required(true).args(["compile", "execute"])))]
struct Args {
    /// Compile a source program
    #[arg(long = "c")]
    compile: bool,

    /// Execute a persisted bytecode image
    #[arg(long = "x")]
    execute: bool,

    /// Read source from stdin instead of a file
    #[arg(long, requires = "compile")]
    stdin: bool,

    /// Write a disassembly listing to this file
    #[arg(long, value_name = "FILE", requires = "compile")]
    dasm: Option<PathBuf>,

    /// Execute the compiled program immediately
    #[arg(long, requires = "compile", conflicts_with = "gen")]
    exec: bool,

    /// Persist the compiled bytecode to this file
    #[arg(long, value_name = "FILE", requires = "compile")]
    gen: Option<PathBuf>,

    /// Source file (`--c`) or bytecode image (`--x`)
    file: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Compile(#[from] CompileError),
    #[error("{0}")]
    Runtime(#[from] VmError),
    #[error("{0}")]
    Image(#[from] ImageError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Usage(String),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Usage problems (and --help/--version) exit with status 1.
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), CliError> {
    if args.execute {
        return execute_image(&args);
    }

    compile_source(&args)
}

fn execute_image(args: &Args) -> Result<(), CliError> {
    let Some(file) = &args.file else {
        return Err(CliError::Usage("--x requires a bytecode image file".into()));
    };

    let mut vm = Vm::new();
    vm.load(file)?;
    vm.run()?;

    Ok(())
}

fn compile_source(args: &Args) -> Result<(), CliError> {
    let source = read_source(args)?;

    let mut vm = Vm::new();
    lime_compiler::compile_into(&source, &mut vm)?;

    if let Some(path) = &args.dasm {
        vm.dasm_to_path(path)?;
    }
    if let Some(path) = &args.gen {
        vm.save(path)?;
    }
    if args.exec {
        vm.run()?;
    }

    Ok(())
}

fn read_source(args: &Args) -> Result<String, CliError> {
    if args.stdin {
        if args.file.is_some() {
            return Err(CliError::Usage(
                "cannot specify both --stdin and a filename".into(),
            ));
        }

        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        return Ok(source);
    }

    let Some(file) = &args.file else {
        return Err(CliError::Usage(
            "--c requires a source file (or --stdin)".into(),
        ));
    };

    Ok(fs::read_to_string(file)?)
}
