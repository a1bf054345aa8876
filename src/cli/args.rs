// src/cli/args.rs

use crate::state::Mode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Compilation mode argument
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ModeArg {
    #[default]
    Debug,
    Release,
    Test,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Debug => Mode::Debug,
            ModeArg::Release => Mode::Release,
            ModeArg::Test => Mode::Test,
        }
    }
}

/// Stoat programming language compiler
#[derive(Parser)]
#[command(name = "stoat")]
#[command(version = "0.1.0")]
#[command(about = "Stoat programming language compiler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check Stoat source files for errors without emitting anything
    Check {
        /// Paths of the files to check
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Directories searched for imported modules, in order
        #[arg(short, long)]
        include: Vec<PathBuf>,
    },
    /// Compile a Stoat source file and its imports
    Build {
        /// Path of the entry module
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Directories searched for imported modules, in order
        #[arg(short, long)]
        include: Vec<PathBuf>,

        /// Output root for compiled bytecode
        #[arg(short, long)]
        target: Option<PathBuf>,

        /// Compilation mode
        #[arg(short, long, value_enum, default_value_t = ModeArg::Debug)]
        mode: ModeArg,
    },
    /// Print the compiler version
    Version,
}
