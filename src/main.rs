//! coqmap command-line interface.
//!
//! Thin plumbing over the library: every subcommand builds a [`Resolver`]
//! from the shared flags and prints the result as text or JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::error;
use tracing_subscriber::EnvFilter;

use coqmap::{
    identity_transform, Config, LibraryName, PathBinding, Resolver, SearchTable,
    ALL_ABSOLUTIZE_KINDS, IMPORT_ABSOLUTIZE_KINDS,
};

#[derive(Parser)]
#[command(name = "coqmap", version, about = "Import resolution and identifier absolutization for Coq source trees")]
struct Cli {
    /// Workspace root all paths are relative to.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Physical/logical binding, repeatable; first match wins.
    #[arg(long = "bind", global = true, value_name = "PHYSICAL=LOGICAL")]
    bindings: Vec<PathBinding>,

    /// Compiler binary handed to the makefile generator.
    #[arg(long, global = true, default_value = "coqc")]
    coqc: String,

    /// Makefile generator binary.
    #[arg(long, global = true, default_value = "coq_makefile")]
    coq_makefile: String,

    /// Do not feed the whole source tree to the makefile generator.
    #[arg(long, global = true)]
    no_walk: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Map a library name to the file implementing it.
    Resolve {
        library: String,
        /// Extension to append (with its leading dot).
        #[arg(long, default_value = ".v")]
        ext: String,
    },
    /// Map a file path back to its library name.
    Unresolve { path: PathBuf },
    /// List the direct imports of a library.
    Imports {
        library: String,
        /// Scan the source text instead of consulting glob artifacts.
        #[arg(long)]
        fast: bool,
    },
    /// List the transitive import closure of a library.
    Closure {
        library: String,
        /// Scan source texts instead of consulting glob artifacts.
        #[arg(long)]
        fast: bool,
    },
    /// Print a source file with its references absolutized.
    Qualify {
        file: PathBuf,
        /// Qualify every reference kind, not just imports.
        #[arg(long)]
        all: bool,
        /// Regenerate the glob artifact first.
        #[arg(long)]
        update_globs: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let table = if cli.bindings.is_empty() {
        SearchTable::default()
    } else {
        cli.bindings.iter().cloned().collect()
    };
    let mut config = Config::new(&cli.root)
        .with_table(table)
        .with_coqc(cli.coqc.clone())
        .with_coq_makefile(cli.coq_makefile.clone());
    if cli.no_walk {
        config = config.without_tree_walk();
    }
    let resolver = Resolver::new(config);

    match run(&cli, &resolver) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli, resolver: &Resolver) -> coqmap::Result<()> {
    match &cli.command {
        Command::Resolve { library, ext } => {
            let path = resolver.path_of_library(&LibraryName::new(library), ext);
            if cli.json {
                println!("{}", json!({ "library": library, "path": path }));
            } else {
                println!("{}", path.display());
            }
        }
        Command::Unresolve { path } => {
            let library = resolver.library_of_path(path);
            if cli.json {
                println!("{}", json!({ "path": path, "library": library }));
            } else {
                println!("{library}");
            }
        }
        Command::Imports { library, fast } => {
            let imports = resolver.direct_imports(&LibraryName::new(library), *fast)?;
            if cli.json {
                println!("{}", json!({ "library": library, "imports": imports }));
            } else {
                for import in imports {
                    println!("{import}");
                }
            }
        }
        Command::Closure { library, fast } => {
            let closure = resolver.transitive_imports(&LibraryName::new(library), *fast)?;
            if cli.json {
                println!("{}", json!({ "library": library, "closure": closure }));
            } else {
                for name in closure {
                    println!("{name}");
                }
            }
        }
        Command::Qualify {
            file,
            all,
            update_globs,
        } => {
            let kinds = if *all {
                ALL_ABSOLUTIZE_KINDS
            } else {
                IMPORT_ABSOLUTIZE_KINDS
            };
            let text =
                resolver.qualified_source(file, kinds, *update_globs, &identity_transform)?;
            print!("{text}");
        }
    }
    Ok(())
}
