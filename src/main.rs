use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use clap::Parser;

use bish::{codegen::BackendRegistry, compile_file, CompileOptions, Config};

#[derive(Parser)]
#[command(name = "bish")]
#[command(about = "Compiler for the Bish scripting language, targeting Bash")]
#[command(version)]
struct Cli {
    /// Script file to compile, or `-` for stdin
    #[arg()]
    file: Option<PathBuf>,

    /// Compile and immediately run the generated script with `bash`
    #[arg(short = 'r', long = "run")]
    run: bool,

    /// Emit a sourceable library (no `args=(...)`/global-init/`main` trailer)
    #[arg(short = 'l', long = "library")]
    library: bool,

    /// Codegen backend to use
    #[arg(short = 'u', long = "backend", default_value = "bash")]
    backend: String,

    /// List registered codegen backends and exit
    #[arg(long = "list-backends")]
    list_backends: bool,

    /// Arguments forwarded to the generated script when run with `-r`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    if cli.list_backends {
        for name in BackendRegistry::with_default_backends().names() {
            println!("{name}");
        }
        return;
    }

    let Some(file) = cli.file else {
        eprintln!("Error: no input file (use `-` for stdin)");
        std::process::exit(1);
    };

    let config = Config::from_env();
    let options = CompileOptions { library_mode: cli.library, backend: cli.backend };

    let script = match compile_file(&file, &config, &options) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    // The shebang is the driver's concern, not the generator's: the core
    // pipeline only knows it is producing Bash, not that the output is
    // destined for a standalone executable file.
    let script = format!("#!/usr/bin/env bash\n{script}");

    if !cli.run {
        print!("{script}");
        return;
    }

    let mut child = match Command::new("bash")
        .arg("-s")
        .arg("--")
        .args(&cli.args)
        .stdin(Stdio::piped())
        .spawn()
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: failed to spawn bash: {e}");
            std::process::exit(1);
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(script.as_bytes()) {
            eprintln!("Error: failed to write script to bash: {e}");
            std::process::exit(1);
        }
    }

    match child.wait() {
        Ok(status) => std::process::exit(status.code().unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: failed waiting on bash: {e}");
            std::process::exit(1);
        }
    }
}
