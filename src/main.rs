use std::io::Read;

use clap::Parser;
use shellcore::{commands, parser, run_program, Session};

#[derive(Parser)]
#[command(name = "shellcore")]
#[command(about = "A small embeddable command-shell language")]
#[command(version)]
struct Cli {
    /// Execute the script from the command line argument
    #[arg(short = 'c')]
    script: Option<String>,

    /// Output the result as JSON (value, stdout, stderr, error)
    #[arg(long = "json")]
    json: bool,

    /// Script file to execute
    #[arg()]
    script_file: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let script = if let Some(s) = cli.script {
        s
    } else if let Some(ref file) = cli.script_file {
        match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error: cannot read script file: {}: {}", file, e);
                std::process::exit(1);
            }
        }
    } else {
        use std::io::IsTerminal;
        if std::io::stdin().is_terminal() {
            eprintln!("Error: no script provided. Use -c 'script', a script file, or pipe via stdin.");
            std::process::exit(1);
        }
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).unwrap_or_default();
        buf
    };

    let session = Session::new();
    commands::install(&session);

    let program = match parser::parse_program(&script) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let result = run_program(&session, &script, &program, None);
    let streams = session.streams();
    let stdout = streams.stdout.contents_string();
    let stderr = streams.stderr.contents_string();

    let (value_text, error_text, exit_code) = match &result {
        Ok(v) => (v.display_string(), String::new(), 0),
        Err(e) => (String::new(), e.to_string(), 1),
    };

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "value": value_text,
                "stdout": stdout,
                "stderr": stderr,
                "error": error_text,
            })
        );
    } else {
        if !stdout.is_empty() {
            print!("{}", stdout);
        }
        if !stderr.is_empty() {
            eprint!("{}", stderr);
        }
        if let Err(e) = &result {
            eprintln!("{}", e);
        }
    }

    std::process::exit(exit_code);
}
