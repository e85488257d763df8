//! Opal compiler CLI.

use opalc::{compile, run, Compilation};

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = args[1].as_str();
    match command {
        "run" => {
            if args.len() < 3 {
                eprintln!("Usage: opalc run <file.opal> [program args...]");
                std::process::exit(1);
            }
            run_file(&args[2], &args[3..]);
        }
        "check" => {
            if args.len() < 3 {
                eprintln!("Usage: opalc check <file.opal>");
                std::process::exit(1);
            }
            let _ = compile_file(&args[2]);
            println!("ok");
        }
        "lex" => {
            if args.len() < 3 {
                eprintln!("Usage: opalc lex <file.opal>");
                std::process::exit(1);
            }
            lex_file(&args[2]);
        }
        "parse" => {
            if args.len() < 3 {
                eprintln!("Usage: opalc parse <file.opal>");
                std::process::exit(1);
            }
            parse_file(&args[2]);
        }
        "help" | "--help" | "-h" => print_usage(),
        "version" | "--version" | "-v" => println!("opalc {}", env!("CARGO_PKG_VERSION")),
        _ => {
            // A bare .opal path is shorthand for `run`.
            if std::path::Path::new(command)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("opal"))
            {
                run_file(command, &args[2..]);
            } else {
                eprintln!("Unknown command: {command}");
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }
}

fn read_source(path: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("error: cannot read {path}: {err}");
            std::process::exit(1);
        }
    }
}

fn compile_file(path: &str) -> Compilation {
    let text = read_source(path);
    match compile(vec![(path.to_string(), text)]) {
        Ok(compilation) => compilation,
        Err(err) => {
            eprintln!("{}", err.render());
            std::process::exit(1);
        }
    }
}

fn run_file(path: &str, args: &[String]) {
    let compilation = compile_file(path);
    match run(&compilation, args) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            opal_diagnostic::Diagnostic::from(err).emit(&compilation.sources);
            std::process::exit(1);
        }
    }
}

fn lex_file(path: &str) {
    let text = read_source(path);
    let interner = opal_ir::StringInterner::new();
    match opal_lexer::lex(&text, 1, &interner) {
        Ok(tokens) => {
            for token in &tokens {
                println!(
                    "{:>10} {}",
                    token.kind.category(),
                    token.kind.source_text(&interner)
                );
            }
        }
        Err(err) => {
            let mut sources = opal_diagnostic::SourceMap::new();
            sources.add_file(path, text);
            opal_diagnostic::Diagnostic::from(err).emit(&sources);
            std::process::exit(1);
        }
    }
}

fn parse_file(path: &str) {
    let text = read_source(path);
    let interner = opal_ir::StringInterner::new();
    let mut sources = opal_diagnostic::SourceMap::new();
    sources.add_file(path, text);
    let file = sources.files().last().expect("file was just added");
    let tokens = match opal_lexer::lex(&file.text, file.base, &interner) {
        Ok(tokens) => tokens,
        Err(err) => {
            opal_diagnostic::Diagnostic::from(err).emit(&sources);
            std::process::exit(1);
        }
    };
    match opal_parse::parse(&tokens, &interner) {
        Ok(decls) => {
            for decl in &decls {
                println!("{decl:#?}");
            }
        }
        Err(diagnostic) => {
            diagnostic.emit(&sources);
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("OPAL_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_usage() {
    println!("Opal compiler");
    println!();
    println!("Usage: opalc <command> [options]");
    println!();
    println!("Commands:");
    println!("  run <file.opal> [args...]  Run a program through the interpreter");
    println!("  check <file.opal>          Compile without executing");
    println!("  parse <file.opal>          Parse and display the syntax tree");
    println!("  lex <file.opal>            Tokenize and display tokens");
    println!("  help                       Show this help message");
    println!("  version                    Show version information");
    println!();
    println!("Examples:");
    println!("  opalc run demo.opal");
    println!("  opalc demo.opal            # shorthand for 'run'");
    println!();
    println!("Set OPAL_LOG=debug for compiler phase tracing.");
}
