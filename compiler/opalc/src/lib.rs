//! Driver library: source files → resolved program → execution.
//!
//! The pipeline is strictly staged: every file is lexed and parsed into
//! one global declaration list, the resolver produces the typed program,
//! and the interpreter runs it. The first diagnostic from any stage
//! aborts the compilation; callers observe a single `Result`.

use opal_diagnostic::{Diagnostic, SourceMap};
use opal_eval::{Interpreter, PrintHandler, RuntimeError};
use opal_ir::StringInterner;
use opal_resolve::ResolvedProgram;
use tracing::debug;

/// A fully compiled program plus everything needed to run or report on
/// it.
pub struct Compilation {
    pub sources: SourceMap,
    pub interner: StringInterner,
    pub program: ResolvedProgram,
}

/// A failed compilation: the diagnostic plus the source map needed to
/// render its location.
#[derive(Debug)]
pub struct CompileError {
    pub sources: SourceMap,
    pub diagnostic: Diagnostic,
}

impl CompileError {
    pub fn render(&self) -> String {
        self.diagnostic.render(&self.sources)
    }
}

/// Compile a list of `(name, text)` source files.
pub fn compile(files: Vec<(String, String)>) -> Result<Compilation, Box<CompileError>> {
    let interner = StringInterner::new();
    let mut sources = SourceMap::new();
    let mut decls = Vec::new();

    for (name, text) in files {
        debug!(file = %name, bytes = text.len(), "compiling");
        sources.add_file(name, text);
        let file = sources.files().last().expect("file was just added");
        let tokens = match opal_lexer::lex(&file.text, file.base, &interner) {
            Ok(tokens) => tokens,
            Err(err) => {
                return Err(Box::new(CompileError { sources, diagnostic: err.into() }))
            }
        };
        match opal_parse::parse(&tokens, &interner) {
            Ok(parsed) => decls.extend(parsed),
            Err(diagnostic) => return Err(Box::new(CompileError { sources, diagnostic })),
        }
    }

    match opal_resolve::resolve(&decls, &interner) {
        Ok(program) => Ok(Compilation { sources, interner, program }),
        Err(diagnostic) => Err(Box::new(CompileError { sources, diagnostic })),
    }
}

/// Compile a single in-memory source, for tests and tooling.
pub fn compile_source(
    name: &str,
    text: &str,
) -> Result<Compilation, Box<CompileError>> {
    compile(vec![(name.to_string(), text.to_string())])
}

/// Run a compiled program with output to stdout. Returns the exit code.
pub fn run(compilation: &Compilation, args: &[String]) -> Result<i32, RuntimeError> {
    let mut interp = Interpreter::new(
        &compilation.program.hir,
        &compilation.program.types,
        &compilation.interner,
        PrintHandler::stdout(),
    );
    interp.run(args)
}

/// Run a compiled program capturing its output. Returns the exit code
/// and everything `print` wrote.
pub fn run_captured(
    compilation: &Compilation,
    args: &[String],
) -> Result<(i32, String), RuntimeError> {
    let mut interp = Interpreter::new(
        &compilation.program.hir,
        &compilation.program.types,
        &compilation.interner,
        PrintHandler::buffer(),
    );
    let code = interp.run(args)?;
    Ok((code, interp.output().to_string()))
}
