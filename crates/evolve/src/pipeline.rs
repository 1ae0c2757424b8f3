//! Source-to-value pipeline.

use std::rc::Rc;

use evolve_eval::{builtins, EvalConfig, Environment, Evaluator, Value};
use evolve_lexer::Lexer;
use evolve_parser::Parser;
use evolve_types::ast::Node;
use evolve_types::{Result, SourceFile};
use log::debug;

/// Run one program from source to completion or its first error.
///
/// Builtins write to stdout.
pub fn run(source_name: &str, source_text: &str) -> Result<Option<Value>> {
    let config = EvalConfig::default();
    let env = Environment::root(config.root_name.as_str());
    builtins::install(&env, std::io::stdout());
    run_in(&env, source_name, source_text, &config)
}

/// Run a program against `env`.
///
/// Every name visible in `env` counts as declared while parsing, and the
/// program's top-level bindings are left in `env` afterwards.
pub fn run_in(
    env: &Environment,
    source_name: &str,
    source_text: &str,
    config: &EvalConfig,
) -> Result<Option<Value>> {
    debug!("running {source_name} in '{}'", env.name());
    let source = Rc::new(SourceFile::new(source_name, source_text));
    let program = parse_in(&source, env.names())?;
    Evaluator::new(source, config.clone()).evaluate(&program, env)
}

/// Lex and parse a program without running it. Only names the program
/// declares itself are considered defined.
pub fn parse_source(source_name: &str, source_text: &str) -> Result<Node> {
    let source = SourceFile::new(source_name, source_text);
    parse_in(&source, Vec::new())
}

fn parse_in(source: &SourceFile, globals: Vec<String>) -> Result<Node> {
    let tokens = Lexer::new(source).lex()?;
    Parser::new(tokens, source).with_globals(globals).parse()
}
