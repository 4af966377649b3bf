//! Signature pattern compiler.
//!
//! Patterns are a restricted regular-expression language over bytes:
//!
//! | syntax  | meaning                              |
//! |---------|--------------------------------------|
//! | `\xHH`  | the byte `0xHH`                      |
//! | `.`     | any byte                             |
//! | `(...)` | grouping                             |
//! | `a\|b`  | alternation                          |
//! | `?*+`   | zero-or-one, zero-or-more, one-or-more |
//! | other   | the ASCII byte of the character      |
//!
//! There are no character classes, anchors, captures or backreferences.
//! Compilation goes tokens → explicit-concatenation infix → postfix → NFA.

mod cache;
pub mod lexer;
pub mod nfa;
pub mod postfix;

use std::sync::Arc;

pub use lexer::{tokenize, tokens_to_string, Token};
pub use nfa::{Edge, Nfa, StateId, Transition};
pub use postfix::parse_to_postfix;

use crate::error::Result;

/// Compiles `pattern` into a fresh automaton.
pub fn compile_uncached(pattern: &str) -> Result<Nfa> {
    let postfix = parse_to_postfix(pattern)?;
    Ok(nfa::build(&postfix))
}

/// Compiles `pattern`, reusing the process-wide compiled copy when the exact
/// same pattern string was compiled before.
pub fn compile(pattern: &str) -> Result<Arc<Nfa>> {
    cache::get_or_compile(pattern, compile_uncached)
}
