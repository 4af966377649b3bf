use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

use crate::error::Result;

use super::nfa::Nfa;

static COMPILED: LazyLock<Mutex<HashMap<String, Arc<Nfa>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Returns the cached automaton for `pattern`, compiling it with `compile` on
/// first use. Failed compilations are not cached.
pub(crate) fn get_or_compile(
    pattern: &str,
    compile: impl FnOnce(&str) -> Result<Nfa>,
) -> Result<Arc<Nfa>> {
    if let Some(nfa) = COMPILED.lock().get(pattern) {
        return Ok(Arc::clone(nfa));
    }

    let nfa = Arc::new(compile(pattern)?);
    let mut cache = COMPILED.lock();
    let entry = cache
        .entry(pattern.to_string())
        .or_insert_with(|| Arc::clone(&nfa));
    Ok(Arc::clone(entry))
}
