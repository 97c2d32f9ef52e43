//! Thread-local cache of compiled tree-sitter queries.
//!
//! Rules tend to issue the same query against every file they check. Caching
//! the compiled query per worker thread avoids recompiling it each time.
//! Cache is capped at 256 entries; when full it is cleared and rebuilt on
//! demand.

use crate::lang::LanguageTag;
use crate::syntax::SyntaxError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use tree_sitter::Query;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    // Keyed by language as well: the same source means different things
    // (or nothing at all) in another grammar.
    static QUERY_CACHE: RefCell<HashMap<(LanguageTag, String), Arc<Query>>> =
        RefCell::new(HashMap::new());
}

/// Get a compiled query from cache, or compile and cache it.
///
/// Sources that fail to compile are not cached.
pub fn get_or_compile_query(
    language: LanguageTag,
    source: &str,
) -> Result<Arc<Query>, SyntaxError> {
    let key = (language, source.to_string());

    QUERY_CACHE.with(|cache| {
        if let Some(query) = cache.borrow().get(&key) {
            return Ok(Arc::clone(query));
        }

        let query = Query::new(&language.ts_language(), source).map_err(|e| {
            SyntaxError::InvalidQuery {
                language,
                message: e.to_string(),
            }
        })?;
        let query = Arc::new(query);

        let mut cache = cache.borrow_mut();
        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }
        cache.insert(key, Arc::clone(&query));
        Ok(query)
    })
}

/// Clear the query cache (mainly for testing).
pub fn clear_cache() {
    QUERY_CACHE.with(|cache| cache.borrow_mut().clear());
}

/// Number of cached queries on the current thread.
pub fn cache_size() -> usize {
    QUERY_CACHE.with(|cache| cache.borrow().len())
}
