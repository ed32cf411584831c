//! Thread-local regex cache for pattern compilation
//!
//! Grammar patterns are compiled once per thread, anchored at the match
//! position and in byte mode (`(?-u)`), so they can run on input that is not
//! valid UTF-8.

use hashbrown::HashMap;
use regex::bytes::Regex;
use std::cell::RefCell;

thread_local! {
    /// Thread-local cache of compiled regex patterns
    static REGEX_CACHE: RefCell<HashMap<String, Regex>> = RefCell::new(HashMap::new());
}

/// Get or compile an anchored byte regex for `pattern`
///
/// Returns `None` if the pattern does not compile.
#[inline]
pub fn get_or_compile(pattern: &str) -> Option<Regex> {
    REGEX_CACHE.with(|cache| {
        if let Some(regex) = cache.borrow().get(pattern) {
            return Some(regex.clone());
        }

        match Regex::new(&format!("(?-u)^(?:{})", pattern)) {
            Ok(regex) => {
                cache
                    .borrow_mut()
                    .insert(pattern.to_string(), regex.clone());
                Some(regex)
            }
            Err(_) => None,
        }
    })
}

/// Clear the regex cache
pub fn clear_cache() {
    REGEX_CACHE.with(|cache| cache.borrow_mut().clear());
}

/// Get the number of cached patterns
pub fn cache_size() -> usize {
    REGEX_CACHE.with(|cache| cache.borrow().len())
}
