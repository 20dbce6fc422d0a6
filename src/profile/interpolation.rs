//! Placeholder interpolation (§4.7).
//!
//! Lazy, cycle-safe `${...}` substitution over a `pid -> key -> text`
//! configuration space, with pluggable resolvers tried by scheme before the
//! generic `${var}` expansion pass runs. Grounded on the pipeline engine's
//! own cooperative-cancellation-via-shared-flag pattern (`crate::pipeline`)
//! — here the "in progress" set plays the same role, guarding against
//! unbounded recursion instead of unbounded blocking.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

/// The reserved scheme that runs its resolvers last, after `${var}`
/// expansion, regardless of the scheme the raw value carried (§4.7 step 4).
pub const CATCH_ALL_SCHEME: &str = "*";

/// `{scheme, resolve(pid, key, value) -> Text | None}` (§6).
pub trait PlaceholderResolver {
    fn scheme(&self) -> Option<&str>;
    fn resolve(&self, pid: &str, key: &str, value: &str) -> Option<String>;
}

/// A `pid -> key -> text` view over a flattened profile's properties.
#[derive(Debug, Clone, Default)]
pub struct ConfigSpace {
    configs: IndexMap<String, IndexMap<String, String>>,
}

impl ConfigSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, pid: impl Into<String>, key: impl Into<String>, value: impl Into<String>) {
        self.configs.entry(pid.into()).or_default().insert(key.into(), value.into());
    }

    fn raw(&self, pid: &str, key: &str) -> Option<&str> {
        self.configs.get(pid)?.get(key).map(String::as_str)
    }
}

/// Lazily interpolates a `ConfigSpace` against a resolver chain, memoising
/// each `(pid, key)` result on first read (§4.7 "computed on demand and
/// memoised").
pub struct Interpolator<'a> {
    space: &'a ConfigSpace,
    resolvers: Vec<&'a dyn PlaceholderResolver>,
    final_substitution: bool,
    cache: RefCell<HashMap<(String, String), String>>,
    in_progress: RefCell<HashSet<(String, String)>>,
}

impl<'a> Interpolator<'a> {
    pub fn new(space: &'a ConfigSpace, resolvers: Vec<&'a dyn PlaceholderResolver>, final_substitution: bool) -> Self {
        Self {
            space,
            resolvers,
            final_substitution,
            cache: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(HashSet::new()),
        }
    }

    /// The interpolated value for `pid`'s `key`, or `None` if no such entry
    /// exists in the configuration space at all.
    pub fn get(&self, pid: &str, key: &str) -> Option<String> {
        let cache_key = (pid.to_string(), key.to_string());
        if let Some(v) = self.cache.borrow().get(&cache_key) {
            return Some(v.clone());
        }

        let raw = self.space.raw(pid, key)?.to_string();

        if self.in_progress.borrow().contains(&cache_key) {
            return Some(format!("${{cycle:{}}}", key));
        }
        self.in_progress.borrow_mut().insert(cache_key.clone());

        let resolved = self.substitute(pid, key, &raw);

        self.in_progress.borrow_mut().remove(&cache_key);
        self.cache.borrow_mut().insert(cache_key, resolved.clone());
        Some(resolved)
    }

    fn substitute(&self, pid: &str, key: &str, raw: &str) -> String {
        let mut result = raw.to_string();
        let mut matched = false;

        for r in self.resolvers.iter().filter(|r| r.scheme().is_none()) {
            if let Some(v) = r.resolve(pid, key, &result) {
                result = v;
                matched = true;
                break;
            }
        }

        if !matched {
            if let Some(idx) = result.find(':') {
                let scheme = result[..idx].to_string();
                let rest = result[idx + 1..].to_string();
                for r in self.resolvers.iter().filter(|r| r.scheme() == Some(scheme.as_str())) {
                    if let Some(v) = r.resolve(pid, key, &rest) {
                        result = v;
                        break;
                    }
                }
            }
        }

        result = self.expand_var_refs(pid, &result);

        if self.final_substitution {
            for r in self.resolvers.iter().filter(|r| r.scheme() == Some(CATCH_ALL_SCHEME)) {
                if let Some(v) = r.resolve(pid, key, &result) {
                    result = v;
                }
            }
        }

        result
    }

    /// Expands `${name}` / `${pid:name}` placeholders inline, recursing
    /// through `get` (so cycle detection composes across nested expansion).
    /// A placeholder whose target doesn't exist is left untouched.
    fn expand_var_refs(&self, pid: &str, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '$' && chars.get(i + 1) == Some(&'{') {
                if let Some(end) = chars[i + 2..].iter().position(|&c| c == '}') {
                    let inner: String = chars[i + 2..i + 2 + end].iter().collect();
                    let (ref_pid, ref_key) = match inner.split_once(':') {
                        Some((p, k)) => (p.to_string(), k.to_string()),
                        None => (pid.to_string(), inner.clone()),
                    };
                    match self.get(&ref_pid, &ref_key) {
                        Some(v) => out.push_str(&v),
                        None => {
                            out.push_str("${");
                            out.push_str(&inner);
                            out.push('}');
                        }
                    }
                    i += 2 + end + 1;
                    continue;
                }
            }
            out.push(chars[i]);
            i += 1;
        }
        out
    }
}
