//! Resource sorter (§4.5).
//!
//! A stable topological sort of resources by capability/requirement
//! matching: if `A` requires something `B` provides, `B` precedes `A`.
//! Grounded on the closure evaluator's own depth-first, visited-set-guarded
//! walk (§4.1 `ARRAY` splicing, §4.6 overlay's parent-graph walk) — the same
//! "mark on enter, recurse, append on return" shape reappears here applied
//! to a capability/requirement graph instead of a parent-profile graph.

use indexmap::IndexMap;

use crate::value::Value;

/// A capability a resource exposes: a namespace plus an attribute map other
/// resources' requirements can match against.
#[derive(Debug, Clone)]
pub struct Capability {
    pub namespace: String,
    pub attributes: IndexMap<String, Value>,
}

impl Capability {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), attributes: IndexMap::new() }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// A requirement: a namespace plus an optional filter. `None` matches any
/// capability in that namespace.
#[derive(Debug, Clone)]
pub struct Requirement {
    pub namespace: String,
    pub filter: Option<Filter>,
}

impl Requirement {
    pub fn new(namespace: impl Into<String>, filter: Option<Filter>) -> Self {
        Self { namespace: namespace.into(), filter }
    }

    fn matches(&self, cap: &Capability) -> bool {
        if cap.namespace != self.namespace {
            return false;
        }
        match &self.filter {
            None => true,
            Some(f) => f.matches(&cap.attributes),
        }
    }
}

/// A flat `key=value,...` equality filter, e.g. the `(n=1)` in the spec's
/// worked example. Parenthesized forms have their outer parens stripped.
#[derive(Debug, Clone)]
pub struct Filter {
    clauses: Vec<(String, String)>,
}

impl Filter {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let inner = trimmed
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or(trimmed);
        let clauses = inner
            .split(',')
            .filter_map(|clause| {
                let clause = clause.trim();
                if clause.is_empty() {
                    return None;
                }
                let (k, v) = clause.split_once('=')?;
                Some((k.trim().to_string(), v.trim().to_string()))
            })
            .collect();
        Self { clauses }
    }

    fn matches(&self, attributes: &IndexMap<String, Value>) -> bool {
        self.clauses.iter().all(|(k, v)| {
            attributes.get(k).map(|av| &av.display_string() == v).unwrap_or(false)
        })
    }
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub id: String,
    pub capabilities: Vec<Capability>,
    pub requirements: Vec<Requirement>,
}

impl Resource {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), capabilities: Vec::new(), requirements: Vec::new() }
    }

    pub fn with_capability(mut self, cap: Capability) -> Self {
        self.capabilities.push(cap);
        self
    }

    pub fn with_requirement(mut self, req: Requirement) -> Self {
        self.requirements.push(req);
        self
    }
}

/// Sort `resources` so providers precede their consumers (§4.5). Cycles are
/// tolerated: a resource reached while already on the current walk is simply
/// skipped, since the visited set is append-only and checked once per node.
pub fn sort(resources: &[Resource]) -> Vec<Resource> {
    let mut capability_index: IndexMap<&str, Vec<(usize, &Capability)>> = IndexMap::new();
    for (i, r) in resources.iter().enumerate() {
        for cap in &r.capabilities {
            capability_index.entry(cap.namespace.as_str()).or_default().push((i, cap));
        }
    }

    let mut visited = vec![false; resources.len()];
    let mut order = Vec::with_capacity(resources.len());

    fn visit(
        i: usize,
        resources: &[Resource],
        capability_index: &IndexMap<&str, Vec<(usize, &Capability)>>,
        visited: &mut [bool],
        order: &mut Vec<usize>,
    ) {
        if visited[i] {
            return;
        }
        visited[i] = true;
        for req in &resources[i].requirements {
            if let Some(providers) = capability_index.get(req.namespace.as_str()) {
                for (j, cap) in providers {
                    if req.matches(cap) {
                        visit(*j, resources, capability_index, visited, order);
                    }
                }
            }
        }
        order.push(i);
    }

    for i in 0..resources.len() {
        visit(i, resources, &capability_index, &mut visited, &mut order);
    }

    order.into_iter().map(|i| resources[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_precedes_its_consumer_and_unsatisfied_requirement_keeps_input_order() {
        // A requires ns=x filter=(n=1), B provides ns=x n=1, C requires
        // ns=x filter=(n=2) with no provider (§8 scenario 6).
        let a = Resource::new("A").with_requirement(Requirement::new("x", Some(Filter::parse("(n=1)"))));
        let b = Resource::new("B").with_capability(Capability::new("x").with_attr("n", Value::Int(1)));
        let c = Resource::new("C").with_requirement(Requirement::new("x", Some(Filter::parse("(n=2)"))));

        let sorted = sort(&[a, b, c]);
        let ids: Vec<&str> = sorted.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
    }

    #[test]
    fn a_requirement_with_no_filter_matches_any_capability_in_its_namespace() {
        let a = Resource::new("A").with_requirement(Requirement::new("x", None));
        let b = Resource::new("B").with_capability(Capability::new("x"));
        let sorted = sort(&[a, b]);
        let ids: Vec<&str> = sorted.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
    }

    #[test]
    fn cycles_are_absorbed_instead_of_erroring() {
        let a = Resource::new("A")
            .with_capability(Capability::new("a"))
            .with_requirement(Requirement::new("b", None));
        let b = Resource::new("B")
            .with_capability(Capability::new("b"))
            .with_requirement(Requirement::new("a", None));
        let sorted = sort(&[a, b]);
        assert_eq!(sorted.len(), 2);
    }
}
