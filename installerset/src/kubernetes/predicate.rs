//! Resource predicates
//!
//! Pure selection rules over manifest resources. Phase selectors are built by
//! OR-ing `by_kind` predicates with [`any`].

use std::sync::Arc;

use super::manifest::Resource;

/// Kind of a CustomResourceDefinition, independent of its API version
pub const CRD_KIND: &str = "CustomResourceDefinition";

/// A shareable, pure predicate over resources
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&Resource) -> bool + Send + Sync>);

impl Predicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Resource) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn matches(&self, resource: &Resource) -> bool {
        (self.0)(resource)
    }
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Predicate")
    }
}

/// Matches resources whose kind equals `kind` exactly
pub fn by_kind(kind: impl Into<String>) -> Predicate {
    let kind = kind.into();
    Predicate::new(move |r| r.kind() == kind)
}

/// Matches resources whose name equals `name` exactly
pub fn by_name(name: impl Into<String>) -> Predicate {
    let name = name.into();
    Predicate::new(move |r| r.name() == name)
}

/// Matches namespaced resources living in `namespace`
pub fn in_namespace(namespace: impl Into<String>) -> Predicate {
    let namespace = namespace.into();
    Predicate::new(move |r| r.namespace() == Some(namespace.as_str()))
}

/// Matches any CustomResourceDefinition
pub fn crds() -> Predicate {
    by_kind(CRD_KIND)
}

/// Logical OR. An empty list matches nothing.
pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    let predicates: Vec<Predicate> = predicates.into_iter().collect();
    Predicate::new(move |r| predicates.iter().any(|p| p.matches(r)))
}

/// Logical AND. An empty list matches everything.
pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    let predicates: Vec<Predicate> = predicates.into_iter().collect();
    Predicate::new(move |r| predicates.iter().all(|p| p.matches(r)))
}

/// Logical NOT
pub fn not(predicate: Predicate) -> Predicate {
    Predicate::new(move |r| !predicate.matches(r))
}
