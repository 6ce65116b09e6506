use indexmap::IndexMap;

/// Referenced entity ids awaiting a label.
///
/// Item records keep only the referenced id; the label resolved in the
/// second pass lives here, so one resolution reaches every record holding
/// the same reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeferredRegistry {
    labels: IndexMap<String, Option<String>>,
}

impl DeferredRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an id; returns false if it was already known
    pub fn register(&mut self, id: &str) -> bool {
        if self.labels.contains_key(id) {
            return false;
        }
        self.labels.insert(id.to_string(), None);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.labels.contains_key(id)
    }

    /// Set the label of a registered id; unknown ids are ignored
    pub fn resolve(&mut self, id: &str, label: &str) -> bool {
        match self.labels.get_mut(id) {
            Some(slot) => {
                *slot = Some(label.to_string());
                true
            }
            None => false,
        }
    }

    /// The resolved label, if any
    pub fn label(&self, id: &str) -> Option<&str> {
        self.labels.get(id).and_then(|l| l.as_deref())
    }

    /// Display form of a reference: its label, or the raw id until resolved
    pub fn display<'a>(&'a self, id: &'a str) -> &'a str {
        self.label(id).unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Registered ids that never got a label
    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.labels
            .iter()
            .filter(|(_, label)| label.is_none())
            .map(|(id, _)| id.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_dedups() {
        let mut registry = DeferredRegistry::new();
        assert!(registry.register("Q1"));
        assert!(!registry.register("Q1"));
        assert!(registry.register("Q2"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["Q1", "Q2"]);
    }

    #[test]
    fn test_display_falls_back_to_id() {
        let mut registry = DeferredRegistry::new();
        registry.register("Q64");
        assert_eq!(registry.display("Q64"), "Q64");
        assert_eq!(registry.unresolved().count(), 1);

        assert!(registry.resolve("Q64", "Berlin"));
        assert_eq!(registry.display("Q64"), "Berlin");
        assert_eq!(registry.unresolved().count(), 0);
    }

    #[test]
    fn test_resolve_unknown_id_is_ignored() {
        let mut registry = DeferredRegistry::new();
        assert!(!registry.resolve("Q5", "human"));
        assert!(!registry.contains("Q5"));
        assert_eq!(registry.display("Q5"), "Q5");
    }
}
