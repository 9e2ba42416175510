use boxfinder_core::AdminArea;

/// Read-only view over the administrative hierarchy used for subdivision.
#[derive(Debug, Clone, Default)]
pub struct AdminHierarchy {
    roots: Vec<AdminArea>,
}

impl AdminHierarchy {
    #[must_use]
    pub fn new(roots: Vec<AdminArea>) -> Self {
        Self { roots }
    }

    fn find(&self, name: &str) -> Option<&AdminArea> {
        self.roots.iter().find_map(|root| root.find(name))
    }

    /// Direct children of `name`, or `None` when the area is unknown or a
    /// leaf.
    ///
    /// With a `scope`, the lookup runs inside that area's subtree first so a
    /// district name shared by two provinces resolves to the right one. An
    /// unknown scope falls back to a global lookup.
    #[must_use]
    pub fn children_of(&self, scope: Option<&str>, name: &str) -> Option<Vec<&str>> {
        let area = scope
            .and_then(|s| self.find(s))
            .and_then(|s| s.find(name))
            .or_else(|| self.find(name))?;
        if area.children.is_empty() {
            return None;
        }
        Some(area.children.iter().map(|c| c.name.as_str()).collect())
    }
}
