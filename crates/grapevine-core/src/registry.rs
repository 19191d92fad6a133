use tracing::debug;

use crate::models::{Category, Source, ALL_CATEGORY};
use crate::{Error, Result};

/// Fields of a source that can be edited after creation. `None` leaves the
/// field alone.
#[derive(Debug, Clone, Default)]
pub struct SourcePatch {
    pub name: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    /// `Some(None)` clears the category
    pub category: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub order: Option<u32>,
}

/// Configured sources and the categories that group them
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<Source>,
    categories: Vec<Category>,
}

impl SourceRegistry {
    /// Build a registry. The "all" category is added if the list lacks it;
    /// a listed "all" only contributes its description and order. Duplicate
    /// ids keep their first occurrence.
    pub fn new(sources: Vec<Source>, categories: Vec<Category>) -> Self {
        let mut all = Category::all();
        let mut rest = Vec::new();
        let mut seen_all = false;
        for category in categories {
            if !category.is_protected() {
                rest.push(category);
            } else if !seen_all {
                seen_all = true;
                all.description = category.description;
                all.order = category.order;
            }
        }

        let mut registry = Self {
            sources: Vec::new(),
            categories: vec![all],
        };
        for category in rest {
            registry.add_category(category);
        }
        for source in sources {
            registry.add_source(source);
        }
        registry
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn get_source(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Add a source. An existing id wins: the call is a no-op and returns false.
    pub fn add_source(&mut self, source: Source) -> bool {
        if self.get_source(&source.id).is_some() {
            debug!("Source '{}' already registered, ignoring", source.id);
            return false;
        }
        self.sources.push(source);
        true
    }

    pub fn update_source(&mut self, id: &str, patch: SourcePatch) -> Result<&Source> {
        let source = self
            .sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(format!("source '{}'", id)))?;

        if let Some(name) = patch.name {
            source.name = name;
        }
        if let Some(owner) = patch.owner {
            source.owner = owner;
        }
        if let Some(repo) = patch.repo {
            source.repo = repo;
        }
        if let Some(description) = patch.description {
            source.description = description;
        }
        if let Some(active) = patch.is_active {
            source.is_active = active;
        }
        if let Some(category) = patch.category {
            source.category = category;
        }
        Ok(&*source)
    }

    pub fn remove_source(&mut self, id: &str) -> Result<Source> {
        let index = self
            .sources
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(format!("source '{}'", id)))?;
        Ok(self.sources.remove(index))
    }

    /// Flip `is_active` and return the new value
    pub fn toggle_active(&mut self, id: &str) -> Result<bool> {
        let source = self
            .sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(format!("source '{}'", id)))?;
        source.is_active = !source.is_active;
        Ok(source.is_active)
    }

    /// Active sources in `category_id`, or every active source for "all"
    pub fn active_sources_for(&self, category_id: &str) -> Vec<&Source> {
        self.sources
            .iter()
            .filter(|s| s.is_active)
            .filter(|s| category_id == ALL_CATEGORY || s.category.as_deref() == Some(category_id))
            .collect()
    }

    /// Categories in display order
    pub fn categories(&self) -> Vec<&Category> {
        let mut categories: Vec<_> = self.categories.iter().collect();
        categories.sort_by_key(|c| c.order);
        categories
    }

    pub fn get_category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn add_category(&mut self, category: Category) -> bool {
        if self.get_category(&category.id).is_some() {
            return false;
        }
        self.categories.push(category);
        true
    }

    /// Edit a category. "all" keeps its name; only description and order move.
    pub fn update_category(&mut self, id: &str, patch: CategoryPatch) -> Result<&Category> {
        let category = self
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::NotFound(format!("category '{}'", id)))?;

        if category.is_protected() && patch.name.is_some() {
            return Err(Error::ProtectedCategory(id.to_string()));
        }

        if let Some(name) = patch.name {
            category.name = name;
        }
        if let Some(description) = patch.description {
            category.description = description;
        }
        if let Some(order) = patch.order {
            category.order = order;
        }
        Ok(&*category)
    }

    /// Remove a category. Its sources stay registered, uncategorized.
    pub fn remove_category(&mut self, id: &str) -> Result<Category> {
        if id == ALL_CATEGORY {
            return Err(Error::ProtectedCategory(id.to_string()));
        }

        let index = self
            .categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| Error::NotFound(format!("category '{}'", id)))?;
        let removed = self.categories.remove(index);

        for source in self.sources.iter_mut() {
            if source.category.as_deref() == Some(id) {
                source.category = None;
            }
        }

        Ok(removed)
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SourceRegistry {
        SourceRegistry::new(
            vec![
                Source::new("forum", "acme", "forum").with_category("community"),
                Source::new("jobs", "acme", "jobs").with_category("jobs"),
                Source::new("weekly", "acme", "weekly").with_category("newsletter"),
            ],
            vec![
                Category::new("community", "Community", 1),
                Category::new("jobs", "Jobs", 2),
                Category::new("newsletter", "Newsletter", 3),
            ],
        )
    }

    #[test]
    fn test_add_source_is_idempotent_by_id() {
        let mut registry = registry();
        let mut duplicate = Source::new("forum", "someone-else", "other");
        duplicate.name = "Impostor".into();

        assert!(!registry.add_source(duplicate));
        assert!(!registry.add_source(Source::new("forum", "acme", "forum")));

        let forums: Vec<_> = registry.sources().iter().filter(|s| s.id == "forum").collect();
        assert_eq!(forums.len(), 1);
        assert_eq!(forums[0].owner, "acme");
    }

    #[test]
    fn test_all_category_cannot_be_removed() {
        let mut registry = registry();
        let before: Vec<Category> = registry.categories().into_iter().cloned().collect();

        let result = registry.remove_category(ALL_CATEGORY);
        assert!(matches!(result, Err(Error::ProtectedCategory(_))));

        let after: Vec<Category> = registry.categories().into_iter().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_all_category_cannot_be_renamed() {
        let mut registry = registry();
        let rename = CategoryPatch {
            name: Some("Everything".into()),
            ..Default::default()
        };
        assert!(matches!(
            registry.update_category(ALL_CATEGORY, rename),
            Err(Error::ProtectedCategory(_))
        ));

        let reorder = CategoryPatch {
            order: Some(9),
            ..Default::default()
        };
        assert_eq!(registry.update_category(ALL_CATEGORY, reorder).unwrap().order, 9);
    }

    #[test]
    fn test_removing_category_uncategorizes_sources() {
        let mut registry = registry();
        registry.remove_category("jobs").unwrap();

        let jobs = registry.get_source("jobs").unwrap();
        assert_eq!(jobs.category, None);
        assert_eq!(registry.sources().len(), 3);
        assert!(registry.get_category("jobs").is_none());
    }

    #[test]
    fn test_active_sources_for_category() {
        let mut registry = registry();
        assert_eq!(registry.active_sources_for(ALL_CATEGORY).len(), 3);
        assert_eq!(registry.active_sources_for("jobs").len(), 1);
        assert!(registry.active_sources_for("unknown").is_empty());

        assert!(!registry.toggle_active("jobs").unwrap());
        assert!(registry.active_sources_for("jobs").is_empty());
        assert_eq!(registry.active_sources_for(ALL_CATEGORY).len(), 2);
        // Config survives deactivation
        assert!(registry.get_source("jobs").is_some());
    }

    #[test]
    fn test_update_and_remove_source() {
        let mut registry = registry();
        let patch = SourcePatch {
            description: Some("Weekly digest".into()),
            category: Some(None),
            ..Default::default()
        };
        let updated = registry.update_source("weekly", patch).unwrap();
        assert_eq!(updated.description, "Weekly digest");
        assert_eq!(updated.category, None);

        let removed = registry.remove_source("weekly").unwrap();
        assert_eq!(removed.id, "weekly");
        assert!(matches!(registry.remove_source("weekly"), Err(Error::NotFound(_))));
        assert!(matches!(registry.toggle_active("weekly"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_new_always_has_all_category_first() {
        let registry = SourceRegistry::new(Vec::new(), vec![Category::new("jobs", "Jobs", 1)]);
        let categories = registry.categories();
        let ids: Vec<_> = categories.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["all", "jobs"]);
    }

    #[test]
    fn test_all_category_edits_survive_a_rebuild() {
        let mut registry = registry();
        let patch = CategoryPatch {
            description: Some("Everything we follow".into()),
            order: Some(50),
            ..Default::default()
        };
        registry.update_category(ALL_CATEGORY, patch).unwrap();

        let categories: Vec<Category> = registry.categories().into_iter().cloned().collect();
        let rebuilt = SourceRegistry::new(registry.sources().to_vec(), categories);

        let all = rebuilt.get_category(ALL_CATEGORY).unwrap();
        assert_eq!(all.name, "All");
        assert!(all.is_default);
        assert_eq!(all.description, "Everything we follow");
        assert_eq!(all.order, 50);
        let ids: Vec<_> = rebuilt.categories().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec!["community", "jobs", "newsletter", "all"]);
    }
}
