use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{LlmError, LlmModule, NewLlmModule};

/// Lookup of stored prompt templates by module id.
pub trait ModuleCatalog: Send + Sync {
    fn find_module(&self, module_id: &str) -> Result<Option<LlmModule>, LlmError>;

    /// All modules, newest first.
    fn list_modules(&self) -> Result<Vec<LlmModule>, LlmError>;
}

#[derive(Debug, Default)]
pub struct InMemoryModuleCatalog {
    modules: RwLock<HashMap<String, LlmModule>>,
}

impl InMemoryModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_module(&self, draft: NewLlmModule) -> Result<LlmModule, LlmError> {
        draft.validate()?;

        let module = draft.into_module(Uuid::new_v4().to_string(), Utc::now());
        self.modules
            .write()
            .map_err(|_| LlmError::internal("module catalog lock poisoned"))?
            .insert(module.id.clone(), module.clone());

        info!(
            module_id = %module.id,
            name = %module.name,
            model = %module.model,
            "LLM module created"
        );
        Ok(module)
    }

    pub fn len(&self) -> usize {
        self.modules.read().map(|modules| modules.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ModuleCatalog for InMemoryModuleCatalog {
    fn find_module(&self, module_id: &str) -> Result<Option<LlmModule>, LlmError> {
        let modules = self
            .modules
            .read()
            .map_err(|_| LlmError::internal("module catalog lock poisoned"))?;
        Ok(modules.get(module_id).cloned())
    }

    fn list_modules(&self) -> Result<Vec<LlmModule>, LlmError> {
        let modules = self
            .modules
            .read()
            .map_err(|_| LlmError::internal("module catalog lock poisoned"))?;
        let mut listed = modules.values().cloned().collect::<Vec<_>>();
        listed.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| left.name.cmp(&right.name))
        });
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryModuleCatalog, ModuleCatalog};
    use crate::domain::{LlmError, NewLlmModule};

    fn draft(name: &str) -> NewLlmModule {
        NewLlmModule {
            name: name.to_string(),
            description: None,
            prompt_template: "Summarize: {input}".to_string(),
            model: "gpt-3.5-turbo".to_string(),
        }
    }

    #[test]
    fn create_module_assigns_unique_ids() {
        let catalog = InMemoryModuleCatalog::new();
        let first = catalog
            .create_module(draft("Summarizer"))
            .expect("module should be created");
        let second = catalog
            .create_module(draft("Summarizer"))
            .expect("module should be created");

        assert_ne!(first.id, second.id);
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog
                .find_module(&first.id)
                .expect("lookup should succeed"),
            Some(first)
        );
    }

    #[test]
    fn create_module_rejects_incomplete_draft() {
        let catalog = InMemoryModuleCatalog::new();
        let mut incomplete = draft("Summarizer");
        incomplete.prompt_template = String::new();

        let error = catalog
            .create_module(incomplete)
            .expect_err("missing template should fail");

        assert!(matches!(error, LlmError::Validation { .. }));
        assert!(catalog.is_empty());
    }

    #[test]
    fn find_module_returns_none_for_unknown_id() {
        let catalog = InMemoryModuleCatalog::new();
        assert_eq!(
            catalog.find_module("missing").expect("lookup should succeed"),
            None
        );
    }

    #[test]
    fn list_modules_orders_newest_first() {
        let catalog = InMemoryModuleCatalog::new();
        let older = catalog
            .create_module(draft("Older"))
            .expect("module should be created");
        std::thread::sleep(std::time::Duration::from_millis(2));
        let newer = catalog
            .create_module(draft("Newer"))
            .expect("module should be created");

        let listed = catalog.list_modules().expect("listing should succeed");
        assert_eq!(
            listed.iter().map(|module| module.id.as_str()).collect::<Vec<_>>(),
            vec![newer.id.as_str(), older.id.as_str()]
        );
    }
}
