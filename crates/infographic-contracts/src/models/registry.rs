use std::fmt;

use anyhow::{bail, Result};
use indexmap::IndexMap;

/// Pipeline stage a model is chosen for. Edit and fix share the image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelRole {
    Research,
    Image,
}

impl ModelRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelRole::Research => "research",
            ModelRole::Image => "image",
        }
    }
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub roles: Vec<ModelRole>,
    pub context_window: Option<u64>,
}

impl ModelSpec {
    pub fn new(name: &str, roles: &[ModelRole], context_window: Option<u64>) -> Self {
        Self {
            name: name.to_string(),
            roles: roles.to_vec(),
            context_window,
        }
    }

    pub fn serves(&self, role: ModelRole) -> bool {
        self.roles.contains(&role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
}

/// Known Gemini models in preference order; the first model serving a role is
/// that role's default.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::from_models([
            ModelSpec::new("gemini-2.5-flash", &[ModelRole::Research], Some(1_048_576)),
            ModelSpec::new("gemini-2.5-pro", &[ModelRole::Research], Some(1_048_576)),
            ModelSpec::new("gemini-3-pro-preview", &[ModelRole::Research], Some(1_048_576)),
            ModelSpec::new("gemini-3-pro-image-preview", &[ModelRole::Image], None),
            ModelSpec::new("gemini-2.5-flash-image", &[ModelRole::Image], None),
        ])
    }
}

impl ModelRegistry {
    pub fn from_models(models: impl IntoIterator<Item = ModelSpec>) -> Self {
        Self {
            models: models
                .into_iter()
                .map(|model| (model.name.clone(), model))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name.trim().trim_start_matches("models/"))
    }

    pub fn default_for(&self, role: ModelRole) -> Option<&ModelSpec> {
        self.models.values().find(|model| model.serves(role))
    }

    /// Resolves a requested model name for `role`. A blank request means the
    /// default; an unknown or unsuitable name falls back to it with a reason.
    pub fn select(&self, role: ModelRole, requested: Option<&str>) -> Result<ModelSelection> {
        let requested = requested.map(str::trim).filter(|value| !value.is_empty());
        if let Some(model) = requested
            .and_then(|name| self.get(name))
            .filter(|model| model.serves(role))
        {
            return Ok(ModelSelection {
                model: model.clone(),
                requested: requested.map(str::to_string),
                fallback_reason: None,
            });
        }

        let Some(model) = self.default_for(role) else {
            bail!("no {role} model registered");
        };
        Ok(ModelSelection {
            model: model.clone(),
            requested: requested.map(str::to_string),
            fallback_reason: requested
                .map(|name| format!("model '{name}' cannot serve {role}; using {}", model.name)),
        })
    }
}
