//! Template catalog
//!
//! The catalog supplies image, category, default ports and GPU requirements
//! per template. A built-in static catalog covers the common templates.

use std::collections::HashMap;

use crate::error::{ProvisionError, Result};
use crate::models::Template;

/// Source of deployment templates
pub trait TemplateCatalog: Send + Sync {
    /// Look up a template by id
    fn get(&self, id: &str) -> Option<Template>;

    /// All templates, in catalog order
    fn list(&self) -> Vec<Template>;

    /// Look up a template, failing on unknown ids
    fn require(&self, id: &str) -> Result<Template> {
        self.get(id)
            .ok_or_else(|| ProvisionError::UnknownTemplate(id.to_string()))
    }
}

/// In-memory catalog
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    templates: Vec<Template>,
    index: HashMap<String, usize>,
}

impl StaticCatalog {
    pub fn new(templates: Vec<Template>) -> Self {
        let index = templates
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        Self { templates, index }
    }

    /// Load a catalog from a JSON array of templates
    pub fn from_json(json: &str) -> Result<Self> {
        let templates: Vec<Template> = serde_json::from_str(json)?;
        Ok(Self::new(templates))
    }

    /// Catalog with the built-in templates
    pub fn builtin() -> Self {
        Self::new(builtin_templates())
    }
}

impl TemplateCatalog for StaticCatalog {
    fn get(&self, id: &str) -> Option<Template> {
        self.index.get(id).map(|i| self.templates[*i].clone())
    }

    fn list(&self) -> Vec<Template> {
        self.templates.clone()
    }
}

fn template(
    id: &str,
    name: &str,
    category: &str,
    image: &str,
    gpu_required: bool,
    min_gpu_memory_gb: Option<u32>,
) -> Template {
    Template {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        image: image.to_string(),
        default_ports: None,
        gpu_required,
        min_gpu_memory_gb,
    }
}

fn builtin_templates() -> Vec<Template> {
    let mut comfy = template(
        "comfyui",
        "ComfyUI",
        "rendering",
        "ghcr.io/ai-dock/comfyui:latest",
        true,
        Some(12),
    );
    comfy.default_ports = Some(vec![8188, 22]);

    vec![
        template(
            "pytorch",
            "PyTorch 2.1 + CUDA 12.1",
            "deep-learning",
            "pytorch/pytorch:2.1.0-cuda12.1-cudnn8-runtime",
            true,
            Some(16),
        ),
        template(
            "tensorflow",
            "TensorFlow 2.15 GPU",
            "machine-learning",
            "tensorflow/tensorflow:2.15.0-gpu-jupyter",
            true,
            Some(16),
        ),
        template(
            "jupyter",
            "Jupyter Data Science",
            "data-science",
            "jupyter/datascience-notebook:latest",
            false,
            None,
        ),
        comfy,
        template(
            "postgres",
            "PostgreSQL 16",
            "database",
            "postgres:16",
            false,
            None,
        ),
        template(
            "nginx",
            "Nginx Web Server",
            "web-server",
            "nginx:1.25",
            false,
            None,
        ),
        template(
            "code-server",
            "VS Code Server",
            "development",
            "codercom/code-server:latest",
            false,
            None,
        ),
        template(
            "ubuntu",
            "Ubuntu 22.04",
            "custom",
            "ubuntu:22.04",
            false,
            None,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let catalog = StaticCatalog::builtin();
        let pytorch = catalog.get("pytorch").unwrap();
        assert!(pytorch.gpu_required);
        assert_eq!(pytorch.category, "deep-learning");
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_require_unknown() {
        let catalog = StaticCatalog::builtin();
        let err = catalog.require("nope").unwrap_err();
        assert!(matches!(err, ProvisionError::UnknownTemplate(id) if id == "nope"));
    }

    #[test]
    fn test_list_keeps_order() {
        let ids: Vec<_> = StaticCatalog::builtin()
            .list()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids.first().map(String::as_str), Some("pytorch"));
        assert_eq!(ids.last().map(String::as_str), Some("ubuntu"));
    }

    #[test]
    fn test_from_json() {
        let json = r#"[{"id": "x", "name": "X", "category": "crypto", "image": "geth", "defaultPorts": [8545]}]"#;
        let catalog = StaticCatalog::from_json(json).unwrap();
        let t = catalog.get("x").unwrap();
        assert_eq!(t.default_ports, Some(vec![8545]));
        assert!(!t.gpu_required);
    }
}
