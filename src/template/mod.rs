//! HTML mail templates rendered with Handlebars.
//!
//! Templates live in `<templates.dir>/<name>.html` and are parsed on first
//! use, then cached. Inline templates registered with
//! [`TemplateEngine::register_inline`] take precedence over files.
//!
//! ```ignore
//! let engine = TemplateEngine::new("templates/email");
//! let body = engine.render("welcome-email", &json!({ "firstname": "Ada" })).await?;
//! ```

use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

/// Ancestors of the working directory searched for a relative template dir
const MAX_PARENT_LOOKUPS: usize = 5;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {name} (looked in {path})")]
    NotFound { name: String, path: String },

    #[error("Invalid template {name}: {reason}")]
    Invalid { name: String, reason: String },

    #[error("Failed to render template {name}: {reason}")]
    Render { name: String, reason: String },
}

pub struct TemplateEngine {
    dir: PathBuf,
    handlebars: RwLock<Handlebars<'static>>,
}

impl TemplateEngine {
    /// Create an engine reading templates from `dir`.
    ///
    /// A relative `dir` is looked up in the working directory first, then in
    /// its parents.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = resolve_template_dir(dir.as_ref());
        tracing::debug!(dir = %dir.display(), "Template directory resolved");

        Self {
            dir,
            handlebars: RwLock::new(Handlebars::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Register a template from a string, replacing any cached version.
    pub async fn register_inline(&self, name: &str, source: &str) -> Result<(), TemplateError> {
        self.handlebars
            .write()
            .await
            .register_template_string(name, source)
            .map_err(|e| TemplateError::Invalid {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    pub async fn has_template(&self, name: &str) -> bool {
        self.handlebars.read().await.has_template(name)
    }

    /// Render `name` with `data`, loading `<dir>/<name>.html` if not cached.
    pub async fn render(&self, name: &str, data: &Value) -> Result<String, TemplateError> {
        if !self.has_template(name).await {
            self.load(name).await?;
        }

        self.handlebars
            .read()
            .await
            .render(name, data)
            .map_err(|e| TemplateError::Render {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    async fn load(&self, name: &str) -> Result<(), TemplateError> {
        let path = self.dir.join(format!("{name}.html"));
        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| TemplateError::NotFound {
                name: name.to_string(),
                path: path.display().to_string(),
            })?;

        self.register_inline(name, &source).await?;
        tracing::debug!(template = %name, path = %path.display(), "Template loaded");
        Ok(())
    }
}

fn resolve_template_dir(dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        return dir.to_path_buf();
    }

    let Ok(cwd) = std::env::current_dir() else {
        return dir.to_path_buf();
    };

    cwd.ancestors()
        .take(MAX_PARENT_LOOKUPS + 1)
        .map(|base| base.join(dir))
        .find(|candidate| candidate.is_dir())
        .unwrap_or_else(|| cwd.join(dir))
}
