//! Fragment rendering collaborator.
//!
//! Components render HTML through [`Templates`], a cheap handle over a
//! [`FragmentRenderer`]. The bundled [`FunctionTemplates`] maps template names
//! to plain functions of `(model, locale)`; a real template engine plugs in by
//! implementing [`FragmentRenderer`] and handing it to
//! [`TemplatesAPI::set_renderer`].

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use portico_system::api::API;
use serde_json::Value;

/// Error type for fragment rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// No template is registered under this name.
    #[error("Template not found: {0}")]
    NotFound(String),

    /// The template ran and failed.
    #[error("Template '{name}' failed: {message}")]
    Render {
        /// Template name.
        name: String,
        /// Failure description.
        message: String,
    },
}

impl TemplateError {
    /// Creates a [`TemplateError::Render`].
    pub fn render(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Renders a named template against model data.
pub trait FragmentRenderer: Send + Sync + 'static {
    /// Returns the HTML fragment for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if the template is unknown or fails.
    fn render(&self, name: &str, model: &Value, locale: &str) -> Result<String, TemplateError>;
}

type FragmentFn = dyn Fn(&Value, &str) -> Result<String, TemplateError> + Send + Sync;

/// Templates backed by registered functions.
#[derive(Default, Clone)]
pub struct FunctionTemplates {
    fragments: HashMap<String, Arc<FragmentFn>>,
}

impl core::fmt::Debug for FunctionTemplates {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut names: Vec<_> = self.fragments.keys().collect();
        names.sort();
        f.debug_struct("FunctionTemplates")
            .field("fragments", &names)
            .finish()
    }
}

impl FunctionTemplates {
    /// No templates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the template `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, fragment: F) -> &mut Self
    where
        F: Fn(&Value, &str) -> Result<String, TemplateError> + Send + Sync + 'static,
    {
        self.fragments.insert(name.into(), Arc::new(fragment));
        self
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fragments.contains_key(name)
    }

    /// Number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Returns true if no template is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

impl FragmentRenderer for FunctionTemplates {
    fn render(&self, name: &str, model: &Value, locale: &str) -> Result<String, TemplateError> {
        let fragment = self
            .fragments
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
        fragment(model, locale)
    }
}

/// Shared handle to the active [`FragmentRenderer`].
#[derive(Clone)]
pub struct Templates {
    renderer: Arc<dyn FragmentRenderer>,
}

impl core::fmt::Debug for Templates {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Templates").finish_non_exhaustive()
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self::new(FunctionTemplates::new())
    }
}

impl Templates {
    /// Wraps a renderer.
    pub fn new(renderer: impl FragmentRenderer) -> Self {
        Self {
            renderer: Arc::new(renderer),
        }
    }

    /// Wraps a shared renderer.
    #[must_use]
    pub fn from_shared(renderer: Arc<dyn FragmentRenderer>) -> Self {
        Self { renderer }
    }

    /// Renders `name` against `model`.
    ///
    /// # Errors
    ///
    /// Propagates the renderer's [`TemplateError`].
    pub fn render(&self, name: &str, model: &Value, locale: &str) -> Result<String, TemplateError> {
        let html = self.renderer.render(name, model, locale)?;
        tracing::trace!(template = name, locale, bytes = html.len(), "fragment rendered");
        Ok(html)
    }
}

/// Build-time template registration.
///
/// Component plugins register their fragments here; a plugin may instead
/// install a whole renderer, which then takes precedence.
#[derive(Default)]
pub struct TemplatesAPI {
    functions: Mutex<FunctionTemplates>,
    renderer: Mutex<Option<Arc<dyn FragmentRenderer>>>,
}

impl API for TemplatesAPI {}

impl TemplatesAPI {
    /// Registers a fragment function.
    pub fn register<F>(&self, name: impl Into<String>, fragment: F)
    where
        F: Fn(&Value, &str) -> Result<String, TemplateError> + Send + Sync + 'static,
    {
        self.functions.lock().register(name, fragment);
    }

    /// Replaces the function templates with a custom renderer.
    pub fn set_renderer(&self, renderer: Arc<dyn FragmentRenderer>) {
        *self.renderer.lock() = Some(renderer);
    }

    pub(crate) fn take(&self) -> Templates {
        match self.renderer.lock().take() {
            Some(renderer) => Templates::from_shared(renderer),
            None => Templates::new(core::mem::take(&mut *self.functions.lock())),
        }
    }
}

/// Escapes text for inclusion in HTML element content or attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn function_templates_render_and_report_missing() {
        let mut functions = FunctionTemplates::new();
        functions.register("greeting", |model, locale| {
            Ok(format!("<p lang=\"{locale}\">{}</p>", model["name"].as_str().unwrap_or("?")))
        });
        let templates = Templates::new(functions);

        assert_eq!(
            templates.render("greeting", &json!({"name": "World"}), "de").unwrap(),
            "<p lang=\"de\">World</p>"
        );
        assert_eq!(
            templates.render("farewell", &Value::Null, "en"),
            Err(TemplateError::NotFound("farewell".into()))
        );
    }

    #[test]
    fn api_prefers_installed_renderer() {
        struct Upper;
        impl FragmentRenderer for Upper {
            fn render(&self, name: &str, _: &Value, _: &str) -> Result<String, TemplateError> {
                Ok(name.to_uppercase())
            }
        }

        let api = TemplatesAPI::default();
        api.register("x", |_, _| Ok("functions".into()));
        api.set_renderer(Arc::new(Upper));
        assert_eq!(api.take().render("x", &Value::Null, "en").unwrap(), "X");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b a="1">Tom & 'Jerry'</b>"#),
            "&lt;b a=&quot;1&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }
}
