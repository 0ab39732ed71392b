//! Minijinja rendering for expiry alert titles and messages.
//!
//! Templates are arbitrary strings (they can come from configuration), so a
//! fresh [`minijinja::Environment`] is created per render call.

use crate::error::NotifyError;

pub const DEFAULT_EXPIRY_TITLE: &str = "Certificate expiring soon";
pub const DEFAULT_EXPIRY_MESSAGE: &str = "The certificate for {{ customer_name }} expires on \
{{ expiry_date }} ({{ days_left }} {{ days_left | pluralize('day', 'days') }} left).";

/// Values available to expiry templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExpiryContext {
    pub customer_id: String,
    pub customer_name: String,
    /// Expiry formatted as `YYYY-MM-DD`.
    pub expiry_date: String,
    /// Whole calendar days from today until the expiry day.
    pub days_left: i64,
}

/// Title and message templates for expiry alerts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryTemplates {
    pub title: String,
    pub message: String,
}

impl Default for ExpiryTemplates {
    fn default() -> Self {
        Self {
            title: DEFAULT_EXPIRY_TITLE.to_string(),
            message: DEFAULT_EXPIRY_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("pluralize", pluralize_filter);
        env
    }

    /// Render a template string with the given context.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render(&self, template_str: &str, ctx: &ExpiryContext) -> Result<String, NotifyError> {
        let env = Self::build_env();
        env.render_str(template_str, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Check template syntax without evaluating it.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }
}

/// `{{ n | pluralize('day', 'days') }}`
fn pluralize_filter(value: i64, singular: String, plural: String) -> String {
    if value == 1 {
        singular
    } else {
        plural
    }
}
