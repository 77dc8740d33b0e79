//! Minijinja rendering for query text and result-location templates.
//!
//! Templates are arbitrary strings (not pre-registered), so a fresh
//! [`minijinja::Environment`] is created per render call. Undefined values are
//! errors: a query referencing a missing environment variable should not run
//! with an empty string in its place.

use std::collections::BTreeMap;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

use crate::error::CoreError;

/// Values available to the result-location template.
#[derive(Debug, Clone, Serialize)]
pub struct PathContext {
    /// AWS account id of the caller. `None` when the template does not use it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    pub region: String,
    #[serde(skip)]
    pub now: DateTime<Utc>,
}

impl PathContext {
    /// Context stamped with the current time.
    pub fn now(account: Option<String>, region: impl Into<String>) -> Self {
        Self {
            account,
            region: region.into(),
            now: Utc::now(),
        }
    }
}

/// Renders query and path templates.
#[derive(Debug, Default)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Build a strict environment with the helpers every template gets.
    fn build_env() -> Environment<'static> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_function("split", split_function);
        env
    }

    /// Render one query with the process environment as context, so
    /// `{{ USER }}` expands to `$USER`.
    pub fn render_query(
        &self,
        template_str: &str,
        vars: &BTreeMap<String, String>,
    ) -> Result<String, CoreError> {
        let env = Self::build_env();
        Ok(env.render_str(template_str, vars)?)
    }

    /// Render the result-location template. `now(fmt)` formats the context's
    /// timestamp with strftime syntax.
    pub fn render_path(&self, template_str: &str, ctx: &PathContext) -> Result<String, CoreError> {
        let mut env = Self::build_env();
        let now = ctx.now;
        env.add_function("now", move |fmt: String| now_function(now, &fmt));
        Ok(env.render_str(template_str, ctx)?)
    }

    /// Whether a template reads the top-level variable `name`.
    ///
    /// Used to skip expensive lookups (the caller identity call) when the
    /// template never asks for them.
    pub fn references(&self, template_str: &str, name: &str) -> Result<bool, CoreError> {
        let env = Self::build_env();
        let tmpl = env.template_from_str(template_str)?;
        Ok(tmpl.undeclared_variables(false).contains(name))
    }
}

/// Split `value` on `sep`, as in `{% for t in split(TABLES, ",") %}`.
fn split_function(value: String, sep: String) -> Vec<String> {
    value.split(sep.as_str()).map(str::to_string).collect()
}

fn now_function(now: DateTime<Utc>, fmt: &str) -> Result<String, minijinja::Error> {
    if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
        return Err(minijinja::Error::new(
            minijinja::ErrorKind::InvalidOperation,
            format!("invalid time format {fmt:?}"),
        ));
    }
    Ok(now.format(fmt).to_string())
}

/// Snapshot of the process environment used as query template context.
pub fn env_vars() -> BTreeMap<String, String> {
    std::env::vars().collect()
}
