// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Content templating pass.
//!
//! Packaging can run each input file through a templating pass before
//! concatenation, so one source tree can stamp out environment-specific
//! deploy scripts. The pass is a pure function from template text to
//! rendered text, modeled as the [`Render`] trait so the packager never
//! cares which engine sits behind it.
//!
//! The built-in [`VarTemplater`] substitutes `{{key}}` markers from a flat
//! key/value context. Unknown keys are left untouched by default, which
//! keeps files that merely mention double braces intact; strict mode turns
//! them into errors instead.

use regex::Regex;
use std::collections::HashMap;

/// Render template text into final text.
pub trait Render {
    /// Render one file's content.
    ///
    /// # Errors
    ///
    /// - Return [`RenderError`] if the engine cannot produce output.
    fn render(&self, template: &str) -> Result<String>;
}

/// Pass content through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTemplating;

impl Render for NoTemplating {
    fn render(&self, template: &str) -> Result<String> {
        Ok(template.to_string())
    }
}

/// Substitute `{{key}}` markers from a key/value context.
#[derive(Debug, Default, Clone)]
pub struct VarTemplater {
    context: HashMap<String, String>,
    strict: bool,
}

impl VarTemplater {
    /// Construct a templater over the given context.
    pub fn new(context: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        Self {
            context: context
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            strict: false,
        }
    }

    /// Error on markers whose key is missing from the context.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

impl Render for VarTemplater {
    fn render(&self, template: &str) -> Result<String> {
        // Infallible, the pattern is a literal.
        let marker = Regex::new(r"\{\{\s*([A-Za-z_][\w.]*)\s*\}\}").unwrap();

        let mut missing = None;
        let rendered = marker.replace_all(template, |captures: &regex::Captures<'_>| {
            let key = &captures[1];
            match self.context.get(key) {
                Some(value) => value.clone(),
                None => {
                    if self.strict && missing.is_none() {
                        missing = Some(key.to_string());
                    }
                    captures[0].to_string()
                }
            }
        });

        match missing {
            Some(key) => Err(RenderError::MissingValue { key }),
            None => Ok(rendered.into_owned()),
        }
    }
}

/// Templating error types.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Marker key absent from the context under strict rendering.
    #[error("no value for template marker {key:?}")]
    MissingValue { key: String },
}

/// Friendly result alias :3
pub type Result<T, E = RenderError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn no_templating_is_identity() {
        let result = NoTemplating.render("select {{anything}} from dual;").unwrap();
        assert_eq!(result, "select {{anything}} from dual;");
    }

    #[test]
    fn var_templater_substitutes_context_values() {
        let templater = VarTemplater::new([("env.name", "UAT"), ("db.link", "uatdb")]);
        let result = templater
            .render("PROMPT deploying to {{env.name}} via {{ db.link }}")
            .unwrap();
        assert_eq!(result, "PROMPT deploying to UAT via uatdb");
    }

    #[test]
    fn unknown_markers_stay_untouched_by_default() {
        let templater = VarTemplater::new([("known", "yes")]);
        let result = templater.render("{{known}} and {{unknown}}").unwrap();
        assert_eq!(result, "yes and {{unknown}}");
    }

    #[test]
    fn strict_mode_errors_on_unknown_marker() {
        let templater = VarTemplater::new([("known", "yes")]).strict();
        let result = templater.render("{{known}} and {{unknown}}");
        assert!(matches!(result, Err(RenderError::MissingValue { key }) if key == "unknown"));
    }
}
