//! Named filename templates.

use std::collections::BTreeMap;
use tracing::warn;

use super::engine::check_template;
use super::error::TemplateError;

/// Name of the template used when a lookup misses.
pub const DEFAULT_TEMPLATE_NAME: &str = "simple";

/// Templates that always exist.
pub const BUILTIN_TEMPLATES: [(&str, &str); 9] = [
    ("simple", "{filename}"),
    ("with_quality", "{filename}_{quality}"),
    ("with_date", "{filename}_{date}"),
    ("with_datetime", "{filename}_{datetime}"),
    ("with_resolution", "{filename}_{resolution}"),
    ("with_source", "{source}_{filename}"),
    ("source_quality", "{source}_{filename}_{quality}"),
    ("detailed", "{filename}_{quality}_{resolution}_{date}"),
    ("full", "{filename}_{quality}_{resolution}_{codec}_{datetime}"),
];

/// One entry of [`TemplateLibrary::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedTemplate {
    pub name: String,
    pub template: String,
    pub builtin: bool,
}

/// Built-in templates plus validated user-defined ones.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    custom: BTreeMap<String, String>,
}

impl TemplateLibrary {
    /// A library holding only the built-in templates.
    pub fn new() -> Self {
        Self::default()
    }

    /// A library with the given custom templates, all of which must validate.
    pub fn with_custom<I, K, V>(templates: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut library = Self::new();
        for (name, template) in templates {
            library.add_custom(name, template)?;
        }
        Ok(library)
    }

    /// Adds or replaces a custom template.
    pub fn add_custom(
        &mut self,
        name: impl Into<String>,
        template: impl Into<String>,
    ) -> Result<(), TemplateError> {
        let name = name.into();
        let template = template.into();

        if builtin(&name).is_some() {
            return Err(TemplateError::ReservedName(name));
        }
        check_template(&template)?;

        self.custom.insert(name, template);
        Ok(())
    }

    /// Removes a custom template, returning whether it existed.
    pub fn remove_custom(&mut self, name: &str) -> bool {
        self.custom.remove(name).is_some()
    }

    /// Looks up a template by name.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        builtin(name).or_else(|| self.custom.get(name).map(String::as_str))
    }

    /// Looks up a template by name, falling back to `simple`.
    pub fn get(&self, name: &str) -> &str {
        match self.lookup(name) {
            Some(template) => template,
            None => {
                warn!(name = %name, "Unknown template name, using {}", DEFAULT_TEMPLATE_NAME);
                builtin(DEFAULT_TEMPLATE_NAME).unwrap_or("{filename}")
            }
        }
    }

    /// Interprets a user-supplied template reference.
    ///
    /// A matching library name yields that template; anything else is taken
    /// as a raw template string.
    pub fn resolve_reference(&self, reference: &str) -> String {
        self.lookup(reference)
            .map(str::to_string)
            .unwrap_or_else(|| reference.to_string())
    }

    /// All templates, built-ins first, then custom ones by name.
    pub fn list(&self) -> Vec<NamedTemplate> {
        BUILTIN_TEMPLATES
            .iter()
            .map(|(name, template)| NamedTemplate {
                name: name.to_string(),
                template: template.to_string(),
                builtin: true,
            })
            .chain(self.custom.iter().map(|(name, template)| NamedTemplate {
                name: name.clone(),
                template: template.clone(),
                builtin: false,
            }))
            .collect()
    }
}

fn builtin(name: &str) -> Option<&'static str> {
    BUILTIN_TEMPLATES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, template)| *template)
}
