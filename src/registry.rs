use crate::pattern_parser::{grok_split, GrokComponent};
use crate::{Error, MAX_RECURSION};
use std::collections::BTreeMap;
use tracing::debug;

include!(concat!(env!("OUT_DIR"), "/default_templates.rs"));

/// Returns the built-in template definitions, unresolved, sorted by name.
pub fn default_templates() -> &'static [(&'static str, &'static str)] {
    DEFAULT_TEMPLATES
}

/// Collects template definitions before resolving them into a
/// [`TemplateRegistry`].
#[derive(Clone, Debug, Default)]
pub struct TemplateRegistryBuilder {
    definitions: BTreeMap<String, String>,
}

impl TemplateRegistryBuilder {
    /// A builder with no templates.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder preloaded with [`default_templates`].
    pub fn with_default_templates() -> Self {
        Self::from_iter(default_templates().iter().copied())
    }

    /// Adds a template, replacing any previous definition with that name.
    ///
    /// The fragment is a regular expression that may reference other
    /// templates as `%{NAME}`. Field names and conversions inside a fragment
    /// are ignored: templates only contribute matching, never fields.
    pub fn add_template<S: Into<String>>(&mut self, name: S, fragment: S) -> &mut Self {
        self.definitions.insert(name.into(), fragment.into());
        self
    }

    /// Expands every reference so each fragment is self-contained.
    ///
    /// Fails with [`Error::UndefinedTemplate`] if a fragment references a name
    /// that was never added, [`Error::TemplateCycle`] if a template reaches
    /// itself, and [`Error::InvalidPattern`] for a malformed reference.
    pub fn build(&self) -> Result<TemplateRegistry, Error> {
        let mut resolved = BTreeMap::new();
        let mut visiting = Vec::new();
        for name in self.definitions.keys() {
            resolve(name, &self.definitions, &mut resolved, &mut visiting)?;
        }
        debug!(templates = resolved.len(), "resolved template registry");
        Ok(TemplateRegistry { templates: resolved })
    }
}

impl<S: Into<String>> FromIterator<(S, S)> for TemplateRegistryBuilder {
    fn from_iter<I: IntoIterator<Item = (S, S)>>(iter: I) -> Self {
        let mut builder = TemplateRegistryBuilder::new();
        for (name, fragment) in iter {
            builder.add_template(name, fragment);
        }
        builder
    }
}

impl<S: Into<String>, const N: usize> From<[(S, S); N]> for TemplateRegistryBuilder {
    fn from(arr: [(S, S); N]) -> Self {
        Self::from_iter(arr)
    }
}

/// Depth-first expansion of `name` into `resolved`. Each referenced fragment
/// is wrapped in a non-capturing group so quantifiers and alternations keep
/// their meaning after substitution.
fn resolve<'a>(
    name: &'a str,
    definitions: &'a BTreeMap<String, String>,
    resolved: &mut BTreeMap<String, String>,
    visiting: &mut Vec<&'a str>,
) -> Result<(), Error> {
    if resolved.contains_key(name) {
        return Ok(());
    }
    if visiting.contains(&name) {
        return Err(Error::TemplateCycle(name.to_string()));
    }
    if visiting.len() >= MAX_RECURSION {
        return Err(Error::RecursionTooDeep);
    }
    let Some(fragment) = definitions.get(name) else {
        return Err(Error::UndefinedTemplate(name.to_string()));
    };

    visiting.push(name);
    let mut expanded = String::with_capacity(fragment.len());
    for component in grok_split(fragment) {
        match component {
            GrokComponent::RegularExpression { string, .. } => expanded.push_str(string),
            GrokComponent::Reference { template, .. } => {
                resolve(template, definitions, resolved, visiting)?;
                expanded.push_str("(?:");
                expanded.push_str(&resolved[template]);
                expanded.push(')');
            }
            GrokComponent::PatternError(e) => {
                return Err(Error::InvalidPattern(format!("{e} in template {name}")));
            }
        }
    }
    visiting.pop();

    resolved.insert(name.to_string(), expanded);
    Ok(())
}

/// An immutable set of fully expanded templates, safe to share between
/// threads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, String>,
}

impl TemplateRegistry {
    /// An empty [`TemplateRegistryBuilder`].
    pub fn builder() -> TemplateRegistryBuilder {
        TemplateRegistryBuilder::new()
    }

    /// Resolves the built-in templates.
    pub fn with_default_templates() -> Result<Self, Error> {
        TemplateRegistryBuilder::with_default_templates().build()
    }

    /// The expanded fragment for `name`, if defined.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(|s| s.as_str())
    }

    /// Like [`get`](Self::get), failing with [`Error::UndefinedTemplate`].
    pub fn lookup(&self, name: &str) -> Result<&str, Error> {
        self.get(name)
            .ok_or_else(|| Error::UndefinedTemplate(name.to_string()))
    }

    /// Returns true if `name` is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Template names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(|s| s.as_str())
    }

    /// Number of defined templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns true if no template is defined.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
