#![doc = include_str!("../README.md")]

use std::collections::{btree_map, BTreeMap, HashMap, HashSet};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

#[cfg(feature = "fancy-regex")]
mod fancy_regex;
#[cfg(feature = "onig")]
mod onig;
#[cfg(feature = "pcre2")]
mod pcre2;
#[cfg(feature = "regex")]
mod regex;

mod pattern_parser;
mod registry;
mod value;

pub use registry::{default_templates, TemplateRegistry, TemplateRegistryBuilder};
pub use value::{Conversion, Decimal, ParseDecimalError, Value};

// Enable features in the following preferred order. If multiple features are
// enabled, the first one in the list is used.

// 0. pcre2
// 1. fancy-regex
// 2. onig
// 3. regex

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[allow(unused)]
pub(crate) enum Engine {
    Pcre2,
    FancyRegex,
    Onig,
    Regex,
}

#[doc(hidden)]
#[cfg(feature = "pcre2")]
use pcre2::{
    Pcre2Matches as MatchesInner, Pcre2MatchesIter as MatchesIterInner,
    Pcre2Pattern as InnerPattern, ENGINE,
};

#[doc(hidden)]
#[cfg(all(not(feature = "pcre2"), feature = "fancy-regex"))]
use fancy_regex::{
    FancyRegexMatches as MatchesInner, FancyRegexMatchesIter as MatchesIterInner,
    FancyRegexPattern as InnerPattern, ENGINE,
};

#[doc(hidden)]
#[cfg(all(not(feature = "pcre2"), not(feature = "fancy-regex"), feature = "onig"))]
use onig::{
    OnigMatches as MatchesInner, OnigMatchesIter as MatchesIterInner, OnigPattern as InnerPattern,
    ENGINE,
};

#[doc(hidden)]
#[cfg(all(
    not(feature = "pcre2"),
    not(feature = "fancy-regex"),
    not(feature = "onig"),
    feature = "regex"
))]
use regex::{
    RegexMatches as MatchesInner, RegexMatchesIter as MatchesIterInner,
    RegexPattern as InnerPattern, ENGINE,
};

use crate::pattern_parser::{grok_split, GrokComponent};

#[cfg(all(
    not(feature = "onig"),
    not(feature = "fancy-regex"),
    not(feature = "regex"),
    not(feature = "pcre2")
))]
compile_error!("No regex engine selected. Please enable one of the following features: fancy-regex, onig, pcre2, regex");

/// Maximum template nesting depth.
pub(crate) const MAX_RECURSION: usize = 1024;

/// Grok pattern tokenizer.
///
/// This API is currently unstable and may be subject to change.
pub mod parser {
    pub use crate::pattern_parser::*;
}

/// Extracted fields keyed by field name.
pub type Fields = BTreeMap<String, Value>;

/// Records the engine group `group` at `index` under its field name. Groups
/// not in `aliases` keep their own name. Two groups bound to one field fail
/// with [`Error::DuplicateField`].
pub(crate) fn bind_field<I>(
    names: &mut BTreeMap<String, I>,
    aliases: &HashMap<String, String>,
    group: &str,
    index: I,
) -> Result<(), Error> {
    let field = aliases.get(group).map_or(group, |s| s.as_str());
    match names.entry(field.to_string()) {
        btree_map::Entry::Vacant(entry) => {
            entry.insert(index);
            Ok(())
        }
        btree_map::Entry::Occupied(_) => Err(Error::DuplicateField(field.to_string())),
    }
}

/// A grok pattern compiled into a regex, ready to be matched against
/// arbitrary text.
pub struct Pattern {
    inner: InnerPattern,
    regex: String,
    conversions: HashMap<String, Conversion>,
}

impl Pattern {
    /// Compiles the generated regex. `aliases` maps generated group names to
    /// field names; `conversions` is keyed by field name.
    fn new(
        regex: String,
        aliases: HashMap<String, String>,
        conversions: HashMap<String, Conversion>,
    ) -> Result<Self, Error> {
        let inner = InnerPattern::new(&regex, &aliases)?;
        Ok(Self {
            inner,
            regex,
            conversions,
        })
    }

    /// Matches against the text, returning the first (leftmost) match.
    #[inline(always)]
    pub fn match_against<'a>(&'a self, text: &'a str) -> Option<Matches<'a>> {
        Some(Matches {
            inner: self.inner.match_against(text)?,
            pattern: self,
        })
    }

    /// Matches against the text and converts every field.
    ///
    /// No match yields empty fields. A field that fails its conversion fails
    /// the whole call.
    pub fn extract(&self, text: &str) -> Result<Fields, Error> {
        match self.match_against(text) {
            Some(matches) => matches.to_fields(),
            None => Ok(Fields::new()),
        }
    }

    /// Returns all field names this `Pattern` captures, sorted.
    #[inline(always)]
    pub fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.inner.capture_names()
    }

    /// Returns the conversion requested for a field, if any.
    #[inline(always)]
    pub fn conversion(&self, field: &str) -> Option<Conversion> {
        self.conversions.get(field).copied()
    }

    /// The regex generated from the grok pattern.
    pub fn as_regex(&self) -> &str {
        &self.regex
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.debug_struct("Pattern")
                .field("regex", &self.regex)
                .field("conversions", &self.conversions)
                .field("capture_names", &self.capture_names().collect::<Vec<_>>())
                .finish()
        } else {
            f.debug_struct("Pattern")
                .field("regex", &self.regex)
                .field(
                    "conversions",
                    &format!("{{ {:?} conversion(s) }}", self.conversions.len()),
                )
                .field(
                    "capture_names",
                    &format!("{{ {:?} capture(s) }}", self.capture_names().count()),
                )
                .finish()
        }
    }
}

/// The raw captures of one successful `Pattern` match.
pub struct Matches<'a> {
    inner: MatchesInner<'a>,
    pattern: &'a Pattern,
}

impl<'a> Matches<'a> {
    /// Gets the text captured for a field, or `None` if the field is unknown or
    /// its group did not take part in the match.
    #[inline(always)]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.inner.get(field)
    }

    /// Returns every field with its raw text. A field whose group did not take
    /// part in the match has an empty value.
    #[inline(always)]
    pub fn iter(&'a self) -> MatchesIter<'a> {
        MatchesIter {
            inner: self.inner.iter(),
        }
    }

    /// Collects the raw matches into a collection supporting `FromIterator`.
    #[inline(always)]
    pub fn collect<O: FromIterator<(&'a str, &'a str)>>(&'a self) -> O {
        self.iter().collect()
    }

    /// Converts every field to its typed value.
    pub fn to_fields(&'a self) -> Result<Fields, Error> {
        self.iter()
            .map(|(field, raw)| {
                let value = match self.pattern.conversion(field) {
                    Some(conversion) => conversion.convert(field, raw)?,
                    None => Value::String(raw.to_string()),
                };
                Ok((field.to_string(), value))
            })
            .collect()
    }

    /// Returns the number of fields.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.pattern.capture_names().count()
    }

    /// Returns true if the pattern captures no fields.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the pattern that was used to match this `Matches` instance.
    #[inline(always)]
    pub fn pattern(&self) -> &Pattern {
        self.pattern
    }
}

impl fmt::Debug for Matches<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a Matches<'a> {
    type Item = (&'a str, &'a str);
    type IntoIter = MatchesIter<'a>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An `Iterator` over all fields, accessible via `Matches`.
pub struct MatchesIter<'a> {
    inner: MatchesIterInner<'a>,
}

impl<'a> Iterator for MatchesIter<'a> {
    type Item = (&'a str, &'a str);

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(field, raw)| (field, raw.unwrap_or_default()))
    }
}

/// An ordered list of compiled patterns tried against the same text.
#[derive(Debug)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Extracts with every pattern in order and merges the fields. A field
    /// produced by a later pattern replaces the same field from an earlier
    /// one.
    ///
    /// With `break_on_match`, stops after the first pattern that produces at
    /// least one field.
    pub fn extract(&self, text: &str, break_on_match: bool) -> Result<Fields, Error> {
        let mut fields = Fields::new();
        for (index, pattern) in self.patterns.iter().enumerate() {
            let extracted = pattern.extract(text)?;
            if extracted.is_empty() {
                trace!(index = index, "pattern produced no fields");
                continue;
            }
            fields.extend(extracted);
            if break_on_match {
                debug!(
                    index = index,
                    skipped = self.patterns.len() - index - 1,
                    "break on match"
                );
                break;
            }
        }
        Ok(fields)
    }

    /// The compiled patterns, in the order they are tried.
    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    /// Number of patterns in the set.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns true if the set holds no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// The `Extractor` is the main entry point: it compiles grok patterns against
/// a shared [`TemplateRegistry`] and extracts fields from text.
///
/// Compilation keeps no state between calls, so one `Extractor` can be shared
/// across threads.
#[derive(Clone, Debug)]
pub struct Extractor {
    templates: Arc<TemplateRegistry>,
}

impl Extractor {
    /// Creates an `Extractor` over an already resolved registry.
    pub fn new(templates: impl Into<Arc<TemplateRegistry>>) -> Self {
        Self {
            templates: templates.into(),
        }
    }

    /// Creates an `Extractor` over the built-in templates.
    pub fn with_default_templates() -> Result<Self, Error> {
        Ok(Self::new(TemplateRegistry::with_default_templates()?))
    }

    /// The registry that references are resolved against.
    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Compiles a grok pattern.
    ///
    /// Each reference is replaced by its template's expanded fragment:
    ///
    /// - `%{TYPE}` becomes an unnamed group and produces no field.
    /// - `%{TYPE:field}` becomes a named group producing a string field.
    /// - `%{TYPE:field:conversion}` also records the conversion, one of `int`,
    ///   `integer`, `long`, `decimal`, `double` or `boolean`.
    ///
    /// Everything outside `%{...}` is copied into the regex as-is.
    pub fn compile(&self, pattern: &str) -> Result<Pattern, Error> {
        let (named_regex, aliases, conversions) = self.compile_regex(pattern)?;
        if named_regex.is_empty() {
            Err(Error::CompiledPatternIsEmpty(pattern.into()))
        } else {
            trace!(pattern = pattern, regex = named_regex.as_str(), "compiled grok pattern");
            Pattern::new(named_regex, aliases, conversions)
        }
    }

    /// Compiles every pattern, in order, before any of them is used.
    pub fn compile_all<I, S>(&self, patterns: I) -> Result<PatternSet, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| self.compile(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PatternSet { patterns })
    }

    /// Compiles `pattern` and extracts its fields from `text`.
    pub fn extract(&self, pattern: &str, text: &str) -> Result<Fields, Error> {
        self.compile(pattern)?.extract(text)
    }

    /// Compiles `patterns` and extracts from `text` with each, see
    /// [`PatternSet::extract`].
    pub fn extract_all<I, S>(
        &self,
        patterns: I,
        text: &str,
        break_on_match: bool,
    ) -> Result<Fields, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.compile_all(patterns)?.extract(text, break_on_match)
    }

    fn compile_regex(
        &self,
        pattern: &str,
    ) -> Result<(String, HashMap<String, String>, HashMap<String, Conversion>), Error> {
        let mut named_regex = String::with_capacity(pattern.len() * 4);
        let mut aliases: HashMap<String, String> = HashMap::new();
        let mut conversions: HashMap<String, Conversion> = HashMap::new();
        let mut fields: HashSet<&str> = HashSet::new();
        let components = grok_split(pattern).collect::<Vec<_>>();
        let prefix = self.group_prefix(&components);

        for component in components {
            match component {
                GrokComponent::Reference {
                    template,
                    field,
                    conversion,
                    ..
                } => {
                    let fragment = self.templates.lookup(template)?;

                    if field.is_empty() {
                        named_regex.push('(');
                    } else {
                        if !fields.insert(field) {
                            return Err(Error::DuplicateField(field.to_string()));
                        }
                        if !conversion.is_empty() {
                            conversions.insert(field.to_string(), conversion.parse()?);
                        }

                        // Generated names keep user field names out of the regex syntax.
                        let group = format!("{prefix}{}", aliases.len());
                        named_regex.push_str("(?<");
                        named_regex.push_str(&group);
                        named_regex.push('>');
                        aliases.insert(group, field.to_string());
                    }

                    named_regex.push_str(fragment);
                    named_regex.push(')');
                }
                GrokComponent::RegularExpression { string, .. } => {
                    named_regex.push_str(string);
                }
                GrokComponent::PatternError(e) => {
                    return Err(Error::InvalidPattern(format!("{e} in pattern {pattern:?}")));
                }
            }
        }

        Ok((named_regex, aliases, conversions))
    }

    /// A prefix for generated group names that occurs nowhere in the literal
    /// regex text or in any referenced template, so it cannot collide with a
    /// group the user named.
    fn group_prefix(&self, components: &[GrokComponent<'_>]) -> String {
        let mut prefix = String::from("_n_");
        while components.iter().any(|component| match component {
            GrokComponent::RegularExpression { string, .. } => string.contains(prefix.as_str()),
            GrokComponent::Reference { template, .. } => self
                .templates
                .get(template)
                .is_some_and(|fragment| fragment.contains(prefix.as_str())),
            GrokComponent::PatternError(_) => false,
        }) {
            prefix.insert(1, 'n');
        }
        prefix
    }
}

impl From<TemplateRegistry> for Extractor {
    fn from(templates: TemplateRegistry) -> Self {
        Self::new(templates)
    }
}

/// Errors that can occur when using this library.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A pattern or template references a template that is not defined.
    UndefinedTemplate(String),
    /// A captured field could not be parsed as its requested conversion.
    Conversion {
        field: String,
        conversion: Conversion,
        raw: String,
    },
    /// A template references itself, directly or through other templates.
    TemplateCycle(String),
    /// Template nesting exceeded the limit.
    RecursionTooDeep,
    /// A `%{...}` reference is malformed.
    InvalidPattern(String),
    /// The conversion segment of a reference is not a known conversion.
    UnknownConversion(String),
    /// The same field name appears twice in one pattern.
    DuplicateField(String),
    /// After compiling, the resulting compiled regex pattern is empty.
    CompiledPatternIsEmpty(String),
    /// If the compilation for a specific regex in the underlying engine failed.
    RegexCompilationFailed(String),
}

impl StdError for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UndefinedTemplate(name) => {
                write!(f, "The template \"{name}\" is not defined")
            }
            Error::Conversion {
                field,
                conversion,
                raw,
            } => write!(
                f,
                "The field \"{field}\" cannot be converted to {conversion}: {raw:?}"
            ),
            Error::TemplateCycle(name) => {
                write!(f, "The template \"{name}\" references itself")
            }
            Error::RecursionTooDeep => write!(
                f,
                "Template nesting reached the limit of {MAX_RECURSION}"
            ),
            Error::InvalidPattern(detail) => write!(f, "Invalid grok reference: {detail}"),
            Error::UnknownConversion(conversion) => write!(
                f,
                "Unknown conversion \"{conversion}\", expected one of int, integer, long, decimal, double, boolean"
            ),
            Error::DuplicateField(field) => {
                write!(f, "The field \"{field}\" is captured more than once")
            }
            Error::CompiledPatternIsEmpty(p) => write!(
                f,
                "The given pattern \"{p}\" ended up compiling into an empty regex"
            ),
            Error::RegexCompilationFailed(r) => write!(
                f,
                "The given regex \"{r}\" failed compilation in the underlying engine"
            ),
        }
    }
}
