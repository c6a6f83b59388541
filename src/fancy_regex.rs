use crate::Error;
use fancy_regex::{Captures, Regex};
use std::collections::{btree_map, BTreeMap, HashMap};

pub(crate) const ENGINE: crate::Engine = crate::Engine::FancyRegex;

/// A generated regex compiled by `fancy-regex`, with its groups indexed by
/// field name.
#[derive(Debug)]
pub(crate) struct FancyRegexPattern {
    regex: Regex,
    names: BTreeMap<String, usize>,
}

impl FancyRegexPattern {
    /// Compiles `regex`; `aliases` maps generated group names to field names.
    pub(crate) fn new(regex: &str, aliases: &HashMap<String, String>) -> Result<Self, Error> {
        match Regex::new(regex) {
            Ok(r) => {
                let mut names = BTreeMap::new();
                for (i, name) in r.capture_names().enumerate() {
                    if let Some(name) = name {
                        crate::bind_field(&mut names, aliases, name, i)?;
                    }
                }
                Ok(Self { regex: r, names })
            }
            Err(e) => Err(Error::RegexCompilationFailed(format!(
                "Regex compilation failed: {e:?}:\n{regex}"
            ))),
        }
    }

    /// Finds the leftmost match in `text`. Hitting the backtrack limit counts
    /// as no match.
    pub(crate) fn match_against<'a>(&'a self, text: &'a str) -> Option<FancyRegexMatches<'a>> {
        self.regex
            .captures(text)
            .ok()
            .flatten()
            .map(|captures| FancyRegexMatches {
                captures,
                pattern: self,
            })
    }

    pub(crate) fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(|s| s.as_str())
    }
}

#[derive(Debug)]
pub(crate) struct FancyRegexMatches<'a> {
    captures: Captures<'a>,
    pattern: &'a FancyRegexPattern,
}

impl<'a> FancyRegexMatches<'a> {
    pub(crate) fn get(&self, field: &str) -> Option<&str> {
        self.pattern
            .names
            .get(field)
            .and_then(|&idx| self.captures.get(idx))
            .map(|m| m.as_str())
    }

    pub(crate) fn iter(&'a self) -> FancyRegexMatchesIter<'a> {
        FancyRegexMatchesIter {
            captures: &self.captures,
            names: self.pattern.names.iter(),
        }
    }
}

pub(crate) struct FancyRegexMatchesIter<'a> {
    captures: &'a Captures<'a>,
    names: btree_map::Iter<'a, String, usize>,
}

impl<'a> Iterator for FancyRegexMatchesIter<'a> {
    type Item = (&'a str, Option<&'a str>);

    fn next(&mut self) -> Option<Self::Item> {
        let (field, &idx) = self.names.next()?;
        Some((field.as_str(), self.captures.get(idx).map(|m| m.as_str())))
    }
}
