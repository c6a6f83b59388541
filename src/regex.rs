use crate::Error;
use regex::{Captures, Regex};
use std::collections::{btree_map, BTreeMap, HashMap};

pub(crate) const ENGINE: crate::Engine = crate::Engine::Regex;

/// A generated regex compiled by the `regex` crate, with its groups indexed by
/// field name.
#[derive(Debug)]
pub(crate) struct RegexPattern {
    regex: Regex,
    names: BTreeMap<String, usize>,
}

impl RegexPattern {
    /// Compiles `regex`; `aliases` maps generated group names to field names.
    /// Groups not in `aliases` keep their own name.
    pub(crate) fn new(regex: &str, aliases: &HashMap<String, String>) -> Result<Self, Error> {
        let r = Regex::new(regex).map_err(|e| {
            Error::RegexCompilationFailed(format!("Regex compilation failed: {e}:\n{regex}"))
        })?;
        let mut names = BTreeMap::new();
        for (i, name) in r.capture_names().enumerate() {
            if let Some(name) = name {
                crate::bind_field(&mut names, aliases, name, i)?;
            }
        }
        Ok(Self { regex: r, names })
    }

    /// Finds the leftmost match in `text`.
    pub(crate) fn match_against<'a>(&'a self, text: &'a str) -> Option<RegexMatches<'a>> {
        self.regex.captures(text).map(|captures| RegexMatches {
            captures,
            pattern: self,
        })
    }

    pub(crate) fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(|s| s.as_str())
    }
}

#[derive(Debug)]
pub(crate) struct RegexMatches<'a> {
    captures: Captures<'a>,
    pattern: &'a RegexPattern,
}

impl<'a> RegexMatches<'a> {
    /// The text captured for `field`, or `None` if its group did not take part.
    pub(crate) fn get(&self, field: &str) -> Option<&str> {
        self.pattern
            .names
            .get(field)
            .and_then(|&idx| self.captures.get(idx))
            .map(|m| m.as_str())
    }

    /// Every field with its capture, including groups that did not take part.
    pub(crate) fn iter(&'a self) -> RegexMatchesIter<'a> {
        RegexMatchesIter {
            captures: &self.captures,
            names: self.pattern.names.iter(),
        }
    }
}

pub(crate) struct RegexMatchesIter<'a> {
    captures: &'a Captures<'a>,
    names: btree_map::Iter<'a, String, usize>,
}

impl<'a> Iterator for RegexMatchesIter<'a> {
    type Item = (&'a str, Option<&'a str>);

    fn next(&mut self) -> Option<Self::Item> {
        let (field, &idx) = self.names.next()?;
        Some((field.as_str(), self.captures.get(idx).map(|m| m.as_str())))
    }
}
