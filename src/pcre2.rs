use crate::Error;
use pcre2::bytes::{Captures, Regex, RegexBuilder};
use std::collections::{btree_map, BTreeMap, HashMap};

pub(crate) const ENGINE: crate::Engine = crate::Engine::Pcre2;

/// A generated regex compiled by PCRE2 in UTF mode, with its groups indexed by
/// field name.
#[derive(Debug)]
pub(crate) struct Pcre2Pattern {
    regex: Regex,
    names: BTreeMap<String, usize>,
}

impl Pcre2Pattern {
    /// Compiles `regex`; `aliases` maps generated group names to field names.
    pub(crate) fn new(regex: &str, aliases: &HashMap<String, String>) -> Result<Self, Error> {
        let mut builder = RegexBuilder::new();
        builder.jit_if_available(true);
        builder.utf(true);
        match builder.build(regex) {
            Ok(r) => {
                let mut names = BTreeMap::new();
                for (i, name) in r.capture_names().iter().enumerate() {
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

    /// Finds the leftmost match in `text`. A matching error (e.g. the match
    /// limit) counts as no match.
    pub(crate) fn match_against<'a>(&'a self, text: &'a str) -> Option<Pcre2Matches<'a>> {
        self.regex
            .captures(text.as_bytes())
            .ok()
            .flatten()
            .map(|captures| Pcre2Matches {
                text,
                captures,
                pattern: self,
            })
    }

    pub(crate) fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(|s| s.as_str())
    }
}

#[derive(Debug)]
pub(crate) struct Pcre2Matches<'a> {
    text: &'a str,
    captures: Captures<'a>,
    pattern: &'a Pcre2Pattern,
}

impl<'a> Pcre2Matches<'a> {
    pub(crate) fn get(&self, field: &str) -> Option<&str> {
        self.pattern
            .names
            .get(field)
            .and_then(|&idx| self.captures.get(idx))
            .map(|m| &self.text[m.start()..m.end()])
    }

    pub(crate) fn iter(&'a self) -> Pcre2MatchesIter<'a> {
        Pcre2MatchesIter {
            text: self.text,
            captures: &self.captures,
            names: self.pattern.names.iter(),
        }
    }
}

pub(crate) struct Pcre2MatchesIter<'a> {
    text: &'a str,
    captures: &'a Captures<'a>,
    names: btree_map::Iter<'a, String, usize>,
}

impl<'a> Iterator for Pcre2MatchesIter<'a> {
    type Item = (&'a str, Option<&'a str>);

    fn next(&mut self) -> Option<Self::Item> {
        let (field, &idx) = self.names.next()?;
        let text = self.text;
        Some((
            field.as_str(),
            self.captures.get(idx).map(|m| &text[m.start()..m.end()]),
        ))
    }
}
