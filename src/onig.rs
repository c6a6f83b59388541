use crate::Error;
use onig::{MatchParam, Regex, RegexOptions, Region, SearchOptions, Syntax};
use std::collections::{btree_map, BTreeMap, HashMap};

pub(crate) const ENGINE: crate::Engine = crate::Engine::Onig;

/// A generated regex compiled by Oniguruma, with its groups indexed by field
/// name.
#[derive(Debug)]
pub(crate) struct OnigPattern {
    regex: Regex,
    names: BTreeMap<String, u32>,
}

impl OnigPattern {
    /// Compiles `regex`; `aliases` maps generated group names to field names.
    /// Groups not in `aliases` keep their own name.
    pub(crate) fn new(regex: &str, aliases: &HashMap<String, String>) -> Result<Self, Error> {
        // Perl syntax in single-line mode: `^` and `$` anchor at the text edges.
        match Regex::with_options(
            regex,
            RegexOptions::REGEX_OPTION_SINGLELINE,
            Syntax::perl_ng(),
        ) {
            Ok(r) => {
                let mut names = BTreeMap::new();
                let mut bound = Ok(());
                r.foreach_name(|group, indices| {
                    // A name reused by several groups resolves to the last one.
                    if let Some(&idx) = indices.last() {
                        bound = crate::bind_field(&mut names, aliases, group, idx);
                    }
                    bound.is_ok()
                });
                bound?;
                Ok(Self { regex: r, names })
            }
            Err(e) => Err(Error::RegexCompilationFailed(format!(
                "Regex compilation failed: {e:?}:\n{regex}"
            ))),
        }
    }

    /// Finds the leftmost match in `text`. A search error counts as no match.
    pub(crate) fn match_against<'a>(&'a self, text: &'a str) -> Option<OnigMatches<'a>> {
        // Inlined version of the onig methods that cause an internal panic
        let mut region = Region::new();
        let result = self.regex.search_with_param(
            text,
            0,
            text.len(),
            SearchOptions::SEARCH_OPTION_NONE,
            Some(&mut region),
            MatchParam::default(),
        );

        result.ok().flatten().map(|_| OnigMatches {
            text,
            region,
            pattern: self,
        })
    }

    pub(crate) fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(|s| s.as_str())
    }
}

#[derive(Debug)]
pub(crate) struct OnigMatches<'a> {
    text: &'a str,
    region: Region,
    pattern: &'a OnigPattern,
}

impl<'a> OnigMatches<'a> {
    pub(crate) fn get(&self, field: &str) -> Option<&str> {
        let &idx = self.pattern.names.get(field)?;
        self.region
            .pos(idx as usize)
            .map(|(start, end)| &self.text[start..end])
    }

    pub(crate) fn iter(&'a self) -> OnigMatchesIter<'a> {
        OnigMatchesIter {
            text: self.text,
            region: &self.region,
            names: self.pattern.names.iter(),
        }
    }
}

pub(crate) struct OnigMatchesIter<'a> {
    text: &'a str,
    region: &'a Region,
    names: btree_map::Iter<'a, String, u32>,
}

impl<'a> Iterator for OnigMatchesIter<'a> {
    type Item = (&'a str, Option<&'a str>);

    fn next(&mut self) -> Option<Self::Item> {
        let (field, &idx) = self.names.next()?;
        let text = self.text;
        Some((
            field.as_str(),
            self.region
                .pos(idx as usize)
                .map(|(start, end)| &text[start..end]),
        ))
    }
}
