use std::{fmt, iter::Peekable, ops::Range, str::CharIndices};

/// Why a `%{...}` reference could not be tokenized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrokPatternError {
    /// A character other than a word character, `:` or `}` inside the braces.
    InvalidCharacter(char),
    /// The input ended before the closing `}`.
    Unterminated,
    /// One of the `:`-separated segments is empty, e.g. `%{}` or `%{WORD::int}`.
    EmptySegment,
    /// More segments than `TYPE:name:conversion`.
    TooManySegments,
}

impl fmt::Display for GrokPatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrokPatternError::InvalidCharacter(c) => write!(f, "invalid character {c:?}"),
            GrokPatternError::Unterminated => f.write_str("unterminated reference"),
            GrokPatternError::EmptySegment => f.write_str("empty reference segment"),
            GrokPatternError::TooManySegments => f.write_str("too many reference segments"),
        }
    }
}

pub enum GrokComponent<'a> {
    /// Literal regular expression text, copied as-is.
    RegularExpression {
        range: Range<usize>,
        string: &'a str,
    },
    /// A `%{TYPE}`, `%{TYPE:field}` or `%{TYPE:field:conversion}` reference.
    /// Absent segments are empty strings.
    Reference {
        range: Range<usize>,
        token: &'a str,
        template: &'a str,
        field: &'a str,
        conversion: &'a str,
    },
    /// The pattern could not be parsed successfully.
    PatternError(GrokPatternError),
}

impl std::fmt::Debug for GrokComponent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrokComponent::RegularExpression { string, .. } => write!(f, "{string:?}"),
            GrokComponent::Reference {
                template,
                field,
                conversion,
                ..
            } => write!(
                f,
                "%{{ template={template:?} field={field:?} conversion={conversion:?} }}"
            ),
            GrokComponent::PatternError(e) => write!(f, "<error {e:?}>"),
        }
    }
}

impl std::fmt::Display for GrokComponent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrokComponent::RegularExpression { string, .. } => f.write_str(string),
            GrokComponent::Reference { token, .. } => f.write_str(token),
            GrokComponent::PatternError(e) => write!(f, "<error {e}>"),
        }
    }
}

/// An iterator over the components of a grok pattern.
pub struct GrokSplit<'a> {
    string: &'a str,
    string_iter: Peekable<CharIndices<'a>>,
}

impl<'a> Iterator for GrokSplit<'a> {
    type Item = GrokComponent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.try_next() {
            res @ Some(GrokComponent::PatternError(_)) => {
                // Fuse the iterator if we error out
                self.string_iter = "".char_indices().peekable();
                res
            }
            res => res,
        }
    }
}

impl<'a> GrokSplit<'a> {
    fn try_next(&mut self) -> Option<GrokComponent<'a>> {
        let &(start, first) = self.string_iter.peek()?;

        if first == '%' {
            _ = self.string_iter.next();
            if matches!(self.string_iter.peek(), Some((_, '{'))) {
                _ = self.string_iter.next();
                return Some(self.munch_reference(start));
            }
        }

        // A lone `%` is literal text; munch until the next `%` or end-of-string.
        while let Some(&(index, next)) = self.string_iter.peek() {
            if next == '%' {
                return Some(GrokComponent::RegularExpression {
                    string: &self.string[start..index],
                    range: start..index,
                });
            }
            _ = self.string_iter.next();
        }

        let range = start..self.string.len();
        Some(GrokComponent::RegularExpression {
            string: &self.string[range.clone()],
            range,
        })
    }

    /// Reads the `TYPE[:field[:conversion]]}` tail of a reference whose `%{`
    /// starts at `start`.
    fn munch_reference(&mut self, start: usize) -> GrokComponent<'a> {
        let mut segments: [&'a str; 3] = ["", "", ""];
        let mut count = 0;

        loop {
            let (terminator, end, word) = match self.try_munch_word() {
                Ok(munched) => munched,
                Err(e) => return GrokComponent::PatternError(e),
            };
            if count == segments.len() {
                return GrokComponent::PatternError(GrokPatternError::TooManySegments);
            }
            segments[count] = word;
            count += 1;

            if terminator == '}' {
                let range = start..end + 1;
                return GrokComponent::Reference {
                    token: &self.string[range.clone()],
                    range,
                    template: segments[0],
                    field: segments[1],
                    conversion: segments[2],
                };
            }
        }
    }

    /// Consumes one word plus its `:` or `}` terminator. Returns the
    /// terminator, its byte index, and the word.
    fn try_munch_word(&mut self) -> Result<(char, usize, &'a str), GrokPatternError> {
        let Some(&(start, _)) = self.string_iter.peek() else {
            return Err(GrokPatternError::Unterminated);
        };

        for (index, next) in self.string_iter.by_ref() {
            match next {
                '}' | ':' if index == start => return Err(GrokPatternError::EmptySegment),
                '}' | ':' => return Ok((next, index, &self.string[start..index])),
                c if c.is_alphanumeric() || c == '_' => {}
                c => return Err(GrokPatternError::InvalidCharacter(c)),
            }
        }

        Err(GrokPatternError::Unterminated)
    }
}

/// Splits a grok pattern into literal regex text and `%{...}` references.
pub fn grok_split<'a, S: AsRef<str> + ?Sized>(string: &'a S) -> GrokSplit<'a> {
    let string = string.as_ref();
    GrokSplit {
        string,
        string_iter: string.char_indices().peekable(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(pattern: &str) -> Vec<(String, String, String)> {
        grok_split(pattern)
            .filter_map(|c| match c {
                GrokComponent::Reference {
                    template,
                    field,
                    conversion,
                    ..
                } => Some((template.into(), field.into(), conversion.into())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_grok_split() {
        let pattern = "Hello, %{WORD}!";
        let components = grok_split(pattern);

        assert_eq!(
            components.map(|c| format!("{c}")).collect::<Vec<_>>(),
            vec!["Hello, ", "%{WORD}", "!"]
        );
    }

    #[test]
    fn test_reference_forms() {
        assert_eq!(
            segments("%{WORD} %{WORD:method} %{NUMBER:bytes:int}"),
            vec![
                ("WORD".into(), "".into(), "".into()),
                ("WORD".into(), "method".into(), "".into()),
                ("NUMBER".into(), "bytes".into(), "int".into()),
            ]
        );
    }

    #[test]
    fn test_reference_ranges() {
        let pattern = "a %{WORD:w} b";
        let ranges = grok_split(pattern)
            .map(|c| match c {
                GrokComponent::RegularExpression { range, .. } => range,
                GrokComponent::Reference { range, .. } => range,
                GrokComponent::PatternError(e) => panic!("{e}"),
            })
            .collect::<Vec<_>>();
        assert_eq!(ranges, vec![0..2, 2..11, 11..13]);
        assert_eq!(&pattern[2..11], "%{WORD:w}");
    }

    #[test]
    fn test_literal_percent() {
        for (pattern, expected) in [
            ("100%", vec!["100", "%"]),
            ("%", vec!["%"]),
            ("%%{WORD}", vec!["%", "%{WORD}"]),
            ("a%b%{WORD}c", vec!["a", "%b", "%{WORD}", "c"]),
            (r"\x25{WORD}", vec![r"\x25{WORD}"]),
        ] {
            assert_eq!(
                grok_split(pattern).map(|c| format!("{c}")).collect::<Vec<_>>(),
                expected,
                "{pattern}"
            );
        }
        assert_eq!(segments("%%{WORD}").len(), 1);
    }

    #[test]
    fn legal_grok_patterns() {
        for pattern in &[
            "%{name}",
            "%{name:name}",
            "%{name:name:name}",
            "%{NAME_2:field_1:int}",
            "%{número:campo}",
        ] {
            eprintln!("{pattern} -> {:?}", grok_split(pattern).collect::<Vec<_>>());
            assert!(!grok_split(pattern).any(|c| matches!(c, GrokComponent::PatternError(_))));
            assert_eq!(grok_split(pattern).count(), 1);
        }
    }

    #[test]
    fn real_grok_patterns() {
        for pattern in &[
            r"(?:\(Views: %{NUMBER:viewms}ms \| ActiveRecord: %{NUMBER:activerecordms}ms|\(ActiveRecord: %{NUMBER:activerecordms}ms)?",
            r"%{NUMBER:ts}\t%{NOTSPACE:uid}\t%{IP:orig_h}\t%{INT:orig_p:int}\t%{IP:resp_h}\t%{INT:resp_p:int}\t%{WORD:proto}\t%{GREEDYDATA:query}",
            r"(?:/[A-Za-z0-9$.+!*'(){},~:;=@#%&_\-]*)+",
        ] {
            eprintln!("{pattern} -> {:?}", grok_split(pattern).collect::<Vec<_>>());
            assert!(!grok_split(pattern).any(|c| matches!(c, GrokComponent::PatternError(_))));
        }
    }

    #[test]
    fn illegal_grok_patterns() {
        for (pattern, error) in [
            ("%{", GrokPatternError::Unterminated),
            ("%{name", GrokPatternError::Unterminated),
            ("%{name:", GrokPatternError::Unterminated),
            ("%{name:a", GrokPatternError::Unterminated),
            ("%{name:a:b", GrokPatternError::Unterminated),
            ("%{}", GrokPatternError::EmptySegment),
            ("%{name:}", GrokPatternError::EmptySegment),
            ("%{name::}", GrokPatternError::EmptySegment),
            ("%{name::b}", GrokPatternError::EmptySegment),
            ("%{name:a:}", GrokPatternError::EmptySegment),
            ("%{name:a:b:c}", GrokPatternError::TooManySegments),
            ("%{name:a:b:c:d}", GrokPatternError::TooManySegments),
            ("%{name=defn}", GrokPatternError::InvalidCharacter('=')),
            ("%{na me}", GrokPatternError::InvalidCharacter(' ')),
            ("%{a.b}", GrokPatternError::InvalidCharacter('.')),
        ] {
            let found = grok_split(pattern).find_map(|c| match c {
                GrokComponent::PatternError(e) => Some(e),
                _ => None,
            });
            assert_eq!(found, Some(error), "{pattern} should have failed");
        }
    }

    #[test]
    fn test_error_fuses_iterator() {
        let mut split = grok_split("%{bad!} %{WORD}");
        assert!(matches!(split.next(), Some(GrokComponent::PatternError(_))));
        assert!(split.next().is_none());
    }
}
