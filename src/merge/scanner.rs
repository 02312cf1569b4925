// src/merge/scanner.rs
use itertools::Itertools;
use regex::Regex;

/// A placeholder token as written in the template: the bare name plus the
/// literal matched text (delimiters included) that substitution replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderToken {
    pub name: String,
    pub literal: String,
}

/// One token occurrence tied to the text fragment containing it.
///
/// Occurrences are transient views: they are only meaningful against the
/// exact document instance they were scanned from and are discarded after
/// substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderOccurrence {
    /// Index of the owning fragment in the scanned fragment sequence.
    pub fragment: usize,
    pub token: PlaceholderToken,
}

/// Finds placeholder tokens in document text.
///
/// A token is `marker name-chars* marker` with a fixed single-character
/// marker on both sides; matching is non-greedy, so `#a#` and `#b#` in one
/// fragment are two tokens, not one. `##` is a valid token with an empty
/// name. A token whose delimiters fall in different fragments is not
/// detected; template authors must keep each placeholder inside one
/// contiguous run.
///
/// The scanner holds no mutable state and may be re-invoked any number of
/// times against any document instance.
pub struct PlaceholderScanner {
    pattern: Regex,
}

impl PlaceholderScanner {
    pub fn new(marker: char) -> Self {
        let escaped = regex::escape(&marker.to_string());
        let pattern = Regex::new(&format!("{escaped}([^{escaped}]*){escaped}"))
            .expect("placeholder pattern is valid for any escaped marker");
        Self { pattern }
    }

    /// Scans an ordered fragment sequence, yielding occurrences in
    /// fragment order and, within a fragment, in match order.
    pub fn scan_texts<'a>(
        &self,
        texts: impl IntoIterator<Item = &'a str>,
    ) -> Vec<PlaceholderOccurrence> {
        let mut occurrences = Vec::new();
        for (fragment, text) in texts.into_iter().enumerate() {
            for captures in self.pattern.captures_iter(text) {
                let literal = captures.get(0).map_or("", |m| m.as_str()).to_string();
                let name = captures.get(1).map_or("", |m| m.as_str()).to_string();
                occurrences.push(PlaceholderOccurrence {
                    fragment,
                    token: PlaceholderToken { name, literal },
                });
            }
        }
        occurrences
    }

    /// Distinct placeholder names, first-seen order, duplicates collapsed.
    pub fn names<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        self.scan_texts(texts)
            .into_iter()
            .map(|occurrence| occurrence.token.name)
            .unique()
            .collect()
    }
}
