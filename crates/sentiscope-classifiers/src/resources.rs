//! Linguistic resources for the text normalizer
//!
//! Stopwords and noun-lemma exceptions are installed into a local resource
//! directory once, via [`LinguisticResources::ensure`], and loaded from there.
//! The layout mirrors the usual corpus layout:
//!
//! ```text
//! <dir>/stopwords/english
//! <dir>/lemmas/noun.exc
//! ```

use sentiscope_core::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

const BUNDLED_STOPWORDS: &str = include_str!("../data/stopwords_english.txt");
const BUNDLED_NOUN_EXCEPTIONS: &str = include_str!("../data/noun_exceptions.txt");

const STOPWORDS_FILE: &str = "stopwords/english";
const NOUN_EXCEPTIONS_FILE: &str = "lemmas/noun.exc";

/// Detachment rules applied to regular plural nouns, longest suffix first
const NOUN_SUFFIX_RULES: &[(&str, &str)] = &[
    ("sses", "ss"),
    ("zzes", "zz"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("xes", "x"),
    ("ies", "y"),
    ("men", "man"),
    ("s", ""),
];

/// Stopword list and lemma data used by the full normalization pipeline
#[derive(Debug, Clone)]
pub struct LinguisticResources {
    stopwords: HashSet<String>,
    noun_exceptions: HashMap<String, String>,
}

impl LinguisticResources {
    /// Resources compiled into the crate, no filesystem access
    pub fn bundled() -> Self {
        Self {
            stopwords: parse_stopwords(BUNDLED_STOPWORDS),
            noun_exceptions: parse_exceptions(BUNDLED_NOUN_EXCEPTIONS),
        }
    }

    /// Install any missing resource files into `dir`, then load them.
    ///
    /// Idempotent: files already present are left untouched.
    pub fn ensure(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        for (relative, contents) in [
            (STOPWORDS_FILE, BUNDLED_STOPWORDS),
            (NOUN_EXCEPTIONS_FILE, BUNDLED_NOUN_EXCEPTIONS),
        ] {
            let path = dir.join(relative);
            if path.exists() {
                tracing::debug!("Resource present: {}", path.display());
                continue;
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::resource(format!(
                        "Failed to create resource directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }

            std::fs::write(&path, contents).map_err(|e| {
                Error::resource(format!("Failed to install {}: {}", path.display(), e))
            })?;
            tracing::info!("Installed linguistic resource: {}", path.display());
        }

        Self::load(dir)
    }

    /// Load resources from `dir` without installing anything
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let stopwords = read_resource(&dir.join(STOPWORDS_FILE))?;
        let exceptions = read_resource(&dir.join(NOUN_EXCEPTIONS_FILE))?;

        let resources = Self {
            stopwords: parse_stopwords(&stopwords),
            noun_exceptions: parse_exceptions(&exceptions),
        };

        tracing::debug!(
            "Loaded {} stopwords and {} lemma exceptions from {}",
            resources.stopwords.len(),
            resources.noun_exceptions.len(),
            dir.display()
        );

        Ok(resources)
    }

    /// Default resource directory (`~/.cache/sentiscope/resources`)
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cache/sentiscope/resources")
    }

    /// Whether `token` is an English stopword
    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Number of stopwords loaded
    pub fn stopword_count(&self) -> usize {
        self.stopwords.len()
    }

    /// Reduce a lowercase token to its noun base form.
    ///
    /// Exceptions win; otherwise the first matching detachment rule applies.
    /// Non-ASCII or non-alphabetic tokens are returned unchanged.
    pub fn lemmatize(&self, token: &str) -> String {
        if let Some(base) = self.noun_exceptions.get(token) {
            return base.clone();
        }

        if token.len() <= 3 || !token.bytes().all(|b| b.is_ascii_lowercase()) {
            return token.to_string();
        }

        for (suffix, replacement) in NOUN_SUFFIX_RULES {
            if !token.ends_with(suffix) || !rule_applies(token, suffix) {
                continue;
            }
            let stem = &token[..token.len() - suffix.len()];
            return format!("{}{}", stem, replacement);
        }

        token.to_string()
    }
}

impl Default for LinguisticResources {
    fn default() -> Self {
        Self::bundled()
    }
}

fn rule_applies(token: &str, suffix: &str) -> bool {
    match suffix {
        "men" => !["imen", "omen", "amen"].iter().any(|s| token.ends_with(s)),
        "ies" => token.len() > 4,
        "s" => !["ss", "us", "is"].iter().any(|s| token.ends_with(s)),
        _ => true,
    }
}

fn read_resource(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        Error::resource(format!(
            "Linguistic resource {} unavailable: {}",
            path.display(),
            e
        ))
    })
}

fn parse_stopwords(contents: &str) -> HashSet<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn parse_exceptions(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(inflected), Some(base)) if !inflected.starts_with('#') => {
                    Some((inflected.to_string(), base.to_string()))
                }
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_stopwords() {
        let resources = LinguisticResources::bundled();
        assert_eq!(resources.stopword_count(), 179);
        assert!(resources.is_stopword("the"));
        assert!(resources.is_stopword("wouldn't"));
        assert!(!resources.is_stopword("service"));
    }

    #[test]
    fn test_lemmatize_regular_plurals() {
        let resources = LinguisticResources::bundled();
        assert_eq!(resources.lemmatize("products"), "product");
        assert_eq!(resources.lemmatize("classes"), "class");
        assert_eq!(resources.lemmatize("boxes"), "box");
        assert_eq!(resources.lemmatize("churches"), "church");
        assert_eq!(resources.lemmatize("dishes"), "dish");
        assert_eq!(resources.lemmatize("companies"), "company");
        assert_eq!(resources.lemmatize("firemen"), "fireman");
        assert_eq!(resources.lemmatize("houses"), "house");
    }

    #[test]
    fn test_lemmatize_guards_and_exceptions() {
        let resources = LinguisticResources::bundled();
        assert_eq!(resources.lemmatize("children"), "child");
        assert_eq!(resources.lemmatize("movies"), "movie");
        assert_eq!(resources.lemmatize("always"), "always");
        assert_eq!(resources.lemmatize("glass"), "glass");
        assert_eq!(resources.lemmatize("status"), "status");
        assert_eq!(resources.lemmatize("analysis"), "analysis");
        assert_eq!(resources.lemmatize("specimen"), "specimen");
        assert_eq!(resources.lemmatize("was"), "was");
        assert_eq!(resources.lemmatize("ties"), "tie");
        assert_eq!(resources.lemmatize("überraschungs"), "überraschungs");
        assert_eq!(resources.lemmatize("2024s"), "2024s");
    }

    #[test]
    fn test_ensure_installs_then_loads() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LinguisticResources::load(dir.path()).is_err());

        let resources = LinguisticResources::ensure(dir.path()).unwrap();
        assert!(dir.path().join(STOPWORDS_FILE).exists());
        assert!(dir.path().join(NOUN_EXCEPTIONS_FILE).exists());
        assert_eq!(resources.stopword_count(), 179);

        let again = LinguisticResources::ensure(dir.path()).unwrap();
        assert_eq!(again.stopword_count(), 179);
    }

    #[test]
    fn test_ensure_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STOPWORDS_FILE);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "custom\nwords\n").unwrap();

        let resources = LinguisticResources::ensure(dir.path()).unwrap();
        assert_eq!(resources.stopword_count(), 2);
        assert!(resources.is_stopword("custom"));
        assert!(!resources.is_stopword("the"));
    }
}
