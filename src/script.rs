use std::fmt;
use std::path::Path;

use clap::ValueEnum;

use crate::error::{Result, VideoError};

/// Sentence delimiter. Deliberately literal: abbreviations and quoted speech
/// containing ". " split too, and frame counts depend on it.
pub(crate) const SENTENCE_DELIMITER: &str = ". ";

const SEED_TOKENS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Style {
    Informative,
    Storytelling,
    Documentary,
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Style::Informative => "Informative",
            Style::Storytelling => "Storytelling",
            Style::Documentary => "Documentary",
        };
        f.write_str(name)
    }
}

/// Generated (or hand-edited) script text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Script(String);

impl Script {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub(crate) fn text(&self) -> &str {
        &self.0
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Segments on [`SENTENCE_DELIMITER`]. Empty segments are kept.
    pub(crate) fn sentences(&self) -> Vec<&str> {
        self.0.split(SENTENCE_DELIMITER).collect()
    }

    /// First few words of the script, used as the image search query.
    pub(crate) fn search_seed(&self) -> String {
        self.0
            .split_whitespace()
            .take(SEED_TOKENS)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Reads a saved script. A missing or unreadable file is an I/O error naming
/// the path; an empty file still loads and is rejected later as empty.
pub(crate) async fn load_script(path: &Path) -> Result<Script> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        VideoError::Io(std::io::Error::new(
            e.kind(),
            format!("cannot read script {}: {}", path.display(), e),
        ))
    })?;
    Ok(Script::new(text))
}

/// State shared between the two user actions. Generating a script replaces
/// it wholesale; assembly only ever borrows it.
#[derive(Debug, Default)]
pub(crate) struct Session {
    script: Option<Script>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn replace_script(&mut self, script: Script) {
        self.script = Some(script);
    }

    pub(crate) fn script(&self) -> Option<&Script> {
        self.script.as_ref().filter(|script| !script.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_literal_delimiter() {
        let script = Script::new("AI began in 1956. It grew fast. Today it is everywhere.");
        assert_eq!(
            script.sentences(),
            vec!["AI began in 1956", "It grew fast", "Today it is everywhere."]
        );
    }

    #[test]
    fn naive_split_keeps_known_limitations() {
        let script = Script::new("Dr. Smith said \"Stop. Now\" twice");
        assert_eq!(script.sentences().len(), 3);

        let script = Script::new("One.  Two");
        assert_eq!(script.sentences(), vec!["One", " Two"]);

        let script = Script::new("A. . B");
        assert_eq!(script.sentences(), vec!["A", "", "B"]);
    }

    #[test]
    fn text_without_delimiter_is_one_sentence() {
        let script = Script::new("No delimiter here.");
        assert_eq!(script.sentences(), vec!["No delimiter here."]);
    }

    #[test]
    fn search_seed_takes_first_five_tokens() {
        let script = Script::new("**Introduction**\n\nWelcome   to the history of artificial intelligence.");
        assert_eq!(script.search_seed(), "**Introduction** Welcome to the history");

        assert_eq!(Script::new("just two").search_seed(), "just two");
    }

    #[test]
    fn blank_script_is_empty() {
        assert!(Script::new("").is_empty());
        assert!(Script::new(" \n\t").is_empty());
        assert!(!Script::new("x").is_empty());
    }

    #[test]
    fn session_replaces_script_wholesale() {
        let mut session = Session::new();
        assert!(session.script().is_none());

        session.replace_script(Script::new("first"));
        session.replace_script(Script::new("second"));
        assert_eq!(session.script().map(Script::text), Some("second"));

        session.replace_script(Script::new(""));
        assert!(session.script().is_none());
    }

    #[test]
    fn style_names_match_prompt_wording() {
        assert_eq!(Style::Informative.to_string(), "Informative");
        assert_eq!(Style::Storytelling.to_string(), "Storytelling");
        assert_eq!(Style::Documentary.to_string(), "Documentary");
    }

    #[tokio::test]
    async fn missing_script_file_is_an_io_error_naming_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.txt");

        let err = load_script(&path).await.unwrap_err();

        match err {
            VideoError::Io(e) => {
                assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
                assert!(e.to_string().contains(&path.display().to_string()));
            }
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn saved_script_loads_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.txt");
        std::fs::write(&path, "Edited by hand. Second line.").unwrap();

        let script = load_script(&path).await.unwrap();

        assert_eq!(script.text(), "Edited by hand. Second line.");
        assert_eq!(script.sentences().len(), 2);
    }
}
