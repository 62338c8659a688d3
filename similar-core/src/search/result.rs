use camino::Utf8PathBuf;
use serde::Serialize;

/// One ranked candidate. Every field is always populated.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MatchResult {
    /// File name of the candidate, eg. "logo.png"
    pub name: String,
    /// Path of the candidate as discovered under the assets directory
    pub path: Utf8PathBuf,
    /// Cosine similarity to the query, in [-1, 1]
    pub similarity: f32,
}

impl MatchResult {
    pub fn new(path: Utf8PathBuf, similarity: f32) -> Self {
        let name = path.file_name().unwrap_or(path.as_str()).to_owned();
        MatchResult { name, path, similarity }
    }
}
