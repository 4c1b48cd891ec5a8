/// Crate-level error types for reference parsing, linking, and library loading.
use std::path::PathBuf;

/// Every error carries enough context to produce a useful diagnostic without
/// a debugger: the raw citation, the book, or the record that failed.
#[allow(clippy::error_impl_error, reason = "crate-level error type re-exported as textref::Error")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An alternate structure does not map monotonically or totally onto the primary structure.
    #[error("alt structure `{structure}` of {book} is invalid: {reason}")]
    AltStructureInvalid {
        /// Book owning the structure.
        book: String,
        /// What went wrong.
        reason: String,
        /// Name of the alternate structure.
        structure: String,
    },

    /// The title portion of a citation matched no known book, node, or term.
    #[error("unrecognized title in `{text}`")]
    BookName {
        /// Known titles that look similar to the input.
        suggestions: Vec<String>,
        /// The raw citation text.
        text: String,
    },

    /// A config file named explicitly on the command line does not exist.
    #[error("config not found: {}", path.display())]
    ConfigNotFound {
        /// Path to the missing config file.
        path: PathBuf,
    },

    /// A record with the same identity was already loaded.
    #[error("duplicate record: {key}")]
    DuplicateRecord {
        /// Identity of the duplicated record.
        key: String,
    },

    /// The title was recognized but the address tail is malformed or out of range.
    #[error("invalid reference `{text}`: {reason}")]
    Input {
        /// Why the tail was rejected.
        reason: String,
        /// The raw citation text.
        text: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// A store record could not be deserialized.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// Markup in scanned text is broken badly enough that offsets cannot be tracked.
    #[error("malformed markup at char {offset}: {reason}")]
    MalformedMarkup {
        /// Char offset of the offending tag.
        offset: usize,
        /// Description of the problem.
        reason: String,
    },

    /// The citation names a structural node but omits the deeper parts it requires.
    #[error("partial reference `{text}`: matched `{matched}` but {reason}")]
    PartialRefInput {
        /// Canonical title of the node that did match.
        matched: String,
        /// Why the remainder could not be resolved.
        reason: String,
        /// The raw citation text.
        text: String,
    },

    /// A generated regular expression failed to compile.
    #[error("pattern: {0}")]
    Pattern(
        /// The wrapped regex error.
        #[from]
        regex::Error,
    ),

    /// Review log exists but cannot be trusted.
    #[error("review log corrupt: {reason}")]
    ReviewLogCorrupt {
        /// Description of the corruption.
        reason: String,
    },

    /// Expected review log does not exist on disk.
    #[error("review log not found: {}", path.display())]
    ReviewLogNotFound {
        /// Path to the missing review log.
        path: PathBuf,
    },

    /// A schema tree violates a structural invariant.
    #[error("schema of {book} is invalid: {reason}")]
    SchemaInvalid {
        /// Book owning the schema.
        book: String,
        /// What went wrong.
        reason: String,
    },

    /// Two unrelated nodes claim the same title.
    #[error("title `{title}` is claimed by both {first} and {second}")]
    TitleCollision {
        /// Owner that registered the title first.
        first: String,
        /// Owner that tried to register it again.
        second: String,
        /// The colliding title.
        title: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// TOML serialization failed.
    #[error("toml serialize: {0}")]
    TomlSer(
        /// The wrapped TOML serialization error.
        #[from]
        toml::ser::Error,
    ),
}

impl Error {
    /// Shorthand for an `Input` error about `text`.
    pub(crate) fn input(text: &str, reason: impl Into<String>) -> Self {
        return Self::Input {
            reason: reason.into(),
            text: text.to_string(),
        };
    }

    /// True for `Input` and its `PartialRefInput` subtype.
    pub const fn is_input_error(&self) -> bool {
        return matches!(self, Self::Input { .. } | Self::PartialRefInput { .. });
    }

    /// Shorthand for a `SchemaInvalid` error.
    pub(crate) fn schema(book: &str, reason: impl Into<String>) -> Self {
        return Self::SchemaInvalid {
            book: book.to_string(),
            reason: reason.into(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn partial_ref_is_an_input_error() {
        let err = Error::PartialRefInput {
            matched: "Pesach Haggadah".to_string(),
            reason: "no default section".to_string(),
            text: "Pesach Haggadah 3".to_string(),
        };
        assert!(err.is_input_error(), "partial refs must be treated as input errors");
        assert!(!Error::schema("Genesis", "x").is_input_error(), "schema errors are not input errors");
    }
}
