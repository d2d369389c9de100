use std::path::PathBuf;

/// Convenience result type used across the crate.
pub type MatteResult<T> = Result<T, MatteError>;

/// Errors produced by matte extraction, pairing, codec and fallback operations.
#[derive(thiserror::Error, Debug)]
pub enum MatteError {
    /// White and black passes are not congruent.
    #[error(
        "dimension mismatch: white pass is {}x{}, black pass is {}x{}",
        .white.0, .white.1, .black.0, .black.1
    )]
    DimensionMismatch {
        /// `(width, height)` of the white-background pass.
        white: (u32, u32),
        /// `(width, height)` of the black-background pass.
        black: (u32, u32),
    },

    /// A white-background file has no `<base>_black.*` counterpart.
    #[error("no black background match for '{}'", .white.display())]
    UnmatchedPair {
        /// The unmatched white-background file.
        white: PathBuf,
    },

    /// An optional external capability is unavailable.
    #[error("missing dependency: {capability} ({hint})")]
    MissingDependency {
        /// What is missing, e.g. the fallback program name.
        capability: String,
        /// How to make it available.
        hint: String,
    },

    /// A referenced file or directory does not exist.
    #[error("not found: '{}'", .path.display())]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// Decoding or encoding an image failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// Invalid buffers or options.
    #[error("validation error: {0}")]
    Validation(String),

    /// Anything else, usually an I/O failure with context attached.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MatteError {
    /// Build a [`MatteError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`MatteError::Codec`].
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    /// Build a [`MatteError::NotFound`].
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Build a [`MatteError::MissingDependency`].
    pub fn missing_dependency(capability: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingDependency {
            capability: capability.into(),
            hint: hint.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            MatteError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(MatteError::codec("x").to_string().contains("codec error:"));
        assert!(
            MatteError::not_found("a/b.png")
                .to_string()
                .contains("not found: 'a/b.png'")
        );
        assert!(
            MatteError::missing_dependency("rembg", "pip install rembg")
                .to_string()
                .contains("missing dependency: rembg")
        );
    }

    #[test]
    fn dimension_mismatch_names_both_sizes() {
        let err = MatteError::DimensionMismatch {
            white: (4, 3),
            black: (2, 1),
        };
        let msg = err.to_string();
        assert!(msg.contains("4x3"));
        assert!(msg.contains("2x1"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = MatteError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
