//! Batch pairing: discover `<base>_white.<ext>` / `<base>_black.<ext>` files in a directory and
//! matte every pair into `<output_dir>/<base>.png`.
//!
//! One bad pair never aborts the run (unless [`BatchOptions::fail_fast`] is set). Unmatched white
//! files, white files whose output is already claimed, and per-pair failures are collected as
//! [`BatchWarning`]s in the returned [`BatchReport`].

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    codec::ensure_parent_dir,
    extract::ExtractThreading,
    foundation::error::{MatteError, MatteResult},
    pipeline::extract_pair_file,
};

const WHITE_SUFFIX: &str = "_white";
const BLACK_SUFFIX: &str = "_black";

/// A resolved white/black pair and where its matte goes.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct MatchedPair {
    pub base: String,
    pub white: PathBuf,
    pub black: PathBuf,
    pub output: PathBuf,
}

/// One white-background candidate found while scanning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanEntry {
    Matched(MatchedPair),
    Unmatched(PathBuf),
    /// Another white pass with the same base already claimed `output`.
    Duplicate {
        white: PathBuf,
        output: PathBuf,
        first: PathBuf,
    },
}

/// Result of [`discover_pairs`], in file-name order of the white passes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PairScan {
    pub entries: Vec<ScanEntry>,
}

impl PairScan {
    pub fn pairs(&self) -> impl Iterator<Item = &MatchedPair> {
        self.entries.iter().filter_map(|e| match e {
            ScanEntry::Matched(p) => Some(p),
            _ => None,
        })
    }

    pub fn unmatched(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().filter_map(|e| match e {
            ScanEntry::Unmatched(p) => Some(p.as_path()),
            _ => None,
        })
    }

    /// White passes skipped because an earlier one maps to the same output.
    pub fn duplicates(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().filter_map(|e| match e {
            ScanEntry::Duplicate { white, .. } => Some(white.as_path()),
            _ => None,
        })
    }
}

/// Recoverable problems recorded during a batch run.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchWarning {
    /// No `<base>_black.*` file exists for this white pass.
    Unmatched { white: PathBuf },
    /// The pair was found but could not be processed.
    PairFailed { base: String, reason: String },
    /// `white` was skipped because `first` already produces `output`.
    Duplicate {
        white: PathBuf,
        output: PathBuf,
        first: PathBuf,
    },
}

impl fmt::Display for BatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unmatched { white } => write!(
                f,
                "{}",
                MatteError::UnmatchedPair {
                    white: white.clone()
                }
            ),
            Self::PairFailed { base, reason } => write!(f, "failed to process {base}: {reason}"),
            Self::Duplicate {
                white,
                output,
                first,
            } => write!(
                f,
                "skipping '{}': output '{}' already produced by '{}'",
                white.display(),
                output.display(),
                first.display()
            ),
        }
    }
}

/// Outcome of [`match_and_process`].
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct BatchReport {
    /// Pairs whose matte was written.
    pub processed: usize,
    pub warnings: Vec<BatchWarning>,
}

impl BatchReport {
    /// Number of pairs that were matched but failed.
    pub fn failed(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, BatchWarning::PairFailed { .. }))
            .count()
    }

    /// Number of white passes with no black counterpart.
    pub fn unmatched(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, BatchWarning::Unmatched { .. }))
            .count()
    }

    /// Number of white passes skipped for an output collision.
    pub fn duplicates(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, BatchWarning::Duplicate { .. }))
            .count()
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> MatteResult<()> {
        ensure_parent_dir(path)?;
        let f = std::fs::File::create(path)
            .with_context(|| format!("create report '{}'", path.display()))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(f), self)
            .with_context(|| format!("write report '{}'", path.display()))?;
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct BatchOptions {
    pub threading: ExtractThreading,
    /// Abort on the first failing pair instead of recording a warning.
    pub fail_fast: bool,
}

/// Pair every `<base>_white.<ext>` in `input_dir` with a `<base>_black.<ext>`.
///
/// White passes are visited in file-name order. When several black candidates exist, the
/// lexicographically smallest file name wins. Hidden files and non-UTF-8 names are ignored.
/// Each output path is claimed by the first white pass that maps to it; later ones (for
/// example `ball_white.tif` after `ball_white.png`) become [`ScanEntry::Duplicate`].
pub fn discover_pairs(input_dir: &Path, output_dir: &Path) -> MatteResult<PairScan> {
    if !input_dir.is_dir() {
        return Err(MatteError::not_found(input_dir));
    }

    let names = list_file_names(input_dir)?;
    let mut scan = PairScan::default();
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();

    for name in &names {
        let Some(base) = white_base(name) else {
            continue;
        };
        let white = input_dir.join(name);
        let output = output_dir.join(format!("{base}.png"));

        if let Some(first) = claimed.get(&output) {
            scan.entries.push(ScanEntry::Duplicate {
                white,
                output,
                first: first.clone(),
            });
            continue;
        }

        let black_prefix = format!("{base}{BLACK_SUFFIX}.");
        let black = names
            .iter()
            .find(|n| n.len() > black_prefix.len() && n.starts_with(&black_prefix));

        match black {
            Some(black) => {
                claimed.insert(output.clone(), white.clone());
                scan.entries.push(ScanEntry::Matched(MatchedPair {
                    base: base.to_string(),
                    white,
                    black: input_dir.join(black),
                    output,
                }));
            }
            None => scan.entries.push(ScanEntry::Unmatched(white)),
        }
    }

    Ok(scan)
}

/// Discover pairs in `input_dir` and write one matte per pair into `output_dir`.
#[tracing::instrument(skip(opts))]
pub fn match_and_process(
    input_dir: &Path,
    output_dir: &Path,
    opts: &BatchOptions,
) -> MatteResult<BatchReport> {
    let scan = discover_pairs(input_dir, output_dir)?;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("create output dir '{}'", output_dir.display()))?;

    let mut report = BatchReport::default();
    for entry in scan.entries {
        match entry {
            ScanEntry::Unmatched(white) => {
                let warning = BatchWarning::Unmatched { white };
                tracing::warn!("{warning}");
                report.warnings.push(warning);
            }
            ScanEntry::Duplicate {
                white,
                output,
                first,
            } => {
                let warning = BatchWarning::Duplicate {
                    white,
                    output,
                    first,
                };
                tracing::warn!("{warning}");
                report.warnings.push(warning);
            }
            ScanEntry::Matched(pair) => {
                tracing::info!(base = %pair.base, "processing");
                match extract_pair_file(&pair.white, &pair.black, &pair.output, &opts.threading) {
                    Ok(_) => {
                        tracing::info!(path = %pair.output.display(), "wrote");
                        report.processed += 1;
                    }
                    Err(e) if opts.fail_fast => return Err(e),
                    Err(e) => {
                        let warning = BatchWarning::PairFailed {
                            base: pair.base,
                            reason: e.to_string(),
                        };
                        tracing::warn!("{warning}");
                        report.warnings.push(warning);
                    }
                }
            }
        }
    }

    tracing::info!(
        processed = report.processed,
        warnings = report.warnings.len(),
        "batch finished"
    );
    Ok(report)
}

/// Sorted names of the visible regular files in `dir`.
fn list_file_names(dir: &Path) -> MatteResult<Vec<String>> {
    let mut names = Vec::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("read directory '{}'", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read directory '{}'", dir.display()))?;
        if !entry.path().is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            tracing::debug!(path = %entry.path().display(), "skipping non-utf8 file name");
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

/// `Some(base)` when `name` is `<base>_white.<ext>` with a non-empty extension.
fn white_base(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    stem.strip_suffix(WHITE_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_base_strips_suffix_from_stem() {
        assert_eq!(white_base("ball_white.png"), Some("ball"));
        assert_eq!(white_base("hero_idle_white.jpg"), Some("hero_idle"));
        assert_eq!(white_base("ball.v2_white.webp"), Some("ball.v2"));
        assert_eq!(white_base("ball_black.png"), None);
        assert_eq!(white_base("ball_white"), None);
        assert_eq!(white_base("ball_white."), None);
        assert_eq!(white_base("ball_whiter.png"), None);
    }

    #[test]
    fn warning_display_names_the_file() {
        let w = BatchWarning::Unmatched {
            white: PathBuf::from("raw/ball_white.png"),
        };
        assert_eq!(
            w.to_string(),
            "no black background match for 'raw/ball_white.png'"
        );

        let w = BatchWarning::PairFailed {
            base: "ball".to_string(),
            reason: "boom".to_string(),
        };
        assert_eq!(w.to_string(), "failed to process ball: boom");

        let w = BatchWarning::Duplicate {
            white: PathBuf::from("raw/ball_white.tif"),
            output: PathBuf::from("out/ball.png"),
            first: PathBuf::from("raw/ball_white.png"),
        };
        assert_eq!(
            w.to_string(),
            "skipping 'raw/ball_white.tif': output 'out/ball.png' already produced by 'raw/ball_white.png'"
        );
    }

    #[test]
    fn report_counts_by_kind() {
        let report = BatchReport {
            processed: 2,
            warnings: vec![
                BatchWarning::Unmatched {
                    white: PathBuf::from("a_white.png"),
                },
                BatchWarning::PairFailed {
                    base: "b".to_string(),
                    reason: "x".to_string(),
                },
                BatchWarning::Unmatched {
                    white: PathBuf::from("c_white.png"),
                },
                BatchWarning::Duplicate {
                    white: PathBuf::from("d_white.tif"),
                    output: PathBuf::from("out/d.png"),
                    first: PathBuf::from("d_white.png"),
                },
            ],
        };
        assert_eq!(report.unmatched(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.duplicates(), 1);
    }

    #[test]
    fn report_serializes_with_tagged_warnings() {
        let report = BatchReport {
            processed: 1,
            warnings: vec![BatchWarning::Unmatched {
                white: PathBuf::from("a_white.png"),
            }],
        };
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["processed"], 1);
        assert_eq!(v["warnings"][0]["kind"], "unmatched");
        assert_eq!(v["warnings"][0]["white"], "a_white.png");
    }
}
