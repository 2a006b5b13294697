//! Include/exclude classification for sync candidates.
//!
//! Patterns are shell-style globs where `*` also crosses `/`. Every pattern is
//! tried against both the root-relative path and the bare file name.
//! Directory rules (`X/*`, `X/**`, `X/**/*`) also cover a directory `X` found
//! at any depth, so `cache2/*` reaches `Profiles/abc.default/cache2/...`.
//! Excludes always win at the file level; includes only keep a directory from
//! being pruned during the walk.

use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::error::{Result, SyncError};

/// Outcome of classifying a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Matched an exclude pattern.
    Excluded,
    /// Matched an include pattern.
    Important,
    /// Matched nothing; included by default.
    Default,
}

impl Classification {
    pub fn is_included(&self) -> bool {
        !matches!(self, Classification::Excluded)
    }
}

/// One compiled rule plus the matchers used for directory pruning.
#[derive(Debug, Clone)]
struct Rule {
    raw: String,
    /// Matches a directory whose entire subtree this pattern covers
    /// (`X/*`, `X/**`, `X/**/*` with `X` matched against a trailing run of
    /// the directory path).
    subtree: Option<GlobMatcher>,
    /// Matches the pattern's leading segment, for patterns containing `/`.
    leading: Option<GlobMatcher>,
}

impl Rule {
    fn compile(raw: &str) -> Result<Self> {
        let subtree = ["/**/*", "/**", "/*"]
            .iter()
            .find_map(|suffix| raw.strip_suffix(suffix))
            .filter(|base| !base.is_empty())
            .map(matcher)
            .transpose()?;
        let leading = match raw.split_once('/') {
            Some((first, _)) if !first.is_empty() => Some(matcher(first)?),
            _ => None,
        };
        Ok(Self {
            raw: raw.to_string(),
            subtree,
            leading,
        })
    }
}

fn glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(false)
        .build()
        .map_err(|e| SyncError::Config(format!("Invalid pattern '{}': {}", pattern, e)))
}

fn matcher(pattern: &str) -> Result<GlobMatcher> {
    Ok(glob(pattern)?.compile_matcher())
}

fn build_set(rules: &[Rule]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for rule in rules {
        builder.add(glob(&rule.raw)?);
    }
    builder
        .build()
        .map_err(|e| SyncError::Config(format!("Invalid pattern set: {}", e)))
}

/// Ordered exclude and include glob rules.
#[derive(Debug, Clone)]
pub struct PatternSet {
    exclude: Vec<Rule>,
    include: Vec<Rule>,
    exclude_set: GlobSet,
    include_set: GlobSet,
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl PatternSet {
    /// A set that includes everything.
    pub fn empty() -> Self {
        Self {
            exclude: Vec::new(),
            include: Vec::new(),
            exclude_set: GlobSet::empty(),
            include_set: GlobSet::empty(),
        }
    }

    /// Compile exclude and include pattern lists.
    pub fn new<S: AsRef<str>>(exclude: &[S], include: &[S]) -> Result<Self> {
        let exclude = exclude
            .iter()
            .map(|p| Rule::compile(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let include = include
            .iter()
            .map(|p| Rule::compile(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            exclude_set: build_set(&exclude)?,
            include_set: build_set(&include)?,
            exclude,
            include,
        })
    }

    pub fn exclude_patterns(&self) -> impl Iterator<Item = &str> {
        self.exclude.iter().map(|r| r.raw.as_str())
    }

    pub fn include_patterns(&self) -> impl Iterator<Item = &str> {
        self.include.iter().map(|r| r.raw.as_str())
    }

    /// Classify a file by its root-relative path (forward slashes).
    pub fn classify(&self, relative_path: &str) -> Classification {
        let name = file_name(relative_path);
        if self.exclude_set.is_match(relative_path) || self.exclude_set.is_match(name) {
            return Classification::Excluded;
        }
        if ancestors(relative_path).any(|dir| self.covers_directory(dir)) {
            return Classification::Excluded;
        }
        if self.include_set.is_match(relative_path) || self.include_set.is_match(name) {
            return Classification::Important;
        }
        Classification::Default
    }

    /// Whether a file at this root-relative path takes part in sync.
    pub fn include_file(&self, relative_path: &str) -> bool {
        self.classify(relative_path).is_included()
    }

    /// Whether a directory walk may skip this subtree entirely.
    ///
    /// `relative_dir` is the directory's root-relative path; a bare name works
    /// too. Prunes when a directory rule covers it and no include rule's
    /// leading segment names it. Every file below a pruned directory is
    /// already [`Excluded`](Classification::Excluded), so pruning never hides
    /// a file [`include_file`](Self::include_file) would keep.
    pub fn prune_directory(&self, relative_dir: &str) -> bool {
        if !self.covers_directory(relative_dir) {
            return false;
        }

        let name = file_name(relative_dir);
        let rescued = self
            .include
            .iter()
            .filter_map(|r| r.leading.as_ref())
            .any(|m| m.is_match(name));
        !rescued
    }

    /// Whether a walk from the root would reach this file and keep it.
    pub fn scan_reaches(&self, relative_path: &str) -> bool {
        !ancestors(relative_path).any(|dir| self.prune_directory(dir))
            && self.include_file(relative_path)
    }

    fn covers_directory(&self, relative_dir: &str) -> bool {
        self.exclude
            .iter()
            .filter_map(|r| r.subtree.as_ref())
            .any(|m| trailing_runs(relative_dir).any(|run| m.is_match(run)))
    }
}

/// Every proper ancestor directory of a relative path, shortest first.
fn ancestors(relative_path: &str) -> impl Iterator<Item = &str> {
    relative_path
        .match_indices('/')
        .map(move |(i, _)| &relative_path[..i])
        .filter(|dir| !dir.is_empty())
}

/// `a/b/c`, `b/c`, `c`: each suffix starting at a segment boundary.
fn trailing_runs(path: &str) -> impl Iterator<Item = &str> {
    std::iter::once(path).chain(path.match_indices('/').map(move |(i, _)| &path[i + 1..]))
}

fn file_name(relative_path: &str) -> &str {
    relative_path.rsplit('/').next().unwrap_or(relative_path)
}
