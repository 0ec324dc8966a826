// src/exec/argument.rs

//! Argument tokens and their flattening rule.
//!
//! Every argument handed to the spawn primitive is a plain string:
//!
//! - `Str` is passed as is.
//! - `Path` becomes its textual form (lossy for non-UTF-8 paths).
//! - `Seq` becomes ONE token: the flattened text of its elements
//!   concatenated in order, with no separator. `Seq(["--out=", path])`
//!   therefore yields `"--out=/tmp/x"`.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Str(String),
    Path(PathBuf),
    Seq(Vec<Argument>),
}

impl Argument {
    pub fn flatten(&self) -> String {
        match self {
            Argument::Str(s) => s.clone(),
            Argument::Path(p) => p.to_string_lossy().into_owned(),
            Argument::Seq(parts) => parts.iter().map(Argument::flatten).collect(),
        }
    }
}

/// Flatten a whole argument list into spawnable tokens.
pub fn flatten_arguments<I, A>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = A>,
    A: Into<Argument>,
{
    args.into_iter().map(|a| a.into().flatten()).collect()
}

impl From<&str> for Argument {
    fn from(s: &str) -> Self {
        Argument::Str(s.to_string())
    }
}

impl From<String> for Argument {
    fn from(s: String) -> Self {
        Argument::Str(s)
    }
}

impl From<&String> for Argument {
    fn from(s: &String) -> Self {
        Argument::Str(s.clone())
    }
}

impl From<PathBuf> for Argument {
    fn from(p: PathBuf) -> Self {
        Argument::Path(p)
    }
}

impl From<&Path> for Argument {
    fn from(p: &Path) -> Self {
        Argument::Path(p.to_path_buf())
    }
}

impl From<&PathBuf> for Argument {
    fn from(p: &PathBuf) -> Self {
        Argument::Path(p.clone())
    }
}

impl<T: Into<Argument>> From<Vec<T>> for Argument {
    fn from(parts: Vec<T>) -> Self {
        Argument::Seq(parts.into_iter().map(Into::into).collect())
    }
}
