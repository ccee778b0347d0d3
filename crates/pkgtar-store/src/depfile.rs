use crate::{write_atomic, StoreError};
use std::collections::HashSet;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Make-style dependency record for a single output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Depfile {
    output: PathBuf,
    inputs: Vec<String>,
}

impl Depfile {
    /// Inputs keep their first-seen order; repeats are dropped.
    pub fn new<I, S>(output: impl Into<PathBuf>, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let inputs = inputs
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| seen.insert(s.clone()))
            .collect();
        Self {
            output: output.into(),
            inputs,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// `<output>: <input> <input> ...` plus a newline. Spaces inside a path
    /// are backslash-escaped.
    pub fn render(&self) -> String {
        let mut line = escape(&self.output.to_string_lossy());
        line.push(':');
        for input in &self.inputs {
            let _ = write!(line, " {}", escape(input));
        }
        line.push('\n');
        line
    }

    pub fn write(&self, path: &Path) -> Result<(), StoreError> {
        write_atomic(path, self.render().as_bytes())
    }
}

fn escape(path: &str) -> String {
    path.replace(' ', "\\ ")
}
