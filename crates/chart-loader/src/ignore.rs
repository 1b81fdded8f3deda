//! `.helmignore` rules.
//!
//! One pattern per line. Blank lines and lines starting with `#` are skipped,
//! a leading `!` negates the rule and a trailing `/` restricts it to
//! directories. `*` and `?` never match `/`. A pattern without `/` is matched
//! against the last path segment, otherwise (or when it starts with `/`)
//! against the path relative to the chart root. The last matching rule wins.

use crate::error::ChartError;
use regex::Regex;
use std::path::Path;

#[derive(Debug)]
struct Rule {
    pattern: Regex,
    negate: bool,
    dir_only: bool,
    basename: bool,
}

/// Parsed `.helmignore` file
#[derive(Debug, Default)]
pub struct IgnoreRules {
    rules: Vec<Rule>,
}

impl IgnoreRules {
    /// Read `<root>/.helmignore`; a missing file ignores nothing
    pub fn load(path: &Path) -> Result<Self, ChartError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ChartError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|reason| ChartError::InvalidIgnore {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let mut rules = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (negate, line) = match line.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, line),
            };
            let (dir_only, line) = match line.strip_suffix('/') {
                Some(rest) => (true, rest),
                None => (false, line),
            };
            let rooted = line.starts_with('/');
            let line = line.trim_start_matches('/');
            if line.is_empty() {
                continue;
            }
            if line.contains("**") {
                return Err(format!("pattern '{line}': double-star (**) syntax is not supported"));
            }
            let pattern = Regex::new(&glob_to_regex(line))
                .map_err(|e| format!("pattern '{line}': {e}"))?;
            rules.push(Rule {
                pattern,
                negate,
                dir_only,
                basename: !rooted && !line.contains('/'),
            });
        }
        Ok(Self { rules })
    }

    /// Whether `relative` (slash separated, relative to the chart root) is ignored
    pub fn is_ignored(&self, relative: &str, is_dir: bool) -> bool {
        let basename = relative.rsplit('/').next().unwrap_or(relative);
        let mut ignored = false;
        for rule in &self.rules {
            if rule.dir_only && !is_dir {
                continue;
            }
            let subject = if rule.basename { basename } else { relative };
            if rule.pattern.is_match(subject) {
                ignored = !rule.negate;
            }
        }
        ignored
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut regex = String::from("^");
    let mut chars = glob.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => regex.push_str("[^/]*"),
            '?' => regex.push_str("[^/]"),
            '[' => {
                let mut class = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == ']' {
                        closed = true;
                        break;
                    }
                    class.push(next);
                }
                if closed && !class.is_empty() {
                    let class = class
                        .strip_prefix('!')
                        .map_or(class.clone(), |rest| format!("^{rest}"));
                    regex.push('[');
                    regex.push_str(&class.replace('\\', "\\\\"));
                    regex.push(']');
                } else {
                    regex.push_str(&regex::escape(&format!("[{class}")));
                }
            }
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    regex
}
