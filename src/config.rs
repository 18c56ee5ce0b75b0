//! Repository list configuration
//!
//! The config file is INI-like: one section per repository entry, where the
//! section name is an arbitrary unique label and the keys are `url` (the
//! fork), `upstream`, and `branches` (comma-separated `from->to` pairs,
//! upstream branch on the left, fork branch on the right):
//!
//! ```ini
//! [my-fork]
//!     url = https://github.com/user/project
//!     upstream = https://github.com/original/project
//!     branches = master->master, develop->develop
//! ```
//!
//! Parsing is strict: a malformed file aborts the run before any API call is
//! made, so entries never fail half-way through processing for syntax
//! reasons.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::api::RepoRef;
use crate::error::Error;

/// Declared pairing of an upstream branch to a fork branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchMapping {
    pub upstream_branch: String,
    pub fork_branch: String,
}

/// One repository entry from the configuration file
///
/// Immutable after parse; consumed once per run, in declared order.
#[derive(Debug, Clone)]
pub struct RepositoryEntry {
    /// Unique section label from the config file
    pub name: String,
    pub fork: RepoRef,
    pub upstream: RepoRef,
    pub mappings: Vec<BranchMapping>,
}

fn github_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"github\.com[:/]([^/\s]+)/([^/\s]+?)(?:\.git)?/?$").expect("valid regex")
    })
}

fn branch_pair_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+?)\s*->\s*(.+)$").expect("valid regex"))
}

/// Parse a github.com repository URL into owner and name
pub fn parse_github_url(url: &str) -> Option<RepoRef> {
    github_url_regex()
        .captures(url)
        .map(|caps| RepoRef::new(&caps[1], &caps[2]))
}

/// Load and parse the repository list from a file
pub fn load_entries(path: &Path) -> Result<Vec<RepositoryEntry>, Error> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::ConfigParse(format!("failed to read {}: {}", path.display(), e)))?;

    parse_entries(&content)
}

/// Parse the repository list from config file content
pub fn parse_entries(content: &str) -> Result<Vec<RepositoryEntry>, Error> {
    let mut entries: Vec<RepositoryEntry> = Vec::new();
    let mut current: Option<RawSection> = None;

    for (line_number, raw_line) in content.lines().enumerate() {
        let line_number = line_number + 1;
        // The original format allowed tab-indented keys
        let line = raw_line.replace('\t', "").trim().to_string();

        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(section_name) = line.strip_prefix('[') {
            let section_name = section_name
                .strip_suffix(']')
                .ok_or_else(|| {
                    Error::ConfigParse(format!("line {}: unterminated section header", line_number))
                })?
                .trim();

            if section_name.is_empty() {
                return Err(Error::ConfigParse(format!(
                    "line {}: empty section name",
                    line_number
                )));
            }

            if let Some(section) = current.take() {
                entries.push(section.finish()?);
            }

            if entries.iter().any(|e| e.name == section_name) {
                return Err(Error::ConfigParse(format!(
                    "line {}: duplicate section `{}`",
                    line_number, section_name
                )));
            }

            current = Some(RawSection::new(section_name));
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(Error::ConfigParse(format!(
                "line {}: expected `key = value`, got `{}`",
                line_number, line
            )));
        };

        let section = current.as_mut().ok_or_else(|| {
            Error::ConfigParse(format!(
                "line {}: key `{}` outside of any section",
                line_number,
                key.trim()
            ))
        })?;

        section.set(key.trim(), value.trim(), line_number)?;
    }

    if let Some(section) = current.take() {
        entries.push(section.finish()?);
    }

    Ok(entries)
}

/// Section under construction while scanning the file
struct RawSection {
    name: String,
    url: Option<String>,
    upstream: Option<String>,
    branches: Option<String>,
}

impl RawSection {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            url: None,
            upstream: None,
            branches: None,
        }
    }

    fn set(&mut self, key: &str, value: &str, line_number: usize) -> Result<(), Error> {
        let slot = match key {
            "url" => &mut self.url,
            "upstream" => &mut self.upstream,
            "branches" => &mut self.branches,
            other => {
                return Err(Error::ConfigParse(format!(
                    "line {}: unknown key `{}` in section `{}`",
                    line_number, other, self.name
                )))
            }
        };

        if slot.is_some() {
            return Err(Error::ConfigParse(format!(
                "line {}: duplicate key `{}` in section `{}`",
                line_number, key, self.name
            )));
        }

        *slot = Some(value.to_string());
        Ok(())
    }

    fn finish(self) -> Result<RepositoryEntry, Error> {
        let section = self.name.clone();
        let require = |value: Option<String>, key: &str| {
            value.ok_or_else(|| {
                Error::ConfigParse(format!("section `{}`: missing key `{}`", section, key))
            })
        };

        let url = require(self.url, "url")?;
        let upstream = require(self.upstream, "upstream")?;
        let branches = require(self.branches, "branches")?;

        let fork = parse_github_url(&url).ok_or_else(|| {
            Error::ConfigParse(format!(
                "section `{}`: `{}` is not a github.com repository URL",
                self.name, url
            ))
        })?;

        let upstream = parse_github_url(&upstream).ok_or_else(|| {
            Error::ConfigParse(format!(
                "section `{}`: `{}` is not a github.com repository URL",
                self.name, upstream
            ))
        })?;

        let mappings = parse_branch_mappings(&branches, &self.name)?;

        Ok(RepositoryEntry {
            name: self.name,
            fork,
            upstream,
            mappings,
        })
    }
}

/// Parse a comma-separated list of `upstream->fork` branch pairs
fn parse_branch_mappings(value: &str, section: &str) -> Result<Vec<BranchMapping>, Error> {
    let mut mappings = Vec::new();

    // A trailing comma is tolerated, matching the original format
    for pair in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let caps = branch_pair_regex().captures(pair).ok_or_else(|| {
            Error::ConfigParse(format!(
                "section `{}`: invalid branch pair `{}`, expected `from->to`",
                section, pair
            ))
        })?;

        mappings.push(BranchMapping {
            upstream_branch: caps[1].trim().to_string(),
            fork_branch: caps[2].trim().to_string(),
        });
    }

    if mappings.is_empty() {
        return Err(Error::ConfigParse(format!(
            "section `{}`: `branches` lists no branch pairs",
            section
        )));
    }

    Ok(mappings)
}
