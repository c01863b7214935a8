//! Discovery strategies. Each one is a pure function from the repository's
//! file list to candidate artifacts; the locator folds their union.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use schemagate_core::models::artifact::{ArtifactKind, MigrationConvention};
use walkdir::{DirEntry, WalkDir};

use crate::extractor::has_section_markers;

static PAIR_UP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(\d+)_(.+)\.up\.sql$").unwrap());
static PAIR_DOWN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.down\.sql$").unwrap());
static FLYWAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^V(\d+(?:[._]\d+)*)__(.+)\.sql$").unwrap());
static FLYWAY_UNDO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^U(\d+(?:[._]\d+)*)__(.+)\.sql$").unwrap());
static LEADING_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)").unwrap());
static CHANGELOG_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)changelog.*\.(xml|ya?ml|json|sql)$").unwrap());
static XML_INCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<include\s[^>]*\bfile\s*=\s*"([^"]+)""#).unwrap());
static XML_INCLUDE_ALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<includeAll\s[^>]*\bpath\s*=\s*"([^"]+)""#).unwrap());
static YAML_INCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*-?\s*file:\s*["']?([^"'\s]+)"#).unwrap());
static YAML_INCLUDE_ALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)includeAll:\s*\n\s*-?\s*path:\s*["']?([^"'\s]+)"#).unwrap()
});
static JSON_INCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""file"\s*:\s*"([^"]+)""#).unwrap());

pub const SCHEMA_DUMP_PATTERNS: [&str; 6] = [
    "**/schema.sql",
    "**/*schema*.sql",
    "**/structure.sql",
    "**/*dump*.sql",
    "docs/db/**/*.sql",
    "db/schema/**/*.sql",
];

const SKIPPED_DIRS: [&str; 3] = ["target", "node_modules", "vendor"];

/// Every regular file under the root, relative and sorted.
#[derive(Debug, Default)]
pub struct RepoFiles {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
    index: HashSet<PathBuf>,
}

impl RepoFiles {
    pub fn scan(root: &Path) -> Self {
        let files: Vec<PathBuf> = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped(e))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.path().strip_prefix(root).ok().map(Path::to_path_buf))
            .collect();
        debug!("Scanned {} files under {}", files.len(), root.display());
        Self::from_files(root, files)
    }

    pub fn from_files(root: &Path, mut files: Vec<PathBuf>) -> Self {
        files.sort();
        let index = files.iter().cloned().collect();
        Self {
            root: root.to_path_buf(),
            files,
            index,
        }
    }

    pub fn contains(&self, relative: &Path) -> bool {
        self.index.contains(relative)
    }

    fn read(&self, relative: &Path) -> Option<String> {
        match fs::read(self.root.join(relative)) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                warn!("Skipping unreadable {}: {}", relative.display(), e);
                None
            }
        }
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.file_type().is_dir() && (name.starts_with('.') || SKIPPED_DIRS.contains(&&*name))
}

/// A path a strategy claims, before its contents are read.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub convention: Option<MigrationConvention>,
    pub rollback: Option<PathBuf>,
}

impl Candidate {
    fn new(path: PathBuf, kind: ArtifactKind) -> Self {
        Self {
            path,
            kind,
            convention: None,
            rollback: None,
        }
    }

    fn migration(path: PathBuf, convention: MigrationConvention, rollback: Option<PathBuf>) -> Self {
        Self {
            path,
            kind: ArtifactKind::Migration,
            convention: Some(convention),
            rollback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStrategy {
    TimestampedPairs,
    VersionedScripts,
    SectionedScripts,
    Changelog,
    OrmSchema,
    SchemaDump,
}

impl DiscoveryStrategy {
    /// Declared order; earlier strategies win when two claim the same file.
    pub const ALL: [DiscoveryStrategy; 6] = [
        DiscoveryStrategy::TimestampedPairs,
        DiscoveryStrategy::VersionedScripts,
        DiscoveryStrategy::SectionedScripts,
        DiscoveryStrategy::Changelog,
        DiscoveryStrategy::OrmSchema,
        DiscoveryStrategy::SchemaDump,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DiscoveryStrategy::TimestampedPairs => "timestamped-pairs",
            DiscoveryStrategy::VersionedScripts => "versioned-scripts",
            DiscoveryStrategy::SectionedScripts => "sectioned-scripts",
            DiscoveryStrategy::Changelog => "changelog",
            DiscoveryStrategy::OrmSchema => "orm-schema",
            DiscoveryStrategy::SchemaDump => "schema-dump",
        }
    }

    /// Human-readable locations, listed when discovery comes back empty.
    pub fn searched(&self) -> Vec<String> {
        match self {
            DiscoveryStrategy::TimestampedPairs => {
                vec!["**/<version>_<name>.up.sql (with .down.sql)".to_string()]
            }
            DiscoveryStrategy::VersionedScripts => {
                vec!["**/V<version>__<description>.sql (with U<version>__*.sql)".to_string()]
            }
            DiscoveryStrategy::SectionedScripts => {
                vec!["**/*.sql with dbmate, goose or sql-migrate up/down markers".to_string()]
            }
            DiscoveryStrategy::Changelog => {
                vec!["**/*changelog*.{xml,yaml,yml,json,sql} (Liquibase)".to_string()]
            }
            DiscoveryStrategy::OrmSchema => {
                vec!["**/schema.prisma".to_string(), "**/db/schema.rb".to_string()]
            }
            DiscoveryStrategy::SchemaDump => {
                SCHEMA_DUMP_PATTERNS.iter().map(|p| p.to_string()).collect()
            }
        }
    }

    pub fn discover(&self, files: &RepoFiles) -> Vec<Candidate> {
        let found = match self {
            DiscoveryStrategy::TimestampedPairs => timestamped_pairs(files),
            DiscoveryStrategy::VersionedScripts => versioned_scripts(files),
            DiscoveryStrategy::SectionedScripts => sectioned_scripts(files),
            DiscoveryStrategy::Changelog => changelog(files),
            DiscoveryStrategy::OrmSchema => orm_schema(files),
            DiscoveryStrategy::SchemaDump => schema_dump(files),
        };
        debug!("Strategy {} found {} candidates", self.name(), found.len());
        found
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Down and undo files are only ever the rollback side of a migration.
pub fn is_rollback_file(path: &Path) -> bool {
    let name = file_name(path);
    PAIR_DOWN.is_match(&name) || FLYWAY_UNDO.is_match(&name)
}

fn is_sql(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
}

/// Numeric version components; `2_1` sorts before `10`.
fn version_key(version: &str) -> Vec<u64> {
    version
        .split(['.', '_'])
        .map(|part| part.parse().unwrap_or(u64::MAX))
        .collect()
}

fn sort_by_version(candidates: &mut [(Vec<u64>, Candidate)]) {
    candidates.sort_by(|(a, ca), (b, cb)| a.cmp(b).then_with(|| ca.path.cmp(&cb.path)));
}

fn timestamped_pairs(files: &RepoFiles) -> Vec<Candidate> {
    let mut found = Vec::new();
    for path in &files.files {
        let name = file_name(path);
        let Some(caps) = PAIR_UP.captures(&name) else {
            continue;
        };
        let stem = &name[..name.len() - ".up.sql".len()];
        let down = path.with_file_name(format!("{}.down.sql", stem));
        let rollback = files.contains(&down).then_some(down);
        found.push((
            version_key(&caps[1]),
            Candidate::migration(path.clone(), MigrationConvention::TimestampedPair, rollback),
        ));
    }
    sort_by_version(&mut found);
    found.into_iter().map(|(_, c)| c).collect()
}

fn versioned_scripts(files: &RepoFiles) -> Vec<Candidate> {
    let mut found = Vec::new();
    for path in &files.files {
        let name = file_name(path);
        let Some(caps) = FLYWAY.captures(&name) else {
            continue;
        };
        let version = caps[1].to_string();
        let key = version_key(&version);
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        let rollback = files
            .files
            .iter()
            .filter(|p| p.parent().unwrap_or_else(|| Path::new("")) == dir)
            .find(|p| {
                FLYWAY_UNDO
                    .captures(&file_name(p))
                    .is_some_and(|u| version_key(&u[1]) == key)
            })
            .cloned();
        found.push((
            key,
            Candidate::migration(path.clone(), MigrationConvention::Versioned, rollback),
        ));
    }
    sort_by_version(&mut found);
    found.into_iter().map(|(_, c)| c).collect()
}

fn sectioned_scripts(files: &RepoFiles) -> Vec<Candidate> {
    let mut found = Vec::new();
    for path in files.files.iter().filter(|p| is_sql(p) && !is_rollback_file(p)) {
        let name = file_name(path);
        if PAIR_UP.is_match(&name) || FLYWAY.is_match(&name) {
            continue;
        }
        let Some(text) = files.read(path) else {
            continue;
        };
        if !has_section_markers(&text) {
            continue;
        }
        let key = LEADING_VERSION
            .captures(&name)
            .map(|c| version_key(&c[1]))
            .unwrap_or_else(|| vec![u64::MAX]);
        found.push((
            key,
            Candidate::migration(path.clone(), MigrationConvention::Sectioned, None),
        ));
    }
    sort_by_version(&mut found);
    found.into_iter().map(|(_, c)| c).collect()
}

fn changelog(files: &RepoFiles) -> Vec<Candidate> {
    let mut found = Vec::new();
    let mut visited = HashSet::new();
    let masters: Vec<&PathBuf> = files
        .files
        .iter()
        .filter(|p| CHANGELOG_NAME.is_match(&file_name(p)))
        .collect();

    let mut queue: VecDeque<PathBuf> = masters.into_iter().cloned().collect();
    while let Some(changelog) = queue.pop_front() {
        if !visited.insert(changelog.clone()) {
            continue;
        }
        let Some(text) = files.read(&changelog) else {
            continue;
        };
        if is_sql(&changelog) {
            if is_formatted_sql(&text) {
                found.push(Candidate::migration(changelog, MigrationConvention::Changelog, None));
            }
            continue;
        }
        let dir = changelog.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let mut nested = Vec::new();
        for include in includes(&text) {
            let Some(resolved) = resolve(files, &dir, &include) else {
                debug!("{} includes missing {}", changelog.display(), include);
                continue;
            };
            if is_sql(&resolved) {
                if visited.insert(resolved.clone()) {
                    found.push(Candidate::migration(resolved, MigrationConvention::Changelog, None));
                }
            } else {
                nested.push(resolved);
            }
        }
        for directory in include_all(&text) {
            let base = normalize(&dir.join(directory.trim_start_matches("classpath:")));
            let root_base = normalize(Path::new(directory.trim_start_matches("classpath:")));
            for path in &files.files {
                let parent = path.parent().unwrap_or_else(|| Path::new(""));
                if is_sql(path)
                    && (parent == base || parent == root_base)
                    && visited.insert(path.clone())
                {
                    found.push(Candidate::migration(path.clone(), MigrationConvention::Changelog, None));
                }
            }
        }
        // Nested changelogs run where they are included.
        for child in nested.into_iter().rev() {
            queue.push_front(child);
        }
    }
    found
}

fn is_formatted_sql(text: &str) -> bool {
    text.lines()
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| l.trim().to_ascii_lowercase().starts_with("--liquibase formatted sql"))
}

fn includes(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for re in [&*XML_INCLUDE, &*YAML_INCLUDE, &*JSON_INCLUDE] {
        out.extend(re.captures_iter(text).map(|c| c[1].to_string()));
    }
    out
}

fn include_all(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for re in [&*XML_INCLUDE_ALL, &*YAML_INCLUDE_ALL] {
        out.extend(re.captures_iter(text).map(|c| c[1].trim_end_matches('/').to_string()));
    }
    out
}

/// Liquibase resolves includes against the changelog directory, then the
/// search path (here the repository root).
fn resolve(files: &RepoFiles, dir: &Path, include: &str) -> Option<PathBuf> {
    let include = include.trim_start_matches("classpath:");
    [normalize(&dir.join(include)), normalize(Path::new(include))]
        .into_iter()
        .find(|candidate| files.contains(candidate))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

fn orm_schema(files: &RepoFiles) -> Vec<Candidate> {
    files
        .files
        .iter()
        .filter(|p| file_name(p) == "schema.prisma" || p.ends_with("db/schema.rb"))
        .map(|p| Candidate::new(p.clone(), ArtifactKind::OrmSchema))
        .collect()
}

fn schema_dump(files: &RepoFiles) -> Vec<Candidate> {
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    // `**/` must also match zero directories.
    let patterns: Vec<Pattern> = SCHEMA_DUMP_PATTERNS
        .iter()
        .flat_map(|p| [p.to_string(), p.replace("**/", "")])
        .filter_map(|p| match Pattern::new(&p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!("Ignoring invalid pattern {}: {}", p, e);
                None
            }
        })
        .collect();

    files
        .files
        .iter()
        .filter(|p| !is_rollback_file(p))
        .filter(|p| {
            let unix = p.to_string_lossy().replace('\\', "/");
            patterns.iter().any(|pattern| pattern.matches_with(&unix, options))
        })
        .map(|p| Candidate::new(p.clone(), ArtifactKind::SchemaDump))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn repo(files: &[(&str, &str)]) -> (tempfile::TempDir, RepoFiles) {
        let dir = tempdir().unwrap();
        for (path, text) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, text).unwrap();
        }
        let scanned = RepoFiles::scan(dir.path());
        (dir, scanned)
    }

    fn paths(candidates: &[Candidate]) -> Vec<String> {
        candidates
            .iter()
            .map(|c| c.path.to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn scan_skips_hidden_and_build_directories() {
        let (_dir, files) = repo(&[
            ("db/schema.sql", ""),
            (".git/schema.sql", ""),
            ("target/debug/schema.sql", ""),
            ("web/node_modules/pkg/schema.sql", ""),
        ]);
        assert_eq!(files.files, vec![PathBuf::from("db/schema.sql")]);
    }

    #[test]
    fn pairs_sort_numerically_and_resolve_down_files() {
        let (_dir, files) = repo(&[
            ("migrations/10_b.up.sql", ""),
            ("migrations/10_b.down.sql", ""),
            ("migrations/9_a.up.sql", ""),
        ]);
        let found = DiscoveryStrategy::TimestampedPairs.discover(&files);
        assert_eq!(paths(&found), vec!["migrations/9_a.up.sql", "migrations/10_b.up.sql"]);
        assert_eq!(found[0].rollback, None);
        assert_eq!(found[1].rollback, Some(PathBuf::from("migrations/10_b.down.sql")));
    }

    #[test]
    fn flyway_versions_and_undo() {
        let (_dir, files) = repo(&[
            ("sql/V1_10__later.sql", ""),
            ("sql/V1_2__earlier.sql", ""),
            ("sql/U1_2__earlier.sql", ""),
        ]);
        let found = DiscoveryStrategy::VersionedScripts.discover(&files);
        assert_eq!(paths(&found), vec!["sql/V1_2__earlier.sql", "sql/V1_10__later.sql"]);
        assert_eq!(found[0].rollback, Some(PathBuf::from("sql/U1_2__earlier.sql")));
        assert!(found[1].rollback.is_none());
    }

    #[test]
    fn sectioned_scripts_need_markers() {
        let (_dir, files) = repo(&[
            ("db/migrations/20240102_b.sql", "-- +goose Up\nCREATE TABLE b (id INT);\n"),
            ("db/migrations/20240101_a.sql", "-- migrate:up\nCREATE TABLE a (id INT);\n"),
            ("scripts/report.sql", "SELECT 1;"),
        ]);
        let found = DiscoveryStrategy::SectionedScripts.discover(&files);
        assert_eq!(
            paths(&found),
            vec!["db/migrations/20240101_a.sql", "db/migrations/20240102_b.sql"]
        );
    }

    #[test]
    fn changelog_follows_includes_in_order() {
        let (_dir, files) = repo(&[
            (
                "db/changelog/db.changelog-master.xml",
                r#"<databaseChangeLog>
  <include file="changes/002-orders.sql" relativeToChangelogFile="true"/>
  <include file="db/changelog/changes/001-users.sql"/>
  <include file="changes/missing.sql" relativeToChangelogFile="true"/>
</databaseChangeLog>"#,
            ),
            ("db/changelog/changes/001-users.sql", "--liquibase formatted sql\n"),
            ("db/changelog/changes/002-orders.sql", "--liquibase formatted sql\n"),
        ]);
        let found = DiscoveryStrategy::Changelog.discover(&files);
        assert_eq!(
            paths(&found),
            vec![
                "db/changelog/changes/002-orders.sql",
                "db/changelog/changes/001-users.sql"
            ]
        );
    }

    #[test]
    fn schema_dump_patterns() {
        let (_dir, files) = repo(&[
            ("schema.sql", ""),
            ("db/app_schema.sql", ""),
            ("db/structure.sql", ""),
            ("backups/nightly_dump.sql", ""),
            ("docs/db/tables/users.sql", ""),
            ("db/schema/orders.sql", ""),
            ("db/schema/orders.down.sql", ""),
            ("src/queries.sql", ""),
        ]);
        let found = DiscoveryStrategy::SchemaDump.discover(&files);
        assert_eq!(
            paths(&found),
            vec![
                "backups/nightly_dump.sql",
                "db/app_schema.sql",
                "db/schema/orders.sql",
                "db/structure.sql",
                "docs/db/tables/users.sql",
                "schema.sql",
            ]
        );
    }

    #[test]
    fn orm_schema_files() {
        let (_dir, files) = repo(&[
            ("prisma/schema.prisma", ""),
            ("db/schema.rb", ""),
            ("lib/schema.rb", ""),
        ]);
        let found = DiscoveryStrategy::OrmSchema.discover(&files);
        assert_eq!(paths(&found), vec!["db/schema.rb", "prisma/schema.prisma"]);
    }
}
