//! Remote Maven repository access: coordinate resolution, POM fetching
//! with parent-chain merging, recursive dependency tree resolution, and
//! artifact download through the blob cache.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_recursion::async_recursion;
use indexmap::IndexMap;
use pomdep_core::coord::Coord;
use pomdep_core::version_db::VersionDb;
use pomdep_resolver::tree::ScopeFilter;
use pomdep_resolver::version;
use pomdep_util::errors::PomdepResult;
use reqwest::Client;

use crate::cache::BlobCache;
use crate::download;
use crate::metadata;
use crate::parser;
use crate::pom::Pom;

/// Canonical Maven Central repository.
pub const MAVEN_CENTRAL_URL: &str = "https://repo.maven.apache.org/maven2/";

/// Cache directory used when the caller does not pick one.
pub const DEFAULT_CACHE_DIR: &str = "_maven-cache";

/// A remote repository with its blob cache and version pinning database.
#[derive(Debug)]
pub struct Repository {
    url: String,
    cache: BlobCache,
    version_db: VersionDb,
    client: Client,
    jdk_version: Option<String>,
    memo_warnings: HashSet<String>,
    outdated_warnings: HashSet<String>,
}

impl Repository {
    /// Open a repository at `url`, caching fetches under `cache_dir`
    /// (created if missing).
    pub fn new(url: &str, cache_dir: &Path) -> PomdepResult<Self> {
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            cache: BlobCache::new(cache_dir)?,
            version_db: VersionDb::new(),
            client: download::build_client()?,
            jdk_version: None,
            memo_warnings: HashSet::new(),
            outdated_warnings: HashSet::new(),
        })
    }

    /// Maven Central with the default cache directory.
    pub fn maven_central() -> PomdepResult<Self> {
        Self::new(MAVEN_CENTRAL_URL, Path::new(DEFAULT_CACHE_DIR))
    }

    /// Seed the version pinning database.
    pub fn with_version_db(mut self, version_db: VersionDb) -> Self {
        self.version_db = version_db;
        self
    }

    /// JDK version used for profile activation during resolves.
    pub fn with_jdk_version(mut self, jdk_version: &str) -> Self {
        self.jdk_version = Some(jdk_version.to_string());
        self
    }

    pub fn version_db(&self) -> &VersionDb {
        &self.version_db
    }

    pub fn version_db_mut(&mut self) -> &mut VersionDb {
        &mut self.version_db
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Remove and recreate the cache directory. Not thread safe.
    pub fn clean_cache(&self) -> PomdepResult<()> {
        self.cache.clear()
    }

    /// `<repo>/<group-as-path>/<artifact>/maven-metadata.xml`
    pub fn metadata_url_for(&self, coord: &Coord) -> String {
        format!(
            "{}/{}/{}/maven-metadata.xml",
            self.url,
            coord.group.replace('.', "/"),
            coord.artifact
        )
    }

    /// `<repo>/<group-as-path>/<artifact>/<version>/<artifact>-<version>`
    fn artifact_base(&self, coord: &Coord) -> String {
        format!(
            "{}/{}/{}/{}/{}-{}",
            self.url,
            coord.group.replace('.', "/"),
            coord.artifact,
            coord.version,
            coord.artifact,
            coord.version
        )
    }

    pub fn pom_url_for(&self, coord: &Coord) -> String {
        format!("{}.pom", self.artifact_base(coord))
    }

    pub fn jar_url_for(&self, coord: &Coord) -> String {
        format!("{}.jar", self.artifact_base(coord))
    }

    /// Complete a coordinate with a version: keep an explicit one, else
    /// consult the version database, else take `versioning.release` from
    /// the repository metadata. `None` when no version can be found.
    pub async fn resolve_coord(&mut self, coord: &Coord) -> PomdepResult<Option<Coord>> {
        if !coord.version.is_empty() {
            return Ok(Some(coord.clone()));
        }

        if let Some(pinned) = self.version_db.find(coord) {
            return Ok(Some(pinned));
        }

        let url = self.metadata_url_for(coord);
        let Some(xml) = self.fetch_cached_text(&url).await? else {
            return Ok(None);
        };
        let meta = metadata::parse_metadata(&xml)?;

        match meta.release {
            Some(release) if !release.is_empty() => {
                let mut resolved = coord.clone();
                resolved.version = release;
                Ok(Some(resolved))
            }
            _ => Ok(None),
        }
    }

    /// Fetch and parse the POM for one coordinate. `None` when the
    /// version cannot be resolved or the document is missing.
    pub async fn fetch_one(&mut self, coord: &Coord) -> PomdepResult<Option<Pom>> {
        let Some(coord) = self.resolve_coord(coord).await? else {
            return Ok(None);
        };
        let url = self.pom_url_for(&coord);
        let Some(xml) = self.fetch_cached_text(&url).await? else {
            return Ok(None);
        };
        parser::parse_pom(&xml).map(Some)
    }

    /// Fetch a POM and merge its whole parent chain into it. The walk
    /// stops at the first missing ancestor.
    pub async fn fetch_with_ancestors(&mut self, coord: &Coord) -> PomdepResult<Option<Pom>> {
        let Some(mut pom) = self.fetch_one(coord).await? else {
            return Ok(None);
        };

        let mut parent_coord = pom.parent.clone();
        while !parent_coord.is_empty() {
            let Some(ancestor) = self.fetch_one(&parent_coord).await? else {
                break;
            };
            pom.merge(&ancestor);
            parent_coord = ancestor.parent.clone();
        }

        Ok(Some(pom))
    }

    /// Fetch a coordinate and its transitive dependencies for `scope`,
    /// returning the fully resolved model.
    pub async fn fetch_resolved_tree(
        &mut self,
        coord: &Coord,
        scope: &ScopeFilter,
    ) -> PomdepResult<Option<Pom>> {
        let Some(coord) = self.resolve_coord(coord).await? else {
            return Ok(None);
        };
        let mut downloaded = IndexMap::new();
        self.fetch_tree_deps(&coord, scope, &mut downloaded, &IndexMap::new())
            .await
    }

    /// Recursive worker for [`fetch_resolved_tree`](Self::fetch_resolved_tree).
    ///
    /// `downloaded` memoizes resolved models per `group:artifact` so
    /// aliased branches and cycles terminate; `exclusions` maps excluded
    /// names to their patterns and is copied per branch.
    #[async_recursion]
    async fn fetch_tree_deps(
        &mut self,
        coord: &Coord,
        scope: &ScopeFilter,
        downloaded: &mut IndexMap<String, Pom>,
        exclusions: &IndexMap<String, Coord>,
    ) -> PomdepResult<Option<Pom>> {
        if let Some(memoized) = downloaded.get(&coord.name()) {
            if memoized.coord.id() != coord.id()
                && version::compare(&memoized.coord.version, &coord.version) == Ordering::Less
                && self.memo_warnings.insert(coord.name())
            {
                tracing::warn!(
                    "expecting same coordinate for package '{}', already resolved as '{}'",
                    coord.id(),
                    memoized.coord.id()
                );
            }
            return Ok(Some(memoized.clone()));
        }

        let jdk = self.jdk_version.clone();

        let Some(mut pom) = self.fetch_with_ancestors(coord).await? else {
            return Ok(None);
        };

        // Resolving consumes exclusion lists, so the declared exclusions
        // are captured first: the fetch loop needs them to skip excluded
        // coordinates, and the final resolve needs them back to prune
        // spliced-in grandchildren.
        let declared_exclusions: IndexMap<String, Vec<Coord>> = pom
            .deps
            .root
            .deps
            .iter()
            .filter(|dep| !dep.exclusions.is_empty())
            .map(|dep| (dep.coord.name(), dep.exclusions.clone()))
            .collect();

        pom.resolve(&ScopeFilter::Any, true, jdk.as_deref())?;

        let mut children: IndexMap<String, Pom> = IndexMap::new();
        let flattened: Vec<_> = pom.deps.flatten(true).into_iter().cloned().collect();
        for dep in &flattened {
            if !scope.matches(&dep.coord.scope) {
                tracing::debug!("skipping {} ({})", dep.coord.id(), dep.coord.scope);
                continue;
            }

            if let Some(pattern) = exclusions.get(&dep.coord.name()) {
                if dep.coord.is_contained(pattern) {
                    tracing::debug!("excluding {}", dep.coord.id());
                    continue;
                }
            }

            let mut child_exclusions = exclusions.clone();
            let declared = declared_exclusions
                .get(&dep.coord.name())
                .into_iter()
                .flatten()
                .chain(&dep.exclusions);
            for pattern in declared {
                child_exclusions.insert(pattern.name(), pattern.clone());
            }

            if let Some(mut child) = self
                .fetch_tree_deps(&dep.coord, scope, downloaded, &child_exclusions)
                .await?
            {
                child.resolve(&ScopeFilter::Any, true, jdk.as_deref())?;
                children.insert(dep.coord.id(), child);
            }
        }

        // Splice each resolved child's subtree into the matching
        // top-level dependency node, and restore the declared exclusions
        // so the final resolve can prune the spliced subtree.
        for dep in &mut pom.deps.root.deps {
            if let Some(child) = children.get(&dep.coord.id()) {
                let subtree = child.deps.clone();
                dep.deps.extend(subtree.root.deps);
                dep.exclusions.extend(subtree.root.exclusions);
            }
            if let Some(declared) = declared_exclusions.get(&dep.coord.name()) {
                dep.exclusions.extend(declared.iter().cloned());
            }
        }

        downloaded.insert(coord.name(), pom.clone());
        pom.resolve(scope, true, jdk.as_deref())?;
        Ok(Some(pom))
    }

    /// Resolve the tree for `coord` and download every surviving
    /// artifact's JAR through the cache. Returns the local file paths.
    pub async fn download_artifacts(
        &mut self,
        coord: &Coord,
        scope: &ScopeFilter,
    ) -> PomdepResult<Vec<PathBuf>> {
        let Some(pom) = self.fetch_resolved_tree(coord, scope).await? else {
            return Ok(Vec::new());
        };

        let mut paths = Vec::new();
        for dep_coord in pom.deps.flatten_coords(true) {
            let pinned = self.version_db.find_or_register(&dep_coord);
            if version::compare(&pinned.version, &dep_coord.version) == Ordering::Less
                && self.outdated_warnings.insert(pinned.name())
            {
                tracing::warn!(
                    "registered version '{}' is older than resolved '{}'",
                    pinned.id(),
                    dep_coord.id()
                );
            }

            if let Some(path) = self.download_jar(&pinned).await? {
                paths.push(path);
            }
        }

        Ok(paths)
    }

    async fn download_jar(&self, coord: &Coord) -> PomdepResult<Option<PathBuf>> {
        let url = self.jar_url_for(coord);
        if self.cache.contains(&url) {
            tracing::debug!("cache hit for {url}");
            return Ok(Some(self.cache.path_for(&url)));
        }

        let Some(bytes) = download::fetch_artifact(&self.client, &url, &coord.id()).await? else {
            tracing::warn!("artifact not found: {url}");
            return Ok(None);
        };
        Ok(Some(self.cache.put(&url, &bytes)?))
    }

    /// Fetch a text document through the blob cache; only successful
    /// fetches are cached.
    async fn fetch_cached_text(&self, url: &str) -> PomdepResult<Option<String>> {
        if let Some(bytes) = self.cache.get(url) {
            tracing::debug!("cache hit for {url}");
            return Ok(Some(String::from_utf8_lossy(&bytes).to_string()));
        }

        match download::fetch_text(&self.client, url).await? {
            Some(text) => {
                self.cache.put(url, text.as_bytes())?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }
}
