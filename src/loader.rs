//! Artifact resolution, retrieval and caching for [`prepare`].
//!
//! Resolves the current platform to one artifact location, retrieves the
//! binary when it is remote, caches it under a content-addressed name, and
//! opens a [`Library`] on the resulting local path. This is the only
//! component performing I/O beyond the bridge call itself; the retrieval
//! round trip is the sole blocking step and completes before the handle
//! exists, so callers never observe a half-open handle.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::bridge::NativeBridge;
use crate::error::{Error, Result};
use crate::library::Library;
use crate::types::MethodTable;

/// Environment override: redirects retrieval to a fixed location and
/// forces [`CachePolicy::Bypass`].
pub const ARTIFACT_URL_ENV: &str = "DYBIND_ARTIFACT_URL";

/// Platforms with a known artifact naming convention.
///
/// The enumeration is closed; resolution over it is total, and anything
/// else fails with [`Error::UnsupportedPlatform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Linux (`lib*.so`)
    Linux,
    /// macOS (`lib*.dylib`)
    MacOs,
    /// Windows (`*.dll`)
    Windows,
}

impl Platform {
    /// Resolve the running platform.
    pub fn current() -> Result<Self> {
        match std::env::consts::OS {
            "linux" => Ok(Self::Linux),
            "macos" => Ok(Self::MacOs),
            "windows" => Ok(Self::Windows),
            other => Err(Error::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Platform name as used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Windows => "windows",
        }
    }

    /// Shared-library filename extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Linux => "so",
            Self::MacOs => "dylib",
            Self::Windows => "dll",
        }
    }

    /// Conventional filename prefix.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Linux | Self::MacOs => "lib",
            Self::Windows => "",
        }
    }

    /// Artifact filename for `name` under this platform's conventions.
    pub fn filename(&self, name: &str, prefixed: bool) -> String {
        let prefix = if prefixed { self.prefix() } else { "" };
        format!("{prefix}{name}.{}", self.extension())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a retrieved artifact is kept on disk for reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Persist the artifact and reuse it on later prepares.
    #[default]
    Store,
    /// Always re-fetch.
    Bypass,
}

/// Where the artifact for each platform lives.
#[derive(Debug, Clone)]
pub enum ArtifactLocation {
    /// Derived location: `{base}/{[lib]name.ext}` per platform.
    Base {
        /// Library name without prefix or extension.
        name: String,
        /// Base URL or directory.
        base: String,
        /// Apply the platform's `lib` filename prefix.
        prefixed: bool,
    },
    /// Explicit per-platform location map.
    PerPlatform(HashMap<Platform, String>),
}

/// Loader options for [`prepare`].
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    /// Artifact location strategy.
    pub location: ArtifactLocation,
    /// Cache policy for remote artifacts.
    pub policy: CachePolicy,
    /// Cache directory; the system temp dir when unset.
    pub cache_dir: Option<PathBuf>,
}

impl PrepareOptions {
    /// Derived location under `base`, with the platform's `lib` prefix.
    pub fn from_base(name: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            location: ArtifactLocation::Base {
                name: name.into(),
                base: base.into(),
                prefixed: true,
            },
            policy: CachePolicy::default(),
            cache_dir: None,
        }
    }

    /// Explicit per-platform locations.
    pub fn from_urls(urls: HashMap<Platform, String>) -> Self {
        Self {
            location: ArtifactLocation::PerPlatform(urls),
            policy: CachePolicy::default(),
            cache_dir: None,
        }
    }

    /// Disable the `lib` filename prefix for derived locations.
    pub fn unprefixed(mut self) -> Self {
        if let ArtifactLocation::Base { prefixed, .. } = &mut self.location {
            *prefixed = false;
        }
        self
    }

    /// Set the cache policy.
    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the cache directory.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }
}

/// Resolve, retrieve and open the artifact for the current platform.
///
/// The [`ARTIFACT_URL_ENV`] environment variable overrides the resolved
/// location and forces [`CachePolicy::Bypass`].
pub fn prepare(
    bridge: Arc<dyn NativeBridge>,
    options: &PrepareOptions,
    methods: MethodTable,
) -> Result<Library> {
    let platform = Platform::current()?;
    let (url, policy) = match std::env::var(ARTIFACT_URL_ENV) {
        Ok(url) => (url, CachePolicy::Bypass),
        Err(_) => (
            resolve_location(&options.location, platform)?,
            options.policy,
        ),
    };
    let path = fetch(&url, policy, options.cache_dir.as_deref())?;
    Library::open(bridge, &path.to_string_lossy(), methods)
}

fn resolve_location(location: &ArtifactLocation, platform: Platform) -> Result<String> {
    match location {
        ArtifactLocation::Base {
            name,
            base,
            prefixed,
        } => Ok(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            platform.filename(name, *prefixed)
        )),
        ArtifactLocation::PerPlatform(urls) => urls
            .get(&platform)
            .cloned()
            .ok_or_else(|| Error::UnsupportedPlatform(platform.name().to_string())),
    }
}

/// Retrieve `url` to a local file, honoring the cache policy. Local paths
/// and `file:` URLs are used in place without caching.
fn fetch(url: &str, policy: CachePolicy, cache_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(rest) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(rest));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Ok(PathBuf::from(url));
    }

    let dir = cache_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(default_cache_dir);
    fs::create_dir_all(&dir)?;
    let path = dir.join(cache_key(url));

    if policy == CachePolicy::Store && path.exists() {
        return Ok(path);
    }

    let response = ureq::get(url).call().map_err(|e| Error::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let mut bytes = Vec::new();
    response.into_reader().read_to_end(&mut bytes)?;
    fs::write(&path, &bytes)?;
    Ok(path)
}

/// Cache file name: hex-encoded SHA-256 of the source URL, keeping the
/// artifact's extension.
fn cache_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let ext = Path::new(url)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    format!("{}.{}", hex::encode(digest), ext)
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("dybind")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_conventions() {
        assert_eq!(Platform::Linux.filename("demo", true), "libdemo.so");
        assert_eq!(Platform::MacOs.filename("demo", true), "libdemo.dylib");
        assert_eq!(Platform::Windows.filename("demo", true), "demo.dll");
        assert_eq!(Platform::Linux.filename("demo", false), "demo.so");
    }

    #[test]
    fn test_resolve_derived_location() {
        let location = ArtifactLocation::Base {
            name: "demo".to_string(),
            base: "https://example.com/releases/".to_string(),
            prefixed: true,
        };
        assert_eq!(
            resolve_location(&location, Platform::Linux).unwrap(),
            "https://example.com/releases/libdemo.so"
        );
        assert_eq!(
            resolve_location(&location, Platform::Windows).unwrap(),
            "https://example.com/releases/demo.dll"
        );
    }

    #[test]
    fn test_explicit_map_miss_is_unsupported_platform() {
        let location = ArtifactLocation::PerPlatform(HashMap::new());
        let err = resolve_location(&location, Platform::Linux).unwrap_err();
        assert!(matches!(err, Error::UnsupportedPlatform(os) if os == "linux"));
    }

    #[test]
    fn test_cache_key_is_stable_and_keeps_extension() {
        let a = cache_key("https://example.com/libdemo.so");
        let b = cache_key("https://example.com/libdemo.so");
        let c = cache_key("https://example.com/other/libdemo.so");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.ends_with(".so"));
        // 32-byte digest, hex encoded
        assert_eq!(a.len(), 64 + ".so".len());
    }

    #[test]
    fn test_fetch_uses_local_paths_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("libdemo.so");
        fs::write(&artifact, b"\x7fELF").unwrap();

        let resolved = fetch(
            &artifact.to_string_lossy(),
            CachePolicy::Store,
            None,
        )
        .unwrap();
        assert_eq!(resolved, artifact);

        let url = format!("file://{}", artifact.display());
        let resolved = fetch(&url, CachePolicy::Bypass, None).unwrap();
        assert_eq!(resolved, artifact);
    }

    #[test]
    fn test_fetch_store_reuses_cache_entry() {
        let dir = tempfile::tempdir().unwrap();
        let url = "http://127.0.0.1:9/releases/libdemo.so";
        let cached = dir.path().join(cache_key(url));
        fs::write(&cached, b"cached artifact").unwrap();

        // Store policy finds the entry without touching the network.
        let resolved = fetch(url, CachePolicy::Store, Some(dir.path())).unwrap();
        assert_eq!(resolved, cached);
    }

    #[test]
    fn test_fetch_bypass_refetches() {
        let dir = tempfile::tempdir().unwrap();
        let url = "http://127.0.0.1:9/releases/libdemo.so";
        let cached = dir.path().join(cache_key(url));
        fs::write(&cached, b"stale").unwrap();

        // Bypass ignores the cache entry; the unreachable host surfaces as
        // a fetch failure.
        let err = fetch(url, CachePolicy::Bypass, Some(dir.path())).unwrap_err();
        assert!(matches!(err, Error::Fetch { url: u, .. } if u.contains("libdemo.so")));
    }
}
