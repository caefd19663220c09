//! Process-wide CA pool built from `BUNDLE_PATHS`.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extra root certificates trusted by upstream clients.
///
/// Built once at startup and read-only afterwards. An empty pool leaves the
/// TLS backend's default roots in place.
#[derive(Clone, Default)]
pub struct CaPool {
    certificates: Vec<reqwest::Certificate>,
    sources: Vec<PathBuf>,
}

impl std::fmt::Debug for CaPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaPool")
            .field("certificates", &self.certificates.len())
            .field("sources", &self.sources)
            .finish()
    }
}

impl CaPool {
    /// Load every readable PEM bundle. Files that fail to read or parse are
    /// logged and skipped.
    pub fn from_bundles(paths: &[PathBuf]) -> Self {
        let mut pool = Self::default();
        for path in paths {
            match load_bundle(path) {
                Ok(certs) if certs.is_empty() => {
                    warn!(path = %path.display(), "CA bundle contains no certificates, skipping")
                }
                Ok(certs) => {
                    debug!(path = %path.display(), count = certs.len(), "Loaded CA bundle");
                    pool.certificates.extend(certs);
                    pool.sources.push(path.clone());
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to load CA bundle, skipping"),
            }
        }
        if !paths.is_empty() && pool.is_empty() {
            warn!("No CA bundle could be loaded, using system defaults");
        } else if !pool.is_empty() {
            info!(
                bundles = pool.sources.len(),
                certificates = pool.certificates.len(),
                "Custom CA pool ready"
            );
        }
        pool
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Trust the pool (and optionally nothing at all) on `builder`.
    pub fn apply(
        &self,
        builder: reqwest::ClientBuilder,
        insecure_skip_verify: bool,
    ) -> reqwest::ClientBuilder {
        let builder = self
            .certificates
            .iter()
            .cloned()
            .fold(builder, |b, cert| b.add_root_certificate(cert));
        builder.danger_accept_invalid_certs(insecure_skip_verify)
    }
}

#[derive(Debug, thiserror::Error)]
enum BundleError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] reqwest::Error),
}

fn load_bundle(path: &Path) -> Result<Vec<reqwest::Certificate>, BundleError> {
    let pem = std::fs::read(path)?;
    Ok(reqwest::Certificate::from_pem_bundle(&pem)?)
}
