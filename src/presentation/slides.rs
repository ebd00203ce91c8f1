//! Slide source loading
//!
//! Each route maps to `<root>/<route without leading slash>/+page.svelte`.
//! Unreadable files are recorded as absent content; loading never fails as a
//! whole.

use std::io::ErrorKind;
use std::path::PathBuf;

/// Default root of the slide sources
pub const DEFAULT_SLIDES_DIR: &str = "ui/src/routes";

const PAGE_FILE: &str = "+page.svelte";

/// Content loaded for one route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteContent {
    pub route: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SlideSource {
    root: PathBuf,
}

impl Default for SlideSource {
    fn default() -> Self {
        Self::new(DEFAULT_SLIDES_DIR)
    }
}

impl SlideSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the source file backing `route`
    pub fn path_for(&self, route: &str) -> PathBuf {
        self.root
            .join(route.trim_start_matches('/'))
            .join(PAGE_FILE)
    }

    /// Read one route's source, `None` if it cannot be read
    pub async fn read_route(&self, route: &str) -> Option<String> {
        let path = self.path_for(route);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                tracing::debug!(
                    path = %path.display(),
                    chars = content.len(),
                    lines = content.lines().count(),
                    "Read route file"
                );
                Some(content)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Route file does not exist");
                None
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                tracing::error!(path = %path.display(), "Permission denied reading route file");
                None
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to read route file");
                None
            }
        }
    }

    /// Load every route's content, preserving route order
    pub async fn load_all(&self, routes: &[String]) -> Vec<RouteContent> {
        let mut loaded = Vec::with_capacity(routes.len());
        for route in routes {
            let content = self.read_route(route).await;
            loaded.push(RouteContent {
                route: route.clone(),
                content,
            });
        }

        let successful = loaded.iter().filter(|r| r.content.is_some()).count();
        tracing::info!(
            successful,
            failed = loaded.len() - successful,
            "Route file loading complete"
        );
        loaded
    }
}
