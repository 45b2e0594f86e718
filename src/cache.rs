use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A rendered page with the time it was produced.
#[derive(Debug, Serialize, Deserialize)]
pub struct CachedPage {
    pub rendered: String,
    pub rendered_at: chrono::DateTime<chrono::Utc>,
}

/// File-based cache of rendered pages, the revalidation analog of the
/// blog's static generation: listing pages get a short lifetime, post pages
/// a longer one, and a stale entry is simply re-rendered.
///
/// Cache layout: `~/.cache/spacewalker/{repository-host}/{kind}/{key}.json`
pub struct PageCache {
    dir: PathBuf,
    max_age: chrono::Duration,
}

impl PageCache {
    /// Create a cache scoped to one repository host and page kind
    /// (`"listing"` or `"posts"`), with the kind's revalidation interval.
    pub fn new(host: &str, kind: &str, max_age_secs: u64) -> Result<Self> {
        let base = directories::ProjectDirs::from("", "", "spacewalker")
            .context("Could not determine cache directory")?;
        let dir = base.cache_dir().join(host).join(kind);
        Self::at_dir(dir, max_age_secs)
    }

    fn at_dir(dir: PathBuf, max_age_secs: u64) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory: {:?}", dir))?;
        Ok(Self {
            dir,
            max_age: chrono::Duration::seconds(max_age_secs as i64),
        })
    }

    /// Load a cached page by key if it exists and is still fresh.
    pub fn load_fresh(&self, key: &str) -> Result<Option<CachedPage>> {
        let path = self.page_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let data =
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
        let page: CachedPage =
            serde_json::from_str(&data).with_context(|| format!("Failed to parse {:?}", path))?;
        if chrono::Utc::now() - page.rendered_at > self.max_age {
            return Ok(None);
        }
        Ok(Some(page))
    }

    /// Save a rendered page under the given key, stamped with now.
    pub fn save(&self, key: &str, rendered: &str) -> Result<()> {
        let page = CachedPage {
            rendered: rendered.to_string(),
            rendered_at: chrono::Utc::now(),
        };
        let path = self.page_path(key);
        let data = serde_json::to_string_pretty(&page).context("Failed to serialize page")?;
        std::fs::write(&path, data).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }

    fn page_path(&self, key: &str) -> PathBuf {
        // Keys come from slugs and page parameters; strip anything that
        // could escape the cache directory.
        let safe: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_cache(max_age_secs: u64) -> PageCache {
        let dir = std::env::temp_dir().join(format!(
            "spacewalker-cache-test-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        PageCache::at_dir(dir, max_age_secs).unwrap()
    }

    #[test]
    fn test_missing_key_is_none() {
        let cache = scratch_cache(3600);
        assert!(cache.load_fresh("nothing-here").unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_fresh() {
        let cache = scratch_cache(3600);
        cache.save("listing-20", "rendered output").unwrap();
        let page = cache.load_fresh("listing-20").unwrap().unwrap();
        assert_eq!(page.rendered, "rendered output");
    }

    #[test]
    fn test_stale_entry_is_not_served() {
        let cache = scratch_cache(0);
        cache.save("post-slug", "old output").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(cache.load_fresh("post-slug").unwrap().is_none());
    }

    #[test]
    fn test_keys_are_sanitized() {
        let cache = scratch_cache(3600);
        cache.save("../escape/attempt", "content").unwrap();
        assert!(cache.load_fresh("../escape/attempt").unwrap().is_some());
    }
}
