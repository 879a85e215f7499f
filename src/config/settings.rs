/// Settings store: the `dirs` list and disable switch, persisted as JSON
use crate::config::rules::normalize_path;
use crate::config::types::{Result, SieveError};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default settings file name, relative to the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "diagsieve.json";

/// Environment variable that forces the disable switch on
pub const DISABLE_ENV: &str = "DIAGSIEVE_DISABLED";

/// Plugin directories known to raise deprecation noise on current runtimes
const NOISY_PLUGINS: &[&str] = &[
    "backwpup",
    "business-reviews-bundle",
    "cloudflare",
    "easy-digital-downloads",
    "google-site-kit",
    "gravityforms",
    "gravityperks",
    "mailpoet",
    "seo-by-rank-math",
    "sitepress-multilingual-cms",
    "woocommerce",
    "wp-google-places-review-slider",
    "wp-job-openings",
    "wp-seo-multilingual",
    "wp-super-cache",
];

/// Vendored libraries bundled by many plugins
const NOISY_LIBRARIES: &[&str] = &[
    "/vendor/rmccue/requests/",
    "/vendor/woocommerce/action-scheduler/",
];

/// Themes known to raise deprecation noise
const NOISY_THEMES: &[&str] = &["Divi"];

/// Where the site lives on disk, used to build the default directory list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteLayout {
    /// Site root; stripped from every default entry
    pub root: PathBuf,
    /// Core includes directory name under the root
    pub includes: String,
    /// Core admin directory name under the root
    pub admin: String,
    pub plugins_dir: PathBuf,
    pub content_dir: PathBuf,
}

impl SiteLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        let content_dir = root.join("wp-content");
        Self {
            plugins_dir: content_dir.join("plugins"),
            content_dir,
            includes: "wp-includes".to_string(),
            admin: "wp-admin".to_string(),
            root,
        }
    }
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self::new("/")
    }
}

/// Built-in list of locations whose diagnostics are noise.
///
/// Entries keep a trailing `/` and are made relative to the site root so the
/// list survives the site being moved.
pub fn default_dirs(layout: &SiteLayout) -> Vec<String> {
    let mut dirs = vec![
        format!("{}/{}/", layout.root.display(), layout.includes),
        format!("{}/{}/", layout.root.display(), layout.admin),
    ];
    dirs.extend(NOISY_LIBRARIES.iter().map(|lib| lib.to_string()));
    dirs.extend(
        NOISY_PLUGINS
            .iter()
            .map(|slug| format!("{}/{}/", layout.plugins_dir.display(), slug)),
    );
    dirs.extend(
        NOISY_THEMES
            .iter()
            .map(|theme| format!("{}/themes/{}/", layout.content_dir.display(), theme)),
    );

    let root = normalize_path(&layout.root.to_string_lossy())
        .trim_end_matches('/')
        .to_string();

    dirs.into_iter()
        .map(|dir| {
            let dir = normalize_path(&dir).replace("//", "/");
            match dir.strip_prefix(root.as_str()) {
                Some(relative) if !root.is_empty() && relative.starts_with('/') => {
                    relative.to_string()
                }
                _ => dir,
            }
        })
        .collect()
}

/// Persisted interceptor settings
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Newline-separated path prefixes
    #[serde(default)]
    pub dirs: String,
    /// Disable switch; when set nothing is installed
    #[serde(default)]
    pub disabled: bool,
}

impl Settings {
    pub fn with_dirs<I, S>(dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines: Vec<String> = dirs.into_iter().map(|d| d.as_ref().to_string()).collect();
        Self {
            dirs: lines.join("\n"),
            disabled: false,
        }
    }

    /// Load settings from a JSON file. A missing file yields defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut settings = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                SieveError::Config(format!("Failed to read settings file: {}", e))
            })?;
            serde_json::from_str::<Settings>(&content).map_err(|e| {
                SieveError::Config(format!("Failed to parse settings JSON: {}", e))
            })?
        } else {
            debug!("Settings file {} not found, using defaults", path.display());
            Settings::default()
        };

        if env_disabled() {
            settings.disabled = true;
        }
        Ok(settings)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        info!("Settings written to {}", path.as_ref().display());
        Ok(())
    }

    pub fn dir_lines(&self) -> Vec<String> {
        self.dirs.lines().map(str::to_string).collect()
    }

    /// Fill `dirs` with the default list when nothing is configured.
    /// Returns whether anything changed.
    pub fn seed_defaults_if_empty(&mut self, layout: &SiteLayout) -> bool {
        if !self.dirs.trim().is_empty() {
            return false;
        }
        self.reset(layout);
        true
    }

    /// Replace `dirs` with the default list
    pub fn reset(&mut self, layout: &SiteLayout) {
        self.dirs = default_dirs(layout).join("\n");
    }
}

fn env_disabled() -> bool {
    std::env::var(DISABLE_ENV)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_dirs_are_root_relative() {
        let layout = SiteLayout::new("/var/www/site");
        let dirs = default_dirs(&layout);

        assert_eq!(dirs[0], "/wp-includes/");
        assert_eq!(dirs[1], "/wp-admin/");
        assert!(dirs.contains(&"/vendor/rmccue/requests/".to_string()));
        assert!(dirs.contains(&"/wp-content/plugins/woocommerce/".to_string()));
        assert!(dirs.contains(&"/wp-content/themes/Divi/".to_string()));
        assert!(dirs.iter().all(|d| !d.contains("/var/www/site")));
        assert!(dirs.iter().all(|d| d.ends_with('/')));
    }

    #[test]
    fn test_default_dirs_with_root_slash() {
        let dirs = default_dirs(&SiteLayout::default());
        assert_eq!(dirs[0], "/wp-includes/");
        assert_eq!(
            dirs.len(),
            2 + NOISY_LIBRARIES.len() + NOISY_PLUGINS.len() + NOISY_THEMES.len()
        );
    }

    #[test]
    fn test_default_dirs_with_external_plugins_dir() {
        let mut layout = SiteLayout::new("/srv/site");
        layout.plugins_dir = PathBuf::from("/opt/plugins");
        let dirs = default_dirs(&layout);
        assert!(dirs.contains(&"/opt/plugins/gravityforms/".to_string()));
    }

    #[test]
    fn test_default_dirs_strip_root_only_at_path_boundary() {
        let mut layout = SiteLayout::new("/srv/site");
        layout.plugins_dir = PathBuf::from("/srv/site-plugins");
        let dirs = default_dirs(&layout);

        assert!(dirs.contains(&"/srv/site-plugins/gravityforms/".to_string()));
        assert!(dirs.contains(&"/wp-content/themes/Divi/".to_string()));
        assert!(dirs.iter().all(|d| d.starts_with('/')));
    }

    #[test]
    fn test_disable_env_forces_switch_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        Settings::with_dirs(["wp-admin/"]).save(&path).unwrap();

        for value in ["1", "true", "YES"] {
            std::env::set_var(DISABLE_ENV, value);
            let loaded = Settings::load(&path);
            std::env::remove_var(DISABLE_ENV);
            assert!(loaded.unwrap().disabled, "{} should disable", value);
        }

        std::env::set_var(DISABLE_ENV, "0");
        let loaded = Settings::load(&path);
        std::env::remove_var(DISABLE_ENV);
        assert!(!loaded.unwrap().disabled);
    }

    #[test]
    fn test_seed_only_when_empty() {
        let layout = SiteLayout::default();

        let mut empty = Settings::default();
        assert!(empty.seed_defaults_if_empty(&layout));
        assert!(empty.dirs.contains("/wp-admin/"));

        let mut custom = Settings::with_dirs(["/mine/"]);
        assert!(!custom.seed_defaults_if_empty(&layout));
        assert_eq!(custom.dirs, "/mine/");
    }

    #[test]
    fn test_reset_overwrites() {
        let mut settings = Settings::with_dirs(["/mine/"]);
        settings.reset(&SiteLayout::default());
        assert!(!settings.dirs.contains("/mine/"));
        assert_eq!(settings.dir_lines(), default_dirs(&SiteLayout::default()));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let settings = Settings::with_dirs(["wp-admin/", "/vendor/acme/"]);
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.dir_lines(), vec!["wp-admin/", "/vendor/acme/"]);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = Settings::load(dir.path().join("absent.json")).unwrap();
        assert!(loaded.dirs.is_empty());
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ dirs: ").unwrap();

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, SieveError::Config(_)));
    }

    #[test]
    fn test_missing_keys_default() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }
}
