// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;
use url::Url;

use super::schema::Settings;
use crate::error::ConfigError;

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "PODSERVICE_CONFIG_PATH";

const ENV_PREFIX: &str = "PODSERVICE";

impl Settings {
    /// Load settings from an optional config file and the environment
    ///
    /// `path` overrides the default location. A missing file is not an
    /// error; the defaults apply. Storage and watch paths are expanded and
    /// made absolute before returning.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path.map(Path::to_path_buf).or_else(resolve_config_path);

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(
                ::config::File::from(path.as_path())
                    .format(::config::FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.normalize();
        Ok(settings)
    }

    /// Write the settings as TOML, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Perform basic validation checks on loaded settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be >= 1".to_string()));
        }

        match Url::parse(&self.server.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base() => {}
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "server.base_url must be an http(s) URL, got '{}'",
                    self.server.base_url
                )));
            }
        }

        if self.server.max_upload_mb == 0 {
            return Err(ConfigError::Invalid(
                "server.max_upload_mb must be >= 1".to_string(),
            ));
        }
        if self.watch.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "watch.poll_interval_secs must be >= 1".to_string(),
            ));
        }
        if self.watch.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "watch.max_concurrent must be >= 1".to_string(),
            ));
        }
        if self.downloader.command.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "downloader.command must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Expand `~`, make paths absolute and fill in derived storage directories
    pub fn normalize(&mut self) {
        let storage = &mut self.storage;
        storage.data_dir = expand_path(&storage.data_dir);
        storage.audio_dir = Some(resolve_dir(&storage.audio_dir, &storage.data_dir, "audio"));
        storage.metadata_dir = Some(resolve_dir(
            &storage.metadata_dir,
            &storage.data_dir,
            "metadata",
        ));
        storage.thumbnails_dir = Some(resolve_dir(
            &storage.thumbnails_dir,
            &storage.data_dir,
            "thumbnails",
        ));
        self.watch.file = expand_path(&self.watch.file);
    }
}

fn resolve_dir(dir: &Option<PathBuf>, data_dir: &Path, default: &str) -> PathBuf {
    match dir {
        Some(dir) if !dir.as_os_str().is_empty() => expand_path(dir),
        _ => data_dir.join(default),
    }
}

/// Expand a leading `~` to the home directory and make the path absolute
pub fn expand_path(path: &Path) -> PathBuf {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => match env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    };

    if expanded.is_absolute() {
        expanded
    } else {
        std::path::absolute(&expanded).unwrap_or(expanded)
    }
}

/// Resolve the config path from `PODSERVICE_CONFIG_PATH` or XDG defaults
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/podservice/config.toml`
/// or `~/.config/podservice/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("podservice").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use std::sync::{Mutex, MutexGuard, OnceLock};
    use tempfile::tempdir;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    // Tests that read or write process environment take this lock
    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    struct EnvGuard {
        key: &'static str,
        old: Option<std::ffi::OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, val: &str) -> Self {
            let old = env::var_os(key);
            unsafe {
                env::set_var(key, val);
            }
            Self { key, old }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match self.old.take() {
                Some(v) => unsafe {
                    env::set_var(self.key, v);
                },
                None => unsafe {
                    env::remove_var(self.key);
                },
            }
        }
    }

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let _lock = env_lock();
        let dir = tempdir().unwrap();

        let settings = Settings::load(Some(&dir.path().join("absent.toml"))).unwrap();

        assert_eq!(settings.server.port, 8083);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.podcast.title, "My Podcast");
        assert_eq!(settings.log_level, LogLevel::Info);
        assert_eq!(
            settings.storage.audio_dir(),
            PathBuf::from("/tmp/podservice/audio")
        );
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let _lock = env_lock();
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
log_level = "DEBUG"

[server]
port = 9000
base_url = "https://pods.example.org"

[podcast]
title = "Custom Show"
"#,
        );

        let settings = Settings::load(Some(&path)).unwrap();

        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.base_url, "https://pods.example.org");
        assert_eq!(settings.podcast.title, "Custom Show");
        assert_eq!(settings.podcast.language, "en-us");
        assert_eq!(settings.log_level, LogLevel::Debug);
        assert!(settings.watch.enabled);
    }

    #[test]
    fn storage_dirs_derive_from_data_dir() {
        let _lock = env_lock();
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let path = write_config(
            dir.path(),
            &format!(
                "[storage]\ndata_dir = \"{}\"\nthumbnails_dir = \"{}\"\n",
                data_dir.display(),
                dir.path().join("art").display()
            ),
        );

        let settings = Settings::load(Some(&path)).unwrap();

        assert_eq!(settings.storage.audio_dir(), data_dir.join("audio"));
        assert_eq!(settings.storage.metadata_dir(), data_dir.join("metadata"));
        assert_eq!(settings.storage.thumbnails_dir(), dir.path().join("art"));
    }

    #[test]
    fn environment_overrides_file() {
        let _lock = env_lock();
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "[podcast]\ntitle = \"From File\"\n");
        let _title = EnvGuard::set("PODSERVICE__PODCAST__TITLE", "From Env");
        let _port = EnvGuard::set("PODSERVICE__SERVER__PORT", "9999");

        let settings = Settings::load(Some(&path)).unwrap();

        assert_eq!(settings.podcast.title, "From Env");
        assert_eq!(settings.server.port, 9999);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let _lock = env_lock();
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "[server\nport = ");

        assert!(matches!(
            Settings::load(Some(&path)),
            Err(ConfigError::LoadFailed(_))
        ));
    }

    #[test]
    fn save_then_load_roundtrip() {
        let _lock = env_lock();
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.podcast.title = "Saved Show".to_string();
        settings.podcast.image_url = Some("https://example.org/cover.jpg".to_string());
        settings.storage.data_dir = dir.path().join("data");
        settings.watch.max_concurrent = 3;
        settings.normalize();
        settings.save(&path).unwrap();

        let loaded = Settings::load(Some(&path)).unwrap();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn expand_path_replaces_tilde() {
        let _lock = env_lock();
        let _home = EnvGuard::set("HOME", "/home/tester");

        assert_eq!(
            expand_path(Path::new("~/pods")),
            PathBuf::from("/home/tester/pods")
        );
        assert_eq!(expand_path(Path::new("/abs/path")), PathBuf::from("/abs/path"));
    }

    #[test]
    fn expand_path_makes_relative_absolute() {
        assert!(expand_path(Path::new("relative/dir")).is_absolute());
    }

    #[test]
    fn default_config_path_prefers_xdg_config_home() {
        let _lock = env_lock();
        let _xdg = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");

        assert_eq!(
            default_config_path().unwrap(),
            PathBuf::from("/tmp/xdg-config-home/podservice/config.toml")
        );
    }

    #[test]
    fn resolve_config_path_prefers_env_override() {
        let _lock = env_lock();
        let _path = EnvGuard::set(CONFIG_PATH_ENV, "/tmp/podservice-test.toml");

        assert_eq!(
            resolve_config_path().unwrap(),
            PathBuf::from("/tmp/podservice-test.toml")
        );
    }

    #[test]
    fn defaults_validate() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.server.base_url = "not a url".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.server.base_url = "ftp://example.org".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.watch.max_concurrent = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.watch.poll_interval_secs = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.downloader.command = " ".to_string();
        assert!(settings.validate().is_err());
    }
}
