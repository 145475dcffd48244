use super::load::{default_config_path, default_data_dir, resolve_config_path};
use super::schema::*;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_listen_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("LISTEN_CONFIG_PATH", "/tmp/listen-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/listen-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/xdg-config-home")
            .join("listen")
            .join("config.toml")
    );
}

#[test]
fn default_data_dir_falls_back_to_home_local_share() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_DATA_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    let p = default_data_dir().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".local")
            .join("share")
            .join("listen")
    );
}

#[test]
fn settings_defaults_are_sane() {
    let s = Settings::default();
    assert_eq!(s.playback.sort_key, SortKey::DateAdded);
    assert_eq!(s.playback.import_collision, ImportCollision::Overwrite);
    assert!(s.playback.resume_on_foreground);
    assert_eq!(s.playback.progress_tick_ms, 200);
    assert_eq!(s.playback.position_save_secs, 5);
    assert!(s.storage.data_dir.is_none());
    assert!(s.validate().is_ok());
}

#[test]
fn settings_load_from_config_file_and_parse_enum_aliases() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[storage]
data_dir = "/tmp/listen-data"

[playback]
sort_key = "last_played"
import_collision = "reject"
resume_on_foreground = false
progress_tick_ms = 100
position_save_secs = 10
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("LISTEN_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("LISTEN__PLAYBACK__PROGRESS_TICK_MS");

    let s = Settings::load().unwrap();
    assert_eq!(
        s.storage.data_dir,
        Some(std::path::PathBuf::from("/tmp/listen-data"))
    );
    assert_eq!(s.playback.sort_key, SortKey::LastPlayed);
    assert_eq!(s.playback.import_collision, ImportCollision::Reject);
    assert!(!s.playback.resume_on_foreground);
    assert_eq!(s.playback.progress_tick_ms, 100);
    assert_eq!(s.playback.position_save_secs, 10);
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[playback]
progress_tick_ms = 500
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("LISTEN_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("LISTEN__PLAYBACK__PROGRESS_TICK_MS", "250");

    let s = Settings::load().unwrap();
    assert_eq!(s.playback.progress_tick_ms, 250);
}

#[test]
fn validate_rejects_zero_intervals() {
    let mut s = Settings::default();
    s.playback.progress_tick_ms = 0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.playback.position_save_secs = 0;
    assert!(s.validate().is_err());
}

#[test]
fn resolved_data_dir_prefers_configured_value() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("HOME", "/tmp/home-dir");
    let _g2 = EnvGuard::remove("XDG_DATA_HOME");

    let mut s = Settings::default();
    s.storage.data_dir = Some("/tmp/custom".into());
    assert_eq!(
        s.resolved_data_dir().unwrap(),
        std::path::PathBuf::from("/tmp/custom")
    );

    s.storage.data_dir = None;
    assert_eq!(
        s.resolved_data_dir().unwrap(),
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".local")
            .join("share")
            .join("listen")
    );
}
