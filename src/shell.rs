//! Desktop integration seams: user notifications and login autostart.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

pub trait Notifier {
    fn notify(&self, level: NoticeLevel, title: &str, body: &str);
}

/// Routes notices to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, level: NoticeLevel, title: &str, body: &str) {
        match level {
            NoticeLevel::Info => log::info!("notice: {} body={}", title, body),
            NoticeLevel::Warning => log::warn!("notice: {} body={}", title, body),
            NoticeLevel::Error => log::error!("notice: {} body={}", title, body),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("no autostart directory: neither XDG_CONFIG_HOME nor HOME is set")]
    NoConfigDir,
    #[error("failed to update {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Registration of the program to run at login.
pub trait StartupManager {
    fn enable(&self) -> Result<(), StartupError>;
    fn disable(&self) -> Result<(), StartupError>;
    fn is_enabled(&self) -> bool;
}

/// Freedesktop autostart entry under `$XDG_CONFIG_HOME/autostart`.
#[derive(Clone, Debug)]
pub struct XdgAutostart {
    dir: PathBuf,
    app_name: String,
    exec: String,
}

impl XdgAutostart {
    pub fn new(dir: impl Into<PathBuf>, app_name: impl Into<String>, exec: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            app_name: app_name.into(),
            exec: exec.into(),
        }
    }

    /// Uses the user's autostart directory and the running executable.
    pub fn for_current_user(app_name: &str) -> Result<Self, StartupError> {
        let dir = env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
            .ok_or(StartupError::NoConfigDir)?
            .join("autostart");
        let exec = env::current_exe()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| app_name.to_string());
        Ok(Self::new(dir, app_name, format!("{exec} run")))
    }

    pub fn entry_path(&self) -> PathBuf {
        self.dir.join(format!("{}.desktop", self.app_name))
    }

    pub fn entry_contents(&self) -> String {
        format!(
            "[Desktop Entry]\nType=Application\nName={}\nExec={}\nX-GNOME-Autostart-enabled=true\nNoDisplay=true\n",
            self.app_name, self.exec
        )
    }

    fn io_error(path: &Path, source: io::Error) -> StartupError {
        StartupError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl StartupManager for XdgAutostart {
    fn enable(&self) -> Result<(), StartupError> {
        fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(&self.dir, e))?;
        let path = self.entry_path();
        fs::write(&path, self.entry_contents()).map_err(|e| Self::io_error(&path, e))?;
        log::info!("startup: enabled entry={}", path.display());
        Ok(())
    }

    fn disable(&self) -> Result<(), StartupError> {
        let path = self.entry_path();
        match fs::remove_file(&path) {
            Ok(()) => {
                log::info!("startup: disabled entry={}", path.display());
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::io_error(&path, err)),
        }
    }

    fn is_enabled(&self) -> bool {
        self.entry_path().is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_disable_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let autostart = XdgAutostart::new(dir.path().join("autostart"), "tfdrag", "/usr/bin/tfdrag run");
        assert!(!autostart.is_enabled());

        autostart.enable().expect("enable");
        assert!(autostart.is_enabled());
        let entry = fs::read_to_string(autostart.entry_path()).expect("entry");
        assert!(entry.starts_with("[Desktop Entry]\n"));
        assert!(entry.contains("Exec=/usr/bin/tfdrag run\n"));

        autostart.disable().expect("disable");
        assert!(!autostart.is_enabled());
        autostart.disable().expect("disable twice");
    }
}
