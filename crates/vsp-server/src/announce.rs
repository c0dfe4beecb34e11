//! Discovery file for a listening session.
//!
//! Clients find a running session by scanning for `vsp_session_<port>` in the
//! announce directory. The file holds one line,
//! `localhost:<port>:<user>:<program>`.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

/// Prefix of every announce file name.
pub const FILE_PREFIX: &str = "vsp_session_";

/// Announce file owned by a session; removed on cleanup or drop.
#[derive(Debug)]
pub struct Announce {
    path: PathBuf,
    removed: bool,
}

impl Announce {
    /// Write the announce file for `port` into `dir`, replacing a stale one.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the stale file cannot be removed or the new
    /// file cannot be written.
    pub fn create(dir: &Path, port: u16) -> io::Result<Self> {
        let path = dir.join(format!("{FILE_PREFIX}{port}"));
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed stale announce file"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {},
            Err(err) => return Err(err),
        }

        fs::write(&path, contents(port, &user(), &program()))?;
        debug!(path = %path.display(), "wrote announce file");
        Ok(Self { path, removed: false })
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file. Repeated calls do nothing.
    pub fn cleanup(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), %err, "failed to remove announce file");
        }
    }
}

impl Drop for Announce {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn contents(port: u16, user: &str, program: &str) -> String {
    format!("localhost:{port}:{user}:{program}\n")
}

fn user() -> String {
    env::var("USER").or_else(|_| env::var("USERNAME")).unwrap_or_else(|_| "unknown".to_string())
}

fn program() -> String {
    env::args_os()
        .next()
        .map_or_else(|| "unknown".to_string(), |arg| arg.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contents_line_format() {
        assert_eq!(contents(4444, "alice", "/bin/sim"), "localhost:4444:alice:/bin/sim\n");
    }

    #[test]
    fn create_writes_and_cleanup_removes() {
        let dir = tempfile::tempdir().unwrap();
        let mut announce = Announce::create(dir.path(), 5151).unwrap();
        assert_eq!(announce.path(), dir.path().join("vsp_session_5151"));

        let text = fs::read_to_string(announce.path()).unwrap();
        assert!(text.starts_with("localhost:5151:"));
        assert!(text.ends_with('\n'));
        assert_eq!(text.trim_end().split(':').count(), 4);

        announce.cleanup();
        assert!(!announce.path().exists());
        announce.cleanup();
    }

    #[test]
    fn stale_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vsp_session_7000");
        fs::write(&path, "stale").unwrap();

        let announce = Announce::create(dir.path(), 7000).unwrap();
        assert!(fs::read_to_string(&path).unwrap().starts_with("localhost:7000:"));
        drop(announce);
        assert!(!path.exists());
    }

    #[test]
    fn cleanup_of_missing_file_only_warns() {
        let dir = tempfile::tempdir().unwrap();
        let mut announce = Announce::create(dir.path(), 7001).unwrap();
        fs::remove_file(announce.path()).unwrap();
        announce.cleanup();
    }
}
