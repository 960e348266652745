pub mod stl;

use crate::scene::Geometry;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

pub use stl::{StlError, StlMesh};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: StlError,
    },
    #[error("could not start import worker for {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result of one file import, delivered back to the frame loop.
#[derive(Debug)]
pub struct ImportOutcome {
    pub name: String,
    pub path: Option<PathBuf>,
    pub result: Result<Geometry, ImportError>,
}

/// Decodes bytes that were already read. `name` only shows up in errors.
pub fn decode_bytes(name: &str, bytes: &[u8]) -> Result<Geometry, ImportError> {
    stl::decode(bytes)
        .map(StlMesh::into_geometry)
        .map_err(|source| ImportError::Decode {
            name: name.to_string(),
            source,
        })
}

pub fn read_and_decode(path: &Path) -> Result<Geometry, ImportError> {
    let bytes = std::fs::read(path).map_err(|source| ImportError::Read {
        path: path.display().to_string(),
        source,
    })?;
    decode_bytes(&display_name(path), &bytes)
}

/// File name used as the node name.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("mesh.stl")
        .to_string()
}

/// Runs each file import on its own worker thread. Finished imports are
/// collected by [`ImportQueue::poll`] on the owning thread, so the scene is
/// only ever touched from there.
pub struct ImportQueue {
    sender: Sender<ImportOutcome>,
    receiver: Receiver<ImportOutcome>,
    in_flight: usize,
}

impl ImportQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            in_flight: 0,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn spawn(&mut self, path: PathBuf) {
        let name = display_name(&path);
        let sender = self.sender.clone();
        log::info!("Importing {}", path.display());

        let worker_path = path.clone();
        let worker_name = name.clone();
        let spawned = thread::Builder::new()
            .name(format!("import:{name}"))
            .spawn(move || {
                let result = read_and_decode(&worker_path);
                // Receiver gone means the app is shutting down.
                let _ = sender.send(ImportOutcome {
                    name: worker_name,
                    path: Some(worker_path),
                    result,
                });
            });

        match spawned {
            Ok(_) => self.in_flight += 1,
            Err(err) => {
                log::warn!("Could not start import worker for {}: {}", name, err);
                let _ = self.sender.send(ImportOutcome {
                    name: name.clone(),
                    path: Some(path),
                    result: Err(ImportError::Spawn { name, source: err }),
                });
                self.in_flight += 1;
            }
        }
    }

    /// Drains every outcome that is ready without blocking.
    pub fn poll(&mut self) -> Vec<ImportOutcome> {
        let mut ready = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(outcome) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    ready.push(outcome);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        ready
    }

    #[cfg(test)]
    pub fn wait_for_all(&mut self, timeout: std::time::Duration) -> Vec<ImportOutcome> {
        let deadline = std::time::Instant::now() + timeout;
        let mut ready = Vec::new();
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(outcome) => {
                    self.in_flight -= 1;
                    ready.push(outcome);
                }
                Err(_) => break,
            }
        }
        ready
    }
}

impl Default for ImportQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) fn scratch_file(tag: &str, bytes: &[u8]) -> PathBuf {
    let mut path = std::env::temp_dir();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    path.push(format!("stlview_{}_{}_{}.stl", tag, std::process::id(), nonce));
    std::fs::write(&path, bytes).unwrap();
    path
}

#[cfg(test)]
mod tests {
    use super::stl::fixtures::cube_binary;
    use super::*;
    use std::time::Duration;

    #[test]
    fn worker_delivers_decoded_geometry() {
        let path = scratch_file("worker_ok", &cube_binary(1.0));
        let mut queue = ImportQueue::new();
        queue.spawn(path.clone());
        assert_eq!(queue.in_flight(), 1);

        let outcomes = queue.wait_for_all(Duration::from_secs(10));
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].name, display_name(&path));
        assert_eq!(outcomes[0].result.as_ref().unwrap().triangle_count(), 12);
        assert_eq!(queue.in_flight(), 0);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn each_file_reports_independently() {
        let good = scratch_file("batch_good", &cube_binary(1.0));
        let bad = scratch_file("batch_bad", b"definitely not an stl file");
        let mut missing = std::env::temp_dir();
        missing.push("stlview_does_not_exist_0.stl");

        let mut queue = ImportQueue::new();
        queue.spawn(good.clone());
        queue.spawn(bad.clone());
        queue.spawn(missing);

        let outcomes = queue.wait_for_all(Duration::from_secs(10));
        assert_eq!(outcomes.len(), 3);
        let ok = outcomes.iter().filter(|o| o.result.is_ok()).count();
        assert_eq!(ok, 1);
        assert!(outcomes.iter().any(|o| matches!(
            o.result,
            Err(ImportError::Decode { .. })
        )));
        assert!(outcomes
            .iter()
            .any(|o| matches!(o.result, Err(ImportError::Read { .. }))));

        let _ = std::fs::remove_file(good);
        let _ = std::fs::remove_file(bad);
    }

    #[test]
    fn poll_without_work_is_empty() {
        let mut queue = ImportQueue::new();
        assert!(queue.poll().is_empty());
    }
}
