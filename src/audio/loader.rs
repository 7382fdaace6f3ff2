//! Background loading of the music asset.
//!
//! Reading and probing the file happens on a worker thread; the UI thread
//! polls for the result once per frame. Failures never propagate as errors:
//! they land in [`LoadState::Failed`] with a reason for the status line.

use rodio::Decoder;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

/// Where the music asset is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    /// No music configured.
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

type LoadResult = Result<Arc<[u8]>, String>;

/// Turns a `musicUrl` into a local path.
///
/// Accepts plain paths and `file://` URLs.
///
/// # Errors
///
/// Returns a reason when the URL uses a network scheme or is empty.
pub fn resolve_music_path(url: &str) -> Result<PathBuf, String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("empty music location".to_string());
    }
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if let Some((scheme, _)) = url.split_once("://") {
        return Err(format!("unsupported scheme '{}' (only local files)", scheme));
    }
    Ok(PathBuf::from(url))
}

/// Reads the file and checks that it decodes.
fn load(url: &str) -> LoadResult {
    let path = resolve_music_path(url)?;
    let bytes = std::fs::read(&path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let data: Arc<[u8]> = Arc::from(bytes);
    Decoder::new(Cursor::new(Arc::clone(&data)))
        .map_err(|e| format!("{}: {}", path.display(), e))?;
    Ok(data)
}

/// Loads one music asset at a time in the background.
#[derive(Debug, Default)]
pub struct MusicLoader {
    state: LoadState,
    source: Option<String>,
    receiver: Option<Receiver<LoadResult>>,
}

impl MusicLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    /// Location of the current (or last) asset.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Starts loading `url`, or clears the asset when `None`.
    ///
    /// A load still in flight is abandoned; its result is discarded.
    pub fn request(&mut self, url: Option<&str>) {
        self.receiver = None;
        self.source = url.map(str::to_string);
        let Some(url) = url else {
            self.state = LoadState::Idle;
            return;
        };

        let (sender, receiver) = channel();
        let owned = url.to_string();
        let spawned = thread::Builder::new()
            .name("music-loader".to_string())
            .spawn(move || {
                let _ = sender.send(load(&owned));
            });
        match spawned {
            Ok(_) => {
                tracing::info!("Loading music from {}", url);
                self.state = LoadState::Loading;
                self.receiver = Some(receiver);
            }
            Err(e) => {
                tracing::error!("Failed to start music loader: {}", e);
                self.state = LoadState::Failed(e.to_string());
            }
        }
    }

    /// Checks for a finished load.
    ///
    /// # Returns
    ///
    /// The asset bytes once, on the call that observes completion.
    pub fn poll(&mut self) -> Option<Arc<[u8]>> {
        let receiver = self.receiver.as_ref()?;
        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err("loader stopped unexpectedly".to_string()),
        };
        self.receiver = None;
        match result {
            Ok(data) => {
                tracing::info!("Music loaded ({} bytes)", data.len());
                self.state = LoadState::Ready;
                Some(data)
            }
            Err(reason) => {
                tracing::warn!("Music failed to load: {}", reason);
                self.state = LoadState::Failed(reason);
                None
            }
        }
    }
}
