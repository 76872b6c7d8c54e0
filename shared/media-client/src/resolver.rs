use std::sync::Arc;

use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, warn};

use crate::source::SignedUrlSource;

/// Render-ready view of a media reference
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionState {
    /// URL to render, `None` means show a placeholder
    pub url: Option<String>,
    /// A fetch for the current reference is in flight
    pub loading: bool,
    /// Why the last fetch failed, if it did
    pub error: Option<String>,
}

impl ResolutionState {
    fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    fn settled(url: Option<String>) -> Self {
        Self {
            url,
            ..Self::default()
        }
    }

    fn failed(error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    /// Bumped on every reference change; results from older generations are dropped
    generation: u64,
    reference: Option<String>,
    state: ResolutionState,
}

/// Resolves the media reference held by a UI component into a URL.
///
/// Every call to [`Self::set_reference`] starts a new generation. A fetch only
/// publishes its result if its generation is still current when it completes, and
/// the check happens under the state lock, so the state always reflects the latest
/// reference no matter in which order responses arrive. The previous fetch is also
/// aborted. Nothing is cached across resolvers.
pub struct SignedUrlResolver<S> {
    source: Arc<S>,
    slot: Arc<watch::Sender<Slot>>,
    in_flight: Option<JoinHandle<()>>,
}

impl<S: SignedUrlSource> SignedUrlResolver<S> {
    /// Creates a resolver with no reference
    #[must_use]
    pub fn new(source: Arc<S>) -> Self {
        let (slot, _) = watch::channel(Slot::default());
        Self {
            source,
            slot: Arc::new(slot),
            in_flight: None,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ResolutionState {
        self.slot.borrow().state.clone()
    }

    /// Reference the current state belongs to
    #[must_use]
    pub fn reference(&self) -> Option<String> {
        self.slot.borrow().reference.clone()
    }

    /// Watch state changes
    #[must_use]
    pub fn subscribe(&self) -> ResolutionWatcher {
        ResolutionWatcher {
            rx: self.slot.subscribe(),
        }
    }

    /// Switches to a new reference and re-resolves it.
    ///
    /// Must be called from within a Tokio runtime when the reference needs a fetch.
    pub fn set_reference(&mut self, reference: Option<String>) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }

        let reference = reference.filter(|r| !r.is_empty());
        let immediate = match reference.as_deref() {
            None => Some(ResolutionState::default()),
            // Already an absolute URL, e.g. an externally hosted video
            Some(r) if r.starts_with("http") => {
                Some(ResolutionState::settled(Some(r.to_string())))
            }
            Some(_) => None,
        };

        let mut generation = 0;
        self.slot.send_modify(|slot| {
            slot.generation += 1;
            generation = slot.generation;
            slot.reference.clone_from(&reference);
            slot.state = immediate.clone().unwrap_or_else(ResolutionState::loading);
        });

        let (Some(reference), None) = (reference, immediate) else {
            return;
        };

        let source = Arc::clone(&self.source);
        let slot = Arc::clone(&self.slot);

        self.in_flight = Some(tokio::spawn(async move {
            let next = match source.fetch_signed_url(&reference).await {
                Ok(url) => ResolutionState::settled(url),
                Err(e) => {
                    warn!("Failed to resolve media reference {reference}: {e}");
                    ResolutionState::failed(e.to_string())
                }
            };

            slot.send_if_modified(|current| {
                if current.generation != generation {
                    debug!("Discarding stale resolution for {reference}");
                    return false;
                }
                current.state = next;
                true
            });
        }));
    }
}

impl<S> Drop for SignedUrlResolver<S> {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}

/// Receiver side of a resolver's state
pub struct ResolutionWatcher {
    rx: watch::Receiver<Slot>,
}

impl ResolutionWatcher {
    /// Current state
    #[must_use]
    pub fn current(&self) -> ResolutionState {
        self.rx.borrow().state.clone()
    }

    /// Waits for the next change, `None` once the resolver is gone
    pub async fn changed(&mut self) -> Option<ResolutionState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().state.clone())
    }

    /// Waits until the current reference is no longer loading
    pub async fn settled(&mut self) -> ResolutionState {
        if let Ok(slot) = self.rx.wait_for(|slot| !slot.state.loading).await {
            return slot.state.clone();
        }
        self.current()
    }
}
