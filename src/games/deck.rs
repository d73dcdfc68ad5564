use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One named list of prompts, toggleable per room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSource<T> {
    pub name: String,
    pub enabled: bool,
    pub items: Vec<T>,
}

impl<T> DeckSource<T> {
    pub fn new(name: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            items,
        }
    }
}

/// Draw queue over a set of sources.
///
/// The queue is a pre-shuffled copy of every enabled item, drawn from the
/// back. Drawing from an empty queue reshuffles-and-refills from the enabled
/// sources first, so the deck is never permanently empty while any enabled
/// source has items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck<T> {
    sources: Vec<DeckSource<T>>,
    queue: Vec<T>,
}

impl<T: Clone> Deck<T> {
    pub fn new(sources: Vec<DeckSource<T>>) -> Self {
        Self {
            sources,
            queue: Vec::new(),
        }
    }

    pub fn sources(&self) -> &[DeckSource<T>] {
        &self.sources
    }

    pub fn add_source(&mut self, source: DeckSource<T>) {
        self.sources.push(source);
    }

    pub fn has_enabled_items(&self) -> bool {
        self.sources
            .iter()
            .any(|source| source.enabled && !source.items.is_empty())
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Draw the next item, refilling from the enabled sources when the
    /// queue runs dry. Returns `None` only when no enabled source has any
    /// items.
    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Option<T> {
        if self.queue.is_empty() {
            self.refill(rng);
        }
        self.queue.pop()
    }

    /// Fill the queue once if it is empty. Used by games that consume each
    /// item at most once per session.
    pub fn prime<R: Rng>(&mut self, rng: &mut R) {
        if self.queue.is_empty() {
            self.refill(rng);
        }
    }

    /// Draw without refilling; the caller treats `None` as exhaustion.
    pub fn take_queued(&mut self) -> Option<T> {
        self.queue.pop()
    }

    fn refill<R: Rng>(&mut self, rng: &mut R) {
        self.queue = self
            .sources
            .iter()
            .filter(|source| source.enabled)
            .flat_map(|source| source.items.iter().cloned())
            .collect();
        self.queue.shuffle(rng);
    }
}
