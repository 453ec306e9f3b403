use std::collections::HashSet;

use crate::deck::store::IdeaStore;
use crate::errors::{IdeaSwipeError, IdeaSwipeResult};
use crate::ideas::types::{DeckSession, Direction, Idea, SwipeResults};

/// Lifecycle states of the idea deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckState {
    Empty,
    Loading,
    Active { index: usize, total: usize },
    Complete { liked: usize, disliked: usize },
}

/// What a committed swipe did.
#[derive(Debug, Clone, PartialEq)]
pub struct SwipeRecord {
    pub idea: Idea,
    pub direction: Direction,
    /// True when this swipe added the idea to favorites.
    pub auto_favorited: bool,
    pub completed: bool,
}

/// The swipeable queue for one generation batch, mirrored into the store after
/// every mutation.
pub struct Deck {
    session: Option<DeckSession>,
    loading: bool,
    favorite_ids: HashSet<String>,
    store: IdeaStore,
}

impl Deck {
    pub fn new(store: IdeaStore) -> Self {
        Self {
            session: None,
            loading: false,
            favorite_ids: HashSet::new(),
            store,
        }
    }

    /// Restores the persisted session (if any) and the known favorite ids.
    pub fn resume(store: IdeaStore) -> Self {
        let session = store.load_session();
        let favorite_ids = store.list_favorites().into_iter().map(|f| f.id).collect();
        if let Some(s) = &session {
            tracing::debug!(index = s.current_index, total = s.ideas.len(), "deck resumed");
        }
        Self {
            session,
            loading: false,
            favorite_ids,
            store,
        }
    }

    pub fn state(&self) -> DeckState {
        if self.loading {
            return DeckState::Loading;
        }
        match &self.session {
            None => DeckState::Empty,
            Some(s) if s.ideas.is_empty() => DeckState::Empty,
            Some(s) if s.is_complete() => DeckState::Complete {
                liked: s.results.liked.len(),
                disliked: s.results.disliked.len(),
            },
            Some(s) => DeckState::Active {
                index: s.current_index,
                total: s.ideas.len(),
            },
        }
    }

    pub fn current_idea(&self) -> Option<&Idea> {
        self.session.as_ref().and_then(|s| s.current())
    }

    /// `(current_index, total)`; `(0, 0)` when empty.
    pub fn progress(&self) -> (usize, usize) {
        self.session
            .as_ref()
            .map(|s| (s.current_index, s.ideas.len()))
            .unwrap_or((0, 0))
    }

    pub fn results(&self) -> SwipeResults {
        self.session
            .as_ref()
            .map(|s| s.results.clone())
            .unwrap_or_default()
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorite_ids.contains(id)
    }

    /// Enters `Loading`. A second request while one is in flight is refused.
    pub fn begin_generation(&mut self) -> IdeaSwipeResult<()> {
        if self.loading {
            return Err(IdeaSwipeError::DeckBusy);
        }
        self.loading = true;
        tracing::debug!("deck loading");
        Ok(())
    }

    /// Applies a generation outcome. Success replaces the deck wholesale;
    /// failure leaves the previous deck exactly as it was.
    pub fn finish_generation(
        &mut self,
        outcome: IdeaSwipeResult<Vec<Idea>>,
    ) -> IdeaSwipeResult<()> {
        self.loading = false;
        let ideas = outcome?;
        tracing::info!(count = ideas.len(), "new deck loaded");
        self.store.clear_session();
        self.session = Some(DeckSession::new(ideas));
        self.flush();
        Ok(())
    }

    /// Records the current idea under `direction` and advances. Returns `None`
    /// when there is nothing to swipe or a generation is in flight.
    pub fn swipe(&mut self, direction: Direction) -> Option<SwipeRecord> {
        if self.loading {
            tracing::debug!("swipe ignored while loading");
            return None;
        }
        let session = self.session.as_mut()?;
        let idea = session.current()?.clone();

        let mut auto_favorited = false;
        match direction {
            Direction::Right => {
                if !self.favorite_ids.contains(&idea.id) {
                    self.store.add_favorite(&idea);
                    self.favorite_ids.insert(idea.id.clone());
                    auto_favorited = true;
                }
                session.results.liked.push(idea.clone());
            }
            Direction::Left => session.results.disliked.push(idea.clone()),
        }
        session.current_index += 1;
        session.touch();
        let completed = session.is_complete();

        tracing::debug!(
            id = %idea.id,
            ?direction,
            index = session.current_index,
            completed,
            "swiped"
        );
        self.flush();

        Some(SwipeRecord {
            idea,
            direction,
            auto_favorited,
            completed,
        })
    }

    /// Drops the deck in memory and in the store.
    pub fn reset(&mut self) {
        self.session = None;
        self.store.clear_session();
        tracing::debug!("deck reset");
    }

    /// Flips the favorite status of `idea`; returns the new status.
    pub fn toggle_favorite(&mut self, idea: &Idea) -> bool {
        if self.favorite_ids.remove(&idea.id) {
            self.store.remove_favorite(&idea.id);
            false
        } else {
            self.store.add_favorite(idea);
            self.favorite_ids.insert(idea.id.clone());
            true
        }
    }

    fn flush(&self) {
        match &self.session {
            Some(s) if !s.ideas.is_empty() => self.store.save_session(s),
            _ => self.store.clear_session(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::deck::store::MemoryStore;
    use crate::ideas::types::sample_idea;

    fn batch(n: usize) -> Vec<Idea> {
        (1..=n).map(|i| sample_idea(&format!("idea-t-{i}"))).collect()
    }

    fn store() -> IdeaStore {
        IdeaStore::new(Arc::new(MemoryStore::new()))
    }

    fn loaded(store: &IdeaStore, n: usize) -> Deck {
        let mut deck = Deck::new(store.clone());
        deck.begin_generation().unwrap();
        deck.finish_generation(Ok(batch(n))).unwrap();
        deck
    }

    fn assert_partition(deck: &Deck) {
        let (index, _) = deck.progress();
        assert_eq!(deck.results().len(), index);
    }

    #[test]
    fn empty_deck_ignores_swipes() {
        let mut deck = Deck::new(store());
        assert_eq!(deck.state(), DeckState::Empty);
        assert!(deck.swipe(Direction::Right).is_none());
        assert_eq!(deck.progress(), (0, 0));
    }

    #[test]
    fn generation_lifecycle() {
        let s = store();
        let mut deck = Deck::new(s.clone());
        deck.begin_generation().unwrap();
        assert_eq!(deck.state(), DeckState::Loading);
        assert!(matches!(deck.begin_generation(), Err(IdeaSwipeError::DeckBusy)));
        assert!(deck.swipe(Direction::Left).is_none());

        deck.finish_generation(Ok(batch(10))).unwrap();
        assert_eq!(
            deck.state(),
            DeckState::Active {
                index: 0,
                total: 10
            }
        );
        assert_eq!(s.load_session().unwrap().ideas.len(), 10);
    }

    #[test]
    fn failed_generation_returns_to_empty() {
        let s = store();
        let mut deck = Deck::new(s.clone());
        deck.begin_generation().unwrap();
        let err = deck.finish_generation(Err(IdeaSwipeError::Generation("boom".into())));
        assert!(err.is_err());
        assert_eq!(deck.state(), DeckState::Empty);
        assert!(s.load_session().is_none());
    }

    #[test]
    fn failed_generation_keeps_existing_deck() {
        let s = store();
        let mut deck = loaded(&s, 10);
        deck.swipe(Direction::Left);
        deck.begin_generation().unwrap();
        let _ = deck.finish_generation(Err(IdeaSwipeError::Generation("boom".into())));
        assert_eq!(
            deck.state(),
            DeckState::Active {
                index: 1,
                total: 10
            }
        );
        assert_eq!(s.load_session().unwrap().current_index, 1);
    }

    #[test]
    fn three_right_seven_left_completes() {
        let s = store();
        let mut deck = loaded(&s, 10);
        for i in 0..10 {
            let dir = if i < 3 { Direction::Right } else { Direction::Left };
            let record = deck.swipe(dir).unwrap();
            assert_eq!(record.completed, i == 9);
            assert_partition(&deck);
        }
        assert_eq!(deck.progress(), (10, 10));
        assert_eq!(
            deck.state(),
            DeckState::Complete {
                liked: 3,
                disliked: 7
            }
        );
        assert_eq!(s.list_favorites().len(), 3);
        assert!(deck.swipe(Direction::Right).is_none());
        assert_eq!(deck.progress(), (10, 10));
    }

    #[test]
    fn index_is_monotonic() {
        let mut deck = loaded(&store(), 4);
        let mut last = 0;
        for dir in [Direction::Left, Direction::Right, Direction::Left, Direction::Right] {
            deck.swipe(dir);
            let (index, _) = deck.progress();
            assert!(index > last);
            last = index;
        }
    }

    #[test]
    fn right_swipe_auto_favorites_left_does_not() {
        let s = store();
        let mut deck = loaded(&s, 3);
        let left = deck.swipe(Direction::Left).unwrap();
        assert!(!left.auto_favorited);
        assert!(s.list_favorites().is_empty());

        let right = deck.swipe(Direction::Right).unwrap();
        assert!(right.auto_favorited);
        assert!(s.is_favorited(&right.idea.id));
        assert!(deck.is_favorite(&right.idea.id));
    }

    #[test]
    fn right_swipe_on_existing_favorite_does_not_duplicate() {
        let s = store();
        let mut deck = loaded(&s, 2);
        let first = deck.current_idea().unwrap().clone();
        assert!(deck.toggle_favorite(&first));
        let record = deck.swipe(Direction::Right).unwrap();
        assert!(!record.auto_favorited);
        assert_eq!(s.list_favorites().len(), 1);
    }

    #[test]
    fn toggle_favorite_leaves_progress_alone() {
        let s = store();
        let mut deck = loaded(&s, 3);
        deck.swipe(Direction::Left);
        let idea = deck.current_idea().unwrap().clone();
        assert!(deck.toggle_favorite(&idea));
        assert!(!deck.toggle_favorite(&idea));
        assert!(s.list_favorites().is_empty());
        assert_eq!(deck.progress(), (1, 3));
        assert_eq!(deck.results().len(), 1);
    }

    #[test]
    fn reset_clears_memory_and_store() {
        let s = store();
        let mut deck = loaded(&s, 3);
        deck.swipe(Direction::Right);
        deck.reset();
        assert_eq!(deck.state(), DeckState::Empty);
        assert_eq!(deck.progress(), (0, 0));
        assert!(deck.results().is_empty());
        assert!(s.load_session().is_none());
        // Favorites outlive the deck.
        assert_eq!(s.list_favorites().len(), 1);
    }

    #[test]
    fn new_generation_replaces_prior_session() {
        let s = store();
        let mut deck = loaded(&s, 3);
        deck.swipe(Direction::Left);
        deck.begin_generation().unwrap();
        deck.finish_generation(Ok(batch(10))).unwrap();
        assert_eq!(deck.progress(), (0, 10));
        assert!(deck.results().is_empty());
        assert_eq!(s.load_session().unwrap().current_index, 0);
    }

    #[test]
    fn resume_continues_at_stored_index() {
        let s = store();
        let ideas = batch(2);
        s.save_session(&DeckSession {
            ideas: ideas.clone(),
            current_index: 1,
            results: SwipeResults {
                liked: vec![ideas[0].clone()],
                disliked: vec![],
            },
            timestamp: 0,
        });
        let deck = Deck::resume(s);
        assert_eq!(deck.current_idea(), Some(&ideas[1]));
        assert_eq!(
            deck.state(),
            DeckState::Active {
                index: 1,
                total: 2
            }
        );
    }

    #[test]
    fn resume_picks_up_favorite_ids() {
        let s = store();
        s.add_favorite(&sample_idea("idea-t-1"));
        let mut deck = Deck::resume(s.clone());
        assert!(deck.is_favorite("idea-t-1"));
        deck.begin_generation().unwrap();
        deck.finish_generation(Ok(batch(1))).unwrap();
        assert!(!deck.swipe(Direction::Right).unwrap().auto_favorited);
    }

    #[test]
    fn favorites_and_session_may_diverge() {
        let s = store();
        let mut deck = loaded(&s, 2);
        deck.swipe(Direction::Right);

        // Rewrite the favorite copy; the deck's copy is unaffected.
        let mut favorites = s.list_favorites();
        favorites[0].title = "Renamed".into();
        s.remove_favorite(&favorites[0].id);
        s.add_favorite(&favorites[0]);

        let session = s.load_session().unwrap();
        assert_eq!(session.results.liked[0].title, "Idea idea-t-1");
        assert_eq!(s.list_favorites()[0].title, "Renamed");
    }
}
