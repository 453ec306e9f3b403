use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::client::{ChatClient, ChatSession, GenerationClient};
use crate::config::AppConfig;
use crate::deck::gesture::{Point, PointerTracker, Release};
use crate::deck::state::{Deck, DeckState, SwipeRecord};
use crate::deck::store::IdeaStore;
use crate::errors::{IdeaSwipeError, IdeaSwipeResult};
use crate::ideas::types::{Direction, Idea};
use crate::llm::types::StreamChunkKind;

/// Everything a client command needs: settings plus the local store.
pub struct ClientContext {
    pub config: AppConfig,
    pub store: IdeaStore,
}

impl ClientContext {
    pub fn new(config: AppConfig) -> Self {
        let store = IdeaStore::open_dir(&config.client.resolve_data_dir());
        Self { config, store }
    }

    fn generation_client(&self) -> GenerationClient {
        GenerationClient::new(&self.config.client.base_url, self.config.client.resolve_token())
    }

    fn chat_client(&self) -> ChatClient {
        ChatClient::new(&self.config.client.base_url, self.config.client.resolve_token())
    }
}

pub async fn generate(
    ctx: &ClientContext,
    model: Option<String>,
    prompt: Option<String>,
) -> IdeaSwipeResult<()> {
    let mut deck = Deck::resume(ctx.store.clone());
    let model = model.unwrap_or_else(|| ctx.config.client.model.clone());

    deck.begin_generation()?;
    println!("Generating ideas with {model}...");
    let outcome = ctx.generation_client().generate(&model, prompt.as_deref()).await;
    deck.finish_generation(outcome)?;

    print_deck(&deck);
    Ok(())
}

pub fn show(ctx: &ClientContext) -> IdeaSwipeResult<()> {
    let deck = Deck::resume(ctx.store.clone());
    print_deck(&deck);
    Ok(())
}

pub fn swipe(ctx: &ClientContext, direction: Direction) -> IdeaSwipeResult<()> {
    let mut deck = Deck::resume(ctx.store.clone());
    apply_swipe(&mut deck, direction);
    Ok(())
}

/// Replays a pointer drag given as `dx,dy` offsets from the press point.
pub async fn drag(ctx: &ClientContext, moves: &[String]) -> IdeaSwipeResult<()> {
    let points = moves
        .iter()
        .map(|m| parse_point(m))
        .collect::<IdeaSwipeResult<Vec<_>>>()?;

    let mut deck = Deck::resume(ctx.store.clone());
    if deck.current_idea().is_none() {
        println!("Nothing to swipe.");
        return Ok(());
    }

    let tracker = PointerTracker::new(ctx.config.gesture.clone());
    match replay_drag(&mut deck, tracker, &points).await {
        Some(record) => report_swipe(&deck, &record),
        None => println!("Snapped back; no change."),
    }
    Ok(())
}

/// Drives `tracker` through `points` and, if the release commits, swipes the
/// deck after the exit delay.
async fn replay_drag(
    deck: &mut Deck,
    mut tracker: PointerTracker,
    points: &[Point],
) -> Option<SwipeRecord> {
    tracker.press(Point::default());
    for point in points {
        let update = tracker.move_to(*point);
        let hint = match update.feedback {
            Some(f) => format!("{f:?}"),
            None => "-".into(),
        };
        println!(
            "  offset ({:>6.1}, {:>6.1})  feedback {hint}{}",
            update.offset.x,
            update.offset.y,
            if update.suppress_scroll { "" } else { "  (scroll)" }
        );
    }

    match tracker.release() {
        Release::Commit(direction) => {
            tokio::time::sleep(tracker.exit_delay()).await;
            deck.swipe(direction)
        }
        Release::SnapBack => None,
    }
}

pub fn reset(ctx: &ClientContext) -> IdeaSwipeResult<()> {
    let mut deck = Deck::resume(ctx.store.clone());
    deck.reset();
    println!("Deck cleared. Favorites are kept.");
    Ok(())
}

/// Toggles the favorite flag of the card currently on top.
pub fn toggle_current(ctx: &ClientContext) -> IdeaSwipeResult<()> {
    let mut deck = Deck::resume(ctx.store.clone());
    let Some(idea) = deck.current_idea().cloned() else {
        return Err(IdeaSwipeError::Validation("no card on top of the deck".into()));
    };
    if deck.toggle_favorite(&idea) {
        println!("★ Saved \"{}\"", idea.title);
    } else {
        println!("☆ Removed \"{}\" from favorites", idea.title);
    }
    Ok(())
}

pub fn list_favorites(ctx: &ClientContext) -> IdeaSwipeResult<()> {
    let favorites = ctx.store.list_favorites();
    if favorites.is_empty() {
        println!("No saved ideas yet. Swipe right on ideas you love to save them.");
        return Ok(());
    }
    for idea in &favorites {
        println!("{}  {}", idea.id, idea.title);
        println!("    {}", idea.description);
    }
    Ok(())
}

pub fn remove_favorite(ctx: &ClientContext, id: &str) -> IdeaSwipeResult<()> {
    ctx.store.remove_favorite(id);
    println!("Removed {id} (if it was saved).");
    Ok(())
}

pub fn send_to_chat(ctx: &ClientContext, id: &str) -> IdeaSwipeResult<()> {
    let idea = find_favorite(&ctx.store, id)?;
    ctx.store.stash_chat_prompt(&idea.chat_prompt());
    println!("Prompt for \"{}\" is ready. Run `ideaswipe chat` to send it.", idea.title);
    Ok(())
}

/// Interactive chat. The first turn is `message`, else the prompt stashed by
/// `send-to-chat`; later turns are read from stdin until an empty line or EOF.
pub async fn chat(
    ctx: &ClientContext,
    model: Option<String>,
    message: Option<String>,
) -> IdeaSwipeResult<()> {
    let mut next = first_turn(&ctx.store, message);
    let model = model.unwrap_or_else(|| ctx.config.client.model.clone());
    let mut session = ChatSession::new(ctx.chat_client(), model.as_str());
    println!("Chatting with {model}. Empty line to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let text = match next.take() {
            Some(text) => text,
            None => {
                print!("> ");
                let _ = std::io::stdout().flush();
                match lines.next_line().await? {
                    Some(line) if !line.trim().is_empty() => line,
                    _ => break,
                }
            }
        };
        chat_turn(&mut session, &text).await?;
    }
    Ok(())
}

/// The opening message: an explicit one wins over the stashed handoff, and the
/// handoff is consumed either way.
fn first_turn(store: &IdeaStore, message: Option<String>) -> Option<String> {
    let handoff = store.take_chat_prompt();
    message.filter(|m| !m.trim().is_empty()).or(handoff)
}

async fn chat_turn(session: &mut ChatSession, text: &str) -> IdeaSwipeResult<()> {
    let mut sources = Vec::new();
    let mut thinking = false;
    let mut stdout = std::io::stdout();
    session
        .ask(text, |chunk| match chunk.kind {
            StreamChunkKind::Reasoning => {
                if !thinking {
                    print!("(thinking) ");
                    thinking = true;
                }
                print!("{}", chunk.content);
                let _ = stdout.flush();
            }
            StreamChunkKind::Content => {
                if thinking {
                    println!();
                    thinking = false;
                }
                print!("{}", chunk.content);
                let _ = stdout.flush();
            }
            StreamChunkKind::Source => sources.push(chunk.content.clone()),
            _ => {}
        })
        .await?;
    println!();
    for source in sources {
        println!("source: {source}");
    }
    Ok(())
}

fn find_favorite(store: &IdeaStore, id: &str) -> IdeaSwipeResult<Idea> {
    store
        .list_favorites()
        .into_iter()
        .find(|f| f.id == id)
        .ok_or_else(|| IdeaSwipeError::Validation(format!("no saved idea with id '{id}'")))
}

fn parse_point(raw: &str) -> IdeaSwipeResult<Point> {
    let invalid = || IdeaSwipeError::Validation(format!("expected dx,dy but got '{raw}'"));
    let (x, y) = raw.split_once(',').ok_or_else(invalid)?;
    let x = x.trim().parse().map_err(|_| invalid())?;
    let y = y.trim().parse().map_err(|_| invalid())?;
    Ok(Point::new(x, y))
}

fn apply_swipe(deck: &mut Deck, direction: Direction) {
    match deck.swipe(direction) {
        Some(record) => report_swipe(deck, &record),
        None => println!("Nothing to swipe."),
    }
}

fn report_swipe(deck: &Deck, record: &SwipeRecord) {
    let verb = match record.direction {
        Direction::Right => "Loved",
        Direction::Left => "Passed",
    };
    println!("{verb} \"{}\"", record.idea.title);
    if record.auto_favorited {
        println!("★ Saved to favorites");
    }
    print_deck(deck);
}

fn print_deck(deck: &Deck) {
    match deck.state() {
        DeckState::Empty => println!("No ideas yet. Run `ideaswipe generate`."),
        DeckState::Loading => println!("Generating..."),
        DeckState::Complete { liked, disliked } => {
            println!("Session complete! Loved {liked}, passed {disliked}.");
            println!("Run `ideaswipe reset` then `ideaswipe generate` for fresh ideas.");
        }
        DeckState::Active { index, total } => {
            let Some(idea) = deck.current_idea() else { return };
            let star = if deck.is_favorite(&idea.id) { "★" } else { "☆" };
            println!();
            println!("[{} of {total}] {star} {}", index + 1, idea.title);
            println!("{}", idea.description);
            println!("Target audience: {}", idea.target_audience);
            for feature in &idea.features {
                println!("  • {feature}");
            }
            println!("AI capabilities: {}", idea.ai_capabilities);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::GestureConfig;
    use crate::deck::store::MemoryStore;
    use crate::ideas::types::sample_idea;

    fn loaded_deck() -> Deck {
        let mut deck = Deck::new(IdeaStore::new(Arc::new(MemoryStore::new())));
        deck.begin_generation().unwrap();
        let ideas = (1..=10).map(|i| sample_idea(&format!("idea-d-{i}"))).collect();
        deck.finish_generation(Ok(ideas)).unwrap();
        deck
    }

    fn tracker() -> PointerTracker {
        PointerTracker::new(GestureConfig {
            exit_delay_ms: 0,
            ..GestureConfig::default()
        })
    }

    #[test]
    fn explicit_message_still_consumes_handoff() {
        let store = IdeaStore::new(Arc::new(MemoryStore::new()));
        store.stash_chat_prompt("plan idea A");

        assert_eq!(first_turn(&store, Some("hello".into())).as_deref(), Some("hello"));
        assert_eq!(store.take_chat_prompt(), None);
        assert_eq!(first_turn(&store, None), None);
    }

    #[test]
    fn bare_chat_sends_handoff_once() {
        let store = IdeaStore::new(Arc::new(MemoryStore::new()));
        store.stash_chat_prompt("plan idea A");

        assert_eq!(first_turn(&store, Some("  ".into())).as_deref(), Some("plan idea A"));
        assert_eq!(first_turn(&store, None), None);
    }

    #[tokio::test]
    async fn drag_to_commit_threshold_leaves_deck_unchanged() {
        let mut deck = loaded_deck();
        let points = [Point::new(40.0, 2.0), Point::new(100.0, 3.0)];

        assert!(replay_drag(&mut deck, tracker(), &points).await.is_none());
        assert_eq!(deck.progress(), (0, 10));
        assert!(deck.results().is_empty());
    }

    #[tokio::test]
    async fn drag_past_commit_threshold_swipes() {
        let mut deck = loaded_deck();
        let points = [Point::new(-40.0, 2.0), Point::new(-101.0, 3.0)];

        let record = replay_drag(&mut deck, tracker(), &points).await.unwrap();
        assert_eq!(record.direction, Direction::Left);
        assert_eq!(deck.progress(), (1, 10));
        assert_eq!(deck.results().disliked.len(), 1);
    }

    #[test]
    fn parses_drag_points() {
        assert_eq!(parse_point("120,-4").unwrap(), Point::new(120.0, -4.0));
        assert_eq!(parse_point(" -30 , 2.5 ").unwrap(), Point::new(-30.0, 2.5));
        assert!(parse_point("120").is_err());
        assert!(parse_point("a,b").is_err());
    }
}
