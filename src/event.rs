use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::warn;

/// How long the input reader blocks before checking for shutdown
const INPUT_POLL: Duration = Duration::from_millis(100);

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Terminal resized, redraw
  Resize,
  /// Periodic tick for query polling and garbage collection
  Tick,
}

/// Event handler that merges terminal input with a tick timer
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // crossterm's poll/read block, so the reader gets its own thread. It
    // exits within one poll period after the handler is dropped.
    let input_tx = tx.clone();
    tokio::task::spawn_blocking(move || loop {
      match event::poll(INPUT_POLL) {
        Ok(true) => {
          let event = match event::read() {
            Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Event::Key(key),
            Ok(CrosstermEvent::Resize(..)) => Event::Resize,
            Ok(_) => continue,
            Err(e) => {
              warn!(error = %e, "terminal read failed");
              break;
            }
          };
          if input_tx.send(event).is_err() {
            break;
          }
        }
        Ok(false) if input_tx.is_closed() => break,
        Ok(false) => {}
        Err(e) => {
          warn!(error = %e, "terminal poll failed");
          break;
        }
      }
    });

    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(tick_rate);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
      loop {
        ticker.tick().await;
        if tx.send(Event::Tick).is_err() {
          break;
        }
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
