use crate::api::Queries;
use crate::avatar::SharedAvatars;
use crate::query::QueryError;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{
  MessagesView, RunningModulesView, StatusGridView, StatusSelectorView, ValuePanelView,
  ValueTicker,
};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use tracing::error;

/// Root view: sensor ticker on top, status cards in the middle, message
/// terminal at the bottom
pub struct DashboardView {
  values: ValueTicker,
  statuses: StatusGridView,
  messages: MessagesView,
  queries: Queries,
  avatars: SharedAvatars,
}

impl DashboardView {
  pub fn new(queries: &Queries, avatars: SharedAvatars) -> Result<Self, QueryError> {
    Ok(Self {
      values: ValueTicker::new(queries)?,
      statuses: StatusGridView::new(queries)?,
      messages: MessagesView::new(queries)?,
      queries: queries.clone(),
      avatars,
    })
  }

  fn push<V: View + 'static>(view: Result<V, QueryError>) -> ViewAction {
    match view {
      Ok(view) => ViewAction::Push(Box::new(view)),
      Err(e) => {
        error!(error = %e, "failed to open view");
        ViewAction::None
      }
    }
  }
}

impl View for DashboardView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        // Every panel handles 'r' as refresh and nothing else
        self.values.handle_key(key);
        self.statuses.handle_key(key);
        self.messages.handle_key(key);
        ViewAction::None
      }
      // Scrolling goes to the message terminal
      KeyCode::Char('j') | KeyCode::Char('k') | KeyCode::Char('g') | KeyCode::Up
      | KeyCode::Down | KeyCode::Home => self.messages.handle_key(key),
      KeyCode::Char('s') => {
        Self::push(StatusSelectorView::new(&self.queries, self.avatars.clone()))
      }
      KeyCode::Char('m') => Self::push(RunningModulesView::new(&self.queries)),
      KeyCode::Char('p') => Self::push(Ok(ValuePanelView::new(&self.queries))),
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(3),      // Value ticker
        Constraint::Min(6),         // Status grid
        Constraint::Percentage(30), // Messages
      ])
      .split(area);

    self.values.render(frame, chunks[0]);
    self.statuses.render(frame, chunks[1]);
    self.messages.render(frame, chunks[2]);
  }

  fn breadcrumb_label(&self) -> String {
    "Dashboard".to_string()
  }

  fn tick(&mut self) -> bool {
    self.values.tick() | self.statuses.tick() | self.messages.tick()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("s", "selector").with_priority(12),
      ShortcutInfo::new("m", "modules").with_priority(13),
      ShortcutInfo::new("p", "panel").with_priority(14),
      ShortcutInfo::new("j/k", "scroll messages").with_priority(15),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("q", "quit").with_priority(30),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::test_server::unreachable;
  use crate::api::ApiClient;
  use crate::avatar::AvatarRotation;
  use crate::config::{ApiConfig, PollingConfig};
  use crossterm::event::KeyModifiers;

  fn key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
  }

  #[tokio::test]
  async fn test_shortcuts_push_views() {
    let api = ApiClient::new(&ApiConfig {
      base_url: unreachable().await,
      timeout_ms: 200,
    })
    .unwrap();
    let queries = Queries::new(api, PollingConfig::default());
    let mut view = DashboardView::new(&queries, AvatarRotation::shared()).unwrap();

    for (c, label) in [('s', "Selector"), ('m', "Modules"), ('p', "Panel")] {
      match view.handle_key(key(c)) {
        ViewAction::Push(pushed) => assert!(pushed.breadcrumb_label().starts_with(label)),
        _ => panic!("'{}' should push a view", c),
      }
    }
    assert!(matches!(view.handle_key(key('x')), ViewAction::None));
    assert!(matches!(view.handle_key(key('q')), ViewAction::Pop));
  }
}
