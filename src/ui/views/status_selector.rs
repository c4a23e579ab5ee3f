use crate::api::types::{ModuleAuthorMapping, StatusBoard, StatusMessage};
use crate::api::Queries;
use crate::avatar::{self, SharedAvatars};
use crate::query::{Mutation, QueryError, QuerySnapshot, QueryState, Subscription};
use crate::ui::components::{KeyResult, ModulePicker, ModulePickerEvent, PickerOption};
use crate::ui::renderfns::query::error_text;
use crate::ui::renderfns::{error_line, query_lines, LOADING_TEXT};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::status_grid::{render_cards, status_card_lines};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tracing::info;

/// Picker entry that shows every status
pub const EVERYONE: &str = "Herkes";

/// Shown when the chosen module has no status
pub const NO_STATUS_TEXT: &str = "Seçtiğiniz kişi durum belirtmemiş";

/// Statuses visible for `selected`: all of them for [`EVERYONE`], otherwise
/// those whose author is the module id or its display name.
pub fn selected_statuses<'a>(
  board: &'a StatusBoard,
  selected: &str,
  mapping: Option<&ModuleAuthorMapping>,
) -> Vec<&'a StatusMessage> {
  if selected == EVERYONE {
    return board.statuses().iter().collect();
  }

  let display = mapping.map(|m| m.display_name(selected)).unwrap_or(selected);
  board
    .statuses()
    .iter()
    .filter(|s| s.author == selected || s.author == display)
    .collect()
}

/// Picker rows: [`EVERYONE`] first, then every module under its display
/// name. The hint row reports the module list still loading or failed.
pub fn picker_options(
  modules: &QuerySnapshot<Vec<String>>,
  mapping: Option<&ModuleAuthorMapping>,
) -> (Vec<PickerOption>, Option<String>) {
  let mut options = vec![PickerOption::new(EVERYONE, EVERYONE)];
  if let Some(modules) = modules.data() {
    options.extend(modules.iter().map(|module| {
      let label = mapping.map(|m| m.display_name(module)).unwrap_or(module);
      PickerOption::new(module.as_str(), label)
    }));
  }

  let hint = match modules.state() {
    QueryState::Loading => Some(LOADING_TEXT.to_string()),
    QueryState::Error(message) => Some(error_text(message)),
    QueryState::Success(_) => None,
  };
  (options, hint)
}

/// Pick a module, announce it to the backend and read its status cards
pub struct StatusSelectorView {
  statuses: Subscription<StatusBoard>,
  modules: Subscription<Vec<String>>,
  mapping: Subscription<ModuleAuthorMapping>,
  change_module: Mutation<String>,
  avatars: SharedAvatars,
  picker: ModulePicker,
  selected: String,
}

impl StatusSelectorView {
  pub fn new(queries: &Queries, avatars: SharedAvatars) -> Result<Self, QueryError> {
    let mut view = Self {
      statuses: queries.statuses()?,
      modules: queries.all_modules()?,
      mapping: queries.module_author_mapping()?,
      change_module: queries.change_module(),
      avatars,
      picker: ModulePicker::new("Modül"),
      selected: EVERYONE.to_string(),
    };
    view.refresh_picker();
    // The backend learns the current choice as soon as the selector opens
    view.change_module.mutate(view.selected.clone());
    Ok(view)
  }

  #[cfg(test)]
  pub fn selected(&self) -> &str {
    &self.selected
  }

  fn select(&mut self, module: String) {
    info!(module = %module, "module selected");
    self.selected = module;
    // Outcome only shows up in the status line; the choice stands either way
    self.change_module.mutate(self.selected.clone());
  }

  fn refresh_picker(&mut self) {
    let modules = self.modules.snapshot();
    let mapping = self.mapping.snapshot();
    let (options, hint) = picker_options(&modules, mapping.data());
    self.picker.set_options(options, hint);
  }

  fn selected_label(&self) -> String {
    let mapping = self.mapping.snapshot();
    match mapping.data() {
      Some(mapping) => mapping.display_name(&self.selected).to_string(),
      None => self.selected.clone(),
    }
  }

  fn render_selection(&self, frame: &mut Frame, area: Rect) {
    let mutation = self.change_module.snapshot();
    let mut spans = vec![
      Span::styled(" Modül: ", Style::default().fg(Color::DarkGray)),
      Span::styled(self.selected_label(), Style::default().fg(Color::Cyan).bold()),
    ];
    if mutation.is_pending() {
      spans.push(Span::styled("  gönderiliyor...", Style::default().fg(Color::DarkGray)));
    } else if let Some(error) = &mutation.error {
      spans.push(Span::raw("  "));
      spans.extend(error_line(error).spans);
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
  }

  fn render_cards(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Durum ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let snapshot = self.statuses.snapshot();
    let mapping = self.mapping.snapshot();
    let cards = match snapshot.state() {
      QueryState::Success(board) => {
        let visible = selected_statuses(board, &self.selected, mapping.data());
        if visible.is_empty() {
          Err(vec![Line::styled(NO_STATUS_TEXT, Style::default().fg(Color::Yellow))])
        } else {
          Ok(
            visible
              .into_iter()
              .map(|status| {
                let slot = avatar::slot(&self.avatars, &status.author);
                status_card_lines(status, Some(slot))
              })
              .collect(),
          )
        }
      }
      _ => Err(query_lines(&snapshot, |_| Vec::new())),
    };
    render_cards(frame, inner, cards);
  }

  // Key handling helpers for or_else chain pattern
  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    let result = self.picker.handle_key(key);
    if !result.is_consumed() {
      return None;
    }
    if let KeyResult::Event(ModulePickerEvent::Selected(module)) = result {
      self.select(module);
    }
    Some(ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Enter | KeyCode::Char('s') => {
        self.picker.show(&self.selected);
        Some(ViewAction::None)
      }
      KeyCode::Char('r') => {
        self.statuses.refetch();
        self.modules.refetch();
        self.mapping.refetch();
        Some(ViewAction::None)
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }
}

impl View for StatusSelectorView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_overlays(key)
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(area);

    self.render_selection(frame, chunks[0]);
    self.render_cards(frame, chunks[1]);
    self.picker.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("Selector [{}]", self.selected_label())
  }

  fn tick(&mut self) -> bool {
    let lists_changed = self.modules.poll() | self.mapping.poll();
    if lists_changed {
      self.refresh_picker();
    }
    // The mutation has no subscription to poll; its line is cheap to redraw
    self.statuses.poll() | lists_changed | self.change_module.is_pending()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("enter", "select module").with_priority(15),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::test_server::{serve, unreachable};
  use crate::api::ApiClient;
  use crate::avatar::AvatarRotation;
  use crate::config::{ApiConfig, PollingConfig};
  use axum::http::StatusCode;
  use axum::routing::get;
  use axum::{Json, Router};
  use crossterm::event::KeyModifiers;
  use ratatui::backend::TestBackend;
  use serde_json::json;

  fn board(value: serde_json::Value) -> StatusBoard {
    serde_json::from_value(value).unwrap()
  }

  fn queries(base_url: &str) -> Queries {
    let api = ApiClient::new(&ApiConfig {
      base_url: base_url.to_string(),
      timeout_ms: 2000,
    })
    .unwrap();
    Queries::new(
      api,
      PollingConfig {
        interval_ms: 50,
        retry_count: 0,
        retry_delay_ms: 10,
        ..PollingConfig::default()
      },
    )
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn screen(terminal: &Terminal<TestBackend>) -> String {
    let buffer = terminal.backend().buffer();
    let width = buffer.area.width as usize;
    buffer
      .content()
      .chunks(width)
      .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
      .collect::<Vec<_>>()
      .join("\n")
  }

  #[test]
  fn test_everyone_sees_all() {
    let board = board(json!({
      "alice": {"author": "alice", "title": "t", "content": "c"},
      "bob": [{"author": "bob", "title": "t", "content": "c"}]
    }));
    assert_eq!(selected_statuses(&board, EVERYONE, None).len(), 2);
  }

  #[test]
  fn test_module_matches_id_or_display_name() {
    let board = board(json!([
      {"author": "Ayşe", "title": "t", "content": "c"},
      {"author": "mod_b", "title": "t", "content": "c"},
    ]));
    let mapping: ModuleAuthorMapping = [("mod_a".to_string(), "Ayşe".to_string())]
      .into_iter()
      .collect();

    let visible = selected_statuses(&board, "mod_a", Some(&mapping));
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].author, "Ayşe");

    assert_eq!(selected_statuses(&board, "mod_b", Some(&mapping)).len(), 1);
    assert!(selected_statuses(&board, "mod_c", Some(&mapping)).is_empty());
  }

  #[test]
  fn test_picker_shows_loading_hint() {
    let (options, hint) = picker_options(&QuerySnapshot::loading(), None);
    assert_eq!(options, vec![PickerOption::new(EVERYONE, EVERYONE)]);
    assert_eq!(hint.as_deref(), Some(LOADING_TEXT));
  }

  #[test]
  fn test_picker_maps_display_names() {
    let modules = QuerySnapshot::from_data(vec!["mod_a".to_string(), "mod_b".to_string()]);
    let mapping: ModuleAuthorMapping = [("mod_a".to_string(), "Ayşe".to_string())]
      .into_iter()
      .collect();

    let (options, hint) = picker_options(&modules, Some(&mapping));
    assert!(hint.is_none());
    assert_eq!(options[1], PickerOption::new("mod_a", "Ayşe"));
    assert_eq!(options[2], PickerOption::new("mod_b", "mod_b"));
  }

  #[tokio::test]
  async fn test_everyone_renders_single_card() {
    let router = Router::new()
      .route(
        "/api/statuses",
        get(|| async { Json(json!({"alice": {"author": "alice", "title": "Hazır", "content": "ok"}})) }),
      )
      .route("/api/all_modules", get(|| async { Json(json!(["alice"])) }))
      .route("/api/module_author_mapping", get(|| async { Json(json!({})) }))
      .route("/api/change_module", axum::routing::post(|| async { Json(json!(null)) }));
    let queries = queries(&serve(router).await);

    let mut view = StatusSelectorView::new(&queries, AvatarRotation::shared()).unwrap();
    let mut statuses = queries.statuses().unwrap();
    statuses.wait_for(|s| s.data.is_some()).await;
    view.tick();

    let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
    terminal.draw(|frame| view.render(frame, frame.area())).unwrap();

    let screen = screen(&terminal);
    assert_eq!(screen.matches("alice").count(), 1);
    assert!(screen.contains("Hazır"));
    assert!(!screen.contains(NO_STATUS_TEXT));
  }

  #[tokio::test]
  async fn test_failed_change_module_keeps_selection() {
    let router = Router::new()
      .route("/api/statuses", get(|| async { Json(json!([])) }))
      .route("/api/all_modules", get(|| async { Json(json!(["mod_a"])) }))
      .route("/api/module_author_mapping", get(|| async { Json(json!({"mod_a": "Ayşe"})) }))
      .route(
        "/api/change_module",
        axum::routing::post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
      );
    let queries = queries(&serve(router).await);

    let mut view = StatusSelectorView::new(&queries, AvatarRotation::shared()).unwrap();
    let mut modules = queries.all_modules().unwrap();
    modules.wait_for(|s| s.terminal).await;
    let mut mapping = queries.module_author_mapping().unwrap();
    mapping.wait_for(|s| s.terminal).await;
    let mut statuses = queries.statuses().unwrap();
    statuses.wait_for(|s| s.data.is_some()).await;
    view.tick();

    // Herkes, then mod_a
    view.handle_key(key(KeyCode::Enter));
    view.handle_key(key(KeyCode::Down));
    view.handle_key(key(KeyCode::Enter));
    assert_eq!(view.selected(), "mod_a");

    let mut changes = queries.change_module().watch();
    changes.wait_for(|s| !s.is_pending()).await.unwrap();
    assert!(queries.change_module().is_error());
    assert_eq!(view.selected(), "mod_a");
    assert_eq!(view.breadcrumb_label(), "Selector [Ayşe]");

    let mut terminal = Terminal::new(TestBackend::new(60, 8)).unwrap();
    terminal.draw(|frame| view.render(frame, frame.area())).unwrap();
    let screen = screen(&terminal);
    assert!(screen.contains("Hata oluştu"));
    assert!(screen.contains(NO_STATUS_TEXT));
  }

  #[tokio::test]
  async fn test_unreachable_backend_keeps_ui_running() {
    let queries = queries(&unreachable().await);

    let mut view = StatusSelectorView::new(&queries, AvatarRotation::shared()).unwrap();
    let mut statuses = queries.statuses().unwrap();
    statuses.wait_for(|s| s.is_error()).await;
    view.tick();

    let mut terminal = Terminal::new(TestBackend::new(60, 8)).unwrap();
    terminal.draw(|frame| view.render(frame, frame.area())).unwrap();
    assert!(screen(&terminal).contains("Hata oluştu"));
    assert_eq!(view.selected(), EVERYONE);
  }
}
