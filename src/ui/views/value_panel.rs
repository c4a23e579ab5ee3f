use crate::api::Queries;
use crate::query::{Mutation, MutationState};
use crate::ui::components::{InputResult, TextInput};
use crate::ui::renderfns::error_line;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tokio::sync::watch;

/// Simulated sensors, in display order
pub const SENSOR_LABELS: [&str; 10] = [
  "Sıcaklık",
  "Nem",
  "Işık",
  "Mesafe",
  "Nabız",
  "Hava Kalitesi",
  "Gaz",
  "Titreşim",
  "Yağmur",
  "Yakınlık",
];

const LABEL_WIDTH: usize = 15;

/// Numeric inputs for every simulated sensor. Any edit posts the whole set
/// to `set_data`.
pub struct ValuePanelView {
  inputs: Vec<TextInput>,
  focused: usize,
  set_data: Mutation<Vec<(String, String)>>,
  status: watch::Receiver<MutationState<()>>,
}

impl ValuePanelView {
  pub fn new(queries: &Queries) -> Self {
    let set_data = queries.set_data();
    let status = set_data.watch();
    let view = Self {
      inputs: SENSOR_LABELS
        .iter()
        .map(|_| TextInput::numeric().with_value("0"))
        .collect(),
      focused: 0,
      set_data,
      status,
    };
    // Backend starts from the panel's values, not from whatever it had
    view.publish();
    view
  }

  /// `(label, value)` for every sensor, in display order
  pub fn values(&self) -> Vec<(String, String)> {
    SENSOR_LABELS
      .iter()
      .zip(&self.inputs)
      .map(|(label, input)| (label.to_string(), input.value().to_string()))
      .collect()
  }

  fn publish(&self) {
    self.set_data.mutate(self.values());
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    let count = self.inputs.len();
    match key.code {
      KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => {
        self.focused = (self.focused + 1) % count;
        Some(ViewAction::None)
      }
      KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => {
        self.focused = (self.focused + count - 1) % count;
        Some(ViewAction::None)
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }

  fn handle_input(&mut self, key: KeyEvent) -> Option<ViewAction> {
    let result = self.inputs[self.focused].handle_key(key);
    match result {
      InputResult::Changed => {
        self.publish();
        Some(ViewAction::None)
      }
      InputResult::Consumed | InputResult::Submitted(_) | InputResult::Cancelled => {
        Some(ViewAction::None)
      }
      InputResult::NotHandled => None,
    }
  }

  fn status_line(&self) -> Line<'static> {
    let state = self.set_data.snapshot();
    if state.is_pending() {
      Line::styled("gönderiliyor...", Style::default().fg(Color::DarkGray))
    } else if let Some(error) = &state.error {
      error_line(error)
    } else {
      Line::default()
    }
  }
}

impl View for ValuePanelView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_navigation(key)
      .or_else(|| self.handle_input(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let mut lines: Vec<Line> = SENSOR_LABELS
      .iter()
      .zip(&self.inputs)
      .enumerate()
      .map(|(i, (label, input))| {
        let focused = i == self.focused;
        let label_style = if focused {
          Style::default().fg(Color::Yellow).bold()
        } else {
          Style::default().fg(Color::White)
        };
        let mut spans = vec![
          Span::styled(if focused { "> " } else { "  " }, label_style),
          Span::styled(format!("{:<width$}", label, width = LABEL_WIDTH), label_style),
          Span::styled(input.value().to_string(), Style::default().fg(Color::Cyan)),
        ];
        if focused {
          spans.push(Span::styled("_", Style::default().fg(Color::Yellow))); // Cursor
        }
        Line::from(spans)
      })
      .collect();
    lines.push(Line::default());
    lines.push(self.status_line());

    let paragraph = Paragraph::new(lines).block(
      Block::default()
        .title(" Sensör paneli ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue)),
    );
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Panel".to_string()
  }

  fn tick(&mut self) -> bool {
    match self.status.has_changed() {
      Ok(true) => {
        self.status.borrow_and_update();
        true
      }
      _ => false,
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("j/k", "move").with_priority(15),
      ShortcutInfo::new("0-9", "edit").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::test_server::serve;
  use crate::api::ApiClient;
  use crate::config::{ApiConfig, PollingConfig};
  use axum::extract::State;
  use axum::routing::post;
  use axum::{Json, Router};
  use crossterm::event::KeyModifiers;
  use serde_json::{json, Value};
  use std::sync::{Arc, Mutex};

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  async fn panel_with_backend() -> (ValuePanelView, Queries, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
      .route(
        "/api/set_data",
        post(
          |State(seen): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
            seen.lock().unwrap().push(body);
          },
        ),
      )
      .with_state(seen.clone());
    let api = ApiClient::new(&ApiConfig {
      base_url: serve(router).await,
      timeout_ms: 2000,
    })
    .unwrap();
    let queries = Queries::new(api, PollingConfig::default());
    (ValuePanelView::new(&queries), queries, seen)
  }

  async fn settle(queries: &Queries) {
    let mut rx = queries.set_data().watch();
    rx.wait_for(|s| !s.is_pending()).await.unwrap();
  }

  #[tokio::test]
  async fn test_posts_defaults_on_open() {
    let (_view, queries, seen) = panel_with_backend().await;
    settle(&queries).await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["Sıcaklık"], json!("0"));
    assert_eq!(seen[0]["Yakınlık"], json!("0"));
    assert_eq!(seen[0].as_object().unwrap().len(), SENSOR_LABELS.len());
  }

  #[tokio::test]
  async fn test_edit_posts_full_mapping() {
    let (mut view, queries, seen) = panel_with_backend().await;
    settle(&queries).await;

    view.handle_key(key(KeyCode::Down));
    view.handle_key(key(KeyCode::Char('5')));
    view.handle_key(key(KeyCode::Char('x')));
    settle(&queries).await;

    assert_eq!(view.values()[1], ("Nem".to_string(), "05".to_string()));
    let seen = seen.lock().unwrap();
    // Opening post plus one for the digit; the rejected letter posts nothing
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1]["Nem"], json!("05"));
    assert_eq!(seen[1]["Sıcaklık"], json!("0"));
  }

  #[test]
  fn test_focus_wraps() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let _guard = runtime.enter();
    let queries = Queries::new(
      ApiClient::new(&ApiConfig::default()).unwrap(),
      PollingConfig::default(),
    );
    let mut view = ValuePanelView::new(&queries);

    view.handle_key(key(KeyCode::Up));
    assert_eq!(view.focused, SENSOR_LABELS.len() - 1);
    view.handle_key(key(KeyCode::Down));
    assert_eq!(view.focused, 0);
    assert!(matches!(view.handle_key(key(KeyCode::Esc)), ViewAction::Pop));
  }
}
