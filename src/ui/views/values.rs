use crate::api::types::SensorValues;
use crate::api::Queries;
use crate::query::{QueryError, QuerySnapshot, Subscription};
use crate::ui::renderfns::{fit, query_lines};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// One `label: value` cell per sensor, all cells the same width so the row
/// spans `width` columns.
pub fn value_cells(values: &SensorValues, width: u16) -> Line<'static> {
  if values.is_empty() {
    return Line::default();
  }

  let cell_width = (width as usize / values.len()).max(1);
  let spans: Vec<Span> = values
    .readings()
    .iter()
    .map(|reading| {
      let text = format!("{}: {}", reading.label, reading.value);
      Span::styled(fit(&text, cell_width), Style::default().fg(Color::Green))
    })
    .collect();
  Line::from(spans)
}

/// Draw the sensor ticker for `snapshot` inside a bordered box.
pub fn render_values(frame: &mut Frame, area: Rect, snapshot: &QuerySnapshot<SensorValues>) {
  let block = Block::default()
    .title(" Değerler ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));
  let inner_width = block.inner(area).width;

  let lines = query_lines(snapshot, |values| vec![value_cells(values, inner_width)]);
  frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Live sensor values from `/values`
pub struct ValueTicker {
  values: Subscription<SensorValues>,
}

impl ValueTicker {
  pub fn new(queries: &Queries) -> Result<Self, QueryError> {
    Ok(Self {
      values: queries.values()?,
    })
  }
}

impl View for ValueTicker {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.values.refetch();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    render_values(frame, area, &self.values.snapshot());
  }

  fn breadcrumb_label(&self) -> String {
    "Values".to_string()
  }

  fn tick(&mut self) -> bool {
    self.values.poll()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use ratatui::backend::TestBackend;
  use serde_json::json;

  fn values(value: serde_json::Value) -> SensorValues {
    serde_json::from_value(value).unwrap()
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
  fn test_cells_split_width_evenly() {
    let line = value_cells(&values(json!({"Sıcaklık": 21, "Nem": 40.5})), 30);
    assert_eq!(line.spans.len(), 2);
    assert_eq!(line.spans[0].content, format!("{:<15}", "Sıcaklık: 21"));
    assert_eq!(line.spans[1].content, format!("{:<15}", "Nem: 40.5"));
  }

  #[test]
  fn test_empty_values_render_nothing() {
    assert!(value_cells(&values(json!({})), 30).spans.is_empty());
  }

  #[test]
  fn test_renders_label_and_value() {
    let mut terminal = Terminal::new(TestBackend::new(40, 3)).unwrap();
    let snapshot = QuerySnapshot::from_data(values(json!({"Sıcaklık": 21})));

    terminal
      .draw(|frame| render_values(frame, frame.area(), &snapshot))
      .unwrap();

    assert!(screen(&terminal).contains("Sıcaklık: 21"));
  }

  #[test]
  fn test_renders_loading_then_error() {
    let mut terminal = Terminal::new(TestBackend::new(40, 3)).unwrap();

    let loading = QuerySnapshot::<SensorValues>::loading();
    terminal
      .draw(|frame| render_values(frame, frame.area(), &loading))
      .unwrap();
    assert!(screen(&terminal).contains("Yükleniyor..."));

    let failed = QuerySnapshot::<SensorValues>::from_error("HTTP 503");
    terminal
      .draw(|frame| render_values(frame, frame.area(), &failed))
      .unwrap();
    assert!(screen(&terminal).contains("Hata oluştu: HTTP 503"));
  }
}
