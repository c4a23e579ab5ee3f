use crate::api::types::{StatusBoard, StatusMessage};
use crate::api::Queries;
use crate::avatar;
use crate::query::{QueryError, QueryState, Subscription};
use crate::ui::renderfns::{query_lines, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Columns a card is laid out for
const CARD_WIDTH: u16 = 42;

/// Lines of one status card: a header with author and title, then the
/// trimmed content. `avatar` prefixes the header with the author's glyph.
pub fn status_card_lines(status: &StatusMessage, avatar: Option<usize>) -> Vec<Line<'static>> {
  let mut header = Vec::new();
  if let Some(slot) = avatar {
    header.push(Span::styled(
      format!("{} ", avatar::glyph(slot)),
      Style::default().fg(avatar::color(slot)),
    ));
  }
  header.push(Span::styled(
    truncate(&status.author, 30),
    Style::default().fg(Color::Cyan).bold(),
  ));
  header.push(Span::raw("  "));
  header.push(Span::styled(
    truncate(&status.title, 30),
    Style::default().fg(Color::Yellow),
  ));

  let mut lines = vec![Line::from(header)];
  lines.extend(
    status
      .content
      .trim()
      .lines()
      .map(|line| Line::raw(line.to_string())),
  );
  lines
}

/// Deal cards round-robin into as many columns as `width` allows.
pub fn card_columns<'a>(cards: Vec<Vec<Line<'a>>>, width: u16) -> Vec<Vec<Line<'a>>> {
  let count = usize::from((width / CARD_WIDTH).max(1));
  let mut columns: Vec<Vec<Line<'a>>> = vec![Vec::new(); count];
  for (i, card) in cards.into_iter().enumerate() {
    let column = &mut columns[i % count];
    if !column.is_empty() {
      column.push(Line::default());
    }
    column.extend(card);
  }
  columns
}

/// Draw card columns, or a placeholder in their stead.
pub fn render_cards<'a>(
  frame: &mut Frame,
  area: Rect,
  cards: Result<Vec<Vec<Line<'a>>>, Vec<Line<'a>>>,
) {
  match cards {
    Ok(cards) => {
      let columns = card_columns(cards, area.width);
      let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, columns.len() as u32); columns.len()])
        .split(area);
      for (lines, chunk) in columns.into_iter().zip(chunks.iter()) {
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), *chunk);
      }
    }
    Err(placeholder) => frame.render_widget(Paragraph::new(placeholder), area),
  }
}

/// Every status from `/statuses` as a card
pub struct StatusGridView {
  statuses: Subscription<StatusBoard>,
}

impl StatusGridView {
  pub fn new(queries: &Queries) -> Result<Self, QueryError> {
    Ok(Self {
      statuses: queries.statuses()?,
    })
  }
}

impl View for StatusGridView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.statuses.refetch();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let snapshot = self.statuses.snapshot();
    let title = match snapshot.data() {
      Some(board) => format!(" Durumlar ({}) ", board.len()),
      None => " Durumlar ".to_string(),
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let cards = match snapshot.state() {
      QueryState::Success(board) => Ok(
        board
          .statuses()
          .iter()
          .map(|status| status_card_lines(status, None))
          .collect(),
      ),
      _ => Err(query_lines(&snapshot, |_| Vec::new())),
    };
    render_cards(frame, inner, cards);
  }

  fn breadcrumb_label(&self) -> String {
    "Statuses".to_string()
  }

  fn tick(&mut self) -> bool {
    self.statuses.poll()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
