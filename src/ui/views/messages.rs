use crate::api::types::StatusMessage;
use crate::api::Queries;
use crate::query::{QueryError, Subscription};
use crate::ui::renderfns::query_lines;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// `author: content` per message, in the order given.
pub fn message_lines(messages: &[StatusMessage]) -> Vec<Line<'_>> {
  messages
    .iter()
    .map(|message| {
      Line::from(vec![
        Span::styled(message.author.as_str(), Style::default().fg(Color::Cyan)),
        Span::styled(": ", Style::default().fg(Color::DarkGray)),
        Span::raw(message.content.trim()),
      ])
    })
    .collect()
}

/// Message terminal, newest first
pub struct MessagesView {
  messages: Subscription<Vec<StatusMessage>>,
  scroll: u16,
}

impl MessagesView {
  pub fn new(queries: &Queries) -> Result<Self, QueryError> {
    Ok(Self {
      messages: queries.messages()?,
      scroll: 0,
    })
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.scroll = self.scroll.saturating_add(1);
        Some(ViewAction::None)
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.scroll = self.scroll.saturating_sub(1);
        Some(ViewAction::None)
      }
      KeyCode::Char('g') | KeyCode::Home => {
        self.scroll = 0;
        Some(ViewAction::None)
      }
      _ => None,
    }
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('r') => {
        self.messages.refetch();
        Some(ViewAction::None)
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }
}

impl View for MessagesView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_navigation(key)
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let snapshot = self.messages.snapshot();
    let count = snapshot.data().map(Vec::len).unwrap_or(0);
    let lines = query_lines(&snapshot, |messages| message_lines(messages));

    // Keep at least the last line on screen
    self.scroll = self.scroll.min(count.saturating_sub(1) as u16);

    let paragraph = Paragraph::new(lines)
      .block(
        Block::default()
          .title(" Mesajlar ")
          .borders(Borders::ALL)
          .border_style(Style::default().fg(Color::Blue)),
      )
      .wrap(Wrap { trim: false })
      .scroll((self.scroll, 0));
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Messages".to_string()
  }

  fn tick(&mut self) -> bool {
    self.messages.poll()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("j/k", "scroll").with_priority(15),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_message_lines() {
    let messages = vec![
      StatusMessage {
        author: "robot".into(),
        title: "t".into(),
        content: "kutu alındı\n".into(),
      },
      StatusMessage {
        author: "Ayşe".into(),
        title: "t".into(),
        content: "merhaba".into(),
      },
    ];
    let text: Vec<String> = message_lines(&messages).iter().map(|l| l.to_string()).collect();
    assert_eq!(text, vec!["robot: kutu alındı", "Ayşe: merhaba"]);
  }
}
