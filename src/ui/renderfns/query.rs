//! The one place that decides between placeholder and data.

use crate::query::{QuerySnapshot, QueryState};
use ratatui::prelude::*;

pub const LOADING_TEXT: &str = "Yükleniyor...";

pub fn error_text(message: &str) -> String {
  format!("Hata oluştu: {}", message)
}

/// Lines for a query snapshot.
///
/// Loading shows the loading text, a failure shows the error banner (even
/// over stale data), otherwise `render` draws the data.
pub fn query_lines<'a, T>(
  snapshot: &'a QuerySnapshot<T>,
  render: impl FnOnce(&'a T) -> Vec<Line<'a>>,
) -> Vec<Line<'a>> {
  match snapshot.state() {
    QueryState::Success(data) => render(data),
    QueryState::Error(message) => vec![error_line(message)],
    QueryState::Loading => vec![loading_line()],
  }
}

pub fn loading_line() -> Line<'static> {
  Line::styled(LOADING_TEXT, Style::default().fg(Color::DarkGray))
}

pub fn error_line(message: &str) -> Line<'static> {
  Line::styled(error_text(message), Style::default().fg(Color::Red))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn text(lines: &[Line]) -> Vec<String> {
    lines.iter().map(|l| l.to_string()).collect()
  }

  fn render_numbers(data: &Vec<u32>) -> Vec<Line<'_>> {
    data.iter().map(|n| Line::raw(n.to_string())).collect()
  }

  #[test]
  fn test_loading() {
    let snapshot = QuerySnapshot::<Vec<u32>>::loading();
    assert_eq!(text(&query_lines(&snapshot, render_numbers)), vec!["Yükleniyor..."]);
  }

  #[test]
  fn test_error_hides_stale_data() {
    let mut snapshot = QuerySnapshot::from_data(vec![1, 2]);
    snapshot.error = Some("HTTP 500".into());
    assert_eq!(
      text(&query_lines(&snapshot, render_numbers)),
      vec!["Hata oluştu: HTTP 500"]
    );
  }

  #[test]
  fn test_data() {
    let snapshot = QuerySnapshot::from_data(vec![1, 2]);
    assert_eq!(text(&query_lines(&snapshot, render_numbers)), vec!["1", "2"]);
  }
}
