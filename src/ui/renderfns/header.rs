use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with logo, backend host, optional title and the
/// current view's shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  api_url: &str,
  title: Option<&str>,
  shortcuts: &[ShortcutInfo],
) {
  let frame_width = area.width as usize;
  let mut spans = vec![
    Span::styled(" robodash ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", extract_domain(api_url)),
      Style::default().fg(Color::White),
    ),
  ];

  if let Some(title) = title {
    spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      format!(" {} ", title),
      Style::default().fg(Color::Yellow).bold(),
    ));
  }

  let mut shortcuts = shortcuts.to_vec();
  shortcuts.sort_by_key(|s| s.priority);

  spans.push(Span::raw(" "));
  let mut used: usize = spans.iter().map(|s| s.width()).sum();
  for shortcut in shortcuts {
    // Keys and brackets highlighted, descriptions dimmed
    let key = format!("  <{}>", shortcut.key);
    let label = format!(" {}", shortcut.label);
    let width = key.chars().count() + label.chars().count();
    if used + width > frame_width {
      break;
    }
    used += width;
    spans.push(Span::styled(key, Style::default().fg(Color::Cyan)));
    spans.push(Span::styled(label, Style::default().fg(Color::DarkGray)));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

/// Extract host (and port) from the API URL
fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}
