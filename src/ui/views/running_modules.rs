use crate::api::types::{ModuleAuthorMapping, ModuleInfo, UNKNOWN_MODULE_STATUS};
use crate::api::Queries;
use crate::query::{QueryError, Subscription};
use crate::ui::renderfns::query_lines;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// `display name: status` for each running module.
///
/// Falls back to the module id while the mapping is missing and to
/// [`UNKNOWN_MODULE_STATUS`] while `/info` has nothing for it.
pub fn module_lines<'a>(
  modules: &'a [String],
  mapping: Option<&'a ModuleAuthorMapping>,
  info: Option<&'a ModuleInfo>,
) -> Vec<Line<'a>> {
  modules
    .iter()
    .map(|module| {
      let name = mapping.map_or(module.as_str(), |m| m.display_name(module));
      let status = info.map_or(UNKNOWN_MODULE_STATUS, |i| i.status(module));
      let color = if status == UNKNOWN_MODULE_STATUS {
        Color::DarkGray
      } else {
        Color::Green
      };
      Line::from(vec![
        Span::styled("● ", Style::default().fg(color)),
        Span::styled(name, Style::default().fg(Color::Cyan)),
        Span::raw(": "),
        Span::styled(status, Style::default().fg(color)),
      ])
    })
    .collect()
}

/// Modules the backend is running right now
pub struct RunningModulesView {
  modules: Subscription<Vec<String>>,
  mapping: Subscription<ModuleAuthorMapping>,
  info: Subscription<ModuleInfo>,
}

impl RunningModulesView {
  pub fn new(queries: &Queries) -> Result<Self, QueryError> {
    Ok(Self {
      modules: queries.running_modules()?,
      mapping: queries.module_author_mapping()?,
      info: queries.info()?,
    })
  }
}

impl View for RunningModulesView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.modules.refetch();
        self.mapping.refetch();
        self.info.refetch();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let modules = self.modules.snapshot();
    let mapping = self.mapping.snapshot();
    let info = self.info.snapshot();

    let title = match modules.data() {
      Some(list) => format!(" Çalışan modüller ({}) ", list.len()),
      None => " Çalışan modüller ".to_string(),
    };
    let lines = query_lines(&modules, |list| module_lines(list, mapping.data(), info.data()));

    let paragraph = Paragraph::new(lines).block(
      Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue)),
    );
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Modules".to_string()
  }

  fn tick(&mut self) -> bool {
    self.modules.poll() | self.mapping.poll() | self.info.poll()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
