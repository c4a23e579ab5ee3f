use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

/// Events emitted by the module picker that the parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModulePickerEvent {
  /// Module chosen (returns the module id)
  Selected(String),
  /// Picker cancelled
  Cancelled,
}

/// One row of the picker: the value sent to the backend and the label shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerOption {
  pub value: String,
  pub label: String,
}

impl PickerOption {
  pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
    Self {
      value: value.into(),
      label: label.into(),
    }
  }
}

/// Centered overlay for choosing a module.
///
/// The option list is refreshed from the parent every tick, so rows can
/// appear while the picker is open. A trailing `hint` row (e.g. a loading
/// notice) is shown but cannot be chosen.
#[derive(Debug, Clone, Default)]
pub struct ModulePicker {
  active: bool,
  options: Vec<PickerOption>,
  hint: Option<String>,
  selected: usize,
  title: String,
}

impl ModulePicker {
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      ..Self::default()
    }
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Open the picker with the cursor on `current` if present.
  pub fn show(&mut self, current: &str) {
    self.active = true;
    self.selected = self
      .options
      .iter()
      .position(|o| o.value == current)
      .unwrap_or(0);
  }

  pub fn hide(&mut self) {
    self.active = false;
  }

  /// Replace the options, keeping the cursor on the same value.
  pub fn set_options(&mut self, options: Vec<PickerOption>, hint: Option<String>) {
    let current = self.options.get(self.selected).map(|o| o.value.clone());
    self.options = options;
    self.hint = hint;
    self.selected = current
      .and_then(|value| self.options.iter().position(|o| o.value == value))
      .unwrap_or(0);
  }

  /// Handle a key event
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<ModulePickerEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(ModulePickerEvent::Cancelled)
      }
      KeyCode::Enter => {
        self.hide();
        match self.options.get(self.selected) {
          Some(option) => KeyResult::Event(ModulePickerEvent::Selected(option.value.clone())),
          None => KeyResult::Event(ModulePickerEvent::Cancelled),
        }
      }
      KeyCode::Char('j') | KeyCode::Down => {
        if !self.options.is_empty() {
          self.selected = (self.selected + 1) % self.options.len();
        }
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        if !self.options.is_empty() {
          self.selected = (self.selected + self.options.len() - 1) % self.options.len();
        }
        KeyResult::Handled
      }
      // Modal: swallow everything else
      _ => KeyResult::Handled,
    }
  }

  /// Render the picker overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let rows = self.options.len() + usize::from(self.hint.is_some());
    let longest = self
      .options
      .iter()
      .map(|o| o.label.chars().count())
      .chain(self.hint.iter().map(|h| h.chars().count()))
      .chain(std::iter::once(self.title.chars().count()))
      .max()
      .unwrap_or(10);
    let width = (longest as u16 + 6).clamp(20, area.width.saturating_sub(4).max(20));
    let height = (rows as u16 + 2).clamp(3, area.height.saturating_sub(2).max(3));

    // Center the overlay
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width.min(area.width), height.min(area.height));

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let mut items: Vec<ListItem> = self
      .options
      .iter()
      .map(|option| ListItem::new(Span::styled(option.label.clone(), Style::default().fg(Color::Cyan))))
      .collect();
    if let Some(hint) = &self.hint {
      items.push(ListItem::new(Span::styled(
        hint.clone(),
        Style::default().fg(Color::DarkGray),
      )));
    }

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected));

    frame.render_stateful_widget(list, inner, &mut state);
  }
}
