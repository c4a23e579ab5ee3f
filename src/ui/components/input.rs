use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Result of handling a key event in an input component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
  /// Key was handled, value unchanged
  Consumed,
  /// Key was handled and the value changed
  Changed,
  /// Enter pressed, here's the submitted value
  Submitted(String),
  /// Escape pressed, input cancelled
  Cancelled,
  /// Key not handled, pass to next handler
  NotHandled,
}

/// Reusable single-line text input.
///
/// The cursor counts characters, not bytes, so Turkish text edits cleanly.
/// An optional filter rejects characters before they reach the buffer.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
  buffer: String,
  cursor: usize,
  accept: Option<fn(char) -> bool>,
}

impl TextInput {
  pub fn new() -> Self {
    Self::default()
  }

  /// Input that only takes characters of a decimal number (`-12.5`).
  pub fn numeric() -> Self {
    Self {
      accept: Some(is_number_char),
      ..Self::default()
    }
  }

  pub fn with_value(mut self, value: &str) -> Self {
    self.buffer = value.chars().filter(|c| self.accepts(*c)).collect();
    self.cursor = self.len();
    self
  }

  /// Get the current input value
  pub fn value(&self) -> &str {
    &self.buffer
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
    self.cursor = 0;
  }

  /// Cursor position in characters
  #[cfg(test)]
  pub fn cursor_position(&self) -> usize {
    self.cursor
  }

  fn len(&self) -> usize {
    self.buffer.chars().count()
  }

  fn accepts(&self, c: char) -> bool {
    self.accept.map_or(true, |accept| accept(c))
  }

  /// Byte offset of character index `idx`
  fn byte_index(&self, idx: usize) -> usize {
    self
      .buffer
      .char_indices()
      .nth(idx)
      .map(|(i, _)| i)
      .unwrap_or(self.buffer.len())
  }

  fn remove_range(&mut self, from: usize, to: usize) {
    let start = self.byte_index(from);
    let end = self.byte_index(to);
    self.buffer.replace_range(start..end, "");
    self.cursor = from;
  }

  /// Handle a key event, returning the result
  pub fn handle_key(&mut self, key: KeyEvent) -> InputResult {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Esc => InputResult::Cancelled,
      KeyCode::Enter => InputResult::Submitted(self.buffer.clone()),
      KeyCode::Backspace => {
        if self.cursor == 0 {
          return InputResult::Consumed;
        }
        self.remove_range(self.cursor - 1, self.cursor);
        InputResult::Changed
      }
      KeyCode::Delete => {
        if self.cursor >= self.len() {
          return InputResult::Consumed;
        }
        self.remove_range(self.cursor, self.cursor + 1);
        InputResult::Changed
      }
      KeyCode::Left => {
        self.cursor = self.cursor.saturating_sub(1);
        InputResult::Consumed
      }
      KeyCode::Right => {
        self.cursor = (self.cursor + 1).min(self.len());
        InputResult::Consumed
      }
      KeyCode::Home => {
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::End => {
        self.cursor = self.len();
        InputResult::Consumed
      }
      KeyCode::Char('a') if ctrl => {
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::Char('e') if ctrl => {
        self.cursor = self.len();
        InputResult::Consumed
      }
      KeyCode::Char('u') if ctrl => {
        // Clear line before cursor
        if self.cursor == 0 {
          return InputResult::Consumed;
        }
        self.remove_range(0, self.cursor);
        InputResult::Changed
      }
      KeyCode::Char('w') if ctrl => {
        // Delete word before cursor
        let chars: Vec<char> = self.buffer.chars().take(self.cursor).collect();
        let trimmed = chars.iter().rposition(|c| !c.is_whitespace()).map_or(0, |i| i + 1);
        let start = chars[..trimmed]
          .iter()
          .rposition(|c| c.is_whitespace())
          .map_or(0, |i| i + 1);
        if start == self.cursor {
          return InputResult::Consumed;
        }
        self.remove_range(start, self.cursor);
        InputResult::Changed
      }
      KeyCode::Char(_) if ctrl => InputResult::NotHandled,
      KeyCode::Char(c) => {
        if !self.accepts(c) {
          return InputResult::Consumed;
        }
        let at = self.byte_index(self.cursor);
        self.buffer.insert(at, c);
        self.cursor += 1;
        InputResult::Changed
      }
      _ => InputResult::NotHandled,
    }
  }
}

fn is_number_char(c: char) -> bool {
  c.is_ascii_digit() || c == '.' || c == '-'
}
