//! Round-robin avatar assignment for status authors.
//!
//! Each author gets the next slot the first time they are seen and keeps it
//! for the rest of the session. Seedless requests always advance.

use ratatui::style::Color;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Number of distinct avatars.
pub const AVATAR_SLOTS: usize = 4;

const GLYPHS: [&str; AVATAR_SLOTS] = ["◆", "●", "▲", "■"];
const COLORS: [Color; AVATAR_SLOTS] = [Color::Magenta, Color::Cyan, Color::Yellow, Color::Green];

/// Handle shared between the app and the views that draw avatars.
pub type SharedAvatars = Arc<Mutex<AvatarRotation>>;

#[derive(Debug, Clone)]
pub struct AvatarRotation {
  slots: usize,
  current: usize,
  assigned: HashMap<String, usize>,
}

impl Default for AvatarRotation {
  fn default() -> Self {
    Self::new(AVATAR_SLOTS)
  }
}

impl AvatarRotation {
  pub fn new(slots: usize) -> Self {
    Self {
      slots: slots.max(1),
      current: 0,
      assigned: HashMap::new(),
    }
  }

  pub fn shared() -> SharedAvatars {
    Arc::new(Mutex::new(Self::default()))
  }

  /// Slot for `seed`. The counter is advanced before use, so the very first
  /// assignment is slot 1 and slot 0 comes after a full lap.
  pub fn slot_for(&mut self, seed: Option<&str>) -> usize {
    let seed = seed.filter(|s| !s.is_empty());
    if let Some(&slot) = seed.and_then(|s| self.assigned.get(s)) {
      return slot;
    }

    self.current = (self.current + 1) % self.slots;
    if let Some(seed) = seed {
      self.assigned.insert(seed.to_string(), self.current);
    }
    self.current
  }

  /// Number of seeds with a remembered slot.
  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.assigned.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.assigned.is_empty()
  }
}

/// Slot for `seed` through a shared handle.
pub fn slot(avatars: &SharedAvatars, seed: &str) -> usize {
  avatars
    .lock()
    .unwrap_or_else(|poisoned| poisoned.into_inner())
    .slot_for(Some(seed))
}

/// Glyph drawn for an avatar slot.
pub fn glyph(slot: usize) -> &'static str {
  GLYPHS[slot % AVATAR_SLOTS]
}

pub fn color(slot: usize) -> Color {
  COLORS[slot % AVATAR_SLOTS]
}
