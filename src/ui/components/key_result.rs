/// What a component did with a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed, nothing for the parent
  Handled,
  /// Consumed, and the parent has to act on `T`
  Event(T),
  /// Not for this component; the parent tries its next handler
  NotHandled,
}

impl<T> KeyResult<T> {
  /// Whether the component kept the key for itself.
  pub fn is_consumed(&self) -> bool {
    !matches!(self, KeyResult::NotHandled)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_is_consumed() {
    assert!(KeyResult::<()>::Handled.is_consumed());
    assert!(KeyResult::Event(1).is_consumed());
    assert!(!KeyResult::<()>::NotHandled.is_consumed());
  }
}
