/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Pad or cut `s` to exactly `width` characters
pub fn fit(s: &str, width: usize) -> String {
  let cut = truncate(s, width);
  format!("{:<width$}", cut, width = width)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("Sıcaklık değeri", 8), "Sıcak...");
  }

  #[test]
  fn test_fit_pads_and_cuts() {
    assert_eq!(fit("Nem", 5), "Nem  ");
    assert_eq!(fit("Titreşim", 6), "Tit...");
  }
}
