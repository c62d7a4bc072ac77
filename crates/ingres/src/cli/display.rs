//! Display formatting utilities for CLI output

use colored::*;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::pipeline::Answer;

static BREAK_TAGS: Lazy<Option<Regex>> =
  Lazy::new(|| Regex::new(r"(?i)<br\s*/?>|</(p|div|li|h[1-6]|tr)>").ok());
static TAGS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"<[^>]+>").ok());

fn replace(pattern: &Option<Regex>, text: &str, replacement: &str) -> String {
  match pattern {
    Some(re) => re.replace_all(text, replacement).into_owned(),
    None => text.to_string(),
  }
}

/// Reduce model HTML to readable terminal text
pub fn html_to_text(html: &str) -> String {
  let with_breaks = replace(&BREAK_TAGS, html, "\n");
  let stripped = replace(&TAGS, &with_breaks, "");
  let decoded = stripped.replace("&nbsp;", " ").replace("&amp;", "&").replace("&lt;", "<").replace("&gt;", ">");

  let mut lines: Vec<&str> = decoded.lines().map(str::trim).collect();
  lines.dedup_by(|a, b| a.is_empty() && b.is_empty());
  lines.join("\n").trim().to_string()
}

/// Wrap text to fit within a specified width
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
  let mut lines = Vec::new();

  for paragraph in text.split('\n') {
    if paragraph.trim().is_empty() {
      lines.push(String::new());
      continue;
    }

    let mut current_line = String::new();
    for word in paragraph.split_whitespace() {
      if current_line.is_empty() {
        current_line = word.to_string();
      } else if current_line.chars().count() + 1 + word.chars().count() <= width {
        current_line.push(' ');
        current_line.push_str(word);
      } else {
        lines.push(current_line);
        current_line = word.to_string();
      }
    }

    if !current_line.is_empty() {
      lines.push(current_line);
    }
  }

  lines
}

/// Print an answer, with chart data as pretty JSON when present
pub fn display_answer(answer: &Answer) {
  for line in wrap_text(&html_to_text(answer.html()), 100) {
    println!("  {line}");
  }

  if let Answer::Structured(structured) = answer {
    if let Some(chart) = &structured.chart_data {
      println!();
      println!("{}", "Chart data:".bold());
      match serde_json::to_string_pretty(chart) {
        Ok(pretty) => println!("{}", pretty.dimmed()),
        Err(_) => println!("{}", chart.to_string().dimmed()),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_html_to_text() {
    let text = html_to_text("<div><b>Goa</b><br>Rainfall: 3200</div><div>Year: 2020</div>");
    assert_eq!(text, "Goa\nRainfall: 3200\nYear: 2020");
  }

  #[test]
  fn test_wrap_text() {
    let lines = wrap_text("one two three four", 9);
    assert_eq!(lines, vec!["one two", "three", "four"]);
  }
}
