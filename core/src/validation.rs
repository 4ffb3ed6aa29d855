// mapofus/src/validation.rs

//! Shape and length checks for caller-supplied input.

use crate::error::{MapError, MapResult};
use crate::model::coupon::normalize_code;
use crate::model::{QaAnswer, StoryMetadata, Theme};
use serde::Deserialize;

pub const STORY_MIN_CHARS: usize = 50;
pub const STORY_MAX_CHARS: usize = 5000;
pub const LOCATIONS_MAX_CHARS: usize = 500;
pub const START_DATE_MAX_CHARS: usize = 64;
pub const QA_MAX_ITEMS: usize = 10;
pub const QUESTION_MAX_CHARS: usize = 200;
pub const ANSWER_MAX_CHARS: usize = 500;
pub const COUPON_MAX_CHARS: usize = 64;
pub const INVOICE_MIN_CHARS: usize = 3;
pub const INVOICE_MAX_CHARS: usize = 100;

/// Body of a create-order request, as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateOrderRequest {
  pub story_text: String,
  #[serde(default)]
  pub theme: Option<String>,
  #[serde(default)]
  pub locations: Option<String>,
  #[serde(default)]
  pub start_date: Option<String>,
  #[serde(default)]
  pub aspect_ratio: Option<String>,
  #[serde(default)]
  pub qa_answers: Vec<QaAnswer>,
  #[serde(default)]
  pub coupon_code: Option<String>,
}

/// A create-order request that passed every check.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderInput {
  pub story_text: String,
  pub metadata: StoryMetadata,
  /// Normalized upper-case code.
  pub coupon_code: Option<String>,
}

fn char_len(s: &str) -> usize {
  s.chars().count()
}

fn is_code_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Trims and drops blank optional strings.
fn optional(field: &str, value: &Option<String>, max: usize) -> MapResult<Option<String>> {
  let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
    return Ok(None);
  };
  if char_len(value) > max {
    return Err(MapError::invalid_field(field, format!("{field} must be at most {max} characters")));
  }
  Ok(Some(value.to_string()))
}

fn parse_theme(raw: &str) -> MapResult<Theme> {
  match raw {
    "romantic" => Ok(Theme::Romantic),
    "vintage" => Ok(Theme::Vintage),
    "modern" => Ok(Theme::Modern),
    "minimalist" => Ok(Theme::Minimalist),
    other => Err(MapError::invalid_field("theme", format!("Unknown theme '{other}'"))),
  }
}

/// `W:H` with one- or two-digit positive integers.
fn is_aspect_ratio(raw: &str) -> bool {
  let Some((w, h)) = raw.split_once(':') else {
    return false;
  };
  let side = |s: &str| (1..=2).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit()) && s.parse::<u8>().is_ok_and(|n| n > 0);
  side(w) && side(h)
}

fn validate_qa(answers: &[QaAnswer]) -> MapResult<Vec<QaAnswer>> {
  if answers.len() > QA_MAX_ITEMS {
    return Err(MapError::invalid_field(
      "qa_answers",
      format!("At most {QA_MAX_ITEMS} guided answers are allowed"),
    ));
  }
  answers
    .iter()
    .map(|qa| {
      let question = qa.question.trim();
      let answer = qa.answer.trim();
      if char_len(question) > QUESTION_MAX_CHARS {
        return Err(MapError::invalid_field("qa_answers", "Question is too long"));
      }
      if char_len(answer) > ANSWER_MAX_CHARS {
        return Err(MapError::invalid_field("qa_answers", "Answer is too long"));
      }
      Ok(QaAnswer {
        question: question.to_string(),
        answer: answer.to_string(),
      })
    })
    .collect()
}

pub fn validate_coupon_code(raw: &str) -> MapResult<String> {
  let code = normalize_code(raw);
  if code.is_empty() || char_len(&code) > COUPON_MAX_CHARS || !code.chars().all(is_code_char) {
    return Err(MapError::invalid_field("coupon_code", "Invalid coupon code"));
  }
  Ok(code)
}

pub fn validate_create_order(request: &CreateOrderRequest) -> MapResult<OrderInput> {
  let story_text = request.story_text.trim();
  let story_len = char_len(story_text);
  if story_len < STORY_MIN_CHARS {
    return Err(MapError::invalid_field(
      "story_text",
      format!("Story must be at least {STORY_MIN_CHARS} characters"),
    ));
  }
  if story_len > STORY_MAX_CHARS {
    return Err(MapError::invalid_field(
      "story_text",
      format!("Story must be at most {STORY_MAX_CHARS} characters"),
    ));
  }

  let theme = match request.theme.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
    Some(raw) => Some(parse_theme(raw)?),
    None => None,
  };
  let aspect_ratio = optional("aspect_ratio", &request.aspect_ratio, 5)?;
  if let Some(ratio) = &aspect_ratio {
    if !is_aspect_ratio(ratio) {
      return Err(MapError::invalid_field("aspect_ratio", "Aspect ratio must look like 3:4"));
    }
  }
  let coupon_code = match request.coupon_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
    Some(raw) => Some(validate_coupon_code(raw)?),
    None => None,
  };

  Ok(OrderInput {
    story_text: story_text.to_string(),
    metadata: StoryMetadata {
      theme,
      locations: optional("locations", &request.locations, LOCATIONS_MAX_CHARS)?,
      start_date: optional("start_date", &request.start_date, START_DATE_MAX_CHARS)?,
      aspect_ratio,
      qa_answers: validate_qa(&request.qa_answers)?,
    },
    coupon_code,
  })
}

pub fn validate_invoice_number(raw: &str) -> MapResult<String> {
  let invoice = raw.trim();
  let len = char_len(invoice);
  if !(INVOICE_MIN_CHARS..=INVOICE_MAX_CHARS).contains(&len) {
    return Err(MapError::invalid_field(
      "invoice_number",
      format!("Invoice number must be {INVOICE_MIN_CHARS}-{INVOICE_MAX_CHARS} characters"),
    ));
  }
  if !invoice.chars().all(is_code_char) {
    return Err(MapError::invalid_field(
      "invoice_number",
      "Invoice number may only contain letters, digits, '-' and '_'",
    ));
  }
  Ok(invoice.to_string())
}
