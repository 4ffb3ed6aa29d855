// mapofus/src/prompt.rs

//! Turns a story and its hints into the text sent to an image provider.
//!
//! The output depends only on the input: no clock, no randomness, and the
//! scaffold is serialized from a struct with a fixed field order.

use crate::model::{QaAnswer, StoryMetadata};
use serde::Serialize;

pub const STORY_CEILING: usize = 1200;
pub const MAX_QA_ITEMS: usize = 10;
pub const QUESTION_CEILING: usize = 80;
pub const ANSWER_CEILING: usize = 180;
pub const EMPTY_STORY_PLACEHOLDER: &str = "Brief relationship highlights; keep it universal, warm, and hopeful.";

const STYLE: &str = "simple black and white line art, clean strokes, minimal shading, understated and print-friendly";

#[derive(Serialize)]
struct MapScaffold {
  title: &'static str,
  subtitle: &'static str,
  style: &'static str,
  composition: &'static str,
  must_haves: [&'static str; 5],
  tone: &'static str,
  text_handling: &'static str,
  qa_intent: &'static str,
}

const SCAFFOLD: MapScaffold = MapScaffold {
  title: "MAP OF US",
  subtitle: "Couple names or a short caption under the title",
  style: "hand-drawn black and white line art on textured paper",
  composition: "a winding road linking 6-10 key memories in loose chronological order",
  must_haves: [
    "clear lettering for title and subtitle",
    "small icons for each stop (arches, church, houses, mountains, bikes, campfire)",
    "sprinkled filler elements like trees, footprints, a kite or backpack for texture",
    "balanced white space; keep it uncluttered and print-friendly",
    "2px solid black stroke framing the entire map like a poster border",
  ],
  tone: "warm, optimistic, PG; no gore or explicit content",
  text_handling: "labels only, avoid long paragraphs on the map",
  qa_intent: "use 6-10 guided cues from the user to decide the 6-10 main stops",
};

/// Clips to `limit` characters (not bytes), appending `...` when clipped.
fn clip(text: &str, limit: usize) -> String {
  match text.char_indices().nth(limit) {
    Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
    None => text.to_string(),
  }
}

fn present(hint: &Option<String>) -> Option<&str> {
  hint.as_deref().map(str::trim).filter(|h| !h.is_empty())
}

fn qa_cues(answers: &[QaAnswer]) -> String {
  answers
    .iter()
    .filter(|qa| !qa.answer.trim().is_empty())
    .take(MAX_QA_ITEMS)
    .map(|qa| {
      format!(
        "{}: {}",
        clip(qa.question.trim(), QUESTION_CEILING),
        clip(qa.answer.trim(), ANSWER_CEILING)
      )
    })
    .collect::<Vec<_>>()
    .join(" | ")
}

pub fn build_prompt(story_text: &str, metadata: &StoryMetadata) -> String {
  let scaffold = serde_json::to_string(&SCAFFOLD).unwrap_or_default();
  let story = match story_text.trim() {
    "" => EMPTY_STORY_PLACEHOLDER,
    trimmed => trimmed,
  };
  let story = clip(story, STORY_CEILING);

  let mut prompt = format!(
    "You are illustrating a custom relationship map poster. Use this base scaffold (treat as JSON spec, then render visually): {scaffold}. "
  );
  prompt.push_str(&format!("Style: {STYLE}. "));
  prompt.push_str("Ensure a thin 2px black stroke frame around the map, with balanced margins inside the frame. ");

  if let Some(locations) = present(&metadata.locations) {
    prompt.push_str(&format!("Priority locations or labels to weave in: {locations}. "));
  }
  if let Some(date) = present(&metadata.start_date) {
    prompt.push_str(&format!(
      "Mark the significant date subtly near the title or relevant stop: {date}. "
    ));
  }
  if let Some(ratio) = present(&metadata.aspect_ratio) {
    prompt.push_str(&format!(
      "Target aspect ratio: {ratio}. Compose the layout to fit this ratio naturally, without cropping key elements. "
    ));
  }

  prompt.push_str(&format!(
    "User story cues (keep them even if brief, summarize where needed): {story}. "
  ));
  let cues = qa_cues(&metadata.qa_answers);
  if !cues.is_empty() {
    prompt.push_str(&format!("Guided Q&A highlights to prioritize (prefer 6-10 cues): {cues}. "));
  }
  prompt.push_str(
    "Render as a cohesive hand-drawn map with a winding road, small legible labels, and balanced negative space. \
     Avoid long text blocks; keep the tone sentimental and PG. High resolution, suitable for framing.",
  );
  prompt
}
