//! Prompt builders for notes and syllabus structuring.

/// Prompt asking for study notes on the topic named by `breadcrumb`.
///
/// The breadcrumb (`Root → Parent → Topic`) carries the ancestry, so the model
/// knows which course and section the topic belongs to.
pub fn notes_prompt(breadcrumb: &str) -> String {
    format!(
        r#"You are an experienced teacher writing clear, student-friendly study notes.

Topic: "{breadcrumb}"

Write notes for this topic that:
1. Open with a short definition or introduction.
2. Explain the concept in depth using plain language.
3. Use headings and bullet points where they help.
4. Give practical examples.
5. Call out key concepts and points worth remembering.
6. Walk through steps one at a time where a process is involved.
7. Close with a brief summary.

Format the result as academic notes."#
    )
}

/// Prompt asking for a strict JSON topic tree describing `syllabus`.
pub fn structure_prompt(syllabus: &str) -> String {
    format!(
        r#"You convert course syllabi into a structured JSON outline.

Identify the main topic of the syllabus below and break it into subtopics and,
where the syllabus has them, nested subtopics. Use exactly this shape:

{{
  "topic": "<main topic>",
  "subtopics": [
    {{ "topicName": "<subtopic>", "result": "" }},
    {{
      "topicName": "<subtopic with children>",
      "result": "",
      "subtopics": [
        {{ "topicName": "<nested subtopic>", "result": "" }}
      ]
    }}
  ]
}}

Rules:
- Reply with valid JSON only: no explanation, no markdown, no code fences.
- The root key is "topic"; nested entries use "topicName", "result" and "subtopics".
- Leave every "result" as an empty string.
- Omit "subtopics" for entries without children.

Syllabus: {syllabus}"#
    )
}
