//! Rendering query answers for people and programs

use crate::datalog::Bindings;
use crate::error::Result;
use std::collections::BTreeMap;

/// Render answers the way the shell prints them
///
/// `No.` when there are none, `Yes.` when every answer is empty, otherwise
/// one `{X: a, Y: b}` line per answer.
pub fn render_answers(answers: &[Bindings]) -> String {
    match answers {
        [] => "No.".to_string(),
        _ if answers.iter().all(Bindings::is_empty) => "Yes.".to_string(),
        _ => answers
            .iter()
            .map(|answer| answer.to_string())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Answers as plain `variable -> value` maps
pub fn answers_to_maps(answers: &[Bindings]) -> Vec<BTreeMap<String, String>> {
    answers
        .iter()
        .map(|answer| {
            answer
                .iter()
                .map(|(var, value)| (var.to_string(), value.text().to_string()))
                .collect()
        })
        .collect()
}

/// Answers as a JSON array of objects
pub fn render_answers_json(answers: &[Bindings]) -> Result<String> {
    Ok(serde_json::to_string(&answers_to_maps(answers))?)
}
