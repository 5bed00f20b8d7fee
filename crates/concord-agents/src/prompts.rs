use crate::capability::Passage;

/// Verdict schema included in the narrative system prompt.
fn verdict_schema() -> String {
    let example = serde_json::json!({
        "score": 0.35,
        "reasoning": "<one or two sentences naming the passages that drove the score>"
    });
    serde_json::to_string_pretty(&example).unwrap_or_default()
}

pub fn narrative_system_prompt() -> String {
    format!(
        "You are a narrative analyst in CONCORD, a multi-agent research consensus engine. \
         You read short passages about a single subject (a company, asset or topic) and judge \
         whether the overall narrative is positive or negative for it.\n\n\
         ## SCORING\n\n\
         - `score` is a number from -1.0 (clearly negative) to 1.0 (clearly positive).\n\
         - Use values between -0.05 and 0.05 when the passages are mixed or irrelevant.\n\
         - Weigh recent, specific and sourced statements above vague commentary.\n\
         - Do not invent facts beyond the passages.\n\n\
         ## OUTPUT\n\n\
         Respond ONLY with a JSON object, no other text, matching:\n{}",
        verdict_schema()
    )
}

/// User prompt listing the retrieved passages for `subject_id`.
pub fn narrative_user_prompt(subject_id: &str, passages: &[Passage]) -> String {
    let mut prompt = format!("Subject: {subject_id}\n\nPassages:\n");
    for (i, passage) in passages.iter().enumerate() {
        prompt.push_str(&format!("{}. [{}] {}\n", i + 1, passage.source, passage.text));
    }
    prompt
}
