//! Prompts sent to the generative backend.
//!
//! User text is interpolated verbatim with no escaping, so a message can
//! carry instructions of its own (prompt injection). Output is only ever shown
//! as text, never executed.

/// Prompt that rewrites feedback so it is anonymous and gentle.
pub fn transform_prompt(raw: &str, locale: &str) -> String {
    format!(
        "You will be provided with feedback text:\n\
         {{feedback = {raw}}}\n\n\
         Follow these steps to transform the feedback:\n\n\
         1. Anonymize: remove or change any information that could reveal the author's identity \
         (specific names, locations, or events only the author would know).\n\
         2. Soften language: replace insulting expressions or swear words with neutral or positive \
         alternatives, and rephrase hurtful statements so they are gentle and constructive.\n\
         3. Preserve the message: keep every key point of the feedback. Its meaning must stay the same.\n\
         4. Language: respond in {locale}.\n\
         5. Output: return only the transformed feedback text.\n\n\
         Example:\n\n\
         Input:\n\
         \"Hey Kim, you are seriously bad at this. If that's all you've got, just leave. So annoying!\"\n\n\
         Output:\n\
         \"There is room to improve how Kim approaches this work. Let's work together toward a better result.\""
    )
}

/// Prompt that asks for a short reaction to an opinion.
pub fn reply_prompt(raw: &str, locale: &str) -> String {
    format!(
        "You are an anonymous user. Write your thoughts on the following feedback or opinion \
         as a short comment of one or two sentences.\n\
         Keep the tone neutral or mildly positive, never overly positive or negative.\n\
         Respond in {locale}.\n\n\
         Opinion: \"{raw}\"\n\n\
         Comment:"
    )
}
