//! Cold-email sequence generation for new campaigns.
//!
//! Sequences are 1-3 steps: one initial email plus up to two follow-ups.
//! Structural guarantees validated after generation:
//! - step 0 carries no delay
//! - every later step carries an explicit positive delay in days
//! - only the final follow-up may contain the booking-link placeholder

use serde::Deserialize;

use crate::client::{ChatClient, COPY_MODEL};
use crate::error::AiError;
use crate::json::parse_json_object;
use crate::types::CompanyContext;

/// Placeholder the outbound platform substitutes with the sender's
/// scheduling link at send time.
pub const BOOKING_LINK_PLACEHOLDER: &str = "{{booking_link}}";

/// System prompt used when the company has not configured its own.
pub const DEFAULT_EMAIL_PROMPT: &str = "You write outbound email sequences on \
behalf of a company founder. Sound like a grounded, product-first founder: \
direct, concise, personalized. Short paragraphs, plain text, no hype, no \
exclamation marks, no corporate jargon.\n\n\
Rules:\n\
- {{first_name}} is the ONLY personalization variable\n\
- The first sentence of the initial email must reference something specific \
about the persona\n\
- Initial email: 120-150 words, soft call to action, no booking link\n\
- Follow-ups: 50-80 words, empty subject lines so they thread\n\
- Only the FINAL follow-up may include the {{booking_link}} placeholder\n\
- Sign off with the sender's first name";

/// One step of a generated sequence. Step 0 is the initial email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceStep {
    pub step: i32,
    pub subject: String,
    pub body: String,
    pub delay_days: i32,
}

#[derive(Debug, Deserialize)]
struct WireSequence {
    initial: WireEmail,
    #[serde(default)]
    follow_ups: Vec<WireFollowUp>,
}

#[derive(Debug, Deserialize)]
struct WireEmail {
    subject: String,
    body: String,
}

#[derive(Debug, Deserialize)]
struct WireFollowUp {
    #[serde(default)]
    subject: String,
    body: String,
    delay_days: i32,
}

/// Generates an email sequence for a persona.
///
/// `sequence_length` is clamped to 1-3 (initial plus up to two follow-ups).
/// Uses the company's custom prompt when set, otherwise
/// [`DEFAULT_EMAIL_PROMPT`]. The result is validated with
/// [`validate_sequence`] before being returned.
///
/// # Errors
///
/// Returns [`AiError::InvalidSequence`] if the output violates a structural
/// guarantee, [`AiError::InvalidJson`] on unparseable output, or the
/// underlying call error.
pub async fn generate_sequence(
    client: &ChatClient,
    company: &CompanyContext,
    persona: &str,
    sequence_length: i32,
    custom_prompt: Option<&str>,
) -> Result<Vec<SequenceStep>, AiError> {
    let follow_ups = usize::try_from(sequence_length.clamp(1, 3) - 1).unwrap_or(0);

    let base_prompt = custom_prompt.unwrap_or(DEFAULT_EMAIL_PROMPT);
    let shape = match follow_ups {
        0 => "{\"initial\": {\"subject\": \"...\", \"body\": \"...\"}, \"follow_ups\": []}".to_string(),
        n => format!(
            "{{\"initial\": {{\"subject\": \"...\", \"body\": \"...\"}}, \
             \"follow_ups\": [{n} follow-up objects, each \
             {{\"subject\": \"\", \"body\": \"...\", \"delay_days\": <days>}}]}}"
        ),
    };
    let placeholder_note = if follow_ups == 0 {
        String::new()
    } else {
        format!(
            "\nThe LAST follow-up must include the {BOOKING_LINK_PLACEHOLDER} \
             placeholder; no earlier step may contain it."
        )
    };
    let system = format!("{base_prompt}\n\nReturn ONLY valid JSON: {shape}{placeholder_note}");

    let user = format!(
        "Write a {}-email outreach sequence.\n\n\
         Sender: {}\n\
         Product: {}\n\
         Persona: {persona} - {}\n\n\
         The opener must be specifically relevant to this persona type, not generic.",
        follow_ups + 1,
        company.name,
        company.description,
        company.target_audience,
    );

    let content = client
        .chat_json(COPY_MODEL, &system, &user, 0.7, "email sequence")
        .await?;

    let value = parse_json_object(&content).ok_or_else(|| AiError::InvalidJson {
        context: "email sequence".to_string(),
        reason: "no JSON object in output".to_string(),
    })?;

    let wire: WireSequence = serde_json::from_value(value).map_err(|e| AiError::InvalidJson {
        context: "email sequence".to_string(),
        reason: e.to_string(),
    })?;

    let mut steps = vec![SequenceStep {
        step: 0,
        subject: wire.initial.subject,
        body: wire.initial.body,
        delay_days: 0,
    }];
    for (i, follow_up) in wire.follow_ups.into_iter().take(follow_ups).enumerate() {
        steps.push(SequenceStep {
            step: i32::try_from(i).unwrap_or(0) + 1,
            subject: follow_up.subject,
            body: follow_up.body,
            delay_days: follow_up.delay_days,
        });
    }

    validate_sequence(&steps)?;
    Ok(steps)
}

/// Checks the structural guarantees of a generated sequence.
///
/// # Errors
///
/// Returns [`AiError::InvalidSequence`] naming the violated rule.
pub fn validate_sequence(steps: &[SequenceStep]) -> Result<(), AiError> {
    if steps.is_empty() {
        return Err(AiError::InvalidSequence("sequence has no steps".to_string()));
    }
    if steps.len() > 3 {
        return Err(AiError::InvalidSequence(format!(
            "sequence has {} steps; at most 3 are allowed",
            steps.len()
        )));
    }

    for (i, step) in steps.iter().enumerate() {
        if step.body.trim().is_empty() {
            return Err(AiError::InvalidSequence(format!("step {i} has an empty body")));
        }
        if i == 0 && step.delay_days != 0 {
            return Err(AiError::InvalidSequence(
                "the initial email must not carry a delay".to_string(),
            ));
        }
        if i > 0 && step.delay_days < 1 {
            return Err(AiError::InvalidSequence(format!(
                "follow-up step {i} must carry an explicit delay in days"
            )));
        }

        let is_final_follow_up = i == steps.len() - 1 && i > 0;
        if !is_final_follow_up && step.body.contains(BOOKING_LINK_PLACEHOLDER) {
            return Err(AiError::InvalidSequence(format!(
                "step {i} contains the booking-link placeholder; only the final \
                 follow-up may carry it"
            )));
        }
    }

    Ok(())
}
