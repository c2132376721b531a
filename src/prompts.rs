//! Prompts for the two inference calls: fine extraction and appeal generation.
//!
//! Every prompt is built here from constants and the caller's data, with no
//! timestamps, randomness or environment lookups. Identical inputs produce
//! byte-identical [`PromptSpec`]s, so prompt regressions show up in plain
//! unit tests without a model in the loop.

use crate::model::{AppealOptions, AppealType, ExtractedContent, FineRecord, ImagePayload};

/// A fully built request for the inference gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSpec {
    /// Instructions sent as the system message.
    pub system: String,
    /// Content sent as the user message.
    pub user: String,
    /// Image attached to the user message, if any.
    pub image: Option<ImagePayload>,
}

// ── Extraction ───────────────────────────────────────────────────────────

/// System prompt for structured fine extraction.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a data extraction assistant for traffic and parking fines.
Read the fine and return its details as a single JSON object with exactly these fields:

{
  "referenceNumber": "notice, ticket or penalty charge number",
  "date": "date of the offence as written on the fine",
  "amount": "amount due including currency",
  "location": "where the offence took place",
  "reason": "the alleged offence or contravention",
  "vehicle": "registration plate and, if present, make or model"
}

Rules:
- Use exactly these six field names.
- Every value must be a string.
- If a value is not present or cannot be read, use an empty string "". Never guess, never write "unknown" or "N/A".
- Copy values as they appear on the fine; do not explain or comment on them.
- Return ONLY the JSON object. No prose, no markdown fences, nothing before or after it."#;

const EXTRACTION_TEXT_PREFIX: &str = "Extract the fine details from the following document text:";

const EXTRACTION_IMAGE_INSTRUCTION: &str =
    "Extract the fine details from the attached image of the fine.";

/// Build the structured-extraction request for extracted content.
pub fn build_extraction_prompt(content: &ExtractedContent) -> PromptSpec {
    match content {
        ExtractedContent::Text(text) => PromptSpec {
            system: EXTRACTION_SYSTEM_PROMPT.to_string(),
            user: format!("{EXTRACTION_TEXT_PREFIX}\n\n\"\"\"\n{text}\n\"\"\""),
            image: None,
        },
        ExtractedContent::Image(payload) => PromptSpec {
            system: EXTRACTION_SYSTEM_PROMPT.to_string(),
            user: EXTRACTION_IMAGE_INSTRUCTION.to_string(),
            image: Some(payload.clone()),
        },
    }
}

// ── Generation ───────────────────────────────────────────────────────────

/// System prompt for appeal generation.
pub const APPEAL_SYSTEM_PROMPT: &str = r#"You are an experienced writer of formal appeals against traffic and parking fines.
Write a complete, polite and persuasive appeal letter addressed to the issuing authority.

Formatting rules:
- Plain text with paragraphs separated by a blank line.
- You may use **bold** for key facts and _italic_ for quoted regulations. Use no other markdown: no headings, no lists with symbols, no tables.
- Do not invent facts about the fine that are not given below.
- Output only the letter."#;

const STRATEGY_PROCEDURAL: &str = r#"Strategy: PROCEDURAL appeal.
Focus on errors in how the fine was issued and served: missing or incorrect mandatory information on the notice, service outside statutory time limits, signage or road marking defects, and failures to follow the required enforcement procedure. Ask for the fine to be cancelled because the procedure was not followed."#;

const STRATEGY_FACTUAL: &str = r#"Strategy: FACTUAL appeal.
Focus on the facts stated on the fine being wrong or incomplete: the vehicle, date, time or location recorded, whether the alleged contravention actually occurred, and any circumstances that explain what happened. Ask the authority to review its evidence and cancel the fine."#;

const STRATEGY_LEGAL: &str = r#"Strategy: LEGAL appeal.
Focus on the legal basis of the fine: whether the cited regulation applies, whether the restriction was lawfully made and in force, exemptions that apply, and proportionality. Refer to the relevant rules in general terms without inventing specific statute numbers. Ask for the fine to be withdrawn as it lacks a valid legal basis."#;

const STRATEGY_COMPREHENSIVE: &str = r#"Strategy: COMPREHENSIVE appeal.
Combine procedural, factual and legal grounds: check the notice for procedural defects, challenge any inaccurate facts, and question the legal basis of the contravention. Present the strongest grounds first and ask for the fine to be cancelled."#;

const PHRASING_TEMPLATE: &str = "Write the letter as a reusable template: use placeholder tokens in square brackets for every personal identifier, e.g. [FULL NAME], [ADDRESS], [EMAIL], [PHONE], [SIGNATURE], [DATE OF LETTER].";

const PHRASING_FIRST_PERSON: &str = "Write the letter in the first person as the vehicle keeper (\"I\", \"my vehicle\"), ready to sign. Do not use placeholder tokens in square brackets.";

/// Strategy block for an appeal type.
pub fn strategy_block(appeal_type: AppealType) -> &'static str {
    match appeal_type {
        AppealType::Procedural => STRATEGY_PROCEDURAL,
        AppealType::Factual => STRATEGY_FACTUAL,
        AppealType::Legal => STRATEGY_LEGAL,
        AppealType::Comprehensive => STRATEGY_COMPREHENSIVE,
    }
}

/// Build the appeal-generation request.
///
/// Sections appear in a fixed order: fine facts, strategy, custom details
/// (verbatim, only if non-blank), phrasing.
pub fn build_appeal_prompt(fine: &FineRecord, options: &AppealOptions) -> PromptSpec {
    let mut user = String::from("Fine details:\n");
    for (label, value) in fine.labelled_fields() {
        let value = value.trim();
        if !value.is_empty() {
            user.push_str(&format!("- {label}: {value}\n"));
        }
    }

    user.push('\n');
    user.push_str(strategy_block(options.appeal_type));
    user.push_str("\n\n");

    if let Some(details) = options.custom_details.as_deref() {
        if !details.trim().is_empty() {
            user.push_str("Additional details from the appellant (use them as stated):\n");
            user.push_str(details);
            user.push_str("\n\n");
        }
    }

    user.push_str(if options.include_template_text {
        PHRASING_TEMPLATE
    } else {
        PHRASING_FIRST_PERSON
    });

    PromptSpec {
        system: APPEAL_SYSTEM_PROMPT.to_string(),
        user,
        image: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fine() -> FineRecord {
        FineRecord {
            reference_number: "PCN-4471".into(),
            date: "2024-03-02".into(),
            amount: "£65".into(),
            location: "High Street".into(),
            reason: "Parked on double yellow lines".into(),
            vehicle: "AB12 CDE".into(),
            additional_info: String::new(),
        }
    }

    #[test]
    fn extraction_prompt_demands_json_only_with_exact_fields() {
        let p = build_extraction_prompt(&ExtractedContent::Text("Notice 1".into()));
        for field in FineRecord::CORE_FIELDS {
            assert!(p.system.contains(&format!("\"{field}\"")), "missing {field}");
        }
        assert!(p.system.contains("empty string"));
        assert!(p.system.contains("ONLY the JSON object"));
        assert!(p.user.contains("Notice 1"));
        assert!(p.image.is_none());
    }

    #[test]
    fn extraction_prompt_attaches_image() {
        let payload = ImagePayload {
            data: vec![1, 2, 3],
            mime_type: "image/jpeg".into(),
            width: 1,
            height: 1,
        };
        let p = build_extraction_prompt(&ExtractedContent::Image(payload.clone()));
        assert_eq!(p.image, Some(payload));
        assert!(p.user.contains("attached image"));
    }

    #[test]
    fn appeal_prompt_is_deterministic() {
        let opts = AppealOptions {
            appeal_type: AppealType::Legal,
            custom_details: Some("I had a valid permit.".into()),
            include_template_text: true,
        };
        assert_eq!(build_appeal_prompt(&fine(), &opts), build_appeal_prompt(&fine(), &opts));
    }

    #[test]
    fn appeal_prompt_selects_strategy() {
        for (ty, marker) in [
            (AppealType::Procedural, "PROCEDURAL"),
            (AppealType::Factual, "FACTUAL"),
            (AppealType::Legal, "LEGAL"),
            (AppealType::Comprehensive, "COMPREHENSIVE"),
        ] {
            let opts = AppealOptions {
                appeal_type: ty,
                ..Default::default()
            };
            let p = build_appeal_prompt(&fine(), &opts);
            assert!(p.user.contains(&format!("Strategy: {marker} appeal")), "{ty}");
        }
    }

    #[test]
    fn unknown_type_falls_back_to_comprehensive_block() {
        let opts: AppealOptions = serde_json::from_str(r#"{"appealType":"whatever"}"#).unwrap();
        let p = build_appeal_prompt(&fine(), &opts);
        assert!(p.user.contains("COMPREHENSIVE"));
    }

    #[test]
    fn custom_details_are_appended_verbatim() {
        let details = "The sign was hidden by a tree.\n  Photo attached.";
        let opts = AppealOptions {
            appeal_type: AppealType::Factual,
            custom_details: Some(details.into()),
            include_template_text: false,
        };
        let p = build_appeal_prompt(&fine(), &opts);
        assert!(p.user.contains(details));
    }

    #[test]
    fn template_flag_switches_phrasing() {
        let mut opts = AppealOptions::default();
        opts.include_template_text = true;
        let template = build_appeal_prompt(&fine(), &opts);
        assert!(template.user.contains("[FULL NAME]"));

        opts.include_template_text = false;
        let personal = build_appeal_prompt(&fine(), &opts);
        assert!(personal.user.contains("first person"));
        assert!(!personal.user.contains("[FULL NAME]"));
    }

    #[test]
    fn empty_fields_are_omitted_from_facts() {
        let mut f = fine();
        f.vehicle.clear();
        let p = build_appeal_prompt(&f, &AppealOptions::default());
        assert!(!p.user.contains("Vehicle:"));
        assert!(p.user.contains("- Reference number: PCN-4471"));
    }
}
