//! System instruction sent with every analysis.
//!
//! The competitor table and scoring rubric live here as data so the prompt
//! text and the local rating check share the same numbers. Deployments can
//! replace the whole text with `PROMPT_TEMPLATE_PATH`; both providers always
//! receive the identical instruction.

use anyhow::{bail, Context, Result};
use std::fmt::Write as _;
use std::path::Path;

use crate::domain::analysis::{HOT_THRESHOLD, WARM_THRESHOLD};

pub const BUILTIN_VERSION: &str = "builtin-1";

/// Prefix for the user's inquiry text.
pub const INQUIRY_PREFIX: &str = "Analyze this inquiry: ";

/// Sent when a document arrives without any inquiry text.
pub const DOCUMENT_ONLY_INSTRUCTION: &str = "Please analyze the attached document.";

pub struct CompetitorMapping {
    pub vendor: &'static str,
    pub products: &'static [&'static str],
}

pub const COMPETITOR_MAPPINGS: &[CompetitorMapping] = &[
    CompetitorMapping { vendor: "ChampionX", products: &["RF series", "TATICHEM 153", "TATISCALE 327"] },
    CompetitorMapping { vendor: "Halliburton", products: &["RF series", "TATIMUL", "TATILINK"] },
    CompetitorMapping { vendor: "Schlumberger/SLB/M-I SWACO", products: &["TATIMUL", "TATIVIS", "TATIMOD"] },
    CompetitorMapping { vendor: "Newpark", products: &["TATIVIS", "TATIMUL", "TATITROL"] },
    CompetitorMapping { vendor: "Innospec", products: &["TATICHEM 153", "TATIFIN 91"] },
    CompetitorMapping { vendor: "Clariant", products: &["TATICHEM 153", "TATISCALE 327", "TATIFIN 91"] },
    CompetitorMapping { vendor: "Baker Hughes", products: &["RF series", "Production line"] },
    CompetitorMapping { vendor: "Flotek", products: &["TATISURF 30-N", "60-M"] },
    CompetitorMapping { vendor: "Kemira", products: &["RF series", "TATICYDE 900"] },
];

pub const SWITCHING_ANGLE: &str =
    "Mention competitive pricing, Houston support, bilingual service, fast delivery to MX/LATAM.";

pub struct ScoringSignal {
    pub label: &'static str,
    pub points: i64,
}

pub const SCORING_RUBRIC: &[ScoringSignal] = &[
    ScoringSignal { label: "Specific volume", points: 2 },
    ScoringSignal { label: "Asked for quote/pricing", points: 2 },
    ScoringSignal { label: "Urgency (ASAP/urgent)", points: 2 },
    ScoringSignal { label: "Recurring need", points: 1 },
    ScoringSignal { label: "Tech details provided", points: 1 },
    ScoringSignal { label: "Location specified", points: 1 },
    ScoringSignal { label: "Company provided", points: 1 },
    ScoringSignal { label: "Vague", points: -1 },
];

const PREAMBLE: &str = r#"
You are the Internal Sales Assistant for Texas American Trade Inc. (TATI).
Your purpose is to help the sales team respond to customer inquiries faster and more accurately.

ANALYSIS GUIDELINES:
1. Identify customer needs, application, key factors, and urgency.
2. Recommend products from the catalog.
3. Draft a professional response in the same language as the inquiry.
4. Provide internal sales notes.
"#;

const QUOTE_TRIGGER: &str = r#"
QUOTE TEMPLATE TRIGGER:
Trigger "quoteTemplate" ONLY if: (Product identified) AND (Quantity mentioned) AND (Location provided).
"#;

const OUTPUT_FORMAT: &str = r#"
STRICT OUTPUT FORMAT (JSON):
{
  "analysis": { "customerNeed": "", "application": "", "keyFactors": "", "urgency": "" },
  "competitorConversion": { "currentlyUsing": "", "tatiEquivalent": "", "switchingAngle": "" }, // Only if competitor mentioned
  "recommendations": { "primary": "", "primaryReasoning": "", "alternative": "", "alternativeReasoning": "" },
  "quoteTemplate": { // Only if product + qty + location provided
    "company": "", "contact": "", "contactInfo": "", "location": "",
    "lineItems": [{ "product": "", "quantity": "" }],
    "notes": ""
  },
  "draft": "",
  "leadScore": { "score": number, "rating": "HOT"|"WARM"|"COLD", "signals": [], "recommendedAction": "" },
  "internalNotes": "",
  "language": "en" | "es"
}
"#;

/// Render the built-in system instruction.
pub fn builtin_instruction() -> String {
    let mut text = String::from(PREAMBLE);

    text.push_str("\nCOMPETITOR MAPPING:\n");
    for mapping in COMPETITOR_MAPPINGS {
        let _ = writeln!(text, "- {} -> {}", mapping.vendor, mapping.products.join(", "));
    }
    let _ = writeln!(text, "Switching Angle: {}", SWITCHING_ANGLE);

    text.push_str("\nLEAD SCORING:\n");
    for signal in SCORING_RUBRIC {
        let _ = writeln!(text, "- {}: {:+}", signal.label, signal.points);
    }
    let _ = writeln!(
        text,
        "Rating: HOT ({}+), WARM ({}-{}), COLD (0-{}).",
        HOT_THRESHOLD,
        WARM_THRESHOLD,
        HOT_THRESHOLD - 1,
        WARM_THRESHOLD - 1
    );

    text.push_str(QUOTE_TRIGGER);
    text.push_str(OUTPUT_FORMAT);
    text
}

/// Versioned system instruction.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub version: String,
    pub text: String,
}

impl PromptTemplate {
    pub fn builtin() -> Self {
        Self {
            version: BUILTIN_VERSION.to_string(),
            text: builtin_instruction(),
        }
    }

    /// Load the instruction from `path`, or use the built-in one.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::builtin());
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt template {}", path.display()))?;
        if text.trim().is_empty() {
            bail!("Prompt template {} is empty", path.display());
        }

        tracing::info!(path = %path.display(), "Loaded prompt template from file");

        Ok(Self {
            version: format!("file:{}", path.display()),
            text,
        })
    }
}

/// Labeled inquiry text, or `None` when the inquiry is blank.
pub fn inquiry_instruction(inquiry: &str) -> Option<String> {
    if inquiry.trim().is_empty() {
        None
    } else {
        Some(format!("{}{}", INQUIRY_PREFIX, inquiry))
    }
}
