//! Structured analysis returned by the model.
//!
//! Field names follow the JSON contract embedded in the system prompt
//! (camelCase). The model fills these in; `enforce_invariants` is the
//! client-side check of what the prompt only asks for.

use serde::{de, Deserialize, Deserializer, Serialize};

/// Lowest score rated HOT.
pub const HOT_THRESHOLD: i64 = 6;
/// Lowest score rated WARM.
pub const WARM_THRESHOLD: i64 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub analysis: InquiryAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor_conversion: Option<CompetitorConversion>,
    pub recommendations: Recommendations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_template: Option<QuoteTemplate>,
    pub draft: String,
    pub lead_score: LeadScore,
    pub internal_notes: String,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryAnalysis {
    pub customer_need: String,
    pub application: String,
    pub key_factors: String,
    pub urgency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompetitorConversion {
    pub currently_using: String,
    pub tati_equivalent: String,
    pub switching_angle: String,
}

impl CompetitorConversion {
    fn is_blank(&self) -> bool {
        [&self.currently_using, &self.tati_equivalent, &self.switching_angle]
            .iter()
            .all(|s| s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub primary: String,
    pub primary_reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_reasoning: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuoteTemplate {
    pub company: String,
    pub contact: String,
    pub contact_info: String,
    pub location: String,
    pub line_items: Vec<LineItem>,
    pub notes: String,
}

impl QuoteTemplate {
    fn is_blank(&self) -> bool {
        [&self.company, &self.contact, &self.contact_info, &self.location, &self.notes]
            .iter()
            .all(|s| s.trim().is_empty())
            && self.line_items.iter().all(LineItem::is_blank)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    pub product: String,
    pub quantity: String,
}

impl LineItem {
    fn is_blank(&self) -> bool {
        self.product.trim().is_empty() && self.quantity.trim().is_empty()
    }

    fn is_quotable(&self) -> bool {
        !self.product.trim().is_empty() && !self.quantity.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadScore {
    #[serde(deserialize_with = "deserialize_score")]
    pub score: i64,
    pub rating: Rating,
    #[serde(default)]
    pub signals: Vec<String>,
    pub recommended_action: String,
}

impl LeadScore {
    /// Rating the published thresholds assign to `score`.
    pub fn expected_rating(&self) -> Rating {
        Rating::from_score(self.score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    #[serde(rename = "HOT", alias = "Hot", alias = "hot")]
    Hot,
    #[serde(rename = "WARM", alias = "Warm", alias = "warm")]
    Warm,
    #[serde(rename = "COLD", alias = "Cold", alias = "cold")]
    Cold,
}

impl Rating {
    pub fn from_score(score: i64) -> Self {
        if score >= HOT_THRESHOLD {
            Self::Hot
        } else if score >= WARM_THRESHOLD {
            Self::Warm
        } else {
            Self::Cold
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "HOT",
            Self::Warm => "WARM",
            Self::Cold => "COLD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en", alias = "EN")]
    En,
    #[serde(rename = "es", alias = "ES")]
    Es,
}

/// The schema types `score` as NUMBER, so whole-valued floats show up.
fn deserialize_score<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawScore {
        Int(i64),
        Float(f64),
    }

    match RawScore::deserialize(deserializer)? {
        RawScore::Int(n) => Ok(n),
        RawScore::Float(f) if f.is_finite() => Ok(f.round() as i64),
        RawScore::Float(_) => Err(de::Error::custom("score must be a finite number")),
    }
}

impl AnalysisResult {
    /// Normalize empty optional sections and drop a quote template the
    /// inquiry could not have triggered. Returns human-readable warnings;
    /// nothing here is fatal.
    pub fn enforce_invariants(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self
            .competitor_conversion
            .as_ref()
            .is_some_and(CompetitorConversion::is_blank)
        {
            self.competitor_conversion = None;
        }

        let recs = &mut self.recommendations;
        if recs.alternative.as_deref().is_some_and(|s| s.trim().is_empty()) {
            recs.alternative = None;
            recs.alternative_reasoning = None;
        }

        if let Some(quote) = self.quote_template.take() {
            if !quote.is_blank() {
                match self.quote_rejection(&quote) {
                    Some(reason) => warnings.push(format!("quoteTemplate dropped: {}", reason)),
                    None => self.quote_template = Some(quote),
                }
            }
        }

        let expected = self.lead_score.expected_rating();
        if expected != self.lead_score.rating {
            warnings.push(format!(
                "leadScore.rating {} does not match score {} (expected {})",
                self.lead_score.rating.as_str(),
                self.lead_score.score,
                expected.as_str()
            ));
        }

        warnings
    }

    fn quote_rejection(&self, quote: &QuoteTemplate) -> Option<&'static str> {
        if self.recommendations.primary.trim().is_empty() {
            Some("no primary product recommended")
        } else if quote.location.trim().is_empty() {
            Some("no location given")
        } else if !quote.line_items.iter().any(LineItem::is_quotable) {
            Some("no line item with both product and quantity")
        } else {
            None
        }
    }
}
