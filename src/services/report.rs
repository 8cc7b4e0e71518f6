//! Markdown rendition of an analysis, labeled in the inquiry's language.
//!
//! Section order and conditional sections follow the browser report:
//! lead score, analysis, competitor conversion (if any), recommendations,
//! quote template (if any), draft, internal notes.

use std::fmt::Write as _;

use crate::domain::analysis::QuoteTemplate;
use crate::domain::{AnalysisResult, Language, Rating};

struct Labels {
    lead_score: &'static str,
    signals: &'static str,
    recommended_action: &'static str,
    analysis: &'static str,
    need: &'static str,
    application: &'static str,
    key_factors: &'static str,
    urgency: &'static str,
    competitor: &'static str,
    currently_using: &'static str,
    tati_equivalent: &'static str,
    switching_angle: &'static str,
    recommendations: &'static str,
    primary: &'static str,
    alternative: &'static str,
    quote: &'static str,
    product: &'static str,
    quantity: &'static str,
    unit_price: &'static str,
    total: &'static str,
    total_estimate: &'static str,
    location: &'static str,
    company: &'static str,
    contact: &'static str,
    notes: &'static str,
    draft: &'static str,
    internal_notes: &'static str,
}

const EN: Labels = Labels {
    lead_score: "🎯 LEAD SCORE",
    signals: "Signals Detected",
    recommended_action: "Recommended Action",
    analysis: "📊 ANALYSIS",
    need: "Need",
    application: "Application",
    key_factors: "Key Factors",
    urgency: "Urgency",
    competitor: "🔄 COMPETITOR CONVERSION",
    currently_using: "Currently Using",
    tati_equivalent: "TATI Equivalent",
    switching_angle: "Switching Angle",
    recommendations: "✅ RECOMMENDED PRODUCT(S)",
    primary: "Primary",
    alternative: "Alternative",
    quote: "📋 QUOTE TEMPLATE",
    product: "Product",
    quantity: "Quantity",
    unit_price: "Unit Price",
    total: "Total",
    total_estimate: "Total Quote Estimate",
    location: "Location",
    company: "Company",
    contact: "Contact",
    notes: "Notes",
    draft: "📧 DRAFT RESPONSE",
    internal_notes: "⚠️ NOTES FOR SALES TEAM",
};

const ES: Labels = Labels {
    lead_score: "🎯 CALIFICACIÓN DEL LEAD",
    signals: "Señales Detectadas",
    recommended_action: "Acción Recomendada",
    analysis: "📊 ANÁLISIS",
    need: "Necesidad",
    application: "Aplicación",
    key_factors: "Factores Clave",
    urgency: "Urgencia",
    competitor: "🔄 CONVERSIÓN DE COMPETIDOR",
    currently_using: "Usa Actualmente",
    tati_equivalent: "Equivalente TATI",
    switching_angle: "Ángulo de Venta",
    recommendations: "✅ PRODUCTO(S) RECOMENDADO(S)",
    primary: "Principal",
    alternative: "Alternativa",
    quote: "📋 PLANTILLA DE COTIZACIÓN",
    product: "Producto",
    quantity: "Cantidad",
    unit_price: "Precio Unitario",
    total: "Total",
    total_estimate: "Total Estimado de la Cotización",
    location: "Ubicación",
    company: "Empresa",
    contact: "Contacto",
    notes: "Notas",
    draft: "📧 RESPUESTA BORRADOR",
    internal_notes: "⚠️ NOTAS PARA EL EQUIPO",
};

fn labels(language: Language) -> &'static Labels {
    match language {
        Language::En => &EN,
        Language::Es => &ES,
    }
}

fn rating_badge(rating: Rating) -> &'static str {
    match rating {
        Rating::Hot => "🔥",
        Rating::Warm => "🟡",
        Rating::Cold => "🔵",
    }
}

/// Render the full report. `String` writes cannot fail, so write results are ignored.
pub fn render_markdown(result: &AnalysisResult) -> String {
    let l = labels(result.language);
    let mut out = String::new();

    let score = &result.lead_score;
    let _ = writeln!(
        out,
        "## {}\n\n**{} {} ({} pts)**\n",
        l.lead_score,
        rating_badge(score.rating),
        score.rating.as_str(),
        score.score
    );
    let _ = writeln!(out, "**{}:** {}\n", l.signals, or_dash(&score.signals.join(", ")));
    let _ = writeln!(out, "**{}:** {}\n", l.recommended_action, score.recommended_action);

    let a = &result.analysis;
    let _ = writeln!(out, "## {}\n", l.analysis);
    let _ = writeln!(out, "- **{}:** {}", l.need, a.customer_need);
    let _ = writeln!(out, "- **{}:** {}", l.application, a.application);
    let _ = writeln!(out, "- **{}:** {}", l.key_factors, a.key_factors);
    let _ = writeln!(out, "- **{}:** {}\n", l.urgency, a.urgency);

    if let Some(c) = &result.competitor_conversion {
        let _ = writeln!(out, "## {}\n", l.competitor);
        let _ = writeln!(out, "- **{}:** {}", l.currently_using, c.currently_using);
        let _ = writeln!(out, "- **{}:** {}", l.tati_equivalent, c.tati_equivalent);
        let _ = writeln!(out, "- **{}:** _{}_\n", l.switching_angle, c.switching_angle);
    }

    let r = &result.recommendations;
    let _ = writeln!(out, "## {}\n", l.recommendations);
    let _ = writeln!(out, "**{}: {}**  \n→ {}\n", l.primary, r.primary, r.primary_reasoning);
    if let Some(alt) = &r.alternative {
        let _ = writeln!(
            out,
            "**{}: {}**  \n→ {}\n",
            l.alternative,
            alt,
            r.alternative_reasoning.as_deref().unwrap_or("")
        );
    }

    if let Some(q) = &result.quote_template {
        render_quote(&mut out, l, q);
    }

    let _ = writeln!(out, "## {}\n\n```text\n{}\n```\n", l.draft, result.draft.trim_end());
    let _ = writeln!(out, "## {}\n\n{}", l.internal_notes, result.internal_notes);

    out
}

fn render_quote(out: &mut String, l: &Labels, q: &QuoteTemplate) {
    let _ = writeln!(out, "## {}\n", l.quote);
    let _ = writeln!(out, "| {} | {} | {} | {} |", l.product, l.quantity, l.unit_price, l.total);
    let _ = writeln!(out, "|---|---|---|---|");
    for item in &q.line_items {
        let _ = writeln!(
            out,
            "| {} | {} | $ ______ | $ ______ |",
            cell(&item.product),
            cell(&item.quantity)
        );
    }
    let _ = writeln!(out, "| **{}** | | | $ ______ |\n", l.total_estimate);

    let _ = writeln!(out, "- **{}:** {}", l.location, or_dash(&q.location));
    let _ = writeln!(out, "- **{}:** {}", l.company, or_dash(&q.company));
    if !q.contact.trim().is_empty() || !q.contact_info.trim().is_empty() {
        let contact = [q.contact.trim(), q.contact_info.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" · ");
        let _ = writeln!(out, "- **{}:** {}", l.contact, contact);
    }
    if !q.notes.trim().is_empty() {
        let _ = writeln!(out, "- **{}:** {}", l.notes, q.notes.trim());
    }
    out.push('\n');
}

fn or_dash(s: &str) -> &str {
    if s.trim().is_empty() {
        "—"
    } else {
        s
    }
}

fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}
