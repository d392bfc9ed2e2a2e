//! Prompt templates for the LLM judge.
//!
//! Three templates: pointwise scoring (with reviewer personas), pairwise
//! comparison, and persona recommendation. All user-provided text is XML
//! escaped before substitution.

use crate::gateway::Message;

// =============================================================================
// Rendering
// =============================================================================

/// Rendered prompt ready for the gateway.
#[derive(Debug, Clone)]
pub struct PromptInstance {
    pub template_slug: &'static str,
    pub system: String,
    pub user: String,
}

impl PromptInstance {
    pub fn to_messages(&self) -> Vec<Message> {
        vec![Message::system(&self.system), Message::user(&self.user)]
    }
}

/// Escape XML special characters so player text cannot close our tags.
fn escape_xml_chars(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// A prompt template with `{placeholder}` slots.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub slug: &'static str,
    pub system: &'static str,
    pub user: &'static str,
}

impl PromptTemplate {
    /// Substitute every `(name, value)` pair; values are escaped.
    pub fn render(&self, vars: &[(&str, &str)]) -> PromptInstance {
        let mut system = self.system.to_string();
        let mut user = self.user.to_string();
        for (name, value) in vars {
            let placeholder = format!("{{{name}}}");
            let safe = escape_xml_chars(value.trim());
            system = system.replace(&placeholder, &safe);
            user = user.replace(&placeholder, &safe);
        }
        PromptInstance {
            template_slug: self.slug,
            system: system.trim().to_string(),
            user: user.trim().to_string(),
        }
    }

    /// Stable hash of the template text, used in cache keys.
    pub fn hash(&self) -> String {
        blake3::hash(format!("{}\n{}", self.system, self.user).as_bytes())
            .to_hex()
            .to_string()
    }
}

// =============================================================================
// Templates
// =============================================================================

pub const POINTWISE_PROMPT: PromptTemplate = PromptTemplate {
    slug: "pointwise_v1",
    system: r#"You are a review panel of three experts:
<personas>
{personas}
</personas>
Each expert reads the candidate independently against the criterion, then the panel agrees on one score from 0 (fails the criterion entirely) to 100 (could not be better).

Output only valid JSON: {"score": <number 0-100>, "rationale": "<one sentence>"}"#,
    user: r#"<criterion>
{criterion}
</criterion>

<candidate>
{content}
</candidate>

json:"#,
};

pub const PAIRWISE_PROMPT: PromptTemplate = PromptTemplate {
    slug: "pairwise_v1",
    system: r#"You are an impartial judge. Compare two candidates against a criterion and decide which one satisfies it better. Ignore length and position; judge only the criterion. If they are genuinely indistinguishable, call a draw.

Output only valid JSON: {"winner": "player_a" | "player_b" | "draw", "rationale": "<one sentence>"}"#,
    user: r#"<criterion>
{criterion}
</criterion>

<player_a>
{content_a}
</player_a>

<player_b>
{content_b}
</player_b>

json:"#,
};

pub const PERSONA_PROMPT: PromptTemplate = PromptTemplate {
    slug: "personas_v1",
    system: r#"You assemble review panels. Given an evaluation criterion and a few sample candidates, name three complementary reviewer roles whose combined judgement would score candidates fairly against that criterion.

Output only valid JSON: {"personas": [{"name": "...", "description": "..."}, {...}, {...}]}"#,
    user: r#"<criterion>
{criterion}
</criterion>

<samples>
{samples}
</samples>

json:"#,
};
