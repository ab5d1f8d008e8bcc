//! Intent → reply plan table
//!
//! Every [`IntentLabel`] maps to exactly one plan in [`plan_for_label`]; a
//! new label does not compile until it is given one. Multi-intent batches
//! merge their plans with a fixed precedence:
//! handoff > grounded generation > clarification > template.

use support_agent_core::{IntentLabel, IntentResult};

/// Canned reply for pure small talk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Template {
    Greeting,
    Thanks,
    Farewell,
}

impl Template {
    pub fn text(&self) -> &'static str {
        match self {
            Template::Greeting => "Merhaba! Size nasıl yardımcı olabilirim?",
            Template::Thanks => "Rica ederim, yardımcı olabildiysem ne mutlu bana.",
            Template::Farewell => "Görüşmek üzere, iyi günler dilerim!",
        }
    }
}

/// Sources and tools for a generated reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Grounding {
    pub faq: bool,
    pub documents: bool,
    pub product_search: bool,
    pub order_lookup: bool,
}

impl Grounding {
    pub const EVERYTHING: Grounding = Grounding {
        faq: true,
        documents: true,
        product_search: true,
        order_lookup: true,
    };

    fn union(self, other: Grounding) -> Grounding {
        Grounding {
            faq: self.faq || other.faq,
            documents: self.documents || other.documents,
            product_search: self.product_search || other.product_search,
            order_lookup: self.order_lookup || other.order_lookup,
        }
    }

    pub fn uses_retrieval(&self) -> bool {
        self.faq || self.documents
    }
}

/// What the composer does with a pending batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPlan {
    /// Route to a human agent, no generation
    Handoff,
    /// Ask the disambiguating question from the classifier
    Clarify(String),
    /// Fixed small-talk reply
    Template(Template),
    /// Model-generated reply over the given sources
    Generate(Grounding),
}

/// Plan for a single label
pub fn plan_for_label(label: IntentLabel) -> ReplyPlan {
    match label {
        IntentLabel::Greeting => ReplyPlan::Template(Template::Greeting),
        IntentLabel::Thanks => ReplyPlan::Template(Template::Thanks),
        IntentLabel::Farewell => ReplyPlan::Template(Template::Farewell),
        // A bare "yes" answers the previous turn; the model needs history and tools
        IntentLabel::Confirmation => ReplyPlan::Generate(Grounding {
            product_search: true,
            order_lookup: true,
            ..Grounding::default()
        }),
        IntentLabel::HumanRequest => ReplyPlan::Handoff,
        IntentLabel::ClarificationNeeded => ReplyPlan::Clarify(String::new()),
        IntentLabel::ProductQuery => ReplyPlan::Generate(Grounding {
            faq: true,
            product_search: true,
            ..Grounding::default()
        }),
        IntentLabel::OrderQuery => ReplyPlan::Generate(Grounding {
            faq: true,
            order_lookup: true,
            ..Grounding::default()
        }),
        IntentLabel::GeneralQuestion | IntentLabel::Complaint | IntentLabel::Other => {
            ReplyPlan::Generate(Grounding::EVERYTHING)
        },
    }
}

/// Merge the plans of every detected intent
///
/// With handoff disabled, a human request is answered like a general
/// question.
pub fn plan(intent: &IntentResult, handoff_enabled: bool) -> ReplyPlan {
    let mut handoff = false;
    let mut grounding: Option<Grounding> = None;
    let mut clarify = false;
    let mut template: Option<Template> = None;

    for label in &intent.intents {
        match plan_for_label(*label) {
            ReplyPlan::Handoff if handoff_enabled => handoff = true,
            ReplyPlan::Handoff => {
                grounding = Some(grounding.unwrap_or_default().union(Grounding::EVERYTHING));
            },
            ReplyPlan::Generate(g) => {
                grounding = Some(grounding.unwrap_or_default().union(g));
            },
            ReplyPlan::Clarify(_) => clarify = true,
            ReplyPlan::Template(t) => {
                template = Some(template.map_or(t, |current| current.min(t)));
            },
        }
    }

    if handoff {
        return ReplyPlan::Handoff;
    }
    if let Some(grounding) = grounding {
        return ReplyPlan::Generate(grounding);
    }
    if clarify {
        return match &intent.clarification {
            Some(question) => ReplyPlan::Clarify(question.clone()),
            None => ReplyPlan::Generate(Grounding::EVERYTHING),
        };
    }
    match template {
        Some(t) => ReplyPlan::Template(t),
        None => ReplyPlan::Generate(Grounding::EVERYTHING),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intents(labels: &[IntentLabel]) -> IntentResult {
        IntentResult::new(labels.iter().copied(), "q")
    }

    #[test]
    fn test_every_label_has_a_plan() {
        for label in IntentLabel::ALL {
            let _ = plan_for_label(label);
        }
        assert_eq!(plan_for_label(IntentLabel::HumanRequest), ReplyPlan::Handoff);
    }

    #[test]
    fn test_template_priority() {
        let result = plan(&intents(&[IntentLabel::Thanks, IntentLabel::Greeting]), true);
        assert_eq!(result, ReplyPlan::Template(Template::Greeting));
    }

    #[test]
    fn test_grounded_beats_small_talk() {
        let result = plan(&intents(&[IntentLabel::Greeting, IntentLabel::ProductQuery]), true);
        assert_eq!(
            result,
            ReplyPlan::Generate(Grounding {
                faq: true,
                product_search: true,
                ..Grounding::default()
            })
        );
    }

    #[test]
    fn test_union_of_grounded_plans() {
        let result = plan(&intents(&[IntentLabel::ProductQuery, IntentLabel::OrderQuery]), true);
        let ReplyPlan::Generate(g) = result else {
            panic!("expected generation");
        };
        assert!(g.product_search && g.order_lookup && g.faq);
        assert!(!g.documents);
    }

    #[test]
    fn test_handoff_precedence_and_toggle() {
        let batch = intents(&[IntentLabel::HumanRequest, IntentLabel::Complaint]);
        assert_eq!(plan(&batch, true), ReplyPlan::Handoff);
        assert_eq!(plan(&batch, false), ReplyPlan::Generate(Grounding::EVERYTHING));
    }

    #[test]
    fn test_clarification_uses_question() {
        let batch = intents(&[IntentLabel::ClarificationNeeded, IntentLabel::Greeting])
            .with_clarification("Hangi ürünü arıyorsunuz?");
        assert_eq!(
            plan(&batch, true),
            ReplyPlan::Clarify("Hangi ürünü arıyorsunuz?".into())
        );
    }

    #[test]
    fn test_empty_intents_generate() {
        assert_eq!(plan(&intents(&[]), true), ReplyPlan::Generate(Grounding::EVERYTHING));
    }
}
