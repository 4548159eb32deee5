use std::fmt::Write as _;

use serde_json::json;

use super::dto::TaskCategory;
use crate::{
    analysis::Analysis,
    inference::{ToolCallRequest, ToolSpec},
};

pub const MIN_TASKS: usize = 20;

pub const SYSTEM_PROMPT: &str = "You are a personal appearance and self-improvement coach. \
You turn an appearance analysis into a concrete, realistic improvement plan. Every task must be \
actionable, specific and safe; no medical procedures, no crash diets. Write titles and \
descriptions in German.";

pub fn user_prompt(context: &str) -> String {
    format!(
        "Create a personalized improvement plan for this analysis:\n\n{context}\n\n\
         Generate at least {MIN_TASKS} tasks spread across all categories \
         (skincare, hair, body, style, teeth, mindset). Address the priorities first and give \
         them priority 1; use 2 for important and 3 for nice-to-have tasks. \
         Submit the plan with the generate_plan function."
    )
}

/// Flattens the analysis into the text block the plan prompt is built on.
pub fn analysis_context(a: &Analysis) -> String {
    let mut out = String::new();
    if let Some(score) = a.looks_score {
        let _ = writeln!(out, "Looks score: {score:.1}/10");
    }
    for (label, items) in [
        ("Strengths", &a.strengths),
        ("Weaknesses", &a.weaknesses),
        ("Priorities", &a.priorities),
    ] {
        if let Some(items) = items.as_ref().filter(|v| !v.is_empty()) {
            let _ = writeln!(out, "{label}: {}", items.join(", "));
        }
    }
    if let Some(details) = a.detail_results.as_ref().and_then(|d| d.as_object()) {
        let _ = writeln!(out, "Details:");
        for (feature, value) in details {
            let score = value.get("score").and_then(|s| s.as_f64());
            let notes = value.get("notes").and_then(|s| s.as_str()).unwrap_or("");
            match score {
                Some(score) => {
                    let _ = writeln!(out, "- {feature}: {score}/10 {notes}");
                }
                None => {
                    let _ = writeln!(out, "- {feature}: {value}");
                }
            }
        }
    }
    out.trim_end().to_string()
}

pub fn generate_plan_tool() -> ToolSpec {
    let categories: Vec<&str> = TaskCategory::ALL.iter().map(|c| c.as_str()).collect();
    ToolSpec {
        name: "generate_plan",
        description: "Submit the personalized improvement plan.",
        parameters: json!({
            "type": "object",
            "properties": {
                "tasks": {
                    "type": "array",
                    "minItems": MIN_TASKS,
                    "items": {
                        "type": "object",
                        "properties": {
                            "category": { "type": "string", "enum": categories },
                            "title": { "type": "string" },
                            "description": { "type": "string" },
                            "priority": { "type": "integer", "minimum": 1, "maximum": 3 }
                        },
                        "required": ["category", "title", "description", "priority"]
                    }
                }
            },
            "required": ["tasks"]
        }),
    }
}

pub fn plan_request(analysis: &Analysis) -> ToolCallRequest {
    ToolCallRequest {
        system: SYSTEM_PROMPT.to_string(),
        user_text: user_prompt(&analysis_context(analysis)),
        images: Vec::new(),
        tool: generate_plan_tool(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisStatus;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn analysis() -> Analysis {
        Analysis {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            photo_paths: vec!["p.jpg".into()],
            status: AnalysisStatus::Completed,
            looks_score: Some(7.3),
            strengths: Some(vec!["Symmetrie".into(), "Augen".into()]),
            weaknesses: Some(vec!["Akne".into()]),
            priorities: Some(vec!["Hautpflege".into()]),
            detail_results: Some(json!({ "skin": { "score": 5.5, "notes": "leichte Akne" } })),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn context_lists_every_field() {
        let ctx = analysis_context(&analysis());
        assert!(ctx.contains("Looks score: 7.3/10"));
        assert!(ctx.contains("Strengths: Symmetrie, Augen"));
        assert!(ctx.contains("Weaknesses: Akne"));
        assert!(ctx.contains("Priorities: Hautpflege"));
        assert!(ctx.contains("- skin: 5.5/10 leichte Akne"));
    }

    #[test]
    fn context_skips_missing_fields() {
        let mut a = analysis();
        a.weaknesses = None;
        a.detail_results = None;
        let ctx = analysis_context(&a);
        assert!(!ctx.contains("Weaknesses"));
        assert!(!ctx.contains("Details"));
    }

    #[test]
    fn tool_schema_enumerates_all_categories() {
        let tool = generate_plan_tool();
        let cats = &tool.parameters["properties"]["tasks"]["items"]["properties"]["category"]["enum"];
        assert_eq!(cats.as_array().unwrap().len(), 6);
        assert_eq!(tool.parameters["properties"]["tasks"]["minItems"], MIN_TASKS);
    }
}
