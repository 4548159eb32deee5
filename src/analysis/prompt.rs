use serde_json::json;

use crate::inference::{ToolCallRequest, ToolSpec};

pub const SYSTEM_PROMPT: &str = "You are an experienced, honest and constructive appearance coach. \
You evaluate facial and overall appearance from photos objectively, based on symmetry, \
proportions, skin quality, hair, grooming and presentation. Be direct but respectful, never \
insulting. Focus on factors the person can actually improve. Write every text value in German.";

pub const USER_PROMPT: &str = "Analyze the attached photos of one person. Give an overall looks \
score between 1.0 and 10.0 with one decimal place, where 5.5 is average. List the most notable \
strengths, the most notable weaknesses and the improvement priorities ordered from most to least \
impactful. Where you can judge them, rate the individual features in detail_results. Submit the \
result with the submit_analysis function.";

const FEATURES: [&str; 7] = ["skin", "face_shape", "jawline", "eyes", "hair", "symmetry", "grooming"];

pub fn submit_analysis_tool() -> ToolSpec {
    let feature = json!({
        "type": "object",
        "properties": {
            "score": { "type": "number", "minimum": 1, "maximum": 10 },
            "notes": { "type": "string" }
        },
        "required": ["score"]
    });
    let details: serde_json::Map<String, serde_json::Value> = FEATURES
        .iter()
        .map(|f| (f.to_string(), feature.clone()))
        .collect();

    ToolSpec {
        name: "submit_analysis",
        description: "Submit the structured appearance analysis.",
        parameters: json!({
            "type": "object",
            "properties": {
                "looks_score": { "type": "number", "minimum": 1, "maximum": 10 },
                "strengths": { "type": "array", "items": { "type": "string" }, "minItems": 1 },
                "weaknesses": { "type": "array", "items": { "type": "string" }, "minItems": 1 },
                "priorities": { "type": "array", "items": { "type": "string" }, "minItems": 1 },
                "detail_results": { "type": "object", "properties": details }
            },
            "required": ["looks_score", "strengths", "weaknesses", "priorities"]
        }),
    }
}

pub fn analysis_request(images: Vec<String>) -> ToolCallRequest {
    ToolCallRequest {
        system: SYSTEM_PROMPT.to_string(),
        user_text: USER_PROMPT.to_string(),
        images,
        tool: submit_analysis_tool(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_all_result_lists() {
        let tool = submit_analysis_tool();
        let required = tool.parameters["required"].as_array().unwrap();
        for field in ["looks_score", "strengths", "weaknesses", "priorities"] {
            assert!(required.iter().any(|v| v == field), "{field} not required");
        }
        assert!(tool.parameters["properties"]["detail_results"]["properties"]["jawline"].is_object());
    }
}
