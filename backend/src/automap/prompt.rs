//! Prompts for AI-assisted field mapping.

use serde_json::{json, Value};

use crate::models::FieldDefinition;

use super::AutomapRequest;

/// System prompt describing the task and the expected response shape.
pub fn system_prompt() -> String {
    r#"You are a data integration assistant. You match the fields of an external source system to the fields of an internal entity.

## Output Format

Return ONLY a JSON object of this shape:

```json
{
  "suggestions": [
    { "source": "<source field name>", "destination": "<destination field name>", "confidence": 0.0 }
  ]
}
```

## Rules

1. `source` must be one of the listed source fields, spelled exactly.
2. `destination` must be one of the listed destination field names (not the label).
3. Each destination appears at most once.
4. A source field may feed several destinations.
5. `confidence` is between 0 and 1. Use values above 0.8 only when names or sample values leave no doubt.
6. Prefer mapping every required destination field when a plausible source exists.
7. Leave out destinations with no plausible source.
8. Return ONLY the JSON object, no explanations."#
        .to_string()
}

fn destination_table(fields: &[FieldDefinition]) -> String {
    let mut out = String::from("| name | label | type | required |\n|---|---|---|---|\n");
    for f in fields {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            f.name,
            f.label,
            f.data_type,
            if f.required { "yes" } else { "no" }
        ));
    }
    out
}

/// User prompt carrying the fields and sample data.
pub fn user_prompt(request: &AutomapRequest) -> String {
    let sources = request
        .source_fields
        .iter()
        .map(|s| format!("- {}", s))
        .collect::<Vec<_>>()
        .join("\n");
    let sample = serde_json::to_string_pretty(&request.sample_data).unwrap_or_default();
    let destinations = destination_table(&request.destination_fields);
    let entity = &request.entity;

    format!(
        r#"## Source Fields

{sources}

## Sample Record

```json
{sample}
```

## Destination Entity: {entity}

{destinations}
## Task

Suggest a mapping from source fields to {entity} fields."#
    )
}

/// Messages array for the Messages API.
pub fn build_messages(request: &AutomapRequest) -> Vec<Value> {
    vec![json!({
        "role": "user",
        "content": user_prompt(request)
    })]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataType;
    use serde_json::Map;

    #[test]
    fn test_system_prompt_describes_shape() {
        let prompt = system_prompt();
        assert!(prompt.contains("\"suggestions\""));
        assert!(prompt.contains("confidence"));
    }

    #[test]
    fn test_user_prompt_includes_fields_and_sample() {
        let mut sample = Map::new();
        sample.insert("EQ_NO".into(), json!("CR-100"));
        let request = AutomapRequest {
            source_fields: vec!["EQ_NO".into()],
            destination_fields: vec![FieldDefinition::new("assetTag", "Asset Tag", DataType::String).required()],
            entity: "Asset".into(),
            sample_data: sample,
        };

        let prompt = user_prompt(&request);
        assert!(prompt.contains("- EQ_NO"));
        assert!(prompt.contains("CR-100"));
        assert!(prompt.contains("| assetTag | Asset Tag | string | yes |"));
        assert!(prompt.contains("Destination Entity: Asset"));
        assert_eq!(build_messages(&request)[0]["role"], "user");
    }
}
