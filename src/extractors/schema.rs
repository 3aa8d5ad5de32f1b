// src/extractors/schema.rs
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::utils::error::SchemaError;

/// Spreadsheet header, in `Record` field order.
pub const COLUMNS: [&str; 4] = ["numero", "razon_social", "rut", "domicilio"];

// ```json ... ``` or bare ``` ... ``` blocks
static FENCED_JSON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").expect("Failed to compile FENCED_JSON_RE")
});

/// One row of a section table. JSON field names match the sheet columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "numero", default)]
    pub number: Option<String>,
    #[serde(rename = "razon_social")]
    pub legal_name: String,
    #[serde(rename = "rut")]
    pub tax_id: String,
    #[serde(rename = "domicilio")]
    pub address: String,
}

impl Record {
    /// Cell values in `COLUMNS` order; an absent number is an empty cell.
    pub fn cells(&self) -> [&str; 4] {
        [
            self.number.as_deref().unwrap_or(""),
            self.legal_name.as_str(),
            self.tax_id.as_str(),
            self.address.as_str(),
        ]
    }
}

/// Everything the model extracted for one section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionResult {
    pub items: Vec<Record>,
}

impl SectionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// JSON Schema of `SectionResult`, as shown to the model.
pub fn json_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "items": {
                "type": "array",
                "description": "Lista de instituciones extraídas de la sección solicitada",
                "items": {
                    "type": "object",
                    "properties": {
                        "numero": {
                            "type": ["string", "null"],
                            "description": "El número de lista (Nº)"
                        },
                        "razon_social": {
                            "type": "string",
                            "description": "El nombre o Razón Social de la empresa"
                        },
                        "rut": {
                            "type": "string",
                            "description": "El RUT de la empresa"
                        },
                        "domicilio": {
                            "type": "string",
                            "description": "La dirección o domicilio de la empresa"
                        }
                    },
                    "required": ["razon_social", "rut", "domicilio"]
                }
            }
        },
        "required": ["items"]
    })
}

/// Output contract appended to every prompt.
pub fn format_instructions() -> String {
    let schema = serde_json::to_string(&json_schema()).unwrap_or_default();
    format!(
        "The output should be formatted as a JSON instance that conforms to the JSON schema below.\n\
         \n\
         As an example, for the schema {{\"properties\": {{\"foo\": {{\"type\": \"array\", \"items\": {{\"type\": \"string\"}}}}}}, \"required\": [\"foo\"]}}\n\
         the object {{\"foo\": [\"bar\", \"baz\"]}} is a well-formatted instance of the schema. \
         The object {{\"properties\": {{\"foo\": [\"bar\", \"baz\"]}}}} is not well-formatted.\n\
         \n\
         Here is the output schema:\n\
         ```\n{}\n```",
        schema
    )
}

/// Parses a raw model response into a `SectionResult`.
///
/// The JSON object may be wrapped in a code fence or surrounded by prose;
/// the object itself is validated strictly (no coercion, no defaults for
/// required fields).
pub fn parse_section_result(response: &str) -> Result<SectionResult, SchemaError> {
    let payload = locate_json(response).ok_or(SchemaError::NoJsonFound)?;
    tracing::trace!("Parsing {} bytes of JSON payload", payload.len());
    let result: SectionResult = serde_json::from_str(payload)?;
    Ok(result)
}

fn locate_json(response: &str) -> Option<&str> {
    let trimmed = response.trim();
    let candidate = FENCED_JSON_RE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    let start = candidate.find('{')?;
    let end = candidate.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&candidate[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_plain_json() {
        let raw = r#"{"items": [
            {"numero": "1", "razon_social": "Empresa Eléctrica S.A.", "rut": "76.123.456-7", "domicilio": "Av. Apoquindo 123, Las Condes"},
            {"numero": "2", "razon_social": "Transmisora Sur SpA", "rut": "96.555.111-K", "domicilio": "Calle Uno 45, Temuco"}
        ]}"#;

        let result = parse_section_result(raw).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result.items[0].legal_name, "Empresa Eléctrica S.A.");
        assert_eq!(result.items[1].tax_id, "96.555.111-K");
        assert_eq!(result.items[1].cells(), ["2", "Transmisora Sur SpA", "96.555.111-K", "Calle Uno 45, Temuco"]);
    }

    #[test]
    fn test_number_may_be_absent_or_null() {
        let raw = r#"{"items": [
            {"razon_social": "A", "rut": "1-9", "domicilio": "X"},
            {"numero": null, "razon_social": "B", "rut": "2-7", "domicilio": "Y"}
        ]}"#;

        let result = parse_section_result(raw).unwrap();

        assert_eq!(result.items[0].number, None);
        assert_eq!(result.items[1].number, None);
        assert_eq!(result.items[0].cells()[0], "");
    }

    #[test]
    fn test_missing_required_fields_fail() {
        for missing in ["razon_social", "rut", "domicilio"] {
            let mut record = serde_json::json!({
                "numero": "1", "razon_social": "A", "rut": "1-9", "domicilio": "X"
            });
            record.as_object_mut().unwrap().remove(missing);
            let raw = serde_json::json!({ "items": [record] }).to_string();

            let result = parse_section_result(&raw);
            assert!(matches!(result, Err(SchemaError::Invalid(_))), "missing {} should fail", missing);
        }
    }

    #[test]
    fn test_wrong_types_fail() {
        let numeric_number = r#"{"items": [{"numero": 1, "razon_social": "A", "rut": "1-9", "domicilio": "X"}]}"#;
        assert!(parse_section_result(numeric_number).is_err());

        let null_rut = r#"{"items": [{"razon_social": "A", "rut": null, "domicilio": "X"}]}"#;
        assert!(parse_section_result(null_rut).is_err());

        let items_not_array = r#"{"items": {"razon_social": "A"}}"#;
        assert!(parse_section_result(items_not_array).is_err());

        assert!(parse_section_result(r#"{"rows": []}"#).is_err());
    }

    #[test]
    fn test_fenced_and_wrapped_responses() {
        let fenced = "```json\n{\"items\": [{\"razon_social\": \"A\", \"rut\": \"1-9\", \"domicilio\": \"X\"}]}\n```";
        assert_eq!(parse_section_result(fenced).unwrap().len(), 1);

        let prose = "Aquí está la tabla solicitada: {\"items\": []} Saludos.";
        assert!(parse_section_result(prose).unwrap().is_empty());

        let trailing = "{\"items\": [{\"numero\": \"7\", \"razon_social\": \"B\", \"rut\": \"2-7\", \"domicilio\": \"Y\"}]}\nSaludos.";
        let result = parse_section_result(trailing).unwrap();
        assert_eq!(result.items[0].number.as_deref(), Some("7"));
    }

    #[test]
    fn test_non_json_fails() {
        assert!(matches!(
            parse_section_result("No encontré la sección solicitada."),
            Err(SchemaError::NoJsonFound)
        ));
        assert!(matches!(parse_section_result("{\"items\": [}"), Err(SchemaError::Invalid(_))));
    }

    #[test]
    fn test_format_instructions_embed_schema() {
        let instructions = format_instructions();
        assert!(instructions.contains("\"razon_social\""));
        assert!(instructions.contains("\"required\":[\"razon_social\",\"rut\",\"domicilio\"]"));
    }
}
