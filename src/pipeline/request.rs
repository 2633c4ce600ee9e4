//! Request assembly: instructions + image parts + schema → one request body.
//!
//! The body follows Gemini's `generateContent` wire format:
//!
//! ```text
//! {
//!   "contents": [{ "role": "user",
//!                  "parts": [ {"text": ...}, {"inlineData": {...}}, ... ] }],
//!   "generationConfig": { "responseMimeType": "application/json",
//!                         "responseSchema": { ... } }
//! }
//! ```
//!
//! Instructions always come first, followed by the images in selection
//! order, so the model reads "page 1, page 2, …" the way the user picked them.

use crate::pipeline::encode::EncodedImagePart;
use crate::prompts::RESPONSE_MIME_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A complete `generateContent` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

/// One conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

/// A text or inline-image part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: EncodedImagePart,
    },
}

/// Output constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Build the single composite request for one analysis run.
pub fn build_request(
    instructions: &str,
    images: Vec<EncodedImagePart>,
    schema: &Value,
    temperature: Option<f32>,
) -> GenerateContentRequest {
    let mut parts = Vec::with_capacity(images.len() + 1);
    parts.push(Part::Text {
        text: instructions.to_string(),
    });
    parts.extend(
        images
            .into_iter()
            .map(|inline_data| Part::InlineData { inline_data }),
    );

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".into()),
            parts,
        }],
        generation_config: GenerationConfig {
            response_mime_type: RESPONSE_MIME_TYPE.to_string(),
            response_schema: schema.clone(),
            temperature,
        },
    }
}

impl GenerateContentRequest {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.contents.iter().flat_map(|c| c.parts.iter())
    }

    /// The instruction text (first text part), if any.
    pub fn instructions(&self) -> Option<&str> {
        self.parts().find_map(|p| match p {
            Part::Text { text } => Some(text.as_str()),
            Part::InlineData { .. } => None,
        })
    }

    /// The inline images, in request order.
    pub fn image_parts(&self) -> Vec<&EncodedImagePart> {
        self.parts()
            .filter_map(|p| match p {
                Part::InlineData { inline_data } => Some(inline_data),
                Part::Text { .. } => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::response_schema;
    use serde_json::json;

    fn part(mime: &str, data: &str) -> EncodedImagePart {
        EncodedImagePart {
            mime_type: mime.into(),
            data: data.into(),
        }
    }

    #[test]
    fn instructions_first_then_images_in_order() {
        let req = build_request(
            "do the thing",
            vec![part("image/png", "AAA"), part("image/jpeg", "BBB")],
            response_schema(),
            None,
        );
        let json = serde_json::to_value(&req).unwrap();
        let parts = json["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], json!({"text": "do the thing"}));
        assert_eq!(parts[1]["inlineData"]["data"], "AAA");
        assert_eq!(parts[2]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(json["contents"][0]["role"], "user");
    }

    #[test]
    fn generation_config_carries_schema_and_mime() {
        let req = build_request("x", vec![part("image/png", "A")], response_schema(), None);
        let json = serde_json::to_value(&req).unwrap();
        let gc = &json["generationConfig"];
        assert_eq!(gc["responseMimeType"], "application/json");
        assert_eq!(&gc["responseSchema"], response_schema());
        assert!(gc.get("temperature").is_none());
    }

    #[test]
    fn temperature_serialised_when_set() {
        let req = build_request("x", vec![], response_schema(), Some(0.25));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["generationConfig"]["temperature"], 0.25);
    }

    #[test]
    fn accessors_round_trip_through_wire_format() {
        let req = build_request(
            "read these",
            vec![part("image/png", "ONE"), part("image/png", "TWO")],
            response_schema(),
            None,
        );
        let back: GenerateContentRequest =
            serde_json::from_str(&serde_json::to_string(&req).unwrap()).unwrap();
        assert_eq!(back.instructions(), Some("read these"));
        let data: Vec<&str> = back.image_parts().iter().map(|p| p.data.as_str()).collect();
        assert_eq!(data, vec!["ONE", "TWO"]);
    }
}
