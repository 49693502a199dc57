use tts_core::{SynthesisRequest, VoiceCatalog, MAX_TEXT_LENGTH};

use crate::error::ApiError;

/// Validate a synthesis request before it is forwarded to the provider
pub fn validate_synthesis_request(
    req: &SynthesisRequest,
    catalog: &VoiceCatalog,
) -> Result<(), ApiError> {
    // Validate required fields
    if req.text.trim().is_empty() || req.voice_id.trim().is_empty() {
        return Err(ApiError::InvalidInput(
            "Missing required fields: text and voiceId".to_string(),
        ));
    }
    if req.text.chars().count() > MAX_TEXT_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Text exceeds maximum length of {} characters",
            MAX_TEXT_LENGTH
        )));
    }

    // Validate voice ID against the catalog
    if !catalog.contains(&req.voice_id) {
        return Err(ApiError::InvalidInput("Invalid voice ID".to_string()));
    }

    // Rate and pitch formats
    req.validate(catalog)
        .map_err(|e| ApiError::InvalidInput(e.to_string()))
}
