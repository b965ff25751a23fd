//! Question answering endpoint

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::pipeline::MISSING_QUESTION;
use crate::server::state::AppState;
use crate::types::AnswerResponse;

/// The `question` field of a multipart or urlencoded form, if present
pub struct QuestionForm(pub Option<String>);

const QUESTION_FIELD: &str = "question";

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for QuestionForm {
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| Error::MissingInput(e.body_text()))?;

            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| Error::MissingInput(format!("Invalid multipart body: {}", e)))?
            {
                if field.name() == Some(QUESTION_FIELD) {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| {
                            Error::MissingInput(format!("Invalid question field: {}", e))
                        })?;
                    return Ok(Self(Some(text)));
                }
            }
            Ok(Self(None))
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(mut fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| Error::MissingInput(e.body_text()))?;
            Ok(Self(fields.remove(QUESTION_FIELD)))
        } else {
            Ok(Self(None))
        }
    }
}

/// POST /ask-question - form field `question`
pub async fn ask_question(
    State(state): State<AppState>,
    QuestionForm(question): QuestionForm,
) -> Result<Json<AnswerResponse>> {
    let question = question.ok_or_else(|| Error::MissingInput(MISSING_QUESTION.to_string()))?;
    let answer = state.pipeline().ask(&question).await?;

    Ok(Json(AnswerResponse {
        answer: answer.text,
    }))
}
