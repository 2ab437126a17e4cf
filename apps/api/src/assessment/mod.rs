// Assessment: questionnaire model, answer validation, scoring and the development plan.
// Everything here is pure and synchronous; it runs on the request path.

pub mod answers;
pub mod catalog;
pub mod handlers;
pub mod plan;
pub mod questionnaire;
pub mod scoring;

/// Who took the assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Respondent {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}
