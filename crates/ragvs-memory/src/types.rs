use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A retrieved chunk text with its similarity score (higher is closer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub text: String,
    pub score: f32,
}

/// Whether an answer was grounded in retrieved context or produced by the bare model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Rag,
    Llm,
}

impl Route {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rag => "rag",
            Self::Llm => "llm",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rag" => Ok(Self::Rag),
            "llm" => Ok(Self::Llm),
            other => Err(format!("unknown route: {other}")),
        }
    }
}

/// Append-only audit record of one answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatLog {
    pub question: String,
    pub answer: String,
    pub retrieved_documents: Vec<ScoredMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<Route>,
    pub created_at: DateTime<Utc>,
}

impl ChatLog {
    #[must_use]
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        retrieved_documents: Vec<ScoredMatch>,
        route: Option<Route>,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            retrieved_documents,
            route,
            created_at: Utc::now(),
        }
    }
}
