/// Template schema — validated response templates and their source records.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::core::parser::{self, Ast, SyntaxError};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template '{id}': unknown response type '{value}'")]
    UnknownResponseType { id: String, value: String },
    #[error("template '{id}': unknown verbosity level '{value}'")]
    UnknownVerbosity { id: String, value: String },
    #[error("template '{id}': {source}")]
    Syntax {
        id: String,
        #[source]
        source: SyntaxError,
    },
}

impl TemplateError {
    /// The id of the template the error belongs to.
    pub fn template_id(&self) -> &str {
        match self {
            TemplateError::UnknownResponseType { id, .. }
            | TemplateError::UnknownVerbosity { id, .. }
            | TemplateError::Syntax { id, .. } => id,
        }
    }
}

/// Output-length/detail tier controlling which verbosity-tagged sections of
/// a body are included. Untagged content renders at every level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verbosity {
    Concise,
    Detailed,
    Expert,
}

impl Default for Verbosity {
    fn default() -> Self {
        Self::Concise
    }
}

impl Verbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Concise => "concise",
            Self::Detailed => "detailed",
            Self::Expert => "expert",
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verbosity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "concise" => Ok(Self::Concise),
            "detailed" => Ok(Self::Detailed),
            "expert" => Ok(Self::Expert),
            _ => Err(()),
        }
    }
}

/// Informational shape tag exposed to callers. Does not alter rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseType {
    Table,
    List,
    Detailed,
    Narrative,
    Json,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::List => "list",
            Self::Detailed => "detailed",
            Self::Narrative => "narrative",
            Self::Json => "json",
        }
    }
}

impl FromStr for ResponseType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "table" => Ok(Self::Table),
            "list" => Ok(Self::List),
            "detailed" => Ok(Self::Detailed),
            "narrative" => Ok(Self::Narrative),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

/// A deserialized catalog source record, before validation. The catalog
/// source format maps template ids to these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRecord {
    #[serde(default)]
    pub triggers: Vec<String>,
    pub response_type: String,
    #[serde(default)]
    pub context_needed: bool,
    #[serde(default = "default_verbosity")]
    pub verbosity: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub content: String,
}

fn default_verbosity() -> String {
    "concise".to_string()
}

/// A validated, triggerable response template. Constructed once via
/// [`Template::from_record`]; the body is parsed at construction and the
/// resulting tree cached, so rendering never re-parses and never hits a
/// syntax error.
#[derive(Debug, Clone)]
pub struct Template {
    id: String,
    triggers: Vec<String>,
    response_type: ResponseType,
    context_required: bool,
    default_verbosity: Verbosity,
    metadata: HashMap<String, String>,
    body: String,
    ast: Ast,
}

impl Template {
    /// Validate a source record into a usable template. Unknown response
    /// types or verbosity levels and directive syntax errors are rejected
    /// here, never at render time.
    pub fn from_record(id: &str, record: TemplateRecord) -> Result<Template, TemplateError> {
        let response_type = record.response_type.parse::<ResponseType>().map_err(|_| {
            TemplateError::UnknownResponseType {
                id: id.to_string(),
                value: record.response_type.clone(),
            }
        })?;

        let default_verbosity = record.verbosity.parse::<Verbosity>().map_err(|_| {
            TemplateError::UnknownVerbosity {
                id: id.to_string(),
                value: record.verbosity.clone(),
            }
        })?;

        let ast = parser::parse(&record.content).map_err(|source| TemplateError::Syntax {
            id: id.to_string(),
            source,
        })?;

        Ok(Template {
            id: id.to_string(),
            triggers: record.triggers,
            response_type,
            context_required: record.context_needed,
            default_verbosity,
            metadata: record.metadata,
            body: record.content,
            ast,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    pub fn response_type(&self) -> ResponseType {
        self.response_type
    }

    pub fn context_required(&self) -> bool {
        self.context_required
    }

    pub fn default_verbosity(&self) -> Verbosity {
        self.default_verbosity
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// The `category` metadata key, if set.
    pub fn category(&self) -> Option<&str> {
        self.metadata.get("category").map(String::as_str)
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// The parsed directive tree, cached at construction.
    pub fn ast(&self) -> &Ast {
        &self.ast
    }
}
