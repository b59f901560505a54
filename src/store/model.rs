//
//  model.rs
//  Atlas
//

//! Records produced by one analysis run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{AtlasError, Result};
use crate::kind::DependencyKind;
use crate::parser::ast::Visibility;
use crate::registry::ClassId;

/// An analysed source tree. The root path is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub root: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(root: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            root,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberKind {
    Field,
    Method,
    Constructor,
}

impl MemberKind {
    /// Methods and constructors render with trailing parentheses.
    pub fn is_callable(self) -> bool {
        !matches!(self, MemberKind::Field)
    }
}

/// An annotation on a member, with attribute values flattened to text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberAnnotation {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

/// A field, method or constructor of a registered class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub class: ClassId,
    pub name: String,
    /// Resolved field type or return type; `None` for constructors, `"void"` for void methods.
    pub type_name: Option<String>,
    pub visibility: Visibility,
    pub kind: MemberKind,
    pub annotations: Vec<MemberAnnotation>,
}

/// A classified directed dependency. The target is an identifier that may or
/// may not name a project class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: ClassId,
    pub source_fqn: String,
    pub target: String,
    /// Registered class the target names, when there is one.
    pub target_class: Option<ClassId>,
    pub kind: DependencyKind,
    pub detected_at: DateTime<Utc>,
    pub batch_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Trace,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// Stable numeric id, 1-based in declaration order.
    pub fn id(self) -> u8 {
        HttpMethod::ALL
            .iter()
            .position(|m| *m == self)
            .map_or(0, |i| i as u8 + 1)
    }

    /// Parse a verb, case-insensitively. Accepts `RequestMethod.POST` forms.
    pub fn from_name(name: &str) -> Result<Self> {
        let verb = name.rsplit('.').next().unwrap_or(name).trim();
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(verb))
            .ok_or_else(|| AtlasError::InputValidation(format!("unknown HTTP method: {}", name)))
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One HTTP handler mapping on a controller class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: Uuid,
    pub class: ClassId,
    pub uri: String,
    pub method: HttpMethod,
    pub detected_at: DateTime<Utc>,
}
