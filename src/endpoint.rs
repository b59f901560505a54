//
//  endpoint.rs
//  Atlas
//

//! EndpointExtractor: HTTP handler mappings declared on controller classes.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::parser::ast::{Annotation, CompilationUnit, ElementValue, TypeDecl};
use crate::registry::{class_key, ClassRegistry};
use crate::store::{Endpoint, HttpMethod};

/// Mapping annotations and the verb each implies; `None` defers to the `method` attribute.
const MAPPINGS: &[(&str, Option<HttpMethod>)] = &[
    ("GetMapping", Some(HttpMethod::Get)),
    ("PostMapping", Some(HttpMethod::Post)),
    ("PutMapping", Some(HttpMethod::Put)),
    ("DeleteMapping", Some(HttpMethod::Delete)),
    ("PatchMapping", Some(HttpMethod::Patch)),
    ("RequestMapping", None),
];

pub fn is_mapping_annotation(annotation: &Annotation) -> bool {
    MAPPINGS.iter().any(|(name, _)| annotation.is(name))
}

/// Carries `@Controller`, `@RestController` or another `*Controller` stereotype.
pub fn is_controller(decl: &TypeDecl) -> bool {
    decl.annotations
        .iter()
        .any(|a| a.simple_name().ends_with("Controller"))
}

/// Verb of a mapping annotation. `@RequestMapping` uses its first `method`, else GET.
pub fn mapping_verb(annotation: &Annotation) -> Option<HttpMethod> {
    let (_, verb) = MAPPINGS.iter().find(|(name, _)| annotation.is(name))?;
    if let Some(verb) = verb {
        return Some(*verb);
    }
    let declared = annotation.attr("method").and_then(|value| match value {
        ElementValue::Array(items) => items.first().map(ElementValue::render),
        other => Some(other.render()),
    });
    Some(
        declared
            .and_then(|m| HttpMethod::from_name(&m).ok())
            .unwrap_or(HttpMethod::Get),
    )
}

/// Path of a mapping annotation: first string of `value` or `path`, else empty.
fn mapping_path(annotation: &Annotation) -> String {
    annotation
        .string_attr(&["value", "path"])
        .unwrap_or_default()
}

/// Join a controller base path and a method path into a `/`-rooted URI; `/` when both are empty.
pub fn combine_paths(base: &str, path: &str) -> String {
    let joined = match (base.is_empty(), path.is_empty()) {
        (true, true) => return "/".to_string(),
        (true, false) => path.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{}/{}", base, path),
    };
    let mut out = String::with_capacity(joined.len() + 1);
    out.push('/');
    for c in joined.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}

pub struct EndpointExtractor;

impl EndpointExtractor {
    /// One endpoint per mapping annotation on each registered controller in the file.
    pub fn extract_unit(unit: &CompilationUnit, registry: &ClassRegistry) -> Vec<Endpoint> {
        let package = unit.package.as_deref().unwrap_or("");
        let mut endpoints = Vec::new();
        for decl in unit.types.iter().filter(|d| is_controller(d)) {
            let Some(class) = registry.lookup(&class_key(package, &decl.name)) else {
                continue;
            };
            let base = decl
                .annotation("RequestMapping")
                .map(mapping_path)
                .unwrap_or_default();
            for method in &decl.methods {
                for annotation in &method.annotations {
                    let Some(verb) = mapping_verb(annotation) else {
                        continue;
                    };
                    let uri = combine_paths(&base, &mapping_path(annotation));
                    debug!(controller = %decl.name, method = %method.name, %verb, %uri, "endpoint");
                    endpoints.push(Endpoint {
                        id: Uuid::new_v4(),
                        class,
                        uri,
                        method: verb,
                        detected_at: Utc::now(),
                    });
                }
            }
        }
        endpoints
    }
}
