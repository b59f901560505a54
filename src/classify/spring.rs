//
//  spring.rs
//  Atlas
//

//! Spring wiring: injection and stereotypes (`002_*`), persistence (`003_*`),
//! configuration (`004_*`) and messaging (`005_*`).

use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

use crate::error::{AtlasError, Result};
use crate::kind::DependencyKind as K;
use crate::parser::ast::{find_annotation, Annotation, ElementValue, Param, TypeDecl};

use super::rules::{EVENT_LISTENERS, INJECTION_MARKERS, QUERY_METHOD_PREFIXES};
use super::{ClassContext, Emitter};

pub fn classify(ctx: &ClassContext, out: &mut Emitter) {
    stereotypes(ctx, out);
    for decl in ctx.declarations() {
        injection(ctx, decl, out);
    }
    generated_constructor(ctx, out);
    bean_definitions(ctx, out);
    persistence(ctx, out);
    configuration(ctx, out);
    messaging(ctx, out);
}

fn stereotypes(ctx: &ClassContext, out: &mut Emitter) {
    if ctx.is_controller() {
        out.emit(ctx.fqn, K::Controller);
    }
    if ctx.is_service() {
        out.emit(ctx.fqn, K::Service);
    }
    if ctx.has_annotation("Repository") {
        out.emit(ctx.fqn, K::Repository);
    }
}

fn injected(annotations: &[Annotation]) -> bool {
    INJECTION_MARKERS
        .iter()
        .any(|m| find_annotation(annotations, m).is_some())
}

fn param_types(ctx: &ClassContext, params: &[Param], kind: K, out: &mut Emitter) {
    for param in params {
        out.emit_type(ctx.resolve_type(param.ty.element()), kind);
    }
}

fn injection(ctx: &ClassContext, decl: &TypeDecl, out: &mut Emitter) {
    for method in &decl.methods {
        if injected(&method.annotations) && method.name.starts_with("set") {
            param_types(ctx, &method.params, K::SetterInjection, out);
        }
    }

    for ctor in &decl.constructors {
        if injected(&ctor.annotations) || decl.constructors.len() == 1 {
            param_types(ctx, &ctor.params, K::ConstructorInjection, out);
        }
    }
    for field in &decl.fields {
        if injected(&field.annotations) {
            out.emit_type(ctx.resolve_type(field.ty.element()), K::FieldInjection);
        }
    }
}

/// Constructor injection through a Lombok-generated constructor on a bean.
fn generated_constructor(ctx: &ClassContext, out: &mut Emitter) {
    let decl = ctx.decl;
    if !decl.constructors.is_empty() || !ctx.is_component() {
        return;
    }
    let all = decl.has_annotation("AllArgsConstructor");
    if !all && !decl.has_annotation("RequiredArgsConstructor") {
        return;
    }
    for field in decl
        .fields
        .iter()
        .filter(|f| !f.modifiers.is_static && (all || f.modifiers.is_final))
    {
        out.emit_type(ctx.resolve_type(field.ty.element()), K::ConstructorInjection);
    }
}

fn bean_definitions(ctx: &ClassContext, out: &mut Emitter) {
    if !ctx.is_configuration() {
        return;
    }
    for method in ctx.decl.methods.iter().filter(|m| m.has_annotation("Bean")) {
        out.emit_type(ctx.resolve_type(method.return_type.element()), K::BeanDefinition);
    }
}

fn persistence(ctx: &ClassContext, out: &mut Emitter) {
    let decl = ctx.decl;
    for ty in &decl.extends {
        if ty.class_name().is_some_and(|n| n.contains("JpaRepository")) {
            out.emit_type(ctx.resolve_type(ty), K::JpaRepository);
        }
    }

    if ctx.has_annotation("Entity") {
        out.emit(ctx.fqn, K::JpaEntity);
    }

    let extends_repository = decl
        .extends
        .iter()
        .filter_map(|t| t.class_name())
        .any(|n| n.ends_with("Repository"));
    if decl.is_interface() && (ctx.is_repository() || extends_repository) {
        for method in &decl.methods {
            let derived = QUERY_METHOD_PREFIXES
                .iter()
                .any(|p| method.name.starts_with(p));
            if derived || method.has_annotation("Query") {
                out.emit(method.name.as_str(), K::QueryMethod);
            }
        }
    }

    let name = ctx.simple_name();
    if ctx.package().to_ascii_lowercase().contains("dto") || name.ends_with("Dto") || name.ends_with("DTO") {
        out.emit(ctx.fqn, K::Dto);
    }

    if ctx.has_annotation("Mapper") {
        out.emit(ctx.fqn, K::Mapper);
        for method in &decl.methods {
            if method.has_annotation("Mapping") || method.has_annotation("Mappings") {
                param_types(ctx, &method.params, K::Mapper, out);
                out.emit_type(ctx.resolve_type(method.return_type.element()), K::Mapper);
            }
        }
    }
}

const PLACEHOLDER: &str = r"\$\{([^}:]+)(?::[^}]*)?\}";

fn placeholder_pattern() -> Result<&'static Regex> {
    static RE: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PLACEHOLDER))
        .as_ref()
        .map_err(|e| AtlasError::InvalidPattern {
            pattern: PLACEHOLDER.to_string(),
            source: e.clone(),
        })
}

/// Property keys referenced by `${key}` / `${key:default}` placeholders.
pub(crate) fn placeholder_keys(expression: &str) -> Result<Vec<String>> {
    Ok(placeholder_pattern()?
        .captures_iter(expression)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|k| !k.is_empty())
        .collect())
}

fn value_keys(annotations: &[Annotation], out: &mut Emitter) {
    let Some(value) = find_annotation(annotations, "Value").and_then(|a| a.rendered_attr("value")) else {
        return;
    };
    match placeholder_keys(&value) {
        Ok(keys) => {
            for key in keys {
                out.emit(key, K::ValueInjection);
            }
        }
        Err(e) => warn!(error = %e, "@Value placeholders skipped"),
    }
}

/// `AppProperties` -> `app-properties`.
pub(crate) fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn conditions(annotations: &[Annotation], out: &mut Emitter) {
    for annotation in annotations {
        let name = annotation.simple_name();
        if name == "Profile" {
            for profile in annotation.string_list(&["value"]) {
                out.emit(format!("profile:{}", profile), K::ProfileCondition);
            }
        } else if name == "Conditional" {
            if let Some(value) = annotation.attr("value") {
                for item in class_literals(value) {
                    out.emit(format!("condition:{}", item), K::ProfileCondition);
                }
            }
        } else if name.starts_with("ConditionalOn") {
            match annotation.string_attr(&["value", "name", "prefix"]) {
                Some(detail) => out.emit(format!("condition:{}:{}", name, detail), K::ProfileCondition),
                None => out.emit(format!("condition:{}", name), K::ProfileCondition),
            }
        }
    }
}

fn configuration(ctx: &ClassContext, out: &mut Emitter) {
    for decl in ctx.declarations() {
        for field in &decl.fields {
            value_keys(&field.annotations, out);
        }
        for method in &decl.methods {
            value_keys(&method.annotations, out);
            for param in &method.params {
                value_keys(&param.annotations, out);
            }
        }
        for ctor in &decl.constructors {
            for param in &ctor.params {
                value_keys(&param.annotations, out);
            }
        }
    }

    let decl = ctx.decl;
    if let Some(props) = decl.annotation("ConfigurationProperties") {
        let prefix = props
            .string_attr(&["prefix", "value"])
            .unwrap_or_else(|| kebab_case(ctx.simple_name()));
        out.emit(prefix, K::ConfigurationProperties);
    }
    for method in decl.methods.iter().filter(|m| m.has_annotation("Bean")) {
        if let Some(prefix) = method
            .annotation("ConfigurationProperties")
            .and_then(|a| a.string_attr(&["prefix", "value"]))
        {
            out.emit(prefix, K::ConfigurationProperties);
        }
    }

    conditions(&decl.annotations, out);
    for method in decl.methods.iter().filter(|m| m.has_annotation("Bean")) {
        conditions(&method.annotations, out);
    }

    if ctx.has_annotation("AutoConfiguration") {
        out.emit(ctx.fqn, K::AutoConfiguration);
    }
}

/// Class names from `Foo.class` literals, as written.
fn class_literals(value: &ElementValue) -> Vec<String> {
    match value {
        ElementValue::Array(items) => items.iter().flat_map(class_literals).collect(),
        ElementValue::Expr(text) => text
            .trim()
            .strip_suffix(".class")
            .map(|n| vec![n.trim().to_string()])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn messaging(ctx: &ClassContext, out: &mut Emitter) {
    let decl = ctx.decl;

    if decl.is_interface() {
        if let Some(feign) = decl.annotation("FeignClient") {
            let target = feign
                .string_attr(&["name", "value", "url"])
                .unwrap_or_else(|| format!("FeignClient:{}", ctx.simple_name()));
            out.emit(target, K::HttpClient);
        }
    }

    for decl in ctx.declarations() {
        for method in &decl.methods {
            let Some(listener) = EVENT_LISTENERS.iter().find_map(|l| method.annotation(l)) else {
                continue;
            };
            param_types(ctx, &method.params, K::EventListener, out);
            for key in ["classes", "value"] {
                if let Some(value) = listener.attr(key) {
                    for name in class_literals(value) {
                        out.emit_type(Some(ctx.resolve(&name)), K::EventListener);
                    }
                }
            }
        }

        for method in &decl.methods {
            if let Some(kafka) = method.annotation("KafkaListener") {
                let topics = kafka.string_list(&["topics"]);
                let target = if !topics.is_empty() {
                    format!("kafka:topic:{}", topics.join(","))
                } else if let Some(pattern) = kafka.string_attr(&["topicPattern"]) {
                    format!("kafka:pattern:{}", pattern)
                } else {
                    format!("kafka:listener:{}", method.name)
                };
                out.emit(target, K::MessageListener);
            }
            if let Some(rabbit) = method.annotation("RabbitListener") {
                let queues = rabbit.string_list(&["queues", "queue"]);
                let target = if queues.is_empty() {
                    format!("rabbitmq:listener:{}", method.name)
                } else {
                    format!("rabbitmq:queue:{}", queues.join(","))
                };
                out.emit(target, K::MessageListener);
            }
            if let Some(jms) = method.annotation("JmsListener") {
                let target = match jms.string_attr(&["destination"]) {
                    Some(destination) => format!("jms:destination:{}", destination),
                    None => format!("jms:listener:{}", method.name),
                };
                out.emit(target, K::MessageListener);
            }
        }
    }
}
