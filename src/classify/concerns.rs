//
//  concerns.rs
//  Atlas
//

//! Cross-cutting concerns (`006_*`) and library markers (`008_*`).

use crate::kind::DependencyKind as K;
use crate::parser::ast::{simple_name, Annotation, Param};

use super::rules::{
    annotation_in, is_jackson_annotation, is_lombok_annotation, ADVICE_ANNOTATIONS,
    LOGGER_TYPES, LOMBOK_CONSTRUCTOR_ANNOTATIONS, LOMBOK_FIELD_ANNOTATIONS, LOMBOK_LOGGERS,
    LOMBOK_TYPE_ANNOTATIONS, VALIDATION_CONSTRAINTS, VALID_MARKERS,
};
use super::{ClassContext, Emitter};

pub fn classify(ctx: &ClassContext, out: &mut Emitter) {
    transactions(ctx, out);
    aspects(ctx, out);
    logging_and_metrics(ctx, out);
    validation(ctx, out);
    lombok(ctx, out);
    jackson_annotations(ctx, out);
}

/// Last dotted segment of an attribute value (`Propagation.REQUIRED` -> `REQUIRED`).
fn attr_tail(annotation: &Annotation, key: &str) -> Option<String> {
    annotation
        .rendered_attr(key)
        .map(|v| simple_name(v.trim()).to_string())
}

fn transactions(ctx: &ClassContext, out: &mut Emitter) {
    if ctx.has_annotation("Transactional") {
        out.emit("Transaction:class-level", K::Transaction);
    }
    for decl in ctx.declarations() {
        for method in &decl.methods {
            let Some(tx) = method.annotation("Transactional") else {
                continue;
            };
            let mut descriptor = String::from("Transaction");
            for key in ["propagation", "isolation", "timeout", "readOnly"] {
                if let Some(value) = attr_tail(tx, key) {
                    descriptor.push_str(&format!(":{}={}", key, value));
                }
            }
            out.emit(descriptor, K::Transaction);
        }
    }
}

fn aspects(ctx: &ClassContext, out: &mut Emitter) {
    if !ctx.has_annotation("Aspect") {
        return;
    }
    out.emit(format!("Aspect:{}", ctx.simple_name()), K::Aspect);
    for method in &ctx.decl.methods {
        for advice in method
            .annotations
            .iter()
            .filter(|a| annotation_in(&a.name, ADVICE_ANNOTATIONS))
        {
            match advice.string_attr(&["value", "pointcut"]) {
                Some(expression) => out.emit(format!("Pointcut:{}", expression), K::Aspect),
                None => out.emit(format!("Advice:{}", method.name), K::Aspect),
            }
        }
    }
}

fn logging_and_metrics(ctx: &ClassContext, out: &mut Emitter) {
    for decl in ctx.declarations() {
        for method in &decl.methods {
            for metric in ["Timed", "Counted"] {
                if let Some(annotation) = method.annotation(metric) {
                    let name = annotation
                        .string_attr(&["value", "name"])
                        .unwrap_or_else(|| method.name.clone());
                    out.emit(format!("Metric:{}:{}", metric, name), K::LoggingMetrics);
                }
            }
        }
        for field in &decl.fields {
            if let Some(resolved) = ctx.resolve_type(&field.ty) {
                if LOGGER_TYPES.contains(&resolved.as_str()) {
                    out.emit(format!("Logger:{}", resolved), K::LoggingMetrics);
                }
            }
        }
    }
    for (annotation, logger) in LOMBOK_LOGGERS {
        if ctx.has_annotation(annotation) {
            out.emit(format!("Logger:{}", logger), K::LoggingMetrics);
        }
    }
}

fn constraints<'a>(annotations: &'a [Annotation]) -> impl Iterator<Item = &'a Annotation> + 'a {
    annotations
        .iter()
        .filter(|a| annotation_in(&a.name, VALIDATION_CONSTRAINTS))
}

fn parameter_validation(params: &[Param], out: &mut Emitter) {
    for param in params {
        if param
            .annotations
            .iter()
            .any(|a| annotation_in(&a.name, VALID_MARKERS))
        {
            out.emit(format!("Validation:@Valid:{}", param.name), K::BeanValidation);
        }
        for constraint in constraints(&param.annotations) {
            out.emit(
                format!("Validation:{}:{}", constraint.simple_name(), param.name),
                K::BeanValidation,
            );
        }
    }
}

fn validation(ctx: &ClassContext, out: &mut Emitter) {
    for decl in ctx.declarations() {
        let declared = decl
            .fields
            .iter()
            .map(|f| &f.annotations)
            .chain(decl.record_components.iter().map(|c| &c.annotations));
        for annotations in declared {
            for constraint in constraints(annotations) {
                out.emit(format!("Validation:{}", constraint.simple_name()), K::BeanValidation);
            }
        }
        for method in &decl.methods {
            parameter_validation(&method.params, out);
        }
        for ctor in &decl.constructors {
            parameter_validation(&ctor.params, out);
        }
    }
}

fn lombok_marker(annotations: &[Annotation], table: &[&str], out: &mut Emitter) {
    for annotation in annotations.iter().filter(|a| is_lombok_annotation(&a.name, table)) {
        out.emit(format!("Lombok:{}", annotation.simple_name()), K::Lombok);
    }
}

fn lombok(ctx: &ClassContext, out: &mut Emitter) {
    lombok_marker(&ctx.decl.annotations, LOMBOK_TYPE_ANNOTATIONS, out);
    for decl in ctx.declarations() {
        for field in &decl.fields {
            lombok_marker(&field.annotations, LOMBOK_FIELD_ANNOTATIONS, out);
        }
        for method in &decl.methods {
            lombok_marker(&method.annotations, &[], out);
        }
        for ctor in &decl.constructors {
            lombok_marker(&ctor.annotations, LOMBOK_CONSTRUCTOR_ANNOTATIONS, out);
        }
    }
}

fn jackson_annotations(ctx: &ClassContext, out: &mut Emitter) {
    let mut emit = |annotations: &[Annotation]| {
        for annotation in annotations.iter().filter(|a| is_jackson_annotation(&a.name)) {
            out.emit(format!("Jackson:annotation:{}", annotation.simple_name()), K::Jackson);
        }
    };
    emit(&ctx.decl.annotations);
    for decl in ctx.declarations() {
        for field in &decl.fields {
            emit(&field.annotations);
        }
        for method in &decl.methods {
            emit(&method.annotations);
        }
    }
}
