//! Layer annotations - `@name` / `@name("arg", 2)` layer name syntax
//!
//! Annotation names are dispatched through a static table rather than any
//! open-ended lookup. Each entry decides what role a layer plays during
//! target resolution.

use crate::error::TargetError;
use crate::models::{Annotation, AnnotationParam, Layer, LayerKind};

/// What an annotation asks the importer to do with its layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    /// Marks pixels whose centroid is the target's pivot
    Pivot,
    /// Assigns a path to a content or group layer
    Target,
    /// Animation event marker, consumed downstream
    Event,
    /// Arbitrary per-frame data, consumed downstream
    Data,
}

/// Known annotation names
const ANNOTATION_TABLE: &[(&str, AnnotationKind)] = &[
    ("pivot", AnnotationKind::Pivot),
    ("target", AnnotationKind::Target),
    ("sub", AnnotationKind::Target),
    ("event", AnnotationKind::Event),
    ("data", AnnotationKind::Data),
];

/// Look up an annotation name (case-insensitive)
pub fn lookup(name: &str) -> Option<AnnotationKind> {
    ANNOTATION_TABLE
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, kind)| *kind)
}

/// The role a layer plays during target resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerRole {
    /// Contributes pixels to its target
    Content { path: Option<String> },
    /// Only provides a path for its children
    Group { path: Option<String> },
    /// Pivot-designated layer
    Pivot { path: Option<String> },
    /// Recognised annotation handled by a downstream processor
    Passive {
        kind: AnnotationKind,
        path: Option<String>,
    },
}

impl LayerRole {
    pub fn path(&self) -> Option<&str> {
        match self {
            LayerRole::Content { path }
            | LayerRole::Group { path }
            | LayerRole::Pivot { path }
            | LayerRole::Passive { path, .. } => path.as_deref(),
        }
    }

    /// Content and group layers resolve in the first pass, everything else after
    pub fn is_structural(&self) -> bool {
        matches!(self, LayerRole::Content { .. } | LayerRole::Group { .. })
    }
}

/// Parse `@name` or `@name(arg, ...)`.
///
/// Returns `None` if the text is not an annotation (no leading `@`).
/// Arguments are double-quoted strings or numbers.
///
/// # Examples
///
/// ```
/// use rigatlas::annotation::parse_annotation;
/// use rigatlas::models::AnnotationParam;
///
/// let a = parse_annotation("@pivot(\"arm\")").unwrap().unwrap();
/// assert_eq!(a.name, "pivot");
/// assert_eq!(a.params, vec![AnnotationParam::Text("arm".to_string())]);
///
/// assert!(parse_annotation("body").is_none());
/// ```
pub fn parse_annotation(text: &str) -> Option<Result<Annotation, String>> {
    let rest = text.trim().strip_prefix('@')?;
    Some(parse_body(rest))
}

fn parse_body(rest: &str) -> Result<Annotation, String> {
    let (name, args) = match rest.find('(') {
        Some(open) => {
            let close = rest
                .rfind(')')
                .filter(|&c| c > open)
                .ok_or_else(|| "missing closing ')'".to_string())?;
            if !rest[close + 1..].trim().is_empty() {
                return Err(format!("unexpected text after ')': '{}'", &rest[close + 1..]));
            }
            (&rest[..open], Some(&rest[open + 1..close]))
        }
        None => (rest, None),
    };

    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("invalid annotation name '{}'", name));
    }

    let params = match args {
        Some(args) => parse_args(args)?,
        None => Vec::new(),
    };

    Ok(Annotation {
        name: name.to_string(),
        params,
    })
}

fn parse_args(args: &str) -> Result<Vec<AnnotationParam>, String> {
    let mut params = Vec::new();
    let mut chars = args.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&c) = chars.peek() else {
            break;
        };

        if c == '"' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            while let Some(inner) = chars.next() {
                match inner {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            text.push(escaped);
                        }
                    }
                    _ => text.push(inner),
                }
            }
            if !closed {
                return Err(format!("unclosed string \"{}", text));
            }
            params.push(AnnotationParam::Text(text));
        } else {
            let mut raw = String::new();
            while let Some(inner) = chars.next_if(|&c| c != ',') {
                raw.push(inner);
            }
            let raw = raw.trim();
            let number = raw
                .parse::<f64>()
                .map_err(|_| format!("invalid argument '{}'", raw))?;
            params.push(AnnotationParam::Number(number));
        }

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(other) => return Err(format!("expected ',' but found '{}'", other)),
        }
    }

    Ok(params)
}

/// Decide what role a layer plays.
///
/// An explicit annotation on the layer wins over one parsed from its name.
pub fn classify(layer: &Layer) -> Result<LayerRole, TargetError> {
    let annotation = match &layer.annotation {
        Some(a) => Some(a.clone()),
        None => parse_annotation(&layer.name)
            .transpose()
            .map_err(|reason| TargetError::MalformedAnnotation {
                layer: layer.index,
                name: layer.name.clone(),
                reason,
            })?,
    };

    let Some(annotation) = annotation else {
        return Ok(match layer.kind {
            LayerKind::Content => LayerRole::Content { path: None },
            LayerKind::Group => LayerRole::Group { path: None },
            // A meta layer without an annotation carries nothing we use
            LayerKind::Meta => LayerRole::Passive {
                kind: AnnotationKind::Data,
                path: None,
            },
        });
    };

    let kind = lookup(&annotation.name).ok_or_else(|| TargetError::UnknownAnnotation {
        layer: layer.index,
        name: layer.name.clone(),
        annotation: annotation.name.clone(),
    })?;
    let path = annotation
        .path_param()
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    match kind {
        AnnotationKind::Pivot => Ok(LayerRole::Pivot { path }),
        AnnotationKind::Target => {
            if path.is_none() {
                return Err(TargetError::MalformedAnnotation {
                    layer: layer.index,
                    name: layer.name.clone(),
                    reason: format!("@{} needs a path argument", annotation.name),
                });
            }
            Ok(match layer.kind {
                LayerKind::Content => LayerRole::Content { path },
                LayerKind::Group | LayerKind::Meta => LayerRole::Group { path },
            })
        }
        AnnotationKind::Event | AnnotationKind::Data => Ok(LayerRole::Passive { kind, path: None }),
    }
}
