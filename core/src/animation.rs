//! Enter/exit/attention animation descriptors and the timing metadata derived
//! from them.

use serde::{Deserialize, Serialize};

/// The `animations` member of a schema node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Animations {
    /// Played when the node appears.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enter: Option<AnimationSpec>,
    /// Played when the node disappears.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<AnimationSpec>,
    /// Played after the enter animation completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attention: Option<AnimationSpec>,
}

/// A single animation phase. Durations and delays are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationSpec {
    /// Animation name, e.g. `fade`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Duration in seconds; missing or zero means one second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Delay in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
}

impl AnimationSpec {
    /// Total run time (duration plus delay) in milliseconds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn timeout_ms(&self) -> u64 {
        let duration = self.duration.filter(|d| *d != 0.0).unwrap_or(1.0);
        let delay = self.delay.unwrap_or(0.0);
        ((duration + delay) * 1000.0).round().max(0.0) as u64
    }
}

/// Turns a node id into something usable inside a class name.
///
/// Characters outside `[A-Za-z0-9_-]` become `-`, and a leading digit gets an
/// `a` prefix. A missing id falls back to `node`.
#[must_use]
pub fn format_id(id: Option<&str>) -> String {
    let id = id.filter(|id| !id.is_empty()).unwrap_or("node");
    let mut out: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, 'a');
    }
    out
}

/// Enter/exit timeouts in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnimationTimeout {
    /// Enter timeout.
    pub enter: Option<u64>,
    /// Exit timeout.
    pub exit: Option<u64>,
}

/// Transition class names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationClassNames {
    /// Class applied on first appearance (same as `enter`).
    pub appear: Option<String>,
    /// Class applied while entering.
    pub enter: Option<String>,
    /// Class applied while exiting.
    pub exit: Option<String>,
}

/// Everything a node needs to drive its transitions.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationMeta {
    /// Sanitized id, also the key of the generated stylesheet.
    pub style_id: String,
    /// Timeouts.
    pub timeout: AnimationTimeout,
    /// Class names.
    pub class_names: AnimationClassNames,
    /// Class added once the enter transition has finished.
    pub attention_class: Option<String>,
    /// The descriptor the metadata came from.
    pub animations: Animations,
}

impl AnimationMeta {
    /// Derives timing and class names for a node with the given id.
    #[must_use]
    pub fn new(animations: Animations, id: Option<&str>) -> Self {
        let style_id = format_id(id);
        let mut timeout = AnimationTimeout::default();
        let mut class_names = AnimationClassNames::default();

        if let Some(enter) = &animations.enter {
            timeout.enter = Some(enter.timeout_ms());
            let class = format!("{}-{style_id}-enter", enter.kind);
            class_names.appear = Some(class.clone());
            class_names.enter = Some(class);
        }
        if let Some(exit) = &animations.exit {
            timeout.exit = Some(exit.timeout_ms());
            class_names.exit = Some(format!("{}-{style_id}-exit", exit.kind));
        }
        let attention_class = animations
            .attention
            .as_ref()
            .map(|attention| format!("{}-{style_id}-attention", attention.kind));

        Self {
            style_id,
            timeout,
            class_names,
            attention_class,
            animations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enter_timing_and_classes() {
        let animations: Animations =
            serde_json::from_value(json!({"enter": {"type": "fade", "duration": 0.3}})).unwrap();
        let meta = AnimationMeta::new(animations, Some("n1"));
        assert_eq!(meta.timeout.enter, Some(300));
        assert_eq!(meta.timeout.exit, None);
        assert_eq!(meta.class_names.enter.as_deref(), Some("fade-n1-enter"));
        assert_eq!(meta.class_names.appear, meta.class_names.enter);
    }

    #[test]
    fn zero_duration_counts_as_one_second() {
        let spec = AnimationSpec {
            kind: "zoom".into(),
            duration: Some(0.0),
            delay: Some(0.5),
        };
        assert_eq!(spec.timeout_ms(), 1500);
    }

    #[test]
    fn ids_are_sanitized() {
        assert_eq!(format_id(Some("form.item 1")), "form-item-1");
        assert_eq!(format_id(Some("1st")), "a1st");
        assert_eq!(format_id(None), "node");
    }

    #[test]
    fn attention_and_exit_classes() {
        let animations: Animations = serde_json::from_value(json!({
            "exit": {"type": "slide", "duration": 2, "delay": 1},
            "attention": {"type": "pulse"}
        }))
        .unwrap();
        let meta = AnimationMeta::new(animations, Some("box"));
        assert_eq!(meta.timeout.exit, Some(3000));
        assert_eq!(meta.class_names.exit.as_deref(), Some("slide-box-exit"));
        assert_eq!(meta.attention_class.as_deref(), Some("pulse-box-attention"));
    }
}
