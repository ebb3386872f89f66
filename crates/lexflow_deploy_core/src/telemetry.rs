use serde_json::{json, Value};

/// Writes one JSON event line to stderr.
pub fn log_info(component: &str, event: &str, details: Value) {
    eprintln!("{}", event_line(component, None, event, details));
}

pub fn log_warn(component: &str, event: &str, details: Value) {
    eprintln!("{}", event_line(component, Some("warn"), event, details));
}

pub fn log_error(component: &str, event: &str, details: Value) {
    eprintln!("{}", event_line(component, Some("error"), event, details));
}

fn event_line(component: &str, level: Option<&str>, event: &str, details: Value) -> Value {
    let mut line = json!({
        "component": component,
        "event": event,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "details": details,
    });
    if let Some(level) = level {
        line["level"] = Value::from(level);
    }
    line
}
