use serde::Serialize;
use serde_json::Value;

/// The one-envelope-per-invocation output contract.
///
/// Every subcommand prints exactly one of these to stdout, success or
/// failure. The artifact server prints its envelope first and then blocks.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: String) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message),
        }
    }

    pub fn render(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|err| {
            format!("{{\"ok\": false, \"error\": \"failed to serialize response: {err}\"}}")
        })
    }

    pub fn print(&self) {
        println!("{}", self.render());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_shape() {
        let envelope = Envelope::success(json!({"serial": "emulator-5554"}));
        let value: Value = serde_json::from_str(&envelope.render()).unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(value["data"]["serial"], "emulator-5554");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_failure_envelope_shape() {
        let envelope = Envelope::failure("adb exploded".to_string());
        let value: Value = serde_json::from_str(&envelope.render()).unwrap();
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"], "adb exploded");
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_render_is_single_json_object() {
        let envelope = Envelope::success(json!({"x": 1}));
        let rendered = envelope.render();
        let parsed: Value = serde_json::from_str(&rendered).unwrap();
        assert!(parsed.is_object());
    }
}
