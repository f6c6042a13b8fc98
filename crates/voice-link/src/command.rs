use arm_link::ArmSide;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Object the interpreter asked us to pick up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraspTarget {
    pub id: String,
    pub base_coordinates_mm: [f64; 3],
    pub arm_choice: ArmSide,
}

/// Decoded JSON command from the interpreter.
#[derive(Clone, Debug, PartialEq)]
pub enum VoiceCommand {
    Grasp(GraspTarget),
    PlayMessage(Option<String>),
    /// Server reported an error in place of a command.
    ServerError(String),
    /// An action we do not handle, or a recognised action with a bad payload.
    Unsupported(String),
    /// Zero-length or `{}` reply.
    Empty,
}

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Action {
    Grasp {
        target: GraspTarget,
    },
    PlayMessage {
        #[serde(default)]
        message: Option<String>,
    },
}

/// Classify a reply's JSON section.
pub fn interpret(json: Option<&Value>) -> VoiceCommand {
    let Some(value) = json else {
        return VoiceCommand::Empty;
    };
    let Some(obj) = value.as_object() else {
        return VoiceCommand::Unsupported(value.to_string());
    };
    if obj.is_empty() {
        return VoiceCommand::Empty;
    }
    if let Some(err) = obj.get("error") {
        let text = err
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return VoiceCommand::ServerError(text);
    }
    match Action::deserialize(value) {
        Ok(Action::Grasp { target }) => VoiceCommand::Grasp(target),
        Ok(Action::PlayMessage { message }) => VoiceCommand::PlayMessage(message),
        Err(e) => {
            let action = obj
                .get("action")
                .and_then(Value::as_str)
                .unwrap_or("<none>");
            tracing::debug!(action, error = %e, "unhandled voice command");
            VoiceCommand::Unsupported(action.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn grasp_command() {
        let v = json!({
            "action": "grasp",
            "target": {"id": "cup", "base_coordinates_mm": [350.0, -20.5, 80.0], "arm_choice": "right"}
        });
        assert_eq!(
            interpret(Some(&v)),
            VoiceCommand::Grasp(GraspTarget {
                id: "cup".to_string(),
                base_coordinates_mm: [350.0, -20.5, 80.0],
                arm_choice: ArmSide::Right,
            })
        );
    }

    #[test]
    fn grasp_with_unknown_arm_is_unsupported() {
        let v = json!({
            "action": "grasp",
            "target": {"id": "cup", "base_coordinates_mm": [1, 2, 3], "arm_choice": "both"}
        });
        assert_eq!(
            interpret(Some(&v)),
            VoiceCommand::Unsupported("grasp".to_string())
        );
    }

    #[test]
    fn other_shapes() {
        assert_eq!(interpret(None), VoiceCommand::Empty);
        assert_eq!(interpret(Some(&json!({}))), VoiceCommand::Empty);
        assert_eq!(
            interpret(Some(&json!({"error": "no speech"}))),
            VoiceCommand::ServerError("no speech".to_string())
        );
        assert_eq!(
            interpret(Some(&json!({"action": "play_message", "message": "hello"}))),
            VoiceCommand::PlayMessage(Some("hello".to_string()))
        );
        assert_eq!(
            interpret(Some(&json!({"action": "dance"}))),
            VoiceCommand::Unsupported("dance".to_string())
        );
    }
}
