use serde_json::Value;
use thiserror::Error;

pub const MAX_MESSAGE_CHARS: usize = 4000;
pub const MAX_MESSAGES: usize = 50;
pub const MAX_REPEATED_CHARS: usize = 20;
pub const SHOUTING_MIN_CHARS: usize = 50;
pub const SHOUTING_RATIO: f64 = 0.7;

pub const ROLES: [&str; 3] = ["user", "assistant", "system"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message cannot be empty")]
    Empty,
    #[error("Message too long (max 4000 characters)")]
    TooLong,
    #[error("Message contains excessive repeated characters")]
    RepeatedCharacters,
    #[error("Message contains excessive capitalization")]
    ExcessiveCapitals,
    #[error("Too many messages (max 50)")]
    TooManyMessages,
    #[error("Message {index} is not an object")]
    NotAnObject { index: usize },
    #[error("Message {index} is missing a role")]
    MissingRole { index: usize },
    #[error("Message {index} is missing content")]
    MissingContent { index: usize },
    #[error("Message {index} has invalid role '{role}'")]
    InvalidRole { index: usize, role: String },
}

/// Checks a single user-authored message.
pub fn validate_chat_message(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::Empty);
    }

    let len = content.chars().count();
    if len > MAX_MESSAGE_CHARS {
        return Err(ValidationError::TooLong);
    }

    if longest_run(content) >= MAX_REPEATED_CHARS {
        return Err(ValidationError::RepeatedCharacters);
    }

    if len > SHOUTING_MIN_CHARS {
        let upper = content.chars().filter(|c| c.is_uppercase()).count();
        if upper as f64 / len as f64 > SHOUTING_RATIO {
            return Err(ValidationError::ExcessiveCapitals);
        }
    }

    Ok(())
}

// Length of the longest run of one repeated character
fn longest_run(content: &str) -> usize {
    let mut longest = 0;
    let mut run = 0;
    let mut prev = None;

    for c in content.chars() {
        if prev == Some(c) {
            run += 1;
        } else {
            run = 1;
            prev = Some(c);
        }
        longest = longest.max(run);
    }
    longest
}

/// Checks the shape of a whole conversation as it arrived on the wire.
pub fn validate_chat_messages(messages: &[Value]) -> Result<(), ValidationError> {
    if messages.len() > MAX_MESSAGES {
        return Err(ValidationError::TooManyMessages);
    }

    for (index, message) in messages.iter().enumerate() {
        let object = message
            .as_object()
            .ok_or(ValidationError::NotAnObject { index })?;

        let role = object
            .get("role")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingRole { index })?;

        if !ROLES.contains(&role) {
            return Err(ValidationError::InvalidRole {
                index,
                role: role.to_string(),
            });
        }

        if !object.get("content").is_some_and(Value::is_string) {
            return Err(ValidationError::MissingContent { index });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_empty_and_blank() {
        assert_eq!(validate_chat_message(""), Err(ValidationError::Empty));
        assert_eq!(validate_chat_message("   \n"), Err(ValidationError::Empty));
    }

    #[test]
    fn length_limit_is_inclusive() {
        let at_limit = "ab".repeat(2000);
        assert!(validate_chat_message(&at_limit).is_ok());

        let over = format!("{at_limit}a");
        assert_eq!(validate_chat_message(&over), Err(ValidationError::TooLong));
    }

    #[test]
    fn rejects_long_character_runs() {
        let spam = format!("hello {}", "!".repeat(21));
        assert_eq!(
            validate_chat_message(&spam),
            Err(ValidationError::RepeatedCharacters)
        );
        assert!(validate_chat_message(&format!("so {}", "o".repeat(19))).is_ok());
    }

    #[test]
    fn rejects_shouting() {
        let shout = "WHY DID I SPEND SO MUCH ON GROCERIES AND TAKEOUT THIS MONTH!";
        assert_eq!(shout.len(), 60);
        assert_eq!(
            validate_chat_message(shout),
            Err(ValidationError::ExcessiveCapitals)
        );
        // short messages may be all caps
        assert!(validate_chat_message("HELP ME BUDGET").is_ok());
    }

    #[test]
    fn accepts_normal_sentence() {
        let question = "How much did I spend on groceries in March, friend";
        assert_eq!(question.len(), 50);
        assert!(validate_chat_message(question).is_ok());
    }

    #[test]
    fn accepts_well_formed_conversation() {
        let messages = vec![
            json!({"role": "system", "content": "Be concise."}),
            json!({"role": "user", "content": "What did I spend on rent?"}),
            json!({"role": "assistant", "content": "You paid 1200 in rent."}),
        ];
        assert!(validate_chat_messages(&messages).is_ok());
    }

    #[test]
    fn rejects_too_many_messages() {
        let messages = vec![json!({"role": "user", "content": "hi"}); 51];
        assert_eq!(
            validate_chat_messages(&messages),
            Err(ValidationError::TooManyMessages)
        );
        assert!(validate_chat_messages(&messages[..50]).is_ok());
    }

    #[test]
    fn rejects_malformed_messages() {
        let missing_role = vec![json!({"content": "hi"})];
        assert_eq!(
            validate_chat_messages(&missing_role),
            Err(ValidationError::MissingRole { index: 0 })
        );

        let bad_role = vec![
            json!({"role": "user", "content": "hi"}),
            json!({"role": "tool", "content": "x"}),
        ];
        assert_eq!(
            validate_chat_messages(&bad_role),
            Err(ValidationError::InvalidRole {
                index: 1,
                role: "tool".to_string()
            })
        );

        assert_eq!(
            validate_chat_messages(&[json!("hi")]),
            Err(ValidationError::NotAnObject { index: 0 })
        );
        assert_eq!(
            validate_chat_messages(&[json!({"role": "user", "content": 7})]),
            Err(ValidationError::MissingContent { index: 0 })
        );
    }
}
