use crate::entity::EntityResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// How declared field names map onto wire keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldNamingPolicy {
    /// Keys cross the wire exactly as the struct declares them.
    #[default]
    AsDeclared,
    /// Wire keys are lower_case_with_underscores in both directions.
    LowerCaseWithUnderscores,
    /// Wire keys are camelCase; declared keys are snake_case.
    CamelCase,
}

/// JSON codec applying a [`FieldNamingPolicy`] to object keys recursively.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    policy: FieldNamingPolicy,
}

impl JsonCodec {
    pub fn new(policy: FieldNamingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> FieldNamingPolicy {
        self.policy
    }

    pub fn encode<T: Serialize>(&self, value: &T) -> EntityResult<Value> {
        let raw = serde_json::to_value(value)?;
        Ok(self.rename_keys(raw, true))
    }

    pub fn decode<T: DeserializeOwned>(&self, value: Value) -> EntityResult<T> {
        let renamed = self.rename_keys(value, false);
        Ok(serde_json::from_value(renamed)?)
    }

    fn wire_key(&self, key: &str) -> String {
        match self.policy {
            FieldNamingPolicy::AsDeclared => key.to_string(),
            FieldNamingPolicy::LowerCaseWithUnderscores => to_snake_case(key),
            FieldNamingPolicy::CamelCase => to_camel_case(key),
        }
    }

    fn declared_key(&self, key: &str) -> String {
        match self.policy {
            FieldNamingPolicy::AsDeclared => key.to_string(),
            FieldNamingPolicy::LowerCaseWithUnderscores | FieldNamingPolicy::CamelCase => {
                to_snake_case(key)
            }
        }
    }

    fn rename_keys(&self, value: Value, to_wire: bool) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, inner)| {
                        let key = if to_wire {
                            self.wire_key(&key)
                        } else {
                            self.declared_key(&key)
                        };
                        (key, self.rename_keys(inner, to_wire))
                    })
                    .collect(),
            ),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.rename_keys(item, to_wire))
                    .collect(),
            ),
            other => other,
        }
    }
}

pub fn to_snake_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    for (index, ch) in input.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if index > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

pub fn to_camel_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut upper_next = false;
    for ch in input.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}
