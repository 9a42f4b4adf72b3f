//! Serde helpers for configuration types

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// `Duration` as whole milliseconds (`u64`).
///
/// ```rust
/// use std::time::Duration;
///
/// use gridrest_domain::utils::duration_millis;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Example {
///     #[serde(with = "duration_millis")]
///     timeout: Duration,
/// }
/// ```
pub mod duration_millis {
    use super::*;

    type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct TestStruct {
        #[serde(with = "duration_millis")]
        timeout: Duration,
    }

    #[test]
    fn test_duration_millis_round_trip() {
        let data = TestStruct { timeout: Duration::from_millis(1500) };
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, r#"{"timeout":1500}"#);
        let back: TestStruct = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }
}
