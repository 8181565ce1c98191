use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

const UNIT: &str = "mins";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid runtime format, expected \"<minutes> mins\"")]
pub struct RuntimeFormatError;

/// Movie running time in whole minutes.
///
/// On the wire it is the string `"<minutes> mins"`, in storage a plain integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Runtime(u32);

impl Runtime {
    pub const fn from_minutes(minutes: u32) -> Self {
        Runtime(minutes)
    }

    pub const fn minutes(&self) -> u32 {
        self.0
    }

    /// Zero runtime means "unknown" and is left out of serialized records.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, UNIT)
    }
}

impl FromStr for Runtime {
    type Err = RuntimeFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let (Some(number), Some(unit), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Err(RuntimeFormatError);
        };
        if unit != UNIT || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RuntimeFormatError);
        }
        number
            .parse::<u32>()
            .map(Runtime)
            .map_err(|_| RuntimeFormatError)
    }
}

impl Serialize for Runtime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

struct RuntimeVisitor;

impl de::Visitor<'_> for RuntimeVisitor {
    type Value = Runtime;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string in the form \"<minutes> mins\"")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(RuntimeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Runtime::from_minutes(120).to_string(), "120 mins");
        assert_eq!(Runtime::from_minutes(7).to_string(), "7 mins");
    }

    #[test]
    fn test_parse() {
        assert_eq!("102 mins".parse::<Runtime>(), Ok(Runtime(102)));
        assert_eq!("  95   mins ".parse::<Runtime>(), Ok(Runtime(95)));
        assert_eq!("0 mins".parse::<Runtime>(), Ok(Runtime(0)));
    }

    #[test]
    fn test_parse_malformed() {
        for bad in [
            "mins 90",
            "90minutes",
            "ninety mins",
            "90",
            "90 minutes",
            "90 mins extra",
            "-90 mins",
            "+90 mins",
            "",
            "99999999999 mins",
        ] {
            assert_eq!(bad.parse::<Runtime>(), Err(RuntimeFormatError), "{bad:?}");
        }
    }

    #[test]
    fn test_json_string_only() {
        let runtime: Runtime = serde_json::from_str(r#""142 mins""#).unwrap();
        assert_eq!(runtime.minutes(), 142);
        assert_eq!(serde_json::to_string(&runtime).unwrap(), r#""142 mins""#);

        assert!(serde_json::from_str::<Runtime>("142").is_err());
        assert!(serde_json::from_str::<Runtime>(r#"["142 mins"]"#).is_err());
        let err = serde_json::from_str::<Runtime>(r#""not-a-duration""#).unwrap_err();
        assert!(err.to_string().contains("invalid runtime format"));
    }

    #[quickcheck]
    fn test_text_form_round_trip(minutes: u32) -> bool {
        let runtime = Runtime::from_minutes(minutes);
        runtime.to_string().parse::<Runtime>() == Ok(runtime)
    }
}
