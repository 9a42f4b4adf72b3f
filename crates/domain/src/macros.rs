//! Macros for wire-named enums and literal rows
//!
//! `impl_wire_name_conversions!` implements `Display`, `FromStr`,
//! `Serialize` and `Deserialize` for fieldless enums that travel as fixed
//! upper-case strings (`"COLLECTION"`, `"TIME_SERIES"`, ...). Parsing is
//! case-insensitive; output always uses the canonical spelling.
//!
//! # Example
//!
//! ```rust
//! use gridrest_domain::impl_wire_name_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Direction {
//!     Up,
//!     Down,
//! }
//!
//! impl_wire_name_conversions!(Direction {
//!     Up => "UP",
//!     Down => "DOWN",
//! });
//!
//! assert_eq!("up".parse::<Direction>().unwrap(), Direction::Up);
//! assert_eq!(Direction::Down.to_string(), "DOWN");
//! ```

/// Implements Display, FromStr and serde for wire-named enums
#[macro_export]
macro_rules! impl_wire_name_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical wire spelling
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }

        impl serde::Serialize for $enum_name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $enum_name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> ::std::result::Result<Self, D::Error> {
                let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Build a [`Row`](crate::types::Row) from `key => value` pairs, keeping
/// the written order.
///
/// ```rust
/// use gridrest_domain::{row, Value};
///
/// let row = row! { "id" => 1, "name" => "Alice" };
/// assert_eq!(row.get("name"), Some(&Value::from("Alice")));
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::types::Row::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut row = $crate::types::Row::new();
        $(row.insert($key, $value);)+
        row
    }};
}
