//! Macro for implementing Display and FromStr for wire-named enums
//!
//! Several small enums (post visibility, HTTP method, auth stage) travel as
//! lowercase strings on the wire or in logs. This macro gives them one
//! canonical string table for both directions, with case-insensitive parsing.
//!
//! # Example
//!
//! ```rust
//! use starlight_domain::impl_wire_name_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Reaction {
//!     Favourite,
//!     Boost,
//! }
//!
//! impl_wire_name_conversions!(Reaction {
//!     Favourite => "favourite",
//!     Boost => "boost",
//! });
//!
//! assert_eq!(Reaction::Boost.to_string(), "boost");
//! assert_eq!("FAVOURITE".parse::<Reaction>(), Ok(Reaction::Favourite));
//! ```

/// Implements Display and FromStr traits for wire-named enums
///
/// This macro generates:
/// - Display trait: writes the wire name of the variant
/// - FromStr trait: parses case-insensitive strings to enum variants
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their lowercase wire
///   names
#[macro_export]
macro_rules! impl_wire_name_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Wire name of this variant.
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

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
