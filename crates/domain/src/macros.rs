//! String forms for the configuration enums
//!
//! `CHATLINE_ENV`, `CHATLINE_STORAGE` and the log format all arrive as
//! free-form strings. [`impl_enum_str_conversions!`] gives such an enum a
//! lowercase `Display` and a case-insensitive `FromStr` from one table.
//!
//! ```rust
//! use chatline_domain::{Environment, StorageKind};
//!
//! assert_eq!("Production".parse::<Environment>(), Ok(Environment::Production));
//! assert_eq!(StorageKind::Keychain.to_string(), "keychain");
//! assert!("disk".parse::<StorageKind>().is_err());
//! ```

/// Implements `Display` and `FromStr` for a unit enum from a
/// `Variant => "name"` table.
///
/// Parse errors read `Invalid <Enum>: <input>`.
#[macro_export]
macro_rules! impl_enum_str_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $(Self::$variant => $str,)+
                })
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
