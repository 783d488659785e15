//! Macro for implementing string conversions for status enums
//!
//! Persisted records and CLI output both carry statuses as snake_case
//! strings. This macro generates `as_str`, `Display` and `FromStr` from a
//! single variant table so the three can never drift apart.
//!
//! # Example
//!
//! ```rust
//! use linkstash_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum DeliveryState {
//!     Queued,
//!     RetryWait,
//! }
//!
//! impl_domain_status_conversions!(DeliveryState {
//!     Queued => "queued",
//!     RetryWait => "retry_wait",
//! });
//!
//! assert_eq!(DeliveryState::RetryWait.as_str(), "retry_wait");
//! assert_eq!("QUEUED".parse::<DeliveryState>(), Ok(DeliveryState::Queued));
//! ```

/// Implements `as_str`, Display and FromStr for status enums
///
/// - `as_str()` returns the canonical lowercase name
/// - Display writes the same string
/// - FromStr trims and parses case-insensitively, erroring with the enum name
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical string form.
            #[must_use]
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
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestState {
        Queued,
        RetryWait,
        AlreadyExists,
    }

    impl_domain_status_conversions!(TestState {
        Queued => "queued",
        RetryWait => "retry_wait",
        AlreadyExists => "already_exists",
    });

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(TestState::Queued.to_string(), "queued");
        assert_eq!(TestState::RetryWait.to_string(), TestState::RetryWait.as_str());
        assert_eq!(TestState::AlreadyExists.to_string(), "already_exists");
    }

    #[test]
    fn test_fromstr_case_and_whitespace_insensitive() {
        assert_eq!(TestState::from_str("retry_wait").unwrap(), TestState::RetryWait);
        assert_eq!(TestState::from_str("RETRY_WAIT").unwrap(), TestState::RetryWait);
        assert_eq!(TestState::from_str("  Already_Exists ").unwrap(), TestState::AlreadyExists);
    }

    #[test]
    fn test_fromstr_invalid() {
        let err = TestState::from_str("retrying").unwrap_err();
        assert!(err.contains("Invalid TestState"));
        assert!(err.contains("retrying"));
    }
}
