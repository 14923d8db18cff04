/// Error types that can be built from a plain message.
///
/// Implement this for a crate's error type, then invoke [`impl_context!`]
/// in its error module to get `.context()` and `.with_context()` on
/// `Result` and `Option`.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// `"<context>: <source>"`
#[must_use]
pub fn prefixed(context: &str, source: &dyn std::fmt::Display) -> String {
    format!("{context}: {source}")
}

/// Generate a crate-local `Context` trait for `$err`.
///
/// ```ignore
/// // in crates/relay/src/error.rs
/// relaygram_common::impl_context!(Error);
/// ```
#[macro_export]
macro_rules! impl_context {
    ($err:ty) => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> std::result::Result<T, $err>;

            fn with_context<C, F>(self, f: F) -> std::result::Result<T, $err>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, context: impl Into<String>) -> std::result::Result<T, $err> {
                self.with_context(|| context)
            }

            fn with_context<C, F>(self, f: F) -> std::result::Result<T, $err>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    <$err as $crate::FromMessage>::from_message($crate::error::prefixed(
                        &f().into(),
                        &source,
                    ))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> std::result::Result<T, $err> {
                self.with_context(|| context)
            }

            fn with_context<C, F>(self, f: F) -> std::result::Result<T, $err>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <$err as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}
