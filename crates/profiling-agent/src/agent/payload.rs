// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error payloads accepted by [`crate::Agent::record_error`].

use std::fmt::{self, Display};

/// Either an error value or any other value the caller wants reported as an error.
///
/// Conversions exist for the common error types and for plain values (strings,
/// numbers, booleans, chars), so most call sites can pass their value directly:
///
/// ```
/// use profiling_agent::ErrorPayload;
///
/// let from_int: ErrorPayload = 42.into();
/// assert_eq!(from_int.into_error().to_string(), "42");
///
/// let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
/// let from_io: ErrorPayload = io.into();
/// assert!(from_io.into_error().downcast_ref::<std::io::Error>().is_some());
/// ```
pub enum ErrorPayload {
    /// Already an error; forwarded unchanged.
    Error(anyhow::Error),
    /// Any other value, held in its default textual rendering.
    Value(String),
}

impl ErrorPayload {
    pub fn error<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Error(anyhow::Error::new(error))
    }

    pub fn value(value: impl Display) -> Self {
        Self::Value(value.to_string())
    }

    /// Normalizes the payload into the error handed to the error collaborator.
    pub fn into_error(self) -> anyhow::Error {
        match self {
            Self::Error(error) => error,
            Self::Value(text) => anyhow::Error::msg(text),
        }
    }
}

impl fmt::Debug for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(error) => f.debug_tuple("Error").field(&error.to_string()).finish(),
            Self::Value(text) => f.debug_tuple("Value").field(text).finish(),
        }
    }
}

impl From<anyhow::Error> for ErrorPayload {
    fn from(error: anyhow::Error) -> Self {
        Self::Error(error)
    }
}

impl From<std::io::Error> for ErrorPayload {
    fn from(error: std::io::Error) -> Self {
        Self::error(error)
    }
}

impl From<crate::error::AgentError> for ErrorPayload {
    fn from(error: crate::error::AgentError) -> Self {
        Self::error(error)
    }
}

impl From<&str> for ErrorPayload {
    fn from(value: &str) -> Self {
        Self::Value(value.to_string())
    }
}

impl From<String> for ErrorPayload {
    fn from(value: String) -> Self {
        Self::Value(value)
    }
}

macro_rules! impl_from_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ErrorPayload {
                fn from(value: $ty) -> Self {
                    Self::value(value)
                }
            }
        )*
    };
}

impl_from_display!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char);
