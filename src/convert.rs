//! Value conversion from raw option arguments to typed values.

use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a [`ValueConverter`] for a single raw value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert '{value}' to {target}: {message}")]
pub struct ValueConversionError {
    pub value: String,
    pub target: String,
    pub message: String,
}

impl ValueConversionError {
    pub fn new(
        value: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            value: value.into(),
            target: target.into(),
            message: message.into(),
        }
    }
}

/// Error raised by a typed accessor when an option's argument fails conversion.
///
/// Carries the spellings of the offending option, the raw argument and the
/// converter's own error as its source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert argument '{argument}' of option {spellings:?}")]
pub struct ConversionError {
    pub spellings: Vec<String>,
    pub argument: String,
    #[source]
    pub source: ValueConversionError,
}

/// Converts raw string arguments into values of type `T`.
pub trait ValueConverter<T> {
    /// Convert one raw argument.
    fn convert(&self, raw: &str) -> Result<T, ValueConversionError>;

    /// Name of the produced type, used in diagnostics and help.
    fn value_type(&self) -> &'static str;

    /// Optional display pattern used instead of the type name in help.
    fn value_pattern(&self) -> Option<String> {
        None
    }
}

/// Shared handle to a converter, as stored on typed option handles.
pub type SharedConverter<T> = Arc<dyn ValueConverter<T> + Send + Sync>;

/// Text shown in help for the argument of an option converted by `converter`.
pub fn type_indicator<T>(converter: &(dyn ValueConverter<T> + Send + Sync)) -> String {
    converter
        .value_pattern()
        .unwrap_or_else(|| converter.value_type().to_string())
}

/// Converter for any type implementing [`FromStr`].
pub struct FromStrConverter<T> {
    type_name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FromStrConverter<T> {
    pub const fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            _marker: PhantomData,
        }
    }
}

impl<T> ValueConverter<T> for FromStrConverter<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn convert(&self, raw: &str) -> Result<T, ValueConversionError> {
        raw.parse::<T>()
            .map_err(|e| ValueConversionError::new(raw, self.type_name, e.to_string()))
    }

    fn value_type(&self) -> &'static str {
        self.type_name
    }
}

/// Converter backed by a user-supplied closure.
pub struct FnConverter<T, F> {
    type_name: &'static str,
    pattern: Option<String>,
    convert: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> FnConverter<T, F>
where
    F: Fn(&str) -> Result<T, String>,
{
    pub fn new(type_name: &'static str, convert: F) -> Self {
        Self {
            type_name,
            pattern: None,
            convert,
            _marker: PhantomData,
        }
    }

    /// Set the display pattern shown in help (e.g. `yyyy-mm-dd`).
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

impl<T, F> ValueConverter<T> for FnConverter<T, F>
where
    F: Fn(&str) -> Result<T, String>,
{
    fn convert(&self, raw: &str) -> Result<T, ValueConversionError> {
        (self.convert)(raw).map_err(|message| ValueConversionError::new(raw, self.type_name, message))
    }

    fn value_type(&self) -> &'static str {
        self.type_name
    }

    fn value_pattern(&self) -> Option<String> {
        self.pattern.clone()
    }
}

/// Types with a built-in converter, selectable through `OptionBuilder::of_type`.
pub trait ArgumentType: Sized + 'static {
    fn converter() -> SharedConverter<Self>;
}

macro_rules! from_str_argument_types {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl ArgumentType for $ty {
                fn converter() -> SharedConverter<Self> {
                    Arc::new(FromStrConverter::<$ty>::new($name))
                }
            }
        )*
    };
}

from_str_argument_types! {
    String => "string",
    PathBuf => "path",
    bool => "bool",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    i128 => "i128",
    isize => "isize",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    u128 => "u128",
    usize => "usize",
    f32 => "f32",
    f64 => "f64",
}
