//! A boxed, type-erased error used at crate boundaries so callers don't need
//! to name every downstream error type.

/// A boxed error that is `Send + Sync + 'static`, suitable for storing as the
/// `source` of a `snafu`-derived error across a crate boundary.
pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

pub type GenericResult<T> = std::result::Result<T, GenericError>;

/// Helper for converting any standard error into a [`GenericError`] inline,
/// mirroring `.box_err()` used throughout the workspace.
pub trait BoxError {
    fn box_err(self) -> GenericError;
}

impl<E: std::error::Error + Send + Sync + 'static> BoxError for E {
    fn box_err(self) -> GenericError {
        Box::new(self)
    }
}

/// Extension for `Result<T, E>` mirroring the workspace's `.box_err()`
/// convention so call sites can write `some_call().box_err()?` without an
/// intermediate `map_err`.
pub trait ResultExt<T, E> {
    fn box_err(self) -> GenericResult<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn box_err(self) -> GenericResult<T> {
        self.map_err(|e| Box::new(e) as GenericError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct MyError;

    impl std::fmt::Display for MyError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "my error")
        }
    }

    impl std::error::Error for MyError {}

    #[test]
    fn boxes_result_errors() {
        let r: std::result::Result<(), MyError> = Err(MyError);
        let boxed: GenericResult<()> = r.box_err();
        assert_eq!(boxed.unwrap_err().to_string(), "my error");
    }
}
