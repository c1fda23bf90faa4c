mod comma_separated;
pub use self::comma_separated::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located<T> {
    pub t: T,
    pub line: usize,
    pub col: usize,
}
impl<T: core::fmt::Display> core::fmt::Display for Located<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // lines and columns are zero-based internally
        write!(f, "{}:{}: {}", self.line + 1, self.col + 1, self.t)
    }
}
impl<T: core::fmt::Debug + core::fmt::Display> std::error::Error for Located<T> {}

pub trait BoolToErrorHelper {
    fn or_err<E>(self, f: impl FnOnce() -> E) -> Result<(), E>;
}
impl BoolToErrorHelper for bool {
    #[inline(always)]
    fn or_err<E>(self, f: impl FnOnce() -> E) -> Result<(), E> {
        if !self {
            Err(f())
        } else {
            Ok(())
        }
    }
}
