use core::fmt;

/// The per-job computation run by every worker in a pool.
///
/// A single instance is shared (behind an `Arc`) by all workers, so
/// implementations must be `Send + Sync` and should hold no mutable state.
pub trait Transform: Send + Sync + 'static {
    /// The job type pulled from the job source.
    type Input: fmt::Debug + Send + 'static;
    /// The value pushed to the result sink on success.
    type Output: Send + 'static;
    /// The cause attached to a [`crate::TransformError`] on failure.
    type Error: fmt::Debug + fmt::Display + Send + 'static;

    /// Transforms one job.
    ///
    /// # Errors
    ///
    /// Returns `Err` if this job cannot be transformed. The pool reports the
    /// failure for this job only and keeps going.
    fn apply(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// Doubles every job.
///
/// Uses checked arithmetic: a job whose double does not fit in an `i64` fails
/// with [`DoubleError::Overflow`] instead of wrapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Doubler;

/// Failure cause for [`Doubler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DoubleError {
    #[error("doubling {0} overflows i64")]
    Overflow(i64),
}

impl Transform for Doubler {
    type Input = i64;
    type Output = i64;
    type Error = DoubleError;

    fn apply(&self, input: &i64) -> Result<i64, DoubleError> {
        input.checked_mul(2).ok_or(DoubleError::Overflow(*input))
    }
}

/// A [`Transform`] backed by a closure. See [`from_fn`].
pub struct FnTransform<F, I, O, E> {
    f: F,
    _marker: core::marker::PhantomData<fn(&I) -> Result<O, E>>,
}

impl<F, I, O, E> fmt::Debug for FnTransform<F, I, O, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransform").finish_non_exhaustive()
    }
}

/// Wraps a closure as a [`Transform`].
///
/// ```
/// use jobpool::{Transform, from_fn};
///
/// let square = from_fn(|n: &u32| n.checked_mul(*n).ok_or("overflow"));
/// assert_eq!(square.apply(&12), Ok(144));
/// ```
pub const fn from_fn<F, I, O, E>(f: F) -> FnTransform<F, I, O, E>
where
    F: Fn(&I) -> Result<O, E>,
{
    FnTransform {
        f,
        _marker: core::marker::PhantomData,
    }
}

impl<F, I, O, E> Transform for FnTransform<F, I, O, E>
where
    F: Fn(&I) -> Result<O, E> + Send + Sync + 'static,
    I: fmt::Debug + Send + 'static,
    O: Send + 'static,
    E: fmt::Debug + fmt::Display + Send + 'static,
{
    type Input = I;
    type Output = O;
    type Error = E;

    fn apply(&self, input: &I) -> Result<O, E> {
        (self.f)(input)
    }
}
