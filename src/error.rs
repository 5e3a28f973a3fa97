/// Failures raised by the script-facing [`Realm`](crate::Realm) binding.
///
/// The typed container API has no failure modes: absence is reported as
/// `None` or `false`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A constructor was invoked as a plain function.
    #[error("`{type_name}` must be constructed, not invoked plainly")]
    Construction { type_name: &'static str },

    /// An argument had the wrong kind.
    #[error("{argument} is not {expected}")]
    InvalidArgument {
        argument: &'static str,
        expected: &'static str,
    },
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
