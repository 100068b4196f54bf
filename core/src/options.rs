/// Policy for absent boot sector or kernel binaries.
///
/// A missing payload can be tolerated with a warning and a zeroed
/// region, which silently produces a non-bootable image. Failing is the
/// default; the lenient behavior has to be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingInputPolicy {
    /// Abort the build with a `MissingInput` error.
    #[default]
    Fail,
    /// Log a warning and leave the region zeroed.
    WarnAndZero,
}
