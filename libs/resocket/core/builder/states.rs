/// Type-state markers for the builder pattern
///
/// These types track at compile time whether a target URL has been set,
/// so `connect()` is only available on a builder that can connect somewhere.

/// Marker trait for URL state
pub trait UrlState {}

/// URL has not been set
#[derive(Debug)]
pub struct NoUrl;
impl UrlState for NoUrl {}

/// URL has been set
#[derive(Debug)]
pub struct HasUrl;
impl UrlState for HasUrl {}
