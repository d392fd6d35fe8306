//! Places artifacts get uploaded to

use camino::Utf8PathBuf;

use crate::{build::BuildResults, errors::ReleaseResult, SortedMap};

pub mod gcs;

pub use gcs::GcsUploader;

/// Public URLs of uploaded artifacts, keyed by output path
pub type UploadedUrls = SortedMap<Utf8PathBuf, String>;

/// Something that can publish built artifacts
pub trait Uploader {
    /// Upload every artifact in `artifacts`, returning where each one ended up
    ///
    /// Only successful builds are ever passed in.
    fn upload(&self, artifacts: &BuildResults) -> ReleaseResult<UploadedUrls>;
}
