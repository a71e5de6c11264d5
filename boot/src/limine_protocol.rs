//! Boot protocol handshake.
//!
//! Only the base revision is requested. The request markers bracket the
//! section the bootloader scans.

use limine::request::{RequestsEndMarker, RequestsStartMarker};
use limine::BaseRevision;

#[used]
#[unsafe(link_section = ".limine_requests_start_marker")]
static LIMINE_REQUESTS_START_MARKER: RequestsStartMarker = RequestsStartMarker::new();

#[used]
#[unsafe(link_section = ".limine_requests")]
static BASE_REVISION: BaseRevision = BaseRevision::new();

#[used]
#[unsafe(link_section = ".limine_requests_end_marker")]
static LIMINE_REQUESTS_END_MARKER: RequestsEndMarker = RequestsEndMarker::new();

/// Whether the bootloader accepted the requested base revision.
pub fn base_revision_supported() -> bool {
    BASE_REVISION.is_supported()
}
