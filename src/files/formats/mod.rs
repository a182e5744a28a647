//! Container format support
//!
//! QuickTime and MP4 files share the ISO Base Media box structure handled in
//! [`bmff`].

pub mod bmff;
