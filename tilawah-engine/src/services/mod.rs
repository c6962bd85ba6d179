//! External content services
//!
//! The engine consumes two fetch operations: the reciter list and the
//! chapter audio metadata (stream URL plus verse timing index). Both sit
//! behind [`RecitationSource`] so tests can substitute a mock.

pub mod quran_api;

use crate::error::Result;
use async_trait::async_trait;
use tilawah_common::types::{ChapterAudioFile, Reciter};

pub use quran_api::QuranApiClient;

/// Fetch boundary for recitation content
#[async_trait]
pub trait RecitationSource: Send + Sync {
    /// Fetch the list of available reciters
    async fn get_reciters(&self) -> Result<Vec<Reciter>>;

    /// Fetch audio metadata for one (reciter, chapter) pairing
    ///
    /// Fails with [`crate::Error::ChapterNotAvailable`] when this reciter has
    /// no recording for the chapter, distinguishable from generic network
    /// failure.
    async fn get_chapter_audio(
        &self,
        reciter_id: u32,
        chapter_id: u32,
    ) -> Result<ChapterAudioFile>;
}
