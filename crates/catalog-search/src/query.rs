//! Read paths shared by the document store and the wholesale index.
//!
//! Both run the backend call on the blocking pool while holding an owned
//! read guard, so a writer cannot swap the reader mid-query even if the
//! caller stops waiting.

use std::sync::Arc;

use tokio::sync::{OwnedRwLockReadGuard, RwLock};
use tracing::debug;

use catalog_types::{Record, ID_FIELD};

use crate::backend::{BackendReader, IndexBackend};
use crate::error::IndexError;
use crate::ranker::{Match, MatchList};

/// The reader slot guarded by the index lock. `None` until opened.
pub(crate) type ReaderSlot<B> = Arc<RwLock<Option<<B as IndexBackend>::Reader>>>;

/// Look up one record by id.
pub(crate) async fn point_lookup<R, Rd>(
    guard: OwnedRwLockReadGuard<Option<Rd>>,
    id: &str,
) -> Result<R, IndexError>
where
    R: Record,
    Rd: BackendReader,
{
    let id = id.to_string();
    tokio::task::spawn_blocking(move || {
        let reader = guard.as_ref().ok_or(IndexError::ReaderUninitialized)?;
        let hit = reader
            .term_query(ID_FIELD, &id, 1)?
            .into_iter()
            .next()
            .ok_or(IndexError::NotFound(id))?;
        Ok(R::unmarshal(&hit.fields)?)
    })
    .await?
}

/// Query every field, keep the best score per id, return the top `limit`.
///
/// A hit that fails to unmarshal aborts the whole call.
pub(crate) async fn ranked_search<R, Rd>(
    guard: OwnedRwLockReadGuard<Option<Rd>>,
    fields: Arc<[String]>,
    text: &str,
    limit: usize,
) -> Result<Vec<Match<R>>, IndexError>
where
    R: Record,
    Rd: BackendReader,
{
    let text = text.to_string();
    tokio::task::spawn_blocking(move || {
        let reader = guard.as_ref().ok_or(IndexError::ReaderUninitialized)?;

        let mut matches = MatchList::new();
        for field in fields.iter() {
            for hit in reader.match_query(field, &text, limit)? {
                let record = R::unmarshal(&hit.fields)?;
                let id = record.id().to_string();
                matches.insert(Match::new(id, record, hit.score, field.as_str()));
            }
        }

        debug!(
            query = %text,
            fields = fields.len(),
            distinct = matches.len(),
            "Merged field matches"
        );
        Ok(matches.into_top(limit))
    })
    .await?
}

/// True when a search can be answered without touching the index.
pub(crate) fn is_trivial_search(text: &str, limit: usize) -> bool {
    limit == 0 || text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendWriter;
    use crate::memory::{MemoryBackend, MemoryReader};
    use catalog_types::{Anime, Document, RecordError};

    async fn slot_with(records: &[Anime]) -> Arc<RwLock<Option<MemoryReader>>> {
        let backend = MemoryBackend::new();
        let mut writer = backend.open_writer().unwrap();
        writer
            .submit(records.iter().map(|r| r.marshal().unwrap()).collect())
            .unwrap();
        Arc::new(RwLock::new(Some(backend.open_reader().unwrap())))
    }

    fn fields() -> Arc<[String]> {
        Anime::search_fields().iter().map(|f| f.to_string()).collect()
    }

    #[tokio::test]
    async fn test_point_lookup() {
        let slot = slot_with(&[Anime::new("anidb-1", "Cowboy Bebop")]).await;

        let found: Anime = point_lookup(slot.clone().read_owned().await, "anidb-1")
            .await
            .unwrap();
        assert_eq!(found.title, "Cowboy Bebop");

        let missing = point_lookup::<Anime, _>(slot.read_owned().await, "anidb-2").await;
        assert!(matches!(missing, Err(IndexError::NotFound(id)) if id == "anidb-2"));
    }

    #[tokio::test]
    async fn test_uninitialized_reader() {
        let slot: Arc<RwLock<Option<MemoryReader>>> = Arc::new(RwLock::new(None));
        let result = point_lookup::<Anime, _>(slot.read_owned().await, "anidb-1").await;
        assert!(matches!(result, Err(IndexError::ReaderUninitialized)));
    }

    #[tokio::test]
    async fn test_ranked_search_dedups_across_fields() {
        let slot = slot_with(&[
            Anime::new("anidb-1", "Shingeki no Kyojin").with_english_title("Attack on Titan"),
            Anime::new("anidb-2", "Titan").with_synonyms(["Titan Movie"]),
        ])
        .await;

        let matches: Vec<Match<Anime>> =
            ranked_search(slot.read_owned().await, fields(), "titan", 10)
                .await
                .unwrap();

        let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["anidb-2", "anidb-1"]);
        assert_eq!(matches[0].field, "title");
        assert_eq!(matches[1].field, "english_title");
    }

    #[tokio::test]
    async fn test_undecodable_hit_fails_the_call() {
        let backend = MemoryBackend::new();
        let mut writer = backend.open_writer().unwrap();
        writer
            .submit(vec![
                Anime::new("anidb-1", "Trigun").marshal().unwrap(),
                Document::new("bad")
                    .unwrap()
                    .text("title", "Trigun Stampede")
                    .stored("episodes", "x"),
            ])
            .unwrap();
        let slot = Arc::new(RwLock::new(Some(backend.open_reader().unwrap())));

        let searched =
            ranked_search::<Anime, _>(slot.clone().read_owned().await, fields(), "trigun", 10)
                .await;
        assert!(matches!(
            searched,
            Err(IndexError::Record(RecordError::Decode { ref field, .. })) if field == "episodes"
        ));

        let looked_up = point_lookup::<Anime, _>(slot.clone().read_owned().await, "bad").await;
        assert!(matches!(
            looked_up,
            Err(IndexError::Record(RecordError::Decode { ref field, .. })) if field == "episodes"
        ));

        // The valid record is still readable on its own
        let good: Anime = point_lookup(slot.read_owned().await, "anidb-1").await.unwrap();
        assert_eq!(good.title, "Trigun");
    }

    #[test]
    fn test_trivial_search() {
        assert!(is_trivial_search("  ", 10));
        assert!(is_trivial_search("bebop", 0));
        assert!(!is_trivial_search("bebop", 1));
    }
}
