//! Response store: item id to candidate response.
//!
//! A response is overwritable until its item is sealed (the item's active
//! window closed). The single post-seal write is attaching the completed
//! audio handle of the item's own recording.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::SessionError;
use crate::model::{AudioHandle, AudioResponse, Item, Response, ResponseShape};

#[derive(Debug, Clone, Default)]
pub struct ResponseStore {
    responses: HashMap<String, Response>,
    sealed: HashSet<String>,
}

impl ResponseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace the response for `item`.
    pub fn submit(&mut self, item: &Item, response: Response) -> Result<(), SessionError> {
        self.ensure_open(item)?;
        let expected = item.kind.response_shape();
        if response.shape() != expected {
            return Err(SessionError::ShapeMismatch {
                item_id: item.id.clone(),
                expected,
                found: response.shape(),
            });
        }
        if let Response::Blanks(blanks) = &response {
            if let Some(&index) = blanks.keys().find(|&&i| i >= item.blank_count) {
                return Err(SessionError::BlankOutOfRange {
                    item_id: item.id.clone(),
                    index,
                    blank_count: item.blank_count,
                });
            }
        }
        self.responses.insert(item.id.clone(), response);
        Ok(())
    }

    /// Set one blank, keeping whatever else was already filled.
    pub fn fill_blank(
        &mut self,
        item: &Item,
        index: usize,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.ensure_open(item)?;
        let shape = item.kind.response_shape();
        if shape != ResponseShape::Blanks {
            return Err(SessionError::ShapeMismatch {
                item_id: item.id.clone(),
                expected: shape,
                found: ResponseShape::Blanks,
            });
        }
        if index >= item.blank_count {
            return Err(SessionError::BlankOutOfRange {
                item_id: item.id.clone(),
                index,
                blank_count: item.blank_count,
            });
        }

        let entry = self
            .responses
            .entry(item.id.clone())
            .or_insert_with(|| Response::Blanks(BTreeMap::new()));
        if let Response::Blanks(blanks) = entry {
            blanks.insert(index, value.into());
        }
        Ok(())
    }

    /// Record the outcome of a recording window.
    pub fn record_audio(&mut self, item: &Item, audio: AudioResponse) -> Result<(), SessionError> {
        self.submit(item, Response::Audio(audio))
    }

    /// Attach a completed capture to an item's audio response, even if the
    /// item has already been sealed.
    pub fn attach_capture(&mut self, item_id: &str, handle: AudioHandle) -> bool {
        match self.responses.get_mut(item_id) {
            Some(Response::Audio(audio)) => {
                *audio = audio.clone().with_handle(handle);
                true
            }
            _ => false,
        }
    }

    /// Replace a pending audio response with the unavailable-device stand-in.
    pub fn mark_placeholder(&mut self, item_id: &str) -> bool {
        match self.responses.get_mut(item_id) {
            Some(Response::Audio(audio)) if !audio.captured => {
                *audio = AudioResponse::placeholder(audio.duration_secs);
                true
            }
            _ => false,
        }
    }

    /// Close the item's window. Later writes are rejected.
    pub fn seal(&mut self, item_id: &str) {
        self.sealed.insert(item_id.to_string());
    }

    pub fn is_sealed(&self, item_id: &str) -> bool {
        self.sealed.contains(item_id)
    }

    pub fn get(&self, item_id: &str) -> Option<&Response> {
        self.responses.get(item_id)
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Drop every response and seal.
    pub fn clear(&mut self) {
        self.responses.clear();
        self.sealed.clear();
    }

    fn ensure_open(&self, item: &Item) -> Result<(), SessionError> {
        if self.is_sealed(&item.id) {
            return Err(SessionError::ResponseSealed(item.id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemKind;
    use uuid::Uuid;

    fn fib() -> Item {
        Item::new("fib-1", ItemKind::ListeningFillInBlanks, "Fill the gaps")
            .with_answer(["north", "south", "east"])
    }

    #[test]
    fn overwrite_until_sealed() {
        let item = Item::new("mcs-1", ItemKind::MultipleChoiceSingle, "Pick one");
        let mut store = ResponseStore::new();
        store.submit(&item, Response::text("A")).unwrap();
        store.submit(&item, Response::text("B")).unwrap();
        assert_eq!(store.get("mcs-1"), Some(&Response::text("B")));

        store.seal("mcs-1");
        let err = store.submit(&item, Response::text("C")).unwrap_err();
        assert_eq!(err, SessionError::ResponseSealed("mcs-1".into()));
        assert_eq!(store.get("mcs-1"), Some(&Response::text("B")));
    }

    #[test]
    fn shape_must_match_kind() {
        let item = Item::new("mcm-1", ItemKind::MultipleChoiceMultiple, "Pick two");
        let mut store = ResponseStore::new();
        let err = store.submit(&item, Response::text("A")).unwrap_err();
        assert!(matches!(
            err,
            SessionError::ShapeMismatch {
                expected: ResponseShape::Choices,
                found: ResponseShape::Text,
                ..
            }
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn blanks_accumulate() {
        let item = fib();
        let mut store = ResponseStore::new();
        store.fill_blank(&item, 2, "east").unwrap();
        store.fill_blank(&item, 0, "north").unwrap();
        store.fill_blank(&item, 0, "North").unwrap();

        let Some(Response::Blanks(blanks)) = store.get("fib-1") else {
            panic!("expected blanks");
        };
        assert_eq!(blanks.len(), 2);
        assert_eq!(blanks[&0], "North");
        assert_eq!(blanks[&2], "east");

        let err = store.fill_blank(&item, 3, "west").unwrap_err();
        assert!(matches!(err, SessionError::BlankOutOfRange { index: 3, .. }));
    }

    #[test]
    fn capture_attaches_after_seal() {
        let item = Item::new("rs-1", ItemKind::RepeatSentence, "Repeat");
        let mut store = ResponseStore::new();
        store.record_audio(&item, AudioResponse::pending(8)).unwrap();
        store.seal("rs-1");

        let handle = AudioHandle {
            id: Uuid::nil(),
            byte_size: 64_000,
            duration_ms: 8_000,
        };
        assert!(store.attach_capture("rs-1", handle.clone()));
        let Some(Response::Audio(audio)) = store.get("rs-1") else {
            panic!("expected audio");
        };
        assert!(audio.captured);
        assert_eq!(audio.duration_secs, 8);
        assert_eq!(audio.handle, Some(handle));

        // a completed capture is never downgraded
        assert!(!store.mark_placeholder("rs-1"));
    }

    #[test]
    fn placeholder_keeps_measured_duration() {
        let item = Item::new("di-1", ItemKind::DescribeImage, "Describe");
        let mut store = ResponseStore::new();
        store.record_audio(&item, AudioResponse::pending(12)).unwrap();
        assert!(store.mark_placeholder("di-1"));
        assert_eq!(
            store.get("di-1"),
            Some(&Response::Audio(AudioResponse::placeholder(12)))
        );
    }

    #[test]
    fn clear_resets_seals() {
        let item = Item::new("wfd-1", ItemKind::WriteFromDictation, "Type it");
        let mut store = ResponseStore::new();
        store.submit(&item, Response::text("hello")).unwrap();
        store.seal("wfd-1");
        store.clear();
        assert!(store.is_empty());
        assert!(!store.is_sealed("wfd-1"));
    }
}
