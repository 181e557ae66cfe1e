use base64::Engine as _;
use base64::engine::general_purpose;

use crate::errors::TransferError;

/// Announcement sent by the camera before the fragments of one image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageMetadata {
    pub size: usize,
    pub width: u32,
    pub height: u32,
    pub chunks: usize,
}

#[derive(Debug)]
pub struct CompletedImage {
    pub data: Vec<u8>,
    pub chunks: usize,
    pub metadata: Option<ImageMetadata>,
}

#[derive(Debug)]
pub enum FragmentOutcome {
    Pending { received: usize, total: usize },
    Completed(CompletedImage),
}

#[derive(Debug, Default)]
struct ImageTransfer {
    metadata: Option<ImageMetadata>,
    /// Presence map indexed by fragment number.
    slots: Vec<Option<Vec<u8>>>,
    received: usize,
}

impl ImageTransfer {
    fn with_metadata(metadata: ImageMetadata) -> Self {
        Self {
            slots: vec![None; metadata.chunks],
            metadata: Some(metadata),
            received: 0,
        }
    }

    fn store(&mut self, index: usize, bytes: Vec<u8>) {
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        if self.slots[index].replace(bytes).is_none() {
            self.received += 1;
        }
    }

    fn missing(&self, total: usize) -> Vec<usize> {
        (0..total)
            .filter(|&index| self.slots.get(index).is_none_or(Option::is_none))
            .collect()
    }

    fn assemble(self, total: usize) -> Vec<u8> {
        self.slots.into_iter().take(total).flatten().flatten().collect()
    }
}

/// Collects the fragments of at most one image transfer at a time.
#[derive(Debug)]
pub struct FragmentReassembler {
    transfer: Option<ImageTransfer>,
    /// Upper bound on any declared fragment count, slots are never sized past it.
    max_chunks: usize,
}

impl FragmentReassembler {
    pub fn new(max_chunks: usize) -> Self {
        Self {
            transfer: None,
            max_chunks,
        }
    }

    fn check_total(&self, total: usize) -> Result<(), TransferError> {
        if total == 0 || total > self.max_chunks {
            return Err(TransferError::InvalidTotal {
                total,
                limit: self.max_chunks,
            });
        }

        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.transfer.is_some()
    }

    pub fn received(&self) -> usize {
        self.transfer.as_ref().map_or(0, |transfer| transfer.received)
    }

    /// Opens a new transfer and returns how many fragments of the abandoned one were dropped.
    pub fn on_metadata(&mut self, metadata: ImageMetadata) -> Result<usize, TransferError> {
        self.check_total(metadata.chunks)?;

        let abandoned = self
            .transfer
            .replace(ImageTransfer::with_metadata(metadata))
            .map_or(0, |transfer| transfer.received);

        Ok(abandoned)
    }

    /// Stores one fragment. Completeness is judged against the `total` carried by this fragment,
    /// not the metadata. `Err(TransferError::Incomplete)` means the transfer was discarded;
    /// every other error only drops the fragment.
    pub fn on_fragment(
        &mut self,
        index: usize,
        total: usize,
        payload: Option<&str>,
    ) -> Result<FragmentOutcome, TransferError> {
        self.check_total(total)?;
        if index >= total {
            return Err(TransferError::IndexOutOfRange { index, total });
        }

        let payload = payload
            .filter(|payload| !payload.is_empty())
            .ok_or(TransferError::EmptyFragment { index })?;
        let bytes = general_purpose::STANDARD
            .decode(payload)
            .map_err(|source| TransferError::FragmentDecode { index, source })?;

        let transfer = self.transfer.get_or_insert_with(ImageTransfer::default);
        transfer.store(index, bytes);

        let received = transfer.received;
        if received != total {
            return Ok(FragmentOutcome::Pending { received, total });
        }

        let mut transfer = self.transfer.take().unwrap_or_default();
        let missing = transfer.missing(total);
        if !missing.is_empty() {
            return Err(TransferError::Incomplete { missing });
        }

        let metadata = transfer.metadata.take();
        Ok(FragmentOutcome::Completed(CompletedImage {
            data: transfer.assemble(total),
            chunks: total,
            metadata,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 64;

    fn encode(bytes: &[u8]) -> String {
        general_purpose::STANDARD.encode(bytes)
    }

    fn metadata(chunks: usize) -> ImageMetadata {
        ImageMetadata {
            size: 0,
            width: 320,
            height: 240,
            chunks,
        }
    }

    fn completed(outcome: FragmentOutcome) -> CompletedImage {
        match outcome {
            FragmentOutcome::Completed(image) => image,
            other => panic!("expected a completed image, got {other:?}"),
        }
    }

    #[test]
    fn test_two_fragments_complete_once() {
        let mut reassembler = FragmentReassembler::new(LIMIT);
        reassembler.on_metadata(metadata(2)).unwrap();

        let first = reassembler
            .on_fragment(0, 2, Some(&encode(b"hello ")))
            .unwrap();
        assert!(matches!(first, FragmentOutcome::Pending { received: 1, total: 2 }));

        let image = completed(reassembler.on_fragment(1, 2, Some(&encode(b"world"))).unwrap());
        assert_eq!(image.data, b"hello world");
        assert_eq!(image.chunks, 2);
        assert_eq!(image.metadata, Some(metadata(2)));
        assert!(!reassembler.is_open());
    }

    #[test]
    fn test_fragments_join_in_index_order() {
        let mut reassembler = FragmentReassembler::new(LIMIT);
        reassembler.on_metadata(metadata(3)).unwrap();

        reassembler.on_fragment(2, 3, Some(&encode(b"C"))).unwrap();
        reassembler.on_fragment(0, 3, Some(&encode(b"A"))).unwrap();
        let image = completed(reassembler.on_fragment(1, 3, Some(&encode(b"B"))).unwrap());

        assert_eq!(image.data, b"ABC");
    }

    #[test]
    fn test_redelivery_overwrites_instead_of_counting() {
        let mut reassembler = FragmentReassembler::new(LIMIT);
        reassembler.on_metadata(metadata(2)).unwrap();

        reassembler.on_fragment(0, 2, Some(&encode(b"old"))).unwrap();
        let outcome = reassembler.on_fragment(0, 2, Some(&encode(b"new"))).unwrap();
        assert!(matches!(outcome, FragmentOutcome::Pending { received: 1, .. }));

        let image = completed(reassembler.on_fragment(1, 2, Some(&encode(b"!"))).unwrap());
        assert_eq!(image.data, b"new!");
    }

    #[test]
    fn test_gap_never_finalizes_and_new_metadata_discards() {
        let mut reassembler = FragmentReassembler::new(LIMIT);
        reassembler.on_metadata(metadata(3)).unwrap();

        reassembler.on_fragment(0, 3, Some(&encode(b"A"))).unwrap();
        reassembler.on_fragment(2, 3, Some(&encode(b"C"))).unwrap();
        assert!(reassembler.is_open());
        assert_eq!(reassembler.received(), 2);

        assert_eq!(reassembler.on_metadata(metadata(1)).unwrap(), 2);
        assert_eq!(reassembler.received(), 0);

        let image = completed(reassembler.on_fragment(0, 1, Some(&encode(b"Z"))).unwrap());
        assert_eq!(image.data, b"Z");
    }

    #[test]
    fn test_empty_and_undecodable_fragments_keep_transfer_open() {
        let mut reassembler = FragmentReassembler::new(LIMIT);
        reassembler.on_metadata(metadata(2)).unwrap();
        reassembler.on_fragment(0, 2, Some(&encode(b"A"))).unwrap();

        assert!(matches!(
            reassembler.on_fragment(1, 2, None),
            Err(TransferError::EmptyFragment { index: 1 })
        ));
        assert!(matches!(
            reassembler.on_fragment(1, 2, Some("")),
            Err(TransferError::EmptyFragment { index: 1 })
        ));
        assert!(matches!(
            reassembler.on_fragment(1, 2, Some("***not base64***")),
            Err(TransferError::FragmentDecode { index: 1, .. })
        ));
        assert!(reassembler.is_open());
        assert_eq!(reassembler.received(), 1);

        let image = completed(reassembler.on_fragment(1, 2, Some(&encode(b"B"))).unwrap());
        assert_eq!(image.data, b"AB");
    }

    #[test]
    fn test_fragment_total_overrides_metadata() {
        let mut reassembler = FragmentReassembler::new(LIMIT);
        reassembler.on_metadata(metadata(5)).unwrap();

        reassembler.on_fragment(0, 2, Some(&encode(b"A"))).unwrap();
        let image = completed(reassembler.on_fragment(1, 2, Some(&encode(b"B"))).unwrap());

        assert_eq!(image.data, b"AB");
        assert_eq!(image.chunks, 2);
    }

    #[test]
    fn test_shrunken_total_with_gap_aborts_transfer() {
        let mut reassembler = FragmentReassembler::new(LIMIT);
        reassembler.on_metadata(metadata(3)).unwrap();

        reassembler.on_fragment(0, 3, Some(&encode(b"A"))).unwrap();
        reassembler.on_fragment(2, 3, Some(&encode(b"C"))).unwrap();

        let result = reassembler.on_fragment(0, 2, Some(&encode(b"A")));
        match result {
            Err(TransferError::Incomplete { missing }) => assert_eq!(missing, vec![1]),
            other => panic!("expected an incomplete transfer, got {other:?}"),
        }
        assert!(!reassembler.is_open());
    }

    #[test]
    fn test_fragment_without_metadata_opens_transfer() {
        let mut reassembler = FragmentReassembler::new(LIMIT);

        reassembler.on_fragment(1, 2, Some(&encode(b"B"))).unwrap();
        let image = completed(reassembler.on_fragment(0, 2, Some(&encode(b"A"))).unwrap());

        assert_eq!(image.data, b"AB");
        assert!(image.metadata.is_none());
    }

    #[test]
    fn test_invalid_declarations_are_rejected() {
        let mut reassembler = FragmentReassembler::new(LIMIT);

        assert!(matches!(
            reassembler.on_metadata(metadata(0)),
            Err(TransferError::InvalidTotal { total: 0, limit: LIMIT })
        ));
        assert!(!reassembler.is_open());

        assert!(matches!(
            reassembler.on_fragment(0, 0, Some(&encode(b"A"))),
            Err(TransferError::InvalidTotal { total: 0, limit: LIMIT })
        ));
        assert!(matches!(
            reassembler.on_fragment(3, 2, Some(&encode(b"A"))),
            Err(TransferError::IndexOutOfRange { index: 3, total: 2 })
        ));
        assert!(!reassembler.is_open());
    }

    #[test]
    fn test_oversized_declarations_leave_state_untouched() {
        let mut reassembler = FragmentReassembler::new(LIMIT);
        reassembler.on_metadata(metadata(2)).unwrap();
        reassembler.on_fragment(0, 2, Some(&encode(b"A"))).unwrap();

        assert!(matches!(
            reassembler.on_metadata(metadata(usize::MAX)),
            Err(TransferError::InvalidTotal { total: usize::MAX, limit: LIMIT })
        ));
        assert!(matches!(
            reassembler.on_fragment(50_000_000, 50_000_001, Some(&encode(b"A"))),
            Err(TransferError::InvalidTotal { limit: LIMIT, .. })
        ));
        assert!(matches!(
            reassembler.on_fragment(LIMIT, LIMIT + 1, Some(&encode(b"A"))),
            Err(TransferError::InvalidTotal { .. })
        ));
        assert_eq!(reassembler.received(), 1);

        let image = completed(reassembler.on_fragment(1, 2, Some(&encode(b"B"))).unwrap());
        assert_eq!(image.data, b"AB");
    }

    #[test]
    fn test_total_at_limit_is_accepted() {
        let mut reassembler = FragmentReassembler::new(LIMIT);

        reassembler.on_metadata(metadata(LIMIT)).unwrap();
        let outcome = reassembler
            .on_fragment(LIMIT - 1, LIMIT, Some(&encode(b"Z")))
            .unwrap();
        assert!(matches!(outcome, FragmentOutcome::Pending { received: 1, total: LIMIT }));
    }
}
