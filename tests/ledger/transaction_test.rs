// Transaction Tests
// Tests for transaction construction and canonical digests

use microledger::identity::PeerId;
use microledger::ledger::{Transaction, TransactionBuilder, TransactionError, TransactionKind};

fn peer(byte: u8) -> PeerId {
    PeerId::from_bytes([byte; 32])
}

// ============================================================================
// BUILDER
// ============================================================================

#[test]
fn test_builder_defaults_to_transfer() {
    let tx = TransactionBuilder::new()
        .recipient(peer(1))
        .sender(peer(2))
        .amount(50)
        .build()
        .unwrap();

    assert_eq!(tx.kind(), TransactionKind::Transfer);
    assert_eq!(tx.amount(), 50);
    assert_eq!(tx.recipient(), &peer(1));
    assert_eq!(tx.sender(), Some(&peer(2)));
}

#[test]
fn test_builder_requires_recipient() {
    let result = TransactionBuilder::new().amount(5).build();
    assert_eq!(result, Err(TransactionError::MissingRecipient));
}

#[test]
fn test_builder_requires_amount() {
    let result = TransactionBuilder::new().recipient(peer(1)).build();
    assert_eq!(result, Err(TransactionError::MissingAmount));
}

#[test]
fn test_builder_rejects_negative_amount() {
    let result = TransactionBuilder::new().recipient(peer(1)).amount(-1).build();
    assert_eq!(result, Err(TransactionError::InvalidAmount(-1)));
}

#[test]
fn test_builder_allows_zero() {
    let tx = TransactionBuilder::new().recipient(peer(1)).amount(0).build().unwrap();
    assert_eq!(tx.amount(), 0);
}

#[test]
fn test_builder_random_nonce_separates_identical_transfers() {
    let build = || {
        TransactionBuilder::new()
            .recipient(peer(1))
            .sender(peer(2))
            .amount(10)
            .build()
            .unwrap()
    };
    assert_ne!(build().digest(), build().digest());
}

// ============================================================================
// DIGEST
// ============================================================================

#[test]
fn test_digest_is_deterministic() {
    let tx = Transaction::new(10, peer(1), Some(peer(2)), TransactionKind::Transfer, 7);
    let same = Transaction::new(10, peer(1), Some(peer(2)), TransactionKind::Transfer, 7);

    assert_eq!(tx.digest(), same.digest());
    assert_eq!(tx.digest().len(), 64);
    assert!(tx.digest().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn test_digest_covers_every_field() {
    let base = Transaction::new(10, peer(1), Some(peer(2)), TransactionKind::Transfer, 7);
    let variants = [
        Transaction::new(11, peer(1), Some(peer(2)), TransactionKind::Transfer, 7),
        Transaction::new(10, peer(3), Some(peer(2)), TransactionKind::Transfer, 7),
        Transaction::new(10, peer(1), Some(peer(3)), TransactionKind::Transfer, 7),
        Transaction::new(10, peer(1), None, TransactionKind::Transfer, 7),
        Transaction::new(10, peer(1), Some(peer(2)), TransactionKind::Mint, 7),
        Transaction::new(10, peer(1), Some(peer(2)), TransactionKind::Transfer, 8),
    ];

    for variant in variants {
        assert_ne!(base.digest(), variant.digest());
    }
}

#[test]
fn test_canonical_bytes_layout() {
    let tx = Transaction::new(10, peer(1), None, TransactionKind::Mint, 0);
    let bytes = tx.canonical_bytes();

    assert_eq!(&bytes[..3], b"tx:");
    assert_eq!(bytes[3], 1);
    assert_eq!(&bytes[4..12], &10i64.to_le_bytes());
    assert_eq!(&bytes[12..44], peer(1).as_bytes());
    assert_eq!(bytes[44], 0);
    assert_eq!(bytes.len(), 3 + 1 + 8 + 32 + 1 + 8);
}

#[test]
fn test_challenge_is_digest() {
    let tx = Transaction::new(10, peer(1), None, TransactionKind::Transfer, 0);
    assert_eq!(tx.challenge(), tx.digest());
}
