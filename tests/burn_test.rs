mod common;

use pretty_assertions::assert_eq;
use solana_sdk::pubkey::Pubkey;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;

use common::{FakeChain, FakeWallet};
use wallet_health::error::{HubError, WalletErrorKind};
use wallet_health::orchestrator::burn_live;
use wallet_health::types::{BatchItemState, SpamToken};

fn spam(n: usize) -> Vec<SpamToken> {
    (0..n)
        .map(|_| SpamToken::new(Pubkey::new_unique().to_string(), Pubkey::new_unique().to_string()))
        .collect()
}

#[tokio::test]
async fn test_live_burn_chunks_walk_every_state() {
    let chain = FakeChain {
        fail_on_send: Some(1),
        ..Default::default()
    };
    let wallet = FakeWallet::new();
    let selected = spam(12);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let outcome = burn_live(&chain, &wallet, &selected, Some(tx)).await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push((event.index, event.state));
    }
    assert_eq!(
        events,
        vec![
            (0, BatchItemState::Pending),
            (1, BatchItemState::Pending),
            (2, BatchItemState::Pending),
            (0, BatchItemState::Signing),
            (0, BatchItemState::Submitting),
            (0, BatchItemState::Confirmed),
            (1, BatchItemState::Signing),
            (1, BatchItemState::Submitting),
            (1, BatchItemState::Failed),
        ]
    );

    // One wallet prompt covers every chunk; the third chunk is never sent.
    assert_eq!(wallet.prompts.load(Ordering::SeqCst), 1);
    assert_eq!(chain.sent.load(Ordering::SeqCst), 2);
    assert_eq!(outcome.burned, selected[..5].to_vec());
    assert_eq!(outcome.report.summary(), "1 of 3");
}

#[tokio::test]
async fn test_rejected_signature_fails_first_chunk() {
    let chain = FakeChain::default();
    let wallet = FakeWallet {
        rejects: true,
        ..FakeWallet::new()
    };
    let selected = spam(7);

    let outcome = burn_live(&chain, &wallet, &selected, None).await.unwrap();

    assert!(outcome.burned.is_empty());
    assert_eq!(outcome.recovered_lamports, 0);
    let failure = outcome.report.failure.unwrap();
    assert_eq!(failure.index, 0);
    assert!(matches!(failure.error, HubError::Wallet { kind: WalletErrorKind::Rejected, .. }));
    assert_eq!(chain.sent.load(Ordering::SeqCst), 0);
}
