mod common;

use common::{requests, signed, Harness};
use dapp_wallet_lib::{
    cancel_pair, ClientConfig, DappContext, HostAdapters, SignOutcome, TrackOutcome,
    TransactionStatus, WalletKind, WalletResult,
};
use serde_json::json;

fn context(harness: &Harness) -> WalletResult<DappContext> {
    let mut config = ClientConfig::new("test");
    config.network.tx_check_interval_ms = 1;
    config.network.tx_check_max_polls = 3;
    DappContext::with_services(
        config,
        HostAdapters {
            store: harness.store.clone(),
            bridge: harness.bridge.clone(),
            navigator: harness.navigator.clone(),
        },
        harness.backend.clone(),
        harness.network.clone(),
    )
}

#[tokio::test]
async fn signed_batch_is_tracked_to_completion() -> WalletResult<()> {
    let harness = Harness::new();
    harness.seed_connected(WalletKind::InPageWeb, "erd1web");
    harness.bridge.on(
        "WebWallet.Obj.signTransactions",
        Ok(serde_json::to_value(signed(2)).unwrap()),
    );
    let context = context(&harness)?;

    let outcome = context
        .session()
        .sign_transactions(&requests(2), "Swap")
        .await?;
    let receipt = match outcome {
        SignOutcome::Submitted(receipt) => receipt,
        other => panic!("expected submission, got {:?}", other),
    };
    harness.network.settle(&receipt.hashes[0], TransactionStatus::Success);

    let (_handle, signal) = cancel_pair();
    let tracked = context.track_batch(receipt.batch_id, signal).await?;

    assert_eq!(tracked, TrackOutcome::Completed);
    let batch = context.ledger().batch(receipt.batch_id).unwrap();
    assert_eq!(batch.transactions[0].status, TransactionStatus::Success);
    // The second hash never settles within the allowed checks.
    assert_eq!(batch.transactions[1].status, TransactionStatus::Fail);
    assert!(batch.executed);
    Ok(())
}

#[tokio::test]
async fn canceled_tracking_leaves_batch_unexecuted() -> WalletResult<()> {
    let harness = Harness::new();
    harness.seed_connected(WalletKind::ExtensionInjected, "erd1ext");
    harness.bridge.on(
        "ExtensionWallet.Obj.signTransaction",
        Ok(json!({ "nonce": 0, "signature": "aa" })),
    );
    let context = context(&harness)?;

    let outcome = context
        .session()
        .sign_transaction(&requests(1)[0], "Stake")
        .await?;
    let SignOutcome::Submitted(receipt) = outcome else {
        panic!("expected submission");
    };

    let (handle, signal) = cancel_pair();
    handle.cancel();
    let tracked = context.track_batch(receipt.batch_id, signal).await?;

    assert_eq!(tracked, TrackOutcome::Canceled);
    let batch = context.ledger().batch(receipt.batch_id).unwrap();
    assert_eq!(batch.transactions[0].status, TransactionStatus::Pending);
    assert!(!batch.executed);
    Ok(())
}
