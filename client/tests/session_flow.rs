mod common;

use common::{account_json, requests, signed, Harness, ScriptedBridge};
use dapp_wallet_lib::storage::keys::{ACCESS_TOKEN, ACCOUNT_TOKEN, EXTENSION_ADDRESS, WALLET_KIND};
use dapp_wallet_lib::{
    ExternalWalletEvent, SessionEvent, SignOutcome, StorageScope, StoreExt, WalletError,
    WalletKind, WalletResult,
};
use serde_json::{json, Value};
use tokio::sync::broadcast::error::TryRecvError;

fn connected_events(events: &mut tokio::sync::broadcast::Receiver<SessionEvent>) -> usize {
    let mut count = 0;
    loop {
        match events.try_recv() {
            Ok(SessionEvent::Connected { .. }) => count += 1,
            Ok(_) => {}
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return count,
            Err(TryRecvError::Lagged(_)) => {}
        }
    }
}

#[tokio::test]
async fn connect_then_disconnect_restores_storage_for_every_kind() -> WalletResult<()> {
    for kind in WalletKind::ALL {
        let harness = Harness::new();
        harness.bridge.on("ExtensionWallet.Obj.login", Ok(account_json("erd1ext")));
        harness.bridge.on("WebWallet.Obj.login", Ok(account_json("erd1web")));
        harness.bridge.on("HardwareWallet.Obj.prepLedger", Ok(json!(true)));
        harness
            .store
            .set_string(StorageScope::Durable, "theme", "dark")?;
        let before = harness.store.snapshot();

        let session = harness.session();
        session.connect(kind).await;
        session.disconnect().await;

        assert_eq!(harness.store.snapshot(), before, "leftovers after {}", kind);
        assert!(!session.is_connected());
        assert!(session.active_kind().is_none());
    }
    Ok(())
}

#[tokio::test]
async fn extension_connect_reuses_prior_address() -> WalletResult<()> {
    let harness = Harness::new();
    harness.bridge.on("ExtensionWallet.Obj.init", Ok(json!(true)));
    harness
        .bridge
        .on("ExtensionWallet.Obj.login", Ok(account_json("erd1abc")));
    harness
        .store
        .set_string(StorageScope::Durable, EXTENSION_ADDRESS, "erd1abc")?;

    let session = harness.session();
    let mut events = session.subscribe();
    session.connect(WalletKind::ExtensionInjected).await;

    assert_eq!(
        harness.bridge.calls_to("ExtensionWallet.Obj.init"),
        vec![vec![Value::String("erd1abc".into())]]
    );
    assert_eq!(harness.session_value(ACCESS_TOKEN).as_deref(), Some("tok123"));
    assert_eq!(session.address().as_deref(), Some("erd1abc"));
    assert_eq!(session.access_token().unwrap().expose(), "tok123");
    assert!(session.is_connected());
    assert_eq!(
        harness.session_value(WALLET_KIND).as_deref(),
        Some("extension")
    );
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Connected {
            address: "erd1abc".into()
        }
    );

    let exchanged = harness.backend.requests();
    assert_eq!(exchanged.len(), 1);
    let sent_auth = exchanged[0].auth_token.clone().unwrap();
    let login_args = harness.bridge.calls_to("ExtensionWallet.Obj.login");
    assert_eq!(login_args[0][0], Value::String(sent_auth));
    Ok(())
}

#[tokio::test]
async fn fresh_page_keeps_extension_pairing_but_drops_wallet_connect_leftovers(
) -> WalletResult<()> {
    let harness = Harness::new();
    harness
        .store
        .set_string(StorageScope::Durable, EXTENSION_ADDRESS, "erd1abc")?;
    harness
        .store
        .set_string(StorageScope::Durable, "wc@2:core:pairing", "{}")?;

    let session = harness.session();

    assert_eq!(
        harness.durable_value(EXTENSION_ADDRESS).as_deref(),
        Some("erd1abc")
    );
    assert!(harness.durable_value("wc@2:core:pairing").is_none());

    session.disconnect().await;
    assert!(harness.durable_value(EXTENSION_ADDRESS).is_none());
    Ok(())
}

#[tokio::test]
async fn extension_prior_address_falls_back_to_session_account() {
    let harness = Harness::new();
    harness.seed_connected(WalletKind::ExtensionInjected, "erd1seen");
    harness.bridge.on("ExtensionWallet.Obj.init", Ok(json!(true)));

    let session = harness.session();
    session.initialize().await;

    assert_eq!(
        harness.bridge.calls_to("ExtensionWallet.Obj.init"),
        vec![vec![Value::String("erd1seen".into())]]
    );
}

#[tokio::test]
async fn successful_extension_login_records_pairing_address() {
    let harness = Harness::new();
    harness
        .bridge
        .on("ExtensionWallet.Obj.login", Ok(account_json("erd1new")));

    let session = harness.session();
    session.connect(WalletKind::ExtensionInjected).await;

    assert_eq!(
        harness.durable_value(EXTENSION_ADDRESS).as_deref(),
        Some("erd1new")
    );
    assert!(harness.bridge.calls_to("ExtensionWallet.Obj.init")[0].is_empty());
}

#[tokio::test]
async fn validate_twice_connects_once() {
    let harness = Harness::new();
    harness
        .bridge
        .on("WebWallet.Obj.login", Ok(account_json("erd1web")));
    let session = harness.session();
    let mut events = session.subscribe();

    session.connect(WalletKind::InPageWeb).await;
    session
        .validate(Some(dapp_wallet_lib::AccountToken::new("erd1web", "beef")))
        .await;

    assert_eq!(connected_events(&mut events), 1);
    assert_eq!(harness.backend.requests().len(), 1);
}

#[tokio::test]
async fn transport_failure_on_connect_is_swallowed() {
    let harness = Harness::new();
    harness.bridge.on(
        "ExtensionWallet.Obj.init",
        Err(WalletError::TransportFailure("extension missing".into())),
    );
    let session = harness.session();
    let mut events = session.subscribe();

    session.connect(WalletKind::ExtensionInjected).await;

    assert!(!session.is_connected());
    assert!(harness.bridge.calls_to("ExtensionWallet.Obj.login").is_empty());
    assert!(harness.backend.requests().is_empty());
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn extension_reporting_not_ready_is_swallowed() {
    let harness = Harness::new();
    harness.bridge.on("ExtensionWallet.Obj.init", Ok(json!(false)));
    let session = harness.session();

    session.connect(WalletKind::ExtensionInjected).await;

    assert!(!session.is_connected());
    assert!(harness.bridge.calls_to("ExtensionWallet.Obj.login").is_empty());
}

#[tokio::test]
async fn verification_failure_raises_one_notice() {
    let harness = Harness::new().rejecting_backend();
    harness
        .bridge
        .on("WebWallet.Obj.login", Ok(account_json("erd1web")));
    let session = harness.session();
    let mut events = session.subscribe();

    session.connect(WalletKind::InPageWeb).await;

    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Notice("Access token could not be generated".into())
    );
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert!(!session.is_connected());
    assert!(harness.session_value(ACCOUNT_TOKEN).is_none());
}

#[tokio::test]
async fn structurally_invalid_account_is_not_exchanged() {
    let harness = Harness::new();
    harness.bridge.on(
        "WebWallet.Obj.login",
        Ok(json!({ "address": "erd1 web", "signature": "xyz" })),
    );
    let session = harness.session();

    session.connect(WalletKind::InPageWeb).await;

    assert!(harness.backend.requests().is_empty());
    assert!(!session.is_connected());
}

#[tokio::test]
async fn canceled_login_leaves_session_disconnected() {
    let harness = Harness::new();
    harness.bridge.on("WebWallet.Obj.login", Ok(json!("canceled")));
    let session = harness.session();

    session.connect(WalletKind::InPageWeb).await;

    assert!(!session.is_connected());
    assert!(harness.backend.requests().is_empty());
}

fn address_for_token(token: &str) -> String {
    format!("erd1{}", &token[..8])
}

#[tokio::test]
async fn superseded_connect_is_discarded() {
    let harness = Harness::with_bridge(ScriptedBridge::yielding());
    harness.bridge.respond_with("WebWallet.Obj.login", |args| {
        let token = args[0].as_str().unwrap_or_default();
        Ok(account_json(&address_for_token(token)))
    });
    let session = harness.session();

    tokio::join!(
        session.connect(WalletKind::InPageWeb),
        session.connect(WalletKind::InPageWeb)
    );

    let logins = harness.bridge.calls_to("WebWallet.Obj.login");
    assert_eq!(logins.len(), 2);
    assert_ne!(logins[0][0], logins[1][0]);

    // Only the attempt still installed when its login resolved is exchanged, and it is
    // exchanged with the account its own login produced.
    let exchanged = harness.backend.requests();
    assert_eq!(exchanged.len(), 1);
    let token = exchanged[0].auth_token.clone().unwrap();
    assert!(logins
        .iter()
        .any(|args| args[0] == Value::String(token.clone())));
    assert_eq!(exchanged[0].account_token.address, address_for_token(&token));
    assert_eq!(session.address(), Some(address_for_token(&token)));
}

#[tokio::test]
async fn same_process_sign_records_one_batch() -> WalletResult<()> {
    let harness = Harness::new();
    harness.seed_connected(WalletKind::InPageWeb, "erd1web");
    harness.bridge.on(
        "WebWallet.Obj.signTransaction",
        Ok(json!({ "nonce": 0, "signature": "aa" })),
    );
    let session = harness.session();

    let outcome = session
        .sign_transaction(&requests(1)[0], "  Swap  ")
        .await?;

    let receipt = match outcome {
        SignOutcome::Submitted(receipt) => receipt,
        other => panic!("expected submission, got {:?}", other),
    };
    assert_eq!(receipt.hashes.len(), 1);
    let batches = harness.ledger.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].title, "Swap");
    Ok(())
}

#[tokio::test]
async fn same_process_batch_hash_count_matches_requests() -> WalletResult<()> {
    let harness = Harness::new();
    harness.seed_connected(WalletKind::ExtensionInjected, "erd1ext");
    harness.bridge.on(
        "ExtensionWallet.Obj.signTransactions",
        Ok(serde_json::to_value(signed(4)).unwrap()),
    );
    let session = harness.session();

    let outcome = session.sign_transactions(&requests(4), "Batch").await?;

    assert!(matches!(outcome, SignOutcome::Submitted(ref r) if r.hashes.len() == 4));
    assert_eq!(harness.ledger.len(), 1);
    assert_eq!(harness.ledger.batches()[0].transactions.len(), 4);
    assert_eq!(harness.network.broadcasts(), vec![signed(4)]);
    Ok(())
}

#[tokio::test]
async fn malformed_sign_result_is_abandoned() -> WalletResult<()> {
    let harness = Harness::new();
    harness.seed_connected(WalletKind::InPageWeb, "erd1web");
    harness
        .bridge
        .on("WebWallet.Obj.signTransactions", Ok(json!("{truncated")));
    let session = harness.session();

    let outcome = session.sign_transactions(&requests(2), "Swap").await?;

    assert_eq!(outcome, SignOutcome::Abandoned);
    assert!(harness.network.broadcasts().is_empty());
    assert!(harness.ledger.is_empty());
    Ok(())
}

#[tokio::test]
async fn short_signed_batch_is_abandoned() -> WalletResult<()> {
    let harness = Harness::new();
    harness.seed_connected(WalletKind::InPageWeb, "erd1web");
    harness.bridge.on(
        "WebWallet.Obj.signTransactions",
        Ok(serde_json::to_value(signed(1)).unwrap()),
    );
    let session = harness.session();

    let outcome = session.sign_transactions(&requests(2), "Swap").await?;

    assert_eq!(outcome, SignOutcome::Abandoned);
    assert!(harness.ledger.is_empty());
    Ok(())
}

#[tokio::test]
async fn canceled_signing_notifies_wallet_and_submits_nothing() -> WalletResult<()> {
    let harness = Harness::new();
    harness.seed_connected(WalletKind::InPageWeb, "erd1web");
    harness
        .bridge
        .on("WebWallet.Obj.signTransaction", Ok(json!("canceled")));
    let session = harness.session();

    let outcome = session.sign_transaction(&requests(1)[0], "Swap").await?;

    assert_eq!(outcome, SignOutcome::Canceled);
    assert_eq!(
        harness
            .bridge
            .calls_to("WebWallet.Obj.transactionCanceled")
            .len(),
        1
    );
    assert!(harness.ledger.is_empty());
    Ok(())
}

#[tokio::test]
async fn broadcast_failure_is_returned() {
    let harness = Harness::new();
    harness.seed_connected(WalletKind::InPageWeb, "erd1web");
    harness.bridge.on(
        "WebWallet.Obj.signTransaction",
        Ok(json!({ "nonce": 0, "signature": "aa" })),
    );
    harness.network.go_offline();
    let session = harness.session();

    let result = session.sign_transaction(&requests(1)[0], "Swap").await;

    assert!(matches!(result, Err(WalletError::NetworkError(_))));
    assert!(harness.ledger.is_empty());
}

#[tokio::test]
async fn empty_batch_is_not_sent_to_the_wallet() -> WalletResult<()> {
    let harness = Harness::new();
    harness.seed_connected(WalletKind::InPageWeb, "erd1web");
    let session = harness.session();

    let outcome = session.sign_transactions(&[], "Nothing").await?;

    assert_eq!(outcome, SignOutcome::Abandoned);
    assert!(harness.bridge.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn logout_failure_still_disconnects() {
    let harness = Harness::new();
    harness.seed_connected(WalletKind::InPageWeb, "erd1web");
    harness.bridge.on(
        "WebWallet.Obj.logout",
        Err(WalletError::TransportFailure("gone".into())),
    );
    let session = harness.session();
    let mut events = session.subscribe();

    session.disconnect().await;

    assert!(!session.is_connected());
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Disconnected);
    assert!(harness.session_value(ACCESS_TOKEN).is_none());
}

#[tokio::test]
async fn external_events_connect_and_disconnect() -> WalletResult<()> {
    let harness = Harness::new();
    harness
        .store
        .set_string(StorageScope::Durable, "wc@2:client:session", "{}")?;
    let session = harness.session();
    assert!(harness.durable_value("wc@2:client:session").is_none());
    harness
        .store
        .set_string(StorageScope::Durable, "wc@2:client:session", "{}")?;
    let mut events = session.subscribe();

    session
        .handle_external_event(ExternalWalletEvent::Connected(
            account_json("erd1mobile").to_string(),
        ))
        .await;
    assert!(session.is_connected());
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Connected {
            address: "erd1mobile".into()
        }
    );

    session
        .handle_external_event(ExternalWalletEvent::Connected("not json".into()))
        .await;
    assert_eq!(harness.backend.requests().len(), 1);

    session
        .handle_external_event(ExternalWalletEvent::Disconnected)
        .await;
    assert!(!session.is_connected());
    assert!(harness.durable_value("wc@2:client:session").is_none());
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Disconnected);
    Ok(())
}

#[tokio::test]
async fn reload_restores_connection_and_channel() {
    let harness = Harness::new();
    harness
        .bridge
        .on("WebWallet.Obj.login", Ok(account_json("erd1web")));
    harness.session().connect(WalletKind::InPageWeb).await;

    let reloaded = harness.session();
    assert!(reloaded.is_connected());
    assert_eq!(reloaded.active_kind(), Some(WalletKind::InPageWeb));

    reloaded.initialize().await;
    assert_eq!(harness.bridge.calls_to("WebWallet.Obj.init").len(), 2);
    assert_eq!(harness.backend.requests().len(), 1);
}
