//! Cart synchronization scenarios: refresh fallback, mutation
//! serialization, and the purge-wins rule.

use rose_shop_integration_tests::fakes::FakeGateway;
use rose_shop_storefront::cache::{CartCache, MemoryCartCache};
use rose_shop_storefront::credentials::MemoryCredentialStore;
use rose_shop_storefront::error::ErrorKind;
use rose_shop_storefront::state::Storefront;

use rose_shop_core::FlowerId;

type TestShop = Storefront<FakeGateway, MemoryCartCache, MemoryCredentialStore>;

struct Harness {
    gateway: FakeGateway,
    cache: MemoryCartCache,
    shop: TestShop,
}

fn harness() -> Harness {
    let gateway = FakeGateway::new();
    let cache = MemoryCartCache::new();
    let shop = Storefront::new(
        gateway.clone(),
        cache.clone(),
        MemoryCredentialStore::new(),
    );
    Harness {
        gateway,
        cache,
        shop,
    }
}

/// Assert the invariant that can never break: the summary quantity always
/// equals the sum of line quantities.
fn assert_summary_consistent(shop: &TestShop) {
    let cart = shop.cart_snapshot();
    let sum: u32 = cart.lines().iter().map(|l| l.quantity).sum();
    assert_eq!(cart.summary().total_quantity, sum);
}

#[tokio::test]
async fn summary_quantity_tracks_lines_across_interleaved_operations() {
    let h = harness();
    let account = h.gateway.with_default_account();
    h.gateway.stock_flower(1, "Red Rose", 50_000);
    h.gateway.stock_flower(2, "White Lily", 80_000);

    h.shop
        .login(&account.username, &account.password)
        .await
        .expect("login");
    assert_summary_consistent(&h.shop);

    h.shop
        .add_to_cart(FlowerId::new(1), 2)
        .await
        .expect("add rose");
    assert_summary_consistent(&h.shop);

    h.shop
        .add_to_cart(FlowerId::new(2), 1)
        .await
        .expect("add lily");
    assert_summary_consistent(&h.shop);

    h.shop.cart().refresh().await;
    assert_summary_consistent(&h.shop);
    assert_eq!(h.shop.cart_snapshot().total_quantity(), 3);

    let rose_line = h.shop.cart_snapshot().lines()[0].id;
    h.shop
        .update_cart_line(rose_line, 5)
        .await
        .expect("update rose");
    assert_summary_consistent(&h.shop);
    assert_eq!(h.shop.cart_snapshot().total_quantity(), 6);

    h.shop
        .remove_cart_line(rose_line)
        .await
        .expect("remove rose");
    assert_summary_consistent(&h.shop);
    assert_eq!(h.shop.cart_snapshot().total_quantity(), 1);
}

#[tokio::test]
async fn quantity_update_recomputes_line_total() {
    let h = harness();
    let account = h.gateway.with_default_account();
    h.gateway.stock_flower(1, "Red Rose", 50_000);
    h.gateway.seed_cart(&account.token, 1, 2);

    h.shop
        .login(&account.username, &account.password)
        .await
        .expect("login");

    let cart = h.shop.cart_snapshot();
    let line = &cart.lines()[0];
    assert_eq!(line.line_total.amount, 100_000.into());

    h.shop
        .update_cart_line(line.id, 3)
        .await
        .expect("update quantity");

    let cart = h.shop.cart_snapshot();
    let line = &cart.lines()[0];
    assert_eq!(line.quantity, 3);
    assert_eq!(line.line_total.amount, 150_000.into());
    assert_eq!(cart.summary().total_quantity, 3);
}

#[tokio::test]
async fn invalid_quantities_are_rejected_without_touching_state() {
    let h = harness();
    let account = h.gateway.with_default_account();
    h.gateway.stock_flower(1, "Red Rose", 50_000);
    h.gateway.seed_cart(&account.token, 1, 2);

    h.shop
        .login(&account.username, &account.password)
        .await
        .expect("login");
    let before = h.shop.cart_snapshot();
    let line = before.lines()[0].id;

    for quantity in [0, -1] {
        let err = h
            .shop
            .update_cart_line(line, quantity)
            .await
            .expect_err("quantity below 1 must be rejected");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    assert_eq!(h.shop.cart_snapshot(), before);
}

#[tokio::test]
async fn refresh_falls_back_to_cached_cart_when_network_is_unreachable() {
    let h = harness();
    let account = h.gateway.with_default_account();
    h.gateway.stock_flower(1, "Red Rose", 50_000);
    h.gateway.stock_flower(2, "White Lily", 80_000);
    h.gateway.seed_cart(&account.token, 1, 1);
    h.gateway.seed_cart(&account.token, 2, 1);

    h.shop
        .login(&account.username, &account.password)
        .await
        .expect("login");
    let synced = h.shop.cart_snapshot();
    assert_eq!(synced.lines().len(), 2);

    // Network goes away; a refresh must not visibly empty the cart.
    h.gateway.set_fail_fetch(true);
    h.shop.cart().refresh().await;

    assert_eq!(h.shop.cart_snapshot(), synced);
}

#[tokio::test]
async fn refresh_without_cache_or_network_yields_empty_cart() {
    let h = harness();
    let account = h.gateway.with_default_account();

    h.shop
        .login(&account.username, &account.password)
        .await
        .expect("login");
    h.cache.clear();
    h.gateway.set_fail_fetch(true);

    h.shop.cart().refresh().await;
    assert!(h.shop.cart_snapshot().is_empty());
}

#[tokio::test]
async fn overlapping_mutations_are_rejected_as_retryable() {
    let h = harness();
    let account = h.gateway.with_default_account();
    h.gateway.stock_flower(1, "Red Rose", 50_000);
    h.gateway.stock_flower(2, "White Lily", 80_000);

    h.shop
        .login(&account.username, &account.password)
        .await
        .expect("login");

    let gate = h.gateway.hold_mutation();

    let slow_add = h.shop.add_to_cart(FlowerId::new(1), 1);
    let overlap = async {
        let err = h
            .shop
            .add_to_cart(FlowerId::new(2), 1)
            .await
            .expect_err("overlapping mutation must be rejected");
        assert_eq!(err.kind(), ErrorKind::ConcurrentModification);
        assert!(err.is_retryable());
        gate.notify_one();
    };

    let (slow_result, ()) = tokio::join!(slow_add, overlap);
    slow_result.expect("first mutation completes");

    // Only the first mutation reached the cart; a retry now succeeds.
    assert_eq!(h.shop.cart_snapshot().total_quantity(), 1);
    h.shop
        .add_to_cart(FlowerId::new(2), 1)
        .await
        .expect("retry after completion");
    assert_eq!(h.shop.cart_snapshot().total_quantity(), 2);
}

#[tokio::test]
async fn logout_wins_over_an_in_flight_refresh() {
    let h = harness();
    let account = h.gateway.with_default_account();
    h.gateway.stock_flower(1, "Red Rose", 50_000);
    h.gateway.seed_cart(&account.token, 1, 2);

    h.shop
        .login(&account.username, &account.password)
        .await
        .expect("login");
    assert!(!h.shop.cart_snapshot().is_empty());

    let gate = h.gateway.hold_fetch();

    let stalled_refresh = h.shop.cart().refresh();
    let logout = async {
        h.shop.logout();
        gate.notify_one();
    };
    tokio::join!(stalled_refresh, logout);

    // The late refresh result must not resurrect the purged cart.
    assert!(h.shop.cart_snapshot().is_empty());
    assert!(h.cache.load().is_none());
}

#[tokio::test]
async fn mutation_failure_surfaces_and_leaves_state_unchanged() {
    let h = harness();
    let account = h.gateway.with_default_account();
    h.gateway.stock_flower(1, "Red Rose", 50_000);
    h.gateway.seed_cart(&account.token, 1, 2);

    h.shop
        .login(&account.username, &account.password)
        .await
        .expect("login");
    let before = h.shop.cart_snapshot();

    h.gateway.set_fail_mutations(true);
    let err = h
        .shop
        .add_to_cart(FlowerId::new(1), 1)
        .await
        .expect_err("mutation failure must surface");
    assert_eq!(err.kind(), ErrorKind::Transport);

    assert_eq!(h.shop.cart_snapshot(), before);
}
