//! Session scenarios: identity transitions and their mandatory cart
//! reactions, restore, and forced logout.

use secrecy::SecretString;

use rose_shop_integration_tests::fakes::{FakeAccount, FakeGateway, identity};
use rose_shop_storefront::api::types::ProfileUpdate;
use rose_shop_storefront::cache::{CartCache, MemoryCartCache};
use rose_shop_storefront::credentials::{
    CredentialStore, MemoryCredentialStore, StoredCredential,
};
use rose_shop_storefront::error::ErrorKind;
use rose_shop_storefront::state::Storefront;

use rose_shop_core::FlowerId;

type TestShop = Storefront<FakeGateway, MemoryCartCache, MemoryCredentialStore>;

struct Harness {
    gateway: FakeGateway,
    cache: MemoryCartCache,
    credentials: MemoryCredentialStore,
    shop: TestShop,
}

fn harness() -> Harness {
    let gateway = FakeGateway::new();
    let cache = MemoryCartCache::new();
    let credentials = MemoryCredentialStore::new();
    let shop = Storefront::new(gateway.clone(), cache.clone(), credentials.clone());
    Harness {
        gateway,
        cache,
        credentials,
        shop,
    }
}

/// A non-empty snapshot as a previous session could have cached it.
fn stale_cart() -> rose_shop_storefront::api::types::CartState {
    use rose_shop_core::{CartItemId, Price};
    use rose_shop_storefront::api::types::{CartLine, CartState};

    let unit = Price::vnd(50_000);
    CartState::from_remote(
        vec![CartLine {
            id: CartItemId::new(1),
            flower_id: FlowerId::new(1),
            flower_name: "Red Rose".to_owned(),
            category_name: None,
            image_url: None,
            unit_price: unit,
            quantity: 2,
            line_total: unit.times(2),
        }],
        Price::vnd(0),
        Price::vnd(0),
    )
}

fn two_accounts(gateway: &FakeGateway) -> (FakeAccount, FakeAccount) {
    let lan = gateway.with_default_account();
    let minh = FakeAccount {
        username: "minh".to_owned(),
        password: "hunter2".to_owned(),
        token: "tok-minh".to_owned(),
        identity: identity(2, "minh", true),
    };
    gateway.add_account(minh.clone());
    (lan, minh)
}

#[tokio::test]
async fn login_replaces_cart_from_a_different_identity() {
    let h = harness();
    let (lan, minh) = two_accounts(&h.gateway);
    h.gateway.stock_flower(1, "Red Rose", 50_000);
    h.gateway.stock_flower(2, "White Lily", 80_000);
    h.gateway.seed_cart(&lan.token, 1, 2);
    h.gateway.seed_cart(&minh.token, 2, 5);

    h.shop.login(&lan.username, &lan.password).await.expect("login lan");
    assert_eq!(h.shop.cart_snapshot().total_quantity(), 2);

    h.shop.logout();
    h.shop
        .login(&minh.username, &minh.password)
        .await
        .expect("login minh");

    // Exactly minh's remote cart; nothing of lan's survives locally.
    let cart = h.shop.cart_snapshot();
    assert_eq!(cart.total_quantity(), 5);
    assert_eq!(cart.lines().len(), 1);
    assert_eq!(cart.lines()[0].flower_id, FlowerId::new(2));
    assert_eq!(h.cache.load(), Some(cart));
}

#[tokio::test]
async fn logout_clears_cart_and_cache_unconditionally() {
    let h = harness();
    let account = h.gateway.with_default_account();
    h.gateway.stock_flower(1, "Red Rose", 50_000);
    h.gateway.seed_cart(&account.token, 1, 3);

    h.shop
        .login(&account.username, &account.password)
        .await
        .expect("login");
    assert!(!h.shop.cart_snapshot().is_empty());
    assert!(h.credentials.load().is_some());

    h.shop.logout();

    assert!(h.shop.session().current().is_none());
    assert!(h.shop.cart_snapshot().is_empty());
    assert!(h.cache.load().is_none());
    assert!(h.credentials.load().is_none());
    assert!(h.gateway.installed_token().is_none());
}

#[tokio::test]
async fn login_failure_leaves_everything_untouched() {
    let h = harness();
    let account = h.gateway.with_default_account();

    let err = h
        .shop
        .login(&account.username, "wrong-password")
        .await
        .expect_err("wrong password must fail");
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert!(h.shop.session().current().is_none());
    assert!(h.credentials.load().is_none());
}

#[tokio::test]
async fn start_restores_session_and_cart_from_persisted_credential() {
    let h = harness();
    let account = h.gateway.with_default_account();
    h.gateway.stock_flower(1, "Red Rose", 50_000);
    h.gateway.seed_cart(&account.token, 1, 2);

    h.credentials.save(&StoredCredential {
        token: SecretString::from(account.token.clone()),
        identity: account.identity.clone(),
    });

    let restored = h.shop.start().await;
    assert_eq!(restored.map(|i| i.username), Some("lan".to_owned()));
    assert!(h.shop.session().is_authenticated());
    assert_eq!(h.shop.cart_snapshot().total_quantity(), 2);
}

#[tokio::test]
async fn start_with_invalid_credential_purges_credential_and_cached_cart() {
    let h = harness();
    h.gateway.with_default_account();
    h.gateway.stock_flower(1, "Red Rose", 50_000);

    // Stale state from an earlier run: a dead token plus a cached cart.
    h.credentials.save(&StoredCredential {
        token: SecretString::from("tok-expired"),
        identity: identity(9, "ghost", false),
    });
    h.cache.save(&stale_cart());

    let restored = h.shop.start().await;

    assert!(restored.is_none());
    assert!(!h.shop.session().is_authenticated());
    assert!(h.credentials.load().is_none());
    assert!(h.cache.load().is_none());
    assert!(h.shop.cart_snapshot().is_empty());
}

#[tokio::test]
async fn anonymous_start_keeps_the_cached_snapshot() {
    let h = harness();
    h.cache.save(&stale_cart());

    let restored = h.shop.start().await;

    // No credential to validate, so nothing forces a purge; the view
    // layer gets the immediate (possibly stale) snapshot.
    assert!(restored.is_none());
    assert_eq!(h.shop.cart_snapshot(), stale_cart());
    assert!(h.cache.load().is_some());
}

#[tokio::test]
async fn credential_invalidation_on_a_cart_call_forces_logout() {
    let h = harness();
    let account = h.gateway.with_default_account();
    h.gateway.stock_flower(1, "Red Rose", 50_000);
    h.gateway.seed_cart(&account.token, 1, 1);

    h.shop
        .login(&account.username, &account.password)
        .await
        .expect("login");
    assert!(h.shop.session().is_authenticated());

    // The token dies server-side; the next gateway call reports it.
    h.gateway.set_reject_credential(true);
    let err = h
        .shop
        .add_to_cart(FlowerId::new(1), 1)
        .await
        .expect_err("dead credential must surface");

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert!(!h.shop.session().is_authenticated());
    assert!(h.shop.cart_snapshot().is_empty());
    assert!(h.cache.load().is_none());
    assert!(h.credentials.load().is_none());
}

#[tokio::test]
async fn register_starts_a_fresh_session() {
    let h = harness();

    let identity = h
        .shop
        .register(&rose_shop_storefront::api::types::RegisterRequest {
            username: "cuc".to_owned(),
            email: rose_shop_core::Email::parse("cuc@example.com").expect("valid email"),
            password: "petals-4-life".to_owned(),
        })
        .await
        .expect("register");

    assert_eq!(identity.username, "cuc");
    assert!(h.shop.session().is_authenticated());
    assert!(h.credentials.load().is_some());
    assert!(h.shop.cart_snapshot().is_empty());
}

#[tokio::test]
async fn update_profile_replaces_identity_and_persisted_mirror() {
    let h = harness();
    let account = h.gateway.with_default_account();

    h.shop
        .login(&account.username, &account.password)
        .await
        .expect("login");

    h.shop
        .update_profile(&ProfileUpdate {
            full_name: Some("Lan Thi Nguyen".to_owned()),
            ..ProfileUpdate::default()
        })
        .await
        .expect("update profile");

    let current = h.shop.session().current().expect("still signed in");
    assert_eq!(
        current.profile.as_ref().and_then(|p| p.full_name.as_deref()),
        Some("Lan Thi Nguyen")
    );

    let mirrored = h.credentials.load().expect("credential persisted");
    assert_eq!(
        mirrored
            .identity
            .profile
            .as_ref()
            .and_then(|p| p.full_name.as_deref()),
        Some("Lan Thi Nguyen")
    );
}

#[tokio::test]
async fn identity_transitions_reach_subscribers() {
    let h = harness();
    let account = h.gateway.with_default_account();

    let mut transitions = h.shop.session().subscribe();
    assert!(transitions.borrow_and_update().is_none());

    h.shop
        .login(&account.username, &account.password)
        .await
        .expect("login");
    assert!(transitions.has_changed().expect("channel open"));
    assert_eq!(
        transitions
            .borrow_and_update()
            .as_ref()
            .map(|i| i.username.clone()),
        Some("lan".to_owned())
    );

    h.shop.logout();
    assert!(transitions.has_changed().expect("channel open"));
    assert!(transitions.borrow_and_update().is_none());
}
