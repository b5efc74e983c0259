#![cfg(test)]
use super::*;
use soroban_sdk::{
    contract as soroban_contract, contractimpl as soroban_contractimpl,
    testutils::{Address as _, Ledger},
    token::{Client as TokenClient, StellarAssetClient},
    Address, Env,
};

// ─── Mock distribution ledger ────────────────────────────────────────────────
// The guard only reads `is_complete` from the ledger.

#[soroban_contract]
pub struct MockLedger;

#[soroban_contractimpl]
impl MockLedger {
    pub fn set_complete(env: Env, complete: bool) {
        env.storage().instance().set(&0u32, &complete);
    }

    pub fn is_complete(env: Env) -> bool {
        env.storage().instance().get::<u32, bool>(&0u32).unwrap_or(false)
    }
}

// ─── Mock claims vault ───────────────────────────────────────────────────────
// Make-whole payments are credited on the payout vault; this mock records the
// cumulative credits per asset.

#[soroban_contract]
pub struct MockVault;

#[soroban_contractimpl]
impl MockVault {
    pub fn credit(env: Env, _creditor: Address, asset: Address, amount: i128) {
        let prev: i128 = env.storage().instance().get(&asset).unwrap_or(0);
        env.storage().instance().set(&asset, &(prev + amount));
    }

    pub fn credited(env: Env, asset: Address) -> i128 {
        env.storage().instance().get(&asset).unwrap_or(0)
    }
}

// ─── helpers ─────────────────────────────────────────────────────────────────

const TERM_END: u64 = 1_000_000;
const MAKE_WHOLE_TARGET: i128 = 50_000;
const CHANGE_DELAY: u64 = 7_200;

struct Setup<'a> {
    client: RecipientGuardContractClient<'a>,
    ledger: MockLedgerClient<'a>,
    vault: MockVaultClient<'a>,
    admin: Address,
    payout: Address, // the mock vault's contract address
    adapter: Address, // the initial recipient
    token_addr: Address,
}

fn setup(env: &Env) -> Setup<'_> {
    let admin = Address::generate(env);
    let adapter = Address::generate(env);
    let token_admin = Address::generate(env);
    let token_addr = env
        .register_stellar_asset_contract_v2(token_admin.clone())
        .address();

    let ledger_id = env.register_contract(None, MockLedger);
    let ledger = MockLedgerClient::new(env, &ledger_id);
    let payout = env.register_contract(None, MockVault);
    let vault = MockVaultClient::new(env, &payout);

    let contract_id = env.register_contract(None, RecipientGuardContract);
    let client = RecipientGuardContractClient::new(env, &contract_id);
    client.initialize(
        &admin,
        &ledger_id,
        &token_addr,
        &payout,
        &adapter,
        &TERM_END,
        &MAKE_WHOLE_TARGET,
        &CHANGE_DELAY,
    );

    Setup {
        client,
        ledger,
        vault,
        admin,
        payout,
        adapter,
        token_addr,
    }
}

fn mint(env: &Env, token_addr: &Address, to: &Address, amount: i128) {
    let sac = StellarAssetClient::new(env, token_addr);
    sac.mint(to, &amount);
}

// ─── initialize ──────────────────────────────────────────────────────────────

#[test]
fn test_initialize() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);

    assert_eq!(s.client.get_recipient(), s.adapter);
    assert_eq!(s.client.get_make_whole_paid(), 0);
    assert_eq!(s.client.make_whole_remaining(), MAKE_WHOLE_TARGET);
    assert!(!s.client.is_unlocked());
}

#[test]
#[should_panic(expected = "already initialized")]
fn test_initialize_twice() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let ledger = Address::generate(&env);
    s.client.initialize(
        &s.admin,
        &ledger,
        &s.token_addr,
        &s.payout,
        &s.adapter,
        &TERM_END,
        &MAKE_WHOLE_TARGET,
        &CHANGE_DELAY,
    );
}

// ─── make-whole payments ─────────────────────────────────────────────────────

#[test]
fn test_make_whole_accumulates_to_payout() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let payer = Address::generate(&env);
    mint(&env, &s.token_addr, &payer, 100_000);

    s.client.make_whole_payment(&payer, &20_000i128);
    s.client.make_whole_payment(&payer, &30_000i128);

    assert_eq!(s.client.get_make_whole_paid(), MAKE_WHOLE_TARGET);
    assert_eq!(s.client.make_whole_remaining(), 0);
    let tc = TokenClient::new(&env, &s.token_addr);
    assert_eq!(tc.balance(&s.payout), 50_000);
}

#[test]
fn test_make_whole_credited_at_vault() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let payer = Address::generate(&env);
    mint(&env, &s.token_addr, &payer, 100_000);

    // The tokens and the vault's deposit accounting move together, so the
    // make-whole amount is withdrawable by holders, not stranded.
    s.client.make_whole_payment(&payer, &20_000i128);
    assert_eq!(s.vault.credited(&s.token_addr), 20_000);

    s.client.make_whole_payment(&payer, &30_000i128);
    assert_eq!(s.vault.credited(&s.token_addr), 50_000);
    let tc = TokenClient::new(&env, &s.token_addr);
    assert_eq!(tc.balance(&s.payout), 50_000);
}

#[test]
#[should_panic(expected = "exceeds make-whole target")]
fn test_make_whole_cannot_overshoot() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let payer = Address::generate(&env);
    mint(&env, &s.token_addr, &payer, 100_000);

    s.client.make_whole_payment(&payer, &40_000i128);
    s.client.make_whole_payment(&payer, &10_001i128);
}

#[test]
#[should_panic(expected = "invalid make-whole amount")]
fn test_make_whole_zero_amount() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let payer = Address::generate(&env);
    s.client.make_whole_payment(&payer, &0i128);
}

// ─── unlock conditions ───────────────────────────────────────────────────────

#[test]
fn test_unlocked_by_cap() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);

    assert!(!s.client.is_unlocked());
    s.ledger.set_complete(&true);
    assert!(s.client.is_unlocked());
}

#[test]
fn test_unlocked_by_term_end_and_make_whole() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let payer = Address::generate(&env);
    mint(&env, &s.token_addr, &payer, 100_000);

    // Term over but make-whole unpaid: still locked.
    env.ledger().with_mut(|li| {
        li.timestamp = TERM_END;
    });
    assert!(!s.client.is_unlocked());

    // Make-whole paid but term rolled back: still locked.
    env.ledger().with_mut(|li| {
        li.timestamp = 0;
    });
    s.client.make_whole_payment(&payer, &MAKE_WHOLE_TARGET);
    assert!(!s.client.is_unlocked());

    // Both: unlocked.
    env.ledger().with_mut(|li| {
        li.timestamp = TERM_END;
    });
    assert!(s.client.is_unlocked());
}

// ─── recipient change ────────────────────────────────────────────────────────

#[test]
#[should_panic(expected = "deal not unlocked")]
fn test_propose_while_locked() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let target = Address::generate(&env);
    s.client.propose_recipient(&s.admin, &target);
}

#[test]
fn test_propose_and_execute_after_cap() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let target = Address::generate(&env);

    s.ledger.set_complete(&true);
    s.client.propose_recipient(&s.admin, &target);
    let pending = s.client.get_pending_change().unwrap();
    assert_eq!(pending.target, target);
    assert_eq!(pending.executable_at, CHANGE_DELAY);

    env.ledger().with_mut(|li| {
        li.timestamp = CHANGE_DELAY;
    });
    s.client.execute_change(&s.admin);
    assert_eq!(s.client.get_recipient(), target);
    assert!(s.client.get_pending_change().is_none());
}

#[test]
#[should_panic(expected = "change delay not elapsed")]
fn test_execute_before_delay() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let target = Address::generate(&env);

    s.ledger.set_complete(&true);
    s.client.propose_recipient(&s.admin, &target);
    s.client.execute_change(&s.admin);
}

#[test]
#[should_panic(expected = "deal not unlocked")]
fn test_execute_rechecks_unlock() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let target = Address::generate(&env);

    s.ledger.set_complete(&true);
    s.client.propose_recipient(&s.admin, &target);
    env.ledger().with_mut(|li| {
        li.timestamp = CHANGE_DELAY;
    });

    // Condition gone by execution time: the delay alone is not enough.
    s.ledger.set_complete(&false);
    s.client.execute_change(&s.admin);
}

#[test]
#[should_panic(expected = "no pending change")]
fn test_execute_without_proposal() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    s.ledger.set_complete(&true);
    s.client.execute_change(&s.admin);
}

#[test]
#[should_panic(expected = "unauthorized")]
fn test_propose_by_stranger() {
    let env = Env::default();
    env.mock_all_auths();
    let s = setup(&env);
    let stranger = Address::generate(&env);
    let target = Address::generate(&env);
    s.ledger.set_complete(&true);
    s.client.propose_recipient(&stranger, &target);
}
