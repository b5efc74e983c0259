//! Tributary - Ingress Adapter (Soroban)
//! Normalizes heterogeneous payment sources into `apply` calls on the
//! distribution ledger. Fails safe to the beneficiary when the ledger is
//! paused or the deal is complete or past its term, so funds are never
//! stranded here.

#![no_std]
use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, token, Address, Env, IntoVal, Symbol, Vec,
};

// ============================================================
// Data Types
// ============================================================

#[contracttype]
#[derive(Clone)]
pub struct RouteConfig {
    pub distribution_ledger: Address,
    pub beneficiary: Address,
    pub change_delay: u64,
}

#[contracttype]
#[derive(Clone)]
pub struct RecipientChangeProposal {
    pub target: Address,
    pub executable_at: u64,
}

/// Mirrors the distribution ledger's `apply` return value.
#[contracttype]
#[derive(Clone)]
pub struct SplitResult {
    pub to_providers: i128,
    pub to_beneficiary: i128,
}

// ============================================================
// Storage Keys
// ============================================================

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Admin,
    PendingAdmin,
    Config,
    PendingChange,
    Source(Address), // per-asset payment-source strategy contract
}

// ============================================================
// Contract
// ============================================================

const INSTANCE_LIFETIME_THRESHOLD: u32 = 17_280;
const INSTANCE_BUMP_AMOUNT: u32 = 86_400;
const PERSISTENT_LIFETIME_THRESHOLD: u32 = 120_960;
const PERSISTENT_BUMP_AMOUNT: u32 = 1_051_200;

#[contract]
pub struct IngressAdapterContract;

#[contractimpl]
impl IngressAdapterContract {
    pub fn initialize(
        env: Env,
        admin: Address,
        distribution_ledger: Address,
        beneficiary: Address,
        change_delay: u64,
    ) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        if env.storage().instance().has(&DataKey::Admin) {
            panic!("already initialized");
        }
        admin.require_auth();
        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(
            &DataKey::Config,
            &RouteConfig {
                distribution_ledger,
                beneficiary,
                change_delay,
            },
        );
    }

    /// Sweep the adapter's balance of `asset`. Permissionless: external
    /// schedulers decide when to sweep; funds can only move along the
    /// configured routes. Ledger rejections propagate to the caller, which
    /// decides whether and when to resubmit.
    pub fn forward(env: Env, asset: Address) -> i128 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        let cfg: RouteConfig = env
            .storage()
            .instance()
            .get(&DataKey::Config)
            .expect("not initialized");

        let token_client = token::Client::new(&env, &asset);
        let balance = token_client.balance(&env.current_contract_address());
        if balance <= 0 {
            panic!("nothing to forward");
        }

        if Self::_ledger_inactive(&env, &cfg) {
            Self::_bypass(&env, &cfg, &asset, balance);
            return balance;
        }

        Self::_route(&env, &cfg, &asset, balance);
        balance
    }

    /// Sweep a list of assets, continuing past per-asset rejections instead of
    /// aborting the batch. Returns the total amount moved.
    pub fn forward_batch(env: Env, assets: Vec<Address>) -> i128 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        let cfg: RouteConfig = env
            .storage()
            .instance()
            .get(&DataKey::Config)
            .expect("not initialized");

        let inactive = Self::_ledger_inactive(&env, &cfg);
        let mut moved: i128 = 0;
        for asset in assets.iter() {
            let token_client = token::Client::new(&env, &asset);
            let balance = token_client.balance(&env.current_contract_address());
            if balance <= 0 {
                continue;
            }
            if inactive {
                Self::_bypass(&env, &cfg, &asset, balance);
                moved += balance;
                continue;
            }
            // Would-reject payments are skipped, not fatal; the skip event is
            // the durable record of the tripped rail for this batch.
            let ok: bool = env.invoke_contract(
                &cfg.distribution_ledger,
                &Symbol::new(&env, "can_apply"),
                Vec::from_array(
                    &env,
                    [asset.clone().into_val(&env), balance.into_val(&env)],
                ),
            );
            if !ok {
                env.events().publish(
                    (symbol_short!("ingress"), symbol_short!("skipped")),
                    (asset.clone(), balance),
                );
                continue;
            }
            Self::_route(&env, &cfg, &asset, balance);
            moved += balance;
        }
        moved
    }

    // ============================================================
    // Payment-Source Strategies
    // ============================================================

    /// Bind a payment-source strategy contract for an asset. The strategy
    /// exposes `pull_available() -> i128` and `pull() -> i128`; `pull` moves
    /// whatever it yields to this adapter.
    pub fn set_source(env: Env, admin: Address, asset: Address, source: Address) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        tributary_common_admin::require_admin(&env, &DataKey::Admin, &admin);
        let _ttl_key = DataKey::Source(asset);
        env.storage().persistent().set(&_ttl_key, &source);
        env.storage().persistent().extend_ttl(
            &_ttl_key,
            PERSISTENT_LIFETIME_THRESHOLD,
            PERSISTENT_BUMP_AMOUNT,
        );
    }

    pub fn pull_from_source(env: Env, asset: Address) -> i128 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        let source: Address = env
            .storage()
            .persistent()
            .get(&DataKey::Source(asset.clone()))
            .expect("no source configured");
        let pulled: i128 = env.invoke_contract(
            &source,
            &Symbol::new(&env, "pull"),
            Vec::new(&env),
        );
        env.events().publish(
            (symbol_short!("ingress"), symbol_short!("pulled")),
            (asset, pulled),
        );
        pulled
    }

    pub fn pull_available(env: Env, asset: Address) -> i128 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        let source: Address = env
            .storage()
            .persistent()
            .get(&DataKey::Source(asset))
            .expect("no source configured");
        env.invoke_contract(
            &source,
            &Symbol::new(&env, "pull_available"),
            Vec::new(&env),
        )
    }

    // ============================================================
    // Recipient Change (two-phase, delayed)
    // ============================================================

    /// Phase one: propose. The change only becomes executable after the
    /// configured delay, giving observers a guaranteed reaction window.
    pub fn propose_recipient(env: Env, admin: Address, target: Address) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        tributary_common_admin::require_admin(&env, &DataKey::Admin, &admin);
        let cfg: RouteConfig = env
            .storage()
            .instance()
            .get(&DataKey::Config)
            .expect("not initialized");

        let executable_at = env.ledger().timestamp() + cfg.change_delay;
        env.storage().instance().set(
            &DataKey::PendingChange,
            &RecipientChangeProposal {
                target: target.clone(),
                executable_at,
            },
        );
        env.events().publish(
            (symbol_short!("recip"), symbol_short!("proposed")),
            (target, executable_at),
        );
    }

    /// Phase two: execute after the delay has elapsed.
    pub fn execute_recipient_change(env: Env, admin: Address) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        tributary_common_admin::require_admin(&env, &DataKey::Admin, &admin);
        let proposal: RecipientChangeProposal = env
            .storage()
            .instance()
            .get(&DataKey::PendingChange)
            .expect("no pending change");
        if env.ledger().timestamp() < proposal.executable_at {
            panic!("change delay not elapsed");
        }

        let mut cfg: RouteConfig = env
            .storage()
            .instance()
            .get(&DataKey::Config)
            .expect("not initialized");
        cfg.beneficiary = proposal.target.clone();
        env.storage().instance().set(&DataKey::Config, &cfg);
        env.storage().instance().remove(&DataKey::PendingChange);

        env.events().publish(
            (symbol_short!("recip"), symbol_short!("changed")),
            proposal.target,
        );
    }

    // ============================================================
    // Read-Only Functions
    // ============================================================

    pub fn get_beneficiary(env: Env) -> Address {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        let cfg: RouteConfig = env
            .storage()
            .instance()
            .get(&DataKey::Config)
            .expect("not initialized");
        cfg.beneficiary
    }

    pub fn get_pending_change(env: Env) -> Option<RecipientChangeProposal> {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage().instance().get(&DataKey::PendingChange)
    }

    pub fn get_source(env: Env, asset: Address) -> Option<Address> {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage().persistent().get(&DataKey::Source(asset))
    }

    pub fn propose_admin(env: Env, current_admin: Address, new_admin: Address) {
        tributary_common_admin::propose_admin(
            &env,
            &DataKey::Admin,
            &DataKey::PendingAdmin,
            current_admin,
            new_admin,
        );
    }

    pub fn accept_admin(env: Env, new_admin: Address) {
        tributary_common_admin::accept_admin(
            &env,
            &DataKey::Admin,
            &DataKey::PendingAdmin,
            new_admin,
        );
    }

    // ============================================================
    // Internal Helpers
    // ============================================================

    /// Paused, complete or past the deal's end: the fail-safe path routes
    /// everything to the beneficiary instead of the ledger, so funds are
    /// never stranded here whatever state the ledger is in.
    fn _ledger_inactive(env: &Env, cfg: &RouteConfig) -> bool {
        let paused: bool = env.invoke_contract(
            &cfg.distribution_ledger,
            &Symbol::new(env, "is_paused"),
            Vec::new(env),
        );
        if paused {
            return true;
        }
        let complete: bool = env.invoke_contract(
            &cfg.distribution_ledger,
            &Symbol::new(env, "is_complete"),
            Vec::new(env),
        );
        if complete {
            return true;
        }
        env.invoke_contract(
            &cfg.distribution_ledger,
            &Symbol::new(env, "is_ended"),
            Vec::new(env),
        )
    }

    fn _bypass(env: &Env, cfg: &RouteConfig, asset: &Address, balance: i128) {
        let token_client = token::Client::new(env, asset);
        token_client.transfer(&env.current_contract_address(), &cfg.beneficiary, &balance);
        env.events().publish(
            (symbol_short!("ingress"), symbol_short!("bypassed")),
            (asset.clone(), balance),
        );
    }

    /// Accounting first (inside `apply`), then the token legs. A rejected
    /// apply aborts before any transfer is issued. The provider leg goes to
    /// the vault the ledger itself declares, so the token flow and the
    /// accounting can never target different vaults.
    fn _route(env: &Env, cfg: &RouteConfig, asset: &Address, balance: i128) {
        let split: SplitResult = env.invoke_contract(
            &cfg.distribution_ledger,
            &Symbol::new(env, "apply"),
            Vec::from_array(
                env,
                [
                    env.current_contract_address().into_val(env),
                    asset.clone().into_val(env),
                    balance.into_val(env),
                ],
            ),
        );

        let token_client = token::Client::new(env, asset);
        if split.to_providers > 0 {
            let vault: Address = env.invoke_contract(
                &cfg.distribution_ledger,
                &Symbol::new(env, "get_claims_vault"),
                Vec::new(env),
            );
            token_client.transfer(&env.current_contract_address(), &vault, &split.to_providers);
        }
        if split.to_beneficiary > 0 {
            token_client.transfer(
                &env.current_contract_address(),
                &cfg.beneficiary,
                &split.to_beneficiary,
            );
        }

        env.events().publish(
            (symbol_short!("ingress"), symbol_short!("forward")),
            (asset.clone(), split.to_providers, split.to_beneficiary),
        );
    }
}
