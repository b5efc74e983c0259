//! Tributary - Claims Vault (Soroban)
//! Holds the capital providers' side of the deal: per-asset cumulative
//! deposits and per-holder cumulative claims. Entitlement is computed lazily
//! from running totals, so crediting is O(1) regardless of holder count.

#![no_std]
use soroban_sdk::{contract, contractimpl, contracttype, symbol_short, token, Address, Env};

// ============================================================
// Storage Keys
// ============================================================

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Admin,
    PendingAdmin,
    Ledger,
    Creditor(Address), // additional authorized credit sources
    TotalWeight,
    StakeWeight(Address),
    TotalDeposited(Address),     // per asset, cumulative ever credited
    Claimed(Address, Address),   // (holder, asset), cumulative withdrawn
}

// ============================================================
// Contract
// ============================================================

const INSTANCE_LIFETIME_THRESHOLD: u32 = 17_280;
const INSTANCE_BUMP_AMOUNT: u32 = 86_400;
const PERSISTENT_LIFETIME_THRESHOLD: u32 = 120_960;
const PERSISTENT_BUMP_AMOUNT: u32 = 1_051_200;

#[contract]
pub struct ClaimsVaultContract;

#[contractimpl]
impl ClaimsVaultContract {
    pub fn initialize(env: Env, admin: Address, distribution_ledger: Address) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        if env.storage().instance().has(&DataKey::Admin) {
            panic!("already initialized");
        }
        admin.require_auth();
        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage()
            .instance()
            .set(&DataKey::Ledger, &distribution_ledger);
        env.storage().instance().set(&DataKey::TotalWeight, &0i128);
    }

    /// Assign stake weight to a holder. Weights are expected to be fixed at
    /// onboarding; minting after deposits exist shrinks earlier holders' share
    /// of the cumulative pool and is deliberately not blocked here.
    pub fn mint_stake(env: Env, admin: Address, holder: Address, weight: i128) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        tributary_common_admin::require_admin(&env, &DataKey::Admin, &admin);
        if weight <= 0 {
            panic!("invalid stake weight");
        }

        let key = DataKey::StakeWeight(holder.clone());
        let current: i128 = env.storage().persistent().get(&key).unwrap_or(0);
        env.storage().persistent().set(&key, &(current + weight));
        env.storage().persistent().extend_ttl(
            &key,
            PERSISTENT_LIFETIME_THRESHOLD,
            PERSISTENT_BUMP_AMOUNT,
        );

        let total: i128 = env
            .storage()
            .instance()
            .get(&DataKey::TotalWeight)
            .unwrap_or(0);
        env.storage()
            .instance()
            .set(&DataKey::TotalWeight, &(total + weight));

        env.events().publish(
            (symbol_short!("stake"), symbol_short!("minted")),
            (holder, weight),
        );
    }

    /// Authorize an additional credit source (the collateral escrow's default
    /// payout). The distribution ledger is always authorized.
    pub fn add_creditor(env: Env, admin: Address, creditor: Address) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        tributary_common_admin::require_admin(&env, &DataKey::Admin, &admin);
        let _ttl_key = DataKey::Creditor(creditor);
        env.storage().persistent().set(&_ttl_key, &true);
        env.storage().persistent().extend_ttl(
            &_ttl_key,
            PERSISTENT_LIFETIME_THRESHOLD,
            PERSISTENT_BUMP_AMOUNT,
        );
    }

    /// Record an amount routed to providers. Callable only by the distribution
    /// ledger or an authorized creditor; no per-holder bookkeeping happens
    /// here. The tokens themselves arrive at this contract's address in the
    /// same transaction.
    pub fn credit(env: Env, creditor: Address, asset: Address, amount: i128) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        creditor.require_auth();

        let ledger: Address = env
            .storage()
            .instance()
            .get(&DataKey::Ledger)
            .expect("not initialized");
        let extra: bool = env
            .storage()
            .persistent()
            .get(&DataKey::Creditor(creditor.clone()))
            .unwrap_or(false);
        if creditor != ledger && !extra {
            panic!("unauthorized creditor");
        }
        if amount <= 0 {
            panic!("invalid amount");
        }

        let key = DataKey::TotalDeposited(asset.clone());
        let total: i128 = env.storage().persistent().get(&key).unwrap_or(0);
        env.storage().persistent().set(&key, &(total + amount));
        env.storage().persistent().extend_ttl(
            &key,
            PERSISTENT_LIFETIME_THRESHOLD,
            PERSISTENT_BUMP_AMOUNT,
        );

        env.events().publish(
            (symbol_short!("vault"), symbol_short!("credited")),
            (asset, amount),
        );
    }

    /// Entitlement minus already-claimed, floored at zero. Floor division can
    /// only round toward the house, never against the holder.
    pub fn claimable_amount(env: Env, holder: Address, asset: Address) -> i128 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        let total_weight: i128 = env
            .storage()
            .instance()
            .get(&DataKey::TotalWeight)
            .unwrap_or(0);
        if total_weight == 0 {
            return 0;
        }
        let weight: i128 = env
            .storage()
            .persistent()
            .get(&DataKey::StakeWeight(holder.clone()))
            .unwrap_or(0);
        let total_deposited: i128 = env
            .storage()
            .persistent()
            .get(&DataKey::TotalDeposited(asset.clone()))
            .unwrap_or(0);
        let claimed: i128 = env
            .storage()
            .persistent()
            .get(&DataKey::Claimed(holder, asset))
            .unwrap_or(0);

        let entitlement = total_deposited * weight / total_weight;
        if entitlement <= claimed {
            0
        } else {
            entitlement - claimed
        }
    }

    /// Withdraw the holder's full currently-claimable amount of one asset.
    /// The claimed counter is bumped before the outbound transfer so a
    /// re-entering caller observes already-updated state.
    pub fn withdraw(env: Env, holder: Address, asset: Address) -> i128 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        holder.require_auth();

        let weight: i128 = env
            .storage()
            .persistent()
            .get(&DataKey::StakeWeight(holder.clone()))
            .unwrap_or(0);
        if weight == 0 {
            panic!("no stake");
        }

        let claimable = Self::claimable_amount(env.clone(), holder.clone(), asset.clone());
        if claimable <= 0 {
            panic!("nothing to claim");
        }

        let key = DataKey::Claimed(holder.clone(), asset.clone());
        let claimed: i128 = env.storage().persistent().get(&key).unwrap_or(0);
        env.storage().persistent().set(&key, &(claimed + claimable));
        env.storage().persistent().extend_ttl(
            &key,
            PERSISTENT_LIFETIME_THRESHOLD,
            PERSISTENT_BUMP_AMOUNT,
        );

        let token_client = token::Client::new(&env, &asset);
        token_client.transfer(&env.current_contract_address(), &holder, &claimable);

        env.events().publish(
            (symbol_short!("vault"), symbol_short!("claimed")),
            (holder, asset, claimable),
        );

        claimable
    }

    /// Not supported: callers must withdraw per asset. Kept as an explicit
    /// rejection rather than silently guessing multi-asset batching semantics.
    pub fn claim_all_assets(env: Env, holder: Address) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        holder.require_auth();
        panic!("per-asset withdrawal only");
    }

    // ============================================================
    // Read-Only Functions
    // ============================================================

    pub fn get_stake_weight(env: Env, holder: Address) -> i128 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage()
            .persistent()
            .get(&DataKey::StakeWeight(holder))
            .unwrap_or(0)
    }

    pub fn get_total_weight(env: Env) -> i128 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage()
            .instance()
            .get(&DataKey::TotalWeight)
            .unwrap_or(0)
    }

    pub fn get_total_deposited(env: Env, asset: Address) -> i128 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage()
            .persistent()
            .get(&DataKey::TotalDeposited(asset))
            .unwrap_or(0)
    }

    pub fn get_claimed(env: Env, holder: Address, asset: Address) -> i128 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage()
            .persistent()
            .get(&DataKey::Claimed(holder, asset))
            .unwrap_or(0)
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
}
