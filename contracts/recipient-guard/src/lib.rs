//! Tributary - Recipient Guard (Soroban)
//! Keeps the payment source pointed at the ingress adapter until the deal is
//! genuinely over: either the repayment cap has been reached, or the term has
//! ended and a make-whole payment has been completed. Even then, a redirect
//! takes a proposal plus a delay.

#![no_std]
use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, token, Address, Env, IntoVal, Symbol,
    Vec as SdkVec,
};

// ============================================================
// Data Types
// ============================================================

#[contracttype]
#[derive(Clone)]
pub struct GuardConfig {
    pub distribution_ledger: Address,
    pub token: Address,
    pub payout: Address, // where make-whole payments land (the claims vault)
    pub term_end: u64,
    pub make_whole_target: i128,
    pub change_delay: u64,
}

#[contracttype]
#[derive(Clone)]
pub struct RecipientChangeProposal {
    pub target: Address,
    pub executable_at: u64,
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
    Recipient,
    MakeWholePaid,
    PendingChange,
}

// ============================================================
// Contract
// ============================================================

const INSTANCE_LIFETIME_THRESHOLD: u32 = 17_280;
const INSTANCE_BUMP_AMOUNT: u32 = 86_400;

#[contract]
pub struct RecipientGuardContract;

#[contractimpl]
impl RecipientGuardContract {
    pub fn initialize(
        env: Env,
        admin: Address,
        distribution_ledger: Address,
        token: Address,
        payout: Address,
        initial_recipient: Address,
        term_end: u64,
        make_whole_target: i128,
        change_delay: u64,
    ) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        if env.storage().instance().has(&DataKey::Admin) {
            panic!("already initialized");
        }
        admin.require_auth();
        if make_whole_target <= 0 {
            panic!("invalid make-whole amount");
        }

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(
            &DataKey::Config,
            &GuardConfig {
                distribution_ledger,
                token,
                payout,
                term_end,
                make_whole_target,
                change_delay,
            },
        );
        env.storage()
            .instance()
            .set(&DataKey::Recipient, &initial_recipient);
        env.storage().instance().set(&DataKey::MakeWholePaid, &0i128);
    }

    /// Pay toward early termination. Accumulates to the fixed target and
    /// cannot overshoot it. Funds move to the claims vault and are credited
    /// there in the same transaction, so holders can withdraw them pro-rata;
    /// the guard must be an authorized creditor on the vault.
    pub fn make_whole_payment(env: Env, payer: Address, amount: i128) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        payer.require_auth();
        if amount <= 0 {
            panic!("invalid make-whole amount");
        }
        let cfg: GuardConfig = env
            .storage()
            .instance()
            .get(&DataKey::Config)
            .expect("not initialized");
        let paid: i128 = env
            .storage()
            .instance()
            .get(&DataKey::MakeWholePaid)
            .unwrap_or(0);
        if paid + amount > cfg.make_whole_target {
            panic!("exceeds make-whole target");
        }

        env.storage()
            .instance()
            .set(&DataKey::MakeWholePaid, &(paid + amount));

        let token_client = token::Client::new(&env, &cfg.token);
        token_client.transfer(&payer, &cfg.payout, &amount);
        env.invoke_contract::<()>(
            &cfg.payout,
            &Symbol::new(&env, "credit"),
            SdkVec::from_array(
                &env,
                [
                    env.current_contract_address().into_val(&env),
                    cfg.token.clone().into_val(&env),
                    amount.into_val(&env),
                ],
            ),
        );

        env.events().publish(
            (symbol_short!("guard"), symbol_short!("mkwhole")),
            (payer, amount, paid + amount),
        );
    }

    /// Either terminal unlock condition: cap reached on the ledger, or term
    /// ended with the make-whole fully paid.
    pub fn is_unlocked(env: Env) -> bool {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        let cfg: GuardConfig = match env.storage().instance().get(&DataKey::Config) {
            Some(c) => c,
            None => return false,
        };
        let cap_reached: bool = env.invoke_contract(
            &cfg.distribution_ledger,
            &Symbol::new(&env, "is_complete"),
            SdkVec::new(&env),
        );
        if cap_reached {
            return true;
        }
        let paid: i128 = env
            .storage()
            .instance()
            .get(&DataKey::MakeWholePaid)
            .unwrap_or(0);
        env.ledger().timestamp() >= cfg.term_end && paid >= cfg.make_whole_target
    }

    /// Phase one of a redirect: rejected outright while the deal is live.
    pub fn propose_recipient(env: Env, admin: Address, target: Address) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        tributary_common_admin::require_admin(&env, &DataKey::Admin, &admin);
        if !Self::is_unlocked(env.clone()) {
            panic!("deal not unlocked");
        }
        let cfg: GuardConfig = env
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
            (symbol_short!("guard"), symbol_short!("proposed")),
            (target, executable_at),
        );
    }

    /// Phase two: the unlock condition is re-checked, not just the delay.
    pub fn execute_change(env: Env, admin: Address) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        tributary_common_admin::require_admin(&env, &DataKey::Admin, &admin);
        let proposal: RecipientChangeProposal = env
            .storage()
            .instance()
            .get(&DataKey::PendingChange)
            .expect("no pending change");
        if !Self::is_unlocked(env.clone()) {
            panic!("deal not unlocked");
        }
        if env.ledger().timestamp() < proposal.executable_at {
            panic!("change delay not elapsed");
        }

        env.storage()
            .instance()
            .set(&DataKey::Recipient, &proposal.target);
        env.storage().instance().remove(&DataKey::PendingChange);

        env.events().publish(
            (symbol_short!("guard"), symbol_short!("changed")),
            proposal.target,
        );
    }

    // ============================================================
    // Read-Only Functions
    // ============================================================

    pub fn get_recipient(env: Env) -> Address {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage()
            .instance()
            .get(&DataKey::Recipient)
            .expect("not initialized")
    }

    pub fn get_pending_change(env: Env) -> Option<RecipientChangeProposal> {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage().instance().get(&DataKey::PendingChange)
    }

    pub fn get_make_whole_paid(env: Env) -> i128 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage()
            .instance()
            .get(&DataKey::MakeWholePaid)
            .unwrap_or(0)
    }

    pub fn make_whole_remaining(env: Env) -> i128 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        let cfg: GuardConfig = env
            .storage()
            .instance()
            .get(&DataKey::Config)
            .expect("not initialized");
        let paid: i128 = env
            .storage()
            .instance()
            .get(&DataKey::MakeWholePaid)
            .unwrap_or(0);
        cfg.make_whole_target - paid
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

mod test;
